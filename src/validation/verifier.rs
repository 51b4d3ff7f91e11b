use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::Verdict;
use crate::validation::dnsmx::{DnsMxResolver, MxResolver};
use crate::validation::smtp::{MailboxProbe, SmtpProbe};
use crate::validation::syntax;

/// Single-address verification pipeline: format, then MX, then SMTP.
///
/// Each call performs at most one DNS query and one SMTP connection, and
/// short-circuits at the first step that settles the verdict. No retries.
#[derive(Clone)]
pub struct EmailVerifier {
    resolver: Arc<dyn MxResolver>,
    probe: Arc<dyn MailboxProbe>,
}

impl EmailVerifier {
    pub fn new(resolver: Arc<dyn MxResolver>, probe: Arc<dyn MailboxProbe>) -> Self {
        Self { resolver, probe }
    }

    /// Builds the verifier against live DNS and SMTP.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(DnsMxResolver::new(config.dns_timeout)),
            Arc::new(SmtpProbe::new(config.helo_name.clone())),
        )
    }

    pub async fn verify(&self, email: &str) -> Verdict {
        if !syntax::is_valid_format(email) {
            return Verdict::InvalidFormat;
        }

        let Some(domain) = syntax::domain_of(email) else {
            return Verdict::InvalidFormat;
        };

        let Some(mx_host) = self.resolver.resolve_mx(domain).await else {
            tracing::debug!(email, domain, "no mail exchanger");
            return Verdict::Unknown;
        };

        self.probe.probe(&mx_host, email).await
    }
}
