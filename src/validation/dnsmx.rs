use std::time::Duration;

use async_trait::async_trait;
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{ResolverConfig, ResolverOpts},
};

/// Looks up the mail exchanger of a domain.
#[async_trait]
pub trait MxResolver: Send + Sync {
    /// Returns the exchange host of the first MX record, or `None` when the
    /// domain has no resolvable mail exchanger.
    async fn resolve_mx(&self, domain: &str) -> Option<String>;
}

/// [`MxResolver`] backed by a DNS resolver.
///
/// Records are taken in the order the resolver returns them. No preference
/// sorting is applied: the first record wins, whatever its priority.
#[derive(Clone)]
pub struct DnsMxResolver {
    resolver: TokioAsyncResolver,
}

impl DnsMxResolver {
    /// Creates a resolver with the default upstream configuration and
    /// `timeout` per request.
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;

        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
        }
    }
}

#[async_trait]
impl MxResolver for DnsMxResolver {
    async fn resolve_mx(&self, domain: &str) -> Option<String> {
        match self.resolver.mx_lookup(domain).await {
            Ok(records) => {
                let exchange = records
                    .iter()
                    .next()
                    .map(|mx| normalize_exchange(&mx.exchange().to_utf8()));
                if exchange.is_none() {
                    tracing::debug!(domain, "MX lookup returned no records");
                }
                exchange.filter(|host| !host.is_empty())
            }
            Err(err) => {
                tracing::debug!(domain, error = %err, "MX lookup failed");
                None
            }
        }
    }
}

/// Strips the trailing root label dot from an exchange name.
pub(crate) fn normalize_exchange(exchange: &str) -> String {
    exchange.trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_exchange_strips_root_dot() {
        assert_eq!(normalize_exchange("mx1.example.com."), "mx1.example.com");
        assert_eq!(normalize_exchange("mx1.example.com"), "mx1.example.com");
        assert_eq!(normalize_exchange("."), "");
    }

    #[tokio::test]
    async fn test_reserved_invalid_tld_has_no_exchanger() {
        // `.invalid` never resolves; without network access the lookup fails too.
        let resolver = DnsMxResolver::new(Duration::from_secs(2));
        assert_eq!(resolver.resolve_mx("nonexistent.invalid").await, None);
    }

    #[tokio::test]
    async fn test_malformed_domain_is_soft_failure() {
        let resolver = DnsMxResolver::new(Duration::from_secs(2));
        assert_eq!(resolver.resolve_mx("bad domain..invalid").await, None);
    }
}
