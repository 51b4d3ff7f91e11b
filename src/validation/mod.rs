/// Checks an address against the accepted address pattern.
///
/// # Examples
/// ```
/// use email_verifier::validation::syntax::is_valid_format;
///
/// assert!(is_valid_format("user.name+tag@example.com"));
/// assert!(!is_valid_format("invalid@example"));
/// ```
pub mod syntax;

/// Resolves the mail exchanger of a domain.
///
/// DNS failures of any kind (NXDOMAIN, timeout, no records, malformed
/// domain) yield `None`; they are expected and never propagated.
pub mod dnsmx;

/// Probes a mail exchanger with a HELO / MAIL FROM / RCPT TO dialogue.
pub mod smtp;

/// Composes the format, MX and SMTP checks into one verdict.
pub mod verifier;

pub use verifier::EmailVerifier;
