use std::sync::LazyLock;

use regex::Regex;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// Checks an address against the accepted address pattern.
///
/// The address is matched as-is: no trimming and no case folding. Callers
/// trim before calling.
///
/// # Examples
/// ```
/// use email_verifier::validation::syntax::is_valid_format;
///
/// assert!(is_valid_format("user.name+tag@example.com"));
/// assert!(!is_valid_format("foo@bar"));
/// ```
pub fn is_valid_format(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Returns the part after the first `@`, if any.
pub fn domain_of(email: &str) -> Option<&str> {
    email.split_once('@').map(|(_, domain)| domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        assert!(is_valid_format("good@example.com"));
        assert!(is_valid_format("first.last@sub.example.co.uk"));
        assert!(is_valid_format("user+tag@example.io"));
        assert!(is_valid_format("user_name%x@example-mail.org"));
        assert!(is_valid_format("UPPER@EXAMPLE.COM"));
    }

    #[test]
    fn test_rejects_missing_at() {
        assert!(!is_valid_format("not-an-email"));
        assert!(!is_valid_format("example.com"));
    }

    #[test]
    fn test_rejects_missing_tld() {
        assert!(!is_valid_format("foo@bar"));
        assert!(!is_valid_format("foo@bar."));
    }

    #[test]
    fn test_rejects_short_or_numeric_tld() {
        assert!(!is_valid_format("foo@bar.c"));
        assert!(!is_valid_format("foo@bar.c0m"));
        assert!(!is_valid_format("foo@bar.123"));
    }

    #[test]
    fn test_rejects_trailing_symbol_after_domain() {
        assert!(!is_valid_format("foo@bar.com!"));
        assert!(!is_valid_format("foo@bar.com>"));
    }

    #[test]
    fn test_no_trimming_is_applied() {
        assert!(!is_valid_format(" foo@bar.com"));
        assert!(!is_valid_format("foo@bar.com "));
        assert!(!is_valid_format("foo@bar.com\n"));
    }

    #[test]
    fn test_rejects_second_at_sign() {
        assert!(!is_valid_format("a@b@example.com"));
    }

    #[test]
    fn test_rejects_empty_parts() {
        assert!(!is_valid_format(""));
        assert!(!is_valid_format("@example.com"));
    }

    #[test]
    fn test_rejects_non_ascii_local_part() {
        assert!(!is_valid_format("tëst@example.com"));
    }

    #[test]
    fn test_domain_of_splits_on_first_at() {
        assert_eq!(domain_of("user@example.com"), Some("example.com"));
        assert_eq!(domain_of("a@b@c.com"), Some("b@c.com"));
        assert_eq!(domain_of("no-at-sign"), None);
    }
}
