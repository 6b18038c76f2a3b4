pub mod auth;
pub mod health;
pub mod types;
pub mod users;

pub use self::health::health;

// common functions for the handlers
use regex::Regex;

/// E.164-ish: optional leading `+`, then 1 to 15 digits.
pub fn valid_phone(phone: &str) -> bool {
    Regex::new(r"^\+?[0-9]{1,15}$").map_or(false, |re| re.is_match(phone))
}

/// Positive integer query value, or `default` when missing or unparsable.
pub fn positive_or(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_phone() {
        assert!(valid_phone("+15551234567"));
        assert!(valid_phone("15551234567"));
        assert!(valid_phone("+1555"));
        assert!(valid_phone("1"));
        assert!(valid_phone("123456789012345"));
        assert!(!valid_phone("1234567890123456"));
        assert!(!valid_phone(""));
        assert!(!valid_phone("+"));
        assert!(!valid_phone("++1555"));
        assert!(!valid_phone("+1 555"));
        assert!(!valid_phone("+1-555"));
        assert!(!valid_phone("phone"));
    }

    #[test]
    fn test_positive_or() {
        assert_eq!(positive_or(None, 10), 10);
        assert_eq!(positive_or(Some("3"), 10), 3);
        assert_eq!(positive_or(Some(" 7 "), 10), 7);
        assert_eq!(positive_or(Some("0"), 10), 10);
        assert_eq!(positive_or(Some("-2"), 10), 10);
        assert_eq!(positive_or(Some("ten"), 10), 10);
        assert_eq!(positive_or(Some(""), 1), 1);
    }
}
