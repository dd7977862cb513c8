use std::sync::LazyLock;

use regex::Regex;

/// Code patterns from most to least specific. Each captures the digits in
/// group 1.
static CODE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)verification code(?:\s+is)?[:\s]*(\d{6})\b").expect("valid regex"),
        Regex::new(r"(?i)\bcode(?:\s+is)?[:\s]*(\d{6})\b").expect("valid regex"),
        Regex::new(r"\b(\d{6})\b").expect("valid regex"),
    ]
});

/// Extract a 6-digit verification code from a message body.
///
/// Explicit "verification code: NNNNNN" phrasing is preferred over a bare
/// six-digit run. The digits are returned exactly, leading zeros included.
pub fn extract_verification_code(text: &str) -> Option<String> {
    CODE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zero_preserved() {
        assert_eq!(
            extract_verification_code("Your one-time code is 042317.").as_deref(),
            Some("042317")
        );
    }

    #[test]
    fn test_explicit_phrase_beats_earlier_bare_digits() {
        let body = "Order 123456 shipped. Your verification code: 987654";
        assert_eq!(extract_verification_code(body).as_deref(), Some("987654"));
    }

    #[test]
    fn test_bare_six_digits() {
        assert_eq!(
            extract_verification_code("Use 314159 to continue").as_deref(),
            Some("314159")
        );
    }

    #[test]
    fn test_longer_runs_are_not_codes() {
        assert_eq!(extract_verification_code("Reference 12345678"), None);
        assert_eq!(extract_verification_code("no digits here"), None);
    }
}
