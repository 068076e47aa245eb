/// The number of trailing digits that identify a subscriber, independent of any country prefix.
pub const PHONE_KEY_LENGTH: usize = 9;

/// Strips everything but digits from `raw`. Returns `None` unless 9 to 15 digits remain.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits = raw.chars().filter(char::is_ascii_digit).collect::<String>();
    (PHONE_KEY_LENGTH..=15).contains(&digits.len()).then_some(digits)
}

/// The last nine digits of a phone number. Payment notifications and orders are matched on this key, so that
/// `237677123456` and `677123456` refer to the same subscriber.
pub fn phone_key(phone: &str) -> String {
    let digits = phone.chars().filter(char::is_ascii_digit).collect::<Vec<char>>();
    let start = digits.len().saturating_sub(PHONE_KEY_LENGTH);
    digits[start..].iter().collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalization() {
        assert_eq!(normalize_phone("+237 677-12-34-56").as_deref(), Some("237677123456"));
        assert_eq!(normalize_phone("677123456").as_deref(), Some("677123456"));
        assert_eq!(normalize_phone("67712345"), None);
        assert_eq!(normalize_phone("1234567890123456"), None);
    }

    #[test]
    fn keys() {
        assert_eq!(phone_key("237677123456"), "677123456");
        assert_eq!(phone_key("677123456"), "677123456");
        assert_eq!(phone_key("1234"), "1234");
    }
}
