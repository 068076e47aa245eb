//! Extraction of payment facts from Airtel Money "money received" SMS notifications.
//!
//! A typical notification reads
//!
//! ```text
//! Vous avez recu paiement, transaction de 5 150 FCFA du 677123456 le 01/06/2024. TID: ABC-123
//! ```
//!
//! Parsing is pure: the same text always produces the same [`ParsedNotification`].
use std::str::FromStr;

use momo_common::Fcfa;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{db_types::ConversionError, helpers::phone_key};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static RECEIVED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)vous\s+avez\s+re[cç]u").expect("valid regex"));
static CURRENCY_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:fcfa|xaf)\b").expect("valid regex"));
static BRAND_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)airtel").expect("valid regex"));
static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)transaction\s+de\s*(\d[\d\s.,]*)").expect("valid regex"));
static PAYER_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:du|from)\s+\+?(\d{9,15})\b").expect("valid regex"));
static TRANSACTION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bTID\s*:\s*([A-Za-z0-9.\-]+)").expect("valid regex"));

/// The largest amount a single notification may carry. Anything above it is not a real transfer.
pub const MAX_NOTIFICATION_AMOUNT: i64 = 1_000_000_000_000;

/// Decides whether a text is a payment notification at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    /// "vous avez reçu", a currency marker and "transaction de" must all appear.
    #[default]
    Strict,
    /// Any one of "vous avez reçu", "airtel" or "airtel money" is enough.
    Lenient,
}

impl FromStr for ClassificationPolicy {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            _ => Err(ConversionError(format!("Invalid classification policy: {s}"))),
        }
    }
}

impl ClassificationPolicy {
    pub fn is_payment_notification(&self, text: &str) -> bool {
        match self {
            Self::Strict => {
                RECEIVED_MARKER.is_match(text) && CURRENCY_MARKER.is_match(text) && AMOUNT.is_match(text)
            },
            Self::Lenient => RECEIVED_MARKER.is_match(text) || BRAND_MARKER.is_match(text),
        }
    }
}

/// The facts extracted from a notification. All fields are `None` when `recognized` is false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedNotification {
    pub recognized: bool,
    /// Whitespace-normalized text
    pub text: String,
    pub amount: Option<Fcfa>,
    /// Last 9 digits of the payer's number
    pub payer_phone: Option<String>,
    pub transaction_id: Option<String>,
}

pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

pub fn parse_sms(raw_text: &str, policy: ClassificationPolicy) -> ParsedNotification {
    let text = normalize_whitespace(raw_text);
    if !policy.is_payment_notification(&text) {
        return ParsedNotification { recognized: false, text, ..Default::default() };
    }
    ParsedNotification {
        recognized: true,
        amount: extract_amount(&text),
        payer_phone: extract_payer_phone(&text),
        transaction_id: extract_transaction_id(&text),
        text,
    }
}

/// The amount following "transaction de", rounded to whole francs.
///
/// Spaces, thousands commas and thousands dots are grouping separators. A final comma or dot followed by one or two
/// digits is a decimal separator, so `5 150`, `5.150`, `5,150.00` and `5150,00` all read as 5150.
pub fn extract_amount(text: &str) -> Option<Fcfa> {
    let token = AMOUNT.captures(text)?.get(1)?.as_str();
    parse_amount(token)
}

fn parse_amount(token: &str) -> Option<Fcfa> {
    let compact = token.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    let compact = compact.trim_end_matches(['.', ',']);
    let is_separator = |c: char| c == '.' || c == ',';
    let (whole, fraction) = match compact.rfind(is_separator) {
        Some(idx) if (1..=2).contains(&(compact.len() - idx - 1)) => (&compact[..idx], &compact[idx + 1..]),
        _ => (compact, ""),
    };
    let whole = whole.chars().filter(|c| !is_separator(*c)).collect::<String>();
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut value = whole.parse::<i64>().ok()?;
    if fraction.chars().next().is_some_and(|c| c >= '5') {
        value = value.checked_add(1)?;
    }
    Some(Fcfa::from(value))
}

/// The 9 to 15 digit number after "du", reduced to its last 9 digits.
pub fn extract_payer_phone(text: &str) -> Option<String> {
    let digits = PAYER_PHONE.captures(text)?.get(1)?.as_str();
    Some(phone_key(digits))
}

/// The token after "TID:". A trailing full stop belongs to the sentence, not the id.
pub fn extract_transaction_id(text: &str) -> Option<String> {
    let tid = TRANSACTION_ID.captures(text)?.get(1)?.as_str().trim().trim_end_matches('.');
    (!tid.is_empty()).then(|| tid.to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    const SAMPLE: &str = "Vous avez recu paiement, transaction de 5 150 FCFA du 677123456 le 01/06/2024. TID: ABC-123";

    #[test]
    fn parses_a_standard_notification() {
        let parsed = parse_sms(SAMPLE, ClassificationPolicy::Strict);
        assert!(parsed.recognized);
        assert_eq!(parsed.amount, Some(Fcfa::from(5150)));
        assert_eq!(parsed.payer_phone.as_deref(), Some("677123456"));
        assert_eq!(parsed.transaction_id.as_deref(), Some("ABC-123"));
    }

    #[test]
    fn whitespace_is_normalized() {
        let parsed = parse_sms("  Vous  avez\nrecu   paiement,\ttransaction de 2 000 FCFA du 677123456 TID: X1 ", ClassificationPolicy::Strict);
        assert!(parsed.recognized);
        assert_eq!(parsed.text, "Vous avez recu paiement, transaction de 2 000 FCFA du 677123456 TID: X1");
        assert_eq!(parsed.amount, Some(Fcfa::from(2000)));
    }

    #[test]
    fn accents_and_case_do_not_matter() {
        let parsed = parse_sms("VOUS AVEZ REÇU 1000 xaf, Transaction De 1000 du 699000111. tid: Q.77", ClassificationPolicy::Strict);
        assert!(parsed.recognized);
        assert_eq!(parsed.transaction_id.as_deref(), Some("Q.77"));
    }

    #[test]
    fn amount_formats() {
        let cases = [
            ("5 150", 5150),
            ("5.150", 5150),
            ("5,150", 5150),
            ("5,150.00", 5150),
            ("5.150,00", 5150),
            ("5150,5", 5151),
            ("5150.49", 5150),
            ("1 250 000", 1_250_000),
            ("300.", 300),
        ];
        for (token, expected) in cases {
            assert_eq!(parse_amount(token), Some(Fcfa::from(expected)), "parsing {token}");
        }
        assert_eq!(parse_amount("."), None);
    }

    #[test]
    fn long_numbers_keep_the_last_nine_digits() {
        let text = "Vous avez recu transaction de 500 FCFA du 237677123456 TID: T1";
        assert_eq!(extract_payer_phone(text).as_deref(), Some("677123456"));
        assert_eq!(extract_payer_phone("transaction de 500 FCFA du 12345"), None);
    }

    #[test]
    fn trailing_full_stop_is_not_part_of_the_tid() {
        assert_eq!(extract_transaction_id("... TID: PP240601.1234.A12345.").as_deref(), Some("PP240601.1234.A12345"));
        assert_eq!(extract_transaction_id("TID: "), None);
        assert_eq!(extract_transaction_id("no id here"), None);
    }

    #[test]
    fn strict_policy_needs_every_marker() {
        let policy = ClassificationPolicy::Strict;
        assert!(!policy.is_payment_notification("Airtel Money: votre forfait a ete renouvele"));
        assert!(!policy.is_payment_notification("Vous avez recu un bonus de 100 Mo"));
        assert!(!policy.is_payment_notification("Vous avez recu transaction de 500 du 677123456"));
        assert!(policy.is_payment_notification(SAMPLE));
    }

    #[test]
    fn lenient_policy_accepts_any_brand_marker() {
        let policy = ClassificationPolicy::Lenient;
        assert!(policy.is_payment_notification("Airtel Money: transaction de 500 FCFA du 677123456 TID: A1"));
        assert!(policy.is_payment_notification("Vous avez recu 500"));
        assert!(!policy.is_payment_notification("Bonjour, votre colis est arrive"));
        let parsed = parse_sms("Airtel: votre forfait a ete renouvele", policy);
        assert!(parsed.recognized);
        assert_eq!(parsed.amount, None);
    }

    #[test]
    fn unrecognized_text_yields_no_fields() {
        let parsed = parse_sms("Votre code de verification est 123456", ClassificationPolicy::Lenient);
        assert!(!parsed.recognized);
        assert_eq!(parsed, ParsedNotification {
            text: "Votre code de verification est 123456".into(),
            ..Default::default()
        });
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("Lenient".parse::<ClassificationPolicy>().unwrap(), ClassificationPolicy::Lenient);
        assert!("loose".parse::<ClassificationPolicy>().is_err());
    }
}
