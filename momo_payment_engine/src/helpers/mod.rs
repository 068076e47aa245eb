mod phone;
mod sms_parser;

pub use phone::{normalize_phone, phone_key, PHONE_KEY_LENGTH};
pub use sms_parser::{
    extract_amount,
    extract_payer_phone,
    extract_transaction_id,
    normalize_whitespace,
    parse_sms,
    ClassificationPolicy,
    ParsedNotification,
    MAX_NOTIFICATION_AMOUNT,
};
