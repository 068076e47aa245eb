mod fcfa;
mod helpers;

pub mod op;
mod secret;

pub use fcfa::{Fcfa, FcfaConversionError, FCFA_CURRENCY_CODE, FCFA_ISO_CODE};
pub use helpers::{parse_boolean_flag, parse_or_default};
pub use secret::Secret;
