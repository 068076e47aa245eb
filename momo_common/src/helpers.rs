use std::str::FromStr;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse an optional raw value into `T`. Missing values yield `default`; unparseable values are handed to `on_error`
/// together with the raw text, and `default` is returned.
pub fn parse_or_default<T, F>(value: Option<String>, default: T, on_error: F) -> T
where
    T: FromStr,
    F: FnOnce(&str, T::Err),
{
    match value {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(e) => {
                on_error(&raw, e);
                default
            },
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("Yes".into()), false));
        assert!(!parse_boolean_flag(Some(" off ".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
    }

    #[test]
    fn parse_with_fallback() {
        let mut failed = None;
        let v: i64 = parse_or_default(Some("12x".into()), 100, |raw, _| failed = Some(raw.to_string()));
        assert_eq!(v, 100);
        assert_eq!(failed.as_deref(), Some("12x"));
        let v: i64 = parse_or_default(Some(" 250 ".into()), 100, |_, _| panic!("should parse"));
        assert_eq!(v, 250);
        let v: i64 = parse_or_default(None, 7, |_, _| panic!("nothing to parse"));
        assert_eq!(v, 7);
    }
}
