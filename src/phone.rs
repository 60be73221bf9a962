/// Normalize a raw phone number into an E.164-like digit string for outbound
/// messaging: strip formatting characters, the leading `+` and the national
/// trunk `0`, then prefix the country code when it is missing.
///
/// Stored subscriber phones keep the submitted form; normalization happens
/// only on the way out to the provider. Idempotent on normalized input.
pub fn normalize_phone(raw: &str, country_code: &str) -> String {
    let mut digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if let Some(stripped) = digits.strip_prefix('+') {
        digits = stripped.to_string();
    }

    // A subscriber-local number is at most 11 digits (with trunk prefix), so
    // anything longer that already carries the country code passes through.
    if digits.starts_with(country_code) && digits.len() > 11 {
        return digits;
    }

    let rest = digits.strip_prefix('0').unwrap_or(&digits);
    format!("{country_code}{rest}")
}

/// Subscriber phones are stored as submitted but must be 10-11 plain digits.
pub fn is_valid_subscriber_phone(phone: &str) -> bool {
    (10..=11).contains(&phone.len()) && phone.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trunk_zero_and_prefixes_country_code() {
        assert_eq!(normalize_phone("05551234567", "90"), "905551234567");
        assert_eq!(normalize_phone("5551234567", "90"), "905551234567");
    }

    #[test]
    fn handles_plus_and_formatting_characters() {
        assert_eq!(normalize_phone("+90 555 123 45 67", "90"), "905551234567");
        assert_eq!(normalize_phone("(0555) 123-45-67", "90"), "905551234567");
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_phone("05551234567", "90");
        assert_eq!(normalize_phone(&once, "90"), once);
    }

    #[test]
    fn always_starts_with_country_code() {
        for raw in ["05551234567", "+905551234567", "5551234567", "905551234567"] {
            assert!(normalize_phone(raw, "90").starts_with("90"), "raw: {raw}");
        }
    }

    #[test]
    fn validates_stored_phone_shape() {
        assert!(is_valid_subscriber_phone("05551234567"));
        assert!(is_valid_subscriber_phone("5551234567"));
        assert!(!is_valid_subscriber_phone("555123"));
        assert!(!is_valid_subscriber_phone("0555-123-4567"));
        assert!(!is_valid_subscriber_phone("905551234567"));
    }
}
