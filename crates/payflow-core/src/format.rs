//! # Keystroke Formatting
//!
//! Pure string transforms applied to form input on every keystroke.
//! Each helper normalizes first and then re-inserts separators, so feeding
//! already formatted text back in returns it unchanged.

/// Separator inserted between 4-character groups
pub const GROUP_SEPARATOR: char = ' ';

const CARD_DIGITS: usize = 16;
const IBAN_MAX_CHARS: usize = 34;
const EXPIRY_DIGITS: usize = 4;

/// Insert [`GROUP_SEPARATOR`] every 4 characters
pub fn group_by_four(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 4);
    for (i, c) in value.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(c);
    }
    out
}

/// `4242424242424242` -> `4242 4242 4242 4242`.
/// Non-digits are dropped and input is capped at 16 digits.
pub fn format_card_number(value: &str) -> String {
    let digits: String = value
        .chars()
        .filter(char::is_ascii_digit)
        .take(CARD_DIGITS)
        .collect();
    group_by_four(&digits)
}

/// `tn5912345678` -> `TN59 1234 5678`.
/// Keeps ASCII alphanumerics only, upper-cased.
pub fn format_iban(value: &str) -> String {
    let normalized: String = value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(IBAN_MAX_CHARS)
        .collect();
    group_by_four(&normalized)
}

/// `1227` -> `12/27`; the slash appears once a third digit is typed.
pub fn format_expiry_date(value: &str) -> String {
    let digits: String = value
        .chars()
        .filter(char::is_ascii_digit)
        .take(EXPIRY_DIGITS)
        .collect();
    if digits.len() > 2 {
        format!("{}/{}", &digits[..2], &digits[2..])
    } else {
        digits
    }
}

/// Apply the helper registered for a field name; other fields pass through.
pub fn format_field(field: &str, value: &str) -> String {
    match field {
        "cardNumber" => format_card_number(value),
        "iban" => format_iban(value),
        "expiryDate" => format_expiry_date(value),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_number_grouping() {
        assert_eq!(format_card_number("4242424242424242"), "4242 4242 4242 4242");
        assert_eq!(format_card_number("4242-4242-42"), "4242 4242 42");
        assert_eq!(format_card_number("42424242424242429999"), "4242 4242 4242 4242");
        assert_eq!(format_card_number(""), "");
    }

    #[test]
    fn test_card_number_idempotent() {
        let grouped = "4444 4444 4444 4444";
        assert_eq!(format_card_number(grouped), grouped);
        assert_eq!(format_card_number(&format_card_number("4444")), "4444");
        assert_eq!(format_card_number("4444 4"), "4444 4");
    }

    #[test]
    fn test_iban_grouping() {
        assert_eq!(
            format_iban("tn5912345678901234567890"),
            "TN59 1234 5678 9012 3456 7890"
        );
        let once = format_iban("TN59 1234 5678 9012 3456 7890");
        assert_eq!(format_iban(&once), once);
    }

    #[test]
    fn test_expiry_date_slash() {
        assert_eq!(format_expiry_date("1"), "1");
        assert_eq!(format_expiry_date("12"), "12");
        assert_eq!(format_expiry_date("122"), "12/2");
        assert_eq!(format_expiry_date("1227"), "12/27");
        assert_eq!(format_expiry_date("12/27"), "12/27");
        assert_eq!(format_expiry_date("12/2799"), "12/27");
    }

    #[test]
    fn test_expiry_month_alone_has_no_trailing_slash() {
        // Backspacing over the slash must not put it back
        assert_eq!(format_expiry_date("12/"), "12");
        assert_eq!(format_expiry_date(&format_expiry_date("12")), "12");
        assert_eq!(format_field("expiryDate", "12"), "12");
    }

    #[test]
    fn test_format_field_dispatch() {
        assert_eq!(format_field("cardNumber", "42424242"), "4242 4242");
        assert_eq!(format_field("expiryDate", "0330"), "03/30");
        assert_eq!(format_field("city", " Sfax "), " Sfax ");
    }
}
