//! Phone number normalization
//!
//! Purchaser phone numbers arrive in local Nigerian format (`0801...`),
//! bare international format (`234801...`), or already canonical
//! (`+234801...`). Everything downstream (messaging gateway, purchaser
//! grouping) works with the single canonical `+<country><subscriber>` form.

use thiserror::Error;

/// Country calling code applied to local-format numbers
const DEFAULT_COUNTRY_CODE: &str = "234";

#[derive(Debug, Error)]
pub enum PhoneError {
    #[error("unrecognized phone number format: {0}")]
    Unrecognized(String),
}

/// Normalize a phone number to international `+...` form.
///
/// Accepted inputs after separator stripping:
/// - `+` followed by 10-15 digits (returned as-is)
/// - `234...` (13 digits total) — bare international form
/// - `0...` (11 digits total) — local form, `0` replaced by `+234`
pub fn normalize_phone(raw: &str) -> Result<String, PhoneError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    if let Some(rest) = cleaned.strip_prefix('+') {
        if (10..=15).contains(&rest.len()) && rest.chars().all(|c| c.is_ascii_digit()) {
            return Ok(cleaned);
        }
        return Err(PhoneError::Unrecognized(raw.to_string()));
    }

    if !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Err(PhoneError::Unrecognized(raw.to_string()));
    }

    if cleaned.len() == 13 && cleaned.starts_with(DEFAULT_COUNTRY_CODE) {
        return Ok(format!("+{cleaned}"));
    }

    if cleaned.len() == 11 && cleaned.starts_with('0') {
        return Ok(format!("+{}{}", DEFAULT_COUNTRY_CODE, &cleaned[1..]));
    }

    Err(PhoneError::Unrecognized(raw.to_string()))
}

/// Mask a phone number for logs: country code and last three digits survive.
///
/// Operates on characters, not bytes: raw database values land here on the
/// invalid-phone path and may contain arbitrary (multibyte) garbage.
pub fn mask_phone(phone: &str) -> String {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let total = digits.chars().count();
    if total <= 6 {
        return "*".repeat(total);
    }
    let prefix: String = digits.chars().take(3).collect();
    let suffix: String = digits.chars().skip(total - 3).collect();
    format!("+{}{}{}", prefix, "*".repeat(total - 6), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_format_gets_country_code() {
        assert_eq!(normalize_phone("08011112222").unwrap(), "+2348011112222");
    }

    #[test]
    fn bare_international_format_gets_plus() {
        assert_eq!(normalize_phone("2348011112222").unwrap(), "+2348011112222");
    }

    #[test]
    fn canonical_form_is_unchanged() {
        assert_eq!(normalize_phone("+2348011112222").unwrap(), "+2348011112222");
    }

    #[test]
    fn separators_are_stripped() {
        assert_eq!(
            normalize_phone("0801 111-2222").unwrap(),
            "+2348011112222"
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(normalize_phone("not-a-number").is_err());
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("").is_err());
    }

    #[test]
    fn short_plus_number_is_rejected() {
        assert!(normalize_phone("+12345").is_err());
    }

    #[test]
    fn masking_keeps_prefix_and_suffix() {
        assert_eq!(mask_phone("+2348011112222"), "+234*******222");
    }

    #[test]
    fn masking_handles_multibyte_garbage() {
        // Raw profile phones can contain arbitrary characters; masking must
        // never panic on non-ASCII input.
        assert_eq!(mask_phone("08\u{20ac}11112222"), "+08\u{20ac}*****222");
        assert_eq!(mask_phone("\u{20ac}\u{20ac}\u{20ac}"), "***");
    }
}
