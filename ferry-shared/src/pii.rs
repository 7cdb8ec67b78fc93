use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps a sensitive value (card number, passenger e-mail) so that it never
/// shows up in `Debug`/`Display` output, while still serializing normally for
/// API responses.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Reduce a card number to the printable `**** **** **** 1234` form.
///
/// Spaces and dashes are ignored. Returns `None` when fewer than four digits
/// remain or any other character is present.
pub fn mask_card_number(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if digits.len() < 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_four = &digits[digits.len() - 4..];
    Some(format!("**** **** **** {}", last_four))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_debug_output() {
        let card = Masked::new("4242424242424242".to_string());
        assert_eq!(format!("{:?}", card), "********");
        assert_eq!(format!("{}", card), "********");
        assert_eq!(card.expose(), "4242424242424242");
    }

    #[test]
    fn test_masked_serializes_inner_value() {
        let email = Masked::new("guest@example.com".to_string());
        let json = serde_json::to_string(&email).unwrap();
        assert_eq!(json, "\"guest@example.com\"");
    }

    #[test]
    fn test_mask_card_number() {
        assert_eq!(
            mask_card_number("4242 4242 4242 4242").as_deref(),
            Some("**** **** **** 4242")
        );
        assert_eq!(mask_card_number("4000-0000-0000-0002").as_deref(), Some("**** **** **** 0002"));
        assert_eq!(mask_card_number("12"), None);
        assert_eq!(mask_card_number("4242abcd42424242"), None);
    }
}
