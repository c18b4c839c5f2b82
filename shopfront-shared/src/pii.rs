use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps customer data so that `Debug`/`Display` never print it in full.
/// Serialization keeps the real value; API responses and bot messages need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", mask(self.0.as_ref()))
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", mask(self.0.as_ref()))
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

/// Keeps the first two characters of the local part: `alice@x` -> `al***@x`
pub fn mask(value: &str) -> String {
    let (local, domain) = match value.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (value, None),
    };
    let visible: String = local.chars().take(2).collect();
    match domain {
        Some(domain) => format!("{}***@{}", visible, domain),
        None => format!("{}***", visible),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_is_masked() {
        let email = Masked("alice@example.com".to_string());
        assert_eq!(format!("{:?}", email), "al***@example.com");
        assert_eq!(email.to_string(), "al***@example.com");
    }

    #[test]
    fn test_serialization_keeps_value() {
        let email = Masked("alice@example.com".to_string());
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"alice@example.com\"");
    }

    #[test]
    fn test_mask_without_domain() {
        assert_eq!(mask("shop-7"), "sh***");
        assert_eq!(mask(""), "***");
    }
}
