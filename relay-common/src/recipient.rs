//! Recipient newtype for type safety
//!
//! Wraps a recipient string (email address, phone number, webhook URL, or
//! push token depending on channel) to prevent accidentally passing a
//! template name or tracking ID where a recipient is expected. Used as the
//! keying type for the circuit breaker and rate limiter maps.

use std::{
    fmt::{self, Display},
    ops::Deref,
    sync::Arc,
};

use serde::{Deserialize, Serialize};

/// A recipient address/token wrapper for type safety.
///
/// The `#[repr(transparent)]` attribute ensures this is a zero-cost
/// abstraction at runtime.
///
/// # Examples
///
/// ```
/// use relay_common::Recipient;
///
/// let recipient = Recipient::new("user@example.com");
/// assert_eq!(recipient.as_str(), "user@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Recipient(Arc<str>);

impl Recipient {
    #[must_use]
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Arc<str> {
        self.0
    }
}

impl Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Recipient {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for Recipient {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<String> for Recipient {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&str> for Recipient {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<Arc<str>> for Recipient {
    fn from(s: Arc<str>) -> Self {
        Self(s)
    }
}

impl From<Recipient> for Arc<str> {
    fn from(recipient: Recipient) -> Self {
        recipient.0
    }
}

impl From<&Recipient> for Arc<str> {
    fn from(recipient: &Recipient) -> Self {
        recipient.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_creation() {
        let recipient = Recipient::new("user@example.com");
        assert_eq!(recipient.as_str(), "user@example.com");
    }

    #[test]
    fn test_recipient_from_string() {
        let s = String::from("+15551234567");
        let recipient: Recipient = s.into();
        assert_eq!(recipient.as_str(), "+15551234567");
    }

    #[test]
    fn test_recipient_display() {
        let recipient = Recipient::new("display@example.com");
        assert_eq!(format!("{recipient}"), "display@example.com");
    }

    #[test]
    fn test_recipient_equality() {
        let a = Recipient::new("a@example.com");
        let b = Recipient::new("a@example.com");
        let c = Recipient::new("b@example.com");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_recipient_serde() {
        let recipient = Recipient::new("serde@example.com");
        let serialized = serde_json::to_string(&recipient).unwrap();
        assert_eq!(serialized, "\"serde@example.com\"");
        let deserialized: Recipient = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, recipient);
    }

    #[test]
    fn test_recipient_hash() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        let recipient = Recipient::new("hash@example.com");
        map.insert(recipient.clone(), 42);
        assert_eq!(map.get(&recipient), Some(&42));
    }
}
