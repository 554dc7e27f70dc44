//! Secret handling for credential attributes
//!
//! User-credential attributes carry password hashes between installations.
//! They are held in a [`SecretString`] so they are zeroized on drop and never
//! show up in `Debug` output or log fields.
//!
//! ```rust
//! use ferry::domain::secret::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let hash = secret_string("$2y$10$abcdef".to_string());
//! assert_eq!(hash.expose_secret().as_ref(), "$2y$10$abcdef");
//! assert!(!format!("{hash:?}").contains("abcdef"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Type alias for a secret string
pub type SecretString = Secret<SecretValue>;

/// Wraps a plain string into a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Compares two secrets by value without exposing either to callers
pub fn secrets_equal(a: &SecretString, b: &SecretString) -> bool {
    a.expose_secret().as_ref() == b.expose_secret().as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("hash".to_string());
        assert_eq!(secret.expose_secret(), "hash");
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("sensitive-hash".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("sensitive-hash"));
    }

    #[test]
    fn test_secrets_equal() {
        let a = secret_string("x".to_string());
        let b = secret_string("x".to_string());
        let c = secret_string("y".to_string());
        assert!(secrets_equal(&a, &b));
        assert!(!secrets_equal(&a, &c));
    }

    #[test]
    fn test_secret_serde() {
        #[derive(Serialize, Deserialize)]
        struct Account {
            password_hash: SecretString,
        }

        let account = Account {
            password_hash: secret_string("abc123".to_string()),
        };
        let json = serde_json::to_string(&account).unwrap();
        assert!(json.contains("abc123"));

        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back.password_hash.expose_secret(), "abc123");
    }
}
