//! Domain identifier types with validation
//!
//! Portable identifiers travel inside bundles and are stable across
//! installations. Local identifiers are assigned by a destination store and
//! never leave it, except as optional hints inside an exported record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Portable identifier (UUID-like) shared between installations
///
/// Content objects, tree nodes, files and tags are addressed by a portable
/// identifier. The value is opaque: installations typically use 32 hex
/// characters, but any non-empty string without whitespace is accepted.
///
/// # Examples
///
/// ```
/// use ferry::domain::ids::PortableId;
/// use std::str::FromStr;
///
/// let id = PortableId::from_str("f5c88a2209584891056f987fa9d8a13a").unwrap();
/// assert_eq!(id.as_str(), "f5c88a2209584891056f987fa9d8a13a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortableId(String);

impl PortableId {
    /// Creates a new PortableId from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(PortableId)` if the ID is valid, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Portable identifier cannot be empty".to_string());
        }
        if id.chars().any(char::is_whitespace) {
            return Err(format!(
                "Portable identifier cannot contain whitespace, got: '{id}'"
            ));
        }
        Ok(Self(id))
    }

    /// Generates a fresh random identifier in the 32-hex-character form
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PortableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PortableId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PortableId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PortableId> for String {
    fn from(id: PortableId) -> Self {
        id.0
    }
}

impl AsRef<str> for PortableId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Destination-local content object identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Destination-local tree node identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content type (class) identifier, e.g. `article`
///
/// # Examples
///
/// ```
/// use ferry::domain::ids::ClassIdentifier;
///
/// let class = ClassIdentifier::new("folder").unwrap();
/// assert_eq!(class.to_string(), "folder");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClassIdentifier(String);

impl ClassIdentifier {
    /// Creates a new ClassIdentifier, rejecting empty values
    pub fn new(identifier: impl Into<String>) -> Result<Self, String> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err("Class identifier cannot be empty".to_string());
        }
        Ok(Self(identifier))
    }

    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClassIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ClassIdentifier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClassIdentifier> for String {
    fn from(id: ClassIdentifier) -> Self {
        id.0
    }
}

impl AsRef<str> for ClassIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
