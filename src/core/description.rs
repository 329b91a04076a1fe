//! Immutable action descriptions and their deduplication hash.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{MaintenanceError, MaintenanceResult};

/// Key naming the action kind. Mandatory in every description.
pub const NAME: &str = "name";
/// Database the action operates on.
pub const DATABASE: &str = "database";
/// Collection the action operates on.
pub const COLLECTION: &str = "collection";
/// Shard the action operates on.
pub const SHARD: &str = "shard";

/// Description of one desired maintenance action.
///
/// Keys are held in canonical (sorted) order, so two descriptions built from
/// the same pairs in any insertion order are equal and hash identically. The
/// hash is computed once at construction and is stable across processes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct ActionDescription {
    properties: BTreeMap<String, String>,
    hash: u64,
}

impl ActionDescription {
    /// Build a description from a property map.
    ///
    /// # Errors
    ///
    /// Returns `MaintenanceError::InvalidParameter` if the `name` key is
    /// missing or empty.
    pub fn new(properties: BTreeMap<String, String>) -> MaintenanceResult<Self> {
        match properties.get(NAME) {
            Some(name) if !name.is_empty() => {}
            Some(_) => {
                return Err(MaintenanceError::InvalidParameter(
                    "\"name\" field must not be empty".into(),
                ))
            }
            None => {
                return Err(MaintenanceError::InvalidParameter(
                    "description lacks required \"name\" field".into(),
                ))
            }
        }
        let hash = content_hash(&properties);
        Ok(Self { properties, hash })
    }

    /// Build a description from key/value pairs.
    ///
    /// # Errors
    ///
    /// Same as [`ActionDescription::new`].
    pub fn from_pairs<I, K, V>(pairs: I) -> MaintenanceResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The action kind.
    #[must_use]
    pub fn name(&self) -> &str {
        self.properties.get(NAME).map_or("", String::as_str)
    }

    /// Look up a single parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Whether the description carries `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// All properties, including `name`.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Iterate over properties in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of properties, including `name`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Always false: a valid description holds at least `name`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Deduplication hash of the full content.
    #[must_use]
    pub const fn hash(&self) -> u64 {
        self.hash
    }
}

impl TryFrom<BTreeMap<String, String>> for ActionDescription {
    type Error = MaintenanceError;

    fn try_from(properties: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::new(properties)
    }
}

impl From<ActionDescription> for BTreeMap<String, String> {
    fn from(description: ActionDescription) -> Self {
        description.properties
    }
}

impl fmt::Debug for ActionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescription")
            .field("properties", &self.properties)
            .field("hash", &format_args!("{:#018x}", self.hash))
            .finish()
    }
}

impl fmt::Display for ActionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())?;
        let mut first = true;
        for (key, value) in self.iter().filter(|(k, _)| *k != NAME) {
            f.write_str(if first { "(" } else { ", " })?;
            write!(f, "{key}={value}")?;
            first = false;
        }
        if !first {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// BLAKE3 over length-prefixed pairs in key order, truncated to 64 bits.
fn content_hash(properties: &BTreeMap<String, String>) -> u64 {
    let mut hasher = blake3::Hasher::new();
    for (key, value) in properties {
        hasher.update(&(key.len() as u64).to_le_bytes());
        hasher.update(key.as_bytes());
        hasher.update(&(value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    }
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}
