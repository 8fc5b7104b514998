use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Value};

use crate::key::{Key, KeyDomain};

/// The canonical identity of a data record: an ordered, domain-sorted list of
/// `(domain, value)` pairs. Two node names are equal iff their key sequences
/// are pairwise equal in (domain-sorted) order.
#[derive(Debug, Clone, Default, Hash)]
pub struct NodeName {
    keys: Vec<Key>,
}

impl NodeName {
    /// The empty node name; compares equal to any other empty node name.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a node name from an unordered list of keys, canonicalizing by
    /// sorting on domain the same way the JSON-object and channel
    /// constructors do.
    #[must_use]
    pub fn from_keys(mut keys: Vec<Key>) -> Self {
        keys.sort_by(|a, b| a.domain().cmp(b.domain()));
        Self { keys }
    }

    /// Builds a node name from a JSON object, sorting its keys by domain
    /// name. Non-string values are stringified via their JSON representation.
    #[must_use]
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let keys = object
            .iter()
            .map(|(domain, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Key::new(KeyDomain::new(domain.clone()), value)
            })
            .collect();

        Self::from_keys(keys)
    }

    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Looks up the key carrying the given domain, if one exists.
    #[must_use]
    pub fn find_key(&self, domain: &KeyDomain) -> Option<&Key> {
        self.keys
            .binary_search_by(|k| k.domain().cmp(domain))
            .ok()
            .map(|index| &self.keys[index])
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in &self.keys {
            write!(f, "/{key}")?;
        }
        Ok(())
    }
}

impl PartialEq for NodeName {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl Eq for NodeName {}

impl PartialOrd for NodeName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeName {
    /// Ordering is lexicographic first by length, then element-wise; two
    /// node names with a different number of keys never interleave by
    /// their shared prefix.
    fn cmp(&self, other: &Self) -> Ordering {
        self.keys
            .len()
            .cmp(&other.keys.len())
            .then_with(|| self.keys.cmp(&other.keys))
    }
}
