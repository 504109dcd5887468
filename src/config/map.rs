//! Flat key/value mapping shared by every configuration source.

use std::collections::{btree_map, BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::error::ConversionError;
use super::value::{ConfigValue, Slot};
use super::SEPARATOR;

/// Mapping from `__`-joined keys to raw string values.
///
/// Later writes replace earlier ones key-for-key. Iteration is sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Map {
    entries: BTreeMap<String, String>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` at `key`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Applies every entry of `other`, which wins on key collisions.
    pub fn merge(&mut self, other: Map) {
        self.entries.extend(other.entries);
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Looks up a nested key given as separate path segments.
    ///
    /// `lookup_path(&["Database", "Port"])` reads the same entry as
    /// `lookup("Database__Port")`.
    pub fn lookup_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&str> {
        let key = path
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        self.lookup(&key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Converts the value at `key` into `target`'s type and stores it.
    pub fn unmarshal<T: Slot + ?Sized>(
        &self,
        key: &str,
        target: &mut T,
    ) -> Result<(), ConversionError> {
        let raw = self.lookup(key).ok_or_else(|| ConversionError::Missing {
            key: key.to_string(),
        })?;
        target.assign(key, raw)
    }

    /// Reads the value at `key` as a fresh `T`.
    pub fn get<T: ConfigValue>(&self, key: &str) -> Result<T, ConversionError> {
        let raw = self.lookup(key).ok_or_else(|| ConversionError::Missing {
            key: key.to_string(),
        })?;
        T::parse_config(raw).map_err(|source| ConversionError::Invalid {
            key: key.to_string(),
            expected: T::TYPE_NAME,
            value: raw.to_string(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Map::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Map {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Map {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl From<HashMap<String, String>> for Map {
    fn from(entries: HashMap<String, String>) -> Self {
        entries.into_iter().collect()
    }
}

impl IntoIterator for Map {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_set_wins() {
        let mut map = Map::new();
        map.set("key", "first");
        map.set("key", "second");
        assert_eq!(map.lookup("key"), Some("second"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_merge_overrides_per_key_and_keeps_siblings() {
        let mut a = Map::from([("shared", "a"), ("only_a", "a")]);
        let b = Map::from([("shared", "b"), ("only_b", "b")]);
        a.merge(b);

        assert_eq!(
            a,
            Map::from([("shared", "b"), ("only_a", "a"), ("only_b", "b")])
        );
    }

    #[test]
    fn test_nested_lookup_by_joined_key_or_path() {
        let map = Map::from([("Database__Port", "5432")]);
        assert_eq!(map.lookup("Database__Port"), Some("5432"));
        assert_eq!(map.lookup_path(&["Database", "Port"]), Some("5432"));
        assert_eq!(map.lookup_path(&["Database"]), None);
    }

    #[test]
    fn test_unmarshal_into_typed_target() {
        let map = Map::from([("Port", "8080"), ("Debug", "true")]);

        let mut port = 0u16;
        map.unmarshal("Port", &mut port).unwrap();
        assert_eq!(port, 8080);

        let debug: bool = map.get("Debug").unwrap();
        assert!(debug);
    }

    #[test]
    fn test_unmarshal_reports_missing_and_invalid() {
        let map = Map::from([("Port", "http")]);

        let missing = map.get::<u16>("Host").unwrap_err();
        assert!(matches!(missing, ConversionError::Missing { ref key } if key == "Host"));

        let invalid = map.get::<u16>("Port").unwrap_err();
        assert_eq!(invalid.key(), "Port");
        assert!(matches!(
            invalid,
            ConversionError::Invalid { expected: "u16", ref value, .. } if value == "http"
        ));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let map = Map::from([("b", "2"), ("a", "1")]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"a":"1","b":"2"}"#);

        let back: Map = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
