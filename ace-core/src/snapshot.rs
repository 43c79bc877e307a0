//! Environment snapshot
//!
//! An [`EnvSnapshot`] is the immutable view of the runtime environment a
//! resolution pass runs against: configuration properties plus the set of
//! optional-capability markers (the "is library X available" signal,
//! without linking against X).
//!
//! One snapshot is captured per pass and never mutated afterwards, so
//! conditions can be re-evaluated at any point with identical results.
//! Concurrent passes each capture their own snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Provider of environment data for snapshot capture
///
/// Abstracts where properties and markers come from (process environment,
/// property files, a test fixture). The engine only ever sees the captured
/// [`EnvSnapshot`].
pub trait SnapshotSource {
    /// Configuration properties as key/value pairs
    fn properties(&self) -> BTreeMap<String, String>;

    /// Markers for optional capabilities that are available
    fn markers(&self) -> BTreeSet<String>;
}

/// Immutable view of configuration properties and available optional
/// capabilities at resolution time
///
/// Ordered storage keeps iteration deterministic across passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvSnapshot {
    /// Property key -> value
    properties: BTreeMap<String, String>,

    /// Available optional-capability markers
    markers: BTreeSet<String>,
}

impl EnvSnapshot {
    /// Create a snapshot builder
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Capture a snapshot from a source
    pub fn from_source(source: &dyn SnapshotSource) -> Self {
        Self {
            properties: source.properties(),
            markers: source.markers(),
        }
    }

    /// Get a property value
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|v| v.as_str())
    }

    /// Get a property value, falling back to a default
    pub fn property_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.property(key).unwrap_or(default)
    }

    /// Get a property parsed into a typed value
    ///
    /// Returns `None` when the property is absent or fails to parse.
    pub fn property_as<T: FromStr>(&self, key: &str) -> Option<T> {
        self.property(key).and_then(|v| v.parse().ok())
    }

    /// True iff the property is set to a non-empty value
    pub fn has_property(&self, key: &str) -> bool {
        self.property(key).is_some_and(|v| !v.is_empty())
    }

    /// True iff the optional-capability marker is available
    pub fn has_marker(&self, name: &str) -> bool {
        self.markers.contains(name)
    }

    /// Properties whose keys start with `prefix`, with the prefix stripped
    pub fn properties_with_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        self.properties
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(prefix)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_string(), v.clone()))
            })
            .collect()
    }

    /// All properties
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// All available markers
    pub fn markers(&self) -> &BTreeSet<String> {
        &self.markers
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True when the snapshot holds no properties and no markers
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.markers.is_empty()
    }
}

/// Builder for [`EnvSnapshot`]
#[derive(Debug, Clone, Default)]
pub struct SnapshotBuilder {
    properties: BTreeMap<String, String>,
    markers: BTreeSet<String>,
}

impl SnapshotBuilder {
    /// Set a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set several properties at once
    pub fn with_properties<K, V>(mut self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.properties
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Mark an optional capability as available
    pub fn with_marker(mut self, name: impl Into<String>) -> Self {
        self.markers.insert(name.into());
        self
    }

    /// Finalize the snapshot
    pub fn build(self) -> EnvSnapshot {
        EnvSnapshot {
            properties: self.properties,
            markers: self.markers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let snapshot = EnvSnapshot::builder()
            .with_property("info.app", "demo")
            .with_property("pool.size", "8")
            .with_marker("migration-library")
            .build();

        assert_eq!(snapshot.property("info.app"), Some("demo"));
        assert_eq!(snapshot.property("missing"), None);
        assert_eq!(snapshot.property_or("missing", "fallback"), "fallback");
        assert!(snapshot.has_marker("migration-library"));
        assert!(!snapshot.has_marker("vcs-metadata"));
    }

    #[test]
    fn test_has_property_requires_non_empty_value() {
        let snapshot = EnvSnapshot::builder()
            .with_property("set", "value")
            .with_property("blank", "")
            .build();

        assert!(snapshot.has_property("set"));
        assert!(!snapshot.has_property("blank"));
        assert!(!snapshot.has_property("absent"));
    }

    #[test]
    fn test_typed_property_access() {
        let snapshot = EnvSnapshot::builder()
            .with_property("pool.size", "8")
            .with_property("pool.name", "main")
            .build();

        assert_eq!(snapshot.property_as::<u32>("pool.size"), Some(8));
        assert_eq!(snapshot.property_as::<u32>("pool.name"), None);
        assert_eq!(snapshot.property_as::<u32>("absent"), None);
    }

    #[test]
    fn test_prefix_query_strips_prefix() {
        let snapshot = EnvSnapshot::builder()
            .with_property("info.foo", "bar")
            .with_property("info.build.version", "1.2.3")
            .with_property("other.key", "x")
            .with_property("info.", "dangling")
            .build();

        let scoped = snapshot.properties_with_prefix("info.");
        assert_eq!(scoped.get("foo").map(String::as_str), Some("bar"));
        assert_eq!(
            scoped.get("build.version").map(String::as_str),
            Some("1.2.3")
        );
        assert_eq!(scoped.len(), 2);
    }

    #[test]
    fn test_from_source() {
        struct Fixture;

        impl SnapshotSource for Fixture {
            fn properties(&self) -> BTreeMap<String, String> {
                BTreeMap::from([("a".to_string(), "1".to_string())])
            }

            fn markers(&self) -> BTreeSet<String> {
                BTreeSet::from(["m".to_string()])
            }
        }

        let snapshot = EnvSnapshot::from_source(&Fixture);
        assert_eq!(snapshot.property("a"), Some("1"));
        assert!(snapshot.has_marker("m"));
    }

    #[test]
    fn test_serialization_round_trip() {
        let snapshot = EnvSnapshot::builder()
            .with_property("k", "v")
            .with_marker("m")
            .build();

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: EnvSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
