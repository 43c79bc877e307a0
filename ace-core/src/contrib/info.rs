//! Info components
//!
//! The info capability exposes descriptive key/value data about the
//! assembled application. [`InfoContributor`]s each supply a partial map;
//! the [`InfoAggregator`] merges them, later contributors overriding
//! earlier ones on key collision.
//!
//! Built-ins:
//! - [`PropertiesInfoContributor`] lifts `info.`-prefixed snapshot
//!   properties into the map with the prefix stripped
//!   (`info.foo=bar` -> `foo: "bar"`)
//! - [`VcsInfoContributor`] reads version-control metadata through a
//!   [`VcsMetadataReader`]; when no metadata is available the `git` key is
//!   simply absent

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::{CardinalityPolicy, ComponentDescriptor, Condition};
use crate::registry::instance;
use crate::snapshot::EnvSnapshot;

use super::{capability, marker};

/// Property prefix lifted into the info map
pub const INFO_PROPERTY_PREFIX: &str = "info.";

/// A source of descriptive application data
pub trait InfoContributor: Send + Sync {
    /// Keys and values to merge into the info map
    fn contribute(&self) -> BTreeMap<String, Value>;
}

/// Contributor over `info.`-prefixed snapshot properties
///
/// The entries are captured at construction time from the pass snapshot,
/// so the contributor stays pure afterwards.
pub struct PropertiesInfoContributor {
    entries: BTreeMap<String, Value>,
}

impl PropertiesInfoContributor {
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        let entries = snapshot
            .properties_with_prefix(INFO_PROPERTY_PREFIX)
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect();
        Self { entries }
    }
}

impl InfoContributor for PropertiesInfoContributor {
    fn contribute(&self) -> BTreeMap<String, Value> {
        self.entries.clone()
    }
}

/// Version-control metadata for the running build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsMetadata {
    /// Branch the build was produced from
    pub branch: String,
    /// Commit identifier
    pub commit_id: String,
    /// Commit timestamp, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_time: Option<String>,
}

/// External interface for reading version-control metadata
///
/// `None` means no metadata is available (e.g. not built from a
/// repository); the info map then carries no `git` key.
pub trait VcsMetadataReader: Send + Sync {
    fn read(&self) -> Option<VcsMetadata>;
}

/// Contributor exposing version-control metadata under the `git` key
pub struct VcsInfoContributor {
    reader: Arc<dyn VcsMetadataReader>,
}

impl VcsInfoContributor {
    pub fn new(reader: Arc<dyn VcsMetadataReader>) -> Self {
        Self { reader }
    }
}

impl InfoContributor for VcsInfoContributor {
    fn contribute(&self) -> BTreeMap<String, Value> {
        let Some(metadata) = self.reader.read() else {
            return BTreeMap::new();
        };

        let mut commit = json!({ "id": metadata.commit_id });
        if let Some(time) = metadata.commit_time {
            commit["time"] = Value::from(time);
        }
        BTreeMap::from([(
            "git".to_string(),
            json!({
                "branch": metadata.branch,
                "commit": commit,
            }),
        )])
    }
}

/// Aggregates every registered info contributor into one mapping
pub struct InfoAggregator {
    contributors: Vec<Arc<dyn InfoContributor>>,
}

impl InfoAggregator {
    pub fn new(contributors: Vec<Arc<dyn InfoContributor>>) -> Self {
        Self { contributors }
    }

    /// Number of contributing sources
    pub fn contributor_count(&self) -> usize {
        self.contributors.len()
    }

    /// Merge all contributors, later keys overriding earlier ones
    pub fn invoke(&self) -> BTreeMap<String, Value> {
        let mut merged = BTreeMap::new();
        for contributor in &self.contributors {
            merged.extend(contributor.contribute());
        }
        merged
    }
}

/// Descriptor for the snapshot-properties contributor
pub fn properties_info_descriptor() -> ComponentDescriptor {
    ComponentDescriptor::new("properties-info", capability::INFO_CONTRIBUTOR, |cx| {
        Ok(instance::<Arc<dyn InfoContributor>>(Arc::new(
            PropertiesInfoContributor::from_snapshot(cx.snapshot()),
        )))
    })
    .with_policy(CardinalityPolicy::AllowMultiple)
}

/// Descriptor for the version-control contributor
///
/// Guarded by the VCS metadata marker: without it the contributor stays
/// inactive and the info map has no `git` key.
pub fn vcs_info_descriptor(reader: Arc<dyn VcsMetadataReader>) -> ComponentDescriptor {
    ComponentDescriptor::new("vcs-info", capability::INFO_CONTRIBUTOR, move |_cx| {
        Ok(instance::<Arc<dyn InfoContributor>>(Arc::new(
            VcsInfoContributor::new(reader.clone()),
        )))
    })
    .with_policy(CardinalityPolicy::AllowMultiple)
    .with_condition(Condition::marker_present(marker::VCS_METADATA))
}

/// Descriptor for the info aggregator component
pub fn info_aggregator_descriptor() -> ComponentDescriptor {
    ComponentDescriptor::new("info", capability::INFO, |cx| {
        let contributors =
            cx.collect_all::<Arc<dyn InfoContributor>>(capability::INFO_CONTRIBUTOR);
        Ok(instance(InfoAggregator::new(contributors)))
    })
    .with_after(capability::INFO_CONTRIBUTOR)
}
