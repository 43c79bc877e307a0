//! Component catalog
//!
//! The catalog is the declarative input to a resolution pass: an ordered
//! set of [`ComponentDescriptor`]s, each pairing a construction recipe
//! with the conditions under which it activates. Declaration order is
//! preserved and is the tie-breaker for resolution order, so a catalog
//! resolved twice against the same snapshot yields the same registry.

mod condition;
mod descriptor;

pub use condition::Condition;
pub use descriptor::{CardinalityPolicy, ComponentDescriptor, Constructor};

use std::collections::HashMap;

use crate::error::{AceError, Result};

/// An ordered, id-indexed set of component descriptors
#[derive(Debug, Default)]
pub struct Catalog {
    descriptors: Vec<ComponentDescriptor>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor
    ///
    /// Descriptor ids must be unique; registration order is the
    /// declaration order used for resolution tie-breaking.
    pub fn register(&mut self, descriptor: ComponentDescriptor) -> Result<()> {
        if self.by_id.contains_key(descriptor.id()) {
            return Err(AceError::DuplicateDescriptor {
                descriptor_id: descriptor.id().to_string(),
            });
        }
        self.by_id
            .insert(descriptor.id().to_string(), self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Register several descriptors in order
    pub fn register_all(
        &mut self,
        descriptors: impl IntoIterator<Item = ComponentDescriptor>,
    ) -> Result<()> {
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        Ok(())
    }

    /// Get a descriptor by id
    pub fn get(&self, id: &str) -> Option<&ComponentDescriptor> {
        self.by_id.get(id).map(|&idx| &self.descriptors[idx])
    }

    /// All descriptors in declaration order
    pub fn descriptors(&self) -> &[ComponentDescriptor] {
        &self.descriptors
    }

    /// Descriptors providing a capability, in declaration order
    pub fn providers_of(&self, capability: &str) -> Vec<&ComponentDescriptor> {
        self.descriptors
            .iter()
            .filter(|d| d.capability() == capability)
            .collect()
    }

    /// Number of registered descriptors
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True when no descriptor is registered
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Validate the catalog structure
    ///
    /// Checked before every pass: empty identifiers and capability keys,
    /// and capability keys claimed under more than one cardinality policy,
    /// are configuration errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = vec![];

        for descriptor in &self.descriptors {
            if descriptor.id().is_empty() {
                errors.push("descriptor id cannot be empty".to_string());
            }
            if descriptor.capability().is_empty() {
                errors.push(format!(
                    "descriptor '{}' has an empty capability key",
                    descriptor.id()
                ));
            }
            for dep in descriptor.requires().iter().chain(descriptor.after()) {
                if dep.is_empty() {
                    errors.push(format!(
                        "descriptor '{}' references an empty capability key",
                        descriptor.id()
                    ));
                }
            }
        }

        let mut policies: HashMap<&str, CardinalityPolicy> = HashMap::new();
        for descriptor in &self.descriptors {
            match policies.entry(descriptor.capability()) {
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(descriptor.policy());
                }
                std::collections::hash_map::Entry::Occupied(entry) => {
                    if *entry.get() != descriptor.policy() {
                        errors.push(format!(
                            "capability '{}' is claimed under mixed cardinality policies ({} and {})",
                            descriptor.capability(),
                            entry.get(),
                            descriptor.policy()
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
