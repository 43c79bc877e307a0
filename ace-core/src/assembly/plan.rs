//! Resolution ordering
//!
//! Descriptors are processed in topological order of their dependency
//! edges: a descriptor that requires, orders after, or counts capability X
//! comes after every descriptor providing X. Declaration order breaks
//! ties, so the resulting order is stable across passes.
//!
//! A cycle (including a descriptor depending on its own capability) is a
//! fatal configuration error detected here, before anything is
//! constructed.

use std::collections::{BTreeSet, HashMap};

use crate::catalog::Catalog;
use crate::error::{AceError, Result};

/// Stable processing order over a catalog's descriptors
#[derive(Debug)]
pub(crate) struct AssemblyPlan {
    /// Descriptor indices in processing order
    pub(crate) order: Vec<usize>,
}

impl AssemblyPlan {
    pub(crate) fn build(catalog: &Catalog) -> Result<Self> {
        let descriptors = catalog.descriptors();
        let n = descriptors.len();

        let mut providers: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, descriptor) in descriptors.iter().enumerate() {
            providers
                .entry(descriptor.capability())
                .or_default()
                .push(idx);
        }

        // Provider -> consumer edges
        let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        let mut in_degree = vec![0usize; n];
        for (idx, descriptor) in descriptors.iter().enumerate() {
            let mut observed: BTreeSet<&str> = BTreeSet::new();
            observed.extend(descriptor.requires().iter().map(String::as_str));
            observed.extend(descriptor.after().iter().map(String::as_str));
            for condition in descriptor.conditions() {
                condition.referenced_capabilities(&mut observed);
            }

            for capability in observed {
                let Some(sources) = providers.get(capability) else {
                    continue;
                };
                for &source in sources {
                    if successors[source].insert(idx) {
                        in_degree[idx] += 1;
                    }
                }
            }
        }

        // Kahn's algorithm; the ready set is drained smallest declaration
        // index first so the order is deterministic.
        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &succ in &successors[next] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.insert(succ);
                }
            }
        }

        if order.len() != n {
            let placed: BTreeSet<usize> = order.iter().copied().collect();
            let cycle: Vec<String> = (0..n)
                .filter(|i| !placed.contains(i))
                .map(|i| descriptors[i].id().to_string())
                .collect();
            return Err(AceError::CyclicDependency { cycle });
        }

        Ok(Self { order })
    }
}
