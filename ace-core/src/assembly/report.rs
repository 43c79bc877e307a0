//! Resolution report
//!
//! Every pass records, for each descriptor, the terminal state it reached
//! and a human-readable detail (the first condition that failed, the
//! competing candidates that triggered suppression, ...). The report is
//! serializable and frozen together with the registry, so the outcome of
//! a pass can be audited after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a descriptor during resolution
///
/// `ConditionsUnmet`, `Active` and `Suppressed` are terminal; `Candidate`
/// only appears mid-pass for instances awaiting ambiguity finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorState {
    /// Not yet processed
    Pending,
    /// A condition was false (or failed to evaluate), or a hard
    /// dependency was absent; the descriptor was skipped
    ConditionsUnmet,
    /// Conditions held and the instance was constructed, awaiting
    /// cardinality finalization
    Candidate,
    /// Activated and inserted into the registry
    Active,
    /// Constructed but deliberately not activated due to an ambiguity
    /// conflict
    Suppressed,
}

impl DescriptorState {
    /// True for states a descriptor can end the pass in
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DescriptorState::ConditionsUnmet
                | DescriptorState::Active
                | DescriptorState::Suppressed
        )
    }

    /// True when the descriptor produced a registered instance
    pub fn is_active(&self) -> bool {
        matches!(self, DescriptorState::Active)
    }
}

impl std::fmt::Display for DescriptorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DescriptorState::Pending => write!(f, "pending"),
            DescriptorState::ConditionsUnmet => write!(f, "conditions_unmet"),
            DescriptorState::Candidate => write!(f, "candidate"),
            DescriptorState::Active => write!(f, "active"),
            DescriptorState::Suppressed => write!(f, "suppressed"),
        }
    }
}

/// Outcome of a single descriptor in a pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Descriptor id
    pub descriptor_id: String,
    /// Capability the descriptor provides
    pub capability: String,
    /// Terminal state
    pub state: DescriptorState,
    /// Human-readable explanation for non-active outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-descriptor outcome record for one resolution pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// Unique id of the pass
    pub pass_id: String,
    /// When the pass completed
    pub timestamp: DateTime<Utc>,
    /// One entry per registered descriptor, in declaration order
    pub entries: Vec<ReportEntry>,
}

impl ResolutionReport {
    pub(crate) fn new(entries: Vec<ReportEntry>) -> Self {
        Self {
            pass_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            entries,
        }
    }

    /// Entry for a descriptor id
    pub fn entry(&self, descriptor_id: &str) -> Option<&ReportEntry> {
        self.entries
            .iter()
            .find(|e| e.descriptor_id == descriptor_id)
    }

    /// All entries in declaration order
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Entries that reached a given state
    pub fn with_state(&self, state: DescriptorState) -> Vec<&ReportEntry> {
        self.entries.iter().filter(|e| e.state == state).collect()
    }

    /// One-line summary of the pass
    pub fn summary(&self) -> String {
        let active = self.with_state(DescriptorState::Active).len();
        let unmet = self.with_state(DescriptorState::ConditionsUnmet).len();
        let suppressed = self.with_state(DescriptorState::Suppressed).len();
        format!(
            "{} of {} active, {} conditions unmet, {} suppressed",
            active,
            self.entries.len(),
            unmet,
            suppressed
        )
    }
}
