//! Manufacturing process models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{CargoMap, EntityKind, Movable};
use crate::types::SiteRef;

/// Kinds of transformation a process performs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    Process,
    Split,
    Merge,
    Scrap,
    Adjustment,
}

impl ProcessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessType::Process => "process",
            ProcessType::Split => "split",
            ProcessType::Merge => "merge",
            ProcessType::Scrap => "scrap",
            ProcessType::Adjustment => "adjustment",
        }
    }

    /// Atomic types complete in the same operation that creates them
    pub fn is_atomic(&self) -> bool {
        !matches!(self, ProcessType::Process)
    }
}

impl std::fmt::Display for ProcessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Process lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    #[default]
    Processing,
    Processed,
    Cancelled,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Processing => "processing",
            ProcessStatus::Processed => "processed",
            ProcessStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessStatus::Processing)
    }

    pub fn can_transition_to(&self, next: ProcessStatus) -> bool {
        matches!(
            (self, next),
            (ProcessStatus::Processing, ProcessStatus::Processing)
                | (ProcessStatus::Processing, ProcessStatus::Processed)
        )
    }
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a process within its company
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessKey {
    pub company: String,
    pub process_id: String,
}

impl ProcessKey {
    pub fn new(company: impl Into<String>, process_id: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            process_id: process_id.into(),
        }
    }
}

impl std::fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.company, self.process_id)
    }
}

/// A transformation of inputs into outputs at one site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Process {
    pub company: String,
    pub process_id: String,
    pub process_type: ProcessType,
    pub site: String,
    pub machine: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: ProcessStatus,
    pub inputs: CargoMap,
    pub outputs: CargoMap,
    pub description: Option<String>,
    pub version: String,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Process {
    pub fn key(&self) -> ProcessKey {
        ProcessKey::new(self.company.clone(), self.process_id.clone())
    }

    pub fn site_ref(&self) -> SiteRef {
        SiteRef::new(self.company.clone(), self.site.clone())
    }
}

impl Movable for Process {
    fn kind(&self) -> EntityKind {
        EntityKind::Process
    }

    fn id(&self) -> String {
        self.process_id.clone()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn site_for_refund(&self) -> SiteRef {
        self.site_ref()
    }

    fn site_for_credit(&self) -> SiteRef {
        self.site_ref()
    }
}

/// Input for creating a process
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProcessInput {
    /// Owning company; defaults to the caller's company
    #[validate(length(min = 1, message = "company is missing"))]
    pub company: Option<String>,
    #[validate(length(min = 1, message = "process id is missing"))]
    pub process_id: String,
    pub process_type: ProcessType,
    #[validate(length(min = 1, message = "site is missing"))]
    pub site: String,
    pub machine: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<ProcessStatus>,
    #[serde(default)]
    pub inputs: CargoMap,
    #[serde(default)]
    pub outputs: CargoMap,
    pub description: Option<String>,
    pub version: Option<String>,
    pub request_id: Option<Uuid>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Partial update of a process; input/output lines carry new quantities
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EditProcessInput {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub machine: Option<String>,
    pub status: Option<ProcessStatus>,
    pub description: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub input_deltas: CargoMap,
    #[serde(default)]
    pub output_deltas: CargoMap,
    pub request_id: Option<Uuid>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Request metadata for cancel and delete
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoveProcessInput {
    pub request_id: Option<Uuid>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Process listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessFilter {
    pub company: Option<String>,
    pub site: Option<String>,
    pub status: Option<ProcessStatus>,
    pub process_type: Option<ProcessType>,
}

impl ProcessFilter {
    pub fn matches(&self, process: &Process) -> bool {
        self.company.as_ref().map_or(true, |c| *c == process.company)
            && self.site.as_ref().map_or(true, |s| *s == process.site)
            && self.status.map_or(true, |s| s == process.status)
            && self.process_type.map_or(true, |t| t == process.process_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_types() {
        assert!(!ProcessType::Process.is_atomic());
        for t in [
            ProcessType::Split,
            ProcessType::Merge,
            ProcessType::Scrap,
            ProcessType::Adjustment,
        ] {
            assert!(t.is_atomic(), "{} should be atomic", t);
        }
    }

    #[test]
    fn test_status_transitions() {
        assert!(ProcessStatus::Processing.can_transition_to(ProcessStatus::Processed));
        assert!(!ProcessStatus::Processed.can_transition_to(ProcessStatus::Processed));
        assert!(!ProcessStatus::Processing.can_transition_to(ProcessStatus::Cancelled));
        assert!(ProcessStatus::Cancelled.is_terminal());
    }
}
