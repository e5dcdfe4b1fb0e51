use crate::{SourceRef, WorkloadRef};
use serde::Serialize;

/// Describes whether a source workload may reach a target workload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Connectivity {
    pub source: SourceRef,
    pub target: WorkloadRef,
    pub allowed: bool,
    /// Servers selecting the target workload.
    pub servers: Vec<String>,
    /// Policies that authorize the source.
    pub policies: Vec<String>,
    pub explanation: String,
}
