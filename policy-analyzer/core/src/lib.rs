#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Result types shared by the policy resolver and the configuration validator.

pub mod connectivity;
mod identity_match;
pub mod services;
pub mod sources;
pub mod targets;
pub mod validation;

pub use self::{
    connectivity::Connectivity,
    identity_match::IdentityMatch,
    services::{MeshedService, MeshedServices},
    sources::{AllowedSources, NoMatchingServers, SourceDescriptor, SourceKind, SourcesLookup},
    targets::{AllowedTargets, SourceRef, TargetDescriptor, TargetPort, WorkloadRef},
    validation::{ClusterValidationReport, Issue, Severity, ValidationResult, ValidationSummary},
};

/// The identity that matches every authenticated client.
pub const WILDCARD_IDENTITY: &str = "*";
