//! Explains and validates Linkerd authorization policy.
//!
//! This crate ties the analyzer's components together:
//!
//! - [`k8s`] holds the Linkerd policy resource types;
//! - [`index`] resolves which workloads may reach which `Server`s;
//! - [`validation`] checks resources for misconfiguration;
//! - [`runtime`] loads objects from manifests and drives the CLI.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use linkerd_policy_analyzer_core as core;
pub use linkerd_policy_analyzer_k8s_api as k8s;
pub use linkerd_policy_analyzer_k8s_index as index;
pub use linkerd_policy_analyzer_k8s_validation as validation;
pub use linkerd_policy_analyzer_runtime as runtime;

pub use self::{
    index::{ClusterInfo, MemorySource, ObjectSource, Resolver, ServerMatch},
    validation::Validator,
};
