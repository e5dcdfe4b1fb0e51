//! Linkerd Policy Analyzer index
//!
//! Resolves authorization relationships over a snapshot of Linkerd policy
//! resources:
//!
//! - Each `Server` selects over pods in its namespace and names a port.
//! - Each `AuthorizationPolicy` targets a `Server` by name and requires one of
//!   its `MeshTLSAuthentication` or `NetworkAuthentication` references to be
//!   satisfied.
//! - A `MeshTLSAuthentication` lists mesh identities and service accounts.
//!
//! ```text
//! [ Pod ] <- [ Server ] <- [ AuthorizationPolicy ] -> [ *Authentication ]
//! ```
//!
//! The forward lookup starts from a client workload, resolves its identity from
//! a representative pod and walks every server's policies. The reverse lookup
//! starts from the servers of a target workload and expands each policy's
//! authentications into source descriptors.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod authentication;
mod authorization_policy;
mod authz;
mod cluster_info;
mod error;
pub mod graph;
pub mod identity;
mod resolver;
mod source;


pub use self::{
    authorization_policy::AuthenticationTarget,
    cluster_info::ClusterInfo,
    error::Error,
    graph::PolicyGraph,
    identity::ResolvedIdentity,
    resolver::{InvalidServerMatch, Resolver, ServerMatch},
    source::{MemorySource, ObjectSource},
};
