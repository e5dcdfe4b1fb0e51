//! Linkerd Policy Analyzer validation
//!
//! Checks Linkerd policy resources and proxy configuration annotations for
//! mistakes that the API server accepts but that leave traffic unauthorized
//! or misconfigured. Each resource yields a [`ValidationResult`] with coded
//! issues; results are gathered into a [`ClusterValidationReport`].
//!
//! Rules that depend on other objects (pods selected by a `Server`, a policy's
//! target, a referenced `ServiceAccount`) are evaluated against listings taken
//! once per validation. When such a listing fails, the rule is skipped or the
//! reference is treated as absent; the failure is logged and never aborts the
//! report.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod authorization_policy;
mod lookup;
mod malformed;
mod meshtls;
mod network;
mod proxy;
mod server;


use linkerd_policy_analyzer_core::{ClusterValidationReport, ValidationResult};
use linkerd_policy_analyzer_k8s_index::{ClusterInfo, ObjectSource};
use std::{fmt, str::FromStr};
use tracing::{info_span, Instrument};

/// Selects which resources are validated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ResourceType {
    Server,
    AuthorizationPolicy,
    MeshTLSAuthentication,
    NetworkAuthentication,
    /// Proxy annotations on namespaces, or on the pods of a namespace.
    Proxy,
    #[default]
    All,
}

#[derive(Debug, thiserror::Error)]
#[error(
    "Invalid resource_type. Must be one of: server, authpolicy, meshtls, networkauth, proxy, all"
)]
pub struct InvalidResourceType(String);

/// Validates the objects provided by an [`ObjectSource`].
#[derive(Clone, Debug)]
pub struct Validator<S> {
    source: S,
    cluster: ClusterInfo,
}

// === impl ResourceType ===

impl FromStr for ResourceType {
    type Err = InvalidResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "server" => Ok(Self::Server),
            "authpolicy" | "authorizationpolicy" => Ok(Self::AuthorizationPolicy),
            "meshtls" | "meshtlsauthentication" => Ok(Self::MeshTLSAuthentication),
            "networkauth" | "networkauthentication" => Ok(Self::NetworkAuthentication),
            "proxy" | "namespace" => Ok(Self::Proxy),
            "all" | "" => Ok(Self::All),
            s => Err(InvalidResourceType(s.to_string())),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => "server".fmt(f),
            Self::AuthorizationPolicy => "authpolicy".fmt(f),
            Self::MeshTLSAuthentication => "meshtls".fmt(f),
            Self::NetworkAuthentication => "networkauth".fmt(f),
            Self::Proxy => "proxy".fmt(f),
            Self::All => "all".fmt(f),
        }
    }
}

// === impl InvalidResourceType ===

impl InvalidResourceType {
    /// The rejected resource type.
    pub fn resource_type(&self) -> &str {
        &self.0
    }
}

// === impl Validator ===

impl<S: ObjectSource> Validator<S> {
    pub fn new(source: S, cluster: ClusterInfo) -> Self {
        Self { source, cluster }
    }

    /// Validates resources of `resource_type` in `namespace`, or in all
    /// namespaces.
    ///
    /// When `resource_name` is set, only results for resources with that name
    /// are reported. When `include_warnings` is false, only error issues are
    /// kept and each result's validity is recomputed from them.
    pub async fn validate_config(
        &self,
        namespace: Option<&str>,
        resource_type: &str,
        resource_name: Option<&str>,
        include_warnings: bool,
    ) -> Result<ClusterValidationReport, InvalidResourceType> {
        let resource_type = resource_type.parse::<ResourceType>()?;
        let namespace = namespace.filter(|ns| !ns.is_empty());
        let resource_name = resource_name.filter(|n| !n.is_empty());

        let span = info_span!(
            "validate_config",
            ns = ?namespace,
            %resource_type,
            name = ?resource_name,
        );
        async move {
            let results = self.validate(resource_type, namespace).await;

            let mut report = ClusterValidationReport::default();
            for mut result in results {
                if resource_name.is_some_and(|name| name != result.name) {
                    continue;
                }
                if !include_warnings {
                    result.retain_errors();
                }
                report.add_result(result);
            }

            let report = report.finalize();
            tracing::info!(
                resources = report.total_resources,
                valid = report.valid_resources,
                errors = report.summary.errors,
                "Validated configuration"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn validate(&self, resource_type: ResourceType, ns: Option<&str>) -> Vec<ValidationResult> {
        let source = &self.source;
        match resource_type {
            ResourceType::Server => server::validate_all(source, ns).await,
            ResourceType::AuthorizationPolicy => {
                authorization_policy::validate_all(source, ns).await
            }
            ResourceType::MeshTLSAuthentication => {
                meshtls::validate_all(source, &self.cluster, ns).await
            }
            ResourceType::NetworkAuthentication => network::validate_all(source, ns).await,
            ResourceType::Proxy => proxy::validate_all(source, ns).await,
            ResourceType::All => {
                let (servers, policies, meshtls, network, proxy) = futures::join!(
                    server::validate_all(source, ns),
                    authorization_policy::validate_all(source, ns),
                    meshtls::validate_all(source, &self.cluster, ns),
                    network::validate_all(source, ns),
                    proxy::validate_all(source, ns),
                );
                servers
                    .into_iter()
                    .chain(policies)
                    .chain(meshtls)
                    .chain(network)
                    .chain(proxy)
                    .collect()
            }
        }
    }
}
