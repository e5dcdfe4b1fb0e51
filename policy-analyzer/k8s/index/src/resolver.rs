use crate::{
    authorization_policy::AuthenticationTarget,
    error::{required, Error},
    graph::{PolicyRef, ServerRef},
    identity::{self, ResolvedIdentity},
    ClusterInfo, ObjectSource, PolicyGraph,
};
use linkerd_policy_analyzer_core::{
    AllowedSources, AllowedTargets, Connectivity, IdentityMatch, MeshedServices, NoMatchingServers,
    SourceDescriptor, SourceKind, SourcesLookup, TargetDescriptor, TargetPort, WorkloadRef,
};
use linkerd_policy_analyzer_k8s_api::{
    self as k8s,
    labels::{Labels, Selector},
    Pod, ResourceExt,
};
use std::{fmt, str::FromStr};
use tracing::{info_span, Instrument};

/// Determines which `Server`s belong to a target workload.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ServerMatch {
    /// Servers whose `podSelector.matchLabels` has `app=<workload>`.
    #[default]
    AppLabel,

    /// Servers whose pod selector matches a pod labeled `app=<workload>`.
    Pods,
}

/// Resolves authorization relationships between workloads.
///
/// Every operation loads a fresh [`PolicyGraph`] from the source; nothing is
/// cached between calls.
#[derive(Clone, Debug)]
pub struct Resolver<S> {
    source: S,
    cluster: ClusterInfo,
    server_match: ServerMatch,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid server match mode: {0} (expected app-label or pods)")]
pub struct InvalidServerMatch(String);

// === impl ServerMatch ===

impl FromStr for ServerMatch {
    type Err = InvalidServerMatch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app-label" => Ok(Self::AppLabel),
            "pods" => Ok(Self::Pods),
            s => Err(InvalidServerMatch(s.to_string())),
        }
    }
}

impl fmt::Display for ServerMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppLabel => "app-label".fmt(f),
            Self::Pods => "pods".fmt(f),
        }
    }
}

// === impl Resolver ===

impl<S: ObjectSource> Resolver<S> {
    pub fn new(source: S, cluster: ClusterInfo) -> Self {
        Self {
            source,
            cluster,
            server_match: ServerMatch::default(),
        }
    }

    pub fn with_server_match(mut self, server_match: ServerMatch) -> Self {
        self.server_match = server_match;
        self
    }

    pub async fn resolve_identity(
        &self,
        namespace: &str,
        workload: &str,
    ) -> Result<ResolvedIdentity, Error> {
        required("namespace", namespace)?;
        required("workload", workload)?;
        identity::resolve(&self.source, &self.cluster, namespace, workload).await
    }

    /// Finds every server that authorizes the given workload.
    pub async fn allowed_targets(
        &self,
        namespace: &str,
        workload: &str,
    ) -> Result<AllowedTargets, Error> {
        required("namespace", namespace)?;
        required("workload", workload)?;
        let span = info_span!("allowed_targets", %namespace, %workload);
        async move {
            let client = self.resolve_identity(namespace, workload).await?;
            let graph = self.load(None).await?;

            let mut targets = Vec::new();
            for server in graph.servers() {
                for policy in graph.policies_targeting(server.namespace, server.name) {
                    if !graph.is_source_authorized(&policy, &client) {
                        continue;
                    }
                    match target_descriptor(&server, &policy) {
                        Some(target) => targets.push(target),
                        None => tracing::debug!(
                            server.ns = %server.namespace,
                            server.name = %server.name,
                            "Server lacks matchLabels or port; omitting"
                        ),
                    }
                }
            }

            tracing::info!(targets = targets.len(), "Resolved allowed targets");
            Ok(AllowedTargets::new((&client).into(), targets))
        }
        .instrument(span)
        .await
    }

    /// Describes every client that policy admits to the given workload.
    pub async fn allowed_sources(
        &self,
        namespace: &str,
        workload: &str,
    ) -> Result<SourcesLookup, Error> {
        required("namespace", namespace)?;
        required("workload", workload)?;
        let span = info_span!("allowed_sources", %namespace, %workload);
        async move {
            let target = WorkloadRef::new(namespace, workload);
            let graph = self.load(Some(namespace)).await?;

            let servers = self.target_servers(&graph, namespace, workload).await;
            if servers.is_empty() {
                return Ok(SourcesLookup::NoServers(NoMatchingServers::new(&target)));
            }

            let mut sources = Vec::new();
            for server in &servers {
                for policy in graph.policies_targeting(namespace, server) {
                    for authn in policy.authentications() {
                        sources.extend(source_descriptors(&graph, &policy, authn));
                    }
                }
            }

            let sources = AllowedSources::new(target, servers, sources);
            tracing::info!(sources = sources.total_sources, "Resolved allowed sources");
            Ok(SourcesLookup::Sources(sources))
        }
        .instrument(span)
        .await
    }

    /// Decides whether a source workload may reach a target workload.
    ///
    /// The target namespace defaults to the source's.
    pub async fn analyze_connectivity(
        &self,
        source_ns: &str,
        source_workload: &str,
        target_ns: Option<&str>,
        target_workload: &str,
    ) -> Result<Connectivity, Error> {
        required("source namespace", source_ns)?;
        required("source workload", source_workload)?;
        required("target workload", target_workload)?;
        let target_ns = target_ns.filter(|ns| !ns.is_empty()).unwrap_or(source_ns);
        let span = info_span!(
            "analyze_connectivity",
            src.ns = %source_ns,
            src.workload = %source_workload,
            dst.ns = %target_ns,
            dst.workload = %target_workload,
        );
        async move {
            let client = self.resolve_identity(source_ns, source_workload).await?;
            let target = WorkloadRef::new(target_ns, target_workload);
            let graph = self.load(Some(target_ns)).await?;

            let servers = self.target_servers(&graph, target_ns, target_workload).await;
            let mut policies = Vec::new();
            for server in &servers {
                for policy in graph.policies_targeting(target_ns, server) {
                    if graph.is_source_authorized(&policy, &client) {
                        policies.push(policy.name.to_string());
                    }
                }
            }
            policies.sort();
            policies.dedup();

            let allowed = !policies.is_empty();
            let explanation = if servers.is_empty() {
                format!(
                    "No Linkerd Servers found for service {} in namespace {}; \
                     no AuthorizationPolicy applies",
                    target_workload, target_ns
                )
            } else if allowed {
                format!(
                    "{} is authorized by AuthorizationPolicy {}",
                    client.identity,
                    policies.join(", ")
                )
            } else {
                format!(
                    "No AuthorizationPolicy targeting Servers {} authorizes {}",
                    servers.join(", "),
                    client.identity
                )
            };

            tracing::info!(allowed, "Analyzed connectivity");
            Ok(Connectivity {
                source: (&client).into(),
                target,
                allowed,
                servers,
                policies,
                explanation,
            })
        }
        .instrument(span)
        .await
    }

    /// Lists the workloads running the Linkerd proxy in `namespace`, or in
    /// every namespace.
    ///
    /// Pods are grouped by their `app` label, falling back to `k8s-app`. Pods
    /// with neither label are skipped.
    pub async fn list_meshed_services(
        &self,
        namespace: Option<&str>,
    ) -> Result<MeshedServices, Error> {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        let span = info_span!("list_meshed_services", ns = namespace.unwrap_or("*"));
        async move {
            let pods = self
                .source
                .pods(namespace, &Selector::default())
                .await
                .map_err(Error::ListPods)?;

            let services = MeshedServices::new(
                pods.iter()
                    .filter(|pod| k8s::is_meshed(pod))
                    .filter_map(|pod| {
                        let service = meshed_service_name(pod)?;
                        let ns = pod.namespace().unwrap_or_default();
                        Some((WorkloadRef::new(ns, service), pod.name_any()))
                    }),
            );

            tracing::info!(services = services.total_services, "Listed meshed services");
            Ok(services)
        }
        .instrument(span)
        .await
    }

    /// Loads the servers in `ns` (or all namespaces) and the policies that
    /// may apply to them.
    async fn load(&self, ns: Option<&str>) -> Result<PolicyGraph, Error> {
        let servers = self.source.servers(ns).await.map_err(Error::ListServers)?;

        let mut graph = PolicyGraph::default();
        let namespaces = servers
            .iter()
            .filter_map(k8s::ResourceExt::namespace)
            .collect::<Vec<_>>();
        for server in servers {
            graph.index_server(server);
        }
        graph.load_policies(&self.source, namespaces).await;
        Ok(graph)
    }

    /// Names the servers in `ns` that belong to `workload`, ordered by name.
    async fn target_servers(&self, graph: &PolicyGraph, ns: &str, workload: &str) -> Vec<String> {
        match self.server_match {
            ServerMatch::AppLabel => graph
                .servers_in(ns)
                .filter(|s| {
                    s.spec
                        .pod_selector
                        .as_ref()
                        .and_then(|sel| sel.label("app"))
                        == Some(workload)
                })
                .map(|s| s.name.to_string())
                .collect(),

            ServerMatch::Pods => {
                let pods = match self
                    .source
                    .pods(Some(ns), &identity::app_selector(workload))
                    .await
                {
                    Ok(pods) => pods,
                    Err(error) => {
                        tracing::warn!(%ns, %error, "Failed to list target pods");
                        return vec![];
                    }
                };
                let labels = pods.iter().map(k8s::labels_of).collect::<Vec<Labels>>();
                graph
                    .servers_in(ns)
                    .filter(|s| match s.spec.pod_selector.as_ref() {
                        Some(sel) => labels.iter().any(|l| sel.matches(l)),
                        None => false,
                    })
                    .map(|s| s.name.to_string())
                    .collect()
            }
        }
    }
}

/// Names the workload a pod belongs to.
fn meshed_service_name(pod: &Pod) -> Option<&str> {
    let labels = pod.labels();
    ["app", "k8s-app"]
        .into_iter()
        .find_map(|key| labels.get(key).map(String::as_str).filter(|v| !v.is_empty()))
}

fn target_descriptor(server: &ServerRef<'_>, policy: &PolicyRef<'_>) -> Option<TargetDescriptor> {
    let labels = server.spec.pod_selector.as_ref()?.declared_match_labels()?;
    let port = match server.spec.port.as_ref()? {
        k8s::policy::server::Port::Number(n) => TargetPort::Number(*n),
        k8s::policy::server::Port::Name(name) => TargetPort::Name(name.clone()),
    };
    Some(TargetDescriptor {
        namespace: server.namespace.to_string(),
        server: server.name.to_string(),
        labels: labels.clone(),
        port,
        authorization_policy: policy.name.to_string(),
    })
}

fn source_descriptors(
    graph: &PolicyGraph,
    policy: &PolicyRef<'_>,
    authn: &AuthenticationTarget,
) -> Vec<SourceDescriptor> {
    let ns = authn.namespace_or(policy.namespace);
    let name = authn.name();
    let describe = |kind| SourceDescriptor {
        kind,
        authentication_policy: name.to_string(),
        authorization_policy: policy.name.to_string(),
    };

    match authn {
        AuthenticationTarget::MeshTLS { .. } => {
            let Some(spec) = graph.meshtls(ns, name) else {
                tracing::warn!(%ns, %name, "MeshTLSAuthentication not found");
                return vec![];
            };
            let identities = spec.matches.iter().map(|m| match m {
                IdentityMatch::All => SourceKind::wildcard(),
                IdentityMatch::Exact(identity) => SourceKind::Identity {
                    identity: identity.clone(),
                },
            });
            let service_accounts = spec.service_accounts.iter().map(|sa| {
                SourceKind::ServiceAccount {
                    service_account: sa.name.clone(),
                    namespace: sa.namespace().unwrap_or(ns).to_string(),
                }
            });
            identities.chain(service_accounts).map(describe).collect()
        }

        AuthenticationTarget::Network { .. } => {
            let Some(spec) = graph.network(ns, name) else {
                tracing::warn!(%ns, %name, "NetworkAuthentication not found");
                return vec![];
            };
            spec.networks
                .iter()
                .map(|net| SourceKind::Network {
                    cidr: net.cidr.clone(),
                    except: net.except().map(ToString::to_string).collect(),
                })
                .map(describe)
                .collect()
        }
    }
}
