//! A per-call snapshot of the policy object graph.
//!
//! The resolver loads it from an [`ObjectSource`] at the start of each
//! operation and drops it afterwards.

use crate::{
    authentication::{meshtls, network, AuthenticationNsIndex},
    authorization_policy::{self, AuthenticationTarget},
    ObjectSource,
};
use ahash::AHashMap as HashMap;
use futures::future::join_all;
use linkerd_policy_analyzer_k8s_api::{
    policy::{Server, ServerSpec},
    ResourceExt,
};
use std::collections::BTreeSet;
use tracing::{info_span, instrument};

#[derive(Debug, Default)]
pub struct PolicyGraph {
    /// Holds per-namespace server/policy indexes.
    namespaces: HashMap<String, NamespaceIndex>,

    pub(crate) authentications: AuthenticationNsIndex,
}

/// Holds the servers and authorization policies of a single namespace.
#[derive(Debug, Default)]
pub(crate) struct NamespaceIndex {
    pub(crate) servers: HashMap<String, ServerSpec>,
    pub(crate) policies: HashMap<String, authorization_policy::Spec>,
}

/// A `Server` in the graph.
#[derive(Copy, Clone, Debug)]
pub struct ServerRef<'g> {
    pub namespace: &'g str,
    pub name: &'g str,
    pub spec: &'g ServerSpec,
}

/// An `AuthorizationPolicy` in the graph.
#[derive(Copy, Clone, Debug)]
pub struct PolicyRef<'g> {
    pub namespace: &'g str,
    pub name: &'g str,
    pub(crate) spec: &'g authorization_policy::Spec,
}

// === impl PolicyGraph ===

impl PolicyGraph {
    pub(crate) fn namespace_mut(&mut self, ns: String) -> &mut NamespaceIndex {
        self.namespaces.entry(ns).or_default()
    }

    pub(crate) fn index_server(&mut self, server: Server) {
        let name = server.name_unchecked();
        let Some(ns) = server.namespace() else {
            tracing::warn!(%name, "Server must be namespaced; skipping");
            return;
        };
        let _span = info_span!("index", %ns, %name).entered();
        self.namespace_mut(ns).servers.insert(name, server.spec);
    }

    /// Iterates over all servers, ordered by namespace and name.
    pub fn servers(&self) -> impl Iterator<Item = ServerRef<'_>> {
        let mut servers = self
            .namespaces
            .iter()
            .flat_map(|(namespace, idx)| {
                idx.servers.iter().map(move |(name, spec)| ServerRef {
                    namespace,
                    name,
                    spec,
                })
            })
            .collect::<Vec<_>>();
        servers.sort_by(|a, b| (a.namespace, a.name).cmp(&(b.namespace, b.name)));
        servers.into_iter()
    }

    pub fn servers_in<'g>(&'g self, ns: &str) -> impl Iterator<Item = ServerRef<'g>> + 'g {
        let ns = ns.to_string();
        self.servers().filter(move |s| s.namespace == ns)
    }

    /// Returns the policies in `ns` whose target names `server`, ordered by name.
    pub fn policies_targeting<'g>(&'g self, ns: &str, server: &str) -> Vec<PolicyRef<'g>> {
        let Some((namespace, idx)) = self.namespaces.get_key_value(ns) else {
            return vec![];
        };
        let mut policies = idx
            .policies
            .iter()
            .filter(|(_, spec)| spec.target == server)
            .map(|(name, spec)| PolicyRef {
                namespace,
                name,
                spec,
            })
            .collect::<Vec<_>>();
        policies.sort_by(|a, b| a.name.cmp(b.name));
        policies
    }

    pub(crate) fn meshtls(&self, ns: &str, name: &str) -> Option<&meshtls::Spec> {
        self.authentications.meshtls(ns, name)
    }

    pub(crate) fn network(&self, ns: &str, name: &str) -> Option<&network::Spec> {
        self.authentications.network(ns, name)
    }

    /// The namespaces of every authentication that an indexed policy references.
    fn authentication_namespaces(&self) -> BTreeSet<String> {
        self.namespaces
            .iter()
            .flat_map(|(ns, idx)| {
                idx.policies.values().flat_map(move |p| {
                    p.authentications
                        .iter()
                        .map(move |a| a.namespace_or(ns).to_string())
                })
            })
            .collect()
    }

    /// Indexes the authorization policies of each namespace, along with the
    /// authentications they reference.
    ///
    /// Namespaces are fetched concurrently. A namespace whose objects cannot be
    /// listed is logged and contributes nothing.
    #[instrument(skip(self, source, namespaces))]
    pub async fn load_policies<S>(
        &mut self,
        source: &S,
        namespaces: impl IntoIterator<Item = String>,
    ) where
        S: ObjectSource + ?Sized,
    {
        let namespaces = namespaces.into_iter().collect::<BTreeSet<_>>();
        let policies = join_all(namespaces.iter().map(|ns| async move {
            (ns, source.authorization_policies(Some(ns.as_str())).await)
        }))
        .await;
        for (ns, res) in policies {
            match res {
                Ok(policies) => policies.into_iter().for_each(|p| self.index_policy(p)),
                Err(error) => {
                    tracing::warn!(%ns, %error, "Failed to list AuthorizationPolicies");
                }
            }
        }

        let authn_namespaces = self.authentication_namespaces();
        let authns = join_all(authn_namespaces.iter().map(|ns| async move {
            let (meshtls, network) = futures::join!(
                source.meshtls_authentications(Some(ns.as_str())),
                source.network_authentications(Some(ns.as_str())),
            );
            (ns, meshtls, network)
        }))
        .await;
        for (ns, meshtls, network) in authns {
            match meshtls {
                Ok(authns) => authns.into_iter().for_each(|a| self.index_meshtls(a)),
                Err(error) => {
                    tracing::warn!(%ns, %error, "Failed to list MeshTLSAuthentications");
                }
            }
            match network {
                Ok(authns) => authns.into_iter().for_each(|a| self.index_network(a)),
                Err(error) => {
                    tracing::warn!(%ns, %error, "Failed to list NetworkAuthentications");
                }
            }
        }
    }
}

// === impl PolicyRef ===

impl<'g> PolicyRef<'g> {
    pub fn authentications(&self) -> &'g [AuthenticationTarget] {
        &self.spec.authentications
    }
}
