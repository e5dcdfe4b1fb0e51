//! Read-only access to cluster objects.

use anyhow::Result;
use linkerd_policy_analyzer_k8s_api::{
    self as k8s,
    labels::Selector,
    policy::{AuthorizationPolicy, MeshTLSAuthentication, NetworkAuthentication, Server},
    DynamicObject, Namespace, Pod, ResourceExt, ServiceAccount,
};

/// Supplies snapshots of the objects that policy is resolved and validated
/// against.
///
/// Listing operations take an optional namespace; `None` lists across all
/// namespaces. Implementations must not be assumed to order their results.
#[async_trait::async_trait]
pub trait ObjectSource: Send + Sync {
    async fn servers(&self, ns: Option<&str>) -> Result<Vec<Server>>;

    async fn authorization_policies(&self, ns: Option<&str>) -> Result<Vec<AuthorizationPolicy>>;

    async fn meshtls_authentications(&self, ns: Option<&str>)
        -> Result<Vec<MeshTLSAuthentication>>;

    async fn network_authentications(&self, ns: Option<&str>)
        -> Result<Vec<NetworkAuthentication>>;

    /// Lists pods whose labels match `selector`.
    async fn pods(&self, ns: Option<&str>, selector: &Selector) -> Result<Vec<Pod>>;

    /// Lists namespaces whose labels match `selector`.
    async fn namespaces(&self, selector: &Selector) -> Result<Vec<Namespace>>;

    async fn service_accounts(&self, ns: &str) -> Result<Vec<ServiceAccount>>;

    /// Lists policy resources whose spec could not be decoded, as read.
    ///
    /// These never take part in resolution but are reported by validation.
    async fn malformed(&self, ns: Option<&str>) -> Result<Vec<DynamicObject>>;
}

/// Holds objects in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    pub servers: Vec<Server>,
    pub authorization_policies: Vec<AuthorizationPolicy>,
    pub meshtls_authentications: Vec<MeshTLSAuthentication>,
    pub network_authentications: Vec<NetworkAuthentication>,
    pub pods: Vec<Pod>,
    pub namespaces: Vec<Namespace>,
    pub service_accounts: Vec<ServiceAccount>,
    pub malformed: Vec<DynamicObject>,
}

// === impl MemorySource ===

impl MemorySource {
    /// The number of objects held.
    pub fn len(&self) -> usize {
        self.servers.len()
            + self.authorization_policies.len()
            + self.meshtls_authentications.len()
            + self.network_authentications.len()
            + self.pods.len()
            + self.namespaces.len()
            + self.service_accounts.len()
            + self.malformed.len()
    }
}

fn in_ns<T: ResourceExt + Clone>(objects: &[T], ns: Option<&str>) -> Vec<T> {
    objects
        .iter()
        .filter(|obj| match ns {
            Some(ns) => obj.namespace().as_deref() == Some(ns),
            None => true,
        })
        .cloned()
        .collect()
}

#[async_trait::async_trait]
impl ObjectSource for MemorySource {
    async fn servers(&self, ns: Option<&str>) -> Result<Vec<Server>> {
        Ok(in_ns(&self.servers, ns))
    }

    async fn authorization_policies(&self, ns: Option<&str>) -> Result<Vec<AuthorizationPolicy>> {
        Ok(in_ns(&self.authorization_policies, ns))
    }

    async fn meshtls_authentications(
        &self,
        ns: Option<&str>,
    ) -> Result<Vec<MeshTLSAuthentication>> {
        Ok(in_ns(&self.meshtls_authentications, ns))
    }

    async fn network_authentications(
        &self,
        ns: Option<&str>,
    ) -> Result<Vec<NetworkAuthentication>> {
        Ok(in_ns(&self.network_authentications, ns))
    }

    async fn pods(&self, ns: Option<&str>, selector: &Selector) -> Result<Vec<Pod>> {
        Ok(in_ns(&self.pods, ns)
            .into_iter()
            .filter(|pod| selector.matches(&k8s::labels_of(pod)))
            .collect())
    }

    async fn namespaces(&self, selector: &Selector) -> Result<Vec<Namespace>> {
        Ok(self
            .namespaces
            .iter()
            .filter(|ns| selector.matches(&k8s::labels_of(*ns)))
            .cloned()
            .collect())
    }

    async fn service_accounts(&self, ns: &str) -> Result<Vec<ServiceAccount>> {
        Ok(in_ns(&self.service_accounts, Some(ns)))
    }

    async fn malformed(&self, ns: Option<&str>) -> Result<Vec<DynamicObject>> {
        Ok(in_ns(&self.malformed, ns))
    }
}
