use crate::graph::PolicyGraph;
use linkerd_policy_analyzer_k8s_api::{
    policy::{Network, NetworkAuthentication},
    ResourceExt,
};
use tracing::info_span;

/// Networks are retained only to describe allowed sources; they never
/// authorize a client by identity.
#[derive(Debug, PartialEq)]
pub(crate) struct Spec {
    pub networks: Vec<Network>,
}

impl PolicyGraph {
    pub(crate) fn index_network(&mut self, authn: NetworkAuthentication) {
        let name = authn.name_unchecked();
        let Some(ns) = authn.namespace() else {
            tracing::warn!(%name, "NetworkAuthentication must be namespaced; skipping");
            return;
        };
        let _span = info_span!("index", %ns, %name).entered();

        let spec = Spec {
            networks: authn.spec.networks,
        };
        self.authentications.update_network(ns, name, spec);
    }
}
