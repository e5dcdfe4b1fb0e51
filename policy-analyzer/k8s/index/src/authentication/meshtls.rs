use crate::graph::PolicyGraph;
use linkerd_policy_analyzer_core::IdentityMatch;
use linkerd_policy_analyzer_k8s_api::{
    policy::{MeshTLSAuthentication, MeshTLSAuthenticationSpec, ServiceAccountRef},
    ResourceExt,
};
use tracing::info_span;

#[derive(Debug, PartialEq)]
pub(crate) struct Spec {
    /// Declared identities, in order.
    pub matches: Vec<IdentityMatch>,
    pub service_accounts: Vec<ServiceAccountRef>,
}

impl PolicyGraph {
    pub(crate) fn index_meshtls(&mut self, authn: MeshTLSAuthentication) {
        let name = authn.name_unchecked();
        let Some(ns) = authn.namespace() else {
            tracing::warn!(%name, "MeshTLSAuthentication must be namespaced; skipping");
            return;
        };
        let _span = info_span!("index", %ns, %name).entered();

        let spec = Spec::from(authn.spec);
        if spec.is_empty() {
            tracing::debug!("No identities configured");
        }
        self.authentications.update_meshtls(ns, name, spec);
    }
}

impl From<MeshTLSAuthenticationSpec> for Spec {
    fn from(spec: MeshTLSAuthenticationSpec) -> Self {
        let matches = spec
            .identities()
            .map(|id| match id.parse::<IdentityMatch>() {
                Ok(m) => m,
                Err(never) => match never {},
            })
            .collect();
        Self {
            matches,
            service_accounts: spec.service_accounts().cloned().collect(),
        }
    }
}

impl Spec {
    fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.service_accounts.is_empty()
    }
}
