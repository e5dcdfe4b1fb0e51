use ahash::AHashMap as HashMap;

pub mod meshtls;
pub mod network;

/// Holds all `NetworkAuthentication` and `MeshTLSAuthentication` specs by-namespace.
///
/// This is separate from the per-namespace server index because authorization
/// policies may reference authentication resources across namespaces.
#[derive(Debug, Default)]
pub(crate) struct AuthenticationNsIndex {
    pub(crate) by_ns: HashMap<String, AuthenticationIndex>,
}

#[derive(Debug, Default)]
pub(crate) struct AuthenticationIndex {
    pub(crate) meshtls: HashMap<String, meshtls::Spec>,
    pub(crate) network: HashMap<String, network::Spec>,
}

// === impl AuthenticationNsIndex ===

impl AuthenticationNsIndex {
    pub(crate) fn update_meshtls(&mut self, namespace: String, name: String, spec: meshtls::Spec) {
        self.by_ns
            .entry(namespace)
            .or_default()
            .meshtls
            .insert(name, spec);
    }

    pub(crate) fn update_network(&mut self, namespace: String, name: String, spec: network::Spec) {
        self.by_ns
            .entry(namespace)
            .or_default()
            .network
            .insert(name, spec);
    }

    pub(crate) fn meshtls(&self, namespace: &str, name: &str) -> Option<&meshtls::Spec> {
        self.by_ns.get(namespace)?.meshtls.get(name)
    }

    pub(crate) fn network(&self, namespace: &str, name: &str) -> Option<&network::Spec> {
        self.by_ns.get(namespace)?.network.get(name)
    }
}

