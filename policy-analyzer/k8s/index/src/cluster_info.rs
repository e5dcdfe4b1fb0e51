/// Holds cluster metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterInfo {
    /// The namespace where the linkerd control plane is deployed
    pub control_plane_ns: String,

    /// E.g. "cluster.local"
    pub identity_domain: String,
}

impl Default for ClusterInfo {
    fn default() -> Self {
        Self {
            control_plane_ns: "linkerd".to_string(),
            identity_domain: "cluster.local".to_string(),
        }
    }
}

impl ClusterInfo {
    /// The mesh identity trust domain, e.g. `linkerd.cluster.local`.
    pub fn trust_domain(&self) -> String {
        format!("{}.{}", self.control_plane_ns, self.identity_domain)
    }

    pub fn service_account_identity(&self, ns: &str, sa: &str) -> String {
        format!(
            "{}.{}.serviceaccount.identity.{}.{}",
            sa, ns, self.control_plane_ns, self.identity_domain
        )
    }

    /// The substring that every identity issued by this control plane contains.
    pub fn identity_marker(&self) -> String {
        format!(".serviceaccount.identity.{}", self.control_plane_ns)
    }
}
