use crate::graph::PolicyGraph;
use linkerd_policy_analyzer_k8s_api::{
    self as k8s,
    policy::{AuthorizationPolicySpec, NamespacedTargetRef},
    ResourceExt,
};
use tracing::info_span;

/// The important parts of an `AuthorizationPolicy` resource.
#[derive(Debug, PartialEq)]
pub(crate) struct Spec {
    /// The name of the targeted `Server`.
    ///
    /// Only the name is compared when linking a policy to its servers.
    pub target: String,
    pub authentications: Vec<AuthenticationTarget>,
}

/// An authentication resource required by an authorization policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthenticationTarget {
    MeshTLS {
        namespace: Option<String>,
        name: String,
    },
    Network {
        namespace: Option<String>,
        name: String,
    },
}

impl PolicyGraph {
    pub(crate) fn index_policy(&mut self, policy: k8s::policy::AuthorizationPolicy) {
        let name = policy.name_unchecked();
        let Some(ns) = policy.namespace() else {
            tracing::warn!(%name, "AuthorizationPolicy must be namespaced; skipping");
            return;
        };
        let _span = info_span!("index", %ns, %name).entered();

        let spec = Spec::from(policy.spec);
        tracing::debug!(target = %spec.target, authns = spec.authentications.len(), "Indexing");
        self.namespace_mut(ns).policies.insert(name, spec);
    }
}

// === impl Spec ===

impl From<AuthorizationPolicySpec> for Spec {
    fn from(ap: AuthorizationPolicySpec) -> Self {
        let authentications = ap
            .required_authentication_refs
            .into_iter()
            .filter_map(|t| match AuthenticationTarget::try_from(t) {
                Ok(authn) => Some(authn),
                Err(error) => {
                    tracing::warn!(%error, "Ignoring authentication reference");
                    None
                }
            })
            .collect();

        Self {
            target: ap.target_ref.name,
            authentications,
        }
    }
}

// === impl AuthenticationTarget ===

impl TryFrom<NamespacedTargetRef> for AuthenticationTarget {
    type Error = anyhow::Error;

    fn try_from(t: NamespacedTargetRef) -> anyhow::Result<Self> {
        if t.targets_kind::<k8s::policy::MeshTLSAuthentication>() {
            Ok(Self::MeshTLS {
                namespace: t.namespace,
                name: t.name,
            })
        } else if t.targets_kind::<k8s::policy::NetworkAuthentication>() {
            Ok(Self::Network {
                namespace: t.namespace,
                name: t.name,
            })
        } else {
            anyhow::bail!("unsupported authentication target: {}", t.canonical_kind())
        }
    }
}

impl AuthenticationTarget {
    pub fn name(&self) -> &str {
        match self {
            Self::MeshTLS { name, .. } | Self::Network { name, .. } => name,
        }
    }

    /// The namespace of the referenced resource, defaulting to the policy's.
    pub fn namespace_or<'a>(&'a self, policy_ns: &'a str) -> &'a str {
        let ns = match self {
            Self::MeshTLS { namespace, .. } | Self::Network { namespace, .. } => namespace,
        };
        match ns.as_deref() {
            Some(ns) if !ns.is_empty() => ns,
            _ => policy_ns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_authentication_refs() {
        let spec = Spec::from(AuthorizationPolicySpec {
            target_ref: NamespacedTargetRef::new("Server", "backend-server"),
            required_authentication_refs: vec![
                NamespacedTargetRef::new("MeshTLSAuthentication", "frontend-authn"),
                NamespacedTargetRef::new("NetworkAuthentication", "cluster-net")
                    .in_namespace("linkerd"),
                NamespacedTargetRef::new("ServiceAccount", "frontend-sa"),
            ],
        });

        assert_eq!(spec.target, "backend-server");
        assert_eq!(
            spec.authentications,
            vec![
                AuthenticationTarget::MeshTLS {
                    namespace: None,
                    name: "frontend-authn".to_string(),
                },
                AuthenticationTarget::Network {
                    namespace: Some("linkerd".to_string()),
                    name: "cluster-net".to_string(),
                },
            ],
            "unsupported kinds are dropped"
        );
        assert_eq!(spec.authentications[0].namespace_or("prod"), "prod");
        assert_eq!(spec.authentications[1].namespace_or("prod"), "linkerd");
    }
}
