use crate::{
    authorization_policy::AuthenticationTarget, graph::PolicyRef, identity::ResolvedIdentity,
    PolicyGraph,
};

impl PolicyGraph {
    /// Decides whether `policy` admits the client identified by `client`.
    ///
    /// A policy with no authentication references admits no one. Otherwise the
    /// client is admitted if any referenced `MeshTLSAuthentication` lists its
    /// identity (or `*`), or lists its service account. Service account
    /// entries without a namespace are taken to be in the policy's namespace.
    ///
    /// `NetworkAuthentication`s never admit a client here: they describe
    /// source networks, not identities.
    pub fn is_source_authorized(&self, policy: &PolicyRef<'_>, client: &ResolvedIdentity) -> bool {
        policy.authentications().iter().any(|authn| match authn {
            AuthenticationTarget::MeshTLS { name, .. } => {
                let ns = authn.namespace_or(policy.namespace);
                let Some(spec) = self.meshtls(ns, name) else {
                    tracing::debug!(%ns, %name, "MeshTLSAuthentication not found");
                    return false;
                };

                spec.matches.iter().any(|m| m.matches(&client.identity))
                    || spec.service_accounts.iter().any(|sa| {
                        sa.name == client.service_account
                            && sa.namespace().unwrap_or(policy.namespace) == client.namespace
                    })
            }
            AuthenticationTarget::Network { .. } => false,
        })
    }
}
