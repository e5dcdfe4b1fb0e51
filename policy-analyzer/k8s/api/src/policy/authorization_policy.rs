use super::NamespacedTargetRef;

/// Grants clients that satisfy any of the referenced authentications access to
/// the target's traffic.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    kube::CustomResource,
    serde::Deserialize,
    serde::Serialize,
    schemars::JsonSchema,
)]
#[kube(
    group = "policy.linkerd.io",
    version = "v1alpha1",
    kind = "AuthorizationPolicy",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationPolicySpec {
    #[serde(default)]
    pub target_ref: NamespacedTargetRef,
    #[serde(default)]
    pub required_authentication_refs: Vec<NamespacedTargetRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refs_default_to_empty() {
        let spec: AuthorizationPolicySpec = serde_json::from_value(serde_json::json!({
            "targetRef": { "kind": "Server", "name": "backend-server" },
        }))
        .expect("spec must parse");
        assert_eq!(spec.target_ref, NamespacedTargetRef::new("Server", "backend-server"));
        assert!(spec.required_authentication_refs.is_empty());
    }
}
