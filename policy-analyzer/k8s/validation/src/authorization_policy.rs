use crate::{lookup::ByNamespace, malformed};
use linkerd_policy_analyzer_core::ValidationResult;
use linkerd_policy_analyzer_k8s_api::{
    policy::{
        AuthorizationPolicy, MeshTLSAuthentication, NamespacedTargetRef, NetworkAuthentication,
        Server,
    },
    DynamicObject, Resource, ResourceExt,
};
use linkerd_policy_analyzer_k8s_index::ObjectSource;
use std::collections::BTreeSet;

pub(crate) const RESOURCE_TYPE: &str = "AuthorizationPolicy";

/// The objects an `AuthorizationPolicy` may reference.
#[derive(Debug, Default)]
pub(crate) struct Referents {
    pub(crate) servers: ByNamespace<Server>,
    pub(crate) meshtls: ByNamespace<MeshTLSAuthentication>,
    pub(crate) network: ByNamespace<NetworkAuthentication>,
    /// Referenced resources that exist but could not be decoded.
    pub(crate) malformed: ByNamespace<DynamicObject>,
}

// === impl Referents ===

impl Referents {
    /// Whether `ns` holds a `T` named `name`, decoded or not.
    fn exists<T: Resource<DynamicType = ()>>(
        &self,
        objects: &ByNamespace<T>,
        ns: &str,
        name: &str,
    ) -> bool {
        let kind = T::kind(&());
        objects.contains(ns, name)
            || self
                .malformed
                .listed(ns)
                .unwrap_or_default()
                .iter()
                .any(|obj| malformed::is_kind(obj, &kind) && obj.name_unchecked() == name)
    }
}

pub(crate) async fn validate_all<S>(source: &S, ns: Option<&str>) -> Vec<ValidationResult>
where
    S: ObjectSource + ?Sized,
{
    let policies = match source.authorization_policies(ns).await {
        Ok(policies) => policies,
        Err(error) => {
            tracing::warn!(?ns, %error, "Failed to list AuthorizationPolicies");
            return vec![];
        }
    };

    let mut target_namespaces = BTreeSet::new();
    let mut authn_namespaces = BTreeSet::new();
    for policy in &policies {
        let local = policy.namespace().unwrap_or_default();
        target_namespaces.insert(policy.spec.target_ref.namespace_or(&local).to_string());
        for authn in &policy.spec.required_authentication_refs {
            authn_namespaces.insert(authn.namespace_or(&local).to_string());
        }
    }

    let referenced_namespaces = target_namespaces
        .union(&authn_namespaces)
        .cloned()
        .collect::<Vec<_>>();
    let (servers, meshtls, network, undecoded, invalid) = futures::join!(
        ByNamespace::fetch("Servers", target_namespaces, |ns| async move {
            source.servers(Some(&ns)).await
        }),
        ByNamespace::fetch("MeshTLSAuthentications", authn_namespaces.clone(), |ns| {
            async move { source.meshtls_authentications(Some(&ns)).await }
        }),
        ByNamespace::fetch("NetworkAuthentications", authn_namespaces, |ns| async move {
            source.network_authentications(Some(&ns)).await
        }),
        ByNamespace::fetch("malformed resources", referenced_namespaces, |ns| async move {
            source.malformed(Some(&ns)).await
        }),
        malformed::list(source, ns, RESOURCE_TYPE),
    );
    let referents = Referents {
        servers,
        meshtls,
        network,
        malformed: undecoded,
    };

    policies
        .iter()
        .map(|policy| validate(policy, &referents))
        .chain(invalid.iter().map(|obj| {
            malformed::invalid_spec(
                RESOURCE_TYPE,
                obj,
                "LNKD-009",
                "Add a valid spec field to the AuthorizationPolicy",
            )
        }))
        .collect()
}

pub(crate) fn validate(policy: &AuthorizationPolicy, referents: &Referents) -> ValidationResult {
    let ns = policy.namespace().unwrap_or_default();
    let mut result = ValidationResult::new(RESOURCE_TYPE, &ns, policy.name_unchecked());

    validate_target_ref(&mut result, &ns, &policy.spec.target_ref, referents);
    validate_authentication_refs(
        &mut result,
        &ns,
        &policy.spec.required_authentication_refs,
        referents,
    );

    result.finalize()
}

fn validate_target_ref(
    result: &mut ValidationResult,
    local_ns: &str,
    target: &NamespacedTargetRef,
    referents: &Referents,
) {
    if *target == NamespacedTargetRef::default() {
        result.error(
            "Missing targetRef",
            "spec.targetRef",
            "LNKD-010",
            "Add a targetRef to specify which Server this policy applies to",
        );
        return;
    }

    if !target.targets_kind::<Server>() {
        result.error(
            format!("Invalid targetRef.kind '{}', must be 'Server'", target.kind),
            "spec.targetRef.kind",
            "LNKD-011",
            "Set targetRef.kind to 'Server'",
        );
        return;
    }

    if target.name.is_empty() {
        result.error(
            "Missing targetRef.name",
            "spec.targetRef.name",
            "LNKD-012",
            "Specify the name of the target Server",
        );
        return;
    }

    let ns = target.namespace_or(local_ns);
    if !referents.exists(&referents.servers, ns, &target.name) {
        result.error(
            format!(
                "Target Server '{}' does not exist in namespace '{ns}'",
                target.name
            ),
            "spec.targetRef",
            "LNKD-013",
            format!("Create Server '{}' or correct the targetRef", target.name),
        );
    }
}

fn validate_authentication_refs(
    result: &mut ValidationResult,
    local_ns: &str,
    authns: &[NamespacedTargetRef],
    referents: &Referents,
) {
    if authns.is_empty() {
        result.warning(
            "No authentication requirements specified",
            "spec.requiredAuthenticationRefs",
            "LNKD-015",
            "Add requiredAuthenticationRefs to enforce authentication",
        );
        return;
    }

    for (i, authn) in authns.iter().enumerate() {
        if authn.name.is_empty() {
            result.error(
                format!("Missing name in authentication ref at index {i}"),
                format!("spec.requiredAuthenticationRefs[{i}].name"),
                "LNKD-017",
                "Specify the name of the authentication resource",
            );
            continue;
        }

        let ns = authn.namespace_or(local_ns);
        let exists = if authn.targets_kind::<MeshTLSAuthentication>() {
            referents.exists(&referents.meshtls, ns, &authn.name)
        } else if authn.targets_kind::<NetworkAuthentication>() {
            referents.exists(&referents.network, ns, &authn.name)
        } else {
            result.error(
                format!(
                    "Invalid authentication kind '{}' at index {i}, must be \
                     'MeshTLSAuthentication' or 'NetworkAuthentication'",
                    authn.kind
                ),
                format!("spec.requiredAuthenticationRefs[{i}].kind"),
                "LNKD-018",
                "Set kind to 'MeshTLSAuthentication' or 'NetworkAuthentication'",
            );
            continue;
        };

        if !exists {
            result.error(
                format!(
                    "{} '{}' does not exist in namespace '{ns}'",
                    authn.kind, authn.name
                ),
                format!("spec.requiredAuthenticationRefs[{i}]"),
                "LNKD-019",
                format!("Create {} '{}' or correct the reference", authn.kind, authn.name),
            );
        }
    }
}
