use crate::{lookup::ByNamespace, malformed};
use linkerd_policy_analyzer_core::{ValidationResult, WILDCARD_IDENTITY};
use linkerd_policy_analyzer_k8s_api::{
    policy::{MeshTLSAuthentication, ServiceAccountRef},
    ResourceExt, ServiceAccount,
};
use linkerd_policy_analyzer_k8s_index::{ClusterInfo, ObjectSource};

pub(crate) const RESOURCE_TYPE: &str = "MeshTLSAuthentication";

pub(crate) async fn validate_all<S>(
    source: &S,
    cluster: &ClusterInfo,
    ns: Option<&str>,
) -> Vec<ValidationResult>
where
    S: ObjectSource + ?Sized,
{
    let authns = match source.meshtls_authentications(ns).await {
        Ok(authns) => authns,
        Err(error) => {
            tracing::warn!(?ns, %error, "Failed to list MeshTLSAuthentications");
            return vec![];
        }
    };

    let sa_namespaces = authns
        .iter()
        .flat_map(|authn| authn.spec.service_accounts())
        .filter_map(ServiceAccountRef::namespace)
        .map(String::from);
    let service_accounts = ByNamespace::fetch("ServiceAccounts", sa_namespaces, |ns| async move {
        source.service_accounts(&ns).await
    })
    .await;
    let malformed = malformed::list(source, ns, RESOURCE_TYPE).await;

    authns
        .iter()
        .map(|authn| validate(authn, cluster, &service_accounts))
        .chain(malformed.iter().map(|obj| {
            malformed::invalid_spec(
                RESOURCE_TYPE,
                obj,
                "LNKD-020",
                "Add a valid spec field to the MeshTLSAuthentication",
            )
        }))
        .collect()
}

pub(crate) fn validate(
    authn: &MeshTLSAuthentication,
    cluster: &ClusterInfo,
    service_accounts: &ByNamespace<ServiceAccount>,
) -> ValidationResult {
    let mut result = ValidationResult::new(
        RESOURCE_TYPE,
        authn.namespace().unwrap_or_default(),
        authn.name_unchecked(),
    );

    let spec = &authn.spec;
    if spec.identities().next().is_none() && spec.service_accounts().next().is_none() {
        result.error(
            "Must specify at least one identity or serviceAccount",
            "spec",
            "LNKD-021",
            "Add either spec.identities or spec.serviceAccounts",
        );
        return result.finalize();
    }

    let marker = cluster.identity_marker();
    for (i, identity) in spec.identities().enumerate() {
        if identity == WILDCARD_IDENTITY {
            result.warning(
                "Wildcard identity '*' allows all authenticated services",
                "spec.identities",
                "LNKD-022",
                "Consider restricting to specific identities for better security",
            );
        } else if !identity.contains(&marker) {
            result.warning(
                format!("Identity '{identity}' at index {i} may not be in the correct format"),
                format!("spec.identities[{i}]"),
                "LNKD-023",
                format!(
                    "Identity should follow format: <sa>.<ns>.serviceaccount.identity.{}",
                    cluster.trust_domain()
                ),
            );
        }
    }

    for (i, sa) in spec.service_accounts().enumerate() {
        validate_service_account(&mut result, i, sa, service_accounts);
    }

    result.finalize()
}

fn validate_service_account(
    result: &mut ValidationResult,
    i: usize,
    sa: &ServiceAccountRef,
    service_accounts: &ByNamespace<ServiceAccount>,
) {
    if sa.name.is_empty() {
        result.error(
            format!("Missing serviceAccount name at index {i}"),
            format!("spec.serviceAccounts[{i}].name"),
            "LNKD-025",
            "Specify the serviceAccount name",
        );
        return;
    }

    let Some(ns) = sa.namespace() else {
        result.error(
            format!("Missing serviceAccount namespace at index {i}"),
            format!("spec.serviceAccounts[{i}].namespace"),
            "LNKD-026",
            "Specify the serviceAccount namespace",
        );
        return;
    };

    // Accounts in namespaces that could not be listed are not reported on.
    let Some(listed) = service_accounts.listed(ns) else {
        return;
    };
    if !listed.iter().any(|obj| obj.name_unchecked() == sa.name) {
        result.warning(
            format!(
                "ServiceAccount '{}' does not exist in namespace '{ns}'",
                sa.name
            ),
            format!("spec.serviceAccounts[{i}]"),
            "LNKD-027",
            format!(
                "Create ServiceAccount '{}' in namespace '{ns}' or verify the reference",
                sa.name
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{meta, mk_meshtls, mk_service_account};
    use linkerd_policy_analyzer_core::Severity;
    use linkerd_policy_analyzer_k8s_api::policy::MeshTLSAuthenticationSpec;

    fn with_service_accounts(sas: Vec<ServiceAccountRef>) -> MeshTLSAuthentication {
        MeshTLSAuthentication {
            metadata: meta("prod", "sa-authn"),
            spec: MeshTLSAuthenticationSpec {
                identities: None,
                service_accounts: Some(sas),
            },
        }
    }

    #[test]
    fn valid_identities() {
        let authn = mk_meshtls(
            "prod",
            "frontend-authn",
            vec!["frontend-sa.prod.serviceaccount.identity.linkerd.cluster.local"],
        );
        let result = validate(&authn, &ClusterInfo::default(), &ByNamespace::default());
        assert!(result.valid);
        assert!(result.issues.is_empty(), "{:?}", result.issues);
    }

    #[test]
    fn requires_identities_or_service_accounts() {
        let authn = mk_meshtls("prod", "empty", vec![]);
        let result = validate(&authn, &ClusterInfo::default(), &ByNamespace::default());
        assert!(!result.valid);
        assert_eq!(result.codes().collect::<Vec<_>>(), vec!["LNKD-021"]);
    }

    #[test]
    fn identity_warnings() {
        let authn = mk_meshtls("prod", "loose", vec!["*", "frontend.prod"]);
        let result = validate(&authn, &ClusterInfo::default(), &ByNamespace::default());
        assert!(result.valid);
        assert_eq!(result.codes().collect::<Vec<_>>(), vec!["LNKD-022", "LNKD-023"]);
        assert!(result.issues.iter().all(|i| i.severity == Severity::Warning));
        assert_eq!(
            result.issues[1].message,
            "Identity 'frontend.prod' at index 1 may not be in the correct format"
        );
        assert_eq!(result.issues[1].field, "spec.identities[1]");
    }

    #[test]
    fn identity_format_follows_control_plane_namespace() {
        let cluster = ClusterInfo {
            control_plane_ns: "mesh".to_string(),
            ..ClusterInfo::default()
        };
        let authn = mk_meshtls(
            "prod",
            "frontend-authn",
            vec!["frontend-sa.prod.serviceaccount.identity.linkerd.cluster.local"],
        );
        let result = validate(&authn, &cluster, &ByNamespace::default());
        assert_eq!(result.codes().collect::<Vec<_>>(), vec!["LNKD-023"]);
    }

    #[test]
    fn service_account_references() {
        let authn = with_service_accounts(vec![
            ServiceAccountRef::new("", Some("prod")),
            ServiceAccountRef::new("frontend-sa", None),
            ServiceAccountRef::new("frontend-sa", Some("prod")),
            ServiceAccountRef::new("ghost-sa", Some("prod")),
        ]);
        let sas = ByNamespace::group([mk_service_account("prod", "frontend-sa")]);
        let result = validate(&authn, &ClusterInfo::default(), &sas);
        assert!(!result.valid);
        assert_eq!(
            result.codes().collect::<Vec<_>>(),
            vec!["LNKD-025", "LNKD-026", "LNKD-027"]
        );
        assert_eq!(result.issues[2].severity, Severity::Warning);
        assert_eq!(
            result.issues[2].message,
            "ServiceAccount 'ghost-sa' does not exist in namespace 'prod'"
        );
        assert_eq!(result.issues[2].field, "spec.serviceAccounts[3]");
    }
}
