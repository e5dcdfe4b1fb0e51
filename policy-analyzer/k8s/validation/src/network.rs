use crate::malformed;
use linkerd_policy_analyzer_core::ValidationResult;
use linkerd_policy_analyzer_k8s_api::{
    policy::{network::Cidr, NetworkAuthentication},
    ResourceExt,
};
use linkerd_policy_analyzer_k8s_index::ObjectSource;

pub(crate) const RESOURCE_TYPE: &str = "NetworkAuthentication";

pub(crate) async fn validate_all<S>(source: &S, ns: Option<&str>) -> Vec<ValidationResult>
where
    S: ObjectSource + ?Sized,
{
    let authns = match source.network_authentications(ns).await {
        Ok(authns) => authns,
        Err(error) => {
            tracing::warn!(?ns, %error, "Failed to list NetworkAuthentications");
            return vec![];
        }
    };
    let malformed = malformed::list(source, ns, RESOURCE_TYPE).await;

    authns
        .iter()
        .map(validate)
        .chain(malformed.iter().map(|obj| {
            malformed::invalid_spec(
                RESOURCE_TYPE,
                obj,
                "LNKD-N005",
                "Add a valid spec field to the NetworkAuthentication",
            )
        }))
        .collect()
}

pub(crate) fn validate(authn: &NetworkAuthentication) -> ValidationResult {
    let mut result = ValidationResult::new(
        RESOURCE_TYPE,
        authn.namespace().unwrap_or_default(),
        authn.name_unchecked(),
    );

    if authn.spec.networks.is_empty() {
        result.error(
            "Must specify at least one network",
            "spec.networks",
            "LNKD-N001",
            "Add a cidr to spec.networks",
        );
        return result.finalize();
    }

    for (i, net) in authn.spec.networks.iter().enumerate() {
        let cidr = parse_cidr(&mut result, &net.cidr, format!("spec.networks[{i}].cidr"));
        for (j, except) in net.except().enumerate() {
            let field = format!("spec.networks[{i}].except[{j}]");
            let (Some(cidr), Some(except)) = (cidr, parse_cidr(&mut result, except, field.clone()))
            else {
                continue;
            };
            if except.contains(&cidr) {
                result.error(
                    format!("cidr '{cidr}' is completely negated by exception '{except}'"),
                    field,
                    "LNKD-N002",
                    "Narrow the exception or remove the network",
                );
            } else if !cidr.contains(&except) {
                result.error(
                    format!("cidr '{cidr}' does not include exception '{except}'"),
                    field,
                    "LNKD-N003",
                    "Remove the exception or widen the cidr",
                );
            }
        }
    }

    result.finalize()
}

fn parse_cidr(result: &mut ValidationResult, value: &str, field: String) -> Option<Cidr> {
    match value.parse() {
        Ok(cidr) => Some(cidr),
        Err(_) => {
            result.error(
                format!("Invalid cidr '{value}'"),
                field,
                "LNKD-N004",
                "Use an IP address or a network in CIDR notation",
            );
            None
        }
    }
}
