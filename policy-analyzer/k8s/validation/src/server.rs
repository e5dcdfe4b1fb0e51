use crate::{lookup::ByNamespace, malformed};
use linkerd_policy_analyzer_core::ValidationResult;
use linkerd_policy_analyzer_k8s_api::{
    self as k8s,
    labels::Selector,
    policy::{
        server::{Port, ProxyProtocol},
        Server,
    },
    Pod, ResourceExt,
};
use linkerd_policy_analyzer_k8s_index::ObjectSource;

pub(crate) const RESOURCE_TYPE: &str = "Server";

/// Validates every `Server` in `ns`, or in all namespaces.
pub(crate) async fn validate_all<S>(source: &S, ns: Option<&str>) -> Vec<ValidationResult>
where
    S: ObjectSource + ?Sized,
{
    let servers = match source.servers(ns).await {
        Ok(servers) => servers,
        Err(error) => {
            tracing::warn!(?ns, %error, "Failed to list Servers");
            return vec![];
        }
    };

    let pods = ByNamespace::fetch(
        "Pods",
        servers.iter().filter_map(ResourceExt::namespace),
        |ns| async move { source.pods(Some(&ns), &Selector::default()).await },
    )
    .await;
    let siblings = ByNamespace::group(servers.iter().cloned());
    let malformed = malformed::list(source, ns, RESOURCE_TYPE).await;

    servers
        .iter()
        .map(|server| validate(server, &siblings, &pods))
        .chain(malformed.iter().map(|obj| {
            malformed::invalid_spec(
                RESOURCE_TYPE,
                obj,
                "LNKD-001",
                "Add a valid spec field to the Server resource",
            )
        }))
        .collect()
}

pub(crate) fn validate(
    server: &Server,
    siblings: &ByNamespace<Server>,
    pods: &ByNamespace<Pod>,
) -> ValidationResult {
    let ns = server.namespace().unwrap_or_default();
    let name = server.name_unchecked();
    let mut result = ValidationResult::new(RESOURCE_TYPE, &ns, &name);

    validate_pod_selector(&mut result, server.spec.pod_selector.as_ref(), pods.listed(&ns));
    validate_port(&mut result, server.spec.port.as_ref());
    if let Some(proto) = server.spec.proxy_protocol.as_ref() {
        validate_proxy_protocol(&mut result, proto);
    }
    if let Some(siblings) = siblings.listed(&ns) {
        check_conflicts(&mut result, server, siblings);
    }

    result.finalize()
}

fn validate_pod_selector(
    result: &mut ValidationResult,
    selector: Option<&Selector>,
    pods: Option<&[Pod]>,
) {
    let Some(selector) = selector else {
        result.error(
            "Missing podSelector",
            "spec.podSelector",
            "LNKD-002",
            "Add a podSelector to target specific pods",
        );
        return;
    };

    if selector.is_empty() {
        result.warning(
            "Empty podSelector will match all pods",
            "spec.podSelector.matchLabels",
            "LNKD-003",
            "Specify matchLabels to target specific pods",
        );
        return;
    }

    // Pods that could not be listed are not reported on.
    if let Some(pods) = pods {
        if !pods.iter().any(|pod| selector.matches(&k8s::labels_of(pod))) {
            result.warning(
                "No pods match the podSelector",
                "spec.podSelector",
                "LNKD-004",
                "Ensure pods with matching labels exist or will be created",
            );
        }
    }
}

fn validate_port(result: &mut ValidationResult, port: Option<&Port>) {
    match port {
        None => result.error(
            "Missing port specification",
            "spec.port",
            "LNKD-005",
            "Add a port number to the Server spec",
        ),
        Some(Port::Name(name)) if name.is_empty() => result.error(
            "Missing port specification",
            "spec.port",
            "LNKD-005",
            "Add a port number to the Server spec",
        ),
        Some(Port::Number(n)) if !(1..=65535).contains(n) => result.error(
            format!("Invalid port {n}, must be between 1-65535"),
            "spec.port",
            "LNKD-006",
            "Set port to a valid value between 1-65535",
        ),
        Some(_) => {}
    }
}

fn validate_proxy_protocol(result: &mut ValidationResult, proto: &ProxyProtocol) {
    if proto.is_recognized() {
        return;
    }
    result.error(
        format!(
            "Invalid proxyProtocol '{proto}', must be one of: {}",
            ProxyProtocol::SUPPORTED.join(", ")
        ),
        "spec.proxyProtocol",
        "LNKD-007",
        "Set proxyProtocol to a valid value",
    );
}

/// Flags other servers in the namespace that use the same port and may select
/// the same pods.
fn check_conflicts(result: &mut ValidationResult, server: &Server, siblings: &[Server]) {
    let Some(port) = server.spec.port.as_ref() else {
        return;
    };
    let selector = server.spec.pod_selector.clone().unwrap_or_default();

    for other in siblings {
        let other_name = other.name_unchecked();
        if other_name == result.name {
            continue;
        }
        if other.spec.port.as_ref() != Some(port) {
            continue;
        }
        let other_selector = other.spec.pod_selector.clone().unwrap_or_default();
        if selector.may_overlap(&other_selector) {
            result.error(
                format!("Conflicts with Server '{other_name}' on port {port}"),
                "spec",
                "LNKD-008",
                format!("Change port or podSelector to avoid conflict with '{other_name}'"),
            );
        }
    }
}
