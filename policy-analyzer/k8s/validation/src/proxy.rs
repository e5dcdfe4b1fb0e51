//! Checks the proxy configuration annotations of namespaces and pods.

use linkerd_policy_analyzer_core::ValidationResult;
use linkerd_policy_analyzer_k8s_api::{labels::Selector, Namespace, Pod, ResourceExt};
use linkerd_policy_analyzer_k8s_index::ObjectSource;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

const INJECT: &str = "linkerd.io/inject";
const CPU_REQUEST: &str = "config.linkerd.io/proxy-cpu-request";
const CPU_LIMIT: &str = "config.linkerd.io/proxy-cpu-limit";
const MEMORY_REQUEST: &str = "config.linkerd.io/proxy-memory-request";
const MEMORY_LIMIT: &str = "config.linkerd.io/proxy-memory-limit";
const LOG_LEVEL: &str = "config.linkerd.io/proxy-log-level";
const PROXY_VERSION: &str = "config.linkerd.io/proxy-version";
const WAIT_BEFORE_EXIT: &str = "config.alpha.linkerd.io/proxy-wait-before-exit-seconds";

const PROXY_CONTAINER: &str = "linkerd-proxy";

/// Waits longer than this many seconds are flagged.
const MAX_WAIT_BEFORE_EXIT_SECS: i64 = 300;

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(\.\d+)?(m|Mi|Gi|Ki|M|G|K)?$").expect("quantity regex must compile")
});

static VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(stable|edge)-\d+\.\d+\.\d+$").expect("version regex must compile")
});

type Annotations = BTreeMap<String, String>;

/// Validates every namespace when `ns` is unset, otherwise every pod in `ns`.
pub(crate) async fn validate_all<S>(source: &S, ns: Option<&str>) -> Vec<ValidationResult>
where
    S: ObjectSource + ?Sized,
{
    match ns {
        None => match source.namespaces(&Selector::default()).await {
            Ok(namespaces) => namespaces.iter().map(validate_namespace).collect(),
            Err(error) => {
                tracing::warn!(%error, "Failed to list Namespaces");
                vec![]
            }
        },
        Some(ns) => match source.pods(Some(ns), &Selector::default()).await {
            Ok(pods) => pods.iter().map(validate_pod).collect(),
            Err(error) => {
                tracing::warn!(%ns, %error, "Failed to list Pods");
                vec![]
            }
        },
    }
}

pub(crate) fn validate_namespace(ns: &Namespace) -> ValidationResult {
    let name = ns.name_unchecked();
    let mut result = ValidationResult::new("Namespace", &name, &name);
    let annotations = ns.annotations();
    validate_injection(&mut result, annotations);
    validate_config(&mut result, annotations);
    result.finalize()
}

pub(crate) fn validate_pod(pod: &Pod) -> ValidationResult {
    let mut result = ValidationResult::new(
        "Pod",
        pod.namespace().unwrap_or_default(),
        pod.name_unchecked(),
    );
    let annotations = pod.annotations();
    validate_injection(&mut result, annotations);

    let has_proxy = pod
        .spec
        .iter()
        .flat_map(|spec| spec.containers.iter())
        .any(|c| c.name == PROXY_CONTAINER);
    if annotations.get(INJECT).map(String::as_str) == Some("enabled") && !has_proxy {
        result.warning(
            "Pod is marked for injection but doesn't have linkerd-proxy container",
            format!("metadata.annotations[{INJECT}]"),
            "LNKD-P001",
            "Ensure the Linkerd proxy injector webhook is running",
        );
    }

    validate_config(&mut result, annotations);
    result.finalize()
}

fn validate_injection(result: &mut ValidationResult, annotations: &Annotations) {
    let Some(inject) = annotations.get(INJECT) else {
        result.info(
            "No linkerd.io/inject annotation set",
            "metadata.annotations",
            "LNKD-P002",
            "Add 'linkerd.io/inject: enabled' to enable automatic proxy injection",
        );
        return;
    };

    if !matches!(inject.as_str(), "enabled" | "disabled" | "ingress") {
        result.error(
            format!("Invalid inject value '{inject}', must be: enabled, disabled, or ingress"),
            format!("metadata.annotations[{INJECT}]"),
            "LNKD-P003",
            "Set to 'enabled', 'disabled', or 'ingress'",
        );
    }
}

fn validate_config(result: &mut ValidationResult, annotations: &Annotations) {
    validate_cpu(result, annotations);
    validate_memory(result, annotations);
    validate_log_level(result, annotations);
    validate_proxy_version(result, annotations);
    validate_wait_before_exit(result, annotations);
}

fn validate_cpu(result: &mut ValidationResult, annotations: &Annotations) {
    let request = annotations.get(CPU_REQUEST);
    let limit = annotations.get(CPU_LIMIT);

    if let Some(request) = request.filter(|q| !QUANTITY.is_match(q)) {
        result.error(
            format!("Invalid CPU request format: {request}"),
            format!("metadata.annotations[{CPU_REQUEST}]"),
            "LNKD-P004",
            "Use valid Kubernetes resource format (e.g., '100m', '0.1')",
        );
    }
    if let Some(limit) = limit.filter(|q| !QUANTITY.is_match(q)) {
        result.error(
            format!("Invalid CPU limit format: {limit}"),
            format!("metadata.annotations[{CPU_LIMIT}]"),
            "LNKD-P005",
            "Use valid Kubernetes resource format (e.g., '1', '1000m')",
        );
    }

    match (request, limit) {
        (None, Some(_)) => result.warning(
            "CPU limit is set without CPU request",
            "metadata.annotations",
            "LNKD-P006",
            format!("Set {CPU_REQUEST} for better scheduling"),
        ),
        (Some(request), Some(limit)) => {
            let (request, limit) = (parse_cpu(request), parse_cpu(limit));
            if request > 0.0 && limit > 0.0 && limit < request {
                result.error(
                    "CPU limit is lower than CPU request",
                    format!("metadata.annotations[{CPU_LIMIT}]"),
                    "LNKD-P007",
                    "CPU limit must be greater than or equal to CPU request",
                );
            }
        }
        _ => {}
    }
}

fn validate_memory(result: &mut ValidationResult, annotations: &Annotations) {
    let request = annotations.get(MEMORY_REQUEST);
    let limit = annotations.get(MEMORY_LIMIT);

    if let Some(request) = request.filter(|q| !QUANTITY.is_match(q)) {
        result.error(
            format!("Invalid memory request format: {request}"),
            format!("metadata.annotations[{MEMORY_REQUEST}]"),
            "LNKD-P008",
            "Use valid Kubernetes resource format (e.g., '64Mi', '128Mi')",
        );
    }
    if let Some(limit) = limit.filter(|q| !QUANTITY.is_match(q)) {
        result.error(
            format!("Invalid memory limit format: {limit}"),
            format!("metadata.annotations[{MEMORY_LIMIT}]"),
            "LNKD-P009",
            "Use valid Kubernetes resource format (e.g., '128Mi', '256Mi')",
        );
    }

    match (request, limit) {
        (None, Some(_)) => result.warning(
            "Memory limit is set without memory request",
            "metadata.annotations",
            "LNKD-P010",
            format!("Set {MEMORY_REQUEST} for better scheduling"),
        ),
        (Some(request), Some(limit)) => {
            let (request, limit) = (parse_memory(request), parse_memory(limit));
            if request > 0.0 && limit > 0.0 && limit < request {
                result.error(
                    "Memory limit is lower than memory request",
                    format!("metadata.annotations[{MEMORY_LIMIT}]"),
                    "LNKD-P011",
                    "Memory limit must be greater than or equal to memory request",
                );
            }
        }
        _ => {}
    }
}

fn validate_log_level(result: &mut ValidationResult, annotations: &Annotations) {
    let Some(level) = annotations.get(LOG_LEVEL) else {
        return;
    };
    let field = format!("metadata.annotations[{LOG_LEVEL}]");
    match level.as_str() {
        "trace" | "debug" => result.warning(
            format!("Log level '{level}' may impact performance and increase log volume"),
            field,
            "LNKD-P013",
            "Consider using 'info' or 'warn' for production workloads",
        ),
        "info" | "warn" | "error" => {}
        _ => result.error(
            format!("Invalid log level '{level}', must be: trace, debug, info, warn, error"),
            field,
            "LNKD-P012",
            "Set to one of: trace, debug, info, warn, error",
        ),
    }
}

fn validate_proxy_version(result: &mut ValidationResult, annotations: &Annotations) {
    let Some(version) = annotations.get(PROXY_VERSION) else {
        return;
    };
    if !VERSION.is_match(version) {
        result.warning(
            format!(
                "Proxy version '{version}' doesn't match expected format \
                 (stable-X.Y.Z or edge-X.Y.Z)"
            ),
            format!("metadata.annotations[{PROXY_VERSION}]"),
            "LNKD-P014",
            "Use format: stable-2.14.0 or edge-24.1.1",
        );
    }
}

fn validate_wait_before_exit(result: &mut ValidationResult, annotations: &Annotations) {
    let Some(wait) = annotations.get(WAIT_BEFORE_EXIT) else {
        return;
    };
    let field = format!("metadata.annotations[{WAIT_BEFORE_EXIT}]");
    match wait.parse::<i64>() {
        Ok(secs) if secs > MAX_WAIT_BEFORE_EXIT_SECS => result.warning(
            format!("Very long wait time ({secs} seconds) may delay pod termination"),
            field,
            "LNKD-P016",
            "Consider a shorter wait time (typically 0-60 seconds)",
        ),
        Ok(secs) if secs >= 0 => {}
        _ => result.error(
            format!("Invalid wait-before-exit-seconds value: {wait}"),
            field,
            "LNKD-P015",
            "Must be a non-negative integer",
        ),
    }
}

/// Parses a CPU quantity into cores. Unparseable quantities are zero.
fn parse_cpu(q: &str) -> f64 {
    let q = q.trim();
    match q.strip_suffix('m') {
        Some(millis) => millis.parse::<f64>().unwrap_or(0.0) / 1000.0,
        None => q.parse().unwrap_or(0.0),
    }
}

/// Parses a memory quantity into bytes. Unparseable quantities are zero.
fn parse_memory(q: &str) -> f64 {
    const SUFFIXES: [(&str, f64); 6] = [
        ("Ki", 1024.0),
        ("Mi", 1024.0 * 1024.0),
        ("Gi", 1024.0 * 1024.0 * 1024.0),
        ("K", 1e3),
        ("M", 1e6),
        ("G", 1e9),
    ];

    let q = q.trim();
    for (suffix, multiplier) in SUFFIXES {
        if let Some(n) = q.strip_suffix(suffix) {
            return n.parse::<f64>().unwrap_or(0.0) * multiplier;
        }
    }
    q.parse().unwrap_or(0.0)
}
