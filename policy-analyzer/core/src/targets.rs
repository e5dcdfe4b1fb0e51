use serde::Serialize;
use std::collections::BTreeMap;

/// Names a workload by its `app` label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkloadRef {
    pub namespace: String,
    #[serde(rename = "service")]
    pub workload: String,
}

/// A resolved source workload and the service account it runs as.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub namespace: String,
    #[serde(rename = "service")]
    pub workload: String,
    pub service_account: String,
}

/// A server that authorizes the source, and the policy that grants it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    pub namespace: String,
    pub server: String,
    pub labels: BTreeMap<String, String>,
    pub port: TargetPort,
    pub authorization_policy: String,
}

/// A server port as declared, by number or by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TargetPort {
    Number(i64),
    Name(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedTargets {
    pub source: SourceRef,
    pub allowed_targets: Vec<TargetDescriptor>,
    pub total_targets: usize,
}

// === impl WorkloadRef ===

impl WorkloadRef {
    pub fn new(namespace: impl Into<String>, workload: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            workload: workload.into(),
        }
    }
}

// === impl AllowedTargets ===

impl AllowedTargets {
    /// Orders targets by namespace, server, and policy.
    pub fn new(source: SourceRef, mut allowed_targets: Vec<TargetDescriptor>) -> Self {
        allowed_targets.sort_by(|a, b| {
            (&a.namespace, &a.server, &a.authorization_policy).cmp(&(
                &b.namespace,
                &b.server,
                &b.authorization_policy,
            ))
        });
        Self {
            total_targets: allowed_targets.len(),
            source,
            allowed_targets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    #[test]
    fn serializes_like_tool_output() {
        let targets = AllowedTargets::new(
            SourceRef {
                namespace: "prod".to_string(),
                workload: "frontend".to_string(),
                service_account: "frontend-sa".to_string(),
            },
            vec![TargetDescriptor {
                namespace: "prod".to_string(),
                server: "backend-server".to_string(),
                labels: btreemap! { "app".to_string() => "backend".to_string() },
                port: TargetPort::Number(8080),
                authorization_policy: "backend-policy".to_string(),
            }],
        );
        assert_eq!(
            serde_json::to_value(&targets).unwrap(),
            serde_json::json!({
                "source": {
                    "namespace": "prod",
                    "service": "frontend",
                    "serviceAccount": "frontend-sa",
                },
                "allowedTargets": [{
                    "namespace": "prod",
                    "server": "backend-server",
                    "labels": { "app": "backend" },
                    "port": 8080,
                    "authorizationPolicy": "backend-policy",
                }],
                "totalTargets": 1,
            })
        );
    }
}
