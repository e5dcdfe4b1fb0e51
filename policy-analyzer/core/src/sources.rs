use crate::WorkloadRef;
use serde::Serialize;
use std::collections::BTreeMap;

/// A client that an authorization policy admits to a server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    #[serde(flatten)]
    pub kind: SourceKind,
    pub authentication_policy: String,
    pub authorization_policy: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SourceKind {
    Wildcard {
        description: String,
    },
    Identity {
        identity: String,
    },
    #[serde(rename_all = "camelCase")]
    ServiceAccount {
        service_account: String,
        namespace: String,
    },
    Network {
        cidr: String,
        except: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedSources {
    pub target: WorkloadRef,
    pub matching_servers: Vec<String>,
    pub allowed_sources: Vec<SourceDescriptor>,
    pub total_sources: usize,
}

/// Reported instead of a source list when no server selects the workload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NoMatchingServers {
    pub message: String,
}

/// The outcome of a reverse lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SourcesLookup {
    Sources(AllowedSources),
    NoServers(NoMatchingServers),
}

// === impl SourceKind ===

impl SourceKind {
    pub fn wildcard() -> Self {
        Self::Wildcard {
            description: "All authenticated services".to_string(),
        }
    }

    /// The key by which sources are deduplicated.
    pub fn key(&self) -> String {
        match self {
            Self::Wildcard { .. } => "all-authenticated".to_string(),
            Self::Identity { identity } => identity.clone(),
            Self::ServiceAccount {
                service_account,
                namespace,
            } => format!("{namespace}/{service_account}"),
            Self::Network { cidr, .. } => format!("network-{cidr}"),
        }
    }
}

// === impl AllowedSources ===

impl AllowedSources {
    /// Builds the source list from descriptors keyed by [`SourceKind::key`].
    ///
    /// Later descriptors replace earlier ones with the same key.
    pub fn new(
        target: WorkloadRef,
        matching_servers: Vec<String>,
        sources: impl IntoIterator<Item = SourceDescriptor>,
    ) -> Self {
        let by_key = sources
            .into_iter()
            .map(|s| (s.kind.key(), s))
            .collect::<BTreeMap<_, _>>();
        let allowed_sources = by_key.into_values().collect::<Vec<_>>();
        Self {
            total_sources: allowed_sources.len(),
            target,
            matching_servers,
            allowed_sources,
        }
    }
}

// === impl NoMatchingServers ===

impl NoMatchingServers {
    pub fn new(target: &WorkloadRef) -> Self {
        Self {
            message: format!(
                "No Linkerd Servers found for service {} in namespace {}",
                target.workload, target.namespace
            ),
        }
    }
}

impl std::fmt::Display for NoMatchingServers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(kind: SourceKind, authn: &str) -> SourceDescriptor {
        SourceDescriptor {
            kind,
            authentication_policy: authn.to_string(),
            authorization_policy: "policy".to_string(),
        }
    }

    #[test]
    fn dedupes_by_key() {
        let sources = AllowedSources::new(
            WorkloadRef::new("prod", "backend"),
            vec!["backend-server".to_string()],
            vec![
                descriptor(SourceKind::wildcard(), "a"),
                descriptor(
                    SourceKind::ServiceAccount {
                        service_account: "web".to_string(),
                        namespace: "prod".to_string(),
                    },
                    "a",
                ),
                descriptor(SourceKind::wildcard(), "b"),
            ],
        );
        assert_eq!(sources.total_sources, 2);
        assert_eq!(sources.allowed_sources.len(), 2);
        let wildcard = sources
            .allowed_sources
            .iter()
            .find(|s| matches!(s.kind, SourceKind::Wildcard { .. }))
            .unwrap();
        assert_eq!(wildcard.authentication_policy, "b");
    }

    #[test]
    fn serializes_descriptors() {
        let json = serde_json::to_value(descriptor(SourceKind::wildcard(), "all")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "wildcard",
                "description": "All authenticated services",
                "authenticationPolicy": "all",
                "authorizationPolicy": "policy",
            })
        );

        let json = serde_json::to_value(descriptor(
            SourceKind::Network {
                cidr: "10.0.0.0/8".to_string(),
                except: vec!["10.1.0.0/16".to_string()],
            },
            "cluster",
        ))
        .unwrap();
        assert_eq!(json["type"], "network");
        assert_eq!(json["cidr"], "10.0.0.0/8");
        assert_eq!(json["except"], serde_json::json!(["10.1.0.0/16"]));
    }

    #[test]
    fn no_servers_message() {
        let lookup = SourcesLookup::NoServers(NoMatchingServers::new(&WorkloadRef::new(
            "prod", "backend",
        )));
        assert_eq!(
            serde_json::to_value(&lookup).unwrap(),
            serde_json::json!({
                "message": "No Linkerd Servers found for service backend in namespace prod",
            })
        );
    }
}
