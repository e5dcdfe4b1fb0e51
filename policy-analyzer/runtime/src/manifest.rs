//! Loads objects from Kubernetes manifests on disk.
//!
//! Files may hold several YAML documents, `List` objects, or JSON. Documents
//! that can't be decoded, or whose kinds are not used by the analyzer, are
//! skipped. Namespaced objects without a namespace are placed in `default`,
//! as `kubectl apply` would.

use anyhow::{Context, Result};
use linkerd_policy_analyzer_k8s_api::{
    policy::GROUP,
    DynamicObject, Namespace, Pod, Resource, ResourceExt, ServiceAccount,
};
use linkerd_policy_analyzer_k8s_index::MemorySource;
use serde::{de::DeserializeOwned, Deserialize};
use serde_yaml::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info_span, instrument};

const DEFAULT_NAMESPACE: &str = "default";

/// Loads every manifest at `paths`. Directories are read recursively.
#[instrument(skip_all, fields(paths = paths.len()))]
pub fn load(paths: &[PathBuf]) -> Result<MemorySource> {
    let mut objects = MemorySource::default();
    for path in paths {
        load_path(&mut objects, path)?;
    }
    tracing::info!(objects = objects.len(), "Loaded manifests");
    Ok(objects)
}

fn load_path(objects: &mut MemorySource, path: &Path) -> Result<()> {
    let metadata =
        fs::metadata(path).with_context(|| format!("failed to read {}", path.display()))?;

    if metadata.is_dir() {
        let mut entries = fs::read_dir(path)
            .with_context(|| format!("failed to read directory {}", path.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();
        for entry in entries {
            if entry.is_dir() || is_manifest(&entry) {
                load_path(objects, &entry)?;
            }
        }
        return Ok(());
    }

    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let _span = info_span!("manifest", path = %path.display()).entered();
    parse_into(objects, &text);
    Ok(())
}

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

/// Decodes every document in `text` into `objects`.
pub(crate) fn parse_into(objects: &mut MemorySource, text: &str) {
    for document in serde_yaml::Deserializer::from_str(text) {
        match Value::deserialize(document) {
            Ok(Value::Null) => {}
            Ok(value) => add(objects, value),
            Err(error) => tracing::warn!(%error, "Skipping unparseable document"),
        }
    }
}

fn add(objects: &mut MemorySource, value: Value) {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let kind = field("kind");
    let api_version = field("apiVersion");
    let group = api_version.rsplit_once('/').map(|(group, _)| group);

    match (group, kind.as_str()) {
        (_, list) if list.ends_with("List") => {
            if let Value::Mapping(mut list) = value {
                if let Some(Value::Sequence(items)) = list.remove("items") {
                    for item in items {
                        add(objects, item);
                    }
                }
            }
        }

        (Some(GROUP), "Server") => {
            decode_policy(value, &mut objects.servers, &mut objects.malformed)
        }
        (Some(GROUP), "AuthorizationPolicy") => decode_policy(
            value,
            &mut objects.authorization_policies,
            &mut objects.malformed,
        ),
        (Some(GROUP), "MeshTLSAuthentication") => decode_policy(
            value,
            &mut objects.meshtls_authentications,
            &mut objects.malformed,
        ),
        (Some(GROUP), "NetworkAuthentication") => decode_policy(
            value,
            &mut objects.network_authentications,
            &mut objects.malformed,
        ),

        (None, "Pod") => objects.pods.extend(decode::<Pod>(value)),
        (None, "ServiceAccount") => objects
            .service_accounts
            .extend(decode::<ServiceAccount>(value)),
        (None, "Namespace") => match serde_yaml::from_value::<Namespace>(value) {
            Ok(ns) => objects.namespaces.push(ns),
            Err(error) => tracing::warn!(%error, "Skipping invalid Namespace"),
        },

        (_, kind) => tracing::debug!(%api_version, %kind, "Ignoring object"),
    }
}

/// Decodes a namespaced object, defaulting its namespace.
fn decode<T>(value: Value) -> Option<T>
where
    T: Resource + DeserializeOwned,
    T::DynamicType: Default,
{
    let dt = T::DynamicType::default();
    let kind = T::kind(&dt);
    match serde_yaml::from_value::<T>(value) {
        Ok(obj) => Some(with_namespace(obj)),
        Err(error) => {
            tracing::warn!(%kind, %error, "Skipping invalid object");
            None
        }
    }
}

/// Decodes a policy resource. One whose spec can't be decoded is kept
/// untyped, so that validation reports it instead of losing it.
fn decode_policy<T>(value: Value, decoded: &mut Vec<T>, malformed: &mut Vec<DynamicObject>)
where
    T: Resource + DeserializeOwned,
    T::DynamicType: Default,
{
    let dt = T::DynamicType::default();
    let kind = T::kind(&dt);
    let error = match serde_yaml::from_value::<T>(value.clone()) {
        Ok(obj) => {
            decoded.push(with_namespace(obj));
            return;
        }
        Err(error) => error,
    };
    match serde_yaml::from_value::<DynamicObject>(value) {
        Ok(obj) if obj.metadata.name.is_some() => {
            tracing::warn!(%kind, name = %obj.name_unchecked(), %error, "Invalid spec");
            malformed.push(with_namespace(obj));
        }
        _ => tracing::warn!(%kind, %error, "Skipping invalid object"),
    }
}

fn with_namespace<T: Resource>(mut obj: T) -> T {
    if obj.namespace().map_or(true, |ns| ns.is_empty()) {
        obj.meta_mut().namespace = Some(DEFAULT_NAMESPACE.to_string());
    }
    obj
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkerd_policy_analyzer_k8s_api::policy::server::Port;

    const MANIFESTS: &str = r#"
apiVersion: policy.linkerd.io/v1beta3
kind: Server
metadata:
  name: backend-server
  namespace: prod
spec:
  podSelector:
    matchLabels:
      app: backend
  port: 8080
  proxyProtocol: HTTP/1
---
apiVersion: policy.linkerd.io/v1alpha1
kind: AuthorizationPolicy
metadata:
  name: backend-policy
  namespace: prod
spec:
  targetRef:
    group: policy.linkerd.io
    kind: Server
    name: backend-server
  requiredAuthenticationRefs:
    - kind: MeshTLSAuthentication
      name: frontend-authn
---
apiVersion: policy.linkerd.io/v1alpha1
kind: MeshTLSAuthentication
metadata:
  name: frontend-authn
  namespace: prod
spec:
  identities:
    - frontend-sa.prod.serviceaccount.identity.linkerd.cluster.local
---
apiVersion: policy.linkerd.io/v1alpha1
kind: NetworkAuthentication
metadata:
  name: cluster-nets
spec:
  networks:
    - cidr: 10.0.0.0/8
      except:
        - 10.1.0.0/16
---
apiVersion: v1
kind: List
items:
  - apiVersion: v1
    kind: Pod
    metadata:
      name: frontend-1
      namespace: prod
      labels:
        app: frontend
    spec:
      serviceAccountName: frontend-sa
      containers:
        - name: app
          image: frontend
  - apiVersion: v1
    kind: ServiceAccount
    metadata:
      name: frontend-sa
      namespace: prod
---
apiVersion: v1
kind: Namespace
metadata:
  name: prod
  annotations:
    linkerd.io/inject: enabled
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: frontend
---
"#;

    #[test]
    fn parses_documents() {
        let mut objects = MemorySource::default();
        parse_into(&mut objects, MANIFESTS);

        assert_eq!(objects.servers.len(), 1);
        let server = &objects.servers[0];
        assert_eq!(server.name_unchecked(), "backend-server");
        assert_eq!(server.spec.port, Some(Port::Number(8080)));

        assert_eq!(objects.authorization_policies.len(), 1);
        assert_eq!(
            objects.authorization_policies[0].spec.target_ref.name,
            "backend-server"
        );
        assert_eq!(objects.meshtls_authentications.len(), 1);
        assert_eq!(objects.pods.len(), 1);
        assert_eq!(objects.service_accounts.len(), 1);
        assert_eq!(objects.namespaces.len(), 1);
        assert_eq!(objects.namespaces[0].namespace(), None);

        assert_eq!(objects.network_authentications.len(), 1);
        assert_eq!(
            objects.network_authentications[0].namespace().as_deref(),
            Some("default")
        );

        assert_eq!(objects.len(), 7);
    }

    #[test]
    fn keeps_resources_with_invalid_specs() {
        let mut objects = MemorySource::default();
        parse_into(
            &mut objects,
            r#"
apiVersion: policy.linkerd.io/v1beta3
kind: Server
metadata:
  name: broken
  namespace: prod
spec: [1, 2, 3]
---
apiVersion: policy.linkerd.io/v1beta3
kind: Server
metadata:
  name: no-spec
---
apiVersion: policy.linkerd.io/v1beta3
kind: Server
metadata:
  name: ok
  namespace: prod
spec:
  port: http
---
apiVersion: policy.linkerd.io/v1alpha1
kind: NetworkAuthentication
metadata:
  name: bad-nets
  namespace: prod
spec:
  networks:
    - cidr: 10.0.0.300/8
---
apiVersion: v1
kind: Pod
metadata:
  name: broken
spec: 7
"#,
        );
        assert_eq!(objects.servers.len(), 1);
        assert_eq!(objects.servers[0].name_unchecked(), "ok");

        assert_eq!(objects.network_authentications.len(), 1);
        assert_eq!(
            objects.network_authentications[0].spec.networks[0].cidr,
            "10.0.0.300/8"
        );

        let malformed = objects
            .malformed
            .iter()
            .map(|obj| {
                (
                    obj.types.as_ref().map(|t| t.kind.as_str()),
                    obj.namespace(),
                    obj.name_unchecked(),
                )
            })
            .collect::<Vec<_>>();
        assert_eq!(
            malformed,
            vec![
                (Some("Server"), Some("prod".to_string()), "broken".to_string()),
                (Some("Server"), Some("default".to_string()), "no-spec".to_string()),
            ]
        );
        assert!(objects.pods.is_empty());
    }

    #[test]
    fn parses_json() {
        let mut objects = MemorySource::default();
        parse_into(
            &mut objects,
            r#"{"apiVersion": "v1", "kind": "Pod", "metadata": {"name": "web-1"}}"#,
        );
        assert_eq!(objects.pods.len(), 1);
        assert_eq!(objects.pods[0].namespace().as_deref(), Some("default"));
    }

    #[test]
    fn ignores_other_groups() {
        let mut objects = MemorySource::default();
        parse_into(
            &mut objects,
            r#"
apiVersion: example.com/v1
kind: Server
metadata:
  name: web
"#,
        );
        assert_eq!(objects.len(), 0);
    }

    #[test]
    fn manifest_extensions() {
        assert!(is_manifest(Path::new("policy/server.yaml")));
        assert!(is_manifest(Path::new("server.yml")));
        assert!(is_manifest(Path::new("list.json")));
        assert!(!is_manifest(Path::new("README.md")));
    }
}
