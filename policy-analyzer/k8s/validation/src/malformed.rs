use linkerd_policy_analyzer_core::ValidationResult;
use linkerd_policy_analyzer_k8s_api::{DynamicObject, ResourceExt};
use linkerd_policy_analyzer_k8s_index::ObjectSource;

/// Lists the resources of `kind` whose spec could not be decoded.
pub(crate) async fn list<S>(source: &S, ns: Option<&str>, kind: &str) -> Vec<DynamicObject>
where
    S: ObjectSource + ?Sized,
{
    match source.malformed(ns).await {
        Ok(objects) => objects
            .into_iter()
            .filter(|obj| is_kind(obj, kind))
            .collect(),
        Err(error) => {
            tracing::warn!(?ns, %kind, %error, "Failed to list malformed resources");
            vec![]
        }
    }
}

pub(crate) fn is_kind(obj: &DynamicObject, kind: &str) -> bool {
    obj.types.as_ref().is_some_and(|t| t.kind == kind)
}

/// Reports a resource that has no usable spec.
pub(crate) fn invalid_spec(
    resource_type: &str,
    obj: &DynamicObject,
    code: &str,
    remediation: &str,
) -> ValidationResult {
    let mut result = ValidationResult::new(
        resource_type,
        obj.namespace().unwrap_or_default(),
        obj.name_unchecked(),
    );
    result.error("Missing or invalid spec", "spec", code, remediation);
    result.finalize()
}
