#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod labels;
pub mod policy;

pub use self::labels::Labels;
pub use k8s_openapi::api::{
    self,
    core::v1::{Namespace, Pod, PodSpec, ServiceAccount},
};
pub use kube::{
    core::{DynamicObject, ObjectMeta, TypeMeta},
    Resource, ResourceExt,
};

/// Returns the labels of a resource as an owned, shareable label set.
pub fn labels_of<T: ResourceExt>(resource: &T) -> Labels {
    Labels::from(resource.labels().clone())
}

/// The name of the container injected into meshed pods.
pub const PROXY_CONTAINER_NAME: &str = "linkerd-proxy";

/// True when the pod runs the Linkerd proxy.
pub fn is_meshed(pod: &Pod) -> bool {
    pod.spec
        .iter()
        .flat_map(|spec| spec.containers.iter())
        .any(|c| c.name == PROXY_CONTAINER_NAME)
}

/// Returns the service account a pod runs as.
///
/// Pods that don't name a service account run as `default`.
pub fn pod_service_account(pod: &Pod) -> String {
    pod.spec
        .as_ref()
        .and_then(|spec| spec.service_account_name.as_deref())
        .filter(|sa| !sa.is_empty())
        .unwrap_or("default")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pod_service_account_defaults() {
        let pod = Pod {
            spec: Some(PodSpec {
                service_account_name: Some(String::new()),
                ..PodSpec::default()
            }),
            ..Pod::default()
        };
        assert_eq!(pod_service_account(&pod), "default");
        assert_eq!(pod_service_account(&Pod::default()), "default");

        let pod = Pod {
            spec: Some(PodSpec {
                service_account_name: Some("frontend-sa".to_string()),
                ..PodSpec::default()
            }),
            ..Pod::default()
        };
        assert_eq!(pod_service_account(&pod), "frontend-sa");
    }

    #[test]
    fn meshed_pods_run_the_proxy() {
        let mk = |names: &[&str]| Pod {
            spec: Some(PodSpec {
                containers: names
                    .iter()
                    .map(|name| api::core::v1::Container {
                        name: name.to_string(),
                        ..Default::default()
                    })
                    .collect(),
                ..PodSpec::default()
            }),
            ..Pod::default()
        };
        assert!(is_meshed(&mk(&["app", "linkerd-proxy"])));
        assert!(!is_meshed(&mk(&["app"])));
        assert!(!is_meshed(&mk(&["linkerd-init"])));
        assert!(!is_meshed(&Pod::default()));
    }
}
