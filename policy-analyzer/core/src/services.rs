use crate::WorkloadRef;
use serde::Serialize;
use std::collections::BTreeMap;

/// A workload running the Linkerd proxy and the pods that make it up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MeshedService {
    #[serde(flatten)]
    pub service: WorkloadRef,
    pub pods: Vec<String>,
}

/// Meshed workloads keyed by `<namespace>/<service>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshedServices {
    pub total_services: usize,
    pub services: BTreeMap<String, MeshedService>,
}

// === impl MeshedServices ===

impl MeshedServices {
    /// Groups meshed pods by the workload they belong to. Pod names are sorted.
    pub fn new(pods: impl IntoIterator<Item = (WorkloadRef, String)>) -> Self {
        let mut services = BTreeMap::<String, MeshedService>::new();
        for (service, pod) in pods {
            let key = format!("{}/{}", service.namespace, service.workload);
            services
                .entry(key)
                .or_insert_with(|| MeshedService {
                    service,
                    pods: Vec::new(),
                })
                .pods
                .push(pod);
        }
        for service in services.values_mut() {
            service.pods.sort();
        }

        Self {
            total_services: services.len(),
            services,
        }
    }
}
