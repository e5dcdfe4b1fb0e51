use crate::{error::Error, ClusterInfo, ObjectSource};
use linkerd_policy_analyzer_core::SourceRef;
use linkerd_policy_analyzer_k8s_api::{self as k8s, labels::Selector};

/// A workload's service account and the mesh identity it is issued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub namespace: String,
    pub workload: String,
    pub service_account: String,
    pub identity: String,
}

/// Selects the pods of a workload by its `app` label.
pub fn app_selector(workload: &str) -> Selector {
    Selector::from_map(std::iter::once(("app".to_string(), workload.to_string())).collect())
}

/// Resolves the identity of the pods labeled `app=<workload>` in `namespace`.
///
/// The first pod listed is taken to represent the workload. When pods that
/// share the label run as different service accounts, the result depends on
/// the source's ordering.
pub async fn resolve<S>(
    source: &S,
    cluster: &ClusterInfo,
    namespace: &str,
    workload: &str,
) -> Result<ResolvedIdentity, Error>
where
    S: ObjectSource + ?Sized,
{
    let pods = source
        .pods(Some(namespace), &app_selector(workload))
        .await
        .map_err(Error::ListPods)?;

    let pod = pods.first().ok_or_else(|| Error::NoPods {
        namespace: namespace.to_string(),
        workload: workload.to_string(),
    })?;

    let service_account = k8s::pod_service_account(pod);
    tracing::debug!(%namespace, %workload, %service_account, "Resolved workload");
    Ok(ResolvedIdentity {
        identity: cluster.service_account_identity(namespace, &service_account),
        namespace: namespace.to_string(),
        workload: workload.to_string(),
        service_account,
    })
}

impl From<&ResolvedIdentity> for SourceRef {
    fn from(id: &ResolvedIdentity) -> Self {
        Self {
            namespace: id.namespace.clone(),
            workload: id.workload.clone(),
            service_account: id.service_account.clone(),
        }
    }
}
