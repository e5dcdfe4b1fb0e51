/// Errors that end a resolution before any result is produced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} is required")]
    MissingArgument(&'static str),

    #[error("no pods found for service {workload} in namespace {namespace}")]
    NoPods { namespace: String, workload: String },

    #[error("failed to list pods: {0}")]
    ListPods(anyhow::Error),

    #[error("failed to list Servers: {0} (ensure Linkerd policy CRDs are installed)")]
    ListServers(anyhow::Error),
}

/// Fails with [`Error::MissingArgument`] when `value` is empty.
pub(crate) fn required(name: &'static str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::MissingArgument(name));
    }
    Ok(())
}
