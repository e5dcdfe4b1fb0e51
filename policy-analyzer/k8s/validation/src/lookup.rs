use ahash::AHashMap as HashMap;
use futures::future::join_all;
use linkerd_policy_analyzer_k8s_api::ResourceExt;
use std::{collections::BTreeSet, future::Future};

/// Objects listed per namespace.
///
/// A namespace whose listing failed is recorded as unknown, so that rules can
/// tell "no such object" apart from "could not look".
#[derive(Debug)]
pub(crate) struct ByNamespace<T> {
    by_ns: HashMap<String, Option<Vec<T>>>,
}

impl<T> Default for ByNamespace<T> {
    fn default() -> Self {
        Self {
            by_ns: HashMap::default(),
        }
    }
}

impl<T: ResourceExt> ByNamespace<T> {
    /// Lists objects in each namespace concurrently.
    pub(crate) async fn fetch<F, Fut>(
        kind: &'static str,
        namespaces: impl IntoIterator<Item = String>,
        list: F,
    ) -> Self
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = anyhow::Result<Vec<T>>>,
    {
        let namespaces = namespaces.into_iter().collect::<BTreeSet<_>>();
        let results = join_all(namespaces.into_iter().map(|ns| {
            let listing = list(ns.clone());
            async move { (ns, listing.await) }
        }))
        .await;

        let by_ns = results
            .into_iter()
            .map(|(ns, res)| match res {
                Ok(objects) => (ns, Some(objects)),
                Err(error) => {
                    tracing::warn!(%ns, %error, "Failed to list {kind}");
                    (ns, None)
                }
            })
            .collect();
        Self { by_ns }
    }

    /// Groups already-listed objects by namespace.
    pub(crate) fn group(objects: impl IntoIterator<Item = T>) -> Self {
        let mut grouped = HashMap::<String, Vec<T>>::default();
        for obj in objects {
            grouped
                .entry(obj.namespace().unwrap_or_default())
                .or_default()
                .push(obj);
        }
        Self {
            by_ns: grouped.into_iter().map(|(ns, objs)| (ns, Some(objs))).collect(),
        }
    }

    /// The objects in `ns`, or `None` if they could not be listed.
    pub(crate) fn listed(&self, ns: &str) -> Option<&[T]> {
        match self.by_ns.get(ns) {
            Some(Some(objects)) => Some(objects),
            Some(None) => None,
            None => Some(&[]),
        }
    }

    /// Whether `ns` holds an object named `name`. An unlisted namespace holds
    /// nothing.
    pub(crate) fn contains(&self, ns: &str, name: &str) -> bool {
        self.listed(ns)
            .unwrap_or_default()
            .iter()
            .any(|obj| obj.name_unchecked() == name)
    }
}
