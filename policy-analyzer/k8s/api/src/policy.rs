pub mod authorization_policy;
pub mod meshtls_authentication;
pub mod network;
pub mod network_authentication;
pub mod server;
pub mod target_ref;

pub use self::{
    authorization_policy::{AuthorizationPolicy, AuthorizationPolicySpec},
    meshtls_authentication::{MeshTLSAuthentication, MeshTLSAuthenticationSpec, ServiceAccountRef},
    network::{Cidr, Network},
    network_authentication::{NetworkAuthentication, NetworkAuthenticationSpec},
    server::{Server, ServerSpec},
    target_ref::NamespacedTargetRef,
};

/// The API group of all Linkerd policy resources.
pub const GROUP: &str = "policy.linkerd.io";

/// Checks whether a `group`/`kind` pair refers to the resource type `T`.
///
/// Kinds are compared case-insensitively. A reference that omits its group
/// is matched on kind alone.
pub fn targets_kind<T>(group: Option<&str>, kind: &str) -> bool
where
    T: kube::Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();

    if let Some(group) = group {
        let t_group = T::group(&dt);
        let t_group = if t_group.is_empty() { "core" } else { &*t_group };
        let group = if group.is_empty() { "core" } else { group };
        if !group.eq_ignore_ascii_case(t_group) {
            return false;
        }
    }

    kind.eq_ignore_ascii_case(&T::kind(&dt))
}
