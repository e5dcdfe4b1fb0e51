use super::super::labels;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes a server interface exposed by a set of pods.
///
/// Fields are optional so that incomplete resources can still be read and
/// reported on; admission rules are applied by the validator.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, CustomResource, Deserialize, Serialize, JsonSchema,
)]
#[kube(
    group = "policy.linkerd.io",
    version = "v1beta3",
    kind = "Server",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_selector: Option<labels::Selector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<Port>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_protocol: Option<ProxyProtocol>,
}

/// References a pod spec's port by name or number.
///
/// Numbers are held as declared; range checks belong to validation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Port {
    Number(i64),
    Name(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProxyProtocol {
    #[default]
    Unknown,
    Http1,
    Http2,
    Grpc,
    Opaque,
    Tls,
    /// A value outside of the supported set, preserved verbatim.
    Unrecognized(String),
}

// === impl Port ===

impl Port {
    /// Returns the port number if it is a number within 1-65535.
    pub fn number(&self) -> Option<u16> {
        match self {
            Port::Number(n) => u16::try_from(*n).ok().filter(|n| *n != 0),
            Port::Name(_) => None,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Number(n) => fmt::Display::fmt(n, f),
            Port::Name(n) => fmt::Display::fmt(n, f),
        }
    }
}

impl From<u16> for Port {
    fn from(port: u16) -> Self {
        Port::Number(port.into())
    }
}

// === impl ProxyProtocol ===

impl ProxyProtocol {
    pub const SUPPORTED: [&'static str; 6] =
        ["unknown", "HTTP/1", "HTTP/2", "gRPC", "opaque", "TLS"];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => "unknown",
            Self::Http1 => "HTTP/1",
            Self::Http2 => "HTTP/2",
            Self::Grpc => "gRPC",
            Self::Opaque => "opaque",
            Self::Tls => "TLS",
            Self::Unrecognized(s) => s,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<&str> for ProxyProtocol {
    fn from(s: &str) -> Self {
        match s {
            "unknown" => Self::Unknown,
            "HTTP/1" => Self::Http1,
            "HTTP/2" => Self::Http2,
            "gRPC" => Self::Grpc,
            "opaque" => Self::Opaque,
            "TLS" => Self::Tls,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for ProxyProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProxyProtocol {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProxyProtocol {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(Self::from(s.as_str()))
    }
}

impl JsonSchema for ProxyProtocol {
    fn schema_name() -> String {
        "ProxyProtocol".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}
