use std::{convert::Infallible, fmt, str::FromStr};

/// Matches a client's mesh identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdentityMatch {
    /// Matches every authenticated identity.
    All,

    /// An exact match.
    Exact(String),
}

// === impl IdentityMatch ===

impl IdentityMatch {
    #[inline]
    pub fn matches(&self, identity: &str) -> bool {
        match self {
            Self::All => true,
            Self::Exact(name) => name == identity,
        }
    }
}

impl FromStr for IdentityMatch {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == crate::WILDCARD_IDENTITY {
            return Ok(Self::All);
        }
        Ok(Self::Exact(s.to_string()))
    }
}

impl fmt::Display for IdentityMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => crate::WILDCARD_IDENTITY.fmt(f),
            Self::Exact(name) => name.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_everything() {
        let m = "*".parse::<IdentityMatch>().unwrap();
        assert_eq!(m, IdentityMatch::All);
        assert!(m.matches("web.emojivoto.serviceaccount.identity.linkerd.cluster.local"));
        assert_eq!(m.to_string(), "*");
    }

    #[test]
    fn exact() {
        let id = "web.emojivoto.serviceaccount.identity.linkerd.cluster.local";
        let m = id.parse::<IdentityMatch>().unwrap();
        assert!(m.matches(id));
        assert!(!m.matches("vote.emojivoto.serviceaccount.identity.linkerd.cluster.local"));
        assert_eq!(m.to_string(), id);
    }
}
