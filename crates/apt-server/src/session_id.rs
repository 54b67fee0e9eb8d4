use serde::{Deserialize, Serialize};

/// An opaque session handle. The engine assumes trusted local callers
/// (spec Non-goals: no authentication/multi-tenant isolation), so this is
/// nothing more than a caller-chosen label keying a `SessionState`, not a
/// security token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
