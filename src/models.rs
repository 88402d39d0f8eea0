use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Identity ---

/// Role
///
/// The closed set of roles a session token may carry. A token without a role
/// claim is a `User`; any role string outside this set deserializes to
/// `Unrecognized`, which owns no allowlist and lands on the default home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Agent,
    Admin,
    /// Any role string outside the set above. It owns no allowlist and lands
    /// on the default home, which it is not allowed to open either: a signed
    /// in caller with such a role bounces between the default home and the
    /// not-found page. Route tables may not name it (`ConfigError::UnknownRole`).
    #[serde(other)]
    Unrecognized,
}

impl Role {
    /// Reads a role claim. An empty claim counts as absent.
    pub fn from_claim(raw: &str) -> Self {
        match raw {
            "" | "user" => Role::User,
            "agent" => Role::Agent,
            "admin" => Role::Admin,
            _ => Role::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Admin => "admin",
            Role::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential
///
/// The verified claim set of one request. It is only ever built by
/// `CredentialVerifier` after the signature and expiry checks pass, and it
/// is dropped together with the request evaluation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// The `_id` (or standard `sub`) claim, when the issuer provided one.
    pub subject_id: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

// --- Decision ---

/// RouteClass
///
/// Result of classifying a normalized path. Classification is priority
/// ordered: `Bypass` wins over `Public`, which wins over `Protected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Infrastructure and static assets. Never evaluated for auth.
    Bypass,
    /// Reachable anonymously; authenticated callers are sent home.
    Public,
    /// Requires a credential whose role allowlist covers the path.
    Protected,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Bypass => "bypass",
            RouteClass::Public => "public",
            RouteClass::Protected => "protected",
        }
    }
}

/// GateDecision
///
/// The terminal outcome for a single request. The transport either forwards
/// the original request untouched or redirects to the carried path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Forward,
    RedirectTo(String),
}

impl GateDecision {
    pub fn is_forward(&self) -> bool {
        matches!(self, GateDecision::Forward)
    }

    /// The redirect target, if this decision is a redirect.
    pub fn target(&self) -> Option<&str> {
        match self {
            GateDecision::Forward => None,
            GateDecision::RedirectTo(path) => Some(path.as_str()),
        }
    }
}
