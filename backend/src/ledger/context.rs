//! Who is performing an operation, and when

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use shared::DEFAULT_SCHEMA_VERSION;

/// Capability of the acting user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    /// May act on behalf of any company and hard-delete records
    Admin,
}

/// The user behind an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user: String,
    pub company: String,
    pub role: Role,
}

impl Actor {
    pub fn member(user: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            company: company.into(),
            role: Role::Member,
        }
    }

    pub fn admin(user: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            company: company.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether the actor may act for `company`
    pub fn acts_for(&self, company: &str) -> bool {
        self.is_admin() || self.company == company
    }
}

/// Everything an engine operation needs to know about its invocation
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub actor: Actor,
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
    /// Hex SHA-256 of the triggering request
    pub fingerprint: String,
    /// Schema version stamped on records that do not carry their own
    pub schema_version: String,
}

impl OperationContext {
    pub fn new(actor: Actor, timestamp: DateTime<Utc>) -> Self {
        Self {
            actor,
            timestamp,
            request_id: Uuid::new_v4(),
            fingerprint: String::new(),
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
        }
    }

    /// Build a context for a request body, fingerprinting the body
    pub fn for_request<T: Serialize>(
        actor: Actor,
        request_id: Option<Uuid>,
        timestamp: Option<DateTime<Utc>>,
        body: &T,
    ) -> Self {
        let request_id = request_id.unwrap_or_else(Uuid::new_v4);
        Self {
            fingerprint: fingerprint(&request_id, body),
            actor,
            timestamp: timestamp.unwrap_or_else(Utc::now),
            request_id,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
        }
    }

    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }
}

/// SHA-256 over the request id and the canonical JSON of the body
pub fn fingerprint<T: Serialize>(request_id: &Uuid, body: &T) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request_id.as_bytes());
    // serde_json only fails on non-string map keys, which request bodies never have
    if let Ok(bytes) = serde_json::to_vec(body) {
        hasher.update(&bytes);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_acts_for() {
        let member = Actor::member("alice", "acme");
        assert!(member.acts_for("acme"));
        assert!(!member.acts_for("beta"));

        let admin = Actor::admin("root", "acme");
        assert!(admin.acts_for("beta"));
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let id = Uuid::nil();
        let a = fingerprint(&id, &json!({"delivery_id": "D1"}));
        let b = fingerprint(&id, &json!({"delivery_id": "D1"}));
        let c = fingerprint(&id, &json!({"delivery_id": "D2"}));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_for_request_defaults() {
        let ctx = OperationContext::for_request(Actor::member("u", "c"), None, None, &json!({}));
        assert_eq!(ctx.schema_version, "1");
        assert!(!ctx.fingerprint.is_empty());
    }
}
