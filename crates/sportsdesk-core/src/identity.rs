use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;

/// Identity established from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub uid: String,
    pub email: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl VerifiedToken {
    pub fn for_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            issued_at: None,
            expires_at: None,
        }
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify an opaque bearer token. Any rejection is an error.
    async fn verify(&self, token: &str) -> Result<VerifiedToken>;
}

/// Token following the `Bearer ` prefix of an `Authorization` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value.strip_prefix("Bearer ")
}
