use std::{fs, path::Path};

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Result, SportsdeskError};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DATABASE_SCOPES: &str =
    "https://www.googleapis.com/auth/firebase.database https://www.googleapis.com/auth/userinfo.email";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Cached access tokens are renewed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Google service-account key file, as downloaded from the Firebase console.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: SecretString,
    pub client_email: String,
    #[serde(default = "ServiceAccountKey::default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    fn default_token_uri() -> String {
        DEFAULT_TOKEN_URI.to_string()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SportsdeskError::Credentials(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(raw)
            .map_err(|e| SportsdeskError::Credentials(format!("parsing service account: {e}")))?;

        if let Some(kind) = key.account_type.as_deref() {
            if kind != "service_account" {
                return Err(SportsdeskError::Credentials(format!(
                    "expected a service_account key, found {kind}"
                )));
            }
        }
        Ok(key)
    }

    /// Signed JWT-bearer assertion exchanged for an OAuth2 access token.
    fn assertion(&self, now: i64) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: DATABASE_SCOPES,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(|e| SportsdeskError::Credentials(format!("invalid private key: {e}")))?;

        encode(&header, &claims, &key)
            .map_err(|e| SportsdeskError::Credentials(format!("signing assertion: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    value: SecretString,
    expires_at: i64,
}

/// Mints and caches OAuth2 access tokens for a service account.
pub struct AccessTokenSource {
    client: Client,
    key: ServiceAccountKey,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenSource {
    pub fn new(client: Client, key: ServiceAccountKey) -> Self {
        Self {
            client,
            key,
            cached: Mutex::new(None),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.key.project_id
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached
            .as_ref()
            .filter(|token| token.expires_at - EXPIRY_MARGIN_SECS > now)
        {
            return Ok(token.value.expose_secret().to_string());
        }

        let assertion = self.key.assertion(now)?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SportsdeskError::Credentials(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "Minted database access token"
        );

        *cached = Some(CachedToken {
            value: SecretString::from(token.access_token.clone()),
            expires_at: now + token.expires_in,
        });
        Ok(token.access_token)
    }
}
