use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use reqwest::{header::CACHE_CONTROL, Client};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{Result, SportsdeskError, TokenVerifier, VerifiedToken};

const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);
/// An unknown `kid` triggers a refetch at most this often.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
const CLOCK_SKEW_SECS: i64 = 60;
const MAX_UID_LEN: usize = 128;

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    iat: i64,
    exp: i64,
    #[serde(default)]
    auth_time: Option<i64>,
    #[serde(default)]
    email: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Verifies Firebase ID tokens against Google's published signing keys.
pub struct FirebaseTokenVerifier {
    client: Client,
    project_id: String,
    jwks_url: String,
    refresh_interval: Duration,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseTokenVerifier {
    pub fn new(project_id: impl Into<String>, timeout: Duration) -> Result<Self> {
        let project_id = project_id.into();
        if project_id.trim().is_empty() {
            return Err(SportsdeskError::Config(
                "firebase project id is empty".to_string(),
            ));
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            project_id,
            jwks_url: SECURETOKEN_JWKS_URL.to_string(),
            refresh_interval: MIN_REFRESH_INTERVAL,
            keys: RwLock::new(None),
        })
    }

    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    #[cfg(test)]
    fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);
        validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);
        validation.leeway = CLOCK_SKEW_SECS as u64;
        validation
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        {
            let cached = self.keys.read().await;
            if let Some(cached) = cached.as_ref() {
                let fresh = cached.expires_at > Instant::now();
                if fresh {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return key_from_jwk(jwk);
                    }
                    if cached.fetched_at.elapsed() < self.refresh_interval {
                        return Err(unknown_kid(kid));
                    }
                }
            }
        }

        let mut cached = self.keys.write().await;
        let fetched = self.fetch_keys().await?;
        let key = fetched.keys.find(kid).map(key_from_jwk).transpose()?;
        *cached = Some(fetched);
        key.ok_or_else(|| unknown_kid(kid))
    }

    async fn fetch_keys(&self) -> Result<CachedKeys> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?;

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .and_then(max_age)
            .unwrap_or(DEFAULT_KEY_TTL);
        let keys: JwkSet = response.json().await?;
        info!(
            keys = keys.keys.len(),
            ttl_secs = ttl.as_secs(),
            "Fetched ID token signing keys"
        );

        let now = Instant::now();
        Ok(CachedKeys {
            keys,
            fetched_at: now,
            expires_at: now + ttl,
        })
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let header = decode_header(token).map_err(invalid)?;
        if header.alg != Algorithm::RS256 {
            return Err(SportsdeskError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| SportsdeskError::InvalidToken("missing kid header".to_string()))?;

        let key = self.decoding_key(&kid).await?;
        let claims = decode::<FirebaseClaims>(token, &key, &self.validation())
            .map_err(invalid)?
            .claims;
        check_claims(&claims, Utc::now().timestamp())?;

        debug!(uid = %claims.sub, "ID token verified");
        Ok(VerifiedToken {
            issued_at: DateTime::from_timestamp(claims.iat, 0),
            expires_at: DateTime::from_timestamp(claims.exp, 0),
            email: claims.email,
            uid: claims.sub,
        })
    }
}

/// Checks `jsonwebtoken` leaves to the caller.
fn check_claims(claims: &FirebaseClaims, now: i64) -> Result<()> {
    if claims.sub.is_empty() {
        return Err(SportsdeskError::InvalidToken("empty subject".to_string()));
    }
    if claims.sub.len() > MAX_UID_LEN {
        return Err(SportsdeskError::InvalidToken(
            "subject longer than 128 characters".to_string(),
        ));
    }
    if claims.iat > now + CLOCK_SKEW_SECS {
        return Err(SportsdeskError::InvalidToken(
            "token issued in the future".to_string(),
        ));
    }
    if claims.auth_time.is_some_and(|t| t > now + CLOCK_SKEW_SECS) {
        return Err(SportsdeskError::InvalidToken(
            "authentication time in the future".to_string(),
        ));
    }
    Ok(())
}

/// `max-age` directive of a `Cache-Control` value.
pub fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse().ok())
        .map(Duration::from_secs)
}

fn key_from_jwk(jwk: &jsonwebtoken::jwk::Jwk) -> Result<DecodingKey> {
    DecodingKey::from_jwk(jwk).map_err(invalid)
}

fn unknown_kid(kid: &str) -> SportsdeskError {
    SportsdeskError::InvalidToken(format!("no signing key for kid {kid}"))
}

fn invalid(err: jsonwebtoken::errors::Error) -> SportsdeskError {
    SportsdeskError::InvalidToken(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn verifier() -> FirebaseTokenVerifier {
        // Unroutable so a stray fetch fails fast instead of reaching Google.
        FirebaseTokenVerifier::new("demo-project", Duration::from_millis(200))
            .unwrap()
            .with_jwks_url("http://127.0.0.1:9/jwks")
    }

    fn claims(sub: &str, iat: i64, auth_time: Option<i64>) -> FirebaseClaims {
        FirebaseClaims {
            sub: sub.to_string(),
            iat,
            exp: iat + 3600,
            auth_time,
            email: None,
        }
    }

    #[test]
    fn max_age_is_read_from_cache_control() {
        assert_eq!(
            max_age("public, max-age=19302, must-revalidate, no-transform"),
            Some(Duration::from_secs(19302))
        );
        assert_eq!(max_age("no-cache"), None);
        assert_eq!(max_age("max-age=soon"), None);
    }

    #[test]
    fn claim_checks() {
        let now = 1_700_000_000;
        assert!(check_claims(&claims("uid-1", now, Some(now - 10)), now).is_ok());
        assert!(check_claims(&claims("", now, None), now).is_err());
        assert!(check_claims(&claims(&"x".repeat(129), now, None), now).is_err());
        assert!(check_claims(&claims("uid-1", now + 3600, None), now).is_err());
        assert!(check_claims(&claims("uid-1", now, Some(now + 3600)), now).is_err());
    }

    #[test]
    fn validation_pins_project() {
        let validation = verifier().validation();
        assert_eq!(validation.algorithms, vec![Algorithm::RS256]);
        assert!(validation
            .iss
            .as_ref()
            .is_some_and(|iss| iss.contains("https://securetoken.google.com/demo-project")));
    }

    #[test]
    fn empty_project_id_is_rejected() {
        assert!(FirebaseTokenVerifier::new("  ", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn garbage_tokens_are_rejected() {
        let err = verifier().verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, SportsdeskError::InvalidToken(_)));

        let err = verifier().verify("").await.unwrap_err();
        assert!(matches!(err, SportsdeskError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn hmac_tokens_are_rejected_before_key_lookup() {
        let token = encode(
            &Header::default(),
            &json!({"sub": "uid-1", "iat": 0, "exp": 4_000_000_000u64}),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let err = verifier().verify(&token).await.unwrap_err();
        assert!(err.to_string().contains("unexpected algorithm"));
    }

    #[tokio::test]
    async fn rs256_tokens_need_a_kid() {
        // {"alg":"RS256","typ":"JWT"} . {} . "sig"
        let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.e30.c2ln";
        let err = verifier().verify(token).await.unwrap_err();
        assert!(err.to_string().contains("missing kid"));
    }

    mod with_key_server {
        use super::*;
        use crate::firebase::test_support::{spawn, test_jwk, TEST_RSA_PEM};
        use axum::{extract::State, http::header, routing::get, Json, Router};
        use std::sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        };

        struct KeyServer {
            kids: Mutex<Vec<&'static str>>,
            max_age: u64,
            fetches: AtomicUsize,
        }

        impl KeyServer {
            fn new(kids: &[&'static str], max_age: u64) -> Arc<Self> {
                Arc::new(Self {
                    kids: Mutex::new(kids.to_vec()),
                    max_age,
                    fetches: AtomicUsize::new(0),
                })
            }

            fn fetches(&self) -> usize {
                self.fetches.load(Ordering::SeqCst)
            }
        }

        async fn jwks(
            State(server): State<Arc<KeyServer>>,
        ) -> ([(header::HeaderName, String); 1], Json<serde_json::Value>) {
            server.fetches.fetch_add(1, Ordering::SeqCst);
            let keys: Vec<_> = server.kids.lock().unwrap().iter().map(|k| test_jwk(k)).collect();
            (
                [(
                    header::CACHE_CONTROL,
                    format!("public, max-age={}, must-revalidate", server.max_age),
                )],
                Json(json!({ "keys": keys })),
            )
        }

        async fn verifier_for(server: &Arc<KeyServer>) -> FirebaseTokenVerifier {
            let app = Router::new()
                .route("/jwks", get(jwks))
                .with_state(server.clone());
            let base = spawn(app).await;
            FirebaseTokenVerifier::new("demo-project", Duration::from_secs(5))
                .unwrap()
                .with_jwks_url(format!("{base}/jwks"))
        }

        fn id_token(kid: &str, sub: &str) -> String {
            let now = Utc::now().timestamp();
            let mut header = Header::new(Algorithm::RS256);
            header.kid = Some(kid.to_string());
            encode(
                &header,
                &json!({
                    "iss": "https://securetoken.google.com/demo-project",
                    "aud": "demo-project",
                    "sub": sub,
                    "email": "driver@example.com",
                    "iat": now - 10,
                    "auth_time": now - 10,
                    "exp": now + 3600
                }),
                &EncodingKey::from_rsa_pem(TEST_RSA_PEM.as_bytes()).unwrap(),
            )
            .unwrap()
        }

        #[tokio::test]
        async fn signed_token_yields_its_uid() {
            let server = KeyServer::new(&["k1"], 3600);
            let verifier = verifier_for(&server).await;

            let verified = verifier.verify(&id_token("k1", "uid-42")).await.unwrap();

            assert_eq!(verified.uid, "uid-42");
            assert_eq!(verified.email.as_deref(), Some("driver@example.com"));
            assert!(verified.expires_at > verified.issued_at);
            assert_eq!(server.fetches(), 1);
        }

        #[tokio::test]
        async fn token_for_another_project_is_rejected() {
            let server = KeyServer::new(&["k1"], 3600);
            let verifier = FirebaseTokenVerifier::new("other-project", Duration::from_secs(5))
                .unwrap()
                .with_jwks_url(verifier_for(&server).await.jwks_url);

            let err = verifier.verify(&id_token("k1", "uid-42")).await.unwrap_err();
            assert!(matches!(err, SportsdeskError::InvalidToken(_)));
        }

        #[tokio::test]
        async fn key_set_is_cached_for_max_age() {
            let server = KeyServer::new(&["k1"], 3600);
            let verifier = verifier_for(&server).await;

            for _ in 0..3 {
                verifier.verify(&id_token("k1", "uid-1")).await.unwrap();
            }
            assert_eq!(server.fetches(), 1);

            let cached = verifier.keys.read().await;
            let cached = cached.as_ref().unwrap();
            assert_eq!(
                cached.expires_at - cached.fetched_at,
                Duration::from_secs(3600)
            );
        }

        #[tokio::test]
        async fn expired_key_set_is_refetched() {
            let server = KeyServer::new(&["k1"], 0);
            let verifier = verifier_for(&server).await;

            verifier.verify(&id_token("k1", "uid-1")).await.unwrap();
            verifier.verify(&id_token("k1", "uid-1")).await.unwrap();

            assert_eq!(server.fetches(), 2);
        }

        #[tokio::test]
        async fn unknown_kid_refetches_at_most_once_per_interval() {
            let server = KeyServer::new(&["k1"], 3600);
            let verifier = verifier_for(&server)
                .await
                .with_refresh_interval(Duration::from_millis(300));

            verifier.verify(&id_token("k1", "uid-1")).await.unwrap();
            assert_eq!(server.fetches(), 1);

            // Keys rotate upstream; the cache was filled too recently to refetch.
            server.kids.lock().unwrap().push("k2");
            let err = verifier.verify(&id_token("k2", "uid-1")).await.unwrap_err();
            assert!(err.to_string().contains("no signing key for kid k2"));
            assert_eq!(server.fetches(), 1);

            tokio::time::sleep(Duration::from_millis(400)).await;
            let verified = verifier.verify(&id_token("k2", "uid-1")).await.unwrap();
            assert_eq!(verified.uid, "uid-1");
            assert_eq!(server.fetches(), 2);

            // A kid that is still unknown right after the refetch does not fetch again.
            assert!(verifier.verify(&id_token("k3", "uid-1")).await.is_err());
            assert_eq!(server.fetches(), 2);
        }

        #[tokio::test]
        async fn unreachable_key_endpoint_is_an_error() {
            let verifier = verifier();
            let err = verifier.verify(&id_token("k1", "uid-1")).await.unwrap_err();
            assert!(matches!(err, SportsdeskError::Http(_)));
        }
    }
}
