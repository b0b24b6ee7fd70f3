use std::{sync::Arc, time::Duration};

use sportsdesk_core::{
    firebase::{FirebaseDatabase, FirebaseTokenVerifier, ServiceAccountKey},
    DatabaseBackend, DocumentStore, IdentityBackend, MemoryStore, Settings, SportsdeskError,
    StaticTokenVerifier, TokenVerifier,
};
use tracing::{error, info};

use crate::{ApiError, ApiResult};

/// External dependencies every data route needs.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl Services {
    pub fn from_settings(settings: &Settings) -> sportsdesk_core::Result<Self> {
        let timeout = Duration::from_secs(settings.database.timeout_secs);
        let needs_firebase = settings.database.backend == DatabaseBackend::Firebase
            || settings.identity.backend == IdentityBackend::Firebase;

        let key = needs_firebase
            .then(|| ServiceAccountKey::from_file(&settings.firebase.credentials_path))
            .transpose()?;
        let key_required = || {
            key.clone().ok_or_else(|| {
                SportsdeskError::Credentials("service account key not loaded".to_string())
            })
        };

        let store: Arc<dyn DocumentStore> = match settings.database.backend {
            DatabaseBackend::Firebase => {
                let url = settings
                    .database
                    .url
                    .as_deref()
                    .ok_or_else(|| SportsdeskError::Config("DB_URL is not set".to_string()))?;
                Arc::new(FirebaseDatabase::new(url, key_required()?, timeout)?)
            }
            DatabaseBackend::Fixture => {
                let path = settings.database.fixture_path.as_deref().ok_or_else(|| {
                    SportsdeskError::Config("database.fixture_path is not set".to_string())
                })?;
                Arc::new(MemoryStore::from_file(path)?)
            }
        };

        let verifier: Arc<dyn TokenVerifier> = match settings.identity.backend {
            IdentityBackend::Firebase => {
                let project_id = match &settings.firebase.project_id {
                    Some(id) => id.clone(),
                    None => key_required()?.project_id,
                };
                Arc::new(FirebaseTokenVerifier::new(project_id, timeout)?)
            }
            IdentityBackend::Static => Arc::new(StaticTokenVerifier::from_config(
                &settings.identity.static_tokens,
            )),
        };

        Ok(Self { store, verifier })
    }
}

/// Whether backend initialization succeeded. A failed start keeps serving so
/// the failure is visible to clients and `/health` instead of crash-looping.
#[derive(Clone)]
pub enum Readiness {
    Ready(Services),
    NotReady(Arc<str>),
}

#[derive(Clone)]
pub struct AppState {
    pub readiness: Readiness,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        let readiness = match Services::from_settings(settings) {
            Ok(services) => {
                info!(
                    database = ?settings.database.backend,
                    identity = ?settings.identity.backend,
                    "Backends initialized"
                );
                Readiness::Ready(services)
            }
            Err(e) => {
                error!(error = %e, "Backend initialization failed; API routes will answer 503");
                Readiness::NotReady(e.to_string().into())
            }
        };

        Self {
            readiness,
            max_body_bytes: settings.server.max_body_bytes,
        }
    }

    pub fn with_services(store: Arc<dyn DocumentStore>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            readiness: Readiness::Ready(Services { store, verifier }),
            max_body_bytes: sportsdesk_core::ServerConfig::default().max_body_bytes,
        }
    }

    pub fn not_ready(reason: impl Into<Arc<str>>) -> Self {
        Self {
            readiness: Readiness::NotReady(reason.into()),
            max_body_bytes: sportsdesk_core::ServerConfig::default().max_body_bytes,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.readiness, Readiness::Ready(_))
    }

    pub fn services(&self) -> ApiResult<&Services> {
        match &self.readiness {
            Readiness::Ready(services) => Ok(services),
            Readiness::NotReady(_) => Err(ApiError::NotReady),
        }
    }
}
