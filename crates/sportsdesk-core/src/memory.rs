//! In-process backends for local development and tests.

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::info;

use crate::{
    config::StaticToken, Collection, DocumentStore, Result, SportsdeskError, TokenVerifier,
    VerifiedToken,
};

/// Collections held in memory. Paths that were never set read as absent.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: HashMap<Collection, Value>,
    fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, collection: Collection, value: Value) -> Self {
        self.collections.insert(collection, value);
        self
    }

    /// Build from a database export: a JSON object keyed by collection path.
    /// Unknown top-level keys are ignored.
    pub fn from_export(export: Value) -> Result<Self> {
        let Value::Object(mut root) = export else {
            return Err(SportsdeskError::UnexpectedShape {
                collection: "<export>".to_string(),
                detail: "database export must be a JSON object".to_string(),
            });
        };

        let mut store = Self::new();
        for collection in Collection::ALL {
            if let Some(value) = root.remove(collection.path()) {
                store.collections.insert(collection, value);
            }
        }
        Ok(store)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let store = Self::from_export(serde_json::from_str(&raw)?)?;
        info!(
            path = %path.display(),
            collections = store.collections.len(),
            "Loaded fixture database"
        );
        Ok(store)
    }

    /// Number of `fetch` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, collection: Collection) -> Result<Value> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .collections
            .get(&collection)
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// Fixed token table.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, uid: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), uid.into());
        self
    }

    pub fn from_config(tokens: &[StaticToken]) -> Self {
        tokens.iter().fold(Self::new(), |verifier, entry| {
            verifier.with_token(entry.token.expose_secret(), entry.uid.clone())
        })
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedToken> {
        if token.is_empty() {
            return Err(SportsdeskError::InvalidToken("empty token".to_string()));
        }
        self.tokens
            .get(token)
            .map(VerifiedToken::for_uid)
            .ok_or_else(|| SportsdeskError::InvalidToken("unknown static token".to_string()))
    }
}
