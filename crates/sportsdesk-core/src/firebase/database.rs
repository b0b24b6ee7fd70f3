use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{AccessTokenSource, ServiceAccountKey};
use crate::{Collection, DocumentStore, Result, SportsdeskError};

/// Realtime Database over its REST interface.
pub struct FirebaseDatabase {
    client: Client,
    base_url: String,
    tokens: AccessTokenSource,
}

impl FirebaseDatabase {
    pub fn new(database_url: &str, key: ServiceAccountKey, timeout: Duration) -> Result<Self> {
        let base_url = normalize_database_url(database_url)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            tokens: AccessTokenSource::new(client.clone(), key),
            client,
            base_url,
        })
    }

    pub fn project_id(&self) -> &str {
        self.tokens.project_id()
    }

    pub fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}.json", self.base_url, collection.path())
    }
}

fn normalize_database_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(SportsdeskError::Config("database url is empty".to_string()));
    }
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(SportsdeskError::Config(format!(
            "database url must be http(s): {trimmed}"
        )));
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl DocumentStore for FirebaseDatabase {
    async fn fetch(&self, collection: Collection) -> Result<Value> {
        let token = self.tokens.access_token().await?;
        let url = self.collection_url(collection);
        debug!(%url, "Fetching collection");

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(SportsdeskError::Database(format!(
                "GET /{}.json returned {}",
                collection.path(),
                response.status()
            )));
        }

        Ok(response.json::<Value>().await?)
    }
}
