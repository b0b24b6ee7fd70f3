use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{Collection, CollectionData, Result, SportsdeskError};

/// Read access to the document store. Each call returns the whole collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, collection: Collection) -> Result<Value>;
}

/// Fetch a collection and normalize it.
///
/// Arrays get each object element tagged with its position as `id`. Realtime
/// Database renders sparse arrays with `null` holes; those are dropped, so ids
/// keep the stored positions. An absent path reads as an empty collection.
pub async fn load_collection(
    store: &dyn DocumentStore,
    collection: Collection,
) -> Result<CollectionData> {
    let raw = store.fetch(collection).await?;
    let data = normalize(collection, raw)?;
    debug!(%collection, entries = data.len(), "collection loaded");
    Ok(data)
}

pub fn normalize(collection: Collection, raw: Value) -> Result<CollectionData> {
    match raw {
        Value::Object(map) => Ok(CollectionData::Keyed(map)),
        Value::Array(items) => Ok(CollectionData::Ordered(
            items
                .into_iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null())
                .map(|(id, mut item)| {
                    if let Value::Object(record) = &mut item {
                        record.insert("id".to_string(), Value::from(id));
                    }
                    item
                })
                .collect(),
        )),
        Value::Null => Ok(CollectionData::default()),
        other => Err(SportsdeskError::UnexpectedShape {
            collection: collection.to_string(),
            detail: format!("expected object or array, got {other}"),
        }),
    }
}
