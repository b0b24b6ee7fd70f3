use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Top-level paths served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Races,
    Games,
    Logos,
    EpicGames,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Races,
        Collection::Games,
        Collection::Logos,
        Collection::EpicGames,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Collection::Races => "f1",
            Collection::Games => "games",
            Collection::Logos => "logos",
            Collection::EpicGames => "epic_games",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A whole collection as returned by the store. Serializes to the same shape
/// it was stored in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollectionData {
    Keyed(Map<String, Value>),
    Ordered(Vec<Value>),
}

impl Default for CollectionData {
    fn default() -> Self {
        CollectionData::Ordered(Vec::new())
    }
}

impl CollectionData {
    pub fn len(&self) -> usize {
        match self {
            CollectionData::Keyed(map) => map.len(),
            CollectionData::Ordered(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record values in store order, ignoring keys.
    pub fn records(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            CollectionData::Keyed(map) => Box::new(map.values()),
            CollectionData::Ordered(items) => Box::new(items.iter()),
        }
    }

    /// Keyed lookup. Ordered collections have no keys and never match.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            CollectionData::Keyed(map) => map.get(key),
            CollectionData::Ordered(_) => None,
        }
    }
}

/// Races whose `country` equals `country`, ignoring case. Records without a
/// string `country` compare as the empty string.
pub fn races_in_country(races: &CollectionData, country: &str) -> Vec<Value> {
    let wanted = country.to_lowercase();
    races
        .records()
        .filter(|race| {
            race.get("country")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_lowercase()
                == wanted
        })
        .cloned()
        .collect()
}

/// Entry count of a single JSON value: element or key count for containers,
/// zero for null, one for any scalar.
pub fn entry_len(value: &Value) -> usize {
    match value {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::Null => 0,
        _ => 1,
    }
}
