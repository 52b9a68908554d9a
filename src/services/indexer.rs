//! Search indexer: keeps the full-text index in step with sensor creation and
//! translates caller queries into the engine's query DSL.
//!
//! Translation is closed: callers pick one strategy and one indexed field,
//! and only the search text is taken from their input.

use serde_json::{Value, json};
use std::str::FromStr;

use crate::error::SensorError;
use crate::models::sensor::SearchDocument;
use crate::stores::search::SearchStore;

pub const SENSOR_INDEX: &str = "sensors";
/// Engine default for `index.max_result_window`; larger pages are refused upstream.
pub const MAX_SEARCH_SIZE: usize = 10_000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SearchStrategy {
    Match,
    MatchPhrase,
    MatchPhrasePrefix,
    Prefix,
    Term,
    Wildcard,
    Fuzzy,
}

impl SearchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::Match => "match",
            SearchStrategy::MatchPhrase => "match_phrase",
            SearchStrategy::MatchPhrasePrefix => "match_phrase_prefix",
            SearchStrategy::Prefix => "prefix",
            SearchStrategy::Term => "term",
            SearchStrategy::Wildcard => "wildcard",
            SearchStrategy::Fuzzy => "fuzzy",
        }
    }
}

impl FromStr for SearchStrategy {
    type Err = SensorError;

    /// `similar` is our name for the engine's approximate match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match" => Ok(SearchStrategy::Match),
            "match_phrase" => Ok(SearchStrategy::MatchPhrase),
            "match_phrase_prefix" => Ok(SearchStrategy::MatchPhrasePrefix),
            "prefix" => Ok(SearchStrategy::Prefix),
            "term" => Ok(SearchStrategy::Term),
            "wildcard" => Ok(SearchStrategy::Wildcard),
            "fuzzy" | "similar" => Ok(SearchStrategy::Fuzzy),
            other => Err(SensorError::InvalidArgument(format!("unsupported search type {:?}", other))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SearchField {
    Name,
    Type,
    Description,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Name => "name",
            SearchField::Type => "type",
            SearchField::Description => "description",
        }
    }
}

/// A single-field text query, e.g. `{"name": "boiler"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub field: SearchField,
    pub text: String,
}

impl SearchQuery {
    pub fn parse(query_body: &str) -> Result<Self, SensorError> {
        let invalid = |why: &str| SensorError::InvalidArgument(format!("search query {}: {}", query_body, why));
        let value: Value = serde_json::from_str(query_body).map_err(|e| invalid(&e.to_string()))?;
        let object = value.as_object().ok_or_else(|| invalid("expected a JSON object"))?;
        if object.len() != 1 {
            return Err(invalid("expected exactly one field"));
        }
        let Some((key, text)) = object.iter().next() else {
            return Err(invalid("expected exactly one field"));
        };
        let field = match key.as_str() {
            "name" => SearchField::Name,
            "type" => SearchField::Type,
            "description" => SearchField::Description,
            _ => return Err(invalid("field must be one of name, type, description")),
        };
        let text = text.as_str().ok_or_else(|| invalid("search text must be a string"))?;
        Ok(SearchQuery {
            field,
            text: text.to_string(),
        })
    }

    /// Engine request body for this query.
    pub fn translate(&self, strategy: SearchStrategy, size: usize) -> Value {
        let mut clause = serde_json::Map::new();
        clause.insert(self.field.as_str().to_string(), Value::String(self.text.clone()));
        let mut query = serde_json::Map::new();
        query.insert(strategy.as_str().to_string(), Value::Object(clause));
        json!({ "size": size, "query": query })
    }
}

pub fn index_sensor(store: &dyn SearchStore, name: &str, sensor_type: &str, description: &str) -> Result<(), SensorError> {
    let doc = SearchDocument {
        name: name.to_string(),
        r#type: sensor_type.to_string(),
        description: description.to_string(),
    };
    Ok(store.index_document(SENSOR_INDEX, &doc)?)
}

/// Ranked hits, at most `size`. Hits carry no sensor id; callers resolve by name.
pub fn query(
    store: &dyn SearchStore,
    query_body: &str,
    search_type: &str,
    size: usize,
) -> Result<Vec<SearchDocument>, SensorError> {
    if size > MAX_SEARCH_SIZE {
        return Err(SensorError::InvalidArgument(format!(
            "search size {} exceeds the maximum of {}",
            size, MAX_SEARCH_SIZE
        )));
    }
    let strategy: SearchStrategy = search_type.parse()?;
    let body = SearchQuery::parse(query_body)?.translate(strategy, size);
    let mut hits = store.search(SENSOR_INDEX, &body)?;
    hits.truncate(size);
    Ok(hits)
}
