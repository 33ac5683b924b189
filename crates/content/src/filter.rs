//! Query filters
//!
//! A filter is a map of strategy keyword to value, as it arrives from a
//! query string or a configuration file. [`Filter::conditions`] turns it
//! into typed [`FilterCondition`]s that store backends execute.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{ContentError, ContentResult};
use crate::model::{ObjectId, Status};

/// Strategy keywords understood by every backend
pub const FILTER_STRATEGIES: &[&str] = &["id", "uname", "status", "type", "parent", "ancestor", "query"];

/// Untyped filter, keyed by strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(BTreeMap<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_ids(ids: &[ObjectId]) -> Self {
        Self::new().with("id", ids.to_vec())
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Fill keys the caller did not set; caller values win on collision
    pub fn merge_defaults(&mut self, defaults: &Filter) {
        for (key, value) in &defaults.0 {
            self.0.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    /// Parse every entry into a typed condition
    pub fn conditions(&self) -> ContentResult<Vec<FilterCondition>> {
        self.0
            .iter()
            .map(|(key, value)| FilterCondition::parse(key, value))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Filter {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Filter(iter.into_iter().collect())
    }
}

/// A typed filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    Id(Vec<ObjectId>),
    Uname(Vec<String>),
    Status(Vec<Status>),
    /// Type names; each matches the type and its descendants
    Type(Vec<String>),
    /// Direct children of a folder
    Parent(ObjectId),
    /// Any descendant of a folder
    Ancestor(ObjectId),
    /// Case-insensitive text search on title and description
    Query(String),
}

impl FilterCondition {
    pub fn parse(key: &str, value: &Value) -> ContentResult<Self> {
        match key {
            "id" => Ok(FilterCondition::Id(parse_ids(key, value)?)),
            "uname" => Ok(FilterCondition::Uname(parse_list(key, value)?)),
            "status" => parse_list(key, value)?
                .iter()
                .map(|s| s.parse::<Status>())
                .collect::<ContentResult<Vec<_>>>()
                .map(FilterCondition::Status),
            "type" => Ok(FilterCondition::Type(parse_list(key, value)?)),
            "parent" => Ok(FilterCondition::Parent(parse_single_id(key, value)?)),
            "ancestor" => Ok(FilterCondition::Ancestor(parse_single_id(key, value)?)),
            "query" => match value.as_str().map(str::trim) {
                Some(text) if !text.is_empty() => Ok(FilterCondition::Query(text.to_string())),
                _ => Err(ContentError::invalid("filter 'query' needs a non-empty string")),
            },
            other => Err(ContentError::invalid(format!(
                "unknown filter strategy '{}' (expected one of: {})",
                other,
                FILTER_STRATEGIES.join(", ")
            ))),
        }
    }

    /// Whether an object passes this condition on its own columns
    pub fn matches_columns(&self, id: ObjectId, uname: &str, status: Status, text: &[Option<&str>]) -> Option<bool> {
        match self {
            FilterCondition::Id(ids) => Some(ids.contains(&id)),
            FilterCondition::Uname(unames) => Some(unames.iter().any(|u| u == uname)),
            FilterCondition::Status(statuses) => Some(statuses.contains(&status)),
            FilterCondition::Query(needle) => {
                let needle = needle.to_lowercase();
                Some(
                    text.iter()
                        .flatten()
                        .any(|haystack| haystack.to_lowercase().contains(&needle)),
                )
            }
            // Type and tree conditions need the registry or the tree
            _ => None,
        }
    }
}

fn parse_list(key: &str, value: &Value) -> ContentResult<Vec<String>> {
    let items: Vec<String> = match value {
        Value::String(s) => s.split(',').map(str::trim).map(str::to_string).collect(),
        Value::Number(n) => vec![n.to_string()],
        Value::Array(values) => values
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.trim().to_string()),
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(ContentError::invalid(format!(
                    "filter '{}' accepts only strings and numbers",
                    key
                ))),
            })
            .collect::<ContentResult<_>>()?,
        _ => {
            return Err(ContentError::invalid(format!(
                "filter '{}' accepts a string, a number or a list",
                key
            )))
        }
    };
    Ok(items.into_iter().filter(|s| !s.is_empty()).collect())
}

fn parse_ids(key: &str, value: &Value) -> ContentResult<Vec<ObjectId>> {
    parse_list(key, value)?
        .iter()
        .map(|s| {
            s.parse::<ObjectId>()
                .map_err(|_| ContentError::invalid(format!("filter '{}' expects numeric ids, got '{}'", key, s)))
        })
        .collect()
}

fn parse_single_id(key: &str, value: &Value) -> ContentResult<ObjectId> {
    let ids = parse_ids(key, value)?;
    match ids.as_slice() {
        [id] => Ok(*id),
        _ => Err(ContentError::invalid(format!("filter '{}' expects a single id", key))),
    }
}
