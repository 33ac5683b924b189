//! Association include specs (`"poster|1,children|20,has_author"`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ContentError, ContentResult};

/// One association to load, optionally capped per owner
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contain {
    pub association: String,
    pub limit: Option<usize>,
}

impl Contain {
    pub fn new(association: &str) -> Self {
        Self {
            association: association.to_string(),
            limit: None,
        }
    }

    pub fn limited(association: &str, limit: usize) -> Self {
        Self {
            association: association.to_string(),
            limit: Some(limit),
        }
    }
}

impl fmt::Display for Contain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "{}|{}", self.association, limit),
            None => f.write_str(&self.association),
        }
    }
}

/// Parsed `include` option
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeSpec {
    contains: Vec<Contain>,
}

impl IncludeSpec {
    pub fn new(contains: Vec<Contain>) -> Self {
        Self { contains }
    }

    /// Parse a comma separated list; empty segments are skipped
    pub fn parse(spec: &str) -> ContentResult<Self> {
        let mut contains: Vec<Contain> = Vec::new();
        for segment in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let contain = match segment.split_once('|') {
                Some((name, limit)) => {
                    let name = name.trim();
                    let limit = limit.trim().parse::<usize>().ok().filter(|l| *l > 0).ok_or_else(|| {
                        ContentError::invalid(format!(
                            "include '{}' has an invalid limit '{}'",
                            name, limit
                        ))
                    })?;
                    Contain::limited(name, limit)
                }
                None => Contain::new(segment),
            };
            if contain.association.is_empty() {
                return Err(ContentError::invalid(format!(
                    "include segment '{}' names no association",
                    segment
                )));
            }
            // A later mention of the same association replaces the earlier one.
            contains.retain(|c| c.association != contain.association);
            contains.push(contain);
        }
        Ok(Self { contains })
    }

    pub fn is_empty(&self) -> bool {
        self.contains.is_empty()
    }

    pub fn contains(&self) -> &[Contain] {
        &self.contains
    }

    pub fn association_names(&self) -> Vec<String> {
        self.contains.iter().map(|c| c.association.clone()).collect()
    }

    /// Split into inline associations and limited "late" contains
    pub fn partition(&self) -> (Vec<String>, Vec<Contain>) {
        let (late, inline): (Vec<_>, Vec<_>) =
            self.contains.iter().cloned().partition(|c| c.limit.is_some());
        (inline.into_iter().map(|c| c.association).collect(), late)
    }
}

impl FromStr for IncludeSpec {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncludeSpec::parse(s)
    }
}

impl fmt::Display for IncludeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.contains.iter().map(Contain::to_string).collect();
        f.write_str(&parts.join(","))
    }
}
