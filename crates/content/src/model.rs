//! Content objects and their association slots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ContentError;

/// Numeric object identifier
pub type ObjectId = i64;

/// Attributes of a relation edge (priority, custom params, tree flags)
pub type JoinData = Map<String, Value>;

/// Publication status of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    On,
    Draft,
    Off,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::On => "on",
            Status::Draft => "draft",
            Status::Off => "off",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "on" => Ok(Status::On),
            "draft" => Ok(Status::Draft),
            "off" => Ok(Status::Off),
            other => Err(ContentError::invalid(format!("unknown status '{}'", other))),
        }
    }
}

/// Which statuses are visible to a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    /// Only published objects
    #[default]
    On,
    /// Published and draft objects (preview)
    Draft,
    /// No status restriction
    All,
}

impl StatusLevel {
    pub fn allows(&self, status: Status) -> bool {
        match self {
            StatusLevel::On => status == Status::On,
            StatusLevel::Draft => matches!(status, Status::On | Status::Draft),
            StatusLevel::All => true,
        }
    }

    /// Statuses to restrict on, `None` when unrestricted
    pub fn statuses(&self) -> Option<Vec<Status>> {
        match self {
            StatusLevel::On => Some(vec![Status::On]),
            StatusLevel::Draft => Some(vec![Status::On, Status::Draft]),
            StatusLevel::All => None,
        }
    }
}

/// Contents of a named association slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Association {
    One(Box<ObjectEntity>),
    Many(Vec<ObjectEntity>),
    Empty,
}

impl Association {
    pub fn is_empty(&self) -> bool {
        match self {
            Association::One(_) => false,
            Association::Many(items) => items.is_empty(),
            Association::Empty => true,
        }
    }

    /// Related entities in slot order
    pub fn entities(&self) -> Vec<&ObjectEntity> {
        match self {
            Association::One(entity) => vec![entity.as_ref()],
            Association::Many(items) => items.iter().collect(),
            Association::Empty => Vec::new(),
        }
    }

    pub fn entities_mut(&mut self) -> Vec<&mut ObjectEntity> {
        match self {
            Association::One(entity) => vec![entity.as_mut()],
            Association::Many(items) => items.iter_mut().collect(),
            Association::Empty => Vec::new(),
        }
    }
}

/// A polymorphic content object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntity {
    pub id: ObjectId,
    pub uname: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    /// Type-specific columns
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    associations: BTreeMap<String, Association>,
    /// Raw edge attributes attached by the store when loaded through an association
    #[serde(rename = "_joinData", default, skip_serializing_if = "Option::is_none")]
    pub join_data: Option<JoinData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    relation: Option<JoinData>,
    #[serde(skip)]
    dirty: BTreeSet<String>,
}

impl ObjectEntity {
    pub fn new(id: ObjectId, uname: &str, object_type: &str) -> Self {
        Self {
            id,
            uname: uname.to_string(),
            object_type: object_type.to_string(),
            title: None,
            description: None,
            status: Status::On,
            deleted: false,
            lang: None,
            created: None,
            modified: None,
            attributes: Map::new(),
            associations: BTreeMap::new(),
            join_data: None,
            relation: None,
            dirty: BTreeSet::new(),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.insert(name.to_string(), value.into());
        self.dirty.insert(name.to_string());
    }

    /// Drop type-specific columns, leaving the shared object record
    pub fn into_base(mut self) -> Self {
        self.attributes.clear();
        self
    }

    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.get(name)
    }

    pub fn association_mut(&mut self, name: &str) -> Option<&mut Association> {
        self.associations.get_mut(name)
    }

    pub fn associations(&self) -> impl Iterator<Item = (&String, &Association)> {
        self.associations.iter()
    }

    pub fn set_association(&mut self, name: &str, association: Association) {
        self.associations.insert(name.to_string(), association);
        self.dirty.insert(name.to_string());
    }

    pub fn take_association(&mut self, name: &str) -> Option<Association> {
        self.associations.remove(name)
    }

    pub fn relation(&self) -> Option<&JoinData> {
        self.relation.as_ref()
    }

    pub fn set_relation(&mut self, relation: JoinData) {
        self.relation = Some(relation);
        self.dirty.insert("relation".to_string());
    }

    pub fn is_dirty(&self, field: &str) -> bool {
        self.dirty.contains(field)
    }

    pub fn has_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    pub fn set_dirty(&mut self, field: &str, dirty: bool) {
        if dirty {
            self.dirty.insert(field.to_string());
        } else {
            self.dirty.remove(field);
        }
    }

    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    pub fn is_visible(&self, level: StatusLevel) -> bool {
        !self.deleted && level.allows(self.status)
    }

    /// Overlay translated fields; shared columns first, the rest as attributes
    pub fn apply_translation(&mut self, lang: &str, translated: &Map<String, Value>) {
        for (field, value) in translated {
            match field.as_str() {
                "title" => self.title = value.as_str().map(str::to_string),
                "description" => self.description = value.as_str().map(str::to_string),
                _ => {
                    self.attributes.insert(field.clone(), value.clone());
                }
            }
        }
        self.lang = Some(lang.to_string());
    }
}
