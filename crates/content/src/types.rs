//! Object type registry
//!
//! Object types form an inheritance tree (`images` → `media` → `objects`).
//! The registry is the single place where a type name is turned into its
//! storage table and its ancestry, so the loader never compares type names
//! by hand.

use crate::error::{ContentError, ContentResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Table backing the abstract root type
pub const OBJECTS_TABLE: &str = "objects";

/// A named, possibly abstract, category of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    pub id: i64,
    pub name: String,
    pub singular: String,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Storage collection holding the type-specific columns
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    OBJECTS_TABLE.to_string()
}

impl ObjectType {
    pub fn new(id: i64, name: &str, singular: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            singular: singular.to_string(),
            is_abstract: false,
            parent_id: None,
            table: OBJECTS_TABLE.to_string(),
        }
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Records loaded through this type carry only the shared object columns
    pub fn is_base(&self) -> bool {
        self.is_abstract
    }

    /// Whether type-specific columns live in a table of their own
    pub fn has_own_table(&self) -> bool {
        self.table != OBJECTS_TABLE
    }
}

/// Registry of object kinds keyed by name
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: Vec<ObjectType>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<i64, usize>,
}

impl TypeRegistry {
    /// Build a registry, rejecting duplicates, dangling parents and cycles
    pub fn new(types: Vec<ObjectType>) -> ContentResult<Self> {
        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();

        for (index, object_type) in types.iter().enumerate() {
            if !is_identifier(&object_type.table) {
                return Err(ContentError::invalid(format!(
                    "object type '{}' has an invalid table name '{}'",
                    object_type.name, object_type.table
                )));
            }
            if by_name.insert(object_type.name.clone(), index).is_some() {
                return Err(ContentError::invalid(format!(
                    "duplicate object type '{}'",
                    object_type.name
                )));
            }
            if by_id.insert(object_type.id, index).is_some() {
                return Err(ContentError::invalid(format!(
                    "duplicate object type id {}",
                    object_type.id
                )));
            }
        }

        let registry = Self { types, by_name, by_id };
        registry.check_hierarchy()?;
        Ok(registry)
    }

    /// The object kinds shipped with a standard installation
    pub fn standard() -> Self {
        let types = vec![
            ObjectType::new(1, "objects", "object").abstract_type(),
            ObjectType::new(2, "folders", "folder").with_parent(1).with_table("folders"),
            ObjectType::new(3, "documents", "document").with_parent(1),
            ObjectType::new(4, "profiles", "profile").with_parent(1).with_table("profiles"),
            ObjectType::new(5, "locations", "location").with_parent(1).with_table("locations"),
            ObjectType::new(6, "events", "event").with_parent(1).with_table("events"),
            ObjectType::new(7, "media", "media")
                .with_parent(1)
                .with_table("media")
                .abstract_type(),
            ObjectType::new(8, "images", "image").with_parent(7).with_table("media"),
            ObjectType::new(9, "videos", "video").with_parent(7).with_table("media"),
            ObjectType::new(10, "audio", "audio").with_parent(7).with_table("media"),
            ObjectType::new(11, "files", "file").with_parent(7).with_table("media"),
        ];

        // The list above is known to be well formed.
        let by_name = types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        let by_id = types.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
        Self { types, by_name, by_id }
    }

    fn check_hierarchy(&self) -> ContentResult<()> {
        for object_type in &self.types {
            let mut seen = HashSet::new();
            let mut current = object_type;
            seen.insert(current.id);
            while let Some(parent_id) = current.parent_id {
                let parent = self.by_id(parent_id).ok_or_else(|| {
                    ContentError::invalid(format!(
                        "object type '{}' refers to unknown parent {}",
                        current.name, parent_id
                    ))
                })?;
                if !seen.insert(parent.id) {
                    return Err(ContentError::invalid(format!(
                        "object type '{}' has a cyclic parent chain",
                        object_type.name
                    )));
                }
                current = parent;
            }
        }
        Ok(())
    }

    /// Look up a type by name, singular form or numeric id
    pub fn get(&self, name: &str) -> ContentResult<&ObjectType> {
        if let Some(index) = self.by_name.get(name) {
            return Ok(&self.types[*index]);
        }
        if let Some(found) = self.types.iter().find(|t| t.singular == name) {
            return Ok(found);
        }
        name.parse::<i64>()
            .ok()
            .and_then(|id| self.by_id(id))
            .ok_or_else(|| ContentError::not_found(format!("object type '{}'", name)))
    }

    pub fn by_id(&self, id: i64) -> Option<&ObjectType> {
        self.by_id.get(&id).map(|index| &self.types[*index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    pub fn parent_of(&self, object_type: &ObjectType) -> Option<&ObjectType> {
        object_type.parent_id.and_then(|id| self.by_id(id))
    }

    /// The type itself followed by its ancestors, most specific first
    pub fn lineage<'a>(&'a self, object_type: &'a ObjectType) -> Lineage<'a> {
        Lineage {
            registry: self,
            next: Some(object_type),
            remaining: self.types.len(),
        }
    }

    /// Whether `name` is `ancestor` or inherits from it
    pub fn is_a(&self, name: &str, ancestor: &str) -> bool {
        match self.get(name) {
            Ok(object_type) => self.lineage(object_type).any(|t| t.name == ancestor),
            Err(_) => false,
        }
    }

    /// The type and every type inheriting from it
    pub fn descendants(&self, name: &str) -> ContentResult<Vec<&ObjectType>> {
        let root = self.get(name)?;
        Ok(self
            .types
            .iter()
            .filter(|t| self.lineage(t).any(|a| a.id == root.id))
            .collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Iterator over a type's ancestry
pub struct Lineage<'a> {
    registry: &'a TypeRegistry,
    next: Option<&'a ObjectType>,
    remaining: usize,
}

impl<'a> Iterator for Lineage<'a> {
    type Item = &'a ObjectType;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next.take()?;
        self.next = self.registry.parent_of(current);
        Some(current)
    }
}

/// Plain SQL identifier: letters, digits and underscores, not starting with a digit
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
