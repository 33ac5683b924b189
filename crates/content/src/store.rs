//! Content store abstraction
//!
//! The loader talks to the repository exclusively through [`ContentStore`].
//! Backends live under [`crate::backends`].

use async_trait::async_trait;

use crate::error::{ContentError, ContentResult};
use crate::filter::FilterCondition;
use crate::include::Contain;
use crate::model::{ObjectEntity, ObjectId, StatusLevel};
use crate::tree::TreePlacement;
use crate::types::{ObjectType, TypeRegistry};

/// Tree children of a folder
pub const CHILDREN: &str = "children";
/// Folders an object is filed under
pub const PARENTS: &str = "parents";
/// Canonical parent folder
pub const PARENT: &str = "parent";

/// Shape of an association slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Cardinality of the built-in tree associations; named relations are lists
pub fn cardinality(association: &str) -> Cardinality {
    if association == PARENT {
        Cardinality::One
    } else {
        Cardinality::Many
    }
}

/// Pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub page: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Rows skipped before this page, saturating for out-of-range pages
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Visibility and language applied to a store read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadScope {
    pub status_level: StatusLevel,
    pub lang: Option<String>,
}

impl ReadScope {
    pub fn new(status_level: StatusLevel, lang: Option<&str>) -> Self {
        Self {
            status_level,
            lang: lang.map(str::to_string),
        }
    }
}

/// A typed object query
#[derive(Debug, Clone, PartialEq)]
pub struct FetchQuery {
    pub object_type: String,
    pub conditions: Vec<FilterCondition>,
    /// Associations attached inline, without per-owner limits
    pub contain: Vec<String>,
    pub scope: ReadScope,
    pub page: Option<Page>,
}

impl FetchQuery {
    pub fn new(object_type: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            conditions: Vec::new(),
            contain: Vec::new(),
            scope: ReadScope::default(),
            page: None,
        }
    }

    pub fn by_ids(object_type: &str, ids: &[ObjectId]) -> Self {
        Self::new(object_type).condition(FilterCondition::Id(ids.to_vec()))
    }

    pub fn condition(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(mut self, conditions: Vec<FilterCondition>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    pub fn contain(mut self, associations: Vec<String>) -> Self {
        self.contain = associations;
        self
    }

    pub fn scope(mut self, scope: ReadScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn page(mut self, page: Option<Page>) -> Self {
        self.page = page;
        self
    }

    /// Parent folder from a `parent` condition, used for tree ordering
    pub fn parent_condition(&self) -> Option<ObjectId> {
        self.conditions.iter().find_map(|c| match c {
            FilterCondition::Parent(id) => Some(*id),
            _ => None,
        })
    }
}

/// Read access to a content repository
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Registry of object kinds known to this store
    fn object_types(&self) -> &TypeRegistry;

    /// Resolve a type by name, singular form or id
    fn object_type(&self, name: &str) -> ContentResult<&ObjectType> {
        self.object_types().get(name)
    }

    /// Translate a numeric id or a uname into an id
    async fn resolve_id(&self, id_or_uname: &str) -> ContentResult<ObjectId>;

    /// Visible records of the query type (or its descendants)
    async fn fetch_many(&self, query: &FetchQuery) -> ContentResult<Vec<ObjectEntity>>;

    /// Number of records matching the query, ignoring pagination
    async fn count(&self, query: &FetchQuery) -> ContentResult<usize>;

    /// Attach limited associations to already fetched objects
    async fn load_association_into(
        &self,
        objects: &mut [ObjectEntity],
        contains: &[Contain],
        scope: &ReadScope,
    ) -> ContentResult<()>;

    /// Every placement of `leaf`, with ancestors below `relative_to`,
    /// keeping only those that pass through `via` when given
    async fn fetch_tree_placements(
        &self,
        leaf: ObjectId,
        relative_to: Option<ObjectId>,
        via: Option<ObjectId>,
    ) -> ContentResult<Vec<TreePlacement>>;

    /// Related records of one object through a named association
    async fn fetch_related(
        &self,
        id: ObjectId,
        association: &str,
        query: &FetchQuery,
    ) -> ContentResult<Vec<ObjectEntity>>;

    /// First record of the query or `NotFound`
    async fn fetch_one(&self, query: &FetchQuery) -> ContentResult<ObjectEntity> {
        self.fetch_many(query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::not_found(format!("{} matching {:?}", query.object_type, query.conditions)))
    }

    /// Records by id, in no particular order
    async fn fetch_by_ids(
        &self,
        object_type: &str,
        ids: &[ObjectId],
        scope: &ReadScope,
    ) -> ContentResult<Vec<ObjectEntity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = FetchQuery::by_ids(object_type, ids).scope(scope.clone());
        self.fetch_many(&query).await
    }
}
