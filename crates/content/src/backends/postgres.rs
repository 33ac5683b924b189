//! PostgreSQL content store
//!
//! Reads the repository from the tables described in [`SCHEMA`]. Object
//! types and relation definitions are loaded once at connect time; every
//! other read is a single `sqlx` query built with [`QueryBuilder`].

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Executor, Postgres, QueryBuilder, Row};
use std::collections::HashMap;

use crate::error::{ContentError, ContentResult};
use crate::filter::FilterCondition;
use crate::include::Contain;
use crate::model::{Association, JoinData, ObjectEntity, ObjectId, StatusLevel};
use crate::store::{cardinality, Cardinality, ContentStore, FetchQuery, ReadScope, CHILDREN, PARENT, PARENTS};
use crate::tree::{PathSegment, TreeNode, TreePlacement};
use crate::types::{ObjectType, TypeRegistry};

/// Tables read by [`PgContentStore`]
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS object_types (
    id BIGINT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    singular TEXT NOT NULL,
    is_abstract BOOLEAN NOT NULL DEFAULT FALSE,
    parent_id BIGINT REFERENCES object_types (id),
    table_name TEXT NOT NULL DEFAULT 'objects'
);

CREATE TABLE IF NOT EXISTS objects (
    id BIGINT PRIMARY KEY,
    object_type_id BIGINT NOT NULL REFERENCES object_types (id),
    uname TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL DEFAULT 'draft',
    deleted BOOLEAN NOT NULL DEFAULT FALSE,
    title TEXT,
    description TEXT,
    lang TEXT,
    created TIMESTAMPTZ,
    modified TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS relations (
    id BIGINT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    inverse_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS object_relations (
    left_id BIGINT NOT NULL REFERENCES objects (id),
    relation_id BIGINT NOT NULL REFERENCES relations (id),
    right_id BIGINT NOT NULL REFERENCES objects (id),
    priority BIGINT NOT NULL DEFAULT 1,
    inv_priority BIGINT NOT NULL DEFAULT 1,
    params JSONB,
    PRIMARY KEY (left_id, relation_id, right_id)
);

CREATE TABLE IF NOT EXISTS trees (
    id BIGINT PRIMARY KEY,
    object_id BIGINT NOT NULL REFERENCES objects (id),
    parent_id BIGINT REFERENCES objects (id),
    root_id BIGINT NOT NULL REFERENCES objects (id),
    tree_left BIGINT NOT NULL,
    tree_right BIGINT NOT NULL,
    depth_level BIGINT NOT NULL,
    menu BOOLEAN NOT NULL DEFAULT TRUE,
    canonical BOOLEAN NOT NULL DEFAULT FALSE
);
CREATE INDEX IF NOT EXISTS trees_nested_set ON trees (root_id, tree_left, tree_right);

CREATE TABLE IF NOT EXISTS translations (
    object_id BIGINT NOT NULL REFERENCES objects (id),
    lang TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    translated JSONB NOT NULL DEFAULT '{}',
    PRIMARY KEY (object_id, lang)
);
"#;

const OBJECT_COLUMNS: &str = "o.id, o.uname, t.name AS type_name, o.title, o.description, \
     o.status, o.deleted, o.lang, o.created, o.modified";

const PLACEMENTS_SQL: &str = r#"
SELECT leaf.id AS node_id, leaf.object_id, leaf.parent_id, leaf.root_id,
       leaf.tree_left, leaf.tree_right, leaf.depth_level, leaf.menu, leaf.canonical,
       lo.uname AS leaf_uname,
       COALESCE(array_agg(anc.object_id ORDER BY anc.tree_left)
                FILTER (WHERE anc.object_id IS NOT NULL), '{}'::bigint[]) AS ancestor_ids,
       COALESCE(array_agg(ao.uname ORDER BY anc.tree_left)
                FILTER (WHERE anc.object_id IS NOT NULL), '{}'::text[]) AS ancestor_unames
FROM trees leaf
JOIN objects lo ON lo.id = leaf.object_id
LEFT JOIN trees rel ON rel.object_id = $2 AND rel.root_id = leaf.root_id
     AND rel.tree_left < leaf.tree_left AND rel.tree_right > leaf.tree_right
LEFT JOIN trees anc ON anc.root_id = leaf.root_id
     AND anc.tree_left < leaf.tree_left AND anc.tree_right > leaf.tree_right
     AND ($2::bigint IS NULL OR (anc.tree_left > rel.tree_left AND anc.tree_right < rel.tree_right))
LEFT JOIN objects ao ON ao.id = anc.object_id
WHERE leaf.object_id = $1 AND ($2::bigint IS NULL OR rel.id IS NOT NULL)
GROUP BY leaf.id, lo.uname
HAVING $3::bigint IS NULL OR COALESCE(bool_or(anc.object_id = $3), FALSE)
ORDER BY leaf.root_id, leaf.tree_left
"#;

/// Direction in which a relation name is traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RelationDirection {
    relation_id: i64,
    inverse: bool,
}

/// SQL generation, independent of the connection pool
#[derive(Debug, Clone)]
pub struct PgQueries {
    types: TypeRegistry,
    relations: HashMap<String, Vec<RelationDirection>>,
}

impl PgQueries {
    /// `relations` holds `(id, name, inverse_name)` rows
    pub fn new(types: TypeRegistry, relations: &[(i64, String, String)]) -> ContentResult<Self> {
        let mut map: HashMap<String, Vec<RelationDirection>> = HashMap::new();
        for (relation_id, name, inverse_name) in relations {
            for (association, inverse) in [(name, false), (inverse_name, true)] {
                if [CHILDREN, PARENTS, PARENT].contains(&association.as_str()) {
                    return Err(ContentError::invalid(format!(
                        "relation name '{}' is reserved for the folder tree",
                        association
                    )));
                }
                map.entry(association.clone()).or_default().push(RelationDirection {
                    relation_id: *relation_id,
                    inverse,
                });
            }
        }
        Ok(Self { types, relations: map })
    }

    fn type_ids(&self, name: &str) -> ContentResult<Vec<i64>> {
        Ok(self.types.descendants(name)?.into_iter().map(|t| t.id).collect())
    }

    fn push_visibility(&self, builder: &mut QueryBuilder<'static, Postgres>, level: StatusLevel) {
        builder.push(" WHERE o.deleted = FALSE");
        if let Some(statuses) = level.statuses() {
            let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            builder.push(" AND o.status = ANY(").push_bind(statuses).push(")");
        }
    }

    fn push_conditions(
        &self,
        builder: &mut QueryBuilder<'static, Postgres>,
        object_type: &str,
        conditions: &[FilterCondition],
    ) -> ContentResult<()> {
        builder
            .push(" AND o.object_type_id = ANY(")
            .push_bind(self.type_ids(object_type)?)
            .push(")");

        for condition in conditions {
            match condition {
                FilterCondition::Id(ids) => {
                    builder.push(" AND o.id = ANY(").push_bind(ids.clone()).push(")");
                }
                FilterCondition::Uname(unames) => {
                    builder.push(" AND o.uname = ANY(").push_bind(unames.clone()).push(")");
                }
                FilterCondition::Status(statuses) => {
                    let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
                    builder.push(" AND o.status = ANY(").push_bind(statuses).push(")");
                }
                FilterCondition::Type(names) => {
                    let mut ids = Vec::new();
                    for name in names {
                        ids.extend(self.type_ids(name)?);
                    }
                    builder.push(" AND o.object_type_id = ANY(").push_bind(ids).push(")");
                }
                FilterCondition::Parent(parent) => {
                    builder
                        .push(" AND EXISTS (SELECT 1 FROM trees tp WHERE tp.object_id = o.id AND tp.parent_id = ")
                        .push_bind(*parent)
                        .push(")");
                }
                FilterCondition::Ancestor(ancestor) => {
                    builder
                        .push(
                            " AND EXISTS (SELECT 1 FROM trees td JOIN trees ta \
                             ON ta.root_id = td.root_id AND ta.tree_left < td.tree_left \
                             AND ta.tree_right > td.tree_right \
                             WHERE td.object_id = o.id AND ta.object_id = ",
                        )
                        .push_bind(*ancestor)
                        .push(")");
                }
                FilterCondition::Query(text) => {
                    let pattern = format!("%{}%", text);
                    builder
                        .push(" AND (o.title ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR o.description ILIKE ")
                        .push_bind(pattern)
                        .push(")");
                }
            }
        }
        Ok(())
    }

    fn push_page(builder: &mut QueryBuilder<'static, Postgres>, query: &FetchQuery) {
        if let Some(page) = query.page {
            builder
                .push(" LIMIT ")
                .push_bind(sql_count(page.limit))
                .push(" OFFSET ")
                .push_bind(sql_count(page.offset()));
        }
    }

    /// `SELECT` of the query's objects
    pub fn select_objects(&self, query: &FetchQuery) -> ContentResult<QueryBuilder<'static, Postgres>> {
        let mut builder = QueryBuilder::new("SELECT ");
        builder.push(OBJECT_COLUMNS);
        builder.push(" FROM objects o JOIN object_types t ON t.id = o.object_type_id");
        self.push_visibility(&mut builder, query.scope.status_level);
        self.push_conditions(&mut builder, &query.object_type, &query.conditions)?;

        match query.parent_condition() {
            Some(parent) => {
                builder
                    .push(
                        " ORDER BY (SELECT MIN(tr.tree_left) FROM trees tr \
                         WHERE tr.object_id = o.id AND tr.parent_id = ",
                    )
                    .push_bind(parent)
                    .push("), o.id");
            }
            None => {
                builder.push(" ORDER BY o.id");
            }
        }
        Self::push_page(&mut builder, query);
        Ok(builder)
    }

    pub fn count_objects(&self, query: &FetchQuery) -> ContentResult<QueryBuilder<'static, Postgres>> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) AS total FROM objects o");
        self.push_visibility(&mut builder, query.scope.status_level);
        self.push_conditions(&mut builder, &query.object_type, &query.conditions)?;
        Ok(builder)
    }

    /// Edge rows `(owner_id, related_id, sort, join_data)` of an association
    fn push_edges(
        &self,
        builder: &mut QueryBuilder<'static, Postgres>,
        association: &str,
        owners: &[ObjectId],
    ) -> ContentResult<()> {
        const TREE_JOIN: &str = "jsonb_build_object('menu', tr.menu, 'canonical', tr.canonical, \
             'depth_level', tr.depth_level) AS join_data";

        match association {
            CHILDREN => {
                builder
                    .push("SELECT tr.parent_id AS owner_id, tr.object_id AS related_id, tr.tree_left AS sort, ")
                    .push(TREE_JOIN)
                    .push(" FROM trees tr WHERE tr.parent_id = ANY(")
                    .push_bind(owners.to_vec())
                    .push(")");
            }
            PARENTS | PARENT => {
                builder
                    .push(
                        "SELECT tr.object_id AS owner_id, tr.parent_id AS related_id, \
                         (CASE WHEN tr.canonical THEN 0 ELSE 1 END)::bigint * 1000000000 + tr.tree_left AS sort, ",
                    )
                    .push(TREE_JOIN)
                    .push(" FROM trees tr WHERE tr.parent_id IS NOT NULL AND tr.object_id = ANY(")
                    .push_bind(owners.to_vec())
                    .push(")");
            }
            name => {
                let directions = self
                    .relations
                    .get(name)
                    .ok_or_else(|| ContentError::invalid(format!("unknown association '{}'", name)))?;
                for (index, direction) in directions.iter().enumerate() {
                    if index > 0 {
                        builder.push(" UNION ALL ");
                    }
                    let (owner, related, sort) = if direction.inverse {
                        ("orl.right_id", "orl.left_id", "orl.inv_priority")
                    } else {
                        ("orl.left_id", "orl.right_id", "orl.priority")
                    };
                    builder
                        .push(format!(
                            "SELECT {owner} AS owner_id, {related} AS related_id, {sort} AS sort, \
                             jsonb_build_object('priority', orl.priority, 'inv_priority', orl.inv_priority, \
                             'params', orl.params) AS join_data \
                             FROM object_relations orl WHERE orl.relation_id = "
                        ))
                        .push_bind(direction.relation_id)
                        .push(format!(" AND {owner} = ANY("))
                        .push_bind(owners.to_vec())
                        .push(")");
                }
            }
        }
        Ok(())
    }

    /// Related base records of `owners`, optionally capped per owner and
    /// narrowed by a type/conditions/page query
    pub fn select_related(
        &self,
        owners: &[ObjectId],
        association: &str,
        limit: Option<usize>,
        level: StatusLevel,
        narrow: Option<&FetchQuery>,
    ) -> ContentResult<QueryBuilder<'static, Postgres>> {
        let mut builder = QueryBuilder::new("");
        if limit.is_some() {
            builder.push("SELECT * FROM (");
        }
        builder.push("SELECT e.owner_id, e.join_data, ");
        builder.push(OBJECT_COLUMNS);
        if limit.is_some() {
            builder.push(", ROW_NUMBER() OVER (PARTITION BY e.owner_id ORDER BY e.sort, o.id) AS rn");
        }
        builder.push(" FROM (");
        self.push_edges(&mut builder, association, owners)?;
        builder.push(") e JOIN objects o ON o.id = e.related_id JOIN object_types t ON t.id = o.object_type_id");
        self.push_visibility(&mut builder, level);
        if let Some(narrow) = narrow {
            self.push_conditions(&mut builder, &narrow.object_type, &narrow.conditions)?;
        }

        match limit {
            Some(limit) => {
                builder
                    .push(") ranked WHERE ranked.rn <= ")
                    .push_bind(sql_count(limit))
                    .push(" ORDER BY ranked.owner_id, ranked.rn");
            }
            None => {
                builder.push(" ORDER BY e.owner_id, e.sort, o.id");
            }
        }
        if let Some(narrow) = narrow {
            Self::push_page(&mut builder, narrow);
        }
        Ok(builder)
    }
}

/// Content store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgContentStore {
    pool: PgPool,
    queries: PgQueries,
}

impl PgContentStore {
    /// Load type and relation definitions from an existing pool
    pub async fn connect(pool: PgPool) -> ContentResult<Self> {
        let rows = sqlx::query(
            "SELECT id, name, singular, is_abstract, parent_id, table_name FROM object_types ORDER BY id",
        )
        .fetch_all(&pool)
        .await
        .map_err(|e| ContentError::Database(format!("Loading object types failed: {}", e)))?;

        let mut types = Vec::with_capacity(rows.len());
        for row in &rows {
            types.push(ObjectType {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                singular: row.try_get("singular")?,
                is_abstract: row.try_get("is_abstract")?,
                parent_id: row.try_get("parent_id")?,
                table: row.try_get("table_name")?,
            });
        }
        let types = TypeRegistry::new(types)?;

        let relations: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, inverse_name FROM relations ORDER BY id")
                .fetch_all(&pool)
                .await
                .map_err(|e| ContentError::Database(format!("Loading relations failed: {}", e)))?;

        tracing::debug!(
            object_types = types.len(),
            relations = relations.len(),
            "postgres content store connected"
        );
        Ok(Self {
            pool,
            queries: PgQueries::new(types, &relations)?,
        })
    }

    pub async fn connect_url(url: &str, max_connections: u32) -> ContentResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| ContentError::Database(format!("Connection failed: {}", e)))?;
        Self::connect(pool).await
    }

    /// Create the tables read by this store
    pub async fn install_schema(pool: &PgPool) -> ContentResult<()> {
        pool.execute(SCHEMA)
            .await
            .map_err(|e| ContentError::Database(format!("Schema installation failed: {}", e)))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_rows(&self, mut builder: QueryBuilder<'static, Postgres>) -> ContentResult<Vec<PgRow>> {
        tracing::debug!(sql = builder.sql(), "postgres content query");
        builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ContentError::Database(format!("Query fetch failed: {}", e)))
    }

    /// Merge the type-specific columns of concrete records
    async fn load_attributes(&self, objects: &mut [ObjectEntity]) -> ContentResult<()> {
        let mut by_table: HashMap<String, Vec<ObjectId>> = HashMap::new();
        for object in objects.iter() {
            let object_type = self.queries.types.get(&object.object_type)?;
            if object_type.has_own_table() {
                by_table.entry(object_type.table.clone()).or_default().push(object.id);
            }
        }

        let mut attributes: HashMap<ObjectId, serde_json::Map<String, JsonValue>> = HashMap::new();
        for (table, ids) in by_table {
            // Table names are validated identifiers, see `TypeRegistry::new`.
            let sql = format!("SELECT x.id, to_jsonb(x) AS attrs FROM {} x WHERE x.id = ANY($1)", table);
            let rows = sqlx::query(&sql)
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| ContentError::Database(format!("Loading {} columns failed: {}", table, e)))?;
            for row in rows {
                let id: ObjectId = row.try_get("id")?;
                if let JsonValue::Object(mut map) = row.try_get::<JsonValue, _>("attrs")? {
                    map.remove("id");
                    attributes.insert(id, map);
                }
            }
        }

        for object in objects.iter_mut() {
            if let Some(map) = attributes.remove(&object.id) {
                object.attributes.extend(map);
            }
        }
        Ok(())
    }

    async fn apply_translations(&self, objects: &mut [ObjectEntity], scope: &ReadScope) -> ContentResult<()> {
        let Some(lang) = scope.lang.as_deref() else {
            return Ok(());
        };
        if objects.is_empty() {
            return Ok(());
        }

        let ids: Vec<ObjectId> = objects.iter().map(|o| o.id).collect();
        let mut builder = QueryBuilder::new("SELECT object_id, translated FROM translations WHERE lang = ");
        builder.push_bind(lang.to_string());
        builder.push(" AND object_id = ANY(").push_bind(ids).push(")");
        if let Some(statuses) = scope.status_level.statuses() {
            let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            builder.push(" AND status = ANY(").push_bind(statuses).push(")");
        }

        let mut translated: HashMap<ObjectId, serde_json::Map<String, JsonValue>> = HashMap::new();
        for row in self.fetch_rows(builder).await? {
            if let JsonValue::Object(fields) = row.try_get::<JsonValue, _>("translated")? {
                translated.insert(row.try_get("object_id")?, fields);
            }
        }
        for object in objects.iter_mut() {
            if let Some(fields) = translated.get(&object.id) {
                object.apply_translation(lang, fields);
            }
        }
        Ok(())
    }

    async fn related_by_owner(
        &self,
        owners: &[ObjectId],
        association: &str,
        limit: Option<usize>,
        scope: &ReadScope,
        narrow: Option<&FetchQuery>,
    ) -> ContentResult<HashMap<ObjectId, Vec<ObjectEntity>>> {
        let builder = self
            .queries
            .select_related(owners, association, limit, scope.status_level, narrow)?;
        let rows = self.fetch_rows(builder).await?;

        let mut owner_ids = Vec::with_capacity(rows.len());
        let mut related = Vec::with_capacity(rows.len());
        for row in &rows {
            owner_ids.push(row.try_get::<ObjectId, _>("owner_id")?);
            let mut entity = entity_from_row(row)?;
            entity.join_data = match row.try_get::<JsonValue, _>("join_data")? {
                JsonValue::Object(map) => Some(map),
                _ => Some(JoinData::new()),
            };
            related.push(entity);
        }
        self.apply_translations(&mut related, scope).await?;

        let mut grouped: HashMap<ObjectId, Vec<ObjectEntity>> = HashMap::new();
        for (owner, mut entity) in owner_ids.into_iter().zip(related) {
            entity.mark_clean();
            grouped.entry(owner).or_default().push(entity);
        }
        Ok(grouped)
    }

    async fn attach(
        &self,
        objects: &mut [ObjectEntity],
        association: &str,
        limit: Option<usize>,
        scope: &ReadScope,
    ) -> ContentResult<()> {
        if objects.is_empty() {
            return Ok(());
        }
        let owners: Vec<ObjectId> = objects.iter().map(|o| o.id).collect();
        let mut grouped = self.related_by_owner(&owners, association, limit, scope, None).await?;

        for object in objects.iter_mut() {
            let related = grouped.remove(&object.id).unwrap_or_default();
            let slot = match cardinality(association) {
                Cardinality::One => related
                    .into_iter()
                    .next()
                    .map(|r| Association::One(Box::new(r)))
                    .unwrap_or(Association::Empty),
                Cardinality::Many => Association::Many(related),
            };
            object.set_association(association, slot);
            object.set_dirty(association, false);
        }
        Ok(())
    }
}

/// LIMIT/OFFSET bind clamped to the BIGINT range
fn sql_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn entity_from_row(row: &PgRow) -> ContentResult<ObjectEntity> {
    let uname: String = row.try_get("uname")?;
    let type_name: String = row.try_get("type_name")?;
    let status: String = row.try_get("status")?;

    let mut entity = ObjectEntity::new(row.try_get("id")?, &uname, &type_name);
    entity.title = row.try_get("title")?;
    entity.description = row.try_get("description")?;
    entity.status = status.parse()?;
    entity.deleted = row.try_get("deleted")?;
    entity.lang = row.try_get("lang")?;
    entity.created = row.try_get("created")?;
    entity.modified = row.try_get("modified")?;
    Ok(entity)
}

#[async_trait]
impl ContentStore for PgContentStore {
    fn object_types(&self) -> &TypeRegistry {
        &self.queries.types
    }

    async fn resolve_id(&self, id_or_uname: &str) -> ContentResult<ObjectId> {
        let id_or_uname = id_or_uname.trim();
        let row = match id_or_uname.parse::<ObjectId>() {
            Ok(id) => sqlx::query("SELECT id FROM objects WHERE id = $1").bind(id),
            Err(_) => sqlx::query("SELECT id FROM objects WHERE uname = $1").bind(id_or_uname.to_string()),
        }
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ContentError::Database(format!("Resolving '{}' failed: {}", id_or_uname, e)))?;

        match row {
            Some(row) => Ok(row.try_get("id")?),
            None => Err(ContentError::not_found(format!("object '{}'", id_or_uname))),
        }
    }

    async fn fetch_many(&self, query: &FetchQuery) -> ContentResult<Vec<ObjectEntity>> {
        let object_type = self.queries.types.get(&query.object_type)?.clone();
        let rows = self.fetch_rows(self.queries.select_objects(query)?).await?;
        let mut objects = rows.iter().map(entity_from_row).collect::<ContentResult<Vec<_>>>()?;

        if !object_type.is_base() {
            self.load_attributes(&mut objects).await?;
        }
        self.apply_translations(&mut objects, &query.scope).await?;
        for association in &query.contain {
            self.attach(&mut objects, association, None, &query.scope).await?;
        }
        for object in objects.iter_mut() {
            object.mark_clean();
        }
        Ok(objects)
    }

    async fn count(&self, query: &FetchQuery) -> ContentResult<usize> {
        let rows = self.fetch_rows(self.queries.count_objects(query)?).await?;
        let total: i64 = match rows.first() {
            Some(row) => row.try_get("total")?,
            None => 0,
        };
        Ok(total.max(0) as usize)
    }

    async fn load_association_into(
        &self,
        objects: &mut [ObjectEntity],
        contains: &[Contain],
        scope: &ReadScope,
    ) -> ContentResult<()> {
        for contain in contains {
            self.attach(objects, &contain.association, contain.limit, scope).await?;
        }
        Ok(())
    }

    async fn fetch_tree_placements(
        &self,
        leaf: ObjectId,
        relative_to: Option<ObjectId>,
        via: Option<ObjectId>,
    ) -> ContentResult<Vec<TreePlacement>> {
        let rows = sqlx::query(PLACEMENTS_SQL)
            .bind(leaf)
            .bind(relative_to)
            .bind(via)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ContentError::Database(format!("Loading tree placements failed: {}", e)))?;

        let mut placements = Vec::with_capacity(rows.len());
        for row in rows {
            let ids: Vec<ObjectId> = row.try_get("ancestor_ids")?;
            let unames: Vec<String> = row.try_get("ancestor_unames")?;
            placements.push(TreePlacement {
                node: TreeNode {
                    id: row.try_get("node_id")?,
                    object_id: row.try_get("object_id")?,
                    parent_id: row.try_get("parent_id")?,
                    root_id: row.try_get("root_id")?,
                    tree_left: row.try_get("tree_left")?,
                    tree_right: row.try_get("tree_right")?,
                    depth_level: row.try_get("depth_level")?,
                    menu: row.try_get("menu")?,
                    canonical: row.try_get("canonical")?,
                },
                leaf: PathSegment {
                    id: leaf,
                    uname: row.try_get("leaf_uname")?,
                },
                ancestors: ids
                    .into_iter()
                    .zip(unames)
                    .map(|(id, uname)| PathSegment { id, uname })
                    .collect(),
            });
        }
        Ok(placements)
    }

    async fn fetch_related(
        &self,
        id: ObjectId,
        association: &str,
        query: &FetchQuery,
    ) -> ContentResult<Vec<ObjectEntity>> {
        let owner = FetchQuery::by_ids("objects", &[id]).scope(query.scope.clone());
        if self.count(&owner).await? == 0 {
            return Err(ContentError::not_found(format!("object {}", id)));
        }

        let mut grouped = self
            .related_by_owner(&[id], association, None, &query.scope, Some(query))
            .await?;
        Ok(grouped.remove(&id).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queries() -> PgQueries {
        PgQueries::new(
            TypeRegistry::standard(),
            &[(1, "has_media".to_string(), "media_of".to_string())],
        )
        .unwrap()
    }

    #[test]
    fn test_select_objects_sql() {
        let query = FetchQuery::new("media")
            .condition(FilterCondition::Parent(3))
            .condition(FilterCondition::Query("sea".into()))
            .page(Some(crate::store::Page::new(2, 10)));
        let builder = queries().select_objects(&query).unwrap();
        let sql = builder.sql();

        assert!(sql.starts_with("SELECT o.id, o.uname, t.name AS type_name"));
        assert!(sql.contains("o.deleted = FALSE AND o.status = ANY($1)"));
        assert!(sql.contains("o.object_type_id = ANY($2)"));
        assert!(sql.contains("tp.parent_id = $3"));
        assert!(sql.contains("o.title ILIKE $4 OR o.description ILIKE $5"));
        assert!(sql.contains("ORDER BY (SELECT MIN(tr.tree_left)"));
        assert!(sql.ends_with("LIMIT $7 OFFSET $8"));
    }

    #[test]
    fn test_sql_count_clamps() {
        assert_eq!(sql_count(20), 20);
        assert_eq!(sql_count(usize::MAX), i64::MAX);
    }

    #[test]
    fn test_unrestricted_level_skips_status() {
        let query = FetchQuery::new("objects").scope(ReadScope::new(StatusLevel::All, None));
        let builder = queries().count_objects(&query).unwrap();
        assert!(!builder.sql().contains("o.status"));
    }

    #[test]
    fn test_select_related_with_limit() {
        let builder = queries()
            .select_related(&[1, 2], "media_of", Some(3), StatusLevel::On, None)
            .unwrap();
        let sql = builder.sql();
        assert!(sql.starts_with("SELECT * FROM (SELECT e.owner_id"));
        assert!(sql.contains("orl.right_id AS owner_id, orl.left_id AS related_id, orl.inv_priority AS sort"));
        assert!(sql.contains("ROW_NUMBER() OVER (PARTITION BY e.owner_id"));
        assert!(sql.contains("ranked.rn <="));
    }

    #[test]
    fn test_tree_associations_sql() {
        let builder = queries()
            .select_related(&[1], CHILDREN, None, StatusLevel::On, None)
            .unwrap();
        assert!(builder.sql().contains("tr.parent_id AS owner_id, tr.object_id AS related_id"));
        assert!(builder.sql().ends_with("ORDER BY e.owner_id, e.sort, o.id"));
    }

    #[test]
    fn test_unknown_association_and_type() {
        assert!(matches!(
            queries().select_related(&[1], "nope", None, StatusLevel::On, None),
            Err(ContentError::InvalidConfiguration(_))
        ));
        assert!(queries().select_objects(&FetchQuery::new("spaceships")).is_err());
    }

    #[test]
    fn test_reserved_relation_names() {
        let result = PgQueries::new(
            TypeRegistry::standard(),
            &[(1, "children".to_string(), "children_of".to_string())],
        );
        assert!(result.is_err());
    }
}
