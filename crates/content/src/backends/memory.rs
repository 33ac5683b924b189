//! In-memory content store
//!
//! Holds a whole repository in memory: objects, relation edges, folder
//! placements (with nested-set coordinates computed at build time) and
//! translations. Every read is recorded in [`StoreStats`] so callers can
//! assert how many round-trips a load costs.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::error::{ContentError, ContentResult};
use crate::filter::FilterCondition;
use crate::include::Contain;
use crate::model::{Association, JoinData, ObjectEntity, ObjectId, Status};
use crate::store::{cardinality, Cardinality, ContentStore, FetchQuery, ReadScope, CHILDREN, PARENT, PARENTS};
use crate::tree::{PathSegment, TreeNode, TreePlacement};
use crate::types::{ObjectType, TypeRegistry};

/// A relation edge between two objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEdge {
    pub left_id: ObjectId,
    pub name: String,
    pub inverse_name: String,
    pub right_id: ObjectId,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default = "default_priority")]
    pub inv_priority: i64,
    #[serde(default)]
    pub params: Option<Value>,
}

fn default_priority() -> i64 {
    1
}

impl RelationEdge {
    pub fn new(left_id: ObjectId, name: &str, inverse_name: &str, right_id: ObjectId) -> Self {
        Self {
            left_id,
            name: name.to_string(),
            inverse_name: inverse_name.to_string(),
            right_id,
            priority: 1,
            inv_priority: 1,
            params: None,
        }
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn inv_priority(mut self, inv_priority: i64) -> Self {
        self.inv_priority = inv_priority;
        self
    }

    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    fn join_data(&self) -> JoinData {
        let mut data = JoinData::new();
        data.insert("priority".to_string(), self.priority.into());
        data.insert("inv_priority".to_string(), self.inv_priority.into());
        data.insert("params".to_string(), self.params.clone().unwrap_or(Value::Null));
        data
    }
}

/// A named relation and its inverse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub name: String,
    pub inverse_name: String,
}

/// Filing of an object under a folder (or as a root when `parent` is `None`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub object: ObjectId,
    #[serde(default)]
    pub parent: Option<ObjectId>,
    #[serde(default)]
    pub canonical: bool,
    #[serde(default = "default_menu")]
    pub menu: bool,
}

fn default_menu() -> bool {
    true
}

/// Translated fields of one object in one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub object_id: ObjectId,
    pub lang: String,
    #[serde(default)]
    pub status: Status,
    pub fields: Map<String, Value>,
}

/// Serialized repository, as read by [`MemoryStore::from_fixture_file`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    /// Object types; the standard registry when absent
    #[serde(default)]
    pub types: Option<Vec<ObjectType>>,
    #[serde(default)]
    pub objects: Vec<ObjectEntity>,
    #[serde(default)]
    pub relation_types: Vec<RelationDefinition>,
    #[serde(default)]
    pub relations: Vec<RelationEdge>,
    #[serde(default)]
    pub tree: Vec<Placement>,
    #[serde(default)]
    pub translations: Vec<Translation>,
}

/// One recorded `fetch_many`
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRecord {
    pub object_type: String,
    pub ids: Option<Vec<ObjectId>>,
    pub contain: Vec<String>,
}

/// Round-trips served by a [`MemoryStore`]
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub fetches: Vec<FetchRecord>,
    pub counts: usize,
    pub association_loads: usize,
    pub placement_queries: usize,
    pub related_fetches: usize,
    pub resolves: usize,
}

impl StoreStats {
    pub fn fetch_count(&self) -> usize {
        self.fetches.len()
    }

    pub fn fetches_for(&self, object_type: &str) -> usize {
        self.fetches.iter().filter(|f| f.object_type == object_type).count()
    }

    /// How many id-restricted fetches asked for `id`
    pub fn times_fetched(&self, id: ObjectId) -> usize {
        self.fetches
            .iter()
            .filter(|f| f.ids.as_ref().is_some_and(|ids| ids.contains(&id)))
            .count()
    }
}

/// Builder for [`MemoryStore`]
#[derive(Debug, Default)]
pub struct MemoryStoreBuilder {
    types: Option<TypeRegistry>,
    objects: Vec<ObjectEntity>,
    relation_types: Vec<RelationDefinition>,
    relations: Vec<RelationEdge>,
    placements: Vec<Placement>,
    translations: Vec<Translation>,
}

impl MemoryStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types(mut self, registry: TypeRegistry) -> Self {
        self.types = Some(registry);
        self
    }

    pub fn object(mut self, object: ObjectEntity) -> Self {
        self.objects.push(object);
        self
    }

    pub fn objects(mut self, objects: impl IntoIterator<Item = ObjectEntity>) -> Self {
        self.objects.extend(objects);
        self
    }

    /// Declare a relation without adding edges
    pub fn relation_type(mut self, name: &str, inverse_name: &str) -> Self {
        self.relation_types.push(RelationDefinition {
            name: name.to_string(),
            inverse_name: inverse_name.to_string(),
        });
        self
    }

    pub fn relate(mut self, edge: RelationEdge) -> Self {
        self.relations.push(edge);
        self
    }

    /// File `object` under `parent`, or as a tree root
    pub fn place(mut self, object: ObjectId, parent: Option<ObjectId>) -> Self {
        self.placements.push(Placement {
            object,
            parent,
            canonical: false,
            menu: true,
        });
        self
    }

    pub fn place_canonical(mut self, object: ObjectId, parent: ObjectId) -> Self {
        self.placements.push(Placement {
            object,
            parent: Some(parent),
            canonical: true,
            menu: true,
        });
        self
    }

    pub fn translation(mut self, object_id: ObjectId, lang: &str, fields: Value) -> Self {
        self.translations.push(Translation {
            object_id,
            lang: lang.to_string(),
            status: Status::On,
            fields: fields.as_object().cloned().unwrap_or_default(),
        });
        self
    }

    pub fn build(self) -> ContentResult<MemoryStore> {
        let types = self.types.unwrap_or_else(TypeRegistry::standard);

        let mut objects = BTreeMap::new();
        let mut by_uname = HashMap::new();
        for mut object in self.objects {
            types.get(&object.object_type).map_err(|_| {
                ContentError::invalid(format!(
                    "object '{}' has unknown type '{}'",
                    object.uname, object.object_type
                ))
            })?;
            if by_uname.insert(object.uname.clone(), object.id).is_some() {
                return Err(ContentError::invalid(format!("duplicate uname '{}'", object.uname)));
            }
            object.mark_clean();
            if objects.insert(object.id, object).is_some() {
                return Err(ContentError::invalid("duplicate object id"));
            }
        }

        let mut relation_names: HashSet<String> = HashSet::new();
        for definition in &self.relation_types {
            relation_names.insert(definition.name.clone());
            relation_names.insert(definition.inverse_name.clone());
        }
        for edge in &self.relations {
            if !objects.contains_key(&edge.left_id) || !objects.contains_key(&edge.right_id) {
                return Err(ContentError::invalid(format!(
                    "relation '{}' links unknown objects {} -> {}",
                    edge.name, edge.left_id, edge.right_id
                )));
            }
            relation_names.insert(edge.name.clone());
            relation_names.insert(edge.inverse_name.clone());
        }
        for builtin in [CHILDREN, PARENTS, PARENT] {
            if relation_names.contains(builtin) {
                return Err(ContentError::invalid(format!(
                    "relation name '{}' is reserved for the folder tree",
                    builtin
                )));
            }
        }

        for placement in &self.placements {
            if !objects.contains_key(&placement.object) {
                return Err(ContentError::invalid(format!(
                    "tree placement of unknown object {}",
                    placement.object
                )));
            }
        }
        let nodes = build_nested_set(&self.placements)?;

        let translations = self
            .translations
            .into_iter()
            .map(|t| ((t.object_id, t.lang.clone()), t))
            .collect();

        Ok(MemoryStore {
            types,
            objects,
            by_uname,
            relation_names,
            relations: self.relations,
            nodes,
            translations,
            stats: Mutex::new(StoreStats::default()),
        })
    }
}

/// Assign nested-set coordinates by walking placements depth first
fn build_nested_set(placements: &[Placement]) -> ContentResult<Vec<TreeNode>> {
    struct Walk<'a> {
        placements: &'a [Placement],
        nodes: Vec<TreeNode>,
        visited: HashSet<usize>,
        counter: i64,
        path: Vec<ObjectId>,
    }

    impl Walk<'_> {
        fn visit(&mut self, index: usize, root_id: ObjectId, depth: i64) -> ContentResult<()> {
            let placement = &self.placements[index];
            if self.path.contains(&placement.object) {
                return Err(ContentError::invalid(format!(
                    "folder {} is placed inside itself",
                    placement.object
                )));
            }
            self.visited.insert(index);
            self.path.push(placement.object);

            self.counter += 1;
            let position = self.nodes.len();
            self.nodes.push(TreeNode {
                id: position as i64 + 1,
                object_id: placement.object,
                parent_id: placement.parent,
                root_id,
                tree_left: self.counter,
                tree_right: 0,
                depth_level: depth,
                menu: placement.menu,
                canonical: placement.canonical,
            });

            let children: Vec<usize> = self
                .placements
                .iter()
                .enumerate()
                .filter(|(_, p)| p.parent == Some(placement.object))
                .map(|(i, _)| i)
                .collect();
            for child in children {
                self.visit(child, root_id, depth + 1)?;
            }

            self.counter += 1;
            self.nodes[position].tree_right = self.counter;
            self.path.pop();
            Ok(())
        }
    }

    let mut walk = Walk {
        placements,
        nodes: Vec::new(),
        visited: HashSet::new(),
        counter: 0,
        path: Vec::new(),
    };
    for (index, placement) in placements.iter().enumerate() {
        if placement.parent.is_none() {
            walk.visit(index, placement.object, 0)?;
        }
    }
    if let Some(orphan) = (0..placements.len()).find(|i| !walk.visited.contains(i)) {
        return Err(ContentError::invalid(format!(
            "object {} is placed under {:?}, which is not reachable from a tree root",
            placements[orphan].object, placements[orphan].parent
        )));
    }

    // First placement of an object is canonical unless one is flagged.
    let mut nodes = walk.nodes;
    let flagged: HashSet<ObjectId> = nodes.iter().filter(|n| n.canonical).map(|n| n.object_id).collect();
    let mut seen = HashSet::new();
    for node in nodes.iter_mut() {
        if !flagged.contains(&node.object_id) && seen.insert(node.object_id) {
            node.canonical = true;
        }
    }
    Ok(nodes)
}

/// Content repository held in memory
#[derive(Debug)]
pub struct MemoryStore {
    types: TypeRegistry,
    objects: BTreeMap<ObjectId, ObjectEntity>,
    by_uname: HashMap<String, ObjectId>,
    relation_names: HashSet<String>,
    relations: Vec<RelationEdge>,
    nodes: Vec<TreeNode>,
    translations: HashMap<(ObjectId, String), Translation>,
    stats: Mutex<StoreStats>,
}

impl MemoryStore {
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }

    pub fn from_fixture(fixture: Fixture) -> ContentResult<Self> {
        let mut builder = MemoryStoreBuilder::new();
        if let Some(types) = fixture.types {
            builder = builder.types(TypeRegistry::new(types)?);
        }
        builder.objects = fixture.objects;
        builder.relation_types = fixture.relation_types;
        builder.relations = fixture.relations;
        builder.placements = fixture.tree;
        builder.translations = fixture.translations;
        builder.build()
    }

    /// Load a JSON or YAML fixture, chosen by file extension
    pub fn from_fixture_file(path: impl AsRef<Path>) -> ContentResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ContentError::invalid(format!("cannot read fixture {}: {}", path.display(), e))
        })?;
        let fixture: Fixture = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents)?,
            _ => serde_json::from_str(&contents)?,
        };
        Self::from_fixture(fixture)
    }

    pub fn stats(&self) -> StoreStats {
        self.stats.lock().clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock() = StoreStats::default();
    }

    /// Tree placements of an object
    pub fn nodes_of(&self, object_id: ObjectId) -> Vec<&TreeNode> {
        self.nodes.iter().filter(|n| n.object_id == object_id).collect()
    }

    fn visible(&self, id: ObjectId, scope: &ReadScope) -> Option<&ObjectEntity> {
        self.objects
            .get(&id)
            .filter(|object| object.is_visible(scope.status_level))
    }

    /// Clone a stored record as seen through `object_type` in `scope`
    fn project(&self, object: &ObjectEntity, base: bool, scope: &ReadScope) -> ObjectEntity {
        let mut projected = if base { object.clone().into_base() } else { object.clone() };
        if let Some(lang) = &scope.lang {
            if let Some(translation) = self.translations.get(&(object.id, lang.clone())) {
                if scope.status_level.allows(translation.status) {
                    projected.apply_translation(lang, &translation.fields);
                }
            }
        }
        projected.mark_clean();
        projected
    }

    fn matches(&self, object: &ObjectEntity, condition: &FilterCondition) -> bool {
        let text = [object.title.as_deref(), object.description.as_deref()];
        if let Some(result) = condition.matches_columns(object.id, &object.uname, object.status, &text) {
            return result;
        }
        match condition {
            FilterCondition::Type(names) => names.iter().any(|name| self.types.is_a(&object.object_type, name)),
            FilterCondition::Parent(parent) => self
                .nodes
                .iter()
                .any(|n| n.object_id == object.id && n.parent_id == Some(*parent)),
            FilterCondition::Ancestor(ancestor) => {
                let ancestor_nodes = self.nodes_of(*ancestor);
                self.nodes_of(object.id)
                    .iter()
                    .any(|node| ancestor_nodes.iter().any(|a| a.contains(node)))
            }
            _ => false,
        }
    }

    fn select(&self, query: &FetchQuery) -> ContentResult<(&ObjectType, Vec<&ObjectEntity>)> {
        let object_type = self.types.get(&query.object_type)?;
        let mut selected: Vec<&ObjectEntity> = self
            .objects
            .values()
            .filter(|o| self.types.is_a(&o.object_type, &object_type.name))
            .filter(|o| o.is_visible(query.scope.status_level))
            .filter(|o| query.conditions.iter().all(|c| self.matches(o, c)))
            .collect();

        if let Some(parent) = query.parent_condition() {
            let position = |id: ObjectId| {
                self.nodes
                    .iter()
                    .filter(|n| n.object_id == id && n.parent_id == Some(parent))
                    .map(|n| n.tree_left)
                    .min()
                    .unwrap_or(i64::MAX)
            };
            selected.sort_by_key(|o| position(o.id));
        }
        Ok((object_type, selected))
    }

    /// Base records related to `owner`, each carrying its edge attributes
    fn related(&self, owner: ObjectId, association: &str, scope: &ReadScope) -> ContentResult<Vec<ObjectEntity>> {
        let with_join = |id: ObjectId, join: JoinData| {
            self.visible(id, scope).map(|object| {
                let mut related = self.project(object, true, scope);
                related.join_data = Some(join);
                related
            })
        };

        let related = match association {
            CHILDREN => {
                let mut children: Vec<&TreeNode> =
                    self.nodes.iter().filter(|n| n.parent_id == Some(owner)).collect();
                children.sort_by_key(|n| (n.root_id, n.tree_left));
                children
                    .into_iter()
                    .filter_map(|n| with_join(n.object_id, n.join_data()))
                    .collect()
            }
            PARENTS | PARENT => {
                let mut placements: Vec<&TreeNode> = self
                    .nodes
                    .iter()
                    .filter(|n| n.object_id == owner && n.parent_id.is_some())
                    .collect();
                placements.sort_by_key(|n| (!n.canonical, n.tree_left));
                placements
                    .into_iter()
                    .filter_map(|n| n.parent_id.and_then(|p| with_join(p, n.join_data())))
                    .collect()
            }
            name if self.relation_names.contains(name) => {
                let mut edges: Vec<(i64, ObjectId, &RelationEdge)> = Vec::new();
                for edge in &self.relations {
                    if edge.name == name && edge.left_id == owner {
                        edges.push((edge.priority, edge.right_id, edge));
                    } else if edge.inverse_name == name && edge.right_id == owner {
                        edges.push((edge.inv_priority, edge.left_id, edge));
                    }
                }
                edges.sort_by_key(|(priority, id, _)| (*priority, *id));
                edges
                    .into_iter()
                    .filter_map(|(_, id, edge)| with_join(id, edge.join_data()))
                    .collect()
            }
            other => {
                return Err(ContentError::invalid(format!("unknown association '{}'", other)));
            }
        };
        Ok(related)
    }

    fn attach(
        &self,
        object: &mut ObjectEntity,
        association: &str,
        limit: Option<usize>,
        scope: &ReadScope,
    ) -> ContentResult<()> {
        let mut related = self.related(object.id, association, scope)?;
        if let Some(limit) = limit {
            related.truncate(limit);
        }
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
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn object_types(&self) -> &TypeRegistry {
        &self.types
    }

    async fn resolve_id(&self, id_or_uname: &str) -> ContentResult<ObjectId> {
        self.stats.lock().resolves += 1;
        let id_or_uname = id_or_uname.trim();
        let found = match id_or_uname.parse::<ObjectId>() {
            Ok(id) => self.objects.contains_key(&id).then_some(id),
            Err(_) => self.by_uname.get(id_or_uname).copied(),
        };
        found.ok_or_else(|| ContentError::not_found(format!("object '{}'", id_or_uname)))
    }

    async fn fetch_many(&self, query: &FetchQuery) -> ContentResult<Vec<ObjectEntity>> {
        let ids = query.conditions.iter().find_map(|c| match c {
            FilterCondition::Id(ids) => Some(ids.clone()),
            _ => None,
        });
        self.stats.lock().fetches.push(FetchRecord {
            object_type: query.object_type.clone(),
            ids,
            contain: query.contain.clone(),
        });

        let (object_type, selected) = self.select(query)?;
        let (offset, limit) = query
            .page
            .map_or((0, usize::MAX), |page| (page.offset(), page.limit));

        let mut results = Vec::new();
        for object in selected.into_iter().skip(offset).take(limit) {
            let mut projected = self.project(object, object_type.is_base(), &query.scope);
            for association in &query.contain {
                self.attach(&mut projected, association, None, &query.scope)?;
            }
            results.push(projected);
        }
        tracing::debug!(
            object_type = %query.object_type,
            results = results.len(),
            "memory store fetch"
        );
        Ok(results)
    }

    async fn count(&self, query: &FetchQuery) -> ContentResult<usize> {
        self.stats.lock().counts += 1;
        let (_, selected) = self.select(query)?;
        Ok(selected.len())
    }

    async fn load_association_into(
        &self,
        objects: &mut [ObjectEntity],
        contains: &[Contain],
        scope: &ReadScope,
    ) -> ContentResult<()> {
        self.stats.lock().association_loads += 1;
        for object in objects.iter_mut() {
            for contain in contains {
                self.attach(object, &contain.association, contain.limit, scope)?;
            }
        }
        Ok(())
    }

    async fn fetch_tree_placements(
        &self,
        leaf: ObjectId,
        relative_to: Option<ObjectId>,
        via: Option<ObjectId>,
    ) -> ContentResult<Vec<TreePlacement>> {
        self.stats.lock().placement_queries += 1;
        let leaf_object = self
            .objects
            .get(&leaf)
            .ok_or_else(|| ContentError::not_found(format!("object {}", leaf)))?;
        let relative_nodes = relative_to.map(|id| self.nodes_of(id)).unwrap_or_default();

        let mut leaf_nodes = self.nodes_of(leaf);
        leaf_nodes.sort_by_key(|n| (n.root_id, n.tree_left));

        let mut placements = Vec::new();
        for leaf_node in leaf_nodes {
            let relative = match relative_to {
                Some(_) => match relative_nodes.iter().find(|r| r.contains(leaf_node)) {
                    Some(relative) => Some(*relative),
                    None => continue,
                },
                None => None,
            };

            let mut ancestors: Vec<&TreeNode> = self
                .nodes
                .iter()
                .filter(|a| a.contains(leaf_node))
                .filter(|a| relative.map_or(true, |r| r.contains(a)))
                .collect();
            ancestors.sort_by_key(|a| a.tree_left);

            let ancestors: Vec<PathSegment> = ancestors
                .into_iter()
                .filter_map(|a| {
                    self.objects.get(&a.object_id).map(|o| PathSegment {
                        id: o.id,
                        uname: o.uname.clone(),
                    })
                })
                .collect();
            if let Some(via) = via {
                if !ancestors.iter().any(|a| a.id == via) {
                    continue;
                }
            }

            placements.push(TreePlacement {
                node: leaf_node.clone(),
                leaf: PathSegment {
                    id: leaf_object.id,
                    uname: leaf_object.uname.clone(),
                },
                ancestors,
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
        self.stats.lock().related_fetches += 1;
        let object_type = self.types.get(&query.object_type)?;
        self.visible(id, &query.scope)
            .ok_or_else(|| ContentError::not_found(format!("object {}", id)))?;

        let related: Vec<ObjectEntity> = self
            .related(id, association, &query.scope)?
            .into_iter()
            .filter(|r| self.types.is_a(&r.object_type, &object_type.name))
            .filter(|r| {
                // Conditions are checked against the stored record, which
                // still carries its type-specific columns.
                self.objects
                    .get(&r.id)
                    .is_some_and(|stored| query.conditions.iter().all(|c| self.matches(stored, c)))
            })
            .collect();

        Ok(match query.page {
            Some(page) => related.into_iter().skip(page.offset()).take(page.limit).collect(),
            None => related,
        })
    }
}
