//! Path resolution through the folder tree

use leafpress_content::{ObjectEntity, ObjectId, TreePlacement};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{LoaderError, LoaderResult};
use crate::objects::{LoadContext, ObjectsLoader, Run};

/// One way of reaching an object through the folder tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViablePath {
    /// Unames joined by `/`, leaf included
    pub path: String,
    /// Ancestor ids root first, then the leaf
    pub path_ids: Vec<ObjectId>,
    pub canonical: bool,
}

impl From<&TreePlacement> for ViablePath {
    fn from(placement: &TreePlacement) -> Self {
        let mut path_ids = placement.ancestor_ids();
        path_ids.push(placement.leaf.id);
        Self {
            path: placement.full_path(),
            path_ids,
            canonical: placement.node.canonical,
        }
    }
}

/// Split a `/` separated path, dropping empty segments
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Resolves unames paths and enumerates tree placements
#[derive(Debug, Clone)]
pub struct TreeLoader {
    loader: ObjectsLoader,
}

impl TreeLoader {
    pub fn new(loader: ObjectsLoader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &ObjectsLoader {
        &self.loader
    }

    /// Resolve `path` to its ancestor folders followed by the leaf object
    ///
    /// The ancestors must match one placement of the leaf exactly, counted
    /// below `relative_to` when given. An empty path resolves to nothing.
    pub async fn load_object_path(
        &self,
        path: &str,
        relative_to: Option<ObjectId>,
        ctx: &LoadContext,
    ) -> LoaderResult<Vec<ObjectEntity>> {
        let segments = path_segments(path);
        let Some((leaf, ancestors)) = segments.split_last() else {
            return Ok(Vec::new());
        };

        let store = self.loader.store();
        let leaf_id = store.resolve_id(leaf).await?;
        let placement = store
            .fetch_tree_placements(leaf_id, relative_to, None)
            .await?
            .into_iter()
            .find(|placement| {
                placement.ancestors.len() == ancestors.len()
                    && placement
                        .ancestors
                        .iter()
                        .zip(ancestors)
                        .all(|(segment, uname)| segment.uname == *uname)
            })
            .ok_or_else(|| LoaderError::not_found(format!("path '{}'", path)))?;

        let run = self.loader.run(ctx);
        let leaf = self.loader.load_full_object_by_id(leaf_id, &run).await?;
        let mut chain = self.load_folders(&placement.ancestor_ids(), &run).await?;
        tracing::debug!(path, leaf = leaf.id, depth = chain.len(), "object path resolved");
        chain.push(leaf);
        Ok(chain)
    }

    /// Visible folders by id, in the given order
    async fn load_folders(&self, ids: &[ObjectId], run: &Run) -> LoaderResult<Vec<ObjectEntity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut folders: HashMap<ObjectId, ObjectEntity> = self
            .loader
            .store()
            .fetch_by_ids("folders", ids, &run.read)
            .await?
            .into_iter()
            .map(|folder| (folder.id, folder))
            .collect();

        ids.iter()
            .map(|id| {
                folders
                    .remove(id)
                    .ok_or_else(|| LoaderError::not_found(format!("folder {}", id)))
            })
            .collect()
    }

    /// Every placement of an object, optionally below `relative_to` and through `via`
    pub async fn get_viable_paths(
        &self,
        id: ObjectId,
        relative_to: Option<ObjectId>,
        via: Option<ObjectId>,
    ) -> LoaderResult<Vec<ViablePath>> {
        let placements = self
            .loader
            .store()
            .fetch_tree_placements(id, relative_to, via)
            .await?;
        Ok(placements.iter().map(ViablePath::from).collect())
    }

    /// The canonical placement, else the first one
    pub async fn canonical_path(&self, id: ObjectId, relative_to: Option<ObjectId>) -> LoaderResult<Option<ViablePath>> {
        let mut paths = self.get_viable_paths(id, relative_to, None).await?;
        let index = paths.iter().position(|p| p.canonical).unwrap_or(0);
        Ok((index < paths.len()).then(|| paths.swap_remove(index)))
    }
}
