//! A publication: a root folder that site paths are resolved against

use leafpress_content::{ObjectEntity, ObjectId};

use crate::error::{LoaderError, LoaderResult};
use crate::objects::{LoadContext, ObjectsLoader};
use crate::tree::{path_segments, TreeLoader, ViablePath};

#[derive(Debug, Clone)]
pub struct Publication {
    tree: TreeLoader,
    root: ObjectEntity,
}

impl Publication {
    /// Load the folder named by `root_folder` in the loader configuration
    pub async fn load(loader: ObjectsLoader, ctx: &LoadContext) -> LoaderResult<Self> {
        let root_folder = loader
            .config()
            .get_root_folder()
            .clone()
            .ok_or_else(|| LoaderError::invalid("no publication root folder configured"))?;
        let root = loader.load_object(&root_folder, "folders", None, ctx).await?;
        tracing::debug!(root = root.id, uname = %root.uname, "publication loaded");
        Ok(Self {
            tree: TreeLoader::new(loader),
            root,
        })
    }

    pub fn root(&self) -> &ObjectEntity {
        &self.root
    }

    pub fn root_id(&self) -> ObjectId {
        self.root.id
    }

    /// The root followed by the chain resolved from `path` below it
    pub async fn resolve(&self, path: &str, ctx: &LoadContext) -> LoaderResult<Vec<ObjectEntity>> {
        let mut chain = vec![self.root.clone()];
        if !path_segments(path).is_empty() {
            chain.extend(self.tree.load_object_path(path, Some(self.root.id), ctx).await?);
        }
        Ok(chain)
    }

    /// Placements of an object inside this publication
    pub async fn viable_paths(&self, id: ObjectId, via: Option<ObjectId>) -> LoaderResult<Vec<ViablePath>> {
        self.tree.get_viable_paths(id, Some(self.root.id), via).await
    }

    pub async fn canonical_path(&self, id: ObjectId) -> LoaderResult<Option<ViablePath>> {
        self.tree.canonical_path(id, Some(self.root.id)).await
    }
}
