//! Nested-set tree placements

use serde::{Deserialize, Serialize};

use crate::model::{JoinData, ObjectId};

/// One placement of an object in a folder tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: i64,
    pub object_id: ObjectId,
    /// Parent folder object, `None` for a root
    pub parent_id: Option<ObjectId>,
    /// Root folder object of this tree
    pub root_id: ObjectId,
    pub tree_left: i64,
    pub tree_right: i64,
    pub depth_level: i64,
    #[serde(default = "default_menu")]
    pub menu: bool,
    #[serde(default)]
    pub canonical: bool,
}

fn default_menu() -> bool {
    true
}

impl TreeNode {
    /// Strict interval containment within the same tree
    pub fn contains(&self, other: &TreeNode) -> bool {
        self.root_id == other.root_id
            && self.tree_left < other.tree_left
            && self.tree_right > other.tree_right
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Edge attributes exposed when the placement is loaded as an association
    pub fn join_data(&self) -> JoinData {
        let mut data = JoinData::new();
        data.insert("menu".to_string(), self.menu.into());
        data.insert("canonical".to_string(), self.canonical.into());
        data.insert("depth_level".to_string(), self.depth_level.into());
        data
    }
}

/// An ancestor on a tree path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    pub id: ObjectId,
    pub uname: String,
}

/// A leaf placement together with its ancestors, root first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreePlacement {
    pub node: TreeNode,
    pub leaf: PathSegment,
    pub ancestors: Vec<PathSegment>,
}

impl TreePlacement {
    /// Ancestor unames joined by `/`
    pub fn ancestor_path(&self) -> String {
        self.ancestors
            .iter()
            .map(|segment| segment.uname.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn ancestor_ids(&self) -> Vec<ObjectId> {
        self.ancestors.iter().map(|segment| segment.id).collect()
    }

    /// Full path including the leaf
    pub fn full_path(&self) -> String {
        let ancestors = self.ancestor_path();
        if ancestors.is_empty() {
            self.leaf.uname.clone()
        } else {
            format!("{}/{}", ancestors, self.leaf.uname)
        }
    }

    pub fn has_ancestor(&self, id: ObjectId) -> bool {
        self.ancestors.iter().any(|segment| segment.id == id)
    }
}
