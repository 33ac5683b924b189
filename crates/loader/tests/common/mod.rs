//! Shared site fixture for loader integration tests
//!
//! ```text
//! site (1)
//! ├── news (2)
//! │   ├── hello (10, canonical)   has_media -> cover, clip; poster -> logo; author -> alice
//! │   ├── second (11)             has_media -> cover, logo
//! │   ├── draft-doc (12, draft)
//! │   ├── cover (20)
//! │   └── clip (21)
//! └── about (3, draft)
//!     └── hello (10)
//! ```

#![allow(dead_code)]

use leafpress_content::{MemoryStore, ObjectEntity, RelationEdge, Status};
use leafpress_loader::{LoaderConfig, ObjectsLoader};
use serde_json::json;
use std::sync::Arc;

pub fn site_store() -> Arc<MemoryStore> {
    let store = MemoryStore::builder()
        .object(ObjectEntity::new(1, "site", "folders").with_title("Site"))
        .object(ObjectEntity::new(2, "news", "folders").with_title("News"))
        .object(
            ObjectEntity::new(3, "about", "folders")
                .with_title("About")
                .with_status(Status::Draft),
        )
        .object(
            ObjectEntity::new(10, "hello", "documents")
                .with_title("Hello world")
                .with_attribute("body", "<p>Hello</p>"),
        )
        .object(
            ObjectEntity::new(11, "second", "documents")
                .with_title("Second post")
                .with_attribute("body", "<p>Again</p>"),
        )
        .object(
            ObjectEntity::new(12, "draft-doc", "documents")
                .with_title("Work in progress")
                .with_status(Status::Draft),
        )
        .object(
            ObjectEntity::new(20, "cover", "images")
                .with_title("Cover")
                .with_attribute("width", 1200),
        )
        .object(
            ObjectEntity::new(21, "clip", "videos")
                .with_title("Clip")
                .with_attribute("duration", 42),
        )
        .object(
            ObjectEntity::new(22, "logo", "images")
                .with_title("Logo")
                .with_attribute("width", 64),
        )
        .object(ObjectEntity::new(30, "alice", "profiles").with_attribute("name", "Alice"))
        .place(1, None)
        .place(2, Some(1))
        .place(3, Some(1))
        .place_canonical(10, 2)
        .place(11, Some(2))
        .place(12, Some(2))
        .place(20, Some(2))
        .place(21, Some(2))
        .place(10, Some(3))
        .relate(
            RelationEdge::new(10, "has_media", "media_of", 20)
                .priority(1)
                .params(json!({"caption": "Front"})),
        )
        .relate(RelationEdge::new(10, "has_media", "media_of", 21).priority(2))
        .relate(RelationEdge::new(11, "has_media", "media_of", 20).priority(1))
        .relate(RelationEdge::new(11, "has_media", "media_of", 22).priority(2))
        .relate(RelationEdge::new(10, "poster", "poster_of", 22))
        .relate(RelationEdge::new(10, "author", "author_of", 30))
        .translation(10, "it", json!({"title": "Ciao mondo", "body": "<p>Ciao</p>"}))
        .build()
        .expect("Failed to build site fixture");
    Arc::new(store)
}

pub fn loader(store: &Arc<MemoryStore>, config: LoaderConfig) -> ObjectsLoader {
    ObjectsLoader::new(store.clone(), config).expect("Failed to build loader")
}

pub fn ids(objects: &[ObjectEntity]) -> Vec<i64> {
    objects.iter().map(|o| o.id).collect()
}

/// Entities of an association, empty when the slot is missing
pub fn related<'a>(object: &'a ObjectEntity, association: &str) -> Vec<&'a ObjectEntity> {
    object
        .association(association)
        .map(|a| a.entities())
        .unwrap_or_default()
}

pub fn related_ids(object: &ObjectEntity, association: &str) -> Vec<i64> {
    related(object, association).iter().map(|o| o.id).collect()
}
