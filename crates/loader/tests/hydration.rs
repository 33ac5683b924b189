mod common;

use common::{ids, loader, related, related_ids, site_store};
use leafpress_content::{ContentStore, FetchQuery, MemoryStore, ObjectEntity, ReadScope, RelationEdge};
use leafpress_loader::{AutoHydrate, HydrateDepth, LoadContext, LoaderConfig, TypeOptions};
use serde_json::json;
use std::sync::Arc;

fn folders_with_children(depth: u32) -> LoaderConfig {
    LoaderConfig::default()
        .with_type("folders", TypeOptions::new("children"))
        .with_auto_hydrate("children", HydrateDepth::Limited(depth))
}

#[tokio::test]
async fn test_to_concrete_types_preserves_order() {
    let store = site_store();
    let loader = loader(&store, LoaderConfig::default());

    let base = store
        .fetch_many(&FetchQuery::by_ids("objects", &[20, 10, 21, 11, 22]))
        .await
        .unwrap();
    // Shuffle into an order the store would never return
    let mixed: Vec<ObjectEntity> = [22, 10, 21, 20, 11]
        .iter()
        .filter_map(|id| base.iter().find(|o| o.id == *id).cloned())
        .collect();
    store.reset_stats();

    let concrete = loader.to_concrete_types(mixed, 1, &LoadContext::new()).await.unwrap();
    assert_eq!(ids(&concrete), vec![22, 10, 21, 20, 11]);
    assert_eq!(concrete[0].attribute("width"), Some(&json!(64)));
    assert_eq!(concrete[1].attribute("body"), Some(&json!("<p>Hello</p>")));
    assert_eq!(concrete[2].object_type, "videos");

    // One batched fetch per concrete type, in first-seen order
    let stats = store.stats();
    let fetched: Vec<&str> = stats.fetches.iter().map(|f| f.object_type.as_str()).collect();
    assert_eq!(fetched, vec!["images", "documents", "videos"]);
    assert_eq!(stats.fetches[0].ids, Some(vec![22, 20]));
}

#[tokio::test]
async fn test_duplicates_are_fetched_once() {
    let store = site_store();
    let loader = loader(&store, LoaderConfig::default());
    let base = store
        .fetch_many(&FetchQuery::by_ids("objects", &[10, 20]))
        .await
        .unwrap();
    let input = vec![base[1].clone(), base[0].clone(), base[1].clone()];
    store.reset_stats();

    let concrete = loader.hydrate_objects(input, &LoadContext::new()).await.unwrap();
    assert_eq!(ids(&concrete), vec![20, 10, 20]);
    assert_eq!(store.stats().times_fetched(20), 1);
}

#[tokio::test]
async fn test_depth_termination() {
    let store = site_store();
    let loader = loader(&store, folders_with_children(2));

    let site = loader.load_object("site", "folders", None, &LoadContext::new()).await.unwrap();
    assert_eq!(related_ids(&site, "children"), vec![2]);

    // news was hydrated at depth 2: its own children stay base records
    let news = related(&site, "children")[0];
    assert_eq!(news.relation().unwrap()["canonical"], true);
    assert_eq!(related_ids(news, "children"), vec![10, 11, 20, 21]);
    let news_children = related(news, "children");
    assert!(news_children.iter().all(|o| o.attributes.is_empty()));
    assert!(news_children[0].relation().is_some());
}

#[tokio::test]
async fn test_deeper_limit_expands_another_level() {
    let store = site_store();
    let loader = loader(&store, folders_with_children(3));

    let site = loader.load_object("site", "folders", None, &LoadContext::new()).await.unwrap();
    let news = related(&site, "children")[0];
    let hello = related(news, "children")[0];
    assert_eq!(hello.object_type, "documents");
    assert_eq!(hello.attribute("body"), Some(&json!("<p>Hello</p>")));
    assert_eq!(hello.relation().unwrap()["menu"], true);
    assert!(!hello.has_changes());
}

#[tokio::test]
async fn test_level_is_batched_across_owners() {
    let store = site_store();
    let config = LoaderConfig::default()
        .with_type("documents", TypeOptions::new("has_media"))
        .with_auto_hydrate("has_media", HydrateDepth::Limited(2));
    let loader = loader(&store, config);

    let posts = loader
        .load_objects(
            leafpress_content::Filter::by_ids(&[10, 11]),
            "documents",
            None,
            &LoadContext::new(),
        )
        .unwrap()
        .into_vec()
        .await
        .unwrap();

    assert_eq!(related_ids(&posts[0], "has_media"), vec![20, 21]);
    assert_eq!(related_ids(&posts[1], "has_media"), vec![20, 22]);
    // The cover shared by both posts keeps each edge's own attributes
    assert_eq!(related(&posts[0], "has_media")[0].relation().unwrap()["params"]["caption"], "Front");
    assert!(related(&posts[1], "has_media")[0].relation().unwrap()["params"].is_null());

    let stats = store.stats();
    assert_eq!(stats.fetches_for("images"), 1);
    assert_eq!(stats.fetches_for("videos"), 1);
    assert_eq!(stats.times_fetched(20), 1);
}

#[tokio::test]
async fn test_single_association_is_hydrated() {
    let store = site_store();
    let config = LoaderConfig::default()
        .with_type("documents", TypeOptions::new("parent"))
        .with_auto_hydrate("parent", HydrateDepth::Limited(2));
    let loader = loader(&store, config);

    let hello = loader.load_object("hello", "documents", None, &LoadContext::new()).await.unwrap();
    let parent = related(&hello, "parent");
    assert_eq!(parent.len(), 1);
    assert_eq!(parent[0].uname, "news");
    assert_eq!(parent[0].object_type, "folders");
    assert_eq!(parent[0].relation().unwrap()["canonical"], true);
}

#[tokio::test]
async fn test_context_overrides_auto_hydrate() {
    let store = site_store();
    let loader = loader(&store, folders_with_children(3));

    let site = loader
        .load_object("site", "folders", None, &LoadContext::new().no_hydrate())
        .await
        .unwrap();
    let news = related(&site, "children")[0];
    assert!(news.association("children").is_none());
    assert_eq!(store.stats().fetch_count(), 1);

    let mut hydrate = AutoHydrate::new();
    hydrate.insert("children".to_string(), HydrateDepth::Limited(2));
    let site = loader
        .load_object("site", "folders", None, &LoadContext::new().hydrate(hydrate))
        .await
        .unwrap();
    assert!(related(&site, "children")[0].association("children").is_some());
}

fn cyclic_store() -> Arc<MemoryStore> {
    let store = MemoryStore::builder()
        .object(ObjectEntity::new(1, "ping", "documents").with_attribute("body", "ping"))
        .object(ObjectEntity::new(2, "pong", "documents").with_attribute("body", "pong"))
        .relate(RelationEdge::new(1, "next", "previous", 2))
        .relate(RelationEdge::new(2, "next", "previous", 1))
        .build()
        .unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn test_unlimited_depth_stops_at_cap() {
    let store = cyclic_store();
    let mut config = LoaderConfig::default()
        .with_type("documents", TypeOptions::new("next"))
        .with_auto_hydrate("next", HydrateDepth::Unlimited);
    config.set_unlimited_depth_cap(4);
    let loader = loader(&store, config);

    let ping = loader.load_object("ping", "documents", None, &LoadContext::new()).await.unwrap();

    // depths 2, 3 and 4 are concrete; the records under depth 4 are not re-loaded
    let mut node = ping;
    for expected in ["pong", "ping", "pong"] {
        let next = related(&node, "next")[0].clone();
        node = next;
        assert_eq!(node.uname, expected);
        assert!(node.attribute("body").is_some());
    }
    let last = related(&node, "next")[0];
    assert_eq!(last.uname, "ping");
    assert!(last.attribute("body").is_none());
}

#[tokio::test]
async fn test_vanished_records_are_dropped() {
    let store = site_store();
    let loader = loader(&store, LoaderConfig::default());

    let preview = ReadScope::new(leafpress_content::StatusLevel::Draft, None);
    let base = store
        .fetch_by_ids("objects", &[12, 10], &preview)
        .await
        .unwrap();
    assert_eq!(base.len(), 2);

    // draft-doc is not visible at the default status level
    let concrete = loader.hydrate_objects(base, &LoadContext::new()).await.unwrap();
    assert_eq!(ids(&concrete), vec![10]);
}
