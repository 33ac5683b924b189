mod common;

use common::{ids, loader, related, related_ids, site_store};
use leafpress_content::{Filter, StatusLevel};
use leafpress_loader::{LoadContext, LoadOptions, LoaderConfig, LoaderError, ObjectsLoader, TypeOptions};
use serde_json::json;

#[tokio::test]
async fn test_load_object_by_uname_and_id() {
    let store = site_store();
    let loader = loader(&store, LoaderConfig::default());
    let ctx = LoadContext::new();

    let by_uname = loader.load_object("hello", "documents", None, &ctx).await.unwrap();
    let by_id = loader.load_object("10", "document", None, &ctx).await.unwrap();
    assert_eq!(by_uname.id, 10);
    assert_eq!(by_uname, by_id);
    assert_eq!(by_uname.attribute("body"), Some(&json!("<p>Hello</p>")));
    assert!(!by_uname.has_changes());
}

#[tokio::test]
async fn test_load_object_not_found() {
    let store = site_store();
    let loader = loader(&store, LoaderConfig::default());
    let ctx = LoadContext::new();

    let missing = loader.load_object("nope", "documents", None, &ctx).await;
    assert!(matches!(missing, Err(LoaderError::NotFound(_))));

    // Exists, but is an image
    let wrong_type = loader.load_object("cover", "documents", None, &ctx).await;
    assert!(matches!(wrong_type, Err(LoaderError::NotFound(_))));

    let unknown_type = loader.load_object("hello", "spaceships", None, &ctx).await;
    assert!(matches!(unknown_type, Err(LoaderError::NotFound(_))));
}

#[tokio::test]
async fn test_status_level_from_context() {
    let store = site_store();
    let loader = loader(&store, LoaderConfig::default());

    let hidden = loader
        .load_object("draft-doc", "documents", None, &LoadContext::new())
        .await;
    assert!(hidden.unwrap_err().is_not_found());

    let preview = LoadContext::new().status_level(StatusLevel::Draft);
    let draft = loader.load_object("draft-doc", "documents", None, &preview).await.unwrap();
    assert_eq!(draft.id, 12);
}

#[tokio::test]
async fn test_load_full_object_uses_concrete_type() {
    let store = site_store();
    let config = LoaderConfig::default().with_type("media", TypeOptions::new("media_of"));
    let loader = loader(&store, config);

    let cover = loader.load_full_object("cover", &LoadContext::new()).await.unwrap();
    assert_eq!(cover.object_type, "images");
    assert_eq!(cover.attribute("width"), Some(&json!(1200)));
    assert_eq!(related_ids(&cover, "media_of"), vec![10, 11]);
}

#[tokio::test]
async fn test_type_defaults_are_inherited_and_reconciled() {
    let store = site_store();
    let config = LoaderConfig::default().with_type("media", TypeOptions::new("media_of"));
    let loader = loader(&store, config);

    let cover = loader.load_object("cover", "images", None, &LoadContext::new()).await.unwrap();
    let owners = related(&cover, "media_of");
    assert_eq!(owners.len(), 2);
    let relation = owners[0].relation().expect("join data copied onto relation");
    assert_eq!(relation["params"]["caption"], "Front");
    assert!(!owners[0].is_dirty("relation"));
}

#[tokio::test]
async fn test_late_contain_limits_per_owner() {
    let store = site_store();
    let config = LoaderConfig::default().with_type("documents", TypeOptions::new("has_media|1,author"));
    let loader = loader(&store, config);

    let hello = loader.load_object("hello", "documents", None, &LoadContext::new()).await.unwrap();
    assert_eq!(related_ids(&hello, "has_media"), vec![20]);
    assert_eq!(related(&hello, "has_media")[0].relation().unwrap()["priority"], 1);
    assert_eq!(related(&hello, "author")[0].uname, "alice");

    let stats = store.stats();
    assert_eq!(stats.association_loads, 1);
    assert_eq!(stats.fetches.last().unwrap().contain, vec!["author".to_string()]);
}

#[tokio::test]
async fn test_explicit_options_replace_defaults() {
    let store = site_store();
    let config = LoaderConfig::default().with_type("documents", TypeOptions::new("has_media"));
    let loader = loader(&store, config);

    let options = LoadOptions::new().include("poster").unwrap();
    let hello = loader
        .load_object("hello", "documents", Some(options), &LoadContext::new())
        .await
        .unwrap();
    assert!(hello.association("has_media").is_none());
    assert_eq!(related(&hello, "poster")[0].id, 22);
}

#[tokio::test]
async fn test_caller_filter_wins_over_defaults() {
    let store = site_store();
    let config = LoaderConfig::default().with_type(
        "documents",
        TypeOptions::default().with_filter(Filter::new().with("status", "draft")),
    );
    let loader = loader(&store, config);
    let preview = LoadContext::new().status_level(StatusLevel::Draft);

    let defaults_only = loader
        .load_objects(Filter::new(), "documents", None, &preview)
        .unwrap()
        .into_vec()
        .await
        .unwrap();
    assert_eq!(ids(&defaults_only), vec![12]);

    let caller = loader
        .load_objects(Filter::new().with("status", "on"), "documents", None, &preview)
        .unwrap()
        .into_vec()
        .await
        .unwrap();
    assert_eq!(ids(&caller), vec![10, 11]);
}

#[tokio::test]
async fn test_lazy_objects_execute_once() {
    let store = site_store();
    let loader = loader(&store, LoaderConfig::default());

    let query = loader
        .load_objects(Filter::new().with("parent", 2), "objects", None, &LoadContext::new())
        .unwrap();
    assert!(!query.is_executed());
    assert_eq!(store.stats().fetch_count(), 0);

    let first_pass = ids(query.all().await.unwrap());
    let second_pass = ids(query.all().await.unwrap());
    assert_eq!(first_pass, vec![10, 11, 20, 21]);
    assert_eq!(first_pass, second_pass);
    assert_eq!(store.stats().fetch_count(), 1);

    assert_eq!(query.count().await.unwrap(), 4);
    assert_eq!(store.stats().counts, 1);
    assert_eq!(store.stats().fetch_count(), 1);
}

#[tokio::test]
async fn test_lazy_objects_pages() {
    let store = site_store();
    let loader = loader(&store, LoaderConfig::default());
    let query = loader
        .load_objects(Filter::new().with("parent", 2), "objects", None, &LoadContext::new())
        .unwrap();

    let second = query.page(2, 3);
    assert!(!second.is_executed());
    assert_eq!(ids(second.all().await.unwrap()), vec![21]);
    assert_eq!(second.count().await.unwrap(), 4);
    assert!(!query.is_executed());

    assert_eq!(query.first_or_fail().await.unwrap().id, 10);

    let empty = loader
        .load_objects(Filter::new().with("uname", "nothing"), "documents", None, &LoadContext::new())
        .unwrap();
    assert!(empty.first().await.unwrap().is_none());
    assert!(empty.first_or_fail().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_page_beyond_results_is_empty() {
    let store = site_store();
    let loader = loader(&store, LoaderConfig::default());
    let query = loader
        .load_objects(Filter::new(), "documents", None, &LoadContext::new())
        .unwrap();

    let far = query.page(usize::MAX / 2, 4);
    assert!(far.all().await.unwrap().is_empty());
    assert_eq!(far.count().await.unwrap(), 2);
    assert!(query.page(5, 10).all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_load_related_objects() {
    let store = site_store();
    let loader = loader(&store, LoaderConfig::default());
    let ctx = LoadContext::new();

    let media = loader
        .load_related_objects("hello", "objects", "has_media", Filter::new(), &ctx)
        .await
        .unwrap();
    assert_eq!(ids(&media), vec![20, 21]);
    assert_eq!(media[0].object_type, "images");
    assert_eq!(media[0].attribute("width"), Some(&json!(1200)));
    assert_eq!(media[1].attribute("duration"), Some(&json!(42)));
    assert_eq!(media[0].relation().unwrap()["params"]["caption"], "Front");
    assert_eq!(media[1].relation().unwrap()["priority"], 2);

    let images = loader
        .load_related_objects("hello", "images", "has_media", Filter::new(), &ctx)
        .await
        .unwrap();
    assert_eq!(ids(&images), vec![20]);

    let unknown = loader
        .load_related_objects("hello", "objects", "likes", Filter::new(), &ctx)
        .await;
    assert!(matches!(unknown, Err(LoaderError::InvalidConfiguration(_))));
}

#[tokio::test]
async fn test_translation_from_context() {
    let store = site_store();
    let loader = loader(&store, LoaderConfig::default());

    let hello = loader
        .load_object("hello", "documents", None, &LoadContext::new().lang("it"))
        .await
        .unwrap();
    assert_eq!(hello.title.as_deref(), Some("Ciao mondo"));
    assert_eq!(hello.attribute("body"), Some(&json!("<p>Ciao</p>")));
    assert_eq!(hello.lang.as_deref(), Some("it"));
}

#[tokio::test]
async fn test_configuration_fails_fast() {
    let store = site_store();

    let unknown_type = LoaderConfig::default().with_type("spaceships", TypeOptions::new("children"));
    assert!(matches!(
        ObjectsLoader::new(store.clone(), unknown_type),
        Err(LoaderError::InvalidConfiguration(_))
    ));

    let bad_include = LoaderConfig::default().with_type("documents", TypeOptions::new("has_media|none"));
    assert!(ObjectsLoader::new(store.clone(), bad_include).is_err());

    let loader = loader(&store, LoaderConfig::default());
    let bad_filter = loader.load_objects(Filter::new().with("colour", "red"), "documents", None, &LoadContext::new());
    assert!(matches!(bad_filter, Err(LoaderError::InvalidConfiguration(_))));
    assert_eq!(store.stats().fetch_count(), 0);
}
