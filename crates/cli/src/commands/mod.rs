pub mod object;
pub mod objects;
pub mod tree;

use anyhow::{bail, Context};
use leafpress_content::{ContentStore, Filter, MemoryStore, ObjectId, PgContentStore};
use leafpress_loader::{LoadContext, LoaderConfig, ObjectsLoader};
use std::sync::Arc;

use crate::Cli;

const MAX_CONNECTIONS: u32 = 5;

/// A content store and a loader configured from the command line
pub struct Session {
    pub loader: ObjectsLoader,
    pub ctx: LoadContext,
}

impl Session {
    pub async fn open(cli: &Cli) -> anyhow::Result<Self> {
        let store: Arc<dyn ContentStore> = match (&cli.fixture, &cli.database_url) {
            (Some(path), _) => Arc::new(
                MemoryStore::from_fixture_file(path)
                    .with_context(|| format!("loading fixture {}", path.display()))?,
            ),
            (None, Some(url)) => Arc::new(
                PgContentStore::connect_url(url, MAX_CONNECTIONS)
                    .await
                    .context("connecting to the content database")?,
            ),
            (None, None) => bail!("either --fixture or --database-url is required"),
        };

        let config = match &cli.config {
            Some(path) => LoaderConfig::from_yaml_file(path)
                .with_context(|| format!("reading loader configuration {}", path.display()))?,
            None => LoaderConfig::default(),
        };
        let loader = ObjectsLoader::new(store, config)?;

        let mut ctx = LoadContext::new();
        if let Some(lang) = &cli.lang {
            ctx = ctx.lang(lang);
        }
        if let Some(level) = cli.status {
            ctx = ctx.status_level(level);
        }

        tracing::debug!(?ctx, "session opened");
        Ok(Self { loader, ctx })
    }

    pub async fn resolve_id(&self, id_or_uname: &str) -> anyhow::Result<ObjectId> {
        Ok(self.loader.store().resolve_id(id_or_uname).await?)
    }

    pub async fn resolve_optional(&self, id_or_uname: Option<&str>) -> anyhow::Result<Option<ObjectId>> {
        match id_or_uname {
            Some(value) => Ok(Some(self.resolve_id(value).await?)),
            None => Ok(None),
        }
    }
}

/// Build a filter from `key=value` arguments
pub fn parse_filters(args: &[String]) -> anyhow::Result<Filter> {
    let mut filter = Filter::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("filter '{}' is not of the form key=value", arg);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("filter '{}' has an empty key", arg);
        }
        filter.insert(key, value.trim());
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;
    use std::io::Write;

    const FIXTURE: &str = r#"
objects:
  - { id: 1, uname: site, type: folders, title: Site, status: "on" }
  - { id: 2, uname: blog, type: folders, title: Blog, status: "on" }
  - { id: 3, uname: hello, type: documents, title: Hello, status: "on", attributes: { body: "<p>hi</p>" } }
  - { id: 4, uname: draft-post, type: documents, title: Later, status: draft }
  - { id: 5, uname: cover, type: images, title: Cover, status: "on", attributes: { width: 800 } }
relation_types:
  - { name: has_media, inverse_name: media_of }
relations:
  - { left_id: 3, name: has_media, inverse_name: media_of, right_id: 5 }
tree:
  - { object: 1 }
  - { object: 2, parent: 1 }
  - { object: 3, parent: 2 }
  - { object: 4, parent: 2 }
"#;

    async fn open_session(extra: &[&str]) -> (tempfile::NamedTempFile, Session) {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("Failed to create fixture file");
        file.write_all(FIXTURE.as_bytes()).expect("Failed to write fixture");

        let path = file.path().to_string_lossy().to_string();
        let mut args = vec!["leafpress", "--fixture", path.as_str()];
        args.extend_from_slice(extra);
        args.extend_from_slice(&["object", "1"]);
        let cli = Cli::try_parse_from(args).unwrap();
        let session = Session::open(&cli).await.unwrap();
        (file, session)
    }

    #[tokio::test]
    async fn test_object_command_loads_concrete_type() {
        let (_file, session) = open_session(&[]).await;
        let object = object::run(&session, "hello", None, None).await.unwrap();
        assert_eq!(object["type"], "documents");
        assert_eq!(object["attributes"]["body"], "<p>hi</p>");

        let with_media = object::run(&session, "hello", Some("documents"), Some("has_media"))
            .await
            .unwrap();
        assert_eq!(with_media["associations"]["has_media"][0]["id"], 5);
    }

    #[tokio::test]
    async fn test_objects_and_related_commands() {
        let (_file, session) = open_session(&[]).await;
        let count = objects::list(&session, "documents", &[], None, 20, true).await.unwrap();
        assert_eq!(count, json!({ "count": 1 }));

        let (_file, preview) = open_session(&["--status", "draft"]).await;
        let listed = objects::list(&preview, "documents", &["parent=2".to_string()], Some(1), 1, false)
            .await
            .unwrap();
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let media = objects::related(&session, "hello", "has_media", "objects", &[]).await.unwrap();
        assert_eq!(media[0]["uname"], "cover");
        assert_eq!(media[0]["attributes"]["width"], 800);
    }

    #[tokio::test]
    async fn test_tree_commands() {
        let (_file, session) = open_session(&[]).await;
        let chain = tree::path(&session, "site/blog/hello", None).await.unwrap();
        let ids: Vec<i64> = chain
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|o| o["id"].as_i64())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let paths = tree::paths(&session, "hello", Some("site"), None, false).await.unwrap();
        assert_eq!(paths[0]["path"], "blog/hello");
        assert_eq!(paths[0]["path_ids"], json!([2, 3]));

        assert!(tree::path(&session, "blog/hello", None).await.is_err());
    }

    #[test]
    fn test_parse_filters() {
        let filter = parse_filters(&["parent=3".to_string(), " status = on,draft".to_string()]).unwrap();
        assert_eq!(filter.get("parent"), Some(&json!("3")));
        assert_eq!(filter.get("status"), Some(&json!("on,draft")));
        assert!(filter.conditions().is_ok());
    }

    #[test]
    fn test_parse_filters_rejects_malformed() {
        assert!(parse_filters(&["parent".to_string()]).is_err());
        assert!(parse_filters(&["=3".to_string()]).is_err());
        assert!(parse_filters(&[]).unwrap().is_empty());
    }
}
