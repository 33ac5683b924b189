//! # leafpress-loader
//!
//! Object-graph loader over a [`leafpress_content::ContentStore`]: loads
//! objects through their concrete types, applies per-type default options
//! inherited along the type hierarchy, hydrates configured associations
//! recursively up to a bounded depth, copies edge attributes onto related
//! entities and resolves paths through the folder tree.
//!
//! ```no_run
//! use leafpress_content::MemoryStore;
//! use leafpress_loader::{HydrateDepth, LoadContext, LoaderConfig, ObjectsLoader, TreeLoader};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::from_fixture_file("site.yaml")?);
//! let config = LoaderConfig::default().with_auto_hydrate("children", HydrateDepth::Limited(2));
//! let loader = ObjectsLoader::new(store, config)?;
//!
//! let ctx = LoadContext::new().lang("en");
//! let home = loader.load_object("home", "folders", None, &ctx).await?;
//! let chain = TreeLoader::new(loader).load_object_path("site/news/hello", None, &ctx).await?;
//! # let _ = (home, chain);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod hydration;
pub mod join_data;
pub mod objects;
pub mod publication;
pub mod query;
pub mod tree;
pub mod type_config;

pub use config::{AutoHydrate, HydrateDepth, LoaderConfig, LoaderConfigBuilder, TypeOptions};
pub use error::{LoaderError, LoaderResult};
pub use objects::{LoadContext, ObjectsLoader};
pub use publication::Publication;
pub use query::LazyObjects;
pub use tree::{path_segments, TreeLoader, ViablePath};
pub use type_config::{LoadOptions, TypeConfigResolver};
