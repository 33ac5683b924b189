//! # leafpress-content
//!
//! Content repository model for leafpress: object types, objects and their
//! associations, folder trees, query filters, and the [`ContentStore`]
//! abstraction with in-memory and PostgreSQL backends.

pub mod backends;
pub mod error;
pub mod filter;
pub mod include;
pub mod model;
pub mod store;
pub mod tree;
pub mod types;

pub use backends::{MemoryStore, MemoryStoreBuilder, PgContentStore, RelationEdge, StoreStats};
pub use error::{ContentError, ContentResult};
pub use filter::{Filter, FilterCondition, FILTER_STRATEGIES};
pub use include::{Contain, IncludeSpec};
pub use model::{Association, JoinData, ObjectEntity, ObjectId, Status, StatusLevel};
pub use store::{cardinality, Cardinality, ContentStore, FetchQuery, Page, ReadScope, CHILDREN, PARENT, PARENTS};
pub use tree::{PathSegment, TreeNode, TreePlacement};
pub use types::{ObjectType, TypeRegistry, OBJECTS_TABLE};
