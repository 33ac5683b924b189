//! Content store backends

pub mod memory;
pub mod postgres;

pub use memory::{
    Fixture, FetchRecord, MemoryStore, MemoryStoreBuilder, Placement, RelationDefinition, RelationEdge,
    StoreStats, Translation,
};
pub use postgres::{PgContentStore, PgQueries, SCHEMA};
