pub mod compiler;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod registry;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use compiler::{compile, CompiledQuery, QueryNode};
pub use config::{Config, ServerConfig, StoreConfig};
pub use discovery::{scan, ScanOptions};
pub use engine::{Backlog, BacklogEntry, Engine, QueryResponse};
pub use error::{CompileError, GraphinatorError, Result};
pub use registry::{RegistryHandle, Snapshot, TypeRegistry};
pub use schema::SchemaBuilder;
pub use store::{GraphStore, MemoryGraph, Neo4jHttpStore, ReadTransaction};
