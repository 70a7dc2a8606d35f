//! SQLite-backed metadata catalog for inventory platforms: class taxonomy
//! with copy-down inheritance, containment permissions, a read-through
//! metadata cache and a structured query compiler.

pub mod errors;
pub mod meta;
pub mod query;
pub mod store;

pub use crate::errors::CatalogError;
pub use crate::meta::{
    AttributeDefinition, AttributeType, AttributeUpdate, Catalog, ChangeDescriptor,
    ClassDefinition, ClassInfo, ClassRef, ClassUpdate, MetadataCache,
};
pub use crate::query::{
    Condition, Connector, ExtendedQuery, ObjectLight, QueryExecutor, QueryTerm, ResultRecord,
};
pub use crate::store::{Direction, GraphEdge, GraphNode, GraphStore};
