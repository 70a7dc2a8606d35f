mod graph_store;
pub mod schema;

pub use graph_store::{Direction, GraphEdge, GraphNode, GraphStore, RowSet};
