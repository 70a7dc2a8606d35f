//! Extended-query compiler and executor: structured filter/join trees over
//! inventory instances, compiled once into a single SQL statement.

mod executor;
mod model;
mod plan;

pub use executor::QueryExecutor;
pub use model::{Condition, Connector, ExtendedQuery, ObjectLight, QueryTerm, ResultRecord};
