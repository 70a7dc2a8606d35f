use rusqlite::types::Value as SqlValue;

use crate::errors::CatalogError;
use crate::meta::{Catalog, PROP_NAME, PROP_UUID, PSEUDO_ATTRIBUTE_ID, REL_INSTANCE_OF};
use crate::store::{Direction, GraphNode};

use super::model::{ExtendedQuery, ObjectLight, ResultRecord};
use super::plan::{QueryPlan, ALIAS_INSTANCE};

/// Compiles and runs extended queries against a catalog. Borrows the
/// catalog, so executors are cheap to create per query.
pub struct QueryExecutor<'a> {
    catalog: &'a Catalog,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Lowers the query to SQL without running it.
    pub fn compile(&self, query: &ExtendedQuery) -> Result<String, CatalogError> {
        Ok(QueryPlan::build(self.catalog, query)?.sql())
    }

    /// Compiles the query, runs it once, and decodes the result with the
    /// header-first convention: position 0 carries the visible-attribute
    /// titles, every following record one matched object.
    pub fn execute(&self, query: &ExtendedQuery) -> Result<Vec<ResultRecord>, CatalogError> {
        let plan = QueryPlan::build(self.catalog, query)?;
        let aliases = plan.aliases();
        let rows = self.catalog.store().rows(&plan.sql())?;

        let mut header = Vec::new();
        for (_, visible) in &aliases {
            header.extend(visible.iter().cloned());
        }
        let mut records = vec![ResultRecord::header(header)];

        for row in 0..rows.rows.len() {
            let primary_id = match rows.value(row, ALIAS_INSTANCE) {
                Some(SqlValue::Integer(id)) => *id,
                _ => {
                    return Err(CatalogError::query(
                        "query result is missing the primary instance column",
                    ))
                }
            };
            let node = self.catalog.store().node(primary_id)?;
            if !node.has_property(PROP_UUID) {
                return Err(CatalogError::invalid_argument(format!(
                    "the object with id {primary_id} does not have a uuid"
                )));
            }
            let object = ObjectLight {
                id: node.property_string(PROP_UUID),
                class_name: self.class_of(&node)?,
                display_value: node.name.clone(),
            };

            let mut columns = Vec::new();
            for (alias, visible) in &aliases {
                if visible.is_empty() {
                    continue;
                }
                let alias_node = if *alias == ALIAS_INSTANCE {
                    node.clone()
                } else {
                    match rows.value(row, alias) {
                        Some(SqlValue::Integer(id)) => self.catalog.store().node(*id)?,
                        _ => {
                            return Err(CatalogError::query(format!(
                                "query result is missing the {alias} column"
                            )))
                        }
                    }
                };
                for attribute in *visible {
                    columns.push(attribute_column(&alias_node, attribute));
                }
            }
            records.push(ResultRecord {
                object: Some(object),
                columns,
            });
        }
        Ok(records)
    }

    fn class_of(&self, instance: &GraphNode) -> Result<String, CatalogError> {
        let classes = self
            .catalog
            .store()
            .neighbors(instance.id, REL_INSTANCE_OF, Direction::Outgoing)?;
        match classes.first() {
            Some(&class_id) => Ok(self.catalog.store().node(class_id)?.name),
            None => Err(CatalogError::query(format!(
                "the object with id {} is not an instance of any class",
                instance.id
            ))),
        }
    }
}

/// The pseudo-attribute `id` yields the internal id, `name` the display
/// name; everything else reads from the node's data payload.
fn attribute_column(node: &GraphNode, attribute: &str) -> String {
    if attribute == PSEUDO_ATTRIBUTE_ID {
        node.id.to_string()
    } else if attribute == PROP_NAME {
        node.name.clone()
    } else {
        node.property_string(attribute)
    }
}
