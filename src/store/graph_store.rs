use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value as Json;

use crate::errors::CatalogError;

use super::schema::{ensure_schema, read_schema_version};

/// Edge traversal direction relative to a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// A node of the property graph. Properties live in the JSON `data` payload.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub id: i64,
    pub kind: String,
    pub name: String,
    pub data: Json,
}

impl GraphNode {
    /// Reads a string property from the JSON payload, empty string if absent.
    pub fn property_string(&self, key: &str) -> String {
        match self.data.get(key) {
            Some(Json::String(s)) => s.clone(),
            Some(Json::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    pub fn property_bool(&self, key: &str) -> bool {
        self.data.get(key).and_then(Json::as_bool).unwrap_or(false)
    }

    pub fn property_i64(&self, key: &str) -> i64 {
        self.data.get(key).and_then(Json::as_i64).unwrap_or(0)
    }

    pub fn has_property(&self, key: &str) -> bool {
        matches!(self.data.get(key), Some(v) if !v.is_null())
    }
}

/// A typed, directed edge. Edge-level properties live in `data`.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
    pub id: i64,
    pub from_id: i64,
    pub to_id: i64,
    pub edge_type: String,
    pub data: Json,
}

/// Result of an ad-hoc declarative query: rows addressable by column alias.
#[derive(Clone, Debug, Default)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl RowSet {
    /// Value at (row, alias). None if the alias is not a declared column.
    pub fn value(&self, row: usize, alias: &str) -> Option<&SqlValue> {
        let idx = self.columns.iter().position(|c| c == alias)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

/// Embedded transactional property-graph store backed by SQLite.
///
/// Offers the collaborator surface the catalog depends on: labeled node and
/// typed edge storage, label+name exact lookup, directed traversal, and
/// execution of one ad-hoc declarative query returning aliased rows.
pub struct GraphStore {
    conn: Connection,
}

impl GraphStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(|e| CatalogError::connection(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CatalogError::connection(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn schema_version(&self) -> Result<i64, CatalogError> {
        read_schema_version(&self.conn)
    }

    /// Runs `f` inside a scoped transaction: commit on success, rollback on
    /// any error. Mutating catalog operations go through here so validation
    /// failures leave the store untouched.
    pub fn scoped<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| CatalogError::connection(e.to_string()))?;
        match f(self) {
            Ok(value) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(|e| CatalogError::connection(e.to_string()))?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(err)
            }
        }
    }

    pub fn add_node(&self, kind: &str, name: &str, data: Json) -> Result<i64, CatalogError> {
        let payload =
            serde_json::to_string(&data).map_err(|e| CatalogError::invalid_argument(e.to_string()))?;
        self.conn
            .execute(
                "INSERT INTO graph_nodes(kind, name, data) VALUES(?1, ?2, ?3)",
                params![kind, name, payload],
            )
            .map_err(|e| CatalogError::query(e.to_string()))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn node(&self, id: i64) -> Result<GraphNode, CatalogError> {
        self.conn
            .query_row(
                "SELECT id, kind, name, data FROM graph_nodes WHERE id=?1",
                params![id],
                row_to_node,
            )
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => {
                    CatalogError::not_found(format!("node {id}"))
                }
                other => CatalogError::query(other.to_string()),
            })
    }

    pub fn find_node(&self, kind: &str, name: &str) -> Result<Option<GraphNode>, CatalogError> {
        self.conn
            .query_row(
                "SELECT id, kind, name, data FROM graph_nodes WHERE kind=?1 AND name=?2",
                params![kind, name],
                row_to_node,
            )
            .optional()
            .map_err(|e| CatalogError::query(e.to_string()))
    }

    /// Node addressed by label and id; None when the id exists under another
    /// label or not at all.
    pub fn find_node_by_id(&self, kind: &str, id: i64) -> Result<Option<GraphNode>, CatalogError> {
        self.conn
            .query_row(
                "SELECT id, kind, name, data FROM graph_nodes WHERE kind=?1 AND id=?2",
                params![kind, id],
                row_to_node,
            )
            .optional()
            .map_err(|e| CatalogError::query(e.to_string()))
    }

    pub fn nodes_with_kind(&self, kind: &str) -> Result<Vec<GraphNode>, CatalogError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, kind, name, data FROM graph_nodes WHERE kind=?1 ORDER BY id")
            .map_err(|e| CatalogError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params![kind], row_to_node)
            .map_err(|e| CatalogError::query(e.to_string()))?;
        let mut nodes = Vec::new();
        for entry in rows {
            nodes.push(entry.map_err(|e| CatalogError::query(e.to_string()))?);
        }
        Ok(nodes)
    }

    pub fn set_node_name(&self, id: i64, name: &str) -> Result<(), CatalogError> {
        let affected = self
            .conn
            .execute(
                "UPDATE graph_nodes SET name=?1 WHERE id=?2",
                params![name, id],
            )
            .map_err(|e| CatalogError::query(e.to_string()))?;
        if affected == 0 {
            return Err(CatalogError::not_found(format!("node {id}")));
        }
        Ok(())
    }

    pub fn set_node_data(&self, id: i64, data: &Json) -> Result<(), CatalogError> {
        let payload =
            serde_json::to_string(data).map_err(|e| CatalogError::invalid_argument(e.to_string()))?;
        let affected = self
            .conn
            .execute(
                "UPDATE graph_nodes SET data=?1 WHERE id=?2",
                params![payload, id],
            )
            .map_err(|e| CatalogError::query(e.to_string()))?;
        if affected == 0 {
            return Err(CatalogError::not_found(format!("node {id}")));
        }
        Ok(())
    }

    /// Deletes a node along with every incident edge.
    pub fn delete_node(&self, id: i64) -> Result<(), CatalogError> {
        let affected = self
            .conn
            .execute("DELETE FROM graph_nodes WHERE id=?1", params![id])
            .map_err(|e| CatalogError::query(e.to_string()))?;
        if affected == 0 {
            return Err(CatalogError::not_found(format!("node {id}")));
        }
        self.detach_node(id)
    }

    /// Deletes every edge touching the node but keeps the node itself.
    pub fn detach_node(&self, id: i64) -> Result<(), CatalogError> {
        self.conn
            .execute(
                "DELETE FROM graph_edges WHERE from_id=?1 OR to_id=?1",
                params![id],
            )
            .map_err(|e| CatalogError::query(e.to_string()))?;
        Ok(())
    }

    pub fn add_edge(
        &self,
        from_id: i64,
        to_id: i64,
        edge_type: &str,
        data: Json,
    ) -> Result<i64, CatalogError> {
        if edge_type.trim().is_empty() {
            return Err(CatalogError::invalid_argument("edge_type required"));
        }
        let payload =
            serde_json::to_string(&data).map_err(|e| CatalogError::invalid_argument(e.to_string()))?;
        self.conn
            .execute(
                "INSERT INTO graph_edges(from_id, to_id, edge_type, data) VALUES(?1, ?2, ?3, ?4)",
                params![from_id, to_id, edge_type, payload],
            )
            .map_err(|e| CatalogError::query(e.to_string()))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn delete_edge(&self, id: i64) -> Result<(), CatalogError> {
        let affected = self
            .conn
            .execute("DELETE FROM graph_edges WHERE id=?1", params![id])
            .map_err(|e| CatalogError::query(e.to_string()))?;
        if affected == 0 {
            return Err(CatalogError::not_found(format!("edge {id}")));
        }
        Ok(())
    }

    /// Edges of one type incident to `id` in the given direction, in stable
    /// insertion order.
    pub fn edges(
        &self,
        id: i64,
        edge_type: &str,
        direction: Direction,
    ) -> Result<Vec<GraphEdge>, CatalogError> {
        let sql = match direction {
            Direction::Outgoing => {
                "SELECT id, from_id, to_id, edge_type, data FROM graph_edges \
                 WHERE from_id=?1 AND edge_type=?2 ORDER BY id"
            }
            Direction::Incoming => {
                "SELECT id, from_id, to_id, edge_type, data FROM graph_edges \
                 WHERE to_id=?1 AND edge_type=?2 ORDER BY id"
            }
        };
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| CatalogError::query(e.to_string()))?;
        let rows = stmt
            .query_map(params![id, edge_type], row_to_edge)
            .map_err(|e| CatalogError::query(e.to_string()))?;
        let mut edges = Vec::new();
        for entry in rows {
            edges.push(entry.map_err(|e| CatalogError::query(e.to_string()))?);
        }
        Ok(edges)
    }

    /// Neighbor node ids along one edge type and direction.
    pub fn neighbors(
        &self,
        id: i64,
        edge_type: &str,
        direction: Direction,
    ) -> Result<Vec<i64>, CatalogError> {
        Ok(self
            .edges(id, edge_type, direction)?
            .into_iter()
            .map(|e| match direction {
                Direction::Outgoing => e.to_id,
                Direction::Incoming => e.from_id,
            })
            .collect())
    }

    pub fn has_edges(
        &self,
        id: i64,
        edge_type: &str,
        direction: Direction,
    ) -> Result<bool, CatalogError> {
        let sql = match direction {
            Direction::Outgoing => {
                "SELECT 1 FROM graph_edges WHERE from_id=?1 AND edge_type=?2 LIMIT 1"
            }
            Direction::Incoming => {
                "SELECT 1 FROM graph_edges WHERE to_id=?1 AND edge_type=?2 LIMIT 1"
            }
        };
        self.conn
            .prepare(sql)
            .and_then(|mut stmt| stmt.exists(params![id, edge_type]))
            .map_err(|e| CatalogError::query(e.to_string()))
    }

    /// Breadth-first walk along one edge type/direction, starting node
    /// included first. Visits each node once; the graph may contain cycles.
    pub fn bfs(
        &self,
        start: i64,
        edge_type: &str,
        direction: Direction,
    ) -> Result<Vec<i64>, CatalogError> {
        use std::collections::VecDeque;
        let mut visited = ahash::AHashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for next in self.neighbors(node, edge_type, direction)? {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        Ok(order)
    }

    /// Executes one ad-hoc declarative query and materializes all rows. The
    /// caller addresses values by the column aliases the query declared.
    pub fn rows(&self, sql: &str) -> Result<RowSet, CatalogError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| CatalogError::query(e.to_string()))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();
        let mut rows = stmt
            .query([])
            .map_err(|e| CatalogError::query(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| CatalogError::query(e.to_string()))? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                let value: SqlValue = row
                    .get(i)
                    .map_err(|e| CatalogError::query(e.to_string()))?;
                values.push(value);
            }
            out.push(values);
        }
        Ok(RowSet { columns, rows: out })
    }
}

fn row_to_node(row: &rusqlite::Row<'_>) -> rusqlite::Result<GraphNode> {
    let data: String = row.get(3)?;
    Ok(GraphNode {
        id: row.get(0)?,
        kind: row.get(1)?,
        name: row.get(2)?,
        data: serde_json::from_str(&data).unwrap_or(Json::Null),
    })
}

fn row_to_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<GraphEdge> {
    let data: String = row.get(4)?;
    Ok(GraphEdge {
        id: row.get(0)?,
        from_id: row.get(1)?,
        to_id: row.get(2)?,
        edge_type: row.get(3)?,
        data: serde_json::from_str(&data).unwrap_or(Json::Null),
    })
}
