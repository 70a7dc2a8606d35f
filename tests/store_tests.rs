use serde_json::json;
use taxograph::{CatalogError, Direction, GraphStore};

fn node(store: &GraphStore, kind: &str, name: &str) -> i64 {
    store
        .add_node(kind, name, json!({ "name": name }))
        .expect("node")
}

#[test]
fn test_schema_version_is_stamped() {
    let store = GraphStore::open_in_memory().expect("store");
    assert_eq!(store.schema_version().expect("version"), 1);
}

#[test]
fn test_reopen_preserves_nodes_and_edges() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("catalog.db");

    {
        let store = GraphStore::open(&path).expect("open");
        let a = node(&store, "classes", "A");
        let b = node(&store, "classes", "B");
        store.add_edge(b, a, "EXTENDS", json!({})).expect("edge");
    }

    let store = GraphStore::open(&path).expect("reopen");
    assert_eq!(store.schema_version().expect("version"), 1);
    let a = store
        .find_node("classes", "A")
        .expect("lookup")
        .expect("survives reopen");
    let subclasses = store
        .neighbors(a.id, "EXTENDS", Direction::Incoming)
        .expect("neighbors");
    assert_eq!(subclasses.len(), 1);
}

#[test]
fn test_scoped_rolls_back_on_error() {
    let store = GraphStore::open_in_memory().expect("store");
    let result: Result<(), CatalogError> = store.scoped(|s| {
        s.add_node("classes", "Doomed", json!({}))?;
        Err(CatalogError::invalid_argument("abort"))
    });
    assert!(result.is_err());
    assert!(store.find_node("classes", "Doomed").expect("lookup").is_none());
}

#[test]
fn test_delete_node_detaches_edges() {
    let store = GraphStore::open_in_memory().expect("store");
    let a = node(&store, "classes", "A");
    let b = node(&store, "classes", "B");
    store.add_edge(b, a, "EXTENDS", json!({})).expect("edge");

    store.delete_node(b).expect("delete");
    assert!(store
        .edges(a, "EXTENDS", Direction::Incoming)
        .expect("edges")
        .is_empty());
}

#[test]
fn test_bfs_includes_start_and_walks_direction() {
    let store = GraphStore::open_in_memory().expect("store");
    let root = node(&store, "classes", "Root");
    let mid = node(&store, "classes", "Mid");
    let leaf = node(&store, "classes", "Leaf");
    store.add_edge(mid, root, "EXTENDS", json!({})).expect("edge");
    store.add_edge(leaf, mid, "EXTENDS", json!({})).expect("edge");

    let down = store.bfs(root, "EXTENDS", Direction::Incoming).expect("bfs");
    assert_eq!(down, vec![root, mid, leaf]);

    let up = store.bfs(leaf, "EXTENDS", Direction::Outgoing).expect("bfs");
    assert_eq!(up, vec![leaf, mid, root]);
}

#[test]
fn test_rows_addressed_by_column_alias() {
    let store = GraphStore::open_in_memory().expect("store");
    let id = node(&store, "inventoryObjects", "R1");

    let rows = store
        .rows("SELECT n.id AS instance FROM graph_nodes n WHERE n.name = 'R1'")
        .expect("rows");
    assert_eq!(rows.rows.len(), 1);
    match rows.value(0, "instance") {
        Some(rusqlite::types::Value::Integer(found)) => assert_eq!(*found, id),
        other => panic!("unexpected value: {other:?}"),
    }
}
