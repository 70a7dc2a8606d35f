use std::sync::Arc;

use taxograph::meta::MetadataCache;
use taxograph::{Catalog, ClassDefinition, ClassInfo, GraphStore};

fn info(id: i64, name: &str) -> ClassInfo {
    ClassInfo {
        id,
        name: name.to_string(),
        display_name: String::new(),
        abstract_class: false,
        custom: true,
        in_design: false,
    }
}

#[test]
fn test_class_index_put_get_clear() {
    let cache = MetadataCache::new();
    assert!(cache.class("Router").is_none());

    cache.put_class(ClassDefinition::new("Router", Some("InventoryObject")));
    let cached = cache.class("Router").expect("cached");
    assert_eq!(cached.parent_class_name.as_deref(), Some("InventoryObject"));

    cache.clear_derived();
    assert!(cache.class("Router").is_none());
}

#[test]
fn test_subclass_entries_are_replaced_wholesale() {
    let cache = MetadataCache::new();
    cache.put_subclasses("InventoryObject", vec![info(1, "Router")]);
    assert_eq!(
        cache.subclasses("InventoryObject").expect("entry"),
        vec![info(1, "Router")]
    );

    cache.put_subclasses("InventoryObject", vec![info(1, "Router"), info(2, "Switch")]);
    assert_eq!(cache.subclasses("InventoryObject").expect("entry").len(), 2);
    assert!(cache.subclasses_direct("InventoryObject").is_none());
}

#[test]
fn test_incremental_child_needs_a_projection_first() {
    let cache = MetadataCache::new();
    // Without a stored projection the incremental append is a no-op.
    cache.put_possible_child("Rack", "Board");
    assert!(cache.possible_children("Rack").is_none());

    cache.put_possible_children("Rack", vec!["Router".into()]);
    cache.put_possible_child("Rack", "Board");
    assert_eq!(
        cache.possible_children("Rack").expect("entry"),
        vec!["Board".to_string(), "Router".to_string()]
    );
}

#[test]
fn test_unique_values_per_class_and_attribute() {
    let cache = MetadataCache::new();
    cache.put_unique_values("Router", "serialNumber", vec!["S1".into()]);
    assert_eq!(
        cache.unique_values("Router", "serialNumber").expect("values"),
        vec!["S1".to_string()]
    );
    assert!(cache.unique_values("Router", "ipAddress").is_none());

    cache.put_unique_values("Router", "serialNumber", vec!["S1".into(), "S2".into()]);
    assert_eq!(
        cache.unique_values("Router", "serialNumber").expect("values"),
        vec!["S1".to_string(), "S2".to_string()]
    );

    cache.clear_derived();
    assert!(cache.unique_values("Router", "serialNumber").is_none());
}

#[test]
fn test_stats_count_hits_and_misses() {
    let cache = MetadataCache::new();
    cache.class("Router");
    cache.put_class(ClassDefinition::new("Router", Some("InventoryObject")));
    cache.class("Router");

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.classes, 1);

    cache.clear_all();
    let cleared = cache.stats();
    assert_eq!(cleared.classes, 0);
    assert_eq!(cleared.hits, 0);
    assert_eq!(cleared.misses, 0);
}

#[test]
fn test_adopted_cache_is_reset_before_priming() {
    let cache = Arc::new(MetadataCache::new());
    cache.put_class(ClassDefinition::new("Leftover", None));
    cache.class("Leftover");
    cache.class("Missing");
    assert_eq!(cache.stats().hits, 1);

    let catalog = Catalog::with_cache(GraphStore::open_in_memory().expect("store"), cache)
        .expect("catalog");
    let stats = catalog.cache().stats();
    assert_eq!(stats.classes, 0);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert!(catalog.cache().class("Leftover").is_none());
}
