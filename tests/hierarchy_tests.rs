use taxograph::{
    AttributeDefinition, AttributeType, Catalog, CatalogError, ClassDefinition, GraphStore,
};

fn catalog() -> Catalog {
    Catalog::new(GraphStore::open_in_memory().expect("store")).expect("catalog")
}

fn seed_base(catalog: &Catalog) {
    let mut root = ClassDefinition::new("RootObject", None);
    root.abstract_class = true;
    root.custom = false;
    root.attributes
        .push(AttributeDefinition::new("name", AttributeType::String));
    root.attributes
        .push(AttributeDefinition::new("creationDate", AttributeType::Date));
    catalog.create_class(&root).expect("root");

    let mut inventory = ClassDefinition::new("InventoryObject", Some("RootObject"));
    inventory.abstract_class = true;
    inventory.custom = false;
    catalog.create_class(&inventory).expect("inventory root");
}

fn seed_devices(catalog: &Catalog) {
    let mut generic = ClassDefinition::new("GenericBoard", Some("InventoryObject"));
    generic.abstract_class = true;
    catalog.create_class(&generic).expect("abstract board");
    catalog
        .create_class(&ClassDefinition::new("Board", Some("GenericBoard")))
        .expect("board");
    catalog
        .create_class(&ClassDefinition::new("Router", Some("InventoryObject")))
        .expect("router");
}

#[test]
fn test_is_subclass_of_is_reflexive_and_transitive() {
    let catalog = catalog();
    seed_base(&catalog);
    seed_devices(&catalog);

    assert!(catalog.is_subclass_of("Board", "Board").expect("reflexive"));
    assert!(catalog.is_subclass_of("GenericBoard", "Board").expect("direct"));
    assert!(catalog.is_subclass_of("InventoryObject", "Board").expect("transitive"));
    assert!(catalog.is_subclass_of("RootObject", "Board").expect("to root"));
    assert!(!catalog.is_subclass_of("Router", "Board").expect("sibling"));
    assert!(!catalog.is_subclass_of("Board", "GenericBoard").expect("inverse"));

    let unknown = catalog.is_subclass_of("InventoryObject", "NoSuchClass");
    assert!(matches!(unknown, Err(CatalogError::NotFound(_))));
}

#[test]
fn test_subclasses_respects_abstract_and_self_flags() {
    let catalog = catalog();
    seed_base(&catalog);
    seed_devices(&catalog);

    let concrete: Vec<String> = catalog
        .subclasses("InventoryObject", false, false)
        .expect("concrete")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(concrete, vec!["Board", "Router"]);

    let with_abstract: Vec<String> = catalog
        .subclasses("InventoryObject", true, false)
        .expect("with abstract")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(with_abstract, vec!["Board", "GenericBoard", "Router"]);

    // An abstract class asking for itself only appears when abstract
    // classes are included.
    let with_self: Vec<String> = catalog
        .subclasses("InventoryObject", true, true)
        .expect("with self")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(
        with_self,
        vec!["Board", "GenericBoard", "Router", "InventoryObject"]
    );
    let concrete_self: Vec<String> = catalog
        .subclasses("InventoryObject", false, true)
        .expect("concrete self")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(concrete_self, vec!["Board", "Router"]);
}

#[test]
fn test_subclasses_direct_stops_at_one_level() {
    let catalog = catalog();
    seed_base(&catalog);
    seed_devices(&catalog);

    let direct: Vec<String> = catalog
        .subclasses_direct("InventoryObject", true, false)
        .expect("direct")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(direct, vec!["GenericBoard", "Router"]);
}

#[test]
fn test_subclasses_cache_hit_matches_miss() {
    let catalog = catalog();
    seed_base(&catalog);
    seed_devices(&catalog);

    // Structural mutations prime the cache; drop it to force a store read.
    catalog.cache().clear_derived();
    let miss = catalog
        .subclasses("InventoryObject", false, false)
        .expect("miss path");
    let hit = catalog
        .subclasses("InventoryObject", false, false)
        .expect("hit path");
    assert_eq!(miss, hit);
}

#[test]
fn test_upstream_hierarchy_walks_to_the_root() {
    let catalog = catalog();
    seed_base(&catalog);
    seed_devices(&catalog);

    let chain: Vec<String> = catalog
        .upstream_class_hierarchy("Board", true)
        .expect("chain")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(
        chain,
        vec!["Board", "GenericBoard", "InventoryObject", "RootObject"]
    );

    let without_self: Vec<String> = catalog
        .upstream_class_hierarchy("Board", false)
        .expect("chain")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(
        without_self,
        vec!["GenericBoard", "InventoryObject", "RootObject"]
    );
}

#[test]
fn test_rename_invalidates_hierarchy_cache() {
    let catalog = catalog();
    seed_base(&catalog);
    seed_devices(&catalog);

    // Prime the upstream cache, then rename a class in the chain.
    catalog.upstream_class_hierarchy("Board", true).expect("prime");
    let board_id = catalog.class("GenericBoard").expect("class").id;
    let update = taxograph::ClassUpdate {
        name: Some("GenericModule".into()),
        ..Default::default()
    };
    catalog.set_class_properties(board_id, &update).expect("rename");

    let chain: Vec<String> = catalog
        .upstream_class_hierarchy("Board", true)
        .expect("chain")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(
        chain,
        vec!["Board", "GenericModule", "InventoryObject", "RootObject"]
    );
}

#[test]
fn test_cache_stats_track_hits_and_misses() {
    let catalog = catalog();
    seed_base(&catalog);
    seed_devices(&catalog);
    catalog.cache().clear_derived();

    catalog.subclasses("InventoryObject", true, false).expect("miss");
    let after_miss = catalog.cache().stats();
    assert!(after_miss.misses >= 1);

    catalog.subclasses("InventoryObject", true, false).expect("hit");
    let after_hit = catalog.cache().stats();
    assert!(after_hit.hits > after_miss.hits);
}
