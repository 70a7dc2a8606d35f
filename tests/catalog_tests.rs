use serde_json::json;
use taxograph::meta::{LABEL_CLASS, LABEL_INSTANCE, REL_INSTANCE_OF, REL_RELATED_TO};
use taxograph::{
    AttributeDefinition, AttributeType, Catalog, CatalogError, ClassDefinition, ClassUpdate,
    GraphStore,
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

    let mut list_root = ClassDefinition::new("GenericObjectList", Some("RootObject"));
    list_root.abstract_class = true;
    list_root.custom = false;
    catalog.create_class(&list_root).expect("list type root");
}

fn add_instance(catalog: &Catalog, class: &str, name: &str, uuid: &str) -> i64 {
    let class_node = catalog
        .store()
        .find_node(LABEL_CLASS, class)
        .expect("lookup")
        .expect("class exists");
    let id = catalog
        .store()
        .add_node(LABEL_INSTANCE, name, json!({ "name": name, "_uuid": uuid }))
        .expect("instance");
    catalog
        .store()
        .add_edge(id, class_node.id, REL_INSTANCE_OF, json!({}))
        .expect("instance_of");
    id
}

#[test]
fn test_create_class_and_read_back() {
    let catalog = catalog();
    seed_base(&catalog);
    let mut def = ClassDefinition::new("Router", Some("InventoryObject"));
    def.display_name = "Router".into();
    let id = catalog.create_class(&def).expect("create");

    let by_name = catalog.class("Router").expect("by name");
    assert_eq!(by_name.id, id);
    assert_eq!(by_name.parent_class_name.as_deref(), Some("InventoryObject"));
    assert!(by_name.custom);

    let by_id = catalog.class(id).expect("by id");
    assert_eq!(by_id.name, "Router");
}

#[test]
fn test_create_class_rejects_duplicates_and_bad_names() {
    let catalog = catalog();
    seed_base(&catalog);
    catalog
        .create_class(&ClassDefinition::new("Router", Some("InventoryObject")))
        .expect("first");

    let dup = catalog.create_class(&ClassDefinition::new("Router", Some("InventoryObject")));
    assert!(matches!(dup, Err(CatalogError::InvalidArgument(_))));

    let empty = catalog.create_class(&ClassDefinition::new("", Some("InventoryObject")));
    assert!(matches!(empty, Err(CatalogError::InvalidArgument(_))));

    let spaced = catalog.create_class(&ClassDefinition::new("My Router", Some("InventoryObject")));
    assert!(matches!(spaced, Err(CatalogError::InvalidArgument(_))));
}

#[test]
fn test_only_root_object_may_lack_a_parent() {
    let catalog = catalog();
    let orphan = catalog.create_class(&ClassDefinition::new("Router", None));
    assert!(matches!(orphan, Err(CatalogError::NotFound(_))));

    let missing_parent = catalog.create_class(&ClassDefinition::new("Router", Some("NoSuchClass")));
    assert!(matches!(missing_parent, Err(CatalogError::NotFound(_))));
}

#[test]
fn test_copy_down_inheritance_skips_redefined_attributes() {
    let catalog = catalog();
    seed_base(&catalog);

    let mut parent = ClassDefinition::new("GenericDevice", Some("InventoryObject"));
    parent
        .attributes
        .push(AttributeDefinition::new("serialNumber", AttributeType::String));
    catalog.create_class(&parent).expect("parent");

    let mut child = ClassDefinition::new("Router", Some("GenericDevice"));
    let mut redefined = AttributeDefinition::new("serialNumber", AttributeType::String);
    redefined.description = "redefined locally".into();
    child.attributes.push(redefined);
    catalog.create_class(&child).expect("child");

    let router = catalog.class("Router").expect("router");
    // name and creationDate copied from the lineage, serialNumber kept local.
    assert!(router.attribute("name").is_some());
    assert!(router.attribute("creationDate").is_some());
    let serial = router.attribute("serialNumber").expect("serialNumber");
    assert_eq!(serial.description, "redefined locally");
    assert_eq!(
        router
            .attributes
            .iter()
            .filter(|a| a.name == "serialNumber")
            .count(),
        1
    );
}

#[test]
fn test_parent_attribute_changes_do_not_reach_existing_children() {
    let catalog = catalog();
    seed_base(&catalog);
    catalog
        .create_class(&ClassDefinition::new("GenericDevice", Some("InventoryObject")))
        .expect("parent");
    catalog
        .create_class(&ClassDefinition::new("Router", Some("GenericDevice")))
        .expect("child");

    catalog
        .create_attribute(
            "GenericDevice",
            &AttributeDefinition::new("vendor", AttributeType::String),
            false,
        )
        .expect("attribute on parent only");

    assert!(catalog.has_attribute("GenericDevice", "vendor").expect("parent"));
    assert!(!catalog.has_attribute("Router", "vendor").expect("child"));
}

#[test]
fn test_set_class_properties_renames_and_accumulates_changes() {
    let catalog = catalog();
    seed_base(&catalog);
    let id = catalog
        .create_class(&ClassDefinition::new("Router", Some("InventoryObject")))
        .expect("create");

    let update = ClassUpdate {
        name: Some("CoreRouter".into()),
        display_name: Some("Core router".into()),
        color: Some(0xff0000),
        ..Default::default()
    };
    let change = catalog.set_class_properties(id, &update).expect("update");
    assert_eq!(change.affected_properties, vec!["name", "displayName", "color"]);
    assert_eq!(change.old_values[0], "Router");
    assert_eq!(change.new_values[0], "CoreRouter");

    assert!(matches!(
        catalog.class("Router"),
        Err(CatalogError::NotFound(_))
    ));
    let renamed = catalog.class("CoreRouter").expect("renamed");
    assert_eq!(renamed.display_name, "Core router");
    assert_eq!(renamed.color, 0xff0000);
}

#[test]
fn test_set_class_properties_rejects_duplicate_new_name() {
    let catalog = catalog();
    seed_base(&catalog);
    catalog
        .create_class(&ClassDefinition::new("Router", Some("InventoryObject")))
        .expect("router");
    let id = catalog
        .create_class(&ClassDefinition::new("Switch", Some("InventoryObject")))
        .expect("switch");

    let update = ClassUpdate {
        name: Some("Router".into()),
        ..Default::default()
    };
    let result = catalog.set_class_properties(id, &update);
    assert!(matches!(result, Err(CatalogError::InvalidArgument(_))));
    // The rejected rename must not stick.
    assert!(catalog.class("Switch").is_ok());
}

#[test]
fn test_delete_class_guards() {
    let catalog = catalog();
    seed_base(&catalog);

    // Non-custom classes are protected.
    let core = catalog.delete_class("InventoryObject");
    assert!(matches!(core, Err(CatalogError::InvalidArgument(_))));

    // A class with instances is protected.
    catalog
        .create_class(&ClassDefinition::new("Router", Some("InventoryObject")))
        .expect("router");
    add_instance(&catalog, "Router", "R1", "uuid-r1");
    let with_instances = catalog.delete_class("Router");
    assert!(matches!(with_instances, Err(CatalogError::InvalidArgument(_))));

    // A class with subclasses is protected.
    catalog
        .create_class(&ClassDefinition::new("GenericDevice", Some("InventoryObject")))
        .expect("parent");
    catalog
        .create_class(&ClassDefinition::new("Switch", Some("GenericDevice")))
        .expect("child");
    let with_subclasses = catalog.delete_class("GenericDevice");
    assert!(matches!(with_subclasses, Err(CatalogError::InvalidArgument(_))));

    // Deletable once the subclass is gone.
    catalog.delete_class("Switch").expect("delete leaf");
    catalog.delete_class("GenericDevice").expect("delete parent");
    assert!(matches!(
        catalog.class("GenericDevice"),
        Err(CatalogError::NotFound(_))
    ));
}

#[test]
fn test_delete_list_type_still_referenced_fails() {
    let catalog = catalog();
    seed_base(&catalog);
    catalog
        .create_class(&ClassDefinition::new("EquipmentModel", Some("GenericObjectList")))
        .expect("list type");
    let mut router = ClassDefinition::new("Router", Some("InventoryObject"));
    router.attributes.push(AttributeDefinition::new(
        "model",
        AttributeType::ListOf("EquipmentModel".into()),
    ));
    catalog.create_class(&router).expect("router");

    let referenced = catalog.delete_class("EquipmentModel");
    assert!(matches!(referenced, Err(CatalogError::InvalidArgument(_))));

    catalog.delete_attribute("Router", "model").expect("drop attribute");
    catalog.delete_class("EquipmentModel").expect("now deletable");
}

#[test]
fn test_delete_class_removes_owned_attribute_nodes() {
    let catalog = catalog();
    seed_base(&catalog);
    let mut def = ClassDefinition::new("Router", Some("InventoryObject"));
    def.attributes
        .push(AttributeDefinition::new("ipAddress", AttributeType::String));
    catalog.create_class(&def).expect("router");

    let attributes_before = catalog
        .store()
        .nodes_with_kind("attributes")
        .expect("attribute nodes")
        .len();
    catalog.delete_class("Router").expect("delete");
    let attributes_after = catalog
        .store()
        .nodes_with_kind("attributes")
        .expect("attribute nodes")
        .len();
    assert!(attributes_after < attributes_before);
}

#[test]
fn test_all_classes_lists_business_and_list_types() {
    let catalog = catalog();
    seed_base(&catalog);
    catalog
        .create_class(&ClassDefinition::new("Router", Some("InventoryObject")))
        .expect("router");
    catalog
        .create_class(&ClassDefinition::new("EquipmentModel", Some("GenericObjectList")))
        .expect("list type");

    let business_only: Vec<String> = catalog
        .all_classes(false)
        .expect("business")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(business_only, vec!["InventoryObject", "Router"]);

    let with_list_types: Vec<String> = catalog
        .all_classes(true)
        .expect("all")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(
        with_list_types,
        vec![
            "InventoryObject",
            "Router",
            "GenericObjectList",
            "EquipmentModel"
        ]
    );
}

#[test]
fn test_failed_mutation_leaves_store_untouched() {
    let catalog = catalog();
    seed_base(&catalog);
    let classes_before = catalog
        .store()
        .nodes_with_kind(LABEL_CLASS)
        .expect("classes")
        .len();

    let mut bad = ClassDefinition::new("Router", Some("InventoryObject"));
    bad.attributes
        .push(AttributeDefinition::new("bad name", AttributeType::String));
    assert!(catalog.create_class(&bad).is_err());

    let classes_after = catalog
        .store()
        .nodes_with_kind(LABEL_CLASS)
        .expect("classes")
        .len();
    assert_eq!(classes_before, classes_after);
}

#[test]
fn test_instance_list_type_relations_visible_from_store() {
    let catalog = catalog();
    seed_base(&catalog);
    catalog
        .create_class(&ClassDefinition::new("Router", Some("InventoryObject")))
        .expect("router");
    let instance = add_instance(&catalog, "Router", "R1", "uuid-r1");
    catalog
        .create_class(&ClassDefinition::new("EquipmentModel", Some("GenericObjectList")))
        .expect("list type");
    let model = add_instance(&catalog, "EquipmentModel", "MX240", "uuid-m1");
    catalog
        .store()
        .add_edge(instance, model, REL_RELATED_TO, json!({ "name": "model" }))
        .expect("relation");

    let related = catalog
        .store()
        .neighbors(instance, REL_RELATED_TO, taxograph::Direction::Outgoing)
        .expect("related");
    assert_eq!(related, vec![model]);
}
