//! Metadata catalog: class taxonomy, attribute definitions, containment
//! permissions and the read-through cache projecting all of it.

pub mod cache;
pub mod catalog;
mod containment;
mod types;

pub use cache::MetadataCache;
pub use catalog::Catalog;
pub use types::{
    AttributeDefinition, AttributeType, AttributeUpdate, ChangeDescriptor, ClassDefinition,
    ClassInfo, ClassRef, ClassUpdate,
};

/// The only class allowed to have no parent.
pub const CLASS_ROOT: &str = "RootObject";
/// Root of the business hierarchy; containment is permitted only among its
/// descendants.
pub const CLASS_INVENTORY_OBJECT: &str = "InventoryObject";
/// Root of the list-type hierarchy; its descendants are usable as attribute
/// list types.
pub const CLASS_GENERIC_OBJECT_LIST: &str = "GenericObjectList";
/// Special node standing in for "no parent" in the containment hierarchy.
pub const NODE_DUMMY_ROOT: &str = "DummyRoot";

pub const LABEL_CLASS: &str = "classes";
pub const LABEL_ATTRIBUTE: &str = "attributes";
pub const LABEL_SPECIAL_NODE: &str = "specialNodes";
pub const LABEL_INSTANCE: &str = "inventoryObjects";

pub const REL_EXTENDS: &str = "EXTENDS";
pub const REL_HAS_ATTRIBUTE: &str = "HAS_ATTRIBUTE";
pub const REL_INSTANCE_OF: &str = "INSTANCE_OF";
pub const REL_POSSIBLE_CHILD: &str = "POSSIBLE_CHILD";
pub const REL_POSSIBLE_SPECIAL_CHILD: &str = "POSSIBLE_SPECIAL_CHILD";
pub const REL_RELATED_TO: &str = "RELATED_TO";
pub const REL_CHILD_OF: &str = "CHILD_OF";
pub const REL_CHILD_OF_SPECIAL: &str = "CHILD_OF_SPECIAL";
pub const REL_HAS_REPORT: &str = "HAS_REPORT";
pub const REL_HAS_TEMPLATE: &str = "HAS_TEMPLATE";

/// Instance identity property; a query result row missing it aborts the
/// whole query.
pub const PROP_UUID: &str = "_uuid";
pub const PROP_NAME: &str = "name";
pub const PROP_CREATION_DATE: &str = "creationDate";

/// Pseudo-attribute resolving to the node's internal id in queries.
pub const PSEUDO_ATTRIBUTE_ID: &str = "id";
