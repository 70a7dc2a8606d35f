use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;
use serde_json::{json, Value as Json};

use crate::errors::CatalogError;
use crate::store::{Direction, GraphNode, GraphStore};

use super::cache::MetadataCache;
use super::types::{
    AttributeDefinition, AttributeType, AttributeUpdate, ChangeDescriptor, ClassDefinition,
    ClassInfo, ClassRef, ClassUpdate,
};
use super::{
    CLASS_GENERIC_OBJECT_LIST, CLASS_INVENTORY_OBJECT, CLASS_ROOT, LABEL_ATTRIBUTE, LABEL_CLASS,
    LABEL_SPECIAL_NODE, NODE_DUMMY_ROOT, PROP_CREATION_DATE, PROP_NAME, REL_EXTENDS,
    REL_HAS_ATTRIBUTE, REL_HAS_REPORT, REL_HAS_TEMPLATE, REL_INSTANCE_OF, REL_POSSIBLE_CHILD,
    REL_POSSIBLE_SPECIAL_CHILD, REL_RELATED_TO,
};

/// Metadata catalog: class and attribute lifecycle, inheritance propagation
/// and hierarchy queries over the graph store, with a read-through cache.
///
/// Mutations run inside a scoped store transaction; the cache is touched only
/// after the transaction commits. Callers must serialize structural writes.
pub struct Catalog {
    store: GraphStore,
    cache: Arc<MetadataCache>,
}

impl Catalog {
    pub fn new(store: GraphStore) -> Result<Self, CatalogError> {
        Self::with_cache(store, Arc::new(MetadataCache::new()))
    }

    /// Builds a catalog around an externally owned cache, bootstrapping the
    /// containment-root sentinel node when absent. The cache may carry state
    /// from a previous owner and is reset, counters included, before priming.
    pub fn with_cache(store: GraphStore, cache: Arc<MetadataCache>) -> Result<Self, CatalogError> {
        let catalog = Self { store, cache };
        catalog.store.scoped(|s| {
            if s.find_node(LABEL_SPECIAL_NODE, NODE_DUMMY_ROOT)?.is_none() {
                s.add_node(LABEL_SPECIAL_NODE, NODE_DUMMY_ROOT, json!({}))?;
            }
            Ok(())
        })?;
        catalog.cache.clear_all();
        if let Err(err) = catalog.rebuild_cache() {
            warn!("could not prime the metadata cache: {err}");
        }
        Ok(catalog)
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    // ------------------------------------------------------------------
    // Class lifecycle
    // ------------------------------------------------------------------

    /// Creates a class, materializing a copy of every inherited attribute the
    /// definition does not redefine. Returns the new class id.
    pub fn create_class(&self, def: &ClassDefinition) -> Result<i64, CatalogError> {
        validate_class_name(&def.name)?;
        let id = self.store.scoped(|store| {
            if store.find_node(LABEL_CLASS, &def.name)?.is_some() {
                return Err(CatalogError::invalid_argument(format!(
                    "class {} already exists",
                    def.name
                )));
            }
            let class_id = store.add_node(LABEL_CLASS, &def.name, class_payload(def))?;

            for attribute in &def.attributes {
                validate_attribute_name(&attribute.name)?;
                self.write_attribute_node(class_id, attribute)?;
            }

            match &def.parent_class_name {
                None => {
                    if def.name != CLASS_ROOT {
                        return Err(CatalogError::not_found(format!(
                            "only {CLASS_ROOT} can be the root of the class hierarchy"
                        )));
                    }
                }
                Some(parent_name) => {
                    let parent = store.find_node(LABEL_CLASS, parent_name)?.ok_or_else(|| {
                        CatalogError::not_found(format!("can not find parent class {parent_name}"))
                    })?;
                    store.add_edge(class_id, parent.id, REL_EXTENDS, json!({}))?;
                    // Copy-down inheritance: one-time materialization. Later
                    // changes to the parent's attributes do not retroactively
                    // reach this class.
                    for attr_id in
                        store.neighbors(parent.id, REL_HAS_ATTRIBUTE, Direction::Outgoing)?
                    {
                        let attr_node = store.node(attr_id)?;
                        if def.attributes.iter().any(|a| a.name == attr_node.name) {
                            continue;
                        }
                        let inherited = attribute_from_node(&attr_node);
                        self.write_attribute_node(class_id, &inherited)?;
                    }
                }
            }
            Ok(class_id)
        })?;
        self.rebuild_cache()?;
        Ok(id)
    }

    /// Looks up a full class definition, cache-first when addressed by name.
    pub fn class(&self, r: impl Into<ClassRef>) -> Result<ClassDefinition, CatalogError> {
        let r = r.into();
        if let ClassRef::Name(name) = &r {
            if let Some(cached) = self.cache.class(name) {
                return Ok(cached);
            }
        }
        let node = self.class_node(&r)?;
        let def = self.class_from_node(&node)?;
        self.cache.put_class(def.clone());
        Ok(def)
    }

    /// Every business class, plus every list type when requested, roots
    /// first and the rest sorted by name.
    pub fn all_classes(&self, include_list_types: bool) -> Result<Vec<ClassInfo>, CatalogError> {
        let mut roots = vec![CLASS_INVENTORY_OBJECT];
        if include_list_types {
            roots.push(CLASS_GENERIC_OBJECT_LIST);
        }
        let mut result = Vec::new();
        for root in roots {
            let node = self.store.find_node(LABEL_CLASS, root)?.ok_or_else(|| {
                CatalogError::not_found(format!("class {root} could not be found"))
            })?;
            result.push(info_from_node(&node));
            let mut descendants = Vec::new();
            for id in self.store.bfs(node.id, REL_EXTENDS, Direction::Incoming)? {
                if id == node.id {
                    continue;
                }
                descendants.push(info_from_node(&self.store.node(id)?));
            }
            descendants.sort_by(|a, b| a.name.cmp(&b.name));
            result.extend(descendants);
        }
        Ok(result)
    }

    /// Applies every present field of the update, delegating attribute
    /// entries to the attribute setter, and reports all applied changes.
    pub fn set_class_properties(
        &self,
        class_id: i64,
        update: &ClassUpdate,
    ) -> Result<ChangeDescriptor, CatalogError> {
        let mut change = ChangeDescriptor::default();
        let class_name = self.store.scoped(|store| {
            let node = store
                .find_node_by_id(LABEL_CLASS, class_id)?
                .ok_or_else(|| {
                    CatalogError::not_found(format!("the class with id {class_id} could not be found"))
                })?;
            let mut data = node.data.clone();

            if let Some(new_name) = &update.name {
                validate_class_name(new_name)?;
                if store.find_node(LABEL_CLASS, new_name)?.is_some() {
                    return Err(CatalogError::invalid_argument(format!(
                        "class {new_name} already exists"
                    )));
                }
                change.record(PROP_NAME, &node.name, new_name);
                store.set_node_name(node.id, new_name)?;
            }
            if let Some(display_name) = &update.display_name {
                change.record("displayName", data["displayName"].as_str().unwrap_or(""), display_name);
                data["displayName"] = json!(display_name);
            }
            if let Some(description) = &update.description {
                change.record("description", data["description"].as_str().unwrap_or(""), description);
                data["description"] = json!(description);
            }
            if let Some(icon) = &update.icon {
                change.record("icon", "", "");
                data["icon"] = json!(icon);
            }
            if let Some(small_icon) = &update.small_icon {
                change.record("smallIcon", "", "");
                data["smallIcon"] = json!(small_icon);
            }
            if let Some(color) = update.color {
                change.record("color", data["color"].as_i64().unwrap_or(0), color);
                data["color"] = json!(color);
            }
            if let Some(countable) = update.countable {
                change.record("countable", data["countable"].as_bool().unwrap_or(true), countable);
                data["countable"] = json!(countable);
            }
            if let Some(abstract_class) = update.abstract_class {
                change.record("abstract", data["abstract"].as_bool().unwrap_or(false), abstract_class);
                data["abstract"] = json!(abstract_class);
            }
            if let Some(in_design) = update.in_design {
                change.record("inDesign", data["inDesign"].as_bool().unwrap_or(false), in_design);
                data["inDesign"] = json!(in_design);
            }
            if let Some(custom) = update.custom {
                change.record("custom", data["custom"].as_bool().unwrap_or(true), custom);
                data["custom"] = json!(custom);
            }
            store.set_node_data(node.id, &data)?;

            for attribute_update in &update.attributes {
                let attr_node = self.attribute_node_by_id(node.id, attribute_update.id)?;
                let nested = self.apply_attribute_update(&node, &attr_node, attribute_update)?;
                change.merge(nested);
            }
            Ok(update.name.clone().unwrap_or(node.name))
        })?;
        self.rebuild_cache()?;
        change.notes = format!("Set class properties and/or attributes for class {class_name}");
        Ok(change)
    }

    /// Deletes a class. Only custom classes without instances or subclasses
    /// can go; a list type still referenced by any attribute cannot.
    pub fn delete_class(&self, r: impl Into<ClassRef>) -> Result<(), CatalogError> {
        let r = r.into();
        self.store.scoped(|store| {
            let node = self.class_node(&r)?;
            if !node.property_bool("custom") {
                return Err(CatalogError::invalid_argument(
                    "core classes can not be deleted",
                ));
            }
            if store.has_edges(node.id, REL_INSTANCE_OF, Direction::Incoming)? {
                return Err(CatalogError::invalid_argument(format!(
                    "class {} has instances and can not be deleted",
                    node.name
                )));
            }
            if store.has_edges(node.id, REL_EXTENDS, Direction::Incoming)? {
                return Err(CatalogError::invalid_argument(format!(
                    "class {} has subclasses and can not be deleted",
                    node.name
                )));
            }
            if self.is_subclass_of(CLASS_GENERIC_OBJECT_LIST, &node.name)? {
                for class_node in store.nodes_with_kind(LABEL_CLASS)? {
                    for attr_id in
                        store.neighbors(class_node.id, REL_HAS_ATTRIBUTE, Direction::Outgoing)?
                    {
                        let attr_node = store.node(attr_id)?;
                        if attr_node.property_string("type") == node.name {
                            return Err(CatalogError::invalid_argument(format!(
                                "{} is a list type and at least one attribute ({}) of class {} is using it",
                                node.name, attr_node.name, class_node.name
                            )));
                        }
                    }
                }
            }
            // Attribute and report nodes are owned by the class.
            for rel in [REL_HAS_ATTRIBUTE, REL_HAS_REPORT] {
                for owned in store.neighbors(node.id, rel, Direction::Outgoing)? {
                    store.delete_node(owned)?;
                }
            }
            for template in store.neighbors(node.id, REL_HAS_TEMPLATE, Direction::Outgoing)? {
                store.delete_node(template)?;
            }
            store.delete_node(node.id)
        })?;
        self.rebuild_cache()
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Creates an attribute on the class. With `recursive` set, the attribute
    /// is also materialized on every subclass, and a same-named attribute
    /// anywhere in the family is rejected.
    pub fn create_attribute(
        &self,
        r: impl Into<ClassRef>,
        def: &AttributeDefinition,
        recursive: bool,
    ) -> Result<(), CatalogError> {
        validate_attribute_name(&def.name)?;
        let r = r.into();
        self.store.scoped(|store| {
            let class_node = self.class_node(&r)?;
            let members = if recursive {
                store.bfs(class_node.id, REL_EXTENDS, Direction::Incoming)?
            } else {
                vec![class_node.id]
            };
            for member in members {
                let member_node = store.node(member)?;
                let exists = store
                    .neighbors(member, REL_HAS_ATTRIBUTE, Direction::Outgoing)?
                    .into_iter()
                    .map(|id| store.node(id))
                    .collect::<Result<Vec<_>, _>>()?
                    .into_iter()
                    .any(|attr| attr.name == def.name);
                if exists {
                    return Err(CatalogError::invalid_argument(format!(
                        "class {} already has an attribute named {}",
                        member_node.name, def.name
                    )));
                }
                self.write_attribute_node(member, def)?;
            }
            Ok(())
        })?;
        self.rebuild_cache()
    }

    pub fn has_attribute(&self, r: impl Into<ClassRef>, name: &str) -> Result<bool, CatalogError> {
        let node = self.class_node(&r.into())?;
        for attr_id in self
            .store
            .neighbors(node.id, REL_HAS_ATTRIBUTE, Direction::Outgoing)?
        {
            if self.store.node(attr_id)?.name == name {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn attribute(
        &self,
        r: impl Into<ClassRef>,
        name: &str,
    ) -> Result<AttributeDefinition, CatalogError> {
        let node = self.class_node(&r.into())?;
        for attr_id in self
            .store
            .neighbors(node.id, REL_HAS_ATTRIBUTE, Direction::Outgoing)?
        {
            let attr_node = self.store.node(attr_id)?;
            if attr_node.name == name {
                return Ok(attribute_from_node(&attr_node));
            }
        }
        Err(CatalogError::not_found(format!(
            "attribute {name} does not exist in class {}",
            node.name
        )))
    }

    pub fn mandatory_attributes(
        &self,
        r: impl Into<ClassRef>,
    ) -> Result<Vec<AttributeDefinition>, CatalogError> {
        let node = self.class_node(&r.into())?;
        let def = self.class_from_node(&node)?;
        Ok(def.attributes.into_iter().filter(|a| a.mandatory).collect())
    }

    /// Applies every present field of the update to the attribute addressed
    /// by id, enforcing the protected-attribute and constraint rules.
    pub fn set_attribute_properties(
        &self,
        r: impl Into<ClassRef>,
        update: &AttributeUpdate,
    ) -> Result<ChangeDescriptor, CatalogError> {
        let r = r.into();
        let mut change = self.store.scoped(|_| {
            let class_node = self.class_node(&r)?;
            let attr_node = self.attribute_node_by_id(class_node.id, update.id)?;
            self.apply_attribute_update(&class_node, &attr_node, update)
        })?;
        self.rebuild_cache()?;
        let class_name = match r {
            ClassRef::Name(name) => name,
            ClassRef::Id(id) => self.class(id)?.name,
        };
        change.notes = format!("Update attribute properties of class {class_name}");
        Ok(change)
    }

    /// Deletes the attribute from the class and the materialized copies on
    /// every subclass carrying the same name. `name` and `creationDate` are
    /// protected.
    pub fn delete_attribute(
        &self,
        r: impl Into<ClassRef>,
        attribute_name: &str,
    ) -> Result<(), CatalogError> {
        if attribute_name == PROP_NAME || attribute_name == PROP_CREATION_DATE {
            return Err(CatalogError::invalid_argument(format!(
                "attribute {attribute_name} can not be deleted"
            )));
        }
        let r = r.into();
        self.store.scoped(|store| {
            let class_node = self.class_node(&r)?;
            let mut found_on_class = false;
            for member in store.bfs(class_node.id, REL_EXTENDS, Direction::Incoming)? {
                for attr_id in store.neighbors(member, REL_HAS_ATTRIBUTE, Direction::Outgoing)? {
                    let attr_node = store.node(attr_id)?;
                    if attr_node.name == attribute_name {
                        if member == class_node.id {
                            found_on_class = true;
                        }
                        store.delete_node(attr_id)?;
                    }
                }
            }
            if !found_on_class {
                return Err(CatalogError::not_found(format!(
                    "can not find an attribute with name {attribute_name} in class {}",
                    class_node.name
                )));
            }
            Ok(())
        })?;
        self.rebuild_cache()
    }

    // ------------------------------------------------------------------
    // Hierarchy queries
    // ------------------------------------------------------------------

    /// True when `candidate` is `ancestor` or transitively extends it.
    /// Terminates because the hierarchy is acyclic by construction.
    pub fn is_subclass_of(&self, ancestor: &str, candidate: &str) -> Result<bool, CatalogError> {
        if candidate == ancestor {
            return Ok(true);
        }
        let class = self.class(candidate)?;
        match class.parent_class_name {
            None => Ok(false),
            Some(parent) if parent == ancestor => Ok(true),
            Some(parent) => self.is_subclass_of(ancestor, &parent),
        }
    }

    /// All transitive subclasses, cache-first. `include_abstract` and
    /// `include_self` filter identically on hit and miss paths.
    pub fn subclasses(
        &self,
        class_name: &str,
        include_abstract: bool,
        include_self: bool,
    ) -> Result<Vec<ClassInfo>, CatalogError> {
        let class = self.class(class_name)?;
        let all = match self.cache.subclasses(class_name) {
            Some(cached) => cached,
            None => {
                let node = self.class_node(&ClassRef::Name(class_name.to_string()))?;
                let mut found = Vec::new();
                for id in self.store.bfs(node.id, REL_EXTENDS, Direction::Incoming)? {
                    if id == node.id {
                        continue;
                    }
                    found.push(info_from_node(&self.store.node(id)?));
                }
                found.sort_by(|a, b| a.name.cmp(&b.name));
                self.cache.put_subclasses(class_name, found.clone());
                found
            }
        };
        Ok(filter_subclasses(all, &class, include_abstract, include_self))
    }

    /// Direct subclasses only, cache-first, same filtering as `subclasses`.
    pub fn subclasses_direct(
        &self,
        class_name: &str,
        include_abstract: bool,
        include_self: bool,
    ) -> Result<Vec<ClassInfo>, CatalogError> {
        let class = self.class(class_name)?;
        let all = match self.cache.subclasses_direct(class_name) {
            Some(cached) => cached,
            None => {
                let node = self.class_node(&ClassRef::Name(class_name.to_string()))?;
                let mut found = Vec::new();
                for id in self.store.neighbors(node.id, REL_EXTENDS, Direction::Incoming)? {
                    found.push(info_from_node(&self.store.node(id)?));
                }
                found.sort_by(|a, b| a.name.cmp(&b.name));
                self.cache.put_subclasses_direct(class_name, found.clone());
                found
            }
        };
        Ok(filter_subclasses(all, &class, include_abstract, include_self))
    }

    /// Ancestor chain from the class to the catalog root, self first,
    /// cache-first. The chain is unique because each class has one parent.
    pub fn upstream_class_hierarchy(
        &self,
        class_name: &str,
        include_self: bool,
    ) -> Result<Vec<ClassInfo>, CatalogError> {
        self.class(class_name)?;
        let chain = match self.cache.upstream(class_name) {
            Some(cached) => cached,
            None => {
                let mut chain = Vec::new();
                let mut node = self.class_node(&ClassRef::Name(class_name.to_string()))?;
                chain.push(info_from_node(&node));
                loop {
                    let parents = self.store.neighbors(node.id, REL_EXTENDS, Direction::Outgoing)?;
                    match parents.first() {
                        Some(&parent_id) => {
                            node = self.store.node(parent_id)?;
                            chain.push(info_from_node(&node));
                        }
                        None => break,
                    }
                }
                self.cache.put_upstream(class_name, chain.clone());
                chain
            }
        };
        if include_self {
            Ok(chain)
        } else {
            Ok(chain.into_iter().skip(1).collect())
        }
    }

    // ------------------------------------------------------------------
    // Cache maintenance
    // ------------------------------------------------------------------

    /// Invalidate-and-rebuild: drops every derived index, re-enumerates all
    /// class nodes, recomputes each class record and its containment
    /// projections, and reloads the unique-attribute value index. Runs after
    /// every structural mutation; O(classes) by design.
    pub fn rebuild_cache(&self) -> Result<(), CatalogError> {
        self.cache.clear_derived();
        for class_node in self.store.nodes_with_kind(LABEL_CLASS)? {
            let def = self.class_from_node(&class_node)?;
            self.cache.put_class(def);
            let children = self.effective_children(&class_node, REL_POSSIBLE_CHILD)?;
            self.cache.put_possible_children(
                &class_node.name,
                children.into_iter().map(|c| c.name).collect(),
            );
            let special = self.effective_children(&class_node, REL_POSSIBLE_SPECIAL_CHILD)?;
            self.cache.put_possible_special_children(
                &class_node.name,
                special.into_iter().map(|c| c.name).collect(),
            );
        }
        // The dummy root's projections are cached on demand.
        self.load_unique_values_cache()
    }

    fn load_unique_values_cache(&self) -> Result<(), CatalogError> {
        let root = match self.store.find_node(LABEL_CLASS, CLASS_INVENTORY_OBJECT)? {
            Some(node) => node,
            None => return Ok(()),
        };
        for member in self.store.bfs(root.id, REL_EXTENDS, Direction::Incoming)? {
            let member_node = self.store.node(member)?;
            let def = self.class_from_node(&member_node)?;
            for attribute in def.attributes.iter().filter(|a| a.unique) {
                let mut values = Vec::new();
                for instance in self.instances_of(member)? {
                    if instance.has_property(&attribute.name) {
                        values.push(instance.property_string(&attribute.name));
                    }
                }
                self.cache
                    .put_unique_values(&member_node.name, &attribute.name, values);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    pub(crate) fn class_node(&self, r: &ClassRef) -> Result<GraphNode, CatalogError> {
        let found = match r {
            ClassRef::Id(id) => self.store.find_node_by_id(LABEL_CLASS, *id)?,
            ClassRef::Name(name) => self.store.find_node(LABEL_CLASS, name)?,
        };
        found.ok_or_else(|| CatalogError::not_found(format!("{r} could not be found")))
    }

    pub(crate) fn class_from_node(&self, node: &GraphNode) -> Result<ClassDefinition, CatalogError> {
        let parent_class_name = self
            .store
            .neighbors(node.id, REL_EXTENDS, Direction::Outgoing)?
            .first()
            .map(|&id| self.store.node(id))
            .transpose()?
            .map(|parent| parent.name);
        let mut attributes = Vec::new();
        for attr_id in self
            .store
            .neighbors(node.id, REL_HAS_ATTRIBUTE, Direction::Outgoing)?
        {
            attributes.push(attribute_from_node(&self.store.node(attr_id)?));
        }
        attributes.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(ClassDefinition {
            id: node.id,
            name: node.name.clone(),
            display_name: node.property_string("displayName"),
            description: node.property_string("description"),
            color: node.property_i64("color"),
            icon: bytes_from_json(node.data.get("icon")),
            small_icon: bytes_from_json(node.data.get("smallIcon")),
            abstract_class: node.property_bool("abstract"),
            custom: node.property_bool("custom"),
            countable: node.property_bool("countable"),
            in_design: node.property_bool("inDesign"),
            creation_date: node.property_i64(PROP_CREATION_DATE),
            parent_class_name,
            attributes,
        })
    }

    fn write_attribute_node(
        &self,
        class_id: i64,
        def: &AttributeDefinition,
    ) -> Result<i64, CatalogError> {
        let attr_id = self.store.add_node(
            LABEL_ATTRIBUTE,
            &def.name,
            json!({
                "displayName": def.display_name,
                "description": def.description,
                "type": def.attribute_type.to_string(),
                "readOnly": def.read_only,
                "isVisible": def.visible,
                "administrative": def.administrative,
                "noCopy": def.no_copy,
                "unique": def.unique,
                "mandatory": def.mandatory,
                "multiple": def.multiple,
                "order": def.order,
                PROP_CREATION_DATE: now_millis(),
            }),
        )?;
        self.store
            .add_edge(class_id, attr_id, REL_HAS_ATTRIBUTE, json!({}))?;
        Ok(attr_id)
    }

    fn attribute_node_by_id(
        &self,
        class_id: i64,
        attribute_id: i64,
    ) -> Result<GraphNode, CatalogError> {
        for attr_id in self
            .store
            .neighbors(class_id, REL_HAS_ATTRIBUTE, Direction::Outgoing)?
        {
            if attr_id == attribute_id {
                return self.store.node(attr_id);
            }
        }
        Err(CatalogError::not_found(format!(
            "can not find attribute with id {attribute_id}"
        )))
    }

    fn apply_attribute_update(
        &self,
        class_node: &GraphNode,
        attr_node: &GraphNode,
        update: &AttributeUpdate,
    ) -> Result<ChangeDescriptor, CatalogError> {
        let current_name = attr_node.name.clone();
        if current_name == PROP_CREATION_DATE {
            return Err(CatalogError::invalid_argument(
                "attribute \"creationDate\" can not be modified",
            ));
        }
        let current_type = AttributeType::parse(&attr_node.property_string("type"));
        let mut change = ChangeDescriptor::default();
        let mut data = attr_node.data.clone();

        if let Some(new_name) = &update.name {
            if current_name == PROP_NAME {
                return Err(CatalogError::invalid_argument(
                    "attribute \"name\" can not be renamed",
                ));
            }
            validate_attribute_name(new_name)?;
            self.store.set_node_name(attr_node.id, new_name)?;
            change.record(PROP_NAME, &current_name, new_name);
        }
        if let Some(description) = &update.description {
            change.record("description", data["description"].as_str().unwrap_or(""), description);
            data["description"] = json!(description);
        }
        if let Some(display_name) = &update.display_name {
            change.record("displayName", data["displayName"].as_str().unwrap_or(""), display_name);
            data["displayName"] = json!(display_name);
        }
        if let Some(new_type) = &update.attribute_type {
            if current_name == PROP_NAME {
                return Err(CatalogError::invalid_argument(
                    "attribute \"name\" can only be a String",
                ));
            }
            change.record("type", current_type.to_string(), new_type.to_string());
            data["type"] = json!(new_type.to_string());
        }
        if let Some(read_only) = update.read_only {
            change.record("readOnly", data["readOnly"].as_bool().unwrap_or(false), read_only);
            data["readOnly"] = json!(read_only);
        }
        if let Some(visible) = update.visible {
            change.record("isVisible", data["isVisible"].as_bool().unwrap_or(true), visible);
            data["isVisible"] = json!(visible);
        }
        if let Some(administrative) = update.administrative {
            change.record(
                "administrative",
                data["administrative"].as_bool().unwrap_or(false),
                administrative,
            );
            data["administrative"] = json!(administrative);
        }
        if let Some(no_copy) = update.no_copy {
            change.record("noCopy", data["noCopy"].as_bool().unwrap_or(false), no_copy);
            data["noCopy"] = json!(no_copy);
        }
        if let Some(unique) = update.unique {
            if unique {
                let effective_type = update.attribute_type.clone().unwrap_or(current_type.clone());
                if effective_type == AttributeType::Boolean || !effective_type.is_primitive() {
                    return Err(CatalogError::invalid_argument(
                        "Boolean and list type attributes can not be set as unique",
                    ));
                }
                if !self.can_attribute_be_unique(class_node, &current_name)? {
                    return Err(CatalogError::invalid_argument(format!(
                        "there are duplicated values of attribute \"{current_name}\" among the existing instances of class {} or its subclasses",
                        class_node.name
                    )));
                }
            }
            change.record("unique", data["unique"].as_bool().unwrap_or(false), unique);
            data["unique"] = json!(unique);
        }
        if let Some(mandatory) = update.mandatory {
            if mandatory
                && !self.all_instances_have_value(class_node, &current_name, &current_type)?
            {
                return Err(CatalogError::invalid_argument(format!(
                    "before setting it as mandatory, all existing instances of this class must have valid values for attribute {current_name}"
                )));
            }
            change.record("mandatory", data["mandatory"].as_bool().unwrap_or(false), mandatory);
            data["mandatory"] = json!(mandatory);
        }
        if let Some(multiple) = update.multiple {
            let effective_type = update.attribute_type.clone().unwrap_or(current_type);
            if multiple && effective_type.is_primitive() {
                return Err(CatalogError::invalid_argument(
                    "primitive types can not be set as multiple",
                ));
            }
            change.record("multiple", data["multiple"].as_bool().unwrap_or(false), multiple);
            data["multiple"] = json!(multiple);
        }
        if let Some(order) = update.order {
            change.record("order", data["order"].as_i64().unwrap_or(1000), order);
            data["order"] = json!(order);
        }
        self.store.set_node_data(attr_node.id, &data)?;
        Ok(change)
    }

    /// Full-store duplicate scan over the class and its subclasses: the
    /// attribute may become unique only if no value occurs twice.
    fn can_attribute_be_unique(
        &self,
        class_node: &GraphNode,
        attribute_name: &str,
    ) -> Result<bool, CatalogError> {
        let mut seen = ahash::AHashSet::new();
        for member in self.store.bfs(class_node.id, REL_EXTENDS, Direction::Incoming)? {
            for instance in self.instances_of(member)? {
                if instance.has_property(attribute_name)
                    && !seen.insert(instance.property_string(attribute_name))
                {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Full-store completeness scan: every instance of the class and its
    /// subclasses must carry a value for the attribute.
    fn all_instances_have_value(
        &self,
        class_node: &GraphNode,
        attribute_name: &str,
        attribute_type: &AttributeType,
    ) -> Result<bool, CatalogError> {
        for member in self.store.bfs(class_node.id, REL_EXTENDS, Direction::Incoming)? {
            for instance in self.instances_of(member)? {
                let has_value = if attribute_type.is_primitive() {
                    instance.has_property(attribute_name)
                } else {
                    self.store
                        .edges(instance.id, REL_RELATED_TO, Direction::Outgoing)?
                        .iter()
                        .any(|edge| {
                            edge.data.get(PROP_NAME).and_then(Json::as_str)
                                == Some(attribute_name)
                        })
                };
                if !has_value {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    pub(crate) fn instances_of(&self, class_id: i64) -> Result<Vec<GraphNode>, CatalogError> {
        let mut instances = Vec::new();
        for id in self
            .store
            .neighbors(class_id, REL_INSTANCE_OF, Direction::Incoming)?
        {
            instances.push(self.store.node(id)?);
        }
        Ok(instances)
    }
}

fn filter_subclasses(
    all: Vec<ClassInfo>,
    class: &ClassDefinition,
    include_abstract: bool,
    include_self: bool,
) -> Vec<ClassInfo> {
    let mut result: Vec<ClassInfo> = all
        .into_iter()
        .filter(|c| include_abstract || !c.abstract_class)
        .collect();
    if include_self && (include_abstract || !class.abstract_class) {
        result.push(ClassInfo::from(class));
    }
    result
}

pub(crate) fn info_from_node(node: &GraphNode) -> ClassInfo {
    ClassInfo {
        id: node.id,
        name: node.name.clone(),
        display_name: node.property_string("displayName"),
        abstract_class: node.property_bool("abstract"),
        custom: node.property_bool("custom"),
        in_design: node.property_bool("inDesign"),
    }
}

fn attribute_from_node(node: &GraphNode) -> AttributeDefinition {
    AttributeDefinition {
        id: node.id,
        name: node.name.clone(),
        display_name: node.property_string("displayName"),
        description: node.property_string("description"),
        attribute_type: AttributeType::parse(&node.property_string("type")),
        read_only: node.property_bool("readOnly"),
        visible: node.property_bool("isVisible"),
        administrative: node.property_bool("administrative"),
        no_copy: node.property_bool("noCopy"),
        unique: node.property_bool("unique"),
        mandatory: node.property_bool("mandatory"),
        multiple: node.property_bool("multiple"),
        order: node.property_i64("order"),
        creation_date: node.property_i64(PROP_CREATION_DATE),
    }
}

fn class_payload(def: &ClassDefinition) -> Json {
    json!({
        "displayName": def.display_name,
        "description": def.description,
        "color": def.color,
        "icon": def.icon,
        "smallIcon": def.small_icon,
        "abstract": def.abstract_class,
        "custom": def.custom,
        "countable": def.countable,
        "inDesign": def.in_design,
        PROP_CREATION_DATE: now_millis(),
    })
}

fn bytes_from_json(value: Option<&Json>) -> Vec<u8> {
    value
        .and_then(Json::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Json::as_u64)
                .map(|b| b as u8)
                .collect()
        })
        .unwrap_or_default()
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub(crate) fn validate_class_name(name: &str) -> Result<(), CatalogError> {
    if name.is_empty() {
        return Err(CatalogError::invalid_argument(
            "class name can not be an empty string",
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CatalogError::invalid_argument(format!(
            "class name {name} contains invalid characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_attribute_name(name: &str) -> Result<(), CatalogError> {
    if name.is_empty() {
        return Err(CatalogError::invalid_argument(
            "attribute name can not be an empty string",
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CatalogError::invalid_argument(format!(
            "attribute name {name} contains invalid characters"
        )));
    }
    Ok(())
}
