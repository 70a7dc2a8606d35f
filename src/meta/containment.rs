//! Containment hierarchy: which classes may hold instances of which others,
//! for both the standard and the special (model-driven) hierarchy.

use serde_json::json;

use crate::errors::CatalogError;
use crate::store::{Direction, GraphNode};

use super::catalog::{info_from_node, Catalog};
use super::types::{ClassInfo, ClassRef};
use super::{
    CLASS_INVENTORY_OBJECT, LABEL_SPECIAL_NODE, NODE_DUMMY_ROOT, REL_EXTENDS, REL_POSSIBLE_CHILD,
    REL_POSSIBLE_SPECIAL_CHILD,
};

impl Catalog {
    /// Effective possible children of a class, abstract grants expanded to
    /// their concrete subclasses. `None` addresses the containment root.
    pub fn possible_children(
        &self,
        parent: Option<&str>,
    ) -> Result<Vec<ClassInfo>, CatalogError> {
        self.children_of(parent, REL_POSSIBLE_CHILD)
    }

    pub fn possible_special_children(
        &self,
        parent: Option<&str>,
    ) -> Result<Vec<ClassInfo>, CatalogError> {
        self.children_of(parent, REL_POSSIBLE_SPECIAL_CHILD)
    }

    /// Direct grants only: abstract entries are returned as themselves,
    /// without expansion, and the cache is bypassed.
    pub fn possible_children_direct(
        &self,
        parent: Option<&str>,
    ) -> Result<Vec<ClassInfo>, CatalogError> {
        self.direct_children_of(parent, REL_POSSIBLE_CHILD)
    }

    pub fn possible_special_children_direct(
        &self,
        parent: Option<&str>,
    ) -> Result<Vec<ClassInfo>, CatalogError> {
        self.direct_children_of(parent, REL_POSSIBLE_SPECIAL_CHILD)
    }

    pub fn can_be_child(&self, parent: Option<&str>, child: &str) -> Result<bool, CatalogError> {
        Ok(self
            .possible_children(parent)?
            .iter()
            .any(|c| c.name == child))
    }

    pub fn can_be_special_child(
        &self,
        parent: Option<&str>,
        child: &str,
    ) -> Result<bool, CatalogError> {
        Ok(self
            .possible_special_children(parent)?
            .iter()
            .any(|c| c.name == child))
    }

    /// Grants each child as a possible child of the parent. A grant already
    /// covered by an existing one, through abstract expansion in either
    /// direction, is rejected. `None` or id -1 addresses the containment
    /// root.
    pub fn add_possible_children(
        &self,
        parent: Option<ClassRef>,
        children: &[ClassRef],
    ) -> Result<(), CatalogError> {
        self.add_children(parent, children, REL_POSSIBLE_CHILD)
    }

    pub fn add_possible_special_children(
        &self,
        parent: Option<ClassRef>,
        children: &[ClassRef],
    ) -> Result<(), CatalogError> {
        self.add_children(parent, children, REL_POSSIBLE_SPECIAL_CHILD)
    }

    /// Revokes the direct grants from the parent to each child. Removing a
    /// class that was never directly granted is a no-op.
    pub fn remove_possible_children(
        &self,
        parent: Option<ClassRef>,
        children: &[ClassRef],
    ) -> Result<(), CatalogError> {
        self.remove_children(parent, children, REL_POSSIBLE_CHILD)
    }

    pub fn remove_possible_special_children(
        &self,
        parent: Option<ClassRef>,
        children: &[ClassRef],
    ) -> Result<(), CatalogError> {
        self.remove_children(parent, children, REL_POSSIBLE_SPECIAL_CHILD)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn children_of(
        &self,
        parent: Option<&str>,
        rel: &str,
    ) -> Result<Vec<ClassInfo>, CatalogError> {
        let key = parent.unwrap_or(NODE_DUMMY_ROOT);
        let cached = if rel == REL_POSSIBLE_CHILD {
            self.cache().possible_children(key)
        } else {
            self.cache().possible_special_children(key)
        };
        if let Some(names) = cached {
            let mut result = Vec::with_capacity(names.len());
            for name in names {
                result.push(ClassInfo::from(&self.class(name.as_str())?));
            }
            return Ok(result);
        }
        let parent_node = self.containment_parent_node(parent.map(ClassRef::from))?;
        let children = self.effective_children(&parent_node, rel)?;
        let names: Vec<String> = children.iter().map(|c| c.name.clone()).collect();
        if rel == REL_POSSIBLE_CHILD {
            self.cache().put_possible_children(key, names);
        } else {
            self.cache().put_possible_special_children(key, names);
        }
        Ok(children)
    }

    fn direct_children_of(
        &self,
        parent: Option<&str>,
        rel: &str,
    ) -> Result<Vec<ClassInfo>, CatalogError> {
        let parent_node = self.containment_parent_node(parent.map(ClassRef::from))?;
        let mut result = Vec::new();
        for id in self.store().neighbors(parent_node.id, rel, Direction::Outgoing)? {
            result.push(info_from_node(&self.store().node(id)?));
        }
        Ok(result)
    }

    fn add_children(
        &self,
        parent: Option<ClassRef>,
        children: &[ClassRef],
        rel: &str,
    ) -> Result<(), CatalogError> {
        let hierarchy = if rel == REL_POSSIBLE_CHILD {
            "containment hierarchy"
        } else {
            "special containment hierarchy"
        };
        let (key, granted_names) = self.store().scoped(|store| {
            let parent_node = self.containment_parent_node(parent.clone())?;
            let is_root = parent_node.kind == LABEL_SPECIAL_NODE;
            if !is_root && !self.is_subclass_of(CLASS_INVENTORY_OBJECT, &parent_node.name)? {
                return Err(CatalogError::invalid_argument(format!(
                    "class {} is not a business class, thus can not be added to the {hierarchy}",
                    parent_node.name
                )));
            }
            let key = if is_root {
                NODE_DUMMY_ROOT.to_string()
            } else {
                parent_node.name.clone()
            };
            let mut current = self.effective_children(&parent_node, rel)?;
            let mut granted_names = Vec::new();
            for child in children {
                let child_node = self.class_node(child)?;
                if !self.is_subclass_of(CLASS_INVENTORY_OBJECT, &child_node.name)? {
                    return Err(CatalogError::invalid_argument(format!(
                        "class {} is not a business class, thus can not be added to the {hierarchy}",
                        child_node.name
                    )));
                }
                if child_node.property_bool("abstract") {
                    let subclasses = self.subclasses(&child_node.name, true, false)?;
                    for subclass in &subclasses {
                        if current.iter().any(|c| c.id == subclass.id) {
                            return Err(CatalogError::invalid_argument(format!(
                                "a subclass of {} is already a possible child of {}",
                                child_node.name, key
                            )));
                        }
                    }
                    let concrete: Vec<ClassInfo> = subclasses
                        .into_iter()
                        .filter(|c| !c.abstract_class)
                        .collect();
                    granted_names.extend(concrete.iter().map(|c| c.name.clone()));
                    current.extend(concrete);
                } else {
                    if current.iter().any(|c| c.id == child_node.id) {
                        return Err(CatalogError::invalid_argument(format!(
                            "class {} is already a possible child of {}",
                            child_node.name, key
                        )));
                    }
                    granted_names.push(child_node.name.clone());
                    current.push(info_from_node(&child_node));
                }
                store.add_edge(parent_node.id, child_node.id, rel, json!({}))?;
            }
            Ok((key, granted_names))
        })?;
        for name in granted_names {
            if rel == REL_POSSIBLE_CHILD {
                self.cache().put_possible_child(&key, &name);
            } else {
                self.cache().put_possible_special_child(&key, &name);
            }
        }
        Ok(())
    }

    fn remove_children(
        &self,
        parent: Option<ClassRef>,
        children: &[ClassRef],
        rel: &str,
    ) -> Result<(), CatalogError> {
        let parent_id = self.store().scoped(|store| {
            let parent_node = self.containment_parent_node(parent.clone())?;
            for child in children {
                let child_node = self.class_node(child)?;
                for edge in store.edges(parent_node.id, rel, Direction::Outgoing)? {
                    if edge.to_id == child_node.id {
                        store.delete_edge(edge.id)?;
                    }
                }
            }
            Ok(parent_node.id)
        })?;
        let parent_node = self.store().node(parent_id)?;
        let key = if parent_node.kind == LABEL_SPECIAL_NODE {
            NODE_DUMMY_ROOT.to_string()
        } else {
            parent_node.name.clone()
        };
        let names: Vec<String> = self
            .effective_children(&parent_node, rel)?
            .into_iter()
            .map(|c| c.name)
            .collect();
        if rel == REL_POSSIBLE_CHILD {
            self.cache().put_possible_children(&key, names);
        } else {
            self.cache().put_possible_special_children(&key, names);
        }
        Ok(())
    }

    /// Resolves the parent of a containment operation: a class node, or,
    /// for `None` and id -1, the containment-root sentinel.
    fn containment_parent_node(
        &self,
        parent: Option<ClassRef>,
    ) -> Result<GraphNode, CatalogError> {
        match parent {
            None | Some(ClassRef::Id(-1)) => self
                .store()
                .find_node(LABEL_SPECIAL_NODE, NODE_DUMMY_ROOT)?
                .ok_or_else(|| {
                    CatalogError::not_found(format!("{NODE_DUMMY_ROOT} node is corrupted"))
                }),
            Some(r) => self.class_node(&r),
        }
    }

    /// Expands the direct grants of a node into the effective concrete list:
    /// an abstract grant stands for all of its concrete subclasses.
    pub(crate) fn effective_children(
        &self,
        parent_node: &GraphNode,
        rel: &str,
    ) -> Result<Vec<ClassInfo>, CatalogError> {
        let mut result = Vec::new();
        for id in self.store().neighbors(parent_node.id, rel, Direction::Outgoing)? {
            let child = self.store().node(id)?;
            if child.property_bool("abstract") {
                for descendant in self.store().bfs(child.id, REL_EXTENDS, Direction::Incoming)? {
                    if descendant == child.id {
                        continue;
                    }
                    let node = self.store().node(descendant)?;
                    if !node.property_bool("abstract") {
                        result.push(info_from_node(&node));
                    }
                }
            } else {
                result.push(info_from_node(&child));
            }
        }
        Ok(result)
    }
}
