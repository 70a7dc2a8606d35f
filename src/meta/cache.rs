use ahash::AHashMap;
use parking_lot::RwLock;

use super::types::{ClassDefinition, ClassInfo};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub classes: usize,
}

#[derive(Default)]
struct CacheInner {
    /// Class definitions by name.
    class_index: AHashMap<String, ClassDefinition>,
    /// Recursive subclass lists by class name (abstract included; filtering
    /// happens at read time so hit and miss paths behave identically).
    subclasses: AHashMap<String, Vec<ClassInfo>>,
    /// Direct subclass lists by class name.
    subclasses_direct: AHashMap<String, Vec<ClassInfo>>,
    /// Effective (abstract-expanded) possible children by parent class name;
    /// the dummy-root sentinel name keys the top level.
    possible_children: AHashMap<String, Vec<String>>,
    possible_special_children: AHashMap<String, Vec<String>>,
    /// Values currently taken by each unique attribute, keyed by class then
    /// attribute name.
    unique_values: AHashMap<String, AHashMap<String, Vec<String>>>,
    /// Upstream class hierarchy (self first, root last) by class name.
    upstream: AHashMap<String, Vec<ClassInfo>>,
}

/// In-memory snapshot of the catalog plus derived indices.
///
/// Read-through: misses are computed from the store by the catalog and put
/// back here. Any structural mutation replaces the derived indices wholesale;
/// entries are never patched in place. Shared mutable state without per-entry
/// locking; structural writers must be externally serialized.
#[derive(Default)]
pub struct MetadataCache {
    inner: RwLock<CacheInner>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(&self, name: &str) -> Option<ClassDefinition> {
        self.track(self.inner.read().class_index.get(name).cloned())
    }

    pub fn put_class(&self, class: ClassDefinition) {
        self.inner.write().class_index.insert(class.name.clone(), class);
    }

    pub fn subclasses(&self, name: &str) -> Option<Vec<ClassInfo>> {
        self.track(self.inner.read().subclasses.get(name).cloned())
    }

    pub fn put_subclasses(&self, name: &str, subclasses: Vec<ClassInfo>) {
        self.inner.write().subclasses.insert(name.to_string(), subclasses);
    }

    pub fn subclasses_direct(&self, name: &str) -> Option<Vec<ClassInfo>> {
        self.track(self.inner.read().subclasses_direct.get(name).cloned())
    }

    pub fn put_subclasses_direct(&self, name: &str, subclasses: Vec<ClassInfo>) {
        self.inner
            .write()
            .subclasses_direct
            .insert(name.to_string(), subclasses);
    }

    pub fn possible_children(&self, parent: &str) -> Option<Vec<String>> {
        self.track(self.inner.read().possible_children.get(parent).cloned())
    }

    pub fn put_possible_children(&self, parent: &str, children: Vec<String>) {
        self.inner
            .write()
            .possible_children
            .insert(parent.to_string(), children);
    }

    /// Appends one effective child, keeping the list sorted. No-op when the
    /// parent has no entry yet; a full projection must be stored first.
    pub fn put_possible_child(&self, parent: &str, child: &str) {
        let mut inner = self.inner.write();
        if let Some(children) = inner.possible_children.get_mut(parent) {
            children.push(child.to_string());
            children.sort();
        }
    }

    pub fn possible_special_children(&self, parent: &str) -> Option<Vec<String>> {
        self.track(
            self.inner
                .read()
                .possible_special_children
                .get(parent)
                .cloned(),
        )
    }

    pub fn put_possible_special_children(&self, parent: &str, children: Vec<String>) {
        self.inner
            .write()
            .possible_special_children
            .insert(parent.to_string(), children);
    }

    pub fn put_possible_special_child(&self, parent: &str, child: &str) {
        let mut inner = self.inner.write();
        if let Some(children) = inner.possible_special_children.get_mut(parent) {
            children.push(child.to_string());
            children.sort();
        }
    }

    pub fn unique_values(&self, class: &str, attribute: &str) -> Option<Vec<String>> {
        self.track(
            self.inner
                .read()
                .unique_values
                .get(class)
                .and_then(|attrs| attrs.get(attribute).cloned()),
        )
    }

    pub fn put_unique_values(&self, class: &str, attribute: &str, values: Vec<String>) {
        self.inner
            .write()
            .unique_values
            .entry(class.to_string())
            .or_default()
            .insert(attribute.to_string(), values);
    }

    pub fn upstream(&self, name: &str) -> Option<Vec<ClassInfo>> {
        self.track(self.inner.read().upstream.get(name).cloned())
    }

    pub fn put_upstream(&self, name: &str, hierarchy: Vec<ClassInfo>) {
        self.inner.write().upstream.insert(name.to_string(), hierarchy);
    }

    /// Drops every class-keyed entry ahead of a rebuild. Hit and miss
    /// counters keep running.
    pub fn clear_derived(&self) {
        *self.inner.write() = CacheInner::default();
    }

    pub fn clear_all(&self) {
        *self.inner.write() = CacheInner::default();
        self.hits.store(0, std::sync::atomic::Ordering::Relaxed);
        self.misses.store(0, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(std::sync::atomic::Ordering::Relaxed),
            misses: self.misses.load(std::sync::atomic::Ordering::Relaxed),
            classes: self.inner.read().class_index.len(),
        }
    }

    fn track<T>(&self, lookup: Option<T>) -> Option<T> {
        use std::sync::atomic::Ordering;
        match lookup {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }
}
