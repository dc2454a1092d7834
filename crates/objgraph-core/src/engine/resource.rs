//! Resources and the attachment protocol
//!
//! A resource roots a set of subtrees. An object's effective resource is its
//! own direct resource or, failing that, its container's. `Attached` and
//! `Detached` hooks fire once per object whenever that effective resource
//! changes; they keep the intrinsic id index in step and are forwarded to
//! registered `ResourceObserver`s.

use std::collections::HashMap;
use std::sync::Arc;

use objgraph_core_types::schema::{EVENT_ATTACHED, EVENT_DETACHED};
use objgraph_core_types::{FeatureId, ObjectId, ResourceId};

use super::proxy::ProxyResolver;
use super::ModelGraph;
use crate::errors::{ModelError, Result};
use crate::model::Value;
use crate::notify::{EventKind, Notification, NotificationChain};

/// Feature id used for notifications about a resource's root list
pub const RESOURCE_CONTENTS: FeatureId = FeatureId::from_index(0);

/// Collaborator told about objects entering and leaving a resource
///
/// Observers get a read-only view of the graph and so cannot re-enter a
/// mutation.
pub trait ResourceObserver {
    fn attached(&mut self, graph: &ModelGraph, resource: ResourceId, object: ObjectId);
    fn detached(&mut self, graph: &ModelGraph, resource: ResourceId, object: ObjectId);
}

/// Root persistence unit
pub struct Resource {
    id: ResourceId,
    uri: String,
    pub(crate) contents: Vec<ObjectId>,
    pub(crate) id_index: HashMap<String, ObjectId>,
    observers: Vec<Box<dyn ResourceObserver>>,
    pub(crate) resolver: Option<Arc<dyn ProxyResolver>>,
    pub(crate) deliver: bool,
}

impl Resource {
    fn new(id: ResourceId, uri: String) -> Self {
        Self {
            id,
            uri,
            contents: Vec::new(),
            id_index: HashMap::new(),
            observers: Vec::new(),
            resolver: None,
            deliver: true,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Root objects, in order
    pub fn contents(&self) -> &[ObjectId] {
        &self.contents
    }

    /// Look an object up in the intrinsic id index
    pub fn object_by_id(&self, id: &str) -> Option<ObjectId> {
        self.id_index.get(id).copied()
    }

    pub fn indexed_ids(&self) -> usize {
        self.id_index.len()
    }

    pub fn has_resolver(&self) -> bool {
        self.resolver.is_some()
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("uri", &self.uri)
            .field("contents", &self.contents)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ModelGraph {
    /// Create an empty resource
    ///
    /// # Errors
    ///
    /// Returns `DuplicateResourceUri` if another resource has the same URI.
    pub fn create_resource(&mut self, uri: impl Into<String>) -> Result<ResourceId> {
        let uri = uri.into();
        if self.resource_by_uri(&uri).is_some() {
            return Err(ModelError::DuplicateResourceUri { uri });
        }
        let id = ResourceId::from_index(self.resources.len());
        tracing::debug!(resource_id = %id, uri = %uri, "resource created");
        self.resources.push(Resource::new(id, uri));
        Ok(id)
    }

    pub fn resource(&self, id: ResourceId) -> Result<&Resource> {
        self.resources
            .get(id.index())
            .ok_or(ModelError::ResourceNotFound { resource: id })
    }

    pub(crate) fn resource_mut(&mut self, id: ResourceId) -> Result<&mut Resource> {
        self.resources
            .get_mut(id.index())
            .ok_or(ModelError::ResourceNotFound { resource: id })
    }

    pub fn resource_by_uri(&self, uri: &str) -> Option<ResourceId> {
        self.resources.iter().find(|r| r.uri == uri).map(|r| r.id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn roots(&self, resource: ResourceId) -> Result<&[ObjectId]> {
        Ok(self.resource(resource)?.contents())
    }

    pub fn add_resource_observer(
        &mut self,
        resource: ResourceId,
        observer: Box<dyn ResourceObserver>,
    ) -> Result<()> {
        self.resource_mut(resource)?.observers.push(observer);
        Ok(())
    }

    /// Install (or with `None`, remove) a resource-specific proxy resolver
    pub fn set_resource_resolver(
        &mut self,
        resource: ResourceId,
        resolver: Option<Arc<dyn ProxyResolver>>,
    ) -> Result<()> {
        self.resource_mut(resource)?.resolver = resolver;
        Ok(())
    }

    /// Find an object by its id attribute within a resource
    ///
    /// Uses the intrinsic index when it is maintained, otherwise scans the
    /// resource's subtrees.
    pub fn object_by_id(&self, resource: ResourceId, id: &str) -> Option<ObjectId> {
        let res = self.resources.get(resource.index())?;
        if self.config.maintain_id_index {
            return res.object_by_id(id);
        }
        res.contents
            .iter()
            .flat_map(|root| self.proper_subtree(*root))
            .find(|object| self.id_key(*object).as_deref() == Some(id))
    }

    // ===== Root list =====

    /// Append an object to a resource's roots
    ///
    /// Returns `false` if it already is a root of this resource.
    ///
    /// # Errors
    ///
    /// Returns `ProxyMutation` for proxies.
    pub fn add_root(&mut self, resource: ResourceId, object: ObjectId) -> Result<bool> {
        self.run("add_root", |graph, chain| {
            graph.insert_root_in_chain(resource, None, object, chain)
        })
    }

    pub fn insert_root(&mut self, resource: ResourceId, index: usize, object: ObjectId) -> Result<bool> {
        self.run("insert_root", |graph, chain| {
            graph.insert_root_in_chain(resource, Some(index), object, chain)
        })
    }

    /// Remove an object from a resource's roots
    ///
    /// An object still held by a cross-resource containment falls back to its
    /// container's resource.
    pub fn remove_root(&mut self, resource: ResourceId, object: ObjectId) -> Result<bool> {
        self.run("remove_root", |graph, chain| {
            graph.remove_root_in_chain(resource, object, chain)
        })
    }

    pub(crate) fn insert_root_in_chain(
        &mut self,
        resource: ResourceId,
        index: Option<usize>,
        object: ObjectId,
        chain: &mut NotificationChain,
    ) -> Result<bool> {
        let len = self.resource(resource)?.contents.len();
        self.ensure_not_proxy(object)?;
        let index = index.unwrap_or(len);
        if index > len {
            return Err(ModelError::IndexOutOfBounds { index, len });
        }
        let (previous, link) = {
            let current = self.object(object)?;
            (current.direct_resource(), current.container_link())
        };
        if previous == Some(resource) {
            return Ok(false);
        }

        let old_effective = self.resource_of(object);
        let changes = old_effective != Some(resource);
        if changes {
            if let Some(old) = old_effective {
                self.detach_subtree(object, old)?;
            }
        }

        if let Some(previous) = previous {
            self.remove_root_entry(previous, object, chain)?;
        }
        if let Some(link) = link {
            if !self.containment_resolves_proxies(object, link.object, link.feature_id)? {
                self.basic_remove_from_container(object, chain)?;
                self.relink_container(object, None, link.feature_id, chain)?;
            }
        }

        self.resource_mut(resource)?.contents.insert(index, object);
        self.object_mut(object)?.set_direct_resource(Some(resource));
        if changes {
            self.attach_subtree(object, resource)?;
        }
        if self.notification_required(resource) {
            chain.add(Notification::new(
                resource,
                RESOURCE_CONTENTS,
                EventKind::Add,
                Value::Null,
                Value::Object(object),
                Some(index),
            ));
        }
        Ok(true)
    }

    pub(crate) fn remove_root_in_chain(
        &mut self,
        resource: ResourceId,
        object: ObjectId,
        chain: &mut NotificationChain,
    ) -> Result<bool> {
        self.resource(resource)?;
        let (direct, container) = {
            let current = self.object(object)?;
            (current.direct_resource(), current.container())
        };
        if direct != Some(resource) {
            return Ok(false);
        }

        let new_effective = container.and_then(|c| self.resource_of(c));
        let changes = new_effective != Some(resource);
        if changes {
            self.detach_subtree(object, resource)?;
        }
        self.remove_root_entry(resource, object, chain)?;
        if changes {
            if let Some(next) = new_effective {
                self.attach_subtree(object, next)?;
            }
        }
        Ok(true)
    }

    /// Drop `object` from the root list and clear its direct resource
    pub(crate) fn remove_root_entry(
        &mut self,
        resource: ResourceId,
        object: ObjectId,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let contents = &mut self.resource_mut(resource)?.contents;
        let Some(position) = contents.iter().position(|o| *o == object) else {
            return Ok(());
        };
        contents.remove(position);
        self.object_mut(object)?.set_direct_resource(None);
        if self.notification_required(resource) {
            chain.add(Notification::new(
                resource,
                RESOURCE_CONTENTS,
                EventKind::Remove,
                Value::Object(object),
                Value::Null,
                Some(position),
            ));
        }
        Ok(())
    }

    // ===== Effective resource and hooks =====

    /// Walk the container chain to the first direct resource
    pub(crate) fn resource_of(&self, object: ObjectId) -> Option<ResourceId> {
        let mut current = self.objects.get(object.index())?;
        loop {
            if let Some(resource) = current.direct_resource() {
                return Some(resource);
            }
            current = self.objects.get(current.container()?.index())?;
        }
    }

    /// Text of the object's id attribute, if its class has one and it is set
    pub(crate) fn id_key(&self, object: ObjectId) -> Option<String> {
        let class = self.objects.get(object.index())?.class();
        let fid = self.metamodel.class(class).ok()?.id_attribute()?;
        let feature = self.metamodel.feature_of(class, fid).ok()?;
        self.current(object, fid, feature).key_text()
    }

    /// Keep the id index in step with a write to the id attribute
    pub(crate) fn update_id_index(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        old: &Value,
        new: &Value,
    ) -> Result<()> {
        if !self.config.maintain_id_index {
            return Ok(());
        }
        let class = self.object(object)?.class();
        if self.metamodel.class(class)?.id_attribute() != Some(fid) {
            return Ok(());
        }
        let Some(resource) = self.resource_of(object) else {
            return Ok(());
        };
        let index = &mut self.resource_mut(resource)?.id_index;
        if let Some(key) = old.key_text() {
            if index.get(&key) == Some(&object) {
                index.remove(&key);
            }
        }
        if let Some(key) = new.key_text() {
            index.insert(key, object);
        }
        Ok(())
    }

    /// Fire `Attached` for `object` and every descendant sharing its resource
    pub(crate) fn attach_subtree(&mut self, object: ObjectId, resource: ResourceId) -> Result<()> {
        let members = self.proper_subtree(object);
        if self.config.maintain_id_index {
            let keys: Vec<_> = members
                .iter()
                .filter_map(|m| self.id_key(*m).map(|k| (k, *m)))
                .collect();
            self.resource_mut(resource)?.id_index.extend(keys);
        }
        for member in &members {
            tracing::trace!(
                event = EVENT_ATTACHED,
                object_id = %member,
                resource_id = %resource,
            );
        }
        self.notify_observers(resource, &members, true)
    }

    /// Fire `Detached` for `object` and every descendant sharing its resource
    pub(crate) fn detach_subtree(&mut self, object: ObjectId, resource: ResourceId) -> Result<()> {
        let members = self.proper_subtree(object);
        if self.config.maintain_id_index {
            let keys: Vec<_> = members
                .iter()
                .filter_map(|m| self.id_key(*m).map(|k| (k, *m)))
                .collect();
            let index = &mut self.resource_mut(resource)?.id_index;
            for (key, member) in keys {
                if index.get(&key) == Some(&member) {
                    index.remove(&key);
                }
            }
        }
        for member in &members {
            tracing::trace!(
                event = EVENT_DETACHED,
                object_id = %member,
                resource_id = %resource,
            );
        }
        self.notify_observers(resource, &members, false)
    }

    fn notify_observers(&mut self, resource: ResourceId, members: &[ObjectId], attached: bool) -> Result<()> {
        let mut observers = std::mem::take(&mut self.resource_mut(resource)?.observers);
        if observers.is_empty() {
            return Ok(());
        }
        for member in members {
            for observer in observers.iter_mut() {
                if attached {
                    observer.attached(self, resource, *member);
                } else {
                    observer.detached(self, resource, *member);
                }
            }
        }
        self.resource_mut(resource)?.observers = observers;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{DataType, MetamodelBuilder};

    fn graph() -> (ModelGraph, objgraph_core_types::ClassId, objgraph_core_types::FeatureKey) {
        let mut mm = MetamodelBuilder::new("ids");
        let item = mm.class("Item");
        let key = mm.attribute(item, "key", DataType::Str).id().build();
        (ModelGraph::new(Arc::new(mm.finish().unwrap())), item, key)
    }

    #[test]
    fn test_duplicate_resource_uri_is_rejected() {
        let (mut graph, _, _) = graph();
        graph.create_resource("a.model").unwrap();
        assert!(matches!(
            graph.create_resource("a.model"),
            Err(ModelError::DuplicateResourceUri { .. })
        ));
    }

    #[test]
    fn test_id_index_follows_membership_and_writes() {
        let (mut graph, item, key) = graph();
        let resource = graph.create_resource("a.model").unwrap();
        let object = graph.create_object(item).unwrap();
        graph.set(object, key, "first".into()).unwrap();

        graph.add_root(resource, object).unwrap();
        assert_eq!(graph.object_by_id(resource, "first"), Some(object));

        graph.set(object, key, "second".into()).unwrap();
        assert_eq!(graph.object_by_id(resource, "first"), None);
        assert_eq!(graph.object_by_id(resource, "second"), Some(object));

        graph.remove_root(resource, object).unwrap();
        assert_eq!(graph.object_by_id(resource, "second"), None);
    }

    #[test]
    fn test_add_root_twice_is_a_noop() {
        let (mut graph, item, _) = graph();
        let resource = graph.create_resource("a.model").unwrap();
        let object = graph.create_object(item).unwrap();
        assert!(graph.add_root(resource, object).unwrap());
        assert!(!graph.add_root(resource, object).unwrap());
        assert_eq!(graph.roots(resource).unwrap(), &[object]);
    }

    #[test]
    fn test_moving_root_between_resources() {
        let (mut graph, item, _) = graph();
        let first = graph.create_resource("a.model").unwrap();
        let second = graph.create_resource("b.model").unwrap();
        let object = graph.create_object(item).unwrap();
        graph.add_root(first, object).unwrap();
        graph.add_root(second, object).unwrap();
        assert!(graph.roots(first).unwrap().is_empty());
        assert_eq!(graph.object(object).unwrap().direct_resource(), Some(second));
    }
}
