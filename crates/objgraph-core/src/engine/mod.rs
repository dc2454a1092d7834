//! Object-graph consistency engine
//!
//! `ModelGraph` owns every object and resource of one graph in arenas and
//! is the only way to mutate them. Each public mutation threads a single
//! `NotificationChain` through its internal steps (storage write, inverse
//! update, container relink, resource attach/detach) and dispatches it once
//! at the end, so adapters never observe a half-applied edit.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use objgraph_core::{DataType, MetamodelBuilder, ModelGraph, Value};
//!
//! let mut mm = MetamodelBuilder::new("tree");
//! let node = mm.class("Node");
//! let children = mm.reference(node, "children", node).many().containment().build();
//! let parent = mm.reference(node, "parent", node).build();
//! mm.opposites(children, parent);
//! let metamodel = Arc::new(mm.finish().unwrap());
//!
//! let mut graph = ModelGraph::new(metamodel);
//! let a = graph.create_object(node).unwrap();
//! let b = graph.create_object(node).unwrap();
//! graph.add(a, children, b.into()).unwrap();
//!
//! assert_eq!(graph.peek(b, parent).unwrap(), Value::Object(a));
//! ```

mod delete;
mod inverse;
mod list;
mod proxy;
mod reflective;
mod resource;
mod traversal;

use std::sync::Arc;
use std::time::Instant;

use objgraph_core_types::{ClassId, FeatureId, FeatureKey, ObjectId};

use crate::config::GraphConfig;
use crate::errors::{ModelError, Result};
use crate::meta::{Metamodel, StructuralFeature};
use crate::model::{FeatureStorage, ModelObject, ModelUri, Slot, Value};
use crate::notify::{Adapter, AdapterRegistry, NotificationChain, Notifier};
use crate::{log_op_end, log_op_error, log_op_start};

pub use proxy::{ProxyResolver, SameResourceResolver, UriFragmentResolver};
pub use resource::{Resource, ResourceObserver, RESOURCE_CONTENTS};

/// Arena of model objects and resources over one metamodel
pub struct ModelGraph {
    metamodel: Arc<Metamodel>,
    config: GraphConfig,
    objects: Vec<ModelObject>,
    resources: Vec<Resource>,
    adapters: AdapterRegistry,
    resolver: Arc<dyn ProxyResolver>,
}

impl std::fmt::Debug for ModelGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGraph")
            .field("metamodel", &self.metamodel.name())
            .field("objects", &self.objects.len())
            .field("resources", &self.resources.len())
            .field("adapters", &self.adapters)
            .finish()
    }
}

impl ModelGraph {
    pub fn new(metamodel: Arc<Metamodel>) -> Self {
        Self::with_config(metamodel, GraphConfig::default())
    }

    pub fn with_config(metamodel: Arc<Metamodel>, config: GraphConfig) -> Self {
        Self {
            metamodel,
            config,
            objects: Vec::new(),
            resources: Vec::new(),
            adapters: AdapterRegistry::default(),
            resolver: Arc::new(UriFragmentResolver),
        }
    }

    pub fn metamodel(&self) -> &Arc<Metamodel> {
        &self.metamodel
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Replace the graph-wide proxy resolver (resources may still install their own)
    pub fn set_default_resolver(&mut self, resolver: Arc<dyn ProxyResolver>) {
        self.resolver = resolver;
    }

    // ===== Objects =====

    /// Create an unattached object of a concrete class
    ///
    /// # Errors
    ///
    /// Returns `ClassNotFound` for an unknown class and `AbstractClass` for
    /// an abstract one.
    pub fn create_object(&mut self, class: ClassId) -> Result<ObjectId> {
        let mm = Arc::clone(&self.metamodel);
        let descriptor = mm.class(class)?;
        if descriptor.is_abstract() {
            return Err(ModelError::AbstractClass {
                class: descriptor.name().to_string(),
            });
        }
        let id = ObjectId::from_index(self.objects.len());
        self.objects
            .push(ModelObject::new(class, Self::fresh_storage(&mm, class)));
        tracing::trace!(object_id = %id, class = descriptor.name(), "object created");
        Ok(id)
    }

    /// Create an unresolved placeholder for `uri`
    ///
    /// The class may be abstract: it is the declared type of the reference the
    /// proxy will sit in.
    ///
    /// # Errors
    ///
    /// Returns `ClassNotFound` for an unknown class.
    pub fn create_proxy(&mut self, class: ClassId, uri: impl Into<ModelUri>) -> Result<ObjectId> {
        self.metamodel.class(class)?;
        let id = ObjectId::from_index(self.objects.len());
        self.objects.push(ModelObject::new_proxy(class, uri.into()));
        Ok(id)
    }

    fn fresh_storage(mm: &Metamodel, class: ClassId) -> FeatureStorage {
        match mm.class(class) {
            Ok(descriptor) if descriptor.is_generated() => {
                FeatureStorage::new(descriptor.feature_count(), None)
            }
            Ok(descriptor) => FeatureStorage::new(
                descriptor.static_feature_count(),
                Some(descriptor.dynamic_feature_count()),
            ),
            Err(_) => FeatureStorage::default(),
        }
    }

    /// Get an object
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` if the handle was not issued by this graph.
    pub fn object(&self, id: ObjectId) -> Result<&ModelObject> {
        self.objects
            .get(id.index())
            .ok_or(ModelError::ObjectNotFound { object: id })
    }

    pub(crate) fn object_mut(&mut self, id: ObjectId) -> Result<&mut ModelObject> {
        self.objects
            .get_mut(id.index())
            .ok_or(ModelError::ObjectNotFound { object: id })
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> {
        (0..self.objects.len()).map(ObjectId::from_index)
    }

    pub fn class_of(&self, id: ObjectId) -> Result<ClassId> {
        Ok(self.object(id)?.class())
    }

    // ===== Proxy contract =====

    pub fn is_proxy(&self, id: ObjectId) -> Result<bool> {
        Ok(self.object(id)?.is_proxy())
    }

    pub fn proxy_uri(&self, id: ObjectId) -> Result<Option<&ModelUri>> {
        Ok(self.object(id)?.proxy_uri())
    }

    /// Turn an object into a proxy, or clear its proxy marker
    ///
    /// A proxy carries no feature data, so only a blank, unattached object can
    /// become one. Clearing the marker gives the object fresh empty storage;
    /// a proxy still stored in some feature must be resolved instead.
    ///
    /// # Errors
    ///
    /// Returns `ProxyMutation` when making a proxy of an object that holds
    /// feature data, has a container or is a resource root, and when clearing
    /// the marker of a proxy that any object still references.
    pub fn set_proxy_uri(&mut self, id: ObjectId, uri: Option<ModelUri>) -> Result<()> {
        let mm = Arc::clone(&self.metamodel);
        let object = self.object(id)?;
        let class = object.class();
        match uri {
            Some(uri) => {
                if !object.is_proxy()
                    && (!object.storage.is_blank()
                        || object.container().is_some()
                        || object.direct_resource().is_some())
                {
                    return Err(ModelError::ProxyMutation { object: id });
                }
                let object = self.object_mut(id)?;
                object.storage = FeatureStorage::default();
                object.set_proxy_uri(Some(uri));
            }
            None => {
                if object.is_proxy() {
                    if self.is_held(id)? {
                        return Err(ModelError::ProxyMutation { object: id });
                    }
                    let object = self.object_mut(id)?;
                    object.set_proxy_uri(None);
                    object.storage = Self::fresh_storage(&mm, class);
                }
            }
        }
        Ok(())
    }

    // ===== Adapters =====

    /// Register a listener on an object or resource
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` / `ResourceNotFound` for unknown notifiers.
    pub fn add_adapter(&mut self, notifier: impl Into<Notifier>, adapter: Box<dyn Adapter>) -> Result<()> {
        let notifier = notifier.into();
        self.check_notifier(notifier)?;
        self.adapters.add(notifier, adapter);
        Ok(())
    }

    /// Remove every listener of a notifier, returning how many were removed
    pub fn remove_adapters(&mut self, notifier: impl Into<Notifier>) -> usize {
        self.adapters.remove_all(notifier.into())
    }

    pub fn adapter_count(&self, notifier: impl Into<Notifier>) -> usize {
        self.adapters.count(notifier.into())
    }

    /// Switch delivery for one notifier
    ///
    /// # Errors
    ///
    /// Returns `ObjectNotFound` / `ResourceNotFound` for unknown notifiers.
    pub fn set_deliver(&mut self, notifier: impl Into<Notifier>, deliver: bool) -> Result<()> {
        match notifier.into() {
            Notifier::Object(id) => self.object_mut(id)?.set_deliver(deliver),
            Notifier::Resource(id) => self.resource_mut(id)?.deliver = deliver,
        }
        Ok(())
    }

    /// Whether anyone is listening to `notifier`
    ///
    /// The engine checks this before building any notification.
    pub fn notification_required(&self, notifier: impl Into<Notifier>) -> bool {
        let notifier = notifier.into();
        if !self.config.deliver_notifications {
            return false;
        }
        let deliver = match notifier {
            Notifier::Object(id) => self.objects.get(id.index()).is_some_and(|o| o.deliver()),
            Notifier::Resource(id) => self.resources.get(id.index()).is_some_and(|r| r.deliver),
        };
        deliver && self.adapters.has_adapters(notifier)
    }

    fn check_notifier(&self, notifier: Notifier) -> Result<()> {
        match notifier {
            Notifier::Object(id) => self.object(id).map(|_| ()),
            Notifier::Resource(id) => self.resource(id).map(|_| ()),
        }
    }

    // ===== Operation plumbing =====

    /// Run a public mutation: log it, thread one chain through it, dispatch once
    ///
    /// A failing operation drops its chain undelivered.
    pub(crate) fn run<T>(
        &mut self,
        op: &'static str,
        body: impl FnOnce(&mut Self, &mut NotificationChain) -> Result<T>,
    ) -> Result<T> {
        log_op_start!(op);
        let start = Instant::now();

        let mut chain = NotificationChain::new();
        let value = body(self, &mut chain).map_err(|e| {
            log_op_error!(op, e.clone(), duration_ms = start.elapsed().as_millis() as u64);
            e
        })?;

        let chain_len = chain.len();
        chain.dispatch(&mut self.adapters);
        log_op_end!(
            op,
            duration_ms = start.elapsed().as_millis() as u64,
            chain_len = chain_len
        );
        Ok(value)
    }

    /// Like `run`, for reads that may resolve proxies; not logged as an operation
    pub(crate) fn run_quiet<T>(
        &mut self,
        body: impl FnOnce(&mut Self, &mut NotificationChain) -> Result<T>,
    ) -> Result<T> {
        let mut chain = NotificationChain::new();
        let value = body(self, &mut chain)?;
        chain.dispatch(&mut self.adapters);
        Ok(value)
    }

    // ===== Storage access =====

    fn static_count(&self, class: ClassId) -> usize {
        self.metamodel
            .class(class)
            .map_or(0, |c| c.static_feature_count())
    }

    pub(crate) fn slot(&self, object: ObjectId, fid: FeatureId) -> Option<&Slot> {
        let object = self.objects.get(object.index())?;
        let static_count = self.static_count(object.class());
        object.storage.slot(fid, static_count)
    }

    pub(crate) fn slot_mut(&mut self, object: ObjectId, fid: FeatureId) -> Result<&mut Slot> {
        let static_count = self.static_count(self.object(object)?.class());
        self.object_mut(object)?
            .storage
            .slot_mut(fid, static_count)
            .ok_or_else(|| ModelError::Internal {
                message: format!("{} has no storage for {}", object, fid),
            })
    }

    /// Stored single value; `Null` when unset
    pub(crate) fn stored(&self, object: ObjectId, fid: FeatureId) -> Value {
        match self.slot(object, fid) {
            Some(Slot::Single(value)) => value.clone(),
            _ => Value::Null,
        }
    }

    /// Stored single value, or the feature default when unset
    pub(crate) fn current(&self, object: ObjectId, fid: FeatureId, feature: &StructuralFeature) -> Value {
        match self.slot(object, fid) {
            Some(Slot::Single(value)) => value.clone(),
            _ => feature.default_value(),
        }
    }

    pub(crate) fn items(&self, object: ObjectId, fid: FeatureId) -> &[Value] {
        self.slot(object, fid).map_or(&[], Slot::items)
    }

    pub(crate) fn is_proxy_object(&self, id: ObjectId) -> bool {
        self.objects.get(id.index()).is_some_and(ModelObject::is_proxy)
    }

    /// Resolve a key against the object's class
    pub(crate) fn feature_id_for(&self, object: ObjectId, key: FeatureKey) -> Result<FeatureId> {
        let class = self.object(object)?.class();
        self.metamodel.feature_id(class, key)
    }

    pub(crate) fn ensure_not_proxy(&self, object: ObjectId) -> Result<()> {
        if self.object(object)?.is_proxy() {
            return Err(ModelError::ProxyMutation { object });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{DataType, MetamodelBuilder};
    use crate::notify::NotificationLog;

    fn graph() -> (ModelGraph, ClassId) {
        let mut mm = MetamodelBuilder::new("plain");
        let item = mm.class("Item");
        mm.attribute(item, "label", DataType::Str).build();
        mm.abstract_class("Base");
        (ModelGraph::new(Arc::new(mm.finish().unwrap())), item)
    }

    #[test]
    fn test_abstract_class_cannot_be_instantiated() {
        let (mut graph, _) = graph();
        let base = graph.metamodel().class_by_name("Base").unwrap();
        assert!(matches!(
            graph.create_object(base),
            Err(ModelError::AbstractClass { .. })
        ));
        assert!(graph.create_proxy(base, "r#x").is_ok());
    }

    #[test]
    fn test_notification_required_needs_an_adapter() {
        let (mut graph, item) = graph();
        let object = graph.create_object(item).unwrap();
        assert!(!graph.notification_required(object));

        graph
            .add_adapter(object, Box::new(NotificationLog::new()))
            .unwrap();
        assert!(graph.notification_required(object));

        graph.set_deliver(object, false).unwrap();
        assert!(!graph.notification_required(object));
    }

    #[test]
    fn test_unknown_notifier_is_rejected() {
        let (mut graph, _) = graph();
        let result = graph.add_adapter(ObjectId::from_index(7), Box::new(NotificationLog::new()));
        assert!(matches!(result, Err(ModelError::ObjectNotFound { .. })));
    }

    #[test]
    fn test_set_proxy_uri_round_trip() {
        let (mut graph, item) = graph();
        let object = graph.create_object(item).unwrap();
        graph
            .set_proxy_uri(object, Some(ModelUri::parse("other#x")))
            .unwrap();
        assert!(graph.is_proxy(object).unwrap());
        graph.set_proxy_uri(object, None).unwrap();
        assert!(!graph.is_proxy(object).unwrap());
        assert!(graph.object(object).unwrap().storage.has_dynamic());
    }
}
