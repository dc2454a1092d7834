//! Reflective feature access: get / set / unset / is_set

use std::sync::Arc;

use objgraph_core_types::{ClassId, FeatureId, FeatureKey, ObjectId};

use super::inverse::InverseLink;
use super::ModelGraph;
use crate::errors::{ModelError, Result};
use crate::meta::{FeatureKind, Metamodel, StructuralFeature};
use crate::model::{ContainerFeatureRef, Slot, Value};
use crate::notify::{EventKind, Notification, NotificationChain};

impl ModelGraph {
    // ===== Reads =====

    /// Current value of a feature
    ///
    /// With `resolve` set and a proxy-resolving reference, stored proxies are
    /// resolved first (firing RESOLVE). Many-valued features read as
    /// `Value::List`; unset single attributes read as their default.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFeature` if the feature is not part of the object's class.
    pub fn get(&mut self, object: ObjectId, feature: FeatureKey, resolve: bool) -> Result<Value> {
        let fid = self.feature_id_for(object, feature)?;
        self.get_by_id(object, fid, resolve)
    }

    /// `get` addressed by class-relative feature id
    ///
    /// # Errors
    ///
    /// Returns `InvalidFeature` if `fid` is out of range for the object's class.
    pub fn get_by_id(&mut self, object: ObjectId, fid: FeatureId, resolve: bool) -> Result<Value> {
        let mm = Arc::clone(&self.metamodel);
        let feature = mm.feature_of(self.object(object)?.class(), fid)?;
        if resolve
            && feature.resolves_proxies()
            && feature.kind() != FeatureKind::Container
            && !self.object(object)?.is_proxy()
        {
            self.run_quiet(|graph, chain| graph.resolve_feature_proxies(object, fid, feature, chain))?;
        }
        self.read(object, fid, feature)
    }

    /// Non-resolving read
    pub fn peek(&self, object: ObjectId, feature: FeatureKey) -> Result<Value> {
        let fid = self.feature_id_for(object, feature)?;
        self.peek_by_id(object, fid)
    }

    pub fn peek_by_id(&self, object: ObjectId, fid: FeatureId) -> Result<Value> {
        let feature = self.metamodel.feature_of(self.object(object)?.class(), fid)?;
        self.read(object, fid, feature)
    }

    fn read(&self, object: ObjectId, fid: FeatureId, feature: &StructuralFeature) -> Result<Value> {
        Ok(match feature.kind() {
            FeatureKind::Container => match self.object(object)?.container_link() {
                Some(link) if link.feature_id == ContainerFeatureRef::Opposite(fid).encode() => {
                    Value::Object(link.object)
                }
                _ => Value::Null,
            },
            kind if kind.is_many() => Value::List(self.items(object, fid).to_vec()),
            _ => self.current(object, fid, feature),
        })
    }

    pub fn is_set(&self, object: ObjectId, feature: FeatureKey) -> Result<bool> {
        let fid = self.feature_id_for(object, feature)?;
        self.is_set_by_id(object, fid)
    }

    /// Whether the feature holds a value other than its unset state
    ///
    /// Unsettable features report whether they were explicitly set; others
    /// compare against their default (or emptiness for lists).
    pub fn is_set_by_id(&self, object: ObjectId, fid: FeatureId) -> Result<bool> {
        let feature = self.metamodel.feature_of(self.object(object)?.class(), fid)?;
        Ok(match feature.kind() {
            FeatureKind::Container => self
                .object(object)?
                .container_feature_id()
                .is_some_and(|raw| raw == ContainerFeatureRef::Opposite(fid).encode()),
            kind if kind.is_many() => {
                if feature.is_unsettable() {
                    self.slot(object, fid).is_some_and(|s| !s.is_unset())
                } else {
                    !self.items(object, fid).is_empty()
                }
            }
            _ => match self.slot(object, fid) {
                Some(Slot::Single(value)) => {
                    feature.is_unsettable() || *value != feature.default_value()
                }
                _ => false,
            },
        })
    }

    // ===== Writes =====

    /// Replace a feature's value
    ///
    /// Container features reassign the container; containment and
    /// bidirectional references update the other ends before the value is
    /// committed; many-valued features take a `Value::List` and are brought
    /// to it with removes, moves and inserts.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFeature`, `ImmutableFeature`, `ProxyMutation`,
    /// `TypeMismatch`, `MultiplicityMismatch`, `DuplicateValue` or
    /// `ContainmentCycle`, always before any mutation.
    pub fn set(&mut self, object: ObjectId, feature: FeatureKey, value: Value) -> Result<()> {
        self.run("set", |graph, chain| {
            let fid = graph.feature_id_for(object, feature)?;
            graph.set_in_chain(object, fid, value, chain)
        })
    }

    pub fn set_by_id(&mut self, object: ObjectId, fid: FeatureId, value: Value) -> Result<()> {
        self.run("set", |graph, chain| graph.set_in_chain(object, fid, value, chain))
    }

    /// Restore a feature to its unset state
    ///
    /// Fires UNSET for unsettable features, otherwise SET with the default.
    pub fn unset(&mut self, object: ObjectId, feature: FeatureKey) -> Result<()> {
        self.run("unset", |graph, chain| {
            let fid = graph.feature_id_for(object, feature)?;
            graph.unset_in_chain(object, fid, chain)
        })
    }

    pub fn unset_by_id(&mut self, object: ObjectId, fid: FeatureId) -> Result<()> {
        self.run("unset", |graph, chain| graph.unset_in_chain(object, fid, chain))
    }

    /// Feature descriptor for a write, after the proxy and changeability checks
    pub(crate) fn writable_feature<'m>(
        &self,
        mm: &'m Metamodel,
        object: ObjectId,
        fid: FeatureId,
    ) -> Result<&'m StructuralFeature> {
        let feature = mm.feature_of(self.object(object)?.class(), fid)?;
        self.ensure_not_proxy(object)?;
        if !feature.is_changeable() {
            return Err(ModelError::ImmutableFeature {
                feature: feature.qualified_name().to_string(),
            });
        }
        Ok(feature)
    }

    pub(crate) fn set_in_chain(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        value: Value,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let mm = Arc::clone(&self.metamodel);
        let feature = self.writable_feature(&mm, object, fid)?;

        match feature.kind() {
            FeatureKind::SingleAttribute => {
                self.check_single_attribute(feature, &value)?;
                self.set_attribute(object, fid, feature, value, chain)
            }
            FeatureKind::Container => {
                let container = self.check_reference_value(feature, &value)?;
                self.set_container(object, fid, feature, container, chain)
            }
            FeatureKind::SingleContainment | FeatureKind::SingleReference => {
                let target = self.check_reference_value(feature, &value)?;
                if let (true, Some(child)) = (feature.is_containment(), target) {
                    self.check_containment(object, child)?;
                }
                self.set_single_reference(object, fid, feature, target, chain)
            }
            FeatureKind::ManyAttribute | FeatureKind::ManyContainment | FeatureKind::ManyReference => {
                let Value::List(values) = value else {
                    return Err(ModelError::MultiplicityMismatch {
                        feature: feature.qualified_name().to_string(),
                        many: true,
                    });
                };
                self.set_list(object, fid, feature, values, chain)
            }
        }
    }

    fn set_attribute(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        value: Value,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let old = self.current(object, fid, feature);
        *self.slot_mut(object, fid)? = Slot::Single(value.clone());
        self.update_id_index(object, fid, &old, &value)?;
        if self.notification_required(object) {
            chain.add(Notification::set(object, fid, old, value));
        }
        Ok(())
    }

    pub(crate) fn set_single_reference(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        target: Option<ObjectId>,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let old = self.stored(object, fid);
        let new = Value::from(target);
        if old != new && feature.has_inverse() {
            if let Some(previous) = old.as_object() {
                self.unlink_inverse(object, fid, feature, previous, chain)?;
            }
            if let Some(next) = target {
                self.link_inverse(object, fid, feature, next, chain)?;
            }
        }
        *self.slot_mut(object, fid)? = Slot::Single(new.clone());
        if self.notification_required(object) {
            chain.add(Notification::set(object, fid, old, new));
        }
        Ok(())
    }

    /// Assign the container through the object's own container feature
    fn set_container(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        container: Option<ObjectId>,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let raw = ContainerFeatureRef::Opposite(fid).encode();
        let current = self.object(object)?.container_link();
        let unchanged = match (current, container) {
            (Some(link), Some(next)) => link.object == next && link.feature_id == raw,
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            if self.notification_required(object) {
                let value = Value::from(container);
                chain.add(Notification::set(object, fid, value.clone(), value));
            }
            return Ok(());
        }

        if let Some(next) = container {
            self.ensure_not_proxy(next)?;
            self.check_containment(next, object)?;
        }

        self.basic_remove_from_container(object, chain)?;
        if let Some(next) = container {
            let opposite = feature.opposite().ok_or_else(|| ModelError::Internal {
                message: format!("{} has no opposite", feature.qualified_name()),
            })?;
            let cfid = self.metamodel.feature_id(self.object(next)?.class(), opposite)?;
            self.inverse_add(next, object, InverseLink::Own(cfid), chain)?;
        }
        self.basic_set_container(object, container, raw, chain)
    }

    pub(crate) fn unset_in_chain(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let mm = Arc::clone(&self.metamodel);
        let feature = self.writable_feature(&mm, object, fid)?;
        let required = self.notification_required(object);
        let event = if feature.is_unsettable() {
            EventKind::Unset
        } else {
            EventKind::Set
        };

        match feature.kind() {
            FeatureKind::Container => {
                self.set_container(object, fid, feature, None, chain)?;
                // Folds into the SET just queued for this feature
                if feature.is_unsettable() && required {
                    chain.add(Notification::new(object, fid, event, Value::Null, Value::Null, None));
                }
                Ok(())
            }
            FeatureKind::ManyAttribute | FeatureKind::ManyContainment | FeatureKind::ManyReference => {
                let was_set = self.is_set_by_id(object, fid)?;
                self.clear_in_chain(object, fid, feature, chain)?;
                *self.slot_mut(object, fid)? = Slot::Unset;
                if feature.is_unsettable() && required {
                    chain.add(Notification::new(
                        object,
                        fid,
                        EventKind::Unset,
                        Value::Bool(was_set),
                        Value::Bool(false),
                        None,
                    ));
                }
                Ok(())
            }
            FeatureKind::SingleAttribute => {
                let old = self.current(object, fid, feature);
                let default = feature.default_value();
                *self.slot_mut(object, fid)? = Slot::Unset;
                self.update_id_index(object, fid, &old, &default)?;
                if required {
                    chain.add(Notification::new(object, fid, event, old, default, None));
                }
                Ok(())
            }
            FeatureKind::SingleContainment | FeatureKind::SingleReference => {
                let old = self.stored(object, fid);
                if let (true, Some(previous)) = (feature.has_inverse(), old.as_object()) {
                    self.unlink_inverse(object, fid, feature, previous, chain)?;
                }
                *self.slot_mut(object, fid)? = Slot::Unset;
                if self.notification_required(object) {
                    chain.add(Notification::new(object, fid, event, old, Value::Null, None));
                }
                Ok(())
            }
        }
    }

    // ===== Validation =====

    fn check_single_attribute(&self, feature: &StructuralFeature, value: &Value) -> Result<()> {
        if matches!(value, Value::List(_)) {
            return Err(ModelError::MultiplicityMismatch {
                feature: feature.qualified_name().to_string(),
                many: false,
            });
        }
        self.check_attribute_value(feature, value)
    }

    fn check_attribute_value(&self, feature: &StructuralFeature, value: &Value) -> Result<()> {
        match feature.data_type() {
            Some(data_type) if data_type.accepts(value) => Ok(()),
            Some(data_type) => Err(ModelError::TypeMismatch {
                feature: feature.qualified_name().to_string(),
                expected: data_type.name().to_string(),
                found: value.type_name().to_string(),
            }),
            None => Err(ModelError::Internal {
                message: format!("{} is not an attribute", feature.qualified_name()),
            }),
        }
    }

    /// Validate a single reference value, returning the target handle
    pub(crate) fn check_reference_value(
        &self,
        feature: &StructuralFeature,
        value: &Value,
    ) -> Result<Option<ObjectId>> {
        match value {
            Value::Null => Ok(None),
            Value::Object(target) => {
                self.check_reference_target(feature, *target)?;
                Ok(Some(*target))
            }
            Value::List(_) => Err(ModelError::MultiplicityMismatch {
                feature: feature.qualified_name().to_string(),
                many: false,
            }),
            other => Err(ModelError::TypeMismatch {
                feature: feature.qualified_name().to_string(),
                expected: "object".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    fn check_reference_target(&self, feature: &StructuralFeature, target: ObjectId) -> Result<()> {
        let target_class = self.object(target)?.class();
        let Some(expected) = feature.reference_target() else {
            return Err(ModelError::Internal {
                message: format!("{} is not a reference", feature.qualified_name()),
            });
        };
        if self.metamodel.conforms(target_class, expected) {
            return Ok(());
        }
        let name = |class: ClassId| {
            self.metamodel
                .class(class)
                .map_or_else(|_| class.to_string(), |c| c.name().to_string())
        };
        Err(ModelError::TypeMismatch {
            feature: feature.qualified_name().to_string(),
            expected: name(expected),
            found: name(target_class),
        })
    }

    /// Validate one element of a many-valued feature
    pub(crate) fn check_element(&self, feature: &StructuralFeature, value: &Value) -> Result<()> {
        if matches!(value, Value::List(_)) {
            return Err(ModelError::TypeMismatch {
                feature: feature.qualified_name().to_string(),
                expected: "element".to_string(),
                found: value.type_name().to_string(),
            });
        }
        if feature.is_attribute() {
            return self.check_attribute_value(feature, value);
        }
        match value {
            Value::Object(target) => self.check_reference_target(feature, *target),
            other => Err(ModelError::TypeMismatch {
                feature: feature.qualified_name().to_string(),
                expected: "object".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Reject containing `child` under `container` if that closes a cycle
    pub(crate) fn check_containment(&self, container: ObjectId, child: ObjectId) -> Result<()> {
        if child == container || self.is_ancestor_of(child, container) {
            return Err(ModelError::ContainmentCycle {
                object: child,
                container,
            });
        }
        Ok(())
    }

    // ===== Dynamic property bag =====

    fn dynamic_feature_id(&self, object: ObjectId, offset: usize) -> Result<FeatureId> {
        let descriptor = self.metamodel.class(self.object(object)?.class())?;
        if !descriptor.has_dynamic_storage() {
            return Err(ModelError::UnsupportedDynamicAccess { object });
        }
        let index = descriptor.static_feature_count() + offset;
        if index >= descriptor.feature_count() {
            return Err(ModelError::InvalidFeature {
                class: descriptor.name().to_string(),
                feature: format!("dynamic offset {}", offset),
            });
        }
        Ok(FeatureId::from_index(index))
    }

    /// Read a feature by its offset in the dynamic property bag
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedDynamicAccess` for objects of generated classes.
    pub fn dynamic_get(&mut self, object: ObjectId, offset: usize, resolve: bool) -> Result<Value> {
        let fid = self.dynamic_feature_id(object, offset)?;
        self.get_by_id(object, fid, resolve)
    }

    pub fn dynamic_set(&mut self, object: ObjectId, offset: usize, value: Value) -> Result<()> {
        self.run("dynamic_set", |graph, chain| {
            let fid = graph.dynamic_feature_id(object, offset)?;
            graph.set_in_chain(object, fid, value, chain)
        })
    }

    pub fn dynamic_unset(&mut self, object: ObjectId, offset: usize) -> Result<()> {
        self.run("dynamic_unset", |graph, chain| {
            let fid = graph.dynamic_feature_id(object, offset)?;
            graph.unset_in_chain(object, fid, chain)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{DataType, MetamodelBuilder};
    use crate::notify::NotificationLog;

    struct Fixture {
        graph: ModelGraph,
        item: ClassId,
        label: FeatureKey,
        count: FeatureKey,
        tags: FeatureKey,
    }

    fn fixture() -> Fixture {
        let mut mm = MetamodelBuilder::new("items");
        let item = mm.class("Item");
        let label = mm.attribute(item, "label", DataType::Str).build();
        let count = mm
            .attribute(item, "count", DataType::Int)
            .default_value(5i64)
            .unsettable()
            .build();
        let tags = mm.attribute(item, "tags", DataType::Str).many().build();
        let graph = ModelGraph::new(Arc::new(mm.finish().unwrap()));
        Fixture {
            graph,
            item,
            label,
            count,
            tags,
        }
    }

    #[test]
    fn test_unset_attribute_reads_default() {
        let mut f = fixture();
        let object = f.graph.create_object(f.item).unwrap();
        assert_eq!(f.graph.peek(object, f.count).unwrap(), Value::Int(5));
        assert!(!f.graph.is_set(object, f.count).unwrap());

        f.graph.set(object, f.count, Value::Int(5)).unwrap();
        assert!(f.graph.is_set(object, f.count).unwrap());

        f.graph.unset(object, f.count).unwrap();
        assert!(!f.graph.is_set(object, f.count).unwrap());
    }

    #[test]
    fn test_non_unsettable_is_set_compares_with_default() {
        let mut f = fixture();
        let object = f.graph.create_object(f.item).unwrap();
        f.graph.set(object, f.label, Value::Null).unwrap();
        assert!(!f.graph.is_set(object, f.label).unwrap());
        f.graph.set(object, f.label, "x".into()).unwrap();
        assert!(f.graph.is_set(object, f.label).unwrap());
    }

    #[test]
    fn test_unset_event_kind_follows_unsettable_flag() {
        let mut f = fixture();
        let object = f.graph.create_object(f.item).unwrap();
        let log = NotificationLog::new();
        f.graph.add_adapter(object, Box::new(log.clone())).unwrap();

        f.graph.unset(object, f.count).unwrap();
        f.graph.unset(object, f.label).unwrap();
        let kinds: Vec<_> = log.notifications().iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![EventKind::Unset, EventKind::Set]);
    }

    #[test]
    fn test_unset_container_reports_unset_when_unsettable() {
        let mut mm = MetamodelBuilder::new("tree");
        let node = mm.class("Node");
        let children = mm.reference(node, "children", node).many().containment().build();
        let parent = mm.reference(node, "parent", node).unsettable().build();
        mm.opposites(children, parent);
        let mut graph = ModelGraph::new(Arc::new(mm.finish().unwrap()));
        let root = graph.create_object(node).unwrap();
        let child = graph.create_object(node).unwrap();
        graph.add(root, children, child.into()).unwrap();
        let log = NotificationLog::new();
        graph.add_adapter(child, Box::new(log.clone())).unwrap();

        graph.unset(child, parent).unwrap();

        let events = log.take();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Unset);
        assert_eq!(events[0].old_value, Value::Object(root));
        assert_eq!(events[0].new_value, Value::Null);
        assert_eq!(graph.container(child).unwrap(), None);
    }

    #[test]
    fn test_type_and_multiplicity_are_checked() {
        let mut f = fixture();
        let object = f.graph.create_object(f.item).unwrap();
        assert!(matches!(
            f.graph.set(object, f.label, Value::Int(1)),
            Err(ModelError::TypeMismatch { .. })
        ));
        assert!(matches!(
            f.graph.set(object, f.tags, "a".into()),
            Err(ModelError::MultiplicityMismatch { many: true, .. })
        ));
        assert!(matches!(
            f.graph.set(object, f.label, Value::List(vec![])),
            Err(ModelError::MultiplicityMismatch { many: false, .. })
        ));
    }

    #[test]
    fn test_proxy_cannot_be_written() {
        let mut f = fixture();
        let proxy = f.graph.create_proxy(f.item, "elsewhere#x").unwrap();
        assert!(matches!(
            f.graph.set(proxy, f.label, "x".into()),
            Err(ModelError::ProxyMutation { .. })
        ));
        assert_eq!(f.graph.peek(proxy, f.label).unwrap(), Value::Null);
    }
}
