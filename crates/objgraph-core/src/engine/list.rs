//! Many-valued feature operations

use std::sync::Arc;

use objgraph_core_types::{ClassId, FeatureId, FeatureKey, ObjectId};

use super::ModelGraph;
use crate::errors::{ModelError, Result};
use crate::meta::{Metamodel, StructuralFeature};
use crate::model::Value;
use crate::notify::{EventKind, Notification, NotificationChain};

impl ModelGraph {
    /// Append to a many-valued feature
    ///
    /// Returns `false` when a unique feature already holds the value.
    pub fn add(&mut self, object: ObjectId, feature: FeatureKey, value: Value) -> Result<bool> {
        self.run("add", |graph, chain| {
            let fid = graph.feature_id_for(object, feature)?;
            let end = graph.items(object, fid).len();
            graph.insert_in_chain(object, fid, end, value, chain)
        })
    }

    /// Insert at `index` (`0..=len`)
    pub fn insert(&mut self, object: ObjectId, feature: FeatureKey, index: usize, value: Value) -> Result<bool> {
        self.run("insert", |graph, chain| {
            let fid = graph.feature_id_for(object, feature)?;
            graph.insert_in_chain(object, fid, index, value, chain)
        })
    }

    /// Append several values with one ADD_MANY (or ADD for a single survivor)
    ///
    /// Returns how many values were actually added.
    pub fn add_all(&mut self, object: ObjectId, feature: FeatureKey, values: Vec<Value>) -> Result<usize> {
        self.run("add_all", |graph, chain| {
            let fid = graph.feature_id_for(object, feature)?;
            graph.add_all_in_chain(object, fid, values, chain)
        })
    }

    pub fn remove(&mut self, object: ObjectId, feature: FeatureKey, value: &Value) -> Result<bool> {
        self.run("remove", |graph, chain| {
            let fid = graph.feature_id_for(object, feature)?;
            let mm = Arc::clone(&graph.metamodel);
            let feature = graph.writable_list_feature(&mm, object, fid)?;
            match graph.items(object, fid).iter().position(|v| v == value) {
                Some(index) => graph.list_remove(object, fid, feature, index, chain).map(|_| true),
                None => Ok(false),
            }
        })
    }

    pub fn remove_at(&mut self, object: ObjectId, feature: FeatureKey, index: usize) -> Result<Value> {
        self.run("remove_at", |graph, chain| {
            let fid = graph.feature_id_for(object, feature)?;
            let mm = Arc::clone(&graph.metamodel);
            let feature = graph.writable_list_feature(&mm, object, fid)?;
            graph.check_index(object, fid, index)?;
            graph.list_remove(object, fid, feature, index, chain)
        })
    }

    /// Move the element at `from` to `to`, firing MOVE (old value = `from`)
    pub fn move_within(&mut self, object: ObjectId, feature: FeatureKey, from: usize, to: usize) -> Result<()> {
        self.run("move", |graph, chain| {
            let fid = graph.feature_id_for(object, feature)?;
            let mm = Arc::clone(&graph.metamodel);
            graph.writable_list_feature(&mm, object, fid)?;
            graph.check_index(object, fid, from)?;
            graph.check_index(object, fid, to)?;
            graph.list_move(object, fid, from, to, chain)
        })
    }

    pub fn clear(&mut self, object: ObjectId, feature: FeatureKey) -> Result<()> {
        self.run("clear", |graph, chain| {
            let fid = graph.feature_id_for(object, feature)?;
            let mm = Arc::clone(&graph.metamodel);
            let feature = graph.writable_list_feature(&mm, object, fid)?;
            graph.clear_in_chain(object, fid, feature, chain)
        })
    }

    /// Element at `index`, resolving it first if the feature resolves proxies
    pub fn get_at(&mut self, object: ObjectId, feature: FeatureKey, index: usize) -> Result<Value> {
        let fid = self.feature_id_for(object, feature)?;
        let mm = Arc::clone(&self.metamodel);
        let feature = Self::list_feature(&mm, self.object(object)?.class(), fid)?;
        self.check_index(object, fid, index)?;
        if feature.resolves_proxies() && !self.object(object)?.is_proxy() {
            self.run_quiet(|graph, chain| graph.resolve_slot(object, fid, feature, Some(index), chain))?;
        }
        Ok(self.items(object, fid).get(index).cloned().unwrap_or_default())
    }

    pub fn len(&self, object: ObjectId, feature: FeatureKey) -> Result<usize> {
        let fid = self.feature_id_for(object, feature)?;
        Self::list_feature(&self.metamodel, self.object(object)?.class(), fid)?;
        Ok(self.items(object, fid).len())
    }

    fn list_feature(
        mm: &Metamodel,
        class: ClassId,
        fid: FeatureId,
    ) -> Result<&StructuralFeature> {
        let feature = mm.feature_of(class, fid)?;
        if !feature.is_many() {
            return Err(ModelError::MultiplicityMismatch {
                feature: feature.qualified_name().to_string(),
                many: false,
            });
        }
        Ok(feature)
    }

    fn writable_list_feature<'m>(
        &self,
        mm: &'m Metamodel,
        object: ObjectId,
        fid: FeatureId,
    ) -> Result<&'m StructuralFeature> {
        let feature = self.writable_feature(mm, object, fid)?;
        if !feature.is_many() {
            return Err(ModelError::MultiplicityMismatch {
                feature: feature.qualified_name().to_string(),
                many: false,
            });
        }
        Ok(feature)
    }

    fn check_index(&self, object: ObjectId, fid: FeatureId, index: usize) -> Result<()> {
        let len = self.items(object, fid).len();
        if index >= len {
            return Err(ModelError::IndexOutOfBounds { index, len });
        }
        Ok(())
    }

    fn check_new_child(&self, object: ObjectId, feature: &StructuralFeature, value: &Value) -> Result<()> {
        if let (true, Some(child)) = (feature.is_containment(), value.as_object()) {
            self.check_containment(object, child)?;
        }
        Ok(())
    }

    pub(crate) fn insert_in_chain(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        index: usize,
        value: Value,
        chain: &mut NotificationChain,
    ) -> Result<bool> {
        let mm = Arc::clone(&self.metamodel);
        let feature = self.writable_list_feature(&mm, object, fid)?;
        self.check_element(feature, &value)?;
        let len = self.items(object, fid).len();
        if index > len {
            return Err(ModelError::IndexOutOfBounds { index, len });
        }
        if feature.is_unique() && self.items(object, fid).contains(&value) {
            return Ok(false);
        }
        self.check_new_child(object, feature, &value)?;
        self.list_insert(object, fid, feature, index, value, chain)?;
        Ok(true)
    }

    pub(crate) fn add_all_in_chain(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        values: Vec<Value>,
        chain: &mut NotificationChain,
    ) -> Result<usize> {
        let mm = Arc::clone(&self.metamodel);
        let feature = self.writable_list_feature(&mm, object, fid)?;
        for value in &values {
            self.check_element(feature, value)?;
            self.check_new_child(object, feature, value)?;
        }

        let mut fresh: Vec<Value> = Vec::with_capacity(values.len());
        for value in values {
            if feature.is_unique()
                && (self.items(object, fid).contains(&value) || fresh.contains(&value))
            {
                continue;
            }
            fresh.push(value);
        }
        let added = fresh.len();
        self.append_values(object, fid, feature, fresh, chain)?;
        Ok(added)
    }

    /// Store, link every inverse, then queue one ADD / ADD_MANY
    fn append_values(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        mut values: Vec<Value>,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let start = self.items(object, fid).len();
        self.slot_mut(object, fid)?.items_mut().extend(values.iter().cloned());
        if feature.has_inverse() {
            for target in values.iter().filter_map(Value::as_object) {
                self.link_inverse(object, fid, feature, target, chain)?;
            }
        }
        if self.notification_required(object) {
            let notification = if values.len() == 1 {
                let value = values.pop().unwrap_or_default();
                Notification::new(object, fid, EventKind::Add, Value::Null, value, Some(start))
            } else {
                Notification::new(
                    object,
                    fid,
                    EventKind::AddMany,
                    Value::Null,
                    Value::List(values),
                    Some(start),
                )
            };
            chain.add(notification);
        }
        Ok(())
    }

    /// Store, link the inverse, then queue ADD
    pub(crate) fn list_insert(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        index: usize,
        value: Value,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        self.slot_mut(object, fid)?
            .items_mut()
            .insert(index, value.clone());
        if let (true, Some(target)) = (feature.has_inverse(), value.as_object()) {
            self.link_inverse(object, fid, feature, target, chain)?;
        }
        if self.notification_required(object) {
            chain.add(Notification::new(
                object,
                fid,
                EventKind::Add,
                Value::Null,
                value,
                Some(index),
            ));
        }
        Ok(())
    }

    /// Remove from storage, unlink the inverse, then queue REMOVE
    pub(crate) fn list_remove(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        index: usize,
        chain: &mut NotificationChain,
    ) -> Result<Value> {
        let value = self.slot_mut(object, fid)?.items_mut().remove(index);
        if let (true, Some(target)) = (feature.has_inverse(), value.as_object()) {
            self.unlink_inverse(object, fid, feature, target, chain)?;
        }
        if self.notification_required(object) {
            chain.add(Notification::new(
                object,
                fid,
                EventKind::Remove,
                value.clone(),
                Value::Null,
                Some(index),
            ));
        }
        Ok(value)
    }

    fn list_move(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        from: usize,
        to: usize,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let items = self.slot_mut(object, fid)?.items_mut();
        let value = items.remove(from);
        items.insert(to, value.clone());
        if self.notification_required(object) {
            chain.add(Notification::new(
                object,
                fid,
                EventKind::Move,
                Value::Int(from as i64),
                value,
                Some(to),
            ));
        }
        Ok(())
    }

    pub(crate) fn clear_in_chain(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        if self.items(object, fid).is_empty() {
            return Ok(());
        }
        let mut removed = std::mem::take(self.slot_mut(object, fid)?.items_mut());
        if feature.has_inverse() {
            for target in removed.iter().filter_map(Value::as_object) {
                self.unlink_inverse(object, fid, feature, target, chain)?;
            }
        }
        if self.notification_required(object) {
            let notification = if removed.len() == 1 {
                let value = removed.pop().unwrap_or_default();
                Notification::new(object, fid, EventKind::Remove, value, Value::Null, Some(0))
            } else {
                Notification::new(
                    object,
                    fid,
                    EventKind::RemoveMany,
                    Value::List(removed),
                    Value::Null,
                    None,
                )
            };
            chain.add(notification);
        }
        Ok(())
    }

    /// Bring a many-valued feature to exactly `values`
    ///
    /// Unique features remove absent elements, then move retained ones and
    /// insert new ones in target order. Non-unique features are cleared and
    /// refilled when they differ.
    pub(crate) fn set_list(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        values: Vec<Value>,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        for (index, value) in values.iter().enumerate() {
            self.check_element(feature, value)?;
            if feature.is_unique() && values[..index].contains(value) {
                return Err(ModelError::DuplicateValue {
                    feature: feature.qualified_name().to_string(),
                });
            }
            self.check_new_child(object, feature, value)?;
        }

        if !feature.is_unique() {
            if self.items(object, fid) == values.as_slice() {
                return Ok(());
            }
            self.clear_in_chain(object, fid, feature, chain)?;
            return self.append_values(object, fid, feature, values, chain);
        }

        let current = self.items(object, fid).to_vec();
        for index in (0..current.len()).rev() {
            if !values.contains(&current[index]) {
                self.list_remove(object, fid, feature, index, chain)?;
            }
        }
        for (target, value) in values.into_iter().enumerate() {
            let items = self.items(object, fid);
            if items.get(target) == Some(&value) {
                continue;
            }
            match items.iter().position(|v| *v == value) {
                Some(from) => self.list_move(object, fid, from, target, chain)?,
                None => self.list_insert(object, fid, feature, target, value, chain)?,
            }
        }
        Ok(())
    }
}
