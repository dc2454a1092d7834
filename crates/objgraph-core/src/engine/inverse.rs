//! Containment and inverse-reference maintenance
//!
//! These are the internal steps every structural mutation is built from.
//! None of them validate their arguments; the public entry points do that
//! before the first write.

use std::sync::Arc;

use objgraph_core_types::{FeatureId, ObjectId};

use super::ModelGraph;
use crate::errors::{ModelError, Result};
use crate::meta::{FeatureKind, StructuralFeature};
use crate::model::{ContainerFeatureRef, ContainerLink, Slot, Value, OPPOSITE_FEATURE_BASE};
use crate::notify::{EventKind, Notification, NotificationChain};

/// How the target of an inverse update is linked to the other object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InverseLink {
    /// A feature of the target's own class (the opposite end)
    Own(FeatureId),
    /// The target is the child of the other object's containment, which has
    /// no opposite; the id is on the other object's class
    Contained(FeatureId),
}

impl ModelGraph {
    /// `other` now points at `target`; update `target`'s side
    pub(crate) fn inverse_add(
        &mut self,
        target: ObjectId,
        other: ObjectId,
        link: InverseLink,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let mm = Arc::clone(&self.metamodel);
        let fid = match link {
            InverseLink::Contained(holder_fid) => {
                let raw = ContainerFeatureRef::Containment(holder_fid).encode();
                return self.adopt(target, other, raw, chain);
            }
            InverseLink::Own(fid) => fid,
        };
        let feature = mm.feature_of(self.object(target)?.class(), fid)?;

        match feature.kind() {
            FeatureKind::Container => {
                let raw = ContainerFeatureRef::Opposite(fid).encode();
                self.adopt(target, other, raw, chain)
            }
            FeatureKind::ManyContainment | FeatureKind::ManyReference => {
                let value = Value::Object(other);
                if self.items(target, fid).contains(&value) {
                    return Ok(());
                }
                let items = self.slot_mut(target, fid)?.items_mut();
                items.push(value.clone());
                let position = items.len() - 1;
                if self.notification_required(target) {
                    chain.add(Notification::new(
                        target,
                        fid,
                        EventKind::Add,
                        Value::Null,
                        value,
                        Some(position),
                    ));
                }
                Ok(())
            }
            FeatureKind::SingleContainment | FeatureKind::SingleReference => {
                let old = self.stored(target, fid);
                let new = Value::Object(other);
                if old == new {
                    return Ok(());
                }
                // Evict the previous partner so it drops its pointer back to `target`
                if let Some(previous) = old.as_object() {
                    self.unlink_inverse(target, fid, feature, previous, chain)?;
                }
                *self.slot_mut(target, fid)? = Slot::Single(new.clone());
                if self.notification_required(target) {
                    chain.add(Notification::set(target, fid, old, new));
                }
                Ok(())
            }
            FeatureKind::SingleAttribute | FeatureKind::ManyAttribute => Err(ModelError::Internal {
                message: format!("attribute {} has no inverse", feature.qualified_name()),
            }),
        }
    }

    /// `other` no longer points at `target`; update `target`'s side
    pub(crate) fn inverse_remove(
        &mut self,
        target: ObjectId,
        other: ObjectId,
        link: InverseLink,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let mm = Arc::clone(&self.metamodel);
        let fid = match link {
            InverseLink::Contained(holder_fid) => {
                let raw = ContainerFeatureRef::Containment(holder_fid).encode();
                return self.release(target, other, raw, chain);
            }
            InverseLink::Own(fid) => fid,
        };
        let feature = mm.feature_of(self.object(target)?.class(), fid)?;

        match feature.kind() {
            FeatureKind::Container => {
                let raw = ContainerFeatureRef::Opposite(fid).encode();
                self.release(target, other, raw, chain)
            }
            FeatureKind::ManyContainment | FeatureKind::ManyReference => {
                let value = Value::Object(other);
                let Some(position) = self.items(target, fid).iter().position(|v| *v == value) else {
                    return Ok(());
                };
                self.slot_mut(target, fid)?.items_mut().remove(position);
                if self.notification_required(target) {
                    chain.add(Notification::new(
                        target,
                        fid,
                        EventKind::Remove,
                        value,
                        Value::Null,
                        Some(position),
                    ));
                }
                Ok(())
            }
            FeatureKind::SingleContainment | FeatureKind::SingleReference => {
                let old = Value::Object(other);
                if self.stored(target, fid) != old {
                    return Ok(());
                }
                *self.slot_mut(target, fid)? = Slot::Single(Value::Null);
                if self.notification_required(target) {
                    chain.add(Notification::set(target, fid, old, Value::Null));
                }
                Ok(())
            }
            FeatureKind::SingleAttribute | FeatureKind::ManyAttribute => Err(ModelError::Internal {
                message: format!("attribute {} has no inverse", feature.qualified_name()),
            }),
        }
    }

    /// Make `child` the child of `container` under the raw container feature id
    fn adopt(
        &mut self,
        child: ObjectId,
        container: ObjectId,
        raw: i32,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let current = self.object(child)?.container_link();
        if current
            == Some(ContainerLink {
                object: container,
                feature_id: raw,
            })
        {
            return Ok(());
        }
        if current.is_some() {
            self.basic_remove_from_container(child, chain)?;
        }
        self.basic_set_container(child, Some(container), raw, chain)
    }

    /// Drop `child`'s container link if it still names `container` under `raw`
    fn release(
        &mut self,
        child: ObjectId,
        container: ObjectId,
        raw: i32,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let current = self.object(child)?.container_link();
        if current
            != Some(ContainerLink {
                object: container,
                feature_id: raw,
            })
        {
            return Ok(());
        }
        self.basic_set_container(child, None, raw, chain)
    }

    /// The inverse side `target` plays for `holder`'s feature, if any
    fn inverse_link_for(
        &self,
        fid: FeatureId,
        feature: &StructuralFeature,
        target: ObjectId,
    ) -> Result<Option<InverseLink>> {
        if let Some(opposite) = feature.opposite() {
            let class = self.object(target)?.class();
            return Ok(Some(InverseLink::Own(self.metamodel.feature_id(class, opposite)?)));
        }
        if feature.is_containment() {
            return Ok(Some(InverseLink::Contained(fid)));
        }
        Ok(None)
    }

    /// `holder.feature` gained `target`: add the inverse on `target`
    ///
    /// Proxies never receive inverse links.
    pub(crate) fn link_inverse(
        &mut self,
        holder: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        target: ObjectId,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        if self.object(target)?.is_proxy() {
            return Ok(());
        }
        match self.inverse_link_for(fid, feature, target)? {
            Some(link) => self.inverse_add(target, holder, link, chain),
            None => Ok(()),
        }
    }

    /// `holder.feature` lost `target`: remove the inverse on `target`
    pub(crate) fn unlink_inverse(
        &mut self,
        holder: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        target: ObjectId,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        if self.object(target)?.is_proxy() {
            return Ok(());
        }
        match self.inverse_link_for(fid, feature, target)? {
            Some(link) => self.inverse_remove(target, holder, link, chain),
            None => Ok(()),
        }
    }

    /// Id of the containment feature (on the container's class) holding `object`
    pub(crate) fn containment_feature_id(&self, object: ObjectId, link: ContainerLink) -> Result<FeatureId> {
        match link.feature_ref() {
            ContainerFeatureRef::Containment(fid) => Ok(fid),
            ContainerFeatureRef::Opposite(own) => {
                let own_feature = self.metamodel.feature_of(self.object(object)?.class(), own)?;
                let opposite = own_feature.opposite().ok_or_else(|| ModelError::Internal {
                    message: format!("{} has no opposite", own_feature.qualified_name()),
                })?;
                let container_class = self.object(link.object)?.class();
                self.metamodel.feature_id(container_class, opposite)
            }
        }
    }

    /// Whether the containment named by `raw` (from `container` to `object`) resolves proxies
    pub(crate) fn containment_resolves_proxies(
        &self,
        object: ObjectId,
        container: ObjectId,
        raw: i32,
    ) -> Result<bool> {
        let cfid = self.containment_feature_id(
            object,
            ContainerLink {
                object: container,
                feature_id: raw,
            },
        )?;
        let container_class = self.object(container)?.class();
        Ok(self.metamodel.feature_of(container_class, cfid)?.resolves_proxies())
    }

    /// Remove `object` from its container's storage
    ///
    /// Both container feature encodings end in an inverse-remove on the
    /// container's containment feature. The object's own container link is
    /// left for the caller to replace.
    pub(crate) fn basic_remove_from_container(
        &mut self,
        object: ObjectId,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let Some(link) = self.object(object)?.container_link() else {
            return Ok(());
        };
        let cfid = self.containment_feature_id(object, link)?;
        self.inverse_remove(link.object, object, InverseLink::Own(cfid), chain)
    }

    /// Container reassignment
    ///
    /// A root whose new containment does not resolve proxies stops being a
    /// root. The moved subtree is detached from its old effective resource
    /// before the link changes and attached to the new one afterwards, only
    /// when the two differ.
    pub(crate) fn basic_set_container(
        &mut self,
        object: ObjectId,
        new_container: Option<ObjectId>,
        new_raw: i32,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let (direct, old_container) = {
            let current = self.object(object)?;
            (current.direct_resource(), current.container())
        };

        let mut old_resource = None;
        let mut new_resource = None;
        match direct {
            Some(root_of) => {
                if let Some(container) = new_container {
                    if !self.containment_resolves_proxies(object, container, new_raw)? {
                        self.remove_root_entry(root_of, object, chain)?;
                        old_resource = Some(root_of);
                        new_resource = self.resource_of(container);
                    }
                }
            }
            None => {
                old_resource = old_container.and_then(|c| self.resource_of(c));
                new_resource = new_container.and_then(|c| self.resource_of(c));
            }
        }

        let moved = old_resource != new_resource;
        if moved {
            if let Some(resource) = old_resource {
                self.detach_subtree(object, resource)?;
            }
        }
        self.relink_container(object, new_container, new_raw, chain)?;
        if moved {
            if let Some(resource) = new_resource {
                self.attach_subtree(object, resource)?;
            }
        }
        Ok(())
    }

    /// Replace the container link and queue the object's own SET notifications
    ///
    /// Only opposite-encoded ids name a feature of the object itself, so only
    /// those produce notifications here: first the loss on the old feature
    /// (when the id changes), then the gain on the new one.
    pub(crate) fn relink_container(
        &mut self,
        object: ObjectId,
        new_container: Option<ObjectId>,
        new_raw: i32,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let old = self.object(object)?.container_link();
        let link = new_container.map(|container| ContainerLink {
            object: container,
            feature_id: new_raw,
        });
        self.object_mut(object)?.set_container_link(link);

        if !self.notification_required(object) {
            return Ok(());
        }
        let old_container = old.map(|l| l.object);
        let old_raw = old.map(|l| l.feature_id);
        if let Some(old_raw) = old_raw {
            if old_raw <= OPPOSITE_FEATURE_BASE && old_raw != new_raw {
                if let ContainerFeatureRef::Opposite(fid) = ContainerFeatureRef::decode(old_raw) {
                    chain.add(Notification::set(
                        object,
                        fid,
                        Value::from(old_container),
                        Value::Null,
                    ));
                }
            }
        }
        if let ContainerFeatureRef::Opposite(fid) = ContainerFeatureRef::decode(new_raw) {
            let previous = if old_raw == Some(new_raw) {
                Value::from(old_container)
            } else {
                Value::Null
            };
            chain.add(Notification::set(
                object,
                fid,
                previous,
                Value::from(new_container),
            ));
        }
        Ok(())
    }
}
