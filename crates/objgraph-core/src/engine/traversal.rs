//! Containment queries and graph walks

use std::collections::HashSet;

use objgraph_core_types::{FeatureId, FeatureKey, ObjectId, ResourceId};

use super::ModelGraph;
use crate::errors::Result;
use crate::meta::FeatureKind;
use crate::model::ContainerFeatureRef;

impl ModelGraph {
    pub fn container(&self, object: ObjectId) -> Result<Option<ObjectId>> {
        Ok(self.object(object)?.container())
    }

    pub fn container_feature_ref(&self, object: ObjectId) -> Result<Option<ContainerFeatureRef>> {
        Ok(self.object(object)?.container_link().map(|l| l.feature_ref()))
    }

    /// Feature naming the containment edge from `object`'s side
    ///
    /// This is the object's own container feature when the containment has an
    /// opposite, otherwise the containment feature on the container's class.
    pub fn container_feature(&self, object: ObjectId) -> Result<Option<FeatureKey>> {
        let node = self.object(object)?;
        let Some(link) = node.container_link() else {
            return Ok(None);
        };
        let key = match link.feature_ref() {
            ContainerFeatureRef::Opposite(fid) => self.metamodel.feature_of(node.class(), fid)?.key(),
            ContainerFeatureRef::Containment(fid) => {
                let class = self.object(link.object)?.class();
                self.metamodel.feature_of(class, fid)?.key()
            }
        };
        Ok(Some(key))
    }

    /// Containment feature (on the container's class) holding `object`
    pub fn containment_feature(&self, object: ObjectId) -> Result<Option<FeatureKey>> {
        let Some(link) = self.object(object)?.container_link() else {
            return Ok(None);
        };
        let fid = self.containment_feature_id(object, link)?;
        let class = self.object(link.object)?.class();
        Ok(Some(self.metamodel.feature_of(class, fid)?.key()))
    }

    pub fn direct_resource(&self, object: ObjectId) -> Result<Option<ResourceId>> {
        Ok(self.object(object)?.direct_resource())
    }

    /// Direct resource, else the container's effective resource
    pub fn effective_resource(&self, object: ObjectId) -> Result<Option<ResourceId>> {
        self.object(object)?;
        Ok(self.resource_of(object))
    }

    /// Topmost container of `object` (the object itself when uncontained)
    pub fn root_container(&self, object: ObjectId) -> Result<ObjectId> {
        let mut current = object;
        while let Some(container) = self.object(current)?.container() {
            current = container;
        }
        Ok(current)
    }

    /// True if `ancestor` is `object` or one of its transitive containers
    pub fn is_ancestor(&self, ancestor: ObjectId, object: ObjectId) -> Result<bool> {
        self.object(ancestor)?;
        self.object(object)?;
        Ok(self.is_ancestor_of(ancestor, object))
    }

    /// Direct children, in feature then list order
    pub fn contents(&self, object: ObjectId) -> Result<Vec<ObjectId>> {
        self.object(object)?;
        Ok(self.contents_of(object))
    }

    /// Every transitive child in pre-order, excluding `object`
    pub fn all_contents(&self, object: ObjectId) -> Result<Vec<ObjectId>> {
        self.object(object)?;
        let mut out = Vec::new();
        let mut stack: Vec<ObjectId> = self.contents_of(object).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.contents_of(next).into_iter().rev());
        }
        Ok(out)
    }

    /// Non-containment references held by `object`, without resolving
    pub fn cross_references(&self, object: ObjectId) -> Result<Vec<(FeatureKey, ObjectId)>> {
        let class = self.object(object)?.class();
        let descriptor = self.metamodel.class(class)?;
        let mut out = Vec::new();
        for (index, key) in descriptor.features().iter().enumerate() {
            let feature = self.metamodel.feature(*key)?;
            let fid = FeatureId::from_index(index);
            match feature.kind() {
                FeatureKind::SingleReference => {
                    if let Some(target) = self.stored(object, fid).as_object() {
                        out.push((*key, target));
                    }
                }
                FeatureKind::ManyReference => {
                    out.extend(
                        self.items(object, fid)
                            .iter()
                            .filter_map(|v| v.as_object())
                            .map(|target| (*key, target)),
                    );
                }
                _ => {}
            }
        }
        Ok(out)
    }

    /// Holders of non-containment references to `target`, graph-wide
    pub fn find_usages(&self, target: ObjectId) -> Result<Vec<(ObjectId, FeatureKey)>> {
        self.object(target)?;
        let mut out = Vec::new();
        for holder in self.object_ids() {
            for (key, referenced) in self.cross_references(holder)? {
                if referenced == target {
                    out.push((holder, key));
                }
            }
        }
        Ok(out)
    }

    // ===== Internal walks =====

    /// Whether any object stores `target` in a reference or containment
    pub(crate) fn is_held(&self, target: ObjectId) -> Result<bool> {
        if !self.find_usages(target)?.is_empty() {
            return Ok(true);
        }
        Ok(self.object_ids().any(|holder| self.contents_of(holder).contains(&target)))
    }

    pub(crate) fn contents_of(&self, object: ObjectId) -> Vec<ObjectId> {
        let Some(node) = self.objects.get(object.index()) else {
            return Vec::new();
        };
        let Ok(descriptor) = self.metamodel.class(node.class()) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (index, key) in descriptor.features().iter().enumerate() {
            let Ok(feature) = self.metamodel.feature(*key) else {
                continue;
            };
            let fid = FeatureId::from_index(index);
            match feature.kind() {
                FeatureKind::SingleContainment => out.extend(self.stored(object, fid).as_object()),
                FeatureKind::ManyContainment => {
                    out.extend(self.items(object, fid).iter().filter_map(|v| v.as_object()))
                }
                _ => {}
            }
        }
        out
    }

    /// `object` and its descendants that share its resource
    ///
    /// Descendants rooted in a resource of their own, and proxies, are
    /// skipped along with everything beneath them.
    pub(crate) fn proper_subtree(&self, object: ObjectId) -> Vec<ObjectId> {
        let mut out = vec![object];
        let mut seen = HashSet::from([object]);
        let mut stack = vec![object];
        while let Some(next) = stack.pop() {
            for child in self.contents_of(next) {
                let Some(node) = self.objects.get(child.index()) else {
                    continue;
                };
                if node.is_proxy() || node.direct_resource().is_some() || !seen.insert(child) {
                    continue;
                }
                out.push(child);
                stack.push(child);
            }
        }
        out
    }

    pub(crate) fn is_ancestor_of(&self, ancestor: ObjectId, object: ObjectId) -> bool {
        let mut current = Some(object);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.objects.get(id.index()).and_then(|o| o.container());
        }
        false
    }
}
