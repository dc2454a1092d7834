//! Subtree deletion

use std::collections::HashSet;
use std::sync::Arc;

use objgraph_core_types::{FeatureId, ObjectId};

use super::ModelGraph;
use crate::errors::Result;
use crate::meta::FeatureKind;
use crate::notify::NotificationChain;

impl ModelGraph {
    /// Cut `object` and its contents out of the graph
    ///
    /// Every non-containment reference into the subtree held from outside it
    /// is removed (opposite ends included), then the object leaves its
    /// container and resource. The objects stay in the arena and can be
    /// reattached.
    pub fn delete(&mut self, object: ObjectId) -> Result<()> {
        self.run("delete", |graph, chain| graph.delete_in_chain(object, chain))
    }

    pub(crate) fn delete_in_chain(&mut self, object: ObjectId, chain: &mut NotificationChain) -> Result<()> {
        let mut subtree: HashSet<ObjectId> = self.all_contents(object)?.into_iter().collect();
        subtree.insert(object);

        let holders: Vec<ObjectId> = self
            .object_ids()
            .filter(|h| !subtree.contains(h) && !self.is_proxy_object(*h))
            .collect();
        for holder in holders {
            self.drop_references_into(holder, &subtree, chain)?;
        }

        let node = self.object(object)?;
        let (link, direct) = (node.container_link(), node.direct_resource());
        if let Some(link) = link {
            self.basic_remove_from_container(object, chain)?;
            self.basic_set_container(object, None, link.feature_id, chain)?;
        }
        if let Some(resource) = direct {
            self.remove_root_in_chain(resource, object, chain)?;
        }
        tracing::debug!(object_id = %object, removed = subtree.len(), "subtree deleted");
        Ok(())
    }

    fn drop_references_into(
        &mut self,
        holder: ObjectId,
        subtree: &HashSet<ObjectId>,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let mm = Arc::clone(&self.metamodel);
        let descriptor = mm.class(self.object(holder)?.class())?;
        for (index, key) in descriptor.features().iter().enumerate() {
            let feature = mm.feature(*key)?;
            let fid = FeatureId::from_index(index);
            match feature.kind() {
                FeatureKind::SingleReference => {
                    let points_in = self
                        .stored(holder, fid)
                        .as_object()
                        .is_some_and(|t| subtree.contains(&t));
                    if points_in {
                        self.set_single_reference(holder, fid, feature, None, chain)?;
                    }
                }
                FeatureKind::ManyReference => {
                    let doomed: Vec<usize> = self
                        .items(holder, fid)
                        .iter()
                        .enumerate()
                        .filter(|(_, v)| v.as_object().is_some_and(|t| subtree.contains(&t)))
                        .map(|(i, _)| i)
                        .collect();
                    for index in doomed.into_iter().rev() {
                        self.list_remove(holder, fid, feature, index, chain)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
