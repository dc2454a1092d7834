use std::collections::{HashMap, HashSet};

use objgraph_core_types::{FeatureId, FeatureKey, ObjectId, ResourceId};

use crate::engine::ModelGraph;
use crate::meta::FeatureKind;

/// Find containment edges that disagree between the two sides
///
/// Checks that every contained object is listed by its container, that every
/// containment value points back at its holder, and that no object sits in
/// two containment slots. Proxies are exempt: they never carry a container.
///
/// Returns list of (child, holder) pairs
pub fn find_ownership_violations(graph: &ModelGraph) -> Vec<(ObjectId, ObjectId)> {
    let mut violations = Vec::new();
    let mut holders: HashMap<ObjectId, ObjectId> = HashMap::new();

    for holder in graph.object_ids() {
        if graph.is_proxy_object(holder) {
            continue;
        }
        for (fid, kind) in reference_features(graph, holder) {
            if !matches!(kind, FeatureKind::SingleContainment | FeatureKind::ManyContainment) {
                continue;
            }
            for child in held_objects(graph, holder, fid, kind) {
                if graph.is_proxy_object(child) {
                    continue;
                }
                if holders.insert(child, holder).is_some_and(|other| other != holder) {
                    violations.push((child, holder));
                }
                let linked = graph
                    .object(child)
                    .ok()
                    .and_then(|c| c.container_link())
                    .and_then(|link| {
                        let cfid = graph.containment_feature_id(child, link).ok()?;
                        Some((link.object, cfid))
                    });
                if linked != Some((holder, fid)) {
                    violations.push((child, holder));
                }
            }
        }
    }

    for child in graph.object_ids() {
        let Ok(object) = graph.object(child) else {
            continue;
        };
        if let Some(container) = object.container() {
            if holders.get(&child) != Some(&container) {
                violations.push((child, container));
            }
        }
    }

    violations
}

/// Find bidirectional non-containment references whose opposite end is missing
///
/// Returns list of (holder, feature, target) tuples
pub fn find_opposite_asymmetries(graph: &ModelGraph) -> Vec<(ObjectId, FeatureKey, ObjectId)> {
    let mm = graph.metamodel();
    let mut asymmetries = Vec::new();

    for holder in graph.object_ids() {
        if graph.is_proxy_object(holder) {
            continue;
        }
        for (fid, kind) in reference_features(graph, holder) {
            if !matches!(kind, FeatureKind::SingleReference | FeatureKind::ManyReference) {
                continue;
            }
            let Ok(class) = graph.class_of(holder) else {
                continue;
            };
            let Ok(feature) = mm.feature_of(class, fid) else {
                continue;
            };
            let Some(opposite) = feature.opposite() else {
                continue;
            };
            for target in held_objects(graph, holder, fid, kind) {
                if graph.is_proxy_object(target) {
                    continue;
                }
                let points_back = graph
                    .class_of(target)
                    .ok()
                    .and_then(|c| mm.feature_id(c, opposite).ok())
                    .is_some_and(|ofid| {
                        graph
                            .peek_by_id(target, ofid)
                            .map(|v| v.objects().contains(&holder))
                            .unwrap_or(false)
                    });
                if !points_back {
                    asymmetries.push((holder, feature.key(), target));
                }
            }
        }
    }

    asymmetries
}

/// Find disagreements between resource root lists, direct-resource marks and id indexes
///
/// Returns list of (resource, object) pairs
pub fn find_resource_mismatches(graph: &ModelGraph) -> Vec<(ResourceId, ObjectId)> {
    let mut mismatches = Vec::new();

    for resource in graph.resources() {
        let mut seen = HashSet::new();
        for root in resource.contents() {
            let direct = graph.object(*root).ok().and_then(|o| o.direct_resource());
            if direct != Some(resource.id()) || !seen.insert(*root) {
                mismatches.push((resource.id(), *root));
            }
        }
        for (key, object) in &resource.id_index {
            let consistent = graph.resource_of(*object) == Some(resource.id())
                && graph.id_key(*object).as_deref() == Some(key.as_str());
            if !consistent {
                mismatches.push((resource.id(), *object));
            }
        }
    }

    for object in graph.object_ids() {
        let Some(direct) = graph.object(object).ok().and_then(|o| o.direct_resource()) else {
            continue;
        };
        let listed = graph
            .resource(direct)
            .is_ok_and(|r| r.contents().contains(&object));
        if !listed {
            mismatches.push((direct, object));
        }
    }

    mismatches
}

/// Find proxies that carry feature data, a container or a resource
pub fn find_proxy_violations(graph: &ModelGraph) -> Vec<ObjectId> {
    graph
        .object_ids()
        .filter(|id| {
            graph.object(*id).is_ok_and(|o| {
                o.is_proxy()
                    && (!o.storage.is_blank() || o.container().is_some() || o.direct_resource().is_some())
            })
        })
        .collect()
}

/// Check if an object's container chain loops back on itself
pub fn has_containment_cycle(graph: &ModelGraph, object: ObjectId) -> bool {
    let mut visited = HashSet::new();
    let mut current = Some(object);

    while let Some(id) = current {
        if !visited.insert(id) {
            return true;
        }
        current = graph.object(id).ok().and_then(|o| o.container());
    }

    false
}

fn reference_features(graph: &ModelGraph, object: ObjectId) -> Vec<(FeatureId, FeatureKind)> {
    let mm = graph.metamodel();
    let Ok(class) = graph.class_of(object) else {
        return Vec::new();
    };
    let Ok(descriptor) = mm.class(class) else {
        return Vec::new();
    };
    descriptor
        .features()
        .iter()
        .enumerate()
        .filter_map(|(index, key)| {
            let kind = mm.feature(*key).ok()?.kind();
            Some((FeatureId::from_index(index), kind))
        })
        .collect()
}

fn held_objects(graph: &ModelGraph, holder: ObjectId, fid: FeatureId, kind: FeatureKind) -> Vec<ObjectId> {
    if kind.is_many() {
        graph.items(holder, fid).iter().filter_map(|v| v.as_object()).collect()
    } else {
        graph.stored(holder, fid).as_object().into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::meta::{DataType, MetamodelBuilder};
    use crate::model::{ContainerLink, ModelUri};

    fn graph() -> (ModelGraph, objgraph_core_types::ClassId, FeatureKey) {
        let mut mm = MetamodelBuilder::new("tree");
        let node = mm.class("Node");
        mm.attribute(node, "name", DataType::Str).build();
        let children = mm.reference(node, "children", node).many().containment().build();
        (ModelGraph::new(Arc::new(mm.finish().unwrap())), node, children)
    }

    #[test]
    fn test_consistent_graph_has_no_findings() {
        let (mut graph, node, children) = graph();
        let resource = graph.create_resource("a.model").unwrap();
        let root = graph.create_object(node).unwrap();
        let child = graph.create_object(node).unwrap();
        graph.add_root(resource, root).unwrap();
        graph.add(root, children, child.into()).unwrap();

        assert!(find_ownership_violations(&graph).is_empty());
        assert!(find_opposite_asymmetries(&graph).is_empty());
        assert!(find_resource_mismatches(&graph).is_empty());
        assert!(find_proxy_violations(&graph).is_empty());
        assert!(!has_containment_cycle(&graph, child));
    }

    #[test]
    fn test_dangling_container_link_is_reported() {
        let (mut graph, node, _) = graph();
        let a = graph.create_object(node).unwrap();
        let b = graph.create_object(node).unwrap();
        graph.object_mut(b).unwrap().set_container_link(Some(ContainerLink {
            object: a,
            feature_id: 1,
        }));
        assert_eq!(find_ownership_violations(&graph), vec![(b, a)]);
    }

    #[test]
    fn test_cycle_is_detected() {
        let (mut graph, node, _) = graph();
        let a = graph.create_object(node).unwrap();
        let b = graph.create_object(node).unwrap();
        let link = |object| Some(ContainerLink { object, feature_id: 1 });
        graph.object_mut(a).unwrap().set_container_link(link(b));
        graph.object_mut(b).unwrap().set_container_link(link(a));
        assert!(has_containment_cycle(&graph, a));
    }

    #[test]
    fn test_proxy_with_container_is_reported() {
        let (mut graph, node, _) = graph();
        let holder = graph.create_object(node).unwrap();
        let proxy = graph.create_proxy(node, ModelUri::parse("x#/")).unwrap();
        graph.object_mut(proxy).unwrap().set_container_link(Some(ContainerLink {
            object: holder,
            feature_id: 1,
        }));
        assert_eq!(find_proxy_violations(&graph), vec![proxy]);
    }
}
