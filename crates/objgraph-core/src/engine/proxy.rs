//! Proxy resolution and URI fragments
//!
//! A proxy is a placeholder object carrying only a `ModelUri`. Reads with
//! resolution requested swap it in place for the live object the URI names;
//! when no object is found the proxy simply stays where it is.

use std::sync::Arc;

use objgraph_core_types::schema::EVENT_UNRESOLVED;
use objgraph_core_types::{FeatureId, ObjectId, ResourceId};

use super::ModelGraph;
use crate::errors::Result;
use crate::meta::StructuralFeature;
use crate::model::{ModelUri, Slot, Value};
use crate::notify::{EventKind, Notification, NotificationChain};

/// URI-to-object resolution policy
///
/// Installed graph-wide with `ModelGraph::set_default_resolver` or per
/// resource with `ModelGraph::set_resource_resolver`. Returning `None`
/// leaves the proxy unresolved.
pub trait ProxyResolver: Send + Sync {
    fn resolve(&self, graph: &ModelGraph, context: ObjectId, uri: &ModelUri) -> Option<ObjectId>;
}

/// Cross-resource resolution: `resource-uri#fragment` against any loaded resource
#[derive(Debug, Clone, Copy, Default)]
pub struct UriFragmentResolver;

impl ProxyResolver for UriFragmentResolver {
    fn resolve(&self, graph: &ModelGraph, context: ObjectId, uri: &ModelUri) -> Option<ObjectId> {
        let resource = if uri.is_local() {
            graph.resource_of(context)?
        } else {
            graph.resource_by_uri(uri.resource())?
        };
        graph.object_for_fragment(resource, uri.fragment())
    }
}

/// Only resolves URIs pointing into the context object's own resource
#[derive(Debug, Clone, Copy, Default)]
pub struct SameResourceResolver;

impl ProxyResolver for SameResourceResolver {
    fn resolve(&self, graph: &ModelGraph, context: ObjectId, uri: &ModelUri) -> Option<ObjectId> {
        let resource = graph.resource_of(context)?;
        if !uri.is_local() && graph.resource(resource).ok()?.uri() != uri.resource() {
            return None;
        }
        graph.object_for_fragment(resource, uri.fragment())
    }
}

impl ModelGraph {
    /// Resolver in effect for `context`: its resource's own, else the default
    pub fn resolver_for(&self, context: ObjectId) -> Arc<dyn ProxyResolver> {
        self.resource_of(context)
            .and_then(|r| self.resources.get(r.index()))
            .and_then(|r| r.resolver.clone())
            .unwrap_or_else(|| Arc::clone(&self.resolver))
    }

    /// Look up the live object a proxy stands for, without changing the graph
    ///
    /// Returns `proxy` itself when it is not a proxy or cannot be resolved.
    pub fn resolve_proxy(&self, context: ObjectId, proxy: ObjectId) -> Result<ObjectId> {
        self.object(context)?;
        let Some(uri) = self.object(proxy)?.proxy_uri() else {
            return Ok(proxy);
        };
        let resolver = self.resolver_for(context);
        Ok(match resolver.resolve(self, context, uri) {
            Some(target) if target != proxy && !self.is_proxy_object(target) => target,
            _ => proxy,
        })
    }

    /// Resolve every proxy held by `object.fid`
    pub(crate) fn resolve_feature_proxies(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        if feature.is_many() {
            for index in 0..self.items(object, fid).len() {
                self.resolve_slot(object, fid, feature, Some(index), chain)?;
            }
            Ok(())
        } else {
            self.resolve_slot(object, fid, feature, None, chain)
        }
    }

    /// Resolve the value at one position (`None` for single features)
    pub(crate) fn resolve_slot(
        &mut self,
        object: ObjectId,
        fid: FeatureId,
        feature: &StructuralFeature,
        index: Option<usize>,
        chain: &mut NotificationChain,
    ) -> Result<()> {
        let held = match index {
            Some(i) => self.items(object, fid).get(i).cloned().unwrap_or_default(),
            None => self.stored(object, fid),
        };
        let Some(proxy) = held.as_object().filter(|p| self.is_proxy_object(*p)) else {
            return Ok(());
        };

        let resolved = self.resolve_proxy(object, proxy)?;
        let fits = self.fits_reference(feature, resolved)
            && (!feature.is_containment() || self.check_containment(object, resolved).is_ok());
        if resolved == proxy || !fits {
            tracing::debug!(
                event = EVENT_UNRESOLVED,
                object_id = %object,
                feature = feature.qualified_name(),
                uri = ?self.object(proxy)?.proxy_uri().map(ToString::to_string),
            );
            return Ok(());
        }

        let new = Value::Object(resolved);
        match index {
            Some(i) => {
                if self.items(object, fid).contains(&new) && feature.is_unique() {
                    tracing::debug!(
                        event = EVENT_UNRESOLVED,
                        object_id = %object,
                        feature = feature.qualified_name(),
                        "resolved object already in list"
                    );
                    return Ok(());
                }
                self.slot_mut(object, fid)?.items_mut()[i] = new.clone();
            }
            None => *self.slot_mut(object, fid)? = Slot::Single(new.clone()),
        }

        // A resolved child held elsewhere moves here like any other add
        if feature.has_inverse() {
            self.link_inverse(object, fid, feature, resolved, chain)?;
        }
        if self.notification_required(object) {
            chain.add(Notification::new(
                object,
                fid,
                EventKind::Resolve,
                held,
                new,
                index,
            ));
        }
        Ok(())
    }

    fn fits_reference(&self, feature: &StructuralFeature, target: ObjectId) -> bool {
        match (feature.reference_target(), self.object(target)) {
            (Some(class), Ok(object)) => self.metamodel.conforms(object.class(), class),
            _ => false,
        }
    }

    // ===== Fragments =====

    /// Find the object a fragment addresses inside `resource`
    ///
    /// No fragment (or an empty one) names the first root. Fragments starting
    /// with `/` are containment paths: a root index (empty for 0) followed by
    /// `@feature.index`, `@feature` or plain `name` segments. Anything else is
    /// an id.
    pub fn object_for_fragment(&self, resource: ResourceId, fragment: Option<&str>) -> Option<ObjectId> {
        let roots = self.resources.get(resource.index())?.contents();
        let fragment = match fragment {
            None | Some("") => return roots.first().copied(),
            Some(f) => f,
        };
        let Some(path) = fragment.strip_prefix('/') else {
            return self.object_by_id(resource, fragment);
        };

        let mut segments = path.split('/');
        let root_index = match segments.next().unwrap_or_default() {
            "" => 0,
            n => n.parse().ok()?,
        };
        let mut current = *roots.get(root_index)?;
        for segment in segments {
            current = self.child_for_segment(current, segment)?;
        }
        Some(current)
    }

    fn child_for_segment(&self, parent: ObjectId, segment: &str) -> Option<ObjectId> {
        let class = self.objects.get(parent.index())?.class();
        if let Some(rest) = segment.strip_prefix('@') {
            let (name, position) = match rest.rsplit_once('.') {
                Some((name, idx)) => (name, Some(idx.parse::<usize>().ok()?)),
                None => (rest, None),
            };
            let key = self.metamodel.find_feature(class, name)?;
            let fid = self.metamodel.feature_id(class, key).ok()?;
            let feature = self.metamodel.feature_of(class, fid).ok()?;
            if !feature.is_containment() {
                return None;
            }
            return match (feature.is_many(), position) {
                (true, Some(i)) => self.items(parent, fid).get(i)?.as_object(),
                (false, None) => self.stored(parent, fid).as_object(),
                _ => None,
            };
        }
        self.contents_of(parent)
            .into_iter()
            .find(|child| self.name_of(*child).as_deref() == Some(segment))
    }

    fn name_of(&self, object: ObjectId) -> Option<String> {
        let class = self.objects.get(object.index())?.class();
        let key = self.metamodel.find_feature(class, "name")?;
        let fid = self.metamodel.feature_id(class, key).ok()?;
        let feature = self.metamodel.feature_of(class, fid).ok()?;
        self.current(object, fid, feature).as_str().map(str::to_string)
    }

    /// Fragment addressing `object` within its resource
    ///
    /// Uses the id when `use_id_fragments` is on and the object has one,
    /// otherwise a containment path such as `//@children.0`.
    pub fn uri_fragment(&self, object: ObjectId) -> Result<String> {
        self.object(object)?;
        if self.config.use_id_fragments && self.resource_of(object).is_some() {
            if let Some(id) = self.id_key(object) {
                return Ok(id);
            }
        }

        let mut segments = Vec::new();
        let mut current = object;
        loop {
            let node = self.object(current)?;
            if node.direct_resource().is_some() {
                break;
            }
            let Some(link) = node.container_link() else {
                break;
            };
            let cfid = self.containment_feature_id(current, link)?;
            let container_class = self.object(link.object)?.class();
            let feature = self.metamodel.feature_of(container_class, cfid)?;
            if feature.is_many() {
                let position = self
                    .items(link.object, cfid)
                    .iter()
                    .position(|v| v.as_object() == Some(current))
                    .unwrap_or_default();
                segments.push(format!("@{}.{}", feature.name(), position));
            } else {
                segments.push(format!("@{}", feature.name()));
            }
            current = link.object;
        }

        let root_segment = match self.object(current)?.direct_resource() {
            Some(resource) => match self.resource(resource)?.contents().iter().position(|r| *r == current) {
                Some(0) | None => String::new(),
                Some(i) => i.to_string(),
            },
            None => String::new(),
        };
        segments.push(root_segment);
        segments.reverse();
        Ok(format!("/{}", segments.join("/")))
    }

    /// Full URI of `object`; a proxy answers its own URI
    pub fn uri_of(&self, object: ObjectId) -> Result<ModelUri> {
        if let Some(uri) = self.object(object)?.proxy_uri() {
            return Ok(uri.clone());
        }
        let resource = match self.resource_of(object) {
            Some(r) => self.resource(r)?.uri().to_string(),
            None => String::new(),
        };
        Ok(ModelUri::new(resource, Some(self.uri_fragment(object)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{DataType, MetamodelBuilder};
    use crate::notify::NotificationLog;
    use crate::GraphConfig;
    use objgraph_core_types::{ClassId, FeatureKey};

    struct Fixture {
        graph: ModelGraph,
        node: ClassId,
        name: FeatureKey,
        children: FeatureKey,
        refs: FeatureKey,
    }

    fn fixture(config: GraphConfig) -> Fixture {
        let mut mm = MetamodelBuilder::new("nodes");
        let node = mm.class("Node");
        let name = mm.attribute(node, "name", DataType::Str).build();
        let children = mm.reference(node, "children", node).many().containment().build();
        let refs = mm.reference(node, "refs", node).many().build();
        let graph = ModelGraph::with_config(Arc::new(mm.finish().unwrap()), config);
        Fixture {
            graph,
            node,
            name,
            children,
            refs,
        }
    }

    fn named(f: &mut Fixture, name: &str) -> ObjectId {
        let object = f.graph.create_object(f.node).unwrap();
        f.graph.set(object, f.name, name.into()).unwrap();
        object
    }

    #[test]
    fn test_cross_resource_proxy_resolves_by_name_path() {
        let mut f = fixture(GraphConfig::default());
        let other = f.graph.create_resource("other.model").unwrap();
        let root = named(&mut f, "root");
        let foo = named(&mut f, "foo");
        f.graph.add_root(other, root).unwrap();
        f.graph.add(root, f.children, foo.into()).unwrap();

        let holder = named(&mut f, "holder");
        let proxy = f.graph.create_proxy(f.node, "other.model#//foo").unwrap();
        f.graph.add(holder, f.refs, proxy.into()).unwrap();

        let log = NotificationLog::new();
        f.graph.add_adapter(holder, Box::new(log.clone())).unwrap();
        let value = f.graph.get(holder, f.refs, true).unwrap();

        assert_eq!(value, Value::List(vec![Value::Object(foo)]));
        let events = log.take();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Resolve);
        assert_eq!(events[0].old_value, Value::Object(proxy));
        assert_eq!(events[0].new_value, Value::Object(foo));
        assert_eq!(events[0].position, Some(0));
    }

    #[test]
    fn test_unresolvable_proxy_stays_in_place() {
        let mut f = fixture(GraphConfig::default());
        let holder = named(&mut f, "holder");
        let proxy = f.graph.create_proxy(f.node, "missing.model#//foo").unwrap();
        f.graph.add(holder, f.refs, proxy.into()).unwrap();

        let log = NotificationLog::new();
        f.graph.add_adapter(holder, Box::new(log.clone())).unwrap();
        for _ in 0..2 {
            let value = f.graph.get(holder, f.refs, true).unwrap();
            assert_eq!(value, Value::List(vec![Value::Object(proxy)]));
        }
        assert!(f.graph.is_proxy(proxy).unwrap());
        assert!(log.is_empty());
    }

    #[test]
    fn test_path_fragments_round_trip() {
        let mut f = fixture(GraphConfig {
            use_id_fragments: false,
            ..GraphConfig::default()
        });
        let resource = f.graph.create_resource("a.model").unwrap();
        let root = named(&mut f, "root");
        let first = named(&mut f, "first");
        let second = named(&mut f, "second");
        f.graph.add_root(resource, root).unwrap();
        f.graph.add(root, f.children, first.into()).unwrap();
        f.graph.add(root, f.children, second.into()).unwrap();

        assert_eq!(f.graph.uri_fragment(root).unwrap(), "/");
        assert_eq!(f.graph.uri_fragment(second).unwrap(), "//@children.1");
        assert_eq!(
            f.graph.object_for_fragment(resource, Some("//@children.1")),
            Some(second)
        );
        assert_eq!(f.graph.object_for_fragment(resource, None), Some(root));
        assert_eq!(
            f.graph.uri_of(first).unwrap().to_string(),
            "a.model#//@children.0"
        );
    }

    #[test]
    fn test_same_resource_resolver_rejects_foreign_uris() {
        let mut f = fixture(GraphConfig::default());
        let home = f.graph.create_resource("home.model").unwrap();
        let other = f.graph.create_resource("other.model").unwrap();
        let holder = named(&mut f, "holder");
        let target = named(&mut f, "target");
        f.graph.add_root(home, holder).unwrap();
        f.graph.add_root(other, target).unwrap();
        f.graph
            .set_resource_resolver(home, Some(Arc::new(SameResourceResolver)))
            .unwrap();

        let proxy = f.graph.create_proxy(f.node, "other.model#/").unwrap();
        assert_eq!(f.graph.resolve_proxy(holder, proxy).unwrap(), proxy);

        f.graph.set_resource_resolver(home, None).unwrap();
        assert_eq!(f.graph.resolve_proxy(holder, proxy).unwrap(), target);
    }
}
