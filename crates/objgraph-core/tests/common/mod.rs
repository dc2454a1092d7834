use std::sync::{Arc, Mutex};

use objgraph_core::{
    ClassId, DataType, FeatureKey, GraphConfig, MetamodelBuilder, ModelGraph, Notification,
    NotificationLog, ObjectId, ResourceId, ResourceObserver, Value,
};

/// Node metamodel shared by the integration tests
///
/// - `children` (many containment) <-> `parent`
/// - `slot` single containment without opposite
/// - `friends` <-> `friend_of` (many, bidirectional)
/// - `best` <-> `best_of` (single, bidirectional)
/// - `refs` plain many reference, resolves proxies
/// - `parts` many containment without opposite, resolves proxies
#[allow(dead_code)]
pub struct Tree {
    pub graph: ModelGraph,
    pub node: ClassId,
    pub name: FeatureKey,
    pub id: FeatureKey,
    pub children: FeatureKey,
    pub parent: FeatureKey,
    pub slot: FeatureKey,
    pub friends: FeatureKey,
    pub friend_of: FeatureKey,
    pub best: FeatureKey,
    pub best_of: FeatureKey,
    pub refs: FeatureKey,
    pub parts: FeatureKey,
}

#[allow(dead_code)]
pub fn tree() -> Tree {
    tree_with_config(GraphConfig::default())
}

#[allow(dead_code)]
pub fn tree_with_config(config: GraphConfig) -> Tree {
    let mut mm = MetamodelBuilder::new("tree");
    let node = mm.class("Node");
    let name = mm.attribute(node, "name", DataType::Str).build();
    let id = mm.attribute(node, "id", DataType::Str).id().build();
    let children = mm
        .reference(node, "children", node)
        .many()
        .containment()
        .build();
    let parent = mm.reference(node, "parent", node).build();
    let slot = mm.reference(node, "slot", node).containment().build();
    let friends = mm.reference(node, "friends", node).many().build();
    let friend_of = mm.reference(node, "friend_of", node).many().build();
    let best = mm.reference(node, "best", node).build();
    let best_of = mm.reference(node, "best_of", node).build();
    let refs = mm.reference(node, "refs", node).many().build();
    let parts = mm
        .reference(node, "parts", node)
        .many()
        .containment()
        .resolve_proxies(true)
        .build();
    mm.opposites(children, parent);
    mm.opposites(friends, friend_of);
    mm.opposites(best, best_of);

    let metamodel = Arc::new(mm.finish().expect("tree metamodel is valid"));
    Tree {
        graph: ModelGraph::with_config(metamodel, config),
        node,
        name,
        id,
        children,
        parent,
        slot,
        friends,
        friend_of,
        best,
        best_of,
        refs,
        parts,
    }
}

impl Tree {
    /// Create a node with its `name` set
    #[allow(dead_code)]
    pub fn named(&mut self, name: &str) -> ObjectId {
        let object = self.graph.create_object(self.node).expect("create node");
        self.graph
            .set(object, self.name, name.into())
            .expect("set name");
        object
    }

    /// Attach a fresh recording log to each notifier
    #[allow(dead_code)]
    pub fn listen(&mut self, objects: &[ObjectId]) -> NotificationLog {
        let log = NotificationLog::new();
        for object in objects {
            self.graph
                .add_adapter(*object, Box::new(log.clone()))
                .expect("add adapter");
        }
        log
    }

    #[allow(dead_code)]
    pub fn list(&self, object: ObjectId, feature: FeatureKey) -> Vec<ObjectId> {
        self.graph
            .peek(object, feature)
            .expect("peek")
            .objects()
    }
}

/// Resource hook call recorded by `RecordingObserver`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Hook {
    Attached(ResourceId, ObjectId),
    Detached(ResourceId, ObjectId),
}

#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingObserver {
    hooks: Arc<Mutex<Vec<Hook>>>,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn hooks(&self) -> Vec<Hook> {
        self.hooks.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn take(&self) -> Vec<Hook> {
        self.hooks
            .lock()
            .map(|mut h| std::mem::take(&mut *h))
            .unwrap_or_default()
    }
}

impl ResourceObserver for RecordingObserver {
    fn attached(&mut self, _graph: &ModelGraph, resource: ResourceId, object: ObjectId) {
        if let Ok(mut hooks) = self.hooks.lock() {
            hooks.push(Hook::Attached(resource, object));
        }
    }

    fn detached(&mut self, _graph: &ModelGraph, resource: ResourceId, object: ObjectId) {
        if let Ok(mut hooks) = self.hooks.lock() {
            hooks.push(Hook::Detached(resource, object));
        }
    }
}

/// Create a resource with a recording observer attached
#[allow(dead_code)]
pub fn observed_resource(graph: &mut ModelGraph, uri: &str) -> (ResourceId, RecordingObserver) {
    let resource = graph.create_resource(uri).expect("create resource");
    let observer = RecordingObserver::default();
    graph
        .add_resource_observer(resource, Box::new(observer.clone()))
        .expect("add observer");
    (resource, observer)
}

/// (kind, notifier, old, new) view of a notification, for order assertions
#[allow(dead_code)]
pub fn summary(n: &Notification) -> (objgraph_core::EventKind, objgraph_core::Notifier, Value, Value) {
    (n.kind, n.notifier, n.old_value.clone(), n.new_value.clone())
}
