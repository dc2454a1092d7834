use objgraph_core_types::{ClassId, FeatureId, ObjectId, ResourceId};

use super::uri::ModelUri;
use super::value::Value;

/// Baseline of the opposite-encoded container feature ids
///
/// A container feature id `<= OPPOSITE_FEATURE_BASE` encodes a feature of the
/// contained object itself as `OPPOSITE_FEATURE_BASE - local_id`.
pub const OPPOSITE_FEATURE_BASE: i32 = -1;

/// Decoded form of an object's container feature id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFeatureRef {
    /// Containment feature on the container's class (the containment has no opposite)
    Containment(FeatureId),
    /// The contained object's own feature, the opposite of the containment
    Opposite(FeatureId),
}

impl ContainerFeatureRef {
    pub fn encode(self) -> i32 {
        match self {
            ContainerFeatureRef::Containment(id) => id.index() as i32,
            ContainerFeatureRef::Opposite(id) => OPPOSITE_FEATURE_BASE - id.index() as i32,
        }
    }

    pub fn decode(raw: i32) -> Self {
        if raw <= OPPOSITE_FEATURE_BASE {
            ContainerFeatureRef::Opposite(FeatureId::from_index(
                (OPPOSITE_FEATURE_BASE - raw) as usize,
            ))
        } else {
            ContainerFeatureRef::Containment(FeatureId::from_index(raw as usize))
        }
    }
}

/// Container and container feature id, always replaced together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLink {
    pub object: ObjectId,
    pub feature_id: i32,
}

impl ContainerLink {
    pub fn feature_ref(&self) -> ContainerFeatureRef {
        ContainerFeatureRef::decode(self.feature_id)
    }
}

/// Stored state of one feature
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum Slot {
    #[default]
    Unset,
    Single(Value),
    Many(Vec<Value>),
}

impl Slot {
    pub(crate) fn is_unset(&self) -> bool {
        matches!(self, Slot::Unset)
    }

    /// Elements of a many slot; an unset slot reads as empty
    pub(crate) fn items(&self) -> &[Value] {
        match self {
            Slot::Many(items) => items,
            _ => &[],
        }
    }

    /// Make this a list slot, keeping existing elements
    pub(crate) fn items_mut(&mut self) -> &mut Vec<Value> {
        if !matches!(self, Slot::Many(_)) {
            *self = Slot::Many(Vec::new());
        }
        match self {
            Slot::Many(items) => items,
            _ => unreachable!("slot was just made a list"),
        }
    }
}

/// Static slots plus an optional dynamic property bag
///
/// Feature ids below the class's static slot count index `slots`; ids at or
/// beyond it are offsets into `dynamic`. Objects of generated classes carry
/// no bag at all.
#[derive(Debug, Clone, Default)]
pub(crate) struct FeatureStorage {
    slots: Vec<Slot>,
    dynamic: Option<Vec<Slot>>,
}

impl FeatureStorage {
    pub(crate) fn new(static_count: usize, dynamic_count: Option<usize>) -> Self {
        Self {
            slots: vec![Slot::Unset; static_count],
            dynamic: dynamic_count.map(|n| vec![Slot::Unset; n]),
        }
    }

    pub(crate) fn has_dynamic(&self) -> bool {
        self.dynamic.is_some()
    }

    pub(crate) fn slot(&self, id: FeatureId, static_count: usize) -> Option<&Slot> {
        let index = id.index();
        if index < static_count {
            self.slots.get(index)
        } else {
            self.dynamic
                .as_ref()
                .map(|bag| bag.get(index - static_count).unwrap_or(&Slot::Unset))
        }
    }

    pub(crate) fn slot_mut(&mut self, id: FeatureId, static_count: usize) -> Option<&mut Slot> {
        let index = id.index();
        if index < static_count {
            return self.slots.get_mut(index);
        }
        let bag = self.dynamic.as_mut()?;
        let offset = index - static_count;
        if offset >= bag.len() {
            bag.resize(offset + 1, Slot::Unset);
        }
        bag.get_mut(offset)
    }

    /// True when no slot holds data
    pub(crate) fn is_blank(&self) -> bool {
        self.slots.iter().all(Slot::is_unset)
            && self
                .dynamic
                .as_ref()
                .map_or(true, |bag| bag.iter().all(Slot::is_unset))
    }
}

/// A node of the object graph
///
/// Objects live in a `ModelGraph` arena and are addressed by `ObjectId`.
/// Containment is recorded on the contained side (`container`) and in the
/// container's containment feature; both are kept in step by the engine.
#[derive(Debug, Clone)]
pub struct ModelObject {
    class: ClassId,
    container: Option<ContainerLink>,
    direct_resource: Option<ResourceId>,
    proxy_uri: Option<ModelUri>,
    pub(crate) storage: FeatureStorage,
    deliver: bool,
}

impl ModelObject {
    pub(crate) fn new(class: ClassId, storage: FeatureStorage) -> Self {
        Self {
            class,
            container: None,
            direct_resource: None,
            proxy_uri: None,
            storage,
            deliver: true,
        }
    }

    pub(crate) fn new_proxy(class: ClassId, uri: ModelUri) -> Self {
        Self {
            proxy_uri: Some(uri),
            ..Self::new(class, FeatureStorage::default())
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn container(&self) -> Option<ObjectId> {
        self.container.map(|link| link.object)
    }

    pub fn container_link(&self) -> Option<ContainerLink> {
        self.container
    }

    /// Raw container feature id, meaningful only while contained
    pub fn container_feature_id(&self) -> Option<i32> {
        self.container.map(|link| link.feature_id)
    }

    /// Resource this object is a root of, if any
    pub fn direct_resource(&self) -> Option<ResourceId> {
        self.direct_resource
    }

    pub fn is_proxy(&self) -> bool {
        self.proxy_uri.is_some()
    }

    pub fn proxy_uri(&self) -> Option<&ModelUri> {
        self.proxy_uri.as_ref()
    }

    /// Whether this object delivers notifications to its adapters
    pub fn deliver(&self) -> bool {
        self.deliver
    }

    pub(crate) fn set_container_link(&mut self, link: Option<ContainerLink>) {
        self.container = link;
    }

    pub(crate) fn set_direct_resource(&mut self, resource: Option<ResourceId>) {
        self.direct_resource = resource;
    }

    pub(crate) fn set_proxy_uri(&mut self, uri: Option<ModelUri>) {
        self.proxy_uri = uri;
    }

    pub(crate) fn set_deliver(&mut self, deliver: bool) {
        self.deliver = deliver;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_feature_encoding_round_trips() {
        for raw in [-5, -2, -1, 0, 1, 7] {
            assert_eq!(ContainerFeatureRef::decode(raw).encode(), raw);
        }
        assert_eq!(
            ContainerFeatureRef::decode(-1),
            ContainerFeatureRef::Opposite(FeatureId::from_index(0))
        );
        assert_eq!(
            ContainerFeatureRef::decode(3),
            ContainerFeatureRef::Containment(FeatureId::from_index(3))
        );
    }

    #[test]
    fn test_static_storage_has_no_bag() {
        let mut storage = FeatureStorage::new(2, None);
        assert!(storage.slot(FeatureId::from_index(1), 2).is_some());
        assert!(storage.slot(FeatureId::from_index(2), 2).is_none());
        assert!(storage.slot_mut(FeatureId::from_index(2), 2).is_none());
    }

    #[test]
    fn test_dynamic_storage_grows_on_write() {
        let mut storage = FeatureStorage::new(1, Some(0));
        let slot = storage.slot_mut(FeatureId::from_index(3), 1).unwrap();
        *slot = Slot::Single(Value::Int(1));
        assert_eq!(
            storage.slot(FeatureId::from_index(3), 1),
            Some(&Slot::Single(Value::Int(1)))
        );
        assert!(!storage.is_blank());
    }

    #[test]
    fn test_proxy_has_blank_storage() {
        let proxy = ModelObject::new_proxy(ClassId::from_index(0), ModelUri::parse("a#b"));
        assert!(proxy.is_proxy());
        assert!(proxy.storage.is_blank());
        assert_eq!(proxy.container(), None);
    }
}
