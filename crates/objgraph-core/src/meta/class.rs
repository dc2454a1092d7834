use std::collections::{HashMap, HashSet};

use objgraph_core_types::{ClassId, FeatureId, FeatureKey};

/// Class descriptor
///
/// `features` is the full layout: inherited features first (depth-first over
/// the supertypes, first occurrence wins), then the class's own. A feature's
/// `FeatureId` on this class is its position in that layout.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
    pub(crate) id: ClassId,
    pub(crate) name: String,
    pub(crate) is_abstract: bool,
    pub(crate) generated: bool,
    pub(crate) supertypes: Vec<ClassId>,
    pub(crate) features: Vec<FeatureKey>,
    pub(crate) feature_ids: HashMap<FeatureKey, FeatureId>,
    pub(crate) feature_names: HashMap<String, FeatureId>,
    pub(crate) ancestors: HashSet<ClassId>,
    pub(crate) static_feature_count: usize,
    pub(crate) id_attribute: Option<FeatureId>,
}

impl ClassDescriptor {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Generated classes keep every feature in static slots and have no property bag
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn has_dynamic_storage(&self) -> bool {
        !self.generated
    }

    pub fn supertypes(&self) -> &[ClassId] {
        &self.supertypes
    }

    /// All features in layout order
    pub fn features(&self) -> &[FeatureKey] {
        &self.features
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn static_feature_count(&self) -> usize {
        self.static_feature_count
    }

    pub fn dynamic_feature_count(&self) -> usize {
        self.features.len() - self.static_feature_count
    }

    pub fn feature_key(&self, id: FeatureId) -> Option<FeatureKey> {
        self.features.get(id.index()).copied()
    }

    pub fn feature_id(&self, key: FeatureKey) -> Option<FeatureId> {
        self.feature_ids.get(&key).copied()
    }

    pub fn feature_id_by_name(&self, name: &str) -> Option<FeatureId> {
        self.feature_names.get(name).copied()
    }

    /// Attribute whose value identifies instances inside a resource
    pub fn id_attribute(&self) -> Option<FeatureId> {
        self.id_attribute
    }

    /// Whether this class is `other` or inherits from it
    pub fn conforms_to(&self, other: ClassId) -> bool {
        self.ancestors.contains(&other)
    }
}
