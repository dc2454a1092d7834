use std::collections::{HashMap, HashSet};

use objgraph_core_types::{ClassId, FeatureId, FeatureKey};

use super::class::ClassDescriptor;
use super::feature::{DataType, FeatureKind, FeatureShape, StructuralFeature};
use crate::errors::{ModelError, Result};
use crate::model::Value;

/// Immutable registry of classes and features
///
/// There is no process-wide registry: a metamodel is built once with a
/// `MetamodelBuilder` and handed (usually as `Arc<Metamodel>`) to every
/// graph that instantiates it.
#[derive(Debug, Clone)]
pub struct Metamodel {
    name: String,
    classes: Vec<ClassDescriptor>,
    features: Vec<StructuralFeature>,
    class_names: HashMap<String, ClassId>,
}

impl Metamodel {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a class descriptor
    ///
    /// # Errors
    ///
    /// Returns `ClassNotFound` if the id was not issued by this metamodel.
    pub fn class(&self, id: ClassId) -> Result<&ClassDescriptor> {
        self.classes
            .get(id.index())
            .ok_or_else(|| ModelError::ClassNotFound {
                class: id.to_string(),
            })
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_names.get(name).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDescriptor> {
        self.classes.iter()
    }

    /// Get a feature descriptor by key
    ///
    /// # Errors
    ///
    /// Returns `InvalidFeature` if the key was not issued by this metamodel.
    pub fn feature(&self, key: FeatureKey) -> Result<&StructuralFeature> {
        self.features
            .get(key.index())
            .ok_or_else(|| ModelError::InvalidFeature {
                class: self.name.clone(),
                feature: key.to_string(),
            })
    }

    /// Get the descriptor at a class-relative feature id
    ///
    /// # Errors
    ///
    /// Returns `InvalidFeature` if `id` is out of range for the class.
    pub fn feature_of(&self, class: ClassId, id: FeatureId) -> Result<&StructuralFeature> {
        let descriptor = self.class(class)?;
        let key = descriptor
            .feature_key(id)
            .ok_or_else(|| ModelError::InvalidFeature {
                class: descriptor.name.clone(),
                feature: id.to_string(),
            })?;
        self.feature(key)
    }

    /// Translate a feature key into the class-relative id
    ///
    /// # Errors
    ///
    /// Returns `InvalidFeature` if the feature does not belong to the class.
    pub fn feature_id(&self, class: ClassId, key: FeatureKey) -> Result<FeatureId> {
        let descriptor = self.class(class)?;
        descriptor
            .feature_id(key)
            .ok_or_else(|| ModelError::InvalidFeature {
                class: descriptor.name.clone(),
                feature: self
                    .features
                    .get(key.index())
                    .map_or_else(|| key.to_string(), |f| f.qualified_name.clone()),
            })
    }

    /// Look a feature up by name on a class (including inherited features)
    pub fn find_feature(&self, class: ClassId, name: &str) -> Option<FeatureKey> {
        let descriptor = self.classes.get(class.index())?;
        descriptor
            .feature_id_by_name(name)
            .and_then(|id| descriptor.feature_key(id))
    }

    /// Whether `sub` is `sup` or one of its subclasses
    pub fn conforms(&self, sub: ClassId, sup: ClassId) -> bool {
        self.classes
            .get(sub.index())
            .is_some_and(|c| c.conforms_to(sup))
    }
}

struct ClassDraft {
    name: String,
    is_abstract: bool,
    generated: bool,
    supertypes: Vec<ClassId>,
    own: Vec<FeatureKey>,
}

/// Builder for a `Metamodel`
///
/// ```
/// use objgraph_core::{DataType, MetamodelBuilder};
///
/// let mut mm = MetamodelBuilder::new("tree");
/// let node = mm.class("Node");
/// mm.attribute(node, "name", DataType::Str).build();
/// let children = mm.reference(node, "children", node).many().containment().build();
/// let parent = mm.reference(node, "parent", node).build();
/// mm.opposites(children, parent);
/// let metamodel = mm.finish().unwrap();
/// assert!(metamodel.feature(parent).unwrap().is_container());
/// ```
pub struct MetamodelBuilder {
    name: String,
    classes: Vec<ClassDraft>,
    features: Vec<StructuralFeature>,
    id_attributes: HashSet<FeatureKey>,
    opposites: Vec<(FeatureKey, FeatureKey)>,
}

impl MetamodelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
            features: Vec::new(),
            id_attributes: HashSet::new(),
            opposites: Vec::new(),
        }
    }

    fn push_class(&mut self, name: &str, is_abstract: bool, generated: bool) -> ClassId {
        let id = ClassId::from_index(self.classes.len());
        self.classes.push(ClassDraft {
            name: name.to_string(),
            is_abstract,
            generated,
            supertypes: Vec::new(),
            own: Vec::new(),
        });
        id
    }

    /// Declare a dynamic class (features beyond its generated prefix live in a property bag)
    pub fn class(&mut self, name: &str) -> ClassId {
        self.push_class(name, false, false)
    }

    pub fn abstract_class(&mut self, name: &str) -> ClassId {
        self.push_class(name, true, false)
    }

    /// Declare a generated class: all features in static slots, no property bag
    pub fn generated_class(&mut self, name: &str) -> ClassId {
        self.push_class(name, false, true)
    }

    pub fn supertype(&mut self, class: ClassId, supertype: ClassId) -> &mut Self {
        if let Some(draft) = self.classes.get_mut(class.index()) {
            draft.supertypes.push(supertype);
        }
        self
    }

    pub fn attribute(&mut self, class: ClassId, name: &str, data_type: DataType) -> FeatureBuilder<'_> {
        self.feature_builder(class, name, FeatureShape::Attribute { data_type })
    }

    pub fn reference(&mut self, class: ClassId, name: &str, target: ClassId) -> FeatureBuilder<'_> {
        self.feature_builder(
            class,
            name,
            FeatureShape::Reference {
                target,
                containment: false,
                resolve_proxies: true,
            },
        )
    }

    fn feature_builder(&mut self, class: ClassId, name: &str, shape: FeatureShape) -> FeatureBuilder<'_> {
        let key = FeatureKey::from_index(self.features.len());
        let class_name = self
            .classes
            .get(class.index())
            .map_or("?", |c| c.name.as_str());
        let feature = StructuralFeature {
            key,
            name: name.to_string(),
            containing_class: class,
            shape,
            many: false,
            unique: true,
            changeable: true,
            unsettable: false,
            transient: false,
            opposite: None,
            default_value: None,
            kind: FeatureKind::SingleAttribute,
            qualified_name: format!("{}.{}", class_name, name),
        };
        FeatureBuilder {
            builder: self,
            feature,
            is_id: false,
        }
    }

    /// Pair two references as each other's opposite
    pub fn opposites(&mut self, a: FeatureKey, b: FeatureKey) -> &mut Self {
        self.opposites.push((a, b));
        self
    }

    /// Validate the declarations and freeze them into a `Metamodel`
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetamodel` for unknown classes, inheritance cycles,
    /// duplicate names, malformed opposites, containments whose opposite is
    /// many-valued or another containment, bad id attributes, and generated
    /// classes extending dynamic ones.
    pub fn finish(self) -> Result<Metamodel> {
        let MetamodelBuilder {
            name,
            classes: drafts,
            mut features,
            id_attributes,
            opposites,
        } = self;

        let invalid = |reason: String| ModelError::InvalidMetamodel { reason };

        let mut class_names = HashMap::new();
        for (index, draft) in drafts.iter().enumerate() {
            if class_names
                .insert(draft.name.clone(), ClassId::from_index(index))
                .is_some()
            {
                return Err(invalid(format!("duplicate class name {}", draft.name)));
            }
            for sup in &draft.supertypes {
                if sup.index() >= drafts.len() {
                    return Err(invalid(format!("{} extends unknown {}", draft.name, sup)));
                }
            }
        }

        // Attach features to their classes
        let mut owned: Vec<Vec<FeatureKey>> = drafts.iter().map(|d| d.own.clone()).collect();
        for feature in &features {
            let class = feature.containing_class.index();
            let slot = owned
                .get_mut(class)
                .ok_or_else(|| invalid(format!("{} declared on unknown class", feature.name)))?;
            slot.push(feature.key);
            if let FeatureShape::Reference { target, .. } = feature.shape {
                if target.index() >= drafts.len() {
                    return Err(invalid(format!(
                        "{} targets unknown {}",
                        feature.qualified_name, target
                    )));
                }
            }
        }

        // Ancestors, with cycle detection
        let mut ancestors: Vec<HashSet<ClassId>> = Vec::with_capacity(drafts.len());
        for index in 0..drafts.len() {
            let start = ClassId::from_index(index);
            let mut seen = HashSet::new();
            let mut stack = vec![start];
            while let Some(class) = stack.pop() {
                if !seen.insert(class) {
                    continue;
                }
                for sup in &drafts[class.index()].supertypes {
                    if *sup == start {
                        return Err(invalid(format!(
                            "inheritance cycle through {}",
                            drafts[index].name
                        )));
                    }
                    stack.push(*sup);
                }
            }
            ancestors.push(seen);
        }

        // Opposites
        for (a, b) in opposites {
            if a == b {
                return Err(invalid(format!("{} cannot be its own opposite", a)));
            }
            for (this, other) in [(a, b), (b, a)] {
                let feature = features
                    .get_mut(this.index())
                    .ok_or_else(|| invalid(format!("unknown feature {}", this)))?;
                if feature.is_attribute() {
                    return Err(invalid(format!(
                        "attribute {} cannot have an opposite",
                        feature.qualified_name
                    )));
                }
                if feature.opposite.is_some_and(|existing| existing != other) {
                    return Err(invalid(format!(
                        "{} already has an opposite",
                        feature.qualified_name
                    )));
                }
                feature.opposite = Some(other);
            }
        }

        for index in 0..features.len() {
            let feature = &features[index];
            let Some(opposite_key) = feature.opposite else {
                continue;
            };
            let opposite = &features[opposite_key.index()];
            let target = feature.reference_target().unwrap_or(feature.containing_class);
            if !ancestors[target.index()].contains(&opposite.containing_class) {
                return Err(invalid(format!(
                    "{} targets a class without its opposite {}",
                    feature.qualified_name, opposite.qualified_name
                )));
            }
            if feature.is_containment() && (opposite.is_containment() || opposite.many) {
                return Err(invalid(format!(
                    "containment {} needs a single-valued non-containment opposite",
                    feature.qualified_name
                )));
            }
        }

        // Kinds
        let kinds: Vec<FeatureKind> = features
            .iter()
            .map(|f| {
                let opposite_is_containment = f
                    .opposite
                    .is_some_and(|o| features[o.index()].is_containment());
                match (&f.shape, f.many) {
                    (FeatureShape::Attribute { .. }, false) => FeatureKind::SingleAttribute,
                    (FeatureShape::Attribute { .. }, true) => FeatureKind::ManyAttribute,
                    (FeatureShape::Reference { containment: true, .. }, false) => {
                        FeatureKind::SingleContainment
                    }
                    (FeatureShape::Reference { containment: true, .. }, true) => {
                        FeatureKind::ManyContainment
                    }
                    _ if opposite_is_containment => FeatureKind::Container,
                    (_, false) => FeatureKind::SingleReference,
                    (_, true) => FeatureKind::ManyReference,
                }
            })
            .collect();
        for (feature, kind) in features.iter_mut().zip(kinds) {
            feature.kind = kind;
            if feature.is_containment() || feature.opposite.is_some() {
                feature.unique = true;
            }
        }

        for key in &id_attributes {
            let feature = &features[key.index()];
            let ok = matches!(
                feature.shape,
                FeatureShape::Attribute {
                    data_type: DataType::Str | DataType::Int | DataType::Any
                }
            ) && !feature.many;
            if !ok {
                return Err(invalid(format!(
                    "id attribute {} must be a single string or int",
                    feature.qualified_name
                )));
            }
        }

        // Layouts
        let mut layouts: Vec<Option<Vec<FeatureKey>>> = vec![None; drafts.len()];
        for index in 0..drafts.len() {
            compute_layout(index, &drafts, &owned, &mut layouts);
        }

        let mut classes = Vec::with_capacity(drafts.len());
        for (index, draft) in drafts.iter().enumerate() {
            let layout = layouts[index].clone().unwrap_or_default();

            if draft.generated {
                if let Some(sup) = draft.supertypes.iter().find(|s| !drafts[s.index()].generated) {
                    return Err(invalid(format!(
                        "generated class {} extends dynamic class {}",
                        draft.name,
                        drafts[sup.index()].name
                    )));
                }
            }
            let static_feature_count = if draft.generated {
                layout.len()
            } else {
                draft
                    .supertypes
                    .first()
                    .filter(|s| drafts[s.index()].generated)
                    .and_then(|s| layouts[s.index()].as_ref())
                    .map_or(0, Vec::len)
            };

            let mut feature_ids = HashMap::new();
            let mut feature_names = HashMap::new();
            let mut id_attribute = None;
            for (position, key) in layout.iter().enumerate() {
                let id = FeatureId::from_index(position);
                feature_ids.insert(*key, id);
                let feature = &features[key.index()];
                if feature_names.insert(feature.name.clone(), id).is_some() {
                    return Err(invalid(format!(
                        "class {} has two features named {}",
                        draft.name, feature.name
                    )));
                }
                if id_attribute.is_none() && id_attributes.contains(key) {
                    id_attribute = Some(id);
                }
            }

            classes.push(ClassDescriptor {
                id: ClassId::from_index(index),
                name: draft.name.clone(),
                is_abstract: draft.is_abstract,
                generated: draft.generated,
                supertypes: draft.supertypes.clone(),
                features: layout,
                feature_ids,
                feature_names,
                ancestors: ancestors[index].clone(),
                static_feature_count,
                id_attribute,
            });
        }

        Ok(Metamodel {
            name,
            classes,
            features,
            class_names,
        })
    }
}

fn compute_layout(
    index: usize,
    drafts: &[ClassDraft],
    owned: &[Vec<FeatureKey>],
    layouts: &mut Vec<Option<Vec<FeatureKey>>>,
) -> Vec<FeatureKey> {
    if let Some(layout) = &layouts[index] {
        return layout.clone();
    }
    let mut layout: Vec<FeatureKey> = Vec::new();
    for sup in &drafts[index].supertypes {
        for key in compute_layout(sup.index(), drafts, owned, layouts) {
            if !layout.contains(&key) {
                layout.push(key);
            }
        }
    }
    layout.extend(owned[index].iter().copied());
    layouts[index] = Some(layout.clone());
    layout
}

/// Fluent declaration of one feature; `build()` registers it
pub struct FeatureBuilder<'a> {
    builder: &'a mut MetamodelBuilder,
    feature: StructuralFeature,
    is_id: bool,
}

impl FeatureBuilder<'_> {
    pub fn many(mut self) -> Self {
        self.feature.many = true;
        self
    }

    /// Make this reference a containment (proxies not resolved unless asked)
    pub fn containment(mut self) -> Self {
        if let FeatureShape::Reference {
            containment,
            resolve_proxies,
            ..
        } = &mut self.feature.shape
        {
            *containment = true;
            *resolve_proxies = false;
        }
        self
    }

    pub fn resolve_proxies(mut self, resolve: bool) -> Self {
        if let FeatureShape::Reference {
            resolve_proxies, ..
        } = &mut self.feature.shape
        {
            *resolve_proxies = resolve;
        }
        self
    }

    pub fn unsettable(mut self) -> Self {
        self.feature.unsettable = true;
        self
    }

    pub fn transient(mut self) -> Self {
        self.feature.transient = true;
        self
    }

    pub fn unchangeable(mut self) -> Self {
        self.feature.changeable = false;
        self
    }

    pub fn non_unique(mut self) -> Self {
        self.feature.unique = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.feature.default_value = Some(value.into());
        self
    }

    /// Mark this attribute as the class's identifier
    pub fn id(mut self) -> Self {
        self.is_id = true;
        self
    }

    pub fn build(self) -> FeatureKey {
        let key = self.feature.key;
        if self.is_id {
            self.builder.id_attributes.insert(key);
        }
        self.builder.features.push(self.feature);
        key
    }
}
