use objgraph_core_types::{ClassId, FeatureKey};
use serde::{Deserialize, Serialize};

use crate::model::Value;

/// Attribute data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int,
    Float,
    Str,
    /// Any non-object value
    Any,
}

impl DataType {
    /// Whether `value` is a legal single element of this type (`Null` always is)
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (DataType::Bool, Value::Bool(_))
            | (DataType::Int, Value::Int(_))
            | (DataType::Float, Value::Float(_) | Value::Int(_))
            | (DataType::Str, Value::Str(_)) => true,
            (DataType::Any, v) => !matches!(v, Value::Object(_) | Value::List(_)),
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Str => "string",
            DataType::Any => "any",
        }
    }
}

/// Behavioural kind of a feature, resolved once when the metamodel is finished
///
/// The engine dispatches on this instead of re-reading the flags at every
/// access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    SingleAttribute,
    ManyAttribute,
    SingleContainment,
    ManyContainment,
    /// Single reference whose opposite is a containment (e.g. `parent`)
    Container,
    SingleReference,
    ManyReference,
}

impl FeatureKind {
    pub fn is_many(&self) -> bool {
        matches!(
            self,
            FeatureKind::ManyAttribute | FeatureKind::ManyContainment | FeatureKind::ManyReference
        )
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self, FeatureKind::SingleAttribute | FeatureKind::ManyAttribute)
    }

    pub fn is_containment(&self) -> bool {
        matches!(self, FeatureKind::SingleContainment | FeatureKind::ManyContainment)
    }
}

/// Attribute or reference specifics
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureShape {
    Attribute {
        data_type: DataType,
    },
    Reference {
        target: ClassId,
        containment: bool,
        resolve_proxies: bool,
    },
}

/// Static descriptor of a structural feature
///
/// Descriptors are owned by a `Metamodel` and addressed by `FeatureKey`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralFeature {
    pub(crate) key: FeatureKey,
    pub(crate) name: String,
    pub(crate) containing_class: ClassId,
    pub(crate) shape: FeatureShape,
    pub(crate) many: bool,
    pub(crate) unique: bool,
    pub(crate) changeable: bool,
    pub(crate) unsettable: bool,
    pub(crate) transient: bool,
    pub(crate) opposite: Option<FeatureKey>,
    pub(crate) default_value: Option<Value>,
    pub(crate) kind: FeatureKind,
    pub(crate) qualified_name: String,
}

impl StructuralFeature {
    pub fn key(&self) -> FeatureKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Class.feature`, used in errors and logs
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Class that declares this feature
    pub fn containing_class(&self) -> ClassId {
        self.containing_class
    }

    pub fn shape(&self) -> &FeatureShape {
        &self.shape
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    pub fn is_many(&self) -> bool {
        self.many
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_changeable(&self) -> bool {
        self.changeable
    }

    pub fn is_unsettable(&self) -> bool {
        self.unsettable
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self.shape, FeatureShape::Attribute { .. })
    }

    pub fn is_reference(&self) -> bool {
        !self.is_attribute()
    }

    pub fn is_containment(&self) -> bool {
        matches!(
            self.shape,
            FeatureShape::Reference {
                containment: true,
                ..
            }
        )
    }

    pub fn is_container(&self) -> bool {
        self.kind == FeatureKind::Container
    }

    pub fn resolves_proxies(&self) -> bool {
        matches!(
            self.shape,
            FeatureShape::Reference {
                resolve_proxies: true,
                ..
            }
        )
    }

    pub fn opposite(&self) -> Option<FeatureKey> {
        self.opposite
    }

    /// Whether writes must update the other end (containment or bidirectional)
    pub fn has_inverse(&self) -> bool {
        self.is_containment() || self.opposite.is_some()
    }

    pub fn reference_target(&self) -> Option<ClassId> {
        match self.shape {
            FeatureShape::Reference { target, .. } => Some(target),
            FeatureShape::Attribute { .. } => None,
        }
    }

    pub fn data_type(&self) -> Option<DataType> {
        match self.shape {
            FeatureShape::Attribute { data_type } => Some(data_type),
            FeatureShape::Reference { .. } => None,
        }
    }

    /// Value read back when a single-valued feature is unset
    pub fn default_value(&self) -> Value {
        self.default_value.clone().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_acceptance() {
        assert!(DataType::Int.accepts(&Value::Int(3)));
        assert!(DataType::Float.accepts(&Value::Int(3)));
        assert!(!DataType::Int.accepts(&Value::Str("3".into())));
        assert!(DataType::Str.accepts(&Value::Null));
        assert!(DataType::Any.accepts(&Value::Bool(false)));
        assert!(!DataType::Any.accepts(&Value::List(vec![])));
    }

    #[test]
    fn test_kind_predicates() {
        assert!(FeatureKind::ManyContainment.is_many());
        assert!(FeatureKind::ManyContainment.is_containment());
        assert!(!FeatureKind::Container.is_containment());
        assert!(FeatureKind::SingleAttribute.is_attribute());
    }
}
