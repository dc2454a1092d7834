use objgraph_core_types::ObjectId;
use serde::{Deserialize, Serialize};

/// A feature value
///
/// References hold `Object` handles; many-valued features are read back as
/// `List`. `Null` is the unset value of references and of attributes
/// without a default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object(ObjectId),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Object handles held by this value (itself, or the elements of a list)
    pub fn objects(&self) -> Vec<ObjectId> {
        match self {
            Value::Object(id) => vec![*id],
            Value::List(items) => items.iter().filter_map(Value::as_object).collect(),
            _ => Vec::new(),
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::List(_) => "list",
        }
    }

    /// Text form used for id indexes and fragment matching
    pub(crate) fn key_text(&self) -> Option<String> {
        match self {
            Value::Str(s) if !s.is_empty() => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            _ => None,
        }
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::Object(id)
    }
}

impl From<Option<ObjectId>> for Value {
    fn from(id: Option<ObjectId>) -> Self {
        id.map_or(Value::Null, Value::Object)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<ObjectId>> for Value {
    fn from(ids: Vec<ObjectId>) -> Self {
        Value::List(ids.into_iter().map(Value::Object).collect())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objects_collects_handles_from_lists() {
        let a = ObjectId::from_index(1);
        let b = ObjectId::from_index(2);
        let value = Value::List(vec![Value::Object(a), Value::Int(3), Value::Object(b)]);
        assert_eq!(value.objects(), vec![a, b]);
        assert!(Value::Null.objects().is_empty());
    }

    #[test]
    fn test_key_text_ignores_empty_strings() {
        assert_eq!(Value::from("n1").key_text(), Some("n1".to_string()));
        assert_eq!(Value::from("").key_text(), None);
        assert_eq!(Value::Int(7).key_text(), Some("7".to_string()));
        assert_eq!(Value::Bool(true).key_text(), None);
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<ObjectId>), Value::Null);
        assert_eq!(
            Value::from(Some(ObjectId::from_index(4))),
            Value::Object(ObjectId::from_index(4))
        );
    }
}
