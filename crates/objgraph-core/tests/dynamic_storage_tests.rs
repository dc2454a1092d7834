//! Dynamic feature storage tests
//!
//! Generated classes keep every feature in static slots; dynamic classes
//! keep the features past their generated prefix in a property bag reached
//! by offset.

use std::sync::Arc;

use objgraph_core::{
    ClassId, DataType, FeatureKey, MetamodelBuilder, ModelError, ModelGraph, NotificationLog, Value,
};

struct Layers {
    graph: ModelGraph,
    base: ClassId,
    derived: ClassId,
    name: FeatureKey,
    extra: FeatureKey,
    tags: FeatureKey,
}

fn layers() -> Layers {
    let mut mm = MetamodelBuilder::new("layers");
    let base = mm.generated_class("Base");
    let name = mm.attribute(base, "name", DataType::Str).build();
    let derived = mm.class("Derived");
    mm.supertype(derived, base);
    let extra = mm
        .attribute(derived, "extra", DataType::Int)
        .default_value(7i64)
        .build();
    let tags = mm.attribute(derived, "tags", DataType::Str).many().build();
    Layers {
        graph: ModelGraph::new(Arc::new(mm.finish().unwrap())),
        base,
        derived,
        name,
        extra,
        tags,
    }
}

#[test]
fn test_generated_class_rejects_dynamic_access() {
    // GIVEN an object of a generated class
    let mut l = layers();
    let object = l.graph.create_object(l.base).unwrap();

    // WHEN the property bag is addressed
    let read = l.graph.dynamic_get(object, 0, false);
    let write = l.graph.dynamic_set(object, 0, Value::Int(1));

    // THEN both are refused
    assert_eq!(read, Err(ModelError::UnsupportedDynamicAccess { object }));
    assert_eq!(write, Err(ModelError::UnsupportedDynamicAccess { object }));

    // AND its static features work as usual
    l.graph.set(object, l.name, "base".into()).unwrap();
    assert_eq!(l.graph.peek(object, l.name).unwrap(), Value::from("base"));
}

#[test]
fn test_dynamic_offsets_follow_static_prefix() {
    // GIVEN a derived object: `name` static, `extra` and `tags` dynamic
    let mut l = layers();
    let object = l.graph.create_object(l.derived).unwrap();
    let descriptor = l.graph.metamodel().class(l.derived).unwrap();
    assert_eq!(descriptor.static_feature_count(), 1);
    assert_eq!(descriptor.dynamic_feature_count(), 2);

    // WHEN offset 0 is read before any write
    // THEN it yields the declared default of `extra`
    assert_eq!(l.graph.dynamic_get(object, 0, false).unwrap(), Value::Int(7));

    // WHEN offset 0 is written
    l.graph.dynamic_set(object, 0, Value::Int(42)).unwrap();

    // THEN reflective access by key sees the same slot
    assert_eq!(l.graph.peek(object, l.extra).unwrap(), Value::Int(42));
    assert!(l.graph.is_set(object, l.extra).unwrap());

    // AND offset 1 is the many-valued `tags`
    l.graph
        .dynamic_set(object, 1, Value::List(vec!["a".into(), "b".into()]))
        .unwrap();
    assert_eq!(l.graph.len(object, l.tags).unwrap(), 2);

    // AND unsetting through the bag restores the default
    l.graph.dynamic_unset(object, 0).unwrap();
    assert_eq!(l.graph.peek(object, l.extra).unwrap(), Value::Int(7));
    assert!(!l.graph.is_set(object, l.extra).unwrap());
}

#[test]
fn test_dynamic_offset_out_of_range() {
    // GIVEN a derived object with two dynamic features
    let mut l = layers();
    let object = l.graph.create_object(l.derived).unwrap();

    // WHEN offset 2 is read
    let result = l.graph.dynamic_get(object, 2, false);

    // THEN it is an invalid feature
    assert!(matches!(result, Err(ModelError::InvalidFeature { .. })));
}

#[test]
fn test_dynamic_writes_notify_like_static_ones() {
    // GIVEN a derived object with a listener
    let mut l = layers();
    let object = l.graph.create_object(l.derived).unwrap();
    let log = NotificationLog::new();
    l.graph.add_adapter(object, Box::new(log.clone())).unwrap();

    // WHEN the dynamic feature is set
    l.graph.dynamic_set(object, 0, Value::Int(1)).unwrap();

    // THEN one SET reports the default as the old value
    let events = log.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].old_value, Value::Int(7));
    assert_eq!(events[0].new_value, Value::Int(1));
    assert_eq!(events[0].feature_id.index(), 1);
}
