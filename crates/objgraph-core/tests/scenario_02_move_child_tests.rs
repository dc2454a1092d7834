/// Scenario 2: Move a child between containers
///
/// Re-parenting B from A to C clears the old edge before adding the new
/// one and dispatches the whole edit once.
mod common;

use common::{observed_resource, summary, tree, Hook};
use objgraph_core::{EventKind, Notifier, Value};

#[test]
fn test_scenario_02_happy_move_between_containers_in_one_resource() {
    // GIVEN A and C as roots of one resource and B in A.children
    let mut t = tree();
    let (resource, observer) = observed_resource(&mut t.graph, "one.model");
    let a = t.named("a");
    let b = t.named("b");
    let c = t.named("c");
    t.graph.add_root(resource, a).unwrap();
    t.graph.add_root(resource, c).unwrap();
    t.graph.add(a, t.children, b.into()).unwrap();
    observer.take();
    let log = t.listen(&[a, b, c]);

    // WHEN B is added to C.children
    t.graph.add(c, t.children, b.into()).unwrap();

    // THEN B moved
    assert!(t.list(a, t.children).is_empty());
    assert_eq!(t.list(c, t.children), vec![b]);
    assert_eq!(t.graph.peek(b, t.parent).unwrap(), Value::Object(c));

    // AND one REMOVE, the parent change and one ADD arrived, in that order
    let events: Vec<_> = log.take().iter().map(summary).collect();
    assert_eq!(
        events,
        vec![
            (EventKind::Remove, Notifier::Object(a), Value::Object(b), Value::Null),
            (EventKind::Set, Notifier::Object(b), Value::Object(a), Value::Object(c)),
            (EventKind::Add, Notifier::Object(c), Value::Null, Value::Object(b)),
        ]
    );

    // AND the resource saw no attach or detach
    assert!(observer.hooks().is_empty());
    assert_eq!(t.graph.effective_resource(b).unwrap(), Some(resource));
}

#[test]
fn test_scenario_02_happy_move_across_resources_detaches_then_attaches() {
    // GIVEN A in one resource, C in another, and B with a child under A
    let mut t = tree();
    let (first, first_observer) = observed_resource(&mut t.graph, "first.model");
    let (second, second_observer) = observed_resource(&mut t.graph, "second.model");
    let a = t.named("a");
    let c = t.named("c");
    let b = t.named("b");
    let leaf = t.named("leaf");
    t.graph.add_root(first, a).unwrap();
    t.graph.add_root(second, c).unwrap();
    t.graph.add(b, t.children, leaf.into()).unwrap();
    t.graph.add(a, t.children, b.into()).unwrap();
    first_observer.take();
    second_observer.take();

    // WHEN B moves under C
    t.graph.set(b, t.parent, c.into()).unwrap();

    // THEN the whole subtree left the first resource and entered the second
    assert_eq!(
        first_observer.take(),
        vec![Hook::Detached(first, b), Hook::Detached(first, leaf)]
    );
    assert_eq!(
        second_observer.take(),
        vec![Hook::Attached(second, b), Hook::Attached(second, leaf)]
    );
    assert_eq!(t.graph.effective_resource(leaf).unwrap(), Some(second));
}

#[test]
fn test_scenario_02_happy_move_within_same_list_reorders() {
    // GIVEN A with two children
    let mut t = tree();
    let a = t.named("a");
    let b1 = t.named("b1");
    let b2 = t.named("b2");
    t.graph.add(a, t.children, b1.into()).unwrap();
    t.graph.add(a, t.children, b2.into()).unwrap();
    let log = t.listen(&[a, b1, b2]);

    // WHEN the list is set to the reverse order
    t.graph
        .set(a, t.children, Value::List(vec![b2.into(), b1.into()]))
        .unwrap();

    // THEN a single MOVE is reported and containers are untouched
    let events = log.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Move);
    assert_eq!(t.list(a, t.children), vec![b2, b1]);
    assert_eq!(t.graph.container(b1).unwrap(), Some(a));
}
