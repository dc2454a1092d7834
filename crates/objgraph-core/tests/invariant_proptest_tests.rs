//! Property tests: arbitrary edit sequences keep the graph consistent
//!
//! Random commands are pushed through `apply`; refusals are fine, but after
//! every step ownership, opposite symmetry, resource bookkeeping and the
//! proxy contract must all hold.

mod common;

use common::{tree, Tree};
use objgraph_core::rules::invariants::{
    find_opposite_asymmetries, find_ownership_violations, find_proxy_violations,
    find_resource_mismatches, has_containment_cycle,
};
use objgraph_core::{apply, Command, FeatureKey, ModelUri, ObjectId, ResourceId, Value};
use proptest::prelude::*;

const NODES: usize = 6;
const RESOURCES: usize = 2;

#[derive(Clone, Debug)]
enum Step {
    Add { holder: usize, feature: usize, target: usize },
    Set { holder: usize, feature: usize, target: Option<usize> },
    Unset { holder: usize, feature: usize },
    RemoveAt { holder: usize, feature: usize, index: usize },
    Move { holder: usize, feature: usize, from: usize, to: usize },
    AddRoot { resource: usize, node: usize },
    RemoveRoot { resource: usize, node: usize },
    Delete { node: usize },
    Resolve { holder: usize },
    ClearProxy,
    MakeProxy { node: usize },
}

fn arb_node() -> impl Strategy<Value = usize> {
    0..NODES
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (arb_node(), 0..4usize, arb_node())
            .prop_map(|(holder, feature, target)| Step::Add { holder, feature, target }),
        3 => (arb_node(), 0..4usize, prop::option::of(arb_node()))
            .prop_map(|(holder, feature, target)| Step::Set { holder, feature, target }),
        1 => (arb_node(), 0..8usize).prop_map(|(holder, feature)| Step::Unset { holder, feature }),
        1 => (arb_node(), 0..4usize, 0..3usize)
            .prop_map(|(holder, feature, index)| Step::RemoveAt { holder, feature, index }),
        1 => (arb_node(), 0..4usize, 0..3usize, 0..3usize)
            .prop_map(|(holder, feature, from, to)| Step::Move { holder, feature, from, to }),
        2 => (0..RESOURCES, arb_node()).prop_map(|(resource, node)| Step::AddRoot { resource, node }),
        1 => (0..RESOURCES, arb_node()).prop_map(|(resource, node)| Step::RemoveRoot { resource, node }),
        1 => arb_node().prop_map(|node| Step::Delete { node }),
        2 => arb_node().prop_map(|holder| Step::Resolve { holder }),
        1 => Just(Step::ClearProxy),
        1 => arb_node().prop_map(|node| Step::MakeProxy { node }),
    ]
}

struct World {
    t: Tree,
    nodes: Vec<ObjectId>,
    resources: Vec<ResourceId>,
}

fn world() -> World {
    let mut t = tree();
    let resources = (0..RESOURCES)
        .map(|i| t.graph.create_resource(format!("r{}.model", i)).unwrap())
        .collect();
    let mut nodes: Vec<ObjectId> = (0..NODES - 1).map(|i| t.named(&format!("n{}", i))).collect();
    // The last node is a proxy for the first root of r0
    nodes.push(t.graph.create_proxy(t.node, "r0.model#/").unwrap());
    World { t, nodes, resources }
}

impl World {
    /// List features, then single ones; index wraps per group
    fn list_feature(&self, index: usize) -> FeatureKey {
        [self.t.children, self.t.friends, self.t.refs, self.t.parts][index % 4]
    }

    fn single_feature(&self, index: usize) -> FeatureKey {
        [self.t.parent, self.t.slot, self.t.best, self.t.best_of][index % 4]
    }

    fn any_feature(&self, index: usize) -> FeatureKey {
        [
            self.t.children,
            self.t.friends,
            self.t.refs,
            self.t.parts,
            self.t.parent,
            self.t.slot,
            self.t.best,
            self.t.name,
        ][index % 8]
    }

    fn command(&self, step: &Step) -> Option<Command> {
        let node = |i: usize| self.nodes[i];
        Some(match *step {
            Step::Add { holder, feature, target } => Command::Add {
                object: node(holder),
                feature: self.list_feature(feature),
                value: node(target).into(),
            },
            Step::Set { holder, feature, target } => Command::Set {
                object: node(holder),
                feature: self.single_feature(feature),
                value: Value::from(target.map(node)),
            },
            Step::Unset { holder, feature } => Command::Unset {
                object: node(holder),
                feature: self.any_feature(feature),
            },
            Step::RemoveAt { holder, feature, index } => Command::RemoveAt {
                object: node(holder),
                feature: self.list_feature(feature),
                index,
            },
            Step::Move { holder, feature, from, to } => Command::Move {
                object: node(holder),
                feature: self.list_feature(feature),
                from,
                to,
            },
            Step::AddRoot { resource, node: n } => Command::AddRoot {
                resource: self.resources[resource],
                object: node(n),
            },
            Step::RemoveRoot { resource, node: n } => Command::RemoveRoot {
                resource: self.resources[resource],
                object: node(n),
            },
            Step::Delete { node: n } => Command::Delete { object: node(n) },
            Step::ClearProxy => Command::SetProxyUri {
                object: node(NODES - 1),
                uri: None,
            },
            Step::MakeProxy { node: n } => Command::SetProxyUri {
                object: node(n),
                uri: Some(ModelUri::parse("r0.model#/")),
            },
            Step::Resolve { .. } => return None,
        })
    }

    fn run(&mut self, step: &Step) {
        match self.command(step) {
            Some(cmd) => {
                let _ = apply(&mut self.t.graph, cmd);
            }
            None => {
                if let Step::Resolve { holder } = *step {
                    let object = self.nodes[holder];
                    for feature in [self.t.refs, self.t.friends, self.t.best, self.t.parts] {
                        let _ = self.t.graph.get(object, feature, true);
                    }
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_edit_sequences_preserve_invariants(steps in prop::collection::vec(arb_step(), 1..40)) {
        let mut w = world();
        for step in &steps {
            w.run(step);

            let graph = &w.t.graph;
            prop_assert!(find_ownership_violations(graph).is_empty(), "ownership after {:?}", step);
            prop_assert!(find_opposite_asymmetries(graph).is_empty(), "opposites after {:?}", step);
            prop_assert!(find_resource_mismatches(graph).is_empty(), "resources after {:?}", step);
            prop_assert!(find_proxy_violations(graph).is_empty(), "proxy after {:?}", step);
            for node in &w.nodes {
                prop_assert!(!has_containment_cycle(graph, *node), "cycle after {:?}", step);
            }
        }
    }

    #[test]
    fn prop_contained_objects_share_container_resource(steps in prop::collection::vec(arb_step(), 1..30)) {
        let mut w = world();
        for step in &steps {
            w.run(step);
        }

        let graph = &w.t.graph;
        for node in &w.nodes {
            if let Some(container) = graph.container(*node).unwrap() {
                if graph.direct_resource(*node).unwrap().is_none() {
                    prop_assert_eq!(
                        graph.effective_resource(*node).unwrap(),
                        graph.effective_resource(container).unwrap()
                    );
                }
            }
        }
    }
}
