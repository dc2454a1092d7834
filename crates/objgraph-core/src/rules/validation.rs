use crate::engine::ModelGraph;
use crate::errors::{ModelError, Result};

use super::invariants;

/// Validate the whole graph
///
/// Runs every invariant check:
///
/// 1. Single ownership (both sides of each containment edge agree)
/// 2. No containment cycles
/// 3. Opposite symmetry for bidirectional references
/// 4. Resource root lists, direct-resource marks and id indexes agree
/// 5. Proxies carry no feature data, container or resource
///
/// # Errors
/// Returns `InvariantViolation` for the first finding. For exhaustive
/// reporting, call the individual invariant functions directly.
pub fn validate_graph(graph: &ModelGraph) -> Result<()> {
    if let Some((child, holder)) = invariants::find_ownership_violations(graph).first() {
        return Err(violation(format!(
            "containment edge {} -> {} is not mirrored on both sides",
            holder, child
        )));
    }

    for object in graph.object_ids() {
        if invariants::has_containment_cycle(graph, object) {
            return Err(violation(format!("{} is its own container", object)));
        }
    }

    if let Some((holder, feature, target)) = invariants::find_opposite_asymmetries(graph).first() {
        return Err(violation(format!(
            "{} references {} through {} but the opposite is missing",
            holder, target, feature
        )));
    }

    if let Some((resource, object)) = invariants::find_resource_mismatches(graph).first() {
        return Err(violation(format!(
            "{} and {} disagree on root membership or id index",
            resource, object
        )));
    }

    if let Some(proxy) = invariants::find_proxy_violations(graph).first() {
        return Err(violation(format!("proxy {} carries graph state", proxy)));
    }

    Ok(())
}

fn violation(reason: String) -> ModelError {
    ModelError::InvariantViolation { reason }
}
