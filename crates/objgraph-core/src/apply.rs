//! Command boundary
//!
//! `apply()` executes one `Command` against a graph. Every engine operation
//! validates before its first write, so a failing command leaves the graph
//! as it was and delivers no notifications.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use objgraph_core::{apply, Command, MetamodelBuilder, ModelGraph};
//! use objgraph_core::commands::CommandResult;
//!
//! let mut mm = MetamodelBuilder::new("tree");
//! let node = mm.class("Node");
//! let children = mm.reference(node, "children", node).many().containment().build();
//! let mut graph = ModelGraph::new(Arc::new(mm.finish().unwrap()));
//!
//! let CommandResult::Object(root) = apply(&mut graph, Command::CreateObject { class: node }).unwrap() else {
//!     unreachable!()
//! };
//! let CommandResult::Object(child) = apply(&mut graph, Command::CreateObject { class: node }).unwrap() else {
//!     unreachable!()
//! };
//! let added = apply(
//!     &mut graph,
//!     Command::Add { object: root, feature: children, value: child.into() },
//! )
//! .unwrap();
//! assert_eq!(added, CommandResult::Changed(true));
//! ```

use crate::commands::{Command, CommandResult};
use crate::engine::ModelGraph;
use crate::errors::Result;
use crate::rules::validation;

/// Apply a command to a graph
///
/// Structural commands are followed by a full invariant check in debug
/// builds; release builds trust the engine.
///
/// # Errors
///
/// Returns the engine's error for the command. See `ModelError` for the
/// full taxonomy.
pub fn apply(graph: &mut ModelGraph, cmd: Command) -> Result<CommandResult> {
    let structural = cmd.is_structural();
    let result = match cmd {
        Command::CreateObject { class } => CommandResult::Object(graph.create_object(class)?),

        Command::CreateProxy { class, uri } => CommandResult::Object(graph.create_proxy(class, uri)?),

        Command::CreateResource { uri } => CommandResult::Resource(graph.create_resource(uri)?),

        Command::Set {
            object,
            feature,
            value,
        } => {
            graph.set(object, feature, value)?;
            CommandResult::Done
        }

        Command::Unset { object, feature } => {
            graph.unset(object, feature)?;
            CommandResult::Done
        }

        Command::Add {
            object,
            feature,
            value,
        } => CommandResult::Changed(graph.add(object, feature, value)?),

        Command::Insert {
            object,
            feature,
            index,
            value,
        } => CommandResult::Changed(graph.insert(object, feature, index, value)?),

        Command::AddAll {
            object,
            feature,
            values,
        } => CommandResult::Count(graph.add_all(object, feature, values)?),

        Command::Remove {
            object,
            feature,
            value,
        } => CommandResult::Changed(graph.remove(object, feature, &value)?),

        Command::RemoveAt {
            object,
            feature,
            index,
        } => CommandResult::Removed(graph.remove_at(object, feature, index)?),

        Command::Move {
            object,
            feature,
            from,
            to,
        } => {
            graph.move_within(object, feature, from, to)?;
            CommandResult::Done
        }

        Command::Clear { object, feature } => {
            graph.clear(object, feature)?;
            CommandResult::Done
        }

        Command::AddRoot { resource, object } => CommandResult::Changed(graph.add_root(resource, object)?),

        Command::InsertRoot {
            resource,
            index,
            object,
        } => CommandResult::Changed(graph.insert_root(resource, index, object)?),

        Command::RemoveRoot { resource, object } => {
            CommandResult::Changed(graph.remove_root(resource, object)?)
        }

        Command::SetProxyUri { object, uri } => {
            graph.set_proxy_uri(object, uri)?;
            CommandResult::Done
        }

        Command::Delete { object } => {
            graph.delete(object)?;
            CommandResult::Done
        }
    };

    if structural && cfg!(debug_assertions) {
        validation::validate_graph(graph)?;
    }
    Ok(result)
}
