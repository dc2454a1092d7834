//! Core types shared across the objgraph crates
//!
//! This crate provides the leaf types every other layer depends on:
//!
//! - **Handles**: ObjectId, ResourceId, ClassId, FeatureId, FeatureKey
//! - **Schema constants**: Canonical field keys and event names for logging

pub mod handles;
pub mod schema;

pub use handles::{ClassId, FeatureId, FeatureKey, ObjectId, ResourceId};
