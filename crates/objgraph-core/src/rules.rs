//! Graph invariant checks
//!
//! `invariants` holds the individual finders; `validation` turns the first
//! finding into an error.

pub mod invariants;
pub mod validation;
