//! Metamodel: class and feature descriptors
//!
//! Descriptors are static metadata consulted by every mutation. They are
//! built once through `MetamodelBuilder` and never change afterwards.

pub mod class;
pub mod feature;
pub mod registry;

pub use class::ClassDescriptor;
pub use feature::{DataType, FeatureKind, FeatureShape, StructuralFeature};
pub use registry::{FeatureBuilder, Metamodel, MetamodelBuilder};
