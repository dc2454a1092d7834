pub mod object;
pub mod uri;
pub mod value;

pub use object::{ContainerFeatureRef, ContainerLink, ModelObject, OPPOSITE_FEATURE_BASE};
pub(crate) use object::{FeatureStorage, Slot};
pub use uri::ModelUri;
pub use value::Value;
