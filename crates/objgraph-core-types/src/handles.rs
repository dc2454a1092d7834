//! Stable arena handles
//!
//! Objects, resources, classes and features are addressed by small copyable
//! indices instead of pointers. Containment edges and cross references both
//! store these handles; ownership lives in the arena that issued them.

use serde::{Deserialize, Serialize};

macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(u32);

        impl $name {
            /// Build a handle from an arena index
            pub const fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            /// Arena index this handle points at
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $prefix, self.0)
            }
        }
    };
}

arena_handle!(
    /// Handle of a model object inside a graph arena
    ObjectId,
    "obj"
);

arena_handle!(
    /// Handle of a resource (persistence root) inside a graph
    ResourceId,
    "res"
);

arena_handle!(
    /// Handle of a class descriptor inside a metamodel
    ClassId,
    "class"
);

arena_handle!(
    /// Class-relative feature index (position in the class's full feature layout)
    ///
    /// This is what generated/static code uses for O(1) dispatch. The same
    /// inherited feature has the same id in a subclass only when it comes
    /// from the first supertype chain.
    FeatureId,
    "feature"
);

arena_handle!(
    /// Metamodel-wide identity of a structural feature descriptor
    ///
    /// Reflective callers address features by key; the key is translated to a
    /// `FeatureId` against the target object's class.
    FeatureKey,
    "fkey"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_round_trips_index() {
        let id = ObjectId::from_index(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.to_string(), "obj#42");
    }

    #[test]
    fn test_handles_order_by_index() {
        assert!(FeatureId::from_index(1) < FeatureId::from_index(2));
        assert_eq!(ResourceId::from_index(0).to_string(), "res#0");
    }

    #[test]
    fn test_handle_serializes_as_number() {
        let json = serde_json::to_string(&ClassId::from_index(7)).unwrap();
        assert_eq!(json, "7");
    }
}
