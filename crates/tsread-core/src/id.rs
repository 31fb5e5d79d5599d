//! Strongly-typed identifiers for storage addressing.
//!
//! Coordinators and the storage contract should *not* pass raw integers around.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:016x}", self.0)
            }
        }
    };
}

new_id!(OrgId);
new_id!(BucketId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_render_as_fixed_width_hex() {
        assert_eq!(OrgId::new(0xab).to_string(), "00000000000000ab");
        assert_eq!(BucketId::new(1).get(), 1);
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&BucketId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
