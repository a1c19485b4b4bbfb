use serde::{Deserialize, Serialize};

/// Dense id handed out by a [`Registry`](crate::registry::Registry) in
/// registration order.
pub trait DenseId: Copy + Ord + From<u32> + Into<u32> {
    fn index(self) -> usize {
        let raw: u32 = self.into();
        raw as usize
    }
}

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn new(id: u32) -> Self {
                Self(id)
            }
        }

        impl From<u32> for $name {
            fn from(id: u32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }

        impl DenseId for $name {}
    };
}

define_id!(WformId, "Id of a registered word form.");
define_id!(LemmaId, "Id of a registered lemma.");
define_id!(TagId, "Id of a registered part-of-speech tag.");
define_id!(FeatId, "Id of a registered feature name.");
define_id!(ValId, "Id of a feature value, local to its feature. `0` is the absent value `_`.");

impl ValId {
    /// The "feature absent" bucket.
    pub const ABSENT: ValId = ValId(0);
}
