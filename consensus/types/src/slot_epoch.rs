//! The `Slot` and `Epoch` wrapper types are defined here. They're wrapped newtypes over `u64` to
//! avoid accidental mixing of the two units, which are only convertible via `SLOTS_PER_EPOCH`.

use ethereum_ssz_derive::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Deref, Sub, SubAssign};
use tree_hash::TreeHash;

/// Macro to implement a newtype wrapper over `u64` with the arithmetic lighthouse relies on
/// throughout the node: saturating subtraction, `Display`, `Deref`, and SSZ/tree-hash passthrough.
macro_rules! impl_u64_wrapper {
    ($name: ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
            Encode,
            Decode,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(n: u64) -> Self {
                Self(n)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub fn saturating_sub(&self, other: impl Into<Self>) -> Self {
                Self(self.0.saturating_sub(other.into().0))
            }

            pub fn saturating_add(&self, other: impl Into<Self>) -> Self {
                Self(self.0.saturating_add(other.into().0))
            }

            pub fn checked_sub(&self, other: impl Into<Self>) -> Option<Self> {
                self.0.checked_sub(other.into().0).map(Self)
            }

            pub fn safe_add(&self, other: impl Into<Self>) -> Result<Self, safe_arith::ArithError> {
                use safe_arith::SafeArith;
                Ok(Self(self.0.safe_add(other.into().0)?))
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                Self(n)
            }
        }

        impl From<$name> for u64 {
            fn from(n: $name) -> u64 {
                n.0
            }
        }

        impl Deref for $name {
            type Target = u64;
            fn deref(&self) -> &u64 {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Add<u64> for $name {
            type Output = Self;
            fn add(self, rhs: u64) -> Self {
                Self(self.0 + rhs)
            }
        }

        impl Sub<u64> for $name {
            type Output = Self;
            fn sub(self, rhs: u64) -> Self {
                Self(self.0 - rhs)
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl AddAssign<u64> for $name {
            fn add_assign(&mut self, rhs: u64) {
                self.0 += rhs;
            }
        }

        impl SubAssign<u64> for $name {
            fn sub_assign(&mut self, rhs: u64) {
                self.0 -= rhs;
            }
        }

        impl TreeHash for $name {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                u64::tree_hash_type()
            }
            fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
                self.0.tree_hash_packed_encoding()
            }
            fn tree_hash_packing_factor() -> usize {
                u64::tree_hash_packing_factor()
            }
            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                self.0.tree_hash_root()
            }
        }
    };
}

impl_u64_wrapper!(Slot);
impl_u64_wrapper!(Epoch);

/// The first slot of the chain, by definition.
pub const GENESIS_SLOT: Slot = Slot::new(0);
/// The first epoch of the chain, by definition.
pub const GENESIS_EPOCH: Epoch = Epoch::new(0);
/// An epoch number that will not be reached in practice; used as a sentinel for "not yet set".
pub const FAR_FUTURE_EPOCH: Epoch = Epoch::new(u64::MAX);

impl Slot {
    /// Returns the epoch that contains this slot, given `slots_per_epoch`.
    pub fn epoch(&self, slots_per_epoch: u64) -> Epoch {
        Epoch::new(self.0 / slots_per_epoch)
    }

    /// Returns true if this slot is the first slot of its epoch.
    pub fn is_epoch_start(&self, slots_per_epoch: u64) -> bool {
        self.0 % slots_per_epoch == 0
    }
}

impl Epoch {
    /// Returns the first slot of this epoch.
    pub fn start_slot(&self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0 * slots_per_epoch)
    }

    /// Returns true iff `self` and `other` have the same parity (both even or both odd), which
    /// is how the subnet rotation buckets are indexed.
    pub fn parity(&self) -> usize {
        (self.0 % 2) as usize
    }
}
