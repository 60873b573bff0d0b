//! # Signatures
//!
//! A signature is a 64-bit set of component types. Each registered component
//! type owns exactly one bit, so a world supports at most 64 of them.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Maximum number of component types per world.
pub const MAX_COMPONENT_TYPES: u32 = u64::BITS;

/// Bitmask describing a set of component types.
///
/// Compose with `|`; test containment with [`Signature::contains`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Signature(u64);

impl Signature {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Builds a signature from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether every component in `other` is also in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `self` with every component of `other` removed.
    #[inline]
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Whether no component is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of component types in the set.
    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }
}

impl BitOr for Signature {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Signature {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Signature {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Binary for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}

/// Hands out single-bit signatures, lowest bit first.
#[derive(Debug)]
pub struct SignatureAllocator {
    next: Option<Signature>,
}

impl Default for SignatureAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureAllocator {
    /// Creates an allocator whose first signature is bit 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: Some(Signature(1)),
        }
    }

    /// Returns the next free bit, or `None` once all 64 are taken.
    pub fn allocate(&mut self) -> Option<Signature> {
        let current = self.next?;
        self.next = current.0.checked_shl(1).filter(|&b| b != 0).map(Signature);
        Some(current)
    }
}
