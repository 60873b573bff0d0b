//! # Entity Management
//!
//! Entities are bare identifiers. They carry no data and are never recycled:
//! every creation call returns a fresh, strictly larger id.

use std::fmt;

/// Unique identifier for an entity.
///
/// Ids are issued in increasing order by an [`EntityAllocator`] and are never
/// reused within one world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic entity id source.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    next: u64,
}

impl EntityAllocator {
    /// Creates an allocator that starts at id 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Issues the next id.
    #[inline]
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Whether `id` has been issued by this allocator.
    #[inline]
    #[must_use]
    pub const fn is_issued(&self, id: EntityId) -> bool {
        id.0 < self.next
    }

    /// Number of ids issued so far.
    #[inline]
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.next
    }
}
