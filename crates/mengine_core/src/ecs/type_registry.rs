//! # Type Registry
//!
//! Assigns a stable integer identity to every Rust type that the ECS keys on
//! (components, systems, singletons).
//!
//! ## Concurrency
//!
//! Lookups take a shared lock. On a miss the exclusive lock is taken and the
//! map re-checked before the next identity is assigned, so concurrent first
//! resolutions of the same type always agree.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use parking_lot::RwLock;

/// Stable identity of a Rust type within a [`TypeRegistry`].
///
/// Identities are assigned in first-use order and never reclaimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TypeIdentity(u64);

impl TypeIdentity {
    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Memoized `TypeId` → [`TypeIdentity`] table.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    ids: RwLock<HashMap<TypeId, TypeIdentity>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identity of `T`, assigning the next unused one on first use.
    pub fn identity_of<T: ?Sized + 'static>(&self) -> TypeIdentity {
        let key = TypeId::of::<T>();

        if let Some(&id) = self.ids.read().get(&key) {
            return id;
        }

        let mut ids = self.ids.write();
        let next = TypeIdentity(ids.len() as u64);
        *ids.entry(key).or_insert(next)
    }

    /// Number of distinct types resolved so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    /// Whether no type has been resolved yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.read().is_empty()
    }
}

static GLOBAL_REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();

/// Returns the process-wide identity of `T`.
///
/// All worlds in the process share this registry.
#[inline]
pub fn type_identity<T: ?Sized + 'static>() -> TypeIdentity {
    GLOBAL_REGISTRY.get_or_init(TypeRegistry::new).identity_of::<T>()
}
