//! # Singletons
//!
//! One value per type, shared by every system: configuration, timers,
//! window dimensions and similar world-wide state.

use std::any::Any;
use std::collections::HashMap;

use super::type_registry::{type_identity, TypeIdentity};
use crate::error::{EcsError, EcsResult};

/// Holds at most one value per type.
#[derive(Default)]
pub struct SingletonRegistry {
    values: HashMap<TypeIdentity, Box<dyn Any>>,
}

impl SingletonRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, replacing any previous value of the same type.
    pub fn register<T: 'static>(&mut self, value: T) {
        let replaced = self
            .values
            .insert(type_identity::<T>(), Box::new(value))
            .is_some();
        tracing::debug!(singleton = std::any::type_name::<T>(), replaced, "registered singleton");
    }

    /// Whether a value of type `T` is registered.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.values.contains_key(&type_identity::<T>())
    }

    /// Shared access to the `T` singleton.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonNotRegistered`] if no `T` was registered.
    pub fn get<T: 'static>(&self) -> EcsResult<&T> {
        self.values
            .get(&type_identity::<T>())
            .and_then(|v| v.downcast_ref())
            .ok_or(EcsError::SingletonNotRegistered(std::any::type_name::<T>()))
    }

    /// Mutable access to the `T` singleton.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonNotRegistered`] if no `T` was registered.
    pub fn get_mut<T: 'static>(&mut self) -> EcsResult<&mut T> {
        self.values
            .get_mut(&type_identity::<T>())
            .and_then(|v| v.downcast_mut())
            .ok_or(EcsError::SingletonNotRegistered(std::any::type_name::<T>()))
    }
}
