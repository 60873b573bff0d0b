//! # ECS Error Types
//!
//! Every failure in the ECS is a usage-contract violation. Each one aborts
//! the call that raised it before anything is applied.

use thiserror::Error;

use crate::ecs::EntityId;

/// Errors that can occur while driving an ECS world.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A component type was registered twice in the same world.
    #[error("component {0} is already registered")]
    ComponentAlreadyRegistered(&'static str),

    /// A component type was used without being registered first.
    #[error("component {0} is not registered")]
    ComponentNotRegistered(&'static str),

    /// All 64 signature bits are taken.
    #[error("signature space exhausted: cannot register {component}, limit is {limit} component types")]
    SignatureExhausted {
        /// The component whose registration overflowed.
        component: &'static str,
        /// Maximum number of component types per world.
        limit: u32,
    },

    /// The entity already holds a live component of this type.
    #[error("entity {entity} already contains component {component}")]
    DuplicateComponent {
        /// Target entity.
        entity: EntityId,
        /// Component type name.
        component: &'static str,
    },

    /// The entity does not hold a live component of this type.
    #[error("entity {entity} does not have component {component}")]
    MissingComponent {
        /// Target entity.
        entity: EntityId,
        /// Component type name.
        component: &'static str,
    },

    /// The entity id was never issued by this world.
    #[error("entity {0} was never created by this world")]
    UnknownEntity(EntityId),

    /// A system type was registered twice.
    #[error("system {0} is already registered")]
    SystemAlreadyRegistered(&'static str),

    /// A system type was looked up without being registered.
    #[error("system {0} is not registered")]
    SystemNotRegistered(&'static str),

    /// A singleton type was requested without being registered.
    #[error("singleton {0} has not been registered")]
    SingletonNotRegistered(&'static str),

    /// `init` was called on a world that is already initialized.
    #[error("world is already initialized")]
    AlreadyInitialized,

    /// `run_update` was called before `init`.
    #[error("world must be initialized before running updates")]
    NotInitialized,

    /// A lifecycle operation was attempted from inside a running tick.
    #[error("{0} is not allowed while a tick is running")]
    TickInProgress(&'static str),

    /// Store lookup returned a storage of an unexpected concrete type.
    #[error("storage for component {0} has an unexpected type")]
    StorageTypeMismatch(&'static str),

    /// Invalid configuration value or file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
