//! # MEngine Core
//!
//! Entity Component System runtime with tick-barrier semantics:
//! - Components live in dense per-type stores
//! - Systems subscribe to component signatures
//! - Structural changes take effect for systems at the next tick
//!
//! ## Architecture Rules
//!
//! 1. **Deferred structure** - adds and removals are logged and applied at cleanup
//! 2. **Immediate values** - writes to an existing component are seen at once
//! 3. **Errors, not panics** - every contract violation is an [`EcsError`]
//!
//! ## Example
//!
//! ```rust
//! use mengine_core::{Component, World};
//!
//! #[derive(Debug)]
//! struct Inventory { food: u32 }
//! impl Component for Inventory {}
//!
//! # fn main() -> mengine_core::EcsResult<()> {
//! let mut world = World::new();
//! world.register_component::<Inventory>()?;
//! let e = world.create_entity();
//! world.add_component(e, Inventory { food: 2 })?;
//!
//! // Not fetchable during the tick it was added in.
//! assert!(world.get_component::<Inventory>(e)?.is_none());
//! world.init()?;
//! assert_eq!(world.must_get_component::<Inventory>(e)?.food, 2);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::WorldConfig;
pub use ecs::{
    render_compact, type_identity, Component, ComponentStorage, EntityId, InitSystem, Signature,
    System, TypeIdentity, UpdateState, World, WorldState, MAX_COMPONENT_TYPES,
};
pub use error::{EcsError, EcsResult};
