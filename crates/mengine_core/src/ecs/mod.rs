//! # Entity Component System
//!
//! A tick-barrier ECS: structural changes made during a tick are stored
//! immediately but only reach system membership at the end-of-tick cleanup.
//!
//! ## Design Philosophy
//!
//! - One dense store per component type, indexed by entity id
//! - Entity composition summarized as a 64-bit [`Signature`]
//! - Each system keeps its own incrementally maintained membership list
//! - Dead slots are reclaimed by in-place compaction at cleanup

pub mod component;
pub mod entity;
pub mod manager;
pub mod oplog;
pub mod signature;
pub mod singleton;
pub mod storage;
pub mod system;
pub mod type_registry;
mod world;

pub use component::{render_compact, Component};
pub use entity::{EntityAllocator, EntityId};
pub use manager::ComponentManager;
pub use oplog::{OpKind, Oplog, OplogEntry};
pub use signature::{Signature, SignatureAllocator, MAX_COMPONENT_TYPES};
pub use singleton::SingletonRegistry;
pub use storage::{ComponentSlot, ComponentStorage, ErasedStorage};
pub use system::{InitSystem, System, SystemRegistry, UpdateState};
pub use type_registry::{type_identity, TypeIdentity, TypeRegistry};
pub use world::{World, WorldState};
