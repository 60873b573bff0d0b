//! # Systems
//!
//! Systems are stateful update routines. Each steady-state system subscribes
//! to a [`Signature`] and keeps a dense membership list of the entities that
//! match it, maintained incrementally from the oplog at every cleanup instead
//! of being recomputed per query.
//!
//! ## Membership index
//!
//! ```text
//! members:   [e4, e9, e2, e7]        positions: e4→0 e9→1 e2→2 e7→3
//! remove e9: [e4, e7, e2]            positions: e4→0 e7→1 e2→2
//! ```
//!
//! Removal swaps the last member into the vacated slot, so every operation is
//! O(1) and the list stays dense.

use std::collections::HashMap;

use super::entity::EntityId;
use super::oplog::{OpKind, OplogEntry};
use super::signature::Signature;
use super::type_registry::{type_identity, TypeIdentity};
use super::world::World;
use crate::error::{EcsError, EcsResult};

/// Context handed to a [`System`] once per tick.
pub struct UpdateState<'a> {
    /// The world, for component access and structural changes.
    pub world: &'a mut World,
    /// Entities matching the system's signature when the tick began.
    pub entities: &'a [EntityId],
    /// Time since the previous tick, in seconds.
    pub delta_time: f32,
}

/// A steady-state system, run once per [`World::run_update`].
///
/// # Example
///
/// ```rust
/// use mengine_core::{Component, EcsResult, System, UpdateState};
///
/// #[derive(Debug)]
/// struct Velocity { dx: f32 }
/// impl Component for Velocity {}
///
/// struct Friction;
///
/// impl System for Friction {
///     fn update(&mut self, state: UpdateState<'_>) -> EcsResult<()> {
///         for &e in state.entities {
///             if let Some(v) = state.world.get_component_mut::<Velocity>(e)? {
///                 v.dx *= 0.9;
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait System: 'static {
    /// Runs the system for one tick.
    ///
    /// # Errors
    ///
    /// Any error aborts the tick; later systems do not run.
    fn update(&mut self, state: UpdateState<'_>) -> EcsResult<()>;
}

/// A one-shot system, run once by [`World::init`].
pub trait InitSystem: 'static {
    /// Runs the system.
    ///
    /// # Errors
    ///
    /// Any error aborts `init`; later init systems do not run.
    fn init(&mut self, world: &mut World) -> EcsResult<()>;
}

/// A registered system with its membership list.
struct SystemEntry {
    name: &'static str,
    /// `None` only while the system is running.
    handler: Option<Box<dyn System>>,
    signature: Signature,
    members: Vec<EntityId>,
    positions: HashMap<EntityId, usize>,
}

impl SystemEntry {
    fn insert(&mut self, entity: EntityId) {
        if self.positions.contains_key(&entity) {
            return;
        }
        self.positions.insert(entity, self.members.len());
        self.members.push(entity);
    }

    fn remove(&mut self, entity: EntityId) {
        let Some(pos) = self.positions.remove(&entity) else {
            return;
        };
        self.members.swap_remove(pos);
        if let Some(&moved) = self.members.get(pos) {
            self.positions.insert(moved, pos);
        }
    }
}

/// Registered systems in registration order.
#[derive(Default)]
pub struct SystemRegistry {
    entries: Vec<SystemEntry>,
    index: HashMap<TypeIdentity, usize>,
}

impl SystemRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers `system` with `signature`, seeding its membership with
    /// `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemAlreadyRegistered`] if `S` is registered.
    pub fn register<S: System>(
        &mut self,
        system: S,
        signature: Signature,
        seed: impl IntoIterator<Item = EntityId>,
    ) -> EcsResult<()> {
        let name = std::any::type_name::<S>();
        let id = type_identity::<S>();
        if self.index.contains_key(&id) {
            return Err(EcsError::SystemAlreadyRegistered(name));
        }

        let mut entry = SystemEntry {
            name,
            handler: Some(Box::new(system)),
            signature,
            members: Vec::new(),
            positions: HashMap::new(),
        };
        for entity in seed {
            entry.insert(entity);
        }

        tracing::debug!(
            system = name,
            signature = signature.bits(),
            seeded = entry.members.len(),
            "registered system"
        );
        self.index.insert(id, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    fn entry<S: System>(&self) -> EcsResult<&SystemEntry> {
        self.index
            .get(&type_identity::<S>())
            .map(|&idx| &self.entries[idx])
            .ok_or(EcsError::SystemNotRegistered(std::any::type_name::<S>()))
    }

    /// Current members of `S`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `S` is unknown.
    pub fn members_of<S: System>(&self) -> EcsResult<&[EntityId]> {
        Ok(&self.entry::<S>()?.members)
    }

    /// Subscribed signature of `S`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `S` is unknown.
    pub fn signature_of<S: System>(&self) -> EcsResult<Signature> {
        Ok(self.entry::<S>()?.signature)
    }

    /// Adds `entity` to every system whose signature `signature` satisfies.
    pub fn apply_add(&mut self, entity: EntityId, signature: Signature) {
        for entry in &mut self.entries {
            if signature.contains(entry.signature) {
                entry.insert(entity);
            }
        }
    }

    /// Removes `entity` from every system that `before` satisfied and
    /// `after` no longer does.
    pub fn apply_remove(&mut self, entity: EntityId, before: Signature, after: Signature) {
        for entry in &mut self.entries {
            if before.contains(entry.signature) && !after.contains(entry.signature) {
                entry.remove(entity);
            }
        }
    }

    /// Removes a deleted `entity` from every system that `before` satisfied,
    /// including systems subscribed to the empty signature.
    pub fn apply_remove_entity(&mut self, entity: EntityId, before: Signature) {
        for entry in &mut self.entries {
            if before.contains(entry.signature) {
                entry.remove(entity);
            }
        }
    }

    /// Applies one oplog entry.
    pub fn apply(&mut self, op: &OplogEntry) {
        match op.kind {
            OpKind::Add => self.apply_add(op.entity, op.after),
            OpKind::Remove => self.apply_remove(op.entity, op.before, op.after),
            OpKind::RemoveEntity => self.apply_remove_entity(op.entity, op.before),
        }
    }

    /// Takes the handler and membership list of the system at `idx` out for
    /// the duration of its update.
    pub(crate) fn check_out(&mut self, idx: usize) -> Option<(Box<dyn System>, Vec<EntityId>)> {
        let entry = self.entries.get_mut(idx)?;
        let handler = entry.handler.take()?;
        Some((handler, std::mem::take(&mut entry.members)))
    }

    /// Returns a handler and membership list taken by [`Self::check_out`].
    pub(crate) fn check_in(&mut self, idx: usize, handler: Box<dyn System>, members: Vec<EntityId>) {
        if let Some(entry) = self.entries.get_mut(idx) {
            entry.handler = Some(handler);
            entry.members = members;
        }
    }

    /// Name of the system at `idx`.
    pub(crate) fn name_at(&self, idx: usize) -> &'static str {
        self.entries.get(idx).map_or("<unknown>", |e| e.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Movement;
    impl System for Movement {
        fn update(&mut self, _state: UpdateState<'_>) -> EcsResult<()> {
            Ok(())
        }
    }

    struct Render;
    impl System for Render {
        fn update(&mut self, _state: UpdateState<'_>) -> EcsResult<()> {
            Ok(())
        }
    }

    const POS: Signature = Signature::from_bits(0b01);
    const VEL: Signature = Signature::from_bits(0b10);

    fn e(raw: u64) -> EntityId {
        EntityId::new(raw)
    }

    fn registry() -> SystemRegistry {
        let mut registry = SystemRegistry::new();
        registry.register(Movement, POS | VEL, []).unwrap();
        registry.register(Render, POS, []).unwrap();
        registry
    }

    fn assert_index_consistent(registry: &SystemRegistry) {
        for entry in &registry.entries {
            assert_eq!(entry.members.len(), entry.positions.len());
            for (pos, member) in entry.members.iter().enumerate() {
                assert_eq!(entry.positions[member], pos);
            }
        }
    }

    #[test]
    fn test_register_twice_fails() {
        let mut registry = registry();
        assert!(matches!(
            registry.register(Render, POS, []),
            Err(EcsError::SystemAlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_seed_is_deduplicated() {
        let mut registry = SystemRegistry::new();
        registry.register(Render, POS, [e(1), e(2), e(1)]).unwrap();
        assert_eq!(registry.members_of::<Render>().unwrap(), &[e(1), e(2)]);
    }

    #[test]
    fn test_add_respects_signature() {
        let mut registry = registry();
        registry.apply_add(e(1), POS);
        registry.apply_add(e(2), POS | VEL);
        registry.apply_add(e(2), POS | VEL);

        assert_eq!(registry.members_of::<Movement>().unwrap(), &[e(2)]);
        assert_eq!(registry.members_of::<Render>().unwrap(), &[e(1), e(2)]);
    }

    #[test]
    fn test_partial_remove_keeps_satisfied_systems() {
        let mut registry = registry();
        registry.apply_add(e(1), POS | VEL);
        registry.apply_remove(e(1), POS | VEL, POS);

        assert!(registry.members_of::<Movement>().unwrap().is_empty());
        assert_eq!(registry.members_of::<Render>().unwrap(), &[e(1)]);
    }

    #[test]
    fn test_swap_remove_integrity() {
        let mut registry = registry();
        for i in 0..6 {
            registry.apply_add(e(i), POS);
        }
        registry.apply_remove(e(1), POS, Signature::EMPTY);
        registry.apply_remove(e(4), POS, Signature::EMPTY);

        let mut members = registry.members_of::<Render>().unwrap().to_vec();
        members.sort_unstable();
        assert_eq!(members, vec![e(0), e(2), e(3), e(5)]);
        assert_index_consistent(&registry);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut registry = registry();
        registry.apply_add(e(0), POS);
        registry.apply_remove(e(9), POS, Signature::EMPTY);
        assert_eq!(registry.members_of::<Render>().unwrap(), &[e(0)]);
    }

    #[test]
    fn test_remove_last_member() {
        let mut registry = registry();
        registry.apply_add(e(0), POS);
        registry.apply_add(e(1), POS);
        registry.apply_remove(e(1), POS, Signature::EMPTY);
        assert_eq!(registry.members_of::<Render>().unwrap(), &[e(0)]);
        assert_index_consistent(&registry);
    }

    #[test]
    fn test_apply_dispatches_on_kind() {
        let mut registry = registry();
        registry.apply(&OplogEntry {
            kind: OpKind::Add,
            entity: e(3),
            before: Signature::EMPTY,
            after: POS,
        });
        assert_eq!(registry.members_of::<Render>().unwrap(), &[e(3)]);

        registry.apply(&OplogEntry {
            kind: OpKind::Remove,
            entity: e(3),
            before: POS,
            after: Signature::EMPTY,
        });
        assert!(registry.members_of::<Render>().unwrap().is_empty());
    }

    #[test]
    fn test_entity_removal_leaves_empty_signature_systems() {
        struct Everyone;
        impl System for Everyone {
            fn update(&mut self, _state: UpdateState<'_>) -> EcsResult<()> {
                Ok(())
            }
        }

        let mut registry = registry();
        registry.register(Everyone, Signature::EMPTY, []).unwrap();
        registry.apply_add(e(1), POS);
        registry.apply_add(e(2), POS | VEL);

        registry.apply_remove(e(2), POS | VEL, Signature::EMPTY);
        assert_eq!(registry.members_of::<Everyone>().unwrap(), &[e(1), e(2)]);

        registry.apply(&OplogEntry {
            kind: OpKind::RemoveEntity,
            entity: e(1),
            before: POS,
            after: Signature::EMPTY,
        });
        assert_eq!(registry.members_of::<Everyone>().unwrap(), &[e(2)]);
        assert!(registry.members_of::<Render>().unwrap().is_empty());
        assert_index_consistent(&registry);
    }

    #[test]
    fn test_unregistered_system_lookup_fails() {
        let registry = SystemRegistry::new();
        assert!(matches!(
            registry.members_of::<Render>(),
            Err(EcsError::SystemNotRegistered(_))
        ));
    }
}
