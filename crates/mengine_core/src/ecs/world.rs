//! # ECS World
//!
//! The central container for all entities, components, systems and
//! singletons, and the tick scheduler that drives them.
//!
//! ## Tick barrier
//!
//! ```text
//!  tick T                                     cleanup                tick T+1
//!  ──────────────────────────────────────────┬──────────────────────┬────────
//!  S1.update ─ S2.update ─ ... ─ Sn.update   │ apply oplog          │ changes
//!    add/remove: stored now, logged          │ prune stores         │ visible
//!    value writes: visible now               │ tick += 1            │
//! ```
//!
//! A component added during tick T occupies its slot immediately, so
//! [`World::has_component`] reports it, but [`World::get_component`] only
//! returns it from T+1 on. Systems gain or lose members at cleanup.

use super::component::Component;
use super::entity::{EntityAllocator, EntityId};
use super::manager::ComponentManager;
use super::oplog::Oplog;
use super::signature::Signature;
use super::singleton::SingletonRegistry;
use super::storage::ComponentStorage;
use super::system::{InitSystem, System, SystemRegistry, UpdateState};
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};

/// Lifecycle state of a [`World`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorldState {
    /// Created; `init` has not run yet.
    Uninitialized,
    /// Initialized and idle between ticks.
    Initialized,
    /// Steady-state systems are executing.
    Running,
}

/// The ECS World - container for all game state.
///
/// # Example
///
/// ```rust
/// use mengine_core::{Component, World};
///
/// #[derive(Debug)]
/// struct Player { x: i32, y: i32 }
/// impl Component for Player {}
///
/// # fn main() -> mengine_core::EcsResult<()> {
/// let mut world = World::new();
/// world.register_component::<Player>()?;
///
/// let player = world.create_entity();
/// world.add_component(player, Player { x: 200, y: 400 })?;
/// world.init()?;
///
/// assert_eq!(world.debug_component::<Player>(player)?, "{x:200 y:400}");
/// # Ok(())
/// # }
/// ```
pub struct World {
    entities: EntityAllocator,
    components: ComponentManager,
    systems: SystemRegistry,
    init_systems: Vec<Box<dyn InitSystem>>,
    singletons: SingletonRegistry,
    oplog: Oplog,
    tick: u64,
    state: WorldState,
    config: WorldConfig,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates an empty world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(WorldConfig::default())
    }

    /// Creates an empty world with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `config` fails validation.
    pub fn with_config(config: WorldConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: WorldConfig) -> Self {
        Self {
            entities: EntityAllocator::new(),
            components: ComponentManager::new(config.clone()),
            systems: SystemRegistry::new(),
            init_systems: Vec::new(),
            singletons: SingletonRegistry::new(),
            oplog: Oplog::new(),
            tick: 0,
            state: WorldState::Uninitialized,
            config,
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Current tick number. Advances by one at every cleanup.
    #[inline]
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> WorldState {
        self.state
    }

    /// Number of structural changes awaiting the next cleanup.
    #[must_use]
    pub fn pending_operations(&self) -> usize {
        self.oplog.len()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers component type `C` and returns its signature bit.
    ///
    /// # Errors
    ///
    /// Fails if `C` is already registered or all 64 signature bits are taken.
    pub fn register_component<C: Component>(&mut self) -> EcsResult<Signature> {
        self.components.register::<C>()
    }

    /// Signature bit of `C`. OR several together to build a system signature.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn signature_of<C: Component>(&self) -> EcsResult<Signature> {
        self.components.signature_of::<C>()
    }

    /// Stores a singleton, replacing any previous value of type `T`.
    pub fn register_singleton<T: 'static>(&mut self, value: T) {
        self.singletons.register(value);
    }

    /// Shared access to the `T` singleton.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonNotRegistered`] if no `T` was registered.
    pub fn singleton<T: 'static>(&self) -> EcsResult<&T> {
        self.singletons.get::<T>()
    }

    /// Whether a `T` singleton is registered.
    #[must_use]
    pub fn has_singleton<T: 'static>(&self) -> bool {
        self.singletons.contains::<T>()
    }

    /// Mutable access to the `T` singleton.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonNotRegistered`] if no `T` was registered.
    pub fn singleton_mut<T: 'static>(&mut self) -> EcsResult<&mut T> {
        self.singletons.get_mut::<T>()
    }

    /// Registers a one-shot system run by [`World::init`].
    pub fn register_init_system<S: InitSystem>(&mut self, system: S) {
        tracing::debug!(system = std::any::type_name::<S>(), "registered init system");
        self.init_systems.push(Box::new(system));
    }

    /// Registers a steady-state system subscribed to `signature`.
    ///
    /// The system starts with every entity whose current signature already
    /// satisfies `signature`.
    ///
    /// # Errors
    ///
    /// Fails if `S` is already registered or a tick is running.
    pub fn register_system<S: System>(&mut self, system: S, signature: Signature) -> EcsResult<()> {
        if self.state == WorldState::Running {
            return Err(EcsError::TickInProgress("system registration"));
        }
        let seed = self.components.matching_entities(self.tick, signature);
        self.systems.register(system, signature, seed)
    }

    /// Current members of system `S`.
    ///
    /// While `S` itself is running its list is lent out through
    /// [`UpdateState::entities`] and reads as empty here.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `S` is unknown.
    pub fn system_entities<S: System>(&self) -> EcsResult<&[EntityId]> {
        self.systems.members_of::<S>()
    }

    /// Signature system `S` subscribed with.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `S` is unknown.
    pub fn system_signature<S: System>(&self) -> EcsResult<Signature> {
        self.systems.signature_of::<S>()
    }

    // =========================================================================
    // Entities and components
    // =========================================================================

    /// Issues a new entity id. Ids are never reused.
    pub fn create_entity(&mut self) -> EntityId {
        self.entities.allocate()
    }

    fn ensure_issued(&self, entity: EntityId) -> EcsResult<()> {
        if self.entities.is_issued(entity) {
            Ok(())
        } else {
            Err(EcsError::UnknownEntity(entity))
        }
    }

    /// Typed read access to the store of `C`, for capacity and occupancy
    /// introspection.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn storage<C: Component>(&self) -> EcsResult<&ComponentStorage<C>> {
        self.components.storage::<C>()
    }

    /// Current composed signature of `entity`.
    #[must_use]
    pub fn entity_signature(&self, entity: EntityId) -> Signature {
        self.components.entity_signature(entity)
    }

    /// Adds `value` to `entity`. The component is stored now but only
    /// fetchable, and only counted for system membership, from the next tick.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown, `C` is unregistered, or the entity
    /// already holds a `C`.
    pub fn add_component<C: Component>(&mut self, entity: EntityId, value: C) -> EcsResult<()> {
        self.ensure_issued(entity)?;
        let before = self.components.entity_signature(entity);
        let after = self.components.add(self.tick, entity, value)?;
        self.oplog.record_add(entity, before, after);
        Ok(())
    }

    /// Removes `C` from `entity`. The component is hidden from
    /// [`World::get_component`] immediately; system membership follows at
    /// the next cleanup.
    ///
    /// # Errors
    ///
    /// Fails if the entity is unknown, `C` is unregistered, or the entity
    /// holds no `C`.
    pub fn remove_component<C: Component>(&mut self, entity: EntityId) -> EcsResult<()> {
        self.ensure_issued(entity)?;
        let before = self.components.entity_signature(entity);
        let after = self.components.remove::<C>(self.tick, entity)?;
        self.oplog.record_remove(entity, before, after);
        Ok(())
    }

    /// Removes every component of `entity` and drops it from all systems at
    /// the next cleanup. Its id is never reissued.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownEntity`] if the id was never issued.
    pub fn remove_entity(&mut self, entity: EntityId) -> EcsResult<()> {
        self.ensure_issued(entity)?;
        let before = self.components.entity_signature(entity);
        self.components.remove_entity(self.tick, entity)?;
        self.oplog.record_remove_entity(entity, before);
        Ok(())
    }

    /// Returns `entity`'s `C`, or `None` if it is absent or was added or
    /// removed during the current tick.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn get_component<C: Component>(&self, entity: EntityId) -> EcsResult<Option<&C>> {
        Ok(self.components.storage::<C>()?.get(self.tick, entity))
    }

    /// Mutable variant of [`World::get_component`]. Writes are visible to
    /// every later reader in the same tick.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn get_component_mut<C: Component>(&mut self, entity: EntityId) -> EcsResult<Option<&mut C>> {
        let tick = self.tick;
        Ok(self.components.storage_mut::<C>()?.get_mut(tick, entity))
    }

    /// Like [`World::get_component`], but absence is an error.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::MissingComponent`] if the component is not
    /// visible, or [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn must_get_component<C: Component>(&self, entity: EntityId) -> EcsResult<&C> {
        self.get_component::<C>(entity)?
            .ok_or(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<C>(),
            })
    }

    /// Like [`World::get_component_mut`], but absence is an error.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::MissingComponent`] if the component is not
    /// visible, or [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn must_get_component_mut<C: Component>(&mut self, entity: EntityId) -> EcsResult<&mut C> {
        self.get_component_mut::<C>(entity)?
            .ok_or(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<C>(),
            })
    }

    /// Whether `entity` has a `C` slot that is alive or was touched this
    /// tick. Unlike [`World::get_component`] this is already `true` for a
    /// component added this tick, and still `true` for one removed this tick.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn has_component<C: Component>(&self, entity: EntityId) -> EcsResult<bool> {
        self.components.has::<C>(self.tick, entity)
    }

    /// Compact dump of `entity`'s `C`, e.g. `{x:200 y:400}`, or `<none>` if
    /// it is not visible.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn debug_component<C: Component>(&self, entity: EntityId) -> EcsResult<String> {
        Ok(self
            .components
            .debug_component::<C>(self.tick, entity)?
            .unwrap_or_else(|| "<none>".to_string()))
    }

    /// Compact dumps of every component that exists on `entity`, one per
    /// line, in component registration order. A component added or removed
    /// during the current tick renders as `<none>`.
    #[must_use]
    pub fn debug_entity(&self, entity: EntityId) -> String {
        self.components.debug_entity(self.tick, entity).join("\n")
    }

    // =========================================================================
    // Tick driving
    // =========================================================================

    /// Applies pending structural changes, advances to the first tick and
    /// runs every init system once, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AlreadyInitialized`] on a second call, or the
    /// first error raised by an init system.
    pub fn init(&mut self) -> EcsResult<()> {
        match self.state {
            WorldState::Uninitialized => {}
            WorldState::Initialized => return Err(EcsError::AlreadyInitialized),
            WorldState::Running => return Err(EcsError::TickInProgress("init")),
        }

        self.cleanup();
        self.state = WorldState::Initialized;

        tracing::info!(
            components = self.components.component_count(),
            systems = self.systems.len(),
            init_systems = self.init_systems.len(),
            entities = self.entities.issued(),
            "world initialized"
        );

        for mut system in std::mem::take(&mut self.init_systems) {
            system.init(self)?;
        }
        Ok(())
    }

    /// Runs every steady-state system once, in registration order, then
    /// performs cleanup and advances the tick.
    ///
    /// If a system fails, the remaining systems are skipped, cleanup does not
    /// run and the pending changes stay queued for the next cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::NotInitialized`] before [`World::init`],
    /// [`EcsError::TickInProgress`] when called from inside a system, or the
    /// first error raised by a system.
    pub fn run_update(&mut self, delta_time: f32) -> EcsResult<()> {
        match self.state {
            WorldState::Uninitialized => return Err(EcsError::NotInitialized),
            WorldState::Running => return Err(EcsError::TickInProgress("run_update")),
            WorldState::Initialized => {}
        }

        self.state = WorldState::Running;
        let result = self.run_systems(delta_time);
        self.state = WorldState::Initialized;
        result?;

        self.cleanup();
        Ok(())
    }

    fn run_systems(&mut self, delta_time: f32) -> EcsResult<()> {
        for idx in 0..self.systems.len() {
            let Some((mut handler, members)) = self.systems.check_out(idx) else {
                continue;
            };

            let result = handler.update(UpdateState {
                world: &mut *self,
                entities: &members,
                delta_time,
            });
            self.systems.check_in(idx, handler, members);

            if let Err(err) = result {
                tracing::debug!(
                    system = self.systems.name_at(idx),
                    tick = self.tick,
                    error = %err,
                    "system aborted tick"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    /// Applies the oplog to system membership, prunes stores and advances
    /// the tick.
    fn cleanup(&mut self) {
        let applied = self.oplog.len();
        for op in self.oplog.drain() {
            self.systems.apply(&op);
        }
        let compacted = self.components.prune();

        tracing::trace!(tick = self.tick, applied, compacted, "cleanup");
        self.tick += 1;
    }
}
