//! # Component Storage
//!
//! Dense, per-type component storage with tick-stamped slots.
//!
//! The storage uses a dense array strategy:
//! - Slots are appended, never moved, until compaction
//! - Access is O(1) via the entity → slot index
//! - Removal only flips a liveness flag; dead slots are reclaimed in bulk
//!
//! ## Slot states
//!
//! Every slot records the tick at which it was last structurally touched.
//! Together with the liveness flag that yields three states:
//!
//! | alive | touched this tick | state        | `get`   | `exists` |
//! |-------|-------------------|--------------|---------|----------|
//! | yes   | no                | stable-alive | present | true     |
//! | no    | no                | stable-dead  | absent  | false    |
//! | any   | yes               | pending      | absent  | true     |

use std::any::Any;
use std::collections::HashMap;

use super::component::{render_compact, Component};
use super::entity::EntityId;
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};

/// One entry in a store's dense array.
#[derive(Clone, Debug)]
pub struct ComponentSlot<C> {
    /// Owning entity.
    pub entity: EntityId,
    /// The component value.
    pub value: C,
    /// Cleared when the component is removed.
    pub alive: bool,
    /// Tick of the last add or remove.
    pub touched_at: u64,
}

impl<C> ComponentSlot<C> {
    /// Whether `get` may return this slot during `tick`.
    #[inline]
    #[must_use]
    pub const fn is_visible(&self, tick: u64) -> bool {
        self.alive && self.touched_at != tick
    }

    /// Whether `exists` reports this slot during `tick`.
    #[inline]
    #[must_use]
    pub const fn is_present(&self, tick: u64) -> bool {
        self.alive || self.touched_at == tick
    }
}

/// Dense storage for a single component type.
///
/// # Type Parameters
///
/// * `C` - The component type to store
pub struct ComponentStorage<C: Component> {
    /// Occupied slots, alive and dead.
    slots: Vec<ComponentSlot<C>>,
    /// Entity → slot index of its most recent slot.
    index: HashMap<EntityId, usize>,
    /// Logical capacity; doubles when `slots` fills it.
    capacity: usize,
    /// Capacity floor below which compaction never runs.
    initial_capacity: usize,
    /// Compaction threshold relative to capacity.
    compaction_ratio: f64,
    /// Number of dead slots still occupying the array.
    dead: usize,
}

impl<C: Component> ComponentStorage<C> {
    /// Creates an empty store sized by `config`.
    #[must_use]
    pub fn new(config: &WorldConfig) -> Self {
        let capacity = config.initial_capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            capacity,
            initial_capacity: capacity,
            compaction_ratio: config.compaction_ratio,
            dead: 0,
        }
    }

    /// Number of occupied slots, dead ones included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is occupied.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current logical capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of dead slots awaiting compaction.
    #[inline]
    #[must_use]
    pub const fn dead_count(&self) -> usize {
        self.dead
    }

    /// The slot an entity currently maps to, regardless of state.
    fn slot(&self, entity: EntityId) -> Option<&ComponentSlot<C>> {
        self.index.get(&entity).map(|&idx| &self.slots[idx])
    }

    /// Whether the entity holds a live value, pending or stable.
    #[inline]
    #[must_use]
    pub fn holds(&self, entity: EntityId) -> bool {
        self.slot(entity).is_some_and(|s| s.alive)
    }

    /// Appends a component for `entity`, stamped with `tick`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateComponent`] if the entity already holds
    /// a live value of this type.
    pub fn add(&mut self, tick: u64, entity: EntityId, value: C) -> EcsResult<()> {
        if self.holds(entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: std::any::type_name::<C>(),
            });
        }

        if self.slots.len() >= self.capacity {
            self.capacity *= 2;
            self.slots.reserve_exact(self.capacity - self.slots.len());
        }

        self.slots.push(ComponentSlot {
            entity,
            value,
            alive: true,
            touched_at: tick,
        });
        self.index.insert(entity, self.slots.len() - 1);
        Ok(())
    }

    /// Marks the entity's component dead at `tick`. The slot stays in place
    /// until the next compaction.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::MissingComponent`] if the entity holds no live
    /// value of this type.
    pub fn remove(&mut self, tick: u64, entity: EntityId) -> EcsResult<()> {
        let slot = self
            .index
            .get(&entity)
            .map(|&idx| &mut self.slots[idx])
            .filter(|s| s.alive)
            .ok_or(EcsError::MissingComponent {
                entity,
                component: std::any::type_name::<C>(),
            })?;

        slot.alive = false;
        slot.touched_at = tick;
        self.dead += 1;
        Ok(())
    }

    /// Returns the component if it is stable-alive at `tick`.
    #[inline]
    #[must_use]
    pub fn get(&self, tick: u64, entity: EntityId) -> Option<&C> {
        self.slot(entity)
            .filter(|s| s.is_visible(tick))
            .map(|s| &s.value)
    }

    /// Mutable variant of [`ComponentStorage::get`]. Writes through the
    /// returned reference are visible immediately.
    #[inline]
    pub fn get_mut(&mut self, tick: u64, entity: EntityId) -> Option<&mut C> {
        let idx = *self.index.get(&entity)?;
        let slot = &mut self.slots[idx];
        if slot.is_visible(tick) {
            Some(&mut slot.value)
        } else {
            None
        }
    }

    /// Whether the entity's component is alive or pending at `tick`.
    #[inline]
    #[must_use]
    pub fn exists(&self, tick: u64, entity: EntityId) -> bool {
        self.slot(entity).is_some_and(|s| s.is_present(tick))
    }

    /// Iterates over entities whose component exists at `tick`.
    ///
    /// The store must not be structurally modified while iterating.
    pub fn iter(&self, tick: u64) -> impl Iterator<Item = EntityId> + '_ {
        self.slots
            .iter()
            .filter(move |s| s.is_present(tick))
            .map(|s| s.entity)
    }

    /// Compact dump of the entity's component, if visible at `tick`.
    #[must_use]
    pub fn debug(&self, tick: u64, entity: EntityId) -> Option<String> {
        self.get(tick, entity).map(render_compact)
    }

    /// Whether the dead-slot count has crossed the compaction threshold.
    #[must_use]
    pub fn needs_compaction(&self) -> bool {
        self.capacity > self.initial_capacity
            && self.dead as f64 > self.capacity as f64 * self.compaction_ratio
    }

    /// Reclaims dead slots if the threshold has been crossed.
    ///
    /// Uses an in-place two-pointer pass: the front cursor advances over
    /// alive slots, the back cursor retreats over dead ones, and each
    /// dead/alive pair found is swapped. Slot order is not preserved.
    ///
    /// Returns `true` if compaction ran.
    pub fn compact(&mut self) -> bool {
        if !self.needs_compaction() {
            return false;
        }

        let before = self.slots.len();
        let mut front = 0;
        let mut back = self.slots.len();
        while front < back {
            if self.slots[front].alive {
                front += 1;
                continue;
            }
            back -= 1;
            if self.slots[back].alive {
                self.slots.swap(front, back);
                front += 1;
            }
        }
        self.slots.truncate(front);

        self.index.clear();
        for (idx, slot) in self.slots.iter().enumerate() {
            self.index.insert(slot.entity, idx);
        }
        self.dead = 0;

        tracing::trace!(
            component = std::any::type_name::<C>(),
            reclaimed = before - front,
            live = front,
            "compacted component storage"
        );
        true
    }
}

/// Type-erased view of a [`ComponentStorage`].
///
/// The manager keeps every store behind this trait and downcasts through
/// [`ErasedStorage::as_any`] only when the caller names the concrete type.
pub trait ErasedStorage {
    /// Entities whose component exists at `tick`.
    fn entities(&self, tick: u64) -> Box<dyn Iterator<Item = EntityId> + '_>;

    /// Compact dump of the entity's component, if visible at `tick`.
    fn debug(&self, tick: u64, entity: EntityId) -> Option<String>;

    /// Whether the entity's component is alive or pending at `tick`.
    fn has(&self, tick: u64, entity: EntityId) -> bool;

    /// Marks the entity's component dead at `tick`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::MissingComponent`] if the entity holds none.
    fn remove(&mut self, tick: u64, entity: EntityId) -> EcsResult<()>;

    /// Reclaims dead slots if the threshold has been crossed.
    fn compact(&mut self) -> bool;

    /// Upcast for downcasting to the concrete store.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete store.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedStorage for ComponentStorage<C> {
    fn entities(&self, tick: u64) -> Box<dyn Iterator<Item = EntityId> + '_> {
        Box::new(self.iter(tick))
    }

    fn debug(&self, tick: u64, entity: EntityId) -> Option<String> {
        ComponentStorage::debug(self, tick, entity)
    }

    fn has(&self, tick: u64, entity: EntityId) -> bool {
        self.exists(tick, entity)
    }

    fn remove(&mut self, tick: u64, entity: EntityId) -> EcsResult<()> {
        ComponentStorage::remove(self, tick, entity)
    }

    fn compact(&mut self) -> bool {
        ComponentStorage::compact(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
