//! # Component Manager
//!
//! Owns every component store, the signature bit assigned to each component
//! type, and the signature table describing what each entity currently has.
//!
//! The signature table is updated synchronously on every add and remove; it
//! is what cleanup uses to decide which systems an entity joins or leaves.

use std::collections::{HashMap, HashSet};

use super::component::Component;
use super::entity::EntityId;
use super::signature::{Signature, SignatureAllocator, MAX_COMPONENT_TYPES};
use super::storage::{ComponentStorage, ErasedStorage};
use super::type_registry::{type_identity, TypeIdentity};
use crate::config::WorldConfig;
use crate::error::{EcsError, EcsResult};

/// Registered stores plus per-entity signatures.
pub struct ComponentManager {
    /// Stores in registration order.
    storages: Vec<Box<dyn ErasedStorage>>,
    /// Signature bit of `storages[i]`.
    signatures: Vec<Signature>,
    /// Type identity → position in `storages`.
    index: HashMap<TypeIdentity, usize>,
    /// Current composed signature of every entity with components.
    entity_signatures: HashMap<EntityId, Signature>,
    /// Entities whose table entry is dropped at the next prune.
    evicted: HashSet<EntityId>,
    allocator: SignatureAllocator,
    config: WorldConfig,
}

impl ComponentManager {
    /// Creates an empty manager whose stores are sized by `config`.
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        Self {
            storages: Vec::with_capacity(MAX_COMPONENT_TYPES as usize),
            signatures: Vec::with_capacity(MAX_COMPONENT_TYPES as usize),
            index: HashMap::with_capacity(MAX_COMPONENT_TYPES as usize),
            entity_signatures: HashMap::with_capacity(config.initial_capacity),
            evicted: HashSet::new(),
            allocator: SignatureAllocator::new(),
            config,
        }
    }

    /// Number of registered component types.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.storages.len()
    }

    /// Registers `C`, allocating its store and signature bit.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentAlreadyRegistered`] on a second
    /// registration and [`EcsError::SignatureExhausted`] once all 64 bits are
    /// taken.
    pub fn register<C: Component>(&mut self) -> EcsResult<Signature> {
        let name = std::any::type_name::<C>();
        let id = type_identity::<C>();
        if self.index.contains_key(&id) {
            return Err(EcsError::ComponentAlreadyRegistered(name));
        }

        let signature = self
            .allocator
            .allocate()
            .ok_or(EcsError::SignatureExhausted {
                component: name,
                limit: MAX_COMPONENT_TYPES,
            })?;

        self.storages
            .push(Box::new(ComponentStorage::<C>::new(&self.config)));
        self.signatures.push(signature);
        self.index.insert(id, self.storages.len() - 1);

        tracing::debug!(component = name, signature = signature.bits(), "registered component");
        Ok(signature)
    }

    fn position<C: Component>(&self) -> EcsResult<usize> {
        self.index
            .get(&type_identity::<C>())
            .copied()
            .ok_or(EcsError::ComponentNotRegistered(std::any::type_name::<C>()))
    }

    /// Signature bit of `C`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn signature_of<C: Component>(&self) -> EcsResult<Signature> {
        Ok(self.signatures[self.position::<C>()?])
    }

    /// Typed access to the store of `C`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn storage<C: Component>(&self) -> EcsResult<&ComponentStorage<C>> {
        let pos = self.position::<C>()?;
        self.storages[pos]
            .as_any()
            .downcast_ref()
            .ok_or(EcsError::StorageTypeMismatch(std::any::type_name::<C>()))
    }

    /// Mutable typed access to the store of `C`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn storage_mut<C: Component>(&mut self) -> EcsResult<&mut ComponentStorage<C>> {
        let pos = self.position::<C>()?;
        self.storages[pos]
            .as_any_mut()
            .downcast_mut()
            .ok_or(EcsError::StorageTypeMismatch(std::any::type_name::<C>()))
    }

    /// Current composed signature of `entity`.
    #[must_use]
    pub fn entity_signature(&self, entity: EntityId) -> Signature {
        self.entity_signatures
            .get(&entity)
            .copied()
            .unwrap_or(Signature::EMPTY)
    }

    /// Adds `value` to `entity` and returns the entity's new signature.
    ///
    /// # Errors
    ///
    /// Fails if `C` is unregistered or the entity already holds a `C`.
    pub fn add<C: Component>(
        &mut self,
        tick: u64,
        entity: EntityId,
        value: C,
    ) -> EcsResult<Signature> {
        let bit = self.signature_of::<C>()?;
        self.storage_mut::<C>()?.add(tick, entity, value)?;

        let signature = self.entity_signature(entity) | bit;
        self.entity_signatures.insert(entity, signature);
        self.evicted.remove(&entity);
        Ok(signature)
    }

    /// Removes `C` from `entity` and returns the entity's new signature.
    ///
    /// # Errors
    ///
    /// Fails if `C` is unregistered or the entity holds no `C`.
    pub fn remove<C: Component>(&mut self, tick: u64, entity: EntityId) -> EcsResult<Signature> {
        let bit = self.signature_of::<C>()?;
        self.storage_mut::<C>()?.remove(tick, entity)?;

        let signature = self.entity_signature(entity).without(bit);
        self.entity_signatures.insert(entity, signature);
        Ok(signature)
    }

    /// Removes every component `entity` owns and schedules its signature
    /// entry for eviction. Stores of component types the entity does not own
    /// are left untouched.
    ///
    /// # Errors
    ///
    /// Propagates a store failure, which only happens if the signature table
    /// and a store disagree.
    pub fn remove_entity(&mut self, tick: u64, entity: EntityId) -> EcsResult<()> {
        let owned = self.entity_signature(entity);
        for (storage, &bit) in self.storages.iter_mut().zip(&self.signatures) {
            if owned.contains(bit) {
                storage.remove(tick, entity)?;
            }
        }

        self.entity_signatures.insert(entity, Signature::EMPTY);
        self.evicted.insert(entity);
        Ok(())
    }

    /// Whether `C` exists (alive or pending) on `entity` at `tick`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn has<C: Component>(&self, tick: u64, entity: EntityId) -> EcsResult<bool> {
        Ok(self.storage::<C>()?.exists(tick, entity))
    }

    /// Entities whose current signature contains `signature`, confirmed
    /// against the stores' `exists` predicate at `tick`.
    ///
    /// Scans the store of the lowest required component; with an empty
    /// signature every entity in the table matches. Results are in ascending
    /// id order.
    #[must_use]
    pub fn matching_entities(&self, tick: u64, signature: Signature) -> Vec<EntityId> {
        let required: Vec<&dyn ErasedStorage> = self
            .storages
            .iter()
            .zip(&self.signatures)
            .filter(|(_, &bit)| signature.contains(bit))
            .map(|(storage, _)| &**storage)
            .collect();

        let candidates: HashSet<EntityId> = match required.first() {
            Some(first) => first.entities(tick).collect(),
            None => self.entity_signatures.keys().copied().collect(),
        };

        let mut matched: Vec<EntityId> = candidates
            .into_iter()
            .filter(|&e| self.entity_signature(e).contains(signature))
            .filter(|&e| required.iter().all(|s| s.has(tick, e)))
            .collect();
        matched.sort_unstable();
        matched
    }

    /// Compact dump of `entity`'s `C`, or `None` if it is not visible.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn debug_component<C: Component>(
        &self,
        tick: u64,
        entity: EntityId,
    ) -> EcsResult<Option<String>> {
        Ok(self.storage::<C>()?.debug(tick, entity))
    }

    /// Compact dumps of every component that exists on `entity`, in
    /// registration order. Components added or removed during `tick` render
    /// as `<none>`.
    #[must_use]
    pub fn debug_entity(&self, tick: u64, entity: EntityId) -> Vec<String> {
        self.storages
            .iter()
            .filter(|s| s.has(tick, entity))
            .map(|s| s.debug(tick, entity).unwrap_or_else(|| "<none>".to_string()))
            .collect()
    }

    /// Evicts removed entities from the signature table and compacts every
    /// store that crossed its threshold. Returns how many stores compacted.
    pub fn prune(&mut self) -> usize {
        for entity in self.evicted.drain() {
            self.entity_signatures.remove(&entity);
        }

        self.storages
            .iter_mut()
            .map(|storage| storage.compact())
            .filter(|&compacted| compacted)
            .count()
    }
}
