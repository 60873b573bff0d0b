//! # Structural Oplog
//!
//! Records structural changes made during a tick. Cleanup drains the log in
//! issue order and applies each entry to the system membership index, so a
//! change made in tick T affects membership from tick T+1 on.

use super::entity::EntityId;
use super::signature::Signature;

/// Kind of structural change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    /// A component was added.
    Add,
    /// A single component was removed.
    Remove,
    /// The whole entity was removed.
    RemoveEntity,
}

/// One recorded structural change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OplogEntry {
    /// What happened.
    pub kind: OpKind,
    /// Affected entity.
    pub entity: EntityId,
    /// Entity signature just before the call.
    pub before: Signature,
    /// Entity signature just after the call.
    pub after: Signature,
}

/// Ordered log of pending structural changes.
#[derive(Debug, Default)]
pub struct Oplog {
    entries: Vec<OplogEntry>,
}

impl Oplog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Records an addition that moved `entity` from `before` to `after`.
    pub fn record_add(&mut self, entity: EntityId, before: Signature, after: Signature) {
        self.entries.push(OplogEntry {
            kind: OpKind::Add,
            entity,
            before,
            after,
        });
    }

    /// Records a removal that moved `entity` from `before` to `after`.
    pub fn record_remove(&mut self, entity: EntityId, before: Signature, after: Signature) {
        self.entries.push(OplogEntry {
            kind: OpKind::Remove,
            entity,
            before,
            after,
        });
    }

    /// Records the removal of `entity` as a whole. `before` is its signature
    /// just before the call.
    pub fn record_remove_entity(&mut self, entity: EntityId, before: Signature) {
        self.entries.push(OplogEntry {
            kind: OpKind::RemoveEntity,
            entity,
            before,
            after: Signature::EMPTY,
        });
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending entries in issue order.
    #[must_use]
    pub fn entries(&self) -> &[OplogEntry] {
        &self.entries
    }

    /// Removes and yields every entry in issue order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, OplogEntry> {
        self.entries.drain(..)
    }
}
