//! Entity ownership and message dispatch.
//!
//! [`EntityManager`] owns every entity in the simulation: a slab keyed by
//! generational [`EntityId`], a name index for lookup-by-name, and the
//! insertion order that the per-frame update pass iterates in.
//!
//! [`deliver`] is the message dispatcher. Delivery takes each subscribed
//! component out of its slot, runs the handler with a fresh [`Context`], and
//! puts it back -- so the directory is never aliased while a handler runs,
//! and a message that loops back to the component currently executing is
//! detected (empty slot) and skipped instead of recursing into it.

use std::collections::HashMap;

use crate::component::{Component, Context};
use crate::entity::{Entity, EntityAllocator, EntityId};
use crate::message::Message;
use crate::spatial::SpatialGrid;
use crate::SimError;

// ---------------------------------------------------------------------------
// EntityManager
// ---------------------------------------------------------------------------

/// Owns all entities and resolves lookup-by-name.
///
/// Update order across entities is insertion order, stable and deterministic
/// -- external consumers (camera, sun) that read the player transform after
/// an update pass must see this tick's result.
#[derive(Default)]
pub struct EntityManager {
    allocator: EntityAllocator,
    entities: Vec<Option<Entity>>,
    /// Insertion order; drives the update pass.
    order: Vec<EntityId>,
    by_name: HashMap<String, EntityId>,
    anon_counter: u64,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no entities are registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Register an entity under an explicit unique name.
    pub(crate) fn register_named(
        &mut self,
        entity: Entity,
        name: &str,
    ) -> Result<EntityId, SimError> {
        if self.by_name.contains_key(name) {
            return Err(SimError::DuplicateName {
                name: name.to_owned(),
            });
        }
        Ok(self.store(entity, name.to_owned()))
    }

    /// Register an entity under a generated name (`__entity_N`), the way the
    /// original directory named anonymous spawns.
    pub(crate) fn register_anon(&mut self, entity: Entity) -> EntityId {
        loop {
            let candidate = format!("__entity_{}", self.anon_counter);
            self.anon_counter += 1;
            if !self.by_name.contains_key(&candidate) {
                return self.store(entity, candidate);
            }
        }
    }

    fn store(&mut self, mut entity: Entity, name: String) -> EntityId {
        let id = self.allocator.allocate();
        entity.name = Some(name.clone());
        let idx = id.index() as usize;
        if idx >= self.entities.len() {
            self.entities.resize_with(idx + 1, || None);
        }
        self.entities[idx] = Some(entity);
        self.order.push(id);
        self.by_name.insert(name, id);
        id
    }

    /// Free an entity's slot. Component teardown has already happened at the
    /// scene level. Returns `false` for stale ids.
    pub(crate) fn free(&mut self, id: EntityId) -> bool {
        if !self.allocator.deallocate(id) {
            return false;
        }
        if let Some(entity) = self.entities[id.index() as usize].take() {
            if let Some(name) = entity.name {
                self.by_name.remove(&name);
            }
        }
        self.order.retain(|&e| e != id);
        true
    }

    /// Borrow an entity. Stale ids resolve to `None`.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        self.entities.get(id.index() as usize)?.as_ref()
    }

    /// Mutably borrow an entity.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if !self.allocator.is_alive(id) {
            return None;
        }
        self.entities.get_mut(id.index() as usize)?.as_mut()
    }

    /// Resolve an entity id by registered name.
    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    /// Snapshot of all entity ids in insertion order.
    pub fn ordered_ids(&self) -> Vec<EntityId> {
        self.order.clone()
    }

    pub(crate) fn slot_count(&self, id: EntityId) -> usize {
        self.get(id).map(|e| e.slots.len()).unwrap_or(0)
    }

    pub(crate) fn slot_initialized(&self, id: EntityId, slot: usize) -> bool {
        self.get(id)
            .and_then(|e| e.slots.get(slot))
            .map(|s| s.initialized)
            .unwrap_or(false)
    }

    pub(crate) fn mark_initialized(&mut self, id: EntityId, slot: usize) {
        if let Some(s) = self.get_mut(id).and_then(|e| e.slots.get_mut(slot)) {
            s.initialized = true;
        }
    }

    /// Take a component out of its slot for execution. `None` if the entity
    /// is gone or the slot is empty (its component is already executing).
    pub(crate) fn take_component(&mut self, id: EntityId, slot: usize) -> Option<Box<dyn Component>> {
        self.get_mut(id)?.slots.get_mut(slot)?.component.take()
    }

    /// Put a component back after execution. If the entity was destroyed
    /// while its component ran, the component is dropped here.
    pub(crate) fn restore_component(
        &mut self,
        id: EntityId,
        slot: usize,
        component: Box<dyn Component>,
    ) {
        match self.get_mut(id).and_then(|e| e.slots.get_mut(slot)) {
            Some(s) => s.component = Some(component),
            None => {
                tracing::debug!(entity = %id, slot, "entity destroyed while component ran; dropping component");
            }
        }
    }
}

impl std::fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManager")
            .field("entities", &self.order.len())
            .field("named", &self.by_name.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Message dispatch
// ---------------------------------------------------------------------------

/// Deliver `msg` to every handler registered for its topic on `target`.
///
/// Handlers fire in component-registration order. A failing handler is
/// logged and does not prevent the remaining handlers from running. Nested
/// sends (a handler sending further messages) complete before this call
/// returns. Messages to despawned entities are dropped silently.
pub(crate) fn deliver(
    entities: &mut EntityManager,
    grid: &mut SpatialGrid,
    target: EntityId,
    msg: &Message,
) {
    let slots: Vec<usize> = match entities.get(target) {
        Some(e) => e.handlers_for(msg.topic()).to_vec(),
        None => {
            tracing::trace!(target = %target, topic = %msg.topic(), "message to despawned entity dropped");
            return;
        }
    };

    for slot in slots {
        if entities.get(target).is_none() {
            // A previous handler despawned the target mid-delivery.
            break;
        }
        let Some(mut component) = entities.take_component(target, slot) else {
            tracing::warn!(
                entity = %target,
                topic = %msg.topic(),
                slot,
                "re-entrant delivery to an executing handler skipped"
            );
            continue;
        };

        let mut ctx = Context {
            entities: &mut *entities,
            grid: &mut *grid,
            me: target,
        };
        if let Err(error) = component.on_message(&mut ctx, msg) {
            tracing::warn!(
                entity = %target,
                topic = %msg.topic(),
                error = %error,
                "message handler failed; continuing with remaining handlers"
            );
        }
        entities.restore_component(target, slot, component);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
