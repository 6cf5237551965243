//! The [`Scene`] composes the entity directory with the spatial grid and
//! drives the per-frame update pass.
//!
//! A tick is one `update` call: every entity, in insertion order, has each
//! of its components updated in registration order. The tick is atomic with
//! respect to message delivery -- any broadcast triggered inside it
//! completes (including nested broadcasts) before the pass moves on.
//! Everything runs on one simulation thread; there is no implicit
//! parallelism anywhere in this module.

use crate::component::{Component, Context, Subscriptions};
use crate::directory::{deliver, EntityManager};
use crate::entity::{ComponentSlot, Entity, EntityId};
use crate::message::Message;
use crate::spatial::SpatialGrid;
use crate::SimError;

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Top-level simulation container: entity directory + spatial grid.
///
/// The grid is injected at construction rather than reached through a
/// global, so tests and embedders choose their own world bounds.
pub struct Scene {
    entities: EntityManager,
    grid: SpatialGrid,
}

impl Scene {
    /// Create a scene around the given spatial grid.
    pub fn new(grid: SpatialGrid) -> Self {
        Self {
            entities: EntityManager::new(),
            grid,
        }
    }

    /// Register an entity under a generated name and initialize its
    /// components.
    pub fn add(&mut self, entity: Entity) -> EntityId {
        let id = self.entities.register_anon(entity);
        self.init_components(id);
        id
    }

    /// Register an entity under `name` and initialize its components.
    ///
    /// Component `init` runs here, after registration, so handlers can look
    /// up siblings and other named entities.
    pub fn add_named(&mut self, entity: Entity, name: &str) -> Result<EntityId, SimError> {
        let id = self.entities.register_named(entity, name)?;
        self.init_components(id);
        Ok(id)
    }

    /// Attach a component to an already-registered entity; its `init` runs
    /// immediately.
    pub fn attach(&mut self, id: EntityId, component: impl Component) -> Result<(), SimError> {
        let Some(entity) = self.entities.get_mut(id) else {
            return Err(SimError::StaleEntity { entity: id });
        };
        entity.slots.push(ComponentSlot {
            component: Some(Box::new(component)),
            initialized: false,
        });
        self.init_components(id);
        Ok(())
    }

    /// Run `init` for every not-yet-initialized component on `id` and record
    /// its topic subscriptions.
    fn init_components(&mut self, id: EntityId) {
        for slot in 0..self.entities.slot_count(id) {
            if self.entities.slot_initialized(id, slot) {
                continue;
            }
            let Some(mut component) = self.entities.take_component(id, slot) else {
                continue;
            };
            let mut topics = Subscriptions::default();
            let mut ctx = Context {
                entities: &mut self.entities,
                grid: &mut self.grid,
                me: id,
            };
            component.init(&mut ctx, &mut topics);
            self.entities.restore_component(id, slot, component);
            if let Some(entity) = self.entities.get_mut(id) {
                entity.register_handlers(slot, topics.topics());
            }
            self.entities.mark_initialized(id, slot);
        }
    }

    /// Resolve an entity id by registered name.
    pub fn get(&self, name: &str) -> Option<EntityId> {
        self.entities.find(name)
    }

    /// Borrow an entity (transform reads for external camera/render layers).
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Mutably borrow an entity (external movement drivers, tests).
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Destroy an entity: every component's `on_removed` runs, then the slot
    /// is freed. Timers owned by components die with them.
    pub fn remove(&mut self, id: EntityId) -> Result<(), SimError> {
        if self.entities.get(id).is_none() {
            return Err(SimError::StaleEntity { entity: id });
        }
        for slot in 0..self.entities.slot_count(id) {
            let Some(mut component) = self.entities.take_component(id, slot) else {
                continue;
            };
            let mut ctx = Context {
                entities: &mut self.entities,
                grid: &mut self.grid,
                me: id,
            };
            component.on_removed(&mut ctx);
        }
        self.entities.free(id);
        self.grid.remove(id);
        Ok(())
    }

    /// One simulation tick: update every active entity's components, in
    /// insertion order across entities and registration order within one.
    pub fn update(&mut self, dt: f32) {
        for id in self.entities.ordered_ids() {
            match self.entities.get(id) {
                Some(entity) if entity.is_active() => {}
                _ => continue,
            }
            for slot in 0..self.entities.slot_count(id) {
                if self.entities.get(id).is_none() {
                    break;
                }
                if !self.entities.slot_initialized(id, slot) {
                    // Updating a component that never saw `init` is a
                    // programming invariant violation (components must be
                    // attached via the scene, not pushed onto live
                    // entities).
                    debug_assert!(
                        false,
                        "component slot {slot} on {id} updated without init"
                    );
                    tracing::warn!(entity = %id, slot, "skipping uninitialized component in update pass");
                    continue;
                }
                let Some(mut component) = self.entities.take_component(id, slot) else {
                    continue;
                };
                let mut ctx = Context {
                    entities: &mut self.entities,
                    grid: &mut self.grid,
                    me: id,
                };
                component.update(&mut ctx, dt);
                self.entities.restore_component(id, slot, component);
            }
        }
    }

    /// Inject a message from outside the simulation (animation driver, UI).
    pub fn send_to(&mut self, target: EntityId, msg: &Message) {
        deliver(&mut self.entities, &mut self.grid, target, msg);
    }

    /// Inject a message addressed by entity name.
    pub fn send(&mut self, name: &str, msg: &Message) -> Result<(), SimError> {
        let id = self.entities.find(name).ok_or_else(|| SimError::UnknownName {
            name: name.to_owned(),
        })?;
        self.send_to(id, msg);
        Ok(())
    }

    /// The entity directory.
    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    /// The spatial grid.
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Write access to the spatial grid.
    pub fn grid_mut(&mut self) -> &mut SpatialGrid {
        &mut self.grid
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("entities", &self.entities)
            .field("grid_occupants", &self.grid.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
