//! The polymorphic component unit and its capability surface.
//!
//! A [`Component`] is a behavior unit attached to exactly one entity. Its
//! lifecycle: constructed with configuration, `init` once the owning entity
//! is registered (register message subscriptions, one-time setup), optional
//! per-tick `update`, `on_removed` when the entity is destroyed.
//!
//! Everything a component may touch outside its own state goes through
//! [`Context`]: broadcasting to its own entity, sending to another entity,
//! sibling lookup, directory lookup by name, spatial queries, and transform
//! access. Components never mutate each other's fields directly -- cross-
//! component communication is messages only.

use std::any::Any;

use glam::{Quat, Vec3};

use crate::directory::{deliver, EntityManager};
use crate::entity::EntityId;
use crate::message::{Message, Topic};
use crate::spatial::SpatialGrid;
use crate::SimError;

// ---------------------------------------------------------------------------
// AsAny
// ---------------------------------------------------------------------------

/// Blanket upcast to [`Any`], so sibling lookup can downcast a boxed
/// component to its concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Collects the topics a component subscribes to during `init`.
///
/// Handlers fire in component-registration order on the entity; within one
/// component, duplicate subscriptions collapse to a single delivery.
#[derive(Debug, Default)]
pub struct Subscriptions {
    topics: Vec<Topic>,
}

impl Subscriptions {
    /// Subscribe the initializing component to `topic`.
    pub fn subscribe(&mut self, topic: Topic) {
        if !self.topics.contains(&topic) {
            self.topics.push(topic);
        }
    }

    pub(crate) fn topics(&self) -> &[Topic] {
        &self.topics
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A polymorphic behavior unit attached to one entity.
///
/// All hooks default to no-ops so concrete components implement only what
/// they use.
pub trait Component: AsAny + 'static {
    /// One-time setup, run when the owning entity is registered with the
    /// scene (deferred, so sibling and directory lookups are valid here).
    /// Subscribe to message topics via `topics`.
    fn init(&mut self, _ctx: &mut Context<'_>, _topics: &mut Subscriptions) {}

    /// Per-tick update. Only called after `init` has run and while the
    /// owning entity is active.
    fn update(&mut self, _ctx: &mut Context<'_>, _dt: f32) {}

    /// Invoked for every message on a topic this component subscribed to.
    ///
    /// Returning an error is logged by the dispatcher and does not stop
    /// delivery to the remaining handlers.
    fn on_message(&mut self, _ctx: &mut Context<'_>, _msg: &Message) -> Result<(), SimError> {
        Ok(())
    }

    /// Teardown when the owning entity is destroyed. Cancel timers and
    /// deregister from external structures here.
    fn on_removed(&mut self, _ctx: &mut Context<'_>) {}
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// The capability surface handed to every component hook.
///
/// Borrows the entity directory and the spatial grid for the duration of the
/// call; `me` is the entity the executing component is attached to.
pub struct Context<'a> {
    pub(crate) entities: &'a mut EntityManager,
    pub(crate) grid: &'a mut SpatialGrid,
    pub(crate) me: EntityId,
}

impl Context<'_> {
    /// The entity the executing component is attached to.
    #[inline]
    pub fn entity_id(&self) -> EntityId {
        self.me
    }

    /// Own entity's world position.
    pub fn position(&self) -> Vec3 {
        self.entities
            .get(self.me)
            .map(|e| e.position())
            .unwrap_or(Vec3::ZERO)
    }

    /// Move the own entity.
    pub fn set_position(&mut self, position: Vec3) {
        if let Some(e) = self.entities.get_mut(self.me) {
            e.set_position(position);
        }
    }

    /// Own entity's world rotation.
    pub fn rotation(&self) -> Quat {
        self.entities
            .get(self.me)
            .map(|e| e.rotation())
            .unwrap_or(Quat::IDENTITY)
    }

    /// Rotate the own entity.
    pub fn set_rotation(&mut self, rotation: Quat) {
        if let Some(e) = self.entities.get_mut(self.me) {
            e.set_rotation(rotation);
        }
    }

    /// Unit vector the own entity is facing.
    pub fn forward(&self) -> Vec3 {
        self.entities
            .get(self.me)
            .map(|e| e.forward())
            .unwrap_or(Vec3::Z)
    }

    /// Another entity's position, if it exists.
    pub fn position_of(&self, id: EntityId) -> Option<Vec3> {
        self.entities.get(id).map(|e| e.position())
    }

    /// Whether `id` refers to a currently registered entity.
    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.get(id).is_some()
    }

    /// Resolve an entity by its registered name.
    ///
    /// A missing name is "feature unavailable", not an error.
    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.entities.find(name)
    }

    /// Borrow a sibling component on the own entity by concrete type.
    ///
    /// Returns `None` if there is no such sibling or it is currently
    /// executing. Read-only on purpose: cross-component mutation goes
    /// through messages.
    pub fn sibling<T: Component>(&self) -> Option<&T> {
        self.entities.get(self.me)?.component::<T>()
    }

    /// Borrow a component on another entity by concrete type.
    pub fn component_of<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.entities.get(id)?.component::<T>()
    }

    /// Occupants of the spatial grid near `center` (cell-granular; callers
    /// re-filter by exact distance where it matters).
    pub fn nearby(&self, center: Vec3, radius: f32) -> Vec<EntityId> {
        self.grid.query_radius(center, radius)
    }

    /// Read access to the spatial grid.
    pub fn grid(&self) -> &SpatialGrid {
        self.grid
    }

    /// Write access to the spatial grid (used by grid anchors).
    pub fn grid_mut(&mut self) -> &mut SpatialGrid {
        &mut *self.grid
    }

    /// Broadcast a message to the own entity: delivered synchronously to
    /// every subscribed handler before this call returns.
    pub fn broadcast(&mut self, msg: &Message) {
        deliver(self.entities, self.grid, self.me, msg);
    }

    /// Send a message to another entity, with identical dispatch semantics.
    /// Sending to a despawned entity is a no-op.
    pub fn send_to(&mut self, target: EntityId, msg: &Message) {
        deliver(self.entities, self.grid, target, msg);
    }
}
