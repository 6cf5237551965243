//! Mire Sim -- entity/component simulation kernel with a synchronous
//! message bus and a uniform-grid spatial index.
//!
//! This crate is the simulation core of the Mire action game: entities are
//! named containers of polymorphic [`Component`](component::Component)s,
//! components communicate exclusively through typed [`Message`](message::Message)s
//! delivered synchronously in registration order, and the
//! [`SpatialGrid`](spatial::SpatialGrid) answers proximity queries in
//! amortized constant time per occupant.
//!
//! # Quick Start
//!
//! ```
//! use mire_sim::prelude::*;
//!
//! struct Greeter;
//!
//! impl Component for Greeter {
//!     fn init(&mut self, _ctx: &mut Context<'_>, topics: &mut Subscriptions) {
//!         topics.subscribe(Topic::Damage);
//!     }
//!
//!     fn on_message(&mut self, _ctx: &mut Context<'_>, msg: &Message) -> Result<(), SimError> {
//!         if let Message::Damage { value, .. } = msg {
//!             assert!(*value >= 0.0);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut scene = Scene::new(SpatialGrid::with_default_bounds());
//! let id = scene.add_named(Entity::new().with_component(Greeter), "dummy").unwrap();
//! scene.send_to(id, &Message::Damage { value: 5.0, attacker: None });
//! scene.update(1.0 / 60.0);
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod directory;
pub mod entity;
pub mod message;
pub mod scene;
pub mod spatial;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by simulation-kernel operations.
///
/// Nothing here is allowed to halt a tick: the dispatcher logs handler
/// errors and continues, and lookup failures inside components resolve to
/// neutral defaults instead of surfacing as `SimError`.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The entity does not exist (stale generation or never registered).
    #[error("entity {entity} does not exist (stale or never registered)")]
    StaleEntity { entity: entity::EntityId },

    /// An entity name was registered twice.
    #[error("entity name '{name}' is already registered")]
    DuplicateName { name: String },

    /// No entity is registered under the given name.
    #[error("no entity registered under name '{name}'")]
    UnknownName { name: String },

    /// A topic string did not match the wire vocabulary.
    #[error("unknown message topic '{topic}'")]
    UnknownTopic { topic: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{Component, Context, Subscriptions};
    pub use crate::directory::EntityManager;
    pub use crate::entity::{Entity, EntityId};
    pub use crate::message::{Message, Topic};
    pub use crate::scene::Scene;
    pub use crate::spatial::{GridAnchor, SpatialGrid};
    pub use crate::SimError;
}
