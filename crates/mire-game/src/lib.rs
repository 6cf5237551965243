//! Mire Game -- combat and progression built on the [`mire_sim`] kernel.
//!
//! This crate supplies the gameplay state machines of the Mire action game:
//! stat sheets with validated construction ([`stats`]), the
//! health/death/respawn/leveling machine ([`vitality`]), animation-timed
//! melee resolution ([`combat`]), the inventory/equipment seam
//! ([`inventory`]), and fire-and-forget mirroring of player records to an
//! external store ([`persist`]).
//!
//! # Quick Start
//!
//! ```
//! use mire_game::prelude::*;
//!
//! let mut scene = Scene::new(SpatialGrid::with_default_bounds());
//! let player = scene
//!     .add_named(
//!         Entity::new()
//!             .with_component(GridAnchor::new())
//!             .with_component(Vitality::new(StatSheet::player_default()).revivable())
//!             .with_component(AttackController::new(AttackConfig::default())),
//!         "player",
//!     )
//!     .unwrap();
//!
//! // One animation pulse past the timing mark resolves the swing.
//! scene.send_to(player, &Message::PlayerAction { action: "slash".into(), time: 0.75 });
//! scene.update(1.0 / 60.0);
//! ```

#![deny(unsafe_code)]

pub mod combat;
pub mod inventory;
pub mod persist;
pub mod stats;
pub mod vitality;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the simulation kernel for convenience.
pub use mire_sim;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    // Re-export everything from the kernel prelude.
    pub use mire_sim::prelude::*;

    // Gameplay exports.
    pub use crate::combat::{AttackConfig, AttackController};
    pub use crate::inventory::{EquipSlot, Inventory, ItemSpec};
    pub use crate::persist::{
        MemoryStore, PersistenceBridge, PlayerRecord, PlayerStore, RecordHandle, SaveErrors,
        StoreError, StoreId,
    };
    pub use crate::stats::{RawStats, StatSheet};
    pub use crate::vitality::{PersistTarget, Vitality};
}
