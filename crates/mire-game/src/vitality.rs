//! Health, death, respawn, and progression.
//!
//! [`Vitality`] is the state machine every combat-capable entity carries.
//! Two states: Alive (`health > 0`) and Dead (`health == 0`). Damage and
//! experience arrive as messages; every mutating transition snapshots the
//! stat sheet into the persistence bridge (fire and forget, never blocking
//! the tick).
//!
//! Death runs exactly once per death: movement stops, the attacker is paid
//! experience, drop items spawn, observers hear `Death`. A revivable entity
//! (the player) re-enters Alive at full health after a fixed delay; everyone
//! else stays Dead, and further damage messages on a dead entity are no-ops.

use mire_sim::prelude::*;

use crate::persist::{PersistenceBridge, PlayerRecord, RecordHandle};
use crate::stats::{self, StatSheet};

/// Seconds between death and revival for revivable entities.
pub const DEFAULT_REVIVE_DELAY: f32 = 3.0;

// ---------------------------------------------------------------------------
// PersistTarget
// ---------------------------------------------------------------------------

/// Where a vitality record is mirrored. Entities without one (monsters)
/// live purely in memory.
#[derive(Debug, Clone)]
pub struct PersistTarget {
    bridge: PersistenceBridge,
    handle: RecordHandle,
    username: String,
}

impl PersistTarget {
    pub fn new(bridge: PersistenceBridge, handle: RecordHandle, username: impl Into<String>) -> Self {
        Self {
            bridge,
            handle,
            username: username.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Vitality
// ---------------------------------------------------------------------------

/// Health/death/respawn state machine plus the RPG progression record.
pub struct Vitality {
    sheet: StatSheet,
    revivable: bool,
    revive_delay: f32,
    /// Countdown armed on death for revivable entities; dies with the
    /// component if the entity is destroyed first.
    revive_timer: Option<f32>,
    drop_items: Vec<String>,
    persist: Option<PersistTarget>,
}

impl Vitality {
    /// A plain, non-revivable vitality record (monsters).
    pub fn new(sheet: StatSheet) -> Self {
        Self {
            sheet,
            revivable: false,
            revive_delay: DEFAULT_REVIVE_DELAY,
            revive_timer: None,
            drop_items: Vec::new(),
            persist: None,
        }
    }

    /// Mark this entity revivable (the player-controlled entity only).
    pub fn revivable(mut self) -> Self {
        self.revivable = true;
        self
    }

    /// Override the revive delay.
    pub fn with_revive_delay(mut self, seconds: f32) -> Self {
        self.revive_delay = seconds.max(0.0);
        self
    }

    /// Items dropped at the death position.
    pub fn with_drop_items(mut self, items: Vec<String>) -> Self {
        self.drop_items = items;
        self
    }

    /// Mirror this record to the external store.
    pub fn with_persistence(mut self, target: PersistTarget) -> Self {
        self.persist = Some(target);
        self
    }

    /// Current stat sheet.
    pub fn sheet(&self) -> &StatSheet {
        &self.sheet
    }

    /// Alive means strictly positive health.
    pub fn is_alive(&self) -> bool {
        self.sheet.is_alive()
    }

    fn save(&self) {
        if let Some(p) = &self.persist {
            p.bridge
                .save(p.handle, PlayerRecord::from_sheet(&p.username, &self.sheet));
        }
    }

    fn broadcast_health(&self, ctx: &mut Context<'_>) {
        ctx.broadcast(&Message::HealthUpdate {
            health: self.sheet.health,
            max_health: self.sheet.max_health,
        });
    }

    fn on_damage(&mut self, ctx: &mut Context<'_>, value: f64, attacker: Option<EntityId>) {
        if !value.is_finite() || value < 0.0 {
            tracing::warn!(entity = %ctx.entity_id(), value, "ignoring malformed damage value");
            return;
        }
        if !self.is_alive() {
            // Redundant damage on a dead entity must not re-trigger death.
            tracing::trace!(entity = %ctx.entity_id(), "damage on dead entity ignored");
            return;
        }

        self.sheet.health = self.sheet.health.saturating_sub(value.floor() as u32);
        self.save();
        if self.sheet.health == 0 {
            self.enter_death(ctx, attacker);
        }
        self.broadcast_health(ctx);
    }

    /// The one-shot death sequence.
    fn enter_death(&mut self, ctx: &mut Context<'_>, attacker: Option<EntityId>) {
        ctx.broadcast(&Message::MovementStop);
        if let Some(attacker) = attacker {
            ctx.send_to(
                attacker,
                &Message::AddExperience {
                    value: (self.sheet.level as u64 * 100) as f64,
                },
            );
            ctx.broadcast(&Message::SpawnItems {
                position: ctx.position(),
                items: self.drop_items.clone(),
            });
        }
        ctx.broadcast(&Message::Death);
        if self.revivable {
            self.revive_timer = Some(self.revive_delay);
        }
    }

    fn on_add_experience(&mut self, ctx: &mut Context<'_>, value: f64) {
        if !value.is_finite() || value < 0.0 {
            tracing::warn!(entity = %ctx.entity_id(), value, "ignoring malformed experience value");
            return;
        }

        self.sheet.experience = self.sheet.experience.saturating_add(value.floor() as u64);
        self.save();

        if self.sheet.level >= stats::LEVEL_MAX
            || self.sheet.experience < stats::xp_required_for_level(self.sheet.level)
        {
            return;
        }

        stats::level_up(&mut self.sheet);
        self.save();
        ctx.broadcast(&Message::LevelGained {
            level: self.sheet.level,
        });
        self.broadcast_health(ctx);
    }
}

impl Component for Vitality {
    fn init(&mut self, ctx: &mut Context<'_>, topics: &mut Subscriptions) {
        topics.subscribe(Topic::Damage);
        topics.subscribe(Topic::AddExperience);

        // A revivable entity restored from a record where it had died comes
        // back at full health instead of spawning dead.
        if self.revivable && self.sheet.health == 0 {
            tracing::info!(entity = %ctx.entity_id(), "restoring dead record to full health");
            self.sheet.health = self.sheet.max_health;
            self.save();
        }
        self.broadcast_health(ctx);
    }

    fn update(&mut self, ctx: &mut Context<'_>, dt: f32) {
        if let Some(timer) = &mut self.revive_timer {
            *timer -= dt;
            if *timer <= 0.0 {
                self.revive_timer = None;
                self.sheet.health = self.sheet.max_health;
                self.save();
                tracing::info!(entity = %ctx.entity_id(), "revived at full health");
                self.broadcast_health(ctx);
            }
        }
    }

    fn on_message(&mut self, ctx: &mut Context<'_>, msg: &Message) -> Result<(), SimError> {
        match msg {
            Message::Damage { value, attacker } => self.on_damage(ctx, *value, *attacker),
            Message::AddExperience { value } => self.on_add_experience(ctx, *value),
            _ => {}
        }
        Ok(())
    }
}

impl std::fmt::Debug for Vitality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vitality")
            .field("health", &self.sheet.health)
            .field("max_health", &self.sheet.max_health)
            .field("level", &self.sheet.level)
            .field("revivable", &self.revivable)
            .field("reviving", &self.revive_timer.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
