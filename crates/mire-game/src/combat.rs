//! Melee attack resolution driven by animation timing.
//!
//! The (external) animation layer broadcasts a `player.action` pulse every
//! tick while an attack animation plays: the action label plus the elapsed
//! animation time. [`AttackController`] turns that stream into at most one
//! hit per swing: the strike resolves on the exact tick where the elapsed
//! time crosses the configured timing fraction (edge-triggered -- a level
//! check would land a hit on every later pulse of the same swing).
//!
//! On the strike tick: resolve the wielded weapon's damage multiplier, pull
//! candidates from the spatial grid, keep the living ones inside the melee
//! radius and the forward cone, and send each a damage message.

use mire_sim::prelude::*;

use crate::inventory::equipped_damage_multiplier;
use crate::vitality::Vitality;

// ---------------------------------------------------------------------------
// AttackConfig
// ---------------------------------------------------------------------------

/// Tuning for one attacker.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Fraction of the animation at which the swing connects.
    pub hit_timing: f32,
    /// Melee reach in world units.
    pub melee_range: f32,
    /// Minimum cosine between the attacker's forward vector and the
    /// direction to the target (0.9 is roughly a 25-degree half-angle).
    pub facing_cosine_min: f32,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            hit_timing: 0.7,
            melee_range: 2.0,
            facing_cosine_min: 0.9,
        }
    }
}

// ---------------------------------------------------------------------------
// AttackController
// ---------------------------------------------------------------------------

/// Turns animation pulses into damage messages.
pub struct AttackController {
    config: AttackConfig,
    /// Label of the swing currently being timed.
    action: Option<String>,
    /// Elapsed animation time reported by the last pulse.
    elapsed: f32,
}

impl AttackController {
    pub fn new(config: AttackConfig) -> Self {
        Self {
            config,
            action: None,
            elapsed: 0.0,
        }
    }

    /// Controller with only the timing fraction overridden (monsters swing
    /// earlier in their animation than the player).
    pub fn with_timing(hit_timing: f32) -> Self {
        Self::new(AttackConfig {
            hit_timing,
            ..AttackConfig::default()
        })
    }

    fn on_action(&mut self, ctx: &mut Context<'_>, action: &str, time: f32) {
        // A new swing starts its own timing window.
        if self.action.as_deref() != Some(action) {
            self.action = Some(action.to_owned());
            self.elapsed = 0.0;
        }

        let previous = self.elapsed;
        self.elapsed = time;

        // Edge trigger: exactly one strike per crossing of the timing mark.
        if !(previous < self.config.hit_timing && self.config.hit_timing <= self.elapsed) {
            return;
        }
        self.strike(ctx);
    }

    fn strike(&self, ctx: &mut Context<'_>) {
        // No stat sheet on the attacker means no damage to compute.
        let Some(strength) = ctx.sibling::<Vitality>().map(|v| v.sheet().strength) else {
            tracing::debug!(entity = %ctx.entity_id(), "attacker has no vitality; swing has no effect");
            return;
        };
        let multiplier = equipped_damage_multiplier(ctx);
        let damage = (strength as f32 * multiplier).round() as f64;

        let me = ctx.entity_id();
        let origin = ctx.position();
        let forward = ctx.forward();
        let range = self.config.melee_range;

        // Grid candidates are cell-granular; re-filter by exact distance.
        let mut struck = Vec::new();
        for target in ctx.nearby(origin, range) {
            if target == me {
                continue;
            }
            let alive = ctx
                .component_of::<Vitality>(target)
                .map(|v| v.is_alive())
                .unwrap_or(false);
            if !alive {
                continue;
            }
            let Some(target_pos) = ctx.position_of(target) else {
                continue;
            };
            let offset = target_pos - origin;
            if offset.length_squared() > range * range {
                continue;
            }
            let to_target = offset.normalize_or_zero();
            if forward.dot(to_target) >= self.config.facing_cosine_min {
                struck.push(target);
            }
        }

        for target in struck {
            ctx.send_to(
                target,
                &Message::Damage {
                    value: damage,
                    attacker: Some(me),
                },
            );
        }
    }
}

impl Component for AttackController {
    fn init(&mut self, _ctx: &mut Context<'_>, topics: &mut Subscriptions) {
        topics.subscribe(Topic::PlayerAction);
    }

    fn on_message(&mut self, ctx: &mut Context<'_>, msg: &Message) -> Result<(), SimError> {
        if let Message::PlayerAction { action, time } = msg {
            self.on_action(ctx, action, *time);
        }
        Ok(())
    }
}

impl std::fmt::Debug for AttackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttackController")
            .field("action", &self.action)
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
