//! The message bus vocabulary.
//!
//! Components communicate exclusively through messages: an immutable payload
//! delivered synchronously, in handler-registration order, to every handler
//! subscribed to the message's topic on the target entity.
//!
//! [`Message`] is a tagged union with a fixed payload shape per kind, so
//! payload mistakes are compile errors rather than runtime surprises. The
//! dotted topic strings of the original wire contract are preserved as a
//! serde compatibility shim (`{"topic": "health.damage", ...}`) and through
//! [`Topic::as_str`] / [`Topic::from_str`].

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::SimError;

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// Subscription key for message delivery. One variant per [`Message`] kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Animation-driven attack pulse, produced by the (external) animation
    /// driver every tick while an attack animation plays.
    PlayerAction,
    /// Apply damage to the receiving entity.
    Damage,
    /// Grant experience to the receiving entity.
    AddExperience,
    /// Health changed; read-only notification for UI consumers.
    HealthUpdate,
    /// The receiving entity just died.
    Death,
    /// The receiving entity gained a level.
    LevelGained,
    /// Halt locomotion (broadcast on death).
    MovementStop,
    /// Drop items into the world at a position.
    SpawnItems,
    /// Put an item into the receiving entity's inventory.
    InventoryAdd,
    /// Equip an item already in the receiving entity's inventory.
    InventoryEquip,
}

impl Topic {
    /// The dotted wire string for this topic.
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::PlayerAction => "player.action",
            Topic::Damage => "health.damage",
            Topic::AddExperience => "health.add-experience",
            Topic::HealthUpdate => "health.update",
            Topic::Death => "health.death",
            Topic::LevelGained => "health.levelGained",
            Topic::MovementStop => "movement.stop",
            Topic::SpawnItems => "spawn.items",
            Topic::InventoryAdd => "inventory.add",
            Topic::InventoryEquip => "inventory.equip",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player.action" => Ok(Topic::PlayerAction),
            "health.damage" => Ok(Topic::Damage),
            "health.add-experience" => Ok(Topic::AddExperience),
            "health.update" => Ok(Topic::HealthUpdate),
            "health.death" => Ok(Topic::Death),
            "health.levelGained" => Ok(Topic::LevelGained),
            "movement.stop" => Ok(Topic::MovementStop),
            "spawn.items" => Ok(Topic::SpawnItems),
            "inventory.add" => Ok(Topic::InventoryAdd),
            "inventory.equip" => Ok(Topic::InventoryEquip),
            other => Err(SimError::UnknownTopic {
                topic: other.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// An immutable message payload.
///
/// Delivery is synchronous and depth-recursive: a broadcast is fully
/// processed, including any nested broadcasts it triggers, before the call
/// returns. There is no queuing across ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic")]
pub enum Message {
    /// `{action, time}` -- the animation pulse consumed by attack timing.
    #[serde(rename = "player.action")]
    PlayerAction { action: String, time: f32 },

    /// `{value, attacker}` -- damage to apply. `value` is validated by the
    /// receiver (negative or non-finite values are ignored there).
    #[serde(rename = "health.damage")]
    Damage {
        value: f64,
        attacker: Option<EntityId>,
    },

    /// `{value}` -- experience to grant; validated by the receiver.
    #[serde(rename = "health.add-experience")]
    AddExperience { value: f64 },

    /// `{health, max_health}` -- post-change health notification.
    #[serde(rename = "health.update")]
    HealthUpdate { health: u32, max_health: u32 },

    /// The entity transitioned to Dead.
    #[serde(rename = "health.death")]
    Death,

    /// `{level}` -- the entity reached a new level.
    #[serde(rename = "health.levelGained")]
    LevelGained { level: u32 },

    /// Stop all movement.
    #[serde(rename = "movement.stop")]
    MovementStop,

    /// `{position, items}` -- item names dropped at a world position.
    #[serde(rename = "spawn.items")]
    SpawnItems { position: Vec3, items: Vec<String> },

    /// `{item}` -- item entity name to add to the inventory.
    #[serde(rename = "inventory.add")]
    InventoryAdd { item: String },

    /// `{item}` -- item entity name to equip.
    #[serde(rename = "inventory.equip")]
    InventoryEquip { item: String },
}

impl Message {
    /// The topic this message is delivered under.
    pub fn topic(&self) -> Topic {
        match self {
            Message::PlayerAction { .. } => Topic::PlayerAction,
            Message::Damage { .. } => Topic::Damage,
            Message::AddExperience { .. } => Topic::AddExperience,
            Message::HealthUpdate { .. } => Topic::HealthUpdate,
            Message::Death => Topic::Death,
            Message::LevelGained { .. } => Topic::LevelGained,
            Message::MovementStop => Topic::MovementStop,
            Message::SpawnItems { .. } => Topic::SpawnItems,
            Message::InventoryAdd { .. } => Topic::InventoryAdd,
            Message::InventoryEquip { .. } => Topic::InventoryEquip,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_string_roundtrip() {
        let topics = [
            Topic::PlayerAction,
            Topic::Damage,
            Topic::AddExperience,
            Topic::HealthUpdate,
            Topic::Death,
            Topic::LevelGained,
            Topic::MovementStop,
            Topic::SpawnItems,
            Topic::InventoryAdd,
            Topic::InventoryEquip,
        ];
        for topic in topics {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
    }

    #[test]
    fn unknown_topic_is_an_error() {
        assert!("health.explode".parse::<Topic>().is_err());
    }

    #[test]
    fn wire_format_uses_dotted_topics() {
        let msg = Message::Damage {
            value: 150.0,
            attacker: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["topic"], "health.damage");
        assert_eq!(json["value"], 150.0);

        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn message_topic_matches_variant() {
        let msg = Message::LevelGained { level: 3 };
        assert_eq!(msg.topic(), Topic::LevelGained);
        assert_eq!(msg.topic().as_str(), "health.levelGained");
    }
}
