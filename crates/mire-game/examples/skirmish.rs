//! Headless skirmish: one armed player against a field of monsters.
//!
//! Drives the full stack without a renderer -- spawn, grid anchoring,
//! animation-timed swings, damage, death, experience, leveling, and record
//! mirroring to an in-memory store. Run with:
//!
//! ```text
//! cargo run --example skirmish
//! ```

use anyhow::Result;
use glam::{Quat, Vec3};
use rand::Rng;
use tracing_subscriber::EnvFilter;

use mire_game::prelude::*;

const DT: f32 = 1.0 / 60.0;
const MONSTERS: usize = 50;
const SWING_SECONDS: f32 = 1.0;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = MemoryStore::new();
    let (bridge, errors) = PersistenceBridge::spawn(store.clone());

    let mut scene = Scene::new(SpatialGrid::with_default_bounds());

    // Weapons are entities; the inventory refers to them by name.
    scene.add_named(
        Entity::new().with_component(ItemSpec::weapon("Axe", 3.0)),
        "axe",
    )?;
    scene.add_named(
        Entity::new().with_component(ItemSpec::weapon("Sword", 3.0)),
        "sword",
    )?;

    let handle = bridge.register(None);
    let player = scene.add_named(
        Entity::new()
            .with_component(GridAnchor::new())
            .with_component(
                Vitality::new(StatSheet::player_default())
                    .revivable()
                    .with_persistence(PersistTarget::new(bridge.clone(), handle, "wanderer")),
            )
            .with_component(Inventory::new())
            .with_component(EquipSlot::new())
            .with_component(AttackController::new(AttackConfig::default())),
        "player",
    )?;
    for item in ["axe", "sword"] {
        scene.send_to(player, &Message::InventoryAdd { item: item.into() });
    }
    scene.send_to(
        player,
        &Message::InventoryEquip {
            item: "sword".into(),
        },
    );

    let mut rng = rand::thread_rng();
    let mut monsters = Vec::with_capacity(MONSTERS);
    for i in 0..MONSTERS {
        let pos = Vec3::new(rng.gen_range(-30.0..30.0), 0.0, rng.gen_range(-30.0..30.0));
        let id = scene.add_named(
            Entity::new()
                .at(pos)
                .with_component(GridAnchor::new())
                .with_component(
                    Vitality::new(StatSheet::npc_default())
                        .with_drop_items(vec!["bone".to_owned()]),
                ),
            &format!("monster-{i}"),
        )?;
        monsters.push(id);
    }

    tracing::info!(monsters = MONSTERS, "skirmish starting");

    // The player walks to the nearest living monster and swings until the
    // field is clear (or ten simulated minutes pass).
    let mut clock = 0.0f32;
    let mut swing = 0.0f32;
    while clock < 600.0 {
        let alive: Vec<EntityId> = monsters
            .iter()
            .copied()
            .filter(|&id| {
                scene
                    .entity(id)
                    .and_then(|e| e.component::<Vitality>())
                    .map(|v| v.is_alive())
                    .unwrap_or(false)
            })
            .collect();
        if alive.is_empty() {
            break;
        }

        let player_pos = scene.entity(player).expect("player exists").position();
        let nearest_pos = alive
            .iter()
            .map(|id| scene.entity(*id).expect("monster exists").position())
            .min_by(|a, b| {
                a.distance_squared(player_pos)
                    .total_cmp(&b.distance_squared(player_pos))
            })
            .expect("at least one monster alive");

        let to_target = nearest_pos - player_pos;
        let entity = scene.entity_mut(player).expect("player exists");
        entity.set_rotation(Quat::from_rotation_y(to_target.x.atan2(to_target.z)));
        if to_target.length() > 1.5 {
            // Close the distance; the grid anchor re-registers on update.
            let step = to_target.normalize_or_zero() * 4.0 * DT;
            let pos = entity.position();
            entity.set_position(pos + step);
            swing = 0.0;
        } else {
            // In reach: feed the swing animation's timing pulse.
            swing += DT / SWING_SECONDS;
            if swing > 1.0 {
                swing = 0.0;
            }
            scene.send_to(
                player,
                &Message::PlayerAction {
                    action: "slash".to_owned(),
                    time: swing,
                },
            );
        }

        scene.update(DT);
        clock += DT;
    }

    let sheet = scene
        .entity(player)
        .and_then(|e| e.component::<Vitality>())
        .expect("player vitality")
        .sheet()
        .clone();
    let corpses = monsters
        .iter()
        .filter(|&&id| {
            scene
                .entity(id)
                .and_then(|e| e.component::<Vitality>())
                .map(|v| !v.is_alive())
                .unwrap_or(true)
        })
        .count();
    tracing::info!(
        simulated_seconds = clock,
        kills = corpses,
        level = sheet.level,
        experience = sheet.experience,
        strength = sheet.strength,
        "skirmish over"
    );

    // Let the persistence worker drain, then inspect the mirror.
    drop(scene);
    drop(bridge);
    std::thread::sleep(std::time::Duration::from_millis(200));
    for error in errors.drain() {
        tracing::warn!(%error, "save failure");
    }
    for (id, record) in store.snapshot() {
        tracing::info!(%id, username = %record.username, level = record.level, health = record.health, "stored record");
    }

    Ok(())
}
