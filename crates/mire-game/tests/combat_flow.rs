//! End-to-end combat flow: swing timing -> damage -> death -> experience ->
//! level-up -> revive, with records mirrored to an in-memory store.

use std::thread;
use std::time::Duration;

use glam::Vec3;
use mire_game::prelude::*;

const DT: f32 = 1.0 / 60.0;

// -- Helpers ----------------------------------------------------------------

/// Records death-related broadcasts on its entity.
#[derive(Default)]
struct BroadcastLog {
    stops: u32,
    deaths: u32,
    drops: Vec<Vec<String>>,
    levels: Vec<u32>,
}

impl Component for BroadcastLog {
    fn init(&mut self, _ctx: &mut Context<'_>, topics: &mut Subscriptions) {
        topics.subscribe(Topic::MovementStop);
        topics.subscribe(Topic::Death);
        topics.subscribe(Topic::SpawnItems);
        topics.subscribe(Topic::LevelGained);
    }

    fn on_message(&mut self, _ctx: &mut Context<'_>, msg: &Message) -> Result<(), SimError> {
        match msg {
            Message::MovementStop => self.stops += 1,
            Message::Death => self.deaths += 1,
            Message::SpawnItems { items, .. } => self.drops.push(items.clone()),
            Message::LevelGained { level } => self.levels.push(*level),
            _ => {}
        }
        Ok(())
    }
}

fn scene() -> Scene {
    Scene::new(SpatialGrid::with_default_bounds())
}

fn armed_player(scene: &mut Scene) -> EntityId {
    scene
        .add_named(
            Entity::new().with_component(ItemSpec::weapon("Sword", 3.0)),
            "sword",
        )
        .unwrap();
    let player = scene
        .add_named(
            Entity::new()
                .with_component(GridAnchor::new())
                .with_component(Vitality::new(StatSheet::player_default()).revivable())
                .with_component(Inventory::new())
                .with_component(EquipSlot::new())
                .with_component(AttackController::new(AttackConfig::default()))
                .with_component(BroadcastLog::default()),
            "player",
        )
        .unwrap();
    scene.send_to(
        player,
        &Message::InventoryAdd {
            item: "sword".to_owned(),
        },
    );
    scene.send_to(
        player,
        &Message::InventoryEquip {
            item: "sword".to_owned(),
        },
    );
    player
}

fn monster(scene: &mut Scene, name: &str, pos: Vec3) -> EntityId {
    scene
        .add_named(
            Entity::new()
                .at(pos)
                .with_component(GridAnchor::new())
                .with_component(
                    Vitality::new(StatSheet::npc_default())
                        .with_drop_items(vec!["bone".to_owned()]),
                )
                .with_component(BroadcastLog::default()),
            name,
        )
        .unwrap()
}

fn swing(scene: &mut Scene, attacker: EntityId) {
    // One swing's pulse train crossing the 0.7 mark once.
    for time in [0.2, 0.5, 0.75] {
        scene.send_to(
            attacker,
            &Message::PlayerAction {
                action: "slash".to_owned(),
                time,
            },
        );
        scene.update(DT);
    }
}

fn vitality<'a>(scene: &'a Scene, id: EntityId) -> &'a Vitality {
    scene.entity(id).unwrap().component::<Vitality>().unwrap()
}

fn log<'a>(scene: &'a Scene, id: EntityId) -> &'a BroadcastLog {
    scene.entity(id).unwrap().component::<BroadcastLog>().unwrap()
}

// -- The full kill chain ----------------------------------------------------

#[test]
fn killing_a_monster_pays_xp_and_levels_the_player() {
    let mut s = scene();
    let player = armed_player(&mut s);
    let victim = monster(&mut s, "ghost", Vec3::new(0.0, 0.0, 1.5));

    swing(&mut s, player);

    // 50 strength * 3.0 = 150 damage: the 50-health monster dies outright.
    assert!(!vitality(&s, victim).is_alive());

    // Death side effects on the victim entity.
    let victim_log = log(&s, victim);
    assert_eq!(victim_log.stops, 1, "movement stopped");
    assert_eq!(victim_log.deaths, 1, "death broadcast once");
    assert_eq!(victim_log.drops, vec![vec!["bone".to_owned()]]);

    // The kill pays level * 100 = 100 XP, which is exactly a level-up.
    let player_vitality = vitality(&s, player);
    assert_eq!(player_vitality.sheet().experience, 100);
    assert_eq!(player_vitality.sheet().level, 2);
    assert_eq!(log(&s, player).levels, vec![2]);

    // The corpse never revives.
    for _ in 0..300 {
        s.update(DT);
    }
    assert!(!vitality(&s, victim).is_alive());
}

#[test]
fn monsters_cannot_be_hit_through_the_back_of_the_head() {
    let mut s = scene();
    let player = armed_player(&mut s);
    let behind = monster(&mut s, "sneak", Vec3::new(0.0, 0.0, -1.5));

    swing(&mut s, player);

    assert!(vitality(&s, behind).is_alive());
    assert_eq!(log(&s, behind).deaths, 0);
}

#[test]
fn player_death_revives_after_three_seconds() {
    let mut s = scene();
    let player = armed_player(&mut s);

    s.send_to(
        player,
        &Message::Damage {
            value: 100.0,
            attacker: None,
        },
    );
    assert!(!vitality(&s, player).is_alive());
    assert_eq!(log(&s, player).stops, 1);
    assert_eq!(log(&s, player).deaths, 1);

    // Just short of three seconds: still dead.
    let ticks_short = (3.0 / DT) as usize - 1;
    for _ in 0..ticks_short {
        s.update(DT);
    }
    assert!(!vitality(&s, player).is_alive(), "revive must not fire early");

    // The tick that crosses the delay revives at full health.
    s.update(DT);
    s.update(DT);
    let v = vitality(&s, player);
    assert!(v.is_alive());
    assert_eq!(v.sheet().health, v.sheet().max_health);
}

// -- Persistence ------------------------------------------------------------

/// Poll the store until `check` passes or the deadline expires.
fn eventually(store: &MemoryStore, check: impl Fn(&MemoryStore) -> bool) -> bool {
    for _ in 0..400 {
        if check(store) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn player_stats_are_mirrored_to_the_store() {
    let store = MemoryStore::new();
    let (bridge, _errors) = PersistenceBridge::spawn(store.clone());

    {
        let mut s = scene();
        let handle = bridge.register(None);
        let player = s
            .add_named(
                Entity::new()
                    .with_component(GridAnchor::new())
                    .with_component(
                        Vitality::new(StatSheet::player_default())
                            .revivable()
                            .with_persistence(PersistTarget::new(
                                bridge.clone(),
                                handle,
                                "grok",
                            )),
                    ),
                "player",
            )
            .unwrap();

        s.send_to(
            player,
            &Message::Damage {
                value: 30.0,
                attacker: None,
            },
        );
        s.update(DT);
        // Scene (and the bridge clone inside the component) drop here.
    }
    drop(bridge);

    assert!(
        eventually(&store, |st| {
            st.snapshot()
                .first()
                .map(|(_, r)| r.username == "grok" && r.health == 70)
                .unwrap_or(false)
        }),
        "expected the post-damage record in the store, got {:?}",
        store.snapshot()
    );
    assert_eq!(store.len(), 1, "one create, then updates in place");
}

#[test]
fn store_failures_never_touch_simulation_state() {
    let store = MemoryStore::refusing_creates();
    let (bridge, errors) = PersistenceBridge::spawn(store);

    let mut s = scene();
    let handle = bridge.register(None);
    let player = s
        .add_named(
            Entity::new().with_component(
                Vitality::new(StatSheet::player_default())
                    .revivable()
                    .with_persistence(PersistTarget::new(bridge.clone(), handle, "grok")),
            ),
            "player",
        )
        .unwrap();

    s.send_to(
        player,
        &Message::Damage {
            value: 25.0,
            attacker: None,
        },
    );

    // Local state is authoritative regardless of the store's tantrum.
    assert_eq!(vitality(&s, player).sheet().health, 75);

    // The failure surfaces on the error feed for the UI.
    drop(s);
    drop(bridge);
    let mut saw_error = false;
    for _ in 0..400 {
        if errors.try_next().is_some() {
            saw_error = true;
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert!(saw_error, "store failure should reach the error feed");
}
