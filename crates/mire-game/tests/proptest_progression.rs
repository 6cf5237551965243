//! Property tests for damage arithmetic and the progression algorithm.

use mire_game::prelude::*;
use mire_game::stats::{self, LEVEL_MAX, STAT_MAX};
use proptest::prelude::*;

fn scene() -> Scene {
    Scene::new(SpatialGrid::new(100.0, 100.0, 10.0))
}

proptest! {
    /// For all damage >= 0 applied to an alive entity with health h, the
    /// result is max(0, h - floor(damage)), and hitting zero is Dead.
    #[test]
    fn damage_arithmetic_holds(h in 1u32..=1000, damage in 0.0f64..5000.0) {
        let mut s = scene();
        let mut sheet = StatSheet::player_default();
        sheet.max_health = 1000;
        sheet.health = h;
        let id = s.add(Entity::new().with_component(Vitality::new(sheet)));

        s.send_to(id, &Message::Damage { value: damage, attacker: None });

        let v = s.entity(id).unwrap().component::<Vitality>().unwrap();
        let expected = h.saturating_sub(damage.floor() as u32);
        prop_assert_eq!(v.sheet().health, expected);
        prop_assert_eq!(v.is_alive(), expected > 0);
    }

    /// Negative and non-finite damage never changes state.
    #[test]
    fn malformed_damage_is_inert(h in 1u32..=100, damage in -5000.0f64..-0.001) {
        let mut s = scene();
        let mut sheet = StatSheet::player_default();
        sheet.health = h;
        let id = s.add(Entity::new().with_component(Vitality::new(sheet)));

        s.send_to(id, &Message::Damage { value: damage, attacker: None });
        s.send_to(id, &Message::Damage { value: f64::NAN, attacker: None });

        let v = s.entity(id).unwrap().component::<Vitality>().unwrap();
        prop_assert_eq!(v.sheet().health, h);
    }

    /// The XP curve matches its closed form for every reachable level.
    #[test]
    fn xp_curve_matches_closed_form(level in 1u32..=50) {
        let expected = (2f64.powi(level as i32 - 1) * 100.0).round() as u64;
        prop_assert_eq!(stats::xp_required_for_level(level), expected);
    }

    /// Leveling is monotonic: experience, level, and max health never
    /// decrease under any grant sequence, and attributes stay in bounds.
    #[test]
    fn progression_is_monotonic(grants in prop::collection::vec(0.0f64..100_000.0, 1..30)) {
        let mut s = scene();
        let id = s.add(Entity::new().with_component(Vitality::new(StatSheet::player_default())));

        let mut last = s
            .entity(id).unwrap()
            .component::<Vitality>().unwrap()
            .sheet()
            .clone();

        for grant in grants {
            s.send_to(id, &Message::AddExperience { value: grant });
            let sheet = s
                .entity(id).unwrap()
                .component::<Vitality>().unwrap()
                .sheet()
                .clone();

            prop_assert!(sheet.experience >= last.experience);
            prop_assert!(sheet.level >= last.level);
            prop_assert!(sheet.max_health >= last.max_health);
            prop_assert!(sheet.level <= LEVEL_MAX);
            prop_assert!(sheet.strength <= STAT_MAX && sheet.strength >= 1);
            prop_assert!(sheet.wisdomness <= STAT_MAX && sheet.wisdomness >= 1);
            prop_assert!(sheet.benchpress <= STAT_MAX && sheet.benchpress >= 1);
            prop_assert!(sheet.curl <= STAT_MAX && sheet.curl >= 1);
            prop_assert!(sheet.health <= sheet.max_health);
            last = sheet;
        }
    }
}
