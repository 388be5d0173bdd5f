//! End-to-end simulation scenarios driven through the public API

use std::sync::Arc;
use std::time::Duration;

use arena_server::config::ArenaConfig;
use arena_server::game::geometry::{CoverBox, GeometryCatalog, Vec3};
use arena_server::game::{simulate_tick, Arena, ArenaEvent, InputSnapshot, WorldState};

fn tick_dt() -> Duration {
    Duration::from_secs(1) / 30
}

fn world_with(config: ArenaConfig, boxes: Vec<CoverBox>) -> WorldState {
    let catalog = GeometryCatalog::from_boxes(config.half_size, boxes);
    WorldState::new(Arc::new(config), Arc::new(catalog))
}

fn seeded() -> ArenaConfig {
    ArenaConfig {
        seed: Some(42),
        ..ArenaConfig::default()
    }
}

fn place(world: &mut WorldState, id: &str, x: f32, z: f32) {
    world.on_presence_enter(id, None);
    world.players.get_mut(id).unwrap().pos = Vec3::new(x, 0.0, z);
}

fn firing() -> InputSnapshot {
    InputSnapshot {
        fire: true,
        ..Default::default()
    }
}

/// Shooter at z = -5 firing the yaw-only aim (+z at yaw 0), target at z = +5
fn duel(boxes: Vec<CoverBox>) -> WorldState {
    let mut world = world_with(seeded(), boxes);
    place(&mut world, "a", 0.0, -5.0);
    place(&mut world, "b", 0.0, 5.0);

    world.on_input("a", firing());
    simulate_tick(&mut world, tick_dt());
    world.on_input("a", InputSnapshot::default());

    for _ in 0..60 {
        simulate_tick(&mut world, tick_dt());
    }
    world
}

#[test]
fn player_walks_seven_units_in_one_second() {
    let mut world = world_with(seeded(), Vec::new());
    world.on_input(
        "runner",
        InputSnapshot {
            up: true,
            ..Default::default()
        },
    );
    world.players.get_mut("runner").unwrap().pos = Vec3::ZERO;

    for _ in 0..30 {
        simulate_tick(&mut world, tick_dt());
    }

    let pos = world.player("runner").unwrap().pos;
    // Yaw 0 looks down -z
    assert!((pos.z + 7.0).abs() < 1e-3, "z = {}", pos.z);
    assert!(pos.x.abs() < 1e-4);
}

#[test]
fn players_never_leave_the_arena() {
    let mut world = world_with(seeded(), GeometryCatalog::standard(20.0).boxes);
    let directions = [(true, false, false, false), (false, true, false, true), (false, false, true, false)];
    for (i, &(up, down, left, right)) in directions.iter().enumerate() {
        world.on_input(
            &format!("p{i}"),
            InputSnapshot {
                up,
                down,
                left,
                right,
                yaw: i as f32 * 0.9,
                ..Default::default()
            },
        );
    }

    let bound = world.config.half_size - world.config.player_radius;
    for _ in 0..300 {
        simulate_tick(&mut world, tick_dt());
        for player in world.players.values() {
            assert!(player.pos.x.abs() <= bound + 1e-4);
            assert!(player.pos.z.abs() <= bound + 1e-4);
        }
    }
}

#[test]
fn kill_scores_and_respawns_target() {
    let world = duel(Vec::new());

    let shooter = world.player("a").unwrap();
    let target = world.player("b").unwrap();
    assert_eq!(shooter.score, 1);
    assert_eq!(target.hp, world.config.start_hp);
    assert_ne!(target.pos, Vec3::new(0.0, 0.0, 5.0));

    let extent = world.config.half_size - world.config.respawn_margin;
    assert!(target.pos.x.abs() <= extent && target.pos.z.abs() <= extent);
    assert!(world.projectiles.is_empty());
}

#[test]
fn cover_between_players_stops_the_kill() {
    let wall = CoverBox::grounded(0.0, 0.0, 4.0, 3.0, 0.5);
    let world = duel(vec![wall]);

    assert_eq!(world.player("a").unwrap().score, 0);
    assert_eq!(world.player("b").unwrap().pos, Vec3::new(0.0, 0.0, 5.0));
    assert!(world.projectiles.is_empty());
}

#[test]
fn held_trigger_respects_cooldown() {
    let mut world = world_with(seeded(), Vec::new());
    place(&mut world, "a", 0.0, 0.0);
    world.on_input("a", firing());

    let mut shot_times = Vec::new();
    for _ in 0..60 {
        let report = simulate_tick(&mut world, tick_dt());
        assert!(report.shots_fired <= 1);
        if report.shots_fired == 1 {
            shot_times.push(world.clock);
        }
    }

    assert!(shot_times.len() >= 10);
    for pair in shot_times.windows(2) {
        assert!(pair[1] - pair[0] >= world.config.fire_cooldown);
    }
}

#[test]
fn bullet_lives_at_most_its_lifetime_plus_one_tick() {
    let config = ArenaConfig {
        bullet_speed: 1.0,
        ..seeded()
    };
    let lifetime = config.bullet_lifetime;
    let mut world = world_with(config, Vec::new());
    place(&mut world, "a", 0.0, 0.0);

    world.on_input("a", firing());
    simulate_tick(&mut world, tick_dt());
    world.on_input("a", InputSnapshot::default());
    let born = world.projectiles[0].spawned_at;

    let mut ticks = 0;
    while !world.projectiles.is_empty() {
        simulate_tick(&mut world, tick_dt());
        ticks += 1;
        assert!(ticks < 200, "bullet never expired");
    }

    let age_at_removal = world.clock - born;
    assert!(age_at_removal > lifetime);
    assert!(age_at_removal <= lifetime + tick_dt());
}

#[test]
fn same_seed_same_outcome() {
    let run = || {
        let mut world = duel(GeometryCatalog::standard(20.0).boxes);
        world.on_input("c", InputSnapshot::default());
        simulate_tick(&mut world, tick_dt());
        world
            .players
            .values()
            .map(|p| (p.id.clone(), p.pos, p.score))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[tokio::test]
async fn leaving_mid_flight_removes_owned_bullets() {
    let config = Arc::new(seeded());
    let catalog = Arc::new(GeometryCatalog::boundary_only(config.half_size));
    let (mut arena, handle) = Arena::new(config, catalog);

    for id in ["a", "b"] {
        handle
            .inbox
            .send(ArenaEvent::PresenceEnter {
                player_id: id.into(),
                display_name: None,
            })
            .await
            .unwrap();
        handle
            .inbox
            .send(ArenaEvent::Input {
                player_id: id.into(),
                input: firing(),
            })
            .await
            .unwrap();
    }
    arena.step(tick_dt());
    assert_eq!(arena.world().projectiles.len(), 2);

    handle
        .inbox
        .send(ArenaEvent::PresenceLeave {
            player_id: "b".into(),
        })
        .await
        .unwrap();
    arena.step(tick_dt());

    assert!(arena.world().player("b").is_none());
    assert!(arena.world().inputs.get("b").is_none());
    assert!(arena.world().projectiles.iter().all(|p| p.owner_id == "a"));
    assert_eq!(handle.status().players, 1);
}
