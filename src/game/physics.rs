//! Player movement: input integration, cover sliding and arena clamping

use crate::config::ArenaConfig;

use super::geometry::{GeometryCatalog, Vec3};
use super::world::Player;
use super::InputSnapshot;

/// Movement system for advancing player positions
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Forward and right unit vectors on the ground plane for a camera yaw.
    ///
    /// Matches the client camera: yaw 0 looks down -z with +x to the right.
    pub fn basis(yaw: f32) -> (Vec3, Vec3) {
        let (sin, cos) = yaw.sin_cos();
        let forward = Vec3::new(-sin, 0.0, -cos);
        let right = Vec3::new(cos, 0.0, -sin);
        (forward, right)
    }

    /// Desired displacement for this tick, before collision
    pub fn desired_move(input: &InputSnapshot, speed: f32, dt: f32) -> Vec3 {
        let (forward, right) = Self::basis(input.yaw);
        let mut dir = Vec3::ZERO;
        if input.up {
            dir += forward;
        }
        if input.down {
            dir += forward * -1.0;
        }
        if input.right {
            dir += right;
        }
        if input.left {
            dir += right * -1.0;
        }
        match dir.normalized() {
            Some(unit) => unit * (speed * dt),
            None => Vec3::ZERO,
        }
    }

    /// Advance one player by one tick
    pub fn move_player(
        player: &mut Player,
        input: &InputSnapshot,
        dt: f32,
        config: &ArenaConfig,
        catalog: &GeometryCatalog,
    ) {
        player.yaw = input.yaw;

        let delta = Self::desired_move(input, config.player_speed, dt);
        if delta != Vec3::ZERO {
            player.pos = Self::slide(player.pos, delta, config, catalog);
        }
        player.pos = Self::clamp_to_arena(player.pos, config);
    }

    /// Axis-separated collision: full move, then x only, then z only, else stay
    pub fn slide(from: Vec3, delta: Vec3, config: &ArenaConfig, catalog: &GeometryCatalog) -> Vec3 {
        let blocked = |pos: Vec3| {
            catalog.blocks_body(pos, config.player_radius, config.standing_height)
        };

        // A player already overlapping cover (e.g. spawned inside it) may walk out freely
        if blocked(from) {
            return from + delta;
        }

        let candidates = [
            from + delta,
            Vec3::new(from.x + delta.x, from.y, from.z),
            Vec3::new(from.x, from.y, from.z + delta.z),
        ];
        candidates
            .into_iter()
            .find(|&pos| !blocked(pos))
            .unwrap_or(from)
    }

    /// Keep the player's circle inside the arena square
    pub fn clamp_to_arena(pos: Vec3, config: &ArenaConfig) -> Vec3 {
        let bound = config.half_size - config.player_radius;
        Vec3::new(pos.x.clamp(-bound, bound), pos.y, pos.z.clamp(-bound, bound))
    }
}
