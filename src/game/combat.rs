//! Combat system - weapons, projectiles and damage

use std::time::Duration;
use uuid::Uuid;

use crate::config::ArenaConfig;

use super::geometry::Vec3;
use super::world::{Player, PlayerId};
use super::InputSnapshot;

/// Active projectile in the arena
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: Uuid,
    pub owner_id: PlayerId,
    pub pos: Vec3,
    pub vel: Vec3,
    /// Simulated time at which the projectile was fired
    pub spawned_at: Duration,
}

impl Projectile {
    pub fn new(owner_id: PlayerId, pos: Vec3, vel: Vec3, spawned_at: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            pos,
            vel,
            spawned_at,
        }
    }

    /// Whether the projectile has outlived `lifetime` at simulated time `now`
    pub fn is_expired(&self, now: Duration, lifetime: Duration) -> bool {
        now.saturating_sub(self.spawned_at) > lifetime
    }
}

/// Combat system for firing and damage
pub struct CombatSystem;

impl CombatSystem {
    /// Check if the cooldown since the last shot has elapsed
    pub fn can_fire(last_shot_at: Option<Duration>, now: Duration, cooldown: Duration) -> bool {
        match last_shot_at {
            Some(last) => now.saturating_sub(last) >= cooldown,
            None => true,
        }
    }

    /// Aim direction: explicit vector, else yaw + pitch, else flat yaw
    pub fn fire_direction(input: &InputSnapshot, yaw: f32) -> Vec3 {
        if let Some(dir) = input.fire_direction.and_then(Vec3::normalized) {
            return dir;
        }
        let (sin_yaw, cos_yaw) = yaw.sin_cos();
        match input.pitch {
            Some(pitch) => {
                let (sin_pitch, cos_pitch) = pitch.sin_cos();
                Vec3::new(sin_yaw * cos_pitch, -sin_pitch, cos_yaw * cos_pitch)
            }
            None => Vec3::new(sin_yaw, 0.0, cos_yaw),
        }
    }

    /// Fire if the player wants to and the cooldown allows it.
    ///
    /// Records the shot time on success; holding fire therefore produces one
    /// projectile per cooldown period.
    pub fn try_fire(
        player: &mut Player,
        input: &InputSnapshot,
        now: Duration,
        config: &ArenaConfig,
    ) -> Option<Projectile> {
        if !input.fire || !Self::can_fire(player.last_shot_at, now, config.fire_cooldown) {
            return None;
        }

        let dir = Self::fire_direction(input, player.yaw);
        let offset = config.player_radius + config.muzzle_offset;
        let muzzle = Vec3::new(
            player.pos.x + dir.x * offset,
            player.pos.y + config.muzzle_height,
            player.pos.z + dir.z * offset,
        );

        player.last_shot_at = Some(now);
        Some(Projectile::new(
            player.id.clone(),
            muzzle,
            dir * config.bullet_speed,
            now,
        ))
    }

    /// Apply one point of damage, returns true when the target dies
    pub fn apply_damage(target: &mut Player) -> bool {
        target.hp -= 1;
        target.hp <= 0
    }
}
