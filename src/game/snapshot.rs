//! Snapshot building and statistics

use crate::ws::protocol::{BulletView, PlayerView, WorldSnapshot};

use super::WorldState;

/// Builds full-state snapshots for network transmission
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Project the world into a snapshot. Always full state, never a delta.
    pub fn build(world: &WorldState) -> WorldSnapshot {
        let players = world
            .players
            .values()
            .map(|p| PlayerView {
                id: p.id.clone(),
                name: p.display_name.clone(),
                pos: p.pos,
                rot_y: p.yaw,
                hp: p.hp,
                score: p.score,
                last_input_seq: p.last_input_seq,
            })
            .collect();

        let bullets = world
            .projectiles
            .iter()
            .map(|b| BulletView {
                id: b.id.to_string(),
                pos: b.pos,
                vel: b.vel,
                owner_id: b.owner_id.clone(),
                born_at: b.spawned_at.as_millis() as u64,
            })
            .collect();

        WorldSnapshot {
            players,
            bullets,
            arena_size: world.config.arena_size(),
            tick: world.tick,
        }
    }
}

/// Snapshot publication stats for debugging
#[derive(Debug, Default, Clone)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_players_per_snapshot: f32,
    pub publish_failures: u64,
}

impl SnapshotStats {
    pub fn record(&mut self, player_count: usize, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_players_per_snapshot =
            self.avg_players_per_snapshot * ((n - 1.0) / n) + (player_count as f32 / n);
    }

    pub fn record_failure(&mut self) {
        self.publish_failures += 1;
    }
}
