//! World state store, input buffer and presence tracking

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ArenaConfig;

use super::combat::Projectile;
use super::geometry::{GeometryCatalog, Vec3};
use super::InputSnapshot;

/// Opaque transport-assigned player identity
pub type PlayerId = String;

/// Rejection-sampling attempts before accepting a spawn point inside cover
const SPAWN_ATTEMPTS: usize = 32;

/// Authoritative player state
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    /// Feet position; y is the ground height
    pub pos: Vec3,
    /// Facing yaw in radians
    pub yaw: f32,
    pub hp: i32,
    pub score: u32,
    /// Sequence number of the last input applied to this player
    pub last_input_seq: u32,
    /// Simulated time of the last successful shot
    pub last_shot_at: Option<Duration>,
}

impl Player {
    pub fn new(id: PlayerId, display_name: String, pos: Vec3, hp: i32) -> Self {
        Self {
            id,
            display_name,
            pos,
            yaw: 0.0,
            hp,
            score: 0,
            last_input_seq: 0,
            last_shot_at: None,
        }
    }

    /// Name shown when the client did not supply one
    pub fn default_name(id: &str) -> String {
        format!("P{}", id.chars().take(4).collect::<String>())
    }
}

/// Everything the simulation loop mutates.
///
/// Owned by exactly one task. Players are kept in a `BTreeMap` so hit
/// resolution iterates them in a stable order.
pub struct WorldState {
    pub config: Arc<ArenaConfig>,
    pub catalog: Arc<GeometryCatalog>,
    pub players: BTreeMap<PlayerId, Player>,
    pub inputs: HashMap<PlayerId, InputSnapshot>,
    pub projectiles: Vec<Projectile>,
    pub tick: u64,
    /// Simulated time, advanced by each tick's clamped dt
    pub clock: Duration,
    pub rng: ChaCha8Rng,
}

impl WorldState {
    pub fn new(config: Arc<ArenaConfig>, catalog: Arc<GeometryCatalog>) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            catalog,
            players: BTreeMap::new(),
            inputs: HashMap::new(),
            projectiles: Vec::new(),
            tick: 0,
            clock: Duration::ZERO,
            rng,
        }
    }

    /// Create the player if unknown. Returns whether a player was created.
    pub fn on_presence_enter(&mut self, player_id: &str, display_name: Option<String>) -> bool {
        if self.players.contains_key(player_id) {
            debug!(player_id = %player_id, "Presence enter for known player");
            return false;
        }
        self.spawn_player(player_id, display_name);
        true
    }

    /// Remove the player, their input and every bullet they own
    pub fn on_presence_leave(&mut self, player_id: &str) -> Option<Player> {
        let player = self.players.remove(player_id)?;
        self.inputs.remove(player_id);

        let before = self.projectiles.len();
        self.projectiles.retain(|p| p.owner_id != player_id);

        info!(
            player_id = %player_id,
            bullets_removed = before - self.projectiles.len(),
            player_count = self.players.len(),
            "Player left arena"
        );
        Some(player)
    }

    /// Store the latest input, creating the player first when input arrives
    /// before presence enter (implicit join).
    pub fn on_input(&mut self, player_id: &str, input: InputSnapshot) {
        if !self.players.contains_key(player_id) {
            debug!(player_id = %player_id, "Input from unknown player, joining implicitly");
            self.spawn_player(player_id, None);
        }
        if let Some(player) = self.players.get_mut(player_id) {
            player.last_input_seq = input.seq;
        }
        self.inputs.insert(player_id.to_string(), input);
    }

    fn spawn_player(&mut self, player_id: &str, display_name: Option<String>) {
        let pos = spawn_point(&mut self.rng, &self.config, &self.catalog);
        let name = display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| Player::default_name(player_id));
        let player = Player::new(player_id.to_string(), name, pos, self.config.start_hp);

        info!(
            player_id = %player_id,
            x = pos.x,
            z = pos.z,
            player_count = self.players.len() + 1,
            "Player joined arena"
        );
        self.players.insert(player_id.to_string(), player);
    }

    /// Latest input for a player, or an idle one if none arrived yet
    pub fn input_for(&self, player_id: &str) -> InputSnapshot {
        self.inputs.get(player_id).cloned().unwrap_or_default()
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

/// Random point inside the respawn margin, avoiding cover where possible
pub fn spawn_point(rng: &mut ChaCha8Rng, config: &ArenaConfig, catalog: &GeometryCatalog) -> Vec3 {
    let extent = config.half_size - config.respawn_margin;
    let bound = config.half_size - config.player_radius;
    let mut candidate = Vec3::ZERO;

    for _ in 0..SPAWN_ATTEMPTS {
        candidate = Vec3::new(
            rng.gen_range(-extent..=extent).clamp(-bound, bound),
            0.0,
            rng.gen_range(-extent..=extent).clamp(-bound, bound),
        );
        if !catalog.blocks_body(candidate, config.player_radius, config.standing_height) {
            return candidate;
        }
    }
    candidate
}
