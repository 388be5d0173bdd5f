//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::{InputSnapshot, Vec3};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Player input for the current local frame
    Input(InputPayload),

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave the arena and close the connection
    Leave,
}

/// Raw input as published by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPayload {
    /// Sequence number for client-side prediction reconciliation
    pub seq: u32,
    #[serde(default)]
    pub up: bool,
    #[serde(default)]
    pub down: bool,
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    /// Camera yaw in radians
    pub yaw: f32,
    #[serde(default)]
    pub pitch: Option<f32>,
    #[serde(default)]
    pub fire: bool,
    #[serde(default)]
    pub fire_direction: Option<Vec3>,
}

impl TryFrom<InputPayload> for InputSnapshot {
    type Error = InputError;

    fn try_from(p: InputPayload) -> Result<Self, Self::Error> {
        if !p.yaw.is_finite() {
            return Err(InputError::NonFinite("yaw"));
        }
        if p.pitch.is_some_and(|pitch| !pitch.is_finite()) {
            return Err(InputError::NonFinite("pitch"));
        }
        if p.fire_direction.is_some_and(|d| !d.is_finite()) {
            return Err(InputError::NonFinite("fireDirection"));
        }

        Ok(Self {
            seq: p.seq,
            up: p.up,
            down: p.down,
            left: p.left,
            right: p.right,
            yaw: p.yaw,
            pitch: p.pitch,
            fire: p.fire,
            fire_direction: p.fire_direction,
        })
    }
}

/// Rejected input payloads
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Non-finite value in field {0}")]
    NonFinite(&'static str),
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome(Welcome),

    /// Full world snapshot (sent every tick, replaces previous state)
    State(WorldSnapshot),

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    pub client_id: String,
    pub arena_size: f32,
    pub tick_rate: u32,
    pub server_time: u64,
}

/// Snapshot of the whole world at the end of a tick
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub players: Vec<PlayerView>,
    pub bullets: Vec<BulletView>,
    pub arena_size: f32,
    pub tick: u64,
}

/// Player state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub pos: Vec3,
    /// Facing yaw in radians
    pub rot_y: f32,
    pub hp: i32,
    pub score: u32,
    /// Last input sequence applied by the server
    pub last_input_seq: u32,
}

/// Projectile state in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulletView {
    pub id: String,
    pub pos: Vec3,
    pub vel: Vec3,
    pub owner_id: String,
    /// Simulated milliseconds at which it was fired
    pub born_at: u64,
}
