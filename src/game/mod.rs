//! Game simulation modules

pub mod arena;
pub mod broadcast;
pub mod collision;
pub mod combat;
pub mod geometry;
pub mod physics;
pub mod snapshot;
pub mod world;

pub use arena::{simulate_tick, Arena, ArenaHandle, ArenaStatus, TickReport};
pub use broadcast::{BroadcastSink, PublishError, SnapshotSink, StateBroadcaster};
pub use geometry::{CoverBox, GeometryCatalog, Vec3};
pub use world::{Player, PlayerId, WorldState};

/// Event delivered to the arena inbox by the transport layer.
///
/// Transport callbacks never touch the world directly; they only enqueue one
/// of these and the simulation loop applies it at the start of the next tick.
#[derive(Debug, Clone)]
pub enum ArenaEvent {
    PresenceEnter {
        player_id: PlayerId,
        display_name: Option<String>,
    },
    PresenceLeave {
        player_id: PlayerId,
    },
    Input {
        player_id: PlayerId,
        input: InputSnapshot,
    },
}

/// Latest known input of one player (last write wins)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    pub seq: u32,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Camera yaw in radians; the avatar always faces this way
    pub yaw: f32,
    /// Camera pitch in radians, positive looks down
    pub pitch: Option<f32>,
    pub fire: bool,
    /// Client-computed aim, preferred over yaw/pitch when present
    pub fire_direction: Option<Vec3>,
}
