//! Arena state ownership and the authoritative tick loop

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ArenaConfig;
use crate::util::time::Timer;

use super::broadcast::{BroadcastSink, Frame, StateBroadcaster};
use super::collision::{CollisionReport, CollisionResolver};
use super::combat::CombatSystem;
use super::geometry::GeometryCatalog;
use super::physics::PhysicsSystem;
use super::snapshot::SnapshotBuilder;
use super::{ArenaEvent, InputSnapshot, WorldState};

const INBOX_CAPACITY: usize = 1024;
const FRAME_CAPACITY: usize = 64;

/// Outcome of one simulation tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub shots_fired: usize,
    pub collisions: CollisionReport,
}

/// Advance the world by one fixed step.
///
/// All players move and fire (in that order, per player) before any
/// projectile is resolved, so every hit test sees post-move positions.
pub fn simulate_tick(world: &mut WorldState, dt: Duration) -> TickReport {
    world.clock += dt;
    let now = world.clock;
    let dt_secs = dt.as_secs_f32();
    let idle = InputSnapshot::default();
    let mut shots_fired = 0;

    for player in world.players.values_mut() {
        let input = world.inputs.get(&player.id).unwrap_or(&idle);
        PhysicsSystem::move_player(player, input, dt_secs, &world.config, &world.catalog);

        if let Some(projectile) = CombatSystem::try_fire(player, input, now, &world.config) {
            world.projectiles.push(projectile);
            shots_fired += 1;
        }
    }

    let collisions = CollisionResolver::resolve(world, dt_secs);
    world.tick += 1;

    TickReport {
        tick: world.tick,
        shots_fired,
        collisions,
    }
}

/// Cap a measured frame time so a stalled loop cannot tunnel bullets through cover
pub fn clamp_dt(dt: Duration, max: Duration) -> Duration {
    if dt > max {
        warn!(
            dt_ms = dt.as_millis() as u64,
            max_ms = max.as_millis() as u64,
            "Large delta time detected, clamping"
        );
        return max;
    }
    dt
}

/// Live counters exposed to the health endpoint
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaStatus {
    pub tick: u64,
    /// Simulated milliseconds since the arena started
    pub sim_time_ms: u64,
    pub players: usize,
    pub bullets: usize,
    pub snapshots_published: u64,
    pub publish_failures: u64,
}

/// Handle to the running arena, cloned into every connection
#[derive(Clone)]
pub struct ArenaHandle {
    pub inbox: mpsc::Sender<ArenaEvent>,
    pub frames: broadcast::Sender<Frame>,
    pub status: Arc<RwLock<ArenaStatus>>,
}

impl ArenaHandle {
    /// Subscribe to the state channel
    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.frames.subscribe()
    }

    pub fn status(&self) -> ArenaStatus {
        self.status.read().clone()
    }
}

/// The authoritative arena. Sole owner of the world state.
pub struct Arena {
    world: WorldState,
    inbox: mpsc::Receiver<ArenaEvent>,
    broadcaster: StateBroadcaster,
    status: Arc<RwLock<ArenaStatus>>,
}

impl Arena {
    pub fn new(config: Arc<ArenaConfig>, catalog: Arc<GeometryCatalog>) -> (Self, ArenaHandle) {
        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
        let (frames_tx, _) = broadcast::channel(FRAME_CAPACITY);
        let status = Arc::new(RwLock::new(ArenaStatus::default()));

        let handle = ArenaHandle {
            inbox: inbox_tx,
            frames: frames_tx.clone(),
            status: status.clone(),
        };

        let arena = Self {
            world: WorldState::new(config, catalog),
            inbox: inbox_rx,
            broadcaster: StateBroadcaster::new(Box::new(BroadcastSink::new(frames_tx))),
            status,
        };

        (arena, handle)
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    /// Run the fixed-rate loop until shutdown is signalled
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let config = self.world.config.clone();
        let tick_duration = config.tick_duration();
        info!(
            tick_rate = config.tick_rate,
            boxes = self.world.catalog.boxes.len(),
            "Arena loop started"
        );

        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {}
                _ = shutdown.changed() => break,
            }

            let now = Instant::now();
            let dt = clamp_dt(now - last_tick, config.max_tick_dt);
            last_tick = now;

            let timer = Timer::new();
            self.step(dt);
            if timer.elapsed_micros() > tick_duration.as_micros() as u64 {
                warn!(
                    tick = self.world.tick,
                    elapsed_us = timer.elapsed_micros(),
                    "Tick exceeded its time budget"
                );
            }
        }

        info!(tick = self.world.tick, "Arena loop stopped");
    }

    /// Apply queued events, simulate, then publish one snapshot
    pub fn step(&mut self, dt: Duration) -> TickReport {
        self.process_events();

        let report = simulate_tick(&mut self.world, dt);
        if !report.collisions.hits.is_empty() || report.shots_fired > 0 {
            debug!(
                tick = report.tick,
                shots = report.shots_fired,
                hits = report.collisions.hits.len(),
                "Combat this tick"
            );
        }

        self.broadcaster.publish(SnapshotBuilder::build(&self.world));
        self.update_status();
        report
    }

    /// Drain the inbox. Presence and input only ever change the world here.
    fn process_events(&mut self) {
        while let Ok(event) = self.inbox.try_recv() {
            match event {
                ArenaEvent::PresenceEnter {
                    player_id,
                    display_name,
                } => {
                    self.world.on_presence_enter(&player_id, display_name);
                }
                ArenaEvent::PresenceLeave { player_id } => {
                    self.world.on_presence_leave(&player_id);
                }
                ArenaEvent::Input { player_id, input } => {
                    self.world.on_input(&player_id, input);
                }
            }
        }
    }

    fn update_status(&self) {
        let stats = self.broadcaster.stats();
        let mut status = self.status.write();
        status.tick = self.world.tick;
        status.sim_time_ms = self.world.clock.as_millis() as u64;
        status.players = self.world.player_count();
        status.bullets = self.world.projectiles.len();
        status.snapshots_published = stats.total_snapshots;
        status.publish_failures = stats.publish_failures;
    }
}
