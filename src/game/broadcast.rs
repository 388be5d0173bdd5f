//! State broadcaster and the publish side of the transport

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, trace};

use crate::ws::protocol::{ServerMsg, WorldSnapshot};

use super::snapshot::SnapshotStats;

/// Serialized frame shared by every subscriber
pub type Frame = Arc<str>;

/// Publish failures. All are recoverable; the tick's snapshot is dropped.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("No subscribers on the state channel")]
    NoSubscribers,

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Transport rejected snapshot: {0}")]
    Transport(String),
}

/// Anything a snapshot can be published to
pub trait SnapshotSink: Send {
    /// Publish one message, returning the number of bytes sent
    fn publish(&self, msg: &ServerMsg) -> Result<usize, PublishError>;
}

/// Sink backed by a tokio broadcast channel of pre-serialized frames
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<Frame>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<Frame>) -> Self {
        Self { tx }
    }
}

impl SnapshotSink for BroadcastSink {
    fn publish(&self, msg: &ServerMsg) -> Result<usize, PublishError> {
        let json = serde_json::to_string(msg)?;
        let bytes = json.len();
        self.tx
            .send(Frame::from(json))
            .map_err(|_| PublishError::NoSubscribers)?;
        Ok(bytes)
    }
}

/// Publishes one full snapshot per tick, best effort
pub struct StateBroadcaster {
    sink: Box<dyn SnapshotSink>,
    stats: SnapshotStats,
}

impl StateBroadcaster {
    pub fn new(sink: Box<dyn SnapshotSink>) -> Self {
        Self {
            sink,
            stats: SnapshotStats::default(),
        }
    }

    /// Publish a snapshot. Failures are logged and the snapshot is dropped;
    /// the next tick carries fresher state, so nothing is retried.
    pub fn publish(&mut self, snapshot: WorldSnapshot) {
        let tick = snapshot.tick;
        let player_count = snapshot.players.len();

        match self.sink.publish(&ServerMsg::State(snapshot)) {
            Ok(bytes) => {
                self.stats.record(player_count, bytes);
                trace!(tick, bytes, "Snapshot published");
            }
            Err(PublishError::NoSubscribers) => {
                debug!(tick, "No subscribers, snapshot dropped");
            }
            Err(e) => {
                self.stats.record_failure();
                error!(tick, error = %e, "Failed to publish snapshot");
            }
        }
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }
}
