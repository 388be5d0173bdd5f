//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::broadcast::Frame;
use crate::game::{ArenaEvent, InputSnapshot};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg, Welcome};

const MAX_CLIENT_ID_LEN: usize = 64;
const MAX_NAME_LEN: usize = 24;
const DIRECT_CAPACITY: usize = 16;
/// Close code sent to clients when the server is going away
const CLOSE_GOING_AWAY: u16 = 1001;

/// Query parameters for WebSocket connection
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Stable client id; a fresh one is assigned when absent or unusable
    pub client_id: Option<String>,
    /// Display name shown to other players
    pub name: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let client_id = resolve_client_id(query.client_id.as_deref());
    let display_name = sanitize_name(query.name.as_deref());

    info!(client_id = %client_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, client_id, display_name, state))
}

/// Keep a client-supplied id if it is usable, otherwise mint one
pub fn resolve_client_id(requested: Option<&str>) -> String {
    match requested.map(str::trim) {
        Some(id)
            if !id.is_empty()
                && id.len() <= MAX_CLIENT_ID_LEN
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            id.to_string()
        }
        _ => Uuid::new_v4().to_string(),
    }
}

/// Trim and bound a display name; blank names fall back to the default
pub fn sanitize_name(requested: Option<&str>) -> Option<String> {
    let name: String = requested?
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LEN)
        .collect();
    (!name.is_empty()).then_some(name)
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(
    socket: WebSocket,
    client_id: String,
    display_name: Option<String>,
    state: AppState,
) {
    info!(client_id = %client_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome(Welcome {
        client_id: client_id.clone(),
        arena_size: state.catalog.arena_size,
        tick_rate: state.config.arena.tick_rate,
        server_time: unix_millis(),
    });

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(client_id = %client_id, error = %e, "Failed to send welcome");
        return;
    }

    // Subscribe before announcing presence so the first snapshot containing
    // this player is not missed
    let frames_rx = state.arena.subscribe();

    // Inbox slots are reserved up front so the presence transition and its
    // event are committed together under the registry entry lock
    let Ok(permit) = state.arena.inbox.reserve().await else {
        error!(client_id = %client_id, "Arena inbox closed");
        return;
    };
    let enter = ArenaEvent::PresenceEnter {
        player_id: client_id.clone(),
        display_name,
    };
    state
        .presence
        .register_with(&client_id, move || permit.send(enter));

    run_session(&client_id, &state, ws_sink, ws_stream, frames_rx).await;

    let leave = ArenaEvent::PresenceLeave {
        player_id: client_id.clone(),
    };
    match state.arena.inbox.reserve().await {
        Ok(permit) => {
            state
                .presence
                .unregister_with(&client_id, move || permit.send(leave));
        }
        Err(_) => {
            debug!(client_id = %client_id, "Arena inbox closed before leave");
            state.presence.unregister_with(&client_id, || {});
        }
    }

    info!(client_id = %client_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    client_id: &str,
    state: &AppState,
    ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    frames_rx: broadcast::Receiver<Frame>,
) {
    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
    let (direct_tx, direct_rx) = mpsc::channel(DIRECT_CAPACITY);

    let writer_handle = tokio::spawn(write_loop(
        client_id.to_string(),
        ws_sink,
        frames_rx,
        direct_rx,
        state.shutdown.clone(),
    ));

    let mut shutdown = state.shutdown.clone();

    // Reader loop: WebSocket -> arena inbox
    loop {
        let result = tokio::select! {
            next = ws_stream.next() => match next {
                Some(result) => result,
                None => break,
            },
            _ = shutdown.changed() => break,
        };

        match result {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(ClientMsg::Input(_)) if !rate_limiter.check_input() => {
                        debug!(client_id = %client_id, "Rate limited input message");
                    }
                    Ok(ClientMsg::Input(payload)) => match InputSnapshot::try_from(payload) {
                        Ok(input) => {
                            let event = ArenaEvent::Input {
                                player_id: client_id.to_string(),
                                input,
                            };
                            // Inputs are last-write-wins, so a full inbox drops rather than blocks
                            match state.arena.inbox.try_send(event) {
                                Ok(()) => {}
                                Err(mpsc::error::TrySendError::Full(_)) => {
                                    warn!(client_id = %client_id, "Arena inbox full, input dropped");
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => {
                                    debug!(client_id = %client_id, "Arena inbox closed");
                                    break;
                                }
                            }
                        }
                        Err(e) => {
                            debug!(client_id = %client_id, error = %e, "Dropping malformed input");
                        }
                    },
                    Ok(ClientMsg::Ping { t }) => {
                        // Full queue means the writer is behind; a lost pong is harmless
                        let _ = direct_tx.try_send(ServerMsg::Pong { t });
                    }
                    Ok(ClientMsg::Leave) => {
                        info!(client_id = %client_id, "Client left the arena");
                        break;
                    }
                    Err(e) => {
                        debug!(client_id = %client_id, error = %e, "Failed to parse client message");
                        let _ = direct_tx.try_send(ServerMsg::Error {
                            code: "bad_message".to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(client_id = %client_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(client_id = %client_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(client_id = %client_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    if *shutdown.borrow() {
        // Let the writer deliver its close frame
        let _ = writer_handle.await;
    } else {
        writer_handle.abort();
    }
}

/// Writer task: state frames and direct replies -> WebSocket
async fn write_loop(
    client_id: String,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut frames_rx: broadcast::Receiver<Frame>,
    mut direct_rx: mpsc::Receiver<ServerMsg>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            frame = frames_rx.recv() => match frame {
                Ok(frame) => {
                    if let Err(e) = ws_sink.send(Message::Text(frame.to_string())).await {
                        debug!(client_id = %client_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Snapshots are full state; skipping stale ones is fine
                    warn!(client_id = %client_id, lagged_count = n, "Client lagged, skipping snapshots");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(client_id = %client_id, "State channel closed");
                    break;
                }
            },
            Some(msg) = direct_rx.recv() => {
                if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                    debug!(client_id = %client_id, error = %e, "WebSocket send failed");
                    break;
                }
            }
            _ = shutdown.changed() => {
                let close = Message::Close(Some(CloseFrame {
                    code: CLOSE_GOING_AWAY,
                    reason: "server shutting down".into(),
                }));
                let _ = ws_sink.send(close).await;
                break;
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_usable_client_ids() {
        assert_eq!(resolve_client_id(Some("abc-123_x")), "abc-123_x");
        assert_eq!(resolve_client_id(Some("  padded ")), "padded");
    }

    #[test]
    fn replaces_unusable_client_ids() {
        for bad in [None, Some(""), Some("   "), Some("has space"), Some("a/b")] {
            let id = resolve_client_id(bad);
            assert!(Uuid::parse_str(&id).is_ok(), "{bad:?} -> {id}");
        }
        let long = "x".repeat(MAX_CLIENT_ID_LEN + 1);
        assert_ne!(resolve_client_id(Some(&long)), long);
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(sanitize_name(Some("  Ace ")), Some("Ace".to_string()));
        assert_eq!(sanitize_name(Some("   ")), None);
        assert_eq!(sanitize_name(None), None);
        let long = "n".repeat(100);
        assert_eq!(sanitize_name(Some(&long)).unwrap().len(), MAX_NAME_LEN);
    }
}
