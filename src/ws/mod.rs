//! WebSocket transport: presence, input publication and state subscription

pub mod handler;
pub mod presence;
pub mod protocol;

pub use presence::PresenceRegistry;
