//! Authoritative arena shooter server
//!
//! One fixed-rate simulation loop owns the world. Clients connect over
//! WebSocket, publish inputs into the arena inbox and receive a full state
//! snapshot every tick.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
