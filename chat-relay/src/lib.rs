//! Real-time chat relay served over HTTP and WebSocket.
//!
//! Clients register a display name with `POST /new-user`, then open a
//! WebSocket. Every join and every leave pushes the full participant list to
//! all open connections; chat messages are relayed verbatim to everyone.
//!
//! - [`cli`] parses configuration from flags and the environment.
//! - [`message`] defines the JSON wire protocol and the [`message::Frame`]
//!   type that preserves text/binary framing.
//! - [`registry`] holds the participant list behind a lock.
//! - [`broadcast`] fans a frame out to every open connection.
//! - [`hub`] ties the registry and the connection set together and dispatches
//!   inbound events.
//! - [`session`] drives a single WebSocket with a reader loop and a writer task.
//! - [`http`] builds the axum router.
//! - [`server`] binds the listener and runs until shutdown.

pub mod broadcast;
pub mod cli;
pub mod http;
pub mod hub;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
