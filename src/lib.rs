//! gridspire: session glue over the authoritative simulation core.
//!
//! The engine crates (`server_core`, `net_core`, `grid_core`,
//! `data_runtime`) hold all simulation logic; this crate binds client
//! identities to players and routes envelope messages.

pub mod server;
