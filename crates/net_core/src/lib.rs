//! `net_core`: message envelope + replication plumbing.
//!
//! Scope
//! - Defines the JSON envelope (`CONNECTION` / `CAST` / `ACTION`) and the
//!   serialized action and snapshot schemas
//! - Provides an in-proc framed channel for the local loop
//!
//! The engine core (`server_core`) resolves wire references against its
//! registries; this crate stays id-based and engine-agnostic.
#![deny(warnings, clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod channel;
pub mod frame;
pub mod message;
pub mod snapshot;
pub mod wire;
