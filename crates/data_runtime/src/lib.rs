//! `data_runtime`: engine configuration and ability content specs.
//!
//! Callers get typed structs; file discovery and env overrides live here so
//! the engine crates never touch paths or `std::env` directly.

pub mod abilities;
pub mod configs {
    pub mod engine;
}
