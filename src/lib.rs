//! Remote-driven AR scene engine: an ETag-validated asset cache and download
//! pipeline feeding a scene lifecycle state machine.

pub mod api;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod scene;
pub mod source;

pub use api::engine_api::ArEngine;
pub use config::EngineConfig;
