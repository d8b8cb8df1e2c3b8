// Engine core: asset cache, download pipeline, registry, and the scene task.

pub mod animation;
pub mod cache;
pub mod downloader;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod stats;
