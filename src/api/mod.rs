pub mod engine_api;
pub mod simple;
