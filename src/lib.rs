#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod config;
pub mod data;
pub mod download;
pub mod filename;
pub mod media;
pub mod moderation;
pub mod player;
pub mod reaction;
pub mod render;
pub mod retrieval;
pub mod telemetry;
pub mod view;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
