pub mod app;
pub mod audio;
pub mod engine_api;
pub mod export;
pub mod model;
pub mod notice;
pub mod playback;
pub mod provider;
pub mod session;
pub mod tui;
