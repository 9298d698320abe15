pub mod api;
pub mod app;
pub mod config;
pub mod logging;
pub mod session;
pub mod state;
pub mod terminal;
pub mod types;
pub mod ui;
