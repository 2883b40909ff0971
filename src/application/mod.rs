pub mod app;
pub mod cli;
pub mod config;
pub mod web;

pub use app::*;
pub use cli::*;
pub use config::*;
