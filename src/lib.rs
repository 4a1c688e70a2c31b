pub mod api;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod keyring;
pub mod platform;
pub mod session;
pub mod state;
pub mod timer;

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, ValueEnum, Debug, Default, Serialize, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
