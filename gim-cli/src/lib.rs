mod commands;
mod config;

pub use commands::{execute, Command};
pub use config::{load, AppConfig, Cli};

pub fn version() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
