use std::fs;

use anyhow::{Context, Result};
use clap::{Args, Parser};
use serde::Deserialize;

use crate::Command;

#[derive(Parser, Debug)]
#[command(name = "groupctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: AppConfig,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    /// TOML file overriding every other option
    #[clap(long)]
    #[arg(short = 'c')]
    #[serde(default)]
    pub config: Option<String>,
    #[clap(long, env, default_value = "")]
    #[serde(default)]
    pub database_url: String,
    #[clap(long, env)]
    #[arg(default_value_t = 50)]
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    #[clap(long, env)]
    #[arg(default_value_t = 1)]
    #[serde(default = "default_min_idle")]
    pub min_idle: u32,
    #[clap(long, env)]
    #[arg(default_value_t = false)]
    #[serde(default)]
    pub run_migrations: bool,
    #[clap(long, env)]
    #[arg(default_value_t = default_rust_log())]
    #[serde(default = "default_rust_log")]
    pub rust_log: String,
}

impl AppConfig {
    /// Applies `--config` when given.
    pub fn resolve(self) -> Result<Self> {
        let config = match &self.config {
            Some(path) => load(path)?,
            None => self,
        };
        if config.database_url.is_empty() {
            anyhow::bail!("database_url is required");
        }
        Ok(config)
    }
}

fn default_rust_log() -> String {
    String::from("gim_cli=info,gim_storage=info")
}

fn default_max_size() -> u32 {
    50
}

fn default_min_idle() -> u32 {
    1
}

pub fn load(cfg: &str) -> Result<AppConfig> {
    let content =
        fs::read_to_string(cfg).context("could not read config file")?;
    parse(&content)
}

fn parse(content: &str) -> Result<AppConfig> {
    toml::from_str(content).context("could not parse config file")
}
