mod cache;
mod commands;
mod config;
mod filter;
mod flatten;
mod model;
mod rpc;
mod table;
mod tree;
mod tui;

use std::process;

use anyhow::Result;
use clap::Parser;
use config::{build_config, Cli};
use env_logger::Env;
use log::LevelFilter;

fn main() {
    match try_main() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(1);
        }
    }
}

fn try_main() -> Result<bool> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    init_logging(config.log_level);
    match cli.command {
        Some(command) => commands::run(&config, command),
        None => tui::run(config).map(|()| true),
    }
}

fn init_logging(level: LevelFilter) {
    let env = Env::default().default_filter_or(level.to_string());
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
