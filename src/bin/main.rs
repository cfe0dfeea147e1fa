// SPDX-License-Identifier: AGPL-3.0-or-later

//! taskmon binary entry point

use clap::Parser;
use log::info;
use taskmon::config::Config;

#[derive(Parser, Debug)]
#[command(name = "taskmon", version, about = "Terminal task manager for Linux")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Sampling interval in milliseconds (overrides config)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Graceful-termination timeout in milliseconds (overrides config)
    #[arg(long)]
    graceful_timeout_ms: Option<u64>,

    /// Memory history length in samples (overrides config)
    #[arg(long)]
    memory_history: Option<usize>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    print_sample_config: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.print_sample_config {
        print!("{}", Config::sample_toml());
        return;
    }

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("taskmon: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "starting: tick every {:?}, graceful timeout {:?}",
        config.tick_interval(),
        config.graceful_timeout()
    );

    if let Err(e) = taskmon::tui::run(&config) {
        eprintln!("taskmon: {}", e);
        std::process::exit(1);
    }
}

fn resolve_config(cli: &Cli) -> taskmon::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };
    if let Some(ms) = cli.interval_ms {
        config.tick_interval_ms = ms;
    }
    if let Some(ms) = cli.graceful_timeout_ms {
        config.graceful_timeout_ms = ms;
    }
    if let Some(n) = cli.memory_history {
        config.memory_history_capacity = n;
    }
    if config.tick_interval_ms == 0 || config.memory_history_capacity == 0 {
        return Err(taskmon::TaskmonError::Config(
            "interval and history length must be positive".to_string(),
        ));
    }
    Ok(config)
}
