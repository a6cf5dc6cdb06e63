mod config;
mod layout;
mod replay;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use splitkb_core::DEFAULT_KEYMAP;

use config::Config;

#[derive(Parser)]
#[command(name = "splitkb-cli")]
#[command(about = "Host tools for the split keyboard firmware")]
struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a recorded switch trace through the pipeline and print every
    /// HID report it produces
    Replay {
        /// Path to the TOML trace
        trace: PathBuf,
        /// Board and timing configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Polling period of the simulated main loop
        #[arg(long, default_value_t = 1_000)]
        tick_us: u32,
    },
    /// Render every layer of the key map as an HTML/SVG page
    Layout {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Replay {
            trace,
            config,
            tick_us,
        } => {
            let config = Config::load(config.as_deref())?;
            let trace = replay::Trace::load(&trace)?;
            let replay = replay::run(&trace, &config, tick_us).context("replaying trace")?;
            for sent in &replay.sent {
                println!("{sent}");
            }
            if replay.failed_ticks > 0 {
                eprintln!(
                    "{} of {} ticks failed to sample",
                    replay.failed_ticks, replay.ticks
                );
            }
        }
        Command::Layout { output } => {
            let html = layout::generate_html(&DEFAULT_KEYMAP);
            match output {
                Some(path) => {
                    fs::write(&path, html).with_context(|| format!("writing {}", path.display()))?;
                    println!("Layout written to {}", path.display());
                }
                None => print!("{html}"),
            }
        }
        Command::Config { config } => {
            let config = Config::load(config.as_deref())?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
