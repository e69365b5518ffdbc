use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stratum_wm::common::config::{Config, config_file};
use stratum_wm::common::log;
use stratum_wm::layout_engine::{Record, ReplayRequest, replay};
use stratum_wm::model::{DEFAULT_DISPLAY, DisplayInfo};

#[derive(Parser)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Check the configuration file and exit.
    #[arg(long)]
    validate: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recording and print the resulting window tree.
    Replay {
        file: PathBuf,
        /// Print a JSON snapshot of every window instead of the tree.
        #[arg(long)]
        json: bool,
        /// Print every produced event as a JSON line.
        #[arg(long)]
        events: bool,
    },
    /// Turn a JSON array of requests into a recording.
    Record {
        script: PathBuf,
        output: PathBuf,
        /// Size of the default display.
        #[arg(long, default_value_t = 1080)]
        width: u32,
        #[arg(long, default_value_t = 2340)]
        height: u32,
    },
    /// Print the effective configuration as TOML.
    PrintConfig,
}

fn main() {
    let opt = Cli::parse();
    log::init_logging();
    if let Err(err) = run(opt) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config_path = opt.config.clone().unwrap_or_else(config_file);

    if opt.validate {
        let config = Config::read(&config_path)?;
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
            return Ok(());
        }
        for issue in issues {
            eprintln!("{issue}");
        }
        process::exit(1);
    }

    let config = Config::read_or_default(&config_path)?;
    match opt.command {
        None | Some(Commands::PrintConfig) => {
            print!("{}", toml::to_string(&config)?);
        }
        Some(Commands::Record { script, output, width, height }) => {
            let script = fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let requests: Vec<ReplayRequest> = serde_json::from_str(&script)?;
            let mut record = Record::new(Some(&output))?;
            record.start(&config.settings, &DisplayInfo::new(DEFAULT_DISPLAY, width, height))?;
            for request in &requests {
                record.on_request(request)?;
            }
            println!("Recorded {} requests to {}", requests.len(), output.display());
        }
        Some(Commands::Replay { file, json, events }) => {
            let mut lines = Vec::new();
            let (replayer, summary) = replay(&file, |event| {
                if events {
                    match serde_json::to_string(&event) {
                        Ok(line) => lines.push(line),
                        Err(err) => eprintln!("unprintable event {event:?}: {err}"),
                    }
                }
            })?;
            for line in lines {
                println!("{line}");
            }
            let container = replayer.container();
            if json {
                let snapshot = serde_json::json!({
                    "summary": summary,
                    "windows": container.windows(),
                });
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", container.dump_screen_window_tree());
                println!(
                    "{} requests, {} failed, {} events, {} windows",
                    summary.requests, summary.failed, summary.events, summary.windows
                );
            }
        }
    }
    Ok(())
}
