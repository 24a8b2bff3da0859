//! Console front-end for the wasm script-engine harness.
//!
//! Presentation only: consumes the harness's public surface (`run_code`,
//! `clear_output`, the bundled examples) and renders the status report and
//! output journal. All harness state lives in the `harness` crate.

mod examples;
mod render;
mod repl;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use harness::{Harness, Journal, LoadConfig, StatusReporter, load_config};

#[derive(Parser)]
#[command(
    name = "console",
    version,
    about = "Interactive console for a wasm script-execution engine"
)]
struct Cli {
    /// Path to the harness config (TOML). A missing file means defaults.
    #[arg(long, default_value = "engine.toml")]
    config: PathBuf,

    /// Override the asset directory the engine module is resolved from.
    #[arg(long)]
    assets: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive read-eval-print loop.
    Repl,
    /// Evaluate a source file and print the transcript.
    Run {
        path: PathBuf,
        /// Print journal entries as JSON lines instead of rendered text.
        #[arg(long)]
        json: bool,
    },
    /// Run a bundled example script.
    Example { name: String },
    /// List bundled example scripts.
    Examples,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(assets) = cli.assets {
        config.asset_dir = assets;
    }

    match cli.command {
        Command::Examples => {
            for name in examples::names() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Repl => repl::run(&config),
        Command::Run { path, json } => {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            run_once(&config, &source, json)
        }
        Command::Example { name } => {
            let source = examples::source(&name)
                .ok_or_else(|| anyhow!("unknown example '{name}' (try `console examples`)"))?;
            run_once(&config, source, false)
        }
    }
}

/// Load the engine, evaluate one source text, print the transcript.
fn run_once(config: &LoadConfig, source: &str, json: bool) -> Result<()> {
    let journal = Journal::new();
    let gate = harness::logging::init(journal.clone());
    let status = StatusReporter::new();

    let mut harness = Harness::load(config, journal.clone(), status.clone(), gate)
        .context("load engine module")?;
    harness.run_code(source).context("run code")?;

    for entry in harness.output() {
        if json {
            println!("{}", serde_json::to_string(&entry).context("serialize entry")?);
        } else {
            println!("{}", render::entry(&entry));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_repl() {
        let cli = Cli::parse_from(["console", "repl"]);
        assert!(matches!(cli.command, Command::Repl));
        assert_eq!(cli.config, PathBuf::from("engine.toml"));
    }

    #[test]
    fn parse_run_with_json() {
        let cli = Cli::parse_from(["console", "run", "script.js", "--json"]);
        match cli.command {
            Command::Run { path, json } => {
                assert_eq!(path, PathBuf::from("script.js"));
                assert!(json);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn parse_assets_override() {
        let cli = Cli::parse_from(["console", "--assets", "/opt/engine", "examples"]);
        assert_eq!(cli.assets, Some(PathBuf::from("/opt/engine")));
    }
}
