//! Interactive read-eval-print loop over the harness surface.
//!
//! The loop serializes evaluations by construction: the next prompt is not
//! shown until the transcript for the previous call has been printed, so at
//! most one call is ever in flight.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use harness::{Harness, Journal, LoadConfig, StatusReporter};

use crate::examples;
use crate::render;

const HELP: &str = "\
:help              show this help
:status            show the harness status
:examples          list bundled example scripts
:example <name>    run a bundled example script
:clear             clear the output journal
:quit              shut the engine down and exit";

pub fn run(config: &LoadConfig) -> Result<()> {
    let journal = Journal::new();
    let gate = harness::logging::init(journal.clone());
    let status = StatusReporter::new();

    println!("{}", status.current().message);
    let mut harness = Harness::load(config, journal.clone(), status.clone(), gate)
        .context("load engine module")?;
    println!("{}", status.current().message);
    let mut seen = print_fresh(&journal, 0);

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().context("flush prompt")?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("read input")? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            ":quit" | ":q" => break,
            ":help" => {
                println!("{HELP}");
                continue;
            }
            ":status" => {
                let report = status.current();
                println!("[{}] {}", report.state, report.message);
                continue;
            }
            ":clear" => {
                harness.clear_output();
                seen = 0;
                continue;
            }
            ":examples" => {
                for name in examples::names() {
                    println!("{name}");
                }
                continue;
            }
            _ => {}
        }

        let source = if let Some(name) = line.strip_prefix(":example") {
            match examples::source(name.trim()) {
                Some(source) => source.to_string(),
                None => {
                    println!("unknown example '{}' (try :examples)", name.trim());
                    continue;
                }
            }
        } else if line.starts_with(':') {
            println!("unknown command {line} (try :help)");
            continue;
        } else {
            line.to_string()
        };

        if let Err(err) = harness.run_code(&source) {
            eprintln!("{err}");
        }
        seen = print_fresh(&journal, seen);
    }

    harness.shutdown();
    Ok(())
}

/// Print entries appended since the last call and return the new mark.
fn print_fresh(journal: &Journal, seen: usize) -> usize {
    let entries = journal.since(seen);
    for entry in &entries {
        println!("{}", render::entry(entry));
    }
    seen + entries.len()
}
