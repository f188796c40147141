mod output;
mod script;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use output::{CheckOutput, KillEvent, OutputWriter, RunOutput, StepData, StepOutput, TransferInfo};
use reaper_core::{Reaper, ReaperConfig, TransferHandle};
use script::{Line, Op, SecretRef};
use std::cell::RefCell;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Reaper - reference tracking and reclamation for capability graphs
#[derive(Parser)]
#[command(name = "reaper")]
#[command(about = "Replay reference-graph operations against an in-memory reaper", long_about = None)]
#[command(version)]
struct Cli {
    /// Reaper identity (defaults to REAPER_SERVICE_URL env var, then the config file)
    #[arg(long, global = true)]
    service_url: Option<String>,

    /// Config file with `key=value` lines
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an operation script, one operation per line
    Run {
        /// Script file (reads stdin if omitted)
        script: Option<PathBuf>,

        /// Check graph invariants after every operation
        #[arg(long)]
        verify: bool,
    },

    /// Parse an operation script without applying it
    Check {
        /// Script file (reads stdin if omitted)
        script: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let writer = OutputWriter::new(cli.json);
    if let Err(err) = dispatch(cli, &writer) {
        writer.write_error(&err, 1);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn dispatch(cli: Cli, writer: &OutputWriter) -> Result<()> {
    match cli.command {
        Commands::Run { script, verify } => {
            let config = load_config(cli.service_url, cli.config.as_deref())?;
            cmd_run(writer, config, script.as_deref(), verify)
        }
        Commands::Check { script } => cmd_check(writer, script.as_deref()),
    }
}

/// Resolve configuration: CLI flag > REAPER_SERVICE_URL env var > config file > default.
fn load_config(service_url: Option<String>, config_path: Option<&Path>) -> Result<ReaperConfig> {
    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            ReaperConfig::parse(&content)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => ReaperConfig::default(),
    };

    if let Some(url) = service_url.or_else(|| std::env::var("REAPER_SERVICE_URL").ok()) {
        if url.is_empty() {
            anyhow::bail!("service URL must not be empty");
        }
        config.service_url = url;
    }

    Ok(config)
}

fn read_script(path: Option<&Path>) -> Result<Vec<Line>> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?,
        None => {
            if atty::is(atty::Stream::Stdin) {
                anyhow::bail!("No script given and stdin is a terminal; pass a file or pipe one in");
            }
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read script from stdin")?;
            content
        }
    };

    script::parse(&content)
}

fn cmd_check(writer: &OutputWriter, path: Option<&Path>) -> Result<()> {
    let lines = read_script(path)?;

    let output = CheckOutput {
        success: true,
        result_code: 0,
        operations: lines.len(),
    };
    writer.write(&output, || format!("{} operations OK\n", lines.len()))
}

fn cmd_run(
    writer: &OutputWriter,
    config: ReaperConfig,
    path: Option<&Path>,
    verify: bool,
) -> Result<()> {
    let lines = read_script(path)?;
    tracing::debug!(
        operations = lines.len(),
        service_url = %config.service_url,
        "applying script"
    );

    let kills: Rc<RefCell<Vec<KillEvent>>> = Rc::default();
    let mut reaper = Reaper::new(config);
    let sink = Rc::clone(&kills);
    reaper.set_terminator(Box::new(move |url: &str| {
        sink.borrow_mut().push(KillEvent {
            url: url.to_string(),
            timestamp: Utc::now(),
        });
    }));

    let mut steps = Vec::with_capacity(lines.len());
    for line in &lines {
        let data = apply(&mut reaper, &line.op);
        if verify {
            reaper
                .check_invariants()
                .with_context(|| format!("Invariant check failed after line {}: {}", line.number, line.op))?;
        }
        steps.push(StepOutput {
            line: line.number,
            op: line.op.to_string(),
            data,
            killed: kills.borrow_mut().drain(..).collect(),
        });
    }

    let output = RunOutput {
        success: true,
        result_code: 0,
        steps,
    };
    writer.write(&output, || {
        output.steps.iter().map(StepOutput::to_text).collect()
    })
}

/// Apply one operation, as the transport boundary would deliver it.
fn apply(reaper: &mut Reaper, op: &Op) -> StepData {
    match op {
        Op::Create {
            app,
            source,
            target,
        } => {
            reaper.create_reference(app, *source, *target);
            StepData::Done
        }
        Op::Drop { app, node } => {
            reaper.drop_node(app, *node);
            StepData::Done
        }
        Op::Start { app, node } => StepData::Transfer {
            handle: reaper.start_transfer(app, *node).map(|h| h.id()),
        },
        Op::Complete {
            handle,
            secret,
            node,
        } => {
            let secret = match secret {
                SecretRef::Literal(secret) => *secret,
                SecretRef::App(app) => reaper.get_application_secret(app),
            };
            reaper.complete_transfer(TransferHandle::from_raw(*handle), secret, *node);
            StepData::Done
        }
        Op::Secret { app } => StepData::Secret {
            app: app.clone(),
            secret: reaper.get_application_secret(app),
        },
        Op::Root { app, is_root } => {
            reaper.set_is_root(app, *is_root);
            StepData::Done
        }
        Op::Collect => StepData::Collected(reaper.collect()),
        Op::Dump => StepData::Nodes {
            nodes: reaper.dump_nodes(),
        },
        Op::Reset => {
            reaper.reset();
            StepData::Done
        }
        Op::Roots => StepData::Roots {
            roots: reaper.roots(),
        },
        Op::Pending => StepData::Pending {
            transfers: reaper
                .pending_transfers()
                .into_iter()
                .filter_map(|handle| {
                    reaper.transfer_state(handle).map(|state| TransferInfo {
                        handle: handle.id(),
                        state,
                    })
                })
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> (Reaper, Vec<StepData>) {
        let mut reaper = Reaper::default();
        let steps = script::parse(source)
            .unwrap()
            .iter()
            .map(|line| apply(&mut reaper, &line.op))
            .collect();
        (reaper, steps)
    }

    #[test]
    fn test_apply_transfer_script() {
        let (reaper, steps) = run("\
root mojo:browser on
create mojo:shell 1 2
start mojo:shell 1
complete 1 @mojo:browser 5
pending
");
        assert!(matches!(steps[2], StepData::Transfer { handle: Some(1) }));
        assert!(matches!(&steps[4], StepData::Pending { transfers } if transfers.is_empty()));

        let nodes = reaper.dump_nodes();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().any(|n| n.app_url == "mojo:browser" && n.node_id == 5));
        reaper.check_invariants().unwrap();
    }

    #[test]
    fn test_apply_collect_reports_stats() {
        let (_, steps) = run("create mojo:x 1 2\ncollect\ncollect\n");

        match (&steps[1], &steps[2]) {
            (StepData::Collected(first), StepData::Collected(second)) => {
                assert_eq!(first.apps_reclaimed, 1);
                assert_eq!(second.apps_reclaimed, 0);
            }
            other => panic!("unexpected steps: {:?}", other),
        }
    }

    #[test]
    fn test_apply_failed_start() {
        let (_, steps) = run("start mojo:x 1\n");
        assert!(matches!(steps[0], StepData::Transfer { handle: None }));
    }

    #[test]
    fn test_load_config_flag_wins() {
        let config = load_config(Some("mojo:flagged".to_string()), None).unwrap();
        assert_eq!(config.service_url, "mojo:flagged");
    }
}
