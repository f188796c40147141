//! Text and JSON rendering of script results.

use anyhow::Result;
use chrono::{DateTime, Utc};
use reaper_core::{CollectStats, NodeRecord, TransferState};
use serde::Serialize;
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writes command results to stdout and errors to stderr.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// `text_fn` only runs in text mode.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Report a failed command on stderr.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

/// JSON body of a failed command.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// A termination request issued by a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct KillEvent {
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// Pending transfer information for `pending`.
#[derive(Debug, Clone, Serialize)]
pub struct TransferInfo {
    pub handle: u32,
    pub state: TransferState,
}

/// Result data of a single script line.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepData {
    Done,
    Transfer { handle: Option<u32> },
    Secret { app: String, secret: u64 },
    Collected(CollectStats),
    Nodes { nodes: Vec<NodeRecord> },
    Roots { roots: Vec<String> },
    Pending { transfers: Vec<TransferInfo> },
}

/// Output for one executed script line.
#[derive(Debug, Serialize)]
pub struct StepOutput {
    pub line: usize,
    pub op: String,
    #[serde(flatten)]
    pub data: StepData,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub killed: Vec<KillEvent>,
}

impl StepOutput {
    /// Human-readable rendering, one or more lines.
    pub fn to_text(&self) -> String {
        let mut text = match &self.data {
            StepData::Done => format!("{}\n", self.op),
            StepData::Transfer { handle: Some(handle) } => {
                format!("{} -> handle {}\n", self.op, handle)
            }
            StepData::Transfer { handle: None } => format!("{} -> failed\n", self.op),
            StepData::Secret { app, secret } => format!("{} -> {} {}\n", self.op, app, secret),
            StepData::Collected(stats) => format!(
                "{} -> reclaimed {} apps, removed {} nodes\n",
                self.op, stats.apps_reclaimed, stats.nodes_removed
            ),
            StepData::Nodes { nodes } => {
                let mut text = format!("{} ({} nodes)\n", self.op, nodes.len());
                for node in nodes {
                    text.push_str(&format!(
                        "  ({}, {}) {} ({}, {})\n",
                        node.app_url,
                        node.node_id,
                        if node.is_source { "->" } else { "<-" },
                        node.other_app_url,
                        node.other_node_id
                    ));
                }
                text
            }
            StepData::Roots { roots } => {
                let mut text = format!("{}\n", self.op);
                for root in roots {
                    text.push_str(&format!("  {}\n", root));
                }
                text
            }
            StepData::Pending { transfers } => {
                if transfers.is_empty() {
                    format!("{} (none)\n", self.op)
                } else {
                    let mut text = format!("{}\n", self.op);
                    for transfer in transfers {
                        text.push_str(&format!("  {}\n", transfer.handle));
                    }
                    text
                }
            }
        };

        for kill in &self.killed {
            text.push_str(&format!(
                "  killed {} at {}\n",
                kill.url,
                kill.timestamp.format("%Y-%m-%d %H:%M:%S%.3f")
            ));
        }
        text
    }
}

/// Output for `run` command.
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub success: bool,
    pub result_code: u8,
    pub steps: Vec<StepOutput>,
}

/// Output for `check` command.
#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub success: bool,
    pub result_code: u8,
    pub operations: usize,
}
