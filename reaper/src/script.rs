//! Operation scripts.
//!
//! A script is a sequence of reaper operations, one per line, applied in
//! order against a single reaper. Blank lines and `#` comments are skipped.
//!
//! ```text
//! create APP SRC DST
//! drop APP NODE
//! start APP NODE
//! complete HANDLE (SECRET|@APP) NODE
//! secret APP
//! root APP on|off
//! collect
//! dump
//! reset
//! roots
//! pending
//! ```

use anyhow::{Context, Result, bail};
use std::fmt;

/// How a `complete` line names the destination app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef {
    /// A raw secret, as an app would send it.
    Literal(u64),
    /// Look the secret up for this app (issuing it if needed).
    App(String),
}

/// One parsed script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Create { app: String, source: u32, target: u32 },
    Drop { app: String, node: u32 },
    Start { app: String, node: u32 },
    Complete { handle: u32, secret: SecretRef, node: u32 },
    Secret { app: String },
    Root { app: String, is_root: bool },
    Collect,
    Dump,
    Reset,
    Roots,
    Pending,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Create { app, source, target } => write!(f, "create {} {} {}", app, source, target),
            Op::Drop { app, node } => write!(f, "drop {} {}", app, node),
            Op::Start { app, node } => write!(f, "start {} {}", app, node),
            Op::Complete {
                handle,
                secret,
                node,
            } => match secret {
                SecretRef::Literal(secret) => write!(f, "complete {} {} {}", handle, secret, node),
                SecretRef::App(app) => write!(f, "complete {} @{} {}", handle, app, node),
            },
            Op::Secret { app } => write!(f, "secret {}", app),
            Op::Root { app, is_root } => {
                write!(f, "root {} {}", app, if *is_root { "on" } else { "off" })
            }
            Op::Collect => f.write_str("collect"),
            Op::Dump => f.write_str("dump"),
            Op::Reset => f.write_str("reset"),
            Op::Roots => f.write_str("roots"),
            Op::Pending => f.write_str("pending"),
        }
    }
}

/// A parsed operation with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub op: Op,
}

/// Parse a whole script, failing on the first malformed line.
pub fn parse(content: &str) -> Result<Vec<Line>> {
    let mut lines = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let number = index + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        let op = parse_op(line).with_context(|| format!("line {}: {}", number, raw.trim()))?;
        lines.push(Line { number, op });
    }

    Ok(lines)
}

/// Cut a trailing comment. `#` opens one only at the start of the line or
/// after whitespace, so URLs with fragments survive.
fn strip_comment(raw: &str) -> &str {
    let mut prev = None;
    for (index, c) in raw.char_indices() {
        if c == '#' && prev.is_none_or(char::is_whitespace) {
            return &raw[..index];
        }
        prev = Some(c);
    }
    raw
}

fn parse_op(line: &str) -> Result<Op> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let (&verb, args) = words
        .split_first()
        .context("empty operation")?;

    let op = match (verb, args) {
        ("create", [app, source, target]) => Op::Create {
            app: app.to_string(),
            source: parse_id(source)?,
            target: parse_id(target)?,
        },
        ("drop", [app, node]) => Op::Drop {
            app: app.to_string(),
            node: parse_id(node)?,
        },
        ("start", [app, node]) => Op::Start {
            app: app.to_string(),
            node: parse_id(node)?,
        },
        ("complete", [handle, secret, node]) => Op::Complete {
            handle: parse_id(handle)?,
            secret: parse_secret(secret)?,
            node: parse_id(node)?,
        },
        ("secret", [app]) => Op::Secret {
            app: app.to_string(),
        },
        ("root", [app, flag]) => Op::Root {
            app: app.to_string(),
            is_root: match *flag {
                "on" | "true" => true,
                "off" | "false" => false,
                other => bail!("expected on or off, got {}", other),
            },
        },
        ("collect", []) => Op::Collect,
        ("dump", []) => Op::Dump,
        ("reset", []) => Op::Reset,
        ("roots", []) => Op::Roots,
        ("pending", []) => Op::Pending,
        (
            "create" | "drop" | "start" | "complete" | "secret" | "root" | "collect" | "dump"
            | "reset" | "roots" | "pending",
            _,
        ) => bail!("wrong number of arguments for {}", verb),
        _ => bail!("unknown operation: {}", verb),
    };

    Ok(op)
}

fn parse_id(word: &str) -> Result<u32> {
    word.parse::<u32>()
        .with_context(|| format!("invalid id: {}", word))
}

fn parse_secret(word: &str) -> Result<SecretRef> {
    match word.strip_prefix('@') {
        Some("") => bail!("missing app after @"),
        Some(app) => Ok(SecretRef::App(app.to_string())),
        None => word
            .parse::<u64>()
            .map(SecretRef::Literal)
            .with_context(|| format!("invalid secret: {}", word)),
    }
}
