//! # Reaper Core
//!
//! Reference tracking and reclamation for a distributed capability system.
//!
//! Applications hold opaque endpoints ("nodes") that reference each other
//! across application boundaries. The reaper records each reference as a
//! pair of nodes, finds which applications are reachable from a set of
//! trusted roots, and reclaims the rest.
//!
//! ## Features
//!
//! - Reciprocal node pairs keyed by `(application, local id)`
//! - Mark-and-sweep collection over the application graph
//! - Root set administration, with the reaper itself always rooted
//! - Secret-authenticated transfer of a node to another application
//! - Pluggable [`Terminator`] notified for every reclaimed application
//!
//! ## Example
//!
//! ```
//! use reaper_core::Reaper;
//!
//! let mut reaper = Reaper::default();
//! reaper.set_terminator(Box::new(|url: &str| println!("killing {url}")));
//! reaper.set_is_root("mojo:shell", true);
//!
//! // The shell creates a reference and hands one end to another app
//! reaper.create_reference("mojo:shell", 1, 2);
//! let handle = reaper.start_transfer("mojo:shell", 2).unwrap();
//! let secret = reaper.get_application_secret("mojo:browser");
//! reaper.complete_transfer(handle, secret, 7);
//!
//! // The browser is reachable through the shell's source node
//! assert!(reaper.unreachable_apps().is_empty());
//!
//! // Dropping the reference makes it collectable
//! reaper.drop_node("mojo:shell", 1);
//! assert!(reaper.dump_nodes().is_empty());
//! ```

mod app;
mod collect;
mod config;
mod error;
mod graph;
mod interner;
mod mark;
mod reaper;
mod roots;
mod secrets;
mod terminator;
mod transfer;

pub use app::AppClient;
pub use collect::CollectStats;
pub use config::{DEFAULT_SERVICE_URL, ReaperConfig};
pub use error::{Error, Result};
pub use graph::{Graph, NodeInfo, NodeLocator, NodeRecord};
pub use interner::{AppIdentity, Interner};
pub use reaper::Reaper;
pub use roots::RootSet;
pub use secrets::{AppSecret, SecretRegistry};
pub use terminator::Terminator;
pub use transfer::{TransferHandle, TransferState};
