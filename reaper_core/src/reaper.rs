//! The reaper service: owner of all graph, secret, and root state.

use crate::app::AppClient;
use crate::config::ReaperConfig;
use crate::error::Result;
use crate::graph::{Graph, NodeLocator, NodeRecord};
use crate::interner::{AppIdentity, Interner};
use crate::roots::RootSet;
use crate::secrets::{AppSecret, SecretRegistry};
use crate::terminator::Terminator;
use crate::transfer::Transfers;
use std::fmt;

/// Tracks references between applications and reclaims unreachable ones.
///
/// Every operation is a synchronous mutation of in-memory state. The reaper
/// is not safe to drive from several threads at once; callers must deliver
/// operations one at a time.
///
/// Operations invoked on behalf of applications never fail: invalid input
/// is logged and ignored, leaving state unchanged, so callers may retry
/// freely.
pub struct Reaper {
    config: ReaperConfig,
    pub(crate) service: AppIdentity,
    pub(crate) interner: Interner,
    pub(crate) graph: Graph,
    pub(crate) secrets: SecretRegistry,
    pub(crate) roots: RootSet,
    pub(crate) transfers: Transfers,
    pub(crate) terminator: Option<Box<dyn Terminator>>,
}

impl Default for Reaper {
    fn default() -> Self {
        Self::new(ReaperConfig::default())
    }
}

impl fmt::Debug for Reaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaper")
            .field("service", &self.service)
            .field("apps", &self.graph.apps().len())
            .field("nodes", &self.graph.node_count())
            .field("has_terminator", &self.terminator.is_some())
            .finish_non_exhaustive()
    }
}

impl Reaper {
    /// Create a reaper whose only root is its own service identity.
    pub fn new(config: ReaperConfig) -> Self {
        let mut interner = Interner::new();
        let service = interner.intern(&config.service_url);
        let mut reaper = Self {
            config,
            service,
            interner,
            graph: Graph::new(),
            secrets: SecretRegistry::new(),
            roots: RootSet::new(),
            transfers: Transfers::default(),
            terminator: None,
        };
        reaper.reset();
        reaper
    }

    /// The configuration this reaper was created with.
    pub fn config(&self) -> &ReaperConfig {
        &self.config
    }

    /// The reaper's own canonical identity.
    pub fn service_url(&self) -> &str {
        self.service.as_str()
    }

    /// Install the collaborator notified for every reclaimed app.
    pub fn set_terminator(&mut self, terminator: Box<dyn Terminator>) {
        self.terminator = Some(terminator);
    }

    /// Bind a client to `caller`, so the app's identity is given only once.
    pub fn app(&mut self, caller: &str) -> AppClient<'_> {
        let app = self.interner.intern(caller);
        AppClient::new(self, app)
    }

    /// Create an edge from `source_id` to `target_id`, both owned by `caller`.
    ///
    /// Ignored, after logging, if either id is already in use. Creating an
    /// edge only adds reachability, so no collection runs.
    pub fn create_reference(&mut self, caller: &str, source_id: u32, target_id: u32) {
        let app = self.interner.intern(caller);
        match self.graph.insert_pair(&app, source_id, target_id) {
            Ok(()) => tracing::debug!(caller, source_id, target_id, "reference created"),
            Err(err) => tracing::error!(caller, source_id, target_id, %err, "could not create reference"),
        }
    }

    /// Drop `node_id` owned by `caller` together with its peer, then collect.
    ///
    /// Ignored, after logging, if the node does not exist.
    pub fn drop_node(&mut self, caller: &str, node_id: u32) {
        let locator = NodeLocator::new(self.interner.intern(caller), node_id);
        match self.graph.remove_pair(&locator) {
            Ok(peer) => {
                tracing::debug!(
                    caller,
                    node_id,
                    peer_app = %peer.app,
                    peer_node_id = peer.node_id,
                    "node dropped"
                );
                self.collect();
            }
            Err(err) => tracing::error!(caller, node_id, %err, "could not drop node"),
        }
    }

    /// Secret identifying `caller` as a transfer destination.
    ///
    /// Issued on first request; every later request returns the same value.
    pub fn get_application_secret(&mut self, caller: &str) -> AppSecret {
        let app = self.interner.intern(caller);
        self.secrets.get_or_issue(&app)
    }

    /// Every node in the graph, ordered by app then node id.
    pub fn dump_nodes(&self) -> Vec<NodeRecord> {
        self.graph.dump()
    }

    /// Verify that every node has a reciprocal peer and that each edge has
    /// exactly one source end.
    pub fn check_invariants(&self) -> Result<()> {
        self.graph.check_invariants()
    }

    /// Clear the graph, secrets, transfers, and roots, then make the service
    /// identity the sole root again.
    ///
    /// Transfer ids keep counting, so handles issued before a reset are
    /// never confused with later ones.
    pub fn reset(&mut self) {
        self.graph.clear();
        self.secrets.clear();
        self.transfers.clear();
        self.roots.clear();
        self.roots.insert(self.service.clone());
    }
}
