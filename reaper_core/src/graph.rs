//! Reference graph storage.
//!
//! Nodes live in per-app tables keyed by their local id. A node never holds
//! a pointer to its peer, only the peer's [`NodeLocator`], so relocating a
//! node is a key rewrite on both ends of the edge.

use crate::error::{Error, Result};
use crate::interner::AppIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Address of a node: owning app plus its id in that app's namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeLocator {
    pub app: AppIdentity,
    pub node_id: u32,
}

impl NodeLocator {
    pub fn new(app: AppIdentity, node_id: u32) -> Self {
        Self { app, node_id }
    }
}

/// One endpoint of an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// The node at the other end of the edge.
    pub peer: NodeLocator,
    /// Whether this side points at its peer. Exactly one side of an edge is.
    pub is_source: bool,
}

/// Flattened view of a node, as returned by [`crate::Reaper::dump_nodes`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRecord {
    pub app_url: String,
    pub node_id: u32,
    pub other_app_url: String,
    pub other_node_id: u32,
    pub is_source: bool,
}

pub(crate) type NodeMap = BTreeMap<u32, NodeInfo>;

/// Per-app node tables.
#[derive(Debug, Default)]
pub struct Graph {
    apps: BTreeMap<AppIdentity, NodeMap>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node.
    pub fn get(&self, locator: &NodeLocator) -> Option<&NodeInfo> {
        self.apps.get(&locator.app)?.get(&locator.node_id)
    }

    fn get_mut(&mut self, locator: &NodeLocator) -> Option<&mut NodeInfo> {
        self.apps.get_mut(&locator.app)?.get_mut(&locator.node_id)
    }

    fn insert(&mut self, locator: &NodeLocator, info: NodeInfo) {
        self.apps
            .entry(locator.app.clone())
            .or_default()
            .insert(locator.node_id, info);
    }

    fn remove(&mut self, locator: &NodeLocator) -> Option<NodeInfo> {
        self.apps.get_mut(&locator.app)?.remove(&locator.node_id)
    }

    /// Whether `app` has a table, possibly empty.
    pub fn contains_app(&self, app: &AppIdentity) -> bool {
        self.apps.contains_key(app)
    }

    /// Nodes owned by `app`, if it has a table.
    pub(crate) fn nodes(&self, app: &AppIdentity) -> Option<&NodeMap> {
        self.apps.get(app)
    }

    /// Snapshot of every app that has a table.
    pub fn apps(&self) -> Vec<AppIdentity> {
        self.apps.keys().cloned().collect()
    }

    /// Total number of nodes across all apps.
    pub fn node_count(&self) -> usize {
        self.apps.values().map(|nodes| nodes.len()).sum()
    }

    /// Create an intra-app edge `source_id -> target_id` owned by `app`.
    ///
    /// Nothing is inserted unless both ids are free.
    pub fn insert_pair(&mut self, app: &AppIdentity, source_id: u32, target_id: u32) -> Result<()> {
        let source = NodeLocator::new(app.clone(), source_id);
        let target = NodeLocator::new(app.clone(), target_id);

        if self.get(&source).is_some() || source_id == target_id {
            return Err(Error::node_collision(app.as_str(), source_id));
        }
        if self.get(&target).is_some() {
            return Err(Error::node_collision(app.as_str(), target_id));
        }

        self.insert(
            &source,
            NodeInfo {
                peer: target.clone(),
                is_source: true,
            },
        );
        self.insert(
            &target,
            NodeInfo {
                peer: source,
                is_source: false,
            },
        );
        Ok(())
    }

    /// Remove a node together with its peer. Returns the peer's locator.
    pub fn remove_pair(&mut self, locator: &NodeLocator) -> Result<NodeLocator> {
        let info = self
            .remove(locator)
            .ok_or_else(|| Error::node_not_found(locator.app.as_str(), locator.node_id))?;

        let peer_removed = self.remove(&info.peer).is_some();
        debug_assert!(peer_removed, "node {locator:?} had no peer at {:?}", info.peer);
        if !peer_removed {
            tracing::error!(
                app = %locator.app,
                node_id = locator.node_id,
                "dropped node had no reciprocal peer"
            );
        }
        Ok(info.peer)
    }

    /// Relocate the node at `source` to `dest`, repointing its peer.
    ///
    /// Fails without mutating anything if `source` is absent or `dest` is
    /// occupied.
    pub fn move_node(&mut self, source: &NodeLocator, dest: &NodeLocator) -> Result<()> {
        if self.get(source).is_none() {
            return Err(Error::node_not_found(source.app.as_str(), source.node_id));
        }
        if self.get(dest).is_some() {
            return Err(Error::node_collision(dest.app.as_str(), dest.node_id));
        }

        let info = self
            .remove(source)
            .ok_or_else(|| Error::node_not_found(source.app.as_str(), source.node_id))?;

        // An edge created by insert_pair never has both ends at one key, so
        // the peer is still in place after the removal above.
        match self.get_mut(&info.peer) {
            Some(peer) => peer.peer = dest.clone(),
            None => {
                let peer = info.peer.clone();
                self.insert(source, info);
                return Err(Error::invariant_violation(format!(
                    "node ({}, {}) has no peer at ({}, {})",
                    source.app, source.node_id, peer.app, peer.node_id
                )));
            }
        }
        self.insert(dest, info);
        Ok(())
    }

    /// Erase `app` and sever the far half of each of its edges.
    ///
    /// Returns the number of nodes removed across all apps.
    pub fn remove_app(&mut self, app: &AppIdentity) -> usize {
        let Some(nodes) = self.apps.remove(app) else {
            return 0;
        };

        let mut removed = nodes.len();
        for info in nodes.values() {
            // The peer may belong to an app swept earlier in the same pass.
            if info.peer.app != *app && self.remove(&info.peer).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Drop every app and node.
    pub fn clear(&mut self) {
        self.apps.clear();
    }

    /// Flatten the graph into records, ordered by app then node id.
    pub fn dump(&self) -> Vec<NodeRecord> {
        self.apps
            .iter()
            .flat_map(|(app, nodes)| {
                nodes.iter().map(move |(&node_id, info)| NodeRecord {
                    app_url: app.as_str().to_string(),
                    node_id,
                    other_app_url: info.peer.app.as_str().to_string(),
                    other_node_id: info.peer.node_id,
                    is_source: info.is_source,
                })
            })
            .collect()
    }

    /// Verify reciprocity and the single-source rule for every edge.
    pub fn check_invariants(&self) -> Result<()> {
        for (app, nodes) in &self.apps {
            for (&node_id, info) in nodes {
                let here = NodeLocator::new(app.clone(), node_id);
                let peer = self.get(&info.peer).ok_or_else(|| {
                    Error::invariant_violation(format!(
                        "node ({}, {}) points at missing peer ({}, {})",
                        app, node_id, info.peer.app, info.peer.node_id
                    ))
                })?;

                if peer.peer != here {
                    return Err(Error::invariant_violation(format!(
                        "node ({}, {}) is not reciprocated by ({}, {})",
                        app, node_id, info.peer.app, info.peer.node_id
                    )));
                }
                if peer.is_source == info.is_source {
                    return Err(Error::invariant_violation(format!(
                        "edge ({}, {}) <-> ({}, {}) has is_source={} on both sides",
                        app, node_id, info.peer.app, info.peer.node_id, info.is_source
                    )));
                }
            }
        }
        Ok(())
    }
}
