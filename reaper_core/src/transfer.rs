//! Node transfer between applications.
//!
//! A transfer re-homes one end of an edge in two steps. `start_transfer`
//! parks the node under the reaper's own identity, keyed by a fresh
//! transfer id. `complete_transfer` moves it from there to a node id chosen
//! by the destination app, which proves its identity with the secret the
//! reaper issued it. While parked, the node is owned by a root: a parked
//! source end keeps its target app reachable even if the app that started
//! the transfer is reclaimed meanwhile.
//!
//! Pending transfers never expire.

use crate::error::{Error, Result};
use crate::graph::NodeLocator;
use crate::reaper::Reaper;
use crate::secrets::AppSecret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifies one transfer. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferHandle(u32);

impl TransferHandle {
    /// Wrap a raw transfer id received from a caller.
    pub fn from_raw(id: u32) -> Self {
        TransferHandle(id)
    }

    /// The raw transfer id, which is also the parked node's id.
    pub fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TransferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress of a single transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// Node is parked and waiting for a destination.
    Pending,
    /// Node was delivered to its destination.
    Completed,
    /// Node vanished while parked, because the other end of its edge was
    /// dropped or reclaimed.
    Aborted,
}

/// Transfer bookkeeping owned by the reaper.
///
/// Ids in `first_id..next_id` belong to transfers started since the last
/// reset. Only unfinished transfers are tracked individually; a handle in
/// that range but not in `pending` was completed.
#[derive(Debug)]
pub(crate) struct Transfers {
    first_id: u32,
    next_id: u32,
    pending: BTreeSet<TransferHandle>,
}

impl Default for Transfers {
    fn default() -> Self {
        Self {
            first_id: 1,
            next_id: 1,
            pending: BTreeSet::new(),
        }
    }
}

impl Transfers {
    /// The handle the next successful start will receive.
    fn peek(&self) -> TransferHandle {
        TransferHandle(self.next_id)
    }

    fn commit(&mut self, handle: TransferHandle) {
        self.pending.insert(handle);
        self.next_id = self.next_id.wrapping_add(1).max(1);
    }

    fn finish(&mut self, handle: TransferHandle) {
        self.pending.remove(&handle);
    }

    fn was_issued(&self, handle: TransferHandle) -> bool {
        (self.first_id..self.next_id).contains(&handle.0)
    }

    /// Forget every transfer; the id counter keeps counting.
    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.first_id = self.next_id;
    }
}

impl Reaper {
    /// Park `(caller, node_id)` under the reaper's identity.
    ///
    /// Returns `None`, after logging, if the node does not exist or if a
    /// node is already parked under the id the transfer would receive. No
    /// collection runs: the node moves under a root, which cannot make
    /// anything unreachable that was reachable before.
    pub fn start_transfer(&mut self, caller: &str, node_id: u32) -> Option<TransferHandle> {
        match self.try_start_transfer(caller, node_id) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::error!(caller, node_id, %err, "could not start node transfer");
                None
            }
        }
    }

    fn try_start_transfer(&mut self, caller: &str, node_id: u32) -> Result<TransferHandle> {
        let handle = self.transfers.peek();
        let source = NodeLocator::new(self.interner.intern(caller), node_id);
        let parked = self.parked_locator(handle);

        self.graph.move_node(&source, &parked)?;
        self.transfers.commit(handle);
        tracing::debug!(caller, node_id, transfer = %handle, "node parked for transfer");
        Ok(handle)
    }

    /// Deliver the node parked under `handle` to `(dest, dest_node_id)`,
    /// where `dest` is the app that owns `dest_secret`.
    ///
    /// Failures are logged and leave the node parked, so the call may be
    /// retried. A collection pass runs afterwards either way, since the
    /// app that started the transfer may have become unreachable.
    pub fn complete_transfer(
        &mut self,
        handle: TransferHandle,
        dest_secret: AppSecret,
        dest_node_id: u32,
    ) {
        if let Err(err) = self.try_complete_transfer(handle, dest_secret, dest_node_id) {
            tracing::error!(
                transfer = %handle,
                dest_node_id,
                %err,
                "could not complete node transfer"
            );
        }
        self.collect();
    }

    fn try_complete_transfer(
        &mut self,
        handle: TransferHandle,
        dest_secret: AppSecret,
        dest_node_id: u32,
    ) -> Result<()> {
        let dest_app = self.secrets.resolve(dest_secret)?;
        let parked = self.parked_locator(handle);
        if self.transfer_state(handle) != Some(TransferState::Pending) {
            return Err(Error::transfer_not_found(handle.id()));
        }

        let dest = NodeLocator::new(dest_app, dest_node_id);
        self.graph.move_node(&parked, &dest)?;
        self.transfers.finish(handle);
        tracing::debug!(transfer = %handle, dest = %dest.app, dest_node_id, "transfer completed");
        Ok(())
    }

    /// State of a transfer, or `None` if `handle` was never issued.
    ///
    /// A transfer is aborted once its parked node is gone from the graph,
    /// which happens when the far end of the edge is dropped or reclaimed.
    pub fn transfer_state(&self, handle: TransferHandle) -> Option<TransferState> {
        if !self.transfers.was_issued(handle) {
            return None;
        }
        if !self.transfers.pending.contains(&handle) {
            return Some(TransferState::Completed);
        }
        if self.graph.get(&self.parked_locator(handle)).is_some() {
            Some(TransferState::Pending)
        } else {
            Some(TransferState::Aborted)
        }
    }

    /// Handles of every transfer still waiting for a destination.
    pub fn pending_transfers(&self) -> Vec<TransferHandle> {
        self.transfers
            .pending
            .iter()
            .copied()
            .filter(|&handle| self.transfer_state(handle) == Some(TransferState::Pending))
            .collect()
    }

    fn parked_locator(&self, handle: TransferHandle) -> NodeLocator {
        NodeLocator::new(self.service.clone(), handle.id())
    }
}
