//! Garbage collection of unreachable applications.

use crate::interner::AppIdentity;
use crate::reaper::Reaper;
use serde::Serialize;
use std::collections::HashSet;

/// Statistics from a collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectStats {
    /// Number of applications reclaimed.
    pub apps_reclaimed: usize,
    /// Number of nodes removed, including far ends of severed edges.
    pub nodes_removed: usize,
}

impl Reaper {
    /// Run a collection pass.
    ///
    /// Marks every app reachable from the root set, then erases every other
    /// app and asks the terminator to kill it. The doomed set is fixed
    /// before the sweep begins.
    pub fn collect(&mut self) -> CollectStats {
        // Mark phase: computed against one snapshot of the graph
        let doomed = self.doomed_apps();

        // Sweep phase
        let mut stats = CollectStats::default();
        for app in doomed {
            stats.nodes_removed += self.graph.remove_app(&app);
            stats.apps_reclaimed += 1;
            self.terminate(&app);
        }

        if stats.apps_reclaimed > 0 {
            tracing::info!(
                apps_reclaimed = stats.apps_reclaimed,
                nodes_removed = stats.nodes_removed,
                "collection pass reclaimed applications"
            );
        }
        stats
    }

    /// Canonical URLs of the apps the next [`Reaper::collect`] would reclaim.
    pub fn unreachable_apps(&self) -> Vec<String> {
        self.doomed_apps()
            .into_iter()
            .map(|app| app.as_str().to_string())
            .collect()
    }

    /// Mark phase: traverse from every root.
    fn mark_reachable(&self) -> HashSet<AppIdentity> {
        let mut reachable = HashSet::new();
        for root in self.roots.iter() {
            self.graph.mark(root, &mut reachable);
        }
        reachable
    }

    fn doomed_apps(&self) -> Vec<AppIdentity> {
        let reachable = self.mark_reachable();
        self.graph
            .apps()
            .into_iter()
            .filter(|app| !reachable.contains(app))
            .collect()
    }

    fn terminate(&self, app: &AppIdentity) {
        match &self.terminator {
            Some(terminator) => terminator.kill_application(app.as_str()),
            None => tracing::warn!(app = %app, "no terminator installed; reclaimed app left running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminator::testing::RecordingTerminator;

    fn reaper_with_recorder() -> (Reaper, RecordingTerminator) {
        let terminator = RecordingTerminator::default();
        let mut reaper = Reaper::default();
        reaper.set_terminator(Box::new(terminator.clone()));
        (reaper, terminator)
    }

    /// Give `from` a source edge into `to`, via a transfer.
    fn link(reaper: &mut Reaper, from: &str, to: &str, source_id: u32, target_id: u32) {
        reaper.create_reference(from, source_id, target_id);
        let handle = reaper.start_transfer(from, target_id).unwrap();
        let secret = reaper.get_application_secret(to);
        reaper.complete_transfer(handle, secret, target_id);
    }

    #[test]
    fn test_collect_empty() {
        let (mut reaper, terminator) = reaper_with_recorder();

        let stats = reaper.collect();
        assert_eq!(stats, CollectStats::default());
        assert!(terminator.killed().is_empty());
    }

    #[test]
    fn test_collect_unrooted_self_edge() {
        let (mut reaper, terminator) = reaper_with_recorder();
        reaper.set_is_root("app_root", true);
        reaper.create_reference("app_root", 1, 2);
        reaper.create_reference("app_x", 1, 2);

        // an unrelated drop triggers the pass
        reaper.drop_node("app_root", 1);

        assert_eq!(terminator.killed(), vec!["app_x".to_string()]);
        assert!(reaper.dump_nodes().is_empty());
    }

    #[test]
    fn test_collect_spares_roots() {
        let (mut reaper, terminator) = reaper_with_recorder();
        reaper.set_is_root("app_x", true);
        reaper.create_reference("app_x", 1, 2);

        let stats = reaper.collect();
        assert_eq!(stats.apps_reclaimed, 0);
        assert!(terminator.killed().is_empty());
        assert_eq!(reaper.dump_nodes().len(), 2);
    }

    #[test]
    fn test_collect_follows_chain() {
        let (mut reaper, terminator) = reaper_with_recorder();
        reaper.set_is_root("app_root", true);
        link(&mut reaper, "app_root", "app_b", 1, 2);
        link(&mut reaper, "app_b", "app_c", 3, 4);

        let stats = reaper.collect();
        assert_eq!(stats, CollectStats::default());
        assert!(terminator.killed().is_empty());
        assert_eq!(reaper.dump_nodes().len(), 4);
    }

    #[test]
    fn test_collect_after_root_removed() {
        let (mut reaper, terminator) = reaper_with_recorder();
        reaper.set_is_root("app_root", true);
        link(&mut reaper, "app_root", "app_b", 1, 2);

        reaper.collect();
        assert!(terminator.killed().is_empty());

        reaper.set_is_root("app_root", false);
        let stats = reaper.collect();

        assert_eq!(stats.apps_reclaimed, 2);
        assert_eq!(stats.nodes_removed, 2);
        let mut killed = terminator.killed();
        killed.sort();
        assert_eq!(killed, vec!["app_b".to_string(), "app_root".to_string()]);
        assert!(reaper.dump_nodes().is_empty());
    }

    #[test]
    fn test_sweep_severs_edges_into_survivors() {
        let (mut reaper, terminator) = reaper_with_recorder();
        reaper.set_is_root("app_root", true);
        reaper.create_reference("app_root", 1, 2);
        // app_x points into the root; the root does not point back
        link(&mut reaper, "app_x", "app_root", 3, 4);

        // the link's complete_transfer already collected app_x
        assert_eq!(terminator.killed(), vec!["app_x".to_string()]);
        let dump = reaper.dump_nodes();
        assert_eq!(dump.len(), 2);
        assert!(dump.iter().all(|r| r.app_url == "app_root" && r.other_app_url == "app_root"));
        reaper.check_invariants().unwrap();
    }

    #[test]
    fn test_collect_is_idempotent() {
        let (mut reaper, terminator) = reaper_with_recorder();
        reaper.create_reference("app_x", 1, 2);
        reaper.create_reference("app_y", 1, 2);

        let first = reaper.collect();
        assert_eq!(first.apps_reclaimed, 2);

        let second = reaper.collect();
        assert_eq!(second, CollectStats::default());
        assert_eq!(terminator.killed().len(), 2);
    }

    #[test]
    fn test_emptied_app_is_reclaimed() {
        let (mut reaper, terminator) = reaper_with_recorder();
        reaper.create_reference("app_x", 1, 2);
        reaper.create_reference("app_y", 1, 2);
        reaper.collect();

        reaper.set_is_root("app_z", true);
        reaper.create_reference("app_z", 1, 2);
        reaper.create_reference("app_w", 1, 2);
        reaper.drop_node("app_w", 2);

        // app_w had no nodes left and was not a root
        assert!(terminator.killed().contains(&"app_w".to_string()));
        assert_eq!(reaper.unreachable_apps(), Vec::<String>::new());
    }

    #[test]
    fn test_unreachable_apps_is_dry_run() {
        let (mut reaper, terminator) = reaper_with_recorder();
        reaper.create_reference("app_x", 1, 2);

        assert_eq!(reaper.unreachable_apps(), vec!["app_x".to_string()]);
        assert_eq!(reaper.dump_nodes().len(), 2);
        assert!(terminator.killed().is_empty());
    }

    #[test]
    fn test_collect_without_terminator() {
        let mut reaper = Reaper::default();
        reaper.create_reference("app_x", 1, 2);

        let stats = reaper.collect();
        assert_eq!(stats.apps_reclaimed, 1);
        assert!(reaper.dump_nodes().is_empty());
    }
}
