//! Reachability marking over the app-level graph.
//!
//! App `A` points at app `B` when `A` owns a source node whose peer is owned
//! by `B`. Traversal uses an explicit stack so native call depth does not
//! depend on how deep callers have chained their references.

use crate::graph::Graph;
use crate::interner::AppIdentity;
use std::collections::HashSet;

impl Graph {
    /// Mark every app reachable from `root`, `root` included.
    ///
    /// Apps already in `marked` are not expanded again. A root without a
    /// table is skipped: roots need not own any nodes.
    pub fn mark(&self, root: &AppIdentity, marked: &mut HashSet<AppIdentity>) {
        let Some(root_nodes) = self.nodes(root) else {
            return;
        };
        if !marked.insert(root.clone()) {
            return;
        }

        let mut stack = vec![root_nodes.values()];
        while let Some(top) = stack.last_mut() {
            let Some(info) = top.next() else {
                stack.pop();
                continue;
            };

            // Edges are directed; only the source side is followed.
            if !info.is_source || marked.contains(&info.peer.app) {
                continue;
            }

            // Apps are only erased once nothing points into them.
            let next = self.nodes(&info.peer.app);
            debug_assert!(next.is_some(), "source edge into missing app {}", info.peer.app);
            let Some(next) = next else {
                tracing::error!(app = %info.peer.app, "source edge points into missing app");
                continue;
            };

            marked.insert(info.peer.app.clone());
            stack.push(next.values());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeLocator;
    use crate::interner::Interner;

    /// Build an edge owned by `from` whose target end lives in `to`.
    fn link(graph: &mut Graph, from: &AppIdentity, to: &AppIdentity, id: u32) {
        graph.insert_pair(from, id, id + 1).unwrap();
        graph
            .move_node(
                &NodeLocator::new(from.clone(), id + 1),
                &NodeLocator::new(to.clone(), id + 1),
            )
            .unwrap();
    }

    #[test]
    fn test_mark_missing_root_is_noop() {
        let mut interner = Interner::new();
        let graph = Graph::new();
        let mut marked = HashSet::new();

        graph.mark(&interner.intern("mojo:root"), &mut marked);
        assert!(marked.is_empty());
    }

    #[test]
    fn test_mark_follows_source_edges_only() {
        let mut interner = Interner::new();
        let mut graph = Graph::new();
        let root = interner.intern("mojo:root");
        let child = interner.intern("mojo:child");
        let parent = interner.intern("mojo:parent");

        link(&mut graph, &root, &child, 1);
        // parent points at root; root must not reach parent through the target side
        link(&mut graph, &parent, &root, 10);

        let mut marked = HashSet::new();
        graph.mark(&root, &mut marked);

        assert!(marked.contains(&root));
        assert!(marked.contains(&child));
        assert!(!marked.contains(&parent));
    }

    #[test]
    fn test_mark_handles_cycles() {
        let mut interner = Interner::new();
        let mut graph = Graph::new();
        let a = interner.intern("mojo:a");
        let b = interner.intern("mojo:b");
        let c = interner.intern("mojo:c");

        link(&mut graph, &a, &b, 1);
        link(&mut graph, &b, &c, 10);
        link(&mut graph, &c, &a, 20);

        let mut marked = HashSet::new();
        graph.mark(&b, &mut marked);
        assert_eq!(marked.len(), 3);
    }

    #[test]
    fn test_mark_deep_chain() {
        let mut interner = Interner::new();
        let mut graph = Graph::new();
        let apps: Vec<_> = (0..20_000)
            .map(|i| interner.intern(&format!("mojo:app_{i}")))
            .collect();

        for (i, pair) in apps.windows(2).enumerate() {
            link(&mut graph, &pair[0], &pair[1], (i as u32) * 2);
        }

        let mut marked = HashSet::new();
        graph.mark(&apps[0], &mut marked);
        assert_eq!(marked.len(), apps.len());
    }

    #[test]
    fn test_mark_skips_already_marked_root() {
        let mut interner = Interner::new();
        let mut graph = Graph::new();
        let a = interner.intern("mojo:a");
        let b = interner.intern("mojo:b");
        link(&mut graph, &a, &b, 1);

        let mut marked = HashSet::new();
        marked.insert(a.clone());
        graph.mark(&a, &mut marked);

        // a was already visited, so its edges are not expanded again
        assert!(!marked.contains(&b));
    }
}
