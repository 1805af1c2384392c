// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Modification-Order Graph
//!
//! `CycleGraph` is a directed graph over write actions
//! (including the synthetic init write) recording modification-order
//! (`mo`) constraints, plus a distinguished "reads from" back-edge per node
//! enforcing RMW-atomicity: exactly one RMW may read from any given write.
//!
//! The memory model requires `mo` to be a partial order; a cycle means the
//! candidate execution is infeasible and can be abandoned immediately. RMW
//! atomicity is enforced graph-locally (via the `rmw` slot on a node)
//! rather than by scanning the whole trace.
//!
//! Nodes are addressed by [`ActionId`], which is already a dense arena
//! index, so the graph stores nodes in a plain growable vector rather than
//! a hash table — other per-object maps elsewhere in this crate use
//! `dashmap`/`HashMap` for sparse, externally-keyed data, but this graph's
//! keys are already our own dense indices, so a vector is the direct
//! generalization of CDSChecker's `HashTable<CycleNode*, CycleNode*>`.

use crate::ids::ActionId;

#[derive(Debug, Clone, Default)]
struct CycleNode {
    edges: Vec<ActionId>,
    rmw: Option<ActionId>,
}

impl CycleNode {
    /// Returns true if the edge was newly added (idempotent insertion).
    fn add_edge(&mut self, to: ActionId) -> bool {
        if self.edges.contains(&to) {
            false
        } else {
            self.edges.push(to);
            true
        }
    }

    fn pop_edge(&mut self) {
        self.edges.pop();
    }

    /// Returns true if this node already had an RMW observer (a violation).
    fn set_rmw(&mut self, rmw: ActionId) -> bool {
        if self.rmw.is_some() {
            true
        } else {
            self.rmw = Some(rmw);
            false
        }
    }

    fn clear_rmw(&mut self) {
        self.rmw = None;
    }
}

#[derive(Debug, Clone, Copy)]
enum Undo {
    PopEdge(ActionId),
    ClearRmw(ActionId),
}

/// Directed mo/rmw graph with checkpoint/rollback support.
#[derive(Debug, Default)]
pub struct CycleGraph {
    nodes: Vec<Option<CycleNode>>,
    has_cycle: bool,
    has_rmw_violation: bool,
    old_has_cycle: bool,
    old_has_rmw_violation: bool,
    undo_log: Vec<Undo>,
}

impl CycleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, id: ActionId) {
        let idx = id.as_usize();
        if self.nodes.len() <= idx {
            self.nodes.resize_with(idx + 1, || None);
        }
        if self.nodes[idx].is_none() {
            self.nodes[idx] = Some(CycleNode::default());
        }
    }

    fn node(&self, id: ActionId) -> Option<&CycleNode> {
        self.nodes.get(id.as_usize())?.as_ref()
    }

    fn node_mut(&mut self, id: ActionId) -> &mut CycleNode {
        self.ensure(id);
        self.nodes[id.as_usize()].as_mut().unwrap()
    }

    /// Records that `to` is mo-ordered after `from`.
    pub fn add_edge(&mut self, from: ActionId, to: ActionId) {
        self.ensure(from);
        self.ensure(to);

        if !self.has_cycle {
            self.has_cycle = from == to || self.reachable(to, from);
        }

        if self.node_mut(from).add_edge(to) {
            self.undo_log.push(Undo::PopEdge(from));
        }

        let rmw_of_from = self.node(from).and_then(|n| n.rmw);
        if let Some(rmw_node) = rmw_of_from {
            // `to` becoming the RMW's own write is fine; the execution is
            // already doomed elsewhere if `to` is itself an RMW reader of
            // `from`.
            if rmw_node != to {
                if !self.has_cycle {
                    self.has_cycle = self.reachable(to, rmw_node);
                }
                if self.node_mut(rmw_node).add_edge(to) {
                    self.undo_log.push(Undo::PopEdge(rmw_node));
                }
            }
        }
    }

    /// Records that `rmw` is the unique RMW that reads from (and must be
    /// immediately mo-after) `from`. All of `from`'s existing outgoing edges
    /// are inherited by `rmw`, since nothing may be mo-ordered between them.
    pub fn add_rmw_edge(&mut self, from: ActionId, rmw: ActionId) {
        self.ensure(from);
        self.ensure(rmw);

        if self.node_mut(from).set_rmw(rmw) {
            self.has_rmw_violation = true;
        } else {
            self.undo_log.push(Undo::ClearRmw(from));
        }

        let inherited: Vec<ActionId> = self
            .node(from)
            .map(|n| n.edges.clone())
            .unwrap_or_default();
        for to in inherited {
            if to != rmw && self.node_mut(rmw).add_edge(to) {
                self.undo_log.push(Undo::PopEdge(rmw));
            }
        }

        if !self.has_cycle {
            self.has_cycle = from == rmw || self.reachable(rmw, from);
        }
        if self.node_mut(from).add_edge(rmw) {
            self.undo_log.push(Undo::PopEdge(from));
        }
    }

    /// BFS reachability over successor edges: can `from` reach `to`?
    pub fn reachable(&self, from: ActionId, to: ActionId) -> bool {
        if self.node(from).is_none() || self.node(to).is_none() {
            return false;
        }
        let mut discovered = std::collections::HashSet::new();
        let mut queue = vec![from];
        discovered.insert(from);
        while let Some(n) = queue.pop() {
            if n == to {
                return true;
            }
            if let Some(node) = self.node(n) {
                for &next in &node.edges {
                    if discovered.insert(next) {
                        queue.push(next);
                    }
                }
            }
        }
        false
    }

    /// BFS from `from`, invoking `mark` on every reached thread (for
    /// promise satisfiability checks: a promise can never be satisfied once
    /// every enabled thread has synchronized through it). `mark` returns
    /// true once all interesting threads have been marked, short-circuiting
    /// the walk — mirrors `CycleGraph::checkPromise`.
    pub fn check_promise(&self, from: ActionId, mut mark: impl FnMut(ActionId) -> bool) -> bool {
        let mut discovered = std::collections::HashSet::new();
        let mut queue = vec![from];
        discovered.insert(from);
        while let Some(n) = queue.pop() {
            if mark(n) {
                return true;
            }
            if let Some(node) = self.node(n) {
                for &next in &node.edges {
                    if discovered.insert(next) {
                        queue.push(next);
                    }
                }
            }
        }
        false
    }

    pub fn start_changes(&self) {
        debug_assert!(self.undo_log.is_empty());
        debug_assert_eq!(self.old_has_cycle, self.has_cycle);
        debug_assert_eq!(self.old_has_rmw_violation, self.has_rmw_violation);
    }

    pub fn commit_changes(&mut self) {
        self.undo_log.clear();
        self.old_has_cycle = self.has_cycle;
        self.old_has_rmw_violation = self.has_rmw_violation;
    }

    pub fn rollback_changes(&mut self) {
        for undo in self.undo_log.drain(..).rev() {
            match undo {
                Undo::PopEdge(n) => {
                    if let Some(Some(node)) = self.nodes.get_mut(n.as_usize()) {
                        node.pop_edge();
                    }
                }
                Undo::ClearRmw(n) => {
                    if let Some(Some(node)) = self.nodes.get_mut(n.as_usize()) {
                        node.clear_rmw();
                    }
                }
            }
        }
        self.has_cycle = self.old_has_cycle;
        self.has_rmw_violation = self.old_has_rmw_violation;
    }

    pub fn has_cycle(&self) -> bool {
        self.has_cycle
    }

    pub fn has_rmw_violation(&self) -> bool {
        self.has_rmw_violation
    }
}
