// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Node Stack
//!
//! `NodeStack` owns the arena of [`DecisionNode`]s that make up the current
//! execution's decision path, plus the replay cursor used while forcing a
//! previously-recorded alternative.

use crate::ids::NodeId;
use crate::node::DecisionNode;
use crate::scheduler::EnabledState;

#[derive(Debug, Default)]
pub struct NodeStack {
    nodes: Vec<DecisionNode>,
    /// Index into `nodes` of the node currently being extended; `None`
    /// before the first action of the execution is taken.
    head: Option<usize>,
    /// During replay, the index up to which the stack must reproduce a
    /// previously recorded path before resuming live exploration.
    replay_until: Option<usize>,
}

impl NodeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn head_id(&self) -> Option<NodeId> {
        self.head.map(|i| NodeId(i as u32))
    }

    pub fn get(&self, id: NodeId) -> &DecisionNode {
        &self.nodes[id.as_usize()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut DecisionNode {
        &mut self.nodes[id.as_usize()]
    }

    pub fn get_head(&self) -> Option<&DecisionNode> {
        self.head.map(|i| &self.nodes[i])
    }

    pub fn get_head_mut(&mut self) -> Option<&mut DecisionNode> {
        self.head.map(move |i| &mut self.nodes[i])
    }

    /// Pushes a new node as a child of the current head and advances the
    /// head to it, returning the new node's id. The first call (no current
    /// head) creates the root node.
    pub fn explore_action(&mut self, enabled_array: Vec<EnabledState>) -> NodeId {
        let parent = self.head_id();
        let num_threads = enabled_array.len();
        let prev_fairness = parent.map(|p| self.get(p).fairness().to_vec());

        let node = DecisionNode::new(
            None,
            parent,
            num_threads,
            enabled_array,
            prev_fairness.as_deref(),
        );
        self.nodes.push(node);
        let id = NodeId((self.nodes.len() - 1) as u32);
        self.head = Some(id.as_usize());
        id
    }

    pub fn get_next(&self) -> Option<NodeId> {
        self.head.map(|i| NodeId((i + 1) as u32)).filter(|id| id.as_usize() < self.nodes.len())
    }

    /// Drops every node after `keep_len`, discarding all exploration past
    /// the divergence point of a new backtrack target.
    pub fn pop_restofstack(&mut self, keep_len: usize) {
        self.nodes.truncate(keep_len);
        self.head = if keep_len == 0 { None } else { Some(keep_len - 1) };
    }

    /// Resets the stack to empty, ready to record a brand-new execution from
    /// scratch (used after a full backtrack-set exhaustion at the root).
    pub fn reset_execution(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.replay_until = None;
    }

    pub fn set_replay_until(&mut self, idx: Option<usize>) {
        self.replay_until = idx;
    }

    pub fn replay_until(&self) -> Option<usize> {
        self.replay_until
    }

    /// Walks the stack top-down (from the most recently explored node back
    /// toward the root) looking for the deepest node with an unexplored
    /// backtrack entry. Returns that node's id and the thread it still owes
    /// an exploration of, along with the stack length to truncate to before
    /// replaying toward it.
    pub fn get_next_backtrack(&mut self) -> Option<(NodeId, crate::ids::ThreadId, usize)> {
        for i in (0..self.nodes.len()).rev() {
            if self.nodes[i].backtrack_empty() {
                continue;
            }
            if let Some(tid) = self.nodes[i].get_next_backtrack() {
                return Some((NodeId(i as u32), tid, i + 1));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ThreadId;

    fn enabled(n: usize) -> Vec<EnabledState> {
        vec![EnabledState::Enabled; n]
    }

    #[test]
    fn explore_action_links_parent_chain() {
        let mut stack = NodeStack::new();
        let root = stack.explore_action(enabled(2));
        let child = stack.explore_action(enabled(2));
        assert_eq!(stack.get(child).parent(), Some(root));
        assert_eq!(stack.total_nodes(), 2);
    }

    #[test]
    fn pop_restofstack_truncates_and_resets_head() {
        let mut stack = NodeStack::new();
        stack.explore_action(enabled(1));
        stack.explore_action(enabled(1));
        stack.explore_action(enabled(1));
        stack.pop_restofstack(1);
        assert_eq!(stack.total_nodes(), 1);
        assert_eq!(stack.head_id(), Some(NodeId(0)));
    }

    #[test]
    fn get_next_backtrack_finds_deepest_pending_entry() {
        let mut stack = NodeStack::new();
        let n0 = stack.explore_action(enabled(2));
        let _n1 = stack.explore_action(enabled(2));
        stack.get_mut(n0).set_backtrack(ThreadId(1));

        let (id, tid, truncate_len) = stack.get_next_backtrack().unwrap();
        assert_eq!(id, n0);
        assert_eq!(tid, ThreadId(1));
        assert_eq!(truncate_len, 1);
    }
}
