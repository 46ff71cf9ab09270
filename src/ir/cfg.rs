// src/ir/cfg.rs
use super::basic_block::BasicBlock;
use super::instruction::Instruction;
use super::terminator::Terminator;
use crate::error::ComboError;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    graph: DiGraph<BasicBlock, ()>,
    pub entry_label: Arc<str>,
    reverse_post_order: Vec<NodeIndex>,
    /// Tracks whether `reverse_post_order` is valid with respect to current graph topology.
    /// Set to `false` when nodes or edges are added/removed; lazily recomputed on access.
    reverse_post_order_valid: bool,
}

impl ControlFlowGraph {
    #[must_use]
    pub fn new(entry_label: Arc<str>) -> Self {
        Self { graph: DiGraph::new(), entry_label, reverse_post_order: Vec::new(), reverse_post_order_valid: false }
    }

    #[must_use]
    pub const fn graph(&self) -> &DiGraph<BasicBlock, ()> {
        &self.graph
    }

    pub const fn graph_mut(&mut self) -> &mut DiGraph<BasicBlock, ()> {
        &mut self.graph
    }

    #[must_use]
    pub fn entry_label(&self) -> &str {
        &self.entry_label
    }

    pub fn reverse_post_order(&mut self) -> &[NodeIndex] {
        if !self.reverse_post_order_valid {
            self.recompute_reverse_post_order();
            self.reverse_post_order_valid = true;
        }
        &self.reverse_post_order
    }

    pub fn add_block(&mut self, block: BasicBlock) -> NodeIndex {
        let idx = self.graph.add_node(block);
        self.reverse_post_order_valid = false;
        idx
    }

    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        self.graph.add_edge(from, to, ());
        self.reverse_post_order_valid = false;
    }

    #[must_use]
    pub fn find_block_by_label(&self, label: &str) -> Option<NodeIndex> {
        self.graph.node_indices().find(|&idx| self.graph[idx].label.as_ref() == label)
    }

    #[must_use]
    pub fn get_block(&self, label: &str) -> Option<&BasicBlock> {
        self.find_block_by_label(label).map(|idx| &self.graph[idx])
    }

    pub fn get_block_mut(&mut self, label: &str) -> Option<&mut BasicBlock> {
        self.find_block_by_label(label).and_then(|idx| self.graph.node_weight_mut(idx))
    }

    #[must_use]
    pub fn get_entry_block(&self) -> Option<&BasicBlock> {
        self.get_block(&self.entry_label)
    }

    #[must_use]
    pub fn get_entry_block_index(&self) -> Option<NodeIndex> {
        self.find_block_by_label(&self.entry_label)
    }

    /// Returns `true` if the block was found and the instruction was appended.
    pub fn add_instruction_to_block(&mut self, block_label: &str, instruction: Instruction) -> bool {
        if let Some(block) = self.get_block_mut(block_label) {
            block.instructions.push(instruction);
            true
        } else {
            false
        }
    }

    /// Returns `true` if the block was found and the terminator was set.
    pub fn set_block_terminator(&mut self, block_label: &str, terminator: Terminator) -> bool {
        if let Some(block) = self.get_block_mut(block_label) {
            block.terminator = terminator;
            true
        } else {
            false
        }
    }

    pub fn connect_blocks(&mut self, from_label: &str, to_label: &str) -> bool {
        if let (Some(from_idx), Some(to_idx)) =
            (self.find_block_by_label(from_label), self.find_block_by_label(to_label))
        {
            self.add_edge(from_idx, to_idx);
            true
        } else {
            false
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.graph.node_weights()
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut BasicBlock> {
        self.graph.node_weights_mut()
    }

    /// Removes a block from the CFG by its label, along with its incident edges.
    /// Returns `true` if the block was found and removed.
    ///
    /// # Note
    /// Callers should ensure the removal maintains CFG validity.
    pub fn remove_block(&mut self, label: &str) -> bool {
        if let Some(idx) = self.find_block_by_label(label) {
            self.graph.remove_node(idx);
            self.reverse_post_order_valid = false;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn dfs_post_order(&self) -> Box<dyn Iterator<Item = NodeIndex> + '_> {
        if let Some(entry_idx) = self.get_entry_block_index() {
            let mut dfs = Dfs::new(&self.graph, entry_idx);
            Box::new(std::iter::from_fn(move || dfs.next(&self.graph)))
        } else {
            Box::new(std::iter::empty())
        }
    }

    /// Verifies the CFG's well-formedness: an entry block exists, every
    /// block has a terminator, and every terminator target resolves to a
    /// block in the graph. This is the precondition check spec.md section 7
    /// names as the reason the pass would refuse to run.
    ///
    /// # Errors
    /// Returns [`ComboError::MalformedGraph`] describing the first violation found.
    pub fn verify(&self) -> Result<(), ComboError> {
        if self.get_entry_block().is_none() {
            return Err(ComboError::MalformedGraph(format!("no entry block with label '{}'", self.entry_label)));
        }

        for block in self.blocks() {
            if !block.terminator.is_terminator() {
                return Err(ComboError::MalformedGraph(format!("block '{}' has no terminator", block.label)));
            }
        }

        let label_set: HashSet<Arc<str>> = self.blocks().map(|b| b.label.clone()).collect();
        for block in self.blocks() {
            for target_label in block.terminator.get_targets() {
                if !label_set.iter().any(|l| l.as_ref() == target_label) {
                    return Err(ComboError::MalformedGraph(format!(
                        "block '{}' branches to non-existent block '{}'",
                        block.label, target_label
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn recompute_reverse_post_order(&mut self) {
        if let Some(entry_idx) = self.get_entry_block_index() {
            let mut post_order = Vec::new();
            let mut dfs = Dfs::new(&self.graph, entry_idx);
            while let Some(node) = dfs.next(&self.graph) {
                post_order.push(node);
            }
            post_order.reverse();
            self.reverse_post_order = post_order;
        } else {
            self.reverse_post_order.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::terminator::TerminatorKind;

    #[test]
    fn verify_rejects_dangling_branch_target() {
        let mut cfg = ControlFlowGraph::new(Arc::from("entry"));
        let entry = cfg.add_block(BasicBlock::new("entry"));
        cfg.graph_mut()[entry].set_terminator(Terminator::new(TerminatorKind::Branch { label: Arc::from("missing") }));
        assert!(matches!(cfg.verify(), Err(ComboError::MalformedGraph(_))));
    }

    #[test]
    fn verify_accepts_self_loop_to_entry() {
        let mut cfg = ControlFlowGraph::new(Arc::from("entry"));
        let entry = cfg.add_block(BasicBlock::new("entry"));
        cfg.graph_mut()[entry].set_terminator(Terminator::new(TerminatorKind::Branch { label: Arc::from("entry") }));
        cfg.add_edge(entry, entry);
        assert!(cfg.verify().is_ok());
    }
}
