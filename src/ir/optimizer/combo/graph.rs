// src/ir/optimizer/combo/graph.rs
//! Builds the node table (`node.rs`) and its side tables from a `Function`:
//! one `Block` node per basic block, one `Selector` node per `Cond`/`Switch`
//! terminator, and one `Def` node per value-producing instruction. Edge
//! reachability is tracked per `(block, successor index)` rather than as
//! materialized `ProjX` nodes (see `SPEC_FULL.md` section 2).

use super::node::{NodeId, NodeKind, NodeRecord, Op, Operand};
use crate::ir::function::Function;
use crate::ir::instruction::InstructionKind;
use crate::ir::terminator::TerminatorKind;
use crate::ir::value::literal::IrLiteralValue;
use crate::ir::value::{Value, ValueId};
use std::collections::HashMap;
use std::sync::Arc;

/// The node table plus the bookkeeping `propagate.rs` and `apply.rs` need
/// to walk it: per-block node ids, def-use resolution, and CFG edge shape.
pub struct Graph {
    pub entry_label: Arc<str>,
    pub records: Vec<NodeRecord>,
    pub block_node: HashMap<Arc<str>, NodeId>,
    pub selector_node: HashMap<Arc<str>, NodeId>,
    pub defs: HashMap<ValueId, NodeId>,
    /// Ordered successor labels per block, matching `Terminator::get_targets`.
    pub edge_targets: HashMap<Arc<str>, Vec<Arc<str>>>,
    /// `target block -> [(predecessor block, edge index in that predecessor)]`.
    pub incoming: HashMap<Arc<str>, Vec<(Arc<str>, usize)>>,
    /// For blocks terminated by `Switch`: the case literals in declaration
    /// order, parallel to `edge_targets`'s first `cases.len()` entries (the
    /// trailing entry is the default, with no case literal of its own).
    pub switch_cases: HashMap<Arc<str>, Vec<IrLiteralValue>>,
}

impl Graph {
    #[must_use]
    pub fn build(function: &Function) -> Graph {
        let entry_label = function.cfg.entry_label().into();
        let mut graph = Graph {
            entry_label,
            records: Vec::new(),
            block_node: HashMap::new(),
            selector_node: HashMap::new(),
            defs: HashMap::new(),
            edge_targets: HashMap::new(),
            incoming: HashMap::new(),
            switch_cases: HashMap::new(),
        };

        for block in function.cfg.blocks() {
            let id = graph.push_placeholder(NodeKind::Block(block.label.clone()), Op::Block, block.label.clone());
            graph.block_node.insert(block.label.clone(), id);

            let targets: Vec<Arc<str>> = block.terminator().get_targets().into_iter().map(Arc::from).collect();
            for (index, target) in targets.iter().enumerate() {
                graph.incoming.entry(target.clone()).or_default().push((block.label.clone(), index));
            }
            graph.edge_targets.insert(block.label.clone(), targets);

            if block.terminator().selector().is_some() {
                let id = graph.push_placeholder(
                    NodeKind::Selector(block.label.clone()),
                    Op::Block, // overwritten below once inputs can be resolved
                    block.label.clone(),
                );
                graph.selector_node.insert(block.label.clone(), id);
            }
        }

        // Reserve ids for every value-producing instruction before resolving
        // any operand, so forward/back references within Phis resolve.
        let mut pending: Vec<(NodeId, Arc<str>, &InstructionKind, ValueId)> = Vec::new();
        for block in function.cfg.blocks() {
            for inst in &block.instructions {
                if let Some(result) = &inst.result {
                    let id = graph.push_placeholder(NodeKind::Def(result.id), Op::Block, block.label.clone());
                    graph.defs.insert(result.id, id);
                    pending.push((id, block.label.clone(), &inst.kind, result.id));
                }
            }
        }

        for (id, block_label, kind, value_id) in pending {
            let operand = |v: &Value| Operand::from_value(v, &graph.defs);
            let ty = graph.defs_result_ty(function, value_id);
            let (op, inputs, phi_preds) = match kind {
                InstructionKind::Alloca { .. } => (Op::Alloca, vec![], vec![]),
                InstructionKind::Store { value, dest } => (Op::Store, vec![operand(value), operand(dest)], vec![]),
                InstructionKind::Load { src, .. } => (Op::Load, vec![operand(src)], vec![]),
                InstructionKind::Binary { op, left, right, .. } => {
                    (Op::Binary(op.clone()), vec![operand(left), operand(right)], vec![])
                }
                InstructionKind::Unary { op, operand: v, .. } => (Op::Unary(op.clone()), vec![operand(v)], vec![]),
                InstructionKind::Call { func, args, .. } => {
                    let mut inputs = vec![operand(func)];
                    inputs.extend(args.iter().map(operand));
                    (Op::Call, inputs, vec![])
                }
                InstructionKind::GetElementPtr { base, index, .. } => {
                    (Op::GetElementPtr, vec![operand(base), operand(index)], vec![])
                }
                InstructionKind::Cast { kind, value, .. } => (Op::Cast(*kind), vec![operand(value)], vec![]),
                InstructionKind::Phi { incoming, .. } => {
                    let inputs = incoming.iter().map(|(v, _)| operand(v)).collect();
                    let preds = incoming.iter().map(|(_, label)| Arc::from(label.as_str())).collect();
                    (Op::Phi, inputs, preds)
                }
                InstructionKind::Confirm { value, bound, relation } => {
                    (Op::Confirm(*relation), vec![operand(value), operand(bound)], vec![])
                }
                InstructionKind::Mux { cond, a, b, .. } => (Op::Mux, vec![operand(cond), operand(a), operand(b)], vec![]),
            };
            graph.records[id].op = op;
            graph.records[id].inputs = inputs;
            graph.records[id].phi_preds = phi_preds;
            graph.records[id].ty = ty;
            graph.records[id].block = block_label;
        }

        let selectors: Vec<(Arc<str>, NodeId)> = graph.selector_node.iter().map(|(l, &id)| (l.clone(), id)).collect();
        for (label, id) in selectors {
            let block = function.cfg.get_block(&label).expect("selector block must exist");
            let selector_value = block.terminator().selector().expect("selector node implies a selector value");
            let op = match &block.terminator().kind {
                TerminatorKind::ConditionalBranch { .. } => Op::Cond,
                TerminatorKind::Switch { cases, .. } => {
                    let literals = cases
                        .iter()
                        .filter_map(|(v, _)| match &v.kind {
                            crate::ir::value::ValueKind::Literal(lit) => Some(lit.clone()),
                            _ => None,
                        })
                        .collect();
                    graph.switch_cases.insert(label.clone(), literals);
                    Op::Switch { case_count: cases.len() }
                }
                _ => unreachable!("selector() only returns Some for Cond/Switch"),
            };
            let ty = selector_value.ty.clone();
            let input = Operand::from_value(selector_value, &graph.defs);
            graph.records[id].op = op;
            graph.records[id].inputs = vec![input];
            graph.records[id].ty = ty;
        }

        graph.link_uses();
        graph
    }

    fn push_placeholder(&mut self, kind: NodeKind, op: Op, block: Arc<str>) -> NodeId {
        let id = self.records.len();
        self.records.push(NodeRecord {
            kind,
            op,
            ty: crate::ir::types::IrType::Control,
            block,
            inputs: Vec::new(),
            phi_preds: Vec::new(),
            uses: Vec::new(),
        });
        id
    }

    fn defs_result_ty(&self, function: &Function, value_id: ValueId) -> crate::ir::types::IrType {
        for block in function.cfg.blocks() {
            for inst in &block.instructions {
                if let Some(result) = &inst.result {
                    if result.id == value_id {
                        return result.ty.clone();
                    }
                }
            }
        }
        crate::ir::types::IrType::Void
    }

    fn link_uses(&mut self) {
        let mut uses: Vec<(NodeId, NodeId)> = Vec::new();
        for (id, record) in self.records.iter().enumerate() {
            for input in &record.inputs {
                if let Operand::Node(producer) = input {
                    uses.push((*producer, id));
                }
            }
        }
        for (producer, consumer) in uses {
            self.records[producer].uses.push(consumer);
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.records.len()
    }

    /// Whether any edge into `block` is currently reachable (i.e. whether
    /// it should be treated as a `Jmp`'s unconditional fallthrough target
    /// or the graph's entry).
    #[must_use]
    pub fn is_entry(&self, block: &str) -> bool {
        block == self.entry_label.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::test_support::FunctionBuilder;
    use crate::ir::terminator::TerminatorKind as TK;
    use crate::ir::types::IrType;
    use crate::ir::value::literal::IrLiteralValue;

    #[test]
    fn builds_one_block_node_per_block_and_links_defuse() {
        let one = Value::new_literal(IrLiteralValue::I32(1));
        let result = Value::new_temporary(ValueId::new(), IrType::I32);
        let inst = crate::ir::Instruction::new(InstructionKind::Unary {
            op: crate::ir::instruction::IrUnaryOp::Negate,
            operand: one,
            ty: IrType::I32,
        })
        .with_result(result.clone());

        let func = FunctionBuilder::new("f")
            .push("entry", inst)
            .terminate("entry", TK::Return { value: result, ty: IrType::I32 })
            .build();

        let graph = Graph::build(&func);
        assert_eq!(graph.block_node.len(), 1);
        assert!(graph.defs.values().count() == 1);
        let def_id = *graph.defs.values().next().unwrap();
        assert!(graph.records[def_id].uses.is_empty());
    }
}
