// src/ir/optimizer/combo/apply.rs
//! Apply phase (spec.md section 4.9): rewrites the IR in place from the
//! settled lattice/partition state. Four walks, in order: replace resolved
//! operands, drop unreachable blocks and fuse trivial ones, shrink Phis to
//! their reachable predecessors, then delete instructions that became
//! provably dead (never the "memory" ops `Alloca`/`Load`/`Store`/`Call`,
//! which spec.md's step 1 keeps alive regardless of their lattice value).

use super::ComboConfig;
use super::graph::Graph;
use super::lattice::Lattice;
use super::node::{NodeId, NodeKind, Op};
use super::partition::Partitioning;
use super::propagate::State;
use crate::ir::function::Function;
use crate::ir::instruction::{Instruction, InstructionKind};
use crate::ir::terminator::{Terminator, TerminatorKind};
use crate::ir::value::{Value, ValueId};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub blocks_removed: usize,
    pub blocks_fused: usize,
    pub instructions_removed: usize,
    pub phis_shrunk: usize,
    pub branches_simplified: usize,
}

pub fn apply(
    function: &mut Function,
    graph: &Graph,
    state: &State,
    partitioning: &Partitioning,
    config: &ComboConfig,
) -> ApplyStats {
    let mut stats = ApplyStats::default();

    rewrite_operands(function, graph, state, partitioning);
    remove_unreachable_blocks(function, graph, state, &mut stats);
    shrink_phis(function, graph, state, &mut stats);
    simplify_branches(function, graph, state, config, &mut stats);
    fuse_single_predecessor_jumps(function, &mut stats);
    dead_code_elimination(function, &mut stats);

    stats
}

fn leader_value(graph: &Graph, partitioning: &Partitioning, node: NodeId, ty: &crate::ir::types::IrType) -> Option<Value> {
    let partition_id = partitioning.partition_of(node);
    let leader = *partitioning.partitions[partition_id].leaders.first()?;
    if leader == node {
        return None;
    }
    let NodeKind::Def(leader_value_id) = graph.records[leader].kind else { return None };
    Some(Value::new_temporary(leader_value_id, ty.clone()))
}

/// Resolves what a use of `value` should become, or `None` if it should be
/// left untouched (already canonical).
fn resolve(graph: &Graph, state: &State, partitioning: &Partitioning, value: &Value) -> Option<Value> {
    let crate::ir::value::ValueKind::Temporary(id) = &value.kind else { return None };
    let &node = graph.defs.get(id)?;
    match &state.values[node] {
        Lattice::Constant(lit) => Some(Value::new_literal(lit.clone())),
        Lattice::SymConst(entity) => Some(Value::new_global(entity.0.clone(), value.ty.clone())),
        Lattice::Top => Some(Value::new_poison(value.ty.clone())),
        Lattice::Bottom => leader_value(graph, partitioning, node, &value.ty),
        Lattice::Unreachable | Lattice::Reachable => None,
    }
}

fn rewrite(graph: &Graph, state: &State, partitioning: &Partitioning, value: &mut Value) {
    if let Some(resolved) = resolve(graph, state, partitioning, value) {
        *value = resolved;
    }
}

fn rewrite_operands(function: &mut Function, graph: &Graph, state: &State, partitioning: &Partitioning) {
    for block in function.cfg.blocks_mut() {
        for inst in &mut block.instructions {
            rewrite_instruction(graph, state, partitioning, inst);
        }
        rewrite_terminator(graph, state, partitioning, block.terminator_mut());
    }
}

fn rewrite_instruction(graph: &Graph, state: &State, partitioning: &Partitioning, inst: &mut Instruction) {
    let go = |v: &mut Value| rewrite(graph, state, partitioning, v);
    match &mut inst.kind {
        InstructionKind::Alloca { .. } => {}
        InstructionKind::Store { value, dest } => {
            go(value);
            go(dest);
        }
        InstructionKind::Load { src, .. } => go(src),
        InstructionKind::Binary { left, right, .. } => {
            go(left);
            go(right);
        }
        InstructionKind::Unary { operand, .. } => go(operand),
        InstructionKind::Call { func, args, .. } => {
            go(func);
            for arg in args {
                go(arg);
            }
        }
        InstructionKind::GetElementPtr { base, index, .. } => {
            go(base);
            go(index);
        }
        InstructionKind::Cast { value, .. } => go(value),
        InstructionKind::Phi { incoming, .. } => {
            for (value, _) in incoming {
                go(value);
            }
        }
        InstructionKind::Confirm { value, bound, .. } => {
            go(value);
            go(bound);
        }
        InstructionKind::Mux { cond, a, b, .. } => {
            go(cond);
            go(a);
            go(b);
        }
    }
}

fn rewrite_terminator(graph: &Graph, state: &State, partitioning: &Partitioning, term: &mut Terminator) {
    match &mut term.kind {
        TerminatorKind::Return { value, .. } => rewrite(graph, state, partitioning, value),
        TerminatorKind::ConditionalBranch { condition, .. } => rewrite(graph, state, partitioning, condition),
        TerminatorKind::Switch { value, .. } => rewrite(graph, state, partitioning, value),
        TerminatorKind::Branch { .. } | TerminatorKind::Unreachable => {}
    }
}

fn edge_index(graph: &Graph, pred: &str, target: &str) -> Option<usize> {
    graph.edge_targets.get(pred)?.iter().position(|t| t.as_ref() == target)
}

fn edge_reachable(graph: &Graph, state: &State, pred: &str, target: &str) -> bool {
    edge_index(graph, pred, target)
        .is_some_and(|index| state.edges.get(&(Arc::from(pred), index)) == Some(&Lattice::Reachable))
}

fn remove_unreachable_blocks(function: &mut Function, graph: &Graph, state: &State, stats: &mut ApplyStats) {
    let dead: Vec<Arc<str>> = graph
        .block_node
        .iter()
        .filter(|&(_, &id)| state.values[id] == Lattice::Unreachable)
        .map(|(label, _)| label.clone())
        .collect();

    for label in dead {
        if function.cfg.remove_block(&label) {
            stats.blocks_removed += 1;
        }
    }
}

fn shrink_phis(function: &mut Function, graph: &Graph, state: &State, stats: &mut ApplyStats) {
    let labels: Vec<Arc<str>> = function.cfg.blocks().map(|b| b.label.clone()).collect();
    for label in labels {
        let Some(block) = function.cfg.get_block_mut(&label) else { continue };
        for inst in &mut block.instructions {
            let InstructionKind::Phi { incoming, .. } = &mut inst.kind else { break };
            let before = incoming.len();
            incoming.retain(|(_, pred)| edge_reachable(graph, state, pred, &label));
            if incoming.len() != before {
                stats.phis_shrunk += 1;
            }
        }
    }
}

/// Rewrites a `Cond`/`Switch` terminator with exactly one reachable
/// successor into a plain `Branch`. Logs a non-fatal diagnostic (spec.md
/// section 4.9 step 3) if a `Switch`'s selector is a known constant yet
/// more than one successor remains reachable — an upstream invariant
/// violation this pass does not itself cause.
fn simplify_branches(function: &mut Function, graph: &Graph, state: &State, config: &ComboConfig, stats: &mut ApplyStats) {
    let selectors: Vec<(Arc<str>, NodeId)> = graph.selector_node.iter().map(|(l, &id)| (l.clone(), id)).collect();
    for (label, selector_id) in selectors {
        let Some(targets) = graph.edge_targets.get(&label).cloned() else { continue };
        let reachable: Vec<&Arc<str>> =
            targets.iter().enumerate().filter(|(i, _)| state.edges.get(&(label.clone(), *i)) == Some(&Lattice::Reachable)).map(|(_, t)| t).collect();

        if matches!(graph.records[selector_id].op, Op::Switch { .. })
            && state.values[selector_id].as_constant().is_some()
            && reachable.len() > 1
            && config.verbose
        {
            eprintln!("combo: block '{label}' has a constant switch selector but {} reachable successors", reachable.len());
        }

        if reachable.len() == 1 {
            let only = reachable[0].clone();
            if let Some(block) = function.cfg.get_block_mut(&label) {
                block.set_terminator(Terminator::new(TerminatorKind::Branch { label: only }));
                stats.branches_simplified += 1;
            }
        }
    }
}

/// Merges a block into its sole predecessor when that predecessor's only
/// successor is this block and its terminator is a plain `Branch`.
fn fuse_single_predecessor_jumps(function: &mut Function, stats: &mut ApplyStats) {
    loop {
        let Some((pred_label, block_label)) = find_fusable_pair(function) else { break };

        let block_body = function.cfg.get_block(&block_label).cloned();
        let Some(block_body) = block_body else { break };

        for inst in &block_body.instructions {
            function.cfg.add_instruction_to_block(&pred_label, inst.clone());
        }
        function.cfg.set_block_terminator(&pred_label, block_body.terminator().clone());
        function.cfg.remove_block(&block_label);

        let targets = block_body.terminator().get_targets();
        for target in targets {
            function.cfg.connect_blocks(&pred_label, &target);
        }

        stats.blocks_fused += 1;
    }
}

fn find_fusable_pair(function: &Function) -> Option<(Arc<str>, Arc<str>)> {
    use petgraph::Direction;
    let graph = function.cfg.graph();
    for idx in graph.node_indices() {
        let block = &graph[idx];
        if block.label.as_ref() == function.cfg.entry_label() {
            continue;
        }
        let mut preds = graph.neighbors_directed(idx, Direction::Incoming);
        let Some(pred_idx) = preds.next() else { continue };
        if preds.next().is_some() {
            continue;
        }
        let pred = &graph[pred_idx];
        if !matches!(pred.terminator().kind, TerminatorKind::Branch { .. }) {
            continue;
        }
        if graph.neighbors_directed(pred_idx, Direction::Outgoing).count() != 1 {
            continue;
        }
        if pred_idx == idx {
            continue;
        }
        return Some((pred.label.clone(), block.label.clone()));
    }
    None
}

/// Deletes instructions whose result is never referenced again, excluding
/// the "memory" opcodes spec.md section 4.9 step 1 keeps alive
/// unconditionally (`Alloca`, `Load`, `Store`, `Call`).
fn dead_code_elimination(function: &mut Function, stats: &mut ApplyStats) {
    loop {
        let live: HashSet<ValueId> = collect_used_values(function);
        let mut removed_any = false;

        for block in function.cfg.blocks_mut() {
            let before = block.instructions.len();
            block.instructions.retain(|inst| !is_removable_dead(inst, &live));
            stats.instructions_removed += before - block.instructions.len();
            removed_any |= before != block.instructions.len();
        }

        if !removed_any {
            break;
        }
    }
}

fn is_removable_dead(inst: &Instruction, live: &HashSet<ValueId>) -> bool {
    if matches!(
        inst.kind,
        InstructionKind::Alloca { .. } | InstructionKind::Load { .. } | InstructionKind::Store { .. } | InstructionKind::Call { .. }
    ) {
        return false;
    }
    match &inst.result {
        Some(result) => !live.contains(&result.id),
        None => false,
    }
}

fn collect_used_values(function: &Function) -> HashSet<ValueId> {
    let mut used = HashSet::new();
    let mut note = |v: &Value| {
        if let crate::ir::value::ValueKind::Temporary(id) = &v.kind {
            used.insert(*id);
        }
    };
    for block in function.cfg.blocks() {
        for inst in &block.instructions {
            note_instruction_operands(inst, &mut note);
        }
        note_terminator_operands(block.terminator(), &mut note);
    }
    used
}

fn note_instruction_operands(inst: &Instruction, note: &mut impl FnMut(&Value)) {
    match &inst.kind {
        InstructionKind::Alloca { .. } => {}
        InstructionKind::Store { value, dest } => {
            note(value);
            note(dest);
        }
        InstructionKind::Load { src, .. } => note(src),
        InstructionKind::Binary { left, right, .. } => {
            note(left);
            note(right);
        }
        InstructionKind::Unary { operand, .. } => note(operand),
        InstructionKind::Call { func, args, .. } => {
            note(func);
            args.iter().for_each(note);
        }
        InstructionKind::GetElementPtr { base, index, .. } => {
            note(base);
            note(index);
        }
        InstructionKind::Cast { value, .. } => note(value),
        InstructionKind::Phi { incoming, .. } => incoming.iter().for_each(|(v, _)| note(v)),
        InstructionKind::Confirm { value, bound, .. } => {
            note(value);
            note(bound);
        }
        InstructionKind::Mux { cond, a, b, .. } => {
            note(cond);
            note(a);
            note(b);
        }
    }
}

fn note_terminator_operands(term: &Terminator, note: &mut impl FnMut(&Value)) {
    match &term.kind {
        TerminatorKind::Return { value, .. } => note(value),
        TerminatorKind::ConditionalBranch { condition, .. } => note(condition),
        TerminatorKind::Switch { value, .. } => note(value),
        TerminatorKind::Branch { .. } | TerminatorKind::Unreachable => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instruction::{IrBinaryOp, Relation};
    use crate::ir::optimizer::combo::{graph::Graph, propagate, refine};
    use crate::ir::terminator::TerminatorKind as TK;
    use crate::ir::test_support::FunctionBuilder;
    use crate::ir::types::IrType;
    use crate::ir::value::literal::IrLiteralValue;
    use crate::ir::value::{Value, ValueId};

    #[test]
    fn self_subtraction_is_rewritten_to_a_literal_zero() {
        let x = Value::new_temporary(ValueId::new(), IrType::I32);
        let alloca = Instruction::new(InstructionKind::Alloca { ty: IrType::I32 }).with_result(x.clone());
        let r = Value::new_temporary(ValueId::new(), IrType::I32);
        let sub = Instruction::new(InstructionKind::Binary {
            op: IrBinaryOp::Subtract,
            left: x.clone(),
            right: x,
            ty: IrType::I32,
        })
        .with_result(r.clone());

        let mut func =
            FunctionBuilder::new("f").push("entry", alloca).push("entry", sub).ret("entry", r, IrType::I32).build();

        let graph = Graph::build(&func);
        let config = ComboConfig::default();
        let seed = Partitioning::new_discrete(graph.node_count());
        let state = propagate::run(&graph, &config, &seed).unwrap();
        let (partitioning, _) = refine::refine(&graph, &state, &config);
        apply(&mut func, &graph, &state, &partitioning, &config);

        let TerminatorKind::Return { value, .. } = &func.get_block("entry").unwrap().terminator().kind else {
            panic!("expected a return terminator")
        };
        assert_eq!(value.kind, crate::ir::value::ValueKind::Literal(IrLiteralValue::I32(0)));
    }

    #[test]
    fn switch_with_constant_selector_becomes_a_branch() {
        let scrutinee = Value::new_literal(IrLiteralValue::I32(2));
        let mut func = FunctionBuilder::new("f")
            .block("one")
            .block("two")
            .terminate(
                "entry",
                TK::Switch {
                    value: scrutinee,
                    ty: IrType::I32,
                    default_label: "one".to_string(),
                    cases: vec![(Value::new_literal(IrLiteralValue::I32(2)), "two".to_string())],
                },
            )
            .edge("entry", "one")
            .edge("entry", "two")
            .ret("one", Value::new_literal(IrLiteralValue::I32(0)), IrType::I32)
            .ret("two", Value::new_literal(IrLiteralValue::I32(1)), IrType::I32)
            .build();

        let graph = Graph::build(&func);
        let config = ComboConfig::default();
        let seed = Partitioning::new_discrete(graph.node_count());
        let state = propagate::run(&graph, &config, &seed).unwrap();
        let (partitioning, _) = refine::refine(&graph, &state, &config);
        apply(&mut func, &graph, &state, &partitioning, &config);

        let entry = func.get_block("entry").unwrap();
        assert!(matches!(&entry.terminator().kind, TerminatorKind::Branch { label } if label.as_ref() == "two"));
        assert!(func.get_block("one").is_none());
    }

    #[test]
    fn confirm_with_non_eq_relation_is_removed_once_dead() {
        let x = Value::new_temporary(ValueId::new(), IrType::I32);
        let bound = Value::new_literal(IrLiteralValue::I32(5));
        let alloca = Instruction::new(InstructionKind::Alloca { ty: IrType::I32 }).with_result(x.clone());
        let confirmed = Value::new_temporary(ValueId::new(), IrType::I32);
        let confirm = Instruction::new(InstructionKind::Confirm { value: x, bound, relation: Relation::Lt })
            .with_result(confirmed.clone());

        let mut func = FunctionBuilder::new("f")
            .push("entry", alloca)
            .push("entry", confirm)
            .ret("entry", Value::new_literal(IrLiteralValue::I32(0)), IrType::I32)
            .build();

        let graph = Graph::build(&func);
        let config = ComboConfig::default();
        let seed = Partitioning::new_discrete(graph.node_count());
        let state = propagate::run(&graph, &config, &seed).unwrap();
        let (partitioning, _) = refine::refine(&graph, &state, &config);
        apply(&mut func, &graph, &state, &partitioning, &config);

        assert!(!func.get_block("entry").unwrap().instructions.iter().any(|i| matches!(i.kind, InstructionKind::Confirm { .. })));
    }
}
