// src/ir/optimizer/combo/propagate.rs
//! The propagation engine (spec.md section 4.4): a single worklist driving
//! both the value lattice and control (block/edge) reachability to a
//! common fixed point, re-deriving a node's lattice element with
//! `transfer.rs` whenever one of its inputs (or, for `Phi`, one of its
//! reachable predecessor edges) changes.

use super::ComboConfig;
use super::graph::Graph;
use super::identity;
use super::lattice::Lattice;
use super::node::{NodeId, NodeKind, Op, Operand};
use super::partition::Partitioning;
use super::transfer;
use crate::error::ComboError;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// The live lattice values the fixed point converges on: one element per
/// node, plus one per CFG edge (`(block, successor index)`).
pub struct State {
    pub values: Vec<Lattice>,
    pub edges: HashMap<(Arc<str>, usize), Lattice>,
}

impl State {
    fn new(graph: &Graph) -> State {
        let mut values = vec![Lattice::Top; graph.node_count()];
        for (id, record) in graph.records.iter().enumerate() {
            if matches!(record.kind, NodeKind::Block(_)) {
                values[id] = Lattice::Unreachable;
            }
        }
        let mut edges = HashMap::new();
        for (block, targets) in &graph.edge_targets {
            for index in 0..targets.len() {
                edges.insert((block.clone(), index), Lattice::Unreachable);
            }
        }
        State { values, edges }
    }

    fn operand_value(&self, operand: &Operand, config: &ComboConfig) -> Lattice {
        match operand {
            Operand::Node(id) => self.values[*id].clone(),
            Operand::Literal(lit) => Lattice::Constant(lit.clone()),
            Operand::Global(entity) => Lattice::SymConst(entity.clone()),
            Operand::Poison => transfer::poison_value(config),
        }
    }
}

/// Runs the combined SCCP/GVN propagation to a fixed point and returns the
/// resulting node and edge lattice assignments. `partitioning` supplies the
/// congruence classes discovered by a prior refinement round (spec.md
/// section 4.7): two distinct nodes in the same partition are treated as
/// interchangeable operands by `transfer::binary` and `identity::identity`,
/// the same way literal operand-identity already is. Pass
/// [`Partitioning::new_discrete`] for the first round, where nothing is
/// known yet.
///
/// # Errors
/// Returns [`ComboError::MonotonicityViolation`] if a transfer function
/// would move a node's lattice element backwards — a bug in this crate's
/// transfer functions, not a property of the input graph. Only checked in
/// debug builds; release builds accept the new value and carry on.
pub fn run(graph: &Graph, config: &ComboConfig, partitioning: &Partitioning) -> Result<State, ComboError> {
    let mut state = State::new(graph);
    let mut worklist: VecDeque<NodeId> = (0..graph.node_count()).collect();
    let mut queued = vec![true; graph.node_count()];

    let entry_block = graph.block_node.get(&graph.entry_label).copied();
    if let Some(entry) = entry_block {
        state.values[entry] = Lattice::Reachable;
        enqueue_uses(graph, entry, &mut worklist, &mut queued);
    }

    let mut rounds = 0usize;
    while let Some(id) = worklist.pop_front() {
        queued[id] = false;
        rounds += 1;
        if rounds > config.max_rounds {
            break;
        }

        let new_value = compute_node(graph, &state, id, config, partitioning);
        let old_value = &state.values[id];
        if &new_value == old_value {
            continue;
        }
        if cfg!(debug_assertions) && !old_value.allows_transition_to(&new_value) {
            return Err(ComboError::MonotonicityViolation {
                node: format!("{:?}", graph.records[id].kind),
                from: old_value.to_string(),
                to: new_value.to_string(),
            });
        }
        state.values[id] = new_value;
        enqueue_uses(graph, id, &mut worklist, &mut queued);

        if let NodeKind::Block(label) = &graph.records[id].kind {
            // A block just became reachable: its unconditional successors
            // (and its selector, if it has one) need re-evaluation too.
            if let Some(selector) = graph.selector_node.get(label) {
                push(&mut worklist, &mut queued, *selector);
            }
            if graph.selector_node.get(label).is_none() {
                propagate_unconditional_edge(graph, &mut state, label, &mut worklist, &mut queued);
            }
        }

        if matches!(graph.records[id].kind, NodeKind::Selector(_)) {
            update_edges_from_selector(graph, &mut state, id, &mut worklist, &mut queued);
        }
    }

    Ok(state)
}

fn push(worklist: &mut VecDeque<NodeId>, queued: &mut [bool], id: NodeId) {
    if !queued[id] {
        queued[id] = true;
        worklist.push_back(id);
    }
}

fn enqueue_uses(graph: &Graph, id: NodeId, worklist: &mut VecDeque<NodeId>, queued: &mut [bool]) {
    for &user in &graph.records[id].uses {
        push(worklist, queued, user);
    }
}

/// A block with no selector has exactly one outgoing edge (a `Jmp`); once
/// the block is reachable that edge, and the block it targets, become
/// reachable unconditionally.
fn propagate_unconditional_edge(
    graph: &Graph,
    state: &mut State,
    block: &Arc<str>,
    worklist: &mut VecDeque<NodeId>,
    queued: &mut [bool],
) {
    let Some(targets) = graph.edge_targets.get(block) else { return };
    for (index, target) in targets.iter().enumerate() {
        let key = (block.clone(), index);
        if state.edges.get(&key) != Some(&Lattice::Reachable) {
            state.edges.insert(key, Lattice::Reachable);
            if let Some(&target_block) = graph.block_node.get(target) {
                push(worklist, queued, target_block);
            }
        }
    }
}

/// Once a `Cond`/`Switch` selector resolves to a known value, mark only the
/// edge(s) it actually selects as reachable; while it is still `Top`, no
/// edge is marked; once it is `Bottom` (unresolved at runtime), every edge
/// out of the block is conservatively reachable.
fn update_edges_from_selector(
    graph: &Graph,
    state: &mut State,
    selector_id: NodeId,
    worklist: &mut VecDeque<NodeId>,
    queued: &mut [bool],
) {
    let record = &graph.records[selector_id];
    let block = record.block.clone();
    let block_reachable =
        graph.block_node.get(&block).is_some_and(|&block_id| state.values[block_id] == Lattice::Reachable);
    if !block_reachable {
        return;
    }
    let Some(targets) = graph.edge_targets.get(&block).cloned() else { return };
    let selector_value = state.values[selector_id].clone();

    let reachable_indices: Vec<usize> = match &record.op {
        Op::Cond => match selector_value.as_constant() {
            Some(crate::ir::value::literal::IrLiteralValue::Bool(true)) => vec![0],
            Some(crate::ir::value::literal::IrLiteralValue::Bool(false)) => vec![1],
            _ if selector_value.is_top() => vec![],
            _ => (0..targets.len()).collect(),
        },
        Op::Switch { .. } => {
            if selector_value.is_top() {
                vec![]
            } else if let Some(scrutinee) = selector_value.as_constant() {
                let cases = graph.switch_cases.get(&block).map(Vec::as_slice).unwrap_or(&[]);
                match cases.iter().position(|case| case == scrutinee) {
                    Some(index) => vec![index],
                    None => vec![targets.len() - 1],
                }
            } else {
                (0..targets.len()).collect()
            }
        }
        _ => (0..targets.len()).collect(),
    };

    for index in reachable_indices {
        let key = (block.clone(), index);
        if state.edges.get(&key) != Some(&Lattice::Reachable) {
            state.edges.insert(key, Lattice::Reachable);
            if let Some(&target_block) = graph.block_node.get(&targets[index]) {
                push(worklist, queued, target_block);
            }
        }
    }
}

fn compute_node(graph: &Graph, state: &State, id: NodeId, config: &ComboConfig, partitioning: &Partitioning) -> Lattice {
    let record = &graph.records[id];

    match &record.kind {
        NodeKind::Block(label) => {
            if graph.is_entry(label) {
                return Lattice::Reachable;
            }
            let reachable = graph
                .incoming
                .get(label)
                .into_iter()
                .flatten()
                .any(|(pred, index)| state.edges.get(&(pred.clone(), *index)) == Some(&Lattice::Reachable));
            if reachable { Lattice::Reachable } else { Lattice::Unreachable }
        }
        NodeKind::Selector(_) => {
            let operand = &record.inputs[0];
            state.operand_value(operand, config)
        }
        NodeKind::Def(_) => compute_def(graph, state, id, config, partitioning),
    }
}

fn compute_def(graph: &Graph, state: &State, id: NodeId, config: &ComboConfig, partitioning: &Partitioning) -> Lattice {
    let record = &graph.records[id];

    if record.op == Op::Phi {
        return compute_phi(graph, state, id, config);
    }

    let same_partition = |a: &Operand, b: &Operand| match (a, b) {
        (Operand::Node(x), Operand::Node(y)) => x == y || partitioning.congruent(*x, *y),
        _ => false,
    };
    if let Some(target) = identity::identity(record, same_partition) {
        return state.operand_value(&target, config);
    }

    let input_values: Vec<Lattice> = record.inputs.iter().map(|op| state.operand_value(op, config)).collect();

    match &record.op {
        Op::Binary(op) => {
            let same = same_partition(&record.inputs[0], &record.inputs[1]);
            transfer::binary(op, &record.ty, &input_values[0], &input_values[1], same)
        }
        Op::Unary(op) => transfer::unary(op.clone(), &input_values[0]),
        Op::Confirm(relation) => transfer::confirm(&input_values[0], &input_values[1], *relation),
        Op::Mux => transfer::mux(&input_values[0], &input_values[1], &input_values[2]),
        Op::Store | Op::Alloca => transfer::poison_value(config),
        Op::Call => Lattice::Bottom,
        Op::Load | Op::GetElementPtr | Op::Cast(_) => transfer::default_transfer(&input_values),
        _ => transfer::default_transfer(&input_values),
    }
}

/// `Phi` meets only the inputs whose incoming edge is currently reachable
/// (spec.md section 4.1); an input behind an unreached edge cannot yet
/// contribute evidence, matching the optimistic SCCP treatment of Phis in
/// unreached blocks.
fn compute_phi(graph: &Graph, state: &State, id: NodeId, config: &ComboConfig) -> Lattice {
    let record = &graph.records[id];
    let block_reachable = graph
        .block_node
        .get(&record.block)
        .is_some_and(|&block_id| state.values[block_id] == Lattice::Reachable);
    if !block_reachable {
        return Lattice::Top;
    }

    let mut result = Lattice::Top;
    let mut any_reachable = false;
    for (input, pred) in record.inputs.iter().zip(record.phi_preds.iter()) {
        let edge_index = graph.edge_targets.get(pred).and_then(|targets| targets.iter().position(|t| t == &record.block));
        let Some(index) = edge_index else { continue };
        if state.edges.get(&(pred.clone(), index)) == Some(&Lattice::Reachable) {
            any_reachable = true;
            result = result.meet(&state.operand_value(input, config));
        }
    }
    if any_reachable { result } else { Lattice::Top }
}
