// src/ir/optimizer/combo/combo.rs
//! Orchestration: builds the node table, then alternates the propagation
//! engine and partition refinement to a joint fixed point (spec.md sections
//! 1 and 4.7 — a split can unlock folding, which can unlock further
//! splits) before rewriting the function in place (spec.md section 6's
//! top-level `combo(graph)` entry point).

use super::apply::{self, ApplyStats};
use super::graph::Graph;
use super::partition::Partitioning;
use super::propagate;
use super::refine::{self, RefinementStats};
use crate::error::ComboError;
use crate::ir::function::Function;
use crate::ir::validator;

/// Tunables for one `combo` run. Fields default to the conservative choice
/// spec.md section 4.1 documents for each.
#[derive(Debug, Clone, PartialEq)]
pub struct ComboConfig {
    /// Log non-fatal diagnostics (an upstream invariant the pass itself
    /// didn't cause, e.g. a constant switch selector with more than one
    /// reachable successor) to stderr.
    pub verbose: bool,
    /// Worklist items processed before `run` gives up and returns whatever
    /// state it has reached; guards against a non-terminating transfer
    /// function rather than any expected workload.
    pub max_rounds: usize,
    /// What a dangling/uninitialized operand (`Operand::Poison`) or an
    /// `Alloca`/`Store` node defaults to absent a folding oracle: `Bottom`
    /// (assume a definite but unmodeled runtime value, the default) or
    /// `Top` (assume nothing yet, deferring to later rounds). `Call`
    /// ignores this flag and is always `Bottom` — its side effects and
    /// return value are never derivable from its arguments' lattice state.
    pub unknown_is_top: bool,
    /// Whether congruence can be found between nodes in different blocks
    /// (`true`, the default — a block is don't-care during refinement) or
    /// only within the same block (`false`, local CSE only).
    pub global_cse: bool,
}

impl Default for ComboConfig {
    fn default() -> Self {
        ComboConfig { verbose: false, max_rounds: 1_000_000, unknown_is_top: false, global_cse: true }
    }
}

/// What one `combo` run did, for logging and tests. Counts here are a sum
/// of `RefinementStats` and `ApplyStats`; `combo.rs` itself performs no
/// rewriting of its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComboStats {
    pub splits_via_race: usize,
    pub splits_via_fast_path: usize,
    pub max_partitions: usize,
    pub blocks_removed: usize,
    pub blocks_fused: usize,
    pub instructions_removed: usize,
    pub phis_shrunk: usize,
    pub branches_simplified: usize,
}

impl ComboStats {
    fn new(refinement: RefinementStats, applied: ApplyStats) -> Self {
        ComboStats {
            splits_via_race: refinement.splits_via_race,
            splits_via_fast_path: refinement.splits_via_fast_path,
            max_partitions: refinement.max_partitions,
            blocks_removed: applied.blocks_removed,
            blocks_fused: applied.blocks_fused,
            instructions_removed: applied.instructions_removed,
            phis_shrunk: applied.phis_shrunk,
            branches_simplified: applied.branches_simplified,
        }
    }
}

/// Runs the combined conditional-constant-propagation/value-numbering pass
/// over `function` in place.
///
/// # Errors
/// Returns [`ComboError::MalformedGraph`] if `function` fails the
/// precondition checks `crate::ir::validator::validate` enforces, or
/// [`ComboError::MonotonicityViolation`] if a transfer function produced an
/// illegal lattice transition — a bug in this crate, not in `function`.
pub fn combo(function: &mut Function, config: &ComboConfig) -> Result<ComboStats, ComboError> {
    validator::validate(function)?;

    let graph = Graph::build(function);

    // Propagation and partition refinement aren't two independent passes,
    // they're one joint fixed point: a split refinement discovers can prove
    // two operands congruent, which can fold a binary op to a constant
    // (e.g. `x - y` once `x` and `y` are known congruent), which can change
    // reachability and trigger further splits, and so on. Round one seeds
    // "no congruence assumed" (every node its own partition) and each
    // subsequent round feeds the previous round's partitions back into
    // propagation; convergence is detected by comparing partition-grouping
    // signatures rather than raw `PartitionId`s, since `refine::refine`
    // renumbers partitions from scratch every call.
    let mut partitioning = Partitioning::new_discrete(graph.node_count());
    let mut state = propagate::run(&graph, config, &partitioning)?;
    let mut refinement_stats;
    (partitioning, refinement_stats) = refine::refine(&graph, &state, config);

    let mut signature = partitioning.canonical_signature();
    for _ in 0..=graph.node_count() {
        state = propagate::run(&graph, config, &partitioning)?;
        let (next_partitioning, next_stats) = refine::refine(&graph, &state, config);
        let next_signature = next_partitioning.canonical_signature();
        partitioning = next_partitioning;
        refinement_stats = next_stats;
        if next_signature == signature {
            break;
        }
        signature = next_signature;
    }

    let applied = apply::apply(function, &graph, &state, &partitioning, config);

    Ok(ComboStats::new(refinement_stats, applied))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instruction::{Instruction, InstructionKind, IrBinaryOp};
    use crate::ir::test_support::FunctionBuilder;
    use crate::ir::types::IrType;
    use crate::ir::value::literal::IrLiteralValue;
    use crate::ir::value::{Value, ValueId};

    #[test]
    fn combo_folds_a_constant_addition_into_the_return_value() {
        let r = Value::new_temporary(ValueId::new(), IrType::I32);
        let add = Instruction::new(InstructionKind::Binary {
            op: IrBinaryOp::Add,
            left: Value::new_literal(IrLiteralValue::I32(2)),
            right: Value::new_literal(IrLiteralValue::I32(3)),
            ty: IrType::I32,
        })
        .with_result(r.clone());

        let mut func = FunctionBuilder::new("f").push("entry", add).ret("entry", r, IrType::I32).build();

        let stats = combo(&mut func, &ComboConfig::default()).unwrap();
        assert_eq!(stats.instructions_removed, 1);

        let crate::ir::terminator::TerminatorKind::Return { value, .. } = &func.get_block("entry").unwrap().terminator().kind
        else {
            panic!("expected a return terminator")
        };
        assert_eq!(value.kind, crate::ir::value::ValueKind::Literal(IrLiteralValue::I32(5)));
    }

    #[test]
    fn combo_rejects_a_function_with_no_terminator_on_a_reachable_block() {
        let mut func = Function::new("f", vec![], IrType::Void);
        func.get_block_mut("entry").unwrap().instructions.clear();
        let err = combo(&mut func, &ComboConfig::default());
        assert!(err.is_err());
    }
}
