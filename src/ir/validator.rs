// src/ir/validator.rs
//! Precondition validation for the combo pass.
//!
//! `combo` is total on well-formed SSA IR (spec.md section 7); a graph
//! that does not satisfy these preconditions is refused up front rather
//! than silently mis-analyzed. This mirrors the host CFG's own
//! `ControlFlowGraph::verify`, extended with the SSA-specific checks the
//! pass relies on: every `Phi` has exactly one incoming value per control
//! flow predecessor, and no two instructions define the same `ValueId`.

use crate::error::ComboError;
use crate::ir::function::Function;
use crate::ir::instruction::InstructionKind;
use std::collections::HashSet;

/// Validates that `function` is in the form `combo` requires.
///
/// # Errors
/// Returns [`ComboError::MalformedGraph`] describing the first violation found.
pub fn validate(function: &Function) -> Result<(), ComboError> {
    function.cfg.verify()?;
    check_unique_definitions(function)?;
    check_phi_arity(function)?;
    Ok(())
}

fn check_unique_definitions(function: &Function) -> Result<(), ComboError> {
    let mut seen = HashSet::new();
    for block in function.cfg.blocks() {
        for inst in &block.instructions {
            if let Some(result) = &inst.result
                && !seen.insert(result.id)
            {
                return Err(ComboError::MalformedGraph(format!(
                    "value {} is defined more than once (in block '{}')",
                    result.id, block.label
                )));
            }
        }
    }
    Ok(())
}

fn check_phi_arity(function: &Function) -> Result<(), ComboError> {
    for block in function.cfg.blocks() {
        let pred_count = function
            .cfg
            .find_block_by_label(&block.label)
            .map(|idx| {
                function.cfg.graph().neighbors_directed(idx, petgraph::Direction::Incoming).count()
            })
            .unwrap_or(0);

        for inst in block.phis() {
            let InstructionKind::Phi { incoming, .. } = &inst.kind else { unreachable!() };
            if incoming.len() != pred_count {
                return Err(ComboError::MalformedGraph(format!(
                    "phi in block '{}' has {} incoming value(s) but the block has {} predecessor(s)",
                    block.label,
                    incoming.len(),
                    pred_count
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::basic_block::BasicBlock;
    use crate::ir::instruction::Instruction;
    use crate::ir::terminator::{Terminator, TerminatorKind};
    use crate::ir::types::IrType;
    use crate::ir::value::{Value, literal::IrLiteralValue};
    use std::sync::Arc;

    fn ret_void_function() -> Function {
        let mut f = Function::new("f", vec![], IrType::Void);
        f.get_block_mut("entry").unwrap().set_terminator(Terminator::new(TerminatorKind::Return {
            value: Value::new_literal(IrLiteralValue::Bool(false)),
            ty: IrType::Bool,
        }));
        f
    }

    #[test]
    fn accepts_minimal_function() {
        assert!(validate(&ret_void_function()).is_ok());
    }

    #[test]
    fn rejects_phi_with_wrong_arity() {
        let mut f = ret_void_function();
        let mut phi_block = BasicBlock::new("join");
        phi_block.push(
            Instruction::new(InstructionKind::Phi {
                ty: IrType::I32,
                incoming: vec![(Value::new_literal(IrLiteralValue::I32(1)), "entry".to_string())],
            })
            .with_result(Value::new_literal(IrLiteralValue::I32(0))),
        );
        phi_block.set_terminator(Terminator::new(TerminatorKind::Return {
            value: Value::new_literal(IrLiteralValue::I32(0)),
            ty: IrType::I32,
        }));
        f.add_block(phi_block);
        f.get_block_mut("entry").unwrap().set_terminator(Terminator::new(TerminatorKind::Branch { label: Arc::from("join") }));
        f.add_edge("entry", "join");
        assert!(matches!(validate(&f), Err(ComboError::MalformedGraph(_))));
    }
}
