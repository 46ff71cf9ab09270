// src/ir/test_support.rs
//! A minimal fluent builder for constructing `Function`s directly, without
//! a front end. Exists purely to keep `combo`'s own tests and the
//! integration test suite readable; not part of the pass's public API.

use super::basic_block::BasicBlock;
use super::function::Function;
use super::instruction::{Instruction, InstructionKind};
use super::terminator::{Terminator, TerminatorKind};
use super::types::IrType;
use super::value::Value;
use std::sync::Arc;

pub struct FunctionBuilder {
    function: Function,
}

impl FunctionBuilder {
    pub fn new(name: &str) -> Self {
        Self { function: Function::new(name, vec![], IrType::Void) }
    }

    pub fn with_return_type(mut self, ty: IrType) -> Self {
        self.function.return_type = ty;
        self
    }

    /// Adds an empty block labelled `label`, initially terminated `Unreachable`.
    pub fn block(mut self, label: &str) -> Self {
        self.function.add_block(BasicBlock::new(label));
        self
    }

    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.function.add_edge(from, to);
        self
    }

    pub fn push(mut self, block: &str, inst: Instruction) -> Self {
        self.function.cfg.add_instruction_to_block(block, inst);
        self
    }

    pub fn terminate(mut self, block: &str, kind: TerminatorKind) -> Self {
        self.function.cfg.set_block_terminator(block, Terminator::new(kind));
        self
    }

    pub fn branch(self, block: &str, target: &str) -> Self {
        let target: Arc<str> = Arc::from(target);
        self.terminate(block, TerminatorKind::Branch { label: target })
    }

    pub fn cond_branch(self, block: &str, condition: Value, true_label: &str, false_label: &str) -> Self {
        let true_label: Arc<str> = Arc::from(true_label);
        let false_label: Arc<str> = Arc::from(false_label);
        self.terminate(block, TerminatorKind::ConditionalBranch { condition, true_label, false_label })
    }

    pub fn ret(self, block: &str, value: Value, ty: IrType) -> Self {
        self.terminate(block, TerminatorKind::Return { value, ty })
    }

    pub fn build(self) -> Function {
        self.function
    }
}

/// Convenience constructor for a `Phi` instruction with a `Value` result already attached.
pub fn phi(result: Value, ty: IrType, incoming: Vec<(Value, &str)>) -> Instruction {
    let incoming = incoming.into_iter().map(|(v, label)| (v, label.to_string())).collect();
    Instruction::new(InstructionKind::Phi { ty, incoming }).with_result(result)
}
