// src/ir/basic_block.rs
use super::{instruction::*, terminator::*};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: Arc<str>,
    pub instructions: Vec<Instruction>,
    pub(crate) terminator: Terminator,
}

impl BasicBlock {
    pub fn new(label: &str) -> Self {
        Self { label: label.into(), instructions: Vec::new(), terminator: Terminator::new(TerminatorKind::Unreachable) }
    }

    #[inline]
    pub fn terminator(&self) -> &Terminator {
        &self.terminator
    }

    #[inline]
    pub fn terminator_mut(&mut self) -> &mut Terminator {
        &mut self.terminator
    }

    #[inline]
    pub fn set_terminator(&mut self, t: Terminator) {
        self.terminator = t;
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    /// The Phi instructions at the head of the block, in order.
    pub fn phis(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter().take_while(|i| matches!(i.kind, InstructionKind::Phi { .. }))
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for inst in &self.instructions {
            writeln!(f, "  {inst}")?;
        }
        writeln!(f, "  {}", self.terminator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_block_is_unreachable_terminated() {
        let block = BasicBlock::new("entry");
        assert!(!block.terminator().is_terminator());
    }
}
