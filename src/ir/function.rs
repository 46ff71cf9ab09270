// src/ir/function.rs
use super::{basic_block::BasicBlock, cfg::ControlFlowGraph, types::IrType};
use std::fmt;
use std::sync::Arc;

/// A function in the IR: a name, a signature, and a control flow graph of
/// basic blocks. One `combo` run (spec.md section 6's `combo(graph)`)
/// optimizes exactly one `Function`.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Arc<str>,
    pub parameters: Vec<(Arc<str>, IrType)>,
    pub return_type: IrType,
    pub cfg: ControlFlowGraph,
}

impl Function {
    pub fn new(name: impl Into<Arc<str>>, parameters: Vec<(Arc<str>, IrType)>, return_type: IrType) -> Self {
        let mut cfg = ControlFlowGraph::new(Arc::from("entry"));
        cfg.add_block(BasicBlock::new("entry"));
        Self { name: name.into(), parameters, return_type, cfg }
    }

    pub fn add_block(&mut self, block: BasicBlock) {
        self.cfg.add_block(block);
    }

    pub fn add_edge(&mut self, from: &str, to: &str) -> bool {
        self.cfg.connect_blocks(from, to)
    }

    pub fn get_block(&self, label: &str) -> Option<&BasicBlock> {
        self.cfg.get_block(label)
    }

    pub fn get_block_mut(&mut self, label: &str) -> Option<&mut BasicBlock> {
        self.cfg.get_block_mut(label)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params_str =
            self.parameters.iter().map(|(name, ty)| format!("{name}: {ty}")).collect::<Vec<_>>().join(", ");

        writeln!(f, "function {} ({}) -> {}:", self.name, params_str, self.return_type)?;

        for idx in self.cfg.dfs_post_order() {
            let block = &self.cfg.graph()[idx];
            write!(f, "{block}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_function_has_an_entry_block() {
        let func = Function::new("f", vec![], IrType::Void);
        assert!(func.get_block("entry").is_some());
    }
}
