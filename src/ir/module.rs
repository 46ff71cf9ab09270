// src/ir/module.rs
use super::Function;
use std::fmt;
use std::sync::Arc;

/// A compilation unit: a named collection of functions. `combo` is run
/// function-by-function over a module's functions (see `Phase` in
/// `ir::optimizer::phase`).
#[derive(Debug, Clone)]
pub struct Module {
    pub name: Arc<str>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into(), functions: Vec::new() }
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name.as_ref() == name)
    }

    pub fn get_function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name.as_ref() == name)
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {} {{", self.name)?;
        if self.functions.is_empty() {
            writeln!(f, "  // no functions")?;
        } else {
            for function in &self.functions {
                let s = function.to_string();
                for line in s.trim_end_matches('\n').lines() {
                    writeln!(f, "  {line}")?;
                }
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::IrType;

    #[test]
    fn finds_function_by_name() {
        let mut module = Module::new("m");
        module.add_function(Function::new("f", vec![], IrType::Void));
        assert!(module.get_function("f").is_some());
        assert!(module.get_function("g").is_none());
    }
}
