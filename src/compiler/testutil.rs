//! Shared helpers for compiler unit tests.

use std::sync::Arc;

use crate::compiler::Compiler;
use crate::opcode::OpcodeId;
use crate::program::{Program, Reg};
use crate::target::{Rule, Target};

/// A target with no-op hooks and a rule for every opcode. The default
/// register layout from `Compiler::new` (everything valid, nothing
/// callee-saved) is left untouched; tests prune it themselves when they
/// need a specific pool shape.
#[derive(Default)]
pub(crate) struct NullTarget;

impl Target for NullTarget {
    fn name(&self) -> &str {
        "null"
    }

    fn compiler_init(&self, _compiler: &mut Compiler<'_>) {}

    fn compile(&self, _compiler: &mut Compiler<'_>) {}

    fn load_constant(&self, _compiler: &mut Compiler<'_>, _reg: Reg, _size: usize, _value: u32) {}

    fn get_rule(&self, _opcode: OpcodeId, _target_flags: u32) -> Option<Arc<Rule>> {
        Some(Rule::new(|_compiler, _insn| {}))
    }
}

/// A fresh context for the program, without running any passes.
pub(crate) fn compiler_for<'a>(program: &Program, target: &'a NullTarget) -> Compiler<'a> {
    Compiler::new(program, target, 0)
}
