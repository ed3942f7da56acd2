//! Target backends and rule sets.
//!
//! A [`Target`] is the seam between the target-independent pipeline and a
//! machine-specific emitter. The compiler drives it through a handful of
//! hooks: `compiler_init` prunes the register sets for the actual ISA,
//! `get_rule` resolves the emit callback for an opcode, and `compile`
//! consumes the fully annotated context to produce code bytes and assembly
//! text. Rule lookup is keyed on opcode identity under the current target
//! flags, never on the opcode name.
//!
//! Targets form a process-wide registry that is written once at startup and
//! read-only afterwards; concurrent compilations of distinct programs are
//! safe once registration is complete.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::compiler::regalloc::VEC_REG_BASE;
use crate::compiler::Compiler;
use crate::error::ProgramError;
use crate::opcode::{self, OpcodeId};
use crate::program::Reg;

/// Emit callback for one opcode: receives the compiler context and the
/// index of the instruction being emitted.
pub type EmitFn = Box<dyn Fn(&mut Compiler<'_>, usize) + Send + Sync>;

/// Target-specific code emitter for one opcode.
pub struct Rule {
    pub emit: EmitFn,
}

impl Rule {
    pub fn new<F>(emit: F) -> Arc<Self>
    where
        F: Fn(&mut Compiler<'_>, usize) + Send + Sync + 'static,
    {
        Arc::new(Self { emit: Box::new(emit) })
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Rule")
    }
}

/// Rules for a set of opcodes, keyed by opcode identity.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: HashMap<OpcodeId, Arc<Rule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an emit callback for the named opcode.
    pub fn register<F>(&mut self, opcode_name: &str, emit: F) -> Result<(), ProgramError>
    where
        F: Fn(&mut Compiler<'_>, usize) + Send + Sync + 'static,
    {
        let opcode = opcode::find_by_name(opcode_name)
            .ok_or_else(|| ProgramError::UnknownOpcode(opcode_name.to_owned()))?;
        self.rules.insert(opcode, Rule::new(emit));
        Ok(())
    }

    pub fn get(&self, opcode: OpcodeId) -> Option<Arc<Rule>> {
        self.rules.get(&opcode).cloned()
    }
}

/// Hooks implemented by a target backend.
pub trait Target: Send + Sync {
    fn name(&self) -> &str;

    /// Default target flags for this target on the current CPU.
    fn default_flags(&self) -> u32 {
        0
    }

    /// Base register number of the target's vector register file.
    fn data_register_offset(&self) -> Reg {
        VEC_REG_BASE
    }

    /// Prune the context's valid/save register sets to the actual ISA, pick
    /// the scratch register, and declare mask-register / loop-counter
    /// needs.
    fn compiler_init(&self, compiler: &mut Compiler<'_>);

    /// Emit code for the fully annotated context.
    fn compile(&self, compiler: &mut Compiler<'_>);

    /// Emit a load of a splatted constant into the given register.
    fn load_constant(&self, compiler: &mut Compiler<'_>, reg: Reg, size: usize, value: u32);

    /// Resolve the rule for an opcode under the given target flags.
    fn get_rule(&self, opcode: OpcodeId, target_flags: u32) -> Option<Arc<Rule>>;
}

static TARGETS: OnceLock<Vec<Box<dyn Target>>> = OnceLock::new();

/// Install the process-wide target registry. May be called once; later
/// calls are ignored with a warning. The first target becomes the default.
pub fn register_targets(targets: Vec<Box<dyn Target>>) {
    if TARGETS.set(targets).is_err() {
        log::warn!("target registry already initialized, ignoring");
    }
}

/// Look up a registered target by name.
pub fn target_by_name(name: &str) -> Option<&'static dyn Target> {
    TARGETS
        .get()?
        .iter()
        .find(|t| t.name() == name)
        .map(|t| t.as_ref())
}

/// The default target, if any were registered.
pub fn default_target() -> Option<&'static dyn Target> {
    TARGETS.get()?.first().map(|t| t.as_ref())
}
