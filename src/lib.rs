//! Orc - JIT compilation of small SIMD-oriented data-parallel kernels.
//!
//! A [`Program`] is an ordered sequence of opcode invocations over typed
//! variables (sources, destinations, temporaries, constants, parameters,
//! accumulators). The compiler translates a program into machine code for a
//! registered [`Target`], leaving it runnable through a backup function or
//! the emulator whenever compilation fails recoverably.
//!
//! # Primary Usage
//!
//! ```no_run
//! use orc::{Program, VAR_D1, VAR_S1};
//!
//! let mut program = Program::new_dss(2, 2, 2);
//! program.set_name("add_s16");
//! program.append("addw", VAR_D1, VAR_S1, VAR_S1 + 1).unwrap();
//!
//! // Targets are registered once at startup; the first one is the default.
//! let result = program.compile();
//! if result.is_successful() {
//!     println!("{}", program.asm_code());
//! }
//! ```
//!
//! # Architecture
//!
//! - [`program`] - programs, variables, instructions, the construction API
//! - [`opcode`] - static opcode descriptors and the built-in table
//! - [`compiler`] - the per-compilation context and the pass pipeline
//! - [`target`] - the backend trait, rule sets, and the target registry
//! - [`codemem`] - code-buffer installation
//! - [`flags`] - `ORC_CODE` environment flags
//!
//! The pipeline is linear: validate operand sizes, bind target rules,
//! compute liveness and rename reused temporaries, pin registers for
//! program-lifetime variables, assign per-instruction registers with
//! source-to-destination chaining, then hand the annotated context to the
//! target's emitter.

pub mod codemem;
pub mod compiler;
pub mod error;
pub mod flags;
pub mod opcode;
pub mod program;
pub mod target;

pub use compiler::constants::Constant;
pub use compiler::regalloc::{GP_REG_BASE, N_REGS, VEC_REG_BASE};
pub use compiler::{compile_full, Compiler, Fixup, N_FIXUPS, N_LABELS};
pub use error::{CompileResult, ProgramError};
pub use flags::{compiler_flags, CompilerFlags};
pub use opcode::{OpcodeExecutor, OpcodeId, StaticOpcode, N_DEST, N_SRC};
pub use program::{
    BackupFunc, Instruction, PointerRegs, Program, ProgramCode, Reg, VarIndex, VarKind, Variable,
    N_INSNS, N_VARIABLES, VAR_A1, VAR_C1, VAR_D1, VAR_P1, VAR_S1, VAR_T1,
};
pub use target::{default_target, register_targets, target_by_name, Rule, RuleSet, Target};

/// Append formatted assembly text to a compiler's buffer.
///
/// This is the usual way rule implementations and targets produce assembly
/// output:
///
/// ```ignore
/// orc_asm!(compiler, "  addw {}, {}\n", dest_reg, src_reg);
/// ```
#[macro_export]
macro_rules! orc_asm {
    ($compiler:expr, $($arg:tt)*) => {
        $compiler.append_code(::core::format_args!($($arg)*))
    };
}
