//! The compiler context and driver.
//!
//! [`Compiler`] is the scratch state for one compilation: working copies of
//! the program's instructions and variables, register-pool state, the
//! emitted assembly text and code bytes, and the latched error flag plus
//! result code. A context is created fresh per compilation and dropped on
//! both the success and failure paths; rewrites never touch the source
//! program.
//!
//! The driver sequences the passes:
//!
//! ```text
//! compiler_init (target) -> check_sizes -> assign_rules -> rewrite_vars
//!     -> global_reg_alloc -> rewrite_vars2 -> allocate_codemem
//!     -> compile (target)
//! ```
//!
//! On error the recorded result is returned (promoting an unset result to
//! `UnknownCompile`), leaving the program runnable through its backup
//! function or the emulator.

// Latch the error flag and route the diagnostic through the log. The
// result code carries the outcome; diagnostics are advisory.
macro_rules! compiler_error {
    ($compiler:expr, $($arg:tt)*) => {{
        $compiler.error = true;
        log::error!($($arg)*);
    }};
}

pub mod check;
pub mod constants;
pub mod regalloc;
pub mod rewrite;

#[cfg(test)]
pub(crate) mod testutil;

use crate::codemem;
use crate::error::CompileResult;
use crate::flags;
use crate::program::{Instruction, Program, ProgramCode, Reg, Variable};
use crate::target::Target;

use self::constants::Constant;
use self::regalloc::N_REGS;

/// Bound on per-compilation labels; exceeding it is the backend's to
/// detect.
pub const N_LABELS: usize = 20;
/// Advisory bound on fixups.
pub const N_FIXUPS: usize = 20;

/// A pending patch of emitted code against a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixup {
    /// Byte offset into the code buffer.
    pub offset: usize,
    /// Backend-defined fixup type.
    pub kind: u32,
    pub label: usize,
}

/// Scratch state for one compilation.
pub struct Compiler<'a> {
    pub target: &'a dyn Target,
    pub target_flags: u32,

    /// Working copy of the program's instructions, annotated with rules and
    /// rewritten variable references.
    pub insns: Vec<Instruction>,
    /// Working copy of the variable table; duplicated temporaries are
    /// appended past the reserved slots.
    pub vars: Vec<Variable>,
    pub n_temp_vars: usize,
    pub n_dup_vars: usize,

    pub error: bool,
    pub result: CompileResult,

    /// Registers this target may use at all.
    pub valid_regs: [bool; N_REGS],
    /// Callee-saved registers, used only when no scratch register remains.
    pub save_regs: [bool; N_REGS],
    /// Registers the allocator has ever handed out; the backend
    /// saves/restores these.
    pub used_regs: [bool; N_REGS],
    /// Live-range refcount per register.
    pub alloc_regs: [i32; N_REGS],

    /// Code bytes, installed by the code-memory collaborator and written by
    /// the backend.
    pub code: Vec<u8>,
    /// Generated assembly text.
    pub asm_code: String,

    pub fixups: Vec<Fixup>,
    /// Code offsets of emitted labels.
    pub labels: [Option<usize>; N_LABELS],
    n_labels: usize,

    /// Backend knobs, set by `compiler_init`.
    pub tmpreg: Reg,
    pub need_mask_regs: bool,
    pub alloc_loop_counter: bool,
    pub loop_counter: Reg,
    pub loop_shift: u32,
    pub long_jumps: bool,

    pub constants: Vec<Constant>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(program: &Program, target: &'a dyn Target, target_flags: u32) -> Self {
        Self {
            target,
            target_flags,
            insns: program.insns.clone(),
            vars: program.vars.clone(),
            n_temp_vars: program.n_temp_vars,
            n_dup_vars: 0,
            error: false,
            result: CompileResult::Ok,
            valid_regs: [true; N_REGS],
            save_regs: [false; N_REGS],
            used_regs: [false; N_REGS],
            alloc_regs: [0; N_REGS],
            code: Vec::new(),
            asm_code: String::new(),
            fixups: Vec::new(),
            labels: [None; N_LABELS],
            n_labels: 0,
            tmpreg: 0,
            need_mask_regs: false,
            alloc_loop_counter: false,
            loop_counter: 0,
            loop_shift: 0,
            long_jumps: false,
            constants: Vec::new(),
        }
    }

    /// Append formatted assembly text to the context's buffer. Usually
    /// invoked through [`orc_asm!`](crate::orc_asm).
    pub fn append_code(&mut self, args: std::fmt::Arguments<'_>) {
        use std::fmt::Write as _;
        let _ = self.asm_code.write_fmt(args);
    }

    /// Append raw code bytes.
    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    /// Allocate a fresh label number.
    pub fn label_new(&mut self) -> usize {
        let label = self.n_labels;
        self.n_labels += 1;
        label
    }

    /// Print the generated assembly to stdout.
    pub fn dump_asm(&self) {
        print!("{}", self.asm_code);
    }

    fn dump_program(&self) {
        log::debug!("variables");
        for (i, var) in self.vars.iter().enumerate() {
            if var.size > 0 {
                log::debug!(
                    "{}: {} {} {:?}",
                    i,
                    var.name.as_deref().unwrap_or("(unnamed)"),
                    var.size,
                    var.kind
                );
            }
        }
        log::debug!("instructions");
        for (i, insn) in self.insns.iter().enumerate() {
            log::debug!(
                "{}: {} {} {} {} {}",
                i,
                insn.opcode.desc().name,
                insn.dest_args[0],
                insn.dest_args[1],
                insn.src_args[0],
                insn.src_args[1]
            );
        }
    }

    fn fail(&self, program: &Program) -> CompileResult {
        log::warn!(
            "program {} failed to compile, reason {:?}",
            program.name(),
            self.result
        );
        let mut result = self.result;
        if result == CompileResult::Ok {
            result = CompileResult::UnknownCompile;
        }
        log::info!("finished compiling (fail)");
        result
    }
}

/// Compile a program for the given target with explicit target flags.
pub fn compile_full(
    program: &mut Program,
    target: Option<&dyn Target>,
    target_flags: u32,
) -> CompileResult {
    log::info!("initializing compiler for program \"{}\"", program.name());

    // Even a failed compile leaves the program callable.
    program.code = if program.backup_func.is_some() {
        ProgramCode::Backup
    } else {
        ProgramCode::Emulate
    };

    if program.backup_func.is_some() && flags::compiler_flags().backup {
        log::error!("compilation disabled");
        return CompileResult::UnknownCompile;
    }

    let Some(target) = target else {
        log::error!("no target given");
        return CompileResult::UnknownCompile;
    };

    let mut compiler = Compiler::new(program, target, target_flags);
    compiler.dump_program();

    target.compiler_init(&mut compiler);

    compiler.check_sizes();
    if compiler.error {
        return compiler.fail(program);
    }

    compiler.assign_rules();
    if compiler.error {
        return compiler.fail(program);
    }

    compiler.rewrite_vars();
    if compiler.error {
        return compiler.fail(program);
    }

    compiler.global_reg_alloc();

    compiler.rewrite_vars2();
    if compiler.error {
        return compiler.fail(program);
    }

    log::info!("allocating code memory");
    codemem::allocate_codemem(&mut compiler);
    if compiler.error {
        return compiler.fail(program);
    }

    log::info!("compiling for target {}", target.name());
    target.compile(&mut compiler);
    if compiler.error {
        return compiler.fail(program);
    }

    program.asm_code = std::mem::take(&mut compiler.asm_code);
    program.code_bytes = std::mem::take(&mut compiler.code);
    program.code_size = program.code_bytes.len();
    program.code = ProgramCode::Compiled;

    if flags::compiler_flags().debug {
        log::info!("asm for {}:\n{}", program.name(), program.asm_code());
    }

    log::info!("finished compiling (success)");
    compiler.result
}

impl Program {
    /// Compile for the default registered target with its default flags.
    pub fn compile(&mut self) -> CompileResult {
        self.compile_for_target(crate::target::default_target())
    }

    /// Compile for the given target with its default flags.
    pub fn compile_for_target(&mut self, target: Option<&dyn Target>) -> CompileResult {
        let target_flags = target.map_or(0, |t| t.default_flags());
        self.compile_full(target, target_flags)
    }

    /// Compile for the given target with explicit flags.
    pub fn compile_full(
        &mut self,
        target: Option<&dyn Target>,
        target_flags: u32,
    ) -> CompileResult {
        compile_full(self, target, target_flags)
    }
}
