//! Programs, variables, and instructions.
//!
//! A [`Program`] is an ordered sequence of opcode invocations over typed
//! variables. Variables live in a fixed-layout slot table so that slot
//! indices are a stable ABI between the frontend and target backends:
//! destinations, sources, constants, parameters, accumulators, and
//! temporaries each own a reserved range. Duplicated temporaries created by
//! the compiler's renaming pass are appended after the last declared
//! temporary.
//!
//! The construction API mirrors how kernels are written: declare variables,
//! then append instructions by opcode name.

use std::sync::Arc;

use crate::error::ProgramError;
use crate::opcode::{self, OpcodeId, N_DEST, N_SRC};
use crate::target::Rule;

/// Physical register number. 0 means "not allocated"; real registers start
/// at the pool bases.
pub type Reg = usize;

/// Index into a program's variable table.
pub type VarIndex = usize;

/// First destination slot (d1..d4).
pub const VAR_D1: VarIndex = 0;
/// First source slot (s1..s8).
pub const VAR_S1: VarIndex = 4;
/// First constant slot (c1..c8).
pub const VAR_C1: VarIndex = 12;
/// First parameter slot (p1..p8).
pub const VAR_P1: VarIndex = 20;
/// First accumulator slot (a1..a4).
pub const VAR_A1: VarIndex = 28;
/// First temporary slot (t1..t8); duplicated temporaries follow the
/// declared ones.
pub const VAR_T1: VarIndex = 32;
/// Number of reserved variable slots.
pub const N_VARIABLES: usize = 40;

/// Advisory bound on instructions per program.
pub const N_INSNS: usize = 100;

/// Per-source auxiliary registers for pointer-based operands.
///
/// `ptr_register` is always populated for sources and destinations by the
/// global allocator; the mask bundle only when the backend asks for mask
/// registers. `load_dest` is set on a destination that is also read, so the
/// backend loads it before first use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerRegs {
    pub ptr_register: Reg,
    pub ptr_offset: Reg,
    pub mask_alloc: Reg,
    pub aligned_data: Reg,
    pub load_dest: bool,
}

/// Variable kind with per-kind payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Loop-local temporary; carries its rename link once redefined.
    Temp { replacement: Option<VarIndex> },
    /// Input array.
    Src(PointerRegs),
    /// Output array.
    Dest(PointerRegs),
    /// Broadcast literal.
    Const { value: u32 },
    /// Broadcast runtime parameter.
    Param,
    /// Persists across loop iterations, written only by accumulating
    /// opcodes.
    Accumulator,
}

impl VarKind {
    pub fn is_const_or_param(&self) -> bool {
        matches!(self, VarKind::Const { .. } | VarKind::Param)
    }
}

/// One slot in the variable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: Option<String>,
    /// Element byte size.
    pub size: usize,
    pub kind: VarKind,
    pub used: bool,
    /// First instruction index that touches the variable; -1 for variables
    /// live throughout the program.
    pub first_use: i32,
    pub last_use: i32,
    /// Allocated data register.
    pub alloc: Reg,
}

impl Default for Variable {
    fn default() -> Self {
        Self {
            name: None,
            size: 0,
            kind: VarKind::Temp { replacement: None },
            used: false,
            first_use: -1,
            last_use: -1,
            alloc: 0,
        }
    }
}

/// One opcode invocation. Unused argument slots hold 0 and are skipped via
/// the opcode's declared slot sizes.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: OpcodeId,
    pub dest_args: [VarIndex; N_DEST],
    pub src_args: [VarIndex; N_SRC],
    /// Target rule bound during compilation; always `None` on the program's
    /// own copy.
    pub rule: Option<Arc<Rule>>,
}

/// What runs when the program is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramCode {
    /// Interpret through the opcode emulation functions.
    #[default]
    Emulate,
    /// The user-supplied native fallback.
    Backup,
    /// JIT code from the last successful compile.
    Compiled,
}

/// Native fallback entry with the executor's calling convention.
pub type BackupFunc = fn();

/// A data-parallel kernel: instructions plus a variable table.
pub struct Program {
    name: String,
    pub(crate) insns: Vec<Instruction>,
    pub(crate) vars: Vec<Variable>,
    n_src_vars: usize,
    n_dest_vars: usize,
    n_const_vars: usize,
    n_param_vars: usize,
    n_accum_vars: usize,
    pub(crate) n_temp_vars: usize,
    pub(crate) backup_func: Option<BackupFunc>,
    /// What would run right now.
    pub code: ProgramCode,
    pub code_size: usize,
    pub(crate) code_bytes: Vec<u8>,
    pub(crate) asm_code: String,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    pub fn new() -> Self {
        Self {
            name: String::from("unnamed"),
            insns: Vec::new(),
            vars: vec![Variable::default(); N_VARIABLES],
            n_src_vars: 0,
            n_dest_vars: 0,
            n_const_vars: 0,
            n_param_vars: 0,
            n_accum_vars: 0,
            n_temp_vars: 0,
            backup_func: None,
            code: ProgramCode::default(),
            code_size: 0,
            code_bytes: Vec::new(),
            asm_code: String::new(),
        }
    }

    /// A program with one destination and one source, named `d1` and `s1`.
    pub fn new_ds(size1: usize, size2: usize) -> Self {
        let mut program = Self::new();
        program
            .add_destination(size1, "d1")
            .expect("fresh program has a free destination slot");
        program
            .add_source(size2, "s1")
            .expect("fresh program has a free source slot");
        program
    }

    /// A program with one destination and two sources.
    pub fn new_dss(size1: usize, size2: usize, size3: usize) -> Self {
        let mut program = Self::new_ds(size1, size2);
        program
            .add_source(size3, "s2")
            .expect("fresh program has a free source slot");
        program
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    /// Assembly text from the last successful compile.
    pub fn asm_code(&self) -> &str {
        &self.asm_code
    }

    /// Code bytes from the last successful compile.
    pub fn code_bytes(&self) -> &[u8] {
        &self.code_bytes
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.insns
    }

    pub fn variables(&self) -> &[Variable] {
        &self.vars
    }

    /// Install a pre-built native fallback, used when compilation is
    /// disabled or fails recoverably.
    pub fn set_backup_function(&mut self, func: BackupFunc) {
        self.backup_func = Some(func);
    }

    fn add_var(
        &mut self,
        base: VarIndex,
        offset: usize,
        limit: usize,
        kind_name: &'static str,
        size: usize,
        name: &str,
        kind: VarKind,
    ) -> Result<VarIndex, ProgramError> {
        if offset >= limit {
            return Err(ProgramError::TooManyVariables { kind: kind_name });
        }
        let idx = base + offset;
        self.vars[idx] = Variable {
            name: Some(name.to_owned()),
            size,
            kind,
            ..Variable::default()
        };
        Ok(idx)
    }

    pub fn add_source(&mut self, size: usize, name: &str) -> Result<VarIndex, ProgramError> {
        let idx = self.add_var(
            VAR_S1,
            self.n_src_vars,
            8,
            "source",
            size,
            name,
            VarKind::Src(PointerRegs::default()),
        )?;
        self.n_src_vars += 1;
        Ok(idx)
    }

    pub fn add_destination(&mut self, size: usize, name: &str) -> Result<VarIndex, ProgramError> {
        let idx = self.add_var(
            VAR_D1,
            self.n_dest_vars,
            4,
            "destination",
            size,
            name,
            VarKind::Dest(PointerRegs::default()),
        )?;
        self.n_dest_vars += 1;
        Ok(idx)
    }

    pub fn add_constant(
        &mut self,
        size: usize,
        value: u32,
        name: &str,
    ) -> Result<VarIndex, ProgramError> {
        let idx = self.add_var(
            VAR_C1,
            self.n_const_vars,
            8,
            "constant",
            size,
            name,
            VarKind::Const { value },
        )?;
        self.n_const_vars += 1;
        Ok(idx)
    }

    pub fn add_parameter(&mut self, size: usize, name: &str) -> Result<VarIndex, ProgramError> {
        let idx = self.add_var(VAR_P1, self.n_param_vars, 8, "parameter", size, name, VarKind::Param)?;
        self.n_param_vars += 1;
        Ok(idx)
    }

    pub fn add_accumulator(&mut self, size: usize, name: &str) -> Result<VarIndex, ProgramError> {
        let idx = self.add_var(
            VAR_A1,
            self.n_accum_vars,
            4,
            "accumulator",
            size,
            name,
            VarKind::Accumulator,
        )?;
        self.n_accum_vars += 1;
        Ok(idx)
    }

    pub fn add_temporary(&mut self, size: usize, name: &str) -> Result<VarIndex, ProgramError> {
        let idx = self.add_var(
            VAR_T1,
            self.n_temp_vars,
            8,
            "temporary",
            size,
            name,
            VarKind::Temp { replacement: None },
        )?;
        self.n_temp_vars += 1;
        Ok(idx)
    }

    pub fn find_var_by_name(&self, name: &str) -> Option<VarIndex> {
        self.vars
            .iter()
            .position(|v| v.name.as_deref() == Some(name))
    }

    /// Append an instruction with one destination and two sources.
    pub fn append(
        &mut self,
        opcode: &str,
        d0: VarIndex,
        s0: VarIndex,
        s1: VarIndex,
    ) -> Result<(), ProgramError> {
        let opcode = opcode::find_by_name(opcode)
            .ok_or_else(|| ProgramError::UnknownOpcode(opcode.to_owned()))?;
        let mut insn = Instruction {
            opcode,
            dest_args: [0; N_DEST],
            src_args: [0; N_SRC],
            rule: None,
        };
        insn.dest_args[0] = d0;
        insn.src_args[0] = s0;
        insn.src_args[1] = s1;
        self.insns.push(insn);
        Ok(())
    }

    /// Append an instruction with one destination and one source.
    pub fn append_ds(&mut self, opcode: &str, d0: VarIndex, s0: VarIndex) -> Result<(), ProgramError> {
        self.append(opcode, d0, s0, 0)
    }

    fn var_index(&self, name: &str) -> Result<VarIndex, ProgramError> {
        self.find_var_by_name(name)
            .ok_or_else(|| ProgramError::UnknownVariable(name.to_owned()))
    }

    /// Append an instruction, naming its operands.
    pub fn append_str(
        &mut self,
        opcode: &str,
        d0: &str,
        s0: &str,
        s1: &str,
    ) -> Result<(), ProgramError> {
        let d0 = self.var_index(d0)?;
        let s0 = self.var_index(s0)?;
        let s1 = self.var_index(s1)?;
        self.append(opcode, d0, s0, s1)
    }

    /// Append a one-source instruction, naming its operands.
    pub fn append_ds_str(&mut self, opcode: &str, d0: &str, s0: &str) -> Result<(), ProgramError> {
        let d0 = self.var_index(d0)?;
        let s0 = self.var_index(s0)?;
        self.append_ds(opcode, d0, s0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_layout() {
        let mut program = Program::new();
        assert_eq!(program.add_destination(2, "d1").unwrap(), VAR_D1);
        assert_eq!(program.add_source(2, "s1").unwrap(), VAR_S1);
        assert_eq!(program.add_source(2, "s2").unwrap(), VAR_S1 + 1);
        assert_eq!(program.add_constant(2, 7, "c1").unwrap(), VAR_C1);
        assert_eq!(program.add_parameter(2, "p1").unwrap(), VAR_P1);
        assert_eq!(program.add_accumulator(2, "a1").unwrap(), VAR_A1);
        assert_eq!(program.add_temporary(2, "t1").unwrap(), VAR_T1);
    }

    #[test]
    fn test_slot_exhaustion() {
        let mut program = Program::new();
        for i in 0..8 {
            program.add_source(2, &format!("s{}", i + 1)).unwrap();
        }
        assert_eq!(
            program.add_source(2, "s9"),
            Err(ProgramError::TooManyVariables { kind: "source" })
        );
    }

    #[test]
    fn test_find_var_by_name() {
        let program = Program::new_dss(2, 2, 2);
        assert_eq!(program.find_var_by_name("s2"), Some(VAR_S1 + 1));
        assert_eq!(program.find_var_by_name("nope"), None);
    }

    #[test]
    fn test_append_unknown_opcode() {
        let mut program = Program::new_ds(2, 2);
        assert_eq!(
            program.append_ds("frobw", VAR_D1, VAR_S1),
            Err(ProgramError::UnknownOpcode(String::from("frobw")))
        );
    }

    #[test]
    fn test_append() {
        let mut program = Program::new_dss(2, 2, 2);
        program.append("addw", VAR_D1, VAR_S1, VAR_S1 + 1).unwrap();
        assert_eq!(program.instructions().len(), 1);
        let insn = &program.instructions()[0];
        assert_eq!(insn.opcode.desc().name, "addw");
        assert_eq!(insn.dest_args[0], VAR_D1);
        assert_eq!(insn.src_args[0], VAR_S1);
        assert_eq!(insn.src_args[1], VAR_S1 + 1);
        assert!(insn.rule.is_none());
    }

    #[test]
    fn test_append_str() {
        let mut program = Program::new_dss(2, 2, 2);
        program.append_str("addw", "d1", "s1", "s2").unwrap();
        let insn = &program.instructions()[0];
        assert_eq!(insn.dest_args[0], VAR_D1);
        assert_eq!(insn.src_args[0], VAR_S1);
        assert_eq!(insn.src_args[1], VAR_S1 + 1);

        assert_eq!(
            program.append_ds_str("copyw", "d1", "s9"),
            Err(ProgramError::UnknownVariable(String::from("s9")))
        );
    }

    #[test]
    fn test_const_carries_value() {
        let mut program = Program::new_ds(2, 2);
        let c = program.add_constant(2, 0x1234, "c1").unwrap();
        assert_eq!(program.variables()[c].kind, VarKind::Const { value: 0x1234 });
    }
}
