//! Rule binding and the liveness/renaming pass.
//!
//! `assign_rules` attaches the target's emit callback to every instruction.
//! `rewrite_vars` walks the program once, computing first/last use per
//! variable and renaming any temporary that is written more than once, so
//! that afterwards each temporary slot has exactly one definition point.
//! Rename links are single-level and flattened eagerly on every rewrite:
//! reads never chase more than one hop.
//!
//! Unlike the validator, this pass latches errors and keeps going so a
//! malformed program yields as many diagnostics as possible; the driver
//! checks the error flag before moving on.

use crate::error::CompileResult;
use crate::opcode::{N_DEST, N_SRC};
use crate::program::{VarIndex, VarKind, Variable, VAR_T1};

use super::Compiler;

impl Compiler<'_> {
    /// Resolve and store the target rule for every instruction.
    ///
    /// Lookup is by opcode identity under the current target flags. A
    /// missing rule is recoverable: the interpreter can still run the
    /// program.
    pub(crate) fn assign_rules(&mut self) {
        let target = self.target;
        for i in 0..self.insns.len() {
            let opcode = self.insns[i].opcode;
            match target.get_rule(opcode, self.target_flags) {
                Some(rule) => self.insns[i].rule = Some(rule),
                None => {
                    compiler_error!(
                        self,
                        "no rule for: {} on target {}",
                        opcode.desc().name,
                        target.name()
                    );
                    self.result = CompileResult::MissingRule;
                    return;
                }
            }
        }
    }

    /// Liveness analysis and temporary renaming.
    pub(crate) fn rewrite_vars(&mut self) {
        for j in 0..self.insns.len() {
            let opcode = self.insns[j].opcode.desc();

            for k in 0..N_SRC {
                if opcode.src_size[k] == 0 {
                    continue;
                }
                let var = self.insns[j].src_args[k];

                if let VarKind::Dest(ref mut ptrs) = self.vars[var].kind {
                    ptrs.load_dest = true;
                }

                let mut actual = var;
                if let VarKind::Temp { replacement: Some(repl) } = self.vars[var].kind {
                    actual = repl;
                    self.insns[j].src_args[k] = actual;
                }

                if !self.vars[var].used {
                    if matches!(self.vars[var].kind, VarKind::Temp { .. }) {
                        compiler_error!(self, "using uninitialized temp var");
                        self.result = CompileResult::UnknownParse;
                    }
                    self.vars[var].used = true;
                    self.vars[var].first_use = j as i32;
                }
                self.vars[actual].last_use = j as i32;
            }

            for k in 0..N_DEST {
                if opcode.dest_size[k] == 0 {
                    continue;
                }
                let var = self.insns[j].dest_args[k];

                match self.vars[var].kind {
                    VarKind::Src(_) => {
                        compiler_error!(self, "using src var as dest");
                        self.result = CompileResult::UnknownParse;
                    }
                    VarKind::Const { .. } => {
                        compiler_error!(self, "using const var as dest");
                        self.result = CompileResult::UnknownParse;
                    }
                    VarKind::Param => {
                        compiler_error!(self, "using param var as dest");
                        self.result = CompileResult::UnknownParse;
                    }
                    _ => {}
                }
                let is_accumulator_var = matches!(self.vars[var].kind, VarKind::Accumulator);
                if opcode.is_accumulator() {
                    if !is_accumulator_var {
                        compiler_error!(self, "accumulating opcode to non-accumulator dest");
                        self.result = CompileResult::UnknownParse;
                    }
                } else if is_accumulator_var {
                    compiler_error!(self, "non-accumulating opcode to accumulator dest");
                    self.result = CompileResult::UnknownParse;
                }

                let mut actual = var;
                if let VarKind::Temp { replacement: Some(repl) } = self.vars[var].kind {
                    actual = repl;
                    self.insns[j].dest_args[k] = actual;
                }

                if !self.vars[var].used {
                    self.vars[actual].used = true;
                    self.vars[actual].first_use = j as i32;
                } else {
                    // A destination written more than once is currently
                    // accepted.
                    // TODO: reject double writes to Dest variables once no
                    // kernels rely on them.
                    if matches!(self.vars[var].kind, VarKind::Temp { .. }) {
                        let dup = self.dup_temporary(var, j);
                        if let VarKind::Temp { ref mut replacement } = self.vars[var].kind {
                            *replacement = Some(dup);
                        }
                        self.insns[j].dest_args[k] = dup;
                        self.vars[dup].used = true;
                        self.vars[dup].first_use = j as i32;
                        actual = dup;
                    }
                }
                self.vars[actual].last_use = j as i32;
            }
        }
    }

    /// Append a duplicate of a temporary, named `"<donor>.dup<j>"`, at the
    /// next free slot past the declared temporaries.
    fn dup_temporary(&mut self, var: VarIndex, j: usize) -> VarIndex {
        let slot = VAR_T1 + self.n_temp_vars + self.n_dup_vars;
        let donor = &self.vars[var];
        let dup = Variable {
            name: Some(format!("{}.dup{}", donor.name.as_deref().unwrap_or(""), j)),
            size: donor.size,
            kind: VarKind::Temp { replacement: None },
            ..Variable::default()
        };
        if slot < self.vars.len() {
            self.vars[slot] = dup;
        } else {
            self.vars.push(dup);
        }
        self.n_dup_vars += 1;
        slot
    }
}
