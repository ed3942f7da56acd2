//! Semantic validation of operand sizes and kinds.

use crate::error::CompileResult;
use crate::opcode::{N_DEST, N_SRC};

use super::Compiler;

impl Compiler<'_> {
    /// Check every operand against the opcode's static signature.
    ///
    /// Destination slots must match the declared size exactly. Source slots
    /// must too, except that constants and parameters do not constrain the
    /// size (it is a property of the broadcast, not the storage). Scalar
    /// opcodes additionally require every source past the first to be a
    /// constant or parameter. Aborts on the first mismatch.
    pub(crate) fn check_sizes(&mut self) {
        for i in 0..self.insns.len() {
            let opcode = self.insns[i].opcode.desc();
            let dest_args = self.insns[i].dest_args;
            let src_args = self.insns[i].src_args;

            for j in 0..N_DEST {
                if opcode.dest_size[j] == 0 {
                    continue;
                }
                let size = self.vars[dest_args[j]].size;
                if opcode.dest_size[j] != size {
                    compiler_error!(
                        self,
                        "size mismatch, opcode {} dest[{}] is {} should be {}",
                        opcode.name,
                        j,
                        size,
                        opcode.dest_size[j]
                    );
                    self.result = CompileResult::UnknownParse;
                    return;
                }
            }

            for j in 0..N_SRC {
                if opcode.src_size[j] == 0 {
                    continue;
                }
                let size = self.vars[src_args[j]].size;
                let kind = self.vars[src_args[j]].kind;
                if opcode.src_size[j] != size && !kind.is_const_or_param() {
                    compiler_error!(
                        self,
                        "size mismatch, opcode {} src[{}] is {} should be {}",
                        opcode.name,
                        j,
                        size,
                        opcode.src_size[j]
                    );
                    self.result = CompileResult::UnknownParse;
                    return;
                }
                if opcode.is_scalar() && j >= 1 && !kind.is_const_or_param() {
                    compiler_error!(
                        self,
                        "opcode {} requires const or param source",
                        opcode.name
                    );
                    self.result = CompileResult::UnknownParse;
                    return;
                }
            }
        }
    }
}
