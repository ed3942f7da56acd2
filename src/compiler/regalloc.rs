//! Register allocation.
//!
//! Registers live in two disjoint 32-wide pools: general-purpose registers
//! at [`GP_REG_BASE`] and vector registers at the target's
//! `data_register_offset`. Each pool is a vector of small refcounts indexed
//! by register number; a register is free while its refcount is zero, and
//! the chaining optimization leans on the refcount semantics to keep a
//! shared register live across two variables' ranges.
//!
//! Allocation happens in two phases: `global_reg_alloc` pins registers for
//! variables whose lifetime spans the whole program (constants, parameters,
//! accumulators, and the pointer bundles of sources and destinations);
//! `rewrite_vars2` then walks the instructions assigning
//! vector registers to everything born at each index and releasing
//! everything that dies there. The first-free-register policy makes the
//! assignment a deterministic function of the target masks, instruction
//! order, and prior allocations.

use crate::error::CompileResult;
use crate::program::{Reg, VarKind};

use super::Compiler;

/// Size of the per-context register state vectors.
pub const N_REGS: usize = 128;
/// Base register number of the general-purpose pool.
pub const GP_REG_BASE: Reg = 32;
/// Default base register number of the vector pool.
pub const VEC_REG_BASE: Reg = 64;

impl Compiler<'_> {
    /// Allocate a register from the vector (`data_reg`) or general-purpose
    /// pool.
    ///
    /// Scans the pool window twice: first for a free scratch register, then
    /// accepting callee-saved ones. Returns 0 and records a recoverable
    /// "register overflow" failure when the pool is exhausted.
    pub fn allocate_register(&mut self, data_reg: bool) -> Reg {
        let offset = if data_reg {
            self.target.data_register_offset()
        } else {
            GP_REG_BASE
        };

        for i in 0..32 {
            let reg = offset + i;
            if self.valid_regs[reg] && !self.save_regs[reg] && self.alloc_regs[reg] == 0 {
                self.alloc_regs[reg] += 1;
                self.used_regs[reg] = true;
                return reg;
            }
        }
        for i in 0..32 {
            let reg = offset + i;
            if self.valid_regs[reg] && self.alloc_regs[reg] == 0 {
                self.alloc_regs[reg] += 1;
                self.used_regs[reg] = true;
                return reg;
            }
        }

        compiler_error!(
            self,
            "register overflow for {} reg",
            if data_reg { "vector" } else { "gp" }
        );
        self.result = CompileResult::UnknownCompile;
        0
    }

    /// Assign fixed registers to variables that live for the whole program.
    pub(crate) fn global_reg_alloc(&mut self) {
        for i in 0..self.vars.len() {
            if self.vars[i].name.is_none() {
                continue;
            }
            match self.vars[i].kind {
                VarKind::Const { .. } | VarKind::Param | VarKind::Accumulator => {
                    self.vars[i].first_use = -1;
                    self.vars[i].last_use = -1;
                    let reg = self.allocate_register(true);
                    self.vars[i].alloc = reg;
                }
                VarKind::Src(_) => {
                    let ptr_register = self.allocate_register(false);
                    let mask = if self.need_mask_regs {
                        let mask_alloc = self.allocate_register(true);
                        let ptr_offset = self.allocate_register(false);
                        let aligned_data = self.allocate_register(true);
                        Some((mask_alloc, ptr_offset, aligned_data))
                    } else {
                        None
                    };
                    if let VarKind::Src(ref mut ptrs) = self.vars[i].kind {
                        ptrs.ptr_register = ptr_register;
                        if let Some((mask_alloc, ptr_offset, aligned_data)) = mask {
                            ptrs.mask_alloc = mask_alloc;
                            ptrs.ptr_offset = ptr_offset;
                            ptrs.aligned_data = aligned_data;
                        }
                    }
                }
                VarKind::Dest(_) => {
                    let ptr_register = self.allocate_register(false);
                    if let VarKind::Dest(ref mut ptrs) = self.vars[i].kind {
                        ptrs.ptr_register = ptr_register;
                    }
                }
                VarKind::Temp { .. } => {}
            }

            if self.error {
                break;
            }
        }

        if self.alloc_loop_counter && !self.error {
            self.loop_counter = self.allocate_register(false);
            if self.loop_counter == 0 {
                self.forgive_loop_counter_exhaustion();
            }
        }
    }

    /// Historical quirk: a backend that tolerates an implicit loop counter
    /// expects counter exhaustion to be forgiven, not failed. Called from
    /// the single site at the end of the global pass.
    fn forgive_loop_counter_exhaustion(&mut self) {
        self.error = false;
        self.result = CompileResult::Ok;
    }

    /// Per-instruction register assignment for everything the global pass
    /// left unpinned.
    ///
    /// At each instruction: try to chain a dying first source into the
    /// destination, clear the inline-immediate sentinel on the second
    /// source, allocate a vector register for every variable born here, and
    /// release every variable that dies here.
    pub(crate) fn rewrite_vars2(&mut self) {
        for j in 0..self.insns.len() {
            let opcode = self.insns[j].opcode.desc();

            // Chain src1 into the dest when this instruction is src1's last
            // use: single-dest, non-accumulating opcodes only.
            if !opcode.is_accumulator() && opcode.dest_size[1] == 0 {
                let src1 = self.insns[j].src_args[0];
                let dest = self.insns[j].dest_args[0];

                if self.vars[src1].last_use == j as i32 {
                    if self.vars[src1].first_use == j as i32 {
                        let reg = self.allocate_register(true);
                        self.vars[src1].alloc = reg;
                    }
                    let shared = self.vars[src1].alloc;
                    self.alloc_regs[shared] += 1;
                    self.vars[dest].alloc = shared;
                }
            }

            // An upstream pass may have marked the second source as an
            // inline immediate; clear the sentinel so it does not read as a
            // register number.
            let src2 = self.insns[j].src_args[1];
            if self.vars[src2].alloc == 1 {
                self.vars[src2].alloc = 0;
            }

            for i in 0..self.vars.len() {
                if self.vars[i].name.is_none() {
                    continue;
                }
                if self.vars[i].first_use == j as i32 {
                    if self.vars[i].alloc != 0 {
                        continue;
                    }
                    let reg = self.allocate_register(true);
                    self.vars[i].alloc = reg;
                }
            }
            for i in 0..self.vars.len() {
                if self.vars[i].name.is_none() {
                    continue;
                }
                if self.vars[i].last_use == j as i32 {
                    self.alloc_regs[self.vars[i].alloc] -= 1;
                }
            }
        }
    }
}
