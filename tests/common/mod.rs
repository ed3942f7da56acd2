//! Shared mock target for compiler integration tests.

use std::sync::{Arc, Mutex};

use orc::{
    orc_asm, Compiler, OpcodeId, Reg, RuleSet, Target, Variable, GP_REG_BASE, N_REGS,
    VEC_REG_BASE,
};

/// Context state captured when the backend's `compile` hook runs, after all
/// frontend passes have finished.
#[derive(Default, Clone)]
pub struct Observed {
    pub vars: Vec<Variable>,
    pub alloc_regs: Vec<i32>,
    pub loop_counter: Reg,
}

/// A software target: 16 registers per pool, a reserved scratch register,
/// and text-plus-filler-byte emission for a fixed set of opcodes.
pub struct MockTarget {
    pub need_mask_regs: bool,
    pub alloc_loop_counter: bool,
    /// Width of the valid general-purpose window, for exhaustion tests.
    pub gp_window: usize,
    rules: RuleSet,
    observed: Arc<Mutex<Observed>>,
}

impl MockTarget {
    pub fn new() -> Self {
        let mut rules = RuleSet::new();
        for opcode in [
            "copyb", "copyw", "copyl", "addw", "subw", "mullw", "mulswl", "shlw", "shrsw",
            "convwb", "accw", "accl",
        ] {
            rules.register(opcode, emit_generic).unwrap();
        }
        Self {
            need_mask_regs: false,
            alloc_loop_counter: false,
            gp_window: 16,
            rules,
            observed: Arc::new(Mutex::new(Observed::default())),
        }
    }

    pub fn observed(&self) -> Observed {
        self.observed.lock().unwrap().clone()
    }
}

fn emit_generic(compiler: &mut Compiler<'_>, insn: usize) {
    let opcode = compiler.insns[insn].opcode.desc();
    let dest = compiler.insns[insn].dest_args[0];
    let src = compiler.insns[insn].src_args[0];
    let dest_reg = compiler.vars[dest].alloc;
    let src_reg = compiler.vars[src].alloc;
    orc_asm!(compiler, "  {} r{}, r{}\n", opcode.name, dest_reg, src_reg);
    compiler.emit_bytes(&[0x0f, insn as u8]);
}

impl Target for MockTarget {
    fn name(&self) -> &str {
        "mock"
    }

    fn compiler_init(&self, compiler: &mut Compiler<'_>) {
        compiler.valid_regs = [false; N_REGS];
        for reg in GP_REG_BASE..GP_REG_BASE + self.gp_window {
            compiler.valid_regs[reg] = true;
        }
        // Vector register 0 is the scratch register and stays out of the
        // allocatable set.
        for reg in VEC_REG_BASE + 1..VEC_REG_BASE + 16 {
            compiler.valid_regs[reg] = true;
        }
        compiler.tmpreg = VEC_REG_BASE;
        compiler.need_mask_regs = self.need_mask_regs;
        compiler.alloc_loop_counter = self.alloc_loop_counter;
    }

    fn compile(&self, compiler: &mut Compiler<'_>) {
        *self.observed.lock().unwrap() = Observed {
            vars: compiler.vars.clone(),
            alloc_regs: compiler.alloc_regs.to_vec(),
            loop_counter: compiler.loop_counter,
        };

        orc_asm!(compiler, ".function\n");
        for insn in 0..compiler.insns.len() {
            let rule = compiler.insns[insn].rule.clone();
            if let Some(rule) = rule {
                (rule.emit)(compiler, insn);
            }
        }
    }

    fn load_constant(&self, compiler: &mut Compiler<'_>, reg: Reg, _size: usize, value: u32) {
        orc_asm!(compiler, "  loadc r{}, #{:#010x}\n", reg, value);
        compiler.emit_bytes(&value.to_le_bytes());
    }

    fn get_rule(&self, opcode: OpcodeId, _target_flags: u32) -> Option<Arc<orc::Rule>> {
        self.rules.get(opcode)
    }
}
