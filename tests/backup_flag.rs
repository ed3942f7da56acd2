//! `ORC_CODE=backup` behavior.
//!
//! Lives in its own test binary: the flag list is parsed once per process,
//! so the environment must be set before any compile runs.

mod common;

use common::MockTarget;
use orc::{CompileResult, Program, ProgramCode, VAR_D1, VAR_S1};

fn backup_stub() {}

#[test]
fn test_backup_flag_disables_compilation() {
    std::env::set_var("ORC_CODE", "backup");
    let _ = env_logger::builder().is_test(true).try_init();

    let mut program = Program::new_ds(2, 2);
    program.set_backup_function(backup_stub);
    program.append_ds("copyw", VAR_D1, VAR_S1).unwrap();

    let target = MockTarget::new();
    let result = program.compile_for_target(Some(&target));
    assert_eq!(result, CompileResult::UnknownCompile);
    assert!(!result.is_successful());
    assert!(!result.is_fatal());
    // The backup stays installed.
    assert_eq!(program.code, ProgramCode::Backup);

    // A program without a backup still compiles normally.
    let mut plain = Program::new_ds(2, 2);
    plain.append_ds("copyw", VAR_D1, VAR_S1).unwrap();
    let result = plain.compile_for_target(Some(&target));
    assert!(result.is_successful());
    assert_eq!(plain.code, ProgramCode::Compiled);
}
