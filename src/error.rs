//! Result and error types for the compiler.
//!
//! Compilation reports its outcome through [`CompileResult`], a severity code
//! with a total order rather than a Rust error: a program that fails to
//! compile may still be perfectly runnable through the emulator, so the
//! interesting questions are "did we generate executable code?"
//! ([`CompileResult::is_successful`]) and "is the program itself malformed?"
//! ([`CompileResult::is_fatal`]).
//!
//! The program-construction API uses thiserror for ordinary error handling.

use thiserror::Error;

/// Outcome of a compilation attempt, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CompileResult {
    /// Executable code was generated.
    #[default]
    Ok,
    /// The target has no rule for some opcode; the program can only be
    /// emulated.
    MissingRule,
    /// Compilation failed for a reason that does not affect emulation, such
    /// as register exhaustion or a missing target.
    UnknownCompile,
    /// The program itself is malformed; the emulator will reject it too.
    UnknownParse,
}

impl CompileResult {
    /// True if executable code was generated and can be run.
    pub fn is_successful(self) -> bool {
        self == CompileResult::Ok
    }

    /// True if the program is syntactically invalid, independent of target.
    pub fn is_fatal(self) -> bool {
        self >= CompileResult::UnknownParse
    }
}

/// Errors from the program-construction API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("unknown opcode: {0}")]
    UnknownOpcode(String),

    #[error("too many {kind} variables")]
    TooManyVariables { kind: &'static str },

    #[error("unknown variable: {0}")]
    UnknownVariable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(CompileResult::Ok < CompileResult::MissingRule);
        assert!(CompileResult::MissingRule < CompileResult::UnknownCompile);
        assert!(CompileResult::UnknownCompile < CompileResult::UnknownParse);
    }

    #[test]
    fn test_predicates() {
        assert!(CompileResult::Ok.is_successful());
        assert!(!CompileResult::MissingRule.is_successful());
        assert!(!CompileResult::UnknownCompile.is_successful());

        assert!(CompileResult::UnknownParse.is_fatal());
        assert!(!CompileResult::UnknownCompile.is_fatal());
        assert!(!CompileResult::Ok.is_fatal());
    }
}
