//! Code-memory collaborator.
//!
//! Installs the code buffer the backend writes into. Mapping the bytes
//! executable is the embedding runtime's job; the compiler core only needs
//! somewhere to put them, and the driver transfers the buffer to the
//! program on success.

use crate::compiler::Compiler;

const CODE_INITIAL_CAPACITY: usize = 4096;

/// Install a fresh code buffer into the context.
pub fn allocate_codemem(compiler: &mut Compiler<'_>) {
    compiler.code = Vec::with_capacity(CODE_INITIAL_CAPACITY);
}
