//! Crate root: wires together the compilation pipeline.
//!
//! The stages are intentionally small and composable:
//! - `tokenizer` pulls one token at a time from the source buffer.
//! - `symbols` is the two-tier (class/subroutine) name registry.
//! - `emitter` appends textual VM instructions, one line per call.
//! - `engine` fuses recursive-descent parsing with code generation; there
//!   is no AST and no separate lowering pass.
//! - `error` centralises the fail-fast diagnostics shared by all stages.
//!
//! One engine instance compiles exactly one class and is discarded
//! afterwards; compiling the same source twice yields byte-identical
//! output.

pub mod emitter;
pub mod engine;
pub mod error;
pub mod symbols;
pub mod tokenizer;

pub use error::{CompileError, CompileResult};

/// Compile one Jack class into VM instruction text. `path` only labels
/// diagnostics; the caller is responsible for reading the source.
pub fn compile_source(path: &str, source: &str) -> CompileResult<String> {
  engine::CompilationEngine::new(path, source).compile()
}
