//! Shared error types used across the compilation pipeline.
//!
//! Compilation is fail-fast: the first token that does not match the
//! expected grammar production aborts the whole unit with a diagnostic
//! naming the file, line and column. There is no recovery and no
//! multi-error reporting.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CompileError {
  #[snafu(display("Unexpected token in {path} at line {line}, col {col}"))]
  UnexpectedToken { path: String, line: u32, col: u32 },

  #[snafu(display("failed to read {path}: {source}"))]
  ReadInput {
    path: String,
    source: std::io::Error,
  },

  #[snafu(display("failed to write {path}: {source}"))]
  WriteOutput {
    path: String,
    source: std::io::Error,
  },
}

impl CompileError {
  /// Construct the fail-fast parse diagnostic for the token at `line`/`col`.
  pub fn unexpected_token(path: &str, line: u32, col: u32) -> Self {
    Self::UnexpectedToken {
      path: path.to_string(),
      line,
      col,
    }
  }
}
