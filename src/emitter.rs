//! VM instruction emitter: a pure, order-preserving textual sink.
//!
//! Every method appends exactly one instruction line to the output buffer.
//! The literal spellings here are the contract with the downstream
//! translator stage, so they must not drift.

/// Storage segments addressable by push/pop. `Constant` is push-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
  Constant,
  Argument,
  Local,
  Static,
  This,
  That,
  Pointer,
  Temp,
}

impl Segment {
  fn name(self) -> &'static str {
    match self {
      Segment::Constant => "constant",
      Segment::Argument => "argument",
      Segment::Local => "local",
      Segment::Static => "static",
      Segment::This => "this",
      Segment::That => "that",
      Segment::Pointer => "pointer",
      Segment::Temp => "temp",
    }
  }
}

/// Arithmetic and logical commands of the stack machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  Add,
  Sub,
  Neg,
  Eq,
  Gt,
  Lt,
  And,
  Or,
  Not,
}

impl Command {
  fn name(self) -> &'static str {
    match self {
      Command::Add => "add",
      Command::Sub => "sub",
      Command::Neg => "neg",
      Command::Eq => "eq",
      Command::Gt => "gt",
      Command::Lt => "lt",
      Command::And => "and",
      Command::Or => "or",
      Command::Not => "not",
    }
  }
}

/// Append-only instruction stream for one compiled class. The buffer is
/// write-once; nothing in the front end reads it back.
pub struct Emitter {
  out: String,
}

impl Emitter {
  pub fn new() -> Self {
    Self { out: String::new() }
  }

  pub fn push(&mut self, segment: Segment, index: i32) {
    self.out.push_str(&format!("push {} {index}\n", segment.name()));
  }

  pub fn pop(&mut self, segment: Segment, index: i32) {
    self.out.push_str(&format!("pop {} {index}\n", segment.name()));
  }

  pub fn arithmetic(&mut self, command: Command) {
    self.out.push_str(command.name());
    self.out.push('\n');
  }

  pub fn label(&mut self, label: &str) {
    self.out.push_str(&format!("label {label}\n"));
  }

  pub fn goto(&mut self, label: &str) {
    self.out.push_str(&format!("goto {label}\n"));
  }

  pub fn if_goto(&mut self, label: &str) {
    self.out.push_str(&format!("if-goto {label}\n"));
  }

  pub fn call(&mut self, class: &str, function: &str, n_args: i32) {
    self
      .out
      .push_str(&format!("call {class}.{function} {n_args}\n"));
  }

  pub fn function(&mut self, class: &str, function: &str, n_locals: i32) {
    self
      .out
      .push_str(&format!("function {class}.{function} {n_locals}\n"));
  }

  pub fn ret(&mut self) {
    self.out.push_str("return\n");
  }

  /// Hand the finished instruction text to the caller.
  pub fn into_output(self) -> String {
    self.out
  }
}
