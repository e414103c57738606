//! The compilation engine: a recursive-descent parser fused with code
//! generation.
//!
//! There is no AST. Each grammar production is one routine that consumes
//! tokens through an implicit current-token cursor, updates the symbol
//! table, and writes VM instructions the moment a construct is recognised.
//! Disambiguation needs exactly one token of lookahead: after a lone
//! identifier in a term, `[` means array access, `(` or `.` means a
//! subroutine call, anything else a plain variable reference.
//!
//! Expressions have no operator precedence. `a + b * c` folds strictly
//! left-to-right, which is the language's contract, so no precedence
//! climbing belongs here.

use crate::emitter::{Command, Emitter, Segment};
use crate::error::{CompileError, CompileResult};
use crate::symbols::{Symbol, SymbolKind, SymbolTable};
use crate::tokenizer::{Keyword, Token, TokenKind, Tokenizer};

/// Compiles exactly one class. All state – symbol table, label counters,
/// receiver flags – is per instance, constructed fresh for every source
/// file and discarded after the output is taken.
pub struct CompilationEngine<'a> {
  tokenizer: Tokenizer<'a>,
  symbols: SymbolTable,
  emitter: Emitter,
  source: &'a str,
  path: &'a str,
  current: Token,
  class_name: &'a str,
  in_method: bool,
  in_constructor: bool,
  while_count: u32,
  if_count: u32,
}

impl<'a> CompilationEngine<'a> {
  pub fn new(path: &'a str, source: &'a str) -> Self {
    let mut tokenizer = Tokenizer::new(source);
    let current = tokenizer.next_token();
    Self {
      tokenizer,
      symbols: SymbolTable::new(),
      emitter: Emitter::new(),
      source,
      path,
      current,
      class_name: "",
      in_method: false,
      in_constructor: false,
      while_count: 0,
      if_count: 0,
    }
  }

  /// Compile the class and hand back the finished instruction text.
  pub fn compile(mut self) -> CompileResult<String> {
    self.compile_class()?;
    Ok(self.emitter.into_output())
  }

  // class: 'class' className '{' classVarDec* subroutineDec* '}'
  fn compile_class(&mut self) -> CompileResult<()> {
    if !self.current.is_keyword(Keyword::Class) {
      return Err(self.unexpected_token());
    }

    self.read_token(TokenKind::Identifier)?;
    self.class_name = self.current_text();

    self.read_symbol('{')?;

    self.advance();
    while self.current.kind == TokenKind::Keyword {
      match self.current.keyword {
        Some(Keyword::Static) | Some(Keyword::Field) => self.compile_class_var_dec()?,
        Some(Keyword::Constructor) | Some(Keyword::Function) | Some(Keyword::Method) => {
          self.compile_subroutine()?
        }
        _ => return Err(self.unexpected_token()),
      }
      self.advance();
    }

    self.verify_symbol('}')
  }

  // classVarDec: ('static' | 'field') type varName (',' varName)* ';'
  // Declarations only feed the symbol table; nothing is emitted.
  fn compile_class_var_dec(&mut self) -> CompileResult<()> {
    let kind = if self.current.is_keyword(Keyword::Static) {
      SymbolKind::Static
    } else {
      SymbolKind::Field
    };

    self.read_type()?;
    let ty = self.current_text();

    self.read_token(TokenKind::Identifier)?;
    self.symbols.define(self.current_text(), ty, kind);

    self.advance();
    while self.current.is_symbol(',') {
      self.read_token(TokenKind::Identifier)?;
      self.symbols.define(self.current_text(), ty, kind);
      self.advance();
    }

    self.verify_symbol(';')
  }

  // subroutineDec: ('constructor' | 'function' | 'method') ('void' | type)
  //                subroutineName '(' parameterList ')' '{' varDec* statements '}'
  fn compile_subroutine(&mut self) -> CompileResult<()> {
    self.symbols.start_subroutine();
    self.while_count = 0;
    self.if_count = 0;

    let subroutine_kind = self.current.keyword;

    // Return type. Recorded nowhere: declared types are never validated.
    self.read_type()?;

    self.read_token(TokenKind::Identifier)?;
    let name = self.current_text();

    self.read_symbol('(')?;
    self.compile_parameter_list()?;
    self.verify_symbol(')')?;

    self.read_symbol('{')?;

    self.advance();
    while self.current.is_keyword(Keyword::Var) {
      self.compile_var_dec()?;
      self.advance();
    }

    // The function header needs the local count, so it is written only
    // after every var declaration has been registered.
    self
      .emitter
      .function(self.class_name, name, self.symbols.var_count(SymbolKind::Local));

    match subroutine_kind {
      Some(Keyword::Method) => {
        // The caller passed the receiver as argument 0; make it "this".
        self.emitter.push(Segment::Argument, 0);
        self.emitter.pop(Segment::Pointer, 0);
        self.in_method = true;
      }
      Some(Keyword::Constructor) => {
        // Allocate one word per field and anchor "this" at the new block.
        self
          .emitter
          .push(Segment::Constant, self.symbols.var_count(SymbolKind::Field));
        self.emitter.call("Memory", "alloc", 1);
        self.emitter.pop(Segment::Pointer, 0);
        self.in_constructor = true;
      }
      _ => {}
    }

    self.compile_statements()?;
    self.in_method = false;
    self.in_constructor = false;

    self.verify_symbol('}')
  }

  // parameterList: ((type varName) (',' type varName)*)?
  fn compile_parameter_list(&mut self) -> CompileResult<()> {
    self.advance();
    if self.current.kind == TokenKind::Identifier || self.current.kind == TokenKind::Keyword {
      let ty = self.current_text();
      self.read_token(TokenKind::Identifier)?;
      self
        .symbols
        .define(self.current_text(), ty, SymbolKind::Argument);
      self.advance();
    }

    while self.current.is_symbol(',') {
      self.read_type()?;
      let ty = self.current_text();
      self.read_token(TokenKind::Identifier)?;
      self
        .symbols
        .define(self.current_text(), ty, SymbolKind::Argument);
      self.advance();
    }
    Ok(())
  }

  // varDec: 'var' type varName (',' varName)* ';'
  fn compile_var_dec(&mut self) -> CompileResult<()> {
    self.read_type()?;
    let ty = self.current_text();

    self.read_token(TokenKind::Identifier)?;
    self
      .symbols
      .define(self.current_text(), ty, SymbolKind::Local);

    self.advance();
    while self.current.is_symbol(',') {
      self.read_token(TokenKind::Identifier)?;
      self
        .symbols
        .define(self.current_text(), ty, SymbolKind::Local);
      self.advance();
    }

    self.verify_symbol(';')
  }

  // statements: (let | if | while | do | return)*
  fn compile_statements(&mut self) -> CompileResult<()> {
    while self.current.kind == TokenKind::Keyword {
      match self.current.keyword {
        Some(Keyword::Let) => {
          self.compile_let()?;
          self.advance();
        }
        // compile_if consumes one token past the statement while probing
        // for 'else', so it must not be advanced over here.
        Some(Keyword::If) => self.compile_if()?,
        Some(Keyword::While) => {
          self.compile_while()?;
          self.advance();
        }
        Some(Keyword::Do) => {
          self.compile_do()?;
          self.advance();
        }
        Some(Keyword::Return) => {
          self.compile_return()?;
          self.advance();
        }
        _ => return Err(self.unexpected_token()),
      }
    }
    Ok(())
  }

  // doStatement: 'do' subroutineCall ';'
  fn compile_do(&mut self) -> CompileResult<()> {
    self.read_token(TokenKind::Identifier)?;
    let name = self.current_text();

    self.read_token(TokenKind::Symbol)?;
    self.compile_subroutine_call(name, true)?;

    self.read_symbol(';')
  }

  // subroutineCall: subroutineName '(' expressionList ')'
  //               | (className | varName) '.' subroutineName '(' expressionList ')'
  //
  // A dotted receiver that resolves in the symbol table is an instance
  // call: its value becomes the implicit first argument and its declared
  // type names the callee's class. An unresolved receiver is taken as a
  // class name. An undotted call targets the current instance.
  fn compile_subroutine_call(&mut self, name: &'a str, is_do: bool) -> CompileResult<()> {
    let mut callee = name;
    let class_name: String;
    let mut n_args = 0;
    let mut restore_this = false;

    if self.current.is_symbol('.') {
      let receiver = callee;
      self.read_token(TokenKind::Identifier)?;
      callee = self.current_text();

      let symbol = self.symbols.find(receiver);
      if symbol.kind == SymbolKind::None {
        class_name = receiver.to_string();
      } else {
        // Evaluating a sub-call must not corrupt the enclosing
        // subroutine's receiver, so save "this" before replacing it.
        restore_this = self.in_method || self.in_constructor;
        if restore_this {
          self.emitter.push(Segment::Pointer, 0);
        }

        class_name = symbol.ty.clone();
        n_args += 1;
        self.push_symbol(&symbol);
      }

      self.read_token(TokenKind::Symbol)?;
    } else {
      // Undotted: an implicit call on the current instance.
      class_name = self.class_name.to_string();
      n_args += 1;
      self.emitter.push(Segment::Pointer, 0);
    }

    self.verify_symbol('(')?;
    self.advance();

    n_args += self.compile_expression_list()?;
    self.verify_symbol(')')?;

    self.emitter.call(&class_name, callee, n_args);

    if is_do {
      // Discard the return value so it does not bleed into later code.
      self.emitter.pop(Segment::Temp, 0);
      if restore_this {
        self.emitter.pop(Segment::Pointer, 0);
      }
    } else if restore_this {
      // Stash the return value, restore "this", put the value back.
      self.emitter.pop(Segment::Temp, 0);
      self.emitter.pop(Segment::Pointer, 0);
      self.emitter.push(Segment::Temp, 0);
    }
    Ok(())
  }

  // letStatement: 'let' varName ('[' expression ']')? '=' expression ';'
  fn compile_let(&mut self) -> CompileResult<()> {
    self.read_token(TokenKind::Identifier)?;
    let symbol = self.symbols.find(self.current_text());

    self.read_token(TokenKind::Symbol)?;

    if self.current.is_symbol('[') {
      // The index lands in temp 0 so the right-hand side can be computed
      // before the pointer swap without clobbering it.
      self.advance();
      self.compile_expression()?;
      self.emitter.pop(Segment::Temp, 0);

      self.verify_symbol(']')?;
      self.advance();

      self.verify_symbol('=')?;
      self.advance();
      self.compile_expression()?;

      self.push_symbol(&symbol);
      self.emitter.push(Segment::Temp, 0);
      self.emitter.arithmetic(Command::Add);
      self.emitter.pop(Segment::Pointer, 1);
      self.emitter.pop(Segment::That, 0);
    } else {
      self.verify_symbol('=')?;

      self.advance();
      self.compile_expression()?;
      self.pop_symbol(&symbol);
    }

    self.verify_symbol(';')
  }

  // whileStatement: 'while' '(' expression ')' '{' statements '}'
  fn compile_while(&mut self) -> CompileResult<()> {
    self.read_symbol('(')?;

    let exp_label = format!("WHILE_EXP{}", self.while_count);
    let end_label = format!("WHILE_END{}", self.while_count);
    self.emitter.label(&exp_label);

    self.advance();
    self.compile_expression()?;
    self.verify_symbol(')')?;
    self.read_symbol('{')?;

    self.emitter.arithmetic(Command::Not);
    self.emitter.if_goto(&end_label);

    self.advance();
    // Counter bumped before the body so nested loops take fresh numbers.
    self.while_count += 1;
    self.compile_statements()?;
    self.verify_symbol('}')?;

    self.emitter.goto(&exp_label);
    self.emitter.label(&end_label);
    Ok(())
  }

  // returnStatement: 'return' expression? ';'
  fn compile_return(&mut self) -> CompileResult<()> {
    self.advance();
    if !self.current.is_symbol(';') {
      self.compile_expression()?;
    } else {
      // Every subroutine returns a value; void callers discard it.
      self.emitter.push(Segment::Constant, 0);
    }

    self.emitter.ret();
    self.verify_symbol(';')
  }

  // ifStatement: 'if' '(' expression ')' '{' statements '}'
  //              ('else' '{' statements '}')?
  fn compile_if(&mut self) -> CompileResult<()> {
    self.read_symbol('(')?;

    self.advance();
    self.compile_expression()?;

    self.verify_symbol(')')?;
    self.read_symbol('{')?;

    let true_label = format!("IF_TRUE{}", self.if_count);
    let false_label = format!("IF_FALSE{}", self.if_count);
    let end_label = format!("IF_END{}", self.if_count);
    self.if_count += 1;

    self.emitter.if_goto(&true_label);
    self.emitter.goto(&false_label);
    self.emitter.label(&true_label);

    self.advance();
    self.compile_statements()?;
    self.verify_symbol('}')?;

    self.advance();
    if self.current.is_keyword(Keyword::Else) {
      self.emitter.goto(&end_label);
      self.emitter.label(&false_label);

      self.read_symbol('{')?;

      self.advance();
      self.compile_statements()?;
      self.verify_symbol('}')?;

      self.advance();
      self.emitter.label(&end_label);
    } else {
      // No else branch: the false label alone closes the statement.
      self.emitter.label(&false_label);
    }
    Ok(())
  }

  // expression: term (op term)*
  // All binary operators share one precedence level; the fold is strictly
  // left-associative.
  fn compile_expression(&mut self) -> CompileResult<()> {
    self.compile_term()?;

    while let Some(op) = self.current_operator() {
      self.advance();
      self.compile_term()?;

      match op {
        '+' => self.emitter.arithmetic(Command::Add),
        '-' => self.emitter.arithmetic(Command::Sub),
        // The instruction set has no multiply/divide; the runtime does.
        '*' => self.emitter.call("Math", "multiply", 2),
        '/' => self.emitter.call("Math", "divide", 2),
        '&' => self.emitter.arithmetic(Command::And),
        '|' => self.emitter.arithmetic(Command::Or),
        '<' => self.emitter.arithmetic(Command::Lt),
        '>' => self.emitter.arithmetic(Command::Gt),
        '=' => self.emitter.arithmetic(Command::Eq),
        _ => unreachable!(),
      }
    }
    Ok(())
  }

  // term: integerConstant | stringConstant | keywordConstant
  //     | '(' expression ')' | unaryOp term
  //     | varName | varName '[' expression ']' | subroutineCall
  fn compile_term(&mut self) -> CompileResult<()> {
    match self.current.kind {
      TokenKind::IntConst => {
        self
          .emitter
          .push(Segment::Constant, self.current.value.unwrap_or(0));
        self.advance();
        Ok(())
      }
      TokenKind::StrConst => {
        // Build the string at runtime: construct with the final length,
        // then append one character code at a time.
        let text = self.current.text(self.source);
        self.emitter.push(Segment::Constant, text.len() as i32);
        self.emitter.call("String", "new", 1);
        for byte in text.bytes() {
          self.emitter.push(Segment::Constant, i32::from(byte));
          self.emitter.call("String", "appendChar", 2);
        }
        self.advance();
        Ok(())
      }
      TokenKind::Keyword => match self.current.keyword {
        Some(Keyword::True) => {
          // true is all ones: 1 arithmetically negated.
          self.emitter.push(Segment::Constant, 1);
          self.emitter.arithmetic(Command::Neg);
          self.advance();
          Ok(())
        }
        Some(Keyword::False) | Some(Keyword::Null) => {
          self.emitter.push(Segment::Constant, 0);
          self.advance();
          Ok(())
        }
        Some(Keyword::This) => {
          self.emitter.push(Segment::Pointer, 0);
          self.advance();
          Ok(())
        }
        _ => Err(self.unexpected_token()),
      },
      TokenKind::Symbol => {
        if self.current.is_symbol('(') {
          self.advance();
          self.compile_expression()?;
          self.verify_symbol(')')?;
          self.advance();
          Ok(())
        } else if self.current.is_symbol('-') {
          self.advance();
          self.compile_term()?;
          self.emitter.arithmetic(Command::Neg);
          Ok(())
        } else if self.current.is_symbol('~') {
          self.advance();
          self.compile_term()?;
          self.emitter.arithmetic(Command::Not);
          Ok(())
        } else {
          Err(self.unexpected_token())
        }
      }
      TokenKind::Identifier => {
        let name = self.current_text();
        self.advance();

        if self.current.is_symbol('[') {
          let symbol = self.symbols.find(name);

          self.advance();
          self.compile_expression()?;
          self.verify_symbol(']')?;

          // index + base, then read through "that" at offset 0.
          self.push_symbol(&symbol);
          self.emitter.arithmetic(Command::Add);
          self.emitter.pop(Segment::Pointer, 1);
          self.emitter.push(Segment::That, 0);

          self.advance();
          Ok(())
        } else if self.current.is_symbol('.') || self.current.is_symbol('(') {
          self.compile_subroutine_call(name, false)?;
          self.advance();
          Ok(())
        } else {
          let symbol = self.symbols.find(name);
          self.push_symbol(&symbol);
          Ok(())
        }
      }
      TokenKind::Eof => Err(self.unexpected_token()),
    }
  }

  // expressionList: (expression (',' expression)*)?
  fn compile_expression_list(&mut self) -> CompileResult<i32> {
    let mut count = 0;
    if !self.current.is_symbol(')') {
      self.compile_expression()?;
      count += 1;

      while self.current.is_symbol(',') {
        self.advance();
        self.compile_expression()?;
        count += 1;
      }
    }
    Ok(count)
  }

  /// Push a symbol's value through its kind's storage segment. Arguments
  /// shift by one inside methods because argument 0 is the receiver.
  /// Unresolved names (`None` kind) emit nothing; the reference is latent
  /// rather than diagnosed.
  fn push_symbol(&mut self, symbol: &Symbol) {
    let index = symbol.index;
    match symbol.kind {
      SymbolKind::Static => self.emitter.push(Segment::Static, index),
      SymbolKind::Local => self.emitter.push(Segment::Local, index),
      SymbolKind::Field => self.emitter.push(Segment::This, index),
      SymbolKind::Argument => {
        let index = if self.in_method { index + 1 } else { index };
        self.emitter.push(Segment::Argument, index);
      }
      SymbolKind::None => {}
    }
  }

  /// Counterpart of `push_symbol` for assignment targets.
  fn pop_symbol(&mut self, symbol: &Symbol) {
    let index = symbol.index;
    match symbol.kind {
      SymbolKind::Static => self.emitter.pop(Segment::Static, index),
      SymbolKind::Local => self.emitter.pop(Segment::Local, index),
      SymbolKind::Field => self.emitter.pop(Segment::This, index),
      SymbolKind::Argument => {
        let index = if self.in_method { index + 1 } else { index };
        self.emitter.pop(Segment::Argument, index);
      }
      SymbolKind::None => {}
    }
  }

  fn current_operator(&self) -> Option<char> {
    match self.current.symbol {
      Some(op @ ('+' | '-' | '*' | '/' | '&' | '|' | '<' | '>' | '=')) => Some(op),
      _ => None,
    }
  }

  fn current_text(&self) -> &'a str {
    self.current.text(self.source)
  }

  fn advance(&mut self) {
    self.current = self.tokenizer.next_token();
  }

  fn unexpected_token(&self) -> CompileError {
    CompileError::unexpected_token(self.path, self.current.line, self.current.col)
  }

  /// Read the next token and verify it is the given keyword-or-identifier
  /// type position (`int`, `char`, `boolean`, `void` or a class name).
  fn read_type(&mut self) -> CompileResult<()> {
    self.advance();
    match self.current.kind {
      TokenKind::Keyword | TokenKind::Identifier => Ok(()),
      _ => Err(self.unexpected_token()),
    }
  }

  /// Read the next token and verify its kind.
  fn read_token(&mut self, kind: TokenKind) -> CompileResult<()> {
    self.advance();
    if self.current.kind == kind {
      Ok(())
    } else {
      Err(self.unexpected_token())
    }
  }

  /// Read the next token and verify it is the expected symbol.
  fn read_symbol(&mut self, symbol: char) -> CompileResult<()> {
    self.advance();
    self.verify_symbol(symbol)
  }

  /// Verify the current token without advancing.
  fn verify_symbol(&self, symbol: char) -> CompileResult<()> {
    if self.current.is_symbol(symbol) {
      Ok(())
    } else {
      Err(self.unexpected_token())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn compile(source: &str) -> CompileResult<String> {
    CompilationEngine::new("Test.jack", source).compile()
  }

  #[test]
  fn rejects_missing_class_keyword() {
    let err = compile("klass Foo {}").unwrap_err();
    assert_eq!(
      err.to_string(),
      "Unexpected token in Test.jack at line 1, col 1"
    );
  }

  #[test]
  fn diagnostic_points_at_offending_token() {
    let source = "class Foo {\n  function void run() {\n    let = 1;\n  }\n}\n";
    let err = compile(source).unwrap_err();
    // "let" must be followed by an identifier; the '=' is the culprit.
    assert_eq!(
      err.to_string(),
      "Unexpected token in Test.jack at line 3, col 9"
    );
  }

  #[test]
  fn no_partial_recovery_after_first_error() {
    let err = compile("class Foo { function }").unwrap_err();
    assert!(matches!(err, CompileError::UnexpectedToken { .. }));
  }

  #[test]
  fn empty_class_compiles_to_nothing() {
    assert_eq!(compile("class Foo {}").unwrap(), "");
  }

  #[test]
  fn trailing_text_after_class_is_ignored() {
    let out = compile("class Foo {} trailing garbage").unwrap();
    assert_eq!(out, "");
  }
}
