//! Lexical analysis: pulls one token at a time from the source buffer.
//!
//! The tokenizer is intentionally tiny – it knows nothing about the grammar
//! beyond the fixed symbol and keyword sets. It never fails: malformed input
//! falls through to best-effort token boundaries and the parser rejects it
//! with a positioned diagnostic instead. Whitespace and both comment forms
//! are fully skipped before every token, and line/column counters advance
//! per character so every token carries its source position.

/// Kinds of tokens recognised by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Keyword,
  Symbol,
  IntConst,
  StrConst,
  Identifier,
  Eof,
}

/// The fixed keyword table of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
  Class,
  Constructor,
  Function,
  Method,
  Field,
  Static,
  Var,
  Int,
  Char,
  Boolean,
  Void,
  True,
  False,
  Null,
  This,
  Let,
  Do,
  If,
  Else,
  While,
  Return,
}

fn lookup_keyword(text: &str) -> Option<Keyword> {
  let keyword = match text {
    "class" => Keyword::Class,
    "constructor" => Keyword::Constructor,
    "function" => Keyword::Function,
    "method" => Keyword::Method,
    "field" => Keyword::Field,
    "static" => Keyword::Static,
    "var" => Keyword::Var,
    "int" => Keyword::Int,
    "char" => Keyword::Char,
    "boolean" => Keyword::Boolean,
    "void" => Keyword::Void,
    "true" => Keyword::True,
    "false" => Keyword::False,
    "null" => Keyword::Null,
    "this" => Keyword::This,
    "let" => Keyword::Let,
    "do" => Keyword::Do,
    "if" => Keyword::If,
    "else" => Keyword::Else,
    "while" => Keyword::While,
    "return" => Keyword::Return,
    _ => return None,
  };
  Some(keyword)
}

/// Thin wrapper for lexical information needed by later stages. The token
/// stores a byte span into the source rather than owning its text; for
/// string constants the span excludes the surrounding quotes.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub keyword: Option<Keyword>,
  pub symbol: Option<char>,
  pub value: Option<i32>,
  pub loc: usize,
  pub len: usize,
  pub line: u32,
  pub col: u32,
}

impl Token {
  fn new(kind: TokenKind, loc: usize, len: usize, line: u32, col: u32) -> Self {
    Self {
      kind,
      keyword: None,
      symbol: None,
      value: None,
      loc,
      len,
      line,
      col,
    }
  }

  /// Return the slice from the source that produced this token.
  pub fn text<'a>(&self, source: &'a str) -> &'a str {
    &source[self.loc..self.loc + self.len]
  }

  pub fn is_keyword(&self, keyword: Keyword) -> bool {
    self.kind == TokenKind::Keyword && self.keyword == Some(keyword)
  }

  pub fn is_symbol(&self, symbol: char) -> bool {
    self.kind == TokenKind::Symbol && self.symbol == Some(symbol)
  }
}

/// Pull-based lexer over one source unit. `next_token` never blocks and
/// never fails; once the input is exhausted it keeps returning `Eof`.
pub struct Tokenizer<'a> {
  source: &'a str,
  pos: usize,
  line: u32,
  col: u32,
}

const SYMBOLS: &[u8] = b"{}()[].,;+-*/&|<>=~";

impl<'a> Tokenizer<'a> {
  pub fn new(source: &'a str) -> Self {
    Self {
      source,
      pos: 0,
      line: 1,
      col: 1,
    }
  }

  fn peek(&self) -> u8 {
    self.peek_at(0)
  }

  fn peek_at(&self, offset: usize) -> u8 {
    *self.source.as_bytes().get(self.pos + offset).unwrap_or(&0)
  }

  /// Advance one byte within the current line.
  fn bump(&mut self) {
    self.pos += 1;
    self.col += 1;
  }

  /// Consume an end-of-line sequence, treating CRLF as one line break.
  fn bump_newline(&mut self) {
    if self.peek() == b'\r' && self.peek_at(1) == b'\n' {
      self.pos += 2;
    } else {
      self.pos += 1;
    }
    self.col = 1;
    self.line += 1;
  }

  /// Skip whitespace, line comments and (non-nested) block comments. Line
  /// breaks inside comments still advance the line counter.
  fn skip_trivia(&mut self) {
    loop {
      let c = self.peek();
      if c == b' ' || c == b'\t' {
        self.bump();
      } else if c == b'\r' || c == b'\n' {
        self.bump_newline();
      } else if c == b'/' && self.peek_at(1) == b'/' {
        self.bump();
        self.bump();
        while self.peek() != 0 && self.peek() != b'\r' && self.peek() != b'\n' {
          self.bump();
        }
      } else if c == b'/' && self.peek_at(1) == b'*' {
        self.bump();
        self.bump();
        while self.peek() != 0 && !(self.peek() == b'*' && self.peek_at(1) == b'/') {
          if self.peek() == b'\r' || self.peek() == b'\n' {
            self.bump_newline();
          } else {
            self.bump();
          }
        }
        if self.peek() != 0 {
          self.bump();
          self.bump();
        }
      } else {
        break;
      }
    }
  }

  /// Produce the next token, or the `Eof` token once input is exhausted.
  pub fn next_token(&mut self) -> Token {
    self.skip_trivia();

    let start = self.pos;
    let line = self.line;
    let col = self.col;
    let c = self.peek();

    if c == 0 {
      return Token::new(TokenKind::Eof, start, 0, line, col);
    }

    if SYMBOLS.contains(&c) {
      self.bump();
      let mut token = Token::new(TokenKind::Symbol, start, 1, line, col);
      token.symbol = Some(char::from(c));
      return token;
    }

    if c.is_ascii_digit() {
      // Unsigned decimal, accumulated digit by digit. There is no bounds
      // check; out-of-range literals wrap.
      let mut value: i32 = 0;
      while self.peek().is_ascii_digit() {
        value = value
          .wrapping_mul(10)
          .wrapping_add(i32::from(self.peek() - b'0'));
        self.bump();
      }
      let mut token = Token::new(TokenKind::IntConst, start, self.pos - start, line, col);
      token.value = Some(value);
      return token;
    }

    if c == b'"' {
      // String literal, terminated by the next quote; no escape processing.
      // The recorded span excludes the quotes.
      self.bump();
      let text_start = self.pos;
      while self.peek() != 0 && self.peek() != b'"' {
        self.bump();
      }
      let len = self.pos - text_start;
      if self.peek() != 0 {
        self.bump();
      }
      return Token::new(TokenKind::StrConst, text_start, len, line, col);
    }

    // Identifier run. The first character is consumed unconditionally so
    // that stray characters still form a token boundary instead of wedging
    // the lexer; the parser rejects them as unexpected tokens.
    self.bump();
    while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
      self.bump();
    }
    let mut token = Token::new(TokenKind::Identifier, start, self.pos - start, line, col);
    if let Some(keyword) = lookup_keyword(token.text(self.source)) {
      token.kind = TokenKind::Keyword;
      token.keyword = Some(keyword);
    }
    token
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lex_all(source: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer::new(source);
    let mut tokens = Vec::new();
    loop {
      let token = tokenizer.next_token();
      let done = token.kind == TokenKind::Eof;
      tokens.push(token);
      if done {
        break;
      }
    }
    tokens
  }

  #[test]
  fn keywords_and_identifiers() {
    let source = "class Foo classes";
    let tokens = lex_all(source);
    assert!(tokens[0].is_keyword(Keyword::Class));
    assert_eq!(tokens[1].kind, TokenKind::Identifier);
    assert_eq!(tokens[1].text(source), "Foo");
    // A keyword prefix does not make an identifier a keyword.
    assert_eq!(tokens[2].kind, TokenKind::Identifier);
    assert_eq!(tokens[2].text(source), "classes");
  }

  #[test]
  fn symbols_are_single_characters() {
    let source = "{}()[].,;+-*/&|<>=~";
    let tokens = lex_all(source);
    assert_eq!(tokens.len(), source.len() + 1);
    for (token, expected) in tokens.iter().zip(source.chars()) {
      assert!(token.is_symbol(expected));
    }
  }

  #[test]
  fn integer_value_is_accumulated() {
    let source = "let x = 12345;";
    let tokens = lex_all(source);
    assert_eq!(tokens[3].kind, TokenKind::IntConst);
    assert_eq!(tokens[3].value, Some(12345));
  }

  #[test]
  fn string_span_excludes_quotes() {
    let source = "\"AB\"";
    let tokens = lex_all(source);
    assert_eq!(tokens[0].kind, TokenKind::StrConst);
    assert_eq!(tokens[0].text(source), "AB");
  }

  #[test]
  fn comments_are_skipped() {
    let source = "// line\n/* block\nstill block */ class";
    let tokens = lex_all(source);
    assert!(tokens[0].is_keyword(Keyword::Class));
    assert_eq!(tokens[1].kind, TokenKind::Eof);
  }

  #[test]
  fn line_and_column_tracking() {
    let source = "class\r\n  Foo {";
    let tokens = lex_all(source);
    assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
    // CRLF counts as a single line break.
    assert_eq!((tokens[1].line, tokens[1].col), (2, 3));
    assert_eq!((tokens[2].line, tokens[2].col), (2, 7));
  }

  #[test]
  fn lines_inside_block_comments_are_counted() {
    let source = "/* a\nb\nc */ x";
    let tokens = lex_all(source);
    assert_eq!(tokens[0].line, 3);
  }

  #[test]
  fn eof_is_sticky() {
    let mut tokenizer = Tokenizer::new("");
    assert_eq!(tokenizer.next_token().kind, TokenKind::Eof);
    assert_eq!(tokenizer.next_token().kind, TokenKind::Eof);
  }
}
