//! Two-tier symbol table: class scope (static, field) and subroutine scope
//! (argument, local).
//!
//! Lookups check the subroutine scope first, so subroutine symbols shadow
//! class symbols of the same name. Defining a name twice is not rejected –
//! the second entry is appended and the first one keeps winning lookups.
//! That quirk is part of the observable behavior and is covered by tests.

/// Declaration category of a symbol, determining its storage segment and
/// which index counter it draws from. `None` is the sentinel returned when
/// lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
  Static,
  Field,
  Argument,
  Local,
  None,
}

/// One named slot: declared type, kind and per-kind index.
#[derive(Debug, Clone)]
pub struct Symbol {
  pub name: String,
  pub ty: String,
  pub kind: SymbolKind,
  pub index: i32,
}

impl Symbol {
  /// The sentinel returned when a name resolves in neither scope.
  fn none() -> Self {
    Self {
      name: String::new(),
      ty: String::new(),
      kind: SymbolKind::None,
      index: 0,
    }
  }
}

/// Symbol registry for one compiled class. The class-scope table lives for
/// the whole class; the subroutine-scope table is cleared at the start of
/// every subroutine.
pub struct SymbolTable {
  class_scope: Vec<Symbol>,
  subroutine_scope: Vec<Symbol>,
  counts: [i32; 4],
}

fn counter_slot(kind: SymbolKind) -> usize {
  match kind {
    SymbolKind::Static => 0,
    SymbolKind::Field => 1,
    SymbolKind::Argument => 2,
    SymbolKind::Local => 3,
    SymbolKind::None => unreachable!("the none sentinel has no counter"),
  }
}

impl SymbolTable {
  pub fn new() -> Self {
    Self {
      class_scope: Vec::new(),
      subroutine_scope: Vec::new(),
      counts: [0; 4],
    }
  }

  /// Start a new subroutine scope: clears the subroutine table and resets
  /// the argument/local counters. Class-scope symbols and their counters
  /// are untouched.
  pub fn start_subroutine(&mut self) {
    self.subroutine_scope.clear();
    self.counts[counter_slot(SymbolKind::Argument)] = 0;
    self.counts[counter_slot(SymbolKind::Local)] = 0;
  }

  /// Register a symbol under the scope selected by its kind and return the
  /// index it was assigned.
  pub fn define(&mut self, name: &str, ty: &str, kind: SymbolKind) -> i32 {
    let slot = counter_slot(kind);
    let index = self.counts[slot];
    self.counts[slot] += 1;

    let symbol = Symbol {
      name: name.to_string(),
      ty: ty.to_string(),
      kind,
      index,
    };
    match kind {
      SymbolKind::Static | SymbolKind::Field => self.class_scope.push(symbol),
      _ => self.subroutine_scope.push(symbol),
    }
    index
  }

  /// Resolve a name: subroutine scope first, then class scope, else the
  /// `None` sentinel.
  pub fn find(&self, name: &str) -> Symbol {
    self
      .subroutine_scope
      .iter()
      .find(|symbol| symbol.name == name)
      .or_else(|| self.class_scope.iter().find(|symbol| symbol.name == name))
      .cloned()
      .unwrap_or_else(Symbol::none)
  }

  /// Current counter value for a kind.
  pub fn var_count(&self, kind: SymbolKind) -> i32 {
    self.counts[counter_slot(kind)]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn indices_are_per_kind() {
    let mut table = SymbolTable::new();
    assert_eq!(table.define("x", "int", SymbolKind::Field), 0);
    assert_eq!(table.define("y", "int", SymbolKind::Field), 1);
    assert_eq!(table.define("count", "int", SymbolKind::Static), 0);
    assert_eq!(table.define("a", "int", SymbolKind::Argument), 0);
    assert_eq!(table.define("i", "int", SymbolKind::Local), 0);
    assert_eq!(table.var_count(SymbolKind::Field), 2);
    assert_eq!(table.var_count(SymbolKind::Static), 1);
  }

  #[test]
  fn subroutine_scope_shadows_class_scope() {
    let mut table = SymbolTable::new();
    table.define("x", "int", SymbolKind::Field);
    table.define("x", "Point", SymbolKind::Local);
    let symbol = table.find("x");
    assert_eq!(symbol.kind, SymbolKind::Local);
    assert_eq!(symbol.ty, "Point");
  }

  #[test]
  fn start_subroutine_resets_only_subroutine_state() {
    let mut table = SymbolTable::new();
    table.define("x", "int", SymbolKind::Field);
    table.define("a", "int", SymbolKind::Argument);
    table.define("i", "int", SymbolKind::Local);

    table.start_subroutine();
    assert_eq!(table.var_count(SymbolKind::Argument), 0);
    assert_eq!(table.var_count(SymbolKind::Local), 0);
    assert_eq!(table.find("a").kind, SymbolKind::None);
    assert_eq!(table.find("i").kind, SymbolKind::None);
    // Class-scope symbols and counters survive.
    assert_eq!(table.find("x").kind, SymbolKind::Field);
    assert_eq!(table.var_count(SymbolKind::Field), 1);

    assert_eq!(table.define("b", "int", SymbolKind::Argument), 0);
  }

  #[test]
  fn missing_name_yields_none_sentinel() {
    let table = SymbolTable::new();
    assert_eq!(table.find("ghost").kind, SymbolKind::None);
  }

  #[test]
  fn duplicate_names_append_and_first_wins() {
    let mut table = SymbolTable::new();
    table.define("x", "int", SymbolKind::Local);
    table.define("x", "char", SymbolKind::Local);
    // The duplicate consumed an index but lookups keep returning the first
    // entry.
    assert_eq!(table.var_count(SymbolKind::Local), 2);
    let symbol = table.find("x");
    assert_eq!(symbol.ty, "int");
    assert_eq!(symbol.index, 0);
  }
}
