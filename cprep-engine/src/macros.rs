use std::collections::HashMap;

use cprep_lexer::Token;

/// Whether a macro takes a parenthesized parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    /// `#define NAME replacement...`
    Object,
    /// `#define NAME(params...) replacement...`
    Function,
}

/// A single entry in the [`MacroTable`]: the macro's kind, its parameter
/// names (empty for object-like macros), and its replacement token list.
#[derive(Debug, Clone)]
pub struct Definition {
    pub kind: MacroKind,
    pub parameters: Vec<String>,
    pub replacement: Vec<Token>,
}

impl Definition {
    pub fn object(replacement: Vec<Token>) -> Self {
        Self {
            kind: MacroKind::Object,
            parameters: Vec::new(),
            replacement,
        }
    }

    pub fn function(parameters: Vec<String>, replacement: Vec<Token>) -> Self {
        Self {
            kind: MacroKind::Function,
            parameters,
            replacement,
        }
    }
}

/// Maps macro names to their definitions (C3).
///
/// Names are matched case-sensitively, since C macro names are
/// case-sensitive identifiers, so a plain `HashMap<String, _>` is the right
/// tool here (see DESIGN.md).
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    definitions: HashMap<String, Definition>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a macro definition. The source does not diagnose
    /// mismatched redefinition; redefining simply replaces the entry.
    pub fn define(&mut self, name: impl Into<String>, definition: Definition) {
        let name = name.into();
        tracing::debug!(name = %name, kind = ?definition.kind, "defining macro");
        self.definitions.insert(name, definition);
    }

    /// Removes a macro if present; a no-op otherwise.
    pub fn undef(&mut self, name: &str) {
        if self.definitions.remove(name).is_some() {
            tracing::debug!(name, "undefining macro");
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }
}
