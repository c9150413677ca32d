//! Expansion rewriter (C4) support types: the "painted blue" token wrapper
//! that carries a macro-expansion recursion guard with each token, and the
//! stringize helper. The stateful splicing algorithm itself lives on
//! [`crate::engine::Engine`], since it needs the include stack and the
//! pending-token queue.

use std::collections::HashSet;
use std::rc::Rc;

use cprep_lexer::{Token, TokenKind};

/// Caps the number of distinct macro names that can stack up in a single
/// token's disabled-set before the engine gives up and reports an
/// expansion-depth overflow. Ordinary recursive macros never hit this: a
/// macro that invokes itself is caught immediately once its own name enters
/// its disabled set. This cap only guards against pathological long chains
/// of distinct macros (`A` expands to `B` expands to `C` ...).
pub const MAX_EXPANSION_DEPTH: usize = 200;

/// A token paired with the set of macro names that must not be re-expanded
/// while processing it ("painted blue", in preprocessor folklore). A token
/// fresh from the lexer carries an empty set; each time it is produced by
/// splicing a macro's replacement list, the macro's own name is added to the
/// set. This is what lets `#define A 1` expand correctly everywhere it's
/// used, while `#define A A` or mutual cycles like `#define X Y` / `#define
/// Y X` terminate rather than looping forever.
#[derive(Debug, Clone)]
pub struct PendingToken {
    pub token: Token,
    pub blocked: Rc<HashSet<String>>,
}

impl PendingToken {
    pub fn fresh(token: Token) -> Self {
        Self {
            token,
            blocked: Rc::new(HashSet::new()),
        }
    }

    /// Returns a copy of this token painted with an additional blocked name,
    /// sharing the underlying set when the name is already present.
    pub fn paint(&self, name: &str) -> Rc<HashSet<String>> {
        if self.blocked.contains(name) {
            Rc::clone(&self.blocked)
        } else {
            let mut set = (*self.blocked).clone();
            set.insert(name.to_string());
            Rc::new(set)
        }
    }

    pub fn is_blocked_for_itself(&self) -> bool {
        self.blocked.contains(&self.token.lexeme)
    }
}

/// Builds the raw text of the `#` stringize operator applied to one
/// macro argument's token list.
///
/// This deliberately diverges from classical C: the result is emitted as
/// raw, unquoted text rather than a quoted string literal (see DESIGN.md).
/// Adjacent non-whitespace tokens are joined with a single space; the
/// argument's own leading and trailing whitespace is trimmed.
pub fn stringize(argument: &[PendingToken]) -> String {
    let mut out = String::new();
    let mut need_space = false;
    for pt in argument {
        if pt.token.is_whitespace_like() {
            need_space = !out.is_empty();
            continue;
        }
        if need_space {
            out.push(' ');
        }
        out.push_str(&pt.token.lexeme);
        need_space = false;
    }
    out
}

/// Trims leading and trailing whitespace/newline tokens from a captured
/// macro argument.
pub fn trim_argument(mut tokens: Vec<PendingToken>) -> Vec<PendingToken> {
    while matches!(tokens.first(), Some(pt) if pt.token.is_whitespace_like()) {
        tokens.remove(0);
    }
    while matches!(tokens.last(), Some(pt) if pt.token.is_whitespace_like()) {
        tokens.pop();
    }
    tokens
}

/// Wraps a piece of macro-generated raw text (the stringize result) as a
/// `Generated` token so the expansion rewriter never treats it as an
/// identifier eligible for further macro lookup.
pub fn generated_token(text: impl Into<String>, line: u32) -> Token {
    Token::new(TokenKind::Generated, text, line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(kind: TokenKind, lexeme: &str) -> PendingToken {
        PendingToken::fresh(Token::new(kind, lexeme, 1))
    }

    #[test]
    fn stringize_joins_with_single_spaces_and_trims_ends() {
        let arg = vec![
            pt(TokenKind::Whitespace, " "),
            pt(TokenKind::Ident, "Hello"),
            pt(TokenKind::Whitespace, " "),
            pt(TokenKind::Ident, "World"),
            pt(TokenKind::Whitespace, " "),
        ];
        assert_eq!(stringize(&arg), "Hello World");
    }

    #[test]
    fn paint_is_idempotent_for_an_already_blocked_name() {
        let base = pt(TokenKind::Ident, "X");
        let once = PendingToken {
            token: base.token.clone(),
            blocked: base.paint("FOO"),
        };
        let twice = once.paint("FOO");
        assert!(Rc::ptr_eq(&once.blocked, &twice));
    }
}
