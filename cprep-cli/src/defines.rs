//! Turns `-D NAME[=VALUE]` command-line flags into object-like macro
//! definitions, by running the replacement text through the same lexer the
//! engine itself uses so the predefined macros are made of real tokens
//! rather than a single synthetic string.

use cprep_foundation::source::StringInputStream;
use cprep_lexer::{Lexer, Token, TokenKind};

/// Splits `NAME` or `NAME=VALUE` into a macro name and its replacement
/// token list (empty, meaning "defined as 1-less-empty-replacement", when
/// no `=VALUE` is given — matching `cpp -DFOO`'s behavior of predefining
/// `FOO` as `1`).
pub fn parse_define_flag(flag: &str) -> (String, Vec<Token>) {
    match flag.split_once('=') {
        Some((name, value)) => (name.to_string(), tokenize(value)),
        None => (flag.to_string(), tokenize("1")),
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(Box::new(StringInputStream::new(text)));
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next();
        if token.kind == TokenKind::EndOfFile {
            break;
        }
        tokens.push(token);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_defines_as_one() {
        let (name, replacement) = parse_define_flag("FOO");
        assert_eq!(name, "FOO");
        assert_eq!(replacement.len(), 1);
        assert_eq!(replacement[0].lexeme, "1");
    }

    #[test]
    fn name_equals_value_tokenizes_the_value() {
        let (name, replacement) = parse_define_flag("WIDTH=640");
        assert_eq!(name, "WIDTH");
        assert_eq!(replacement.len(), 1);
        assert_eq!(replacement[0].kind, TokenKind::Number);
        assert_eq!(replacement[0].lexeme, "640");
    }

    #[test]
    fn replacement_does_not_pick_up_a_trailing_newline_token() {
        // `tokenize` lexes the value text as a standalone, unterminated
        // source; it must not carry a synthetic trailing `NewLine` token
        // into the macro's replacement list.
        let (_, replacement) = parse_define_flag("WIDTH=640");
        assert!(!replacement.iter().any(|t| t.kind == TokenKind::NewLine));
    }
}
