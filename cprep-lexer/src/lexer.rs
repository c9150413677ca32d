use cprep_foundation::{errors::PreprocessorError, source::InputStream};
use tracing::debug;

use crate::token::{Token, TokenKind};

/// Line-oriented lexer (C2). Produces tokens lazily and never backtracks
/// beyond one token of peek.
///
/// The lexer owns its [`InputStream`], which is how `#include` is
/// implemented: the engine pushes a fresh `Lexer` wrapping a new stream onto
/// its include stack and pops it again once that stream reaches
/// end-of-file, rather than aliasing a borrowed stream (a deliberate
/// improvement over the source this was distilled from, see DESIGN.md).
pub struct Lexer {
    input: Box<dyn InputStream>,
    buf: Vec<char>,
    pos: usize,
    line: u32,
    at_eof: bool,
    peeked: Option<Token>,
    /// Lexical errors accumulated since the last drain, e.g. unterminated
    /// string literals or block comments.
    pub errors: Vec<PreprocessorError>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Lexer {
    pub fn new(input: Box<dyn InputStream>) -> Self {
        let mut lexer = Self {
            input,
            buf: Vec::new(),
            pos: 0,
            line: 0,
            at_eof: false,
            peeked: None,
            errors: Vec::new(),
        };
        lexer.pull_line();
        lexer
    }

    /// Pulls the next physical line from the input stream into `buf`,
    /// advancing `line`. Sets `at_eof` once the stream is exhausted.
    fn pull_line(&mut self) {
        match self.input.read_line() {
            Some(line) => {
                self.buf = line.chars().collect();
                self.pos = 0;
                self.line += 1;
            }
            None => {
                self.buf.clear();
                self.pos = 0;
                self.at_eof = true;
            }
        }
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.buf.get(self.pos + offset).copied()
    }

    /// Peeks the next raw character in the current line without tokenizing
    /// it. Only meaningful when no token has been peeked yet (callers that
    /// want to switch into header-name mode must check this before calling
    /// [`Lexer::peek`] or [`Lexer::next`]).
    pub fn peek_raw_char(&self) -> Option<char> {
        self.peek_char(0)
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Returns a reference to the next token without consuming it.
    pub fn peek(&mut self) -> &Token {
        if self.peeked.is_none() {
            let token = self.raw_next();
            self.peeked = Some(token);
        }
        self.peeked.as_ref().expect("just inserted")
    }

    /// Consumes and returns the next token.
    pub fn next(&mut self) -> Token {
        self.peeked.take().unwrap_or_else(|| self.raw_next())
    }

    fn raw_next(&mut self) -> Token {
        loop {
            if self.pos >= self.buf.len() {
                if self.at_eof {
                    return Token::end_of_file(self.line);
                }
                let newline_line = self.line;
                self.pull_line();
                if self.at_eof {
                    // The line just consumed was the last one and had no
                    // newline of its own in the source (the input stream
                    // ran out rather than handing back another, possibly
                    // empty, line) — don't manufacture one.
                    return Token::end_of_file(newline_line);
                }
                return Token::new(TokenKind::NewLine, "\n", newline_line);
            }

            let c = self.buf[self.pos];
            match c {
                ' ' | '\t' => return self.scan_whitespace(),
                '/' if self.peek_char(1) == Some('/') => {
                    self.skip_line_comment();
                    continue;
                }
                '/' if self.peek_char(1) == Some('*') => return self.scan_block_comment(),
                '"' => return self.scan_string_literal(),
                c if is_ident_start(c) => return self.scan_identifier(),
                c if c.is_ascii_digit() => return self.scan_number(),
                '#' => return self.single_char_token(TokenKind::Hash),
                '(' => return self.single_char_token(TokenKind::LeftParen),
                ')' => return self.single_char_token(TokenKind::RightParen),
                ',' => return self.single_char_token(TokenKind::Comma),
                other => {
                    self.pos += 1;
                    return Token::new(TokenKind::Punct, other.to_string(), self.line);
                }
            }
        }
    }

    fn single_char_token(&mut self, kind: TokenKind) -> Token {
        let c = self.buf[self.pos];
        self.pos += 1;
        Token::new(kind, c.to_string(), self.line)
    }

    fn scan_whitespace(&mut self) -> Token {
        let start = self.pos;
        let line = self.line;
        while matches!(self.peek_char(0), Some(' ') | Some('\t')) {
            self.pos += 1;
        }
        let lexeme: String = self.buf[start..self.pos].iter().collect();
        Token::new(TokenKind::Whitespace, lexeme, line)
    }

    fn skip_line_comment(&mut self) {
        // Consumed up to but not including the newline; the newline itself
        // is produced by the ordinary end-of-line handling in `raw_next`.
        self.pos = self.buf.len();
    }

    /// Consumes a `/* ... */` block comment, which may span multiple
    /// physical lines, collapsing it into a single whitespace token.
    fn scan_block_comment(&mut self) -> Token {
        let start_line = self.line;
        self.pos += 2; // skip `/*`
        loop {
            if self.pos >= self.buf.len() {
                if self.at_eof {
                    debug!(line = start_line, "unterminated block comment");
                    self.errors.push(PreprocessorError::LexError {
                        line: start_line,
                        lexeme: "/*".to_string(),
                    });
                    break;
                }
                self.pull_line();
                continue;
            }
            if self.peek_char(0) == Some('*') && self.peek_char(1) == Some('/') {
                self.pos += 2;
                break;
            }
            self.pos += 1;
        }
        Token::new(TokenKind::Whitespace, " ", start_line)
    }

    fn scan_string_literal(&mut self) -> Token {
        let start = self.pos;
        let line = self.line;
        self.pos += 1; // opening quote
        while let Some(c) = self.peek_char(0) {
            self.pos += 1;
            if c == '"' {
                let lexeme: String = self.buf[start..self.pos].iter().collect();
                return Token::new(TokenKind::StringLit, lexeme, line);
            }
        }
        debug!(line, "unterminated string literal");
        self.errors.push(PreprocessorError::LexError {
            line,
            lexeme: "unterminated string literal".to_string(),
        });
        let lexeme: String = self.buf[start..self.pos].iter().collect();
        Token::new(TokenKind::StringLit, lexeme, line)
    }

    /// Lexes an angle-delimited header name (`<path>`), valid only right
    /// after `#include`. Callers must have checked [`Lexer::peek_raw_char`]
    /// is `Some('<')` and must not have peeked an ordinary token yet.
    pub fn next_angle_string(&mut self) -> Token {
        debug_assert!(self.peeked.is_none());
        let start = self.pos;
        let line = self.line;
        self.pos += 1; // opening `<`
        while let Some(c) = self.peek_char(0) {
            self.pos += 1;
            if c == '>' {
                let lexeme: String = self.buf[start..self.pos].iter().collect();
                return Token::new(TokenKind::AngleString, lexeme, line);
            }
        }
        debug!(line, "unterminated header name");
        self.errors.push(PreprocessorError::LexError {
            line,
            lexeme: "unterminated header name".to_string(),
        });
        let lexeme: String = self.buf[start..self.pos].iter().collect();
        Token::new(TokenKind::AngleString, lexeme, line)
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        let line = self.line;
        while matches!(self.peek_char(0), Some(c) if is_ident_continue(c)) {
            self.pos += 1;
        }
        let lexeme: String = self.buf[start..self.pos].iter().collect();
        Token::new(TokenKind::Ident, lexeme, line)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        let line = self.line;
        while matches!(self.peek_char(0), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        let lexeme: String = self.buf[start..self.pos].iter().collect();
        Token::new(TokenKind::Number, lexeme, line)
    }
}

#[cfg(test)]
mod tests {
    use cprep_foundation::source::StringInputStream;

    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(Box::new(StringInputStream::new(source)));
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next();
            let done = token.kind == TokenKind::EndOfFile;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    #[test]
    fn lexes_identifiers_and_numbers() {
        let tokens = lex_all("foo_1 42");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].lexeme, "foo_1");
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[2].lexeme, "42");
    }

    #[test]
    fn collapses_block_comments_spanning_lines_into_one_whitespace_token() {
        let tokens = lex_all("a/* one\ntwo\nthree */b");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident,
                TokenKind::Whitespace,
                TokenKind::Ident,
                TokenKind::EndOfFile
            ]
        );
        assert_eq!(tokens[3].line, 3);
    }

    #[test]
    fn line_comments_are_dropped_without_consuming_the_newline() {
        let tokens = lex_all("a // comment\nb");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident,
                TokenKind::Whitespace,
                TokenKind::NewLine,
                TokenKind::Ident,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lexer = Lexer::new(Box::new(StringInputStream::new("abc")));
        assert_eq!(lexer.peek().lexeme, "abc");
        assert_eq!(lexer.peek().lexeme, "abc");
        assert_eq!(lexer.next().lexeme, "abc");
    }

    #[test]
    fn angle_string_only_lexed_on_demand() {
        let mut lexer = Lexer::new(Box::new(StringInputStream::new("<system>")));
        assert_eq!(lexer.peek_raw_char(), Some('<'));
        let token = lexer.next_angle_string();
        assert_eq!(token.kind, TokenKind::AngleString);
        assert_eq!(token.lexeme, "<system>");
    }

    #[test]
    fn line_numbers_increase_monotonically() {
        let tokens = lex_all("a\nb\nc");
        let idents: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.line)
            .collect();
        assert_eq!(idents, vec![1, 2, 3]);
    }

    #[test]
    fn source_without_a_trailing_newline_does_not_gain_a_synthetic_one() {
        let tokens = lex_all("a\nb\nc");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ident,
                TokenKind::NewLine,
                TokenKind::Ident,
                TokenKind::NewLine,
                TokenKind::Ident,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn source_with_a_trailing_newline_keeps_exactly_that_one_newline() {
        let tokens = lex_all("a\n");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::NewLine, TokenKind::EndOfFile]);
    }
}
