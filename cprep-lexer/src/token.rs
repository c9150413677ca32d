use std::fmt;

/// Passes all the token kinds as a sequence of `Kind = "pretty name",` into
/// the provided macro, keeping the enum and its `Display` impl in lockstep.
#[macro_export]
macro_rules! expand_tokens {
    ($x:path) => {
        $x! {
            Ident      = "identifier",
            Number     = "number",
            StringLit  = "string literal",
            AngleString = "angle-delimited header name",

            Hash       = "`#`",
            LeftParen  = "`(`",
            RightParen = "`)`",
            Comma      = "`,`",
            Punct      = "punctuator",

            Whitespace = "whitespace",
            NewLine    = "newline",
            EndOfFile  = "end of file",

            Generated  = "macro output",
        }
    };
}

macro_rules! token_kind_enum {
    ($($name:tt = $pretty_name:tt),* $(,)?) => {
        /// The classification a [`Token`] carries, per the lexer's
        /// classification rules.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum TokenKind {
            $($name),*
        }

        impl TokenKind {
            pub fn name(&self) -> &'static str {
                match self {
                    $(TokenKind::$name => $pretty_name),*
                }
            }
        }
    }
}

expand_tokens!(token_kind_enum);

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TokenKind {
    /// Whether tokens of this kind ordinarily reach the output (as opposed to
    /// being pure structure, like end-of-file).
    pub fn is_emittable(&self) -> bool {
        !matches!(self, TokenKind::EndOfFile)
    }
}

/// A single lexical token: its classification, the exact source text it came
/// from, and the 1-based physical line it started on.
///
/// Tokens are produced by the lexer and flow through the engine immutably;
/// macro expansion only ever copies them into new, owned `Vec<Token>`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
        }
    }

    pub fn end_of_file(line: u32) -> Self {
        Self::new(TokenKind::EndOfFile, "", line)
    }

    pub fn is_whitespace_like(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::NewLine)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} @ line {}", self.kind, self.lexeme, self.line)
    }
}
