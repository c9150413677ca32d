//! Directive dispatcher and engine loop (C6), wiring the lexer (C2), macro
//! table (C3), expansion rewriter (C4) and conditional state machine (C5)
//! into a single pass over the input (and any files it `#include`s).

use std::collections::VecDeque;
use std::rc::Rc;

use cprep_foundation::errors::{DiagnosticSink, IncludeKind, PreprocessorError};
use cprep_foundation::source::InputStream;
use cprep_lexer::{Lexer, Token, TokenKind};

use crate::conditional::ConditionalStack;
use crate::expand::{generated_token, stringize, trim_argument, PendingToken, MAX_EXPANSION_DEPTH};
use crate::macros::{Definition, MacroKind, MacroTable};

/// Caps the include stack depth, guarding against a file that (directly or
/// through a cycle of `#include`s) ends up including itself.
const MAX_INCLUDE_DEPTH: usize = 200;

/// Resolves the path argument of an `#include` directive to a fresh input
/// stream. Concrete search-path behaviour (working directory, `-I` flags,
/// system include directories) belongs to whoever implements this trait —
/// the core engine only knows how to ask for a path and splice in whatever
/// comes back.
pub trait IncludeResolver {
    fn resolve(&mut self, path: &str, kind: IncludeKind) -> Option<Box<dyn InputStream>>;
}

/// An [`IncludeResolver`] that never resolves anything, for embedders who
/// don't support `#include` at all (every include then reports
/// [`PreprocessorError::IncludeUnresolved`]).
#[derive(Debug, Default)]
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&mut self, _path: &str, _kind: IncludeKind) -> Option<Box<dyn InputStream>> {
        None
    }
}

/// The preprocessing engine (C6): owns the macro table, the conditional
/// stack, the include stack of [`Lexer`]s, and the pending-token queue the
/// expansion rewriter splices macro output into.
pub struct Engine {
    macros: MacroTable,
    conditionals: ConditionalStack,
    lexers: Vec<Lexer>,
    pending: VecDeque<PendingToken>,
    resolver: Box<dyn IncludeResolver>,
    errors: Vec<PreprocessorError>,
}

impl Engine {
    pub fn new(root: Box<dyn InputStream>, resolver: Box<dyn IncludeResolver>) -> Self {
        Self {
            macros: MacroTable::new(),
            conditionals: ConditionalStack::new(),
            lexers: vec![Lexer::new(root)],
            pending: VecDeque::new(),
            resolver,
            errors: Vec::new(),
        }
    }

    /// Predefines an object-like macro before processing begins, the way a
    /// CLI's `-D NAME=VALUE` flags are wired in.
    pub fn define_object_macro(&mut self, name: impl Into<String>, replacement: Vec<Token>) {
        self.macros.define(name, Definition::object(replacement));
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Runs the engine to completion, returning the fully expanded,
    /// directive-free output text. Non-fatal problems are reported through
    /// `diagnostics` as they're found; the engine keeps going regardless.
    pub fn process(&mut self, diagnostics: &mut dyn DiagnosticSink) -> String {
        let mut output = String::new();
        loop {
            if !self.ensure_live_lexer() {
                break;
            }

            if self.is_directive_line() {
                self.process_directive_line();
                continue;
            }

            if !self.conditionals.is_emitting() {
                self.next_raw_pending();
                continue;
            }

            let token = self.next_expanded();
            if token.kind.is_emittable() {
                output.push_str(&token.lexeme);
            }
        }

        if self.conditionals.depth() > 0 {
            self.errors.push(PreprocessorError::ConditionalImbalance {
                line: self.current_line(),
                reason: "unterminated #if at end of input".to_string(),
            });
        }

        for error in self.errors.drain(..) {
            diagnostics.emit((&error).into());
        }

        output
    }

    fn current_line(&self) -> u32 {
        self.lexers.last().map(|lexer| lexer.line()).unwrap_or(0)
    }

    /// Pops include-stack frames that have run out of input; returns `false`
    /// once the whole stack (including the root) is exhausted.
    fn ensure_live_lexer(&mut self) -> bool {
        loop {
            let Some(lexer) = self.lexers.last_mut() else {
                return false;
            };
            if lexer.peek().kind == TokenKind::EndOfFile {
                if self.lexers.len() > 1 {
                    self.lexers.pop();
                    continue;
                }
                return false;
            }
            return true;
        }
    }

    /// Every raw token pull in the engine funnels through here.
    fn next_raw_pending(&mut self) -> PendingToken {
        match self.pending.pop_front() {
            Some(pt) => pt,
            None => {
                let token = self.pull_from_lexer_stack();
                PendingToken::fresh(token)
            }
        }
    }

    fn pull_from_lexer_stack(&mut self) -> Token {
        loop {
            let lexer = self
                .lexers
                .last_mut()
                .expect("ensure_live_lexer checked a frame exists");
            let token = lexer.next();
            if !lexer.errors.is_empty() {
                self.errors.append(&mut lexer.errors);
            }
            if token.kind == TokenKind::EndOfFile && self.lexers.len() > 1 {
                self.lexers.pop();
                continue;
            }
            return token;
        }
    }

    fn push_front_preserving_order(&mut self, tokens: Vec<PendingToken>) {
        for pt in tokens.into_iter().rev() {
            self.pending.push_front(pt);
        }
    }

    /// True when the next raw token is `#`. Recognition does not require
    /// column zero: a directive that terminates a line shared with earlier
    /// active content (e.g. `else block #endif` all on one physical line)
    /// is still recognised once that earlier content has already been
    /// pulled through the ordinary path. Restores the token to the pending
    /// queue when it isn't a `#`, since ordinary code keeps it.
    fn is_directive_line(&mut self) -> bool {
        if !self.pending.is_empty() {
            return false;
        }
        let pt = self.next_raw_pending();
        let is_hash = pt.token.kind == TokenKind::Hash;
        if !is_hash {
            self.pending.push_front(pt);
        }
        is_hash
    }

    /// Discards raw tokens up to and including the line's terminating
    /// newline (or up to, but not past, end of file).
    fn skip_to_eol(&mut self) {
        loop {
            let kind = match self.lexers.last_mut() {
                Some(lexer) if self.pending.is_empty() => lexer.peek().kind,
                _ => match self.pending.front() {
                    Some(pt) => pt.token.kind,
                    None => TokenKind::EndOfFile,
                },
            };
            if kind == TokenKind::EndOfFile {
                return;
            }
            let pt = self.next_raw_pending();
            if pt.token.kind == TokenKind::NewLine {
                return;
            }
        }
    }

    /// Skips whitespace (not newlines) and returns the next significant
    /// token, still to be consumed by the caller.
    fn skip_inline_whitespace(&mut self) -> PendingToken {
        loop {
            let pt = self.next_raw_pending();
            if pt.token.kind != TokenKind::Whitespace {
                return pt;
            }
        }
    }

    fn report(&mut self, error: PreprocessorError) {
        self.errors.push(error);
    }
}

/// # Directive dispatch (C6)
impl Engine {
    fn process_directive_line(&mut self) {
        debug_assert!(self.pending.is_empty() || self.pending.front().map(|p| p.token.kind) != Some(TokenKind::Hash));
        let hash_line = self.current_line();
        let pt = self.skip_inline_whitespace();
        let name = match pt.token.kind {
            TokenKind::Ident => pt.token.lexeme.clone(),
            TokenKind::NewLine | TokenKind::EndOfFile => {
                // A bare `#` on its own line is the null directive: legal, no-op.
                return;
            }
            _ => {
                self.report(PreprocessorError::DirectiveSyntax {
                    line: hash_line,
                    directive: pt.token.lexeme.clone(),
                    reason: "expected a directive name after '#'".to_string(),
                });
                self.skip_to_eol();
                return;
            }
        };

        let emitting = self.conditionals.is_emitting();
        match name.as_str() {
            "define" if emitting => {
                // `collect_replacement_tokens` (called from `parse_define`)
                // already consumes the directive's own terminating
                // `NewLine`/`EndOfFile` token while reading the replacement
                // list, so the common `skip_to_eol` below must not run
                // again here — it would otherwise eat the whole of the
                // following physical line.
                self.parse_define(hash_line);
                return;
            }
            "undef" if emitting => self.parse_undef(),
            "include" if emitting => {
                // `parse_include` discards the rest of the include line
                // itself, before (not after) pushing the included file's
                // lexer, so the common `skip_to_eol` below must not run a
                // second time against what is now the included file.
                self.parse_include(hash_line);
                return;
            }
            "define" | "undef" | "include" => {}
            "if" => {
                let predicate = self.parse_if_predicate(hash_line);
                self.conditionals.push(predicate);
            }
            "ifdef" => {
                let defined = self.parse_defined_name();
                self.conditionals.push(defined);
            }
            "ifndef" => {
                let defined = self.parse_defined_name();
                self.conditionals.push(!defined);
            }
            "elif" => {
                let predicate = self.parse_if_predicate(hash_line);
                if self.conditionals.elif(predicate).is_err() {
                    self.report(PreprocessorError::ConditionalImbalance {
                        line: hash_line,
                        reason: "#elif with no matching #if, or after #else".to_string(),
                    });
                }
            }
            "else" => {
                if self.conditionals.else_branch().is_err() {
                    self.report(PreprocessorError::ConditionalImbalance {
                        line: hash_line,
                        reason: "#else with no matching #if, or a second #else".to_string(),
                    });
                }
                // Unlike every other directive, `#else`'s own terminating
                // newline is left for the ordinary token path rather than
                // discarded here, so it is emitted exactly when the branch
                // it opens is active (see DESIGN.md).
                return;
            }
            "endif" => {
                if self.conditionals.endif().is_err() {
                    self.report(PreprocessorError::ConditionalImbalance {
                        line: hash_line,
                        reason: "#endif with no matching #if".to_string(),
                    });
                }
            }
            // `#pragma`, `#error`, `#line` and any other directive name are
            // silently accepted but have no effect: the engine does not
            // implement pragma semantics, error directives or line control.
            _ => {}
        }
        self.skip_to_eol();
    }

    fn parse_define(&mut self, line: u32) {
        let name_pt = self.skip_inline_whitespace();
        let Some(name) = ident_lexeme(&name_pt) else {
            self.report(PreprocessorError::DirectiveSyntax {
                line,
                directive: "define".to_string(),
                reason: "expected a macro name".to_string(),
            });
            return;
        };

        // No whitespace token between the name and `(` means function-like;
        // checking the lexer's very next token (before consuming any
        // whitespace) encodes that directly.
        let is_function_like = self
            .pending
            .front()
            .map(|pt| pt.token.kind == TokenKind::LeftParen)
            .unwrap_or_else(|| {
                self.lexers
                    .last_mut()
                    .map(|lexer| lexer.peek().kind == TokenKind::LeftParen)
                    .unwrap_or(false)
            });

        let parameters = if is_function_like {
            self.next_raw_pending(); // consume `(`
            match self.parse_parameter_list(line) {
                Some(parameters) => parameters,
                None => return,
            }
        } else {
            Vec::new()
        };

        let replacement = self.collect_replacement_tokens();
        let definition = if is_function_like {
            Definition::function(parameters, replacement)
        } else {
            Definition::object(replacement)
        };
        self.macros.define(name, definition);
    }

    fn parse_parameter_list(&mut self, line: u32) -> Option<Vec<String>> {
        let mut parameters = Vec::new();
        loop {
            let pt = self.skip_inline_whitespace();
            match pt.token.kind {
                TokenKind::RightParen if parameters.is_empty() => return Some(parameters),
                TokenKind::Ident => {
                    parameters.push(pt.token.lexeme.clone());
                    let next = self.skip_inline_whitespace();
                    match next.token.kind {
                        TokenKind::Comma => continue,
                        TokenKind::RightParen => return Some(parameters),
                        _ => {
                            self.report(PreprocessorError::DirectiveSyntax {
                                line,
                                directive: "define".to_string(),
                                reason: "expected ',' or ')' in parameter list".to_string(),
                            });
                            return None;
                        }
                    }
                }
                _ => {
                    self.report(PreprocessorError::DirectiveSyntax {
                        line,
                        directive: "define".to_string(),
                        reason: "expected a parameter name".to_string(),
                    });
                    return None;
                }
            }
        }
    }

    /// Reads the rest of the directive line verbatim (no expansion) as the
    /// macro's replacement list, trimming a single leading/trailing run of
    /// whitespace but preserving internal whitespace tokens.
    fn collect_replacement_tokens(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let pt = self.next_raw_pending();
            if matches!(pt.token.kind, TokenKind::NewLine | TokenKind::EndOfFile) {
                break;
            }
            tokens.push(pt.token);
        }
        while matches!(tokens.first(), Some(t) if t.is_whitespace_like()) {
            tokens.remove(0);
        }
        while matches!(tokens.last(), Some(t) if t.is_whitespace_like()) {
            tokens.pop();
        }
        tokens
    }

    fn parse_undef(&mut self) {
        let pt = self.skip_inline_whitespace();
        if let Some(name) = ident_lexeme(&pt) {
            self.macros.undef(&name);
        }
    }

    fn parse_include(&mut self, line: u32) {
        let (path, kind) = match self.next_include_path() {
            Some(result) => result,
            None => {
                self.report(PreprocessorError::DirectiveSyntax {
                    line,
                    directive: "include".to_string(),
                    reason: "expected \"path\" or <path>".to_string(),
                });
                self.skip_to_eol();
                return;
            }
        };

        // Discard the rest of this line (on the *including* file's lexer)
        // before possibly pushing the included file's lexer on top of it;
        // see the caller's note on why this can't happen afterwards.
        self.skip_to_eol();

        if self.lexers.len() >= MAX_INCLUDE_DEPTH {
            self.report(PreprocessorError::DirectiveSyntax {
                line,
                directive: "include".to_string(),
                reason: format!("include depth limit ({MAX_INCLUDE_DEPTH}) exceeded"),
            });
            return;
        }

        match self.resolver.resolve(&path, kind) {
            Some(stream) => self.lexers.push(Lexer::new(stream)),
            None => self.report(PreprocessorError::IncludeUnresolved { line, path, kind }),
        }
    }

    /// Skips inline whitespace and reads the `#include` path. A quoted path
    /// arrives as an ordinary [`TokenKind::StringLit`]; an angle-delimited
    /// one is switched into the lexer's dedicated header-name mode
    /// ([`Lexer::next_angle_string`]) while its leading `<` is still raw, so
    /// it's never tokenized as a plain punctuator first.
    fn next_include_path(&mut self) -> Option<(String, IncludeKind)> {
        loop {
            if self.pending.is_empty() {
                if let Some(lexer) = self.lexers.last_mut() {
                    if lexer.peek_raw_char() == Some('<') {
                        let token = lexer.next_angle_string();
                        if !lexer.errors.is_empty() {
                            self.errors.append(&mut lexer.errors);
                        }
                        return Some((strip_ends(&token.lexeme), IncludeKind::System));
                    }
                }
            }
            let pt = self.next_raw_pending();
            return match pt.token.kind {
                TokenKind::Whitespace => continue,
                TokenKind::StringLit => Some((strip_ends(&pt.token.lexeme), IncludeKind::Local)),
                TokenKind::AngleString => Some((strip_ends(&pt.token.lexeme), IncludeKind::System)),
                _ => {
                    self.pending.push_front(pt);
                    None
                }
            };
        }
    }

    fn parse_defined_name(&mut self) -> bool {
        let pt = self.skip_inline_whitespace();
        match ident_lexeme(&pt) {
            Some(name) => self.macros.defined(&name),
            None => false,
        }
    }

    /// The minimal `#if`/`#elif` predicate grammar supported: a bare
    /// integer literal (C truthiness), or `defined NAME` / `defined(NAME)`,
    /// or a bare identifier treated the same as `defined(NAME)`. No general
    /// arithmetic or boolean operators are supported (see DESIGN.md).
    fn parse_if_predicate(&mut self, line: u32) -> bool {
        let pt = self.skip_inline_whitespace();
        match pt.token.kind {
            TokenKind::Number => pt.token.lexeme.parse::<i64>().unwrap_or(0) != 0,
            TokenKind::Ident if pt.token.lexeme == "defined" => {
                let next = self.skip_inline_whitespace();
                let has_parens = next.token.kind == TokenKind::LeftParen;
                let name_pt = if has_parens {
                    self.skip_inline_whitespace()
                } else {
                    next
                };
                let Some(name) = ident_lexeme(&name_pt) else {
                    self.report(PreprocessorError::DirectiveSyntax {
                        line,
                        directive: "if".to_string(),
                        reason: "expected a macro name after 'defined'".to_string(),
                    });
                    return false;
                };
                if has_parens {
                    let close = self.skip_inline_whitespace();
                    if close.token.kind != TokenKind::RightParen {
                        self.report(PreprocessorError::DirectiveSyntax {
                            line,
                            directive: "if".to_string(),
                            reason: "expected ')' after defined(NAME".to_string(),
                        });
                    }
                }
                self.macros.defined(&name)
            }
            TokenKind::Ident => self.macros.defined(&pt.token.lexeme),
            _ => {
                self.report(PreprocessorError::DirectiveSyntax {
                    line,
                    directive: "if".to_string(),
                    reason: "expected an integer literal, identifier, or defined(NAME)".to_string(),
                });
                false
            }
        }
    }
}

/// # Expansion rewriter (C4)
impl Engine {
    /// Pulls and fully expands the next output token, splicing macro
    /// replacements into the pending queue and looping until something
    /// terminal (not eligible for further expansion) comes out.
    fn next_expanded(&mut self) -> Token {
        loop {
            let pt = self.next_raw_pending();
            if pt.token.kind != TokenKind::Ident {
                return pt.token;
            }
            if pt.token.lexeme == "__LINE__" {
                return generated_token(pt.token.line.to_string(), pt.token.line);
            }
            if pt.is_blocked_for_itself() {
                return pt.token;
            }
            let Some(definition) = self.macros.lookup(&pt.token.lexeme).cloned() else {
                return pt.token;
            };

            let blocked = pt.paint(&pt.token.lexeme);
            if blocked.len() > MAX_EXPANSION_DEPTH {
                self.report(PreprocessorError::ExpansionOverflow {
                    line: pt.token.line,
                    limit: MAX_EXPANSION_DEPTH,
                });
                return pt.token;
            }

            match definition.kind {
                MacroKind::Object => {
                    let spliced = definition
                        .replacement
                        .iter()
                        .map(|tok| PendingToken {
                            token: tok.clone(),
                            blocked: Rc::clone(&blocked),
                        })
                        .collect();
                    self.push_front_preserving_order(spliced);
                }
                MacroKind::Function => {
                    let Some((skipped, open_paren)) = self.peek_invocation_paren() else {
                        return pt.token;
                    };
                    let (arguments, raw) = self.parse_argument_list(pt.token.line);
                    if arguments.len() != definition.parameters.len() {
                        self.report(PreprocessorError::MacroArity {
                            line: pt.token.line,
                            name: pt.token.lexeme.clone(),
                            expected: definition.parameters.len(),
                            got: arguments.len(),
                        });
                        // Arity mismatch: expansion yields the original
                        // tokens rather than a best-effort splice, so
                        // restore the invocation exactly as read (the `(`
                        // plus every raw token parsed out of the argument
                        // list, commas and nested parens included) ahead of
                        // the cursor and emit the macro name unexpanded.
                        let mut restore = skipped;
                        restore.push(open_paren);
                        restore.extend(raw);
                        self.push_front_preserving_order(restore);
                        return pt.token;
                    }
                    let spliced = self.build_function_replacement(&pt.token, &blocked, &definition, &arguments);
                    self.push_front_preserving_order(spliced);
                }
            }
        }
    }

    /// Looks past whitespace (not newlines) for the `(` that turns a
    /// function-like macro name into an invocation. Restores whatever it
    /// peeked through if no invocation follows, so the identifier and any
    /// intervening whitespace flow through unchanged. On success, returns
    /// the whitespace skipped over and the `(` token itself, so a caller
    /// that later needs to restore the literal invocation (an arity
    /// mismatch) can do so exactly.
    fn peek_invocation_paren(&mut self) -> Option<(Vec<PendingToken>, PendingToken)> {
        let mut skipped = Vec::new();
        loop {
            let pt = self.next_raw_pending();
            match pt.token.kind {
                TokenKind::Whitespace => skipped.push(pt),
                TokenKind::LeftParen => return Some((skipped, pt)),
                _ => {
                    self.pending.push_front(pt);
                    self.push_front_preserving_order(skipped);
                    return None;
                }
                // `pt` was read after `skipped`, so it's pushed first and
                // `skipped` is prepended ahead of it to restore chronological
                // order at the front of the queue.
            }
        }
    }

    /// Parses the comma-separated, paren-balanced argument list following an
    /// already-consumed `(`. Arguments are not pre-expanded: any macro names
    /// inside them are expanded later, once substituted into the
    /// replacement list and re-read through [`Engine::next_expanded`].
    ///
    /// Also returns every token consumed while parsing (commas, nested
    /// parens, the terminating `)` included, but not a terminal
    /// end-of-file), so a caller that hits an arity mismatch can restore
    /// the invocation exactly as written instead of re-synthesizing it from
    /// the parsed argument lists.
    fn parse_argument_list(&mut self, line: u32) -> (Vec<Vec<PendingToken>>, Vec<PendingToken>) {
        let mut arguments = Vec::new();
        let mut current = Vec::new();
        let mut raw = Vec::new();
        let mut depth = 0i32;
        loop {
            let pt = self.next_raw_pending();
            match pt.token.kind {
                TokenKind::LeftParen => {
                    depth += 1;
                    raw.push(pt.clone());
                    current.push(pt);
                }
                TokenKind::RightParen if depth == 0 => {
                    raw.push(pt);
                    if !(arguments.is_empty() && current.is_empty()) {
                        arguments.push(trim_argument(current));
                    }
                    return (arguments, raw);
                }
                TokenKind::RightParen => {
                    depth -= 1;
                    raw.push(pt.clone());
                    current.push(pt);
                }
                TokenKind::Comma if depth == 0 => {
                    raw.push(pt);
                    arguments.push(trim_argument(std::mem::take(&mut current)));
                }
                TokenKind::EndOfFile => {
                    self.report(PreprocessorError::DirectiveSyntax {
                        line,
                        directive: "macro invocation".to_string(),
                        reason: "unterminated argument list".to_string(),
                    });
                    if !current.is_empty() {
                        arguments.push(trim_argument(current));
                    }
                    return (arguments, raw);
                }
                _ => {
                    raw.push(pt.clone());
                    current.push(pt);
                }
            }
        }
    }

    fn build_function_replacement(
        &self,
        invoker: &Token,
        blocked: &Rc<std::collections::HashSet<String>>,
        definition: &Definition,
        arguments: &[Vec<PendingToken>],
    ) -> Vec<PendingToken> {
        let mut out = Vec::new();
        let mut i = 0;
        let replacement = &definition.replacement;
        while i < replacement.len() {
            let tok = &replacement[i];
            if tok.kind == TokenKind::Hash {
                if let Some(next) = replacement.get(i + 1) {
                    if next.kind == TokenKind::Ident {
                        if let Some(index) = definition.parameters.iter().position(|p| p == &next.lexeme) {
                            let empty = Vec::new();
                            let argument = arguments.get(index).unwrap_or(&empty);
                            let text = stringize(argument);
                            out.push(PendingToken {
                                token: generated_token(text, invoker.line),
                                blocked: Rc::clone(blocked),
                            });
                            i += 2;
                            continue;
                        }
                    }
                }
            }
            if tok.kind == TokenKind::Ident {
                if let Some(index) = definition.parameters.iter().position(|p| p == &tok.lexeme) {
                    let empty = Vec::new();
                    let argument = arguments.get(index).unwrap_or(&empty);
                    for arg_token in argument {
                        let mut merged = (*arg_token.blocked).clone();
                        merged.extend(blocked.iter().cloned());
                        out.push(PendingToken {
                            token: arg_token.token.clone(),
                            blocked: Rc::new(merged),
                        });
                    }
                    i += 1;
                    continue;
                }
            }
            out.push(PendingToken {
                token: tok.clone(),
                blocked: Rc::clone(blocked),
            });
            i += 1;
        }
        out
    }
}

fn ident_lexeme(pt: &PendingToken) -> Option<String> {
    (pt.token.kind == TokenKind::Ident).then(|| pt.token.lexeme.clone())
}

fn strip_ends(lexeme: &str) -> String {
    let mut chars = lexeme.chars();
    chars.next();
    chars.next_back();
    chars.as_str().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use cprep_foundation::source::StringInputStream;

    use super::*;

    struct MapResolver {
        files: HashMap<String, String>,
    }

    impl IncludeResolver for MapResolver {
        fn resolve(&mut self, path: &str, _kind: IncludeKind) -> Option<Box<dyn InputStream>> {
            self.files
                .get(path)
                .map(|text| Box::new(StringInputStream::new(text.clone())) as Box<dyn InputStream>)
        }
    }

    fn run(source: &str) -> (String, Vec<String>) {
        let mut engine = Engine::new(Box::new(StringInputStream::new(source)), Box::new(NoIncludes));
        let mut diagnostics: Vec<cprep_foundation::errors::Diagnostic> = Vec::new();
        let output = engine.process(&mut diagnostics);
        (output, diagnostics.into_iter().map(|d| d.message).collect())
    }

    #[test]
    fn plain_text_passes_through_unchanged() {
        let (output, errors) = run("hello world\n");
        assert_eq!(output, "hello world\n");
        assert!(errors.is_empty());
    }

    #[test]
    fn object_like_macro_is_substituted_everywhere() {
        let (output, _) = run("#define GREETING hello\nGREETING, GREETING!\n");
        assert_eq!(output, "hello, hello!\n");
    }

    #[test]
    fn line_expands_to_current_physical_line_number() {
        let (output, _) = run("one\ntwo __LINE__\n");
        assert_eq!(output, "one\ntwo 2\n");
    }

    #[test]
    fn stringize_produces_unquoted_raw_text() {
        let (output, _) = run("#define STR(Name) #Name\nSTR(Hello World)\n");
        assert_eq!(output, "Hello World\n");
    }

    #[test]
    fn function_like_macro_substitutes_arguments() {
        let (output, _) = run("#define ADD(A, B) A + B\nADD(2, 3)\n");
        assert_eq!(output, "2 + 3\n");
    }

    #[test]
    fn function_like_macro_without_parens_passes_through() {
        let (output, _) = run("#define CALL(X) X\nCALL\n");
        assert_eq!(output, "CALL\n");
    }

    #[test]
    fn arity_mismatch_yields_the_original_invocation_unexpanded() {
        let (output, errors) = run("#define ADD(A, B) A + B\nADD(2)\n");
        assert_eq!(output, "ADD(2)\n");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn arity_mismatch_with_too_many_arguments_also_passes_through() {
        let (output, errors) = run("#define ADD(A, B) A + B\nADD(2, 3, 4)\n");
        assert_eq!(output, "ADD(2, 3, 4)\n");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn self_referential_object_macro_does_not_loop_forever() {
        let (output, _) = run("#define X X\nX\n");
        assert_eq!(output, "X\n");
    }

    #[test]
    fn mutually_recursive_macros_terminate() {
        let (output, _) = run("#define A B\n#define B A\nA\n");
        assert_eq!(output, "A\n");
    }

    #[test]
    fn ifdef_skips_inactive_branch_entirely() {
        let (output, _) = run("#ifdef NOPE\nskipped\n#else\nkept\n#endif\n");
        // The leading newline is `#else`'s own terminator, emitted because
        // the branch it opens is active (see DESIGN.md).
        assert_eq!(output, "\nkept\n");
    }

    #[test]
    fn elif_chain_picks_first_true_branch() {
        let (output, _) = run("#if 0\none\n#elif 0\ntwo\n#elif 1\nthree\n#else\nfour\n#endif\n");
        assert_eq!(output, "three\n");
    }

    #[test]
    fn nested_conditionals_require_every_level_active() {
        let source = "#ifdef OUTER\n#ifdef INNER\nboth\n#endif\n#endif\nafter\n";
        let (output, _) = run(source);
        assert_eq!(output, "after\n");
    }

    #[test]
    fn define_inside_inactive_branch_has_no_effect() {
        let source = "#if 0\n#define X 1\n#endif\nX\n";
        let (output, _) = run(source);
        assert_eq!(output, "X\n");
    }

    #[test]
    fn unbalanced_endif_is_reported() {
        let (_, errors) = run("#endif\n");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn quoted_include_splices_in_the_resolved_file() {
        let mut files = HashMap::new();
        files.insert("greet.h".to_string(), "hi\n".to_string());
        let mut engine = Engine::new(
            Box::new(StringInputStream::new("#include \"greet.h\"\nbye\n")),
            Box::new(MapResolver { files }),
        );
        let mut diagnostics: Vec<cprep_foundation::errors::Diagnostic> = Vec::new();
        let output = engine.process(&mut diagnostics);
        assert_eq!(output, "hi\nbye\n");
    }

    #[test]
    fn unresolved_include_is_reported_and_processing_continues() {
        let (output, errors) = run("#include \"missing.h\"\nafter\n");
        assert_eq!(output, "after\n");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn angle_and_quoted_includes_are_both_resolved_in_order() {
        // Exercises the lexer's dedicated header-name mode: the `<` of
        // `#include <system>` must be switched into angle-string lexing
        // before ordinary dispatch tokenizes it as a plain punctuator.
        let mut files = HashMap::new();
        files.insert("system".to_string(), "sys\n".to_string());
        files.insert("local".to_string(), "loc\n".to_string());
        let mut engine = Engine::new(
            Box::new(StringInputStream::new("#include <system>\n#include \"local\"\n")),
            Box::new(MapResolver { files }),
        );
        let mut diagnostics: Vec<cprep_foundation::errors::Diagnostic> = Vec::new();
        let output = engine.process(&mut diagnostics);
        assert_eq!(output, "sys\nloc\n");
    }

    #[test]
    fn line_macro_without_a_trailing_newline_does_not_gain_one() {
        let (output, _) = run("__LINE__\n__LINE__\n__LINE__");
        assert_eq!(output, "1\n2\n3");
    }

    #[test]
    fn stringize_without_a_trailing_newline_does_not_gain_one() {
        let (output, _) = run("#define FOO(Name) #Name\n FOO(Text)");
        assert_eq!(output, " Text");
    }

    #[test]
    fn bare_undefined_identifier_predicate_is_false() {
        let (output, _) = run("#if FOO\n // this block will be skiped\n #endif");
        assert_eq!(output, "");
    }

    #[test]
    fn else_branch_of_a_false_if_is_emitted_with_its_opening_newline() {
        let (output, _) = run("#if FOO\n // this block will be skiped\n if block\n#else\n else block #endif");
        assert_eq!(output, "\n else block ");
    }

    #[test]
    fn taken_if_branch_is_emitted_and_else_branch_is_dropped() {
        let (output, _) = run("#if 1\n if block\n#else\n else block #endif");
        assert_eq!(output, " if block\n");
    }

    #[test]
    fn endif_sharing_a_line_with_preceding_text_is_still_recognised() {
        // `#endif` here is not the first token on its physical line; it
        // must still close the conditional rather than being emitted as
        // ordinary `#` `endif` tokens.
        let (output, errors) = run("#if 1\nkept #endif");
        assert_eq!(output, "kept ");
        assert!(errors.is_empty());
    }
}
