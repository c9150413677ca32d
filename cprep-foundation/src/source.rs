//! The input-stream abstraction the lexer pulls source text from.
//!
//! This is the one collaborator the preprocessing core actually needs from
//! the outside world: something that can hand back one logical line at a
//! time. Concrete I/O (opening files, following `#include` search paths) is
//! explicitly out of scope for the core and lives in the CLI instead.

use std::io::{self, BufRead, BufReader, Read};

/// Supplies source text to the lexer one logical line at a time.
///
/// Implementations never fail loudly: an I/O error is reported through
/// whatever error-notification mechanism the implementation has available
/// and is otherwise treated as end-of-file rather than propagated.
pub trait InputStream {
    /// Returns the next line of source, without its trailing newline, or
    /// `None` once the stream is exhausted.
    fn read_line(&mut self) -> Option<String>;

    /// True once `read_line` has returned `None` and will keep doing so.
    fn eof(&self) -> bool;
}

/// An [`InputStream`] backed by an in-memory string, used pervasively in
/// tests and for any source text that already lives in memory (e.g. macro
/// replacement text synthesized by a caller).
pub struct StringInputStream {
    lines: std::vec::IntoIter<String>,
    eof: bool,
}

impl StringInputStream {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        // `str::lines()` can't tell "ends with a newline" apart from "doesn't":
        // both "a\nb" and "a\nb\n" yield ["a", "b"]. Splitting on '\n' instead
        // keeps the trailing empty element `split` produces when the source
        // ends with the delimiter, so that element's own `read_line` call
        // stands in for the source's real final newline instead of the lexer
        // inventing (or dropping) one. An empty source has no lines at all.
        let lines: Vec<String> = if source.is_empty() {
            Vec::new()
        } else {
            source
                .split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line).to_owned())
                .collect()
        };
        Self {
            lines: lines.into_iter(),
            eof: false,
        }
    }
}

impl InputStream for StringInputStream {
    fn read_line(&mut self) -> Option<String> {
        match self.lines.next() {
            Some(line) => Some(line),
            None => {
                self.eof = true;
                None
            }
        }
    }

    fn eof(&self) -> bool {
        self.eof
    }
}

/// An [`InputStream`] backed by a buffered reader, used by the CLI to feed
/// real files (and included files) into the engine.
pub struct FileInputStream<R> {
    reader: BufReader<R>,
    eof: bool,
    /// Set when the line just handed back ended with a genuine `'\n'` that
    /// turned out to be the last byte in the file: one more (empty)
    /// `read_line` call is owed before reporting real end-of-file, mirroring
    /// the trailing empty element `"...".split('\n')` produces in that case
    /// (see [`StringInputStream::new`]). Without this, a file ending in a
    /// newline and one that doesn't would be indistinguishable to the lexer.
    trailing_newline_pending: bool,
}

impl<R: Read> FileInputStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            eof: false,
            trailing_newline_pending: false,
        }
    }
}

impl<R: Read> InputStream for FileInputStream<R> {
    fn read_line(&mut self) -> Option<String> {
        if self.eof {
            return None;
        }
        if self.trailing_newline_pending {
            self.trailing_newline_pending = false;
            return Some(String::new());
        }
        let mut buf = String::new();
        match self.reader.read_line(&mut buf) {
            Ok(0) => {
                self.eof = true;
                None
            }
            Ok(_) => {
                if buf.ends_with('\n') {
                    buf.pop();
                    if buf.ends_with('\r') {
                        buf.pop();
                    }
                    // `fill_buf` peeks without consuming; if nothing remains
                    // the newline just stripped was the file's last byte.
                    if self.reader.fill_buf().map(|b| b.is_empty()).unwrap_or(true) {
                        self.trailing_newline_pending = true;
                    }
                }
                Some(buf)
            }
            Err(_) => {
                self.eof = true;
                None
            }
        }
    }

    fn eof(&self) -> bool {
        self.eof
    }
}

/// Opens a path as a [`FileInputStream`], treating any I/O failure as a
/// plain `io::Error` for the CLI to report through `anyhow`.
pub fn open_file(path: &std::path::Path) -> io::Result<FileInputStream<std::fs::File>> {
    std::fs::File::open(path).map(FileInputStream::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_input_stream_yields_lines_without_newlines() {
        let mut input = StringInputStream::new("a\nb\nc");
        assert_eq!(input.read_line().as_deref(), Some("a"));
        assert_eq!(input.read_line().as_deref(), Some("b"));
        assert_eq!(input.read_line().as_deref(), Some("c"));
        assert_eq!(input.read_line(), None);
        assert!(input.eof());
    }

    #[test]
    fn string_input_stream_handles_empty_source() {
        let mut input = StringInputStream::new("");
        assert_eq!(input.read_line(), None);
        assert!(input.eof());
    }

    #[test]
    fn string_input_stream_represents_a_genuine_trailing_newline_as_an_extra_empty_line() {
        let mut input = StringInputStream::new("a\nb\n");
        assert_eq!(input.read_line().as_deref(), Some("a"));
        assert_eq!(input.read_line().as_deref(), Some("b"));
        assert_eq!(input.read_line().as_deref(), Some(""));
        assert_eq!(input.read_line(), None);
        assert!(input.eof());
    }

    #[test]
    fn string_input_stream_without_a_trailing_newline_has_no_extra_line() {
        let mut input = StringInputStream::new("a\nb");
        assert_eq!(input.read_line().as_deref(), Some("a"));
        assert_eq!(input.read_line().as_deref(), Some("b"));
        assert_eq!(input.read_line(), None);
        assert!(input.eof());
    }

    #[test]
    fn file_input_stream_represents_a_genuine_trailing_newline_as_an_extra_empty_line() {
        let mut input = FileInputStream::new(io::Cursor::new(b"a\nb\n".to_vec()));
        assert_eq!(input.read_line().as_deref(), Some("a"));
        assert_eq!(input.read_line().as_deref(), Some("b"));
        assert_eq!(input.read_line().as_deref(), Some(""));
        assert_eq!(input.read_line(), None);
        assert!(input.eof());
    }

    #[test]
    fn file_input_stream_without_a_trailing_newline_has_no_extra_line() {
        let mut input = FileInputStream::new(io::Cursor::new(b"a\nb".to_vec()));
        assert_eq!(input.read_line().as_deref(), Some("a"));
        assert_eq!(input.read_line().as_deref(), Some("b"));
        assert_eq!(input.read_line(), None);
        assert!(input.eof());
    }
}
