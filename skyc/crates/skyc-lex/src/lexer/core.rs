//! Core lexer implementation.
//!
//! This module contains the main Lexer struct and its dispatch loop.

use skyc_util::{chunk_id, CompileError, CompileResult, ErrorKind, Interner, Symbol};
use tracing::trace;

use crate::ctype::is_ident_start;
use crate::cursor::Cursor;
use crate::token::{Token, TokenWithLine};

/// Lexer for the Skyla scripting language.
///
/// Pulls bytes from a [`Cursor`] and produces one [`TokenWithLine`] per
/// call to [`Lexer::next_token`]. Identifiers, numerals and string contents
/// are interned through the interner passed at construction.
///
/// After an error the lexer must not be used again.
pub struct Lexer<'a> {
    /// Byte cursor over the source.
    pub(crate) cursor: Cursor<'a>,

    /// Canonicalization service for names and literals.
    interner: &'a mut dyn Interner,

    /// Diagnostic name of the chunk.
    chunk: String,

    /// Scratch space for decoded string contents.
    pub(crate) buffer: Vec<u8>,

    /// Starting position of the current token (byte offset).
    pub(crate) token_start: usize,

    /// Line number where the current token starts (1-based).
    pub(crate) token_line: u32,

    /// Whether the byte-order mark and `#` line have been checked.
    prelude_checked: bool,

    /// Set once `Eof` or an error has been returned through the iterator.
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `source`.
    ///
    /// `source_name` follows the [`chunk_id`] conventions (`=name`,
    /// `@file`, or the source text itself) and only affects diagnostics.
    pub fn new(source: &'a [u8], source_name: &str, interner: &'a mut dyn Interner) -> Self {
        Self {
            cursor: Cursor::new(source),
            interner,
            chunk: chunk_id(source_name),
            buffer: Vec::new(),
            token_start: 0,
            token_line: 1,
            prelude_checked: false,
            finished: false,
        }
    }

    /// Returns the next token from the source code.
    ///
    /// Whitespace and comments are skipped first; then the lookahead byte
    /// selects the sub-lexer. Returns `Token::Eof` at end of input, and
    /// keeps returning it on further calls.
    pub fn next_token(&mut self) -> CompileResult<TokenWithLine> {
        if !self.prelude_checked {
            self.prelude_checked = true;
            self.skip_prelude();
        }
        self.skip_whitespace_and_comments()?;

        self.token_start = self.cursor.position();
        self.token_line = self.cursor.line();

        let token = match self.cursor.current() {
            None => Token::Eof,
            Some(b'[') => self.lex_left_bracket()?,
            Some(quote @ (b'"' | b'\'')) => self.lex_short_string(quote)?,
            Some(b'.') if self.cursor.peek(1).is_some_and(|b| b.is_ascii_digit()) => {
                self.lex_number()
            },
            Some(b'0'..=b'9') => self.lex_number(),
            Some(c) if is_ident_start(c) => self.lex_identifier(),
            Some(_) => self.lex_operator()?,
        };
        trace!(?token, line = self.token_line, "token");

        Ok(TokenWithLine {
            token,
            line: self.token_line,
        })
    }

    /// One-byte lookahead past the last token, without consuming it.
    pub fn peek_char(&self) -> Option<u8> {
        self.cursor.current()
    }

    /// Returns the current line number (1-based).
    pub fn line(&self) -> u32 {
        self.cursor.line()
    }

    /// Returns the current byte position in the source.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Diagnostic name of the chunk being lexed.
    pub fn chunk(&self) -> &str {
        &self.chunk
    }

    /// Interns `bytes` in the lexer's interner.
    pub fn intern(&mut self, bytes: &[u8]) -> Symbol {
        self.interner.intern(bytes)
    }

    /// The interner names and literals are resolved against.
    pub fn interner(&self) -> &dyn Interner {
        &*self.interner
    }

    /// Interns the scratch buffer.
    pub(crate) fn intern_buffer(&mut self) -> Symbol {
        self.interner.intern(&self.buffer)
    }

    /// Lexical error at the current line, near the current token text.
    pub(crate) fn error(&self, message: impl Into<String>) -> CompileError {
        let near = if self.cursor.is_at_end() && self.cursor.position() == self.token_start {
            "<eof>".to_string()
        } else {
            let text = self.cursor.slice_from(self.token_start);
            format!("'{}'", String::from_utf8_lossy(text))
        };
        CompileError::new(ErrorKind::Lexical, &self.chunk, self.cursor.line(), message).near(near)
    }

    /// Lexical error reported at `line`, near the end of input.
    pub(crate) fn error_at_eof(&self, line: u32, message: impl Into<String>) -> CompileError {
        CompileError::new(ErrorKind::Lexical, &self.chunk, line, message).near("<eof>")
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = CompileResult<TokenWithLine>;

    /// Yields tokens up to, not including, `Eof`; an error is yielded once
    /// and ends the iteration.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_token() {
            Ok(t) if t.token == Token::Eof => {
                self.finished = true;
                None
            },
            Ok(t) => Some(Ok(t)),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            },
        }
    }
}
