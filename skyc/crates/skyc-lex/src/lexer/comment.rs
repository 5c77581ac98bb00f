//! Comment lexing.
//!
//! This module handles whitespace, `--` line comments, `--[[ ]]` long
//! comments and the optional prelude of a chunk.

use skyc_util::CompileResult;

use crate::ctype::{is_newline, is_space};
use crate::Lexer;

use super::string::Separator;

const BYTE_ORDER_MARK: &[u8] = b"\xEF\xBB\xBF";

impl<'a> Lexer<'a> {
    /// Skips a UTF-8 byte-order mark and a first line starting with `#`.
    ///
    /// The newline ending the `#` line is kept so line numbers stay exact.
    pub(crate) fn skip_prelude(&mut self) {
        if self.cursor.starts_with(BYTE_ORDER_MARK) {
            self.cursor.advance_n(BYTE_ORDER_MARK.len());
        }
        if self.cursor.current() == Some(b'#') {
            while let Some(c) = self.cursor.current() {
                if is_newline(c) {
                    break;
                }
                self.cursor.advance();
            }
        }
    }

    /// Skips whitespace and comments.
    ///
    /// Called before lexing each token. Fails only on an unfinished long
    /// comment.
    pub(crate) fn skip_whitespace_and_comments(&mut self) -> CompileResult<()> {
        loop {
            match self.cursor.current() {
                Some(c) if is_newline(c) => self.cursor.skip_newline(),
                Some(c) if is_space(c) => {
                    self.cursor.advance();
                },
                Some(b'-') if self.cursor.peek(1) == Some(b'-') => {
                    self.cursor.advance_n(2);
                    self.skip_comment()?;
                },
                _ => return Ok(()),
            }
        }
    }

    /// Skips the body of a comment whose `--` was already consumed.
    fn skip_comment(&mut self) -> CompileResult<()> {
        if self.cursor.current() == Some(b'[') {
            let start_line = self.cursor.line();
            self.buffer.clear();
            if let Separator::Valid(level) = self.skip_separator(false) {
                return self.read_long_bracket(level, start_line, false);
            }
        }
        while let Some(c) = self.cursor.current() {
            if is_newline(c) {
                break;
            }
            self.cursor.advance();
        }
        Ok(())
    }
}
