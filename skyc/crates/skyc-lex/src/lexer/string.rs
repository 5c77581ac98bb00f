//! String lexing.
//!
//! Quoted strings with escape sequences, and the long-bracket reader shared
//! by long strings and long comments.

use skyc_util::CompileResult;

use crate::ctype::{hex_value, is_newline, is_space};
use crate::token::Token;
use crate::Lexer;

/// Largest code point accepted by `\u{...}`.
const MAX_UTF8_ESCAPE: u32 = 0x7FFF_FFFF;

/// Result of scanning a bracket followed by `=` signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Separator {
    /// A well-formed `[==[` or `]==]`, with its level
    Valid(usize),
    /// A lone bracket with no `=` signs
    Single,
    /// `=` signs not followed by a matching bracket
    Invalid,
}

impl<'a> Lexer<'a> {
    /// Lexes `[`, or a long string when the bracket opens one.
    pub(crate) fn lex_left_bracket(&mut self) -> CompileResult<Token> {
        let start_line = self.cursor.line();
        self.buffer.clear();
        match self.skip_separator(false) {
            Separator::Valid(level) => {
                self.read_long_bracket(level, start_line, true)?;
                Ok(Token::LongString(self.intern_buffer()))
            },
            Separator::Single => Ok(Token::LBracket),
            Separator::Invalid => Err(self.error("invalid long string delimiter")),
        }
    }

    /// Consumes a `[` or `]` and any `=` signs after it.
    ///
    /// The second bracket is left as the lookahead. With `save`, consumed
    /// bytes are appended to the scratch buffer.
    pub(crate) fn skip_separator(&mut self, save: bool) -> Separator {
        let Some(bracket) = self.cursor.current() else {
            return Separator::Invalid;
        };
        if save {
            self.buffer.push(bracket);
        }
        self.cursor.advance();
        let mut level = 0;
        while self.cursor.current() == Some(b'=') {
            if save {
                self.buffer.push(b'=');
            }
            self.cursor.advance();
            level += 1;
        }
        if self.cursor.current() == Some(bracket) {
            Separator::Valid(level)
        } else if level == 0 {
            Separator::Single
        } else {
            Separator::Invalid
        }
    }

    /// Reads the body of a long bracket of the given level.
    ///
    /// The lookahead is the second opening bracket. A newline right after
    /// the opening is dropped, and every newline sequence in the body is
    /// normalized to `\n`. With `save` the body is left in the scratch
    /// buffer; comments discard it.
    ///
    /// Running out of input is an error reported at `start_line`.
    pub(crate) fn read_long_bracket(
        &mut self,
        level: usize,
        start_line: u32,
        save: bool,
    ) -> CompileResult<()> {
        self.cursor.advance();
        if self.cursor.current().is_some_and(is_newline) {
            self.cursor.skip_newline();
        }
        loop {
            match self.cursor.current() {
                None => {
                    let what = if save { "string" } else { "comment" };
                    return Err(self.error_at_eof(
                        start_line,
                        format!("unfinished long {what} (starting at line {start_line})"),
                    ));
                },
                Some(b']') => {
                    let mark = self.buffer.len();
                    if self.skip_separator(save) == Separator::Valid(level) {
                        self.cursor.advance();
                        self.buffer.truncate(mark);
                        return Ok(());
                    }
                },
                Some(c) if is_newline(c) => {
                    if save {
                        self.buffer.push(b'\n');
                    }
                    self.cursor.skip_newline();
                },
                Some(c) => {
                    if save {
                        self.buffer.push(c);
                    }
                    self.cursor.advance();
                },
            }
        }
    }

    /// Lexes a string delimited by `quote`, decoding escapes.
    pub(crate) fn lex_short_string(&mut self, quote: u8) -> CompileResult<Token> {
        self.buffer.clear();
        self.cursor.advance();
        loop {
            match self.cursor.current() {
                None => return Err(self.error_at_eof(self.cursor.line(), "unfinished string")),
                Some(c) if is_newline(c) => return Err(self.error("unfinished string")),
                Some(c) if c == quote => {
                    self.cursor.advance();
                    break;
                },
                Some(b'\\') => self.read_escape()?,
                Some(c) => {
                    self.buffer.push(c);
                    self.cursor.advance();
                },
            }
        }
        Ok(Token::ShortString(self.intern_buffer()))
    }

    /// Decodes one escape sequence; the lookahead is the backslash.
    fn read_escape(&mut self) -> CompileResult<()> {
        let escape_start = self.cursor.position();
        self.cursor.advance();
        let simple = match self.cursor.current() {
            // End of input: the caller reports the unfinished string.
            None => return Ok(()),
            Some(b'a') => Some(0x07),
            Some(b'b') => Some(0x08),
            Some(b'f') => Some(0x0c),
            Some(b'n') => Some(b'\n'),
            Some(b'r') => Some(b'\r'),
            Some(b't') => Some(b'\t'),
            Some(b'v') => Some(0x0b),
            Some(c @ (b'\\' | b'"' | b'\'')) => Some(c),
            Some(_) => None,
        };
        if let Some(byte) = simple {
            self.buffer.push(byte);
            self.cursor.advance();
            return Ok(());
        }

        match self.cursor.current() {
            Some(c) if is_newline(c) => {
                self.buffer.push(b'\n');
                self.cursor.skip_newline();
            },
            Some(b'x') => {
                let byte = self.read_hex_escape(escape_start)?;
                self.buffer.push(byte);
            },
            Some(b'u') => {
                let code = self.read_utf8_escape(escape_start)?;
                encode_utf8_escape(code, &mut self.buffer);
            },
            Some(b'z') => {
                self.cursor.advance();
                while let Some(c) = self.cursor.current() {
                    if is_newline(c) {
                        self.cursor.skip_newline();
                    } else if is_space(c) {
                        self.cursor.advance();
                    } else {
                        break;
                    }
                }
            },
            Some(c) if c.is_ascii_digit() => {
                let byte = self.read_decimal_escape(escape_start)?;
                self.buffer.push(byte);
            },
            Some(c) => {
                // Any other escaped byte stands for itself.
                self.buffer.push(c);
                self.cursor.advance();
            },
            None => {},
        }
        Ok(())
    }

    /// `\xXX`: exactly two hexadecimal digits.
    fn read_hex_escape(&mut self, escape_start: usize) -> CompileResult<u8> {
        self.cursor.advance();
        let mut value = 0u32;
        for _ in 0..2 {
            match self.cursor.current().and_then(hex_value) {
                Some(digit) => {
                    value = value * 16 + digit;
                    self.cursor.advance();
                },
                None => return Err(self.escape_error(escape_start, "hexadecimal digit expected")),
            }
        }
        Ok(value as u8)
    }

    /// `\ddd`: up to three decimal digits, at most 255.
    fn read_decimal_escape(&mut self, escape_start: usize) -> CompileResult<u8> {
        let mut value = 0u32;
        for _ in 0..3 {
            match self.cursor.current() {
                Some(c) if c.is_ascii_digit() => {
                    value = value * 10 + u32::from(c - b'0');
                    self.cursor.advance();
                },
                _ => break,
            }
        }
        u8::try_from(value).map_err(|_| self.escape_error(escape_start, "decimal escape too large"))
    }

    /// `\u{XXX}`: a code point up to 2^31 - 1.
    fn read_utf8_escape(&mut self, escape_start: usize) -> CompileResult<u32> {
        self.cursor.advance();
        if self.cursor.current() != Some(b'{') {
            return Err(self.escape_error(escape_start, "missing '{' in \\u{xxxx}"));
        }
        self.cursor.advance();
        let Some(mut value) = self.cursor.current().and_then(hex_value) else {
            return Err(self.escape_error(escape_start, "hexadecimal digit expected"));
        };
        self.cursor.advance();
        while let Some(digit) = self.cursor.current().and_then(hex_value) {
            if value > (MAX_UTF8_ESCAPE >> 4) {
                return Err(self.escape_error(escape_start, "UTF-8 value too large"));
            }
            value = (value << 4) + digit;
            self.cursor.advance();
        }
        if self.cursor.current() != Some(b'}') {
            return Err(self.escape_error(escape_start, "missing '}' in \\u{xxxx}"));
        }
        self.cursor.advance();
        Ok(value)
    }

    /// Invalid escape sequence, reported near the escape text read so far.
    fn escape_error(&self, escape_start: usize, detail: &str) -> skyc_util::CompileError {
        let mut near = self.cursor.slice_from(escape_start).to_vec();
        if let Some(c) = self.cursor.current() {
            near.push(c);
        }
        let mut err = self.error(format!("invalid escape sequence ({detail})"));
        err.near = Some(format!("'{}'", String::from_utf8_lossy(&near)));
        err
    }
}

/// Appends the UTF-8 style encoding of `code`, using up to six bytes.
fn encode_utf8_escape(mut code: u32, out: &mut Vec<u8>) {
    if code < 0x80 {
        out.push(code as u8);
        return;
    }
    let mut tail = [0u8; 6];
    let mut n = 0;
    // Largest value that still fits in the first byte.
    let mut first_max = 0x3f;
    loop {
        tail[n] = 0x80 | (code & 0x3f) as u8;
        n += 1;
        code >>= 6;
        first_max >>= 1;
        if code <= first_max {
            break;
        }
    }
    out.push(((!first_max << 1) | code) as u8);
    out.extend(tail[..n].iter().rev());
}

#[cfg(test)]
mod tests {
    use super::encode_utf8_escape;
    use crate::token::Token;
    use crate::Lexer;
    use skyc_util::{CompileError, StringInterner};

    fn string(source: &str) -> Result<Vec<u8>, CompileError> {
        let mut interner = StringInterner::new();
        let token = {
            let mut lexer = Lexer::new(source.as_bytes(), "=test", &mut interner);
            lexer.next_token()?.token
        };
        match token {
            Token::ShortString(s) | Token::LongString(s) => Ok(interner.resolve(s).to_vec()),
            other => panic!("not a string: {other:?}"),
        }
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(string(r#""a\tb\n\\\"""#).unwrap(), b"a\tb\n\\\"");
        assert_eq!(string(r"'\a\b\f\v\r'").unwrap(), b"\x07\x08\x0c\x0b\r");
    }

    #[test]
    fn test_numeric_escapes() {
        assert_eq!(string(r#""\x41\65\066""#).unwrap(), b"AAB");
        assert_eq!(string(r#""\u{48}\u{e9}""#).unwrap(), "H\u{e9}".as_bytes());
        assert_eq!(string(r#""\u{7FFFFFFF}""#).unwrap(), b"\xFD\xBF\xBF\xBF\xBF\xBF");
    }

    #[test]
    fn test_z_escape_skips_whitespace() {
        assert_eq!(string("\"a\\z  \n   b\"").unwrap(), b"ab");
    }

    #[test]
    fn test_escaped_newline() {
        assert_eq!(string("\"a\\\r\nb\"").unwrap(), b"a\nb");
    }

    #[test]
    fn test_unknown_escape_is_literal() {
        assert_eq!(string(r#""\q\[""#).unwrap(), b"q[");
    }

    #[test]
    fn test_bad_escapes() {
        for source in [r#""\xZ1""#, r#""\256""#, r#""\u{110000000}""#, r#""\u48""#] {
            let err = string(source).unwrap_err();
            assert!(err.is_lexical(), "{source}");
            assert!(err.message.starts_with("invalid escape sequence"), "{source}");
        }
    }

    #[test]
    fn test_unfinished_string() {
        let err = string("\"abc\nd\"").unwrap_err();
        assert_eq!(err.to_string(), "test:1: unfinished string near '\"abc'");
        let err = string("'abc").unwrap_err();
        assert_eq!(err.to_string(), "test:1: unfinished string near <eof>");
    }

    #[test]
    fn test_long_string_levels() {
        assert_eq!(string("[[abc]]").unwrap(), b"abc");
        assert_eq!(string("[==[a]]b]=]c]==]").unwrap(), b"a]]b]=]c");
        assert_eq!(string("[[\nfirst\r\nsecond]]").unwrap(), b"first\nsecond");
        assert_eq!(string("[[\n\rx\n\n\r\ry]]").unwrap(), b"x\n\n\ny");
    }

    #[test]
    fn test_invalid_long_delimiter() {
        let err = string("[==x").unwrap_err();
        assert_eq!(err.message, "invalid long string delimiter");
    }

    #[test]
    fn test_unfinished_long_string_line() {
        let err = string("[[\n\n\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.message, "unfinished long string (starting at line 1)");
    }

    #[test]
    fn test_encode_boundaries() {
        let mut out = Vec::new();
        encode_utf8_escape(0x7ff, &mut out);
        assert_eq!(out, "\u{7ff}".as_bytes());
        out.clear();
        encode_utf8_escape(0x10ffff, &mut out);
        assert_eq!(out, "\u{10ffff}".as_bytes());
    }
}
