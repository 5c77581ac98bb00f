//! Number literal lexing.
//!
//! This module scans numerals without interpreting them.

use crate::ctype::is_ident_start;
use crate::token::Token;
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes a numeral.
    ///
    /// Accepts the regular superset of numeral syntax: digits, hex digits,
    /// dots, and exponent markers with an optional sign (`e`/`E` for
    /// decimal, `p`/`P` after a `0x` prefix). One trailing letter is
    /// absorbed so that `3x` is rejected as a whole.
    ///
    /// The lexeme is interned raw; [`crate::numeral::str_to_number`]
    /// decides whether it is well formed.
    pub(crate) fn lex_number(&mut self) -> Token {
        let first = self.cursor.current();
        self.cursor.advance();

        let mut exponent = [b'e', b'E'];
        if first == Some(b'0') && matches!(self.cursor.current(), Some(b'x' | b'X')) {
            self.cursor.advance();
            exponent = [b'p', b'P'];
        }

        loop {
            match self.cursor.current() {
                Some(c) if exponent.contains(&c) => {
                    self.cursor.advance();
                    if matches!(self.cursor.current(), Some(b'+' | b'-')) {
                        self.cursor.advance();
                    }
                },
                Some(c) if c.is_ascii_hexdigit() || c == b'.' => {
                    self.cursor.advance();
                },
                _ => break,
            }
        }
        if self.cursor.current().is_some_and(is_ident_start) {
            self.cursor.advance();
        }

        let text = self.cursor.slice_from(self.token_start);
        Token::Number(self.intern(text))
    }
}

#[cfg(test)]
mod tests {
    use crate::token::Token;
    use crate::Lexer;
    use skyc_util::StringInterner;

    fn lexemes(source: &str) -> Vec<String> {
        let mut interner = StringInterner::new();
        let tokens: Vec<Token> = Lexer::new(source.as_bytes(), "=test", &mut interner)
            .map(|t| t.expect("lexes").token)
            .collect();
        tokens
            .into_iter()
            .map(|t| match t {
                Token::Number(s) => String::from_utf8_lossy(interner.resolve(s)).into_owned(),
                other => other.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_decimal_forms() {
        assert_eq!(lexemes("3 3.0 3.1416 314.16e-2 0.31416E1 .5"), [
            "3", "3.0", "3.1416", "314.16e-2", "0.31416E1", ".5"
        ]);
    }

    #[test]
    fn test_hex_forms() {
        assert_eq!(lexemes("0xff 0xBEBADA 0x0.1E 0xA23p-4 0X1.921FB54442D18P+1"), [
            "0xff",
            "0xBEBADA",
            "0x0.1E",
            "0xA23p-4",
            "0X1.921FB54442D18P+1"
        ]);
    }

    #[test]
    fn test_malformed_stays_one_lexeme() {
        assert_eq!(lexemes("1.2.3 3x 1e+"), ["1.2.3", "3x", "1e+"]);
    }

    #[test]
    fn test_minus_is_separate() {
        assert_eq!(lexemes("1-2"), ["1", "-", "2"]);
        assert_eq!(lexemes("1e-2"), ["1e-2"]);
    }

    #[test]
    fn test_concat_after_number() {
        assert_eq!(lexemes("1 .. 2"), ["1", "..", "2"]);
    }
}
