//! Identifier and keyword lexing.
//!
//! This module handles lexing of identifiers and keywords.

use crate::ctype::is_ident_continue;
use crate::token::{keyword_from_ident, Token};
use crate::Lexer;

impl<'a> Lexer<'a> {
    /// Lexes an identifier or keyword.
    ///
    /// Reserved words become their keyword token; every other identifier is
    /// interned and returned as `Token::Name`.
    pub(crate) fn lex_identifier(&mut self) -> Token {
        while self.cursor.current().is_some_and(is_ident_continue) {
            self.cursor.advance();
        }

        let text = self.cursor.slice_from(self.token_start);

        match keyword_from_ident(text) {
            Some(keyword) => keyword,
            None => Token::Name(self.intern(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::token::Token;
    use crate::Lexer;
    use skyc_util::StringInterner;

    fn lex_ident(source: &str, interner: &mut StringInterner) -> Token {
        let mut lexer = Lexer::new(source.as_bytes(), "=test", interner);
        lexer.next_token().expect("lexes").token
    }

    #[test]
    fn test_simple_ident() {
        let mut interner = StringInterner::new();
        let token = lex_ident("foo", &mut interner);
        assert_eq!(token, Token::Name(interner.intern(b"foo")));
    }

    #[test]
    fn test_ident_with_underscore_and_digits() {
        let mut interner = StringInterner::new();
        let token = lex_ident("_foo_bar2", &mut interner);
        assert_eq!(token, Token::Name(interner.intern(b"_foo_bar2")));
    }

    #[test]
    fn test_keywords() {
        let mut interner = StringInterner::new();
        assert_eq!(lex_ident("function", &mut interner), Token::Function);
        assert_eq!(lex_ident("elseif", &mut interner), Token::Elseif);
        assert_eq!(lex_ident("nil", &mut interner), Token::Nil);
    }

    #[test]
    fn test_keyword_prefix_is_name() {
        let mut interner = StringInterner::new();
        let token = lex_ident("ends", &mut interner);
        assert_eq!(token, Token::Name(interner.intern(b"ends")));
    }

    #[test]
    fn test_same_name_same_symbol() {
        let mut interner = StringInterner::new();
        let a = lex_ident("count", &mut interner);
        let b = lex_ident("count", &mut interner);
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }
}
