//! Operator and punctuation lexing.
//!
//! This module handles lexing of operators, delimiters, and punctuation.
//! `[` and `--` never reach it: long brackets and comments are recognized
//! first.

use skyc_util::CompileResult;

use crate::token::Token;
use crate::Lexer;

/// Operator spellings, longest first so the first match is the longest.
const OPERATORS: [(&[u8], Token); 32] = [
    (b"...", Token::Ellipsis),
    (b"..", Token::DotDot),
    (b"==", Token::EqEq),
    (b"~=", Token::NotEq),
    (b"<=", Token::LtEq),
    (b">=", Token::GtEq),
    (b"<<", Token::Shl),
    (b">>", Token::Shr),
    (b"//", Token::DoubleSlash),
    (b"::", Token::DoubleColon),
    (b"+", Token::Plus),
    (b"-", Token::Minus),
    (b"*", Token::Star),
    (b"/", Token::Slash),
    (b"%", Token::Percent),
    (b"^", Token::Caret),
    (b"#", Token::Hash),
    (b"&", Token::Ampersand),
    (b"~", Token::Tilde),
    (b"|", Token::Pipe),
    (b"<", Token::Lt),
    (b">", Token::Gt),
    (b"=", Token::Assign),
    (b"(", Token::LParen),
    (b")", Token::RParen),
    (b"{", Token::LBrace),
    (b"}", Token::RBrace),
    (b"]", Token::RBracket),
    (b";", Token::Semicolon),
    (b":", Token::Colon),
    (b",", Token::Comma),
    (b".", Token::Dot),
];

impl<'a> Lexer<'a> {
    /// Lexes the longest operator at the lookahead.
    ///
    /// Bytes that start no token are a lexical error.
    pub(crate) fn lex_operator(&mut self) -> CompileResult<Token> {
        let rest = self.cursor.remaining();
        match OPERATORS.iter().find(|(text, _)| rest.starts_with(text)) {
            Some((text, token)) => {
                self.cursor.advance_n(text.len());
                Ok(*token)
            },
            None => {
                self.cursor.advance();
                Err(self.error("unexpected symbol"))
            },
        }
    }
}
