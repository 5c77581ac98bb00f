//! Token definitions.
//!
//! Every keyword and every operator has its own variant, so the parser never
//! inspects lexeme text. Names, numerals and string contents are interned and
//! carried as [`Symbol`]s: comparing two tokens compares handles, not bytes.

use std::fmt;

use skyc_util::symbol::{Interner, Symbol};

/// A lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    // ========================================================================
    // KEYWORDS
    // ========================================================================
    /// `and`
    And,
    /// `break`
    Break,
    /// `do`
    Do,
    /// `else`
    Else,
    /// `elseif`
    Elseif,
    /// `end`
    End,
    /// `false`
    False,
    /// `for`
    For,
    /// `function`
    Function,
    /// `goto`
    Goto,
    /// `if`
    If,
    /// `in`
    In,
    /// `local`
    Local,
    /// `nil`
    Nil,
    /// `not`
    Not,
    /// `or`
    Or,
    /// `repeat`
    Repeat,
    /// `return`
    Return,
    /// `then`
    Then,
    /// `true`
    True,
    /// `until`
    Until,
    /// `while`
    While,

    // ========================================================================
    // LITERALS AND NAMES
    // ========================================================================
    /// Identifier
    Name(Symbol),
    /// Numeral, as its raw lexeme; converted by the parser
    Number(Symbol),
    /// Quoted string, with escapes decoded
    ShortString(Symbol),
    /// Long-bracket string
    LongString(Symbol),

    // ========================================================================
    // OPERATORS AND PUNCTUATION
    // ========================================================================
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `//`
    DoubleSlash,
    /// `%`
    Percent,
    /// `^`
    Caret,
    /// `#`
    Hash,
    /// `&`
    Ampersand,
    /// `~`
    Tilde,
    /// `|`
    Pipe,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `==`
    EqEq,
    /// `~=`
    NotEq,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `=`
    Assign,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `::`
    DoubleColon,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `..`
    DotDot,
    /// `...`
    Ellipsis,

    /// End of input
    Eof,
}

/// A token together with the line it started on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenWithLine {
    /// The token
    pub token: Token,
    /// 1-based source line
    pub line: u32,
}

/// Keyword table, matched by exact text.
const KEYWORDS: [(&[u8], Token); 22] = [
    (b"and", Token::And),
    (b"break", Token::Break),
    (b"do", Token::Do),
    (b"else", Token::Else),
    (b"elseif", Token::Elseif),
    (b"end", Token::End),
    (b"false", Token::False),
    (b"for", Token::For),
    (b"function", Token::Function),
    (b"goto", Token::Goto),
    (b"if", Token::If),
    (b"in", Token::In),
    (b"local", Token::Local),
    (b"nil", Token::Nil),
    (b"not", Token::Not),
    (b"or", Token::Or),
    (b"repeat", Token::Repeat),
    (b"return", Token::Return),
    (b"then", Token::Then),
    (b"true", Token::True),
    (b"until", Token::Until),
    (b"while", Token::While),
];

/// Returns the keyword token for `ident`, if it is one.
///
/// ```
/// use skyc_lex::{keyword_from_ident, Token};
///
/// assert_eq!(keyword_from_ident(b"while"), Some(Token::While));
/// assert_eq!(keyword_from_ident(b"While"), None);
/// ```
pub fn keyword_from_ident(ident: &[u8]) -> Option<Token> {
    KEYWORDS
        .iter()
        .find(|(text, _)| *text == ident)
        .map(|(_, token)| *token)
}

impl Token {
    /// Returns true for reserved words.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::And
                | Token::Break
                | Token::Do
                | Token::Else
                | Token::Elseif
                | Token::End
                | Token::False
                | Token::For
                | Token::Function
                | Token::Goto
                | Token::If
                | Token::In
                | Token::Local
                | Token::Nil
                | Token::Not
                | Token::Or
                | Token::Repeat
                | Token::Return
                | Token::Then
                | Token::True
                | Token::Until
                | Token::While
        )
    }

    /// Returns the interned payload of names, numerals and strings.
    pub fn symbol(&self) -> Option<Symbol> {
        match self {
            Token::Name(s) | Token::Number(s) | Token::ShortString(s) | Token::LongString(s) => {
                Some(*s)
            },
            _ => None,
        }
    }

    /// Returns true for either kind of string literal.
    pub fn is_string(&self) -> bool {
        matches!(self, Token::ShortString(_) | Token::LongString(_))
    }

    /// Fixed source text of keywords and operators.
    pub fn as_str(&self) -> Option<&'static str> {
        let text = match self {
            Token::And => "and",
            Token::Break => "break",
            Token::Do => "do",
            Token::Else => "else",
            Token::Elseif => "elseif",
            Token::End => "end",
            Token::False => "false",
            Token::For => "for",
            Token::Function => "function",
            Token::Goto => "goto",
            Token::If => "if",
            Token::In => "in",
            Token::Local => "local",
            Token::Nil => "nil",
            Token::Not => "not",
            Token::Or => "or",
            Token::Repeat => "repeat",
            Token::Return => "return",
            Token::Then => "then",
            Token::True => "true",
            Token::Until => "until",
            Token::While => "while",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::Percent => "%",
            Token::Caret => "^",
            Token::Hash => "#",
            Token::Ampersand => "&",
            Token::Tilde => "~",
            Token::Pipe => "|",
            Token::Shl => "<<",
            Token::Shr => ">>",
            Token::EqEq => "==",
            Token::NotEq => "~=",
            Token::LtEq => "<=",
            Token::GtEq => ">=",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Assign => "=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::DoubleColon => "::",
            Token::Semicolon => ";",
            Token::Colon => ":",
            Token::Comma => ",",
            Token::Dot => ".",
            Token::DotDot => "..",
            Token::Ellipsis => "...",
            Token::Name(_)
            | Token::Number(_)
            | Token::ShortString(_)
            | Token::LongString(_)
            | Token::Eof => return None,
        };
        Some(text)
    }

    /// Quoted rendering for "near" clauses of error messages, resolving
    /// payloads through `interner`.
    pub fn describe(&self, interner: &dyn Interner) -> String {
        match self {
            Token::Eof => "<eof>".to_string(),
            Token::Name(s) | Token::Number(s) | Token::ShortString(s) | Token::LongString(s) => {
                format!("'{}'", interner.display(*s))
            },
            other => format!("'{other}'"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) => f.write_str(text),
            None => f.write_str(match self {
                Token::Name(_) => "<name>",
                Token::Number(_) => "<number>",
                Token::ShortString(_) | Token::LongString(_) => "<string>",
                _ => "<eof>",
            }),
        }
    }
}
