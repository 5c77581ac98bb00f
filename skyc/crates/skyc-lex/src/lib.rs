//! skyc-lex - Lexical Analyzer for the Skyla Scripting Language
//!
//! This crate turns the bytes of a chunk into a stream of tokens for the
//! parser. It owns the source scanner ([`Cursor`]), the token vocabulary
//! ([`Token`]) and the lexer proper ([`Lexer`]), plus the conversion of
//! numeral lexemes into values ([`numeral`]).
//!
//! # Example Usage
//!
//! ```
//! use skyc_lex::{Lexer, Token};
//! use skyc_util::StringInterner;
//!
//! let mut interner = StringInterner::new();
//! let mut lexer = Lexer::new(b"local x = 42", "=demo", &mut interner);
//!
//! assert_eq!(lexer.next_token().unwrap().token, Token::Local);
//! assert!(matches!(lexer.next_token().unwrap().token, Token::Name(_)));
//! assert_eq!(lexer.next_token().unwrap().token, Token::Assign);
//! assert!(matches!(lexer.next_token().unwrap().token, Token::Number(_)));
//! assert_eq!(lexer.next_token().unwrap().token, Token::Eof);
//! ```
//!
//! # Module Structure
//!
//! - [`cursor`] - Byte cursor and line counting
//! - [`ctype`] - ASCII byte classes
//! - [`token`] - Token type definitions
//! - [`lexer`] - Main lexer implementation
//! - [`numeral`] - Numeral to value conversion
//!
//! # Token Categories
//!
//! ## Keywords
//!
//! `and break do else elseif end false for function goto if in local nil
//! not or repeat return then true until while`
//!
//! ## Names and Literals
//!
//! - **Name**: `[A-Za-z_][A-Za-z0-9_]*`, interned
//! - **Number**: decimal and hexadecimal numerals, kept as raw lexemes
//! - **String**: `"..."` and `'...'` with escapes, or `[[...]]` / `[==[...]==]`
//!
//! ## Operators
//!
//! - **Arithmetic**: `+ - * / // % ^`
//! - **Bitwise**: `& | ~ << >>`
//! - **Comparison**: `== ~= < > <= >=`
//! - **Other**: `# .. ... = ( ) { } [ ] :: ; : , .`
//!
//! Comments start with `--`; `--[[ ... ]]` spans lines.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod ctype;
pub mod cursor;
pub mod lexer;
pub mod numeral;
pub mod token;

mod edge_cases;

// Re-export main types for convenience
pub use cursor::Cursor;
pub use lexer::Lexer;
pub use numeral::{str_to_number, Numeral};
pub use token::{keyword_from_ident, Token, TokenWithLine};

use skyc_util::{CompileResult, Interner};

/// Lexes a whole chunk, excluding the final `Eof`.
///
/// Stops at the first error.
pub fn tokenize(
    source: &[u8],
    source_name: &str,
    interner: &mut dyn Interner,
) -> CompileResult<Vec<TokenWithLine>> {
    Lexer::new(source, source_name, interner).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyc_util::StringInterner;

    /// Helper to collect all tokens from source.
    fn lex_all(source: &str, interner: &mut StringInterner) -> Vec<Token> {
        tokenize(source.as_bytes(), "=test", interner)
            .expect("lexes")
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_function_definition() {
        let mut interner = StringInterner::new();
        let source = r#"
            local function fib(n)
              if n < 2 then return n end
              return fib(n - 1) + fib(n - 2)
            end
        "#;
        let tokens = lex_all(source, &mut interner);
        let fib = Token::Name(interner.intern(b"fib"));
        let n = Token::Name(interner.intern(b"n"));

        assert_eq!(&tokens[..6], &[
            Token::Local,
            Token::Function,
            fib,
            Token::LParen,
            n,
            Token::RParen
        ]);
        assert!(tokens.contains(&Token::Lt));
        assert!(tokens.contains(&Token::Return));
        assert_eq!(tokens.last(), Some(&Token::End));
    }

    #[test]
    fn test_table_constructor() {
        let mut interner = StringInterner::new();
        let tokens = lex_all("t = {[1]='a', b = [[c]]; ...}", &mut interner);

        assert!(tokens.contains(&Token::LBrace));
        assert!(tokens.contains(&Token::LBracket));
        assert!(tokens.contains(&Token::Semicolon));
        assert!(tokens.contains(&Token::Ellipsis));
        assert!(tokens.iter().any(|t| matches!(t, Token::LongString(_))));
    }

    #[test]
    fn test_lines_are_token_start_lines() {
        let mut interner = StringInterner::new();
        let tokens = tokenize(b"a\n[[x\ny]]\nb", "=test", &mut interner).expect("lexes");
        let lines: Vec<u32> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, [1, 2, 4]);
    }

    #[test]
    fn test_tokenize_stops_at_error() {
        let mut interner = StringInterner::new();
        let err = tokenize(b"x = 'open", "@demo.sky", &mut interner).unwrap_err();
        assert_eq!(err.chunk, "demo.sky");
        assert!(err.is_lexical());
    }
}
