//! Lexer module.
//!
//! This module organizes the lexer implementation into smaller, focused components:
//! - `core` - Main Lexer struct and dispatch
//! - `identifier` - Identifier and keyword lexing
//! - `number` - Numeral lexing
//! - `string` - Quoted strings and the long-bracket reader shared with comments
//! - `operator` - Operator and punctuation lexing
//! - `comment` - Whitespace, comments and the chunk prelude

mod comment;
mod core;
mod identifier;
mod number;
mod operator;
mod string;

pub use core::Lexer;
