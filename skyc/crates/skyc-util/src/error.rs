//! Compilation errors shared by the lexer and the parser.
//!
//! A single error ends the compilation unit: there is no recovery, so the
//! error carries everything a caller needs to report it.

use std::fmt;

use thiserror::Error;

/// Which phase rejected the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unfinished strings and comments, bad escapes, malformed numbers
    Lexical,
    /// Grammar violations
    Syntax,
    /// Scoping rules: break outside a loop, undefined labels, limits
    Semantic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Lexical => "lexical error",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::Semantic => "semantic error",
        })
    }
}

/// Terminal error of one compilation unit.
///
/// Renders as `chunk:line: message near 'lexeme'`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}:{}: {}{}", .chunk, .line, .message, near_suffix(.near))]
pub struct CompileError {
    /// Phase that rejected the input
    pub kind: ErrorKind,
    /// Diagnostic name of the chunk, as produced by [`crate::chunk_id`]
    pub chunk: String,
    /// 1-based line of the offending token
    pub line: u32,
    /// Expected-versus-found description
    pub message: String,
    /// Offending lexeme, when there is one
    pub near: Option<String>,
}

fn near_suffix(near: &Option<String>) -> String {
    match near {
        Some(lexeme) => format!(" near {lexeme}"),
        None => String::new(),
    }
}

impl CompileError {
    /// Create an error without a lexeme.
    pub fn new(kind: ErrorKind, chunk: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            kind,
            chunk: chunk.into(),
            line,
            message: message.into(),
            near: None,
        }
    }

    /// Attach the offending lexeme, already quoted for display.
    pub fn near(mut self, lexeme: impl Into<String>) -> Self {
        self.near = Some(lexeme.into());
        self
    }

    /// Returns `true` for lexical errors.
    pub fn is_lexical(&self) -> bool {
        self.kind == ErrorKind::Lexical
    }

    /// Returns `true` for syntax errors.
    pub fn is_syntax(&self) -> bool {
        self.kind == ErrorKind::Syntax
    }

    /// Returns `true` for semantic errors.
    pub fn is_semantic(&self) -> bool {
        self.kind == ErrorKind::Semantic
    }
}

/// Result type alias for lexing and parsing
pub type CompileResult<T> = std::result::Result<T, CompileError>;
