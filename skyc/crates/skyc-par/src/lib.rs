//! skyc-par - Parser and Code-Generation Driver for the Skyla Scripting Language
//!
//! This crate reads the token stream of one chunk and, in the same single
//! pass, drives code generation for it. There is no syntax tree: every
//! construct is turned into requests on an [`Emitter`] as soon as it is
//! recognized.
//!
//! # Overview
//!
//! The parser uses a combination of:
//! - **Recursive Descent** for statements
//! - **Operator Precedence** climbing for binary expressions
//! - **Expression Descriptors** ([`ExprDesc`]) that delay materializing a
//!   value until its context is known
//!
//! Each function body being compiled has a [`FuncState`]; nested functions
//! suspend the enclosing one until they are closed.
//!
//! # Example Usage
//!
//! ```
//! use skyc_par::{compile_chunk, RecordingEmitter};
//! use skyc_util::{Limits, StringInterner};
//!
//! let mut interner = StringInterner::new();
//! let mut emitter = RecordingEmitter::new();
//! let main = compile_chunk(
//!     b"local x = 1 + 2 return x",
//!     "=demo",
//!     &mut interner,
//!     &mut emitter,
//!     Limits::default(),
//! )
//! .unwrap();
//!
//! assert!(emitter.unpatched_jumps().is_empty());
//! assert!(emitter.function(main).is_some());
//! ```
//!
//! # Errors
//!
//! The first error aborts the chunk. Requests already issued for it stay
//! with the emitter, which decides whether to discard them.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod emit;
pub mod expr_desc;
pub mod fold;
pub mod func_state;
pub mod recording;

mod code;
mod expr;
mod scope;
mod stmt;

#[cfg(test)]
mod edge_cases;

pub use emit::{
    ArithOp, CompareOp, Condition, Constant, Emitter, Fixup, FuncId, FunctionSummary, Instruction,
    LoopKind, Operand, Reg, ResultCount, UnaryOp, NO_REG,
};
pub use expr_desc::{ExprDesc, ExprKind, JumpList, PatchKind, PatchSite};
pub use func_state::{FuncState, Phase, UpvalueDesc, VarKind};
pub use recording::{Code, RecordingEmitter, Request};

use skyc_lex::{Lexer, Token, TokenWithLine};
use skyc_util::{CompileError, CompileResult, ErrorKind, IndexVec, Interner, Limits, Symbol};
use tracing::{debug, instrument};

use func_state::{LabelDesc, LocalVar};

/// Compiles one chunk.
///
/// `chunk_name` follows the `=name` / `@file` conventions and only affects
/// diagnostics. Returns the id of the main function; every function of the
/// chunk has been opened and closed on `emitter` when this succeeds.
#[instrument(level = "debug", skip(source, interner, emitter), fields(bytes = source.len()))]
pub fn compile_chunk(
    source: &[u8],
    chunk_name: &str,
    interner: &mut dyn Interner,
    emitter: &mut dyn Emitter,
    limits: Limits,
) -> CompileResult<FuncId> {
    let mut parser = Parser::new(source, chunk_name, interner, emitter, limits);
    let result = parser.parse_main();
    if let Err(err) = &result {
        debug!(%err, functions = parser.function_count(), "compilation aborted");
    }
    result
}

/// Single-pass parser and code-generation driver.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    emitter: &'a mut dyn Emitter,
    limits: Limits,

    /// Current token
    current: TokenWithLine,
    /// One token of lookahead, filled on demand
    lookahead: Option<TokenWithLine>,
    /// Line of the last consumed token
    last_line: u32,

    /// Every function opened so far
    funcs: IndexVec<FuncId, FuncState>,
    /// Innermost open function
    fs: FuncId,

    /// Declared locals of all open functions
    actvars: Vec<LocalVar>,
    /// Pending gotos and breaks of all open functions
    gotos: Vec<LabelDesc>,
    /// Visible labels of all open functions
    labels: Vec<LabelDesc>,

    /// Current statement and expression nesting
    depth: u32,
    /// Name under which `break` is tracked as a goto
    break_name: Symbol,

    #[cfg(test)]
    scope_log: Vec<scope::ScopeRecord>,
}

impl<'a> Parser<'a> {
    /// Creates a parser over `source`. Nothing is read until
    /// [`Parser::parse_main`].
    pub fn new(
        source: &'a [u8],
        chunk_name: &str,
        interner: &'a mut dyn Interner,
        emitter: &'a mut dyn Emitter,
        limits: Limits,
    ) -> Self {
        let mut lexer = Lexer::new(source, chunk_name, interner);
        let break_name = lexer.intern(b"break");
        Self {
            lexer,
            emitter,
            limits,
            current: TokenWithLine {
                token: Token::Eof,
                line: 1,
            },
            lookahead: None,
            last_line: 1,
            funcs: IndexVec::new(),
            fs: FuncId(0),
            actvars: Vec::new(),
            gotos: Vec::new(),
            labels: Vec::new(),
            depth: 0,
            break_name,
            #[cfg(test)]
            scope_log: Vec::new(),
        }
    }

    /// Compiles the whole chunk as the main function.
    ///
    /// The main function takes `...` and has no parameters.
    pub fn parse_main(&mut self) -> CompileResult<FuncId> {
        let main = self.open_function(None, 0);
        self.fs_mut().is_vararg = true;
        self.fs_mut().phase = Phase::ParsingStatements;
        self.advance()?;
        self.statement_list()?;
        self.check(Token::Eof)?;
        self.fs_mut().last_line_defined = self.current.line;
        self.close_function()?;
        Ok(main)
    }

    /// Number of functions opened so far.
    pub fn function_count(&self) -> usize {
        self.funcs.len()
    }

    /// State of function `id`.
    pub fn function_state(&self, id: FuncId) -> Option<&FuncState> {
        self.funcs.get(id)
    }

    fn fs(&self) -> &FuncState {
        &self.funcs[self.fs]
    }

    fn fs_mut(&mut self) -> &mut FuncState {
        &mut self.funcs[self.fs]
    }

    // ========================================================================
    // TOKEN NAVIGATION
    // ========================================================================

    /// Move to the next token
    fn advance(&mut self) -> CompileResult<()> {
        self.last_line = self.current.line;
        self.current = match self.lookahead.take() {
            Some(t) => t,
            None => self.lexer.next_token()?,
        };
        Ok(())
    }

    /// Peek at the token after the current one
    fn peek_token(&mut self) -> CompileResult<Token> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.lexer.next_token()?);
        }
        Ok(self.lookahead.map_or(Token::Eof, |t| t.token))
    }

    /// Match and consume token
    fn match_token(&mut self, expected: Token) -> CompileResult<bool> {
        if self.current.token == expected {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Require the current token without consuming it
    fn check(&self, expected: Token) -> CompileResult<()> {
        if self.current.token == expected {
            Ok(())
        } else {
            Err(self.error_expected(expected))
        }
    }

    /// Expect specific token
    fn expect(&mut self, expected: Token) -> CompileResult<()> {
        self.check(expected)?;
        self.advance()
    }

    /// Expect the token closing `who`, opened at `line`
    fn expect_match(&mut self, what: Token, who: Token, line: u32) -> CompileResult<()> {
        if self.match_token(what)? {
            return Ok(());
        }
        if line == self.current.line {
            Err(self.error_expected(what))
        } else {
            Err(self.error(format!(
                "{} expected (to close {} at line {})",
                quoted(what),
                quoted(who),
                line
            )))
        }
    }

    /// Expect a name and return it
    fn expect_name(&mut self) -> CompileResult<Symbol> {
        match self.current.token {
            Token::Name(name) => {
                self.advance()?;
                Ok(name)
            },
            _ => Err(self.error_expected(Token::Name(self.break_name))),
        }
    }

    /// Whether the current token ends a block
    fn block_follow(&self, with_until: bool) -> bool {
        match self.current.token {
            Token::Else | Token::Elseif | Token::End | Token::Eof => true,
            Token::Until => with_until,
            _ => false,
        }
    }

    fn enter_level(&mut self) -> CompileResult<()> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(self.semantic_error("chunk has too many syntax levels"));
        }
        Ok(())
    }

    fn leave_level(&mut self) {
        self.depth -= 1;
    }

    // ========================================================================
    // ERROR HANDLING
    // ========================================================================

    /// Syntax error near the current token
    fn error(&self, message: impl Into<String>) -> CompileError {
        let near = self.current.token.describe(self.lexer.interner());
        CompileError::new(ErrorKind::Syntax, self.lexer.chunk(), self.current.line, message)
            .near(near)
    }

    /// Syntax error for a missing token
    fn error_expected(&self, expected: Token) -> CompileError {
        self.error(format!("{} expected", quoted(expected)))
    }

    /// Semantic error at the current line, without a lexeme
    fn semantic_error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(ErrorKind::Semantic, self.lexer.chunk(), self.current.line, message)
    }

    /// A static limit of function `id` was exceeded
    fn limit_error(&self, id: FuncId, limit: u32, what: &str) -> CompileError {
        let place = self.funcs[id].describe();
        self.semantic_error(format!("too many {what} (limit is {limit}) in {place}"))
    }

    fn name_of(&self, symbol: Symbol) -> String {
        self.lexer.interner().display(symbol)
    }
}

/// Token as quoted in "expected" messages
fn quoted(token: Token) -> String {
    match token.as_str() {
        Some(text) => format!("'{text}'"),
        None => token.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
