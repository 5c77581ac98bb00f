//! Expression parsing using operator-precedence climbing
//!
//! Expressions are compiled as they are read: every operand becomes an
//! [`ExprDesc`], and the `prefix`/`infix`/`posfix` hooks of the code
//! generator run around each operator.
//!
//! # Operator Precedence (lowest to highest)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 1 | `or` | Left |
//! | 2 | `and` | Left |
//! | 3 | `==`, `~=`, `<`, `<=`, `>`, `>=` | Left |
//! | 4 | `\|` | Left |
//! | 5 | `~` | Left |
//! | 6 | `&` | Left |
//! | 7 | `<<`, `>>` | Left |
//! | 9 | `..` | Right |
//! | 10 | `+`, `-` | Left |
//! | 11 | `*`, `/`, `//`, `%` | Left |
//! | 12 | unary `not`, `#`, `-`, `~` | - |
//! | 14 | `^` | Right |

use skyc_lex::{str_to_number, Token};
use skyc_util::{CompileError, CompileResult, ErrorKind, Symbol};

use crate::emit::{ArithOp, Fixup, FuncId, Instruction, Reg, ResultCount, UnaryOp, NO_REG};
use crate::expr_desc::{ExprDesc, ExprKind};
use crate::func_state::Phase;
use crate::Parser;

/// Priority of unary operators; only `^` binds tighter.
const UNARY_PRIORITY: u8 = 12;

/// List items buffered before a table constructor flushes them.
const FIELDS_PER_FLUSH: u32 = 50;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Arith(ArithOp),
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    fn from_token(token: Token) -> Option<Self> {
        let op = match token {
            Token::Plus => BinaryOp::Arith(ArithOp::Add),
            Token::Minus => BinaryOp::Arith(ArithOp::Sub),
            Token::Star => BinaryOp::Arith(ArithOp::Mul),
            Token::Slash => BinaryOp::Arith(ArithOp::Div),
            Token::DoubleSlash => BinaryOp::Arith(ArithOp::IDiv),
            Token::Percent => BinaryOp::Arith(ArithOp::Mod),
            Token::Caret => BinaryOp::Arith(ArithOp::Pow),
            Token::Ampersand => BinaryOp::Arith(ArithOp::BAnd),
            Token::Pipe => BinaryOp::Arith(ArithOp::BOr),
            Token::Tilde => BinaryOp::Arith(ArithOp::BXor),
            Token::Shl => BinaryOp::Arith(ArithOp::Shl),
            Token::Shr => BinaryOp::Arith(ArithOp::Shr),
            Token::DotDot => BinaryOp::Concat,
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::Ne,
            Token::Lt => BinaryOp::Lt,
            Token::LtEq => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::GtEq => BinaryOp::Ge,
            Token::And => BinaryOp::And,
            Token::Or => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    /// Left and right binding priorities.
    fn priority(self) -> (u8, u8) {
        match self {
            BinaryOp::Or => (1, 1),
            BinaryOp::And => (2, 2),
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => (3, 3),
            BinaryOp::Concat => (9, 8),
            BinaryOp::Arith(op) => match op {
                ArithOp::BOr => (4, 4),
                ArithOp::BXor => (5, 5),
                ArithOp::BAnd => (6, 6),
                ArithOp::Shl | ArithOp::Shr => (7, 7),
                ArithOp::Add | ArithOp::Sub => (10, 10),
                ArithOp::Mul | ArithOp::Div | ArithOp::IDiv | ArithOp::Mod => (11, 11),
                ArithOp::Pow => (14, 13),
            },
        }
    }
}

fn unary_op(token: Token) -> Option<UnaryOp> {
    match token {
        Token::Not => Some(UnaryOp::Not),
        Token::Minus => Some(UnaryOp::Minus),
        Token::Tilde => Some(UnaryOp::BNot),
        Token::Hash => Some(UnaryOp::Len),
        _ => None,
    }
}

/// Progress of a table constructor.
struct Constructor {
    /// Register holding the table
    table: Reg,
    /// Pending list item, not yet in a register
    pending: ExprDesc,
    /// List items already stored
    array: u32,
    /// Record fields
    hash: u32,
    /// List items waiting in registers
    to_store: u32,
}

impl<'a> Parser<'a> {
    // ========================================================================
    // MAIN EXPRESSION ENTRY POINTS
    // ========================================================================

    pub(crate) fn expr(&mut self) -> CompileResult<ExprDesc> {
        Ok(self.subexpr(0)?.0)
    }

    /// Parses operators binding tighter than `limit`. Returns the first
    /// operator that does not.
    fn subexpr(&mut self, limit: u8) -> CompileResult<(ExprDesc, Option<BinaryOp>)> {
        self.enter_level()?;
        let mut e = match unary_op(self.current.token) {
            Some(op) => {
                let line = self.current.line;
                self.advance()?;
                let (mut operand, _) = self.subexpr(UNARY_PRIORITY)?;
                self.prefix(op, &mut operand, line)?;
                operand
            },
            None => self.simple_exp()?,
        };

        let mut op = BinaryOp::from_token(self.current.token);
        while let Some(binary) = op {
            let (left, right) = binary.priority();
            if left <= limit {
                break;
            }
            let line = self.current.line;
            self.advance()?;
            self.infix(binary, &mut e)?;
            let (e2, next) = self.subexpr(right)?;
            self.posfix(binary, &mut e, e2, line)?;
            op = next;
        }
        self.leave_level();
        Ok((e, op))
    }

    /// Parses an expression and leaves its value in the next free register.
    pub(crate) fn exp_next_reg(&mut self) -> CompileResult<Reg> {
        let mut e = self.expr()?;
        self.exp_to_next_reg(&mut e)
    }

    /// Comma-separated expressions. All but the last are placed in
    /// consecutive registers; the last is returned undischarged along with
    /// the count.
    pub(crate) fn exp_list(&mut self) -> CompileResult<(ExprDesc, u32)> {
        let mut n = 1;
        let mut e = self.expr()?;
        while self.match_token(Token::Comma)? {
            self.exp_to_next_reg(&mut e)?;
            e = self.expr()?;
            n += 1;
        }
        Ok((e, n))
    }

    // ========================================================================
    // OPERANDS
    // ========================================================================

    fn simple_exp(&mut self) -> CompileResult<ExprDesc> {
        let kind = match self.current.token {
            Token::Number(lexeme) => self.numeral(lexeme)?,
            Token::ShortString(s) | Token::LongString(s) => ExprKind::Str(s),
            Token::Nil => ExprKind::Nil,
            Token::True => ExprKind::True,
            Token::False => ExprKind::False,
            Token::Ellipsis => {
                if !self.fs().is_vararg {
                    let near = self.current.token.describe(self.lexer.interner());
                    return Err(self
                        .semantic_error("cannot use '...' outside a vararg function")
                        .near(near));
                }
                let pc = self.code_at(
                    Instruction::Vararg {
                        dst: NO_REG,
                        results: ResultCount::Fixed(1),
                    },
                    self.current.line,
                );
                ExprKind::Vararg(pc)
            },
            Token::LBrace => return self.constructor(),
            Token::Function => {
                let line = self.current.line;
                self.advance()?;
                return self.body(false, line);
            },
            _ => return self.suffixed_exp(),
        };
        self.advance()?;
        Ok(ExprDesc::new(kind))
    }

    fn numeral(&self, lexeme: Symbol) -> CompileResult<ExprKind> {
        let value = self
            .lexer
            .interner()
            .lookup(lexeme)
            .and_then(|text| str_to_number(text.as_bytes()));
        match value {
            Some(n) => Ok(ExprKind::Number(n)),
            None => {
                let near = self.current.token.describe(self.lexer.interner());
                Err(CompileError::new(
                    ErrorKind::Lexical,
                    self.lexer.chunk(),
                    self.current.line,
                    "malformed number",
                )
                .near(near))
            },
        }
    }

    fn primary_exp(&mut self) -> CompileResult<ExprDesc> {
        match self.current.token {
            Token::Name(name) => {
                self.advance()?;
                self.single_var(name)
            },
            Token::LParen => {
                let line = self.current.line;
                self.advance()?;
                let mut e = self.expr()?;
                self.expect_match(Token::RParen, Token::LParen, line)?;
                // parentheses cut a call or `...` down to one value
                self.discharge_vars(&mut e);
                Ok(e)
            },
            _ => Err(self.error("unexpected symbol")),
        }
    }

    /// `primaryexp { '.' NAME | '[' exp ']' | ':' NAME funcargs | funcargs }`
    pub(crate) fn suffixed_exp(&mut self) -> CompileResult<ExprDesc> {
        let line = self.current.line;
        let mut e = self.primary_exp()?;
        loop {
            match self.current.token {
                Token::Dot => self.field_sel(&mut e)?,
                Token::LBracket => {
                    self.exp_to_any_reg(&mut e)?;
                    let mut key = self.index_exp()?;
                    self.indexed(&mut e, &mut key)?;
                },
                Token::Colon => {
                    self.advance()?;
                    let mut key = ExprDesc::new(ExprKind::Str(self.expect_name()?));
                    let base = self.method_self(&mut e, &mut key)?;
                    self.func_args(&mut e, base, line)?;
                },
                Token::LParen | Token::ShortString(_) | Token::LongString(_) | Token::LBrace => {
                    let base = self.exp_to_next_reg(&mut e)?;
                    self.func_args(&mut e, base, line)?;
                },
                _ => return Ok(e),
            }
        }
    }

    /// `'.' NAME`
    pub(crate) fn field_sel(&mut self, e: &mut ExprDesc) -> CompileResult<()> {
        self.exp_to_any_reg(e)?;
        self.advance()?;
        let mut key = ExprDesc::new(ExprKind::Str(self.expect_name()?));
        self.indexed(e, &mut key)
    }

    /// `'[' exp ']'`
    fn index_exp(&mut self) -> CompileResult<ExprDesc> {
        self.advance()?;
        let mut e = self.expr()?;
        self.exp_to_val(&mut e)?;
        self.expect(Token::RBracket)?;
        Ok(e)
    }

    fn func_args(&mut self, f: &mut ExprDesc, base: Reg, line: u32) -> CompileResult<()> {
        let mut args = match self.current.token {
            Token::LParen => {
                self.advance()?;
                if self.current.token == Token::RParen {
                    self.advance()?;
                    ExprDesc::void()
                } else {
                    let (mut args, _) = self.exp_list()?;
                    if args.has_multiple_results() {
                        self.set_multret(&mut args)?;
                    }
                    self.expect_match(Token::RParen, Token::LParen, line)?;
                    args
                }
            },
            Token::LBrace => self.constructor()?,
            Token::ShortString(s) | Token::LongString(s) => {
                self.advance()?;
                ExprDesc::new(ExprKind::Str(s))
            },
            _ => return Err(self.error("function arguments expected")),
        };

        let nargs = if args.has_multiple_results() {
            ResultCount::Multiple
        } else {
            if args.kind != ExprKind::Void {
                self.exp_to_next_reg(&mut args)?;
            }
            ResultCount::Fixed(self.fs().free_reg - (base + 1))
        };
        let pc = self.code_at(
            Instruction::Call {
                base,
                args: nargs,
                results: ResultCount::Fixed(1),
                tail: false,
            },
            line,
        );
        *f = ExprDesc::new(ExprKind::Call { pc, base });
        // the call consumes its arguments and leaves one value at base
        self.fs_mut().free_reg = base + 1;
        Ok(())
    }

    // ========================================================================
    // TABLE CONSTRUCTOR
    // ========================================================================

    fn constructor(&mut self) -> CompileResult<ExprDesc> {
        let line = self.current.line;
        let table = self.fs().free_reg;
        let pc = self.code(Instruction::NewTable {
            dst: table,
            array: 0,
            hash: 0,
        });
        self.reserve_regs(1)?;
        let mut cc = Constructor {
            table,
            pending: ExprDesc::void(),
            array: 0,
            hash: 0,
            to_store: 0,
        };
        self.expect(Token::LBrace)?;
        loop {
            if self.current.token == Token::RBrace {
                break;
            }
            self.close_list_field(&mut cc)?;
            self.field(&mut cc)?;
            if !(self.match_token(Token::Comma)? || self.match_token(Token::Semicolon)?) {
                break;
            }
        }
        self.expect_match(Token::RBrace, Token::LBrace, line)?;
        self.last_list_field(&mut cc)?;
        self.emitter.fixup(pc, Fixup::TableSize {
            array: cc.array,
            hash: cc.hash,
        });
        Ok(ExprDesc::new(ExprKind::NonReloc(table)))
    }

    fn field(&mut self, cc: &mut Constructor) -> CompileResult<()> {
        let token = self.current.token;
        match token {
            Token::Name(_) if self.peek_token()? == Token::Assign => self.rec_field(cc),
            Token::LBracket => self.rec_field(cc),
            _ => {
                cc.pending = self.expr()?;
                cc.to_store += 1;
                Ok(())
            },
        }
    }

    /// `NAME '=' exp` or `'[' exp ']' '=' exp`
    fn rec_field(&mut self, cc: &mut Constructor) -> CompileResult<()> {
        let reg = self.fs().free_reg;
        let mut key = match self.current.token {
            Token::Name(name) => {
                self.advance()?;
                ExprDesc::new(ExprKind::Str(name))
            },
            _ => self.index_exp()?,
        };
        cc.hash += 1;
        self.expect(Token::Assign)?;
        let mut tab = ExprDesc::new(ExprKind::NonReloc(cc.table));
        self.indexed(&mut tab, &mut key)?;
        let mut value = self.expr()?;
        self.store_var(&tab, &mut value)?;
        self.fs_mut().free_reg = reg;
        Ok(())
    }

    fn close_list_field(&mut self, cc: &mut Constructor) -> CompileResult<()> {
        if cc.pending.kind == ExprKind::Void {
            return Ok(());
        }
        let mut pending = std::mem::replace(&mut cc.pending, ExprDesc::void());
        self.exp_to_next_reg(&mut pending)?;
        if cc.to_store == FIELDS_PER_FLUSH {
            self.set_list(cc.table, cc.array, ResultCount::Fixed(cc.to_store));
            cc.array += cc.to_store;
            cc.to_store = 0;
        }
        Ok(())
    }

    fn last_list_field(&mut self, cc: &mut Constructor) -> CompileResult<()> {
        if cc.to_store == 0 {
            return Ok(());
        }
        let mut pending = std::mem::replace(&mut cc.pending, ExprDesc::void());
        if pending.has_multiple_results() {
            self.set_multret(&mut pending)?;
            self.set_list(cc.table, cc.array, ResultCount::Multiple);
            // the open item is not counted in the size hint
            cc.array += cc.to_store - 1;
        } else {
            if pending.kind != ExprKind::Void {
                self.exp_to_next_reg(&mut pending)?;
            }
            self.set_list(cc.table, cc.array, ResultCount::Fixed(cc.to_store));
            cc.array += cc.to_store;
        }
        cc.to_store = 0;
        Ok(())
    }

    fn set_list(&mut self, table: Reg, stored: u32, count: ResultCount) {
        self.code(Instruction::SetList {
            table,
            stored,
            count,
        });
        self.fs_mut().free_reg = table + 1;
    }

    // ========================================================================
    // FUNCTION BODIES
    // ========================================================================

    /// `'(' parlist ')' block END`, compiled as a child of the current
    /// function. Returns the closure, already in the next free register.
    pub(crate) fn body(&mut self, is_method: bool, line: u32) -> CompileResult<ExprDesc> {
        let parent = self.fs;
        let id = self.open_function(Some(parent), line);
        self.expect(Token::LParen)?;
        if is_method {
            let name = self.lexer.intern(b"self");
            self.new_localvar(name)?;
            self.adjust_local_vars(1);
        }
        self.param_list()?;
        self.expect(Token::RParen)?;
        self.fs_mut().phase = Phase::ParsingStatements;
        self.statement_list()?;
        self.fs_mut().last_line_defined = self.current.line;
        self.expect_match(Token::End, Token::Function, line)?;
        self.close_function()?;
        self.closure(id)
    }

    fn param_list(&mut self) -> CompileResult<()> {
        let mut nparams = 0;
        let mut is_vararg = false;
        if self.current.token != Token::RParen {
            loop {
                match self.current.token {
                    Token::Name(name) => {
                        self.advance()?;
                        self.new_localvar(name)?;
                        nparams += 1;
                    },
                    Token::Ellipsis => {
                        self.advance()?;
                        is_vararg = true;
                    },
                    _ => return Err(self.error("<name> or '...' expected")),
                }
                if is_vararg || !self.match_token(Token::Comma)? {
                    break;
                }
            }
        }
        self.adjust_local_vars(nparams);
        let fs = self.fs_mut();
        fs.num_params = fs.nactvar;
        fs.is_vararg = is_vararg;
        let nactvar = fs.nactvar;
        self.reserve_regs(nactvar)
    }

    /// Instantiates function `id` in the current function.
    fn closure(&mut self, id: FuncId) -> CompileResult<ExprDesc> {
        let pc = self.code(Instruction::Closure {
            dst: NO_REG,
            function: id,
        });
        let mut e = ExprDesc::new(ExprKind::Relocatable(pc));
        self.exp_to_next_reg(&mut e)?;
        Ok(e)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        compile_chunk, ArithOp, CompareOp, Condition, Constant, FuncId, Instruction, Limits,
        Operand, RecordingEmitter, ResultCount, UnaryOp,
    };
    use skyc_util::StringInterner;

    fn compile(source: &str) -> RecordingEmitter {
        let mut interner = StringInterner::new();
        let mut emitter = RecordingEmitter::new();
        compile_chunk(
            source.as_bytes(),
            "=expr",
            &mut interner,
            &mut emitter,
            Limits::default(),
        )
        .unwrap_or_else(|e| panic!("{source:?}: {e}"));
        assert!(emitter.unpatched_jumps().is_empty());
        emitter
    }

    fn main_code(emitter: &RecordingEmitter) -> Vec<Instruction> {
        emitter
            .function(FuncId(0))
            .map(|f| f.instructions().copied().collect())
            .unwrap_or_default()
    }

    fn main_constants(emitter: &RecordingEmitter) -> Vec<Constant> {
        emitter
            .function(FuncId(0))
            .map(|f| f.constants().copied().collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // PRECEDENCE TESTS
    // =========================================================================

    #[test]
    fn test_multiplication_binds_tighter() {
        let emitter = compile("local a, b, c = 1, 2, 3 local r = a + b * c");
        let code = main_code(&emitter);
        let binaries: Vec<ArithOp> = code
            .iter()
            .filter_map(|i| match i {
                Instruction::Binary { op, .. } => Some(*op),
                _ => None,
            })
            .collect();
        assert_eq!(binaries, vec![ArithOp::Mul, ArithOp::Add]);
    }

    #[test]
    fn test_power_is_right_associative() {
        let emitter = compile("local r = 2 ^ 3 ^ 2");
        // 3 ^ 2 folds first, then 2 ^ 9
        assert_eq!(main_constants(&emitter), vec![Constant::Float(512.0)]);
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let emitter = compile("local r = -2 ^ 2");
        assert_eq!(main_constants(&emitter), vec![Constant::Float(-4.0)]);
    }

    #[test]
    fn test_concat_is_right_associative() {
        let emitter = compile("local r = a .. b .. c");
        let concats: Vec<Instruction> = main_code(&emitter)
            .into_iter()
            .filter(|i| matches!(i, Instruction::Concat { .. }))
            .collect();
        assert_eq!(concats, vec![
            Instruction::Concat { first: 1, count: 2 },
            Instruction::Concat { first: 0, count: 2 },
        ]);
    }

    // =========================================================================
    // OPERAND TESTS
    // =========================================================================

    #[test]
    fn test_string_and_float_constants() {
        let emitter = compile("local s, f = 'hi', 0.5");
        assert_eq!(main_constants(&emitter).len(), 2);
        assert!(matches!(main_constants(&emitter)[1], Constant::Float(f) if f == 0.5));
    }

    #[test]
    fn test_comparison_operand_order() {
        let emitter = compile("local a, b = 1, 2 local r = a > b");
        let cond = emitter
            .function(FuncId(0))
            .and_then(|f| {
                f.code.iter().find_map(|(c, _)| match c {
                    crate::Code::JumpIf { condition, .. } => Some(*condition),
                    _ => None,
                })
            })
            .expect("comparison");
        assert_eq!(cond, Condition::Compare {
            op: CompareOp::Lt,
            lhs: Operand::Register(1),
            rhs: Operand::Register(0),
            when: true,
        });
    }

    #[test]
    fn test_length_and_not() {
        let emitter = compile("local t = {} local n, b = #t, not t");
        let unary: Vec<UnaryOp> = main_code(&emitter)
            .iter()
            .filter_map(|i| match i {
                Instruction::Unary { op, .. } => Some(*op),
                _ => None,
            })
            .collect();
        assert_eq!(unary, vec![UnaryOp::Len, UnaryOp::Not]);
    }

    #[test]
    fn test_or_delivers_value_through_testset() {
        let emitter = compile("local a local r = a or 5");
        let code = &emitter.function(FuncId(0)).expect("main").code;
        assert!(code.iter().any(|(c, _)| matches!(
            c,
            crate::Code::JumpIf {
                condition: Condition::TestSet { dst: 1, src: 0, when: true },
                ..
            }
        )));
    }

    // =========================================================================
    // CALL AND VARARG TESTS
    // =========================================================================

    #[test]
    fn test_last_argument_expands() {
        let emitter = compile("f(1, g())");
        let calls: Vec<Instruction> = main_code(&emitter)
            .into_iter()
            .filter(|i| matches!(i, Instruction::Call { .. }))
            .collect();
        assert_eq!(calls, vec![
            Instruction::Call {
                base: 2,
                args: ResultCount::Fixed(0),
                results: ResultCount::Multiple,
                tail: false,
            },
            Instruction::Call {
                base: 0,
                args: ResultCount::Multiple,
                results: ResultCount::Fixed(0),
                tail: false,
            },
        ]);
    }

    #[test]
    fn test_method_call() {
        let emitter = compile("obj:m(1)");
        let code = main_code(&emitter);
        assert!(code.iter().any(|i| matches!(i, Instruction::Method { base: 0, object: 0, .. })));
        assert!(code.iter().any(|i| matches!(
            i,
            Instruction::Call { base: 0, args: ResultCount::Fixed(2), .. }
        )));
    }

    #[test]
    fn test_string_call_argument() {
        let emitter = compile("require 'mod'");
        assert!(main_code(&emitter).iter().any(|i| matches!(
            i,
            Instruction::Call { base: 0, args: ResultCount::Fixed(1), .. }
        )));
    }

    #[test]
    fn test_vararg_in_table() {
        let emitter = compile("local t = {...}");
        let code = main_code(&emitter);
        assert!(code.contains(&Instruction::Vararg {
            dst: 1,
            results: ResultCount::Multiple,
        }));
        assert!(code.contains(&Instruction::SetList {
            table: 0,
            stored: 0,
            count: ResultCount::Multiple,
        }));
    }

    // =========================================================================
    // CONSTRUCTOR TESTS
    // =========================================================================

    #[test]
    fn test_constructor_size_hints() {
        let emitter = compile("local t = {1, 2, x = 3, [4] = 5, f()}");
        assert!(main_code(&emitter).contains(&Instruction::NewTable {
            dst: 0,
            array: 2,
            hash: 2,
        }));
    }

    #[test]
    fn test_constructor_flushes_every_fifty_items() {
        let items: Vec<String> = (1..=120).map(|i| i.to_string()).collect();
        let emitter = compile(&format!("local t = {{{}}}", items.join(", ")));
        let stored: Vec<(u32, ResultCount)> = main_code(&emitter)
            .iter()
            .filter_map(|i| match i {
                Instruction::SetList { stored, count, .. } => Some((*stored, *count)),
                _ => None,
            })
            .collect();
        assert_eq!(stored, vec![
            (0, ResultCount::Fixed(50)),
            (50, ResultCount::Fixed(50)),
            (100, ResultCount::Fixed(20)),
        ]);
    }

    #[test]
    fn test_function_expression() {
        let emitter = compile("local f = function(a, b) return a + b end");
        assert!(main_code(&emitter).contains(&Instruction::Closure {
            dst: 0,
            function: FuncId(1),
        }));
        let summary = emitter
            .function(FuncId(1))
            .and_then(|f| f.summary.clone())
            .expect("closed");
        assert_eq!(summary.num_params, 2);
        assert!(!summary.is_vararg);
    }
}
