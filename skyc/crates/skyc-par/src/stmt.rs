//! Statement parsing - local, if, while, for, repeat, function, return, etc.

use skyc_lex::Token;
use skyc_util::{CompileResult, Symbol};

use crate::emit::{Fixup, Instruction, LoopKind, Operand, Reg, ResultCount};
use crate::expr_desc::{ExprDesc, ExprKind, JumpList};
use crate::func_state::VarKind;
use crate::Parser;

/// Hidden locals holding the state of a numeric `for`.
const NUMERIC_FOR_STATE: u32 = 3;
/// Hidden locals holding the state of a generic `for`.
const GENERIC_FOR_STATE: u32 = 4;

impl<'a> Parser<'a> {
    /// Parse statements up to the end of the enclosing block.
    ///
    /// Returns true if the list ends with a `return`.
    pub(crate) fn statement_list(&mut self) -> CompileResult<bool> {
        while !self.block_follow(true) {
            if self.current.token == Token::Return {
                self.statement()?;
                return Ok(true);
            }
            self.statement()?;
        }
        Ok(false)
    }

    /// Parse a statement
    fn statement(&mut self) -> CompileResult<()> {
        let line = self.current.line;
        self.enter_level()?;
        match self.current.token {
            Token::Semicolon => self.advance()?,
            Token::If => self.if_stat(line)?,
            Token::While => self.while_stat(line)?,
            Token::Do => {
                self.advance()?;
                self.block()?;
                self.expect_match(Token::End, Token::Do, line)?;
            },
            Token::For => self.for_stat(line)?,
            Token::Repeat => self.repeat_stat(line)?,
            Token::Function => self.func_stat(line)?,
            Token::Local => {
                self.advance()?;
                if self.match_token(Token::Function)? {
                    self.local_func()?;
                } else {
                    self.local_stat()?;
                }
            },
            Token::DoubleColon => {
                self.advance()?;
                let name = self.expect_name()?;
                self.label_stat(name, line)?;
            },
            Token::Return => {
                self.advance()?;
                self.ret_stat()?;
            },
            Token::Break => self.break_stat()?,
            Token::Goto => {
                self.advance()?;
                self.goto_stat()?;
            },
            _ => self.expr_stat()?,
        }
        let fs = self.fs_mut();
        debug_assert!(fs.free_reg >= fs.nvarstack() && fs.max_stack >= fs.free_reg);
        fs.free_reg = fs.nvarstack();
        self.leave_level();
        Ok(())
    }

    // ========================================================================
    // CONDITIONALS AND LOOPS
    // ========================================================================

    /// Parse an if statement
    fn if_stat(&mut self, line: u32) -> CompileResult<()> {
        let mut escapes = JumpList::new();
        self.test_then_block(&mut escapes)?;
        while self.current.token == Token::Elseif {
            self.test_then_block(&mut escapes)?;
        }
        if self.match_token(Token::Else)? {
            self.block()?;
        }
        self.expect_match(Token::End, Token::If, line)?;
        self.patch_to_here(escapes);
        Ok(())
    }

    /// `[IF | ELSEIF] cond THEN block`
    fn test_then_block(&mut self, escapes: &mut JumpList) -> CompileResult<()> {
        self.advance()?;
        let mut cond = self.expr()?;
        self.expect(Token::Then)?;
        self.go_if_true(&mut cond)?;
        self.enter_block(false);
        let returned = self.statement_list()?;
        self.leave_block()?;
        // a branch that returns never falls through to the end of the `if`
        if !returned && matches!(self.current.token, Token::Else | Token::Elseif) {
            let pc = self.jump();
            escapes.append(JumpList::plain(pc));
        }
        let false_exits = cond.false_exits.take();
        self.patch_to_here(false_exits);
        Ok(())
    }

    /// Condition of a loop; returns the jumps taken when it is false.
    fn cond(&mut self) -> CompileResult<JumpList> {
        let mut v = self.expr()?;
        if v.kind == ExprKind::Nil {
            v.kind = ExprKind::False;
        }
        self.go_if_true(&mut v)?;
        Ok(v.false_exits.take())
    }

    /// Parse a while loop
    fn while_stat(&mut self, line: u32) -> CompileResult<()> {
        self.advance()?;
        let start = self.label();
        let exits = self.cond()?;
        self.enter_block(true);
        self.expect(Token::Do)?;
        self.block()?;
        let back = self.jump();
        self.patch_list(JumpList::plain(back), start);
        self.expect_match(Token::End, Token::While, line)?;
        self.leave_block()?;
        self.patch_to_here(exits);
        Ok(())
    }

    /// Parse a repeat-until loop
    fn repeat_stat(&mut self, line: u32) -> CompileResult<()> {
        let start = self.label();
        self.enter_block(true);
        self.enter_block(false);
        self.advance()?;
        self.statement_list()?;
        self.expect_match(Token::Until, Token::Repeat, line)?;
        // the condition sees the locals of the body
        let mut exits = self.cond()?;
        let captured = self.leave_block()?;
        if captured {
            // repeating must close the upvalues of the body first
            let exit = self.jump();
            self.patch_to_here(exits);
            let level = self.fs().nvarstack();
            self.emitter.close_upvalues(level, self.last_line);
            exits = JumpList::plain(self.jump());
            self.patch_to_here(JumpList::plain(exit));
        }
        self.patch_list(exits, start);
        self.leave_block()?;
        Ok(())
    }

    /// Parse a for loop
    fn for_stat(&mut self, line: u32) -> CompileResult<()> {
        self.enter_block(true);
        self.advance()?;
        let name = self.expect_name()?;
        match self.current.token {
            Token::Assign => self.for_num(name, line)?,
            Token::Comma | Token::In => self.for_list(name)?,
            _ => return Err(self.error("'=' or 'in' expected")),
        }
        self.expect_match(Token::End, Token::For, line)?;
        self.leave_block()?;
        Ok(())
    }

    fn for_state_locals(&mut self, count: u32) -> CompileResult<()> {
        let hidden = self.lexer.intern(b"(for state)");
        for _ in 0..count {
            self.new_localvar(hidden)?;
        }
        Ok(())
    }

    /// `NAME = exp, exp [, exp] DO block`
    fn for_num(&mut self, name: Symbol, line: u32) -> CompileResult<()> {
        let base = self.fs().free_reg;
        self.for_state_locals(NUMERIC_FOR_STATE)?;
        self.new_localvar(name)?;
        self.expect(Token::Assign)?;
        self.exp_next_reg()?;
        self.expect(Token::Comma)?;
        self.exp_next_reg()?;
        if self.match_token(Token::Comma)? {
            self.exp_next_reg()?;
        } else {
            let mut step = ExprDesc::new(ExprKind::Number(skyc_lex::Numeral::Integer(1)));
            self.exp_to_next_reg(&mut step)?;
        }
        self.adjust_local_vars(NUMERIC_FOR_STATE);
        self.for_body(base, line, 1, LoopKind::Numeric)
    }

    /// `NAME {, NAME} IN explist DO block`
    fn for_list(&mut self, first: Symbol) -> CompileResult<()> {
        let base = self.fs().free_reg;
        self.for_state_locals(GENERIC_FOR_STATE)?;
        self.new_localvar(first)?;
        let mut nvars = 1;
        while self.match_token(Token::Comma)? {
            let name = self.expect_name()?;
            self.new_localvar(name)?;
            nvars += 1;
        }
        self.expect(Token::In)?;
        let line = self.current.line;
        let (mut e, nexps) = self.exp_list()?;
        self.adjust_assign(GENERIC_FOR_STATE, nexps, &mut e)?;
        self.adjust_local_vars(GENERIC_FOR_STATE);
        // the last state variable is closed when the loop ends
        self.mark_to_be_closed();
        // room to call the iterator
        self.check_stack(3)?;
        self.for_body(base, line, nvars, LoopKind::Generic)
    }

    fn for_body(&mut self, base: Reg, line: u32, nvars: u32, kind: LoopKind) -> CompileResult<()> {
        self.expect(Token::Do)?;
        let prep = self.code_at(Instruction::ForPrep { base, kind }, line);
        self.enter_block(false);
        self.adjust_local_vars(nvars);
        self.reserve_regs(nvars)?;
        self.block()?;
        self.leave_block()?;
        let exit = self.label();
        self.emitter.fixup(prep, Fixup::JumpTarget(exit));
        if kind == LoopKind::Generic {
            self.code_at(Instruction::GenericCall {
                base,
                results: nvars,
            }, line);
        }
        let end = self.code_at(Instruction::ForLoop { base, kind }, line);
        self.emitter.fixup(end, Fixup::JumpTarget(prep + 1));
        Ok(())
    }

    // ========================================================================
    // FUNCTIONS
    // ========================================================================

    /// `FUNCTION funcname body`
    fn func_stat(&mut self, line: u32) -> CompileResult<()> {
        self.advance()?;
        let (target, is_method) = self.func_name()?;
        let mut closure = self.body(is_method, line)?;
        self.check_read_only(&target)?;
        self.store_var(&target, &mut closure)
    }

    /// `NAME {'.' NAME} [':' NAME]`
    fn func_name(&mut self) -> CompileResult<(ExprDesc, bool)> {
        let name = self.expect_name()?;
        let mut v = self.single_var(name)?;
        while self.current.token == Token::Dot {
            self.field_sel(&mut v)?;
        }
        let is_method = self.current.token == Token::Colon;
        if is_method {
            self.field_sel(&mut v)?;
        }
        Ok((v, is_method))
    }

    /// `LOCAL FUNCTION NAME body`
    fn local_func(&mut self) -> CompileResult<()> {
        let name = self.expect_name()?;
        self.new_localvar(name)?;
        // visible inside its own body, for recursion
        self.adjust_local_vars(1);
        let line = self.current.line;
        self.body(false, line)?;
        Ok(())
    }

    /// `LOCAL attnamelist ['=' explist]`
    fn local_stat(&mut self) -> CompileResult<()> {
        let mut to_close: Option<Reg> = None;
        let mut nvars = 0;
        loop {
            let name = self.expect_name()?;
            let index = self.new_localvar(name)?;
            let kind = self.local_attribute()?;
            self.set_local_kind(index, kind);
            if kind == VarKind::Close {
                if to_close.is_some() {
                    return Err(
                        self.semantic_error("multiple to-be-closed variables in local list")
                    );
                }
                to_close = Some(self.fs().nactvar + nvars);
            }
            nvars += 1;
            if !self.match_token(Token::Comma)? {
                break;
            }
        }
        let (mut e, nexps) = if self.match_token(Token::Assign)? {
            self.exp_list()?
        } else {
            (ExprDesc::void(), 0)
        };
        self.adjust_assign(nvars, nexps, &mut e)?;
        self.adjust_local_vars(nvars);
        if let Some(reg) = to_close {
            self.mark_to_be_closed();
            self.code(Instruction::MarkClose { reg });
        }
        Ok(())
    }

    /// `['<' NAME '>']`
    fn local_attribute(&mut self) -> CompileResult<VarKind> {
        if !self.match_token(Token::Lt)? {
            return Ok(VarKind::Regular);
        }
        let attribute = self.expect_name()?;
        self.expect(Token::Gt)?;
        let text = self.name_of(attribute);
        match text.as_str() {
            "const" => Ok(VarKind::Const),
            "close" => Ok(VarKind::Close),
            _ => Err(self.semantic_error(format!("unknown attribute '{text}'"))),
        }
    }

    /// Balances `nexps` values against `nvars` targets: missing values
    /// become nil, extra ones are dropped, and an open last expression
    /// supplies the difference.
    pub(crate) fn adjust_assign(&mut self, nvars: u32, nexps: u32, e: &mut ExprDesc) -> CompileResult<()> {
        let needed = i64::from(nvars) - i64::from(nexps);
        if e.has_multiple_results() {
            let extra = (needed + 1).max(0) as u32;
            self.set_returns(e, ResultCount::Fixed(extra))?;
        } else {
            if e.kind != ExprKind::Void {
                self.exp_to_next_reg(e)?;
            }
            if needed > 0 {
                let dst = self.fs().free_reg;
                self.code(Instruction::LoadNil {
                    dst,
                    count: needed as u32,
                });
            }
        }
        if needed > 0 {
            self.reserve_regs(needed as u32)?;
        } else {
            let fs = self.fs_mut();
            fs.free_reg = (i64::from(fs.free_reg) + needed) as Reg;
        }
        Ok(())
    }

    // ========================================================================
    // ASSIGNMENTS AND CALLS
    // ========================================================================

    /// `func | assignment`
    fn expr_stat(&mut self) -> CompileResult<()> {
        let v = self.suffixed_exp()?;
        if matches!(self.current.token, Token::Assign | Token::Comma) {
            return self.rest_assign(v);
        }
        match v.kind {
            ExprKind::Call { pc, .. } => {
                self.emitter
                    .fixup(pc, Fixup::ResultCount(ResultCount::Fixed(0)));
                Ok(())
            },
            _ => Err(self.error("syntax error")),
        }
    }

    /// `{',' suffixedexp} '=' explist`
    fn rest_assign(&mut self, first: ExprDesc) -> CompileResult<()> {
        self.check_assign_target(&first)?;
        let mut targets = vec![first];
        while self.match_token(Token::Comma)? {
            let v = self.suffixed_exp()?;
            if !matches!(v.kind, ExprKind::Indexed { .. }) {
                self.check_conflict(&mut targets, &v)?;
            }
            self.check_assign_target(&v)?;
            targets.push(v);
        }
        self.expect(Token::Assign)?;

        let nvars = targets.len() as u32;
        let (mut e, nexps) = self.exp_list()?;
        let mut pending = targets.into_iter().rev();
        if nexps == nvars {
            self.set_one_ret(&mut e);
            if let Some(last) = pending.next() {
                self.store_var(&last, &mut e)?;
            }
        } else {
            self.adjust_assign(nvars, nexps, &mut e)?;
        }
        // remaining values sit on top of the stack, last target first
        for target in pending {
            let mut value = ExprDesc::new(ExprKind::NonReloc(self.fs().free_reg - 1));
            self.store_var(&target, &mut value)?;
        }
        Ok(())
    }

    fn check_assign_target(&self, v: &ExprDesc) -> CompileResult<()> {
        if !v.is_variable() {
            return Err(self.error("syntax error"));
        }
        self.check_read_only(v)
    }

    fn check_read_only(&self, v: &ExprDesc) -> CompileResult<()> {
        let (kind, name) = match v.kind {
            ExprKind::Local(reg) => (self.local_kind(self.fs, reg), self.local_name(self.fs, reg)),
            ExprKind::Upvalue(index) => match self.fs().upvalues.get(index as usize) {
                Some(up) => (up.kind, Some(up.name)),
                None => return Ok(()),
            },
            _ => return Ok(()),
        };
        match name {
            Some(name) if kind.is_read_only() => Err(self.semantic_error(format!(
                "attempt to assign to const variable '{}'",
                self.name_of(name)
            ))),
            _ => Ok(()),
        }
    }

    /// A table or key register of an earlier target is the local `v` being
    /// assigned now: the earlier store must use a copy of its old value.
    fn check_conflict(&mut self, targets: &mut [ExprDesc], v: &ExprDesc) -> CompileResult<()> {
        let ExprKind::Local(local) = v.kind else {
            return Ok(());
        };
        let extra = self.fs().free_reg;
        let mut conflict = false;
        for target in targets.iter_mut() {
            if let ExprKind::Indexed { table, key } = &mut target.kind {
                if *table == local {
                    conflict = true;
                    *table = extra;
                }
                if *key == Operand::Register(local) {
                    conflict = true;
                    *key = Operand::Register(extra);
                }
            }
        }
        if conflict {
            self.code(Instruction::Move {
                dst: extra,
                src: local,
            });
            self.reserve_regs(1)?;
        }
        Ok(())
    }

    /// Parse a return statement
    fn ret_stat(&mut self) -> CompileResult<()> {
        let mut first = self.fs().nvarstack();
        let count = if self.block_follow(true) || self.current.token == Token::Semicolon {
            ResultCount::Fixed(0)
        } else {
            let (mut e, nret) = self.exp_list()?;
            if e.has_multiple_results() {
                self.set_multret(&mut e)?;
                let inside_tbc = self.fs().block().is_some_and(|b| b.inside_tbc);
                if let ExprKind::Call { pc, .. } = e.kind {
                    if nret == 1 && !inside_tbc {
                        self.emitter.fixup(pc, Fixup::TailCall);
                    }
                }
                ResultCount::Multiple
            } else if nret == 1 {
                first = self.exp_to_any_reg(&mut e)?;
                ResultCount::Fixed(1)
            } else {
                self.exp_to_next_reg(&mut e)?;
                debug_assert_eq!(nret, self.fs().free_reg - first);
                ResultCount::Fixed(nret)
            }
        };
        self.code(Instruction::Return { first, count });
        self.match_token(Token::Semicolon)?;
        Ok(())
    }

    // ========================================================================
    // JUMPS
    // ========================================================================

    /// Parse a break statement
    fn break_stat(&mut self) -> CompileResult<()> {
        let line = self.current.line;
        self.advance()?;
        let pc = self.jump();
        self.new_goto_entry(self.break_name, line, pc);
        Ok(())
    }

    /// `GOTO NAME`
    fn goto_stat(&mut self) -> CompileResult<()> {
        let line = self.current.line;
        let name = self.expect_name()?;
        match self.find_label(name) {
            Some(label) => {
                // backward jump, resolved here
                if self.fs().nvarstack() > label.nactvar {
                    self.emitter.close_upvalues(label.nactvar, self.last_line);
                }
                let pc = self.jump();
                self.patch_list(JumpList::plain(pc), label.pc);
            },
            None => {
                let pc = self.jump();
                self.new_goto_entry(name, line, pc);
            },
        }
        Ok(())
    }

    /// `'::' NAME '::'`, name already read
    fn label_stat(&mut self, name: Symbol, line: u32) -> CompileResult<()> {
        self.expect(Token::DoubleColon)?;
        while matches!(self.current.token, Token::Semicolon | Token::DoubleColon) {
            self.statement()?;
        }
        if let Some(existing) = self.find_label(name) {
            return Err(self.semantic_error(format!(
                "label '{}' already defined on line {}",
                self.name_of(name),
                existing.line
            )));
        }
        let last = self.block_follow(false);
        let (block_level, first_goto) = self
            .fs()
            .block()
            .map_or((0, 0), |b| (b.nactvar, b.first_goto));
        // a label at the end of a block is outside the scope of its locals
        let nactvar = if last { block_level } else { self.fs().nactvar };
        self.create_label(name, line, nactvar, first_goto)?;
        Ok(())
    }
}
