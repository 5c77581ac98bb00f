//! Code generation for expression descriptors.
//!
//! Everything here turns an [`ExprDesc`] into requests on the emitter:
//! discharging variables into registers, materializing boolean jump lists
//! into values, and the operator hooks (`prefix`, `infix`, `posfix`) the
//! expression parser calls around each operand.
//!
//! Registers are a stack. `free_reg` is the first free one; temporaries
//! above the active locals are released strictly in reverse order of
//! allocation.

use skyc_lex::Numeral;
use skyc_util::{CompileResult, Symbol};

use crate::emit::{
    ArithOp, CompareOp, Condition, Constant, Fixup, Instruction, Operand, Reg, ResultCount,
    UnaryOp, NO_REG,
};
use crate::expr::BinaryOp;
use crate::expr_desc::{ExprDesc, ExprKind, JumpList, PatchKind, PatchSite};
use crate::fold::{fold_binary, fold_unary};
use crate::Parser;

impl<'a> Parser<'a> {
    // ========================================================================
    // EMISSION
    // ========================================================================

    /// Emits `instruction` on the line of the last consumed token.
    pub(crate) fn code(&mut self, instruction: Instruction) -> usize {
        self.emitter.emit(instruction, self.last_line)
    }

    pub(crate) fn code_at(&mut self, instruction: Instruction, line: u32) -> usize {
        self.emitter.emit(instruction, line)
    }

    pub(crate) fn jump(&mut self) -> usize {
        self.emitter.jump(self.last_line)
    }

    /// The current pc, as a jump target.
    pub(crate) fn label(&self) -> usize {
        self.emitter.pc()
    }

    pub(crate) fn string_constant(&mut self, symbol: Symbol) -> u32 {
        self.emitter.constant(Constant::String(symbol))
    }

    fn number_constant(&mut self, n: Numeral) -> u32 {
        let constant = match n {
            Numeral::Integer(i) => Constant::Integer(i),
            Numeral::Float(f) => Constant::Float(f),
        };
        self.emitter.constant(constant)
    }

    // ========================================================================
    // REGISTERS
    // ========================================================================

    /// Makes sure `n` more registers fit in the function's frame.
    pub(crate) fn check_stack(&mut self, n: u32) -> CompileResult<()> {
        let needed = self.fs().free_reg + n;
        if needed > self.fs().max_stack {
            if needed > self.limits.max_registers {
                return Err(
                    self.semantic_error("function or expression needs too many registers")
                );
            }
            self.fs_mut().max_stack = needed;
        }
        Ok(())
    }

    pub(crate) fn reserve_regs(&mut self, n: u32) -> CompileResult<()> {
        if n == 0 {
            return Ok(());
        }
        self.check_stack(n)?;
        let first = self.fs().free_reg;
        self.fs_mut().free_reg += n;
        self.emitter.reserve_registers(first, n);
        Ok(())
    }

    /// Releases `reg` if it is a temporary.
    fn free_register(&mut self, reg: Reg) {
        let fs = self.fs_mut();
        if reg >= fs.nvarstack() {
            fs.free_reg -= 1;
            debug_assert_eq!(reg, fs.free_reg, "temporaries are released in LIFO order");
        }
    }

    fn free_registers(&mut self, r1: Reg, r2: Reg) {
        if r1 > r2 {
            self.free_register(r1);
            self.free_register(r2);
        } else {
            self.free_register(r2);
            self.free_register(r1);
        }
    }

    pub(crate) fn free_exp(&mut self, e: &ExprDesc) {
        if let ExprKind::NonReloc(reg) = e.kind {
            self.free_register(reg);
        }
    }

    fn free_exps(&mut self, e1: &ExprDesc, e2: &ExprDesc) {
        match (e1.register(), e2.register()) {
            (Some(r1), Some(r2)) => self.free_registers(r1, r2),
            (Some(r), None) | (None, Some(r)) => self.free_register(r),
            (None, None) => {},
        }
    }

    // ========================================================================
    // DISCHARGING
    // ========================================================================

    /// Turns a variable into a value: locals become `NonReloc`, everything
    /// else is loaded by a relocatable instruction.
    pub(crate) fn discharge_vars(&mut self, e: &mut ExprDesc) {
        match e.kind {
            ExprKind::Local(reg) => e.kind = ExprKind::NonReloc(reg),
            ExprKind::Upvalue(upvalue) => {
                let pc = self.code(Instruction::GetUpvalue {
                    dst: NO_REG,
                    upvalue,
                });
                e.kind = ExprKind::Relocatable(pc);
            },
            ExprKind::Global(name) => {
                let name = self.string_constant(name);
                let pc = self.code(Instruction::GetGlobal { dst: NO_REG, name });
                e.kind = ExprKind::Relocatable(pc);
            },
            ExprKind::Indexed { table, key } => {
                match key {
                    Operand::Register(k) => self.free_registers(table, k),
                    Operand::Constant(_) => self.free_register(table),
                }
                let pc = self.code(Instruction::GetIndex {
                    dst: NO_REG,
                    table,
                    key,
                });
                e.kind = ExprKind::Relocatable(pc);
            },
            ExprKind::Call { .. } | ExprKind::Vararg(_) => self.set_one_ret(e),
            _ => {},
        }
    }

    /// Restricts a multi-valued expression to its first value.
    pub(crate) fn set_one_ret(&mut self, e: &mut ExprDesc) {
        match e.kind {
            ExprKind::Call { base, .. } => e.kind = ExprKind::NonReloc(base),
            ExprKind::Vararg(pc) => {
                self.emitter
                    .fixup(pc, Fixup::ResultCount(ResultCount::Fixed(1)));
                e.kind = ExprKind::Relocatable(pc);
            },
            _ => {},
        }
    }

    /// Makes a call or `...` produce `count` values at the top of the stack.
    pub(crate) fn set_returns(&mut self, e: &mut ExprDesc, count: ResultCount) -> CompileResult<()> {
        match e.kind {
            ExprKind::Call { pc, .. } => self.emitter.fixup(pc, Fixup::ResultCount(count)),
            ExprKind::Vararg(pc) => {
                self.emitter.fixup(pc, Fixup::ResultCount(count));
                let dst = self.fs().free_reg;
                self.emitter.fixup(pc, Fixup::Destination(dst));
                self.reserve_regs(1)?;
            },
            _ => {},
        }
        Ok(())
    }

    pub(crate) fn set_multret(&mut self, e: &mut ExprDesc) -> CompileResult<()> {
        self.set_returns(e, ResultCount::Multiple)
    }

    fn discharge_to_reg(&mut self, e: &mut ExprDesc, reg: Reg) {
        self.discharge_vars(e);
        match e.kind {
            ExprKind::Nil => {
                self.code(Instruction::LoadNil { dst: reg, count: 1 });
            },
            ExprKind::True | ExprKind::False => {
                self.code(Instruction::LoadBool {
                    dst: reg,
                    value: e.kind == ExprKind::True,
                    skip_next: false,
                });
            },
            ExprKind::Str(s) => {
                let constant = self.string_constant(s);
                self.code(Instruction::LoadConst { dst: reg, constant });
            },
            ExprKind::Number(n) => {
                let constant = self.number_constant(n);
                self.code(Instruction::LoadConst { dst: reg, constant });
            },
            ExprKind::Constant(constant) => {
                self.code(Instruction::LoadConst { dst: reg, constant });
            },
            ExprKind::Relocatable(pc) => self.emitter.fixup(pc, Fixup::Destination(reg)),
            ExprKind::NonReloc(src) => {
                if src != reg {
                    self.code(Instruction::Move { dst: reg, src });
                }
            },
            _ => return,
        }
        e.kind = ExprKind::NonReloc(reg);
    }

    fn discharge_to_any_reg(&mut self, e: &mut ExprDesc) -> CompileResult<Reg> {
        if let ExprKind::NonReloc(reg) = e.kind {
            return Ok(reg);
        }
        self.reserve_regs(1)?;
        let reg = self.fs().free_reg - 1;
        self.discharge_to_reg(e, reg);
        Ok(reg)
    }

    /// Puts the final value of `e`, jumps included, into `reg`.
    fn exp_to_reg(&mut self, e: &mut ExprDesc, reg: Reg) {
        self.discharge_to_reg(e, reg);
        if let ExprKind::Jump(pc) = e.kind {
            e.true_exits.push(PatchSite {
                pc,
                kind: PatchKind::Plain,
            });
        }
        if e.has_jumps() {
            let mut load_false = None;
            let mut load_true = None;
            if e.true_exits.needs_value() || e.false_exits.needs_value() {
                let skip = match e.kind {
                    ExprKind::Jump(_) => None,
                    _ => Some(self.jump()),
                };
                load_false = Some(self.code(Instruction::LoadBool {
                    dst: reg,
                    value: false,
                    skip_next: true,
                }));
                load_true = Some(self.code(Instruction::LoadBool {
                    dst: reg,
                    value: true,
                    skip_next: false,
                }));
                if let Some(skip) = skip {
                    self.patch_to_here(JumpList::plain(skip));
                }
            }
            let end = self.label();
            let false_exits = e.false_exits.take();
            self.patch_list_aux(false_exits, end, reg, load_false.unwrap_or(end));
            let true_exits = e.true_exits.take();
            self.patch_list_aux(true_exits, end, reg, load_true.unwrap_or(end));
        }
        e.kind = ExprKind::NonReloc(reg);
    }

    pub(crate) fn exp_to_next_reg(&mut self, e: &mut ExprDesc) -> CompileResult<Reg> {
        self.discharge_vars(e);
        self.free_exp(e);
        self.reserve_regs(1)?;
        let reg = self.fs().free_reg - 1;
        self.exp_to_reg(e, reg);
        Ok(reg)
    }

    /// Puts `e` in some register, reusing the one it already occupies when
    /// that is safe.
    pub(crate) fn exp_to_any_reg(&mut self, e: &mut ExprDesc) -> CompileResult<Reg> {
        self.discharge_vars(e);
        if let ExprKind::NonReloc(reg) = e.kind {
            if !e.has_jumps() {
                return Ok(reg);
            }
            if reg >= self.fs().nvarstack() {
                self.exp_to_reg(e, reg);
                return Ok(reg);
            }
        }
        self.exp_to_next_reg(e)
    }

    pub(crate) fn exp_to_val(&mut self, e: &mut ExprDesc) -> CompileResult<()> {
        if e.has_jumps() {
            self.exp_to_any_reg(e)?;
        } else {
            self.discharge_vars(e);
        }
        Ok(())
    }

    /// Operand for an instruction that accepts a register or a constant.
    pub(crate) fn exp_to_rk(&mut self, e: &mut ExprDesc) -> CompileResult<Operand> {
        self.exp_to_val(e)?;
        let constant = match e.kind {
            ExprKind::Nil => Some(self.emitter.constant(Constant::Nil)),
            ExprKind::True => Some(self.emitter.constant(Constant::Boolean(true))),
            ExprKind::False => Some(self.emitter.constant(Constant::Boolean(false))),
            ExprKind::Number(n) => Some(self.number_constant(n)),
            ExprKind::Str(s) => Some(self.string_constant(s)),
            ExprKind::Constant(k) => Some(k),
            _ => None,
        };
        match constant {
            Some(k) => {
                e.kind = ExprKind::Constant(k);
                Ok(Operand::Constant(k))
            },
            None => Ok(Operand::Register(self.exp_to_any_reg(e)?)),
        }
    }

    // ========================================================================
    // STORES
    // ========================================================================

    /// Assigns the value of `ex` to the variable `var`.
    pub(crate) fn store_var(&mut self, var: &ExprDesc, ex: &mut ExprDesc) -> CompileResult<()> {
        match var.kind {
            ExprKind::Local(reg) => {
                self.free_exp(ex);
                self.exp_to_reg(ex, reg);
                return Ok(());
            },
            ExprKind::Upvalue(upvalue) => {
                let src = self.exp_to_any_reg(ex)?;
                self.code(Instruction::SetUpvalue { upvalue, src });
            },
            ExprKind::Global(name) => {
                let value = self.exp_to_rk(ex)?;
                let name = self.string_constant(name);
                self.code(Instruction::SetGlobal { name, value });
            },
            ExprKind::Indexed { table, key } => {
                let value = self.exp_to_rk(ex)?;
                self.code(Instruction::SetIndex { table, key, value });
            },
            _ => {},
        }
        self.free_exp(ex);
        Ok(())
    }

    /// Turns `t` into the variable `t[key]`.
    pub(crate) fn indexed(&mut self, t: &mut ExprDesc, key: &mut ExprDesc) -> CompileResult<()> {
        let table = self.exp_to_any_reg(t)?;
        let key = self.exp_to_rk(key)?;
        t.kind = ExprKind::Indexed { table, key };
        Ok(())
    }

    /// `object:method` prefix of a call. Leaves the method in the returned
    /// register and the object right above it.
    pub(crate) fn method_self(&mut self, e: &mut ExprDesc, key: &mut ExprDesc) -> CompileResult<Reg> {
        let object = self.exp_to_any_reg(e)?;
        self.free_exp(e);
        let base = self.fs().free_reg;
        e.kind = ExprKind::NonReloc(base);
        self.reserve_regs(2)?;
        let method = self.exp_to_rk(key)?;
        self.code(Instruction::Method {
            base,
            object,
            method,
        });
        self.free_exp(key);
        Ok(base)
    }

    // ========================================================================
    // JUMP LISTS
    // ========================================================================

    /// Resolves every jump of `list`. Value-producing `TestSet` jumps go to
    /// `vtarget` and deliver into `reg`; the others go to `dtarget`.
    fn patch_list_aux(&mut self, list: JumpList, vtarget: usize, reg: Reg, dtarget: usize) {
        for site in list.into_sites() {
            match site.kind {
                PatchKind::TestSet { src } => {
                    let dst = (reg != NO_REG && reg != src).then_some(reg);
                    self.emitter.fixup(site.pc, Fixup::TestRegister(dst));
                    self.emitter.fixup(site.pc, Fixup::JumpTarget(vtarget));
                },
                PatchKind::Plain => self.emitter.fixup(site.pc, Fixup::JumpTarget(dtarget)),
            }
        }
    }

    pub(crate) fn patch_list(&mut self, list: JumpList, target: usize) {
        self.patch_list_aux(list, target, NO_REG, target);
    }

    pub(crate) fn patch_to_here(&mut self, list: JumpList) {
        let here = self.label();
        self.patch_list(list, here);
    }

    /// Strips the value-delivering part of every `TestSet` jump in `list`.
    fn remove_values(&mut self, list: &mut JumpList) {
        for site in list.sites_mut() {
            if let PatchKind::TestSet { .. } = site.kind {
                self.emitter.fixup(site.pc, Fixup::TestRegister(None));
                site.kind = PatchKind::Plain;
            }
        }
    }

    fn jump_on_cond(&mut self, e: &mut ExprDesc, when: bool) -> CompileResult<PatchSite> {
        let src = self.discharge_to_any_reg(e)?;
        self.free_exp(e);
        let line = self.last_line;
        let pc = self.emitter.jump_if(
            Condition::TestSet {
                dst: NO_REG,
                src,
                when,
            },
            line,
        );
        Ok(PatchSite {
            pc,
            kind: PatchKind::TestSet { src },
        })
    }

    /// Falls through when `e` is true, jumps (via `false_exits`) otherwise.
    pub(crate) fn go_if_true(&mut self, e: &mut ExprDesc) -> CompileResult<()> {
        self.discharge_vars(e);
        let site = match e.kind {
            ExprKind::Jump(pc) => {
                self.emitter.fixup(pc, Fixup::Negate);
                Some(PatchSite {
                    pc,
                    kind: PatchKind::Plain,
                })
            },
            ExprKind::Str(_) | ExprKind::Number(_) | ExprKind::True => None,
            _ => Some(self.jump_on_cond(e, false)?),
        };
        if let Some(site) = site {
            e.false_exits.push(site);
        }
        let true_exits = e.true_exits.take();
        self.patch_to_here(true_exits);
        Ok(())
    }

    /// Falls through when `e` is false, jumps (via `true_exits`) otherwise.
    pub(crate) fn go_if_false(&mut self, e: &mut ExprDesc) -> CompileResult<()> {
        self.discharge_vars(e);
        let site = match e.kind {
            ExprKind::Jump(pc) => Some(PatchSite {
                pc,
                kind: PatchKind::Plain,
            }),
            ExprKind::Nil | ExprKind::False => None,
            _ => Some(self.jump_on_cond(e, true)?),
        };
        if let Some(site) = site {
            e.true_exits.push(site);
        }
        let false_exits = e.false_exits.take();
        self.patch_to_here(false_exits);
        Ok(())
    }

    fn code_not(&mut self, e: &mut ExprDesc) -> CompileResult<()> {
        match e.kind {
            ExprKind::Nil | ExprKind::False => e.kind = ExprKind::True,
            ExprKind::Str(_) | ExprKind::Number(_) | ExprKind::True => e.kind = ExprKind::False,
            ExprKind::Jump(pc) => self.emitter.fixup(pc, Fixup::Negate),
            _ => {
                let src = self.discharge_to_any_reg(e)?;
                self.free_exp(e);
                let pc = self.code(Instruction::Unary {
                    op: UnaryOp::Not,
                    dst: NO_REG,
                    src,
                });
                e.kind = ExprKind::Relocatable(pc);
            },
        }
        std::mem::swap(&mut e.true_exits, &mut e.false_exits);
        self.remove_values(&mut e.false_exits);
        self.remove_values(&mut e.true_exits);
        Ok(())
    }

    // ========================================================================
    // OPERATORS
    // ========================================================================

    /// Applies a unary operator to `e`.
    pub(crate) fn prefix(&mut self, op: UnaryOp, e: &mut ExprDesc, line: u32) -> CompileResult<()> {
        self.discharge_vars(e);
        match op {
            UnaryOp::Minus | UnaryOp::BNot => {
                if let Some(n) = e.as_numeral().and_then(|n| fold_unary(op, n)) {
                    e.kind = ExprKind::Number(n);
                    return Ok(());
                }
                self.code_unary(op, e, line)
            },
            UnaryOp::Len => self.code_unary(op, e, line),
            UnaryOp::Not => self.code_not(e),
        }
    }

    fn code_unary(&mut self, op: UnaryOp, e: &mut ExprDesc, line: u32) -> CompileResult<()> {
        let src = self.exp_to_any_reg(e)?;
        self.free_exp(e);
        let pc = self.code_at(Instruction::Unary {
            op,
            dst: NO_REG,
            src,
        }, line);
        e.kind = ExprKind::Relocatable(pc);
        Ok(())
    }

    /// Prepares the left operand before the right one is parsed.
    pub(crate) fn infix(&mut self, op: BinaryOp, v: &mut ExprDesc) -> CompileResult<()> {
        self.discharge_vars(v);
        match op {
            BinaryOp::And => self.go_if_true(v),
            BinaryOp::Or => self.go_if_false(v),
            BinaryOp::Concat => self.exp_to_next_reg(v).map(drop),
            _ => {
                // numerals stay literal so the operation can still fold
                if v.as_numeral().is_none() {
                    self.exp_to_rk(v)?;
                }
                Ok(())
            },
        }
    }

    /// Combines `e1 op e2` into `e1`.
    pub(crate) fn posfix(
        &mut self,
        op: BinaryOp,
        e1: &mut ExprDesc,
        mut e2: ExprDesc,
        line: u32,
    ) -> CompileResult<()> {
        self.discharge_vars(&mut e2);
        match op {
            BinaryOp::And => {
                debug_assert!(e1.true_exits.is_empty());
                e2.false_exits.append(e1.false_exits.take());
                *e1 = e2;
            },
            BinaryOp::Or => {
                debug_assert!(e1.false_exits.is_empty());
                e2.true_exits.append(e1.true_exits.take());
                *e1 = e2;
            },
            BinaryOp::Concat => {
                self.exp_to_next_reg(&mut e2)?;
                let first = self.exp_to_any_reg(e1)?;
                self.code_at(Instruction::Concat { first, count: 2 }, line);
                self.free_exp(&e2);
            },
            BinaryOp::Arith(arith) => {
                if let (Some(a), Some(b)) = (e1.as_numeral(), e2.as_numeral()) {
                    if let Some(n) = fold_binary(arith, a, b) {
                        e1.kind = ExprKind::Number(n);
                        return Ok(());
                    }
                }
                self.code_arith(arith, e1, &mut e2, line)?;
            },
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => self.code_compare(op, e1, &mut e2, line)?,
        }
        Ok(())
    }

    fn code_arith(
        &mut self,
        op: ArithOp,
        e1: &mut ExprDesc,
        e2: &mut ExprDesc,
        line: u32,
    ) -> CompileResult<()> {
        let rhs = self.exp_to_rk(e2)?;
        let lhs = self.exp_to_rk(e1)?;
        self.free_exps(e1, e2);
        let pc = self.code_at(Instruction::Binary {
            op,
            dst: NO_REG,
            lhs,
            rhs,
        }, line);
        e1.kind = ExprKind::Relocatable(pc);
        Ok(())
    }

    fn code_compare(
        &mut self,
        op: BinaryOp,
        e1: &mut ExprDesc,
        e2: &mut ExprDesc,
        line: u32,
    ) -> CompileResult<()> {
        // `a > b` is emitted as `b < a`
        let (cmp, swapped, when) = match op {
            BinaryOp::Ne => (CompareOp::Eq, false, false),
            BinaryOp::Lt => (CompareOp::Lt, false, true),
            BinaryOp::Le => (CompareOp::Le, false, true),
            BinaryOp::Gt => (CompareOp::Lt, true, true),
            BinaryOp::Ge => (CompareOp::Le, true, true),
            _ => (CompareOp::Eq, false, true),
        };
        let rhs = self.exp_to_rk(e2)?;
        let lhs = self.exp_to_rk(e1)?;
        self.free_exps(e1, e2);
        let (lhs, rhs) = if swapped { (rhs, lhs) } else { (lhs, rhs) };
        let pc = self.emitter.jump_if(Condition::Compare {
            op: cmp,
            lhs,
            rhs,
            when,
        }, line);
        e1.kind = ExprKind::Jump(pc);
        Ok(())
    }
}
