//! Functions, blocks, local variables and labels.
//!
//! Locals, pending gotos and labels of all open functions share three flat
//! lists on the parser; each [`FuncState`] and [`BlockScope`] remembers
//! where its own part of each list starts, and truncates back to it when it
//! ends.

use skyc_util::{CompileError, CompileResult, Symbol};
use tracing::trace;

use crate::emit::{FuncId, FunctionSummary, Reg};
use crate::expr_desc::{ExprDesc, ExprKind, JumpList};
use crate::func_state::{BlockScope, FuncState, LabelDesc, LocalVar, Phase, UpvalueDesc, VarKind};
use crate::Parser;

/// Register usage observed around one block, kept for tests.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScopeRecord {
    /// First free register when the block was entered
    pub entry: Reg,
    /// First free register after the block was left
    pub exit: Reg,
    /// Temporaries still held when the block ended
    pub leaked: u32,
}

impl<'a> Parser<'a> {
    // ========================================================================
    // FUNCTIONS
    // ========================================================================

    /// Starts a new function body nested in `parent`.
    pub(crate) fn open_function(&mut self, parent: Option<FuncId>, line: u32) -> FuncId {
        let state = FuncState::new(parent, line, self.actvars.len(), self.labels.len());
        let id = self.funcs.push(state);
        if let Some(parent) = parent {
            self.funcs[parent].children.push(id);
        }
        self.fs = id;
        self.emitter.open_function(id, parent, line);
        trace!(?id, ?parent, line, "open function");
        self.enter_block(false);
        id
    }

    /// Finishes the innermost function and returns to its parent.
    pub(crate) fn close_function(&mut self) -> CompileResult<()> {
        let id = self.fs;
        self.fs_mut().phase = Phase::Closing;
        let return_base = self.fs().nvarstack();
        self.leave_block()?;

        let fs = &mut self.funcs[id];
        debug_assert!(fs.blocks.is_empty());
        fs.phase = Phase::Done;
        let summary = FunctionSummary {
            id,
            parent: fs.parent,
            line_defined: fs.line_defined,
            last_line_defined: fs.last_line_defined,
            num_params: fs.num_params,
            is_vararg: fs.is_vararg,
            max_stack: fs.max_stack,
            upvalues: fs.upvalues.clone(),
            needs_close: fs.needs_close,
            return_base,
        };
        let parent = fs.parent;
        trace!(
            ?id,
            max_stack = summary.max_stack,
            upvalues = summary.upvalues.len(),
            "close function"
        );
        self.emitter.close_function(summary);
        if let Some(parent) = parent {
            self.fs = parent;
        }
        Ok(())
    }

    // ========================================================================
    // BLOCKS
    // ========================================================================

    pub(crate) fn enter_block(&mut self, is_loop: bool) {
        let first_label = self.labels.len();
        let first_goto = self.gotos.len();
        let fs = self.fs_mut();
        debug_assert_eq!(fs.free_reg, fs.nvarstack());
        let inside_tbc = fs.block().is_some_and(|b| b.inside_tbc);
        fs.blocks.push(BlockScope {
            nactvar: fs.nactvar,
            first_label,
            first_goto,
            upval: false,
            is_loop,
            inside_tbc,
            entry_free_reg: fs.free_reg,
        });
        trace!(depth = fs.blocks.len(), is_loop, "enter block");
    }

    /// Ends the innermost block: its locals go out of scope, `break`s of a
    /// loop are resolved, and pending gotos move to the enclosing block.
    ///
    /// Returns true if a local of the block was captured as an upvalue.
    pub(crate) fn leave_block(&mut self) -> CompileResult<bool> {
        let Some(block) = self.fs_mut().blocks.pop() else {
            return Ok(false);
        };
        #[cfg(test)]
        let leaked = self.fs().free_reg - self.fs().nvarstack();

        let level = block.nactvar;
        self.remove_vars(level);
        let mut has_close = false;
        if block.is_loop {
            has_close = self.create_label(self.break_name, 0, level, block.first_goto)?;
        }
        let nested = !self.fs().blocks.is_empty();
        if !has_close && nested && block.upval {
            self.emitter.close_upvalues(level, self.last_line);
        }
        self.fs_mut().free_reg = level;
        self.labels.truncate(block.first_label);

        if nested {
            self.move_gotos_out(&block);
        } else if let Some(gt) = self.gotos.get(block.first_goto).copied() {
            return Err(self.undefined_goto(&gt));
        }

        #[cfg(test)]
        self.scope_log.push(ScopeRecord {
            entry: block.entry_free_reg,
            exit: self.fs().free_reg,
            leaked,
        });
        trace!(depth = self.fs().blocks.len(), "leave block");
        Ok(block.upval)
    }

    /// Statements of a nested block.
    pub(crate) fn block(&mut self) -> CompileResult<bool> {
        self.enter_block(false);
        let returned = self.statement_list()?;
        self.leave_block()?;
        Ok(returned)
    }

    // ========================================================================
    // LOCAL VARIABLES
    // ========================================================================

    /// Declares a local that becomes visible after
    /// [`Parser::adjust_local_vars`]. Returns its index within the function.
    pub(crate) fn new_localvar(&mut self, name: Symbol) -> CompileResult<u32> {
        let limit = self.limits.max_locals;
        let count = self.actvars.len() + 1 - self.fs().first_local;
        if count > limit as usize {
            return Err(self.limit_error(self.fs, limit, "local variables"));
        }
        self.actvars.push(LocalVar {
            name,
            kind: VarKind::Regular,
        });
        Ok(count as u32 - 1)
    }

    pub(crate) fn set_local_kind(&mut self, index: u32, kind: VarKind) {
        let slot = self.fs().first_local + index as usize;
        if let Some(var) = self.actvars.get_mut(slot) {
            var.kind = kind;
        }
    }

    /// Activates the last `n` declared locals.
    pub(crate) fn adjust_local_vars(&mut self, n: u32) {
        self.fs_mut().nactvar += n;
    }

    fn remove_vars(&mut self, level: u32) {
        let first_local = self.fs().first_local;
        self.fs_mut().nactvar = level;
        self.actvars.truncate(first_local + level as usize);
    }

    fn local_var(&self, id: FuncId, reg: Reg) -> Option<&LocalVar> {
        self.actvars
            .get(self.funcs[id].first_local + reg as usize)
    }

    pub(crate) fn local_kind(&self, id: FuncId, reg: Reg) -> VarKind {
        self.local_var(id, reg).map_or(VarKind::Regular, |v| v.kind)
    }

    pub(crate) fn local_name(&self, id: FuncId, reg: Reg) -> Option<Symbol> {
        self.local_var(id, reg).map(|v| v.name)
    }

    /// Flags the block owning the local at `level` as captured.
    fn mark_upval(&mut self, id: FuncId, level: Reg) {
        let fs = &mut self.funcs[id];
        if let Some(block) = fs.blocks.iter_mut().rev().find(|b| b.nactvar <= level) {
            block.upval = true;
        }
        fs.needs_close = true;
    }

    /// The innermost block now holds a to-be-closed variable.
    pub(crate) fn mark_to_be_closed(&mut self) {
        let fs = self.fs_mut();
        if let Some(block) = fs.block_mut() {
            block.upval = true;
            block.inside_tbc = true;
        }
        fs.needs_close = true;
    }

    // ========================================================================
    // NAME RESOLUTION
    // ========================================================================

    fn search_var(&self, id: FuncId, name: Symbol) -> Option<Reg> {
        let fs = &self.funcs[id];
        (0..fs.nactvar)
            .rev()
            .find(|&i| self.actvars.get(fs.first_local + i as usize).is_some_and(|v| v.name == name))
    }

    /// Classifies `name` as seen from function `id`, creating upvalues along
    /// the way. `base` is false when `id` is an enclosing function of the
    /// one where the name appears.
    fn resolve_var(&mut self, id: FuncId, name: Symbol, base: bool) -> CompileResult<ExprKind> {
        if let Some(reg) = self.search_var(id, name) {
            if !base {
                self.mark_upval(id, reg);
            }
            return Ok(ExprKind::Local(reg));
        }
        if let Some(index) = self.funcs[id].find_upvalue(name) {
            return Ok(ExprKind::Upvalue(index));
        }
        let Some(parent) = self.funcs[id].parent else {
            return Ok(ExprKind::Global(name));
        };
        let outer = self.resolve_var(parent, name, false)?;
        let (in_stack, index, kind) = match outer {
            ExprKind::Local(reg) => (true, reg, self.local_kind(parent, reg)),
            ExprKind::Upvalue(index) => {
                let kind = self.funcs[parent]
                    .upvalues
                    .get(index as usize)
                    .map_or(VarKind::Regular, |u| u.kind);
                (false, index, kind)
            },
            _ => return Ok(outer),
        };
        let index = self.new_upvalue(id, UpvalueDesc {
            name,
            in_stack,
            index,
            kind,
        })?;
        Ok(ExprKind::Upvalue(index))
    }

    fn new_upvalue(&mut self, id: FuncId, upvalue: UpvalueDesc) -> CompileResult<u32> {
        let limit = self.limits.max_upvalues;
        let count = self.funcs[id].upvalues.len() as u32;
        if count + 1 > limit {
            return Err(self.limit_error(id, limit, "upvalues"));
        }
        self.funcs[id].upvalues.push(upvalue);
        Ok(count)
    }

    /// Descriptor for the variable `name` in the current function.
    pub(crate) fn single_var(&mut self, name: Symbol) -> CompileResult<ExprDesc> {
        Ok(ExprDesc::new(self.resolve_var(self.fs, name, true)?))
    }

    // ========================================================================
    // GOTOS AND LABELS
    // ========================================================================

    /// Records a jump waiting for the label `name`.
    pub(crate) fn new_goto_entry(&mut self, name: Symbol, line: u32, pc: usize) {
        let nactvar = self.fs().nactvar;
        self.gotos.push(LabelDesc {
            name,
            pc,
            line,
            nactvar,
            close: false,
        });
    }

    /// Visible label of the current function called `name`.
    pub(crate) fn find_label(&self, name: Symbol) -> Option<LabelDesc> {
        self.labels[self.fs().first_label..]
            .iter()
            .find(|l| l.name == name)
            .copied()
    }

    /// Defines a label at the current pc and resolves the pending gotos of
    /// the current block that target it.
    ///
    /// Returns true if an upvalue close was emitted for them.
    pub(crate) fn create_label(
        &mut self,
        name: Symbol,
        line: u32,
        nactvar: u32,
        first_goto: usize,
    ) -> CompileResult<bool> {
        let label = LabelDesc {
            name,
            pc: self.label(),
            line,
            nactvar,
            close: false,
        };
        self.labels.push(label);
        if self.solve_gotos(&label, first_goto)? {
            let level = self.fs().nvarstack();
            self.emitter.close_upvalues(level, self.last_line);
            return Ok(true);
        }
        Ok(false)
    }

    fn solve_gotos(&mut self, label: &LabelDesc, first_goto: usize) -> CompileResult<bool> {
        let mut needs_close = false;
        let mut i = first_goto;
        while i < self.gotos.len() {
            if self.gotos[i].name == label.name {
                let gt = self.gotos.remove(i);
                needs_close |= gt.close;
                self.solve_goto(&gt, label)?;
            } else {
                i += 1;
            }
        }
        Ok(needs_close)
    }

    fn solve_goto(&mut self, gt: &LabelDesc, label: &LabelDesc) -> CompileResult<()> {
        if gt.nactvar < label.nactvar {
            let local = self
                .local_name(self.fs, gt.nactvar)
                .map(|s| self.name_of(s))
                .unwrap_or_default();
            return Err(self.semantic_error(format!(
                "<goto {}> at line {} jumps into the scope of local '{}'",
                self.name_of(gt.name),
                gt.line,
                local
            )));
        }
        self.patch_list(JumpList::plain(gt.pc), label.pc);
        Ok(())
    }

    /// Pending gotos of a finished block now belong to the enclosing one.
    fn move_gotos_out(&mut self, block: &BlockScope) {
        for gt in &mut self.gotos[block.first_goto..] {
            if gt.nactvar > block.nactvar {
                gt.close |= block.upval;
            }
            gt.nactvar = block.nactvar;
        }
    }

    fn undefined_goto(&self, gt: &LabelDesc) -> CompileError {
        if gt.name == self.break_name {
            self.semantic_error(format!("break outside a loop at line {}", gt.line))
        } else {
            self.semantic_error(format!(
                "no visible label '{}' for goto at line {}",
                self.name_of(gt.name),
                gt.line
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{compile_chunk, FuncId, Limits, RecordingEmitter, Request};
    use skyc_util::StringInterner;

    fn requests(source: &str) -> Vec<Request> {
        let mut interner = StringInterner::new();
        let mut emitter = RecordingEmitter::new();
        compile_chunk(
            source.as_bytes(),
            "=scope",
            &mut interner,
            &mut emitter,
            Limits::default(),
        )
        .expect("compiles");
        emitter.requests().to_vec()
    }

    #[test]
    fn test_break_jumps_past_loop() {
        let reqs = requests("while true do break end local x = 1");
        let closes = reqs
            .iter()
            .filter(|r| matches!(r, Request::CloseUpvalues { .. }))
            .count();
        assert_eq!(closes, 0);
        assert!(reqs.iter().any(|r| r.is_jump_target()));
    }

    #[test]
    fn test_break_out_of_captured_scope_closes() {
        let reqs = requests("while true do local a f = function() return a end break end");
        assert!(reqs
            .iter()
            .any(|r| matches!(r, Request::CloseUpvalues { from: 0, .. })));
    }

    #[test]
    fn test_backward_goto_closes_scope() {
        let reqs = requests("::top:: do local a g = function() return a end goto top end");
        let closes = reqs
            .iter()
            .filter(|r| matches!(r, Request::CloseUpvalues { from: 0, .. }))
            .count();
        assert!(closes >= 1);
    }

    #[test]
    fn test_shadowing_resolves_innermost() {
        let mut interner = StringInterner::new();
        let mut emitter = RecordingEmitter::new();
        compile_chunk(
            b"local a = 1 do local a = 2 f = function() return a end end",
            "=scope",
            &mut interner,
            &mut emitter,
            Limits::default(),
        )
        .expect("compiles");
        let summary = emitter
            .function(FuncId(1))
            .and_then(|f| f.summary.clone())
            .expect("closed");
        assert_eq!(summary.upvalues[0].index, 1);
    }

    #[test]
    fn test_close_variable_sets_needs_close() {
        let mut interner = StringInterner::new();
        let mut emitter = RecordingEmitter::new();
        compile_chunk(
            b"do local h <close> = nil end",
            "=scope",
            &mut interner,
            &mut emitter,
            Limits::default(),
        )
        .expect("compiles");
        let summary = emitter
            .function(FuncId(0))
            .and_then(|f| f.summary.clone())
            .expect("closed");
        assert!(summary.needs_close);
    }
}
