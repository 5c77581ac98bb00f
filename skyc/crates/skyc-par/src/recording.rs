//! An [`Emitter`] that records every request.
//!
//! The recorder keeps the raw request stream, in order, and also applies
//! each request to a per-function code listing so the result of the fix-ups
//! can be inspected. It is the backend used by the test suites and by the
//! driver's `requests` output.

use std::fmt;

use indexmap::IndexMap;
use skyc_util::{FxHashMap, Symbol};

use crate::emit::{
    Condition, Constant, Emitter, Fixup, FuncId, FunctionSummary, Instruction, Reg, NO_REG,
};

/// One request received from the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// [`Emitter::open_function`]
    OpenFunction {
        /// Function opened
        id: FuncId,
        /// Enclosing function
        parent: Option<FuncId>,
        /// Line of the definition
        line: u32,
    },
    /// [`Emitter::close_function`]
    CloseFunction(FunctionSummary),
    /// [`Emitter::constant`], with the slot handed out
    Constant {
        /// Value requested
        constant: Constant,
        /// Slot returned
        index: u32,
    },
    /// [`Emitter::emit`]
    Emit {
        /// Pc returned
        pc: usize,
        /// Instruction requested
        instruction: Instruction,
        /// Source line
        line: u32,
    },
    /// [`Emitter::jump`]
    Jump {
        /// Pc returned
        pc: usize,
        /// Source line
        line: u32,
    },
    /// [`Emitter::jump_if`]
    JumpIf {
        /// Pc returned
        pc: usize,
        /// Test guarding the jump
        condition: Condition,
        /// Source line
        line: u32,
    },
    /// [`Emitter::fixup`]
    Fixup {
        /// Pc patched
        pc: usize,
        /// Patch applied
        fixup: Fixup,
    },
    /// [`Emitter::reserve_registers`]
    ReserveRegisters {
        /// First register reserved
        first: Reg,
        /// Registers reserved
        count: u32,
    },
    /// [`Emitter::close_upvalues`]
    CloseUpvalues {
        /// Pc returned
        pc: usize,
        /// Lowest register closed
        from: Reg,
        /// Source line
        line: u32,
    },
}

impl Request {
    /// Returns true for jump-target patches.
    pub fn is_jump_target(&self) -> bool {
        matches!(
            self,
            Request::Fixup {
                fixup: Fixup::JumpTarget(_),
                ..
            }
        )
    }
}

/// Code at one pc after fix-ups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Code {
    /// A plain instruction
    Instruction(Instruction),
    /// Unconditional jump
    Jump {
        /// Patched target, `None` until fixed up
        target: Option<usize>,
    },
    /// Conditional jump
    JumpIf {
        /// Test guarding the jump
        condition: Condition,
        /// Patched target, `None` until fixed up
        target: Option<usize>,
    },
    /// Close upvalues from this register up
    CloseUpvalues {
        /// Lowest register closed
        from: Reg,
    },
}

impl Code {
    /// Jump target, for jumps and loop instructions that have received one.
    pub fn target(&self) -> Option<usize> {
        match self {
            Code::Jump { target } | Code::JumpIf { target, .. } => *target,
            _ => None,
        }
    }

    /// Returns true for jumps of either kind.
    pub fn is_jump(&self) -> bool {
        matches!(self, Code::Jump { .. } | Code::JumpIf { .. })
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = |t: &Option<usize>| match t {
            Some(pc) => pc.to_string(),
            None => "?".to_string(),
        };
        match self {
            Code::Instruction(i) => write!(f, "{i:?}"),
            Code::Jump { target: t } => write!(f, "Jump -> {}", target(t)),
            Code::JumpIf {
                condition,
                target: t,
            } => write!(f, "JumpIf {condition:?} -> {}", target(t)),
            Code::CloseUpvalues { from } => write!(f, "CloseUpvalues r{from}"),
        }
    }
}

/// Hashable identity of a constant; floats compare by bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ConstKey {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(u64),
    String(Symbol),
}

impl From<Constant> for ConstKey {
    fn from(constant: Constant) -> Self {
        match constant {
            Constant::Nil => ConstKey::Nil,
            Constant::Boolean(b) => ConstKey::Boolean(b),
            Constant::Integer(i) => ConstKey::Integer(i),
            Constant::Float(f) => ConstKey::Float(f.to_bits()),
            Constant::String(s) => ConstKey::String(s),
        }
    }
}

/// Recorded code of one function.
#[derive(Debug, Clone, Default)]
pub struct FunctionCode {
    /// Code with fix-ups applied, with its source line
    pub code: Vec<(Code, u32)>,
    /// Summary received on close
    pub summary: Option<FunctionSummary>,
    constants: IndexMap<ConstKey, Constant>,
}

impl FunctionCode {
    /// The constant table, in slot order.
    pub fn constants(&self) -> impl Iterator<Item = &Constant> {
        self.constants.values()
    }

    /// Number of constants.
    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }

    /// Instructions only, in pc order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.code.iter().filter_map(|(c, _)| match c {
            Code::Instruction(i) => Some(i),
            _ => None,
        })
    }
}

/// Records the request stream and the resulting code.
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    requests: Vec<Request>,
    functions: IndexMap<FuncId, FunctionCode>,
    open: Vec<FuncId>,
    patches: FxHashMap<(FuncId, usize), u32>,
}

impl RecordingEmitter {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request received, in order.
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Recorded code of `id`.
    pub fn function(&self, id: FuncId) -> Option<&FunctionCode> {
        self.functions.get(&id)
    }

    /// All functions, in the order they were opened.
    pub fn functions(&self) -> impl Iterator<Item = (FuncId, &FunctionCode)> {
        self.functions.iter().map(|(id, code)| (*id, code))
    }

    /// Functions opened but not closed yet.
    pub fn open_functions(&self) -> &[FuncId] {
        &self.open
    }

    /// Jumps that never received a target.
    pub fn unpatched_jumps(&self) -> Vec<(FuncId, usize)> {
        self.functions
            .iter()
            .flat_map(|(id, f)| {
                f.code
                    .iter()
                    .enumerate()
                    .filter(|(_, (c, _))| c.is_jump() && c.target().is_none())
                    .map(move |(pc, _)| (*id, pc))
            })
            .collect()
    }

    /// How many times the jump at `pc` of `id` was given a target.
    pub fn patch_count(&self, id: FuncId, pc: usize) -> u32 {
        self.patches.get(&(id, pc)).copied().unwrap_or(0)
    }

    /// Drops the code of functions left open by a failed compilation.
    pub fn discard_open(&mut self) {
        for id in self.open.drain(..) {
            self.functions.shift_remove(&id);
        }
    }

    /// Listing of one function, one line per pc.
    pub fn disassemble(&self, id: FuncId) -> String {
        let mut out = String::new();
        if let Some(f) = self.functions.get(&id) {
            for (pc, (code, line)) in f.code.iter().enumerate() {
                out.push_str(&format!("{pc:4} [{line}] {code}\n"));
            }
        }
        out
    }

    fn current(&mut self) -> Option<&mut FunctionCode> {
        let id = *self.open.last()?;
        self.functions.get_mut(&id)
    }

    fn push_code(&mut self, code: Code, line: u32) -> usize {
        match self.current() {
            Some(f) => {
                f.code.push((code, line));
                f.code.len() - 1
            },
            None => 0,
        }
    }

    fn apply(&mut self, pc: usize, fixup: Fixup) {
        let Some(id) = self.open.last().copied() else {
            return;
        };
        if let Fixup::JumpTarget(_) = fixup {
            *self.patches.entry((id, pc)).or_insert(0) += 1;
        }
        let Some((code, _)) = self.functions.get_mut(&id).and_then(|f| f.code.get_mut(pc)) else {
            return;
        };
        match (fixup, code) {
            (Fixup::JumpTarget(t), Code::Jump { target } | Code::JumpIf { target, .. }) => {
                *target = Some(t);
            },
            (Fixup::JumpTarget(_), Code::Instruction(_)) => {
                // loop instructions carry their target implicitly
            },
            (Fixup::Negate, Code::JumpIf { condition, .. }) => *condition = condition.negated(),
            (Fixup::TestRegister(reg), Code::JumpIf { condition, .. }) => {
                if let Condition::TestSet { src, when, .. } = *condition {
                    *condition = match reg {
                        Some(dst) => Condition::TestSet { dst, src, when },
                        None => Condition::Test { reg: src, when },
                    };
                }
            },
            (Fixup::Destination(reg), Code::Instruction(instr)) => {
                if let Some(dst) = instr.destination_mut() {
                    *dst = reg;
                }
            },
            (Fixup::ResultCount(count), Code::Instruction(instr)) => {
                if let Some(results) = instr.results_mut() {
                    *results = count;
                }
            },
            (Fixup::TableSize { array: a, hash: h }, Code::Instruction(instr)) => {
                if let Instruction::NewTable { array, hash, .. } = instr {
                    *array = a;
                    *hash = h;
                }
            },
            (Fixup::TailCall, Code::Instruction(Instruction::Call { tail, .. })) => *tail = true,
            _ => {},
        }
    }
}

impl Emitter for RecordingEmitter {
    fn open_function(&mut self, id: FuncId, parent: Option<FuncId>, line: u32) {
        self.requests.push(Request::OpenFunction { id, parent, line });
        self.functions.insert(id, FunctionCode::default());
        self.open.push(id);
    }

    fn close_function(&mut self, summary: FunctionSummary) {
        if let Some(f) = self.functions.get_mut(&summary.id) {
            f.summary = Some(summary.clone());
        }
        if self.open.last() == Some(&summary.id) {
            self.open.pop();
        }
        self.requests.push(Request::CloseFunction(summary));
    }

    fn constant(&mut self, constant: Constant) -> u32 {
        let index = match self.current() {
            Some(f) => {
                let (index, _) = f.constants.insert_full(ConstKey::from(constant), constant);
                index as u32
            },
            None => 0,
        };
        self.requests.push(Request::Constant { constant, index });
        index
    }

    fn emit(&mut self, instruction: Instruction, line: u32) -> usize {
        let pc = self.push_code(Code::Instruction(instruction), line);
        self.requests.push(Request::Emit {
            pc,
            instruction,
            line,
        });
        pc
    }

    fn jump(&mut self, line: u32) -> usize {
        let pc = self.push_code(Code::Jump { target: None }, line);
        self.requests.push(Request::Jump { pc, line });
        pc
    }

    fn jump_if(&mut self, condition: Condition, line: u32) -> usize {
        let pc = self.push_code(
            Code::JumpIf {
                condition,
                target: None,
            },
            line,
        );
        self.requests.push(Request::JumpIf {
            pc,
            condition,
            line,
        });
        pc
    }

    fn fixup(&mut self, pc: usize, fixup: Fixup) {
        self.apply(pc, fixup);
        self.requests.push(Request::Fixup { pc, fixup });
    }

    fn pc(&self) -> usize {
        self.open
            .last()
            .and_then(|id| self.functions.get(id))
            .map_or(0, |f| f.code.len())
    }

    fn reserve_registers(&mut self, first: Reg, count: u32) {
        debug_assert_ne!(first, NO_REG);
        self.requests.push(Request::ReserveRegisters { first, count });
    }

    fn close_upvalues(&mut self, from: Reg, line: u32) -> usize {
        let pc = self.push_code(Code::CloseUpvalues { from }, line);
        self.requests.push(Request::CloseUpvalues { pc, from, line });
        pc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{Operand, ResultCount};

    fn open_main(rec: &mut RecordingEmitter) {
        rec.open_function(FuncId(0), None, 0);
    }

    #[test]
    fn test_pc_is_per_function() {
        let mut rec = RecordingEmitter::new();
        open_main(&mut rec);
        rec.emit(Instruction::LoadNil { dst: 0, count: 1 }, 1);
        assert_eq!(rec.pc(), 1);
        rec.open_function(FuncId(1), Some(FuncId(0)), 2);
        assert_eq!(rec.pc(), 0);
        assert_eq!(rec.jump(2), 0);
        rec.fixup(0, Fixup::JumpTarget(1));
        assert_eq!(rec.open_functions(), &[FuncId(0), FuncId(1)]);
    }

    #[test]
    fn test_constants_are_deduplicated() {
        let mut rec = RecordingEmitter::new();
        open_main(&mut rec);
        assert_eq!(rec.constant(Constant::Integer(1)), 0);
        assert_eq!(rec.constant(Constant::Float(1.0)), 1);
        assert_eq!(rec.constant(Constant::Integer(1)), 0);
        assert_eq!(rec.function(FuncId(0)).map(|f| f.constant_count()), Some(2));
    }

    #[test]
    fn test_fixups_are_applied() {
        let mut rec = RecordingEmitter::new();
        open_main(&mut rec);
        let get = rec.emit(Instruction::GetGlobal { dst: NO_REG, name: 0 }, 1);
        rec.fixup(get, Fixup::Destination(3));
        let jmp = rec.jump_if(
            Condition::TestSet {
                dst: NO_REG,
                src: 3,
                when: false,
            },
            1,
        );
        rec.fixup(jmp, Fixup::TestRegister(None));
        rec.fixup(jmp, Fixup::Negate);
        rec.fixup(jmp, Fixup::JumpTarget(5));

        let f = rec.function(FuncId(0)).expect("recorded");
        assert_eq!(
            f.code[0].0,
            Code::Instruction(Instruction::GetGlobal { dst: 3, name: 0 })
        );
        assert_eq!(
            f.code[1].0,
            Code::JumpIf {
                condition: Condition::Test { reg: 3, when: true },
                target: Some(5),
            }
        );
        assert_eq!(rec.patch_count(FuncId(0), jmp), 1);
        assert!(rec.unpatched_jumps().is_empty());
    }

    #[test]
    fn test_unpatched_jumps_reported() {
        let mut rec = RecordingEmitter::new();
        open_main(&mut rec);
        rec.jump(1);
        rec.emit(
            Instruction::Return {
                first: 0,
                count: ResultCount::Fixed(0),
            },
            1,
        );
        assert_eq!(rec.unpatched_jumps(), vec![(FuncId(0), 0)]);
    }

    #[test]
    fn test_discard_open() {
        let mut rec = RecordingEmitter::new();
        open_main(&mut rec);
        rec.emit(
            Instruction::SetGlobal {
                name: 0,
                value: Operand::Constant(1),
            },
            1,
        );
        rec.discard_open();
        assert!(rec.function(FuncId(0)).is_none());
        assert!(rec.open_functions().is_empty());
    }
}
