//! The code-generation seam.
//!
//! The parser never builds instructions in memory it owns. Every piece of
//! code it wants is requested from an [`Emitter`], which stands for the
//! bytecode backend and its register allocator. Requests always target the
//! innermost open function.
//!
//! Jumps are the one place where the parser goes back to code it already
//! requested: a jump is emitted with an unknown target and patched later
//! through [`Emitter::fixup`]. Instructions whose destination register is
//! not yet known (see `Relocatable` descriptors) are patched the same way.

use std::fmt;

use skyc_util::define_idx;
use skyc_util::Symbol;

use crate::func_state::UpvalueDesc;

/// Virtual machine register number.
pub type Reg = u32;

/// Placeholder for a register that will be supplied by a later fix-up.
pub const NO_REG: Reg = u32::MAX;

define_idx!(
    /// Identifies one function prototype within a compilation.
    FuncId
);

/// Where an operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A register
    Register(Reg),
    /// A slot in the function's constant table
    Constant(u32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => write!(f, "r{r}"),
            Operand::Constant(k) => write!(f, "k{k}"),
        }
    }
}

/// A compile-time constant requested through [`Emitter::constant`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    /// `nil`
    Nil,
    /// `true` or `false`
    Boolean(bool),
    /// Integer numeral
    Integer(i64),
    /// Float numeral
    Float(f64),
    /// String literal or name
    String(Symbol),
}

/// Number of values produced or consumed by a variadic instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCount {
    /// Exactly this many values
    Fixed(u32),
    /// All values up to the top of the stack
    Multiple,
}

/// Arithmetic and bitwise binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `%`
    Mod,
    /// `^`
    Pow,
    /// `/`
    Div,
    /// `//`
    IDiv,
    /// `&`
    BAnd,
    /// `|`
    BOr,
    /// `~`
    BXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

impl ArithOp {
    /// Returns true for operations that only accept integers.
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            ArithOp::BAnd | ArithOp::BOr | ArithOp::BXor | ArithOp::Shl | ArithOp::Shr
        )
    }
}

/// Unary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-`
    Minus,
    /// `~`
    BNot,
    /// `not`
    Not,
    /// `#`
    Len,
}

/// Comparison performed by a conditional jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

/// Which loop a `ForPrep`/`ForLoop` pair controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    /// `for i = a, b, c`
    Numeric,
    /// `for k, v in explist`
    Generic,
}

/// Test guarding a conditional jump.
///
/// The jump is taken when the outcome of the test equals `when`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Truthiness of a register
    Test {
        /// Register tested
        reg: Reg,
        /// Outcome that takes the jump
        when: bool,
    },
    /// Truthiness of `src`; when the jump is taken, `src` is also copied
    /// to `dst` (unless `dst` is [`NO_REG`])
    TestSet {
        /// Register receiving the value, patched later
        dst: Reg,
        /// Register tested
        src: Reg,
        /// Outcome that takes the jump
        when: bool,
    },
    /// Comparison of two operands
    Compare {
        /// Relation tested
        op: CompareOp,
        /// Left operand
        lhs: Operand,
        /// Right operand
        rhs: Operand,
        /// Outcome that takes the jump
        when: bool,
    },
}

impl Condition {
    /// The same test with the opposite polarity.
    pub fn negated(self) -> Self {
        match self {
            Condition::Test { reg, when } => Condition::Test { reg, when: !when },
            Condition::TestSet { dst, src, when } => Condition::TestSet {
                dst,
                src,
                when: !when,
            },
            Condition::Compare { op, lhs, rhs, when } => Condition::Compare {
                op,
                lhs,
                rhs,
                when: !when,
            },
        }
    }
}

/// One instruction requested through [`Emitter::emit`].
///
/// Fields holding [`NO_REG`] are filled in by a later [`Fixup`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instruction {
    /// `dst := src`
    Move {
        /// Register written
        dst: Reg,
        /// Register read
        src: Reg,
    },
    /// `dst := K[constant]`
    LoadConst {
        /// Register written
        dst: Reg,
        /// Constant table slot
        constant: u32,
    },
    /// `dst := value`, then skip the next instruction if `skip_next`
    LoadBool {
        /// Register written
        dst: Reg,
        /// Value loaded
        value: bool,
        /// Whether the following instruction is skipped
        skip_next: bool,
    },
    /// `dst .. dst + count - 1 := nil`
    LoadNil {
        /// First register cleared
        dst: Reg,
        /// Number of registers cleared
        count: u32,
    },
    /// `dst := Upvalue[upvalue]`
    GetUpvalue {
        /// Register written
        dst: Reg,
        /// Upvalue index
        upvalue: u32,
    },
    /// `Upvalue[upvalue] := src`
    SetUpvalue {
        /// Upvalue index
        upvalue: u32,
        /// Register read
        src: Reg,
    },
    /// `dst := Globals[K[name]]`
    GetGlobal {
        /// Register written
        dst: Reg,
        /// Constant slot of the name
        name: u32,
    },
    /// `Globals[K[name]] := value`
    SetGlobal {
        /// Constant slot of the name
        name: u32,
        /// Value stored
        value: Operand,
    },
    /// `dst := table[key]`
    GetIndex {
        /// Register written
        dst: Reg,
        /// Register holding the table
        table: Reg,
        /// Key
        key: Operand,
    },
    /// `table[key] := value`
    SetIndex {
        /// Register holding the table
        table: Reg,
        /// Key
        key: Operand,
        /// Value stored
        value: Operand,
    },
    /// `dst := {}` with size hints
    NewTable {
        /// Register written
        dst: Reg,
        /// Expected array part size
        array: u32,
        /// Expected hash part size
        hash: u32,
    },
    /// `table[stored + i] := table_reg + i` for the pending list items
    SetList {
        /// Register holding the table
        table: Reg,
        /// Items already stored by earlier flushes
        stored: u32,
        /// Items pending above the table register
        count: ResultCount,
    },
    /// `base + 1 := object; base := object[method]`
    Method {
        /// Register receiving the method
        base: Reg,
        /// Register holding the receiver
        object: Reg,
        /// Method name
        method: Operand,
    },
    /// `dst := lhs op rhs`
    Binary {
        /// Operation
        op: ArithOp,
        /// Register written
        dst: Reg,
        /// Left operand
        lhs: Operand,
        /// Right operand
        rhs: Operand,
    },
    /// `dst := op src`
    Unary {
        /// Operation
        op: UnaryOp,
        /// Register written
        dst: Reg,
        /// Register read
        src: Reg,
    },
    /// `first := first .. ... .. first + count - 1`
    Concat {
        /// First operand and result register
        first: Reg,
        /// Number of operands
        count: u32,
    },
    /// Call the function in `base`
    Call {
        /// Register holding the function, arguments follow it
        base: Reg,
        /// Arguments passed
        args: ResultCount,
        /// Results kept, written from `base` up
        results: ResultCount,
        /// Whether this is a tail call
        tail: bool,
    },
    /// Return `count` values starting at `first`
    Return {
        /// First register returned
        first: Reg,
        /// Values returned
        count: ResultCount,
    },
    /// `dst := closure(function)`
    Closure {
        /// Register written
        dst: Reg,
        /// Prototype instantiated
        function: FuncId,
    },
    /// Copy variadic arguments starting at `dst`
    Vararg {
        /// First register written
        dst: Reg,
        /// Values copied
        results: ResultCount,
    },
    /// Enter a `for` loop whose control registers start at `base`
    ForPrep {
        /// First control register
        base: Reg,
        /// Loop form
        kind: LoopKind,
    },
    /// Step a `for` loop and jump back while it continues
    ForLoop {
        /// First control register
        base: Reg,
        /// Loop form
        kind: LoopKind,
    },
    /// Call the iterator of a generic `for`
    GenericCall {
        /// First control register
        base: Reg,
        /// Loop variables assigned
        results: u32,
    },
    /// Mark `reg` as a to-be-closed variable
    MarkClose {
        /// Register marked
        reg: Reg,
    },
}

impl Instruction {
    /// The destination register a `Destination` fix-up assigns.
    pub fn destination_mut(&mut self) -> Option<&mut Reg> {
        match self {
            Instruction::Move { dst, .. }
            | Instruction::LoadConst { dst, .. }
            | Instruction::LoadBool { dst, .. }
            | Instruction::LoadNil { dst, .. }
            | Instruction::GetUpvalue { dst, .. }
            | Instruction::GetGlobal { dst, .. }
            | Instruction::GetIndex { dst, .. }
            | Instruction::NewTable { dst, .. }
            | Instruction::Binary { dst, .. }
            | Instruction::Unary { dst, .. }
            | Instruction::Closure { dst, .. }
            | Instruction::Vararg { dst, .. } => Some(dst),
            _ => None,
        }
    }

    /// The open result count a `ResultCount` fix-up assigns.
    pub fn results_mut(&mut self) -> Option<&mut ResultCount> {
        match self {
            Instruction::Call { results, .. } | Instruction::Vararg { results, .. } => {
                Some(results)
            },
            _ => None,
        }
    }
}

/// Patch applied to an already emitted instruction or jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixup {
    /// The jump at the patched pc goes to this pc
    JumpTarget(usize),
    /// The relocatable instruction writes this register
    Destination(Reg),
    /// The `TestSet` jump copies into this register, or becomes a plain
    /// `Test` when `None`
    TestRegister(Option<Reg>),
    /// The call or vararg produces this many results
    ResultCount(ResultCount),
    /// Final size hints of a table constructor
    TableSize {
        /// Array part size
        array: u32,
        /// Hash part size
        hash: u32,
    },
    /// The conditional jump tests the opposite outcome
    Negate,
    /// The call is in tail position
    TailCall,
}

/// Description of a finished function, passed to
/// [`Emitter::close_function`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSummary {
    /// The function closed
    pub id: FuncId,
    /// Enclosing function, `None` for the main chunk
    pub parent: Option<FuncId>,
    /// Line of the `function` keyword, 0 for the main chunk
    pub line_defined: u32,
    /// Line of the closing `end`
    pub last_line_defined: u32,
    /// Number of fixed parameters
    pub num_params: u32,
    /// Whether the function takes `...`
    pub is_vararg: bool,
    /// Registers needed
    pub max_stack: u32,
    /// Captured variables, in upvalue index order
    pub upvalues: Vec<UpvalueDesc>,
    /// Whether returning must close upvalues or to-be-closed variables
    pub needs_close: bool,
    /// First register of the implicit final `return` (returning nothing)
    pub return_base: Reg,
}

/// Backend receiving code-generation requests.
///
/// Program counters are per function: the pc of the first request of a
/// function body is 0. All requests target the innermost open function.
pub trait Emitter {
    /// A new function body starts; it becomes the innermost open function.
    fn open_function(&mut self, id: FuncId, parent: Option<FuncId>, line: u32);

    /// The innermost open function is complete.
    ///
    /// Closing implies the trailing implicit `return` with no values.
    fn close_function(&mut self, summary: FunctionSummary);

    /// Slot of `constant` in the constant table of the current function.
    fn constant(&mut self, constant: Constant) -> u32;

    /// Appends an instruction and returns its pc.
    fn emit(&mut self, instruction: Instruction, line: u32) -> usize;

    /// Appends an unconditional jump with an unknown target.
    fn jump(&mut self, line: u32) -> usize;

    /// Appends a conditional jump with an unknown target.
    fn jump_if(&mut self, condition: Condition, line: u32) -> usize;

    /// Patches the instruction or jump at `pc`.
    fn fixup(&mut self, pc: usize, fixup: Fixup);

    /// The pc the next request will receive.
    fn pc(&self) -> usize;

    /// Registers `first .. first + count` now hold live values.
    fn reserve_registers(&mut self, first: Reg, count: u32);

    /// Closes captured upvalues in registers `from` and above.
    fn close_upvalues(&mut self, from: Reg, line: u32) -> usize;
}
