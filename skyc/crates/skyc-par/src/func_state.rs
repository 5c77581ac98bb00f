//! Per-function compilation state.
//!
//! Every function body being compiled owns one [`FuncState`]. They live in a
//! flat arena indexed by [`FuncId`]; a nested function reaches its enclosing
//! one through `parent`, which is how upvalue resolution walks outward.

use std::fmt;

use skyc_util::Symbol;

use crate::emit::{FuncId, Reg};

/// Declared attribute of a local variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VarKind {
    /// Plain variable
    #[default]
    Regular,
    /// `<const>`: cannot be assigned after initialization
    Const,
    /// `<close>`: closed when it goes out of scope, also read-only
    Close,
}

impl VarKind {
    /// Returns true if assignments to the variable are rejected.
    pub fn is_read_only(self) -> bool {
        self != VarKind::Regular
    }
}

/// A declared local variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVar {
    /// Variable name
    pub name: Symbol,
    /// Declared attribute
    pub kind: VarKind,
}

/// A variable captured from an enclosing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpvalueDesc {
    /// Variable name
    pub name: Symbol,
    /// Captured from a register of the enclosing function (otherwise from
    /// one of its upvalues)
    pub in_stack: bool,
    /// Register or upvalue index in the enclosing function
    pub index: u32,
    /// Attribute of the captured variable
    pub kind: VarKind,
}

/// A label, or a `goto`/`break` waiting for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelDesc {
    /// Label name; `break` uses the reserved word itself
    pub name: Symbol,
    /// Label position, or pc of the pending jump
    pub pc: usize,
    /// Source line
    pub line: u32,
    /// Active locals at that point
    pub nactvar: u32,
    /// Whether the jump leaves the scope of a captured variable
    pub close: bool,
}

/// One lexical block of a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockScope {
    /// Active locals outside the block
    pub nactvar: u32,
    /// First label declared in the block
    pub first_label: usize,
    /// First pending goto created in the block
    pub first_goto: usize,
    /// Some local of the block is captured as an upvalue
    pub upval: bool,
    /// `break` targets the end of this block
    pub is_loop: bool,
    /// The block is inside the scope of a to-be-closed variable
    pub inside_tbc: bool,
    /// Free register on entry
    pub entry_free_reg: Reg,
}

/// Compilation phase of a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Opened; parameters being declared
    Open,
    /// Body being parsed
    ParsingStatements,
    /// Closing blocks and pending gotos
    Closing,
    /// Handed to the emitter
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Open => "open",
            Phase::ParsingStatements => "parsing",
            Phase::Closing => "closing",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// State of one function body.
#[derive(Debug, Clone)]
pub struct FuncState {
    /// Enclosing function, `None` for the main chunk
    pub parent: Option<FuncId>,
    /// Current phase
    pub phase: Phase,
    /// Line of the `function` keyword (0 for the main chunk)
    pub line_defined: u32,
    /// Line of the closing `end`
    pub last_line_defined: u32,
    /// Open blocks, innermost last
    pub blocks: Vec<BlockScope>,
    /// Captured variables
    pub upvalues: Vec<UpvalueDesc>,
    /// Index of the first local of this function in the parser's list
    pub first_local: usize,
    /// Index of the first label of this function in the parser's list
    pub first_label: usize,
    /// Number of active locals
    pub nactvar: u32,
    /// First free register
    pub free_reg: Reg,
    /// Highest register count used so far
    pub max_stack: u32,
    /// Fixed parameters
    pub num_params: u32,
    /// Takes `...`
    pub is_vararg: bool,
    /// Returning must close upvalues
    pub needs_close: bool,
    /// Functions defined directly inside this one
    pub children: Vec<FuncId>,
}

impl FuncState {
    /// Fresh state for a function starting at `line`.
    pub fn new(parent: Option<FuncId>, line: u32, first_local: usize, first_label: usize) -> Self {
        Self {
            parent,
            phase: Phase::Open,
            line_defined: line,
            last_line_defined: line,
            blocks: Vec::new(),
            upvalues: Vec::new(),
            first_local,
            first_label,
            nactvar: 0,
            free_reg: 0,
            // two registers are always available
            max_stack: 2,
            num_params: 0,
            is_vararg: false,
            needs_close: false,
            children: Vec::new(),
        }
    }

    /// Registers occupied by active locals.
    pub fn nvarstack(&self) -> Reg {
        self.nactvar
    }

    /// Innermost open block.
    pub fn block(&self) -> Option<&BlockScope> {
        self.blocks.last()
    }

    /// Innermost open block, mutably.
    pub fn block_mut(&mut self) -> Option<&mut BlockScope> {
        self.blocks.last_mut()
    }

    /// Index of the existing upvalue called `name`.
    pub fn find_upvalue(&self, name: Symbol) -> Option<u32> {
        self.upvalues
            .iter()
            .position(|up| up.name == name)
            .map(|i| i as u32)
    }

    /// How this function is named in limit diagnostics.
    pub fn describe(&self) -> String {
        if self.line_defined == 0 {
            "main function".to_string()
        } else {
            format!("function at line {}", self.line_defined)
        }
    }
}
