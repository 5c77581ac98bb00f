//! Expression descriptors.
//!
//! An [`ExprDesc`] records where the value of a partially compiled
//! expression currently lives. The parser reclassifies descriptors as it
//! discovers the context an expression is used in, and only then asks the
//! emitter for the code that materializes the value.
//!
//! Boolean control flow is carried by two [`JumpList`]s: jumps to take when
//! the expression turns out true and jumps to take when it turns out false.
//! A list is a set of emitted jumps whose target is still unknown; it is
//! consumed when it is patched, so every jump is resolved exactly once.

use skyc_lex::Numeral;
use skyc_util::Symbol;

use crate::emit::{Operand, Reg};

/// Classification of a partially compiled expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExprKind {
    /// No value: an empty expression list
    Void,
    /// `nil`
    Nil,
    /// `true`
    True,
    /// `false`
    False,
    /// Numeric literal, foldable
    Number(Numeral),
    /// String literal not yet in the constant table
    Str(Symbol),
    /// Slot in the constant table
    Constant(u32),
    /// Active local variable living in `reg`
    Local(Reg),
    /// Upvalue of the current function
    Upvalue(u32),
    /// Global variable
    Global(Symbol),
    /// `table[key]`
    Indexed {
        /// Register holding the table
        table: Reg,
        /// The key
        key: Operand,
    },
    /// Result of the instruction at this pc, destination not yet assigned
    Relocatable(usize),
    /// Value fixed in this register
    NonReloc(Reg),
    /// Comparison whose outcome is the conditional jump at this pc
    Jump(usize),
    /// Call instruction at `pc`, function in `base`
    Call {
        /// pc of the call
        pc: usize,
        /// Register of the called function
        base: Reg,
    },
    /// `...` instruction at this pc
    Vararg(usize),
}

/// How a pending jump reacts to being patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    /// Jump that produces no value
    Plain,
    /// `TestSet` jump that can deliver `src` as the expression value
    TestSet {
        /// Register tested and copied
        src: Reg,
    },
}

/// A jump waiting for its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSite {
    /// pc of the jump
    pub pc: usize,
    /// Kind of the jump
    pub kind: PatchKind,
}

/// Pending jumps sharing a target.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct JumpList(Vec<PatchSite>);

impl JumpList {
    /// An empty list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// A list holding one plain jump.
    pub fn plain(pc: usize) -> Self {
        Self(vec![PatchSite {
            pc,
            kind: PatchKind::Plain,
        }])
    }

    /// Returns true if no jump is pending.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of pending jumps.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Adds one jump.
    pub fn push(&mut self, site: PatchSite) {
        self.0.push(site);
    }

    /// Moves every jump of `other` into this list.
    pub fn append(&mut self, mut other: JumpList) {
        self.0.append(&mut other.0);
    }

    /// Takes the list, leaving an empty one.
    pub fn take(&mut self) -> JumpList {
        std::mem::take(self)
    }

    /// Returns true if some jump cannot deliver a value by itself.
    pub fn needs_value(&self) -> bool {
        self.0.iter().any(|s| s.kind == PatchKind::Plain)
    }

    /// The pending jumps.
    pub fn sites(&self) -> &[PatchSite] {
        &self.0
    }

    pub(crate) fn sites_mut(&mut self) -> &mut [PatchSite] {
        &mut self.0
    }

    pub(crate) fn into_sites(self) -> Vec<PatchSite> {
        self.0
    }
}

/// A partially compiled expression.
#[derive(Debug, PartialEq)]
pub struct ExprDesc {
    /// Where the value lives
    pub kind: ExprKind,
    /// Jumps taken when the expression is true
    pub true_exits: JumpList,
    /// Jumps taken when the expression is false
    pub false_exits: JumpList,
}

impl ExprDesc {
    /// A descriptor with no pending jumps.
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            true_exits: JumpList::new(),
            false_exits: JumpList::new(),
        }
    }

    /// The empty expression.
    pub fn void() -> Self {
        Self::new(ExprKind::Void)
    }

    /// Returns true if either exit list is non-empty.
    pub fn has_jumps(&self) -> bool {
        !self.true_exits.is_empty() || !self.false_exits.is_empty()
    }

    /// The numeric value, if this is a plain numeral.
    pub fn as_numeral(&self) -> Option<Numeral> {
        match self.kind {
            ExprKind::Number(n) if !self.has_jumps() => Some(n),
            _ => None,
        }
    }

    /// Returns true for calls and `...`, which can produce many values.
    pub fn has_multiple_results(&self) -> bool {
        matches!(self.kind, ExprKind::Call { .. } | ExprKind::Vararg(_))
    }

    /// Returns true for descriptors that can be assigned to.
    pub fn is_variable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Local(_) | ExprKind::Upvalue(_) | ExprKind::Global(_) | ExprKind::Indexed { .. }
        )
    }

    /// Register holding the value, for `NonReloc` descriptors.
    pub fn register(&self) -> Option<Reg> {
        match self.kind {
            ExprKind::NonReloc(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_take() {
        let mut a = JumpList::plain(1);
        a.append(JumpList::plain(4));
        assert_eq!(a.len(), 2);
        let taken = a.take();
        assert!(a.is_empty());
        assert_eq!(taken.sites()[1].pc, 4);
    }

    #[test]
    fn test_needs_value() {
        let mut list = JumpList::new();
        assert!(!list.needs_value());
        list.push(PatchSite {
            pc: 0,
            kind: PatchKind::TestSet { src: 2 },
        });
        assert!(!list.needs_value());
        list.push(PatchSite {
            pc: 3,
            kind: PatchKind::Plain,
        });
        assert!(list.needs_value());
    }

    #[test]
    fn test_numeral_requires_no_jumps() {
        let mut e = ExprDesc::new(ExprKind::Number(Numeral::Integer(3)));
        assert_eq!(e.as_numeral(), Some(Numeral::Integer(3)));
        e.false_exits = JumpList::plain(0);
        assert_eq!(e.as_numeral(), None);
    }

    #[test]
    fn test_classification() {
        assert!(ExprDesc::new(ExprKind::Vararg(0)).has_multiple_results());
        assert!(ExprDesc::new(ExprKind::Upvalue(0)).is_variable());
        assert!(!ExprDesc::new(ExprKind::NonReloc(0)).is_variable());
        assert_eq!(ExprDesc::new(ExprKind::NonReloc(5)).register(), Some(5));
    }
}
