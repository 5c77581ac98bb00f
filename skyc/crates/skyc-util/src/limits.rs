//! Static limits enforced while parsing.

use serde::{Deserialize, Serialize};

/// Limits on the size of a single function body.
///
/// The defaults match the register-machine backend: registers and upvalue
/// indices fit in one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Registers available to one function
    pub max_registers: u32,
    /// Active local variables in one function
    pub max_locals: u32,
    /// Upvalues captured by one function
    pub max_upvalues: u32,
    /// Nesting of statements and expressions ("syntax levels")
    pub max_depth: u32,
}

impl Limits {
    /// Default register count
    pub const MAX_REGISTERS: u32 = 255;
    /// Default local count
    pub const MAX_LOCALS: u32 = 200;
    /// Default upvalue count
    pub const MAX_UPVALUES: u32 = 255;
    /// Default syntax nesting
    pub const MAX_DEPTH: u32 = 200;
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_registers: Self::MAX_REGISTERS,
            max_locals: Self::MAX_LOCALS,
            max_upvalues: Self::MAX_UPVALUES,
            max_depth: Self::MAX_DEPTH,
        }
    }
}
