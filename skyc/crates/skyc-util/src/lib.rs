//! skyc-util - Core Utilities and Foundation Types
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! Types shared by every phase of the skyc front end:
//!
//! - [`symbol`]: string interning. Identifiers and string constants become
//!   [`Symbol`] handles so that equality is an integer comparison.
//! - [`index_vec`]: vectors addressed by typed indices, used for the
//!   function-state arena.
//! - [`error`]: the single terminal error type of a compilation unit.
//! - [`chunk`]: diagnostic names for compilation units.
//! - [`limits`]: per-function size limits, configurable through serde.
//!
//! DESIGN PRINCIPLES:
//! ------------------
//! 1. EXPLICIT SERVICES
//!    The interner is passed to the lexer and parser as a value. A shared,
//!    lock-protected instance exists for compilations that must agree on one
//!    namespace, and a process-wide one is available on request.
//!
//! 2. TYPE SAFETY
//!    Typed indices prevent mixing different ID spaces.

#![warn(missing_docs)]

pub mod chunk;
pub mod error;
pub mod index_vec;
pub mod limits;
pub mod symbol;

pub use chunk::chunk_id;
pub use error::{CompileError, CompileResult, ErrorKind};
pub use index_vec::{Idx, IndexVec};
pub use limits::Limits;
pub use symbol::{InternedString, Interner, InternerStats, SharedInterner, StringInterner, Symbol};

pub use rustc_hash::FxHashMap;
