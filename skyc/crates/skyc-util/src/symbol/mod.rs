//! String interning for identifiers and string constants.
//!
//! Every identifier and string literal seen by the lexer is canonicalized
//! into a [`Symbol`]. Two symbols are equal if and only if the bytes they
//! were interned from are equal, so the parser compares names and constants
//! by handle and never by content.
//!
//! # Structure
//!
//! - [`StringInterner`]: a single-owner table with chained buckets, used by
//!   one compilation at a time.
//! - [`SharedInterner`]: the same table behind a `parking_lot::RwLock`, for
//!   compilations that must agree on one namespace.
//! - [`Interner`]: the object-safe seam the lexer and parser are written
//!   against, implemented by both.
//!
//! # Example
//!
//! ```
//! use skyc_util::symbol::{Interner, StringInterner};
//!
//! let mut interner = StringInterner::new();
//! let a = interner.intern(b"counter");
//! let b = interner.intern(b"counter");
//! assert_eq!(a, b);
//! assert_eq!(interner.display(a), "counter");
//! ```

use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;

use ahash::AHasher;

mod interner;
mod shared;

pub use interner::StringInterner;
pub use shared::SharedInterner;

/// Handle to an interned string.
///
/// A symbol is only meaningful together with the interner that produced it.
/// Equality is identity: equal content always yields the same index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    index: u32,
}

static_assertions::assert_eq_size!(Symbol, u32);

impl Symbol {
    pub(crate) const fn from_index(index: u32) -> Self {
        Self { index }
    }

    /// Raw index into the owning interner.
    pub fn as_u32(self) -> u32 {
        self.index
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.index)
    }
}

/// Canonical storage for one interned byte string.
///
/// The hash is computed once at insertion and reused for every lookup and
/// rehash. Cloning is cheap; the bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct InternedString {
    hash: u64,
    bytes: Arc<[u8]>,
}

impl InternedString {
    pub(crate) fn new(hash: u64, bytes: &[u8]) -> Self {
        Self {
            hash,
            bytes: Arc::from(bytes),
        }
    }

    /// Cached 64-bit hash of the content.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for the empty string.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw content.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content as UTF-8, with invalid sequences replaced.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Hash first, then length, then bytes.
    pub(crate) fn matches(&self, hash: u64, bytes: &[u8]) -> bool {
        self.hash == hash && self.bytes.len() == bytes.len() && *self.bytes == *bytes
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.bytes))
    }
}

/// Hash used for every interned string.
///
/// `AHasher::default()` uses fixed keys, so hashes are stable for the
/// lifetime of the process.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = AHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

/// Canonicalization service shared by the lexer and the parser.
pub trait Interner {
    /// Returns the canonical symbol for `bytes`, inserting it on first use.
    fn intern(&mut self, bytes: &[u8]) -> Symbol;

    /// Returns the stored string for `symbol`, if this interner produced it.
    fn lookup(&self, symbol: Symbol) -> Option<InternedString>;

    /// Lossy UTF-8 rendering, for diagnostics.
    fn display(&self, symbol: Symbol) -> String {
        match self.lookup(symbol) {
            Some(s) => s.to_string_lossy(),
            None => format!("<unknown symbol {}>", symbol.as_u32()),
        }
    }
}

/// Statistics about interner usage.
///
/// Useful for profiling the hash distribution and the hit rate of a
/// compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InternerStats {
    /// Number of interned strings
    pub count: usize,
    /// Number of buckets
    pub capacity: usize,
    /// Number of chain links walked past a non-matching entry
    pub collisions: usize,
    /// Number of lookups that found an existing entry
    pub hits: usize,
    /// Number of lookups that inserted a new entry
    pub misses: usize,
}

impl InternerStats {
    /// Entries per bucket. Returns 0.0 if there are no buckets.
    ///
    /// # Examples
    ///
    /// ```
    /// use skyc_util::symbol::InternerStats;
    ///
    /// let stats = InternerStats { count: 100, capacity: 200, ..Default::default() };
    /// assert_eq!(stats.load_factor(), 0.5);
    /// ```
    pub fn load_factor(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.count as f64 / self.capacity as f64
        }
    }

    /// Fraction of lookups answered without inserting.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for InternerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} strings in {} buckets (load {:.2}, {} collisions, hit rate {:.1}%)",
            self.count,
            self.capacity,
            self.load_factor(),
            self.collisions,
            self.hit_rate() * 100.0
        )
    }
}
