//! Lock-protected interner shared by concurrent compilations.
//!
//! Cloning a [`SharedInterner`] clones the handle, not the table: all
//! clones agree on one namespace. Lookups of already-interned strings only
//! take the read lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use super::{InternedString, Interner, InternerStats, StringInterner, Symbol};

static GLOBAL: LazyLock<SharedInterner> = LazyLock::new(SharedInterner::new);

/// Handle to a string table behind a `parking_lot::RwLock`.
#[derive(Clone, Default)]
pub struct SharedInterner {
    inner: Arc<RwLock<StringInterner>>,
    /// Hits answered under the read lock; the table only sees write-path hits.
    read_hits: Arc<AtomicUsize>,
}

static_assertions::assert_impl_all!(SharedInterner: Send, Sync, Clone);

impl SharedInterner {
    /// Create a new, empty shared table.
    pub fn new() -> Self {
        Self::from_interner(StringInterner::new())
    }

    /// Promote a single-owner table into a shared one, keeping its symbols.
    pub fn from_interner(interner: StringInterner) -> Self {
        Self {
            inner: Arc::new(RwLock::new(interner)),
            read_hits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The process-wide instance, created on first use.
    pub fn global() -> &'static SharedInterner {
        &GLOBAL
    }

    /// Canonical symbol for `bytes`, inserting on first occurrence.
    pub fn intern(&self, bytes: &[u8]) -> Symbol {
        if let Some(symbol) = self.inner.read().get_symbol(bytes) {
            self.read_hits.fetch_add(1, Ordering::Relaxed);
            return symbol;
        }
        // Another writer may have inserted in between; `intern` re-checks.
        self.inner.write().intern(bytes)
    }

    /// Existing symbol for `bytes` without inserting.
    pub fn get_symbol(&self, bytes: &[u8]) -> Option<Symbol> {
        self.inner.read().get_symbol(bytes)
    }

    /// Stored string for `symbol`.
    pub fn get(&self, symbol: Symbol) -> Option<InternedString> {
        self.inner.read().get(symbol).cloned()
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Usage statistics.
    pub fn stats(&self) -> InternerStats {
        let mut stats = self.inner.read().stats();
        stats.hits += self.read_hits.load(Ordering::Relaxed);
        stats
    }

    /// Returns `true` if both handles refer to the same table.
    pub fn same_table(&self, other: &SharedInterner) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Cached hash of the stored string, if any.
    pub fn hash_of(&self, symbol: Symbol) -> Option<u64> {
        self.inner.read().get(symbol).map(InternedString::hash)
    }
}

impl Interner for SharedInterner {
    fn intern(&mut self, bytes: &[u8]) -> Symbol {
        SharedInterner::intern(self, bytes)
    }

    fn lookup(&self, symbol: Symbol) -> Option<InternedString> {
        self.get(symbol)
    }
}
