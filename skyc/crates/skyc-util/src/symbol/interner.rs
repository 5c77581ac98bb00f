//! Single-owner string table with chained buckets.
//!
//! Entries live in one `Vec` in insertion order; the index of an entry is
//! its [`Symbol`]. Buckets hold the index of the first entry of a chain and
//! every entry links to the next one in its chain, so a rehash only rewires
//! links and never moves string data.
//!
//! # Performance Characteristics
//!
//! - **Interning (hit)**: hash + chain walk comparing cached hashes
//! - **Interning (miss)**: the above + one allocation for the bytes
//! - **Lookup by symbol**: direct index
//! - **Rehash**: O(n), triggered when the load factor exceeds 3/4

use super::{hash_bytes, InternedString, Interner, InternerStats, Symbol};

const INITIAL_BUCKETS: usize = 32;

/// Rehash once `count * LOAD_DEN > buckets * LOAD_NUM`.
const LOAD_NUM: usize = 3;
const LOAD_DEN: usize = 4;

struct Entry {
    string: InternedString,
    next: Option<u32>,
}

/// String table owned by a single compilation.
///
/// Entries are never evicted: every symbol handed out stays valid for the
/// lifetime of the table.
pub struct StringInterner {
    entries: Vec<Entry>,
    buckets: Vec<Option<u32>>,
    collisions: usize,
    hits: usize,
    misses: usize,
}

impl StringInterner {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::with_buckets(INITIAL_BUCKETS)
    }

    /// Create an empty table with at least `buckets` chains.
    ///
    /// The bucket count is rounded up to a power of two.
    pub fn with_buckets(buckets: usize) -> Self {
        let buckets = buckets.max(1).next_power_of_two();
        Self {
            entries: Vec::new(),
            buckets: vec![None; buckets],
            collisions: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Canonical symbol for `bytes`, inserting on first occurrence.
    pub fn intern(&mut self, bytes: &[u8]) -> Symbol {
        let hash = hash_bytes(bytes);
        if let Some(symbol) = self.find(hash, bytes) {
            self.hits += 1;
            return symbol;
        }
        self.misses += 1;
        self.insert(hash, bytes)
    }

    /// Existing symbol for `bytes` without inserting.
    pub fn get_symbol(&self, bytes: &[u8]) -> Option<Symbol> {
        let hash = hash_bytes(bytes);
        let mut cursor = self.buckets[self.bucket_of(hash)];
        while let Some(index) = cursor {
            let entry = &self.entries[index as usize];
            if entry.string.matches(hash, bytes) {
                return Some(Symbol::from_index(index));
            }
            cursor = entry.next;
        }
        None
    }

    /// Stored string for `symbol`.
    pub fn get(&self, symbol: Symbol) -> Option<&InternedString> {
        self.entries
            .get(symbol.as_u32() as usize)
            .map(|entry| &entry.string)
    }

    /// Bytes of `symbol`, or an empty slice for a foreign handle.
    pub fn resolve(&self, symbol: Symbol) -> &[u8] {
        self.get(symbol).map(InternedString::as_bytes).unwrap_or(&[])
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Usage statistics.
    pub fn stats(&self) -> InternerStats {
        InternerStats {
            count: self.entries.len(),
            capacity: self.buckets.len(),
            collisions: self.collisions,
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Iterate over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &InternedString)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (Symbol::from_index(index as u32), &entry.string))
    }

    fn bucket_of(&self, hash: u64) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    fn find(&mut self, hash: u64, bytes: &[u8]) -> Option<Symbol> {
        let mut cursor = self.buckets[self.bucket_of(hash)];
        while let Some(index) = cursor {
            let entry = &self.entries[index as usize];
            if entry.string.matches(hash, bytes) {
                return Some(Symbol::from_index(index));
            }
            self.collisions += 1;
            cursor = entry.next;
        }
        None
    }

    fn insert(&mut self, hash: u64, bytes: &[u8]) -> Symbol {
        if (self.entries.len() + 1) * LOAD_DEN > self.buckets.len() * LOAD_NUM {
            self.rehash(self.buckets.len() * 2);
        }
        let index = self.entries.len() as u32;
        let bucket = self.bucket_of(hash);
        self.entries.push(Entry {
            string: InternedString::new(hash, bytes),
            next: self.buckets[bucket],
        });
        self.buckets[bucket] = Some(index);
        Symbol::from_index(index)
    }

    fn rehash(&mut self, new_len: usize) {
        self.buckets = vec![None; new_len];
        let mask = new_len - 1;
        for index in 0..self.entries.len() {
            let bucket = (self.entries[index].string.hash() as usize) & mask;
            self.entries[index].next = self.buckets[bucket];
            self.buckets[bucket] = Some(index as u32);
        }
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner for StringInterner {
    fn intern(&mut self, bytes: &[u8]) -> Symbol {
        StringInterner::intern(self, bytes)
    }

    fn lookup(&self, symbol: Symbol) -> Option<InternedString> {
        self.get(symbol).cloned()
    }
}
