//! Byte cursor for traversing source code.
//!
//! The cursor is the source scanner of the front end: it owns the read
//! position and the line counter over an immutable byte buffer, and it
//! performs no validation of the bytes it hands out. Malformed UTF-8 passes
//! through untouched for higher layers to reject or keep.

/// A cursor over a borrowed source buffer.
///
/// The lookahead is `Option<u8>`; `None` is the end-of-stream sentinel.
///
/// # Example
///
/// ```
/// use skyc_lex::cursor::Cursor;
///
/// let mut cursor = Cursor::new(b"x\ny");
/// assert_eq!(cursor.current(), Some(b'x'));
/// assert_eq!(cursor.advance(), Some(b'\n'));
/// assert_eq!(cursor.line(), 1);
/// assert_eq!(cursor.advance(), Some(b'y'));
/// assert_eq!(cursor.line(), 2);
/// assert_eq!(cursor.advance(), None);
/// ```
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The source bytes being traversed.
    source: &'a [u8],

    /// Current byte position in the source.
    position: usize,

    /// Current line number (1-based).
    line: u32,

    /// Newline byte just consumed that may still pair with the next one.
    pending_newline: Option<u8>,
}

/// Saved cursor state, see [`Cursor::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorSnapshot {
    position: usize,
    line: u32,
    pending_newline: Option<u8>,
}

impl<'a> Cursor<'a> {
    /// Creates a new cursor at the start of `source`, on line 1.
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            line: 1,
            pending_newline: None,
        }
    }

    /// Returns the lookahead byte, or `None` at end of stream.
    #[inline]
    pub fn current(&self) -> Option<u8> {
        self.source.get(self.position).copied()
    }

    /// Returns the byte `offset` positions after the lookahead.
    ///
    /// `peek(0)` is the lookahead itself. Peeking never changes the line.
    ///
    /// ```
    /// use skyc_lex::cursor::Cursor;
    ///
    /// let cursor = Cursor::new(b"ab");
    /// assert_eq!(cursor.peek(1), Some(b'b'));
    /// assert_eq!(cursor.peek(2), None);
    /// ```
    #[inline]
    pub fn peek(&self, offset: usize) -> Option<u8> {
        self.source.get(self.position + offset).copied()
    }

    /// Consumes the lookahead and returns the new one.
    ///
    /// Each newline sequence (`\n`, `\r`, `\r\n` or `\n\r`) increments the
    /// line exactly once, when its first byte is consumed.
    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.current()?;
        match (byte, self.pending_newline) {
            (b'\n' | b'\r', Some(first)) if first != byte => self.pending_newline = None,
            (b'\n' | b'\r', _) => {
                self.line += 1;
                self.pending_newline = Some(byte);
            },
            _ => self.pending_newline = None,
        }
        self.position += 1;
        self.current()
    }

    /// Consumes one newline sequence: `\n`, `\r`, `\r\n` or `\n\r`.
    ///
    /// The second byte of a pair is consumed only when [`advance`](Self::advance)
    /// would count it as part of the same line break.
    pub fn skip_newline(&mut self) {
        self.advance();
        if let (Some(first), Some(next)) = (self.pending_newline, self.current()) {
            if matches!(next, b'\n' | b'\r') && next != first {
                self.advance();
            }
        }
    }

    /// Consumes `count` bytes.
    pub fn advance_n(&mut self, count: usize) {
        for _ in 0..count {
            if self.advance().is_none() {
                break;
            }
        }
    }

    /// Returns true if the cursor has reached the end of the source.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    /// Consumes the lookahead if it equals `expected`.
    pub fn match_byte(&mut self, expected: u8) -> bool {
        if self.current() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Returns true if the remaining input starts with `prefix`.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.remaining().starts_with(prefix)
    }

    /// Current line number (1-based).
    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Current byte offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes from `start` up to the current position.
    pub fn slice_from(&self, start: usize) -> &'a [u8] {
        let start = start.min(self.position);
        &self.source[start..self.position]
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.source[self.position.min(self.source.len())..]
    }

    /// The whole source buffer.
    pub fn source(&self) -> &'a [u8] {
        self.source
    }

    /// Captures the current state.
    pub fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            position: self.position,
            line: self.line,
            pending_newline: self.pending_newline,
        }
    }

    /// Returns to a state captured by [`Cursor::snapshot`].
    pub fn restore(&mut self, snapshot: CursorSnapshot) {
        self.position = snapshot.position;
        self.line = snapshot.line;
        self.pending_newline = snapshot.pending_newline;
    }
}
