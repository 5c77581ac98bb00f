//! Byte classification used by the lexer.
//!
//! Classification is ASCII-only: bytes above 0x7f are never identifier
//! characters, whitespace or digits.

/// `[A-Za-z_]`
#[inline]
pub fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// `[A-Za-z0-9_]`
#[inline]
pub fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Space, tab, vertical tab, form feed, carriage return, newline.
#[inline]
pub fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | 0x0b | 0x0c | b'\r' | b'\n')
}

/// `\n` or `\r`.
#[inline]
pub fn is_newline(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

/// Value of a hexadecimal digit.
#[inline]
pub fn hex_value(b: u8) -> Option<u32> {
    (b as char).to_digit(16)
}
