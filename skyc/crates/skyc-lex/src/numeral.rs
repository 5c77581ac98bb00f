//! Conversion of numeral lexemes into values.
//!
//! The lexer accepts a permissive, regular superset of the numeral grammar
//! and hands the raw lexeme to the parser; this module is the boundary
//! where malformed numerals are rejected.

use std::fmt;

use crate::ctype::{hex_value, is_space};

/// A numeric constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeral {
    /// 64-bit two's complement integer
    Integer(i64),
    /// IEEE 754 double
    Float(f64),
}

impl Numeral {
    /// Value as a float.
    pub fn as_f64(self) -> f64 {
        match self {
            Numeral::Integer(i) => i as f64,
            Numeral::Float(f) => f,
        }
    }

    /// Value as an integer, if it has an exact integer representation.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Numeral::Integer(i) => Some(i),
            Numeral::Float(f) => float_to_i64(f),
        }
    }

    /// Returns true for the integer zero and for both float zeroes.
    pub fn is_zero(self) -> bool {
        match self {
            Numeral::Integer(i) => i == 0,
            Numeral::Float(f) => f == 0.0,
        }
    }
}

impl fmt::Display for Numeral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeral::Integer(i) => write!(f, "{i}"),
            Numeral::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Numeral::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Exact float to integer conversion.
pub fn float_to_i64(f: f64) -> Option<i64> {
    // 2^63 is the first float that does not fit.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}

/// Convert a numeral to its value.
///
/// - Decimal integers that overflow become floats.
/// - Hexadecimal integers wrap around modulo 2^64.
/// - Hexadecimal floats use a binary exponent (`0x1.8p3` is 12.0).
///
/// Leading and trailing whitespace and one leading `-` are accepted.
///
/// ```
/// use skyc_lex::numeral::{str_to_number, Numeral};
///
/// assert_eq!(str_to_number(b"10"), Some(Numeral::Integer(10)));
/// assert_eq!(str_to_number(b".5"), Some(Numeral::Float(0.5)));
/// assert_eq!(str_to_number(b"0xff"), Some(Numeral::Integer(255)));
/// assert_eq!(str_to_number(b"1.2.3"), None);
/// ```
pub fn str_to_number(text: &[u8]) -> Option<Numeral> {
    let text = trim(text);
    if let Some(i) = str_to_int(text) {
        return Some(Numeral::Integer(i));
    }
    str_to_float(text).map(Numeral::Float)
}

fn trim(mut text: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = text {
        if !is_space(*first) {
            break;
        }
        text = rest;
    }
    while let [rest @ .., last] = text {
        if !is_space(*last) {
            break;
        }
        text = rest;
    }
    text
}

fn split_sign(text: &[u8]) -> (bool, &[u8]) {
    match text {
        [b'-', rest @ ..] => (true, rest),
        _ => (false, text),
    }
}

fn hex_body(text: &[u8]) -> Option<&[u8]> {
    match text {
        [b'0', b'x' | b'X', rest @ ..] => Some(rest),
        _ => None,
    }
}

fn str_to_int(text: &[u8]) -> Option<i64> {
    let (negative, digits) = split_sign(text);
    let value = if let Some(hex) = hex_body(digits) {
        if hex.is_empty() {
            return None;
        }
        let mut acc: u64 = 0;
        for &b in hex {
            acc = acc.wrapping_mul(16).wrapping_add(u64::from(hex_value(b)?));
        }
        acc
    } else {
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let mut acc: u64 = 0;
        for &b in digits {
            acc = acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
        }
        // i64::MIN is written as a negated 2^63.
        let limit = if negative { 1u64 << 63 } else { i64::MAX as u64 };
        if acc > limit {
            return None;
        }
        acc
    };
    let value = value as i64;
    Some(if negative { value.wrapping_neg() } else { value })
}

fn str_to_float(text: &[u8]) -> Option<f64> {
    let (negative, body) = split_sign(text);
    let value = if let Some(hex) = hex_body(body) {
        hex_to_float(hex)?
    } else {
        // `inf` and `nan` are not numerals.
        if body.iter().any(|b| matches!(b, b'n' | b'N' | b'i' | b'I')) {
            return None;
        }
        std::str::from_utf8(body).ok()?.parse::<f64>().ok()?
    };
    Some(if negative { -value } else { value })
}

fn hex_to_float(text: &[u8]) -> Option<f64> {
    // 16 hex digits fill a u64; later nonzero digits only matter for rounding.
    const MAX_SIG_DIGITS: u32 = 16;
    let mut mantissa: u64 = 0;
    let mut sticky = false;
    let mut exponent: i64 = 0;
    let mut significant = 0u32;
    let mut any_digit = false;
    let mut seen_dot = false;
    let mut rest = text;

    while let [b, tail @ ..] = rest {
        if *b == b'.' {
            if seen_dot {
                return None;
            }
            seen_dot = true;
        } else if let Some(v) = hex_value(*b) {
            any_digit = true;
            if significant == 0 && v == 0 {
                // leading zeroes carry no precision
            } else if significant < MAX_SIG_DIGITS {
                significant += 1;
                mantissa = (mantissa << 4) | u64::from(v);
            } else {
                sticky |= v != 0;
                exponent += 1;
            }
            if seen_dot {
                exponent -= 1;
            }
        } else {
            break;
        }
        rest = tail;
    }
    if !any_digit {
        return None;
    }
    exponent *= 4;

    if let [b'p' | b'P', tail @ ..] = rest {
        let (negative, digits) = match tail {
            [b'+', d @ ..] => (false, d),
            [b'-', d @ ..] => (true, d),
            d => (false, d),
        };
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
        let mut e: i64 = 0;
        for &b in digits {
            e = e.saturating_mul(10).saturating_add(i64::from(b - b'0'));
        }
        exponent = exponent.saturating_add(if negative { -e } else { e });
        rest = &[];
    }
    if !rest.is_empty() {
        return None;
    }
    Some(compose_float(mantissa, sticky, exponent.clamp(-4000, 4000)))
}

/// Rounds `mantissa * 2^exponent` to the nearest double, ties to even.
///
/// `sticky` marks nonzero bits below the mantissa.
fn compose_float(mantissa: u64, sticky: bool, exponent: i64) -> f64 {
    if mantissa == 0 {
        return 0.0;
    }
    let top = 63 - i64::from(mantissa.leading_zeros());
    // weight of the last bit the result can hold
    let lsb = (top + exponent - 52).max(-1074);
    let shift = lsb - exponent;
    if shift <= 0 {
        // at most 53 significant bits: exact
        return mantissa as f64 * pow2(exponent);
    }

    let (kept, dropped, half) = match shift {
        1..=63 => (
            mantissa >> shift,
            mantissa & ((1u64 << shift) - 1),
            1u64 << (shift - 1),
        ),
        64 => (0, mantissa, 1u64 << 63),
        _ => (0, 0, 1),
    };
    let round_up = dropped > half || (dropped == half && (sticky || kept & 1 == 1));
    let rounded = kept + u64::from(round_up);
    rounded as f64 * pow2(lsb)
}

/// Exact `2^k`, saturating to infinity or zero outside the double range.
fn pow2(k: i64) -> f64 {
    match k {
        -1022..=1023 => f64::from_bits(((k + 1023) as u64) << 52),
        -1074..=-1023 => f64::from_bits(1u64 << (k + 1074)),
        _ if k > 0 => f64::INFINITY,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_integers() {
        assert_eq!(str_to_number(b"0"), Some(Numeral::Integer(0)));
        assert_eq!(str_to_number(b"10"), Some(Numeral::Integer(10)));
        assert_eq!(
            str_to_number(b"9223372036854775807"),
            Some(Numeral::Integer(i64::MAX))
        );
        assert_eq!(
            str_to_number(b"-9223372036854775808"),
            Some(Numeral::Integer(i64::MIN))
        );
    }

    #[test]
    fn test_decimal_overflow_becomes_float() {
        assert_eq!(
            str_to_number(b"9223372036854775808"),
            Some(Numeral::Float(9_223_372_036_854_775_808.0))
        );
    }

    #[test]
    fn test_floats() {
        assert_eq!(str_to_number(b"10."), Some(Numeral::Float(10.0)));
        assert_eq!(str_to_number(b".5"), Some(Numeral::Float(0.5)));
        assert_eq!(str_to_number(b"1e10"), Some(Numeral::Float(1e10)));
        assert_eq!(str_to_number(b"2.5E-3"), Some(Numeral::Float(2.5e-3)));
        assert_eq!(str_to_number(b" 3.0 "), Some(Numeral::Float(3.0)));
    }

    #[test]
    fn test_hex() {
        assert_eq!(str_to_number(b"0x10"), Some(Numeral::Integer(16)));
        assert_eq!(str_to_number(b"0XfF"), Some(Numeral::Integer(255)));
        assert_eq!(
            str_to_number(b"0xffffffffffffffff"),
            Some(Numeral::Integer(-1))
        );
        assert_eq!(str_to_number(b"0x1p4"), Some(Numeral::Float(16.0)));
        assert_eq!(str_to_number(b"0x1.8p3"), Some(Numeral::Float(12.0)));
        assert_eq!(str_to_number(b"0xA.8"), Some(Numeral::Float(10.5)));
        assert_eq!(str_to_number(b"0x.1p4"), Some(Numeral::Float(1.0)));
    }

    #[test]
    fn test_hex_float_subnormals() {
        assert_eq!(
            str_to_number(b"0x1p-1074"),
            Some(Numeral::Float(f64::from_bits(1)))
        );
        assert_eq!(
            str_to_number(b"0x1p-1060"),
            Some(Numeral::Float(f64::from_bits(1 << 14)))
        );
        assert_eq!(
            str_to_number(b"0x1fffffffffffffp-1074"),
            Some(Numeral::Float(f64::from_bits(0x001f_ffff_ffff_ffff)))
        );
        assert_eq!(str_to_number(b"0x1p-1076"), Some(Numeral::Float(0.0)));
        assert_eq!(
            str_to_number(b"0x1.8p-1075"),
            Some(Numeral::Float(f64::from_bits(1)))
        );
    }

    #[test]
    fn test_hex_float_rounds_once() {
        let next_after_one = Some(Numeral::Float(1.0 + f64::EPSILON));
        assert_eq!(str_to_number(b"0x1.000000000000081p0"), next_after_one);
        // exact tie goes to even
        assert_eq!(
            str_to_number(b"0x1.000000000000080p0"),
            Some(Numeral::Float(1.0))
        );
        // digits past the sixteenth break the tie
        assert_eq!(str_to_number(b"0x1.0000000000000800001p0"), next_after_one);
        assert_eq!(str_to_number(b"0x1p1024"), Some(Numeral::Float(f64::INFINITY)));
        assert_eq!(
            str_to_number(b"0x1.fffffffffffffp1023"),
            Some(Numeral::Float(f64::MAX))
        );
    }

    #[test]
    fn test_malformed() {
        for bad in [
            &b"1.2.3"[..],
            b"1e",
            b"1e+",
            b"3x",
            b"0x",
            b"0x1p",
            b"0xg",
            b"",
            b".",
            b"inf",
            b"nan",
            b"1..2",
        ] {
            assert_eq!(str_to_number(bad), None, "{:?}", String::from_utf8_lossy(bad));
        }
    }

    #[test]
    fn test_float_to_i64() {
        assert_eq!(float_to_i64(3.0), Some(3));
        assert_eq!(float_to_i64(-0.0), Some(0));
        assert_eq!(float_to_i64(3.5), None);
        assert_eq!(float_to_i64(f64::NAN), None);
        assert_eq!(float_to_i64(9_223_372_036_854_775_808.0), None);
        assert_eq!(float_to_i64(-9_223_372_036_854_775_808.0), Some(i64::MIN));
    }

    #[test]
    fn test_display() {
        assert_eq!(Numeral::Integer(-4).to_string(), "-4");
        assert_eq!(Numeral::Float(2.0).to_string(), "2.0");
        assert_eq!(Numeral::Float(0.25).to_string(), "0.25");
    }
}
