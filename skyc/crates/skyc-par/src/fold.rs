//! Compile-time evaluation of arithmetic on numerals.
//!
//! Folding never changes what a program observes at run time: an operation
//! that would raise an error (integer division by zero, bitwise operation on
//! a non-integral float) is left to the virtual machine, and so are float
//! results that are NaN or zero, whose sign and identity do not survive a
//! trip through the constant table.

use skyc_lex::Numeral;

use crate::emit::{ArithOp, UnaryOp};

/// Folds `lhs op rhs`, if the result is a safe constant.
pub fn fold_binary(op: ArithOp, lhs: Numeral, rhs: Numeral) -> Option<Numeral> {
    if !is_valid(op, lhs, rhs) {
        return None;
    }
    let result = if op.is_bitwise() {
        Numeral::Integer(int_arith(op, lhs.as_i64()?, rhs.as_i64()?)?)
    } else {
        match (op, lhs, rhs) {
            (ArithOp::Div | ArithOp::Pow, _, _) => {
                Numeral::Float(float_arith(op, lhs.as_f64(), rhs.as_f64())?)
            },
            (_, Numeral::Integer(a), Numeral::Integer(b)) => Numeral::Integer(int_arith(op, a, b)?),
            _ => Numeral::Float(float_arith(op, lhs.as_f64(), rhs.as_f64())?),
        }
    };
    accept(result)
}

/// Folds unary minus and bitwise not.
pub fn fold_unary(op: UnaryOp, operand: Numeral) -> Option<Numeral> {
    let result = match (op, operand) {
        (UnaryOp::Minus, Numeral::Integer(i)) => Numeral::Integer(i.wrapping_neg()),
        (UnaryOp::Minus, Numeral::Float(f)) => Numeral::Float(-f),
        (UnaryOp::BNot, n) => Numeral::Integer(!n.as_i64()?),
        _ => return None,
    };
    accept(result)
}

fn is_valid(op: ArithOp, lhs: Numeral, rhs: Numeral) -> bool {
    if op.is_bitwise() {
        return lhs.as_i64().is_some() && rhs.as_i64().is_some();
    }
    match op {
        ArithOp::Div | ArithOp::IDiv | ArithOp::Mod => !rhs.is_zero(),
        _ => true,
    }
}

fn accept(result: Numeral) -> Option<Numeral> {
    match result {
        Numeral::Float(f) if f.is_nan() || f == 0.0 => None,
        n => Some(n),
    }
}

fn int_arith(op: ArithOp, a: i64, b: i64) -> Option<i64> {
    let value = match op {
        ArithOp::Add => a.wrapping_add(b),
        ArithOp::Sub => a.wrapping_sub(b),
        ArithOp::Mul => a.wrapping_mul(b),
        ArithOp::Mod => int_mod(a, b),
        ArithOp::IDiv => int_floor_div(a, b),
        ArithOp::BAnd => a & b,
        ArithOp::BOr => a | b,
        ArithOp::BXor => a ^ b,
        ArithOp::Shl => shift_left(a, b),
        ArithOp::Shr => shift_left(a, b.wrapping_neg()),
        ArithOp::Div | ArithOp::Pow => return None,
    };
    Some(value)
}

fn float_arith(op: ArithOp, a: f64, b: f64) -> Option<f64> {
    let value = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::Pow => a.powf(b),
        ArithOp::IDiv => (a / b).floor(),
        ArithOp::Mod => float_mod(a, b),
        _ => return None,
    };
    Some(value)
}

// The divisor is never zero here.
fn int_floor_div(a: i64, b: i64) -> i64 {
    if b == -1 {
        return a.wrapping_neg();
    }
    let q = a / b;
    if (a ^ b) < 0 && a % b != 0 {
        q - 1
    } else {
        q
    }
}

fn int_mod(a: i64, b: i64) -> i64 {
    if b == -1 {
        return 0;
    }
    let r = a % b;
    if r != 0 && (r ^ b) < 0 {
        r + b
    } else {
        r
    }
}

fn float_mod(a: f64, b: f64) -> f64 {
    let m = a % b;
    if (m > 0.0 && b < 0.0) || (m < 0.0 && b > 0.0) {
        m + b
    } else {
        m
    }
}

fn shift_left(x: i64, n: i64) -> i64 {
    const BITS: i64 = 64;
    if n <= -BITS || n >= BITS {
        0
    } else if n >= 0 {
        ((x as u64) << n) as i64
    } else {
        ((x as u64) >> -n) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Numeral::{Float, Integer};

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(fold_binary(ArithOp::Add, Integer(1), Integer(2)), Some(Integer(3)));
        assert_eq!(fold_binary(ArithOp::Mul, Integer(6), Integer(7)), Some(Integer(42)));
        assert_eq!(
            fold_binary(ArithOp::Add, Integer(i64::MAX), Integer(1)),
            Some(Integer(i64::MIN))
        );
    }

    #[test]
    fn test_mixed_promotes_to_float() {
        assert_eq!(fold_binary(ArithOp::Add, Integer(1), Float(0.5)), Some(Float(1.5)));
        assert_eq!(fold_binary(ArithOp::Div, Integer(7), Integer(2)), Some(Float(3.5)));
        assert_eq!(fold_binary(ArithOp::Pow, Integer(2), Integer(10)), Some(Float(1024.0)));
    }

    #[test]
    fn test_floor_division_and_modulo() {
        assert_eq!(fold_binary(ArithOp::IDiv, Integer(7), Integer(2)), Some(Integer(3)));
        assert_eq!(fold_binary(ArithOp::IDiv, Integer(-7), Integer(2)), Some(Integer(-4)));
        assert_eq!(fold_binary(ArithOp::Mod, Integer(-7), Integer(3)), Some(Integer(2)));
        assert_eq!(fold_binary(ArithOp::Mod, Integer(7), Integer(-3)), Some(Integer(-2)));
        assert_eq!(fold_binary(ArithOp::Mod, Float(5.5), Integer(2)), Some(Float(1.5)));
        assert_eq!(fold_binary(ArithOp::Mod, Float(-5.5), Integer(2)), Some(Float(0.5)));
        assert_eq!(
            fold_binary(ArithOp::IDiv, Integer(i64::MIN), Integer(-1)),
            Some(Integer(i64::MIN))
        );
    }

    #[test]
    fn test_division_by_zero_not_folded() {
        assert_eq!(fold_binary(ArithOp::Div, Integer(1), Integer(0)), None);
        assert_eq!(fold_binary(ArithOp::IDiv, Integer(1), Integer(0)), None);
        assert_eq!(fold_binary(ArithOp::Mod, Float(1.0), Float(0.0)), None);
    }

    #[test]
    fn test_zero_and_nan_results_not_folded() {
        assert_eq!(fold_binary(ArithOp::Sub, Float(1.0), Float(1.0)), None);
        assert_eq!(fold_binary(ArithOp::Mul, Float(0.0), Integer(5)), None);
        assert_eq!(fold_unary(UnaryOp::Minus, Float(0.0)), None);
        // integer zero is fine
        assert_eq!(fold_binary(ArithOp::Sub, Integer(1), Integer(1)), Some(Integer(0)));
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(fold_binary(ArithOp::BAnd, Integer(6), Integer(3)), Some(Integer(2)));
        assert_eq!(fold_binary(ArithOp::BOr, Float(4.0), Integer(1)), Some(Integer(5)));
        assert_eq!(fold_binary(ArithOp::BXor, Float(1.5), Integer(1)), None);
        assert_eq!(fold_binary(ArithOp::Shl, Integer(1), Integer(4)), Some(Integer(16)));
        assert_eq!(fold_binary(ArithOp::Shr, Integer(-1), Integer(60)), Some(Integer(15)));
        assert_eq!(fold_binary(ArithOp::Shl, Integer(1), Integer(64)), Some(Integer(0)));
        assert_eq!(fold_binary(ArithOp::Shl, Integer(8), Integer(-2)), Some(Integer(2)));
    }

    #[test]
    fn test_unary() {
        assert_eq!(fold_unary(UnaryOp::Minus, Integer(5)), Some(Integer(-5)));
        assert_eq!(fold_unary(UnaryOp::Minus, Float(2.5)), Some(Float(-2.5)));
        assert_eq!(fold_unary(UnaryOp::BNot, Integer(0)), Some(Integer(-1)));
        assert_eq!(fold_unary(UnaryOp::BNot, Float(0.5)), None);
        assert_eq!(fold_unary(UnaryOp::Len, Integer(3)), None);
        assert_eq!(fold_unary(UnaryOp::Not, Integer(3)), None);
    }
}
