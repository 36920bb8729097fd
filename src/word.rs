//! Concrete 256-bit EVM arithmetic.
//!
//! All functions operate on `Word` (an alias for `U256`) and mirror the EVM
//! specification bit-exactly: division by zero yields zero, shifts of 256 or
//! more clear the word, and the signed variants work on the two's-complement
//! view of the full 256 bits.

use crate::opcode::Opcode;
use primitive_types::{U256, U512};

/// The native machine word: an unsigned integer modulo 2^256.
pub type Word = U256;

/// Word with every bit set (2^256 − 1, also −1 in two's complement).
pub const UINT_256_MAX: Word = U256::MAX;

/// 2^160 − 1: the widest value an address-producing opcode can yield.
pub const ADDRESS_MASK: Word = U256([u64::MAX, u64::MAX, 0xffff_ffff, 0]);

// -- Serde helper for Word ---------------------------------------------------

pub(crate) mod u256_serde {
    use primitive_types::U256;
    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize a U256 as a hex string (e.g. `"0x1a2b"`).
    pub fn serialize<S: Serializer>(val: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{val:x}"))
    }

    /// Deserialize a U256 from a hex string (with or without `0x` prefix).
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        let hex_str = String::deserialize(d)?;
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(&hex_str);
        U256::from_str_radix(hex_str, 16).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Signed view helpers
// ---------------------------------------------------------------------------

/// Sign bit of the two's-complement view.
pub fn is_negative(v: Word) -> bool {
    v.bit(255)
}

/// Two's-complement negation: `-v` modulo 2^256.
pub fn negate(v: Word) -> Word {
    (!v).overflowing_add(Word::one()).0
}

/// Magnitude of the signed view: `v` itself when non-negative, `-v` otherwise.
fn magnitude(v: Word) -> Word {
    if is_negative(v) {
        negate(v)
    } else {
        v
    }
}

// ---------------------------------------------------------------------------
// Arithmetic operations
// ---------------------------------------------------------------------------

/// ADD: wrapping addition mod 2^256.
pub fn add(a: Word, b: Word) -> Word {
    a.overflowing_add(b).0
}

/// SUB: wrapping subtraction mod 2^256.
pub fn sub(a: Word, b: Word) -> Word {
    a.overflowing_sub(b).0
}

/// MUL: wrapping multiplication mod 2^256.
pub fn mul(a: Word, b: Word) -> Word {
    a.overflowing_mul(b).0
}

/// DIV: unsigned integer division (returns 0 on divide-by-zero).
pub fn div(a: Word, b: Word) -> Word {
    if b.is_zero() {
        Word::zero()
    } else {
        a / b
    }
}

/// SDIV: signed division, quotient truncated toward zero.
///
/// Both operands are reinterpreted as signed 256-bit values. Divide-by-zero
/// yields zero; `sdiv(INT_MIN, -1)` wraps back to `INT_MIN`.
pub fn sdiv(a: Word, b: Word) -> Word {
    if b.is_zero() {
        return Word::zero();
    }
    let q = magnitude(a) / magnitude(b);
    if is_negative(a) != is_negative(b) {
        negate(q)
    } else {
        q
    }
}

/// MOD: unsigned modulo (returns 0 when the modulus is zero).
pub fn modulo(a: Word, b: Word) -> Word {
    if b.is_zero() {
        Word::zero()
    } else {
        a % b
    }
}

/// SMOD: signed modulo; the remainder carries the dividend's sign.
pub fn smod(a: Word, b: Word) -> Word {
    if b.is_zero() {
        return Word::zero();
    }
    let r = magnitude(a) % magnitude(b);
    if is_negative(a) {
        negate(r)
    } else {
        r
    }
}

/// ADDMOD: `(a + b) % m` with a 512-bit intermediate, 0 when `m` is zero.
pub fn addmod(a: Word, b: Word, m: Word) -> Word {
    if m.is_zero() {
        Word::zero()
    } else {
        let sum = (U512::from(a) + U512::from(b)) % U512::from(m);
        u512_to_word(sum)
    }
}

/// MULMOD: `(a * b) % m` with a 512-bit intermediate, 0 when `m` is zero.
pub fn mulmod(a: Word, b: Word, m: Word) -> Word {
    if m.is_zero() {
        Word::zero()
    } else {
        let prod = (U512::from(a) * U512::from(b)) % U512::from(m);
        u512_to_word(prod)
    }
}

/// Take the low 256 bits of a U512.
fn u512_to_word(v: U512) -> Word {
    let limbs = v.0;
    U256([limbs[0], limbs[1], limbs[2], limbs[3]])
}

/// EXP: modular exponentiation `base^exponent mod 2^256`, square-and-multiply.
pub fn exp(base: Word, exponent: Word) -> Word {
    let mut result = Word::one();
    let mut b = base;
    let mut e = exponent;
    while !e.is_zero() {
        if e.bit(0) {
            result = result.overflowing_mul(b).0;
        }
        e >>= 1;
        if !e.is_zero() {
            b = b.overflowing_mul(b).0;
        }
    }
    result
}

/// SIGNEXTEND: extend the sign bit of the `k`-th least significant byte.
///
/// For `k >= 31` the value already spans the full word and is returned as-is.
pub fn signextend(k: Word, value: Word) -> Word {
    if k >= Word::from(31u64) {
        return value;
    }
    let bit_index = (k.low_u64() * 8 + 7) as usize;
    let sign_bit = Word::one() << bit_index;
    if !(value & sign_bit).is_zero() {
        value | negate(sign_bit)
    } else {
        value & (sign_bit - Word::one())
    }
}

// -- Comparison operations ---------------------------------------------------

/// LT: unsigned less-than, 1 or 0.
pub fn lt(a: Word, b: Word) -> Word {
    if a < b { Word::one() } else { Word::zero() }
}

/// GT: unsigned greater-than, 1 or 0.
pub fn gt(a: Word, b: Word) -> Word {
    if a > b { Word::one() } else { Word::zero() }
}

/// SLT: signed less-than on the two's-complement view.
pub fn slt(a: Word, b: Word) -> Word {
    let result = match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        // Same sign: two's-complement order matches unsigned order.
        _ => a < b,
    };
    if result { Word::one() } else { Word::zero() }
}

/// SGT: signed greater-than on the two's-complement view.
pub fn sgt(a: Word, b: Word) -> Word {
    slt(b, a)
}

/// EQ: equality, 1 or 0.
pub fn eq(a: Word, b: Word) -> Word {
    if a == b { Word::one() } else { Word::zero() }
}

/// ISZERO: 1 if the value is zero, 0 otherwise.
pub fn iszero(a: Word) -> Word {
    if a.is_zero() { Word::one() } else { Word::zero() }
}

// -- Bitwise operations ------------------------------------------------------

/// AND: bitwise conjunction.
pub fn and(a: Word, b: Word) -> Word {
    a & b
}

/// OR: bitwise disjunction.
pub fn or(a: Word, b: Word) -> Word {
    a | b
}

/// XOR: bitwise exclusive or.
pub fn xor(a: Word, b: Word) -> Word {
    a ^ b
}

/// NOT: bitwise complement.
pub fn not(a: Word) -> Word {
    !a
}

/// BYTE: the `i`-th most significant byte of `v`, or 0 when `i >= 32`.
pub fn byte(i: Word, v: Word) -> Word {
    if i >= Word::from(32u64) {
        Word::zero()
    } else {
        let shift = (31 - i.low_u64()) * 8;
        (v >> shift as usize) & Word::from(0xffu64)
    }
}

/// SHL: logical shift left, 0 when the shift amount exceeds 255.
pub fn shl(shift: Word, value: Word) -> Word {
    if shift > Word::from(255u64) {
        Word::zero()
    } else {
        value << shift.low_u64() as usize
    }
}

/// SHR: logical shift right, 0 when the shift amount exceeds 255.
pub fn shr(shift: Word, value: Word) -> Word {
    if shift > Word::from(255u64) {
        Word::zero()
    } else {
        value >> shift.low_u64() as usize
    }
}

// ---------------------------------------------------------------------------
// Dispatch table
// ---------------------------------------------------------------------------

/// Evaluate an opcode over concrete words.
///
/// Returns `None` for opcodes whose value is not computable at compile time
/// (the address-producing group) or when the argument count disagrees with
/// the opcode's arity.
pub fn eval(op: Opcode, args: &[Word]) -> Option<Word> {
    use Opcode::*;
    match (op, args) {
        (Add, [a, b]) | (SAdd, [a, b]) => Some(add(*a, *b)),
        (Sub, [a, b]) | (SSub, [a, b]) => Some(sub(*a, *b)),
        (Mul, [a, b]) | (SMul, [a, b]) => Some(mul(*a, *b)),
        (Div, [a, b]) => Some(div(*a, *b)),
        (SDiv, [a, b]) => Some(sdiv(*a, *b)),
        (Mod, [a, b]) => Some(modulo(*a, *b)),
        (SMod, [a, b]) => Some(smod(*a, *b)),
        (AddMod, [a, b, m]) => Some(addmod(*a, *b, *m)),
        (MulMod, [a, b, m]) => Some(mulmod(*a, *b, *m)),
        (Exp, [a, b]) => Some(exp(*a, *b)),
        (SignExtend, [a, b]) => Some(signextend(*a, *b)),
        (Lt, [a, b]) => Some(lt(*a, *b)),
        (Gt, [a, b]) => Some(gt(*a, *b)),
        (Slt, [a, b]) => Some(slt(*a, *b)),
        (Sgt, [a, b]) => Some(sgt(*a, *b)),
        (Eq, [a, b]) => Some(eq(*a, *b)),
        (IsZero, [a]) => Some(iszero(*a)),
        (And, [a, b]) => Some(and(*a, *b)),
        (Or, [a, b]) => Some(or(*a, *b)),
        (Xor, [a, b]) => Some(xor(*a, *b)),
        (Not, [a]) => Some(not(*a)),
        (Byte, [a, b]) => Some(byte(*a, *b)),
        (Shl, [a, b]) => Some(shl(*a, *b)),
        (Shr, [a, b]) => Some(shr(*a, *b)),
        _ => None,
    }
}
