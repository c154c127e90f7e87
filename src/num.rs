// ABOUTME: Shared numeric canonicalisation between encoder and decoder.
// ABOUTME: Collapses floats and big numbers into their unique simplest representation.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::float_cmp)]

use crate::types::BigNumber;

/// The simplest form a number reduces to. Encoders write this form;
/// decoders reject wire bytes that are not already in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReducedNumber {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Big(BigNumber),
}

/// Largest integer magnitude an f64 mantissa holds exactly.
const MAX_EXACT_MANTISSA: u64 = 1 << 53;

/// Collapse a finite float to an integer when it represents one exactly.
///
/// -0.0 stays a float: the integer zero is positive, so the sign would be
/// lost. The caller must reject NaN and infinities before calling this.
#[must_use]
pub fn reduce_float(value: f64) -> ReducedNumber {
    if value == 0.0 {
        return if value.is_sign_negative() {
            ReducedNumber::Float(value)
        } else {
            ReducedNumber::Signed(0)
        };
    }
    // 2^63 is exactly representable; the range checks stay strict to avoid
    // the saturating behaviour of out-of-range float casts.
    let two_pow_63 = -(i64::MIN as f64);
    if value >= i64::MIN as f64 && value < two_pow_63 {
        let as_int = value as i64;
        if as_int as f64 == value {
            return ReducedNumber::Signed(as_int);
        }
    } else if value >= two_pow_63 && value < u64::MAX as f64 {
        let as_int = value as u64;
        if as_int as f64 == value {
            return ReducedNumber::Unsigned(as_int);
        }
    }
    ReducedNumber::Float(value)
}

/// Collapse a big number to its canonical form: trailing decimal zeros move
/// into the exponent, then the value becomes an integer if it fits one,
/// else an exact double if it is one, else the normalized big number.
#[must_use]
pub fn reduce_big_number(value: BigNumber) -> ReducedNumber {
    if value.significand == 0 {
        return ReducedNumber::Signed(0);
    }

    let mut sig = value.significand;
    let mut exp = i64::from(value.exponent);
    while sig % 10 == 0 && exp < i64::from(i32::MAX) {
        sig /= 10;
        exp += 1;
    }
    let negative = value.sign < 0;

    if exp >= 0 {
        if let Some(v) = pow10(exp).and_then(|m| sig.checked_mul(m)) {
            if let Some(reduced) = try_integer(v, negative) {
                return reduced;
            }
        } else if exp <= 27 {
            // Too big for u64, but sig × 10^e = (sig × 5^e) × 2^e may still
            // be an exact double (5^28 overflows u64, bounding e).
            if let Some(m) = 5u64.checked_pow(exp as u32).and_then(|p| sig.checked_mul(p)) {
                if (m >> m.trailing_zeros()) < MAX_EXACT_MANTISSA {
                    let f = m as f64 * 2f64.powi(exp as i32);
                    return ReducedNumber::Float(if negative { -f } else { f });
                }
            }
        }
    } else {
        // sig / 10^k is a dyadic rational (hence possibly a double) only
        // when every factor of 5 in the denominator divides out.
        let k = -exp;
        let mut s = sig;
        let mut divided = 0;
        while divided < k && s % 5 == 0 {
            s /= 5;
            divided += 1;
        }
        if divided == k && k <= 1000 && (s >> s.trailing_zeros()) < MAX_EXACT_MANTISSA {
            let f = s as f64 * 2f64.powi(-(k as i32));
            return ReducedNumber::Float(if negative { -f } else { f });
        }
    }

    ReducedNumber::Big(BigNumber::new(value.sign, sig, exp as i32))
}

fn pow10(exp: i64) -> Option<u64> {
    if exp > 19 {
        return None;
    }
    10u64.checked_pow(exp as u32)
}

/// Fit a magnitude into the integer model: non-negative values prefer i64,
/// spilling to u64; negatives below i64::MIN can at best be an exact double.
fn try_integer(magnitude: u64, negative: bool) -> Option<ReducedNumber> {
    if !negative {
        return Some(if magnitude <= i64::MAX as u64 {
            ReducedNumber::Signed(magnitude as i64)
        } else {
            ReducedNumber::Unsigned(magnitude)
        });
    }
    if magnitude <= i64::MAX as u64 {
        return Some(ReducedNumber::Signed(-(magnitude as i64)));
    }
    if magnitude == i64::MAX as u64 + 1 {
        return Some(ReducedNumber::Signed(i64::MIN));
    }
    if (magnitude >> magnitude.trailing_zeros()) < MAX_EXACT_MANTISSA {
        return Some(ReducedNumber::Float(-(magnitude as f64)));
    }
    None
}
