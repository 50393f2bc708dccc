//! Modular arithmetic operations

/// Modular arithmetic operations over Z_q for a word-sized modulus
pub struct ModQ;

impl ModQ {
    /// Add two values modulo q
    #[inline]
    pub fn add(a: u64, b: u64, q: u64) -> u64 {
        let sum = (a as u128) + (b as u128);
        (sum % (q as u128)) as u64
    }

    /// Subtract two values modulo q
    #[inline]
    pub fn sub(a: u64, b: u64, q: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            q - (b - a)
        }
    }

    /// Multiply two values modulo q
    #[inline]
    pub fn mul(a: u64, b: u64, q: u64) -> u64 {
        let prod = (a as u128) * (b as u128);
        (prod % (q as u128)) as u64
    }

    /// Negate a value modulo q
    #[inline]
    pub fn negate(a: u64, q: u64) -> u64 {
        if a == 0 {
            0
        } else {
            q - a
        }
    }

    /// Convert a signed integer to its representation in Z_q
    #[inline]
    pub fn from_signed(val: i64, q: u64) -> u64 {
        if val >= 0 {
            (val as u64) % q
        } else {
            let abs = val.unsigned_abs();
            let r = abs % q;
            if r == 0 {
                0
            } else {
                q - r
            }
        }
    }

    /// Square-and-multiply exponentiation modulo q
    pub fn pow(mut base: u64, mut exp: u64, q: u64) -> u64 {
        let mut result = 1u64 % q;
        base %= q;
        while exp > 0 {
            if exp & 1 == 1 {
                result = Self::mul(result, base, q);
            }
            exp >>= 1;
            base = Self::mul(base, base, q);
        }
        result
    }
}

/// Add modulo a composite modulus below 2^127
#[inline]
pub fn add_mod_u128(a: u128, b: u128, q: u128) -> u128 {
    let sum = a + b;
    if sum >= q {
        sum - q
    } else {
        sum
    }
}

/// Subtract modulo a composite modulus below 2^127
#[inline]
pub fn sub_mod_u128(a: u128, b: u128, q: u128) -> u128 {
    if a >= b {
        a - b
    } else {
        q - (b - a)
    }
}

/// Multiply modulo a composite modulus below 2^126.
///
/// Double-and-add, so only for setup-time constants.
pub fn mul_mod_u128(a: u128, b: u128, q: u128) -> u128 {
    let mut a = a % q;
    let mut b = b % q;
    let mut result = 0u128;
    while b > 0 {
        if b & 1 == 1 {
            result = add_mod_u128(result, a, q);
        }
        a = add_mod_u128(a, a, q);
        b >>= 1;
    }
    result
}
