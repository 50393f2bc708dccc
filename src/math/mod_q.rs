//! Coefficient modulus chain.
//!
//! Every prime here has the form `c * 2^32 + 1`, so it supports the negacyclic
//! NTT for every ring dimension up to 2^31 and any product of them is
//! congruent to 1 modulo every plaintext modulus `2^logt` with `logt <= 32`.
//! The last property keeps plaintext multiplication from adding a rounding
//! term to the noise.

/// First prime of the chain (62 bits).
pub const Q0: u64 = 4611685941117976577;

/// Second prime of the chain (62 bits).
pub const Q1: u64 = 4611685692009873409;

/// Prime modulus chain, in the order moduli are taken.
pub const COEFF_MODULI: [u64; 2] = [Q0, Q1];

/// Returns the first `count` primes of the chain.
///
/// `count` is clamped to the chain length.
pub fn modulus_chain(count: usize) -> &'static [u64] {
    &COEFF_MODULI[..count.min(COEFF_MODULI.len())]
}

/// Whether `q` admits a negacyclic NTT of dimension `n`.
pub fn supports_ntt(q: u64, n: usize) -> bool {
    q % (2 * n as u64) == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::modular::ModQ;

    fn is_probable_prime(n: u64) -> bool {
        let mut d = n - 1;
        let mut s = 0;
        while d % 2 == 0 {
            d /= 2;
            s += 1;
        }
        'witness: for a in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
            let mut x = ModQ::pow(a, d, n);
            if x == 1 || x == n - 1 {
                continue;
            }
            for _ in 0..s - 1 {
                x = ModQ::mul(x, x, n);
                if x == n - 1 {
                    continue 'witness;
                }
            }
            return false;
        }
        true
    }

    #[test]
    fn test_chain_is_prime() {
        for q in COEFF_MODULI {
            assert!(is_probable_prime(q), "{} should be prime", q);
            assert!(q < (1u64 << 62));
        }
    }

    #[test]
    fn test_chain_is_ntt_friendly() {
        for q in COEFF_MODULI {
            assert!(supports_ntt(q, 16384));
            assert_eq!(q % (1u64 << 32), 1);
        }
    }

    #[test]
    fn test_modulus_chain_clamps() {
        assert_eq!(modulus_chain(1), &[Q0]);
        assert_eq!(modulus_chain(2), &[Q0, Q1]);
        assert_eq!(modulus_chain(5).len(), 2);
    }
}
