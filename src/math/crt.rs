//! CRT (Chinese Remainder Theorem) helpers.
//!
//! The coefficient modulus is a product of at most two 62-bit primes, so a
//! composed coefficient always fits in a `u128`. [`RnsBasis`] keeps the
//! constants needed to move between the residue form used for arithmetic and
//! the composed form used for rounding and gadget decomposition.

use serde::{Deserialize, Serialize};

/// Compute a modular inverse using extended Euclidean algorithm.
///
/// Returns `None` when `a` is not invertible modulo `modulus`.
pub fn mod_inverse(a: u64, modulus: u64) -> Option<u64> {
    mod_inverse_u128(a as u128, modulus as u128).map(|x| x as u64)
}

/// Modular inverse for moduli up to 2^126.
pub fn mod_inverse_u128(a: u128, modulus: u128) -> Option<u128> {
    debug_assert!(modulus < (1u128 << 126), "modulus too large for i128 arithmetic");
    let mut t: i128 = 0;
    let mut new_t: i128 = 1;
    let mut r: i128 = modulus as i128;
    let mut new_r: i128 = (a % modulus) as i128;

    while new_r != 0 {
        let quotient = r / new_r;
        let tmp_t = t - quotient * new_t;
        t = new_t;
        new_t = tmp_t;

        let tmp_r = r - quotient * new_r;
        r = new_r;
        new_r = tmp_r;
    }

    if r != 1 {
        return None;
    }
    if t < 0 {
        t += modulus as i128;
    }
    Some(t as u128)
}

/// Compose two CRT residues into a value modulo q0 * q1.
///
/// Formula:
///   x = a0 + q0 * ((a1 - a0) * q0^{-1} mod q1)
#[inline]
pub fn crt_compose_2(a0: u64, a1: u64, q0: u64, q1: u64, q0_inv_mod_q1: u64) -> u128 {
    let a0_mod_q1 = a0 % q1;
    let diff = if a1 >= a0_mod_q1 {
        a1 - a0_mod_q1
    } else {
        (a1 + q1) - a0_mod_q1
    };
    let t = ((diff as u128 * q0_inv_mod_q1 as u128) % q1 as u128) as u64;
    a0 as u128 + q0 as u128 * t as u128
}

/// Residue-number-system basis of one or two word-sized primes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RnsBasis {
    moduli: Vec<u64>,
    product: u128,
    q0_inv_mod_q1: u64,
}

impl RnsBasis {
    /// Build a basis from one or two pairwise-coprime moduli.
    ///
    /// # Panics
    ///
    /// Panics if `moduli` is empty, holds more than two entries, or the two
    /// moduli are not coprime.
    pub fn new(moduli: &[u64]) -> Self {
        assert!(
            !moduli.is_empty() && moduli.len() <= 2,
            "RNS basis supports one or two moduli"
        );
        let product = moduli.iter().fold(1u128, |acc, &m| acc * m as u128);
        let q0_inv_mod_q1 = if moduli.len() == 2 {
            let inv = mod_inverse(moduli[0] % moduli[1], moduli[1]);
            assert!(inv.is_some(), "moduli must be coprime");
            inv.unwrap_or_default()
        } else {
            0
        };
        Self {
            moduli: moduli.to_vec(),
            product,
            q0_inv_mod_q1,
        }
    }

    /// The residue moduli.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Composite modulus q = Π q_i.
    pub fn modulus(&self) -> u128 {
        self.product
    }

    /// Number of residues.
    pub fn len(&self) -> usize {
        self.moduli.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moduli.is_empty()
    }

    /// log2(q) as a float, used by the noise estimator.
    pub fn log2_modulus(&self) -> f64 {
        self.moduli.iter().map(|&m| (m as f64).log2()).sum()
    }

    /// Compose residues `[x mod q0, x mod q1]` into `x mod q`.
    #[inline]
    pub fn compose(&self, residues: &[u64]) -> u128 {
        debug_assert_eq!(residues.len(), self.moduli.len());
        match self.moduli.len() {
            1 => residues[0] as u128,
            _ => crt_compose_2(
                residues[0],
                residues[1],
                self.moduli[0],
                self.moduli[1],
                self.q0_inv_mod_q1,
            ),
        }
    }

    /// Residue of `value` modulo the `idx`-th prime.
    #[inline]
    pub fn reduce(&self, value: u128, idx: usize) -> u64 {
        (value % self.moduli[idx] as u128) as u64
    }
}
