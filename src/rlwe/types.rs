//! RLWE ciphertext, key and plaintext types.
//!
//! Ring-LWE over R_q = Z_q[X]/(X^d + 1), q held in RNS form.

use crate::math::Poly;
use serde::{Deserialize, Serialize};

/// RLWE secret key: polynomial in R_q sampled from the error distribution.
///
/// Keeps the coefficient form (for automorphisms) and the NTT form (for
/// decryption and key generation) side by side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RlweSecretKey {
    /// Secret polynomial in coefficient domain.
    pub poly: Poly,
    /// Secret polynomial in NTT domain.
    pub poly_ntt: Poly,
}

/// RLWE ciphertext: (a, b) ∈ R_q × R_q where b = -a·s + e + Δ·m.
///
/// To decrypt, compute `b + a·s = e + Δ·m`, then round to recover m.
/// Both components are always in the same domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RlweCiphertext {
    /// Random polynomial in R_q.
    pub a: Poly,
    /// Encrypted polynomial: b = -a·s + e + Δ·m.
    pub b: Poly,
}

/// Plaintext ring element: d coefficients in [0, t)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plaintext {
    /// Coefficients modulo t
    pub coeffs: Vec<u64>,
}

impl RlweSecretKey {
    /// Returns the ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.poly.dimension()
    }

    /// Returns the CRT moduli.
    pub fn moduli(&self) -> &[u64] {
        self.poly.moduli()
    }
}

impl RlweCiphertext {
    /// Creates a ciphertext from component polynomials.
    pub fn from_parts(a: Poly, b: Poly) -> Self {
        debug_assert_eq!(
            a.dimension(),
            b.dimension(),
            "Ciphertext polynomials must have same dimension"
        );
        debug_assert_eq!(
            a.moduli(),
            b.moduli(),
            "Ciphertext polynomials must have same moduli"
        );
        debug_assert_eq!(a.is_ntt(), b.is_ntt(), "Ciphertext domains must match");
        Self { a, b }
    }

    /// Returns the ring dimension.
    pub fn ring_dim(&self) -> usize {
        self.a.dimension()
    }

    /// Returns the CRT moduli.
    pub fn moduli(&self) -> &[u64] {
        self.a.moduli()
    }

    /// Whether both components are in NTT domain.
    pub fn is_ntt(&self) -> bool {
        self.a.is_ntt()
    }
}

impl Plaintext {
    /// Plaintext from coefficients already reduced modulo t
    pub fn new(coeffs: Vec<u64>) -> Self {
        Self { coeffs }
    }

    /// All-zero plaintext
    pub fn zero(dim: usize) -> Self {
        Self {
            coeffs: vec![0; dim],
        }
    }

    /// Ring dimension
    pub fn dimension(&self) -> usize {
        self.coeffs.len()
    }
}
