//! Gadget vector and decomposition.

use crate::math::{NttContext, Poly};
use serde::{Deserialize, Serialize};

/// Gadget vector g_z = [1, z, z², ..., z^(ℓ-1)]^T with z = 2^log_base.
///
/// Decomposition runs on the composed coefficient in [0, q), so every digit is
/// below z in all residues at once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GadgetVector {
    /// log2 of the gadget base z
    pub log_base: u32,
    /// Number of digits ℓ = ⌈log_z(q)⌉
    pub len: usize,
}

impl GadgetVector {
    /// Create a new gadget vector
    pub fn new(log_base: u32, len: usize) -> Self {
        debug_assert!(log_base > 0 && log_base <= 32, "Gadget base must be in 2^[1, 32]");
        debug_assert!(len > 0, "Gadget length must be > 0");
        Self { log_base, len }
    }

    /// Gadget vector covering a modulus of `modulus_bits` bits
    pub fn for_modulus(log_base: u32, modulus_bits: u32) -> Self {
        Self::new(log_base, modulus_bits.div_ceil(log_base) as usize)
    }

    /// Gadget base z
    pub fn base(&self) -> u64 {
        1u64 << self.log_base
    }

    /// z^i as an integer; below q for every i < ℓ
    pub fn power(&self, i: usize) -> u128 {
        1u128 << (self.log_base as usize * i)
    }
}

/// Decompose a coefficient-domain polynomial into ℓ digit polynomials
///
/// Returns [p₀, ..., p_{ℓ-1}] with p = Σ pᵢ·zⁱ and every coefficient of pᵢ in
/// [0, z).
pub fn gadget_decompose(poly: &Poly, gadget: &GadgetVector, ctx: &NttContext) -> Vec<Poly> {
    let coeffs = poly.to_u128_coeffs(ctx.basis());
    let mask = (1u128 << gadget.log_base) - 1;

    (0..gadget.len)
        .map(|i| {
            let shift = gadget.log_base as usize * i;
            let digits: Vec<u64> = coeffs.iter().map(|&c| ((c >> shift) & mask) as u64).collect();
            Poly::from_coeffs(&digits, ctx.moduli())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::mod_q::COEFF_MODULI;
    use rand::SeedableRng;

    #[test]
    fn test_gadget_len_covers_modulus() {
        let ctx = NttContext::with_moduli(256, &COEFF_MODULI);
        let bits = 128 - ctx.modulus().leading_zeros();
        let gadget = GadgetVector::for_modulus(16, bits);
        assert_eq!(gadget.len, 8);
        assert!(gadget.power(gadget.len - 1) < ctx.modulus());
        assert_eq!(gadget.base(), 65536);
    }

    #[test]
    fn test_decompose_reconstructs() {
        let n = 256;
        let ctx = NttContext::with_moduli(n, &COEFF_MODULI);
        let bits = 128 - ctx.modulus().leading_zeros();
        let gadget = GadgetVector::for_modulus(16, bits);

        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(5);
        let poly = Poly::random_with_rng(n, ctx.moduli(), &mut rng);
        let digits = gadget_decompose(&poly, &gadget, &ctx);

        let mut sum = Poly::zero(n, ctx.moduli());
        for (i, d) in digits.iter().enumerate() {
            assert!(d.residue(0).iter().all(|&c| c < gadget.base()));
            sum += &d.scalar_mul_u128(gadget.power(i));
        }
        assert_eq!(sum, poly);
    }
}
