//! Ciphertext-to-plaintext decomposition between reduction rounds
//!
//! A coefficient-domain ciphertext (a, b) is split into F = 2·⌈log2 q / logt⌉
//! plaintexts of logt-bit digits, lowest digit first, all digits of `a`
//! before those of `b`. The server folds these plaintexts like database
//! entries; the client decrypts them and recomposes the ciphertext exactly.

use crate::math::{NttContext, Poly};
use crate::params::SchemeParams;
use crate::rlwe::{Plaintext, RlweCiphertext};

use super::error::{PirError, Result};

/// Split a coefficient-domain ciphertext into F digit polynomials
///
/// Returned polynomials are in coefficient domain, lifted into R_q.
pub fn decompose_ciphertext(
    ct: &RlweCiphertext,
    scheme: &SchemeParams,
    ctx: &NttContext,
) -> Vec<Poly> {
    let digits = scheme.digits_per_poly();
    let logt = scheme.logt as usize;
    let mask = (1u128 << logt) - 1;

    let mut out = Vec::with_capacity(2 * digits);
    for poly in [&ct.a, &ct.b] {
        let coeffs = poly.to_u128_coeffs(ctx.basis());
        for k in 0..digits {
            let shift = k * logt;
            let digit: Vec<u64> = coeffs.iter().map(|&c| ((c >> shift) & mask) as u64).collect();
            out.push(Poly::from_coeffs(&digit, ctx.moduli()));
        }
    }
    out
}

/// Rebuild a ciphertext from its F decrypted digit plaintexts
///
/// # Errors
///
/// `DimensionMismatch` if `digits` does not hold exactly F plaintexts.
pub fn recompose_ciphertext(
    digits: &[Plaintext],
    scheme: &SchemeParams,
    ctx: &NttContext,
) -> Result<RlweCiphertext> {
    let per_poly = scheme.digits_per_poly();
    if digits.len() != 2 * per_poly {
        return Err(PirError::DimensionMismatch {
            expected: 2 * per_poly,
            actual: digits.len(),
        });
    }

    let q = ctx.modulus();
    let logt = scheme.logt as usize;
    let compose = |group: &[Plaintext]| {
        let mut coeffs = vec![0u128; scheme.ring_dim];
        for (k, pt) in group.iter().enumerate() {
            let shift = k * logt;
            for (acc, &d) in coeffs.iter_mut().zip(pt.coeffs.iter()) {
                *acc |= (d as u128) << shift;
            }
        }
        // Garbage digits from an exhausted noise budget can exceed q
        for c in &mut coeffs {
            *c %= q;
        }
        Poly::from_u128_coeffs(&coeffs, ctx.moduli())
    };

    let (a_digits, b_digits) = digits.split_at(per_poly);
    Ok(RlweCiphertext::from_parts(
        compose(a_digits),
        compose(b_digits),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::GaussianSampler;
    use crate::rlwe::RlweSecretKey;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn digits_as_plaintexts(polys: &[Poly]) -> Vec<Plaintext> {
        polys
            .iter()
            .map(|p| Plaintext::new(p.residue(0).to_vec()))
            .collect()
    }

    #[test]
    fn test_decompose_then_recompose_is_exact() {
        for logt in [8u32, 12, 30] {
            let scheme = SchemeParams::new(256, logt, 2);
            let ctx = scheme.ntt_context();
            let sampler = GaussianSampler::default();
            let mut rng = ChaCha20Rng::seed_from_u64(logt as u64);
            let sk = RlweSecretKey::generate(&ctx, &sampler, &mut rng);

            let msg = Plaintext::new((0..256u64).map(|i| i % scheme.plain_modulus()).collect());
            let ct = RlweCiphertext::encrypt(&sk, &msg, scheme.delta(), &ctx, &sampler, &mut rng);

            let polys = decompose_ciphertext(&ct, &scheme, &ctx);
            assert_eq!(polys.len(), scheme.expansion_factor());
            let t = scheme.plain_modulus();
            assert!(polys.iter().all(|p| p.residue(0).iter().all(|&c| c < t)));

            let rebuilt = recompose_ciphertext(&digits_as_plaintexts(&polys), &scheme, &ctx).unwrap();
            assert_eq!(rebuilt, ct, "logt {}", logt);
        }
    }

    #[test]
    fn test_recompose_wrong_count() {
        let scheme = SchemeParams::new(256, 12, 2);
        let ctx = scheme.ntt_context();
        let digits = vec![Plaintext::zero(256); 3];
        let err = recompose_ciphertext(&digits, &scheme, &ctx).unwrap_err();
        assert!(matches!(
            err,
            PirError::DimensionMismatch {
                expected: 22,
                actual: 3
            }
        ));
    }
}
