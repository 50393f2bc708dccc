//! Oblivious query expansion
//!
//! Turns one ciphertext encrypting s·X^c into n ciphertexts where entry c
//! encrypts 2^L·s and every other entry encrypts 0 (L = ⌈log2 n⌉).
//!
//! # Algorithm
//!
//! Level l splits every ciphertext by the residue of the exponent mod 2^(l+1):
//! ```text
//! g   = N/2^l + 1                  τ_g(X^(k·2^l)) = (-1)^k · X^(k·2^l)
//! c'  = KeySwitch(τ_g(c))
//! lo  = c + c'                     keeps even k, doubled
//! hi  = (c - c') · X^(-2^l)        keeps odd k, doubled, shifted down
//! ```
//! After L levels entry j holds coefficient j of the original message, scaled
//! by 2^L. The client pre-multiplies by 2^(-L) mod q so the selector is Δ.

use rayon::prelude::*;

use crate::ks::{key_switch, GaloisKeys};
use crate::math::crt::mod_inverse_u128;
use crate::math::modular::mul_mod_u128;
use crate::math::NttContext;
use crate::params::{PirParams, SchemeParams};
use crate::rlwe::{automorphism_ciphertext, expansion_element, RlweCiphertext};

use super::error::{param_err, usage_err, Result};

/// Selector scalar Δ·2^(-levels) mod q encrypted at the query coefficient
pub fn query_scalar(scheme: &SchemeParams, levels: u32) -> Result<u128> {
    let q = scheme.modulus();
    let inv = mod_inverse_u128(1u128 << levels, q)
        .ok_or_else(|| param_err!("2^{} is not invertible mod q", levels))?;
    Ok(mul_mod_u128(scheme.delta(), inv, q))
}

/// Expand a coefficient-domain query ciphertext into `n` selection ciphertexts
///
/// Only the first `n` outputs of every level are kept, so no work is spent on
/// slots past the dimension size.
///
/// # Errors
///
/// `Usage` if `n` is zero or exceeds the ring degree, or if `keys` lack a
/// required Galois element or do not fit the ring and modulus chain.
pub fn expand_query(
    ct: &RlweCiphertext,
    n: usize,
    keys: &GaloisKeys,
    ctx: &NttContext,
) -> Result<Vec<RlweCiphertext>> {
    let d = ctx.dimension();
    if n == 0 || n > d {
        return Err(usage_err!("cannot expand to {} slots with ring_dim {}", n, d));
    }
    if ct.is_ntt() {
        return Err(usage_err!("query ciphertext must be in coefficient domain"));
    }
    let levels = PirParams::expansion_levels(n);
    if levels > 0 && keys.ring_dim() != d {
        return Err(usage_err!(
            "galois keys for ring_dim {}, expected {}",
            keys.ring_dim(),
            d
        ));
    }

    let matrices = (0..levels)
        .map(|level| {
            let g = expansion_element(d, level);
            let ks = keys.get(g)?;
            ks.check(ctx)?;
            Ok((g, ks))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut out = vec![ct.clone()];
    for (level, &(g, ks)) in matrices.iter().enumerate() {
        let half = 1usize << level;
        let shift = 2 * d - half;

        let split: Vec<(RlweCiphertext, Option<RlweCiphertext>)> = out
            .par_iter()
            .enumerate()
            .map(|(i, c)| {
                let rotated = key_switch(&automorphism_ciphertext(c, g), ks, ctx);
                let hi = (half + i < n).then(|| c.sub(&rotated).mul_monomial(shift));
                (c.add(&rotated), hi)
            })
            .collect();

        let mut next = Vec::with_capacity((2 * half).min(n));
        let mut upper = Vec::with_capacity(half);
        for (lo, hi) in split {
            next.push(lo);
            upper.extend(hi);
        }
        next.append(&mut upper);
        out = next;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ks::GadgetVector;
    use crate::math::{GaussianSampler, Poly};
    use crate::rlwe::RlweSecretKey;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    struct Fixture {
        scheme: SchemeParams,
        ctx: NttContext,
        sk: RlweSecretKey,
        sampler: GaussianSampler,
        rng: ChaCha20Rng,
    }

    fn fixture() -> Fixture {
        let scheme = SchemeParams::new(256, 12, 2);
        let ctx = scheme.ntt_context();
        let sampler = GaussianSampler::default();
        let mut rng = ChaCha20Rng::seed_from_u64(41);
        let sk = RlweSecretKey::generate(&ctx, &sampler, &mut rng);
        Fixture {
            scheme,
            ctx,
            sk,
            sampler,
            rng,
        }
    }

    fn selector(fx: &mut Fixture, n: usize, coord: usize) -> RlweCiphertext {
        let levels = PirParams::expansion_levels(n);
        let mut coeffs = vec![0u128; fx.scheme.ring_dim];
        coeffs[coord] = query_scalar(&fx.scheme, levels).unwrap();
        let scaled = Poly::from_u128_coeffs(&coeffs, fx.ctx.moduli());
        RlweCiphertext::encrypt_scaled(&fx.sk, &scaled, &fx.ctx, &fx.sampler, &mut fx.rng)
    }

    fn keys(fx: &mut Fixture, levels: u32) -> GaloisKeys {
        let gadget = GadgetVector::for_modulus(fx.scheme.gadget_log_base, fx.scheme.modulus_bits());
        GaloisKeys::generate(&fx.sk, levels, &gadget, &fx.ctx, &fx.sampler, &mut fx.rng)
    }

    fn assert_one_hot(fx: &Fixture, expanded: &[RlweCiphertext], coord: usize) {
        let (delta, t) = (fx.scheme.delta(), fx.scheme.plain_modulus());
        for (j, ct) in expanded.iter().enumerate() {
            let pt = ct.decrypt(&fx.sk, delta, t, &fx.ctx);
            let want = u64::from(j == coord);
            assert_eq!(pt.coeffs[0], want, "slot {} coord {}", j, coord);
            assert!(pt.coeffs[1..].iter().all(|&c| c == 0), "slot {} not constant", j);
        }
    }

    #[test]
    fn test_query_scalar_cancels_doubling() {
        let scheme = SchemeParams::new(256, 12, 2);
        let q = scheme.modulus();
        let s = query_scalar(&scheme, 5).unwrap();
        assert_eq!(mul_mod_u128(s, 32, q), scheme.delta());
        assert_eq!(query_scalar(&scheme, 0).unwrap(), scheme.delta());
    }

    #[test]
    fn test_expand_power_of_two() {
        let mut fx = fixture();
        let keys = keys(&mut fx, 3);
        for coord in [0, 3, 7] {
            let ct = selector(&mut fx, 8, coord);
            let expanded = expand_query(&ct, 8, &keys, &fx.ctx).unwrap();
            assert_eq!(expanded.len(), 8);
            assert_one_hot(&fx, &expanded, coord);
        }
    }

    #[test]
    fn test_expand_truncates_to_dimension() {
        let mut fx = fixture();
        let keys = keys(&mut fx, 3);
        for coord in [0, 4] {
            let ct = selector(&mut fx, 5, coord);
            let expanded = expand_query(&ct, 5, &keys, &fx.ctx).unwrap();
            assert_eq!(expanded.len(), 5);
            assert_one_hot(&fx, &expanded, coord);
        }
    }

    #[test]
    fn test_single_slot_is_identity() {
        let mut fx = fixture();
        let empty = keys(&mut fx, 0);
        let ct = selector(&mut fx, 1, 0);
        let expanded = expand_query(&ct, 1, &empty, &fx.ctx).unwrap();
        assert_eq!(expanded, vec![ct]);
        assert_one_hot(&fx, &expanded, 0);
    }

    #[test]
    fn test_missing_level_key_rejected() {
        let mut fx = fixture();
        let short = keys(&mut fx, 1);
        let ct = selector(&mut fx, 4, 2);
        let err = expand_query(&ct, 4, &short, &fx.ctx).unwrap_err();
        assert!(matches!(err, crate::pir::error::PirError::Usage(_)));
    }

    #[test]
    fn test_keys_for_other_chain_rejected() {
        let mut fx = fixture();
        let one_prime = SchemeParams::new(256, 12, 1);
        let other_ctx = one_prime.ntt_context();
        let other_sk = RlweSecretKey::generate(&other_ctx, &fx.sampler, &mut fx.rng);
        let gadget = GadgetVector::for_modulus(16, one_prime.modulus_bits());
        let foreign =
            GaloisKeys::generate(&other_sk, 2, &gadget, &other_ctx, &fx.sampler, &mut fx.rng);

        let ct = selector(&mut fx, 4, 1);
        let err = expand_query(&ct, 4, &foreign, &fx.ctx).unwrap_err();
        assert!(matches!(err, crate::pir::error::PirError::Usage(_)));
    }

    #[test]
    fn test_oversized_dimension_rejected() {
        let mut fx = fixture();
        let keys = keys(&mut fx, 1);
        let ct = selector(&mut fx, 2, 0);
        assert!(expand_query(&ct, 257, &keys, &fx.ctx).is_err());
        assert!(expand_query(&ct, 0, &keys, &fx.ctx).is_err());
    }
}
