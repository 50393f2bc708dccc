//! Key-switching operation

use crate::math::{NttContext, Poly};
use crate::rlwe::RlweCiphertext;

use super::gadget::gadget_decompose;
use super::setup::KeySwitchingMatrix;

/// Apply key-switching to transform a ciphertext from key s to key s'
///
/// Given ciphertext (a, b) under key s and key-switching matrix K,
/// computes a new ciphertext (a', b') valid under key s'.
///
/// # Algorithm
///
/// 1. Decompose a using gadget: g⁻¹(a) = [a₀, a₁, ..., a_{ℓ-1}]
/// 2. Compute: (a', b') = (0, b) + Σᵢ aᵢ · K[i]
///
/// The result satisfies: a'·s' + b' ≈ a·s + b. Input and output are in
/// coefficient domain; the accumulation runs in NTT domain.
pub fn key_switch(
    ct: &RlweCiphertext,
    ks_matrix: &KeySwitchingMatrix,
    ctx: &NttContext,
) -> RlweCiphertext {
    let d = ct.ring_dim();
    let a_decomp = gadget_decompose(&ct.a, &ks_matrix.gadget, ctx);

    let mut result_a = Poly::zero(d, ctx.moduli()).to_ntt_new(ctx);
    let mut result_b = result_a.clone();

    for (digit, ks_row) in a_decomp.into_iter().zip(ks_matrix.rows.iter()) {
        let digit_ntt = digit.to_ntt_new(ctx);
        result_a.mul_acc_ntt_domain(&digit_ntt, &ks_row.a, ctx);
        result_b.mul_acc_ntt_domain(&digit_ntt, &ks_row.b, ctx);
    }

    result_a.from_ntt(ctx);
    result_b.from_ntt(ctx);

    RlweCiphertext::from_parts(result_a, &result_b + &ct.b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ks::{generate_automorphism_ks_matrix, generate_ks_matrix, GadgetVector};
    use crate::math::GaussianSampler;
    use crate::params::SchemeParams;
    use crate::rlwe::{automorphism_ciphertext, expansion_element, Plaintext, RlweSecretKey};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_key_switch_preserves_message() {
        let scheme = SchemeParams::new(256, 12, 2);
        let ctx = scheme.ntt_context();
        let sampler = GaussianSampler::default();
        let mut rng = ChaCha20Rng::seed_from_u64(23);
        let (delta, t) = (scheme.delta(), scheme.plain_modulus());

        let sk1 = RlweSecretKey::generate(&ctx, &sampler, &mut rng);
        let sk2 = RlweSecretKey::generate(&ctx, &sampler, &mut rng);
        let gadget = GadgetVector::for_modulus(scheme.gadget_log_base, scheme.modulus_bits());
        let ks = generate_ks_matrix(&sk1.poly, &sk2, &gadget, &ctx, &sampler, &mut rng);

        let msg = Plaintext::new((0..256u64).map(|i| (i * 29 + 3) % t).collect());
        let ct = RlweCiphertext::encrypt(&sk1, &msg, delta, &ctx, &sampler, &mut rng);

        let switched = key_switch(&ct, &ks, &ctx);
        assert_eq!(switched.decrypt(&sk2, delta, t, &ctx), msg);
        // Decrypting under the old key no longer works
        assert_ne!(switched.decrypt(&sk1, delta, t, &ctx), msg);
    }

    #[test]
    fn test_automorphism_then_switch() {
        let scheme = SchemeParams::new(256, 12, 2);
        let ctx = scheme.ntt_context();
        let sampler = GaussianSampler::default();
        let mut rng = ChaCha20Rng::seed_from_u64(29);
        let (delta, t) = (scheme.delta(), scheme.plain_modulus());

        let sk = RlweSecretKey::generate(&ctx, &sampler, &mut rng);
        let gadget = GadgetVector::for_modulus(scheme.gadget_log_base, scheme.modulus_bits());
        let g = expansion_element(256, 1);
        let ks = generate_automorphism_ks_matrix(&sk, g, &gadget, &ctx, &sampler, &mut rng);

        let mut msg = Plaintext::zero(256);
        msg.coeffs[1] = 5;
        let ct = RlweCiphertext::encrypt(&sk, &msg, delta, &ctx, &sampler, &mut rng);

        // τ_129(5·X) = 5·X^129
        let rotated = key_switch(&automorphism_ciphertext(&ct, g), &ks, &ctx);
        let decrypted = rotated.decrypt(&sk, delta, t, &ctx);
        assert_eq!(decrypted.coeffs[129], 5);
        assert_eq!(decrypted.coeffs.iter().filter(|&&c| c != 0).count(), 1);

        let budget = rotated.noise_budget(&sk, delta, t, &ctx);
        assert!(budget > 60, "budget {}", budget);
    }
}
