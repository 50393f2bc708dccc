//! RLWE encryption and decryption
//!
//! Implements encryption: b = -a·s + e + Δ·m
//! where Δ = ⌊q/t⌋ is the scaling factor.

use std::ops::AddAssign;

use rand::Rng;

use crate::math::{GaussianSampler, NttContext, Poly};

use super::types::{Plaintext, RlweCiphertext, RlweSecretKey};

impl RlweSecretKey {
    /// Generate a secret key from the Gaussian distribution
    pub fn generate<R: Rng>(ctx: &NttContext, sampler: &GaussianSampler, rng: &mut R) -> Self {
        let poly = Poly::sample_gaussian(ctx.dimension(), ctx.moduli(), sampler, rng);
        let poly_ntt = poly.to_ntt_new(ctx);
        Self { poly, poly_ntt }
    }
}

impl Plaintext {
    /// Scale into R_q: Δ·m with every coefficient lifted from [0, t)
    pub fn scaled(&self, delta: u128, moduli: &[u64]) -> Poly {
        let scaled: Vec<u128> = self.coeffs.iter().map(|&m| m as u128 * delta).collect();
        Poly::from_u128_coeffs(&scaled, moduli)
    }

    /// Lift into R_q without scaling, for ciphertext × plaintext products
    pub fn lift(&self, moduli: &[u64]) -> Poly {
        Poly::from_coeffs(&self.coeffs, moduli)
    }
}

impl RlweCiphertext {
    /// Encrypt an already-scaled message polynomial
    ///
    /// Computes: (a, b) where b = -a·s + e + scaled
    pub fn encrypt_scaled<R: Rng>(
        sk: &RlweSecretKey,
        scaled: &Poly,
        ctx: &NttContext,
        sampler: &GaussianSampler,
        rng: &mut R,
    ) -> Self {
        let d = ctx.dimension();
        let a = Poly::random_with_rng(d, ctx.moduli(), rng);
        let error = Poly::sample_gaussian(d, ctx.moduli(), sampler, rng);

        let mut a_s = a.to_ntt_new(ctx).mul_ntt_domain(&sk.poly_ntt, ctx);
        a_s.from_ntt(ctx);

        // b = -a·s + e + Δ·m
        let b = &(&error - &a_s) + scaled;

        Self { a, b }
    }

    /// Encrypt a plaintext: b = -a·s + e + Δ·m
    pub fn encrypt<R: Rng>(
        sk: &RlweSecretKey,
        plaintext: &Plaintext,
        delta: u128,
        ctx: &NttContext,
        sampler: &GaussianSampler,
        rng: &mut R,
    ) -> Self {
        let scaled = plaintext.scaled(delta, ctx.moduli());
        Self::encrypt_scaled(sk, &scaled, ctx, sampler, rng)
    }

    /// Trivial encryption of zero (both components zero)
    pub fn zero(dim: usize, moduli: &[u64]) -> Self {
        Self {
            a: Poly::zero(dim, moduli),
            b: Poly::zero(dim, moduli),
        }
    }

    /// Decryption phase b + a·s = e + Δ·m, composed into [0, q)
    pub fn phase(&self, sk: &RlweSecretKey, ctx: &NttContext) -> Vec<u128> {
        let mut a_s = self.a.to_ntt_new(ctx).mul_ntt_domain(&sk.poly_ntt, ctx);
        a_s.from_ntt(ctx);
        let b = self.b.from_ntt_new(ctx);
        (&a_s + &b).to_u128_coeffs(ctx.basis())
    }

    /// Decrypt ciphertext to recover the plaintext
    ///
    /// Computes: m = ⌊(a·s + b) / Δ⌉ mod t
    pub fn decrypt(&self, sk: &RlweSecretKey, delta: u128, t: u64, ctx: &NttContext) -> Plaintext {
        let half_delta = delta / 2;
        let coeffs = self
            .phase(sk, ctx)
            .into_iter()
            .map(|val| (((val + half_delta) / delta) % t as u128) as u64)
            .collect();
        Plaintext::new(coeffs)
    }

    /// Remaining noise budget in bits
    ///
    /// log2(Δ/2) - log2(max |e|), floored and clamped at zero. Zero means
    /// decryption may already be wrong.
    pub fn noise_budget(&self, sk: &RlweSecretKey, delta: u128, t: u64, ctx: &NttContext) -> u32 {
        let q = ctx.modulus();
        let half_delta = delta / 2;
        let max_noise = self
            .phase(sk, ctx)
            .into_iter()
            .map(|val| {
                let m = ((val + half_delta) / delta) % t as u128;
                let centered = crate::math::modular::sub_mod_u128(val, m * delta, q);
                if centered > q / 2 {
                    q - centered
                } else {
                    centered
                }
            })
            .max()
            .unwrap_or(0);

        let bits = (delta as f64).log2() - 1.0 - (max_noise.max(1) as f64).log2();
        bits.floor().max(0.0) as u32
    }

    /// Homomorphic addition of two ciphertexts
    ///
    /// (a1, b1) + (a2, b2) = (a1 + a2, b1 + b2)
    pub fn add(&self, other: &RlweCiphertext) -> RlweCiphertext {
        RlweCiphertext {
            a: &self.a + &other.a,
            b: &self.b + &other.b,
        }
    }

    /// Homomorphic subtraction of two ciphertexts
    pub fn sub(&self, other: &RlweCiphertext) -> RlweCiphertext {
        RlweCiphertext {
            a: &self.a - &other.a,
            b: &self.b - &other.b,
        }
    }

    /// Multiply both components by X^k (coefficient domain)
    pub fn mul_monomial(&self, k: usize) -> RlweCiphertext {
        RlweCiphertext {
            a: self.a.mul_monomial(k),
            b: self.b.mul_monomial(k),
        }
    }

    /// Convert both components to NTT domain
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        self.a.to_ntt(ctx);
        self.b.to_ntt(ctx);
    }

    /// Convert both components to coefficient domain
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        self.a.from_ntt(ctx);
        self.b.from_ntt(ctx);
    }

    /// Ciphertext × plaintext, both in NTT domain
    pub fn mul_plain(&self, pt: &Poly, ctx: &NttContext) -> RlweCiphertext {
        RlweCiphertext {
            a: self.a.mul_ntt_domain(pt, ctx),
            b: self.b.mul_ntt_domain(pt, ctx),
        }
    }
}

impl AddAssign<&RlweCiphertext> for RlweCiphertext {
    fn add_assign(&mut self, rhs: &RlweCiphertext) {
        self.a += &rhs.a;
        self.b += &rhs.b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SchemeParams;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn setup(logt: u32) -> (SchemeParams, NttContext, RlweSecretKey, ChaCha20Rng) {
        let scheme = SchemeParams::new(256, logt, 2);
        let ctx = scheme.ntt_context();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let sk = RlweSecretKey::generate(&ctx, &GaussianSampler::default(), &mut rng);
        (scheme, ctx, sk, rng)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let (scheme, ctx, sk, mut rng) = setup(12);
        let t = scheme.plain_modulus();
        let sampler = GaussianSampler::default();

        let msg = Plaintext::new((0..256u64).map(|i| (i * 37) % t).collect());
        let ct = RlweCiphertext::encrypt(&sk, &msg, scheme.delta(), &ctx, &sampler, &mut rng);

        let decrypted = ct.decrypt(&sk, scheme.delta(), t, &ctx);
        assert_eq!(decrypted, msg);
    }

    #[test]
    fn test_max_plaintext_values() {
        let (scheme, ctx, sk, mut rng) = setup(32);
        let t = scheme.plain_modulus();
        let sampler = GaussianSampler::default();

        let msg = Plaintext::new(vec![t - 1; 256]);
        let ct = RlweCiphertext::encrypt(&sk, &msg, scheme.delta(), &ctx, &sampler, &mut rng);
        assert_eq!(ct.decrypt(&sk, scheme.delta(), t, &ctx), msg);
    }

    #[test]
    fn test_homomorphic_addition_and_subtraction() {
        let (scheme, ctx, sk, mut rng) = setup(12);
        let t = scheme.plain_modulus();
        let delta = scheme.delta();
        let sampler = GaussianSampler::default();

        let m1 = Plaintext::new((0..256u64).map(|i| i % t).collect());
        let m2 = Plaintext::new((0..256u64).map(|i| (3 * i + 1) % t).collect());
        let c1 = RlweCiphertext::encrypt(&sk, &m1, delta, &ctx, &sampler, &mut rng);
        let c2 = RlweCiphertext::encrypt(&sk, &m2, delta, &ctx, &sampler, &mut rng);

        let sum = c1.add(&c2).decrypt(&sk, delta, t, &ctx);
        let diff = c1.sub(&c2).decrypt(&sk, delta, t, &ctx);
        for i in 0..256 {
            assert_eq!(sum.coeffs[i], (m1.coeffs[i] + m2.coeffs[i]) % t);
            assert_eq!(diff.coeffs[i], (m1.coeffs[i] + t - m2.coeffs[i]) % t);
        }
    }

    #[test]
    fn test_mul_plain_in_ntt_domain() {
        let (scheme, ctx, sk, mut rng) = setup(12);
        let t = scheme.plain_modulus();
        let delta = scheme.delta();
        let sampler = GaussianSampler::default();

        // Enc(1) · p + Enc(0) · p' decrypts to p
        let mut one = Plaintext::zero(256);
        one.coeffs[0] = 1;
        let zero = Plaintext::zero(256);
        let mut sel_one = RlweCiphertext::encrypt(&sk, &one, delta, &ctx, &sampler, &mut rng);
        let mut sel_zero = RlweCiphertext::encrypt(&sk, &zero, delta, &ctx, &sampler, &mut rng);
        sel_one.to_ntt(&ctx);
        sel_zero.to_ntt(&ctx);

        let p = Plaintext::new((0..256u64).map(|i| (i * 11 + 5) % t).collect());
        let p_other = Plaintext::new(vec![t - 1; 256]);

        let mut acc = sel_one.mul_plain(&p.lift(ctx.moduli()).to_ntt_new(&ctx), &ctx);
        acc += &sel_zero.mul_plain(&p_other.lift(ctx.moduli()).to_ntt_new(&ctx), &ctx);
        assert!(acc.is_ntt());
        acc.from_ntt(&ctx);

        assert_eq!(acc.decrypt(&sk, delta, t, &ctx), p);
    }

    #[test]
    fn test_mul_monomial_rotates_message() {
        let (scheme, ctx, sk, mut rng) = setup(12);
        let t = scheme.plain_modulus();
        let delta = scheme.delta();
        let sampler = GaussianSampler::default();

        let mut msg = Plaintext::zero(256);
        msg.coeffs[255] = 7;
        let ct = RlweCiphertext::encrypt(&sk, &msg, delta, &ctx, &sampler, &mut rng);

        // X^255 · X = X^256 = -1
        let rotated = ct.mul_monomial(1).decrypt(&sk, delta, t, &ctx);
        assert_eq!(rotated.coeffs[0], t - 7);
        assert!(rotated.coeffs[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_fresh_noise_budget() {
        let (scheme, ctx, sk, mut rng) = setup(12);
        let delta = scheme.delta();
        let sampler = GaussianSampler::default();

        let ct = RlweCiphertext::encrypt(
            &sk,
            &Plaintext::zero(256),
            delta,
            &ctx,
            &sampler,
            &mut rng,
        );
        let budget = ct.noise_budget(&sk, delta, scheme.plain_modulus(), &ctx);
        // log2(Δ) ≈ 112, fresh noise below 2^5
        assert!(budget > 100, "budget {}", budget);
        assert!(budget < 112, "budget {}", budget);
    }
}
