//! Number-Theoretic Transform (NTT) for fast polynomial multiplication.
//!
//! Implements Cooley-Tukey radix-2 NTT for negacyclic convolution over
//! R_q = Z_q[X]/(X^d + 1), one transform per prime of the RNS basis. Values in
//! the NTT domain are kept in Montgomery form, so pointwise products of two
//! transformed polynomials stay in Montgomery form and additions need no
//! conversion at all.
//!
//! # Layout
//!
//! A polynomial over `k` primes is a flat `[u64]` of length `k * n`, residue
//! block `i` holding the coefficients modulo the `i`-th prime.
//!
//! # Example
//!
//! ```
//! use hypercube_pir::math::ntt::NttContext;
//! use hypercube_pir::math::mod_q::Q0;
//!
//! let ctx = NttContext::new(256, Q0);
//!
//! let mut coeffs = vec![1u64; 256];
//! ctx.forward(&mut coeffs);
//! ctx.inverse(&mut coeffs);
//! assert_eq!(coeffs[0], 1);
//! ```

use super::crt::RnsBasis;

/// Precomputed NTT context with twiddle factors.
///
/// Create once per parameter set and share it; every polynomial operation
/// over the same dimension and basis reuses the same tables.
#[derive(Clone, Debug)]
pub struct NttContext {
    /// Ring dimension (power of two).
    n: usize,
    /// RNS basis the transforms run over.
    basis: RnsBasis,
    /// Precomputed values for Montgomery arithmetic (per modulus).
    q_inv_neg: Vec<u64>,
    r_squared: Vec<u64>,
    /// Forward twiddle factors (powers of ψ where ψ^(2n) = 1 and ψ^n = -1).
    psi_powers: Vec<Vec<u64>>,
    /// Inverse twiddle factors (powers of ψ^(-1)).
    psi_inv_powers: Vec<Vec<u64>>,
    /// n^(-1) mod q in Montgomery form for inverse NTT scaling.
    n_inv: Vec<u64>,
}

impl NttContext {
    /// Creates an NTT context for a single prime.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not a power of two or `q` is not ≡ 1 (mod 2n).
    pub fn new(n: usize, q: u64) -> Self {
        Self::with_moduli(n, &[q])
    }

    /// Creates an NTT context for one or two CRT moduli.
    ///
    /// # Arguments
    ///
    /// * `n` - Ring dimension (power of two)
    /// * `moduli` - CRT moduli (each must satisfy q ≡ 1 (mod 2n))
    pub fn with_moduli(n: usize, moduli: &[u64]) -> Self {
        assert!(n.is_power_of_two(), "n must be a power of two");
        assert!(!moduli.is_empty(), "moduli must be non-empty");

        let mut q_inv_neg = Vec::with_capacity(moduli.len());
        let mut r_squared = Vec::with_capacity(moduli.len());
        let mut psi_powers = Vec::with_capacity(moduli.len());
        let mut psi_inv_powers = Vec::with_capacity(moduli.len());
        let mut n_inv = Vec::with_capacity(moduli.len());

        for &q in moduli {
            assert!(q % (2 * n as u64) == 1, "q must be ≡ 1 (mod 2n)");

            let q_inv = Self::compute_q_inv_neg(q);
            let r2 = Self::compute_r_squared(q);

            // Primitive 2n-th root of unity ψ
            let psi = Self::find_primitive_root(2 * n as u64, q);
            let psi_mont = Self::to_montgomery(psi, q, r2, q_inv);
            let psi_pow = Self::compute_twiddle_factors(n, psi_mont, q, q_inv, r2);

            let psi_inv = Self::mod_pow(psi, q - 2, q);
            let psi_inv_mont = Self::to_montgomery(psi_inv, q, r2, q_inv);
            let psi_inv_pow = Self::compute_twiddle_factors(n, psi_inv_mont, q, q_inv, r2);

            let n_inv_val = Self::mod_pow(n as u64, q - 2, q);
            let n_inv_mont = Self::to_montgomery(n_inv_val, q, r2, q_inv);

            q_inv_neg.push(q_inv);
            r_squared.push(r2);
            psi_powers.push(psi_pow);
            psi_inv_powers.push(psi_inv_pow);
            n_inv.push(n_inv_mont);
        }

        Self {
            n,
            basis: RnsBasis::new(moduli),
            q_inv_neg,
            r_squared,
            psi_powers,
            psi_inv_powers,
            n_inv,
        }
    }

    /// Returns the ring dimension.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Returns the composite modulus q = Π q_i.
    pub fn modulus(&self) -> u128 {
        self.basis.modulus()
    }

    /// Returns the RNS basis.
    pub fn basis(&self) -> &RnsBasis {
        &self.basis
    }

    /// Returns the CRT moduli.
    pub fn moduli(&self) -> &[u64] {
        self.basis.moduli()
    }

    /// Number of CRT moduli.
    pub fn crt_count(&self) -> usize {
        self.basis.len()
    }

    /// Performs forward NTT in-place using Cooley-Tukey decimation-in-time.
    ///
    /// Input coefficients are converted to Montgomery form first.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n * crt_count`.
    pub fn forward(&self, coeffs: &mut [u64]) {
        assert_eq!(
            coeffs.len(),
            self.n * self.crt_count(),
            "Input length must match dimension * crt_count"
        );

        for idx in 0..self.crt_count() {
            let start = idx * self.n;
            let end = start + self.n;

            for c in coeffs[start..end].iter_mut() {
                *c = self.to_mont_at(*c, idx);
            }

            self.forward_inplace_at(&mut coeffs[start..end], idx);
        }
    }

    fn forward_inplace_at(&self, coeffs: &mut [u64], idx: usize) {
        let n = self.n;
        let q = self.moduli()[idx];
        let psi_powers = &self.psi_powers[idx];

        let mut t = n;
        let mut m = 1;

        while m < n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let j2 = j1 + t;
                let w = psi_powers[m + i];

                for j in j1..j2 {
                    let u = coeffs[j];
                    let v = self.montgomery_mul_at(coeffs[j + t], w, idx);

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    coeffs[j + t] = if u >= v { u - v } else { q - v + u };
                }
            }
            m <<= 1;
        }
    }

    /// Performs inverse NTT in-place using Gentleman-Sande decimation-in-frequency.
    ///
    /// Output is converted back from Montgomery form.
    ///
    /// # Panics
    ///
    /// Panics if `coeffs.len() != n * crt_count`.
    pub fn inverse(&self, coeffs: &mut [u64]) {
        assert_eq!(
            coeffs.len(),
            self.n * self.crt_count(),
            "Input length must match dimension * crt_count"
        );

        for idx in 0..self.crt_count() {
            let start = idx * self.n;
            let end = start + self.n;
            self.inverse_inplace_at(&mut coeffs[start..end], idx);
            for c in coeffs[start..end].iter_mut() {
                *c = self.montgomery_mul_at(*c, 1, idx);
            }
        }
    }

    fn inverse_inplace_at(&self, coeffs: &mut [u64], idx: usize) {
        let n = self.n;
        let q = self.moduli()[idx];
        let psi_inv_powers = &self.psi_inv_powers[idx];

        let mut t = 1;
        let mut m = n;

        while m > 1 {
            m >>= 1;
            for i in 0..m {
                let j2 = i * 2 * t;
                let w = psi_inv_powers[m + i];

                for j in j2..(j2 + t) {
                    let u = coeffs[j];
                    let v = coeffs[j + t];

                    coeffs[j] = if u + v >= q { u + v - q } else { u + v };
                    let diff = if u >= v { u - v } else { q - v + u };
                    coeffs[j + t] = self.montgomery_mul_at(diff, w, idx);
                }
            }
            t <<= 1;
        }

        for c in coeffs.iter_mut() {
            *c = self.montgomery_mul_at(*c, self.n_inv[idx], idx);
        }
    }

    /// Performs pointwise multiplication in NTT domain.
    ///
    /// Both inputs must be in Montgomery form (as produced by `forward`).
    pub fn pointwise_mul(&self, a: &[u64], b: &[u64], result: &mut [u64]) {
        let len = self.n * self.crt_count();
        assert_eq!(a.len(), len, "Input length must match dimension * crt_count");
        assert_eq!(b.len(), len, "Input length must match dimension * crt_count");
        assert_eq!(result.len(), len, "Output length must match dimension * crt_count");

        for idx in 0..self.crt_count() {
            let start = idx * self.n;
            for i in start..start + self.n {
                result[i] = self.montgomery_mul_at(a[i], b[i], idx);
            }
        }
    }

    /// Pointwise multiply-accumulate: `acc += a * b`, all in NTT domain.
    pub fn pointwise_mul_acc(&self, a: &[u64], b: &[u64], acc: &mut [u64]) {
        let len = self.n * self.crt_count();
        assert_eq!(a.len(), len, "Input length must match dimension * crt_count");
        assert_eq!(b.len(), len, "Input length must match dimension * crt_count");
        assert_eq!(acc.len(), len, "Output length must match dimension * crt_count");

        for idx in 0..self.crt_count() {
            let q = self.moduli()[idx];
            let start = idx * self.n;
            for i in start..start + self.n {
                let prod = self.montgomery_mul_at(a[i], b[i], idx);
                let sum = acc[i] + prod;
                acc[i] = if sum >= q { sum - q } else { sum };
            }
        }
    }

    /// Converts a value to Montgomery form for the `idx`-th modulus.
    #[inline]
    pub fn to_mont_at(&self, a: u64, idx: usize) -> u64 {
        Self::to_montgomery(
            a,
            self.moduli()[idx],
            self.r_squared[idx],
            self.q_inv_neg[idx],
        )
    }

    /// Converts a value from Montgomery form for the `idx`-th modulus.
    #[inline]
    pub fn from_mont_at(&self, a: u64, idx: usize) -> u64 {
        self.montgomery_mul_at(a, 1, idx)
    }

    #[inline]
    fn montgomery_mul_at(&self, a: u64, b: u64, idx: usize) -> u64 {
        let q = self.moduli()[idx];
        let q_inv_neg = self.q_inv_neg[idx];
        let ab = (a as u128) * (b as u128);
        let m = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn to_montgomery(a: u64, q: u64, r_squared: u64, q_inv_neg: u64) -> u64 {
        let ab = (a as u128) * (r_squared as u128);
        let m = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
        let t = ((ab + m * (q as u128)) >> 64) as u64;
        if t >= q {
            t - q
        } else {
            t
        }
    }

    fn compute_q_inv_neg(q: u64) -> u64 {
        let mut y: u64 = 1;
        for i in 1..64 {
            let yi = y.wrapping_mul(q) & (1u64 << i);
            y |= yi;
        }
        y.wrapping_neg()
    }

    fn compute_r_squared(q: u64) -> u64 {
        let r_mod_q = (1u128 << 64) % (q as u128);
        ((r_mod_q * r_mod_q) % (q as u128)) as u64
    }

    fn mod_pow(mut base: u64, mut exp: u64, m: u64) -> u64 {
        let mut result = 1u64;
        base %= m;
        while exp > 0 {
            if exp & 1 == 1 {
                result = ((result as u128 * base as u128) % m as u128) as u64;
            }
            exp >>= 1;
            base = ((base as u128 * base as u128) % m as u128) as u64;
        }
        result
    }

    /// Find a primitive n-th root of unity modulo q (n a power of two)
    fn find_primitive_root(n: u64, q: u64) -> u64 {
        let exp = (q - 1) / n;
        let mut g = 2;
        loop {
            let candidate = Self::mod_pow(g, exp, q);
            // ψ^n = 1 holds by construction; order is exactly n iff ψ^(n/2) ≠ 1
            if Self::mod_pow(candidate, n / 2, q) != 1 {
                return candidate;
            }
            g += 1;
        }
    }

    /// Twiddle factors in bit-reversed order
    fn compute_twiddle_factors(
        n: usize,
        psi: u64,
        q: u64,
        q_inv_neg: u64,
        r_squared: u64,
    ) -> Vec<u64> {
        let mont_mul = |a: u64, b: u64| -> u64 {
            let ab = (a as u128) * (b as u128);
            let mm = ((ab as u64).wrapping_mul(q_inv_neg)) as u128;
            let t = ((ab + mm * (q as u128)) >> 64) as u64;
            if t >= q {
                t - q
            } else {
                t
            }
        };

        let mut factors = vec![0u64; n];
        if n < 2 {
            return factors;
        }
        factors[1] = Self::to_montgomery(1, q, r_squared, q_inv_neg);

        for m in 1..n {
            if m.is_power_of_two() {
                // ψ^(n/(2m))
                let exp = n / (2 * m);
                let mut pow = Self::to_montgomery(1, q, r_squared, q_inv_neg);
                let mut base = psi;
                let mut e = exp;
                while e > 0 {
                    if e & 1 == 1 {
                        pow = mont_mul(pow, base);
                    }
                    base = mont_mul(base, base);
                    e >>= 1;
                }
                factors[m] = pow;
            } else {
                let prev_idx = m & (m - 1);
                let step_idx = m & (!m + 1);
                factors[m] = mont_mul(factors[prev_idx], factors[step_idx]);
            }
        }

        factors
    }
}
