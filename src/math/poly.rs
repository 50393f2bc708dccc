//! Polynomial operations over R_q = Z_q[X]/(X^d + 1).
//!
//! Polynomials are stored in RNS form: one block of `d` residues per prime of
//! the modulus chain, laid out `[modulus][coeff]`. They exist either in the
//! coefficient domain or in the NTT domain (Montgomery form).
//!
//! # Example
//!
//! ```
//! use hypercube_pir::math::{NttContext, Poly};
//! use hypercube_pir::math::mod_q::{Q0, Q1};
//!
//! let ctx = NttContext::with_moduli(256, &[Q0, Q1]);
//! let mut rng = rand::thread_rng();
//!
//! let a = Poly::random_with_rng(256, ctx.moduli(), &mut rng);
//! let b = Poly::constant(1, 256, ctx.moduli());
//!
//! let product = a.mul_ntt(&b, &ctx);
//! assert_eq!(product, a);
//! ```

use super::crt::RnsBasis;
use super::ntt::NttContext;
use super::sampling::GaussianSampler;
use rand::Rng;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Polynomial in R_q = Z_q[X]/(X^d + 1), q = Π q_i.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Poly {
    /// Residues, `moduli.len()` blocks of `d` values each.
    coeffs: Vec<u64>,
    /// CRT moduli.
    moduli: Vec<u64>,
    /// Whether coefficients are in NTT domain.
    is_ntt: bool,
}

impl Poly {
    /// Create zero polynomial with given dimension and moduli
    pub fn zero(dim: usize, moduli: &[u64]) -> Self {
        Self {
            coeffs: vec![0; dim * moduli.len()],
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Create polynomial from a flat residue vector (`[modulus][coeff]`)
    pub fn from_residues(coeffs: Vec<u64>, moduli: &[u64]) -> Self {
        assert_eq!(
            coeffs.len() % moduli.len(),
            0,
            "Residue vector must hold one block per modulus"
        );
        let mut p = Self {
            coeffs,
            moduli: moduli.to_vec(),
            is_ntt: false,
        };
        p.reduce();
        p
    }

    /// Create polynomial from small unsigned coefficients, reduced into every prime
    pub fn from_coeffs(coeffs: &[u64], moduli: &[u64]) -> Self {
        let mut out = Vec::with_capacity(coeffs.len() * moduli.len());
        for &q in moduli {
            out.extend(coeffs.iter().map(|&c| c % q));
        }
        Self {
            coeffs: out,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Create polynomial from composed coefficients in [0, q)
    pub fn from_u128_coeffs(coeffs: &[u128], moduli: &[u64]) -> Self {
        let mut out = Vec::with_capacity(coeffs.len() * moduli.len());
        for &q in moduli {
            out.extend(coeffs.iter().map(|&c| (c % q as u128) as u64));
        }
        Self {
            coeffs: out,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Create polynomial from signed coefficients
    pub fn from_signed(coeffs: &[i64], moduli: &[u64]) -> Self {
        let mut out = Vec::with_capacity(coeffs.len() * moduli.len());
        for &q in moduli {
            out.extend(
                coeffs
                    .iter()
                    .map(|&c| super::modular::ModQ::from_signed(c, q)),
            );
        }
        Self {
            coeffs: out,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Create polynomial with a single coefficient (constant polynomial)
    pub fn constant(value: u64, dim: usize, moduli: &[u64]) -> Self {
        let mut p = Self::zero(dim, moduli);
        for (idx, &q) in moduli.iter().enumerate() {
            p.coeffs[idx * dim] = value % q;
        }
        p
    }

    /// Sample polynomial with coefficients from the discrete Gaussian distribution
    pub fn sample_gaussian<R: Rng>(
        dim: usize,
        moduli: &[u64],
        sampler: &GaussianSampler,
        rng: &mut R,
    ) -> Self {
        let samples = sampler.sample_vec(dim, rng);
        Self::from_signed(&samples, moduli)
    }

    /// Generate a uniformly random polynomial with given RNG
    ///
    /// Independent uniform residues give a uniform element of Z_q by CRT.
    pub fn random_with_rng<R: Rng>(dim: usize, moduli: &[u64], rng: &mut R) -> Self {
        let mut coeffs = Vec::with_capacity(dim * moduli.len());
        for &q in moduli {
            coeffs.extend((0..dim).map(|_| rng.gen_range(0..q)));
        }
        Self {
            coeffs,
            moduli: moduli.to_vec(),
            is_ntt: false,
        }
    }

    /// Get polynomial dimension
    pub fn dimension(&self) -> usize {
        if self.moduli.is_empty() {
            0
        } else {
            self.coeffs.len() / self.moduli.len()
        }
    }

    /// CRT moduli
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Number of CRT moduli
    pub fn crt_count(&self) -> usize {
        self.moduli.len()
    }

    /// Check if in NTT domain
    pub fn is_ntt(&self) -> bool {
        self.is_ntt
    }

    /// Get reference to the flat residue vector
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    /// Residues modulo the `idx`-th prime
    pub fn residue(&self, idx: usize) -> &[u64] {
        let d = self.dimension();
        &self.coeffs[idx * d..(idx + 1) * d]
    }

    fn reduce(&mut self) {
        let d = self.dimension();
        for (idx, &q) in self.moduli.iter().enumerate() {
            for c in &mut self.coeffs[idx * d..(idx + 1) * d] {
                *c %= q;
            }
        }
    }

    /// Convert to NTT domain
    pub fn to_ntt(&mut self, ctx: &NttContext) {
        if !self.is_ntt {
            ctx.forward(&mut self.coeffs);
            self.is_ntt = true;
        }
    }

    /// Convert from NTT domain to coefficient domain
    pub fn from_ntt(&mut self, ctx: &NttContext) {
        if self.is_ntt {
            ctx.inverse(&mut self.coeffs);
            self.is_ntt = false;
        }
    }

    /// Create a copy in NTT domain
    pub fn to_ntt_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.to_ntt(ctx);
        result
    }

    /// Create a copy in coefficient domain
    pub fn from_ntt_new(&self, ctx: &NttContext) -> Self {
        let mut result = self.clone();
        result.from_ntt(ctx);
        result
    }

    /// Compose every coefficient into its value in [0, q)
    pub fn to_u128_coeffs(&self, basis: &RnsBasis) -> Vec<u128> {
        assert!(!self.is_ntt, "Cannot compose coefficients in NTT domain");
        let d = self.dimension();
        let mut residues = vec![0u64; self.crt_count()];
        (0..d)
            .map(|i| {
                for (idx, r) in residues.iter_mut().enumerate() {
                    *r = self.coeffs[idx * d + i];
                }
                basis.compose(&residues)
            })
            .collect()
    }

    /// Multiply by a scalar given modulo q.
    ///
    /// Valid in either domain: a plain residue times a Montgomery value is the
    /// Montgomery form of the product.
    pub fn scalar_mul_u128(&self, scalar: u128) -> Self {
        let mut result = self.clone();
        result.scalar_mul_assign_u128(scalar);
        result
    }

    /// In-place scalar multiplication
    pub fn scalar_mul_assign_u128(&mut self, scalar: u128) {
        let d = self.dimension();
        for (idx, &q) in self.moduli.iter().enumerate() {
            let s = (scalar % q as u128) as u64;
            for c in &mut self.coeffs[idx * d..(idx + 1) * d] {
                *c = ((*c as u128 * s as u128) % q as u128) as u64;
            }
        }
    }

    /// Multiply by the monomial X^k, `k` taken modulo 2d
    pub fn mul_monomial(&self, k: usize) -> Self {
        assert!(!self.is_ntt, "Monomial shift requires coefficient domain");
        let d = self.dimension();
        let k = k % (2 * d);
        let mut result = Self::zero(d, &self.moduli);
        for (idx, &q) in self.moduli.iter().enumerate() {
            let src = &self.coeffs[idx * d..(idx + 1) * d];
            let dst = &mut result.coeffs[idx * d..(idx + 1) * d];
            for (i, &c) in src.iter().enumerate() {
                let pos = i + k;
                // X^(d + j) = -X^j
                let (slot, negate) = match pos / d {
                    0 => (pos, false),
                    1 => (pos - d, true),
                    2 => (pos - 2 * d, false),
                    _ => (pos - 3 * d, true),
                };
                dst[slot] = if negate && c != 0 { q - c } else { c };
            }
        }
        result
    }

    /// Polynomial multiplication using NTT (negacyclic for X^d + 1)
    pub fn mul_ntt(&self, other: &Self, ctx: &NttContext) -> Self {
        let a = self.to_ntt_new(ctx);
        let b = other.to_ntt_new(ctx);
        let mut poly = a.mul_ntt_domain(&b, ctx);
        poly.from_ntt(ctx);
        poly
    }

    /// Polynomial multiplication when both are already in NTT domain
    pub fn mul_ntt_domain(&self, other: &Self, ctx: &NttContext) -> Self {
        assert!(
            self.is_ntt && other.is_ntt,
            "Both polynomials must be in NTT domain"
        );
        assert_eq!(self.moduli, other.moduli, "Moduli must match");

        let mut result = vec![0u64; self.coeffs.len()];
        ctx.pointwise_mul(&self.coeffs, &other.coeffs, &mut result);

        Self {
            coeffs: result,
            moduli: self.moduli.clone(),
            is_ntt: true,
        }
    }

    /// In-place multiply-accumulate in NTT domain: self += a * b
    pub fn mul_acc_ntt_domain(&mut self, a: &Self, b: &Self, ctx: &NttContext) {
        assert!(
            self.is_ntt && a.is_ntt && b.is_ntt,
            "All polynomials must be in NTT domain"
        );
        assert_eq!(self.moduli, a.moduli, "Moduli must match");
        assert_eq!(self.moduli, b.moduli, "Moduli must match");

        ctx.pointwise_mul_acc(&a.coeffs, &b.coeffs, &mut self.coeffs);
    }

    /// Check if polynomial is zero
    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    fn zip_with(&self, rhs: &Self, f: impl Fn(u64, u64, u64) -> u64) -> Self {
        assert_eq!(self.moduli, rhs.moduli, "Moduli must match");
        assert_eq!(self.is_ntt, rhs.is_ntt, "NTT domains must match");
        assert_eq!(self.coeffs.len(), rhs.coeffs.len(), "Dimensions must match");

        let d = self.dimension();
        let mut coeffs = Vec::with_capacity(self.coeffs.len());
        for (idx, &q) in self.moduli.iter().enumerate() {
            let range = idx * d..(idx + 1) * d;
            coeffs.extend(
                self.coeffs[range.clone()]
                    .iter()
                    .zip(rhs.coeffs[range].iter())
                    .map(|(&a, &b)| f(a, b, q)),
            );
        }

        Poly {
            coeffs,
            moduli: self.moduli.clone(),
            is_ntt: self.is_ntt,
        }
    }
}

impl PartialEq for Poly {
    fn eq(&self, other: &Self) -> bool {
        self.moduli == other.moduli && self.is_ntt == other.is_ntt && self.coeffs == other.coeffs
    }
}

impl Eq for Poly {}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Self::Output {
        self.zip_with(rhs, |a, b, q| {
            let sum = a + b;
            if sum >= q {
                sum - q
            } else {
                sum
            }
        })
    }
}

impl Add for Poly {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        &self + &rhs
    }
}

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, rhs: &Self) {
        *self = &*self + rhs;
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Self::Output {
        self.zip_with(rhs, |a, b, q| if a >= b { a - b } else { q - b + a })
    }
}

impl Sub for Poly {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        &self - &rhs
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, rhs: &Self) {
        *self = &*self - rhs;
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Self::Output {
        let zero = Poly {
            coeffs: vec![0; self.coeffs.len()],
            moduli: self.moduli.clone(),
            is_ntt: self.is_ntt,
        };
        &zero - self
    }
}

impl Neg for Poly {
    type Output = Self;

    fn neg(self) -> Self::Output {
        -&self
    }
}
