//! Parameter derivation for hypercube PIR
//!
//! Maps a dataset shape and the scheme knobs (ring degree, plaintext width,
//! dimension count) to the scheme parameters and the database layout. The
//! modulus chain is the shortest one whose noise estimate survives every
//! reduction round with a safety margin.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::math::crt::RnsBasis;
use crate::math::mod_q::{modulus_chain, supports_ntt, COEFF_MODULI};
use crate::math::sampling::DEFAULT_SIGMA;
use crate::math::NttContext;
use crate::pir::error::{param_err, PirError, Result};

/// Smallest supported ring degree
pub const MIN_RING_DIM: usize = 256;
/// Largest supported ring degree
pub const MAX_RING_DIM: usize = 16384;
/// Plaintext bit-width bounds; t = 2^logt must divide q - 1
pub const MIN_LOGT: u32 = 2;
pub const MAX_LOGT: u32 = 32;
/// Largest supported hypercube dimension count
pub const MAX_DIMENSIONS: usize = 4;
/// log2 of the key-switching gadget base
pub const GADGET_LOG_BASE: u32 = 16;
/// Bits of noise budget every round must keep in reserve
pub const NOISE_MARGIN_BITS: f64 = 4.0;

/// Homomorphic-encryption scheme parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeParams {
    /// Ring degree N (power of two)
    pub ring_dim: usize,
    /// Plaintext modulus t = 2^logt
    pub logt: u32,
    /// Coefficient-modulus chain (one or two primes)
    pub moduli: Vec<u64>,
    /// Standard deviation for Gaussian secret and error sampling
    pub sigma: f64,
    /// Key-switching gadget base is 2^gadget_log_base
    pub gadget_log_base: u32,
}

impl SchemeParams {
    /// Scheme parameters over the first `num_moduli` primes of the chain
    pub fn new(ring_dim: usize, logt: u32, num_moduli: usize) -> Self {
        Self {
            ring_dim,
            logt,
            moduli: modulus_chain(num_moduli).to_vec(),
            sigma: DEFAULT_SIGMA,
            gadget_log_base: GADGET_LOG_BASE,
        }
    }

    /// Plaintext modulus t
    pub fn plain_modulus(&self) -> u64 {
        1u64 << self.logt
    }

    /// Composite coefficient modulus q
    pub fn modulus(&self) -> u128 {
        self.moduli.iter().fold(1u128, |acc, &m| acc * m as u128)
    }

    /// RNS basis of the coefficient modulus
    pub fn basis(&self) -> RnsBasis {
        RnsBasis::new(&self.moduli)
    }

    /// Scaling factor Δ = ⌊q/t⌋
    pub fn delta(&self) -> u128 {
        self.modulus() / self.plain_modulus() as u128
    }

    /// Bit length of q
    pub fn modulus_bits(&self) -> u32 {
        128 - self.modulus().leading_zeros()
    }

    /// Number of gadget digits ℓ = ⌈log2(q) / log2(z)⌉
    pub fn gadget_len(&self) -> usize {
        self.modulus_bits().div_ceil(self.gadget_log_base) as usize
    }

    /// logt-bit digits per ciphertext polynomial
    pub fn digits_per_poly(&self) -> usize {
        self.modulus_bits().div_ceil(self.logt) as usize
    }

    /// Plaintexts one ciphertext decomposes into between reduction rounds
    pub fn expansion_factor(&self) -> usize {
        2 * self.digits_per_poly()
    }

    /// Bytes packed into one plaintext (N·logt/8)
    pub fn plaintext_bytes(&self) -> usize {
        self.ring_dim * self.logt as usize / 8
    }

    /// Serialized size of one ciphertext
    pub fn cipher_size(&self) -> usize {
        2 * self.moduli.len() * self.ring_dim * 8
    }

    /// NTT context over this parameter set's ring
    pub fn ntt_context(&self) -> NttContext {
        NttContext::with_moduli(self.ring_dim, &self.moduli)
    }

    /// Check if parameters are valid
    pub fn validate(&self) -> Result<()> {
        if !self.ring_dim.is_power_of_two()
            || self.ring_dim < MIN_RING_DIM
            || self.ring_dim > MAX_RING_DIM
        {
            return Err(param_err!(
                "ring_dim {} must be a power of two in [{}, {}]",
                self.ring_dim,
                MIN_RING_DIM,
                MAX_RING_DIM
            ));
        }
        if self.logt < MIN_LOGT || self.logt > MAX_LOGT {
            return Err(param_err!(
                "logt {} must be in [{}, {}]",
                self.logt,
                MIN_LOGT,
                MAX_LOGT
            ));
        }
        if self.moduli.is_empty() || self.moduli.len() > COEFF_MODULI.len() {
            return Err(param_err!(
                "modulus chain must hold 1 to {} primes",
                COEFF_MODULI.len()
            ));
        }
        if let Some(&q) = self
            .moduli
            .iter()
            .find(|&&q| !supports_ntt(q, self.ring_dim))
        {
            return Err(param_err!(
                "modulus {} does not support ring_dim {}",
                q,
                self.ring_dim
            ));
        }
        if self.gadget_log_base == 0 || self.gadget_log_base > 32 {
            return Err(param_err!("gadget_log_base must be in [1, 32]"));
        }
        Ok(())
    }
}

/// Database layout parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PirParams {
    /// Number of items
    pub item_count: u64,
    /// Bytes per item
    pub item_size: usize,
    /// Items packed into one plaintext (E)
    pub elements_per_plaintext: u64,
    /// Plaintexts one item spans (R)
    pub expansion_ratio: usize,
    /// Plaintext units per layer (P)
    pub num_plaintexts: u64,
    /// Hypercube side lengths n_0..n_{d-1}
    pub dims: Vec<usize>,
}

impl PirParams {
    /// Number of hypercube dimensions d
    pub fn num_dims(&self) -> usize {
        self.dims.len()
    }

    /// Hypercube volume V = Π n_i
    pub fn volume(&self) -> u64 {
        self.dims.iter().map(|&n| n as u64).product()
    }

    /// Expansion levels for a dimension of size n: ⌈log2 n⌉
    pub fn expansion_levels(n: usize) -> u32 {
        n.next_power_of_two().trailing_zeros()
    }

    /// Deepest expansion over all dimensions
    pub fn max_expansion_levels(&self) -> u32 {
        self.dims
            .iter()
            .map(|&n| Self::expansion_levels(n))
            .max()
            .unwrap_or(0)
    }

    /// Plaintext unit holding `item_index`
    pub fn fv_index(&self, item_index: u64) -> Result<u64> {
        self.check_item(item_index)?;
        Ok(item_index / self.elements_per_plaintext)
    }

    /// Position of `item_index` inside its plaintext unit, in items
    pub fn fv_offset(&self, item_index: u64) -> Result<u64> {
        self.check_item(item_index)?;
        Ok(item_index % self.elements_per_plaintext)
    }

    fn check_item(&self, item_index: u64) -> Result<()> {
        if item_index >= self.item_count {
            return Err(PirError::IndexOutOfRange {
                index: item_index,
                bound: self.item_count,
            });
        }
        Ok(())
    }

    /// Mixed-radix hypercube coordinate of a plaintext unit (c_0 most significant)
    pub fn coordinates(&self, pt_index: u64) -> Result<Vec<usize>> {
        let volume = self.volume();
        if pt_index >= volume {
            return Err(PirError::IndexOutOfRange {
                index: pt_index,
                bound: volume,
            });
        }
        let mut coords = vec![0usize; self.dims.len()];
        let mut rest = pt_index;
        for (slot, &n) in coords.iter_mut().zip(self.dims.iter()).rev() {
            *slot = (rest % n as u64) as usize;
            rest /= n as u64;
        }
        Ok(coords)
    }

    /// Ciphertexts in a reply: R·F^(d-1)
    pub fn reply_ciphertexts(&self, scheme: &SchemeParams) -> usize {
        let f = scheme.expansion_factor();
        self.expansion_ratio * f.pow(self.dims.len().saturating_sub(1) as u32)
    }
}

/// Derive scheme and layout parameters from the dataset shape
///
/// # Errors
///
/// `PirError::Parameter` for out-of-range knobs, a dimension larger than the
/// ring degree, or a shape no modulus chain can carry through every round.
pub fn gen_params(
    item_count: u64,
    item_size: usize,
    ring_dim: usize,
    logt: u32,
    num_dims: usize,
) -> Result<(SchemeParams, PirParams)> {
    if item_count == 0 {
        return Err(param_err!("item_count must be at least 1"));
    }
    if item_size == 0 {
        return Err(param_err!("item_size must be at least 1"));
    }
    if num_dims == 0 || num_dims > MAX_DIMENSIONS {
        return Err(param_err!(
            "dimension count {} must be in [1, {}]",
            num_dims,
            MAX_DIMENSIONS
        ));
    }

    let mut scheme = SchemeParams::new(ring_dim, logt, 1);
    scheme.validate()?;

    let capacity = scheme.plaintext_bytes();
    let (elements_per_plaintext, expansion_ratio) = if item_size <= capacity {
        ((capacity / item_size) as u64, 1)
    } else {
        (1, item_size.div_ceil(capacity))
    };
    let num_plaintexts = item_count.div_ceil(elements_per_plaintext);
    let dims = compute_dims(num_plaintexts, num_dims);

    if let Some(&n) = dims.iter().find(|&&n| n > ring_dim) {
        return Err(param_err!(
            "dimension size {} exceeds ring_dim {}; use more dimensions",
            n,
            ring_dim
        ));
    }

    let pir = PirParams {
        item_count,
        item_size,
        elements_per_plaintext,
        expansion_ratio,
        num_plaintexts,
        dims,
    };

    for num_moduli in 1..=COEFF_MODULI.len() {
        scheme = SchemeParams::new(ring_dim, logt, num_moduli);
        let budget = estimate_noise_budget(&scheme, &pir);
        if budget >= NOISE_MARGIN_BITS {
            debug!(
                ring_dim,
                logt,
                moduli = num_moduli,
                dims = ?pir.dims,
                elements_per_plaintext,
                expansion_ratio,
                budget,
                "derived PIR parameters"
            );
            return Ok((scheme, pir));
        }
    }

    Err(param_err!(
        "insufficient noise budget for N={}, logt={}, dims={:?}",
        ring_dim,
        logt,
        pir.dims
    ))
}

/// Greedy hypercube sides: n_i = ⌈remaining^(1/(d-i))⌉
pub fn compute_dims(num_plaintexts: u64, num_dims: usize) -> Vec<usize> {
    let mut remaining = num_plaintexts.max(1);
    let mut dims = Vec::with_capacity(num_dims);
    for i in 0..num_dims {
        let n = ceil_root(remaining, (num_dims - i) as u32);
        dims.push(n as usize);
        remaining = remaining.div_ceil(n);
    }
    dims
}

/// Smallest r with r^k ≥ x
fn ceil_root(x: u64, k: u32) -> u64 {
    if x <= 1 || k == 1 {
        return x;
    }
    let pow = |r: u64| (r as u128).pow(k);
    let mut r = (x as f64).powf(1.0 / k as f64).round().max(1.0) as u64;
    while pow(r) < x as u128 {
        r += 1;
    }
    while r > 1 && pow(r - 1) >= x as u128 {
        r -= 1;
    }
    r
}

/// Estimated noise budget (bits) left after the worst reduction round
///
/// Each round starts from a freshly expanded selection vector, because the
/// client decrypts and recomposes the intermediate ciphertexts, so the worst
/// round bounds the whole reply.
pub fn estimate_noise_budget(scheme: &SchemeParams, pir: &PirParams) -> f64 {
    let n = scheme.ring_dim as f64;
    let log_six_sigma = (6.0 * scheme.sigma).log2();
    let fresh = log_six_sigma;
    let key_switch = scheme.gadget_log_base as f64
        + log_six_sigma
        + 0.5 * (scheme.gadget_len() as f64 * n).log2();
    let log_delta = (scheme.delta() as f64).log2();

    pir.dims
        .iter()
        .map(|&dim| {
            let levels = PirParams::expansion_levels(dim) as f64;
            let expanded = levels + fresh.max(key_switch) + 1.0;
            let round = expanded
                + scheme.logt as f64
                + 0.5 * (dim as f64 * n).log2()
                + 6f64.log2();
            log_delta - 1.0 - round
        })
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_a_params() {
        let (scheme, pir) = gen_params(96151, 15360, 4096, 30, 2).unwrap();

        assert_eq!(scheme.plaintext_bytes(), 15360);
        assert_eq!(pir.elements_per_plaintext, 1);
        assert_eq!(pir.expansion_ratio, 1);
        assert_eq!(pir.num_plaintexts, 96151);
        assert_eq!(pir.dims, vec![311, 310]);
        assert!(pir.volume() >= 96151);
        assert_eq!(scheme.moduli.len(), 2);
        assert_eq!(scheme.expansion_factor(), 10);
        assert_eq!(pir.reply_ciphertexts(&scheme), 10);
    }

    #[test]
    fn test_scenario_b_params() {
        let (scheme, pir) = gen_params(16, 64, 4096, 12, 1).unwrap();

        assert_eq!(scheme.plaintext_bytes(), 6144);
        assert_eq!(pir.elements_per_plaintext, 96);
        assert_eq!(pir.num_plaintexts, 1);
        assert_eq!(pir.dims, vec![1]);
        assert_eq!(pir.reply_ciphertexts(&scheme), 1);
    }

    #[test]
    fn test_large_items_span_plaintexts() {
        let (scheme, pir) = gen_params(10, 1000, 256, 12, 1).unwrap();
        assert_eq!(scheme.plaintext_bytes(), 384);
        assert_eq!(pir.elements_per_plaintext, 1);
        assert_eq!(pir.expansion_ratio, 3);
        assert_eq!(pir.num_plaintexts, 10);
    }

    #[test]
    fn test_dimension_invariants() {
        for count in [1u64, 2, 7, 100, 1000, 4097, 96151, 1_000_003] {
            for d in 1..=3 {
                let dims = compute_dims(count, d);
                assert_eq!(dims.len(), d);
                let volume: u64 = dims.iter().map(|&n| n as u64).product();
                assert!(volume >= count, "count {} d {} dims {:?}", count, d, dims);
            }
        }
    }

    #[test]
    fn test_coordinates_unique_and_in_range() {
        let (_, pir) = gen_params(1000, 384, 256, 12, 3).unwrap();
        let mut seen = std::collections::HashSet::new();
        for pt in 0..pir.volume() {
            let coords = pir.coordinates(pt).unwrap();
            for (c, &n) in coords.iter().zip(pir.dims.iter()) {
                assert!(*c < n);
            }
            assert!(seen.insert(coords));
        }
        assert!(matches!(
            pir.coordinates(pir.volume()),
            Err(PirError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_fv_index_and_offset() {
        let (_, pir) = gen_params(100, 64, 256, 8, 1).unwrap();
        // capacity 256 bytes -> 4 items per plaintext
        assert_eq!(pir.elements_per_plaintext, 4);
        assert_eq!(pir.fv_index(0).unwrap(), 0);
        assert_eq!(pir.fv_index(9).unwrap(), 2);
        assert_eq!(pir.fv_offset(9).unwrap(), 1);
        assert_eq!(pir.fv_index(99).unwrap(), 24);
        assert!(matches!(
            pir.fv_index(100),
            Err(PirError::IndexOutOfRange {
                index: 100,
                bound: 100
            })
        ));
    }

    #[test]
    fn test_invalid_knobs_rejected() {
        assert!(matches!(
            gen_params(0, 8, 256, 12, 1),
            Err(PirError::Parameter(_))
        ));
        assert!(matches!(
            gen_params(8, 0, 256, 12, 1),
            Err(PirError::Parameter(_))
        ));
        assert!(gen_params(8, 8, 300, 12, 1).is_err());
        assert!(gen_params(8, 8, 128, 12, 1).is_err());
        assert!(gen_params(8, 8, 256, 1, 1).is_err());
        assert!(gen_params(8, 8, 256, 33, 1).is_err());
        assert!(gen_params(8, 8, 256, 12, 0).is_err());
        assert!(gen_params(8, 8, 256, 12, 5).is_err());
    }

    #[test]
    fn test_dimension_larger_than_ring_rejected() {
        // 1000 plaintexts in one dimension cannot expand from a 256-slot query
        let err = gen_params(1000, 384, 256, 12, 1).unwrap_err();
        assert!(matches!(err, PirError::Parameter(_)));
    }

    #[test]
    fn test_noise_budget_positive_for_recommended_points() {
        for (logt, d) in [(12, 2), (8, 1)] {
            let (scheme, pir) = gen_params(4096, 256, 4096, logt, d).unwrap();
            assert!(estimate_noise_budget(&scheme, &pir) >= NOISE_MARGIN_BITS);
        }
    }

    #[test]
    fn test_insufficient_budget_rejected() {
        // 32-bit plaintexts at the smallest ring still fit in two primes
        assert!(gen_params(64, 1024, 256, 32, 1).is_ok());
        let scheme = SchemeParams::new(256, 32, 1);
        let pir = PirParams {
            item_count: 64,
            item_size: 1024,
            elements_per_plaintext: 1,
            expansion_ratio: 1,
            num_plaintexts: 64,
            dims: vec![64],
        };
        assert!(estimate_noise_budget(&scheme, &pir) < NOISE_MARGIN_BITS);
    }

    #[test]
    fn test_params_json_roundtrip() {
        let (scheme, pir) = gen_params(96151, 15360, 4096, 30, 2).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, serde_json::to_string_pretty(&(&scheme, &pir)).unwrap()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let (scheme2, pir2): (SchemeParams, PirParams) = serde_json::from_str(&text).unwrap();
        assert_eq!(scheme, scheme2);
        assert_eq!(pir, pir2);
    }
}
