//! PIR client
//!
//! Owns the secret key. Builds queries for a plaintext unit, produces the
//! Galois keys the server expands with, and peels a reply back to the item
//! bytes.
//!
//! # Decoding
//!
//! A layer of the reply holds F^(d-1) ciphertexts. Decrypting them gives
//! digit plaintexts; every group of F consecutive digits recomposes into the
//! ciphertext of the previous round, which decrypts in turn:
//!
//! ```text
//! F^(d-1) cts ─decrypt─▶ F^(d-1) pts ─regroup F─▶ F^(d-2) cts ─decrypt─▶ ... ─▶ 1 pt
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use crate::ks::{GadgetVector, GaloisKeys};
use crate::math::{GaussianSampler, NttContext, Poly};
use crate::params::{PirParams, SchemeParams};
use crate::rlwe::{Plaintext, RlweCiphertext, RlweSecretKey};

use super::decompose::recompose_ciphertext;
use super::encode_db::{coeffs_to_bytes, layer_range};
use super::error::{param_err, usage_err, PirError, Result};
use super::expand::query_scalar;
use super::query::Query;
use super::respond::Reply;

/// Client side of the protocol
pub struct PirClient {
    scheme: SchemeParams,
    pir: PirParams,
    ctx: NttContext,
    sk: RlweSecretKey,
    sampler: GaussianSampler,
    rng: ChaCha20Rng,
}

impl PirClient {
    /// Client with a fresh secret key from OS entropy
    pub fn new(scheme: SchemeParams, pir: PirParams) -> Result<Self> {
        Self::from_rng(scheme, pir, ChaCha20Rng::from_entropy())
    }

    /// Deterministic client: same seed, same key and same queries
    pub fn with_seed(scheme: SchemeParams, pir: PirParams, seed: u64) -> Result<Self> {
        Self::from_rng(scheme, pir, ChaCha20Rng::seed_from_u64(seed))
    }

    fn from_rng(scheme: SchemeParams, pir: PirParams, mut rng: ChaCha20Rng) -> Result<Self> {
        scheme.validate()?;
        let ctx = scheme.ntt_context();
        let sampler = GaussianSampler::new(scheme.sigma);
        let sk = RlweSecretKey::generate(&ctx, &sampler, &mut rng);
        Ok(Self {
            scheme,
            pir,
            ctx,
            sk,
            sampler,
            rng,
        })
    }

    pub fn scheme(&self) -> &SchemeParams {
        &self.scheme
    }

    pub fn pir_params(&self) -> &PirParams {
        &self.pir
    }

    /// Galois keys for every expansion level the hypercube needs
    pub fn generate_galois_keys(&mut self) -> GaloisKeys {
        let gadget = GadgetVector::for_modulus(self.scheme.gadget_log_base, self.scheme.modulus_bits());
        GaloisKeys::generate(
            &self.sk,
            self.pir.max_expansion_levels(),
            &gadget,
            &self.ctx,
            &self.sampler,
            &mut self.rng,
        )
    }

    /// Plaintext unit holding `item_index`
    pub fn get_fv_index(&self, item_index: u64, item_size: usize) -> Result<u64> {
        self.check_item_size(item_size)?;
        self.pir.fv_index(item_index)
    }

    /// Item position of `item_index` inside its plaintext unit
    pub fn get_fv_offset(&self, item_index: u64, item_size: usize) -> Result<u64> {
        self.check_item_size(item_size)?;
        self.pir.fv_offset(item_index)
    }

    fn check_item_size(&self, item_size: usize) -> Result<()> {
        if item_size != self.pir.item_size {
            return Err(param_err!(
                "item_size {} differs from parameters ({})",
                item_size,
                self.pir.item_size
            ));
        }
        Ok(())
    }

    /// Query for plaintext unit `pt_index`
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` if `pt_index` is outside the hypercube.
    pub fn generate_query(&mut self, pt_index: u64) -> Result<Query> {
        let coords = self.pir.coordinates(pt_index)?;
        let mut ciphertexts = Vec::with_capacity(coords.len());

        for (&coord, &n) in coords.iter().zip(self.pir.dims.iter()) {
            let scalar = query_scalar(&self.scheme, PirParams::expansion_levels(n))?;
            let mut coeffs = vec![0u128; self.scheme.ring_dim];
            coeffs[coord] = scalar;
            let selector = Poly::from_u128_coeffs(&coeffs, self.ctx.moduli());
            ciphertexts.push(RlweCiphertext::encrypt_scaled(
                &self.sk,
                &selector,
                &self.ctx,
                &self.sampler,
                &mut self.rng,
            ));
        }

        Ok(Query::new(ciphertexts))
    }

    /// Decrypt a reply into one plaintext per layer
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if the reply does not hold R·F^(d-1) ciphertexts,
    /// `Usage` if a ciphertext does not fit the parameters.
    pub fn decode_reply(&self, reply: &Reply) -> Result<Vec<Plaintext>> {
        let expected = self.pir.reply_ciphertexts(&self.scheme);
        if reply.len() != expected {
            return Err(PirError::DimensionMismatch {
                expected,
                actual: reply.len(),
            });
        }
        if let Some(ct) = reply.ciphertexts.iter().find(|ct| !self.fits(ct)) {
            return Err(usage_err!(
                "reply ciphertext (ring_dim {}, ntt {}) does not fit the parameters",
                ct.ring_dim(),
                ct.is_ntt()
            ));
        }

        let per_layer = expected / self.pir.expansion_ratio;
        reply
            .ciphertexts
            .chunks(per_layer)
            .map(|layer| self.decode_layer(layer))
            .collect()
    }

    fn fits(&self, ct: &RlweCiphertext) -> bool {
        ct.ring_dim() == self.scheme.ring_dim && ct.moduli() == self.ctx.moduli() && !ct.is_ntt()
    }

    fn decode_layer(&self, layer: &[RlweCiphertext]) -> Result<Plaintext> {
        let (delta, t) = (self.scheme.delta(), self.scheme.plain_modulus());
        let f = self.scheme.expansion_factor();

        let mut plain: Vec<Plaintext> = layer
            .par_iter()
            .map(|ct| ct.decrypt(&self.sk, delta, t, &self.ctx))
            .collect();

        for _ in 1..self.pir.num_dims() {
            plain = plain
                .par_chunks(f)
                .map(|digits| -> Result<Plaintext> {
                    let ct = recompose_ciphertext(digits, &self.scheme, &self.ctx)?;
                    Ok(ct.decrypt(&self.sk, delta, t, &self.ctx))
                })
                .collect::<Result<Vec<_>>>()?;
        }

        plain
            .pop()
            .ok_or_else(|| usage_err!("reply layer decoded to nothing"))
    }

    /// Unpack one plaintext unit into its N·logt/8 bytes
    pub fn plaintext_to_bytes(&self, pt: &Plaintext) -> Vec<u8> {
        coeffs_to_bytes(&pt.coeffs, self.scheme.logt, self.scheme.plaintext_bytes())
    }

    /// Decode a reply to the `item_size` bytes of `item_index`
    ///
    /// The reply must answer the query for `get_fv_index(item_index, ..)`.
    pub fn decode_item(&self, reply: &Reply, item_index: u64) -> Result<Vec<u8>> {
        let offset = self.pir.fv_offset(item_index)? as usize;
        let layers = self.decode_reply(reply)?;
        let capacity = self.scheme.plaintext_bytes();

        let mut item = Vec::with_capacity(self.pir.item_size);
        for (j, pt) in layers.iter().enumerate() {
            let len = layer_range(self.pir.item_size, capacity, j).len();
            let bytes = coeffs_to_bytes(&pt.coeffs, self.scheme.logt, (offset + 1) * len);
            item.extend_from_slice(&bytes[offset * len..]);
        }
        Ok(item)
    }

    /// Smallest remaining noise budget (bits) over the reply ciphertexts
    pub fn reply_noise_budget(&self, reply: &Reply) -> u32 {
        let (delta, t) = (self.scheme.delta(), self.scheme.plain_modulus());
        reply
            .ciphertexts
            .iter()
            .filter(|ct| self.fits(ct))
            .map(|ct| ct.noise_budget(&self.sk, delta, t, &self.ctx))
            .min()
            .unwrap_or(0)
    }
}
