//! Galois key set: one automorphism key-switching matrix per expansion level.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::{GaussianSampler, NttContext};
use crate::pir::error::{usage_err, PirError, Result};
use crate::rlwe::{expansion_elements, is_valid_galois_element, RlweSecretKey};

use super::gadget::GadgetVector;
use super::setup::{generate_automorphism_ks_matrix, KeySwitchingMatrix};

/// Public automorphism keys, keyed by Galois element
///
/// Sent once by the client and kept by the server under a client id. The
/// serialized form is an opaque `bincode` blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaloisKeys {
    ring_dim: usize,
    keys: BTreeMap<usize, KeySwitchingMatrix>,
}

impl GaloisKeys {
    /// Keys for expansion levels 0..levels (elements d/2^l + 1)
    pub fn generate<R: Rng>(
        sk: &RlweSecretKey,
        levels: u32,
        gadget: &GadgetVector,
        ctx: &NttContext,
        sampler: &GaussianSampler,
        rng: &mut R,
    ) -> Self {
        let ring_dim = sk.ring_dim();
        let keys = expansion_elements(ring_dim, levels)
            .into_iter()
            .map(|g| {
                let ks = generate_automorphism_ks_matrix(sk, g, gadget, ctx, sampler, rng);
                (g, ks)
            })
            .collect();
        Self { ring_dim, keys }
    }

    /// Ring dimension the keys were generated for
    pub fn ring_dim(&self) -> usize {
        self.ring_dim
    }

    /// Key-switching matrix for Galois element `g`
    pub fn get(&self, g: usize) -> Result<&KeySwitchingMatrix> {
        self.keys
            .get(&g)
            .ok_or_else(|| usage_err!("galois keys carry no element {}", g))
    }

    /// Galois elements present, ascending
    pub fn elements(&self) -> impl Iterator<Item = usize> + '_ {
        self.keys.keys().copied()
    }

    /// Number of key-switching matrices
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Serialized size in bytes
    pub fn size(&self) -> usize {
        bincode::serialized_size(self).map(|s| s as usize).unwrap_or(0)
    }

    /// Serialize to an opaque blob
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from a blob produced by [`GaloisKeys::to_bytes`]
    ///
    /// Checks structure only; wrong key material is not detectable here.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let keys: Self = bincode::deserialize(bytes)?;
        if let Some(g) = keys
            .elements()
            .find(|&g| !is_valid_galois_element(g, keys.ring_dim))
        {
            return Err(PirError::Serialization(format!(
                "invalid galois element {} for ring_dim {}",
                g, keys.ring_dim
            )));
        }
        if keys.keys.values().any(|ks| ks.ring_dim() != keys.ring_dim) {
            return Err(PirError::Serialization(
                "key-switching matrix dimension mismatch".into(),
            ));
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SchemeParams;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn make_keys(levels: u32) -> GaloisKeys {
        let scheme = SchemeParams::new(256, 12, 2);
        let ctx = scheme.ntt_context();
        let sampler = GaussianSampler::default();
        let mut rng = ChaCha20Rng::seed_from_u64(31);
        let sk = RlweSecretKey::generate(&ctx, &sampler, &mut rng);
        let gadget = GadgetVector::for_modulus(scheme.gadget_log_base, scheme.modulus_bits());
        GaloisKeys::generate(&sk, levels, &gadget, &ctx, &sampler, &mut rng)
    }

    #[test]
    fn test_generate_expansion_elements() {
        let keys = make_keys(3);
        assert_eq!(keys.len(), 3);
        assert_eq!(keys.elements().collect::<Vec<_>>(), vec![65, 129, 257]);
        assert!(keys.get(257).is_ok());
        assert!(matches!(keys.get(33), Err(PirError::Usage(_))));
    }

    #[test]
    fn test_bytes_roundtrip_and_size() {
        let keys = make_keys(2);
        let bytes = keys.to_bytes().unwrap();
        assert_eq!(bytes.len(), keys.size());

        let restored = GaloisKeys::from_bytes(&bytes).unwrap();
        assert_eq!(restored, keys);
    }

    #[test]
    fn test_truncated_blob_rejected() {
        let keys = make_keys(1);
        let bytes = keys.to_bytes().unwrap();
        let err = GaloisKeys::from_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, PirError::Serialization(_)));
    }
}
