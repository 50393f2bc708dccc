//! Key-switching matrix generation

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::{GaussianSampler, NttContext, Poly};
use crate::pir::error::{usage_err, Result};
use crate::rlwe::{apply_automorphism, RlweCiphertext, RlweSecretKey};

use super::gadget::GadgetVector;

/// Key-switching matrix from secret key s to secret key s'
///
/// The matrix consists of ℓ RLWE ciphertexts encrypting s·z^i under s':
/// ```text
/// K[i] = RLWE_{s'}(s·z^i) = (a_i, -a_i·s' + e_i + s·z^i)
/// ```
///
/// Rows are stored in NTT domain, ready for the multiply-accumulate in
/// [`key_switch`](super::key_switch).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySwitchingMatrix {
    /// ℓ RLWE ciphertexts
    pub rows: Vec<RlweCiphertext>,
    /// Gadget parameters
    pub gadget: GadgetVector,
}

impl KeySwitchingMatrix {
    /// Get the ring dimension
    pub fn ring_dim(&self) -> usize {
        self.rows.first().map(|r| r.ring_dim()).unwrap_or(0)
    }

    /// Get the number of rows (same as gadget length)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the matrix is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check that the matrix can be used with `ctx` without panicking
    ///
    /// Keys arrive from clients, so the gadget shape, row count, moduli,
    /// domain and residues are all checked. Wrong key material that passes
    /// only decodes to wrong bytes.
    ///
    /// # Errors
    ///
    /// `Usage` describing the first structural mismatch.
    pub fn check(&self, ctx: &NttContext) -> Result<()> {
        let modulus_bits = 128 - ctx.modulus().leading_zeros();
        let GadgetVector { log_base, len } = self.gadget;
        if !(1..=32).contains(&log_base) {
            return Err(usage_err!("gadget log_base {} outside [1, 32]", log_base));
        }
        if len == 0
            || (len as u64) * (log_base as u64) < modulus_bits as u64
            || (len as u64 - 1) * (log_base as u64) >= 128
        {
            return Err(usage_err!(
                "gadget length {} with log_base {} does not fit a {}-bit modulus",
                len,
                log_base,
                modulus_bits
            ));
        }
        if self.rows.len() != len {
            return Err(usage_err!(
                "key-switching matrix has {} rows, gadget needs {}",
                self.rows.len(),
                len
            ));
        }

        let expected_len = ctx.dimension() * ctx.moduli().len();
        for poly in self.rows.iter().flat_map(|row| [&row.a, &row.b]) {
            if poly.moduli() != ctx.moduli() {
                return Err(usage_err!(
                    "key-switching row moduli {:?}, expected {:?}",
                    poly.moduli(),
                    ctx.moduli()
                ));
            }
            if !poly.is_ntt() {
                return Err(usage_err!("key-switching rows must be in NTT domain"));
            }
            if poly.coeffs().len() != expected_len {
                return Err(usage_err!(
                    "key-switching row holds {} residues, expected {}",
                    poly.coeffs().len(),
                    expected_len
                ));
            }
            let unreduced = poly
                .coeffs()
                .chunks(ctx.dimension())
                .zip(ctx.moduli())
                .any(|(block, &q)| block.iter().any(|&r| r >= q));
            if unreduced {
                return Err(usage_err!("key-switching row has unreduced residues"));
            }
        }
        Ok(())
    }
}

/// Generate a key-switching matrix from secret key s to secret key s'
///
/// Creates ℓ RLWE encryptions of s·z^i under s':
/// ```text
/// K[i] = (a_i, -a_i·s' + e_i + s·z^i)
/// ```
pub fn generate_ks_matrix<R: Rng>(
    from_key: &Poly,
    to_key: &RlweSecretKey,
    gadget: &GadgetVector,
    ctx: &NttContext,
    sampler: &GaussianSampler,
    rng: &mut R,
) -> KeySwitchingMatrix {
    debug_assert_eq!(
        from_key.dimension(),
        to_key.ring_dim(),
        "Keys must have same ring dimension"
    );

    let rows = (0..gadget.len)
        .map(|i| {
            let s_scaled = from_key.scalar_mul_u128(gadget.power(i));
            let mut row = RlweCiphertext::encrypt_scaled(to_key, &s_scaled, ctx, sampler, rng);
            row.to_ntt(ctx);
            row
        })
        .collect();

    KeySwitchingMatrix {
        rows,
        gadget: gadget.clone(),
    }
}

/// Generate a key-switching matrix for automorphism
///
/// For Galois automorphism τ_g, creates a matrix from τ_g(s) to s. This is
/// used to switch back after applying an automorphism to a ciphertext.
pub fn generate_automorphism_ks_matrix<R: Rng>(
    sk: &RlweSecretKey,
    automorphism: usize,
    gadget: &GadgetVector,
    ctx: &NttContext,
    sampler: &GaussianSampler,
    rng: &mut R,
) -> KeySwitchingMatrix {
    let auto_s = apply_automorphism(&sk.poly, automorphism);
    generate_ks_matrix(&auto_s, sk, gadget, ctx, sampler, rng)
}
