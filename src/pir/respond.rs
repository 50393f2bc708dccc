//! PIR Respond: hypercube reduction
//!
//! Folds one database layer against the expanded selection vectors, one
//! dimension per round.
//!
//! # Rounds
//!
//! The current hypercube is a flat vector with dimension i outermost:
//! ```text
//! cur[c · rows + r],  c ∈ [0, n_i),  rows = len / n_i
//! out[r] = Σ_c sel_i[c] · cur[c · rows + r]
//! ```
//! Between rounds every output ciphertext is decomposed into F plaintexts
//! (see [`decompose_ciphertext`]) placed at `r · F + f`, so the next round
//! folds them like database entries. The last round returns its F^(d-1)
//! ciphertexts in coefficient domain.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::math::{NttContext, Poly};
use crate::params::SchemeParams;
use crate::rlwe::RlweCiphertext;

use super::decompose::decompose_ciphertext;
use super::metrics::{timed, Phase, ReplyMetrics};

/// Server reply: R·F^(d-1) coefficient-domain ciphertexts, layer-major
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub ciphertexts: Vec<RlweCiphertext>,
}

impl Reply {
    pub fn new(ciphertexts: Vec<RlweCiphertext>) -> Self {
        Self { ciphertexts }
    }

    pub fn len(&self) -> usize {
        self.ciphertexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ciphertexts.is_empty()
    }
}

/// Fold one layer of NTT-domain plaintexts down to F^(d-1) ciphertexts
///
/// `selectors[i]` is the NTT-domain one-hot vector for dimension i; the
/// layer length must equal the product of their lengths.
pub fn respond_layer(
    layer: &[Poly],
    selectors: &[Vec<RlweCiphertext>],
    scheme: &SchemeParams,
    ctx: &NttContext,
    metrics: &dyn ReplyMetrics,
) -> Vec<RlweCiphertext> {
    let mut cur: Cow<'_, [Poly]> = Cow::Borrowed(layer);
    let mut folded = Vec::new();

    for (i, sel) in selectors.iter().enumerate() {
        let rows = cur.len() / sel.len();
        let products = fold_round(&cur, sel, rows, ctx, metrics);

        folded = timed(metrics, Phase::InverseNtt, || {
            products
                .into_par_iter()
                .map(|mut ct| {
                    ct.from_ntt(ctx);
                    ct
                })
                .collect::<Vec<_>>()
        });

        if i + 1 == selectors.len() {
            break;
        }

        let digits: Vec<Poly> = timed(metrics, Phase::InterDbConstruction, || {
            folded
                .par_iter()
                .map(|ct| decompose_ciphertext(ct, scheme, ctx))
                .collect::<Vec<_>>()
                .into_iter()
                .flatten()
                .collect()
        });

        let digits = timed(metrics, Phase::InterDbNtt, || {
            digits
                .into_par_iter()
                .map(|mut pt| {
                    pt.to_ntt(ctx);
                    pt
                })
                .collect::<Vec<_>>()
        });
        cur = Cow::Owned(digits);
    }

    folded
}

/// One dot product per row, rows in parallel
fn fold_round(
    cur: &[Poly],
    sel: &[RlweCiphertext],
    rows: usize,
    ctx: &NttContext,
    metrics: &dyn ReplyMetrics,
) -> Vec<RlweCiphertext> {
    (0..rows)
        .into_par_iter()
        .map(|r| {
            let mut mul_time = Duration::ZERO;
            let mut add_time = Duration::ZERO;

            let start = Instant::now();
            let mut acc = sel[0].mul_plain(&cur[r], ctx);
            mul_time += start.elapsed();

            for (c, selector) in sel.iter().enumerate().skip(1) {
                let start = Instant::now();
                let product = selector.mul_plain(&cur[c * rows + r], ctx);
                mul_time += start.elapsed();

                let start = Instant::now();
                acc += &product;
                add_time += start.elapsed();
            }

            metrics.record(Phase::Multiply, mul_time);
            metrics.record(Phase::Add, add_time);
            acc
        })
        .collect()
}
