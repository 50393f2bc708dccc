//! PIR server
//!
//! Holds the encoded hypercube and the Galois keys of every registered
//! client. A reply runs expansion, query NTT, then the per-layer fold:
//!
//! ```text
//! Query ──expand──▶ one-hot vectors ──NTT──▶ selectors
//!                                               │
//! layer 0..R ──fold dim 0..d-1 (decompose between rounds)──▶ Reply
//! ```
//!
//! Reply generation only reads shared state, so one server can answer many
//! queries concurrently. Database setup takes `&mut self`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::ks::GaloisKeys;
use crate::math::NttContext;
use crate::params::{PirParams, SchemeParams};
use crate::rlwe::RlweCiphertext;

use super::encode_db::{encode_database, EncodedDatabase};
use super::error::{param_err, usage_err, ClientId, PirError, Result};
use super::expand::expand_query;
use super::metrics::{timed, Phase, PhaseTimings, ReplyMetrics, TimingSnapshot};
use super::query::Query;
use super::respond::{respond_layer, Reply};

/// Single-server PIR responder
pub struct PirServer {
    scheme: SchemeParams,
    pir: PirParams,
    ctx: NttContext,
    keys: RwLock<HashMap<ClientId, Arc<GaloisKeys>>>,
    staged: Option<Vec<u8>>,
    db: Option<EncodedDatabase>,
    metrics: Arc<dyn ReplyMetrics>,
}

impl PirServer {
    /// Server with cumulative [`PhaseTimings`]
    pub fn new(scheme: SchemeParams, pir: PirParams) -> Result<Self> {
        Self::with_metrics(scheme, pir, Arc::new(PhaseTimings::new()))
    }

    /// Server reporting phase durations to `metrics`
    pub fn with_metrics(
        scheme: SchemeParams,
        pir: PirParams,
        metrics: Arc<dyn ReplyMetrics>,
    ) -> Result<Self> {
        scheme.validate()?;
        if pir.dims.is_empty() {
            return Err(param_err!("hypercube needs at least one dimension"));
        }
        if pir.volume() < pir.num_plaintexts {
            return Err(param_err!(
                "hypercube volume {} below {} plaintext units",
                pir.volume(),
                pir.num_plaintexts
            ));
        }
        let ctx = scheme.ntt_context();
        Ok(Self {
            scheme,
            pir,
            ctx,
            keys: RwLock::new(HashMap::new()),
            staged: None,
            db: None,
            metrics,
        })
    }

    pub fn scheme(&self) -> &SchemeParams {
        &self.scheme
    }

    pub fn pir_params(&self) -> &PirParams {
        &self.pir
    }

    /// Register Galois keys for a client, replacing any earlier set
    ///
    /// The keys are not checked against any secret; wrong keys only show up
    /// as a wrong decode on the client.
    pub fn set_galois_key(&self, client_id: ClientId, keys: GaloisKeys) {
        let elements = keys.len();
        self.keys
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(client_id, Arc::new(keys));
        info!(client_id, elements, "registered galois keys");
    }

    /// Stage raw database bytes for [`PirServer::preprocess_database`]
    ///
    /// # Errors
    ///
    /// `Parameter` if the shape differs from the derived parameters, `Usage`
    /// if the byte count is not `item_count · item_size`.
    pub fn set_database(&mut self, bytes: Vec<u8>, item_count: u64, item_size: usize) -> Result<()> {
        if item_count != self.pir.item_count || item_size != self.pir.item_size {
            return Err(param_err!(
                "database shape {}x{} differs from parameters {}x{}",
                item_count,
                item_size,
                self.pir.item_count,
                self.pir.item_size
            ));
        }
        let expected = item_count as usize * item_size;
        if bytes.len() != expected {
            return Err(usage_err!(
                "database holds {} bytes, expected {}",
                bytes.len(),
                expected
            ));
        }
        self.staged = Some(bytes);
        Ok(())
    }

    /// Encode the staged bytes into the NTT-domain hypercube
    ///
    /// Replaces any previously preprocessed database.
    pub fn preprocess_database(&mut self) -> Result<()> {
        let bytes = self
            .staged
            .take()
            .ok_or_else(|| usage_err!("no database staged; call set_database first"))?;

        let start = Instant::now();
        let encoded = encode_database(&bytes, &self.scheme, &self.pir, &self.ctx)?;
        info!(
            plaintexts = encoded.len(),
            layers = encoded.num_layers(),
            dims = ?self.pir.dims,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "preprocessed database"
        );
        self.db = Some(encoded);
        Ok(())
    }

    /// Whether a preprocessed database is loaded
    pub fn is_ready(&self) -> bool {
        self.db.is_some()
    }

    /// Totals of the metrics sink, if it keeps any
    pub fn timings(&self) -> Option<TimingSnapshot> {
        self.metrics.snapshot()
    }

    /// Answer a query for `client_id`
    ///
    /// Deterministic: the same query and keys give a bit-identical reply.
    ///
    /// # Errors
    ///
    /// - `Usage` before preprocessing or for malformed ciphertexts
    /// - `DimensionMismatch` if the query does not hold d ciphertexts
    /// - `KeyNotFound` if no keys are registered for `client_id`
    pub fn generate_reply(&self, query: &Query, client_id: ClientId) -> Result<Reply> {
        let db = self
            .db
            .as_ref()
            .ok_or_else(|| usage_err!("database not preprocessed"))?;

        let d = self.pir.num_dims();
        if query.ciphertexts.len() != d {
            return Err(PirError::DimensionMismatch {
                expected: d,
                actual: query.ciphertexts.len(),
            });
        }
        for ct in &query.ciphertexts {
            self.check_ciphertext(ct)?;
        }

        let keys = self
            .keys
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&client_id)
            .cloned()
            .ok_or(PirError::KeyNotFound(client_id))?;

        let metrics = self.metrics.as_ref();
        let expanded = timed(metrics, Phase::Expansion, || {
            query
                .ciphertexts
                .iter()
                .zip(self.pir.dims.iter())
                .map(|(ct, &n)| expand_query(ct, n, &keys, &self.ctx))
                .collect::<Result<Vec<_>>>()
        })?;

        let selectors: Vec<Vec<RlweCiphertext>> = timed(metrics, Phase::QueryNtt, || {
            expanded
                .into_iter()
                .map(|dim| {
                    dim.into_par_iter()
                        .map(|mut ct| {
                            ct.to_ntt(&self.ctx);
                            ct
                        })
                        .collect()
                })
                .collect()
        });

        let mut ciphertexts = Vec::with_capacity(self.pir.reply_ciphertexts(&self.scheme));
        for layer in 0..db.num_layers() {
            ciphertexts.extend(respond_layer(
                db.layer(layer),
                &selectors,
                &self.scheme,
                &self.ctx,
                metrics,
            ));
        }

        debug!(client_id, ciphertexts = ciphertexts.len(), "generated reply");
        Ok(Reply::new(ciphertexts))
    }

    fn check_ciphertext(&self, ct: &RlweCiphertext) -> Result<()> {
        if ct.ring_dim() != self.scheme.ring_dim || ct.moduli() != self.ctx.moduli() {
            return Err(usage_err!(
                "query ciphertext does not match ring_dim {} with {} moduli",
                self.scheme.ring_dim,
                self.ctx.crt_count()
            ));
        }
        if ct.is_ntt() {
            return Err(usage_err!("query ciphertext must be in coefficient domain"));
        }
        Ok(())
    }
}
