//! Per-phase reply timing
//!
//! Reply generation reports how long each phase took through a
//! [`ReplyMetrics`] sink. The counters are cumulative across replies and
//! never feed back into the computation.
//!
//! Multiply and add run inside the parallel row loop, so their durations are
//! summed over worker threads (CPU time). The other phases are wall-clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// A timed phase of reply generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Oblivious expansion of the query ciphertexts
    Expansion,
    /// Forward NTT of the expanded selection vectors
    QueryNtt,
    /// Ciphertext × plaintext products
    Multiply,
    /// Accumulation of the products
    Add,
    /// Decomposing intermediate ciphertexts into plaintexts
    InterDbConstruction,
    /// Forward NTT of the intermediate plaintexts
    InterDbNtt,
    /// Inverse NTT of fold outputs
    InverseNtt,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Expansion,
        Phase::QueryNtt,
        Phase::Multiply,
        Phase::Add,
        Phase::InterDbConstruction,
        Phase::InterDbNtt,
        Phase::InverseNtt,
    ];

    /// Counter name used in reports
    pub fn name(self) -> &'static str {
        match self {
            Phase::Expansion => "expansion",
            Phase::QueryNtt => "query_ntt",
            Phase::Multiply => "multiply",
            Phase::Add => "add",
            Phase::InterDbConstruction => "inter_db_construction",
            Phase::InterDbNtt => "inter_db_ntt",
            Phase::InverseNtt => "inverse_ntt",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Sink for phase durations
pub trait ReplyMetrics: Send + Sync {
    fn record(&self, phase: Phase, elapsed: Duration);

    /// Current totals, for sinks that keep them
    fn snapshot(&self) -> Option<TimingSnapshot> {
        None
    }
}

/// Run `f`, record its wall-clock time under `phase`
pub(crate) fn timed<T>(metrics: &dyn ReplyMetrics, phase: Phase, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    metrics.record(phase, start.elapsed());
    out
}

/// Discards every measurement
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl ReplyMetrics for NoopMetrics {
    fn record(&self, _phase: Phase, _elapsed: Duration) {}
}

/// Cumulative microsecond counters, one per phase
#[derive(Debug, Default)]
pub struct PhaseTimings {
    micros: [AtomicU64; 7],
}

impl PhaseTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated time for one phase
    pub fn get(&self, phase: Phase) -> Duration {
        Duration::from_micros(self.micros[phase.slot()].load(Ordering::Relaxed))
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in &self.micros {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> TimingSnapshot {
        let us = |phase: Phase| self.micros[phase.slot()].load(Ordering::Relaxed);
        TimingSnapshot {
            expansion_us: us(Phase::Expansion),
            query_ntt_us: us(Phase::QueryNtt),
            multiply_us: us(Phase::Multiply),
            add_us: us(Phase::Add),
            inter_db_construction_us: us(Phase::InterDbConstruction),
            inter_db_ntt_us: us(Phase::InterDbNtt),
            inverse_ntt_us: us(Phase::InverseNtt),
        }
    }
}

impl ReplyMetrics for PhaseTimings {
    fn record(&self, phase: Phase, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.micros[phase.slot()].fetch_add(us, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Option<TimingSnapshot> {
        Some(PhaseTimings::snapshot(self))
    }
}

/// Serializable copy of [`PhaseTimings`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSnapshot {
    pub expansion_us: u64,
    pub query_ntt_us: u64,
    pub multiply_us: u64,
    pub add_us: u64,
    pub inter_db_construction_us: u64,
    pub inter_db_ntt_us: u64,
    pub inverse_ntt_us: u64,
}

impl TimingSnapshot {
    /// Sum of components
    pub fn total_us(&self) -> u64 {
        self.expansion_us
            + self.query_ntt_us
            + self.multiply_us
            + self.add_us
            + self.inter_db_construction_us
            + self.inter_db_ntt_us
            + self.inverse_ntt_us
    }

    /// (name, microseconds) pairs in phase order
    pub fn entries(&self) -> [(&'static str, u64); 7] {
        [
            (Phase::Expansion.name(), self.expansion_us),
            (Phase::QueryNtt.name(), self.query_ntt_us),
            (Phase::Multiply.name(), self.multiply_us),
            (Phase::Add.name(), self.add_us),
            (Phase::InterDbConstruction.name(), self.inter_db_construction_us),
            (Phase::InterDbNtt.name(), self.inter_db_ntt_us),
            (Phase::InverseNtt.name(), self.inverse_ntt_us),
        ]
    }
}
