//! Hypercube PIR: single-server private information retrieval over RLWE
//!
//! A client retrieves one item from a server-held database without the server
//! learning which item. The database is packed into ring plaintexts arranged
//! as a d-dimensional hypercube; the query is d ciphertexts that the server
//! expands obliviously into one-hot selection vectors.
//!
//! Key components:
//! - Parameter derivation with a noise-budget check on the modulus chain
//! - Oblivious query expansion through Galois automorphisms and key switching
//! - Dimension-by-dimension reply folding with ciphertext decomposition
//! - Fixed-size wire format for queries and replies

pub mod ks;
pub mod math;
pub mod params;
pub mod pir;
pub mod rlwe;

pub use pir::{
    deserialize_query, deserialize_reply, serialize_query, serialize_reply, ClientId,
    PhaseTimings, PirClient, PirError, PirServer, Query, Reply, ReplyMetrics, TimingSnapshot,
};

pub use ks::GaloisKeys;
pub use params::{gen_params, PirParams, SchemeParams};
