//! Hypercube PIR protocol
//!
//! Single-server PIR with compressed queries: the database is a d-dimensional
//! hypercube of plaintexts, the query is one compressed ciphertext per
//! dimension, and the server folds the hypercube one dimension at a time.
//!
//! # Protocol Overview
//!
//! 1. **Setup**: derive parameters, encode and NTT the database
//! 2. **Keys**: client sends Galois keys once, registered under a client id
//! 3. **Query**: per dimension, an encryption of Δ·2^(-L)·X^(c_i)
//! 4. **Reply**: server expands each query ciphertext into a one-hot vector
//!    and folds the hypercube against it
//! 5. **Decode**: client decrypts, recomposes between rounds, unpacks bytes
//!
//! # Example
//!
//! ```
//! use hypercube_pir::params::gen_params;
//! use hypercube_pir::pir::{PirClient, PirServer};
//!
//! let (scheme, pir) = gen_params(16, 64, 256, 12, 1)?;
//! let db: Vec<u8> = (0..16 * 64).map(|i| i as u8).collect();
//!
//! let mut server = PirServer::new(scheme.clone(), pir.clone())?;
//! server.set_database(db.clone(), 16, 64)?;
//! server.preprocess_database()?;
//!
//! let mut client = PirClient::new(scheme, pir)?;
//! server.set_galois_key(0, client.generate_galois_keys());
//!
//! let index = 9;
//! let query = client.generate_query(client.get_fv_index(index, 64)?)?;
//! let reply = server.generate_reply(&query, 0)?;
//! assert_eq!(client.decode_item(&reply, index)?, db[9 * 64..10 * 64].to_vec());
//! # Ok::<(), hypercube_pir::pir::PirError>(())
//! ```

mod client;
mod decompose;
mod encode_db;
pub mod error;
mod expand;
pub mod metrics;
mod query;
mod respond;
mod serialization;
mod server;

pub use client::PirClient;
pub use decompose::{decompose_ciphertext, recompose_ciphertext};
pub use encode_db::{bytes_to_coeffs, coeffs_to_bytes, encode_database, EncodedDatabase};
pub use error::{ClientId, PirError, Result};
pub use expand::{expand_query, query_scalar};
pub use metrics::{NoopMetrics, Phase, PhaseTimings, ReplyMetrics, TimingSnapshot};
pub use query::Query;
pub use respond::{respond_layer, Reply};
pub use serialization::{
    deserialize_query, deserialize_reply, read_ciphertext, serialize_query, serialize_reply,
    write_ciphertext,
};
pub use server::PirServer;
