//! PIR query message
//!
//! One compressed selector ciphertext per hypercube dimension. The dimension-i
//! ciphertext encrypts Δ·2^(-L_i) at coefficient c_i, where c_i is the
//! requested coordinate and L_i = ⌈log2 n_i⌉.

use serde::{Deserialize, Serialize};

use crate::rlwe::RlweCiphertext;

/// Query sent from client to server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// d coefficient-domain ciphertexts, dimension 0 first
    pub ciphertexts: Vec<RlweCiphertext>,
}

impl Query {
    pub fn new(ciphertexts: Vec<RlweCiphertext>) -> Self {
        Self { ciphertexts }
    }

    /// Number of dimensions the query addresses
    pub fn num_dims(&self) -> usize {
        self.ciphertexts.len()
    }
}
