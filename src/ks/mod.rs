//! Key-switching module
//!
//! Key-switching transforms a ciphertext valid under secret key s into one
//! valid under secret key s'. After a Galois automorphism τ_g the ciphertext
//! sits under τ_g(s); switching brings it back under s so expansion can keep
//! going.
//!
//! # Key-Switching Matrix
//!
//! A key-switching matrix K from s to s' consists of ℓ RLWE ciphertexts:
//! ```text
//! K = [RLWE_{s'}(s·z^0), RLWE_{s'}(s·z^1), ..., RLWE_{s'}(s·z^(ℓ-1))]
//! ```
//!
//! # Algorithm
//!
//! To switch (a, b) from key s to key s':
//! 1. Decompose a using gadget: g⁻¹(a) = [a₀, a₁, ..., a_{ℓ-1}]
//! 2. Compute: (a', b') = (0, b) + Σᵢ aᵢ · K[i]

mod gadget;
mod galois_keys;
mod setup;
mod switch;

pub use gadget::{gadget_decompose, GadgetVector};
pub use galois_keys::GaloisKeys;
pub use setup::{generate_automorphism_ks_matrix, generate_ks_matrix, KeySwitchingMatrix};
pub use switch::key_switch;
