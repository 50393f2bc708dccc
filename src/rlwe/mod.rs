//! RLWE (Ring Learning With Errors) encryption module
//!
//! This module implements symmetric BFV-style RLWE encryption over the ring
//! R_q = Z_q[X]/(X^d + 1):
//! - Secret key s is a polynomial sampled from the error distribution
//! - Ciphertext (a, b) encrypts message m as b = -a·s + e + Δ·m
//! - Δ = ⌊q/t⌋ is the scaling factor
//!
//! # Galois Automorphisms
//!
//! Automorphisms τ_g: R → R defined by τ_g(X) = X^g drive oblivious query
//! expansion on the server.
//!
//! # Example
//!
//! ```
//! use hypercube_pir::math::GaussianSampler;
//! use hypercube_pir::params::SchemeParams;
//! use hypercube_pir::rlwe::{Plaintext, RlweCiphertext, RlweSecretKey};
//!
//! let scheme = SchemeParams::new(256, 12, 2);
//! let ctx = scheme.ntt_context();
//! let sampler = GaussianSampler::default();
//! let mut rng = rand::thread_rng();
//!
//! let sk = RlweSecretKey::generate(&ctx, &sampler, &mut rng);
//! let message = Plaintext::new(vec![7; 256]);
//! let ct = RlweCiphertext::encrypt(&sk, &message, scheme.delta(), &ctx, &sampler, &mut rng);
//!
//! let decrypted = ct.decrypt(&sk, scheme.delta(), scheme.plain_modulus(), &ctx);
//! assert_eq!(decrypted, message);
//! ```

mod enc;
mod galois;
mod types;

pub use galois::{
    apply_automorphism, automorphism_ciphertext, expansion_element, expansion_elements,
    is_valid_galois_element,
};
pub use types::{Plaintext, RlweCiphertext, RlweSecretKey};
