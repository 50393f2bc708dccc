//! Mathematical primitives.
//!
//! - **Modular arithmetic** over word-sized primes and their u128 product
//! - **CRT / RNS** composition for a one- or two-prime modulus chain
//! - **Number-Theoretic Transform (NTT)** for fast polynomial multiplication
//! - **Polynomial operations** over R_q = Z_q[X]/(X^d + 1)
//! - **Discrete Gaussian sampling** for error terms
//!
//! # Example
//!
//! ```
//! use hypercube_pir::math::{NttContext, Poly};
//! use hypercube_pir::math::mod_q::COEFF_MODULI;
//!
//! let ctx = NttContext::with_moduli(256, &COEFF_MODULI);
//! let mut poly = Poly::random_with_rng(256, ctx.moduli(), &mut rand::thread_rng());
//! poly.to_ntt(&ctx);
//! ```

pub mod crt;
pub mod mod_q;
pub mod modular;
pub mod ntt;
pub mod poly;
pub mod sampling;

pub use crt::{crt_compose_2, mod_inverse, RnsBasis};
pub use mod_q::COEFF_MODULI;
pub use modular::ModQ;
pub use ntt::NttContext;
pub use poly::Poly;
pub use sampling::GaussianSampler;
