//! Database encoding for PIR
//!
//! Raw item bytes are packed into plaintext units of C = N·logt/8 bytes and
//! laid out on the hypercube.
//!
//! # Bit packing
//!
//! The bytes of a unit are read as one MSB-first bit string and every ring
//! coefficient takes the next logt bits:
//!
//! ```text
//! bytes:   b0 b1 b2 ...        (8 bits each)
//! coeffs:  c0 c1 c2 ...        (logt bits each, c0 = top logt bits of b0 b1 ...)
//! ```
//!
//! A trailing partial coefficient is zero-padded in its low bits, so
//! [`coeffs_to_bytes`] recovers the input exactly.
//!
//! # Layers
//!
//! An item larger than C spans R = ⌈item_size / C⌉ layers. Layer j of every
//! unit holds bytes [j·C, (j+1)·C) of its items, so the same hypercube
//! coordinate addresses an item in every layer.

use rayon::prelude::*;
use tracing::debug;

use crate::math::{NttContext, Poly};
use crate::params::{PirParams, SchemeParams};

use super::error::{usage_err, Result};

/// Pack bytes into `n` coefficients of `logt` bits each, MSB-first
///
/// Input beyond n·logt bits is ignored; missing input is zero.
pub fn bytes_to_coeffs(bytes: &[u8], logt: u32, n: usize) -> Vec<u64> {
    let mask = (1u64 << logt) - 1;
    let mut coeffs = Vec::with_capacity(n);
    let mut acc = 0u64;
    let mut bits = 0u32;

    for &byte in bytes {
        acc = (acc << 8) | byte as u64;
        bits += 8;
        while bits >= logt {
            bits -= logt;
            coeffs.push((acc >> bits) & mask);
            if coeffs.len() == n {
                return coeffs;
            }
        }
        acc &= (1u64 << bits) - 1;
    }

    if bits > 0 && coeffs.len() < n {
        coeffs.push((acc << (logt - bits)) & mask);
    }
    coeffs.resize(n, 0);
    coeffs
}

/// Unpack `num_bytes` bytes from `logt`-bit coefficients, MSB-first
///
/// Inverse of [`bytes_to_coeffs`]. Coefficients are masked to logt bits.
pub fn coeffs_to_bytes(coeffs: &[u64], logt: u32, num_bytes: usize) -> Vec<u8> {
    let mask = (1u64 << logt) - 1;
    let mut out = Vec::with_capacity(num_bytes);
    let mut acc = 0u64;
    let mut bits = 0u32;

    for &c in coeffs {
        acc = (acc << logt) | (c & mask);
        bits += logt;
        while bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
            if out.len() == num_bytes {
                return out;
            }
        }
        acc &= (1u64 << bits) - 1;
    }

    out.resize(num_bytes, 0);
    out
}

/// Byte range of an item that layer `layer` carries
pub fn layer_range(item_size: usize, capacity: usize, layer: usize) -> std::ops::Range<usize> {
    let start = (layer * capacity).min(item_size);
    let end = ((layer + 1) * capacity).min(item_size);
    start..end
}

/// Raw bytes of plaintext unit `unit` in layer `layer`
///
/// Concatenates the layer slice of each item the unit holds. Units past the
/// last item are empty.
pub fn unit_bytes(
    db: &[u8],
    scheme: &SchemeParams,
    pir: &PirParams,
    layer: usize,
    unit: u64,
) -> Vec<u8> {
    let range = layer_range(pir.item_size, scheme.plaintext_bytes(), layer);
    let first = unit * pir.elements_per_plaintext;
    let last = (first + pir.elements_per_plaintext).min(pir.item_count);

    let mut out = Vec::with_capacity(range.len() * (last.saturating_sub(first)) as usize);
    for item in first..last {
        let base = item as usize * pir.item_size;
        out.extend_from_slice(&db[base + range.start..base + range.end]);
    }
    out
}

/// The database as R·V NTT-domain plaintexts, layer-major
///
/// Immutable once built; a reload builds a new one.
#[derive(Debug, Clone)]
pub struct EncodedDatabase {
    layers: usize,
    volume: usize,
    plaintexts: Vec<Poly>,
}

impl EncodedDatabase {
    /// Number of layers R
    pub fn num_layers(&self) -> usize {
        self.layers
    }

    /// Plaintexts per layer V (hypercube volume including padding)
    pub fn volume(&self) -> usize {
        self.volume
    }

    /// All plaintexts of layer `j`, in hypercube order
    pub fn layer(&self, j: usize) -> &[Poly] {
        &self.plaintexts[j * self.volume..(j + 1) * self.volume]
    }

    /// Total plaintexts R·V
    pub fn len(&self) -> usize {
        self.plaintexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plaintexts.is_empty()
    }
}

/// Encode `item_count · item_size` bytes into the hypercube
///
/// Units are packed and transformed in parallel. Padding units are zero.
pub fn encode_database(
    db: &[u8],
    scheme: &SchemeParams,
    pir: &PirParams,
    ctx: &NttContext,
) -> Result<EncodedDatabase> {
    let expected = pir.item_count as usize * pir.item_size;
    if db.len() != expected {
        return Err(usage_err!(
            "database holds {} bytes, expected {} items of {} bytes",
            db.len(),
            pir.item_count,
            pir.item_size
        ));
    }

    let layers = pir.expansion_ratio;
    let volume = pir.volume() as usize;
    let n = scheme.ring_dim;

    let plaintexts: Vec<Poly> = (0..layers * volume)
        .into_par_iter()
        .map(|idx| {
            let (layer, unit) = (idx / volume, (idx % volume) as u64);
            let mut poly = if unit < pir.num_plaintexts {
                let bytes = unit_bytes(db, scheme, pir, layer, unit);
                Poly::from_coeffs(&bytes_to_coeffs(&bytes, scheme.logt, n), ctx.moduli())
            } else {
                Poly::zero(n, ctx.moduli())
            };
            poly.to_ntt(ctx);
            poly
        })
        .collect();

    debug!(
        layers,
        volume,
        real_units = pir.num_plaintexts,
        "encoded database"
    );

    Ok(EncodedDatabase {
        layers,
        volume,
        plaintexts,
    })
}
