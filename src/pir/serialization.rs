//! Wire format for queries and replies
//!
//! A ciphertext is `CIPHER_SIZE = 2·k·N·8` bytes: the residues of `a` then
//! of `b`, modulus-major, each a little-endian u64. Queries and replies are
//! plain concatenations. There is no header; both sides must agree on the
//! parameters out of band.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::math::Poly;
use crate::params::SchemeParams;
use crate::rlwe::RlweCiphertext;

use super::error::{usage_err, PirError, Result};
use super::query::Query;
use super::respond::Reply;

/// Write one coefficient-domain ciphertext
pub fn write_ciphertext<W: Write>(writer: &mut W, ct: &RlweCiphertext) -> Result<()> {
    if ct.is_ntt() {
        return Err(usage_err!("only coefficient-domain ciphertexts are serialized"));
    }
    for poly in [&ct.a, &ct.b] {
        for &residue in poly.coeffs() {
            writer.write_u64::<LittleEndian>(residue)?;
        }
    }
    Ok(())
}

/// Read one ciphertext for `scheme`, rejecting unreduced residues
pub fn read_ciphertext<R: Read>(reader: &mut R, scheme: &SchemeParams) -> Result<RlweCiphertext> {
    let n = scheme.ring_dim;
    let read_poly = |reader: &mut R| -> Result<Poly> {
        let mut residues = vec![0u64; n * scheme.moduli.len()];
        reader.read_u64_into::<LittleEndian>(&mut residues)?;
        for (block, &q) in residues.chunks(n).zip(scheme.moduli.iter()) {
            if let Some(&bad) = block.iter().find(|&&r| r >= q) {
                return Err(PirError::Serialization(format!(
                    "residue {} not reduced modulo {}",
                    bad, q
                )));
            }
        }
        Ok(Poly::from_residues(residues, &scheme.moduli))
    };
    let a = read_poly(reader)?;
    let b = read_poly(reader)?;
    Ok(RlweCiphertext::from_parts(a, b))
}

fn write_all(cts: &[RlweCiphertext], cipher_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(cts.len() * cipher_size);
    for ct in cts {
        write_ciphertext(&mut out, ct)?;
    }
    Ok(out)
}

fn read_all(bytes: &[u8], count: usize, scheme: &SchemeParams) -> Result<Vec<RlweCiphertext>> {
    let mut cursor = Cursor::new(bytes);
    (0..count)
        .map(|_| read_ciphertext(&mut cursor, scheme))
        .collect()
}

fn ciphertext_bytes(cts: &[RlweCiphertext]) -> usize {
    cts.first()
        .map(|ct| 2 * ct.moduli().len() * ct.ring_dim() * 8)
        .unwrap_or(0)
}

/// Serialize a query as d concatenated ciphertexts
pub fn serialize_query(query: &Query) -> Result<Vec<u8>> {
    write_all(&query.ciphertexts, ciphertext_bytes(&query.ciphertexts))
}

/// Parse a query of exactly `num_dims` ciphertexts
///
/// # Errors
///
/// `DimensionMismatch` (counted in ciphertexts) if the blob holds other than
/// `num_dims` ciphertexts, `Serialization` for a partial ciphertext or an
/// unreduced residue.
pub fn deserialize_query(bytes: &[u8], num_dims: usize, scheme: &SchemeParams) -> Result<Query> {
    let size = scheme.cipher_size();
    if bytes.len() % size != 0 {
        return Err(PirError::Serialization(format!(
            "query of {} bytes is not a multiple of {}",
            bytes.len(),
            size
        )));
    }
    if bytes.len() / size != num_dims {
        return Err(PirError::DimensionMismatch {
            expected: num_dims,
            actual: bytes.len() / size,
        });
    }
    Ok(Query::new(read_all(bytes, num_dims, scheme)?))
}

/// Serialize a reply as concatenated ciphertexts
pub fn serialize_reply(reply: &Reply) -> Result<Vec<u8>> {
    write_all(&reply.ciphertexts, ciphertext_bytes(&reply.ciphertexts))
}

/// Parse a reply of one or more ciphertexts
///
/// # Errors
///
/// `Serialization` if the length is not a positive multiple of CIPHER_SIZE
/// or a residue is unreduced.
pub fn deserialize_reply(bytes: &[u8], scheme: &SchemeParams) -> Result<Reply> {
    let size = scheme.cipher_size();
    if bytes.is_empty() || bytes.len() % size != 0 {
        return Err(PirError::Serialization(format!(
            "reply of {} bytes is not a positive multiple of {}",
            bytes.len(),
            size
        )));
    }
    Ok(Reply::new(read_all(bytes, bytes.len() / size, scheme)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::GaussianSampler;
    use crate::rlwe::{Plaintext, RlweSecretKey};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn sample_cts(scheme: &SchemeParams, count: usize) -> Vec<RlweCiphertext> {
        let ctx = scheme.ntt_context();
        let sampler = GaussianSampler::default();
        let mut rng = ChaCha20Rng::seed_from_u64(61);
        let sk = RlweSecretKey::generate(&ctx, &sampler, &mut rng);
        (0..count)
            .map(|i| {
                let pt = Plaintext::new(vec![i as u64; scheme.ring_dim]);
                RlweCiphertext::encrypt(&sk, &pt, scheme.delta(), &ctx, &sampler, &mut rng)
            })
            .collect()
    }

    #[test]
    fn test_query_bytes_layout() {
        let scheme = SchemeParams::new(256, 12, 2);
        let query = Query::new(sample_cts(&scheme, 2));
        let bytes = serialize_query(&query).unwrap();
        assert_eq!(bytes.len(), 2 * scheme.cipher_size());
        assert_eq!(scheme.cipher_size(), 8192);

        // First word is a[0] mod Q0, little-endian
        let first = u64::from_le_bytes(bytes[..8].try_into().unwrap());
        assert_eq!(first, query.ciphertexts[0].a.coeffs()[0]);

        let parsed = deserialize_query(&bytes, 2, &scheme).unwrap();
        assert_eq!(parsed, query);
    }

    #[test]
    fn test_query_length_checked() {
        let scheme = SchemeParams::new(256, 12, 2);
        let bytes = serialize_query(&Query::new(sample_cts(&scheme, 2))).unwrap();

        assert!(matches!(
            deserialize_query(&bytes, 3, &scheme),
            Err(PirError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            deserialize_query(&bytes[..scheme.cipher_size()], 2, &scheme),
            Err(PirError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            deserialize_query(&bytes[..bytes.len() - 1], 2, &scheme),
            Err(PirError::Serialization(_))
        ));
    }

    #[test]
    fn test_unreduced_residue_rejected() {
        let scheme = SchemeParams::new(256, 12, 1);
        let mut bytes = serialize_query(&Query::new(sample_cts(&scheme, 1))).unwrap();
        bytes[..8].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            deserialize_query(&bytes, 1, &scheme),
            Err(PirError::Serialization(_))
        ));
    }

    #[test]
    fn test_reply_roundtrip_and_length() {
        let scheme = SchemeParams::new(256, 12, 2);
        let reply = Reply::new(sample_cts(&scheme, 3));
        let bytes = serialize_reply(&reply).unwrap();
        assert_eq!(deserialize_reply(&bytes, &scheme).unwrap(), reply);

        assert!(deserialize_reply(&[], &scheme).is_err());
        assert!(matches!(
            deserialize_reply(&bytes[..100], &scheme),
            Err(PirError::Serialization(_))
        ));
    }

    #[test]
    fn test_ntt_ciphertext_not_serialized() {
        let scheme = SchemeParams::new(256, 12, 2);
        let mut cts = sample_cts(&scheme, 1);
        cts[0].to_ntt(&scheme.ntt_context());
        assert!(matches!(
            serialize_reply(&Reply::new(cts)),
            Err(PirError::Usage(_))
        ));
    }
}
