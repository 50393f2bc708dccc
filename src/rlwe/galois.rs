//! Galois automorphisms for RLWE
//!
//! Galois automorphisms τ_g: R → R are ring automorphisms defined by
//! τ_g(X) = X^g for odd g ∈ Z_{2d}^*. Oblivious query expansion uses the
//! elements g = d/2^l + 1, one per expansion level l.

use crate::math::Poly;

use super::types::RlweCiphertext;

/// Apply Galois automorphism τ_g to a coefficient-domain polynomial
///
/// τ_g(p(X)) = p(X^g) mod (X^d + 1). X^i maps to X^(g·i mod 2d), with a sign
/// flip when the exponent lands in [d, 2d).
pub fn apply_automorphism(poly: &Poly, g: usize) -> Poly {
    assert!(!poly.is_ntt(), "Automorphism requires coefficient domain");
    let d = poly.dimension();
    let two_d = 2 * d;

    let mut result = vec![0u64; poly.coeffs().len()];

    for (idx, &q) in poly.moduli().iter().enumerate() {
        let src = poly.residue(idx);
        let dst = &mut result[idx * d..(idx + 1) * d];
        for (i, &coeff) in src.iter().enumerate() {
            let new_idx = (g * i) % two_d;
            if new_idx < d {
                dst[new_idx] = coeff;
            } else {
                // X^(d+k) = -X^k in the ring X^d + 1
                dst[new_idx - d] = if coeff == 0 { 0 } else { q - coeff };
            }
        }
    }

    Poly::from_residues(result, poly.moduli())
}

/// Apply automorphism to RLWE ciphertext
///
/// τ_g((a, b)) = (τ_g(a), τ_g(b)). The result is encrypted under τ_g(s);
/// key-switching brings it back under s.
pub fn automorphism_ciphertext(ct: &RlweCiphertext, g: usize) -> RlweCiphertext {
    RlweCiphertext {
        a: apply_automorphism(&ct.a, g),
        b: apply_automorphism(&ct.b, g),
    }
}

/// Galois element used at expansion level `level`: d/2^level + 1
pub fn expansion_element(d: usize, level: u32) -> usize {
    (d >> level) + 1
}

/// Galois elements for expansion levels 0..levels
pub fn expansion_elements(d: usize, levels: u32) -> Vec<usize> {
    (0..levels).map(|l| expansion_element(d, l)).collect()
}

/// Check if g is a valid Galois element (odd and below 2d)
pub fn is_valid_galois_element(g: usize, d: usize) -> bool {
    g % 2 == 1 && g < 2 * d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::mod_q::{Q0, Q1};

    const MODULI: [u64; 2] = [Q0, Q1];

    #[test]
    fn test_automorphism_identity() {
        let d = 256;
        let coeffs: Vec<u64> = (0..d as u64).collect();
        let poly = Poly::from_coeffs(&coeffs, &MODULI);

        assert_eq!(apply_automorphism(&poly, 1), poly);
    }

    #[test]
    fn test_automorphism_composition() {
        let d = 256;
        let coeffs: Vec<u64> = (0..d as u64).map(|i| (i * 17 + 5) % 4096).collect();
        let poly = Poly::from_coeffs(&coeffs, &MODULI);

        let (g1, g2) = (expansion_element(d, 0), expansion_element(d, 3));
        let composed = apply_automorphism(&apply_automorphism(&poly, g1), g2);
        let direct = apply_automorphism(&poly, (g1 * g2) % (2 * d));

        assert_eq!(composed, direct);
    }

    #[test]
    fn test_first_level_element_flips_odd_coefficients() {
        // τ_{d+1}(X^i) = (-1)^i X^i
        let d = 256;
        let coeffs = vec![1u64; d];
        let poly = Poly::from_coeffs(&coeffs, &MODULI);

        let result = apply_automorphism(&poly, expansion_element(d, 0));
        for i in 0..d {
            let expected = if i % 2 == 0 { 1 } else { Q0 - 1 };
            assert_eq!(result.residue(0)[i], expected, "coefficient {}", i);
        }
    }

    #[test]
    fn test_negation_automorphism() {
        // τ_{2d-1}(X) = X^{-1} = -X^{d-1}
        let d = 256;
        let mut coeffs = vec![0u64; d];
        coeffs[1] = 1;
        let poly = Poly::from_coeffs(&coeffs, &MODULI);

        let result = apply_automorphism(&poly, 2 * d - 1);
        assert_eq!(result.residue(0)[d - 1], Q0 - 1);
        assert_eq!(result.residue(1)[d - 1], Q1 - 1);
        assert_eq!(result.residue(0).iter().filter(|&&c| c != 0).count(), 1);
    }

    #[test]
    fn test_expansion_elements() {
        assert_eq!(expansion_elements(4096, 3), vec![4097, 2049, 1025]);
        for g in expansion_elements(4096, 12) {
            assert!(is_valid_galois_element(g, 4096));
        }
        assert!(!is_valid_galois_element(2, 4096));
        assert!(!is_valid_galois_element(8193, 4096));
    }

    #[test]
    fn test_automorphism_ciphertext_is_componentwise() {
        let d = 256;
        let a = Poly::from_coeffs(&(0..d as u64).map(|i| i * 3).collect::<Vec<_>>(), &MODULI);
        let b = Poly::from_coeffs(&(0..d as u64).map(|i| i * 7 + 1).collect::<Vec<_>>(), &MODULI);
        let ct = RlweCiphertext::from_parts(a.clone(), b.clone());

        let g = expansion_element(d, 2);
        let ct_auto = automorphism_ciphertext(&ct, g);
        assert_eq!(ct_auto.a, apply_automorphism(&a, g));
        assert_eq!(ct_auto.b, apply_automorphism(&b, g));
    }
}
