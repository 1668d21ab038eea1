//! Tag-collision constructions against the GXM composition.
//!
//! GHASH evaluates a polynomial in the subkey H, so block-level XOR offsets
//! (deltas) with the right algebraic relations move a ciphertext to another
//! one with the same hash, or shift the hash by a chosen amount. Everything
//! here is linear algebra over GF(2¹²⁸); there is no searching.

use crate::ghash::field::{self, BLOCK_SIZE, FieldElement};
use crate::ghash::ghash;
use alloc::vec::Vec;
use rand::RngCore;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("block layouts differ, want {} bytes, got {}", .0, .1)]
    LayoutMismatch(usize, usize),

    #[error("delta chain only cancels over an even number of blocks, got {}", .0)]
    OddBlockCount(usize),

    #[error("layout must contain at least one block")]
    EmptyLayout,

    #[error("seed delta must be non-zero")]
    ZeroSeed,

    #[error("ciphertext length ({}) is not a positive multiple of the block size", .0)]
    PartialBlock(usize),

    #[error("hash subkey is zero, no delta relation exists")]
    ZeroSubkey,
}
pub type Result<T> = core::result::Result<T, Error>;

/// An ordered sequence of XOR offsets, one per ciphertext block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaSet(Vec<FieldElement>);

impl DeltaSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn deltas(&self) -> &[FieldElement] {
        &self.0
    }

    /// XOR each delta into the matching ciphertext block. The ciphertext
    /// must cover exactly `len()` full blocks; the collision relations do
    /// not survive any length change, so a mismatch is an error, never a
    /// truncation.
    pub fn apply(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let want = self.0.len() * BLOCK_SIZE;
        if ciphertext.len() != want {
            return Err(Error::LayoutMismatch(want, ciphertext.len()));
        }
        let mut out = Vec::with_capacity(want);
        for (block, delta) in ciphertext.chunks_exact(BLOCK_SIZE).zip(&self.0) {
            let block: &[u8; BLOCK_SIZE] = block.try_into().unwrap();
            out.extend_from_slice(&field::xor_block(block, &delta.block()));
        }
        Ok(out)
    }
}

/// Deltas that leave GHASH(H, aad, ·) unchanged for any fixed aad:
/// Δ₁ = 0x00…01 and Δᵢ = Δᵢ₋₁·H.
///
/// In the Horner evaluation the i-th of n ciphertext blocks carries weight
/// H^(n+2-i), so the chain contributes Σᵢ Δ₁·H^(n+1) = n·Δ₁·H^(n+1), which
/// vanishes over GF(2) exactly when n is even. Odd layouts are rejected
/// rather than returning a set that does not collide.
pub fn length_preserving_deltas(
    subkey: &[u8; BLOCK_SIZE],
    block_count: usize,
) -> Result<DeltaSet> {
    let mut seed = [0u8; BLOCK_SIZE];
    seed[BLOCK_SIZE - 1] = 1;
    length_preserving_deltas_with_seed(subkey, &seed, block_count)
}

/// Same chain from a caller-chosen non-zero seed delta.
pub fn length_preserving_deltas_with_seed(
    subkey: &[u8; BLOCK_SIZE],
    seed: &[u8; BLOCK_SIZE],
    block_count: usize,
) -> Result<DeltaSet> {
    let seed = FieldElement::from_block(seed);
    if seed.is_zero() {
        return Err(Error::ZeroSeed);
    }
    if block_count == 0 {
        return Err(Error::EmptyLayout);
    }
    if block_count % 2 != 0 {
        return Err(Error::OddBlockCount(block_count));
    }

    let h = FieldElement::from_block(subkey);
    let mut deltas = Vec::with_capacity(block_count);
    deltas.push(seed);
    for i in 1..block_count {
        deltas.push(field::mul(deltas[i - 1], h));
    }
    Ok(DeltaSet(deltas))
}

/// Chain seeded from rng. Retries until the seed is non-zero.
pub fn random_deltas<T: RngCore>(
    subkey: &[u8; BLOCK_SIZE],
    block_count: usize,
    rng: &mut T,
) -> Result<DeltaSet> {
    let mut seed = [0u8; BLOCK_SIZE];
    while FieldElement::from_block(&seed).is_zero() {
        rng.fill_bytes(&mut seed);
    }
    length_preserving_deltas_with_seed(subkey, &seed, block_count)
}

/// Deltas that shift GHASH(H, aad, ·) by exactly z0a ⊕ z0b, with all block
/// and aad lengths unchanged: a single offset on the final ciphertext block.
///
/// The final block carries Horner weight H² (one fold for the block itself,
/// one for the length block), so Δₙ = (z0a ⊕ z0b)·H⁻². With it,
///
///	tag_a(C)  = Z0a ⊕ GHASH(H, aad, C)
///	tag_b(C') = Z0b ⊕ GHASH(H, aad, C) ⊕ Z0a ⊕ Z0b = tag_a(C),
///
/// so the two contexts emit the same tag value for C and C' = C ⊕ Δ.
pub fn cross_key_deltas(
    subkey: &[u8; BLOCK_SIZE],
    z0a: &[u8; BLOCK_SIZE],
    z0b: &[u8; BLOCK_SIZE],
    block_count: usize,
) -> Result<DeltaSet> {
    if block_count == 0 {
        return Err(Error::EmptyLayout);
    }
    let h = FieldElement::from_block(subkey);
    if h.is_zero() {
        return Err(Error::ZeroSubkey);
    }

    let diff = FieldElement::from_block(&field::xor_block(z0a, z0b));
    let h2_inv = field::invert(field::mul(h, h));

    let mut deltas = vec![FieldElement::default(); block_count];
    deltas[block_count - 1] = field::mul(diff, h2_inv);
    Ok(DeltaSet(deltas))
}

/// Convenience wrapper: returns the original ciphertext alongside its forged
/// sibling. The ciphertext must be a positive multiple of 16 bytes; the zero
/// padding of a partial final block is never transmitted, so no delta can
/// land there.
pub fn cross_key_collision(
    subkey: &[u8; BLOCK_SIZE],
    z0a: &[u8; BLOCK_SIZE],
    z0b: &[u8; BLOCK_SIZE],
    ciphertext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(Error::PartialBlock(ciphertext.len()));
    }
    let deltas =
        cross_key_deltas(subkey, z0a, z0b, ciphertext.len() / BLOCK_SIZE)?;
    let forged = deltas.apply(ciphertext)?;
    Ok((ciphertext.to_vec(), forged))
}

/// One ciphertext, two decryptions: the transcript pair produced by
/// [`commitment_break`].
pub struct CommitmentBreak {
    /// The shared ciphertext C = P₁ ⊕ Z1a.
    pub ciphertext: Vec<u8>,
    /// Context A's valid tag, Z0a ⊕ GHASH(H, aad, C).
    pub tag_a: [u8; BLOCK_SIZE],
    /// Context B's valid tag, Z0b ⊕ GHASH(H, aad, C).
    pub tag_b: [u8; BLOCK_SIZE],
    /// What context B decrypts C to: P₂ = P₁ ⊕ Z1a ⊕ Z1b.
    pub plaintext_b: Vec<u8>,
}

/// Builds a single ciphertext that authenticates under two distinct
/// (key, nonce) contexts sharing the subkey H, decrypting to a different
/// plaintext under each. `stream_a` and `stream_b` are the full Z0 || Z1
/// keystreams of the two contexts and must be exactly `plaintext.len() + 16`
/// bytes. The two tags differ by Z0a ⊕ Z0b and coincide when the first
/// keystream blocks collide.
pub fn commitment_break(
    subkey: &[u8; BLOCK_SIZE],
    stream_a: &[u8],
    stream_b: &[u8],
    plaintext: &[u8],
    aad: Option<&[u8]>,
) -> Result<CommitmentBreak> {
    let want = plaintext.len() + BLOCK_SIZE;
    if stream_a.len() != want {
        return Err(Error::LayoutMismatch(want, stream_a.len()));
    }
    if stream_b.len() != want {
        return Err(Error::LayoutMismatch(want, stream_b.len()));
    }

    let (z0a, z1a) = stream_a.split_at(BLOCK_SIZE);
    let (z0b, z1b) = stream_b.split_at(BLOCK_SIZE);

    let ciphertext: Vec<u8> =
        plaintext.iter().zip(z1a).map(|(x, y)| x ^ y).collect();
    let plaintext_b: Vec<u8> =
        ciphertext.iter().zip(z1b).map(|(x, y)| x ^ y).collect();

    let mut y = [0u8; BLOCK_SIZE];
    ghash(&mut y, subkey, aad, &ciphertext);

    let mut tag_a = y;
    tag_a.iter_mut().zip(z0a).for_each(|(t, z)| *t ^= *z);
    let mut tag_b = y;
    tag_b.iter_mut().zip(z0b).for_each(|(t, z)| *t ^= *z);

    Ok(CommitmentBreak {
        ciphertext,
        tag_a,
        tag_b,
        plaintext_b,
    })
}
