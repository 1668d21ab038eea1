pub mod field;

use field::{BLOCK_SIZE, FieldElement};

/// GHASH universal hash over GF(2¹²⁸), keyed by the hash subkey H.
///
/// The accumulator folds blocks by Horner's rule, y = (y ⊕ block)·H. It holds
/// only the transient running state for one computation; `reset` reuses the
/// same subkey for the next one.
#[derive(Clone)]
pub struct Ghash {
    h: FieldElement,
    y: FieldElement,
}

impl Ghash {
    pub fn new(key: &[u8; BLOCK_SIZE]) -> Self {
        Ghash {
            h: FieldElement::from_block(key),
            y: FieldElement::default(),
        }
    }

    pub fn reset(&mut self) {
        self.y = FieldElement::default();
    }

    // hash data, padding with 0 if data is not of length of multiple of 16.
    // Each call closes its own stream: the zero padding is applied to this
    // call's tail, as required for the AAD/ciphertext framing.
    pub fn update(&mut self, data: &[u8]) {
        let mut y = self.y;
        let full_blocks = (data.len() >> 4) << 4;

        self.update_blocks(&mut y, &data[..full_blocks]);

        if data.len() != full_blocks {
            let mut partial_block = [0u8; BLOCK_SIZE];
            partial_block[..data.len() - full_blocks]
                .copy_from_slice(&data[full_blocks..]);
            self.update_blocks(&mut y, &partial_block);
        }
        self.y = y;
    }

    // Fold the final length block, a || b as two big-endian u64 bit counts.
    pub fn update_u64x2(&mut self, a: u64, b: u64) {
        let mut y = self.y;

        *y.low() ^= a;
        *y.high() ^= b;

        y = field::mul(y, self.h);
        self.y = y;
    }

    pub fn sum(&self, out: &mut [u8; BLOCK_SIZE]) {
        out.copy_from_slice(&self.y.block());
    }

    // updateBlocks extends y with more polynomial terms from blocks, based on
    // Horner's rule. There must be a multiple of BLOCK_SIZE bytes in blocks.
    fn update_blocks(&self, y: &mut FieldElement, blocks: &[u8]) {
        for block in blocks.chunks_exact(BLOCK_SIZE) {
            *y += FieldElement::from_block(block.try_into().unwrap());
            *y = field::mul(*y, self.h);
        }
    }
}

/// ghash computes GHASH(H, aad, ciphertext) into tag: the AAD blocks, then
/// the ciphertext blocks (each stream's partial tail zero-padded), then the
/// 64+64-bit big-endian bit-length block. `None` aad is equivalent to
/// `Some(&[])`. Deterministic in (key, aad, ciphertext); only total bytes
/// matter, not how the caller assembled them.
pub fn ghash(
    tag: &mut [u8; BLOCK_SIZE],
    key: &[u8; BLOCK_SIZE],
    aad: Option<&[u8]>,
    ciphertext: &[u8],
) {
    let mut g = Ghash::new(key);
    let mut a = 0;
    if let Some(aad) = aad {
        g.update(aad);
        a = aad.len() as u64 * 8;
    }

    g.update(ciphertext);
    g.update_u64x2(a, ciphertext.len() as u64 * 8);
    g.sum(tag);
}
