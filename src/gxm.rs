use crate::ghash::ghash;
use crate::traits::{Aead, Keystream};
use alloc::vec::Vec;
use subtle::ConstantTimeEq;

pub const BLOCK_SIZE: usize = 16;
pub const TAG_SIZE: usize = 16;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid nonce size, want {}, got {}", .0, .1)]
    InvalidNonceSize(usize, usize),

    #[error("GXM authentication failed while decrypting")]
    AuthenticationError,

    #[error("keystream provider returned {} of {} requested bytes", .1, .0)]
    KeystreamShort(usize, usize),

    #[error("output too small, want: {}, got: {}", .0, .1)]
    OutputTooSmall(usize, usize),

    #[error("ciphertext's length ({}) is shorter than tag size ({})", .0, .1)]
    CiphertextTooSmall(usize, usize),
}
pub type Result<T> = core::result::Result<T, Error>;

/// GXM composes a keystream cipher with GHASH: the first keystream block Z0
/// masks the hash, the rest encrypts. For a message of n bytes the engine
/// requests n + 16 keystream bytes in a single derivation,
///
///	ciphertext = plaintext ⊕ Z1,
///	tag        = Z0 ⊕ GHASH(H, aad, ciphertext).
///
/// The hash subkey H is fixed for the lifetime of the instance.
pub struct Gxm<K: Keystream> {
    pub cipher: K,
    subkey: [u8; BLOCK_SIZE],
}

impl<K: Keystream> Gxm<K> {
    /// Returns a GXM instance with a caller-supplied hash subkey.
    pub fn new(cipher: K, subkey: [u8; BLOCK_SIZE]) -> Self {
        Gxm { cipher, subkey }
    }

    /// Returns a GXM instance with the hash subkey taken from the first
    /// keystream block under an all-zero nonce, h = KS_K(0)[..16].
    pub fn new_derived(cipher: K) -> Result<Self> {
        let nonce = vec![0u8; cipher.nonce_size()];
        let mut subkey = [0u8; BLOCK_SIZE];
        let n = cipher.fill(&nonce, &mut subkey);
        if n != BLOCK_SIZE {
            return Err(Error::KeystreamShort(BLOCK_SIZE, n));
        }
        Ok(Gxm { cipher, subkey })
    }

    pub fn subkey(&self) -> &[u8; BLOCK_SIZE] {
        &self.subkey
    }

    // One provider request for the whole message: Z0 || Z1 with
    // |Z0| = 16 and |Z1| = n. A short fill is fatal, never retried.
    fn keystream(&self, nonce: &[u8], n: usize) -> Result<Vec<u8>> {
        if nonce.len() != self.cipher.nonce_size() {
            return Err(Error::InvalidNonceSize(
                self.cipher.nonce_size(),
                nonce.len(),
            ));
        }
        let want = n + BLOCK_SIZE;
        let mut stream = vec![0u8; want];
        let got = self.cipher.fill(nonce, &mut stream);
        if got != want {
            return Err(Error::KeystreamShort(want, got));
        }
        Ok(stream)
    }

    // auth calculates GHASH(ciphertext, additionalData), masks the result
    // with tag_mask and writes the result to tag.
    fn auth(
        &self,
        tag: &mut [u8; TAG_SIZE],
        ciphertext: &[u8],
        add: Option<&[u8]>,
        tag_mask: &[u8],
    ) {
        ghash(tag, &self.subkey, add, ciphertext);
        tag.iter_mut().zip(tag_mask).for_each(|(z, x)| *z ^= *x);
    }
}

impl<K: Keystream> Drop for Gxm<K> {
    fn drop(&mut self) {
        for b in &mut self.subkey {
            *b = 0;
        }
    }
}

impl<K: Keystream> Aead for Gxm<K> {
    type Error = Error;

    fn nonce_size(&self) -> usize {
        self.cipher.nonce_size()
    }

    fn overhead(&self) -> usize {
        TAG_SIZE
    }

    fn seal(
        &self,
        out: &mut [u8],
        nonce: &[u8],
        plaintext: &[u8],
        add: Option<&[u8]>,
    ) -> Result<()> {
        let n = plaintext.len();
        if out.len() < n + TAG_SIZE {
            return Err(Error::OutputTooSmall(n + TAG_SIZE, out.len()));
        }

        let stream = self.keystream(nonce, n)?;
        let (z0, z1) = stream.split_at(BLOCK_SIZE);

        let (ciphertext, rest) = out.split_at_mut(n);
        plaintext
            .iter()
            .zip(z1)
            .zip(ciphertext.iter_mut())
            .for_each(|((x, y), z)| *z = *x ^ *y);

        let mut tag = [0; TAG_SIZE];
        self.auth(&mut tag, ciphertext, add, z0);
        rest[..TAG_SIZE].copy_from_slice(&tag);
        Ok(())
    }

    fn open(
        &self,
        out: &mut [u8],
        nonce: &[u8],
        ciphertext: &[u8],
        add: Option<&[u8]>,
    ) -> Result<usize> {
        if ciphertext.len() < TAG_SIZE {
            return Err(Error::CiphertextTooSmall(ciphertext.len(), TAG_SIZE));
        }
        let (ciphertext, tag) = ciphertext.split_at(ciphertext.len() - TAG_SIZE);
        if out.len() < ciphertext.len() {
            return Err(Error::OutputTooSmall(ciphertext.len(), out.len()));
        }

        let stream = self.keystream(nonce, ciphertext.len())?;
        let (z0, z1) = stream.split_at(BLOCK_SIZE);

        let mut expected = [0; TAG_SIZE];
        self.auth(&mut expected, ciphertext, add, z0);

        // The tag check gates every plaintext byte: nothing is written to
        // out before the comparison passes.
        if expected[..].ct_eq(tag).unwrap_u8() == 0 {
            return Err(Error::AuthenticationError);
        }

        ciphertext
            .iter()
            .zip(z1)
            .zip(out.iter_mut())
            .for_each(|((x, y), z)| *z = *x ^ *y);
        Ok(ciphertext.len())
    }

    fn seal_inplace(
        &self,
        in_out: &mut [u8],
        tag: &mut [u8],
        nonce: &[u8],
        add: Option<&[u8]>,
    ) -> Result<()> {
        if tag.len() < TAG_SIZE {
            return Err(Error::OutputTooSmall(TAG_SIZE, tag.len()));
        }

        let stream = self.keystream(nonce, in_out.len())?;
        let (z0, z1) = stream.split_at(BLOCK_SIZE);

        in_out.iter_mut().zip(z1).for_each(|(z, y)| *z ^= *y);

        let mut t = [0; TAG_SIZE];
        self.auth(&mut t, in_out, add, z0);
        tag[..TAG_SIZE].copy_from_slice(&t);
        Ok(())
    }

    fn open_inplace(
        &self,
        in_out: &mut [u8],
        tag: &[u8],
        nonce: &[u8],
        add: Option<&[u8]>,
    ) -> Result<()> {
        let stream = self.keystream(nonce, in_out.len())?;
        let (z0, z1) = stream.split_at(BLOCK_SIZE);

        let mut expected = [0; TAG_SIZE];
        self.auth(&mut expected, in_out, add, z0);

        // The buffer keeps the ciphertext untouched unless the tag matches.
        if expected[..].ct_eq(tag).unwrap_u8() == 0 {
            return Err(Error::AuthenticationError);
        }

        in_out.iter_mut().zip(z1).for_each(|(z, y)| *z ^= *y);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::traits::{Aead, Keystream};
    use hex_literal::hex;
    use rand::Rng;
    use std::vec::Vec;

    pub(crate) const NONCE_SIZE: usize = 16;

    // splitmix64-based stand-in for a real keystream cipher. Deterministic
    // per (key, nonce), stateless per call.
    pub(crate) struct XorStream {
        pub key: [u8; 16],
    }

    impl Keystream for XorStream {
        fn nonce_size(&self) -> usize {
            NONCE_SIZE
        }

        fn fill(&self, nonce: &[u8], out: &mut [u8]) -> usize {
            let mut s = 0u64;
            for (i, b) in self.key.iter().chain(nonce.iter()).enumerate() {
                s ^= (*b as u64) << ((i % 8) * 8);
                s = s.wrapping_mul(0x9e3779b97f4a7c15);
            }
            for chunk in out.chunks_mut(8) {
                s = s.wrapping_add(0x9e3779b97f4a7c15);
                let mut z = s;
                z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
                z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
                z ^= z >> 31;
                chunk.copy_from_slice(&z.to_le_bytes()[..chunk.len()]);
            }
            out.len()
        }
    }

    pub(crate) fn test_gxm(key: [u8; 16]) -> Gxm<XorStream> {
        Gxm::new(
            XorStream { key },
            hex!("1d724d49251b6d248476cc6da43fe9d2"),
        )
    }

    // A provider that under-fills its buffer.
    struct ShortStream;

    impl Keystream for ShortStream {
        fn nonce_size(&self) -> usize {
            NONCE_SIZE
        }

        fn fill(&self, _nonce: &[u8], out: &mut [u8]) -> usize {
            out.len() / 2
        }
    }

    #[test]
    fn test_roundtrip_all_lengths() {
        let g = test_gxm(*b"ZUC-KEY-12345678");
        let nonce = *b"NONCE-AAAAAAA-12";
        let aad = b"associated data";

        let mut rng = rand::rng();
        for n in 0..1024usize {
            let mut plain = vec![0u8; n];
            rng.fill(plain.as_mut_slice());

            let mut out = vec![0u8; n + g.overhead()];
            g.seal(&mut out, &nonce, &plain, Some(aad)).unwrap();

            let mut decrypted = vec![0u8; n];
            let m = g.open(&mut decrypted, &nonce, &out, Some(aad)).unwrap();
            assert_eq!(m, n);
            assert_eq!(decrypted, plain);
        }
    }

    #[test]
    fn test_inplace_matches_buffered() {
        let g = test_gxm(*b"ZUC-KEY-12345678");
        let nonce = *b"NONCE-AAAAAAA-12";
        let plain = b"this is the secret message".to_vec();
        let aad = b"associated data";

        let mut out = vec![0u8; plain.len() + g.overhead()];
        g.seal(&mut out, &nonce, &plain, Some(aad)).unwrap();

        let mut in_out = plain.clone();
        let mut tag = [0u8; TAG_SIZE];
        g.seal_inplace(&mut in_out, &mut tag, &nonce, Some(aad))
            .unwrap();
        assert_eq!(&out[..plain.len()], in_out.as_slice());
        assert_eq!(&out[plain.len()..], &tag);

        g.open_inplace(&mut in_out, &tag, &nonce, Some(aad)).unwrap();
        assert_eq!(in_out, plain);
    }

    #[test]
    fn test_tamper_detection() {
        let g = test_gxm(*b"ZUC-KEY-12345678");
        let nonce = *b"NONCE-AAAAAAA-12";
        let plain = b"tamper with me and find out, ok?".to_vec();
        let aad = b"header".to_vec();

        let mut sealed = vec![0u8; plain.len() + g.overhead()];
        g.seal(&mut sealed, &nonce, &plain, Some(&aad)).unwrap();

        let mut out = vec![0u8; plain.len()];

        // Any single-bit flip in ciphertext or tag must fail, exactly.
        for i in 0..sealed.len() {
            let mut bad = sealed.clone();
            bad[i] ^= 1 << (i % 8);
            assert!(matches!(
                g.open(&mut out, &nonce, &bad, Some(&aad)),
                Err(Error::AuthenticationError)
            ));
        }

        // Same for the associated data.
        for i in 0..aad.len() {
            let mut bad_aad = aad.clone();
            bad_aad[i] ^= 1 << (i % 8);
            assert!(matches!(
                g.open(&mut out, &nonce, &sealed, Some(&bad_aad)),
                Err(Error::AuthenticationError)
            ));
        }

        // Untampered input still opens.
        g.open(&mut out, &nonce, &sealed, Some(&aad)).unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn test_open_failure_writes_nothing() {
        let g = test_gxm(*b"ZUC-KEY-12345678");
        let nonce = *b"NONCE-AAAAAAA-12";
        let plain = b"do not leak".to_vec();

        let mut sealed = vec![0u8; plain.len() + g.overhead()];
        g.seal(&mut sealed, &nonce, &plain, None).unwrap();
        let n = sealed.len();
        sealed[n - 1] ^= 0x80;

        let mut out = vec![0xa5u8; plain.len()];
        assert!(g.open(&mut out, &nonce, &sealed, None).is_err());
        assert_eq!(out, vec![0xa5u8; plain.len()]);

        let mut in_out = sealed[..plain.len()].to_vec();
        let ciphertext = in_out.clone();
        assert!(g
            .open_inplace(&mut in_out, &sealed[plain.len()..], &nonce, None)
            .is_err());
        assert_eq!(in_out, ciphertext);
    }

    #[test]
    fn test_nonce_size_checked() {
        let g = test_gxm([7u8; 16]);
        let mut out = vec![0u8; 32];
        assert!(matches!(
            g.seal(&mut out, b"short", b"hello", None),
            Err(Error::InvalidNonceSize(NONCE_SIZE, 5))
        ));
    }

    #[test]
    fn test_keystream_short_is_fatal() {
        let g = Gxm::new(ShortStream, [1u8; 16]);
        let nonce = [0u8; NONCE_SIZE];
        let mut out = vec![0u8; 16 + TAG_SIZE];
        assert!(matches!(
            g.seal(&mut out, &nonce, &[0u8; 16], None),
            Err(Error::KeystreamShort(32, 16))
        ));
    }

    #[test]
    fn test_subkey_derivation() {
        let cipher = XorStream { key: [9u8; 16] };
        let mut want = [0u8; BLOCK_SIZE];
        cipher.fill(&[0u8; NONCE_SIZE], &mut want);

        let g = Gxm::new_derived(XorStream { key: [9u8; 16] }).unwrap();
        assert_eq!(g.subkey(), &want);
    }

    #[test]
    fn test_distinct_nonces_distinct_ciphertexts() {
        let g = test_gxm(*b"ZUC-KEY-12345678");
        let plain = vec![0u8; 64];

        let mut a = vec![0u8; plain.len() + g.overhead()];
        let mut b = vec![0u8; plain.len() + g.overhead()];
        g.seal(&mut a, b"NONCE-AAAAAAA-12", &plain, None).unwrap();
        g.seal(&mut b, b"NONCE-BBBBBBB-12", &plain, None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_output_sizing_errors() {
        let g = test_gxm([3u8; 16]);
        let nonce = [0u8; NONCE_SIZE];

        let mut small = vec![0u8; 4];
        assert!(matches!(
            g.seal(&mut small, &nonce, b"hello", None),
            Err(Error::OutputTooSmall(21, 4))
        ));

        let mut out = Vec::new();
        assert!(matches!(
            g.open(&mut out, &nonce, &[0u8; 8], None),
            Err(Error::CiphertextTooSmall(8, TAG_SIZE))
        ));
    }
}
