/// A deterministic keystream generator keyed at construction time.
///
/// This is the boundary to the underlying stream cipher (ZUC, or any other
/// primitive): the GXM engine consumes keystream bytes and never looks
/// inside. A given (key, nonce) pair must always produce the same bytes,
/// and each `fill` call must derive from scratch: implementations keep no
/// streaming cursor between calls, or provide their own synchronization.
pub trait Keystream {
    /// The nonce length that must be passed to `fill`.
    fn nonce_size(&self) -> usize;

    /// Fill `out` with keystream bytes derived from the bound key and
    /// `nonce`. Returns the number of bytes actually written; anything
    /// short of `out.len()` is treated as a fatal provider failure by
    /// callers.
    fn fill(&self, nonce: &[u8], out: &mut [u8]) -> usize;
}

pub trait Aead {
    type Error;

    // NonceSize returns the size of the nonce that must be passed to seal
    // and open.
    fn nonce_size(&self) -> usize;

    // Overhead returns the maximum difference between the lengths of a
    // plaintext and its ciphertext.
    fn overhead(&self) -> usize;

    fn seal(
        &self,
        out: &mut [u8],
        nonce: &[u8],
        plaintext: &[u8],
        add: Option<&[u8]>,
    ) -> Result<(), Self::Error>;

    fn open(
        &self,
        out: &mut [u8],
        nonce: &[u8],
        ciphertext: &[u8],
        add: Option<&[u8]>,
    ) -> Result<usize, Self::Error>;

    fn seal_inplace(
        &self,
        in_out: &mut [u8],
        tag: &mut [u8],
        nonce: &[u8],
        add: Option<&[u8]>,
    ) -> Result<(), Self::Error>;

    fn open_inplace(
        &self,
        in_out: &mut [u8],
        tag: &[u8],
        nonce: &[u8],
        add: Option<&[u8]>,
    ) -> Result<(), Self::Error>;
}
