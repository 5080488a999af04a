//! `hawk-filter` must compute HMACs, hash payloads, compare MACs in constant time, and generate
//! random nonces.  It does all of this through the [`Cryptographer`] trait, so that the backing
//! library can be chosen at build time.
//!
//! With the default `use_ring` feature, `ring` is used.  With `use_openssl`, `openssl` is used.
//! With neither, an implementation must be installed with [`set_cryptographer`] before any
//! cryptographic operation is attempted.

use crate::DigestAlgorithm;
use failure::Fail;

pub(crate) mod holder;
pub(crate) use holder::get_crypographer;
pub use holder::{set_boxed_cryptographer, set_cryptographer, SetCryptographerError};

#[cfg(feature = "use_ring")]
mod ring;

#[cfg(feature = "use_openssl")]
mod openssl;

#[cfg(feature = "use_openssl")]
pub use self::openssl::OpenSSLCryptographer;

#[cfg(feature = "use_ring")]
pub use self::ring::RingCryptographer;

#[cfg(all(feature = "use_ring", feature = "use_openssl"))]
compile_error!("the `use_ring` and `use_openssl` features are mutually exclusive");

#[derive(Fail, Debug)]
pub enum CryptoError {
    /// The configured cryptographer does not support the digest algorithm.
    #[fail(display = "Digest algorithm {:?} is unsupported by this Cryptographer", _0)]
    UnsupportedDigest(DigestAlgorithm),

    /// The backing library reported an error.
    #[fail(display = "{}", _0)]
    Other(failure::Error),
}

/// A key that can compute an HMAC over arbitrary data.
pub trait HmacKey: Send + Sync + 'static {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// A digest under construction.  `finish` may only be called once.
pub trait Hasher: Send + Sync + 'static {
    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError>;
    fn finish(&mut self) -> Result<Vec<u8>, CryptoError>;
}

/// The set of primitives this crate needs from a cryptographic library.
pub trait Cryptographer: Send + Sync + 'static {
    fn rand_bytes(&self, output: &mut [u8]) -> Result<(), CryptoError>;
    fn new_key(
        &self,
        algorithm: DigestAlgorithm,
        key: &[u8],
    ) -> Result<Box<dyn HmacKey>, CryptoError>;
    fn new_hasher(&self, algorithm: DigestAlgorithm) -> Result<Box<dyn Hasher>, CryptoError>;
    fn constant_time_compare(&self, a: &[u8], b: &[u8]) -> bool;
}
