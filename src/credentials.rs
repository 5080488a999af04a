use crate::crypto::{self, HmacKey};
use crate::error::*;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;

/// Hawk key.
///
/// While any sequence of bytes can be specified as a key, note that each digest algorithm has
/// a suggested key length, and that passwords should *not* be used as keys.  Keys of incorrect
/// length are handled according to the digest's implementation.  Empty keys are refused.
pub struct Key {
    key: Box<dyn HmacKey>,
    algorithm: DigestAlgorithm,
}

impl Key {
    pub fn new<B>(key: B, algorithm: DigestAlgorithm) -> Result<Key>
    where
        B: AsRef<[u8]>,
    {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        Ok(Key {
            key: crypto::get_crypographer().new_key(algorithm, key)?,
            algorithm,
        })
    }

    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key.sign(data)?)
    }

    /// The digest algorithm this key signs with.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // never print key material
        f.debug_struct("Key")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

/// Hawk credentials: an ID and a key associated with that ID.  The digest algorithm
/// must be agreed between the server and the client, and the length of the key is
/// specific to that algorithm.
#[derive(Debug)]
pub struct Credentials {
    pub id: String,
    pub key: Key,
}

/// Generate a random credential id (12 characters) and key (24 characters), both
/// alphanumeric, suitable for handing out to a new client.
pub fn generate_id_key() -> (String, String) {
    let mut rng = rand::thread_rng();
    let id: String = (&mut rng).sample_iter(&Alphanumeric).take(12).collect();
    let key: String = (&mut rng).sample_iter(&Alphanumeric).take(24).collect();
    (id, key)
}
