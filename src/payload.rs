use crate::crypto::{self, Hasher};
use crate::error::*;
use crate::DigestAlgorithm;

/// A utility for hashing payloads. Feed your entity body to this, then pass the `finish`
/// result to a request or response, or compare it to the `hash` of an authenticated request.
pub struct PayloadHasher {
    hasher: Box<dyn Hasher>,
}

impl PayloadHasher {
    /// Create a new PayloadHasher. The `content_type` should be lower-case and should
    /// not include parameters. The digest is assumed to be the same as the digest used
    /// for the credentials in the request.
    pub fn new<B>(content_type: B, algorithm: DigestAlgorithm) -> Result<Self>
    where
        B: AsRef<[u8]>,
    {
        let mut hasher = PayloadHasher {
            hasher: crypto::get_crypographer().new_hasher(algorithm)?,
        };
        hasher.update(b"hawk.1.payload\n")?;
        hasher.update(content_type.as_ref())?;
        hasher.update(b"\n")?;
        Ok(hasher)
    }

    /// Hash a single value and return it
    pub fn hash<B1, B2>(content_type: B1, algorithm: DigestAlgorithm, payload: B2) -> Result<Vec<u8>>
    where
        B1: AsRef<[u8]>,
        B2: AsRef<[u8]>,
    {
        let mut hasher = PayloadHasher::new(content_type, algorithm)?;
        hasher.update(payload)?;
        hasher.finish()
    }

    /// Update the hash with new data.
    pub fn update<B>(&mut self, data: B) -> Result<()>
    where
        B: AsRef<[u8]>,
    {
        Ok(self.hasher.update(data.as_ref())?)
    }

    /// Finish hashing and return the result
    ///
    /// Note that this appends a newline to the payload, as the protocol requires.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.update(b"\n")?;
        Ok(self.hasher.finish()?)
    }
}
