//! Mapping a Hawk credential id to the key and principal that own it.
//!
//! The backing store is supplied by the application through [`CredentialStore`]; this module
//! only interprets its answers.

use crate::credentials::{Credentials, DigestAlgorithm, Key};
use crate::error::*;
use log::debug;

/// What a credential store knows about a credential id: the shared secret, the digest
/// algorithm agreed with the client, and the application's principal for the id.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCredentials<P> {
    pub key: Vec<u8>,
    pub algorithm: DigestAlgorithm,
    pub principal: P,
}

impl<P> ResolvedCredentials<P> {
    /// Credentials using SHA-256, the usual Hawk algorithm.
    pub fn new<B: Into<Vec<u8>>>(key: B, principal: P) -> Self {
        ResolvedCredentials {
            key: key.into(),
            algorithm: DigestAlgorithm::Sha256,
            principal,
        }
    }

    pub fn algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// A read-only source of credentials.
///
/// `lookup` returns `Ok(None)` for an unknown id; that is an authentication failure, not an
/// error.  `Err` is reserved for failures of the store itself (a lost database connection, for
/// example) and is never reported to the client as an authentication failure.
pub trait CredentialStore {
    type Principal;

    fn lookup(&self, id: &str) -> StoreResult<Option<ResolvedCredentials<Self::Principal>>>;
}

impl<F, P> CredentialStore for F
where
    F: Fn(&str) -> StoreResult<Option<ResolvedCredentials<P>>>,
{
    type Principal = P;

    fn lookup(&self, id: &str) -> StoreResult<Option<ResolvedCredentials<P>>> {
        self(id)
    }
}

/// The outcome of resolving a credential id.
#[derive(Debug)]
pub enum Resolution<P> {
    Found(Credentials, P),
    NotFound,
}

/// Look up `id` in the store and build its signing key.
///
/// A store failure becomes `Error::CredentialStore`; a stored credential with an empty key is a
/// configuration problem and becomes `Error::EmptyKey`.
pub fn resolve<C: CredentialStore>(store: &C, id: &str) -> Result<Resolution<C::Principal>> {
    match store.lookup(id) {
        Err(e) => Err(Error::CredentialStore(e)),
        Ok(None) => {
            debug!("no Hawk credentials for id {:?}", id);
            Ok(Resolution::NotFound)
        }
        Ok(Some(resolved)) => {
            let key = Key::new(&resolved.key, resolved.algorithm)?;
            let credentials = Credentials {
                id: id.to_string(),
                key,
            };
            Ok(Resolution::Found(credentials, resolved.principal))
        }
    }
}
