#![allow(dead_code)]
use failure::err_msg;
use hawk_filter::{
    Credentials, CredentialStore, FilterOptions, HawkFilter, Key, NonceStore, ResolvedCredentials,
    StoreResult, SHA256,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::SystemTime;

pub const VALID_ID: &str = "valid-id";
pub const VALID_KEY: &str = "test-cred-key";
pub const ERROR_ID: &str = "error-creds-id";

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub name: String,
}

/// Credentials held in memory; `ERROR_ID` simulates a failing backend.
pub struct MemoryCredentials(HashMap<String, ResolvedCredentials<User>>);

impl MemoryCredentials {
    pub fn new() -> Self {
        let mut creds = HashMap::new();
        creds.insert(
            VALID_ID.to_string(),
            ResolvedCredentials::new(
                VALID_KEY,
                User {
                    name: "test-user".to_string(),
                },
            ),
        );
        MemoryCredentials(creds)
    }
}

impl CredentialStore for MemoryCredentials {
    type Principal = User;

    fn lookup(&self, id: &str) -> StoreResult<Option<ResolvedCredentials<User>>> {
        if id == ERROR_ID {
            return Err(err_msg("credential backend unavailable"));
        }
        Ok(self.0.get(id).cloned())
    }
}

/// Nonces held in memory behind a mutex, so check-and-insert is atomic.
#[derive(Default)]
pub struct MemoryNonces(Mutex<HashSet<(String, String, SystemTime)>>);

impl NonceStore for MemoryNonces {
    fn check_and_insert(&self, id: &str, nonce: &str, ts: SystemTime) -> StoreResult<bool> {
        let mut seen = self
            .0
            .lock()
            .map_err(|_| err_msg("nonce store poisoned"))?;
        Ok(seen.insert((id.to_string(), nonce.to_string(), ts)))
    }
}

pub fn make_filter(options: FilterOptions) -> HawkFilter<MemoryCredentials, MemoryNonces> {
    HawkFilter::with_options(MemoryCredentials::new(), MemoryNonces::default(), options)
}

pub fn credentials(id: &str, key: &str) -> Credentials {
    Credentials {
        id: id.to_string(),
        key: Key::new(key, SHA256).unwrap(),
    }
}
