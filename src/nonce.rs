//! Replay protection.  Every `(id, nonce, ts)` tuple presented in an `Authorization` header may
//! be accepted once; the application supplies the storage through [`NonceStore`].

use crate::error::*;
use log::debug;
use std::time::SystemTime;

/// Storage for nonces that have been seen.
///
/// `check_and_insert` must be atomic: when several requests race with the same tuple, exactly
/// one call returns `Ok(true)` and the others `Ok(false)`.  A store may forget tuples whose
/// timestamp has fallen outside the server's skew window, since those can no longer pass the
/// timestamp check.
pub trait NonceStore {
    /// Record the tuple, returning true if it had not been seen before.
    fn check_and_insert(&self, id: &str, nonce: &str, ts: SystemTime) -> StoreResult<bool>;
}

impl<F> NonceStore for F
where
    F: Fn(&str, &str, SystemTime) -> StoreResult<bool>,
{
    fn check_and_insert(&self, id: &str, nonce: &str, ts: SystemTime) -> StoreResult<bool> {
        self(id, nonce, ts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceStatus {
    Accepted,
    Replay,
}

/// Register the tuple with the store.  A store failure is an `Error::NonceStore`, distinct from
/// a replay.
pub fn register_if_new<N: NonceStore + ?Sized>(
    store: &N,
    id: &str,
    nonce: &str,
    ts: SystemTime,
) -> Result<NonceStatus> {
    match store.check_and_insert(id, nonce, ts) {
        Ok(true) => Ok(NonceStatus::Accepted),
        Ok(false) => {
            debug!("replayed Hawk nonce for id {:?}", id);
            Ok(NonceStatus::Replay)
        }
        Err(e) => Err(Error::NonceStore(e)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use failure::err_msg;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::{Duration, UNIX_EPOCH};

    struct SetStore(Mutex<HashSet<(String, String, SystemTime)>>);

    impl NonceStore for SetStore {
        fn check_and_insert(&self, id: &str, nonce: &str, ts: SystemTime) -> StoreResult<bool> {
            let mut seen = self.0.lock().unwrap();
            Ok(seen.insert((id.to_string(), nonce.to_string(), ts)))
        }
    }

    fn ts() -> SystemTime {
        UNIX_EPOCH + Duration::new(1353832234, 0)
    }

    #[test]
    fn test_first_use_then_replay() {
        let store = SetStore(Mutex::new(HashSet::new()));
        assert_eq!(
            register_if_new(&store, "id", "n1", ts()).unwrap(),
            NonceStatus::Accepted
        );
        assert_eq!(
            register_if_new(&store, "id", "n1", ts()).unwrap(),
            NonceStatus::Replay
        );
    }

    #[test]
    fn test_tuple_scoping() {
        let store = SetStore(Mutex::new(HashSet::new()));
        register_if_new(&store, "id", "n1", ts()).unwrap();
        // same nonce under another id or at another time is a different tuple
        assert_eq!(
            register_if_new(&store, "other", "n1", ts()).unwrap(),
            NonceStatus::Accepted
        );
        assert_eq!(
            register_if_new(&store, "id", "n1", ts() + Duration::from_secs(1)).unwrap(),
            NonceStatus::Accepted
        );
    }

    #[test]
    fn test_store_error() {
        let failing = |_: &str, _: &str, _: SystemTime| -> StoreResult<bool> {
            Err(err_msg("nonce store down"))
        };
        match register_if_new(&failing, "id", "n1", ts()) {
            Err(Error::NonceStore(e)) => assert_eq!(e.to_string(), "nonce store down"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
