//! The server side of the protocol: classifying an inbound request as authenticated, rejected,
//! or failed.
//!
//! A request authenticates either with an `Authorization` header or, for GET requests without
//! one, with a `bewit` query parameter.  Header authentication checks the MAC, then the
//! timestamp, then the nonce, so that forged requests never consume nonce slots.  Bewit
//! authentication checks the MAC and then the expiration time.

use crate::bewit::Bewit;
use crate::credentials::Credentials;
use crate::crypto;
use crate::error::*;
use crate::header::Header;
use crate::nonce::{register_if_new, NonceStatus, NonceStore};
use crate::payload::PayloadHasher;
use crate::request::{timestamp_in_window, RequestBuilder, RequestState};
use crate::resolver::{resolve, CredentialStore, Resolution};
use crate::response::ResponseBuilder;
use log::debug;
use std::borrow::Cow;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// The default tolerance between a client's timestamp and the server's clock.
pub const DEFAULT_TS_SKEW: Duration = Duration::from_secs(60);

/// How the client presented its credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Header,
    Bewit,
}

/// Everything known about a request whose credentials were resolved.
///
/// The context is what a `Server-Authorization` header is computed from, so it is available for
/// rejected requests as well as authenticated ones.
#[derive(Debug)]
pub struct AuthContext<P> {
    pub credentials: Credentials,
    pub principal: P,
    pub mode: AuthMode,
    /// The timestamp and nonce the client signed.  For a bewit these are its expiration time and
    /// an empty nonce.
    pub reqstate: RequestState,
    pub ext: Option<String>,
    pub hash: Option<Vec<u8>>,
    pub app: Option<String>,
    pub dlg: Option<String>,
    method: String,
    host: String,
    port: u16,
    path: String,
}

impl<P> AuthContext<P> {
    pub fn id(&self) -> &str {
        &self.credentials.id
    }

    /// The path the client signed; for a bewit this excludes the `bewit` parameter.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// A builder for the response to this request, to which `ext` and a payload hash can be
    /// added before signing.
    pub fn response_builder(&self) -> ResponseBuilder<'_> {
        ResponseBuilder::from_request_state(
            &self.reqstate,
            &self.method,
            &self.host,
            self.port,
            &self.path,
        )
        .app(self.app.as_ref().map(|a| &a[..]))
        .dlg(self.dlg.as_ref().map(|d| &d[..]))
    }

    /// Check a request body against the `hash` attribute the client signed.
    ///
    /// Returns false if the client did not send a hash.  Servers that require payload
    /// verification should treat that as a failure too.
    pub fn validate_payload_hash<B>(&self, content_type: &str, payload: B) -> Result<bool>
    where
        B: AsRef<[u8]>,
    {
        let claimed = match self.hash {
            Some(ref hash) => hash,
            None => return Ok(false),
        };
        let computed = PayloadHasher::hash(content_type, self.credentials.key.algorithm(), payload)?;
        Ok(crypto::get_crypographer().constant_time_compare(&computed, claimed))
    }
}

/// The classification of a single request.
#[derive(Debug)]
pub enum Outcome<P> {
    Authenticated(AuthContext<P>),
    /// A protocol-level failure.  The context is present whenever the credentials were resolved,
    /// and can be used to sign the rejection.
    Rejected(Rejection, Option<AuthContext<P>>),
    /// A malformed request, a misconfigured credential, or a failure of one of the stores.
    Errored(Error),
}

impl<P> Outcome<P> {
    pub fn is_authenticated(&self) -> bool {
        match self {
            Outcome::Authenticated(_) => true,
            _ => false,
        }
    }

    pub fn context(&self) -> Option<&AuthContext<P>> {
        match self {
            Outcome::Authenticated(ctx) => Some(ctx),
            Outcome::Rejected(_, ctx) => ctx.as_ref(),
            Outcome::Errored(_) => None,
        }
    }
}

/// Validates requests against a credential store and a nonce store.
pub struct Validator<C, N> {
    credentials: C,
    nonces: N,
    ts_skew: Duration,
}

impl<C, N> Validator<C, N>
where
    C: CredentialStore,
    N: NonceStore,
{
    pub fn new(credentials: C, nonces: N) -> Self {
        Validator {
            credentials,
            nonces,
            ts_skew: DEFAULT_TS_SKEW,
        }
    }

    /// Set the permitted difference between a request's timestamp and the server's clock.
    pub fn ts_skew(mut self, ts_skew: Duration) -> Self {
        self.ts_skew = ts_skew;
        self
    }

    /// Validate a request at the current time.
    ///
    /// `path` includes the query string, exactly as the client sent it.  `authorization` is the
    /// value of the `Authorization` header, if any.
    pub fn validate(
        &self,
        method: &str,
        host: &str,
        port: u16,
        path: &str,
        authorization: Option<&str>,
    ) -> Outcome<C::Principal> {
        self.validate_at(method, host, port, path, authorization, SystemTime::now())
    }

    /// Validate a request as of `now`.
    pub fn validate_at(
        &self,
        method: &str,
        host: &str,
        port: u16,
        path: &str,
        authorization: Option<&str>,
        now: SystemTime,
    ) -> Outcome<C::Principal> {
        let result = match authorization {
            Some(value) => self.validate_header(method, host, port, path, value, now),
            None if method == "GET" => self.validate_bewit(host, port, path, now),
            None => Ok(Outcome::Rejected(Rejection::NoAuth, None)),
        };
        result.unwrap_or_else(Outcome::Errored)
    }

    fn validate_header(
        &self,
        method: &str,
        host: &str,
        port: u16,
        path: &str,
        authorization: &str,
        now: SystemTime,
    ) -> Result<Outcome<C::Principal>> {
        let header = Header::from_str(authorization)?;
        let id = header.id.clone().ok_or(Error::MissingAttribute("id"))?;
        let ts = header.ts.ok_or(Error::MissingAttribute("ts"))?;
        let nonce = header.nonce.clone().ok_or(Error::MissingAttribute("nonce"))?;
        if header.mac.is_none() {
            return Err(Error::MissingAttribute("mac"));
        }

        let (credentials, principal) = match resolve(&self.credentials, &id)? {
            Resolution::Found(credentials, principal) => (credentials, principal),
            Resolution::NotFound => return Ok(Outcome::Rejected(Rejection::NotFound, None)),
        };

        let request = RequestBuilder::new(method, host, port, path).request();
        let mac_ok = request.check_header_mac(&header, &credentials.key);
        let context = AuthContext {
            credentials,
            principal,
            mode: AuthMode::Header,
            reqstate: RequestState { ts, nonce },
            ext: header.ext,
            hash: header.hash,
            app: header.app,
            dlg: header.dlg,
            method: method.to_string(),
            host: host.to_string(),
            port,
            path: path.to_string(),
        };

        if !mac_ok {
            debug!("invalid Hawk header MAC for id {:?}", id);
            return Ok(Outcome::Rejected(Rejection::InvalidMac, Some(context)));
        }
        if !timestamp_in_window(ts, now, self.ts_skew) {
            debug!("stale Hawk timestamp for id {:?}", id);
            return Ok(Outcome::Rejected(Rejection::TimestampSkew, Some(context)));
        }
        match register_if_new(&self.nonces, &id, &context.reqstate.nonce, ts)? {
            NonceStatus::Accepted => Ok(Outcome::Authenticated(context)),
            NonceStatus::Replay => Ok(Outcome::Rejected(Rejection::Replay, Some(context))),
        }
    }

    fn validate_bewit(
        &self,
        host: &str,
        port: u16,
        path: &str,
        now: SystemTime,
    ) -> Result<Outcome<C::Principal>> {
        let mut path = Cow::Borrowed(path);
        let bewit = match Bewit::from_path(&mut path)? {
            Some(bewit) => bewit,
            None => return Ok(Outcome::Rejected(Rejection::NoAuth, None)),
        };

        let (credentials, principal) = match resolve(&self.credentials, bewit.id())? {
            Resolution::Found(credentials, principal) => (credentials, principal),
            Resolution::NotFound => return Ok(Outcome::Rejected(Rejection::NotFound, None)),
        };

        let request = RequestBuilder::new("GET", host, port, &path).request();
        let mac_ok = request.check_bewit_mac(&bewit, &credentials.key);
        let context = AuthContext {
            credentials,
            principal,
            mode: AuthMode::Bewit,
            reqstate: RequestState {
                ts: bewit.exp(),
                nonce: String::new(),
            },
            ext: bewit.ext().map(str::to_string),
            hash: None,
            app: None,
            dlg: None,
            method: "GET".to_string(),
            host: host.to_string(),
            port,
            path: path.to_string(),
        };

        if !mac_ok {
            debug!("invalid bewit MAC for id {:?}", context.id());
            return Ok(Outcome::Rejected(Rejection::InvalidMac, Some(context)));
        }
        if bewit.is_expired(now) {
            debug!("expired bewit for id {:?}", context.id());
            return Ok(Outcome::Rejected(Rejection::BewitExpired, Some(context)));
        }
        Ok(Outcome::Authenticated(context))
    }
}

#[cfg(all(test, any(feature = "use_ring", feature = "use_openssl")))]
mod test {
    use super::*;
    use crate::credentials::Key;
    use crate::resolver::ResolvedCredentials;
    use failure::err_msg;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::time::UNIX_EPOCH;

    type Creds = fn(&str) -> StoreResult<Option<ResolvedCredentials<String>>>;

    fn creds(id: &str) -> StoreResult<Option<ResolvedCredentials<String>>> {
        match id {
            "valid-id" => Ok(Some(ResolvedCredentials::new("test-cred-key", "alice".to_string()))),
            "empty-id" => Ok(Some(ResolvedCredentials::new("", "nobody".to_string()))),
            "error-creds-id" => Err(err_msg("test error")),
            _ => Ok(None),
        }
    }

    struct Nonces(RefCell<HashSet<(String, String, SystemTime)>>);

    impl NonceStore for Nonces {
        fn check_and_insert(&self, id: &str, nonce: &str, ts: SystemTime) -> StoreResult<bool> {
            Ok(self
                .0
                .borrow_mut()
                .insert((id.to_string(), nonce.to_string(), ts)))
        }
    }

    fn validator() -> Validator<Creds, Nonces> {
        Validator::new(creds as Creds, Nonces(RefCell::new(HashSet::new())))
    }

    fn credentials(id: &str, key: &str) -> Credentials {
        Credentials {
            id: id.to_string(),
            key: Key::new(key, crate::SHA256).unwrap(),
        }
    }

    fn now() -> SystemTime {
        UNIX_EPOCH + Duration::new(1353832234, 0)
    }

    fn header_at(method: &str, path: &str, id: &str, key: &str, nonce: &str) -> String {
        let req = RequestBuilder::new(method, "example.com", 443, path)
            .ext("my-ext")
            .request();
        let state = RequestState {
            ts: now(),
            nonce: nonce.to_string(),
        };
        req.make_header_full(&credentials(id, key), &state)
            .unwrap()
            .header_value()
    }

    fn run(v: &Validator<Creds, Nonces>, method: &str, path: &str, auth: Option<&str>) -> Outcome<String> {
        v.validate_at(method, "example.com", 443, path, auth, now())
    }

    fn rejection(outcome: &Outcome<String>) -> Option<Rejection> {
        match outcome {
            Outcome::Rejected(r, _) => Some(*r),
            _ => None,
        }
    }

    #[test]
    fn test_header_authenticated() {
        let v = validator();
        let auth = header_at("POST", "/foo?x=1", "valid-id", "test-cred-key", "n1");
        match run(&v, "POST", "/foo?x=1", Some(&auth)) {
            Outcome::Authenticated(ctx) => {
                assert_eq!(ctx.id(), "valid-id");
                assert_eq!(ctx.principal, "alice");
                assert_eq!(ctx.mode, AuthMode::Header);
                assert_eq!(ctx.ext, Some("my-ext".to_string()));
                assert_eq!(ctx.reqstate.nonce, "n1");
                assert_eq!(ctx.path(), "/foo?x=1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_header_replay() {
        let v = validator();
        let auth = header_at("GET", "/foo", "valid-id", "test-cred-key", "n1");
        assert!(run(&v, "GET", "/foo", Some(&auth)).is_authenticated());
        let outcome = run(&v, "GET", "/foo", Some(&auth));
        assert_eq!(rejection(&outcome), Some(Rejection::Replay));
        assert!(outcome.context().is_some());
    }

    #[test]
    fn test_header_wrong_key() {
        let v = validator();
        let auth = header_at("GET", "/foo", "valid-id", "not-the-key", "n1");
        let outcome = run(&v, "GET", "/foo", Some(&auth));
        assert_eq!(rejection(&outcome), Some(Rejection::InvalidMac));
        assert!(outcome.context().is_some());
    }

    #[test]
    fn test_forged_request_does_not_consume_nonce() {
        let v = validator();
        let forged = header_at("GET", "/foo", "valid-id", "not-the-key", "n1");
        assert_eq!(
            rejection(&run(&v, "GET", "/foo", Some(&forged))),
            Some(Rejection::InvalidMac)
        );
        let genuine = header_at("GET", "/foo", "valid-id", "test-cred-key", "n1");
        assert!(run(&v, "GET", "/foo", Some(&genuine)).is_authenticated());
    }

    #[test]
    fn test_header_tampered_request() {
        let v = validator();
        let auth = header_at("GET", "/foo", "valid-id", "test-cred-key", "n1");
        assert_eq!(
            rejection(&run(&v, "POST", "/foo", Some(&auth))),
            Some(Rejection::InvalidMac)
        );
        assert_eq!(
            rejection(&run(&v, "GET", "/bar", Some(&auth))),
            Some(Rejection::InvalidMac)
        );
    }

    #[test]
    fn test_header_tampered_app() {
        let v = validator();
        let req = RequestBuilder::new("GET", "example.com", 443, "/foo")
            .app("app-one")
            .dlg("dlg-one")
            .request();
        let state = RequestState {
            ts: now(),
            nonce: "n1".to_string(),
        };
        let auth = req
            .make_header_full(&credentials("valid-id", "test-cred-key"), &state)
            .unwrap()
            .header_value();
        let tampered = auth
            .replace("app=\"app-one\"", "app=\"evil-app\"")
            .replace("dlg=\"dlg-one\"", "dlg=\"evil-dlg\"");
        assert_ne!(auth, tampered);
        assert_eq!(
            rejection(&run(&v, "GET", "/foo", Some(&tampered))),
            Some(Rejection::InvalidMac)
        );

        match run(&v, "GET", "/foo", Some(&auth)) {
            Outcome::Authenticated(ctx) => {
                assert_eq!(ctx.app, Some("app-one".to_string()));
                assert_eq!(ctx.dlg, Some("dlg-one".to_string()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_header_skew() {
        let v = validator();
        let auth = header_at("GET", "/foo", "valid-id", "test-cred-key", "n1");
        let outcome = v.validate_at(
            "GET",
            "example.com",
            443,
            "/foo",
            Some(&auth),
            now() + Duration::from_secs(61),
        );
        assert_eq!(rejection(&outcome), Some(Rejection::TimestampSkew));

        // a wider window admits the same request
        let v = validator().ts_skew(Duration::from_secs(120));
        let outcome = v.validate_at(
            "GET",
            "example.com",
            443,
            "/foo",
            Some(&auth),
            now() + Duration::from_secs(61),
        );
        assert!(outcome.is_authenticated());
    }

    #[test]
    fn test_header_unknown_id() {
        let v = validator();
        let auth = header_at("GET", "/foo", "who", "test-cred-key", "n1");
        let outcome = run(&v, "GET", "/foo", Some(&auth));
        assert_eq!(rejection(&outcome), Some(Rejection::NotFound));
        assert!(outcome.context().is_none());
    }

    #[test]
    fn test_header_store_error() {
        let v = validator();
        let auth = header_at("GET", "/foo", "error-creds-id", "test-cred-key", "n1");
        match run(&v, "GET", "/foo", Some(&auth)) {
            Outcome::Errored(Error::CredentialStore(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_header_empty_key() {
        let v = validator();
        let auth = header_at("GET", "/foo", "empty-id", "test-cred-key", "n1");
        match run(&v, "GET", "/foo", Some(&auth)) {
            Outcome::Errored(Error::EmptyKey) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nonce_store_error() {
        let failing = |_: &str, _: &str, _: SystemTime| -> StoreResult<bool> {
            Err(err_msg("nonce store down"))
        };
        let v = Validator::new(creds as Creds, failing);
        let auth = header_at("GET", "/foo", "valid-id", "test-cred-key", "n1");
        match v.validate_at("GET", "example.com", 443, "/foo", Some(&auth), now()) {
            Outcome::Errored(Error::NonceStore(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_header_malformed() {
        let v = validator();
        match run(&v, "GET", "/foo", Some("Hawk id=unquoted")) {
            Outcome::Errored(e) => assert!(e.is_malformed_input()),
            other => panic!("unexpected {:?}", other),
        }
        match run(&v, "GET", "/foo", Some("Hawk id=\"valid-id\", ts=\"1353832234\"")) {
            Outcome::Errored(Error::MissingAttribute("nonce")) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_no_auth() {
        let v = validator();
        assert_eq!(rejection(&run(&v, "GET", "/foo", None)), Some(Rejection::NoAuth));
        assert_eq!(rejection(&run(&v, "GET", "/foo?x=1", None)), Some(Rejection::NoAuth));
    }

    fn bewit_path(key: &str, exp: SystemTime) -> String {
        let credentials = credentials("valid-id", key);
        let req = RequestBuilder::new("GET", "example.com", 443, "/resource?a=b").request();
        let bewit = req.make_bewit(&credentials, exp).unwrap();
        format!("/resource?a=b&bewit={}", bewit.to_str())
    }

    #[test]
    fn test_bewit_authenticated() {
        let v = validator();
        let path = bewit_path("test-cred-key", now() + Duration::from_secs(3600));
        match run(&v, "GET", &path, None) {
            Outcome::Authenticated(ctx) => {
                assert_eq!(ctx.mode, AuthMode::Bewit);
                assert_eq!(ctx.principal, "alice");
                assert_eq!(ctx.path(), "/resource?a=b");
                assert_eq!(ctx.reqstate.nonce, "");
                assert_eq!(ctx.reqstate.ts, now() + Duration::from_secs(3600));
            }
            other => panic!("unexpected {:?}", other),
        }
        // bewits are not nonce-tracked
        assert!(run(&v, "GET", &path, None).is_authenticated());
    }

    #[test]
    fn test_bewit_expired() {
        let v = validator();
        let path = bewit_path("test-cred-key", now() - Duration::from_secs(3600));
        let outcome = run(&v, "GET", &path, None);
        assert_eq!(rejection(&outcome), Some(Rejection::BewitExpired));
        assert!(outcome.context().is_some());
    }

    #[test]
    fn test_bewit_expiry_edge() {
        let v = validator();
        let path = bewit_path("test-cred-key", now());
        assert!(run(&v, "GET", &path, None).is_authenticated());
    }

    #[test]
    fn test_bewit_wrong_key() {
        let v = validator();
        let path = bewit_path("not-the-key", now() + Duration::from_secs(3600));
        assert_eq!(rejection(&run(&v, "GET", &path, None)), Some(Rejection::InvalidMac));
    }

    #[test]
    fn test_bewit_not_get() {
        let v = validator();
        let path = bewit_path("test-cred-key", now() + Duration::from_secs(3600));
        assert_eq!(rejection(&run(&v, "POST", &path, None)), Some(Rejection::NoAuth));
    }

    #[test]
    fn test_bewit_malformed() {
        let v = validator();
        let bad = base64::encode_config("valid-id\\123", base64::URL_SAFE_NO_PAD);
        match run(&v, "GET", &format!("/resource?bewit={}", bad), None) {
            Outcome::Errored(Error::InvalidBewit(InvalidBewit::Format)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_signed_rejection_verifies() {
        let v = validator();
        let auth = header_at("GET", "/foo", "valid-id", "test-cred-key", "n1");
        let outcome = v.validate_at(
            "GET",
            "example.com",
            443,
            "/foo",
            Some(&auth),
            now() + Duration::from_secs(3600),
        );
        let ctx = match outcome {
            Outcome::Rejected(Rejection::TimestampSkew, Some(ctx)) => ctx,
            other => panic!("unexpected {:?}", other),
        };
        let header = crate::response::sign_response(&ctx, Some("server-ext"), None).unwrap();

        let state = RequestState {
            ts: now(),
            nonce: "n1".to_string(),
        };
        let client = ResponseBuilder::from_request_state(&state, "GET", "example.com", 443, "/foo")
            .response();
        let key = Key::new("test-cred-key", crate::SHA256).unwrap();
        assert!(client.validate_header(&header, &key));
    }

    #[test]
    fn test_payload_hash() {
        let v = validator();
        let hash = PayloadHasher::hash("text/plain", crate::SHA256, "hello").unwrap();
        let req = RequestBuilder::new("POST", "example.com", 443, "/upload")
            .hash(&hash[..])
            .request();
        let state = RequestState {
            ts: now(),
            nonce: "n1".to_string(),
        };
        let auth = req
            .make_header_full(&credentials("valid-id", "test-cred-key"), &state)
            .unwrap()
            .header_value();
        match run(&v, "POST", "/upload", Some(&auth)) {
            Outcome::Authenticated(ctx) => {
                assert!(ctx.validate_payload_hash("text/plain", "hello").unwrap());
                assert!(!ctx.validate_payload_hash("text/plain", "goodbye").unwrap());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
