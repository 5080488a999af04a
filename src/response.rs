//! Signing responses on the server, and verifying them on the client.
//!
//! A `Server-Authorization` header carries a `hawk.1.response` MAC over the request target and
//! the timestamp and nonce the client signed, together with the server's own `hash` and `ext`.
//! For a bewit the timestamp is its expiration time and the nonce is empty.

use crate::credentials::Key;
use crate::error::*;
use crate::header::Header;
use crate::mac::{unix_secs, Mac, MacType};
use crate::request::RequestState;
use crate::validator::AuthContext;
use std::time::SystemTime;

/// Sign the response to a request whose credentials were resolved, producing the header to
/// send as `Server-Authorization`.
///
/// This works for rejected requests as well as authenticated ones: the MAC covers the client's
/// own timestamp and nonce, so the client can confirm that even a refusal came from a server
/// holding its key.
pub fn sign_response<P>(
    context: &AuthContext<P>,
    ext: Option<&str>,
    hash: Option<Vec<u8>>,
) -> Result<Header> {
    context
        .response_builder()
        .ext(ext)
        .hash(hash)
        .response()
        .make_header(&context.credentials.key)
}

/// Build the value of a `WWW-Authenticate` header telling a client whose clock is skewed what
/// the server's time is.  The `tsm` attribute is a MAC of that time under the client's key, so
/// the client can trust the correction.
pub fn make_ts_challenge(key: &Key, now: SystemTime) -> Result<String> {
    let tsm = Mac::timestamp(key, now)?;
    Ok(format!(
        "Hawk ts=\"{}\", tsm=\"{}\", error=\"Stale timestamp\"",
        unix_secs(now),
        base64::encode(&tsm)
    ))
}

/// The response to one request, as both sides see it.
///
/// A server normally reaches this through `AuthContext::response_builder` (or just calls
/// `sign_response`).  A client builds it from the `RequestState` it signed with, via
/// `Request::make_response_builder` or `ResponseBuilder::from_request_state`, and checks the
/// server's header with `validate_header`.
#[derive(Debug, Clone)]
pub struct Response<'a> {
    method: &'a str,
    host: &'a str,
    port: u16,
    path: &'a str,
    reqstate: &'a RequestState,
    hash: Option<Vec<u8>>,
    ext: Option<&'a str>,
    app: Option<&'a str>,
    dlg: Option<&'a str>,
}

impl<'a> Response<'a> {
    /// Create the `Server-Authorization` header for this response.  It carries only `mac`,
    /// `hash` and `ext`.
    pub fn make_header(&self, key: &Key) -> Result<Header> {
        let hash = self.hash.as_ref().map(|h| &h[..]);
        let mac = self.mac(key, hash, self.ext)?;
        Header::new(
            None,
            None,
            None,
            Some(mac),
            self.ext,
            self.hash.clone(),
            None,
            None,
        )
    }

    /// Validate a `Server-Authorization` header on the client.
    ///
    /// The MAC is checked using the `hash` and `ext` the server sent.  If a hash was supplied
    /// locally, computed from the response payload, the server must have signed the same one.
    /// The timestamp is the client's own, so it is not checked for skew.
    pub fn validate_header(&self, response_header: &Header, key: &Key) -> bool {
        let claimed = match response_header.mac {
            Some(ref mac) => mac,
            None => return false,
        };
        let signed_hash = response_header.hash.as_ref().map(|h| &h[..]);
        let signed_ext = response_header.ext.as_ref().map(|e| &e[..]);
        match self.mac(key, signed_hash, signed_ext) {
            Ok(ref mac) if mac == claimed => {}
            _ => return false,
        }

        match (&self.hash, signed_hash) {
            (Some(local), Some(signed)) => &local[..] == signed,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    fn mac(&self, key: &Key, hash: Option<&[u8]>, ext: Option<&str>) -> Result<Mac> {
        Mac::new(
            MacType::Response,
            key,
            self.reqstate.ts,
            &self.reqstate.nonce,
            self.method,
            self.host,
            self.port,
            self.path,
            hash,
            ext,
            self.app,
            self.dlg,
        )
    }
}

#[derive(Debug, Clone)]
pub struct ResponseBuilder<'a>(Response<'a>);

impl<'a> ResponseBuilder<'a> {
    /// Start a response to the request identified by the given state and target.
    pub fn from_request_state(
        reqstate: &'a RequestState,
        method: &'a str,
        host: &'a str,
        port: u16,
        path: &'a str,
    ) -> Self {
        ResponseBuilder(Response {
            method,
            host,
            port,
            path,
            reqstate,
            hash: None,
            ext: None,
            app: None,
            dlg: None,
        })
    }

    /// Set the content hash for the response.
    ///
    /// This should always be calculated from the response payload, not copied from a header.
    pub fn hash<H: Into<Option<Vec<u8>>>>(mut self, hash: H) -> Self {
        self.0.hash = hash.into();
        self
    }

    /// Set the `ext` Hawk property for the response.
    ///
    /// This need only be set on the server; the client uses whatever the server sent.
    pub fn ext<S: Into<Option<&'a str>>>(mut self, ext: S) -> Self {
        self.0.ext = ext.into();
        self
    }

    /// Set the `app` the request was signed with.
    pub fn app<S: Into<Option<&'a str>>>(mut self, app: S) -> Self {
        self.0.app = app.into();
        self
    }

    /// Set the `dlg` the request was signed with.
    pub fn dlg<S: Into<Option<&'a str>>>(mut self, dlg: S) -> Self {
        self.0.dlg = dlg.into();
        self
    }

    pub fn response(self) -> Response<'a> {
        self.0
    }
}
