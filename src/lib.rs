//! Server-side Hawk authentication for `http` request pipelines.
//!
//! Hawk is an HTTP authentication scheme in which clients sign each request with a shared key,
//! a timestamp, and a nonce.  This crate validates such requests, either from an
//! `Authorization` header or from a `bewit` query parameter on GET requests, defends against
//! replays, and signs responses so that clients can authenticate the server in turn.
//!
//! The application supplies two capabilities: a [`CredentialStore`] mapping credential ids to
//! keys and principals, and a [`NonceStore`] recording the nonces that have been used.  Both are
//! implemented for plain closures.
//!
//! # Examples
//!
//! ## Filtering requests
//!
//! ```
//! use hawk_filter::{FilterOptions, HawkAuth, HawkFilter, Principal, ResolvedCredentials};
//! use hawk_filter::{Credentials, Key, RequestState, SignRequest, StoreResult, SHA256};
//! use std::collections::HashSet;
//! use std::sync::Mutex;
//! use std::time::SystemTime;
//!
//! let seen = Mutex::new(HashSet::new());
//! let filter = HawkFilter::with_options(
//!     |id: &str| -> StoreResult<Option<ResolvedCredentials<String>>> {
//!         match id {
//!             "dh37fgj492je" => Ok(Some(ResolvedCredentials::new("werxhqb98rpaxn39848xrunpaw3489ruxnpa98w4rxn", "steve".to_string()))),
//!             _ => Ok(None),
//!         }
//!     },
//!     move |id: &str, nonce: &str, ts: SystemTime| -> StoreResult<bool> {
//!         Ok(seen.lock().unwrap().insert((id.to_string(), nonce.to_string(), ts)))
//!     },
//!     FilterOptions::default().ext("server-ext"),
//! );
//!
//! // a client signs its request..
//! let credentials = Credentials {
//!     id: "dh37fgj492je".to_string(),
//!     key: Key::new("werxhqb98rpaxn39848xrunpaw3489ruxnpa98w4rxn", SHA256).unwrap(),
//! };
//! let client_state = RequestState::new().unwrap();
//! let request = http::Request::get("http://example.com:8000/resource/1?b=1&a=2")
//!     .sign_hawk(&credentials, &client_state, None, Some("some-app-ext-data"))
//!     .unwrap()
//!     .body(())
//!     .unwrap();
//!
//! // ..and the server authenticates it
//! let request = filter.filter(request).unwrap();
//! let principal = request.extensions().get::<Principal<String>>().unwrap();
//! assert_eq!(principal.value, "steve");
//!
//! // the response carries the server's signature
//! let mut response = http::Response::new("hello");
//! request.extensions().get::<HawkAuth<String>>().unwrap().sign(&mut response);
//! assert!(response.headers().contains_key("server-authorization"));
//! ```
//!
//! ## Verifying a response on the client
//!
//! ```
//! use hawk_filter::{Credentials, Header, Key, RequestBuilder, RequestState, SHA256};
//! use std::str::FromStr;
//!
//! let credentials = Credentials {
//!     id: "me".to_string(),
//!     key: Key::new("tok", SHA256).unwrap(),
//! };
//! let request = RequestBuilder::new("GET", "localhost", 443, "/resource").request();
//! let state = RequestState::new().unwrap();
//! let header = request.make_header_full(&credentials, &state).unwrap();
//! assert!(header.header_value().starts_with("Hawk id=\"me\""));
//!
//! // with the server's reply in hand..
//! # let server_header = request
//! #     .make_response_builder(&state)
//! #     .response()
//! #     .make_header(&credentials.key)
//! #     .unwrap()
//! #     .header_value();
//! let server_header = Header::from_str(&server_header).unwrap();
//! let response = request.make_response_builder(&state).response();
//! assert!(response.validate_header(&server_header, &credentials.key));
//! ```
//!
//! # Features
//!
//! By default, the `use_ring` feature is enabled, which means that this crate will use `ring`
//! for all cryptographic operations.
//!
//! Alternatively, one can configure the crate with the `use_openssl` feature to use the
//! `openssl` crate.
//!
//! If no features are enabled, you must provide a custom implementation of the
//! [`crypto::Cryptographer`] trait to the `set_cryptographer` function, or the cryptographic
//! operations will panic.
//!
//! Attempting to configure both the `use_ring` and `use_openssl` features will result in a
//! build error.

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod header;
pub use crate::header::Header;

mod credentials;
pub use crate::credentials::{generate_id_key, Credentials, DigestAlgorithm, Key};

mod request;
pub use crate::request::{timestamp_in_window, Request, RequestBuilder, RequestState};

mod response;
pub use crate::response::{make_ts_challenge, sign_response, Response, ResponseBuilder};

mod error;
pub use crate::error::*;

mod payload;
pub use crate::payload::PayloadHasher;

mod bewit;
pub use crate::bewit::Bewit;

mod mac;
pub use crate::mac::{Mac, MacType};

mod sign;
pub use crate::sign::SignRequest;

mod resolver;
pub use crate::resolver::{resolve, CredentialStore, Resolution, ResolvedCredentials};

mod nonce;
pub use crate::nonce::{register_if_new, NonceStatus, NonceStore};

mod validator;
pub use crate::validator::{AuthContext, AuthMode, Outcome, Validator, DEFAULT_TS_SKEW};

mod filter;
pub use crate::filter::{
    AbortHandler, Failure, FilterOptions, HawkAuth, HawkFilter, Principal, DEFAULT_USER_PARAM,
    SERVER_AUTHORIZATION,
};

pub mod crypto;

pub const SHA256: DigestAlgorithm = DigestAlgorithm::Sha256;
pub const SHA384: DigestAlgorithm = DigestAlgorithm::Sha384;
pub const SHA512: DigestAlgorithm = DigestAlgorithm::Sha512;
