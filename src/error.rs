use crate::crypto::CryptoError;
use failure::Fail;

pub type Result<T> = std::result::Result<T, Error>;

/// The result type of the application-supplied credential and nonce stores.
pub type StoreResult<T> = std::result::Result<T, failure::Error>;

#[derive(Fail, Debug)]
pub enum Error {
    #[fail(display = "Unparseable Hawk header: {}", _0)]
    HeaderParseError(String),

    #[fail(display = "Invalid url: {}", _0)]
    InvalidUrl(String),

    #[fail(display = "Missing `{}` attribute in Hawk header", _0)]
    MissingAttribute(&'static str),

    #[fail(display = "Hawk keys must not be empty")]
    EmptyKey,

    #[fail(display = "{}", _0)]
    InvalidBewit(#[fail(cause)] InvalidBewit),

    #[fail(display = "{}", _0)]
    Io(#[fail(cause)] std::io::Error),

    #[fail(display = "Base64 Decode error: {}", _0)]
    Decode(#[fail(cause)] base64::DecodeError),

    #[fail(display = "Crypto error: {}", _0)]
    Crypto(#[fail(cause)] CryptoError),

    #[fail(display = "Credential lookup failed: {}", _0)]
    CredentialStore(failure::Error),

    #[fail(display = "Nonce registration failed: {}", _0)]
    NonceStore(failure::Error),

    #[fail(display = "{}", _0)]
    Http(#[fail(cause)] http::Error),
}

impl Error {
    /// True for errors caused by malformed client input (an unparseable header or bewit),
    /// as opposed to failures of the server's own infrastructure.
    pub fn is_malformed_input(&self) -> bool {
        match self {
            Error::HeaderParseError(_)
            | Error::MissingAttribute(_)
            | Error::InvalidBewit(_)
            | Error::Decode(_) => true,
            _ => false,
        }
    }
}

#[derive(Fail, Debug, PartialEq)]
pub enum InvalidBewit {
    #[fail(display = "Multiple bewits in URL")]
    Multiple,
    #[fail(display = "Invalid bewit format")]
    Format,
    #[fail(display = "Invalid bewit id")]
    Id,
    #[fail(display = "Invalid bewit exp")]
    Exp,
    #[fail(display = "Invalid bewit mac")]
    Mac,
    #[fail(display = "Invalid bewit ext")]
    Ext,
}

/// The protocol-level reasons a request can be refused.  These are the failures an attacker (or
/// a misconfigured client) can provoke; each maps to `401 Unauthorized`.
#[derive(Fail, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[fail(display = "Missing Hawk authorization")]
    NoAuth,
    #[fail(display = "Credentials not found")]
    NotFound,
    #[fail(display = "Invalid MAC")]
    InvalidMac,
    #[fail(display = "Stale timestamp")]
    TimestampSkew,
    #[fail(display = "Replayed request")]
    Replay,
    #[fail(display = "Bewit expired")]
    BewitExpired,
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        Error::Crypto(e)
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Error::Http(e.into())
    }
}

impl From<InvalidBewit> for Error {
    fn from(e: InvalidBewit) -> Self {
        Error::InvalidBewit(e)
    }
}
