use crate::bewit::Bewit;
use crate::credentials::{Credentials, Key};
use crate::crypto;
use crate::error::*;
use crate::header::Header;
use crate::mac::{Mac, MacType};
use crate::response::ResponseBuilder;
use std::borrow::Cow;
use std::time::{Duration, SystemTime};
use url::{Position, Url};

/// Request represents a single HTTP request.
///
/// The structure is created using (RequestBuilder)[struct.RequestBuilder.html]. Most uses of this
/// library will hold several of the fields in this structure fixed.  Cloning the structure with
/// these fields applied is a convenient way to avoid repeating those fields.  Most fields are
/// references, since in common use the values already exist and will outlive the request.
///
/// A request can be used on the client, to generate a header or a bewit, or on the server, to
/// validate the same.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    method: &'a str,
    host: &'a str,
    port: u16,
    path: Cow<'a, str>,
    hash: Option<&'a [u8]>,
    ext: Option<&'a str>,
    app: Option<&'a str>,
    dlg: Option<&'a str>,
}

impl<'a> Request<'a> {
    /// Create a new Header for this request, inventing a new nonce and setting the
    /// timestamp to the current time.
    pub fn make_header(&self, credentials: &Credentials) -> Result<Header> {
        self.make_header_full(credentials, &RequestState::new()?)
    }

    /// Similar to `make_header`, but allowing specification of the timestamp
    /// and nonce.
    pub fn make_header_full(&self, credentials: &Credentials, rs: &RequestState) -> Result<Header> {
        let mac = Mac::new(
            MacType::Header,
            &credentials.key,
            rs.ts,
            &rs.nonce,
            self.method,
            self.host,
            self.port,
            self.path.as_ref(),
            self.hash,
            self.ext,
            self.app,
            self.dlg,
        )?;
        Header::new(
            Some(credentials.id.as_str()),
            Some(rs.ts),
            Some(rs.nonce.as_str()),
            Some(mac),
            self.ext,
            self.hash.map(|h| h.to_vec()),
            self.app,
            self.dlg,
        )
    }

    /// Make a "bewit" that can be attached to a URL to authenticate GET access.
    ///
    /// The ttl gives the time for which this bewit is valid, starting now.
    pub fn make_bewit_with_ttl(
        &self,
        credentials: &'a Credentials,
        ttl: Duration,
    ) -> Result<Bewit<'a>> {
        self.make_bewit(credentials, SystemTime::now() + ttl)
    }

    /// Make a "bewit" that can be attached to a URL to authenticate GET access.
    ///
    /// The bewit is valid until `exp`, which may already be in the past.
    pub fn make_bewit(&self, credentials: &'a Credentials, exp: SystemTime) -> Result<Bewit<'a>> {
        // note that this includes `method` and `hash` even though they must always be GET and None
        // for bewits.  If they aren't, then the bewit just won't validate -- no need to catch
        // that now
        let mac = Mac::new(
            MacType::Bewit,
            &credentials.key,
            exp,
            "",
            self.method,
            self.host,
            self.port,
            self.path.as_ref(),
            self.hash,
            self.ext,
            None,
            None,
        )?;
        Bewit::new(&credentials.id, exp, mac, self.ext)
    }

    /// Check the MAC of a request header against this request, using the given key.  The `ts`,
    /// `nonce`, `hash`, `ext`, `app` and `dlg` fields come from the header itself, since those
    /// are what the client signed.
    ///
    /// If a hash has been supplied to this request (computed locally from the payload), the
    /// header must carry the same hash.
    ///
    /// This does not check the timestamp or the nonce.
    pub fn check_header_mac(&self, header: &Header, key: &Key) -> bool {
        let (ts, nonce, header_mac) = match (&header.ts, &header.nonce, &header.mac) {
            (Some(ts), Some(nonce), Some(mac)) => (ts, nonce, mac),
            _ => return false,
        };

        let calculated_mac = match Mac::new(
            MacType::Header,
            key,
            *ts,
            nonce,
            self.method,
            self.host,
            self.port,
            self.path.as_ref(),
            header.hash.as_ref().map(|h| &h[..]),
            header.ext.as_ref().map(|e| &e[..]),
            header.app.as_ref().map(|a| &a[..]),
            header.dlg.as_ref().map(|d| &d[..]),
        ) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        if &calculated_mac != header_mac {
            return false;
        }

        if let Some(local_hash) = self.hash {
            match header.hash {
                Some(ref server_hash) if &server_hash[..] == local_hash => {}
                _ => return false,
            }
        }

        true
    }

    /// Validate the given header.  This validates that the `mac` field matches that calculated
    /// using the other header fields and the given request information, and that the timestamp
    /// is within `ts_skew` of the current time.
    ///
    /// This method does not check the nonce; a server must consult its nonce store separately.
    pub fn validate_header(&self, header: &Header, key: &Key, ts_skew: Duration) -> bool {
        match header.ts {
            Some(ts) => {
                self.check_header_mac(header, key)
                    && timestamp_in_window(ts, SystemTime::now(), ts_skew)
            }
            None => false,
        }
    }

    /// Check the MAC of the given bewit against this request.  A bewit is signed with an empty
    /// nonce, its expiration time in place of a timestamp, and no payload hash.
    pub fn check_bewit_mac(&self, bewit: &Bewit, key: &Key) -> bool {
        match Mac::new(
            MacType::Bewit,
            key,
            bewit.exp(),
            "",
            self.method,
            self.host,
            self.port,
            self.path.as_ref(),
            None,
            bewit.ext(),
            None,
            None,
        ) {
            Ok(calculated_mac) => &calculated_mac == bewit.mac(),
            Err(_) => false,
        }
    }

    /// Validate the given Bewit matches this request and has not expired.
    ///
    /// Bewits are only valid for GET requests; the caller is responsible for checking the method.
    pub fn validate_bewit(&self, bewit: &Bewit, key: &Key) -> bool {
        self.check_bewit_mac(bewit, key) && !bewit.is_expired(SystemTime::now())
    }

    /// Get a Response instance for a response to this request.  This is a convenience
    /// wrapper around `ResponseBuilder::from_request_state` that carries over `app` and `dlg`.
    pub fn make_response_builder(&'a self, reqstate: &'a RequestState) -> ResponseBuilder<'a> {
        ResponseBuilder::from_request_state(
            reqstate,
            self.method,
            self.host,
            self.port,
            self.path.as_ref(),
        )
        .app(self.app)
        .dlg(self.dlg)
    }

    /// The request path, after any bewit has been extracted.
    pub fn path(&self) -> &str {
        self.path.as_ref()
    }
}

/// True if `ts` is no further than `skew` from `now`, in either direction.
pub fn timestamp_in_window(ts: SystemTime, now: SystemTime, skew: Duration) -> bool {
    let diff = match now.duration_since(ts) {
        Ok(d) => d,
        Err(e) => e.duration(),
    };
    diff <= skew
}

#[derive(Debug, Clone)]
pub struct RequestBuilder<'a>(Request<'a>);

impl<'a> RequestBuilder<'a> {
    /// Create a new request with the given method, host, port, and path.
    pub fn new(method: &'a str, host: &'a str, port: u16, path: &'a str) -> Self {
        RequestBuilder(Request {
            method,
            host,
            port,
            path: Cow::Borrowed(path),
            hash: None,
            ext: None,
            app: None,
            dlg: None,
        })
    }

    /// Create a new request with the host, port, and path determined from the URL.
    pub fn from_url(method: &'a str, url: &'a Url) -> Result<Self> {
        let (host, port, path) = RequestBuilder::parse_url(url)?;
        Ok(RequestBuilder(Request {
            method,
            host,
            port,
            path: Cow::Borrowed(path),
            hash: None,
            ext: None,
            app: None,
            dlg: None,
        }))
    }

    /// Set the request method. This should be a capitalized string.
    pub fn method(mut self, method: &'a str) -> Self {
        self.0.method = method;
        self
    }

    /// Set the URL path for the request.
    pub fn path(mut self, path: &'a str) -> Self {
        self.0.path = Cow::Borrowed(path);
        self
    }

    /// Set the URL hostname for the request
    pub fn host(mut self, host: &'a str) -> Self {
        self.0.host = host;
        self
    }

    /// Set the URL port for the request
    pub fn port(mut self, port: u16) -> Self {
        self.0.port = port;
        self
    }

    /// Set the hostname, port, and path for the request, from a string URL.
    pub fn url(self, url: &'a Url) -> Result<Self> {
        let (host, port, path) = RequestBuilder::parse_url(url)?;
        Ok(self.path(path).host(host).port(port))
    }

    /// Set the content hash for the request
    pub fn hash<H: Into<Option<&'a [u8]>>>(mut self, hash: H) -> Self {
        self.0.hash = hash.into();
        self
    }

    /// Set the `ext` Hawk property for the request
    pub fn ext<S: Into<Option<&'a str>>>(mut self, ext: S) -> Self {
        self.0.ext = ext.into();
        self
    }

    /// Set the `app` Hawk property for the request
    pub fn app<S: Into<Option<&'a str>>>(mut self, app: S) -> Self {
        self.0.app = app.into();
        self
    }

    /// Set the `dlg` Hawk property for the request
    pub fn dlg<S: Into<Option<&'a str>>>(mut self, dlg: S) -> Self {
        self.0.dlg = dlg.into();
        self
    }

    /// Extract any `bewit` query parameter from the path, leaving the path as the client signed
    /// it.  The bewit, if any, is placed in `bewit`.
    pub fn extract_bewit(mut self, bewit: &mut Option<Bewit<'a>>) -> Result<Self> {
        *bewit = Bewit::from_path(&mut self.0.path)?;
        Ok(self)
    }

    /// Get the request from this builder
    pub fn request(self) -> Request<'a> {
        self.0
    }

    fn parse_url(url: &'a Url) -> Result<(&'a str, u16, &'a str)> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("url {} has no host", url)))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::InvalidUrl(format!("url {} has no port", url)))?;
        let path = &url[Position::BeforePath..Position::AfterQuery];
        Ok((host, port, path))
    }
}

/// The per-request state a client generates: a timestamp and a nonce.  The same values are
/// needed later to validate the `Server-Authorization` header of the response.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState {
    pub ts: SystemTime,
    pub nonce: String,
}

impl RequestState {
    /// Create a new RequestState with the current time and a fresh random nonce.
    pub fn new() -> Result<Self> {
        Ok(RequestState {
            ts: SystemTime::now(),
            nonce: random_string(10)?,
        })
    }
}

/// Create a random string with `bytes` bytes of entropy.  The string
/// is base64-encoded, so it will be longer than bytes characters.
fn random_string(bytes: usize) -> Result<String> {
    let mut bytes = vec![0u8; bytes];
    crypto::get_crypographer().rand_bytes(&mut bytes)?;
    Ok(base64::encode(&bytes))
}
