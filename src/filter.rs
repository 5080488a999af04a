//! A request filter for `http` servers.
//!
//! `HawkFilter::filter` takes an inbound `http::Request` and either hands it back, with the
//! authentication result attached to its extensions, or returns the response with which to
//! abort the request.
//!
//! Rejections become `401 Unauthorized` responses carrying the rejection text and, when the
//! client's credentials were resolved, a `Server-Authorization` header so the client can verify
//! that the rejection is genuine.  Malformed requests and store failures become `500 Internal
//! Server Error` with a generic body and no signature.

use crate::error::*;
use crate::nonce::NonceStore;
use crate::resolver::CredentialStore;
use crate::response::{make_ts_challenge, sign_response};
use crate::validator::{AuthContext, Outcome, Validator, DEFAULT_TS_SKEW};
use http::header::{HeaderName, HeaderValue, AUTHORIZATION, HOST, WWW_AUTHENTICATE};
use http::request::Parts;
use http::uri::Authority;
use http::{Request, Response, StatusCode};
use log::{debug, error};
use std::fmt;
use std::time::{Duration, SystemTime};

/// The response header carrying the server's signature.
pub const SERVER_AUTHORIZATION: &str = "server-authorization";

/// The default name under which the principal is attached to a request.
pub const DEFAULT_USER_PARAM: &str = "hawk_user";

/// Why a request is being aborted, as seen by an abort handler.
#[derive(Debug)]
pub enum Failure<'a> {
    Rejected(Rejection),
    Errored(&'a Error),
}

impl<'a> Failure<'a> {
    /// The status the default handler responds with.
    pub fn status(&self) -> StatusCode {
        match self {
            Failure::Rejected(_) => StatusCode::UNAUTHORIZED,
            Failure::Errored(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<'a> fmt::Display for Failure<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Failure::Rejected(r) => write!(f, "{}", r),
            Failure::Errored(e) => write!(f, "{}", e),
        }
    }
}

pub type AbortHandler =
    Box<dyn Fn(&mut Parts, Failure<'_>) -> Response<String> + Send + Sync + 'static>;

/// Configuration for a `HawkFilter`.
pub struct FilterOptions {
    /// The name recorded in the `Principal` extension.  If empty, no `Principal` is attached.
    pub user_param: String,
    /// Sent as `ext` in every `Server-Authorization` header.
    pub ext: Option<String>,
    pub ts_skew: Duration,
    /// The host the client signed, when it differs from what the server sees (behind a proxy,
    /// for example).
    pub host: Option<String>,
    pub port: Option<u16>,
    abort_handler: Option<AbortHandler>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            user_param: DEFAULT_USER_PARAM.to_string(),
            ext: None,
            ts_skew: DEFAULT_TS_SKEW,
            host: None,
            port: None,
            abort_handler: None,
        }
    }
}

impl fmt::Debug for FilterOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FilterOptions")
            .field("user_param", &self.user_param)
            .field("ext", &self.ext)
            .field("ts_skew", &self.ts_skew)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("abort_handler", &self.abort_handler.is_some())
            .finish()
    }
}

impl FilterOptions {
    pub fn user_param<S: Into<String>>(mut self, user_param: S) -> Self {
        self.user_param = user_param.into();
        self
    }

    pub fn ext<S: Into<String>>(mut self, ext: S) -> Self {
        self.ext = Some(ext.into());
        self
    }

    pub fn ts_skew(mut self, ts_skew: Duration) -> Self {
        self.ts_skew = ts_skew;
        self
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Replace the default abort response.  The `Server-Authorization` and `WWW-Authenticate`
    /// headers, where applicable, are added to whatever the handler returns.
    pub fn abort_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Parts, Failure<'_>) -> Response<String> + Send + Sync + 'static,
    {
        self.abort_handler = Some(Box::new(handler));
        self
    }
}

/// The authentication result attached to the extensions of every request that passes the
/// filter.
#[derive(Debug)]
pub struct HawkAuth<P> {
    pub context: AuthContext<P>,
    /// The signed `Server-Authorization` value for a response without a payload hash.
    pub server_authorization: HeaderValue,
}

impl<P> HawkAuth<P> {
    /// Add the `Server-Authorization` header to the response for this request.
    pub fn sign<B>(&self, response: &mut Response<B>) {
        response.headers_mut().insert(
            HeaderName::from_static(SERVER_AUTHORIZATION),
            self.server_authorization.clone(),
        );
    }
}

/// The principal of an authenticated request, attached to its extensions under the configured
/// `user_param` name.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal<P> {
    pub key: String,
    pub value: P,
}

/// Hawk authentication for `http` requests.
pub struct HawkFilter<C, N> {
    validator: Validator<C, N>,
    options: FilterOptions,
}

impl<C, N> HawkFilter<C, N>
where
    C: CredentialStore,
    C::Principal: Clone + Send + Sync + 'static,
    N: NonceStore,
{
    pub fn new(credentials: C, nonces: N) -> Self {
        HawkFilter::with_options(credentials, nonces, FilterOptions::default())
    }

    pub fn with_options(credentials: C, nonces: N, options: FilterOptions) -> Self {
        HawkFilter {
            validator: Validator::new(credentials, nonces).ts_skew(options.ts_skew),
            options,
        }
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Authenticate a request.  On success the request is returned with `HawkAuth` and, unless
    /// `user_param` is empty, `Principal` in its extensions.  Otherwise the abort response is
    /// returned.
    pub fn filter<B>(&self, request: Request<B>) -> std::result::Result<Request<B>, Response<String>> {
        let (mut parts, body) = request.into_parts();
        match self.authenticate(&parts) {
            Outcome::Authenticated(context) => {
                let server_authorization = match self.server_authorization(&context) {
                    Ok(value) => value,
                    Err(e) => return Err(self.errored(&mut parts, &e)),
                };
                debug!("Hawk authenticated id {:?}", context.id());
                if !self.options.user_param.is_empty() {
                    parts.extensions.insert(Principal {
                        key: self.options.user_param.clone(),
                        value: context.principal.clone(),
                    });
                }
                parts.extensions.insert(HawkAuth {
                    context,
                    server_authorization,
                });
                Ok(Request::from_parts(parts, body))
            }
            Outcome::Rejected(rejection, context) => {
                debug!("Hawk rejected request: {}", rejection);
                let mut headers = vec![];
                if let Some(context) = context {
                    match self.server_authorization(&context) {
                        Ok(value) => {
                            headers.push((HeaderName::from_static(SERVER_AUTHORIZATION), value))
                        }
                        Err(e) => error!("could not sign Hawk rejection: {}", e),
                    }
                    if rejection == Rejection::TimestampSkew {
                        match make_ts_challenge(&context.credentials.key, SystemTime::now())
                            .and_then(|c| Ok(HeaderValue::from_str(&c)?))
                        {
                            Ok(value) => headers.push((WWW_AUTHENTICATE, value)),
                            Err(e) => error!("could not build Hawk timestamp challenge: {}", e),
                        }
                    }
                }
                Err(self.abort(&mut parts, Failure::Rejected(rejection), headers))
            }
            Outcome::Errored(e) => Err(self.errored(&mut parts, &e)),
        }
    }

    /// Run the validator against the request head without producing a response.
    pub fn authenticate(&self, parts: &Parts) -> Outcome<C::Principal> {
        let (host, port) = match self.host_port(parts) {
            Ok(host_port) => host_port,
            Err(e) => return Outcome::Errored(e),
        };
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let authorization = match parts.headers.get(AUTHORIZATION) {
            Some(value) => match value.to_str() {
                Ok(value) => Some(value),
                Err(_) => {
                    return Outcome::Errored(Error::HeaderParseError(
                        "header is not valid ASCII".to_string(),
                    ))
                }
            },
            None => None,
        };
        self.validator
            .validate(parts.method.as_str(), &host, port, path, authorization)
    }

    /// The host and port the client signed: the configured overrides, else the request URI's
    /// authority, else the `Host` header.  A missing port defaults from the URI scheme.
    fn host_port(&self, parts: &Parts) -> Result<(String, u16)> {
        let (seen_host, seen_port) = match parts.uri.authority() {
            Some(authority) => (authority.host().to_string(), authority.port_u16()),
            None => match parts.headers.get(HOST) {
                Some(value) => {
                    let authority: Authority = value
                        .to_str()
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| Error::InvalidUrl("invalid Host header".to_string()))?;
                    (authority.host().to_string(), authority.port_u16())
                }
                None => (String::new(), None),
            },
        };

        let host = match self.options.host {
            Some(ref host) => host.clone(),
            None if seen_host.is_empty() => {
                return Err(Error::InvalidUrl("request has no host".to_string()))
            }
            None => seen_host,
        };
        let port = self.options.port.or(seen_port).unwrap_or_else(|| {
            match parts.uri.scheme_str() {
                Some("https") => 443,
                _ => 80,
            }
        });
        Ok((host, port))
    }

    fn server_authorization(&self, context: &AuthContext<C::Principal>) -> Result<HeaderValue> {
        let header = sign_response(context, self.options.ext.as_ref().map(|e| &e[..]), None)?;
        Ok(HeaderValue::from_str(&header.header_value())?)
    }

    fn errored(&self, parts: &mut Parts, e: &Error) -> Response<String> {
        if e.is_malformed_input() {
            debug!("malformed Hawk request: {}", e);
        } else {
            error!("Hawk authentication failed: {}", e);
        }
        self.abort(parts, Failure::Errored(e), vec![])
    }

    fn abort(
        &self,
        parts: &mut Parts,
        failure: Failure<'_>,
        headers: Vec<(HeaderName, HeaderValue)>,
    ) -> Response<String> {
        let mut response = match self.options.abort_handler {
            Some(ref handler) => handler(parts, failure),
            None => default_abort(failure),
        };
        for (name, value) in headers {
            response.headers_mut().insert(name, value);
        }
        response
    }
}

/// The rejection text for a 401, a generic body for a 500.
fn default_abort(failure: Failure<'_>) -> Response<String> {
    let body = match failure {
        Failure::Rejected(ref rejection) => rejection.to_string(),
        Failure::Errored(_) => "Internal Server Error".to_string(),
    };
    let mut response = Response::new(body);
    *response.status_mut() = failure.status();
    response
}
