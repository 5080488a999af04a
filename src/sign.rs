use crate::credentials::Credentials;
use crate::error::*;
use crate::request::{RequestBuilder, RequestState};
use http::header::AUTHORIZATION;
use http::request::Builder;
use std::time::SystemTime;

/// Client-side signing of `http` requests.
pub trait SignRequest: Sized {
    /// Add an `Authorization` header signing this request with the given credentials, timestamp,
    /// and nonce.  The same `RequestState` validates the server's response.
    fn sign_hawk(
        self,
        credentials: &Credentials,
        rs: &RequestState,
        hash: Option<&[u8]>,
        ext: Option<&str>,
    ) -> Result<Self>;

    /// Append a `bewit` query parameter, valid until `exp`, to this request's URI.  Only GET
    /// requests can be authenticated this way.
    fn sign_hawk_bewit(
        self,
        credentials: &Credentials,
        exp: SystemTime,
        ext: Option<&str>,
    ) -> Result<Self>;
}

impl SignRequest for Builder {
    fn sign_hawk(
        self,
        credentials: &Credentials,
        rs: &RequestState,
        hash: Option<&[u8]>,
        ext: Option<&str>,
    ) -> Result<Self> {
        let value = {
            let (method, host, port, path) = request_target(&self)?;
            RequestBuilder::new(method, host, port, path)
                .hash(hash)
                .ext(ext)
                .request()
                .make_header_full(credentials, rs)?
                .header_value()
        };
        Ok(self.header(AUTHORIZATION, value))
    }

    fn sign_hawk_bewit(
        self,
        credentials: &Credentials,
        exp: SystemTime,
        ext: Option<&str>,
    ) -> Result<Self> {
        let uri = {
            let (method, host, port, path) = request_target(&self)?;
            let bewit = RequestBuilder::new(method, host, port, path)
                .ext(ext)
                .request()
                .make_bewit(credentials, exp)?;
            let sep = if path.contains('?') { '&' } else { '?' };
            // reuse the authority as written, keeping IPv6 brackets and an absent port
            let uri = self
                .uri_ref()
                .ok_or_else(|| Error::InvalidUrl("request has no uri".to_string()))?;
            let authority = uri.authority().map(|a| a.as_str()).unwrap_or(host);
            format!(
                "{}://{}{}{}bewit={}",
                uri.scheme_str().unwrap_or("http"),
                authority,
                path,
                sep,
                bewit.to_str()
            )
        };
        Ok(self.uri(uri))
    }
}

fn request_target(builder: &Builder) -> Result<(&str, &str, u16, &str)> {
    let method = builder
        .method_ref()
        .ok_or_else(|| Error::InvalidUrl("request has no method".to_string()))?
        .as_str();
    let uri = builder
        .uri_ref()
        .ok_or_else(|| Error::InvalidUrl("request has no uri".to_string()))?;
    let host = uri
        .host()
        .ok_or_else(|| Error::InvalidUrl(format!("uri {} has no host", uri)))?;
    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("https") => 443,
        _ => 80,
    });
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Ok((method, host, port, path))
}

#[cfg(all(test, any(feature = "use_ring", feature = "use_openssl")))]
mod test {
    use super::*;
    use crate::credentials::Key;
    use crate::header::Header;
    use std::convert::TryFrom;
    use std::time::{Duration, UNIX_EPOCH};

    fn credentials() -> Credentials {
        Credentials {
            id: "me".to_string(),
            key: Key::new("tok", crate::SHA256).unwrap(),
        }
    }

    #[test]
    fn test_sign_hawk() {
        let rs = RequestState {
            ts: UNIX_EPOCH + Duration::new(1353832234, 0),
            nonce: "j4h3g2".to_string(),
        };
        let req = http::Request::get("https://example.com/foo")
            .sign_hawk(&credentials(), &rs, None, None)
            .unwrap()
            .body(())
            .unwrap();
        let header = Header::try_from(req.headers().get(AUTHORIZATION).unwrap()).unwrap();
        assert_eq!(header.id, Some("me".to_string()));
        assert_eq!(header.nonce, Some("j4h3g2".to_string()));

        let expected = RequestBuilder::new("GET", "example.com", 443, "/foo")
            .request()
            .make_header_full(&credentials(), &rs)
            .unwrap();
        assert_eq!(header, expected);
    }

    #[test]
    fn test_sign_hawk_no_host() {
        let rs = RequestState::new().unwrap();
        assert!(http::Request::get("/foo")
            .sign_hawk(&credentials(), &rs, None, None)
            .is_err());
    }

    #[test]
    fn test_sign_hawk_bewit() {
        let exp = UNIX_EPOCH + Duration::new(1353832234, 0);
        let req = http::Request::get("http://example.com:8080/foo?x=1")
            .sign_hawk_bewit(&credentials(), exp, None)
            .unwrap()
            .body(())
            .unwrap();
        let pq = req.uri().path_and_query().unwrap().as_str();
        assert!(pq.starts_with("/foo?x=1&bewit="));
        assert_eq!(req.uri().port_u16(), Some(8080));
    }

    #[test]
    fn test_sign_hawk_bewit_keeps_authority() {
        let exp = UNIX_EPOCH + Duration::new(1353832234, 0);
        let req = http::Request::get("https://example.com/foo")
            .sign_hawk_bewit(&credentials(), exp, None)
            .unwrap()
            .body(())
            .unwrap();
        assert_eq!(req.uri().authority().unwrap().as_str(), "example.com");
        assert_eq!(req.uri().port_u16(), None);
        assert_eq!(req.uri().scheme_str(), Some("https"));

        let req = http::Request::get("http://[::1]:8080/foo")
            .sign_hawk_bewit(&credentials(), exp, None)
            .unwrap()
            .body(())
            .unwrap();
        assert_eq!(req.uri().authority().unwrap().as_str(), "[::1]:8080");
        assert!(req.uri().path_and_query().unwrap().as_str().starts_with("/foo?bewit="));
    }
}
