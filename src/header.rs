use crate::error::*;
use crate::mac::{unix_secs, Mac};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Representation of a Hawk `Authorization` or `Server-Authorization` header value.
///
/// All fields are optional, although a request header must carry `id`, `ts`, `nonce`, and
/// `mac` to be of any use.  A `Server-Authorization` header carries only `mac` and, optionally,
/// `ext` and `hash`.
///
/// Note that the `Display` format does not include the `"Hawk "` prefix; use `header_value`
/// for a complete value.
#[derive(Clone, PartialEq, Debug)]
pub struct Header {
    pub id: Option<String>,
    pub ts: Option<SystemTime>,
    pub nonce: Option<String>,
    pub mac: Option<Mac>,
    pub ext: Option<String>,
    pub hash: Option<Vec<u8>>,
    pub app: Option<String>,
    pub dlg: Option<String>,
}

impl Header {
    /// Create a new Header with the full set of Hawk fields.
    ///
    /// This is a low-level function.  None of the header components can contain the character
    /// `"`; an error is returned if any such characters appear.
    #[allow(clippy::too_many_arguments)]
    pub fn new<S>(
        id: Option<S>,
        ts: Option<SystemTime>,
        nonce: Option<S>,
        mac: Option<Mac>,
        ext: Option<S>,
        hash: Option<Vec<u8>>,
        app: Option<S>,
        dlg: Option<S>,
    ) -> Result<Header>
    where
        S: Into<String>,
    {
        Ok(Header {
            id: Header::check_component(id)?,
            ts,
            nonce: Header::check_component(nonce)?,
            mac,
            ext: Header::check_component(ext)?,
            hash,
            app: Header::check_component(app)?,
            dlg: Header::check_component(dlg)?,
        })
    }

    /// Check a header component for validity.
    fn check_component<S>(value: Option<S>) -> Result<Option<String>>
    where
        S: Into<String>,
    {
        match value {
            None => Ok(None),
            Some(value) => {
                let value = value.into();
                if value.contains('\"') {
                    return Err(Error::HeaderParseError(
                        "Hawk header components cannot contain `\"`".into(),
                    ));
                }
                Ok(Some(value))
            }
        }
    }

    /// Format the header for transmission in an Authorization header, including the `Hawk `
    /// prefix.
    pub fn header_value(&self) -> String {
        format!("Hawk {}", self)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        if let Some(ref id) = self.id {
            write_attr(f, &mut first, "id", id)?;
        }
        if let Some(ts) = self.ts {
            write_attr(f, &mut first, "ts", &unix_secs(ts))?;
        }
        if let Some(ref nonce) = self.nonce {
            write_attr(f, &mut first, "nonce", nonce)?;
        }
        if let Some(ref mac) = self.mac {
            write_attr(f, &mut first, "mac", &base64::encode(mac))?;
        }
        if let Some(ref ext) = self.ext {
            write_attr(f, &mut first, "ext", ext)?;
        }
        if let Some(ref hash) = self.hash {
            write_attr(f, &mut first, "hash", &base64::encode(hash))?;
        }
        if let Some(ref app) = self.app {
            write_attr(f, &mut first, "app", app)?;
        }
        if let Some(ref dlg) = self.dlg {
            write_attr(f, &mut first, "dlg", dlg)?;
        }
        Ok(())
    }
}

fn write_attr(
    f: &mut fmt::Formatter,
    first: &mut bool,
    name: &str,
    value: &dyn fmt::Display,
) -> fmt::Result {
    if !*first {
        f.write_str(", ")?;
    }
    *first = false;
    write!(f, "{}=\"{}\"", name, value)
}

fn parse_error<T>(msg: &str) -> Result<T> {
    Err(Error::HeaderParseError(msg.to_string()))
}

fn set_once<T>(slot: &mut Option<T>, value: T, attr: &str) -> Result<()> {
    if slot.is_some() {
        return parse_error(&format!("duplicate attribute `{}`", attr));
    }
    *slot = Some(value);
    Ok(())
}

impl FromStr for Header {
    type Err = Error;
    fn from_str(s: &str) -> Result<Header> {
        // the "Hawk " prefix is optional here, so that both full header values and the bare
        // attribute lists produced by `Display` can be parsed
        let mut p = s.trim_start();
        if p.get(..5).map_or(false, |pre| pre.eq_ignore_ascii_case("hawk ")) {
            p = &p[5..];
        }

        let mut id: Option<&str> = None;
        let mut ts: Option<SystemTime> = None;
        let mut nonce: Option<&str> = None;
        let mut mac: Option<Vec<u8>> = None;
        let mut ext: Option<&str> = None;
        let mut hash: Option<Vec<u8>> = None;
        let mut app: Option<&str> = None;
        let mut dlg: Option<&str> = None;

        loop {
            // Skip whitespace and commas used as separators
            p = p.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
            if p.is_empty() {
                break;
            }

            // Find first '=' which delimits attribute name from value
            let eq = match p.find('=') {
                Some(v) => v,
                None => return parse_error("attribute without value"),
            };
            let attr = p[..eq].trim();
            p = p[eq + 1..].trim_start();

            // Hawk does not allow escaped characters, so every value is a plain quoted string
            if !p.starts_with('"') {
                return parse_error("attribute value is not quoted");
            }
            p = &p[1..];
            let end = match p.find('"') {
                Some(v) => v,
                None => return parse_error("unterminated attribute value"),
            };
            let val = &p[..end];
            p = &p[end + 1..];

            match attr {
                "id" => set_once(&mut id, val, attr)?,
                "ts" => {
                    let invalid =
                        || Error::HeaderParseError(format!("invalid timestamp `{}`", val));
                    let secs = u64::from_str(val).map_err(|_| invalid())?;
                    let when = UNIX_EPOCH
                        .checked_add(Duration::from_secs(secs))
                        .ok_or_else(invalid)?;
                    set_once(&mut ts, when, attr)?
                }
                "nonce" => set_once(&mut nonce, val, attr)?,
                "mac" => set_once(&mut mac, base64::decode(val)?, attr)?,
                "ext" => set_once(&mut ext, val, attr)?,
                "hash" => set_once(&mut hash, base64::decode(val)?, attr)?,
                "app" => set_once(&mut app, val, attr)?,
                "dlg" => set_once(&mut dlg, val, attr)?,
                _ => return parse_error(&format!("unknown attribute `{}`", attr)),
            };
        }

        Header::new(id, ts, nonce, mac.map(Mac::from), ext, hash, app, dlg)
    }
}

impl TryFrom<&http::HeaderValue> for Header {
    type Error = Error;
    fn try_from(value: &http::HeaderValue) -> Result<Header> {
        let s = value
            .to_str()
            .map_err(|_| Error::HeaderParseError("header is not valid ASCII".to_string()))?;
        Header::from_str(s)
    }
}
