use crate::error::*;
use crate::mac::{unix_secs, Mac};
use std::borrow::Cow;
use std::str;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const BACKSLASH: u8 = b'\\';

/// A Bewit is a piece of data attached to a GET request that functions in place of a Hawk
/// Authentication header.  It contains an id, an expiration time, a MAC, and an optional `ext`
/// value.  These are available using accessor functions.
///
/// On the wire a bewit is the url-safe, unpadded base64 encoding of
/// `id\exp\mac\ext`; neither `id` nor `ext` may contain a backslash.
#[derive(Clone, Debug, PartialEq)]
pub struct Bewit<'a> {
    id: Cow<'a, str>,
    exp: SystemTime,
    mac: Cow<'a, Mac>,
    ext: Option<Cow<'a, str>>,
}

impl<'a> Bewit<'a> {
    /// Create a new Bewit with the given values.
    ///
    /// See Request.make_bewit for an easier way to make a Bewit
    pub fn new(id: &'a str, exp: SystemTime, mac: Mac, ext: Option<&'a str>) -> Result<Bewit<'a>> {
        if id.as_bytes().contains(&BACKSLASH) {
            return Err(InvalidBewit::Id.into());
        }
        if let Some(ext) = ext {
            if ext.as_bytes().contains(&BACKSLASH) {
                return Err(InvalidBewit::Ext.into());
            }
        }
        Ok(Bewit {
            id: Cow::Borrowed(id),
            exp,
            mac: Cow::Owned(mac),
            ext: ext.map(Cow::Borrowed),
        })
    }

    /// Extract the `bewit` query parameter, if any, from the path.  If the path contains no bewit,
    /// the return value is `Ok(None)` and the path is not modified. If the path contains a valid
    /// bewit, the path is modified and `Ok(Some(bewit))` returned.  If the path contains an
    /// invalid bewit, the Result is an Err.
    ///
    /// The remaining path is what the client signed: the bewit parameter is removed and the
    /// other query parameters keep their order.
    pub fn from_path(path: &mut Cow<'a, str>) -> Result<Option<Bewit<'a>>> {
        const PREFIX: &str = "bewit=";

        let (resource, query) = match path.find('?') {
            Some(i) => (&path[..i], &path[i + 1..]),
            None => return Ok(None),
        };

        let mut bewit_components: Vec<&str> = vec![];
        let components: Vec<&str> = query
            .split('&')
            .filter(|comp| {
                if comp.starts_with(PREFIX) {
                    bewit_components.push(*comp);
                    false
                } else {
                    true
                }
            })
            .collect();

        match bewit_components.len() {
            0 => Ok(None),
            1 => {
                let bewit = Bewit::from_str(&bewit_components[0][PREFIX.len()..])?;
                let stripped = if components.is_empty() {
                    resource.to_string()
                } else {
                    format!("{}?{}", resource, components.join("&"))
                };
                *path = Cow::Owned(stripped);
                Ok(Some(bewit))
            }
            _ => Err(InvalidBewit::Multiple.into()),
        }
    }

    /// Generate the fully-encoded string for this Bewit
    pub fn to_str(&self) -> String {
        let mac: &Mac = &self.mac;
        let raw = format!(
            "{}\\{}\\{}\\{}",
            self.id,
            unix_secs(self.exp),
            base64::encode(mac),
            self.ext().unwrap_or(""),
        );

        base64::encode_config(&raw, base64::URL_SAFE_NO_PAD)
    }

    /// Get the Bewit's client identifier
    pub fn id(&self) -> &str {
        self.id.as_ref()
    }

    /// Get the expiration time of the bewit
    pub fn exp(&self) -> SystemTime {
        self.exp
    }

    /// Get the MAC included in the Bewit
    pub fn mac(&self) -> &Mac {
        self.mac.as_ref()
    }

    /// Get the Bewit's `ext` field.
    pub fn ext(&self) -> Option<&str> {
        match self.ext {
            Some(ref cow) => Some(cow.as_ref()),
            None => None,
        }
    }

    /// True if the bewit has expired at time `now`.  There is no grace period: a bewit is
    /// usable up to and including the second of its expiration.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        unix_secs(self.exp) < unix_secs(now)
    }

    /// Convert into a bewit that owns all of its data.
    pub fn into_owned(self) -> Bewit<'static> {
        Bewit {
            id: Cow::Owned(self.id.into_owned()),
            exp: self.exp,
            mac: Cow::Owned(self.mac.into_owned()),
            ext: self.ext.map(|ext| Cow::Owned(ext.into_owned())),
        }
    }
}

impl<'a> FromStr for Bewit<'a> {
    type Err = Error;
    fn from_str(bewit: &str) -> Result<Bewit<'a>> {
        let bewit = base64::decode_config(bewit, base64::URL_SAFE_NO_PAD)?;

        let parts: Vec<&[u8]> = bewit.split(|c| *c == BACKSLASH).collect();
        if parts.len() != 4 {
            return Err(InvalidBewit::Format.into());
        }

        let id = String::from_utf8(parts[0].to_vec()).map_err(|_| InvalidBewit::Id)?;

        let exp = str::from_utf8(parts[1]).map_err(|_| InvalidBewit::Exp)?;
        let exp = u64::from_str(exp).map_err(|_| InvalidBewit::Exp)?;
        let exp = UNIX_EPOCH
            .checked_add(Duration::from_secs(exp))
            .ok_or(InvalidBewit::Exp)?;

        let mac = str::from_utf8(parts[2]).map_err(|_| InvalidBewit::Mac)?;
        let mac = Mac::from(base64::decode(mac).map_err(|_| InvalidBewit::Mac)?);

        let ext = match parts[3].len() {
            0 => None,
            _ => Some(Cow::Owned(
                String::from_utf8(parts[3].to_vec()).map_err(|_| InvalidBewit::Ext)?,
            )),
        };

        Ok(Bewit {
            id: Cow::Owned(id),
            exp,
            mac: Cow::Owned(mac),
            ext,
        })
    }
}
