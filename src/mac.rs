//! Computation of Hawk MACs over the protocol's canonical strings.

use crate::credentials::Key;
use crate::crypto;
use crate::error::*;
use std::io::Write;
use std::ops::Deref;
use std::time::{SystemTime, UNIX_EPOCH};

/// The kind of MAC to calculate.  This selects the marker on the first line of the canonical
/// string (`hawk.1.header`, `hawk.1.response`, or `hawk.1.bewit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacType {
    Header,
    Response,
    Bewit,
}

impl MacType {
    fn marker(self) -> &'static str {
        match self {
            MacType::Header => "hawk.1.header",
            MacType::Response => "hawk.1.response",
            MacType::Bewit => "hawk.1.bewit",
        }
    }
}

/// Mac represents a message authentication code, the signature in a Hawk transaction.
///
/// This class supports creating Macs using the Hawk specification, and comparing Macs
/// using a constant-time comparison (thus preventing timing side-channel attacks).
#[derive(Debug, Clone)]
pub struct Mac(Vec<u8>);

impl Mac {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mac_type: MacType,
        key: &Key,
        ts: SystemTime,
        nonce: &str,
        method: &str,
        host: &str,
        port: u16,
        path: &str,
        hash: Option<&[u8]>,
        ext: Option<&str>,
        app: Option<&str>,
        dlg: Option<&str>,
    ) -> Result<Mac> {
        let mut buffer: Vec<u8> = vec![];

        writeln!(buffer, "{}", mac_type.marker())?;
        writeln!(buffer, "{}", unix_secs(ts))?;
        writeln!(buffer, "{}", nonce)?;
        writeln!(buffer, "{}", method)?;
        writeln!(buffer, "{}", path)?;
        writeln!(buffer, "{}", host)?;
        writeln!(buffer, "{}", port)?;

        match hash {
            Some(h) => writeln!(buffer, "{}", base64::encode(h))?,
            None => writeln!(buffer)?,
        }

        match ext {
            Some(e) => writeln!(buffer, "{}", escape_ext(e))?,
            None => writeln!(buffer)?,
        }

        // `dlg` is only signed alongside an `app`
        if let Some(app) = app {
            writeln!(buffer, "{}", app)?;
            writeln!(buffer, "{}", dlg.unwrap_or(""))?;
        }

        Ok(Mac(key.sign(buffer.as_ref())?))
    }

    /// Calculate the `tsm` value sent alongside a server timestamp when a request is refused
    /// for clock skew.
    pub fn timestamp(key: &Key, ts: SystemTime) -> Result<Mac> {
        let mut buffer: Vec<u8> = vec![];
        writeln!(buffer, "hawk.1.ts")?;
        writeln!(buffer, "{}", unix_secs(ts))?;
        Ok(Mac(key.sign(buffer.as_ref())?))
    }
}

/// Seconds since the epoch; times before the epoch are clamped to zero.
pub(crate) fn unix_secs(ts: SystemTime) -> u64 {
    ts.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

// Backslashes and newlines in `ext` would otherwise make the canonical string ambiguous.
fn escape_ext(ext: &str) -> String {
    ext.replace('\\', "\\\\").replace('\n', "\\n")
}

impl AsRef<[u8]> for Mac {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl From<Vec<u8>> for Mac {
    fn from(original: Vec<u8>) -> Self {
        Mac(original)
    }
}

impl Deref for Mac {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl PartialEq for Mac {
    fn eq(&self, other: &Mac) -> bool {
        crypto::get_crypographer().constant_time_compare(&self.0, &other.0)
    }
}
