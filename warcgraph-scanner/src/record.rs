use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header carrying the captured page's address.
pub const TARGET_URI_HEADER: &str = "WARC-Target-URI";

/// One archived capture as handed over by the archive reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub target_uri: Option<String>,
    pub payload: Vec<u8>,
    pub headers: BTreeMap<String, String>,
}

impl CaptureRecord {
    pub fn new(target_uri: Option<String>, payload: Vec<u8>) -> Self {
        Self {
            target_uri,
            payload,
            headers: BTreeMap::new(),
        }
    }

    /// Builds a record from raw WARC header fields, picking the target URI
    /// out of them.
    pub fn from_headers(headers: BTreeMap<String, String>, payload: Vec<u8>) -> Self {
        let target_uri = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(TARGET_URI_HEADER))
            .map(|(_, value)| value.clone());

        Self {
            target_uri,
            payload,
            headers,
        }
    }

    /// Value of `WARC-Type` (`response`, `request`, `warcinfo`, ...).
    pub fn record_type(&self) -> Option<&str> {
        self.header("WARC-Type")
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
