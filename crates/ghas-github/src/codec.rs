use std::io::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::write::GzEncoder;
use flate2::Compression;

use ghas_platform::{PlatformError, PlatformResult};

/// Contents API payloads are base64 with embedded newlines.
pub fn decode_content(encoded: &str) -> PlatformResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| PlatformError::malformed("contents", e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PlatformError::malformed("contents", e.to_string()))
}

pub fn encode_content(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// SARIF uploads must be gzip-compressed, then base64-encoded.
pub fn encode_sarif(sarif: &[u8]) -> PlatformResult<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(sarif)
        .map_err(|e| PlatformError::malformed("sarif", e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| PlatformError::malformed("sarif", e.to_string()))?;
    Ok(STANDARD.encode(compressed))
}

/// Percent-encodes a query or path component.
pub fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
