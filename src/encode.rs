//! Base64 packaging for `data:` URIs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// Encode bytes with the standard alphabet and `=` padding.
///
/// The output is always `4 * ceil(n / 3)` characters; empty input yields an
/// empty string.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Build a `data:<mime>;base64,<payload>` URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    let encoded = encode(bytes);
    let mut uri = String::with_capacity("data:;base64,".len() + mime.len() + encoded.len());
    uri.push_str("data:");
    uri.push_str(mime);
    uri.push_str(";base64,");
    uri.push_str(&encoded);
    uri
}

/// Decode the payload of a base64 `data:` URI.
///
/// # Errors
/// Returns [`Error::InvalidDataUri`] if `uri` is not a base64 data URI and
/// [`Error::Base64`] if the payload does not decode.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::InvalidDataUri(preview(uri)))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::InvalidDataUri(preview(uri)))?;
    if !header.ends_with(";base64") {
        return Err(Error::InvalidDataUri(preview(uri)));
    }
    Ok(STANDARD.decode(payload)?)
}

fn preview(uri: &str) -> String {
    uri.chars().take(32).collect()
}
