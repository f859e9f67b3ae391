//! Minimal URL query helpers
//!
//! The values we place into authorization URLs (scopes, https URIs, base64url
//! tokens) only contain a handful of characters that would break parameter
//! parsing, so encoding is intentionally minimal rather than a full RFC 3986
//! implementation. Decoding accepts arbitrary percent escapes because the
//! callback query is produced by the authorization server.

/// Minimal URL encoding for parameter values.
/// Only encodes characters that would break URL parameter parsing.
pub fn encode_component(s: &str) -> String {
    s.replace('%', "%25")
        .replace(' ', "%20")
        .replace(':', "%3A")
        .replace('/', "%2F")
        .replace('&', "%26")
        .replace('=', "%3D")
        .replace('?', "%3F")
        .replace('#', "%23")
        .replace('+', "%2B")
}

/// Decode percent escapes and `+` in a query component.
fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3);
                match hex.and_then(|h| u8::from_str_radix(std::str::from_utf8(h).ok()?, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Extract a named parameter from a raw query string (no leading `?`).
///
/// Returns the decoded value of the first occurrence, or `None` if the
/// parameter is absent. An empty value (`state=`) decodes to `Some("")`.
pub fn query_param(query: &str, name: &str) -> Option<String> {
    for pair in query.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        if key == name {
            return Some(decode_component(value));
        }
    }
    None
}
