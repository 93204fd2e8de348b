//! RFC 6901 JSON Pointer helpers used when reporting key locations

/// Escape a string for use as a JSON Pointer token
///
/// - '~' → '~0'
/// - '/' → '~1'
pub fn escape_pointer_token(token: &str) -> String {
    // Must escape ~ before / to avoid incorrect escaping
    token.replace('~', "~0").replace('/', "~1")
}

/// Append `/token` (escaped) to an existing pointer
pub fn push_pointer_token(pointer: &mut String, token: &str) {
    pointer.push('/');
    if token.contains(['~', '/']) {
        pointer.push_str(&escape_pointer_token(token));
    } else {
        pointer.push_str(token);
    }
}
