//! Index-based token splitting.
//!
//! Queue entries (`PUT:<dev>.<ch>.<dp>:<value>`) and push datapoint keys
//! (`<dev>/<ch>/<dp>`) are both taken apart with [`token`]. A run of
//! consecutive separators counts as a single boundary, so `"a::b"` has two
//! tokens, not three. A leading separator still yields an empty first token.

/// Return the `index`-th token of `from`, split on `separator`.
///
/// ```rust
/// use libfah::hub::token::token;
///
/// assert_eq!(token("GET:dev.ch.dp", 0, ':'), Some("GET"));
/// assert_eq!(token("GET:dev.ch.dp", 1, ':'), Some("dev.ch.dp"));
/// assert_eq!(token("GET:dev.ch.dp", 2, ':'), None);
/// assert_eq!(token("a::b", 1, ':'), Some("b"));
/// ```
pub fn token(from: &str, index: usize, separator: char) -> Option<&str> {
    let bytes = from.as_bytes();
    let len = bytes.len();
    let mut sep = [0u8; 4];
    let sep = separator.encode_utf8(&mut sep).as_bytes();
    if sep.len() != 1 {
        return None;
    }
    let sep = sep[0];

    let mut start = 0;
    let mut current = 0;
    let mut idx = 0;
    while idx < len {
        if bytes[idx] == sep {
            if current == index {
                return Some(&from[start..idx]);
            }
            current += 1;
            while idx + 1 < len && bytes[idx + 1] == sep {
                idx += 1;
            }
            start = idx + 1;
        }
        idx += 1;
    }

    if current == index && start < len {
        Some(&from[start..])
    } else {
        None
    }
}
