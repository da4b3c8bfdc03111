//! Utility functions shared by the style engine and the animated graph.

use std::cell::RefCell;
use std::collections::HashSet;

/// Current wall-clock time in milliseconds.
///
/// On native platforms, uses `SystemTime::now()`.
/// On WASM, uses `js_sys::Date::now()`.
#[cfg(not(all(target_arch = "wasm32", feature = "wasm")))]
pub fn now_ms() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

thread_local! {
    static WARNED: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Emit a warning the first time `key` is seen on this thread.
///
/// Style resolution and animation evaluation run on every render or frame,
/// so lenient-degradation diagnostics go through here to avoid log spam.
pub(crate) fn warn_once(key: &str, message: impl FnOnce() -> String) {
    let first = WARNED.with(|warned| warned.borrow_mut().insert(key.to_string()));
    if first {
        log::warn!("{}", message());
    }
}

/// Format a number the way `Number.prototype.toString` does for CSS output.
///
/// Integral values print without a fraction, `-0` prints as `0`, and everything
/// else uses the shortest representation that round-trips.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e21 {
        return format!("{}", value as i64);
    }
    format!("{}", value)
}

/// Convert a camelCase style property into its hyphenated CSS name.
///
/// Custom properties (`--foo`) are returned unchanged and a leading `ms`
/// vendor prefix becomes `-ms-`.
pub fn hyphenate(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_string();
    }

    let mut out = String::with_capacity(property.len() + 4);
    for ch in property.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }

    if out.starts_with("ms-") {
        out.insert(0, '-');
    }
    out
}

/// Split a CSS value into its top-level space separated components.
///
/// Whitespace inside parentheses (`rgba(0, 0, 0, 0.5)`) does not split.
pub fn split_components(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;

    for (i, ch) in value.char_indices() {
        match ch {
            '(' => {
                depth += 1;
                start.get_or_insert(i);
            }
            ')' => {
                depth = depth.saturating_sub(1);
            }
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    parts.push(&value[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }

    if let Some(s) = start {
        parts.push(&value[s..]);
    }
    parts
}

// ============================================================================
// Content hashing
// ============================================================================

const MURMUR_M: u32 = 0x5bd1_e995;

/// MurmurHash2 (32-bit) over the low byte of each UTF-16 code unit.
///
/// This matches the hash used by browser-side atomic CSS generators, so
/// identifiers produced here line up with server-rendered markup from them.
pub fn murmurhash2(input: &str, seed: u32) -> u32 {
    let data: Vec<u32> = input.encode_utf16().map(|c| (c & 0xff) as u32).collect();
    let mut len = data.len();
    let mut h = seed ^ (len as u32);
    let mut i = 0;

    while len >= 4 {
        let mut k = data[i] | (data[i + 1] << 8) | (data[i + 2] << 16) | (data[i + 3] << 24);
        k = k.wrapping_mul(MURMUR_M);
        k ^= k >> 24;
        k = k.wrapping_mul(MURMUR_M);
        h = h.wrapping_mul(MURMUR_M) ^ k;
        len -= 4;
        i += 4;
    }

    if len >= 3 {
        h ^= data[i + 2] << 16;
    }
    if len >= 2 {
        h ^= data[i + 1] << 8;
    }
    if len >= 1 {
        h ^= data[i];
        h = h.wrapping_mul(MURMUR_M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(MURMUR_M);
    h ^= h >> 15;
    h
}

/// Render a value in base 36 using lowercase digits.
pub fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(7);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}

/// Hash a string into a short base-36 token.
pub fn hash(input: &str) -> String {
    to_base36(murmurhash2(input, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-12.25), "-12.25");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_hyphenate() {
        assert_eq!(hyphenate("marginLeft"), "margin-left");
        assert_eq!(hyphenate("borderTopLeftRadius"), "border-top-left-radius");
        assert_eq!(hyphenate("msTransform"), "-ms-transform");
        assert_eq!(hyphenate("--custom-prop"), "--custom-prop");
        assert_eq!(hyphenate("color"), "color");
    }

    #[test]
    fn test_split_components() {
        assert_eq!(split_components("1px solid red"), vec!["1px", "solid", "red"]);
        assert_eq!(
            split_components("  2px   rgba(0, 0, 0, 0.5) "),
            vec!["2px", "rgba(0, 0, 0, 0.5)"]
        );
        assert!(split_components("   ").is_empty());
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash("marginLeft10px"), hash("marginLeft10px"));
        assert_ne!(hash("marginLeft10px"), hash("marginLeft11px"));
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_murmurhash2_tail_lengths() {
        // Each tail length takes a different branch; all must differ.
        let hashes: HashSet<u32> = ["a", "ab", "abc", "abcd", "abcde"]
            .iter()
            .map(|s| murmurhash2(s, 1))
            .collect();
        assert_eq!(hashes.len(), 5);
    }
}
