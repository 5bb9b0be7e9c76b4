//! Number parsing for command arguments.
//!
//! The shell accepts decimal, `0x…` hexadecimal, `0b…` binary, leading-`0`
//! octal and floating point (which must carry a decimal point). Each form has
//! a classification predicate and a parser; parsers return `None` rather
//! than guessing when a string fails its form.

/// True if `s` is all decimal digits, with an optional leading minus.
pub fn is_decimal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit())
}

/// True if `s` is a hex number: `0x…`, `1234abcd`, or `cafe`.
pub fn is_hex(s: &str) -> bool {
    let body = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    !body.is_empty() && body.bytes().all(|b| b.is_ascii_hexdigit())
}

/// True if `s` is `0b…` with a binary body.
pub fn is_binary(s: &str) -> bool {
    match s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        Some(body) => !body.is_empty() && body.bytes().all(|b| b == b'0' || b == b'1'),
        None => false,
    }
}

/// True if `s` is a leading-zero octal number (`0777`). A lone `"0"` counts
/// as decimal, not octal.
pub fn is_octal(s: &str) -> bool {
    s.len() > 1
        && s.starts_with('0')
        && !s.starts_with("0x")
        && !s.starts_with("0X")
        && !s.starts_with("0b")
        && !s.starts_with("0B")
        && s.bytes().all(|b| (b'0'..=b'7').contains(&b))
}

/// True if `s` is a float: digits with exactly one embedded `.`, optional
/// leading minus. Plain integers do not qualify.
pub fn is_float(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let mut dots = 0;
    let mut digits = 0;
    for b in body.bytes() {
        match b {
            b'.' => dots += 1,
            b'0'..=b'9' => digits += 1,
            _ => return false,
        }
    }
    dots == 1 && digits > 0
}

/// True if `s` is a number in any accepted form.
pub fn is_numeric(s: &str) -> bool {
    is_decimal(s) || is_binary(s) || is_hex(s) || is_octal(s) || is_float(s)
}

/// Parse an unsigned number in any accepted integer form.
/// Negative input is rejected.
pub fn parse_u32(s: &str) -> Option<u32> {
    if s.is_empty() || s.starts_with('-') {
        return None;
    }
    if let Some(body) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u32::from_str_radix(body, 16).ok();
    }
    if let Some(body) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        return u32::from_str_radix(body, 2).ok();
    }
    if is_octal(s) {
        return u32::from_str_radix(&s[1..], 8).ok();
    }
    if is_decimal(s) {
        return s.parse().ok();
    }
    None
}

/// Parse with a fallback default, mirroring the common "bad value means
/// sentinel" call sites.
pub fn parse_u32_or(s: &str, default: u32) -> u32 {
    parse_u32(s).unwrap_or(default)
}

/// Parse a signed decimal number (other radixes are unsigned-only).
pub fn parse_i32(s: &str) -> Option<i32> {
    if is_decimal(s) {
        s.parse().ok()
    } else {
        parse_u32(s).and_then(|v| i32::try_from(v).ok())
    }
}

/// Parse a float. The decimal point is mandatory so that integer arguments
/// and float arguments stay visually distinct in command lines.
pub fn parse_f32(s: &str) -> Option<f32> {
    if is_float(s) { s.parse().ok() } else { None }
}

/// Parse a hexadecimal task/object id with or without the `0x` prefix.
pub fn parse_hex_id(s: &str) -> Option<u32> {
    let body = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if body.is_empty() {
        return None;
    }
    u32::from_str_radix(body, 16).ok()
}
