//! Small string helpers shared by the dispatcher and command handlers.

/// Loose keyword comparison: does `partial` name `full`?
///
/// `partial` matches when it is a non-empty prefix of `full`. This is what
/// lets users type `seq` for `sequence` or `h` for `high`:
///
/// - `prefix_match("seq", "sequence")` — match
/// - `prefix_match("sequence", "seq")` — no match
/// - `prefix_match("seq", "aseq")` — no match
pub fn prefix_match(partial: &str, full: &str) -> bool {
    !partial.is_empty() && full.len() >= partial.len() && full.as_bytes().starts_with(partial.as_bytes())
}

/// English ordinal suffix: 1 → "st", 2 → "nd", 3 → "rd", everything else
/// (including 11..13, which the shell never prints) → "th".
pub fn ordinal_suffix(n: usize) -> &'static str {
    match n {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Plural suffix for counters: 1 second, 2 seconds.
pub fn plural_suffix(n: u64) -> &'static str {
    if n == 1 { "" } else { "s" }
}
