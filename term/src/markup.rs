//! Inline color markup.
//!
//! Shell messages carry single-letter tags like
//! `"This <b>text is bold</><g>and this is green</>"`. The closing tag `</>`
//! restores normal attributes and cancels every preceding tag. Tags are
//! replaced with ANSI sequences when coloring is on and stripped when it is
//! off; anything that merely looks like a tag (`<!>`, `<xy>`, an unterminated
//! `<`) is passed through untouched, never silently dropped.

use alloc::vec::Vec;

/// ANSI sequences for tags `a`..`z`. Empty entry = unrecognized letter.
static ANSI_TAGS: [&str; 26] = {
    let mut t = [""; 26];
    t[(b'b' - b'a') as usize] = "\x1b[1;97m"; // bold bright white
    t[(b'c' - b'a') as usize] = "\x1b[36m"; // dark cyan
    t[(b'd' - b'a') as usize] = "\x1b[37m"; // dark white
    t[(b'e' - b'a') as usize] = "\x1b[95m"; // error (bright magenta)
    t[(b'g' - b'a') as usize] = "\x1b[92m"; // bright green
    t[(b'i' - b'a') as usize] = "\x1b[33;93m"; // important (bright yellow)
    t[(b'n' - b'a') as usize] = "\x1b[0m"; // normal, cancels all tags
    t[(b'o' - b'a') as usize] = "\x1b[33m"; // optional dark yellow
    t[(b'r' - b'a') as usize] = "\x1b[7m"; // reverse video
    t[(b'u' - b'a') as usize] = "\x1b[4;37m"; // underlined white
    t[(b'w' - b'a') as usize] = "\x1b[91m"; // warning (bright red)
    t[(b'x' - b'a') as usize] = "\x1b[41m"; // red background
    t[(b'y' - b'a') as usize] = "\x1b[42m"; // green background
    t[(b'z' - b'a') as usize] = "\x1b[96m"; // bright cyan
    t
};

/// ANSI sequence for a tag letter, `None` for letters without a binding.
/// `/` is a synonym for `n`.
pub fn tag_to_ansi(tag: u8) -> Option<&'static str> {
    let idx = match tag {
        b'/' => (b'n' - b'a') as usize,
        b'a'..=b'z' => (tag - b'a') as usize,
        _ => return None,
    };
    let seq = ANSI_TAGS[idx];
    if seq.is_empty() { None } else { Some(seq) }
}

/// Translate `text` into `out`, replacing or stripping recognized tags.
pub fn render(out: &mut Vec<u8>, text: &str, color: bool) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'<' && i + 2 < bytes.len() && bytes[i + 2] == b'>' {
            if let Some(seq) = tag_to_ansi(bytes[i + 1]) {
                if color {
                    out.extend_from_slice(seq.as_bytes());
                }
                i += 3;
                continue;
            }
        }
        out.push(b);
        i += 1;
    }
}
