use alloc::vec::Vec;

use crate::markup::{render, tag_to_ansi};

fn render_str(text: &str, color: bool) -> std::string::String {
    let mut out = Vec::new();
    render(&mut out, text, color);
    std::string::String::from_utf8(out).unwrap()
}

#[test]
fn tags_strip_when_color_off() {
    assert_eq!(render_str("a <b>bold</> b", false), "a bold b");
    assert_eq!(render_str("<e>err</>", false), "err");
}

#[test]
fn tags_translate_when_color_on() {
    let out = render_str("<g>ok</>", true);
    assert!(out.starts_with("\x1b[92m"));
    assert!(out.ends_with("\x1b[0m"));
    assert!(out.contains("ok"));
}

#[test]
fn malformed_tags_pass_through() {
    // Unrecognized letter, multi-letter, non-letter, unterminated: all
    // emitted literally in both modes.
    for color in [false, true] {
        assert_eq!(render_str("<q>", color), "<q>");
        assert_eq!(render_str("<xy>", color), "<xy>");
        assert_eq!(render_str("<!>", color), "<!>");
        assert_eq!(render_str("a < b", color), "a < b");
        assert_eq!(render_str("trailing <", color), "trailing <");
    }
}

#[test]
fn slash_resets() {
    assert_eq!(tag_to_ansi(b'/'), Some("\x1b[0m"));
    assert_eq!(tag_to_ansi(b'n'), Some("\x1b[0m"));
    assert_eq!(tag_to_ansi(b'q'), None);
    assert_eq!(tag_to_ansi(b'!'), None);
}
