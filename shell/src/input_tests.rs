use alloc::string::String;
use alloc::vec::Vec;

use crate::input::{ArgView, InputRecord, join_unescape};

#[test]
fn whitespace_tokenization() {
    let rec = InputRecord::tokenize("pin 2   out high").unwrap();
    assert_eq!(rec.argc(), 4);
    let tokens: Vec<&str> = (0..rec.argc()).map(|i| rec.arg(i)).collect();
    assert_eq!(tokens, ["pin", "2", "out", "high"]);
}

#[test]
fn empty_input_has_no_record() {
    assert!(InputRecord::tokenize("").is_none());
    assert!(InputRecord::tokenize("   \t ").is_none());
}

#[test]
fn quotes_keep_spaces() {
    let rec = InputRecord::tokenize("write \"hello there\" x").unwrap();
    assert_eq!(rec.argc(), 3);
    assert_eq!(rec.arg(1), "hello there");
    assert_eq!(rec.arg(2), "x");
}

#[test]
fn unterminated_quote_closes_at_eol() {
    let rec = InputRecord::tokenize("write \"no closing").unwrap();
    assert_eq!(rec.argc(), 2);
    assert_eq!(rec.arg(1), "no closing");
}

#[test]
fn tokens_roundtrip_with_single_spaces() {
    // Property 1: single-space input joins back to the original.
    for line in ["pin 2 out", "a b c d e", "x"] {
        let rec = InputRecord::tokenize(line).unwrap();
        let joined = (0..rec.argc()).map(|i| rec.arg(i)).collect::<Vec<_>>().join(" ");
        assert_eq!(joined, line);
    }
}

#[test]
fn background_marker_stripped_once() {
    let rec = InputRecord::tokenize("pin 2 high &").unwrap();
    assert_eq!(rec.argc0(), 4);
    assert!(!rec.detect_background(24));
    assert!(rec.is_background());
    assert_eq!(rec.argc(), 3);
    assert_eq!(rec.priority(), None);
    // Replays must not strip another token.
    assert!(!rec.detect_background(24));
    assert_eq!(rec.argc(), 3);
}

#[test]
fn background_priority_parsing() {
    let rec = InputRecord::tokenize("pin 2 high &7").unwrap();
    assert!(!rec.detect_background(24));
    assert_eq!(rec.priority(), Some(7));

    // Out-of-range priority reports, but the command still goes background.
    let rec = InputRecord::tokenize("pin 2 high &99").unwrap();
    assert!(rec.detect_background(24));
    assert!(rec.is_background());
    assert_eq!(rec.priority(), None);
}

#[test]
fn lone_ampersand_is_not_a_marker() {
    let rec = InputRecord::tokenize("&").unwrap();
    assert!(!rec.detect_background(24));
    assert!(!rec.is_background());
    assert_eq!(rec.argc(), 1);
}

#[test]
fn refcount_balance() {
    // Property 2: every clone dropped returns the record to one owner.
    let rec = InputRecord::tokenize("pin 2 high").unwrap();
    let clone1 = alloc::sync::Arc::clone(&rec);
    let clone2 = alloc::sync::Arc::clone(&rec);
    assert_eq!(alloc::sync::Arc::strong_count(&rec), 3);
    drop(clone1);
    drop(clone2);
    assert_eq!(alloc::sync::Arc::strong_count(&rec), 1);
}

#[test]
fn display_includes_stripped_marker() {
    let rec = InputRecord::tokenize("pin  2   high &").unwrap();
    let _ = rec.detect_background(24);
    assert_eq!(rec.display(), "pin 2 high &");
}

#[test]
fn unescape_joins_and_decodes() {
    let rec = InputRecord::tokenize("write a\\tb c\\x41 d\\\\e \\q").unwrap();
    let view = ArgView::new(&rec);
    let out = join_unescape(&view, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "a\tb cA d\\e \\q");
}

#[test]
fn unescape_hex_without_x() {
    let rec = InputRecord::tokenize("write \\0d\\0a").unwrap();
    let view = ArgView::new(&rec);
    assert_eq!(join_unescape(&view, 1), b"\r\n");
}
