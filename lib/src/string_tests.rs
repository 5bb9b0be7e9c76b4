use crate::string::*;

#[test]
fn prefix_matching() {
    assert!(prefix_match("seq", "sequence"));
    assert!(prefix_match("sequence", "sequence"));
    assert!(!prefix_match("sequence", "seq"));
    assert!(!prefix_match("seq", "aseq"));
    assert!(!prefix_match("", "sequence"));
}

#[test]
fn ordinals() {
    assert_eq!(ordinal_suffix(1), "st");
    assert_eq!(ordinal_suffix(2), "nd");
    assert_eq!(ordinal_suffix(3), "rd");
    assert_eq!(ordinal_suffix(4), "th");
    assert_eq!(ordinal_suffix(12), "th");
}

#[test]
fn plurals() {
    assert_eq!(plural_suffix(1), "");
    assert_eq!(plural_suffix(0), "s");
    assert_eq!(plural_suffix(5), "s");
}
