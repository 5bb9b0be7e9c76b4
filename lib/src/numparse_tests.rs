use crate::numparse::*;

#[test]
fn decimal_classification() {
    assert!(is_decimal("0"));
    assert!(is_decimal("1234"));
    assert!(is_decimal("-5"));
    assert!(!is_decimal(""));
    assert!(!is_decimal("12a"));
    assert!(!is_decimal("1.5"));
}

#[test]
fn hex_binary_octal_classification() {
    assert!(is_hex("0xDEAD"));
    assert!(is_hex("cafe"));
    assert!(!is_hex("0x"));
    assert!(!is_hex("xyz"));

    assert!(is_binary("0b1010"));
    assert!(!is_binary("0b"));
    assert!(!is_binary("1010"));

    assert!(is_octal("0777"));
    assert!(!is_octal("0"));
    assert!(!is_octal("0x7"));
    assert!(!is_octal("089"));
}

#[test]
fn float_requires_dot() {
    assert!(is_float("1.0"));
    assert!(is_float("-0.25"));
    assert!(is_float(".5"));
    assert!(!is_float("10"));
    assert!(!is_float("1.2.3"));
    assert!(!is_float("."));
}

#[test]
fn parse_all_radixes() {
    assert_eq!(parse_u32("1000"), Some(1000));
    assert_eq!(parse_u32("0x10"), Some(16));
    assert_eq!(parse_u32("0b101"), Some(5));
    assert_eq!(parse_u32("010"), Some(8));
    assert_eq!(parse_u32("0"), Some(0));
    assert_eq!(parse_u32("-4"), None);
    assert_eq!(parse_u32("4.2"), None);
    assert_eq!(parse_u32_or("junk", 77), 77);
}

#[test]
fn parse_signed_and_float() {
    assert_eq!(parse_i32("-42"), Some(-42));
    assert_eq!(parse_i32("0x10"), Some(16));
    assert_eq!(parse_f32("0.25"), Some(0.25));
    assert_eq!(parse_f32("25"), None);
}

#[test]
fn parse_hex_ids() {
    assert_eq!(parse_hex_id("0x3fff0000"), Some(0x3fff0000));
    assert_eq!(parse_hex_id("3fff0000"), Some(0x3fff0000));
    assert_eq!(parse_hex_id(""), None);
}
