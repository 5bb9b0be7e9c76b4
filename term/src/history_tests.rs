use crate::history::{HIST_SIZE, History};

#[test]
fn dedup_against_previous() {
    let mut h = History::new();
    h.add("pin 2 high");
    h.add("pin 2 high");
    h.add("pin 2 low");
    h.add("pin 2 high");
    assert_eq!(h.len(), 3);
}

#[test]
fn ring_is_bounded() {
    let mut h = History::new();
    for i in 0..HIST_SIZE + 10 {
        h.add(&std::format!("cmd {i}"));
    }
    assert_eq!(h.len(), HIST_SIZE);
    // The oldest entries fell off.
    assert_eq!(h.search("^cmd 9 "), None);
    assert!(h.search("cmd 59").is_some());
}

#[test]
fn browse_prev_next() {
    let mut h = History::new();
    h.add("one");
    h.add("two");
    h.add("three");
    assert_eq!(h.prev(), Some("three"));
    assert_eq!(h.prev(), Some("two"));
    assert_eq!(h.next(), Some("three"));
    // Past the newest entry: back to the fresh-input line.
    assert_eq!(h.next(), None);
    assert_eq!(h.prev(), Some("three"));
    h.reset_cursor();
    assert_eq!(h.prev(), Some("three"));
}

#[test]
fn prev_sticks_at_oldest() {
    let mut h = History::new();
    h.add("only");
    assert_eq!(h.prev(), Some("only"));
    assert_eq!(h.prev(), Some("only"));
}

#[test]
fn search_substring_and_anchored() {
    let mut h = History::new();
    h.add("pin 2 high");
    h.add("show pin 2");
    h.add("uptime");
    assert_eq!(h.search("pin"), Some("show pin 2"));
    assert_eq!(h.search("^pin"), Some("pin 2 high"));
    assert_eq!(h.search("^nothing"), None);
    assert_eq!(h.search(""), None);
    assert_eq!(h.search("^"), None);
}
