use super::*;

#[test]
fn feed_plain_text_produces_visible_line() {
    let mut screen = Screen::new(80, 24);
    screen.feed(b"hello world");
    let lines = screen.visible_lines(DEFAULT_VISIBLE_LINES);
    assert!(lines.iter().any(|l| l.contains("hello world")));
}

#[test]
fn seq_increments_on_each_feed() {
    let mut screen = Screen::new(80, 24);
    assert_eq!(screen.seq(), 0);
    screen.feed(b"a");
    assert_eq!(screen.seq(), 1);
    screen.feed(b"b");
    assert_eq!(screen.seq(), 2);
}

#[test]
fn changed_flag_tracks_feed_and_clear() {
    let mut screen = Screen::new(80, 24);
    assert!(!screen.changed());
    screen.feed(b"x");
    assert!(screen.changed());
    screen.clear_changed();
    assert!(!screen.changed());
}

#[test]
fn split_utf8_sequence_across_feeds_is_reassembled() {
    let mut screen = Screen::new(80, 24);
    let bytes = "❯".as_bytes().to_vec();
    assert_eq!(bytes.len(), 3);
    screen.feed(&bytes[..1]);
    screen.feed(&bytes[1..]);
    let lines = screen.visible_lines(DEFAULT_VISIBLE_LINES);
    assert!(lines.iter().any(|l| l.contains('❯')));
}

#[test]
fn alt_screen_enable_and_disable_detected() {
    let mut screen = Screen::new(80, 24);
    assert!(!screen.is_alt_screen());
    screen.feed(b"\x1b[?1049h");
    assert!(screen.is_alt_screen());
    screen.feed(b"\x1b[?1049l");
    assert!(!screen.is_alt_screen());
}

#[test]
fn alt_screen_sequence_split_across_feeds_is_detected() {
    let mut screen = Screen::new(80, 24);
    let seq = b"\x1b[?1049h";
    screen.feed(&seq[..4]);
    screen.feed(&seq[4..]);
    assert!(screen.is_alt_screen());
}

#[test]
fn visible_lines_truncates_to_requested_count() {
    let mut screen = Screen::new(80, 10);
    for i in 0..30 {
        screen.feed(format!("line {i}\r\n").as_bytes());
    }
    let lines = screen.visible_lines(5);
    assert!(lines.len() <= 10);
}

#[test]
fn resize_updates_snapshot_dimensions() {
    let mut screen = Screen::new(80, 24);
    screen.resize(100, 40);
    let snap = screen.snapshot();
    assert_eq!(snap.cols, 100);
    assert_eq!(snap.rows, 40);
}
