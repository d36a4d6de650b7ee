// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Virtual Terminal (§4.1): parses the PTY byte stream and exposes a
//! screen-reading interface — line count, line-at-index, cursor position —
//! rather than a full emulator API. Detectors only ever see the output of
//! [`Screen::visible_lines`].

use serde::{Deserialize, Serialize};

/// Default number of trailing lines exposed for classification and replay.
pub const DEFAULT_VISIBLE_LINES: usize = 300;

/// In-process terminal emulator backed by `avt`.
///
/// Tracks alternate-screen state itself (by scanning raw bytes for DECSET
/// 1049) because `avt::Vt` does not expose which buffer is active.
pub struct Screen {
    vt: avt::Vt,
    seq: u64,
    changed: bool,
    alt_screen: bool,
    utf8_buf: [u8; 3],
    utf8_buf_len: u8,
    esc_buf: [u8; 7],
    esc_buf_len: u8,
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("seq", &self.seq)
            .field("changed", &self.changed)
            .field("alt_screen", &self.alt_screen)
            .finish()
    }
}

const ALT_SCREEN_ON: &[u8] = b"\x1b[?1049h";
const ALT_SCREEN_OFF: &[u8] = b"\x1b[?1049l";

fn scan_alt_screen(data: &[u8], alt_screen: &mut bool) {
    if data.len() < ALT_SCREEN_ON.len() {
        return;
    }
    if data.windows(ALT_SCREEN_ON.len()).any(|w| w == ALT_SCREEN_ON) {
        *alt_screen = true;
    }
    if data.windows(ALT_SCREEN_OFF.len()).any(|w| w == ALT_SCREEN_OFF) {
        *alt_screen = false;
    }
}

/// Returns the number of trailing bytes that form an incomplete UTF-8
/// sequence, so they can be buffered until the rest arrives.
fn incomplete_utf8_tail_len(data: &[u8]) -> usize {
    let len = data.len();
    for i in 1..=len.min(3) {
        let byte = data[len - i];
        if byte < 0x80 {
            return 0;
        }
        if byte >= 0xC0 {
            let expected = if byte < 0xE0 {
                2
            } else if byte < 0xF0 {
                3
            } else {
                4
            };
            return if i < expected { i } else { 0 };
        }
    }
    0
}

impl Screen {
    /// Create a new screen with the given dimensions.
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            vt: avt::Vt::new(cols as usize, rows as usize),
            seq: 0,
            changed: false,
            alt_screen: false,
            utf8_buf: [0; 3],
            utf8_buf_len: 0,
            esc_buf: [0; 7],
            esc_buf_len: 0,
        }
    }

    /// Feed raw bytes from the PTY into the virtual terminal.
    pub fn feed(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        let buf_len = self.utf8_buf_len as usize;
        let owned: Vec<u8>;
        let input = if buf_len == 0 {
            data
        } else {
            owned = [&self.utf8_buf[..buf_len], data].concat();
            self.utf8_buf_len = 0;
            &owned
        };

        let esc_len = self.esc_buf_len as usize;
        if esc_len > 0 {
            let take = input.len().min(ALT_SCREEN_ON.len());
            let mut bridge = [0u8; 15];
            bridge[..esc_len].copy_from_slice(&self.esc_buf[..esc_len]);
            bridge[esc_len..esc_len + take].copy_from_slice(&input[..take]);
            let region = &bridge[..esc_len + take];
            scan_alt_screen(region, &mut self.alt_screen);
        }
        scan_alt_screen(input, &mut self.alt_screen);

        let tail_len = input.len().min(7);
        self.esc_buf[..tail_len].copy_from_slice(&input[input.len() - tail_len..]);
        self.esc_buf_len = tail_len as u8;

        let tail = incomplete_utf8_tail_len(input);
        let (to_feed, to_buffer) = input.split_at(input.len() - tail);

        if !to_buffer.is_empty() {
            self.utf8_buf[..to_buffer.len()].copy_from_slice(to_buffer);
            self.utf8_buf_len = to_buffer.len() as u8;
        }

        if !to_feed.is_empty() {
            let s = String::from_utf8_lossy(to_feed);
            let _ = self.vt.feed_str(&s);
        }

        self.seq += 1;
        self.changed = true;
    }

    /// Return the last `n` visible lines as plain text: the alternate
    /// screen's full view when active (§4.1), otherwise the tail of the
    /// primary screen's wrapped lines.
    pub fn visible_lines(&self, n: usize) -> Vec<String> {
        let all: Vec<String> = self.vt.view().map(|line| line.text()).collect();
        if self.alt_screen || all.len() <= n {
            all
        } else {
            all[all.len() - n..].to_vec()
        }
    }

    /// Capture a point-in-time snapshot of the screen contents.
    pub fn snapshot(&self) -> ScreenSnapshot {
        let (cols, rows) = self.vt.size();
        let cursor = self.vt.cursor();
        let lines: Vec<String> = self.vt.view().map(|line| line.text()).collect();

        ScreenSnapshot {
            lines,
            cols: cols as u16,
            rows: rows as u16,
            alt_screen: self.alt_screen,
            cursor: CursorPosition { row: cursor.row as u16, col: cursor.col as u16 },
            sequence: self.seq,
        }
    }

    pub fn is_alt_screen(&self) -> bool {
        self.alt_screen
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        let _ = self.vt.resize(cols as usize, rows as usize);
    }
}

/// Point-in-time capture of the terminal screen contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenSnapshot {
    pub lines: Vec<String>,
    pub cols: u16,
    pub rows: u16,
    pub alt_screen: bool,
    pub cursor: CursorPosition,
    pub sequence: u64,
}

/// Row and column position of the terminal cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub row: u16,
    pub col: u16,
}

#[cfg(test)]
#[path = "screen_tests.rs"]
mod tests;
