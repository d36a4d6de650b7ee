// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded raw-byte scrollback, replayed on re-attach (§4.1, §4.6).

/// Default ring buffer capacity: 10 MiB, per §4.1.
pub const DEFAULT_RING_CAPACITY: usize = 10 * 1024 * 1024;

/// Fixed-capacity circular byte buffer for raw PTY output.
///
/// Tracks the total number of bytes ever written so consumers can request
/// replay from a global byte offset. When the buffer wraps, older data is
/// silently discarded — this is the only place bounded-memory policy
/// applies to terminal output (§5).
#[derive(Debug)]
pub struct RingBuffer {
    buf: Vec<u8>,
    capacity: usize,
    write_pos: usize,
    total_written: u64,
}

impl RingBuffer {
    /// Create a new ring buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self { buf: vec![0u8; capacity], capacity, write_pos: 0, total_written: 0 }
    }

    /// Append data into the circular buffer.
    pub fn write(&mut self, data: &[u8]) {
        for chunk in data.chunks(self.capacity.max(1)) {
            let start = self.write_pos;
            let end = start + chunk.len();

            if end <= self.capacity {
                self.buf[start..end].copy_from_slice(chunk);
            } else {
                let first = self.capacity - start;
                self.buf[start..self.capacity].copy_from_slice(&chunk[..first]);
                self.buf[..chunk.len() - first].copy_from_slice(&chunk[first..]);
            }

            self.write_pos = end % self.capacity.max(1);
            self.total_written += chunk.len() as u64;
        }
    }

    /// Read bytes starting from the given global byte offset.
    ///
    /// Returns `None` if the requested offset has already been overwritten
    /// (too old) or is beyond the current write position (too new).
    /// Otherwise returns one or two slices covering the requested range.
    pub fn read_from(&self, offset: u64) -> Option<(&[u8], &[u8])> {
        if offset > self.total_written {
            return None;
        }

        let oldest = self.total_written.saturating_sub(self.capacity as u64);
        if offset < oldest {
            return None;
        }

        let available = (self.total_written - offset) as usize;
        if available == 0 {
            return Some((&[], &[]));
        }

        let start = if self.write_pos >= available {
            self.write_pos - available
        } else {
            self.capacity - (available - self.write_pos)
        };

        if start + available <= self.capacity {
            Some((&self.buf[start..start + available], &[]))
        } else {
            let first = self.capacity - start;
            Some((&self.buf[start..self.capacity], &self.buf[..available - first]))
        }
    }

    /// Read the full buffered history as an owned, contiguous `Vec<u8>`,
    /// with OSC 10/11 default-fg/bg sequences stripped (§4.1) since some
    /// agents emit them in a form that would otherwise leak as literal text
    /// when replayed into a plain reader.
    pub fn replay_stripped(&self) -> Vec<u8> {
        let (a, b) = self.read_from(self.total_written.saturating_sub(self.capacity as u64)).unwrap_or((&[], &[]));
        let mut combined = Vec::with_capacity(a.len() + b.len());
        combined.extend_from_slice(a);
        combined.extend_from_slice(b);
        strip_osc_10_11(&combined)
    }

    /// Total bytes ever written through this buffer.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }
}

/// Strip `ESC ] 10 ; ... BEL|ST` and `ESC ] 11 ; ... BEL|ST` sequences
/// (default foreground/background color reports) from `data`.
///
/// These are scanned as raw bytes rather than interpreted through the
/// virtual terminal because replay targets a plain byte sink, not a
/// terminal that would otherwise consume them silently.
fn strip_osc_10_11(data: &[u8]) -> Vec<u8> {
    const ESC: u8 = 0x1b;
    const BEL: u8 = 0x07;

    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == ESC
            && data.get(i + 1) == Some(&b']')
            && (data.get(i + 2) == Some(&b'1'))
            && matches!(data.get(i + 3), Some(&b'0') | Some(&b'1'))
            && data.get(i + 4) == Some(&b';')
        {
            // Found `ESC ] 1{0,1} ;` — scan forward for the terminator.
            let mut j = i + 5;
            let mut terminated = false;
            while j < data.len() {
                if data[j] == BEL {
                    j += 1;
                    terminated = true;
                    break;
                }
                if data[j] == ESC && data.get(j + 1) == Some(&b'\\') {
                    j += 2;
                    terminated = true;
                    break;
                }
                j += 1;
            }
            if terminated {
                i = j;
                continue;
            }
        }
        out.push(data[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
