// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Splitting of the received byte stream into lines.

/// Longest line kept while waiting for a terminator.
pub const MAX_LINE_LEN: usize = 1024;

/// Accumulates received bytes and yields complete lines.
///
/// Lines end at `\r\n`, `\n` or `\r`. Blank lines are skipped and invalid
/// UTF-8 is replaced, so a garbled byte never stalls the stream.
///
/// # Examples
///
/// ```
/// use nad_simple::protocol::LineFramer;
///
/// let mut framer = LineFramer::new();
/// assert!(framer.push(b"Main.Pow").is_empty());
/// assert_eq!(framer.push(b"er=On\r\nMain.Mute=Off\r"), vec!["Main.Power=On", "Main.Mute=Off"]);
/// ```
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
    /// Set after an overlong line until its terminator arrives.
    discarding: bool,
}

impl LineFramer {
    /// Creates an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds received bytes, returning every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in bytes {
            if byte == b'\r' || byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                    continue;
                }
                if !self.buffer.is_empty() {
                    let line = String::from_utf8_lossy(&self.buffer).trim().to_string();
                    self.buffer.clear();
                    if !line.is_empty() {
                        lines.push(line);
                    }
                }
                continue;
            }

            if self.discarding {
                continue;
            }
            if self.buffer.len() >= MAX_LINE_LEN {
                tracing::warn!(
                    len = self.buffer.len(),
                    "Discarding overlong line from receiver"
                );
                self.buffer.clear();
                self.discarding = true;
                continue;
            }
            self.buffer.push(byte);
        }

        lines
    }

    /// Drops any partial line, e.g. after the connection was replaced.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// Returns the number of buffered bytes not yet part of a line.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_all_terminators() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"A=1\r\nB=2\nC=3\rD=4");
        assert_eq!(lines, vec!["A=1", "B=2", "C=3"]);
        assert_eq!(framer.pending(), 3);
    }

    #[test]
    fn crlf_split_across_chunks() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.push(b"Main.Source=2\r"), vec!["Main.Source=2"]);
        assert!(framer.push(b"\nMain.Source=3").is_empty());
        assert_eq!(framer.push(b"\n"), vec!["Main.Source=3"]);
    }

    #[test]
    fn skips_blank_lines() {
        let mut framer = LineFramer::new();
        assert_eq!(framer.push(b"\r\r\n  \r\nX=1\r"), vec!["X=1"]);
    }

    #[test]
    fn replaces_invalid_utf8() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"Source1.Name=Caf\xff\r");
        assert_eq!(lines, vec!["Source1.Name=Caf\u{fffd}"]);
    }

    #[test]
    fn overlong_line_is_discarded_up_to_terminator() {
        let mut framer = LineFramer::new();
        let mut bytes = vec![b'x'; MAX_LINE_LEN];
        bytes.extend_from_slice(b"Main.Volume=10\rMain.Mute=On\r");
        assert_eq!(framer.push(&bytes), vec!["Main.Mute=On"]);
    }

    #[test]
    fn overlong_tail_in_later_chunk_is_discarded() {
        let mut framer = LineFramer::new();
        assert!(framer.push(&vec![b'x'; MAX_LINE_LEN + 1]).is_empty());
        assert!(framer.push(b"Main.Volume=10").is_empty());
        assert_eq!(framer.pending(), 0);
        assert_eq!(framer.push(b"\nMain.Power=On\r"), vec!["Main.Power=On"]);
    }

    #[test]
    fn line_of_exactly_max_len_is_kept() {
        let mut framer = LineFramer::new();
        let mut bytes = vec![b'y'; MAX_LINE_LEN];
        bytes.push(b'\r');
        let lines = framer.push(&bytes);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), MAX_LINE_LEN);
    }

    #[test]
    fn reset_drops_partial_line() {
        let mut framer = LineFramer::new();
        framer.push(b"Main.Vol");
        framer.reset();
        assert_eq!(framer.push(b"Main.Power=On\n"), vec!["Main.Power=On"]);
    }
}
