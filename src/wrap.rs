//! ANSI-escape-aware text wrapping.
//!
//! The wrapper measures every chunk by its *visible* width (escape
//! sequences stripped, Unicode-aware) but keeps the escapes in the output.
//! Lines therefore never exceed the configured width on screen no matter
//! how much color markup they carry. After a forced break inside an
//! over-long chunk, the most recent escape sequence is re-applied so the
//! continuation keeps the active color.

use crate::color::{strip, visible_width, RESET};

#[derive(Debug, Clone)]
pub struct AnsiWrapper {
    pub width: usize,
    pub initial_indent: String,
    pub subsequent_indent: String,
    /// Break a single chunk wider than the wrap width instead of emitting
    /// an over-long line.
    pub break_long_words: bool,
}

impl AnsiWrapper {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            initial_indent: String::new(),
            subsequent_indent: String::new(),
            break_long_words: true,
        }
    }

    pub fn indents(mut self, initial: &str, subsequent: &str) -> Self {
        self.initial_indent = initial.to_string();
        self.subsequent_indent = subsequent.to_string();
        self
    }

    /// Wraps `text` into lines no wider (visibly) than `self.width`.
    ///
    /// Internal whitespace runs are collapsed to single spaces first, the
    /// same normalization the help formatter applies before wrapping.
    pub fn wrap(&self, text: &str) -> Vec<String> {
        let chunks = split_chunks(text);
        self.wrap_chunks(chunks)
    }

    /// Like [`wrap`](Self::wrap) but joined with newlines.
    pub fn fill(&self, text: &str) -> String {
        self.wrap(text).join("\n")
    }

    fn wrap_chunks(&self, mut chunks: Vec<String>) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        chunks.reverse();

        while !chunks.is_empty() {
            let indent = if lines.is_empty() {
                &self.initial_indent
            } else {
                &self.subsequent_indent
            };
            let width = self.width.saturating_sub(indent.len()).max(1);

            // Drop leading whitespace on every line but the first.
            if !lines.is_empty() {
                while let Some(last) = chunks.last() {
                    if is_blank(last) {
                        chunks.pop();
                    } else {
                        break;
                    }
                }
            }

            let mut current: Vec<String> = Vec::new();
            let mut current_len = 0usize;
            while let Some(chunk) = chunks.last() {
                let len = visible_width(chunk);
                if current_len + len <= width {
                    current_len += len;
                    current.push(chunks.pop().unwrap());
                } else {
                    break;
                }
            }

            // Next chunk is too big for any line: hard-break it.
            if self.break_long_words {
                if let Some(chunk) = chunks.last() {
                    if visible_width(chunk) > width {
                        let room = width.saturating_sub(current_len);
                        let (head, tail) = break_chunk(chunk, room.max(1));
                        if !head.is_empty() {
                            chunks.pop();
                            current.push(head);
                            if !tail.is_empty() {
                                chunks.push(tail);
                            }
                        }
                    }
                }
            }

            // Nothing fit at all: emit the over-long chunk rather than loop.
            if current.is_empty() {
                if let Some(chunk) = chunks.pop() {
                    current.push(chunk);
                }
            }

            // Trailing whitespace chunk carries no content.
            while current.last().map(|c| is_blank(c)).unwrap_or(false) {
                current.pop();
            }

            if !current.is_empty() {
                lines.push(format!("{}{}", indent, current.concat()));
            } else if chunks.is_empty() {
                break;
            }
        }

        lines
    }
}

fn is_blank(chunk: &str) -> bool {
    strip(chunk).trim().is_empty()
}

/// Splits normalized text into alternating word / whitespace chunks.
/// Escape sequences stay glued to the word they annotate.
fn split_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_space = false;
    for ch in text.chars() {
        let is_space = ch.is_whitespace();
        if !current.is_empty() && is_space != in_space {
            chunks.push(std::mem::take(&mut current));
        }
        in_space = is_space;
        // Whitespace runs (including newlines) collapse to a single space.
        if is_space {
            current = " ".to_string();
        } else {
            current.push(ch);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Splits `chunk` so the head's visible width is at most `room`. Escape
/// sequences are copied for free; the last escape seen before the break is
/// re-applied at the start of the tail.
fn break_chunk(chunk: &str, room: usize) -> (String, String) {
    let mut head = String::new();
    let mut used = 0usize;
    let mut active_escape = String::new();
    let mut rest = chunk;

    while !rest.is_empty() {
        if let Some(esc) = leading_escape(rest) {
            if esc == RESET {
                active_escape.clear();
            } else {
                active_escape = esc.to_string();
            }
            head.push_str(esc);
            rest = &rest[esc.len()..];
            continue;
        }
        let ch = rest.chars().next().unwrap();
        let w = visible_width(&ch.to_string());
        if used + w > room && used > 0 {
            break;
        }
        head.push(ch);
        used += w;
        rest = &rest[ch.len_utf8()..];
    }

    let tail = if rest.is_empty() {
        String::new()
    } else {
        format!("{active_escape}{rest}")
    };
    (head, tail)
}

fn leading_escape(s: &str) -> Option<&str> {
    if !s.starts_with('\x1b') {
        return None;
    }
    // CSI sequence: ESC [ ... final byte in @-~
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[1] != b'[' {
        return None;
    }
    for (i, b) in bytes.iter().enumerate().skip(2) {
        if (0x40..=0x7e).contains(b) {
            return Some(&s[..=i]);
        }
    }
    None
}
