// src/services/wordcount.rs

//! Word-count extraction over semi-structured markup.
//!
//! Counts are computed by stripping markup tags and tokenizing the
//! remaining text with Unicode word-boundary rules. Two modes share the
//! same semantics: [`word_count`] over a whole buffer, and
//! [`StreamingWordCounter`] / [`word_count_streaming`] over chunked bytes,
//! which never materializes a full document body.

use std::sync::OnceLock;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;

/// Matches one complete markup tag.
fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"))
}

/// Count the words in a markup buffer.
///
/// Complete tags are replaced with a space before tokenizing. A trailing
/// `<` that never closes opens a stripped region running to the end of the
/// buffer; unbalanced markup never fails, it only strips more.
pub fn word_count(markup: &str) -> u64 {
    if markup.is_empty() {
        return 0;
    }
    let stripped = tag_regex().replace_all(markup, " ");
    let visible = truncate_unclosed_tag(&stripped);
    visible.unicode_words().count() as u64
}

/// Cut the buffer at the first `<` that is never followed by a `>`.
fn truncate_unclosed_tag(text: &str) -> &str {
    let unclosed = match text.rfind('>') {
        Some(gt) => text[gt + 1..].find('<').map(|lt| gt + 1 + lt),
        None => text.find('<'),
    };
    match unclosed {
        Some(lt) => &text[..lt],
        None => text,
    }
}

/// Incremental word counter over chunked markup bytes.
///
/// Tag and word boundaries can straddle chunk boundaries, so the counter
/// carries three kinds of unconsumed suffix between chunks: trailing bytes
/// of an incomplete UTF-8 sequence, an unterminated tag, and the partial
/// word after the last confirmed whitespace. For any byte-aligned chunking
/// of the same input the final count equals [`word_count`].
#[derive(Debug, Default)]
pub struct StreamingWordCounter {
    count: u64,
    byte_carry: Vec<u8>,
    text_carry: String,
}

impl StreamingWordCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Words confirmed so far.
    pub fn current_count(&self) -> u64 {
        self.count
    }

    /// Feed the next chunk of bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        self.byte_carry.extend_from_slice(chunk);

        // Hold back an incomplete trailing UTF-8 sequence; interior invalid
        // bytes are decoded lossily and act as token boundaries.
        let boundary = match std::str::from_utf8(&self.byte_carry) {
            Ok(_) => self.byte_carry.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.byte_carry.len(),
        };
        if boundary == 0 {
            return;
        }
        let tail = self.byte_carry.split_off(boundary);
        let head = std::mem::replace(&mut self.byte_carry, tail);
        let text = String::from_utf8_lossy(&head);
        self.absorb(&text);
    }

    /// Consume the counter, counting any retained complete word. A retained
    /// unterminated tag is a stripped region ending with the input.
    pub fn finish(self) -> u64 {
        let combined = self.text_carry;
        let (visible, _unclosed) = strip_complete_tags(&combined);
        self.count + visible.unicode_words().count() as u64
    }

    fn absorb(&mut self, input: &str) {
        let combined = format!("{}{}", self.text_carry, input);
        let (visible, unclosed) = strip_complete_tags(&combined);

        // Words cannot span whitespace, so everything up to the last
        // whitespace in the stripped text is final.
        self.text_carry = match visible.rfind(|c: char| c.is_whitespace()) {
            Some(i) => {
                let ws_len = visible[i..].chars().next().map_or(1, char::len_utf8);
                let (done, rest) = visible.split_at(i + ws_len);
                self.count += done.unicode_words().count() as u64;
                format!("{rest}{unclosed}")
            }
            None => format!("{visible}{unclosed}"),
        };
    }
}

/// Replace every complete tag with a space. Returns the stripped text plus
/// the raw suffix starting at an unterminated `<`, which may still close in
/// a later chunk.
fn strip_complete_tags(text: &str) -> (String, &str) {
    let mut visible = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        match rest.find('<') {
            None => {
                visible.push_str(rest);
                return (visible, "");
            }
            Some(lt) => {
                visible.push_str(&rest[..lt]);
                match rest[lt..].find('>') {
                    Some(rel_gt) => {
                        visible.push(' ');
                        rest = &rest[lt + rel_gt + 1..];
                    }
                    None => return (visible, &rest[lt..]),
                }
            }
        }
    }
}

/// Count words from a byte stream without buffering the body.
///
/// A mid-stream error degrades to the count observed so far; a truncated
/// body yields a partial count, never a pipeline failure.
pub async fn word_count_streaming<S>(stream: S) -> u64
where
    S: Stream<Item = Result<Bytes>>,
{
    let mut counter = StreamingWordCounter::new();
    futures::pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => counter.push(&bytes),
            Err(error) => {
                log::warn!(
                    "content stream interrupted after {} words: {}",
                    counter.current_count(),
                    error
                );
                break;
            }
        }
    }
    counter.finish()
}
