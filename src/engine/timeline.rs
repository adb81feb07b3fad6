//! Estimated word timing for a synthesised utterance.
//!
//! espeak-ng renders a whole utterance to one WAV file and reports no word
//! boundaries, so progress is derived from the audio length: every word is
//! scheduled at `duration * offset / total_chars`.

use std::time::Duration;

/// One word of the utterance and the playback time at which it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedWord {
    /// The word text, without surrounding whitespace.
    pub text: String,
    /// Char offset of the first character within the utterance.
    pub offset: usize,
    /// Estimated playback position at which the word begins.
    pub at: Duration,
}

/// Ordered schedule of [`TimedWord`]s for one utterance.
#[derive(Debug, Clone, Default)]
pub struct WordTimeline {
    words: Vec<TimedWord>,
    next: usize,
}

impl WordTimeline {
    /// Split `text` on whitespace and spread the words over `duration`.
    pub fn build(text: &str, duration: Duration) -> Self {
        let total_chars = text.chars().count();
        let words = split_words(text)
            .into_iter()
            .map(|(offset, word)| TimedWord {
                at: scale(duration, offset, total_chars),
                text: word,
                offset,
            })
            .collect();
        Self { words, next: 0 }
    }

    /// All words in order.
    pub fn words(&self) -> &[TimedWord] {
        &self.words
    }

    /// Words whose start time is `<= elapsed` and that were not returned by
    /// an earlier call.
    pub fn due(&mut self, elapsed: Duration) -> &[TimedWord] {
        let start = self.next;
        while self.next < self.words.len() && self.words[self.next].at <= elapsed {
            self.next += 1;
        }
        &self.words[start..self.next]
    }

    /// `true` once every word has been returned by [`due`](Self::due).
    pub fn is_exhausted(&self) -> bool {
        self.next >= self.words.len()
    }
}

/// Whitespace-separated words with their char offsets.
fn split_words(text: &str) -> Vec<(usize, String)> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (index, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                words.push((start, std::mem::take(&mut current)));
            }
        } else {
            if current.is_empty() {
                start = index;
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        words.push((start, current));
    }
    words
}

fn scale(duration: Duration, offset: usize, total: usize) -> Duration {
    if total == 0 {
        return Duration::ZERO;
    }
    duration.mul_f64(offset as f64 / total as f64)
}
