//! Word-count interruption strategy

use super::InterruptionStrategy;

/// Interrupt once the caller's transcript reaches a minimum word count.
///
/// Short backchannels ("yeah", "mm-hm") stay below the threshold and never
/// stop playback. Partial hypotheses are cumulative for one utterance, so
/// each append replaces the previous count instead of summing.
pub struct WordCountStrategy {
    min_words: usize,
    words: usize,
}

impl WordCountStrategy {
    pub fn new(min_words: usize) -> Self {
        Self {
            min_words,
            words: 0,
        }
    }
}

impl InterruptionStrategy for WordCountStrategy {
    fn name(&self) -> &'static str {
        "word_count"
    }

    fn append_text(&mut self, text: &str) {
        self.words = text.split_whitespace().count();
    }

    fn should_interrupt(&self) -> bool {
        self.words >= self.min_words
    }

    fn reset(&mut self) {
        self.words = 0;
    }
}
