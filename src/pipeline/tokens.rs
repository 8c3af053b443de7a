//! Token-cost estimation.
//!
//! Estimators are pluggable so the same [`super::chunker::Chunker`] works for
//! providers with different tokenisers. Every implementation must be pure and
//! monotonic: appending text never lowers the estimate. The chunker's greedy
//! packing relies on that.

use std::fmt;

/// Approximates how many tokens a model would charge for `text`.
pub trait TokenEstimator: Send + Sync + fmt::Debug {
    fn estimate(&self, text: &str) -> usize;
}

/// `ceil(chars / chars_per_token)`: the classic 4-characters-per-token rule
/// for English text on GPT/Claude tokenisers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRatioEstimator {
    chars_per_token: usize,
}

impl CharRatioEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

/// Script-aware estimate: CJK ideographs and kana/hangul tokenize at about
/// two characters per token, everything else at about four.
///
/// Each script class is rounded up on its own, so the sum stays monotonic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptAwareEstimator;

impl TokenEstimator for ScriptAwareEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_ascii() {
            return text.len().div_ceil(4);
        }
        let (cjk, other) = text.chars().fold((0usize, 0usize), |(cjk, other), c| {
            if is_cjk_char(c) {
                (cjk + 1, other)
            } else {
                (cjk, other + 1)
            }
        });
        cjk.div_ceil(2) + other.div_ceil(4)
    }
}

#[inline]
fn is_cjk_char(c: char) -> bool {
    let code = c as u32;
    (0x4E00..=0x9FFF).contains(&code) // CJK Unified Ideographs
        || (0x3040..=0x309F).contains(&code) // Hiragana
        || (0x30A0..=0x30FF).contains(&code) // Katakana
        || (0xAC00..=0xD7AF).contains(&code) // Hangul
}
