//! Token counting: used to keep command results inside the context window.
//!
//! The default [`HeuristicTokenizer`] uses a character-based heuristic:
//! ~4 ASCII characters per token, which is within ~10% for BPE tokenizers on
//! English text, and one token per non-ASCII character. A model-exact
//! tokenizer can be plugged in through the [`Tokenizer`] trait.

/// Counts tokens of a text under a given model's tokenizer.
pub trait Tokenizer: Send + Sync {
    fn count(&self, text: &str, model: &str) -> usize;
}

/// 1 token ≈ 4 ASCII characters, rounded up, plus one token per non-ASCII
/// character. Ignores the model.
///
/// Only an estimate: real BPE vocabularies differ per model and can split a
/// single CJK character or emoji into several tokens, so results close to
/// the budget may still overflow. Install a model-exact [`Tokenizer`] with
/// `AgentLoop::with_tokenizer` where that matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count(&self, text: &str, _model: &str) -> usize {
        estimate_tokens(text)
    }
}

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    let (ascii, other) = text
        .chars()
        .fold((0usize, 0usize), |(a, o), c| if c.is_ascii() { (a + 1, o) } else { (a, o + 1) });
    ascii.div_ceil(4) + other
}

/// Per-message overhead for role name and delimiters in the wire format.
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;
