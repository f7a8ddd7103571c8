use serde::{Deserialize, Serialize};

/// Default number of characters of conversation kept per user.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Sliding window over the most recent conversation text of one user.
///
/// Exchanges are concatenated as `" {input} {output}"`. After every append the
/// buffer is cut from the front so that at most `limit` characters (Unicode
/// scalar values, not bytes) remain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistory {
    buffer: String,
    limit: usize,
}

impl ChatHistory {
    /// Creates an empty history bounded to `limit` characters.
    pub fn new(limit: usize) -> Self {
        Self {
            buffer: String::new(),
            limit,
        }
    }

    /// Records one exchange and drops the oldest characters beyond the bound.
    pub fn append(&mut self, input: &str, output: &str) {
        self.buffer.reserve(input.len() + output.len() + 2);
        self.buffer.push(' ');
        self.buffer.push_str(input);
        self.buffer.push(' ');
        self.buffer.push_str(output);
        self.truncate();
    }

    /// The current buffer; empty when nothing has been recorded.
    pub fn read(&self) -> &str {
        &self.buffer
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    /// Whether nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The configured character bound.
    pub fn limit(&self) -> usize {
        self.limit
    }

    fn truncate(&mut self) {
        let len = self.len();
        if len <= self.limit {
            return;
        }
        let excess = len - self.limit;
        let cut = self
            .buffer
            .char_indices()
            .nth(excess)
            .map_or(self.buffer.len(), |(idx, _)| idx);
        self.buffer.drain(..cut);
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn append_joins_with_leading_spaces() {
        let mut h = ChatHistory::new(100);
        h.append("hi", "hello");
        assert_eq!(h.read(), " hi hello");
        h.append("how are you", "fine");
        assert_eq!(h.read(), " hi hello how are you fine");
    }

    #[test]
    fn empty_output_still_recorded() {
        let mut h = ChatHistory::new(100);
        h.append("anyone there?", "");
        assert_eq!(h.read(), " anyone there? ");
    }

    #[test]
    fn truncation_keeps_most_recent_characters() {
        let mut h = ChatHistory::new(10);
        h.append("abc", "def");
        assert_eq!(h.read(), " abc def");
        h.append("g", "h");
        // " abc def g h" is 12 chars; the two oldest are dropped.
        assert_eq!(h.read(), "bc def g h");
        assert_eq!(h.len(), 10);
    }

    #[test]
    fn full_buffer_shifts_by_appended_amount() {
        let mut h = ChatHistory::new(10);
        h.append("abcdefgh", "");
        assert_eq!(h.read(), " abcdefgh ");
        h.append("k", "");
        assert_eq!(h.len(), 10);
        assert!(h.read().ends_with(" k "));
        assert_eq!(h.read(), "cdefgh  k ");
    }

    #[test]
    fn bound_holds_after_every_append() {
        let mut h = ChatHistory::new(25);
        for i in 0..200 {
            h.append(&format!("question {i}"), &"x".repeat(i % 7));
            assert!(h.len() <= 25, "len {} after append {i}", h.len());
        }
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let mut h = ChatHistory::new(6);
        h.append("héllo", "wörld");
        assert_eq!(h.len(), 6);
        assert_eq!(h.read(), " wörld");
    }

    #[test]
    fn zero_limit_keeps_nothing() {
        let mut h = ChatHistory::new(0);
        h.append("a", "b");
        assert!(h.is_empty());
    }

    #[test]
    fn clear_then_read_is_empty() {
        let mut h = ChatHistory::new(50);
        h.append("one", "two");
        h.clear();
        assert_eq!(h.read(), "");
        assert_eq!(h.limit(), 50);
    }
}
