//! Token usage accounting across attempts.

use serde::{Deserialize, Serialize, Serializer};

/// Token counters summed over every attempt of one logical call.
///
/// `total_tokens` is never stored; it is always derived from the two
/// counters, so it cannot drift from their sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the request messages.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens produced by the model.
    #[serde(default)]
    pub completion_tokens: u64,
}

impl Usage {
    /// Creates counters from prompt and completion token counts.
    #[must_use]
    pub const fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Sum of prompt and completion tokens.
    #[must_use]
    pub const fn total_tokens(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }

    /// Adds another attempt's usage to this one.
    pub fn accumulate(&mut self, other: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
    }
}

impl std::ops::Add for Usage {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self.accumulate(rhs);
        self
    }
}

impl Serialize for Usage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Usage", 3)?;
        state.serialize_field("prompt_tokens", &self.prompt_tokens)?;
        state.serialize_field("completion_tokens", &self.completion_tokens)?;
        state.serialize_field("total_tokens", &self.total_tokens())?;
        state.end()
    }
}
