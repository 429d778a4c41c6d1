//! Model-named tokenizer shared by every chunking strategy.
//!
//! Window sizing and the `token_count` reported on each chunk must come
//! from the same encoder, otherwise downstream token budgets drift. The
//! handle is cheap to clone; all clones share one loaded BPE.

use std::fmt;
use std::sync::Arc;

use tiktoken_rs::{CoreBPE, Rank, get_bpe_from_model};

use crate::types::{IngestError, Result};

/// Shared handle to a byte-pair encoder resolved from a model name.
#[derive(Clone)]
pub struct Tokenizer {
    model: String,
    bpe: Arc<CoreBPE>,
}

impl Tokenizer {
    /// Resolve the encoder for a model name (e.g. `"gpt-4"`).
    ///
    /// An unrecognized model is a configuration error, raised once at
    /// startup rather than per call.
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = get_bpe_from_model(model).map_err(|e| {
            IngestError::Config(format!("unknown tokenizer model '{model}': {e}"))
        })?;
        Ok(Self {
            model: model.to_string(),
            bpe: Arc::new(bpe),
        })
    }

    /// Name of the model this encoder was resolved from.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Number of tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    /// Encode `text` into token ids.
    pub fn encode(&self, text: &str) -> Vec<Rank> {
        self.bpe.encode_ordinary(text)
    }

    /// Decode token ids back into text.
    pub fn decode(&self, tokens: Vec<Rank>) -> Result<String> {
        self.bpe
            .decode(tokens)
            .map_err(|e| IngestError::Chunking(format!("token decode failed: {e}")))
    }
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_a_known_model() {
        let tokenizer = Tokenizer::for_model("gpt-4").unwrap();
        assert_eq!(tokenizer.model(), "gpt-4");
        assert!(tokenizer.count("hello world") >= 1);
    }

    #[test]
    fn unknown_model_is_a_config_error() {
        let err = Tokenizer::for_model("definitely-not-a-model").unwrap_err();
        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn encode_decode_round_trips() {
        let tokenizer = Tokenizer::for_model("gpt-4").unwrap();
        let tokens = tokenizer.encode("chunking preserves text");
        let text = tokenizer.decode(tokens).unwrap();
        assert_eq!(text, "chunking preserves text");
    }
}
