// Fixed-length BERT input encoding.
//
// Every comment becomes exactly MAX_TOKENS positions:
//   [CLS] content... [SEP] [PAD]...
// Content longer than MAX_TOKENS - 2 is truncated; the attention mask is 1
// for [CLS], content and [SEP], 0 for padding. Single-sentence input, so
// token_type_ids are all zero.

use std::path::Path;

use anyhow::{Context, Result};
use tokenizers::Tokenizer;

use super::traits::TextEncoder;

/// Sequence length the classification head was fine-tuned with.
pub const MAX_TOKENS: usize = 200;

/// Model input for one comment. All three vectors have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInput {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

impl EncodedInput {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of real (unpadded) positions.
    pub fn real_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub cls: u32,
    pub sep: u32,
    pub pad: u32,
}

impl SpecialTokens {
    /// Ids in the bert-base-uncased vocabulary.
    pub const BERT_UNCASED: SpecialTokens = SpecialTokens {
        cls: 101,
        sep: 102,
        pad: 0,
    };
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Wrap content token ids in [CLS]/[SEP] and truncate or pad to `max_len`.
pub fn pack_tokens(content: &[u32], special: SpecialTokens, max_len: usize) -> EncodedInput {
    let keep = content.len().min(max_len.saturating_sub(2));

    let mut input_ids = Vec::with_capacity(max_len);
    input_ids.push(special.cls as i64);
    input_ids.extend(content[..keep].iter().map(|&id| id as i64));
    input_ids.push(special.sep as i64);
    let real = input_ids.len();

    let pad_len = max_len.saturating_sub(real);
    input_ids.extend(std::iter::repeat_n(special.pad as i64, pad_len));

    let mut attention_mask = vec![1i64; real];
    attention_mask.extend(std::iter::repeat_n(0i64, pad_len));

    EncodedInput {
        token_type_ids: vec![0i64; input_ids.len()],
        input_ids,
        attention_mask,
    }
}

/// WordPiece encoder backed by a HuggingFace `tokenizer.json`.
pub struct BertEncoder {
    tokenizer: Tokenizer,
    special: SpecialTokens,
}

impl BertEncoder {
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))?;

        let lookup = |token: &str| {
            tokenizer
                .token_to_id(token)
                .with_context(|| format!("Tokenizer vocabulary has no {token} token"))
        };
        let special = SpecialTokens {
            cls: lookup("[CLS]")?,
            sep: lookup("[SEP]")?,
            pad: lookup("[PAD]")?,
        };

        Ok(Self { tokenizer, special })
    }
}

impl TextEncoder for BertEncoder {
    fn encode(&self, text: &str) -> Result<EncodedInput> {
        let text = normalize_text(text);
        // Special tokens are added by pack_tokens so truncation never drops [SEP]
        let encoding = self
            .tokenizer
            .encode(text.as_str(), false)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;
        Ok(pack_tokens(encoding.get_ids(), self.special, MAX_TOKENS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECIAL: SpecialTokens = SpecialTokens::BERT_UNCASED;

    #[test]
    fn test_long_input_is_truncated_to_exact_length() {
        let content: Vec<u32> = (1000..1500).collect();
        let enc = pack_tokens(&content, SPECIAL, MAX_TOKENS);
        assert_eq!(enc.len(), MAX_TOKENS);
        assert_eq!(enc.attention_mask.len(), MAX_TOKENS);
        assert_eq!(enc.token_type_ids.len(), MAX_TOKENS);
        assert_eq!(enc.real_tokens(), MAX_TOKENS);
        assert_eq!(enc.input_ids[0], 101);
        assert_eq!(enc.input_ids[MAX_TOKENS - 1], 102);
        assert_eq!(enc.input_ids[MAX_TOKENS - 2], 1197);
    }

    #[test]
    fn test_short_input_is_padded_and_masked() {
        let enc = pack_tokens(&[2000, 2001, 2002], SPECIAL, MAX_TOKENS);
        assert_eq!(enc.len(), MAX_TOKENS);
        assert_eq!(&enc.input_ids[..5], &[101, 2000, 2001, 2002, 102]);
        assert_eq!(enc.real_tokens(), 5);
        assert!(enc.attention_mask[..5].iter().all(|&m| m == 1));
        assert!(enc.attention_mask[5..].iter().all(|&m| m == 0));
        assert!(enc.input_ids[5..].iter().all(|&id| id == 0));
    }

    #[test]
    fn test_empty_text_is_valid_input() {
        let enc = pack_tokens(&[], SPECIAL, MAX_TOKENS);
        assert_eq!(enc.len(), MAX_TOKENS);
        assert_eq!(enc.real_tokens(), 2);
    }

    #[test]
    fn test_exact_fit_is_not_padded() {
        let content: Vec<u32> = vec![7; MAX_TOKENS - 2];
        let enc = pack_tokens(&content, SPECIAL, MAX_TOKENS);
        assert_eq!(enc.real_tokens(), MAX_TOKENS);
    }

    #[test]
    fn test_token_type_ids_are_single_segment() {
        let enc = pack_tokens(&[5, 6, 7], SPECIAL, MAX_TOKENS);
        assert!(enc.token_type_ids.iter().all(|&t| t == 0));
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  you\n\nare \t great  "), "you are great");
        assert_eq!(normalize_text(""), "");
    }
}
