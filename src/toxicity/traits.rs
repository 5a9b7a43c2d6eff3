// Classifier seams: the label set, per-comment predictions, and the traits
// that separate tokenization and the forward pass from batching/thresholding.
//
// The default implementations are the BERT WordPiece encoder and the ONNX
// session in `encoding.rs` / `onnx.rs`; tests plug in deterministic stubs.

use std::sync::{Arc, Mutex};

use anyhow::Result;

use super::encoding::EncodedInput;

/// Number of labels the classification head outputs.
pub const LABEL_COUNT: usize = 6;

/// Raw model scores (pre-sigmoid) for one comment, in `ToxicityLabel::ALL` order.
pub type Logits = [f32; LABEL_COUNT];

/// Output labels, in the order the model returns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToxicityLabel {
    Toxic,
    SevereToxic,
    Obscene,
    Threat,
    Insult,
    IdentityHate,
}

impl ToxicityLabel {
    pub const ALL: [ToxicityLabel; LABEL_COUNT] = [
        ToxicityLabel::Toxic,
        ToxicityLabel::SevereToxic,
        ToxicityLabel::Obscene,
        ToxicityLabel::Threat,
        ToxicityLabel::Insult,
        ToxicityLabel::IdentityHate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToxicityLabel::Toxic => "toxic",
            ToxicityLabel::SevereToxic => "severe_toxic",
            ToxicityLabel::Obscene => "obscene",
            ToxicityLabel::Threat => "threat",
            ToxicityLabel::Insult => "insult",
            ToxicityLabel::IdentityHate => "identity_hate",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ToxicityLabel::Toxic => "Toxic",
            ToxicityLabel::SevereToxic => "Severe Toxic",
            ToxicityLabel::Obscene => "Obscene",
            ToxicityLabel::Threat => "Threat",
            ToxicityLabel::Insult => "Insult",
            ToxicityLabel::IdentityHate => "Identity Hate",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Thresholded labels for one comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionVector {
    pub comment_id: String,
    pub labels: [bool; LABEL_COUNT],
}

impl PredictionVector {
    /// True when any label fired.
    pub fn is_toxic(&self) -> bool {
        self.labels.iter().any(|&l| l)
    }

    pub fn has(&self, label: ToxicityLabel) -> bool {
        self.labels[label.index()]
    }

    pub fn flagged(&self) -> impl Iterator<Item = ToxicityLabel> + '_ {
        ToxicityLabel::ALL.into_iter().filter(|l| self.has(*l))
    }
}

/// Turns comment text into fixed-length model input.
pub trait TextEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Result<EncodedInput>;
}

/// One forward pass over a batch. Blocking; always called from a blocking
/// worker thread, never on the async runtime.
pub trait ToxicityModel: Send {
    fn forward(&mut self, batch: &[EncodedInput]) -> Result<Vec<Logits>>;
}

/// A loaded encoder + model pair, shared with blocking workers.
#[derive(Clone)]
pub struct LoadedModel {
    pub encoder: Arc<dyn TextEncoder>,
    pub model: Arc<Mutex<dyn ToxicityModel>>,
}

/// Produces a `LoadedModel` from wherever the weights live.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<LoadedModel>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order_matches_model_head() {
        let names: Vec<_> = ToxicityLabel::ALL.iter().map(|l| l.as_str()).collect();
        assert_eq!(
            names,
            ["toxic", "severe_toxic", "obscene", "threat", "insult", "identity_hate"]
        );
    }

    #[test]
    fn test_prediction_flags() {
        let p = PredictionVector {
            comment_id: "c1".to_string(),
            labels: [false, false, true, false, true, false],
        };
        assert!(p.is_toxic());
        assert!(p.has(ToxicityLabel::Obscene));
        assert!(!p.has(ToxicityLabel::Threat));
        let flagged: Vec<_> = p.flagged().collect();
        assert_eq!(flagged, vec![ToxicityLabel::Obscene, ToxicityLabel::Insult]);

        let clean = PredictionVector {
            comment_id: "c2".to_string(),
            labels: [false; LABEL_COUNT],
        };
        assert!(!clean.is_toxic());
    }
}
