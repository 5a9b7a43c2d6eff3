// Toxicity classifier: batching, blocking-worker dispatch, and thresholding.
//
// State machine: Unloaded -> Loaded. `load()` is idempotent (OnceCell), and
// `classify()` refuses to run until it has happened.
//
// Comments are split into batches of 8 in input order. Each batch is encoded
// and run on a spawn_blocking worker so inference never stalls the runtime
// that is serving network I/O. Logits go through a sigmoid and a fixed
// inclusive 0.5 threshold.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::onnx::OnnxModelLoader;
use super::traits::{
    LoadedModel, Logits, ModelLoader, PredictionVector, TextEncoder, ToxicityModel, LABEL_COUNT,
};
use crate::youtube::types::Comment;

/// Comments per forward pass.
pub const BATCH_SIZE: usize = 8;

/// Decision boundary on sigmoid output. Not configurable.
pub const THRESHOLD: f64 = 0.5;

pub struct ToxicityClassifier {
    loader: Arc<dyn ModelLoader>,
    loaded: OnceCell<LoadedModel>,
}

impl ToxicityClassifier {
    /// An unloaded classifier that will load from `loader`.
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            loaded: OnceCell::new(),
        }
    }

    /// An unloaded classifier backed by the ONNX files in `model_dir`.
    pub fn onnx(model_dir: &Path) -> Self {
        Self::new(Arc::new(OnnxModelLoader::new(model_dir)))
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Load tokenizer and weights. Calling it again after success is a no-op.
    pub async fn load(&self) -> Result<()> {
        self.loaded
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                // Reading a few hundred MB of weights is blocking work too
                let loaded = tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .context("model loading task panicked")??;
                info!("Toxicity model loaded");
                Ok::<_, anyhow::Error>(loaded)
            })
            .await?;
        Ok(())
    }

    /// Classify comments, returning one prediction per comment in input order.
    pub async fn classify(&self, comments: &[Comment]) -> Result<Vec<PredictionVector>> {
        let loaded = self
            .loaded
            .get()
            .context("Toxicity classifier used before load()")?;

        let mut predictions = Vec::with_capacity(comments.len());

        for (batch_no, batch) in comments.chunks(BATCH_SIZE).enumerate() {
            let encoder = Arc::clone(&loaded.encoder);
            let model = Arc::clone(&loaded.model);
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

            let logits = tokio::task::spawn_blocking(move || run_batch(encoder.as_ref(), &model, &texts))
                .await
                .context("inference task panicked")??;

            if logits.len() != batch.len() {
                anyhow::bail!(
                    "Model returned {} predictions for a batch of {}",
                    logits.len(),
                    batch.len()
                );
            }

            for (comment, row) in batch.iter().zip(&logits) {
                predictions.push(PredictionVector {
                    comment_id: comment.id.clone(),
                    labels: threshold_logits(row),
                });
            }

            debug!(batch = batch_no, size = batch.len(), "Classified batch");
        }

        Ok(predictions)
    }
}

/// Encode and run one batch. Runs on a blocking worker thread.
fn run_batch(
    encoder: &dyn TextEncoder,
    model: &Mutex<dyn ToxicityModel>,
    texts: &[String],
) -> Result<Vec<Logits>> {
    let encoded = texts
        .iter()
        .map(|t| encoder.encode(t))
        .collect::<Result<Vec<_>>>()?;

    let mut model = model
        .lock()
        .map_err(|e| anyhow::anyhow!("Model lock poisoned: {}", e))?;
    model.forward(&encoded)
}

/// Logistic sigmoid that never overflows: exp() only ever sees a
/// non-positive argument.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Inclusive threshold: exactly 0.5 counts as a positive label.
pub fn label_from_probability(p: f64) -> bool {
    p >= THRESHOLD
}

pub fn threshold_logits(logits: &Logits) -> [bool; LABEL_COUNT] {
    let mut labels = [false; LABEL_COUNT];
    for (label, &logit) in labels.iter_mut().zip(logits) {
        *label = label_from_probability(sigmoid(logit as f64));
    }
    labels
}
