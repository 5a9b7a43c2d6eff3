// Local ONNX forward pass for the fine-tuned BERT toxicity classifier.
//
// The checkpoint is bert-base-uncased with a 768 -> 6 linear head, exported
// to ONNX. It runs entirely on the local CPU. Inputs are i64 tensors of shape
// [batch, 200] named input_ids / attention_mask / token_type_ids; the single
// output is raw logits of shape [batch, 6].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tracing::debug;

use super::download::{model_files_present, MODEL_FILE, TOKENIZER_FILE};
use super::encoding::{BertEncoder, EncodedInput};
use super::traits::{LoadedModel, Logits, ModelLoader, ToxicityModel, LABEL_COUNT};

pub struct OnnxToxicityModel {
    // Session::run takes &mut self; the classifier serializes access through
    // the Mutex in LoadedModel.
    session: Session,
}

impl OnnxToxicityModel {
    pub fn load(model_path: &Path) -> Result<Self> {
        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        debug!("Loaded ONNX toxicity model from {}", model_path.display());
        Ok(Self { session })
    }
}

impl ToxicityModel for OnnxToxicityModel {
    fn forward(&mut self, batch: &[EncodedInput]) -> Result<Vec<Logits>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let batch_size = batch.len();
        let seq_len = batch[0].len();
        if batch.iter().any(|e| e.len() != seq_len) {
            anyhow::bail!("All inputs in a batch must have the same length");
        }

        // Flatten to row-major [batch_size, seq_len]
        let mut input_ids: Vec<i64> = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask: Vec<i64> = Vec::with_capacity(batch_size * seq_len);
        let mut token_type_ids: Vec<i64> = Vec::with_capacity(batch_size * seq_len);
        for enc in batch {
            input_ids.extend_from_slice(&enc.input_ids);
            attention_mask.extend_from_slice(&enc.attention_mask);
            token_type_ids.extend_from_slice(&enc.token_type_ids);
        }

        let shape = [batch_size as i64, seq_len as i64];
        let input_ids_tensor =
            Tensor::from_array((shape, input_ids)).context("Failed to create input_ids tensor")?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
            .context("Failed to create attention_mask tensor")?;
        let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids))
            .context("Failed to create token_type_ids tensor")?;

        let outputs = self
            .session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
            .context("ONNX inference failed")?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract output tensor")?;

        if data.len() != batch_size * LABEL_COUNT {
            anyhow::bail!(
                "Model returned {} scores for a batch of {} (expected {} per input)",
                data.len(),
                batch_size,
                LABEL_COUNT
            );
        }

        Ok(data
            .chunks_exact(LABEL_COUNT)
            .map(|row| {
                let mut logits = [0f32; LABEL_COUNT];
                logits.copy_from_slice(row);
                logits
            })
            .collect())
    }
}

/// Loads `tokenizer.json` + `toxic_model.onnx` from a model directory.
pub struct OnnxModelLoader {
    model_dir: PathBuf,
}

impl OnnxModelLoader {
    pub fn new(model_dir: &Path) -> Self {
        Self {
            model_dir: model_dir.to_path_buf(),
        }
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self) -> Result<LoadedModel> {
        if !model_files_present(&self.model_dir) {
            anyhow::bail!(
                "Model files not found in {}\nRun `ytdetox download-model` to download them.",
                self.model_dir.display()
            );
        }

        let encoder = BertEncoder::from_file(&self.model_dir.join(TOKENIZER_FILE))?;
        let model = OnnxToxicityModel::load(&self.model_dir.join(MODEL_FILE))?;

        Ok(LoadedModel {
            encoder: Arc::new(encoder),
            model: Arc::new(Mutex::new(model)),
        })
    }
}
