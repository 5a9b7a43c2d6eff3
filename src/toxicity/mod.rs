// Toxicity classification: multi-label BERT classifier run locally via ONNX.
//
// The classifier batches and thresholds; encoding and the forward pass sit
// behind the TextEncoder / ToxicityModel traits so the pipeline can be
// exercised without model files.

pub mod classifier;
pub mod download;
pub mod encoding;
pub mod onnx;
pub mod traits;

pub use classifier::ToxicityClassifier;
pub use traits::{PredictionVector, ToxicityLabel};
