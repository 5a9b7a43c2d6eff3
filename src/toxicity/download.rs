// Model file management.
//
// Two files make up the classifier:
// 1. tokenizer.json: the stock bert-base-uncased WordPiece tokenizer, from HuggingFace
// 2. toxic_model.onnx: the fine-tuned BERT + classification head export (~420MB),
//    fetched from YTDETOX_MODEL_URL since it is not published on the Hub
//
// Files are stored in a platform-appropriate directory
// (~/.local/share/ytdetox/models/ on Linux) so they persist across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Tokenizer for the pretrained base model.
const TOKENIZER_URL: &str =
    "https://huggingface.co/google-bert/bert-base-uncased/resolve/main/tokenizer.json";

pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const MODEL_FILE: &str = "toxic_model.onnx";

/// Returns the default directory for storing model files.
/// Uses the platform data directory: ~/.local/share/ytdetox/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytdetox")
        .join("models")
}

/// Check whether both model files exist.
pub fn model_files_present(dir: &Path) -> bool {
    dir.join(MODEL_FILE).exists() && dir.join(TOKENIZER_FILE).exists()
}

/// Download the tokenizer and the fine-tuned model into `dir`.
///
/// Skips files that already exist. `model_url` is required only when the
/// model file is missing.
pub async fn download_model(dir: &Path, model_url: Option<&str>) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    let tokenizer_path = dir.join(TOKENIZER_FILE);
    if tokenizer_path.exists() {
        info!("Tokenizer already exists, skipping");
        println!("  {} (already exists)", TOKENIZER_FILE);
    } else {
        println!("  Downloading {}...", TOKENIZER_FILE);
        download_file(TOKENIZER_URL, &tokenizer_path, false).await?;
    }

    let model_path = dir.join(MODEL_FILE);
    if model_path.exists() {
        info!("Model already exists, skipping");
        println!("  {} (already exists)", MODEL_FILE);
    } else {
        let Some(url) = model_url else {
            anyhow::bail!(
                "YTDETOX_MODEL_URL not set. Point it at the fine-tuned ONNX export,\n\
                 or copy {} into {} by hand.",
                MODEL_FILE,
                dir.display()
            );
        };
        println!("  Downloading {} (~420 MB)...", MODEL_FILE);
        download_file(url, &model_path, true).await?;
    }

    Ok(())
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        let pb = match response.content_length() {
            Some(size) => {
                let pb = ProgressBar::new(size);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                        .context("Invalid progress template")?
                        .progress_chars("=> "),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("    {spinner} {bytes}")
                        .context("Invalid progress template")?,
                );
                pb
            }
        };
        Some(pb)
    } else {
        None
    };

    // Stream chunks so the progress bar moves
    let mut bytes = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        bytes.extend_from_slice(&chunk);
        if let Some(ref pb) = pb {
            pb.set_position(bytes.len() as u64);
        }
    }

    // Write to a temp name first so an interrupted download never looks complete
    let partial = dest.with_extension("part");
    std::fs::write(&partial, &bytes)
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_ytdetox() {
        let dir = default_model_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("ytdetox") && path_str.contains("models"),
            "Expected path containing ytdetox/models, got: {path_str}"
        );
    }

    #[test]
    fn test_model_files_present_false_when_empty() {
        let dir = std::env::temp_dir().join("ytdetox-test-nonexistent");
        assert!(!model_files_present(&dir));
    }

    #[test]
    fn test_model_files_present_needs_both_files() {
        let dir = std::env::temp_dir().join(format!("ytdetox-model-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(TOKENIZER_FILE), b"{}").unwrap();
        assert!(!model_files_present(&dir));

        std::fs::write(dir.join(MODEL_FILE), b"fake").unwrap();
        assert!(model_files_present(&dir));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_model_url_is_reported() {
        let dir = std::env::temp_dir().join(format!("ytdetox-dl-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        // Pretend the tokenizer is already there so nothing hits the network
        std::fs::write(dir.join(TOKENIZER_FILE), b"{}").unwrap();

        let err = download_model(&dir, None).await.unwrap_err();
        assert!(err.to_string().contains("YTDETOX_MODEL_URL"), "got: {err}");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
