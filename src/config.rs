use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::youtube::oauth::DEFAULT_REDIRECT_URI;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Central configuration loaded from environment variables.
///
/// Secrets come from env vars only. The .env file is loaded at startup
/// via dotenvy.
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Optional key appended to every data-API call as `key=`.
    pub api_key: Option<String>,
    pub api_url: String,
    /// Directory containing tokenizer.json and toxic_model.onnx
    pub model_dir: PathBuf,
    /// Where the fine-tuned ONNX export can be downloaded from
    pub model_url: Option<String>,
    pub credentials_path: PathBuf,
    /// Per-call timeout applied to every HTTP request
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables. Nothing here is
    /// mandatory; commands call the `require_*` guards for what they need.
    pub fn load() -> Result<Self> {
        let http_timeout = parse_http_timeout(env::var("YTDETOX_HTTP_TIMEOUT_SECS").ok().as_deref())?;

        Ok(Self {
            client_id: env::var("YOUTUBE_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("YOUTUBE_CLIENT_SECRET").unwrap_or_default(),
            redirect_uri: env::var("YOUTUBE_REDIRECT_URI")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string()),
            api_key: non_empty_var("YOUTUBE_API_KEY"),
            api_url: env::var("YOUTUBE_API_URL")
                .unwrap_or_else(|_| crate::youtube::client::DEFAULT_API_URL.to_string()),
            model_dir: env::var("YTDETOX_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| crate::toxicity::download::default_model_dir()),
            model_url: non_empty_var("YTDETOX_MODEL_URL"),
            credentials_path: env::var("YTDETOX_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| crate::session::storage::default_credentials_path()),
            http_timeout,
        })
    }

    /// Check that the OAuth client is configured.
    /// Call this before login, refresh, or revoke.
    pub fn require_oauth(&self) -> Result<()> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            anyhow::bail!(
                "YOUTUBE_CLIENT_ID / YOUTUBE_CLIENT_SECRET not set. Add them to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Check that the model files exist before anything tries to load them.
    pub fn require_model(&self) -> Result<()> {
        if !crate::toxicity::download::model_files_present(&self.model_dir) {
            anyhow::bail!(
                "Model files not found in {}\n\
                 Run `ytdetox download-model` to fetch them.",
                self.model_dir.display()
            );
        }
        Ok(())
    }
}

/// Seconds for the per-call HTTP timeout. Unset means 30; zero is rejected
/// because every request would time out immediately.
fn parse_http_timeout(raw: Option<&str>) -> Result<Duration> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
    };
    let secs = raw.trim().parse::<u64>().map_err(|_| {
        anyhow::anyhow!("YTDETOX_HTTP_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}")
    })?;
    if secs == 0 {
        anyhow::bail!("YTDETOX_HTTP_TIMEOUT_SECS must be at least 1");
    }
    Ok(Duration::from_secs(secs))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_timeout_defaults_to_30s() {
        assert_eq!(parse_http_timeout(None).unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn test_http_timeout_parses_seconds() {
        assert_eq!(parse_http_timeout(Some(" 5 ")).unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_http_timeout_rejects_zero_and_garbage() {
        let err = parse_http_timeout(Some("0")).unwrap_err();
        assert!(err.to_string().contains("at least 1"), "got: {err}");
        assert!(parse_http_timeout(Some("ten")).is_err());
        assert!(parse_http_timeout(Some("-3")).is_err());
    }
}
