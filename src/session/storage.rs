// Credential file: where the CLI keeps the signed-in account between runs.
//
// Written after the OAuth callback, rewritten whenever a pass refreshed the
// token, removed on logout/revoke. Only the credential lives here; comment
// data is never persisted.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::credential::Credential;

/// Returns the default credential file path.
/// Uses the platform config directory: ~/.config/ytdetox/credentials.json on Linux.
pub fn default_credentials_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytdetox")
        .join("credentials.json")
}

/// Load the stored credential, if any.
pub fn load(path: &Path) -> Result<Option<Credential>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read credentials from {}", path.display()))?;
    let credential = serde_json::from_str(&json)
        .with_context(|| format!("Corrupt credential file: {}", path.display()))?;
    Ok(Some(credential))
}

pub fn save(path: &Path, credential: &Credential) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(credential)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write credentials to {}", path.display()))?;
    debug!(path = %path.display(), "Saved credentials");
    Ok(())
}

/// Delete the credential file. Missing files are fine.
pub fn remove(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}
