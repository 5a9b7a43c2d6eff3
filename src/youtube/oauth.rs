// Google OAuth2: consent URL, authorization-code exchange, refresh, revoke.
//
// Token-endpoint failures are classified like data-API failures: a rejected
// grant (400/401, e.g. `invalid_grant`) means the user must authorize again
// (AccessTokenExpired); anything transport-level is transient (QuotaExceeded).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::RngCore;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use super::error::{classify_transport, ApiError};
use crate::session::{Credential, TokenGrant, TokenRefresher};

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// Read/modify access to the account's YouTube data, including moderation.
pub const SCOPE: &str = "https://www.googleapis.com/auth/youtube.force-ssl";

/// Callback registered for the desktop OAuth client.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/oauth2callback";

pub struct OAuthClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    token_url: String,
    revoke_url: String,
}

impl OAuthClient {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            // Token responses are never redirects
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .context("Failed to build OAuth HTTP client")?;

        Ok(Self {
            client,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            revoke_url: DEFAULT_REVOKE_URL.to_string(),
        })
    }

    /// Point the token and revocation calls somewhere other than Google.
    pub fn with_endpoints(mut self, token_url: &str, revoke_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.revoke_url = revoke_url.to_string();
        self
    }

    /// Consent URL for the authorization-code flow. `offline` access makes
    /// Google issue a refresh token on the first exchange.
    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let url = reqwest::Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPE),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("state", state),
            ],
        )
        .context("Failed to build authorization URL")?;
        Ok(url.into())
    }

    /// Exchange the code from the OAuth callback for a new credential.
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, ApiError> {
        let grant = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await?;
        info!("Authorization code exchanged for tokens");
        Ok(Credential::from_grant(grant, Utc::now()))
    }

    /// Revoke a token at Google. The caller clears local state on success.
    pub async fn revoke(&self, token: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(&self.revoke_url)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Token revocation failed");
            return Err(classify_token_status(status));
        }
        info!("Token revoked");
        Ok(())
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenGrant, ApiError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %crate::output::truncate_chars(&body, 200),
                "Token endpoint rejected request"
            );
            return Err(classify_token_status(status));
        }

        response.json::<TokenGrant>().await.map_err(|e| {
            warn!(error = %e, "Undecodable token endpoint response");
            ApiError::QuotaExceeded
        })
    }
}

#[async_trait]
impl TokenRefresher for OAuthClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, ApiError> {
        debug!("Exchanging refresh token");
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ])
        .await
    }
}

fn classify_token_status(status: StatusCode) -> ApiError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => ApiError::AccessTokenExpired,
        _ => ApiError::QuotaExceeded,
    }
}

/// Random hex nonce for the OAuth `state` parameter.
pub fn new_state() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// What the user brought back from the consent page: either a bare code or
/// the full redirect URL it was delivered on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    pub code: String,
    /// Only present when a redirect URL was pasted.
    pub state: Option<String>,
}

impl Callback {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let Ok(url) = reqwest::Url::parse(input) else {
            if input.is_empty() {
                anyhow::bail!("No authorization code given");
            }
            return Ok(Self {
                code: input.to_string(),
                state: None,
            });
        };

        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };
        if let Some(error) = param("error") {
            anyhow::bail!("Authorization was not granted: {error}");
        }
        let code = param("code")
            .filter(|c| !c.is_empty())
            .context("Redirect URL carries no authorization code")?;
        Ok(Self {
            code,
            state: param("state"),
        })
    }

    /// Reject a redirect whose `state` is not the nonce we put in the
    /// consent URL. A bare code carries no state and cannot be checked.
    pub fn verify_state(&self, expected: Option<&str>) -> Result<()> {
        match (expected, self.state.as_deref()) {
            (Some(expected), Some(returned)) if expected != returned => {
                warn!("OAuth state mismatch on callback");
                anyhow::bail!(
                    "OAuth state mismatch: this redirect was not issued for this login attempt"
                )
            }
            _ => Ok(()),
        }
    }
}
