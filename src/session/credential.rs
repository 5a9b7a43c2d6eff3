// Credential store: the access/refresh token pair for one signed-in account.
//
// Pure state, no I/O. A refresh response may omit the refresh token (Google
// only sends one on the first authorization-code exchange), so `update` merges
// non-empty fields and never wipes what we already have.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens are treated as expired this long before their real expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// None when the token endpoint did not report a lifetime.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Credential {
    /// Build a credential from a token-endpoint grant received at `now`.
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Self {
        Credential {
            expires_at: grant.expires_in.map(|secs| now + Duration::seconds(secs)),
            scopes: grant.scopes(),
            refresh_token: grant.refresh_token.filter(|t| !t.is_empty()),
            access_token: grant.access_token,
        }
    }

    /// Whether the access token should be refreshed before use.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= at,
            None => false,
        }
    }
}

/// Fields consumed from an OAuth2 token endpoint response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Space-separated scope list.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenGrant {
    fn scopes(&self) -> Vec<String> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Holds at most one credential. Not synchronized, see `Session`.
#[derive(Debug, Default)]
pub struct CredentialStore {
    credential: Option<Credential>,
}

impl CredentialStore {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
        }
    }

    pub fn get(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Merge a refresh grant into the stored credential. Empty or absent
    /// fields in the grant leave the stored values untouched.
    pub fn update(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        let scopes = grant.scopes();
        let Some(current) = self.credential.as_mut() else {
            self.credential = Some(Credential::from_grant(grant, now));
            return;
        };

        if !grant.access_token.is_empty() {
            current.access_token = grant.access_token;
        }
        if let Some(refresh) = grant.refresh_token.filter(|t| !t.is_empty()) {
            current.refresh_token = Some(refresh);
        }
        if let Some(secs) = grant.expires_in {
            current.expires_at = Some(now + Duration::seconds(secs));
        }
        if !scopes.is_empty() {
            current.scopes = scopes;
        }
    }

    /// Drop all state (logout / revoke).
    pub fn clear(&mut self) {
        self.credential = None;
    }
}
