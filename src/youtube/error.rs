// Classified failures of the YouTube API boundary.
//
// Every call into the data API or the OAuth token endpoint ends in success or
// in exactly one of these three outcomes. Nothing else escapes the client:
// transport errors, timeouts and undecodable bodies are folded into
// QuotaExceeded ("try again later").

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// Which upstream collection came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Channel,
    Video,
    CommentThread,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Channel => "channel",
            Entity::Video => "video",
            Entity::CommentThread => "comment_thread",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Request budget exhausted, or a transient transport failure. Never
    /// retried automatically within the same pass.
    #[error("YouTube API quota exceeded or upstream unavailable, try again later")]
    QuotaExceeded,

    /// The access token was rejected. Callers refresh once and replay once.
    #[error("access token expired or revoked")]
    AccessTokenExpired,

    /// A legitimate empty state: no channel, no videos, or no comments.
    #[error("no {entity} found: {message}")]
    EntityNotFound { entity: Entity, message: String },
}

impl ApiError {
    pub fn not_found(entity: Entity, message: impl Into<String>) -> Self {
        Self::EntityNotFound {
            entity,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self, wanted: Entity) -> bool {
        matches!(self, ApiError::EntityNotFound { entity, .. } if *entity == wanted)
    }
}

/// Map a response status to its classified failure. Returns `None` for 2xx.
///
/// `reading` names the collection a read expected. Writes pass `None`: a
/// failed write is one failure for the whole batch, so a 404 there is
/// QuotaExceeded rather than an empty state.
pub fn classify_status(status: StatusCode, reading: Option<Entity>) -> Option<ApiError> {
    if status.is_success() {
        return None;
    }
    Some(match (status, reading) {
        (StatusCode::UNAUTHORIZED, _) => ApiError::AccessTokenExpired,
        (StatusCode::NOT_FOUND, Some(entity)) => {
            ApiError::not_found(entity, format!("upstream returned {status}"))
        }
        _ => ApiError::QuotaExceeded,
    })
}

/// Transport-level failures (connect, timeout, body read) are transient.
pub fn classify_transport(err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        tracing::warn!("YouTube API call timed out");
    } else {
        tracing::warn!(error = %err, "YouTube API transport failure");
    }
    ApiError::QuotaExceeded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_not_an_error() {
        assert_eq!(classify_status(StatusCode::OK, Some(Entity::Video)), None);
        assert_eq!(classify_status(StatusCode::NO_CONTENT, Some(Entity::Video)), None);
    }

    #[test]
    fn test_unauthorized_means_expired_token() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, Some(Entity::Channel)),
            Some(ApiError::AccessTokenExpired)
        );
    }

    #[test]
    fn test_forbidden_means_quota() {
        assert_eq!(
            classify_status(StatusCode::FORBIDDEN, Some(Entity::CommentThread)),
            Some(ApiError::QuotaExceeded)
        );
    }

    #[test]
    fn test_not_found_carries_entity() {
        let err = classify_status(StatusCode::NOT_FOUND, Some(Entity::CommentThread)).unwrap();
        assert!(err.is_not_found(Entity::CommentThread));
        assert!(!err.is_not_found(Entity::Video));
    }

    #[test]
    fn test_server_errors_are_transient() {
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, Some(Entity::Video)),
            Some(ApiError::QuotaExceeded)
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some(Entity::Video)),
            Some(ApiError::QuotaExceeded)
        );
    }

    #[test]
    fn test_write_failures_never_report_empty_state() {
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND, None),
            Some(ApiError::QuotaExceeded)
        );
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, None),
            Some(ApiError::QuotaExceeded)
        );
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED, None),
            Some(ApiError::AccessTokenExpired)
        );
        assert_eq!(classify_status(StatusCode::NO_CONTENT, None), None);
    }

    #[test]
    fn test_entity_display_names() {
        assert_eq!(Entity::CommentThread.to_string(), "comment_thread");
        assert_eq!(Entity::Channel.to_string(), "channel");
    }
}
