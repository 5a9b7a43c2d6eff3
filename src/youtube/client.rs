// YouTube Data API v3 client: bearer-token calls with uniform error
// classification.
//
// The YouTubeApi trait is the seam the pipeline depends on; YouTubeClient is
// the reqwest implementation. Each operation takes the credential to use, so
// the session (not the client) owns token state and refresh.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::{classify_status, classify_transport, ApiError, Entity};
use super::types::{
    ChannelDetails, ChannelListResponse, CommentPage, CommentThreadListResponse,
    ModerationStatus, SearchListResponse, VideoListResponse, VideoSummary,
};
use crate::session::Credential;

/// Default data API endpoint.
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Maximum page size for commentThreads.list.
const COMMENT_PAGE_SIZE: &str = "100";

#[async_trait]
pub trait YouTubeApi: Send + Sync {
    /// The signed-in account's channel. `EntityNotFound(channel)` if it has none.
    async fn fetch_channel(&self, credential: &Credential) -> Result<ChannelDetails, ApiError>;

    /// Most recent uploads, newest first. `EntityNotFound(video)` if none.
    async fn fetch_recent_videos(
        &self,
        credential: &Credential,
        limit: u32,
    ) -> Result<Vec<VideoSummary>, ApiError>;

    /// One page of top-level comments. `page_token` is None for the first
    /// page, which fails with `EntityNotFound(comment_thread)` when empty.
    async fn fetch_comment_page(
        &self,
        credential: &Credential,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentPage, ApiError>;

    /// Bulk moderation write. A non-2xx response fails the whole batch.
    async fn set_moderation_status(
        &self,
        credential: &Credential,
        comment_ids: &[String],
        status: ModerationStatus,
    ) -> Result<(), ApiError>;
}

pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl YouTubeClient {
    /// Create a client for `base_url` with a per-call timeout applied to
    /// every request.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("ytdetox/0.1 (comment-moderation)")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    fn request(
        &self,
        method: reqwest::Method,
        resource: &str,
        credential: &Credential,
        params: &[(&str, &str)],
    ) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, resource);
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&credential.access_token)
            .query(params);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }
        request
    }

    /// Send a request and classify any failure.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        resource: &str,
        reading: Option<Entity>,
    ) -> Result<reqwest::Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if let Some(err) = classify_status(status, reading) {
            let body = response.text().await.unwrap_or_default();
            warn!(
                resource = resource,
                status = status.as_u16(),
                body = %crate::output::truncate_chars(&body, 200),
                "YouTube API call failed"
            );
            return Err(err);
        }
        Ok(response)
    }

    /// GET a list resource and deserialize the response.
    async fn get_json<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        resource: &str,
        params: &[(&str, &str)],
        entity: Entity,
    ) -> Result<T, ApiError> {
        debug!(resource = resource, "YouTube API GET");
        let request = self.request(reqwest::Method::GET, resource, credential, params);
        let response = self.send(request, resource, Some(entity)).await?;
        response.json::<T>().await.map_err(|e| {
            warn!(resource = resource, error = %e, "Undecodable YouTube API response");
            ApiError::QuotaExceeded
        })
    }
}

#[async_trait]
impl YouTubeApi for YouTubeClient {
    async fn fetch_channel(&self, credential: &Credential) -> Result<ChannelDetails, ApiError> {
        let resp: ChannelListResponse = self
            .get_json(
                credential,
                "channels",
                &[("part", "snippet,statistics"), ("mine", "true")],
                Entity::Channel,
            )
            .await?;

        resp.items
            .into_iter()
            .next()
            .map(ChannelDetails::from)
            .ok_or_else(|| ApiError::not_found(Entity::Channel, "this account has no YouTube channel"))
    }

    async fn fetch_recent_videos(
        &self,
        credential: &Credential,
        limit: u32,
    ) -> Result<Vec<VideoSummary>, ApiError> {
        // search.list accepts maxResults 1..=50; the CLI validates the same
        // range, library callers get clamped
        let max_results = limit.clamp(1, 50).to_string();
        let search: SearchListResponse = self
            .get_json(
                credential,
                "search",
                &[
                    ("part", "snippet"),
                    ("forMine", "true"),
                    ("type", "video"),
                    ("order", "date"),
                    ("maxResults", max_results.as_str()),
                ],
                Entity::Video,
            )
            .await?;

        let ids: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|r| r.id.video_id)
            .collect();
        if ids.is_empty() {
            return Err(ApiError::not_found(Entity::Video, "no uploaded videos"));
        }

        let joined = ids.join(",");
        let details: VideoListResponse = self
            .get_json(
                credential,
                "videos",
                &[("part", "snippet,statistics"), ("id", joined.as_str())],
                Entity::Video,
            )
            .await?;

        // videos.list does not promise the order of the id list; restore it
        let mut videos: Vec<VideoSummary> =
            details.items.into_iter().map(VideoSummary::from).collect();
        videos.sort_by_key(|v| ids.iter().position(|id| *id == v.id).unwrap_or(usize::MAX));

        if videos.is_empty() {
            return Err(ApiError::not_found(Entity::Video, "no uploaded videos"));
        }
        Ok(videos)
    }

    async fn fetch_comment_page(
        &self,
        credential: &Credential,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentPage, ApiError> {
        let mut params = vec![
            ("part", "snippet"),
            ("maxResults", COMMENT_PAGE_SIZE),
            ("videoId", video_id),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let resp: CommentThreadListResponse = self
            .get_json(credential, "commentThreads", &params, Entity::CommentThread)
            .await?;
        let page = CommentPage::from(resp);

        if page_token.is_none() && page.items.is_empty() {
            return Err(ApiError::not_found(
                Entity::CommentThread,
                format!("video {video_id} has no comments"),
            ));
        }

        debug!(
            video_id = video_id,
            items = page.items.len(),
            has_next = page.next_page_token.is_some(),
            "Fetched comment page"
        );
        Ok(page)
    }

    async fn set_moderation_status(
        &self,
        credential: &Credential,
        comment_ids: &[String],
        status: ModerationStatus,
    ) -> Result<(), ApiError> {
        let ids = comment_ids.join(",");
        let request = self.request(
            reqwest::Method::POST,
            "comments/setModerationStatus",
            credential,
            &[("id", ids.as_str()), ("moderationStatus", status.as_str())],
        );
        // Empty body; the API answers 204 No Content
        let request = request.header(reqwest::header::CONTENT_LENGTH, 0);

        self.send(request, "comments/setModerationStatus", None)
            .await?;

        debug!(
            count = comment_ids.len(),
            status = status.as_str(),
            "Moderation status updated"
        );
        Ok(())
    }
}
