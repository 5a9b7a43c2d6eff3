// Typed records at the YouTube API boundary.
//
// Wire types (`*Response`, `*Resource`) mirror the JSON the data API returns
// and are converted into domain records immediately on receipt, so the rest of
// the crate never touches untyped maps.
//
// API reference: https://developers.google.com/youtube/v3/docs

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Deserialize;

/// A single top-level comment. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    /// Display text with markup removed. May be empty.
    pub text: String,
}

/// One page of comment threads, consumed immediately then discarded.
#[derive(Debug, Clone, Default)]
pub struct CommentPage {
    pub items: Vec<Comment>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub views: u64,
    pub subscribers: u64,
    pub videos: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDetails {
    pub id: String,
    pub title: String,
    pub logo_url: Option<String>,
    pub stats: ChannelStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    /// First 100 characters of the description.
    pub description: String,
    pub thumbnail_url: Option<String>,
}

/// Values accepted by `comments.setModerationStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationStatus {
    Published,
    HeldForReview,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationStatus::Published => "published",
            ModerationStatus::HeldForReview => "heldForReview",
            ModerationStatus::Rejected => "rejected",
        }
    }
}

// -- commentThreads.list --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadListResponse {
    #[serde(default)]
    pub items: Vec<CommentThreadResource>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentThreadResource {
    pub snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadSnippet {
    pub top_level_comment: CommentResource,
}

#[derive(Debug, Deserialize)]
pub struct CommentResource {
    pub id: String,
    pub snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    #[serde(default)]
    pub text_display: String,
}

impl From<CommentThreadListResponse> for CommentPage {
    fn from(resp: CommentThreadListResponse) -> Self {
        let items = resp
            .items
            .into_iter()
            .map(|thread| {
                let comment = thread.snippet.top_level_comment;
                Comment {
                    text: strip_markup(&comment.snippet.text_display),
                    id: comment.id,
                }
            })
            .collect();

        CommentPage {
            items,
            // The API sometimes sends an empty token on the last page
            next_page_token: resp.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

// -- channels.list --

#[derive(Debug, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelResource>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelResource {
    pub id: String,
    pub snippet: ChannelSnippet,
    #[serde(default)]
    pub statistics: Statistics,
}

#[derive(Debug, Deserialize)]
pub struct ChannelSnippet {
    pub title: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

impl From<ChannelResource> for ChannelDetails {
    fn from(res: ChannelResource) -> Self {
        ChannelDetails {
            id: res.id,
            title: res.snippet.title,
            logo_url: res.snippet.thumbnails.medium_url(),
            stats: ChannelStats {
                views: parse_count(res.statistics.view_count.as_deref()),
                subscribers: parse_count(res.statistics.subscriber_count.as_deref()),
                videos: parse_count(res.statistics.video_count.as_deref()),
            },
        }
    }
}

// -- search.list --

#[derive(Debug, Deserialize)]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub id: SearchResultId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    pub video_id: Option<String>,
}

// -- videos.list --

#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize)]
pub struct VideoResource {
    pub id: String,
    pub snippet: VideoSnippet,
    #[serde(default)]
    pub statistics: Statistics,
}

#[derive(Debug, Deserialize)]
pub struct VideoSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

impl From<VideoResource> for VideoSummary {
    fn from(res: VideoResource) -> Self {
        VideoSummary {
            id: res.id,
            title: res.snippet.title,
            views: parse_count(res.statistics.view_count.as_deref()),
            likes: parse_count(res.statistics.like_count.as_deref()),
            comments: parse_count(res.statistics.comment_count.as_deref()),
            description: res.snippet.description.chars().take(100).collect(),
            thumbnail_url: res.snippet.thumbnails.medium_url(),
        }
    }
}

// -- shared pieces --

/// Counters arrive as decimal strings (`"viewCount": "1234"`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
    pub subscriber_count: Option<String>,
    pub video_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnails {
    pub medium: Option<Thumbnail>,
    pub default: Option<Thumbnail>,
}

impl Thumbnails {
    fn medium_url(&self) -> Option<String> {
        self.medium
            .as_ref()
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

fn parse_count(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Turn `textDisplay` HTML into plain text.
pub fn strip_markup(html: &str) -> String {
    let text = LINE_BREAK.replace_all(html, " ");
    let text = TAG.replace_all(&text, "");
    // &amp; last so "&amp;lt;" decodes to "&lt;", not "<"
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup_removes_links_and_breaks() {
        let html = r#"Great video!<br>Watch <a href="https://www.youtube.com/watch?v=x&amp;t=10">0:10</a>"#;
        assert_eq!(strip_markup(html), "Great video! Watch 0:10");
    }

    #[test]
    fn test_strip_markup_decodes_entities() {
        assert_eq!(strip_markup("Tom &amp; Jerry &#39;rock&#39; &lt;3"), "Tom & Jerry 'rock' <3");
        assert_eq!(strip_markup("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_strip_markup_can_yield_empty_text() {
        assert_eq!(strip_markup("<b></b>"), "");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(Some("1234")), 1234);
        assert_eq!(parse_count(Some("lots")), 0);
        assert_eq!(parse_count(None), 0);
    }

    #[test]
    fn test_description_is_truncated_to_100_chars() {
        let json = serde_json::json!({
            "id": "vid1",
            "snippet": {"title": "T", "description": "é".repeat(150)},
            "statistics": {"viewCount": "10", "likeCount": "2", "commentCount": "1"}
        });
        let res: VideoResource = serde_json::from_value(json).unwrap();
        let summary = VideoSummary::from(res);
        assert_eq!(summary.description.chars().count(), 100);
        assert_eq!(summary.views, 10);
        assert_eq!(summary.thumbnail_url, None);
    }
}
