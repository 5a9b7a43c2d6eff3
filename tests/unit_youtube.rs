// YouTube boundary tests: decoding real-shaped API payloads into domain
// records, and the credential lifecycle around token grants.

use chrono::{Duration, TimeZone, Utc};

use ytdetox::session::{Credential, CredentialStore, TokenGrant};
use ytdetox::youtube::types::{
    ChannelDetails, ChannelListResponse, CommentPage, CommentThreadListResponse, ModerationStatus,
    VideoListResponse, VideoSummary,
};

// ============================================================
// commentThreads.list
// ============================================================

#[test]
fn comment_thread_page_decodes_top_level_comments() {
    let json = serde_json::json!({
        "kind": "youtube#commentThreadListResponse",
        "nextPageToken": "QURTSl9p",
        "items": [
            {
                "id": "thread-1",
                "snippet": {
                    "videoId": "vid-1",
                    "topLevelComment": {
                        "id": "Ugx1",
                        "snippet": {
                            "textDisplay": "First!<br>Love this &amp; that",
                            "textOriginal": "First!\nLove this & that"
                        }
                    },
                    "totalReplyCount": 0
                }
            },
            {
                "id": "thread-2",
                "snippet": {
                    "topLevelComment": {
                        "id": "Ugx2",
                        "snippet": { "textDisplay": "" }
                    }
                }
            }
        ]
    });

    let resp: CommentThreadListResponse = serde_json::from_value(json).unwrap();
    let page = CommentPage::from(resp);

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, "Ugx1");
    assert_eq!(page.items[0].text, "First! Love this & that");
    assert_eq!(page.items[1].id, "Ugx2");
    assert_eq!(page.items[1].text, "");
    assert_eq!(page.next_page_token.as_deref(), Some("QURTSl9p"));
}

#[test]
fn last_comment_page_has_no_continuation() {
    let missing: CommentThreadListResponse =
        serde_json::from_value(serde_json::json!({ "items": [] })).unwrap();
    assert!(CommentPage::from(missing).next_page_token.is_none());

    let blank: CommentThreadListResponse =
        serde_json::from_value(serde_json::json!({ "items": [], "nextPageToken": "" })).unwrap();
    assert!(CommentPage::from(blank).next_page_token.is_none());
}

// ============================================================
// channels.list / videos.list
// ============================================================

#[test]
fn channel_statistics_parse_from_strings() {
    let json = serde_json::json!({
        "items": [{
            "id": "UC123",
            "snippet": {
                "title": "My Channel",
                "thumbnails": {
                    "default": { "url": "https://yt3.example/default.jpg" },
                    "medium": { "url": "https://yt3.example/medium.jpg" }
                }
            },
            "statistics": {
                "viewCount": "123456",
                "subscriberCount": "789",
                "hiddenSubscriberCount": false,
                "videoCount": "42"
            }
        }]
    });

    let resp: ChannelListResponse = serde_json::from_value(json).unwrap();
    let channel = ChannelDetails::from(resp.items.into_iter().next().unwrap());

    assert_eq!(channel.id, "UC123");
    assert_eq!(channel.title, "My Channel");
    assert_eq!(channel.logo_url.as_deref(), Some("https://yt3.example/medium.jpg"));
    assert_eq!(channel.stats.views, 123_456);
    assert_eq!(channel.stats.subscribers, 789);
    assert_eq!(channel.stats.videos, 42);
}

#[test]
fn channel_with_hidden_statistics_defaults_to_zero() {
    let json = serde_json::json!({
        "items": [{ "id": "UC9", "snippet": { "title": "Quiet" } }]
    });
    let resp: ChannelListResponse = serde_json::from_value(json).unwrap();
    let channel = ChannelDetails::from(resp.items.into_iter().next().unwrap());
    assert_eq!(channel.stats.subscribers, 0);
    assert_eq!(channel.logo_url, None);
}

#[test]
fn video_summary_falls_back_to_default_thumbnail() {
    let json = serde_json::json!({
        "items": [{
            "id": "vid-1",
            "snippet": {
                "title": "Upload",
                "description": "Short description",
                "thumbnails": { "default": { "url": "https://i.ytimg.example/d.jpg" } }
            },
            "statistics": { "viewCount": "10", "likeCount": "3", "commentCount": "240" }
        }]
    });
    let resp: VideoListResponse = serde_json::from_value(json).unwrap();
    let video = VideoSummary::from(resp.items.into_iter().next().unwrap());

    assert_eq!(video.id, "vid-1");
    assert_eq!(video.comments, 240);
    assert_eq!(video.description, "Short description");
    assert_eq!(video.thumbnail_url.as_deref(), Some("https://i.ytimg.example/d.jpg"));
}

#[test]
fn moderation_status_wire_values() {
    assert_eq!(ModerationStatus::Rejected.as_str(), "rejected");
    assert_eq!(ModerationStatus::HeldForReview.as_str(), "heldForReview");
    assert_eq!(ModerationStatus::Published.as_str(), "published");
}

// ============================================================
// Credential lifecycle
// ============================================================

fn grant(access: &str, refresh: Option<&str>) -> TokenGrant {
    TokenGrant {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        expires_in: Some(3599),
        scope: Some("https://www.googleapis.com/auth/youtube.force-ssl".to_string()),
    }
}

#[test]
fn refresh_without_new_refresh_token_keeps_the_old_one() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let first = Credential::from_grant(grant("access-1", Some("refresh-1")), now);
    let mut store = CredentialStore::new(first);

    store.update(grant("access-2", None), now + Duration::hours(1));

    let current = store.get().unwrap();
    assert_eq!(current.access_token, "access-2");
    assert_eq!(current.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(current.expires_at, Some(now + Duration::hours(1) + Duration::seconds(3599)));
}

#[test]
fn credential_round_trips_through_the_credential_file_format() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    let credential = Credential::from_grant(grant("access-1", Some("refresh-1")), now);

    let json = serde_json::to_string(&credential).unwrap();
    let back: Credential = serde_json::from_str(&json).unwrap();
    assert_eq!(back, credential);
    assert_eq!(back.scopes, vec!["https://www.googleapis.com/auth/youtube.force-ssl"]);
}

#[test]
fn cleared_store_has_no_credential() {
    let now = Utc::now();
    let mut store = CredentialStore::new(Credential::from_grant(grant("a", Some("r")), now));
    store.clear();
    assert!(store.get().is_none());
}
