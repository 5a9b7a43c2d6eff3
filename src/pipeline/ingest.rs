// Comment ingestion: drains every page of a video's comment threads.
//
// Pages are strictly sequential (each request needs the previous page's
// token). Every page goes through Session::call, so an expired token on
// page N is refreshed and page N replayed; ingestion never restarts from
// page 1. Any other failure aborts the whole ingestion and the comments from
// completed pages are dropped, so nothing downstream acts on a partial set.

use tracing::{debug, info};

use crate::session::Session;
use crate::youtube::client::YouTubeApi;
use crate::youtube::error::{ApiError, Entity};
use crate::youtube::types::{Comment, CommentPage};

/// Result of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingestion {
    /// All comments, pages concatenated in request order.
    Comments(Vec<Comment>),
    /// The first page reported no comment threads.
    NoComments,
}

impl Ingestion {
    pub fn into_comments(self) -> Vec<Comment> {
        match self {
            Ingestion::Comments(c) => c,
            Ingestion::NoComments => Vec::new(),
        }
    }
}

/// Forward-only cursor over one video's comment pages. Only restartable by
/// building a new pager.
pub struct CommentPager<'a> {
    api: &'a dyn YouTubeApi,
    session: &'a Session,
    video_id: &'a str,
    next_token: Option<String>,
    pages_fetched: usize,
    done: bool,
}

impl<'a> CommentPager<'a> {
    pub fn new(api: &'a dyn YouTubeApi, session: &'a Session, video_id: &'a str) -> Self {
        Self {
            api,
            session,
            video_id,
            next_token: None,
            pages_fetched: 0,
            done: false,
        }
    }

    pub fn has_next(&self) -> bool {
        !self.done
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page. Returns `Ok(None)` once the last page (no
    /// continuation token) has been returned. A failed fetch ends the pager.
    pub async fn next_page(&mut self) -> Result<Option<CommentPage>, ApiError> {
        if self.done {
            return Ok(None);
        }

        let api = self.api;
        let video_id = self.video_id;
        let token = self.next_token.clone();

        let result = self
            .session
            .call(|credential| {
                let token = token.clone();
                async move {
                    api.fetch_comment_page(&credential, video_id, token.as_deref())
                        .await
                }
            })
            .await;

        match result {
            Ok(page) => {
                self.pages_fetched += 1;
                self.next_token = page.next_page_token.clone();
                self.done = self.next_token.is_none();
                Ok(Some(page))
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }
}

/// Fetch every top-level comment for `video_id`.
pub async fn ingest_comments(
    api: &dyn YouTubeApi,
    session: &Session,
    video_id: &str,
) -> Result<Ingestion, ApiError> {
    let mut pager = CommentPager::new(api, session, video_id);
    let mut comments = Vec::new();

    while pager.has_next() {
        let first = pager.pages_fetched() == 0;
        match pager.next_page().await {
            Ok(Some(page)) => {
                debug!(
                    page = pager.pages_fetched(),
                    items = page.items.len(),
                    total = comments.len() + page.items.len(),
                    "Ingested comment page"
                );
                comments.extend(page.items);
            }
            Ok(None) => break,
            // Only the first page proves whether the thread exists at all
            Err(e) if first && e.is_not_found(Entity::CommentThread) => {
                info!(video_id = video_id, "Video has no comments");
                return Ok(Ingestion::NoComments);
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        video_id = video_id,
        pages = pager.pages_fetched(),
        comments = comments.len(),
        "Comment ingestion complete"
    );
    Ok(Ingestion::Comments(comments))
}
