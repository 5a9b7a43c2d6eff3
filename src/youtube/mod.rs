// YouTube API boundary: data API calls, OAuth token endpoint, and the
// classified error taxonomy every call resolves to.

pub mod client;
pub mod error;
pub mod oauth;
pub mod types;

pub use client::{YouTubeApi, YouTubeClient};
pub use error::{ApiError, Entity};
