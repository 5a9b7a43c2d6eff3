// Moderation pipeline: paginated comment ingestion feeding the classifier,
// then the bulk rejection of whatever it flagged.

pub mod ingest;
pub mod moderation;

pub use ingest::{ingest_comments, CommentPager, Ingestion};
pub use moderation::{
    AnalysisReport, LabelSummary, ModerationBatch, ModerationCoordinator, ModerationError,
};
