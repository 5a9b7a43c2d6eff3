// Moderation pass: ingest -> classify -> select toxic ids -> bulk reject.
//
// The pass is split so the caller can show the report between analysis and
// the write. The toxic id set is computed once, retained in the report, and
// handed back unchanged to `reject_comments`; it is never recomputed against
// a fresh classification.
//
// Nothing upstream is mutated until `reject_comments` succeeds, so a pass
// can be abandoned at any point before that.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::info;

use super::ingest::{ingest_comments, Ingestion};
use crate::session::{Credential, Session};
use crate::toxicity::traits::LABEL_COUNT;
use crate::toxicity::{PredictionVector, ToxicityClassifier, ToxicityLabel};
use crate::youtube::client::YouTubeApi;
use crate::youtube::error::ApiError;
use crate::youtube::types::{Comment, ModerationStatus};

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Classification(#[from] anyhow::Error),
}

/// Everything one analysis produced for one video.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub video_id: String,
    /// The ingested comments, in API order. Scoped to this pass only.
    pub comments: Vec<Comment>,
    /// One prediction per comment, same order.
    pub predictions: Vec<PredictionVector>,
    /// Ids with at least one positive label. Always a subset of `comments`.
    pub toxic_ids: BTreeSet<String>,
    /// False when the video had no comment threads at all.
    pub has_comments: bool,
}

impl AnalysisReport {
    fn empty(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            comments: Vec::new(),
            predictions: Vec::new(),
            toxic_ids: BTreeSet::new(),
            has_comments: false,
        }
    }

    /// The rejection batch for this report, or None when nothing is toxic.
    pub fn moderation_batch(&self) -> Option<ModerationBatch> {
        if self.toxic_ids.is_empty() {
            return None;
        }
        Some(ModerationBatch {
            video_id: self.video_id.clone(),
            comment_ids: self.toxic_ids.clone(),
            target_status: ModerationStatus::Rejected,
        })
    }

    pub fn summary(&self) -> LabelSummary {
        LabelSummary::from_predictions(&self.predictions)
    }

    /// Flagged comments paired with their predictions.
    pub fn flagged(&self) -> impl Iterator<Item = (&Comment, &PredictionVector)> {
        self.comments
            .iter()
            .zip(&self.predictions)
            .filter(|(_, p)| p.is_toxic())
    }
}

/// Ids to reject in one write. Only obtainable from an `AnalysisReport`, so
/// it can never carry ids from a different video's pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationBatch {
    video_id: String,
    comment_ids: BTreeSet<String>,
    target_status: ModerationStatus,
}

impl ModerationBatch {
    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn comment_ids(&self) -> &BTreeSet<String> {
        &self.comment_ids
    }

    pub fn target_status(&self) -> ModerationStatus {
        self.target_status
    }

    pub fn len(&self) -> usize {
        self.comment_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comment_ids.is_empty()
    }
}

/// Per-label counts for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSummary {
    pub total: usize,
    pub toxic: usize,
    pub per_label: [usize; LABEL_COUNT],
}

impl LabelSummary {
    pub fn from_predictions(predictions: &[PredictionVector]) -> Self {
        let mut summary = LabelSummary {
            total: predictions.len(),
            ..Default::default()
        };
        for p in predictions {
            if p.is_toxic() {
                summary.toxic += 1;
            }
            for (count, &fired) in summary.per_label.iter_mut().zip(&p.labels) {
                if fired {
                    *count += 1;
                }
            }
        }
        summary
    }

    pub fn count(&self, label: ToxicityLabel) -> usize {
        self.per_label[label.index()]
    }
}

pub struct ModerationCoordinator<'a> {
    api: &'a dyn YouTubeApi,
    classifier: &'a ToxicityClassifier,
}

impl<'a> ModerationCoordinator<'a> {
    pub fn new(api: &'a dyn YouTubeApi, classifier: &'a ToxicityClassifier) -> Self {
        Self { api, classifier }
    }

    /// Ingest every comment of `video_id` and classify them. A video with no
    /// comments yields an empty report (`has_comments == false`), not an error.
    pub async fn ingest_and_classify(
        &self,
        session: &Session,
        video_id: &str,
    ) -> Result<AnalysisReport, ModerationError> {
        let comments = match ingest_comments(self.api, session, video_id).await? {
            Ingestion::Comments(comments) => comments,
            Ingestion::NoComments => return Ok(AnalysisReport::empty(video_id)),
        };

        self.classifier.load().await?;
        let predictions = self.classifier.classify(&comments).await?;

        let toxic_ids: BTreeSet<String> = predictions
            .iter()
            .filter(|p| p.is_toxic())
            .map(|p| p.comment_id.clone())
            .collect();

        info!(
            video_id = video_id,
            comments = comments.len(),
            toxic = toxic_ids.len(),
            "Analysis complete"
        );

        Ok(AnalysisReport {
            video_id: video_id.to_string(),
            has_comments: true,
            comments,
            predictions,
            toxic_ids,
        })
    }

    /// Issue the bulk rejection for a retained batch. One upstream call; an
    /// empty batch makes none.
    pub async fn reject_comments(
        &self,
        session: &Session,
        batch: &ModerationBatch,
    ) -> Result<(), ApiError> {
        if batch.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = batch.comment_ids.iter().cloned().collect();
        let status = batch.target_status;
        let api = self.api;
        let ids_ref = &ids;

        session
            .call(|credential| async move {
                api.set_moderation_status(&credential, ids_ref, status).await
            })
            .await?;

        info!(
            video_id = batch.video_id(),
            count = ids.len(),
            status = status.as_str(),
            "Comments moderated"
        );
        Ok(())
    }

    /// Make sure the session holds a usable token before a long pass. A no-op
    /// while the current token is still valid.
    pub async fn refresh_if_needed(&self, session: &Session) -> Result<Credential, ApiError> {
        session.refresh_if_needed().await
    }

    /// Full pass: analyze, then reject the toxic subset if there is one.
    pub async fn run_pass(
        &self,
        session: &Session,
        video_id: &str,
    ) -> Result<AnalysisReport, ModerationError> {
        let report = self.ingest_and_classify(session, video_id).await?;
        if let Some(batch) = report.moderation_batch() {
            self.reject_comments(session, &batch).await?;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(id: &str, labels: [bool; 6]) -> PredictionVector {
        PredictionVector {
            comment_id: id.to_string(),
            labels,
        }
    }

    #[test]
    fn test_summary_counts_labels() {
        let preds = vec![
            prediction("a", [true, false, true, false, false, false]),
            prediction("b", [false; 6]),
            prediction("c", [true, false, false, false, true, false]),
        ];
        let s = LabelSummary::from_predictions(&preds);
        assert_eq!(s.total, 3);
        assert_eq!(s.toxic, 2);
        assert_eq!(s.count(ToxicityLabel::Toxic), 2);
        assert_eq!(s.count(ToxicityLabel::Obscene), 1);
        assert_eq!(s.count(ToxicityLabel::Insult), 1);
        assert_eq!(s.count(ToxicityLabel::Threat), 0);
    }

    #[test]
    fn test_empty_report_has_no_batch() {
        let report = AnalysisReport::empty("vid");
        assert!(!report.has_comments);
        assert!(report.moderation_batch().is_none());
        assert_eq!(report.summary(), LabelSummary::default());
    }

    #[test]
    fn test_batch_targets_rejected_status() {
        let mut report = AnalysisReport::empty("vid");
        report.toxic_ids.insert("c1".to_string());
        let batch = report.moderation_batch().unwrap();
        assert_eq!(batch.target_status(), ModerationStatus::Rejected);
        assert_eq!(batch.video_id(), "vid");
        assert_eq!(batch.len(), 1);
    }
}
