// ytdetox: toxic comment moderation for your own YouTube videos
//
// This is the library root. Each module corresponds to a major subsystem
// of the ingest -> classify -> moderate pipeline.

pub mod config;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod toxicity;
pub mod youtube;
