pub mod alignment;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

pub use alignment::coverage::{ChannelCoverage, CoverageReport};
pub use config::{ReconcilerConfig, Strategy};
pub use error::AlignmentError;
pub use pipeline::builder::ReconcilerBuilder;
pub use pipeline::runtime::{Reconciler, Reconciliation};
pub use pipeline::traits::{ChannelAligner, SimilarityScorer, TextNormalizer};
pub use types::{
    AlignmentResult, AlignmentWarning, Assignment, Channel, DataQualityFlag, Label, PriorLabel,
    ReferenceInput, SegmentInput, SizeLimit,
};
