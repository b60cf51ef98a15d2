use crate::alignment::engine::EngineOutput;
use crate::alignment::normalize::NormalizedText;
use crate::alignment::scoring::ScoreMatrix;
use crate::config::{AlignmentConfig, Strategy};

pub trait TextNormalizer: Send + Sync {
    fn normalize(&self, text: &str) -> NormalizedText;
}

/// Must be symmetric and return values in [0, 1].
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

pub trait ChannelAligner: Send + Sync {
    /// Strategy this aligner runs when nothing forces a fallback.
    fn strategy(&self) -> Strategy;

    fn align_rows(&self, matrix: &ScoreMatrix, config: &AlignmentConfig) -> EngineOutput;
}
