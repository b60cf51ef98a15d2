use crate::alignment::engine::{align_with_strategy, EngineOutput};
use crate::alignment::normalize::{normalize, NormalizedText};
use crate::alignment::scoring::ScoreMatrix;
use crate::alignment::similarity;
use crate::config::{AlignmentConfig, NormalizerConfig, Strategy};
use crate::pipeline::traits::{ChannelAligner, SimilarityScorer, TextNormalizer};

#[derive(Debug, Clone, Default)]
pub struct CitationNormalizer {
    config: NormalizerConfig,
}

impl CitationNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }
}

impl TextNormalizer for CitationNormalizer {
    fn normalize(&self, text: &str) -> NormalizedText {
        normalize(text, &self.config)
    }
}

pub struct LocalAlignmentScorer;

impl SimilarityScorer for LocalAlignmentScorer {
    fn score(&self, a: &str, b: &str) -> f64 {
        similarity::score(a, b)
    }
}

pub struct GreedyAligner;

impl ChannelAligner for GreedyAligner {
    fn strategy(&self) -> Strategy {
        Strategy::Greedy
    }

    fn align_rows(&self, matrix: &ScoreMatrix, config: &AlignmentConfig) -> EngineOutput {
        align_with_strategy(Strategy::Greedy, matrix, config)
    }
}

pub struct TwoPassAligner;

impl ChannelAligner for TwoPassAligner {
    fn strategy(&self) -> Strategy {
        Strategy::TwoPass
    }

    fn align_rows(&self, matrix: &ScoreMatrix, config: &AlignmentConfig) -> EngineOutput {
        align_with_strategy(Strategy::TwoPass, matrix, config)
    }
}

/// Falls back to two-pass (with a warning) above the joint state ceiling.
pub struct JointAligner;

impl ChannelAligner for JointAligner {
    fn strategy(&self) -> Strategy {
        Strategy::Joint
    }

    fn align_rows(&self, matrix: &ScoreMatrix, config: &AlignmentConfig) -> EngineOutput {
        align_with_strategy(Strategy::Joint, matrix, config)
    }
}

pub fn aligner_for(strategy: Strategy) -> Box<dyn ChannelAligner> {
    match strategy {
        Strategy::Greedy => Box::new(GreedyAligner),
        Strategy::TwoPass => Box::new(TwoPassAligner),
        Strategy::Joint => Box::new(JointAligner),
    }
}
