use std::path::Path;

use crate::alignment::hints::HintTable;
use crate::config::{ReconcilerConfig, Strategy};
use crate::error::AlignmentError;
use crate::pipeline::defaults::{aligner_for, CitationNormalizer, LocalAlignmentScorer};
use crate::pipeline::runtime::{Reconciler, ReconcilerParts};
use crate::pipeline::traits::{ChannelAligner, SimilarityScorer, TextNormalizer};

pub struct ReconcilerBuilder {
    config: ReconcilerConfig,
    strategy: Option<Strategy>,
    normalizer: Option<Box<dyn TextNormalizer>>,
    scorer: Option<Box<dyn SimilarityScorer>>,
    aligner: Option<Box<dyn ChannelAligner>>,
}

impl ReconcilerBuilder {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            config,
            strategy: None,
            normalizer: None,
            scorer: None,
            aligner: None,
        }
    }

    /// Starts from a JSON config file; see [`ReconcilerConfig::load`].
    pub fn from_config_file(path: &Path) -> Result<Self, AlignmentError> {
        Ok(Self::new(ReconcilerConfig::load(path)?))
    }

    /// Overrides `alignment.strategy` from the config.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn TextNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn with_scorer(mut self, scorer: Box<dyn SimilarityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Takes precedence over any strategy setting.
    pub fn with_aligner(mut self, aligner: Box<dyn ChannelAligner>) -> Self {
        self.aligner = Some(aligner);
        self
    }

    pub fn build(self) -> Result<Reconciler, AlignmentError> {
        let mut config = self.config;
        if let Some(strategy) = self.strategy {
            config.alignment.strategy = strategy;
        }
        config.validate()?;
        let hints = HintTable::from_config(&config.hints)?;

        let aligner = self
            .aligner
            .unwrap_or_else(|| aligner_for(config.alignment.strategy));
        tracing::debug!(
            strategy = aligner.strategy().as_str(),
            pass_order = ?config.alignment.pass_order,
            joint_state_ceiling = config.alignment.joint_state_ceiling,
            joint_cell_ceiling = config.alignment.joint_cell_ceiling,
            "reconciler: built"
        );

        let normalizer = self
            .normalizer
            .unwrap_or_else(|| Box::new(CitationNormalizer::new(config.normalizer)));
        Ok(Reconciler::from_parts(ReconcilerParts {
            config,
            hints,
            normalizer,
            scorer: self
                .scorer
                .unwrap_or_else(|| Box::new(LocalAlignmentScorer)),
            aligner,
        }))
    }
}
