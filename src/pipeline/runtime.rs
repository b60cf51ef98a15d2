use serde::Serialize;

use crate::alignment::coverage::{self, CoverageReport};
use crate::alignment::engine::RowDecision;
use crate::alignment::hints::{self, HintOutcome, HintTable};
use crate::alignment::order_check;
use crate::alignment::scoring::{self, ScoreMatrix};
use crate::config::{ReconcilerConfig, Strategy};
use crate::pipeline::traits::{ChannelAligner, SimilarityScorer, TextNormalizer};
use crate::types::{
    AlignmentResult, Assignment, Channel, Decision, Document, QualityFlag, ReferenceInput,
    ReferenceItem, Segment, SegmentInput,
};

/// Reconciles one document at a time; holds no per-document state, so a
/// single instance can be shared across threads.
pub struct Reconciler {
    config: ReconcilerConfig,
    hints: HintTable,
    normalizer: Box<dyn TextNormalizer>,
    scorer: Box<dyn SimilarityScorer>,
    aligner: Box<dyn ChannelAligner>,
}

pub(crate) struct ReconcilerParts {
    pub config: ReconcilerConfig,
    pub hints: HintTable,
    pub normalizer: Box<dyn TextNormalizer>,
    pub scorer: Box<dyn SimilarityScorer>,
    pub aligner: Box<dyn ChannelAligner>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub result: AlignmentResult,
    pub coverage: CoverageReport,
}

impl Reconciler {
    pub(crate) fn from_parts(parts: ReconcilerParts) -> Self {
        Self {
            config: parts.config,
            hints: parts.hints,
            normalizer: parts.normalizer,
            scorer: parts.scorer,
            aligner: parts.aligner,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.aligner.strategy()
    }

    /// Normalizes raw records into a [`Document`]. Segment and item indices
    /// follow input order.
    pub fn prepare(
        &self,
        segments: &[SegmentInput],
        channel_a: &[ReferenceInput],
        channel_b: &[ReferenceInput],
    ) -> Document {
        let segments = segments
            .iter()
            .enumerate()
            .map(|(index, input)| Segment::new(index, input, self.normalizer.normalize(&input.text)))
            .collect();
        let items = |channel: Channel, inputs: &[ReferenceInput]| {
            inputs
                .iter()
                .enumerate()
                .map(|(index, input)| {
                    ReferenceItem::new(channel, index, input.text.clone(), self.normalizer.normalize(&input.text))
                })
                .collect()
        };
        Document::new(segments, items(Channel::A, channel_a), items(Channel::B, channel_b))
    }

    pub fn align(&self, document: &Document) -> AlignmentResult {
        let outcomes = hints::preprocess(document.segments(), &self.hints);
        let matrix = scoring::build_matrix(
            document,
            &outcomes,
            &self.hints,
            &self.config.spatial,
            |a: &str, b: &str| self.scorer.score(a, b),
        );
        let output = self.aligner.align_rows(&matrix, &self.config.alignment);

        let mut row = 0usize;
        let assignments = document
            .segments()
            .iter()
            .zip(&outcomes)
            .map(|(segment, outcome)| match outcome {
                HintOutcome::Final(assignment) => assignment.clone(),
                HintOutcome::PassThrough { .. } => {
                    let decision = output.decisions.get(row).copied();
                    let assignment = assignment_for(&matrix, row, segment.index(), decision);
                    row += 1;
                    assignment
                }
            })
            .collect();

        let quality_flags = Channel::BOTH
            .into_iter()
            .flat_map(|channel| {
                order_check::detect(&matrix, channel, &self.config.quality)
                    .into_iter()
                    .map(move |flag| QualityFlag { channel, flag })
            })
            .collect();

        tracing::debug!(
            requested = self.aligner.strategy().as_str(),
            used = output.strategy.as_str(),
            segments = document.segments().len(),
            aligned_rows = matrix.rows(),
            objective = output.objective,
            "reconciler: alignment finished"
        );

        AlignmentResult {
            assignments,
            strategy: output.strategy,
            objective: output.objective,
            warnings: output.warnings,
            quality_flags,
        }
    }

    pub fn evaluate(&self, result: &AlignmentResult, document: &Document) -> CoverageReport {
        coverage::evaluate(result, document, |a: &str, b: &str| self.scorer.score(a, b))
    }

    /// [`prepare`](Self::prepare), [`align`](Self::align) and
    /// [`evaluate`](Self::evaluate) in one call.
    pub fn reconcile(
        &self,
        segments: &[SegmentInput],
        channel_a: &[ReferenceInput],
        channel_b: &[ReferenceInput],
    ) -> Reconciliation {
        let document = self.prepare(segments, channel_a, channel_b);
        let result = self.align(&document);
        let coverage = self.evaluate(&result, &document);
        Reconciliation { result, coverage }
    }
}

fn assignment_for(
    matrix: &ScoreMatrix,
    row: usize,
    segment_index: usize,
    decision: Option<RowDecision>,
) -> Assignment {
    match decision {
        Some(RowDecision::Matched { channel, item }) => {
            match matrix.base_row(row, channel).get(item) {
                Some(&score) => Assignment {
                    segment_index,
                    label: channel.into(),
                    reference_index: Some(item),
                    score,
                    decided_by: Decision::Aligned,
                },
                None => {
                    tracing::warn!(
                        segment = segment_index,
                        channel = channel.as_str(),
                        item,
                        "reconciler: aligner returned an item outside the channel; leaving unassigned"
                    );
                    Assignment::unassigned(segment_index, Decision::Aligned)
                }
            }
        }
        Some(RowDecision::Unassigned) | None => Assignment::unassigned(segment_index, Decision::Aligned),
    }
}
