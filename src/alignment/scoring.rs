use crate::alignment::hints::{HintOutcome, HintTable};
use crate::alignment::spatial;
use crate::config::SpatialConfig;
use crate::types::{Channel, Document, Label};

/// Scores of one pass-through segment against every reference item.
#[derive(Debug, Clone, PartialEq)]
pub struct RowScores {
    pub segment_index: usize,
    pub base_a: Vec<f64>,
    pub base_b: Vec<f64>,
    /// Spatial weight times hint boost for channel A.
    pub weight_a: f64,
    pub weight_b: f64,
    /// Spatial weight of leaving the segment unassigned.
    pub unassigned_weight: f64,
}

/// Dense row-per-segment score table consumed by every strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    len_a: usize,
    len_b: usize,
    rows: Vec<RowScores>,
}

impl ScoreMatrix {
    /// Takes rows as given after forcing each score row to the channel
    /// length and every base score into [0, 1] (NaN becomes 0).
    pub fn from_rows(len_a: usize, len_b: usize, rows: Vec<RowScores>) -> Self {
        let rows = rows
            .into_iter()
            .map(|mut row| {
                sanitize(&mut row.base_a, len_a);
                sanitize(&mut row.base_b, len_b);
                row
            })
            .collect();
        Self { len_a, len_b, rows }
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self, channel: Channel) -> usize {
        match channel {
            Channel::A => self.len_a,
            Channel::B => self.len_b,
        }
    }

    pub fn segment_index(&self, row: usize) -> usize {
        self.rows[row].segment_index
    }

    pub fn base_row(&self, row: usize, channel: Channel) -> &[f64] {
        match channel {
            Channel::A => &self.rows[row].base_a,
            Channel::B => &self.rows[row].base_b,
        }
    }

    pub fn base(&self, row: usize, channel: Channel, item: usize) -> f64 {
        self.base_row(row, channel)[item]
    }

    pub fn weight(&self, row: usize, channel: Channel) -> f64 {
        match channel {
            Channel::A => self.rows[row].weight_a,
            Channel::B => self.rows[row].weight_b,
        }
    }

    pub fn weighted(&self, row: usize, channel: Channel, item: usize) -> f64 {
        self.base(row, channel, item) * self.weight(row, channel)
    }

    /// Value of leaving `row` unassigned under `gap_penalty`.
    pub fn skip(&self, row: usize, gap_penalty: f64) -> f64 {
        gap_penalty * self.rows[row].unassigned_weight
    }

    /// Highest weighted score `row` reaches anywhere in `channel`.
    pub fn best_weighted(&self, row: usize, channel: Channel) -> f64 {
        let weight = self.weight(row, channel);
        self.base_row(row, channel)
            .iter()
            .fold(0.0f64, |best, &base| best.max(base * weight))
    }
}

fn sanitize(scores: &mut Vec<f64>, len: usize) {
    scores.resize(len, 0.0);
    for score in scores.iter_mut() {
        *score = clamp_score(*score);
    }
}

/// Brings a scorer's output into [0, 1]; NaN counts as no similarity.
pub(crate) fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Scores every pass-through segment of `document` against both channels.
/// `outcomes` runs parallel to the document's segments.
pub fn build_matrix(
    document: &Document,
    outcomes: &[HintOutcome],
    hints: &HintTable,
    spatial_config: &SpatialConfig,
    scorer: impl Fn(&str, &str) -> f64,
) -> ScoreMatrix {
    let channel_a = document.channel(Channel::A);
    let channel_b = document.channel(Channel::B);
    let rows = document
        .segments()
        .iter()
        .zip(outcomes)
        .filter(|(_, outcome)| outcome.is_pass_through())
        .map(|(segment, outcome)| {
            let text = segment.normalized().as_str();
            let position = segment.position();
            RowScores {
                segment_index: segment.index(),
                base_a: channel_a
                    .iter()
                    .map(|item| scorer(text, item.normalized().as_str()))
                    .collect(),
                base_b: channel_b
                    .iter()
                    .map(|item| scorer(text, item.normalized().as_str()))
                    .collect(),
                weight_a: spatial::weight(position, Label::A, spatial_config)
                    * outcome.channel_boost(Channel::A, hints),
                weight_b: spatial::weight(position, Label::B, spatial_config)
                    * outcome.channel_boost(Channel::B, hints),
                unassigned_weight: spatial::weight(position, Label::Unassigned, spatial_config),
            }
        })
        .collect();
    ScoreMatrix::from_rows(channel_a.len(), channel_b.len(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::hints::preprocess;
    use crate::alignment::normalize::NormalizedText;
    use crate::config::HintConfig;
    use crate::types::{PriorLabel, ReferenceItem, Segment, SegmentInput};

    fn item(channel: Channel, index: usize, text: &str) -> ReferenceItem {
        ReferenceItem::new(channel, index, text, NormalizedText::from_normalized(text))
    }

    fn segment(index: usize, input: SegmentInput) -> Segment {
        let normalized = NormalizedText::from_normalized(input.text.clone());
        Segment::new(index, &input, normalized)
    }

    #[test]
    fn from_rows_pads_and_clamps_scores() {
        let matrix = ScoreMatrix::from_rows(
            2,
            1,
            vec![RowScores {
                segment_index: 0,
                base_a: vec![1.4],
                base_b: vec![f64::NAN, 0.3],
                weight_a: 1.0,
                weight_b: 1.5,
                unassigned_weight: 1.0,
            }],
        );
        assert_eq!(matrix.base_row(0, Channel::A), &[1.0, 0.0]);
        assert_eq!(matrix.base_row(0, Channel::B), &[0.0]);
        assert_eq!(matrix.weighted(0, Channel::A, 0), 1.0);
    }

    #[test]
    fn build_matrix_skips_finalized_segments_and_applies_weights() {
        let segments = vec![
            segment(0, SegmentInput::new("12").at(0.98, 0).with_prior_label(PriorLabel::PageNumber)),
            segment(1, SegmentInput::new("body").at(0.5, 0)),
            segment(2, SegmentInput::new("note").at(0.92, 0).with_prior_label(PriorLabel::Footnote)),
        ];
        let document = Document::new(
            segments,
            vec![item(Channel::A, 0, "body")],
            vec![item(Channel::B, 0, "note")],
        );
        let table = HintTable::from_config(&HintConfig::default()).expect("hints");
        let outcomes = preprocess(document.segments(), &table);
        let matrix = build_matrix(
            &document,
            &outcomes,
            &table,
            &SpatialConfig::default(),
            |a: &str, b: &str| if a == b { 1.0 } else { 0.0 },
        );

        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.segment_index(0), 1);
        assert_eq!(matrix.segment_index(1), 2);
        assert_eq!(matrix.base(0, Channel::A, 0), 1.0);
        assert_eq!(matrix.weight(0, Channel::A), 1.0);

        // bottom of page and hinted as footnote
        assert!((matrix.weight(1, Channel::B) - 1.5 * 1.2).abs() < 1e-12);
        assert!((matrix.weight(1, Channel::A) - 0.6).abs() < 1e-12);
        assert!((matrix.best_weighted(1, Channel::B) - 1.8).abs() < 1e-12);
        assert!((matrix.skip(1, 0.25) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn empty_channels_produce_empty_rows() {
        let document = Document::new(vec![segment(0, SegmentInput::new("x"))], Vec::new(), Vec::new());
        let table = HintTable::from_config(&HintConfig::default()).expect("hints");
        let outcomes = preprocess(document.segments(), &table);
        let matrix = build_matrix(&document, &outcomes, &table, &SpatialConfig::default(), |_: &str, _: &str| 1.0);
        assert_eq!(matrix.rows(), 1);
        assert!(matrix.base_row(0, Channel::A).is_empty());
        assert_eq!(matrix.best_weighted(0, Channel::B), 0.0);
    }
}
