use std::collections::BTreeSet;

use serde::Serialize;

use crate::alignment::scoring::clamp_score;
use crate::types::{AlignmentResult, Channel, DataQualityFlag, Document, Label};

/// Document-level reconstruction quality of one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelCoverage {
    pub channel: Channel,
    /// Similarity of the channel's assigned text to its reference text.
    /// `None` when the channel has no reference items.
    pub coverage_score: Option<f64>,
    /// Fraction of reference items matched by at least one segment.
    pub reference_utilization: Option<f64>,
    /// Assigned text length over reference text length, in characters.
    pub length_ratio: Option<f64>,
    pub assigned_segment_count: usize,
    pub reference_item_count: usize,
    /// Mean base score of matched segments. Diagnostic only.
    pub mean_match_score: Option<f64>,
    pub flags: Vec<DataQualityFlag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub channel_a: ChannelCoverage,
    pub channel_b: ChannelCoverage,
    pub segment_count: usize,
    pub unassigned_count: usize,
}

impl CoverageReport {
    pub fn channel(&self, channel: Channel) -> &ChannelCoverage {
        match channel {
            Channel::A => &self.channel_a,
            Channel::B => &self.channel_b,
        }
    }
}

pub fn evaluate(
    result: &AlignmentResult,
    document: &Document,
    scorer: impl Fn(&str, &str) -> f64,
) -> CoverageReport {
    let unassigned_count = result
        .assignments
        .iter()
        .filter(|a| a.label == Label::Unassigned)
        .count();
    CoverageReport {
        channel_a: evaluate_channel(result, document, Channel::A, &scorer),
        channel_b: evaluate_channel(result, document, Channel::B, &scorer),
        segment_count: document.segments().len(),
        unassigned_count,
    }
}

fn evaluate_channel(
    result: &AlignmentResult,
    document: &Document,
    channel: Channel,
    scorer: &impl Fn(&str, &str) -> f64,
) -> ChannelCoverage {
    let items = document.channel(channel);
    let assigned: Vec<_> = result
        .assignments
        .iter()
        .filter(|a| a.label.channel() == Some(channel))
        .collect();

    let assigned_text = join_nonempty(
        assigned
            .iter()
            .filter_map(|a| document.segments().get(a.segment_index))
            .map(|segment| segment.normalized().as_str()),
    );
    let reference_text = join_nonempty(items.iter().map(|item| item.normalized().as_str()));

    let coverage_score =
        (!items.is_empty()).then(|| clamp_score(scorer(&assigned_text, &reference_text)));

    let touched: BTreeSet<usize> = assigned.iter().filter_map(|a| a.reference_index).collect();
    let reference_utilization =
        (!items.is_empty()).then(|| touched.len() as f64 / items.len() as f64);

    let reference_len = reference_text.chars().count();
    let length_ratio =
        (reference_len > 0).then(|| assigned_text.chars().count() as f64 / reference_len as f64);

    let matched: Vec<f64> = assigned
        .iter()
        .filter(|a| a.reference_index.is_some())
        .map(|a| a.score)
        .collect();
    let mean_match_score =
        (!matched.is_empty()).then(|| matched.iter().sum::<f64>() / matched.len() as f64);

    ChannelCoverage {
        channel,
        coverage_score,
        reference_utilization,
        length_ratio,
        assigned_segment_count: assigned.len(),
        reference_item_count: items.len(),
        mean_match_score,
        flags: result.flags_for(channel).cloned().collect(),
    }
}

fn join_nonempty<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.filter(|p| !p.is_empty()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::normalize::NormalizedText;
    use crate::alignment::similarity;
    use crate::config::Strategy;
    use crate::types::{
        Assignment, Decision, QualityFlag, ReferenceItem, Segment, SegmentInput,
    };

    fn document(segments: &[&str], a: &[&str], b: &[&str]) -> Document {
        let segments = segments
            .iter()
            .enumerate()
            .map(|(i, text)| {
                Segment::new(i, &SegmentInput::new(*text), NormalizedText::from_normalized(*text))
            })
            .collect();
        let items = |channel: Channel, texts: &[&str]| {
            texts
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    ReferenceItem::new(channel, i, *text, NormalizedText::from_normalized(*text))
                })
                .collect::<Vec<_>>()
        };
        Document::new(segments, items(Channel::A, a), items(Channel::B, b))
    }

    fn matched(segment_index: usize, label: Label, item: usize, score: f64) -> Assignment {
        Assignment {
            segment_index,
            label,
            reference_index: Some(item),
            score,
            decided_by: Decision::Aligned,
        }
    }

    fn result(assignments: Vec<Assignment>) -> AlignmentResult {
        AlignmentResult {
            assignments,
            strategy: Strategy::TwoPass,
            objective: 0.0,
            warnings: Vec::new(),
            quality_flags: Vec::new(),
        }
    }

    #[test]
    fn exact_reconstruction_scores_one() {
        let doc = document(&["alpha", "beta", "gamma"], &["alpha", "beta"], &["gamma"]);
        let r = result(vec![
            matched(0, Label::A, 0, 1.0),
            matched(1, Label::A, 1, 1.0),
            matched(2, Label::B, 0, 1.0),
        ]);
        let report = evaluate(&r, &doc, similarity::score);
        for channel in Channel::BOTH {
            let c = report.channel(channel);
            assert_eq!(c.coverage_score, Some(1.0));
            assert_eq!(c.reference_utilization, Some(1.0));
            assert_eq!(c.length_ratio, Some(1.0));
            assert_eq!(c.mean_match_score, Some(1.0));
        }
        assert_eq!(report.channel_a.assigned_segment_count, 2);
        assert_eq!(report.segment_count, 3);
        assert_eq!(report.unassigned_count, 0);
    }

    #[test]
    fn unassigned_segments_do_not_count_toward_utilization() {
        let doc = document(&["12", "see smith v jones"], &["see smith v jones", "ibid"], &[]);
        let r = result(vec![
            Assignment::unassigned(0, Decision::Aligned),
            matched(1, Label::A, 0, 1.0),
        ]);
        let report = evaluate(&r, &doc, similarity::score);
        assert_eq!(report.channel_a.reference_utilization, Some(0.5));
        assert_eq!(report.unassigned_count, 1);
    }

    #[test]
    fn empty_channel_has_undefined_coverage() {
        let doc = document(&["x"], &["x"], &[]);
        let r = result(vec![matched(0, Label::A, 0, 1.0)]);
        let report = evaluate(&r, &doc, similarity::score);
        let b = report.channel(Channel::B);
        assert_eq!(b.coverage_score, None);
        assert_eq!(b.reference_utilization, None);
        assert_eq!(b.length_ratio, None);
        assert_eq!(b.mean_match_score, None);
        assert_eq!(b.reference_item_count, 0);
    }

    #[test]
    fn channel_with_nothing_assigned_scores_zero() {
        let doc = document(&["x"], &["alpha"], &[]);
        let r = result(vec![Assignment::unassigned(0, Decision::HintSkipped)]);
        let report = evaluate(&r, &doc, similarity::score);
        assert_eq!(report.channel_a.coverage_score, Some(0.0));
        assert_eq!(report.channel_a.reference_utilization, Some(0.0));
        assert_eq!(report.channel_a.length_ratio, Some(0.0));
    }

    #[test]
    fn routed_segments_count_as_text_but_not_as_matches() {
        let doc = document(&["alpha", "beta"], &["alpha beta"], &[]);
        let r = result(vec![
            matched(0, Label::A, 0, 0.7),
            Assignment {
                segment_index: 1,
                label: Label::A,
                reference_index: None,
                score: 0.0,
                decided_by: Decision::HintRouted,
            },
        ]);
        let report = evaluate(&r, &doc, similarity::score);
        assert_eq!(report.channel_a.coverage_score, Some(1.0));
        assert_eq!(report.channel_a.assigned_segment_count, 2);
        assert_eq!(report.channel_a.mean_match_score, Some(0.7));
    }

    #[test]
    fn out_of_range_scorer_output_is_clamped() {
        let doc = document(&["x"], &["x"], &["y"]);
        let r = result(vec![matched(0, Label::A, 0, 1.0)]);
        let report = evaluate(&r, &doc, |_: &str, _: &str| 1.7);
        assert_eq!(report.channel_a.coverage_score, Some(1.0));
        let report = evaluate(&r, &doc, |_: &str, _: &str| -0.2);
        assert_eq!(report.channel_b.coverage_score, Some(0.0));
        let report = evaluate(&r, &doc, |_: &str, _: &str| f64::NAN);
        assert_eq!(report.channel_a.coverage_score, Some(0.0));
    }

    #[test]
    fn flags_are_carried_per_channel() {
        let doc = document(&["x"], &["x"], &["y"]);
        let mut r = result(vec![matched(0, Label::A, 0, 1.0)]);
        r.quality_flags.push(QualityFlag {
            channel: Channel::B,
            flag: DataQualityFlag::UniformLowScores {
                mean_best: 0.1,
                spread: 0.0,
            },
        });
        let report = evaluate(&r, &doc, similarity::score);
        assert!(report.channel_a.flags.is_empty());
        assert_eq!(report.channel_b.flags.len(), 1);
    }
}
