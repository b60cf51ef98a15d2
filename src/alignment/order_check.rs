//! Runtime check of the reading-order assumption.
//!
//! Every strategy assumes segments arrive in the same order as each
//! channel's items. When that fails for a document the alignment degrades
//! quietly, so the score matrix is inspected for the two usual symptoms:
//! nothing matches well (scores low and flat), or the confident matches
//! appear in the segments out of channel order.

use crate::alignment::scoring::ScoreMatrix;
use crate::config::QualityConfig;
use crate::types::{Channel, DataQualityFlag};

pub fn detect(matrix: &ScoreMatrix, channel: Channel, config: &QualityConfig) -> Vec<DataQualityFlag> {
    let items = matrix.len(channel);
    if matrix.is_empty() || items == 0 || items < config.min_items {
        return Vec::new();
    }

    // (best base score, row reaching it) per item; earlier rows win ties
    let best: Vec<(f64, usize)> = (0..items)
        .map(|item| {
            (0..matrix.rows()).fold((f64::NEG_INFINITY, 0), |acc, row| {
                let score = matrix.base(row, channel, item);
                if score > acc.0 {
                    (score, row)
                } else {
                    acc
                }
            })
        })
        .collect();

    let mut flags = Vec::new();

    let mean_best = best.iter().map(|(score, _)| score).sum::<f64>() / items as f64;
    let (low, high) = best
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), &(score, _)| {
            (low.min(score), high.max(score))
        });
    let spread = high - low;
    if mean_best < config.low_score_ceiling && spread < config.uniform_spread {
        tracing::warn!(
            channel = channel.as_str(),
            mean_best,
            spread,
            "order check: uniformly low similarity; reading order may not match"
        );
        flags.push(DataQualityFlag::UniformLowScores { mean_best, spread });
    }

    let confident: Vec<usize> = best
        .iter()
        .filter(|(score, _)| *score >= config.confident_match)
        .map(|&(_, row)| row)
        .collect();
    if confident.len() >= config.min_items.max(2) {
        let compared_pairs = confident.len() - 1;
        let inversions = confident.windows(2).filter(|pair| pair[1] < pair[0]).count();
        let inversion_rate = inversions as f64 / compared_pairs as f64;
        if inversion_rate > config.max_inversion_rate {
            tracing::warn!(
                channel = channel.as_str(),
                inversion_rate,
                compared_pairs,
                "order check: confident matches run against channel order"
            );
            flags.push(DataQualityFlag::OrderInversions {
                inversion_rate,
                compared_pairs,
            });
        }
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::scoring::RowScores;

    fn matrix_a(rows: &[&[f64]]) -> ScoreMatrix {
        let len = rows.first().map_or(0, |r| r.len());
        let rows = rows
            .iter()
            .enumerate()
            .map(|(segment_index, scores)| RowScores {
                segment_index,
                base_a: scores.to_vec(),
                base_b: Vec::new(),
                weight_a: 1.0,
                weight_b: 1.0,
                unassigned_weight: 1.0,
            })
            .collect();
        ScoreMatrix::from_rows(len, 0, rows)
    }

    #[test]
    fn ordered_confident_matches_raise_nothing() {
        let m = matrix_a(&[&[0.9, 0.1, 0.1], &[0.1, 0.8, 0.1], &[0.1, 0.1, 0.95]]);
        assert!(detect(&m, Channel::A, &QualityConfig::default()).is_empty());
    }

    #[test]
    fn reversed_order_is_flagged() {
        let m = matrix_a(&[&[0.1, 0.1, 0.9], &[0.1, 0.9, 0.1], &[0.9, 0.1, 0.1]]);
        let flags = detect(&m, Channel::A, &QualityConfig::default());
        assert_eq!(
            flags,
            vec![DataQualityFlag::OrderInversions {
                inversion_rate: 1.0,
                compared_pairs: 2,
            }]
        );
    }

    #[test]
    fn flat_low_scores_are_flagged() {
        let m = matrix_a(&[&[0.2, 0.22, 0.21], &[0.15, 0.2, 0.18]]);
        let flags = detect(&m, Channel::A, &QualityConfig::default());
        assert_eq!(flags.len(), 1);
        match &flags[0] {
            DataQualityFlag::UniformLowScores { mean_best, spread } => {
                assert!((mean_best - 0.21).abs() < 1e-9);
                assert!((spread - 0.02).abs() < 1e-9);
            }
            other => panic!("unexpected flag {other:?}"),
        }
    }

    #[test]
    fn short_channels_and_empty_matrices_are_never_flagged() {
        let m = matrix_a(&[&[0.1, 0.9], &[0.9, 0.1]]);
        assert!(detect(&m, Channel::A, &QualityConfig::default()).is_empty());
        let empty = ScoreMatrix::from_rows(5, 0, Vec::new());
        assert!(detect(&empty, Channel::A, &QualityConfig::default()).is_empty());
        assert!(detect(&empty, Channel::B, &QualityConfig::default()).is_empty());
    }
}
