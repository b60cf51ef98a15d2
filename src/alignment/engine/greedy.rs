use crate::alignment::engine::{channel_slot, progress, RowDecision};
use crate::alignment::scoring::ScoreMatrix;
use crate::config::AlignmentConfig;
use crate::types::Channel;

/// Best local choice per segment with an advancing cursor per channel.
/// Cannot revisit an early decision, so one wrong consume cascades.
pub fn align_greedy(matrix: &ScoreMatrix, config: &AlignmentConfig) -> Vec<RowDecision> {
    let mut last: [Option<usize>; 2] = [None, None];
    let mut decisions = Vec::with_capacity(matrix.rows());

    for row in 0..matrix.rows() {
        let mut best: Option<(f64, RowDecision)> = None;

        for channel in lagging_first(&last, matrix) {
            let cursor = last[channel_slot(channel)];
            let start = cursor.map_or(0, |item| item + 1);
            for item in start..matrix.len(channel) {
                let passed = cursor.map_or(0, |prev| item - prev - 1);
                let value =
                    matrix.weighted(row, channel, item) - config.reference_gap_penalty * passed as f64;
                offer(&mut best, value, RowDecision::Matched { channel, item });
            }
        }
        for channel in Channel::BOTH {
            if let Some(item) = last[channel_slot(channel)] {
                let value = matrix.weighted(row, channel, item) * config.stay_discount;
                offer(&mut best, value, RowDecision::Matched { channel, item });
            }
        }
        offer(&mut best, matrix.skip(row, config.gap_penalty), RowDecision::Unassigned);

        let decision = best.map_or(RowDecision::Unassigned, |(_, decision)| decision);
        if let RowDecision::Matched { channel, item } = decision {
            last[channel_slot(channel)] = Some(item);
        }
        decisions.push(decision);
    }
    decisions
}

/// Earlier offers win ties.
fn offer(best: &mut Option<(f64, RowDecision)>, value: f64, decision: RowDecision) {
    if best.map_or(true, |(current, _)| value > current) {
        *best = Some((value, decision));
    }
}

fn lagging_first(last: &[Option<usize>; 2], matrix: &ScoreMatrix) -> [Channel; 2] {
    let consumed = |channel: Channel| last[channel_slot(channel)].map_or(0, |item| item + 1);
    let a = progress(consumed(Channel::A), matrix.len(Channel::A));
    let b = progress(consumed(Channel::B), matrix.len(Channel::B));
    if b < a {
        [Channel::B, Channel::A]
    } else {
        [Channel::A, Channel::B]
    }
}
