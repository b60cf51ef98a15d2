//! Segment-to-channel alignment over a [`ScoreMatrix`].
//!
//! Every strategy optimizes (or approximates) the same objective, summed
//! over rows in segment order:
//!
//! - consume item `j` of a channel: weighted score, minus
//!   `reference_gap_penalty` per item passed over since the channel's last
//!   consumed item (items before the first consumed one are free);
//! - stay on the channel's last consumed item: weighted score times
//!   `stay_discount`;
//! - leave unassigned: `gap_penalty` times the row's unassigned weight.
//!
//! [`objective_of`] evaluates that sum for any decision list, so results of
//! different strategies stay comparable.
//!
//! Equal objectives are broken by [`lag_credit`]: each consume earns the
//! other channel's progress minus its own, so paths that advance the
//! channel lagging further behind win.

mod greedy;
mod joint;
mod two_pass;


use crate::alignment::scoring::ScoreMatrix;
use crate::config::{AlignmentConfig, Strategy};
use crate::types::{AlignmentWarning, Channel, SizeLimit};

pub use greedy::align_greedy;
pub use joint::align_joint;
pub use two_pass::align_two_pass;

/// Objective differences below this are ties.
pub(crate) const SCORE_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDecision {
    Unassigned,
    Matched { channel: Channel, item: usize },
}

impl RowDecision {
    pub fn channel(self) -> Option<Channel> {
        match self {
            RowDecision::Unassigned => None,
            RowDecision::Matched { channel, .. } => Some(channel),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    /// One decision per matrix row.
    pub decisions: Vec<RowDecision>,
    pub objective: f64,
    /// Strategy that produced `decisions` (differs from the requested one
    /// after a fallback).
    pub strategy: Strategy,
    pub warnings: Vec<AlignmentWarning>,
}

/// Runs `strategy`, substituting two-pass when the joint DP would exceed
/// either configured ceiling: `m * k` states, or back-pointer cells
/// (`rows * (m + 1) * (k + 1)`).
pub fn align_with_strategy(
    strategy: Strategy,
    matrix: &ScoreMatrix,
    config: &AlignmentConfig,
) -> EngineOutput {
    tracing::debug!(
        strategy = strategy.as_str(),
        rows = matrix.rows(),
        items_a = matrix.len(Channel::A),
        items_b = matrix.len(Channel::B),
        "engine: aligning"
    );
    match strategy {
        Strategy::Greedy => finish(Strategy::Greedy, align_greedy(matrix, config), matrix, config),
        Strategy::TwoPass => finish(Strategy::TwoPass, align_two_pass(matrix, config), matrix, config),
        Strategy::Joint => match joint_size_limit(matrix, config) {
            None => finish(Strategy::Joint, align_joint(matrix, config), matrix, config),
            Some((limit, size, ceiling)) => {
                tracing::warn!(
                    limit = ?limit,
                    size,
                    ceiling,
                    fallback = Strategy::TwoPass.as_str(),
                    "engine: joint state space over ceiling; substituting two-pass"
                );
                let mut output = finish(
                    Strategy::TwoPass,
                    align_two_pass(matrix, config),
                    matrix,
                    config,
                );
                output.warnings.push(AlignmentWarning::SizeLimitExceeded {
                    requested: Strategy::Joint,
                    fallback: Strategy::TwoPass,
                    limit,
                    states: size,
                    ceiling,
                });
                output
            }
        },
    }
}

/// First ceiling the joint DP would break, as `(limit, size, ceiling)`.
/// Sizes that overflow `usize` count as `usize::MAX`.
fn joint_size_limit(matrix: &ScoreMatrix, config: &AlignmentConfig) -> Option<(SizeLimit, usize, usize)> {
    let m = matrix.len(Channel::A);
    let k = matrix.len(Channel::B);
    let states = m.checked_mul(k).unwrap_or(usize::MAX);
    if states > config.joint_state_ceiling {
        return Some((SizeLimit::ChannelProduct, states, config.joint_state_ceiling));
    }
    let cells = (m + 1)
        .checked_mul(k + 1)
        .and_then(|layer| layer.checked_mul(matrix.rows()))
        .unwrap_or(usize::MAX);
    if cells > config.joint_cell_ceiling {
        return Some((SizeLimit::BacktrackCells, cells, config.joint_cell_ceiling));
    }
    None
}

fn finish(
    strategy: Strategy,
    decisions: Vec<RowDecision>,
    matrix: &ScoreMatrix,
    config: &AlignmentConfig,
) -> EngineOutput {
    let objective = objective_of(matrix, config, &decisions);
    EngineOutput {
        decisions,
        objective,
        strategy,
        warnings: Vec::new(),
    }
}

/// Objective value of `decisions` (one per row). Decisions that step
/// backwards in a channel are scored like fresh consumes without a gap cost;
/// strategies never produce them.
pub fn objective_of(matrix: &ScoreMatrix, config: &AlignmentConfig, decisions: &[RowDecision]) -> f64 {
    let mut last: [Option<usize>; 2] = [None, None];
    let mut total = 0.0;
    for (row, decision) in decisions.iter().enumerate() {
        match *decision {
            RowDecision::Unassigned => total += matrix.skip(row, config.gap_penalty),
            RowDecision::Matched { channel, item } => {
                let weighted = matrix.weighted(row, channel, item);
                let slot = &mut last[channel_slot(channel)];
                total += match *slot {
                    Some(prev) if prev == item => weighted * config.stay_discount,
                    Some(prev) if prev < item => {
                        weighted - config.reference_gap_penalty * (item - prev - 1) as f64
                    }
                    _ => weighted,
                };
                *slot = Some(item);
            }
        }
    }
    total
}

pub(crate) fn channel_slot(channel: Channel) -> usize {
    match channel {
        Channel::A => 0,
        Channel::B => 1,
    }
}

/// Fraction of `channel` already consumed with `consumed` items taken.
/// An empty channel counts as finished.
pub(crate) fn progress(consumed: usize, len: usize) -> f64 {
    if len == 0 {
        1.0
    } else {
        consumed as f64 / len as f64
    }
}

/// Tie-break credit for consuming `item` of a channel with `own_len` items
/// while the other channel has `other_consumed` of `other_len` items done.
pub(crate) fn consume_lag(item: usize, own_len: usize, other_consumed: usize, other_len: usize) -> f64 {
    progress(other_consumed, other_len) - progress(item, own_len)
}

/// Sum of [`consume_lag`] over the consumes in `decisions`. Stays and
/// unassigned rows earn nothing.
pub fn lag_credit(matrix: &ScoreMatrix, decisions: &[RowDecision]) -> f64 {
    let mut last: [Option<usize>; 2] = [None, None];
    let mut credit = 0.0;
    for decision in decisions {
        if let RowDecision::Matched { channel, item } = *decision {
            let slot = channel_slot(channel);
            if last[slot] != Some(item) {
                let other = channel.other();
                let other_consumed = last[channel_slot(other)].map_or(0, |prev| prev + 1);
                credit += consume_lag(
                    item,
                    matrix.len(channel),
                    other_consumed,
                    matrix.len(other),
                );
            }
            last[slot] = Some(item);
        }
    }
    credit
}

/// DP cell: objective value plus the lag credit of the path reaching it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Cell {
    pub value: f64,
    pub credit: f64,
}

impl Cell {
    pub const START: Cell = Cell {
        value: 0.0,
        credit: 0.0,
    };
    pub const UNREACHED: Cell = Cell {
        value: f64::NEG_INFINITY,
        credit: 0.0,
    };

    /// Higher value wins; equal values go to the higher credit.
    pub fn beats(self, other: Cell) -> bool {
        self.value > other.value || (self.value == other.value && self.credit > other.credit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Source {
    pub cell: Cell,
    pub state: usize,
}

/// Best source for consuming each item in a single channel.
///
/// `prev[0]` is the cell with nothing consumed yet, `prev[s]` the cell
/// with item `s - 1` consumed last. Entry `j` of the result is the best
/// source to consume item `j` from: any earlier state, paying `gap` per
/// item passed over unless starting fresh. Full ties go to the nearest
/// state.
pub(crate) fn consume_sources(prev: &[Cell], gap: f64) -> Vec<Source> {
    let items = prev.len().saturating_sub(1);
    let mut sources = Vec::with_capacity(items);
    let mut carried = Source {
        cell: Cell::UNREACHED,
        state: 0,
    };
    for j in 0..items {
        if j > 0 {
            let moved = Cell {
                value: carried.cell.value - gap,
                credit: carried.cell.credit,
            };
            carried = if moved.beats(prev[j]) {
                Source {
                    cell: moved,
                    state: carried.state,
                }
            } else {
                Source {
                    cell: prev[j],
                    state: j,
                }
            };
        }
        let source = if prev[0].beats(carried.cell) {
            Source {
                cell: prev[0],
                state: 0,
            }
        } else {
            carried
        };
        sources.push(source);
    }
    sources
}

/// Back-pointer index as stored in the `u32` origin arenas.
pub(crate) fn origin(state: usize) -> u32 {
    u32::try_from(state).unwrap_or(u32::MAX)
}
