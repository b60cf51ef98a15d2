use crate::alignment::engine::{
    consume_sources, lag_credit, objective_of, origin, Cell, RowDecision, SCORE_EPS,
};
use crate::alignment::scoring::ScoreMatrix;
use crate::config::{AlignmentConfig, PassOrder};
use crate::types::Channel;

const LEAVE: u8 = 0;
const STAY: u8 = 1;
const CONSUME: u8 = 2;

/// Global alignment against one channel, then the leftover segments against
/// the other. With [`PassOrder::Best`] both orders run and the higher
/// objective wins. Equal objectives go to the order with the higher
/// [`lag_credit`], then to A-then-B.
pub fn align_two_pass(matrix: &ScoreMatrix, config: &AlignmentConfig) -> Vec<RowDecision> {
    match config.pass_order {
        PassOrder::AThenB => run_passes(matrix, config, Channel::A),
        PassOrder::BThenA => run_passes(matrix, config, Channel::B),
        PassOrder::Best => {
            let a_first = run_passes(matrix, config, Channel::A);
            let b_first = run_passes(matrix, config, Channel::B);
            let a_objective = objective_of(matrix, config, &a_first);
            let b_objective = objective_of(matrix, config, &b_first);
            let keep_b = if (b_objective - a_objective).abs() <= SCORE_EPS {
                lag_credit(matrix, &b_first) > lag_credit(matrix, &a_first)
            } else {
                b_objective > a_objective
            };
            tracing::debug!(
                a_then_b = a_objective,
                b_then_a = b_objective,
                chosen = if keep_b { "b_then_a" } else { "a_then_b" },
                "two-pass: pass order decided"
            );
            if keep_b {
                b_first
            } else {
                a_first
            }
        }
    }
}

fn run_passes(matrix: &ScoreMatrix, config: &AlignmentConfig, first: Channel) -> Vec<RowDecision> {
    let second = first.other();
    let all_rows: Vec<usize> = (0..matrix.rows()).collect();

    // Leaving a row in the first pass is worth what the second channel could
    // still offer it, so a clearly better second-channel match is not taken.
    let defer: Vec<f64> = all_rows
        .iter()
        .map(|&row| {
            matrix
                .skip(row, config.gap_penalty)
                .max(matrix.best_weighted(row, second))
        })
        .collect();

    let mut decisions = vec![RowDecision::Unassigned; matrix.rows()];
    let mut remaining = Vec::new();
    for (&row, item) in all_rows
        .iter()
        .zip(align_channel(matrix, config, first, &all_rows, &defer))
    {
        match item {
            Some(item) => decisions[row] = RowDecision::Matched { channel: first, item },
            None => remaining.push(row),
        }
    }

    let skip: Vec<f64> = remaining
        .iter()
        .map(|&row| matrix.skip(row, config.gap_penalty))
        .collect();
    for (&row, item) in remaining
        .iter()
        .zip(align_channel(matrix, config, second, &remaining, &skip))
    {
        if let Some(item) = item {
            decisions[row] = RowDecision::Matched {
                channel: second,
                item,
            };
        }
    }
    decisions
}

/// Single-channel DP over `rows`. State `s` is "item `s - 1` consumed last"
/// (`0`: nothing consumed). Two rolling layers hold the values; each row
/// keeps a `u8` tag and a `u32` consume origin per state. Returns the
/// matched item per row or `None` for rows left to `leave`.
fn align_channel(
    matrix: &ScoreMatrix,
    config: &AlignmentConfig,
    channel: Channel,
    rows: &[usize],
    leave: &[f64],
) -> Vec<Option<usize>> {
    let items = matrix.len(channel);
    let n = rows.len();
    if items == 0 || n == 0 {
        return vec![None; n];
    }

    let width = items + 1;
    let gap = config.reference_gap_penalty;
    let mut prev = vec![Cell::UNREACHED; width];
    let mut curr = vec![Cell::UNREACHED; width];
    let mut tags = vec![LEAVE; n * width];
    let mut origins = vec![0u32; n * width];
    prev[0] = Cell::START;

    for (t, &row) in rows.iter().enumerate() {
        let sources = consume_sources(&prev, gap);
        for s in 0..width {
            let mut best = f64::NEG_INFINITY;
            let mut tag = LEAVE;
            let mut from = 0;
            if s >= 1 {
                let weighted = matrix.weighted(row, channel, s - 1);
                best = sources[s - 1].cell.value + weighted;
                tag = CONSUME;
                from = sources[s - 1].state;
                let stay = prev[s].value + weighted * config.stay_discount;
                if stay > best {
                    best = stay;
                    tag = STAY;
                }
            }
            let left = prev[s].value + leave[t];
            if left > best {
                best = left;
                tag = LEAVE;
            }
            curr[s] = Cell {
                value: best,
                credit: 0.0,
            };
            tags[t * width + s] = tag;
            origins[t * width + s] = origin(from);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let mut state = 0;
    for s in 1..width {
        if prev[s].value >= prev[state].value {
            state = s;
        }
    }

    let mut matched = vec![None; n];
    for t in (0..n).rev() {
        let index = t * width + state;
        match tags[index] {
            CONSUME => {
                matched[t] = Some(state - 1);
                state = origins[index] as usize;
            }
            STAY => matched[t] = Some(state - 1),
            _ => {}
        }
    }
    matched
}
