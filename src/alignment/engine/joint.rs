use crate::alignment::engine::{consume_lag, consume_sources, origin, Cell, RowDecision, Source};
use crate::alignment::scoring::ScoreMatrix;
use crate::config::AlignmentConfig;
use crate::types::Channel;

const SKIP: u8 = 0;
const STAY_A: u8 = 1;
const STAY_B: u8 = 2;
const CONSUME_A: u8 = 3;
const CONSUME_B: u8 = 4;

/// Exact DP over (row, A cursor, B cursor).
///
/// State `(a, b)` means items `a - 1` of A and `b - 1` of B were consumed
/// last (`0`: none yet). Cells live in two rolling layers of
/// `(m + 1) * (k + 1)`; each row keeps a `u8` transition tag and a `u32`
/// origin cursor per state for the backtrack. Callers check both size
/// ceilings first.
///
/// Equal values go to the higher lag credit. A consume still beats a stay
/// or a skip of the same value, and the final scan prefers the state
/// further along (more items consumed, A first).
pub fn align_joint(matrix: &ScoreMatrix, config: &AlignmentConfig) -> Vec<RowDecision> {
    let n = matrix.rows();
    let m = matrix.len(Channel::A);
    let k = matrix.len(Channel::B);
    let width = k + 1;
    let layer = (m + 1) * width;
    let gap = config.reference_gap_penalty;

    let mut prev = vec![Cell::UNREACHED; layer];
    let mut curr = vec![Cell::UNREACHED; layer];
    let mut tags = vec![SKIP; n * layer];
    let mut origins = vec![0u32; n * layer];
    prev[0] = Cell::START;

    for t in 0..n {
        let skip = matrix.skip(t, config.gap_penalty);
        let sources_a: Vec<Vec<Source>> = (0..width)
            .map(|b| consume_sources(&column(&prev, m, width, b), gap))
            .collect();
        let sources_b: Vec<Vec<Source>> = (0..=m)
            .map(|a| consume_sources(&prev[a * width..(a + 1) * width], gap))
            .collect();

        for a in 0..=m {
            for b in 0..width {
                let here = prev[a * width + b];
                let consume_a = (a >= 1).then(|| {
                    let source = sources_a[b][a - 1];
                    let cell = Cell {
                        value: source.cell.value + matrix.weighted(t, Channel::A, a - 1),
                        credit: source.cell.credit + consume_lag(a - 1, m, b, k),
                    };
                    (cell, CONSUME_A, source.state)
                });
                let consume_b = (b >= 1).then(|| {
                    let source = sources_b[a][b - 1];
                    let cell = Cell {
                        value: source.cell.value + matrix.weighted(t, Channel::B, b - 1),
                        credit: source.cell.credit + consume_lag(b - 1, k, a, m),
                    };
                    (cell, CONSUME_B, source.state)
                });

                let (mut best, mut tag, from) = match (consume_a, consume_b) {
                    (Some(ca), Some(cb)) => {
                        if cb.0.beats(ca.0) {
                            cb
                        } else {
                            ca
                        }
                    }
                    (Some(only), None) | (None, Some(only)) => only,
                    (None, None) => (Cell::UNREACHED, SKIP, 0),
                };
                if a >= 1 {
                    let stay = here.value + matrix.weighted(t, Channel::A, a - 1) * config.stay_discount;
                    if stay > best.value {
                        best = Cell {
                            value: stay,
                            credit: here.credit,
                        };
                        tag = STAY_A;
                    }
                }
                if b >= 1 {
                    let stay = here.value + matrix.weighted(t, Channel::B, b - 1) * config.stay_discount;
                    if stay > best.value {
                        best = Cell {
                            value: stay,
                            credit: here.credit,
                        };
                        tag = STAY_B;
                    }
                }
                if here.value + skip > best.value {
                    best = Cell {
                        value: here.value + skip,
                        credit: here.credit,
                    };
                    tag = SKIP;
                }

                let index = a * width + b;
                curr[index] = best;
                tags[t * layer + index] = tag;
                origins[t * layer + index] = origin(from);
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    // (0, 0) is always reachable through skips, so unreached cells never tie.
    let (mut a, mut b) = (0usize, 0usize);
    for x in 0..=m {
        for y in 0..width {
            let cell = prev[x * width + y];
            let current = prev[a * width + b];
            if cell.beats(current) || (!current.beats(cell) && (x + y, x) > (a + b, a)) {
                a = x;
                b = y;
            }
        }
    }

    let mut decisions = vec![RowDecision::Unassigned; n];
    for t in (0..n).rev() {
        let index = t * layer + a * width + b;
        decisions[t] = match tags[index] {
            STAY_A => RowDecision::Matched {
                channel: Channel::A,
                item: a - 1,
            },
            STAY_B => RowDecision::Matched {
                channel: Channel::B,
                item: b - 1,
            },
            CONSUME_A => {
                let item = a - 1;
                a = origins[index] as usize;
                RowDecision::Matched {
                    channel: Channel::A,
                    item,
                }
            }
            CONSUME_B => {
                let item = b - 1;
                b = origins[index] as usize;
                RowDecision::Matched {
                    channel: Channel::B,
                    item,
                }
            }
            _ => RowDecision::Unassigned,
        };
    }
    decisions
}

fn column(layer: &[Cell], m: usize, width: usize, b: usize) -> Vec<Cell> {
    (0..=m).map(|a| layer[a * width + b]).collect()
}
