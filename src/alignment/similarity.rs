//! Symmetric, fragment-tolerant similarity between normalized strings.
//!
//! The score blends two ratios derived from one Smith-Waterman local
//! alignment (match +1, mismatch -1, gap -1):
//!
//! - `partial = local / len(shorter)`: how much of the shorter string is
//!   found, in order and nearly contiguous, inside the longer one;
//! - `whole = 2 * local / (len(a) + len(b))`: how much of both strings
//!   the match explains.
//!
//! The partial share grows with the shorter string's length and is capped,
//! so a two-character page number cannot earn full credit through a lucky
//! substring hit, while a full line that is a fragment of a paragraph still
//! scores close to 1.0. Swapping the arguments never changes the result.

/// Shorter-string length at which the partial share reaches its cap.
const FULL_PARTIAL_CREDIT_CHARS: f64 = 16.0;
const MAX_PARTIAL_SHARE: f64 = 0.85;
/// Above this many DP cells the alignment runs over word tokens instead of
/// characters (whole-document coverage strings).
const CHAR_CELL_BUDGET: usize = 4_000_000;

const MATCH: i32 = 1;
const MISMATCH: i32 = -1;
const GAP: i32 = -1;

pub fn score(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.len().saturating_mul(b_chars.len()) > CHAR_CELL_BUDGET {
        return token_score(a, b);
    }

    let local = local_alignment(&a_chars, &b_chars, |x, y| x == y, |_| 1) as f64;
    blend(local, a_chars.len() as f64, b_chars.len() as f64)
}

fn blend(local: f64, len_a: f64, len_b: f64) -> f64 {
    let shorter = len_a.min(len_b);
    if shorter <= 0.0 {
        return 0.0;
    }
    let partial = local / shorter;
    let whole = 2.0 * local / (len_a + len_b);
    let share = (shorter / FULL_PARTIAL_CREDIT_CHARS).min(MAX_PARTIAL_SHARE);
    (share * partial + (1.0 - share) * whole).clamp(0.0, 1.0)
}

/// Word-level variant for very long inputs. A token weighs its character
/// count plus one for the separating space, so the ratios stay in
/// character units and comparable with the character path.
fn token_score(a: &str, b: &str) -> f64 {
    let a_tokens: Vec<&str> = a.split(' ').filter(|t| !t.is_empty()).collect();
    let b_tokens: Vec<&str> = b.split(' ').filter(|t| !t.is_empty()).collect();
    let weight = |t: &&str| t.chars().count() as i32 + 1;
    let local = local_alignment(&a_tokens, &b_tokens, |x, y| x == y, weight) as f64;
    let len_a = a_tokens.iter().map(weight).sum::<i32>() as f64;
    let len_b = b_tokens.iter().map(weight).sum::<i32>() as f64;
    blend(local, len_a, len_b)
}

/// Best local alignment score with weighted units. Rows run over the longer
/// sequence so the two score rows are sized by the shorter one.
fn local_alignment<T>(
    a: &[T],
    b: &[T],
    same: impl Fn(&T, &T) -> bool,
    weight: impl Fn(&T) -> i32,
) -> i32 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }

    let short_weights: Vec<i32> = short.iter().map(&weight).collect();
    let mut prev = vec![0i32; short.len() + 1];
    let mut curr = vec![0i32; short.len() + 1];
    let mut best = 0i32;

    for item in long {
        let item_weight = weight(item);
        curr[0] = 0;
        for (j, other) in short.iter().enumerate() {
            let unit = short_weights[j];
            let diag = prev[j]
                + if same(item, other) {
                    MATCH * unit
                } else {
                    MISMATCH * unit.max(item_weight)
                };
            let skip_long = prev[j + 1] + GAP * item_weight;
            let skip_short = curr[j] + GAP * unit;
            let cell = diag.max(skip_long).max(skip_short).max(0);
            curr[j + 1] = cell;
            best = best.max(cell);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    best
}
