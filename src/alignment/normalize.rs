use std::fmt;

use serde::Serialize;

use crate::config::NormalizerConfig;

const SOFT_HYPHEN: char = '\u{00AD}';
/// Letter runs up to this length followed by a dot are treated as
/// abbreviations (`v.`, `U.S.`, `L.`) when citation stripping is on.
const MAX_ABBREVIATION_LETTERS: usize = 3;

/// Text in canonical comparison form: lowercase, single-spaced, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    /// Wraps text the caller already brought into canonical form.
    pub fn from_normalized(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize(text: &str, config: &NormalizerConfig) -> NormalizedText {
    let joined = join_line_break_hyphens(text);
    let lowered = joined.to_lowercase();
    let cleaned = if config.strip_citation_punctuation {
        strip_abbreviation_dots(&lowered)
    } else {
        lowered
    };
    NormalizedText(collapse_whitespace(&cleaned))
}

/// Removes soft hyphens and re-joins `word-\nword` splits. Only a hyphen
/// directly after a letter, followed by whitespace containing a line break
/// and then a lowercase letter, is treated as a hyphenation artifact.
fn join_line_break_hyphens(text: &str) -> String {
    let chars: Vec<char> = text.chars().filter(|&c| c != SOFT_HYPHEN).collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '-' && out.chars().next_back().is_some_and(char::is_alphabetic) {
            let mut j = i + 1;
            let mut saw_line_break = false;
            while j < chars.len() && chars[j].is_whitespace() {
                saw_line_break |= matches!(chars[j], '\n' | '\r');
                j += 1;
            }
            if saw_line_break && chars.get(j).is_some_and(|next| next.is_lowercase()) {
                i = j;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Drops a dot that directly follows a short letter run. The run length is
/// measured on the output, so `u.s.` collapses to `us` in one pass and a
/// second pass finds nothing left to drop.
fn strip_abbreviation_dots(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut letter_run = 0usize;
    for c in text.chars() {
        if c == '.' && (1..=MAX_ABBREVIATION_LETTERS).contains(&letter_run) {
            continue;
        }
        if c.is_alphabetic() {
            letter_run += 1;
        } else {
            letter_run = 0;
        }
        out.push(c);
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
