use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::alignment::hints::{HintBehavior, HintTable};
use crate::error::AlignmentError;
use crate::types::Channel;

/// Top-level reconciler settings. Every section falls back to its defaults
/// when absent from a config file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub normalizer: NormalizerConfig,
    pub spatial: SpatialConfig,
    pub hints: HintConfig,
    pub alignment: AlignmentConfig,
    pub quality: QualityConfig,
}

impl ReconcilerConfig {
    pub fn load(path: &Path) -> Result<Self, AlignmentError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignmentError::io("read reconciler config", e))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| AlignmentError::json("parse reconciler config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects out-of-range thresholds, penalties and unknown hint tags.
    /// Runs before any alignment work; nothing downstream re-checks.
    pub fn validate(&self) -> Result<(), AlignmentError> {
        self.spatial.validate()?;
        HintTable::from_config(&self.hints)?;
        self.alignment.validate()?;
        self.quality.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Drop abbreviation dots in citation shorthand (`U.S.` -> `us`).
    pub strip_citation_punctuation: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            strip_citation_punctuation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Channel that collects bottom-of-page material (footnotes).
    pub footnote_channel: Channel,
    /// Vertical offset beyond which a segment counts as bottom-of-page.
    pub bottom_fraction_cutoff: f64,
    /// Width of the top and bottom edge bands (headers, page numbers).
    pub edge_band_width: f64,
    pub footnote_boost: f64,
    pub body_penalty: f64,
    pub edge_unassigned_boost: f64,
}

impl SpatialConfig {
    pub const MIN_WEIGHT: f64 = 0.6;
    pub const MAX_WEIGHT: f64 = 1.5;

    fn validate(&self) -> Result<(), AlignmentError> {
        check_range("spatial.bottom_fraction_cutoff", self.bottom_fraction_cutoff, 0.0, 1.0)?;
        check_range("spatial.edge_band_width", self.edge_band_width, 0.0, 0.49)?;
        check_range("spatial.footnote_boost", self.footnote_boost, 1.0, Self::MAX_WEIGHT)?;
        check_range("spatial.body_penalty", self.body_penalty, Self::MIN_WEIGHT, 1.0)?;
        check_range(
            "spatial.edge_unassigned_boost",
            self.edge_unassigned_boost,
            1.0,
            Self::MAX_WEIGHT,
        )
    }
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            footnote_channel: Channel::B,
            bottom_fraction_cutoff: 0.8,
            edge_band_width: 0.05,
            footnote_boost: 1.5,
            body_penalty: 0.6,
            edge_unassigned_boost: 1.5,
        }
    }
}

/// Raw hint table as written in config files. Keys are prior-label tags;
/// they are checked against the closed label set in [`HintTable::from_config`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintConfig {
    /// Multiplier applied to the weight of the channel a hint agrees with.
    pub boost: f64,
    pub rules: BTreeMap<String, HintBehavior>,
}

impl HintConfig {
    pub const MAX_BOOST: f64 = 1.3;
}

impl Default for HintConfig {
    fn default() -> Self {
        let rules = [
            ("page_header", HintBehavior::Skip),
            ("page_footer", HintBehavior::Skip),
            ("page_number", HintBehavior::Skip),
            ("picture", HintBehavior::Skip),
            ("footnote", HintBehavior::Boost(Channel::B)),
            ("text", HintBehavior::Boost(Channel::A)),
            ("paragraph", HintBehavior::Boost(Channel::A)),
        ]
        .into_iter()
        .map(|(tag, behavior)| (tag.to_string(), behavior))
        .collect();
        Self { boost: 1.2, rules }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Cursor-advancing best match per segment. Smoke-test fallback only.
    Greedy,
    /// Channel A then channel B global alignment (or both orders).
    #[default]
    TwoPass,
    /// Single DP over both channel cursors.
    Joint,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Greedy, Strategy::TwoPass, Strategy::Joint];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Greedy => "greedy",
            Strategy::TwoPass => "two_pass",
            Strategy::Joint => "joint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassOrder {
    AThenB,
    BThenA,
    /// Run both orders, keep the higher objective (A-then-B on ties).
    #[default]
    Best,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    pub strategy: Strategy,
    pub pass_order: PassOrder,
    /// Score credited for leaving a segment unassigned; a match has to beat it.
    pub gap_penalty: f64,
    /// Multiplier on the weighted score when a segment stays on the item
    /// matched by the previous segment of the same channel.
    pub stay_discount: f64,
    /// Cost per reference item passed over between two consumed items.
    pub reference_gap_penalty: f64,
    /// Largest `m * k` the joint strategy accepts before falling back to two-pass.
    pub joint_state_ceiling: usize,
    /// Largest `rows * (m + 1) * (k + 1)` back-pointer arena (5 bytes a cell)
    /// the joint strategy allocates before falling back to two-pass.
    pub joint_cell_ceiling: usize,
}

impl AlignmentConfig {
    fn validate(&self) -> Result<(), AlignmentError> {
        check_range("alignment.gap_penalty", self.gap_penalty, 0.0, 1.0)?;
        check_range("alignment.stay_discount", self.stay_discount, 0.01, 1.0)?;
        check_range(
            "alignment.reference_gap_penalty",
            self.reference_gap_penalty,
            0.0,
            1.0,
        )?;
        if self.joint_state_ceiling == 0 {
            return Err(AlignmentError::configuration(
                "alignment.joint_state_ceiling",
                "must be at least 1",
            ));
        }
        if self.joint_cell_ceiling == 0 {
            return Err(AlignmentError::configuration(
                "alignment.joint_cell_ceiling",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::TwoPass,
            pass_order: PassOrder::Best,
            gap_penalty: 0.25,
            stay_discount: 0.95,
            reference_gap_penalty: 0.05,
            joint_state_ceiling: 10_000,
            joint_cell_ceiling: 64_000_000,
        }
    }
}

/// Thresholds of the reading-order detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Channels shorter than this are never flagged.
    pub min_items: usize,
    pub low_score_ceiling: f64,
    pub uniform_spread: f64,
    pub confident_match: f64,
    pub max_inversion_rate: f64,
}

impl QualityConfig {
    fn validate(&self) -> Result<(), AlignmentError> {
        check_range("quality.low_score_ceiling", self.low_score_ceiling, 0.0, 1.0)?;
        check_range("quality.uniform_spread", self.uniform_spread, 0.0, 1.0)?;
        check_range("quality.confident_match", self.confident_match, 0.0, 1.0)?;
        check_range("quality.max_inversion_rate", self.max_inversion_rate, 0.0, 1.0)
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_items: 3,
            low_score_ceiling: 0.35,
            uniform_spread: 0.1,
            confident_match: 0.6,
            max_inversion_rate: 0.3,
        }
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), AlignmentError> {
    if value.is_finite() && (min..=max).contains(&value) {
        return Ok(());
    }
    Err(AlignmentError::configuration(
        field,
        format!("{value} is outside [{min}, {max}]"),
    ))
}
