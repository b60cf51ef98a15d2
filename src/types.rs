use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::alignment::normalize::NormalizedText;
use crate::config::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    A,
    B,
}

impl Channel {
    pub const BOTH: [Channel; 2] = [Channel::A, Channel::B];

    pub fn other(self) -> Channel {
        match self {
            Channel::A => Channel::B,
            Channel::B => Channel::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::A => "a",
            Channel::B => "b",
        }
    }
}

/// Final label of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    A,
    B,
    Unassigned,
}

impl Label {
    pub fn channel(self) -> Option<Channel> {
        match self {
            Label::A => Some(Channel::A),
            Label::B => Some(Channel::B),
            Label::Unassigned => None,
        }
    }
}

impl From<Channel> for Label {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::A => Label::A,
            Channel::B => Label::B,
        }
    }
}

/// Layout tag attached to a segment by an upstream classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorLabel {
    Text,
    Paragraph,
    Title,
    SectionHeader,
    ListItem,
    Caption,
    Footnote,
    Formula,
    Table,
    Picture,
    PageHeader,
    PageFooter,
    PageNumber,
    Reference,
}

impl PriorLabel {
    pub const ALL: [PriorLabel; 14] = [
        PriorLabel::Text,
        PriorLabel::Paragraph,
        PriorLabel::Title,
        PriorLabel::SectionHeader,
        PriorLabel::ListItem,
        PriorLabel::Caption,
        PriorLabel::Footnote,
        PriorLabel::Formula,
        PriorLabel::Table,
        PriorLabel::Picture,
        PriorLabel::PageHeader,
        PriorLabel::PageFooter,
        PriorLabel::PageNumber,
        PriorLabel::Reference,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriorLabel::Text => "text",
            PriorLabel::Paragraph => "paragraph",
            PriorLabel::Title => "title",
            PriorLabel::SectionHeader => "section_header",
            PriorLabel::ListItem => "list_item",
            PriorLabel::Caption => "caption",
            PriorLabel::Footnote => "footnote",
            PriorLabel::Formula => "formula",
            PriorLabel::Table => "table",
            PriorLabel::Picture => "picture",
            PriorLabel::PageHeader => "page_header",
            PriorLabel::PageFooter => "page_footer",
            PriorLabel::PageNumber => "page_number",
            PriorLabel::Reference => "reference",
        }
    }
}

impl fmt::Display for PriorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPriorLabel(pub String);

impl fmt::Display for UnknownPriorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown prior label `{}`", self.0)
    }
}

impl std::error::Error for UnknownPriorLabel {}

impl FromStr for PriorLabel {
    type Err = UnknownPriorLabel;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let wanted = tag.trim().to_ascii_lowercase().replace(|c: char| c == '-' || c == ' ', "_");
        PriorLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == wanted)
            .ok_or_else(|| UnknownPriorLabel(tag.to_string()))
    }
}

/// Page-relative position. `vertical` is 0.0 at the top edge, 1.0 at the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialPosition {
    pub vertical: f64,
    pub page: u32,
}

impl Default for SpatialPosition {
    fn default() -> Self {
        Self {
            vertical: 0.5,
            page: 0,
        }
    }
}

/// One observed text unit as delivered by the layout extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInput {
    pub text: String,
    #[serde(default = "default_vertical")]
    pub spatial_position: f64,
    #[serde(default)]
    pub page_index: u32,
    #[serde(default)]
    pub prior_label: Option<PriorLabel>,
    /// Opaque geometry for renderers; never read by the aligner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<serde_json::Value>,
}

fn default_vertical() -> f64 {
    0.5
}

impl SegmentInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spatial_position: default_vertical(),
            page_index: 0,
            prior_label: None,
            geometry: None,
        }
    }

    pub fn at(mut self, vertical: f64, page_index: u32) -> Self {
        self.spatial_position = vertical;
        self.page_index = page_index;
        self
    }

    pub fn with_prior_label(mut self, label: PriorLabel) -> Self {
        self.prior_label = Some(label);
        self
    }
}

/// One ground-truth text unit as delivered by the structural extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceInput {
    pub text: String,
}

impl ReferenceInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    index: usize,
    text: String,
    normalized: NormalizedText,
    position: SpatialPosition,
    prior_label: Option<PriorLabel>,
    geometry: Option<serde_json::Value>,
}

impl Segment {
    pub fn new(index: usize, input: &SegmentInput, normalized: NormalizedText) -> Self {
        let mut vertical = input.spatial_position;
        if !vertical.is_finite() || !(0.0..=1.0).contains(&vertical) {
            tracing::warn!(
                segment = index,
                vertical,
                "segment spatial position outside [0, 1]; clamping"
            );
            vertical = if vertical.is_finite() {
                vertical.clamp(0.0, 1.0)
            } else {
                default_vertical()
            };
        }
        Self {
            index,
            text: input.text.clone(),
            normalized,
            position: SpatialPosition {
                vertical,
                page: input.page_index,
            },
            prior_label: input.prior_label,
            geometry: input.geometry.clone(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn normalized(&self) -> &NormalizedText {
        &self.normalized
    }

    pub fn position(&self) -> SpatialPosition {
        self.position
    }

    pub fn prior_label(&self) -> Option<PriorLabel> {
        self.prior_label
    }

    pub fn geometry(&self) -> Option<&serde_json::Value> {
        self.geometry.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceItem {
    channel: Channel,
    index: usize,
    text: String,
    normalized: NormalizedText,
}

impl ReferenceItem {
    pub fn new(channel: Channel, index: usize, text: impl Into<String>, normalized: NormalizedText) -> Self {
        Self {
            channel,
            index,
            text: text.into(),
            normalized,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn normalized(&self) -> &NormalizedText {
        &self.normalized
    }
}

/// Normalized segments and both reference channels for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    segments: Vec<Segment>,
    channel_a: Vec<ReferenceItem>,
    channel_b: Vec<ReferenceItem>,
}

impl Document {
    pub fn new(segments: Vec<Segment>, channel_a: Vec<ReferenceItem>, channel_b: Vec<ReferenceItem>) -> Self {
        Self {
            segments,
            channel_a,
            channel_b,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn channel(&self, channel: Channel) -> &[ReferenceItem] {
        match channel {
            Channel::A => &self.channel_a,
            Channel::B => &self.channel_b,
        }
    }
}

/// How an assignment was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Aligned,
    HintSkipped,
    HintRouted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub segment_index: usize,
    pub label: Label,
    /// Channel-local index of the matched reference item, if any.
    pub reference_index: Option<usize>,
    /// Base similarity of the match in [0, 1]; 0.0 when nothing was matched.
    pub score: f64,
    pub decided_by: Decision,
}

impl Assignment {
    pub fn unassigned(segment_index: usize, decided_by: Decision) -> Self {
        Self {
            segment_index,
            label: Label::Unassigned,
            reference_index: None,
            score: 0.0,
            decided_by,
        }
    }
}

/// Which joint DP bound was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeLimit {
    /// `m * k` cursor states per row.
    ChannelProduct,
    /// `rows * (m + 1) * (k + 1)` back-pointer cells.
    BacktrackCells,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignmentWarning {
    /// The joint DP exceeded a ceiling; `fallback` ran instead. `states`
    /// is measured in the unit of `limit`.
    SizeLimitExceeded {
        requested: Strategy,
        fallback: Strategy,
        limit: SizeLimit,
        states: usize,
        ceiling: usize,
    },
}

/// Reading-order suspicions raised for one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityFlag {
    /// Best per-item scores are low and nearly identical.
    UniformLowScores { mean_best: f64, spread: f64 },
    /// Confidently matched items appear in the segments out of channel order.
    OrderInversions {
        inversion_rate: f64,
        compared_pairs: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityFlag {
    pub channel: Channel,
    pub flag: DataQualityFlag,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentResult {
    /// One assignment per segment, in segment order.
    pub assignments: Vec<Assignment>,
    /// Strategy that actually produced the aligned rows.
    pub strategy: Strategy,
    /// Optimized objective over the aligned (non-hint) rows.
    pub objective: f64,
    pub warnings: Vec<AlignmentWarning>,
    pub quality_flags: Vec<QualityFlag>,
}

impl AlignmentResult {
    pub fn labels(&self) -> Vec<Label> {
        self.assignments.iter().map(|a| a.label).collect()
    }

    pub fn flags_for(&self, channel: Channel) -> impl Iterator<Item = &DataQualityFlag> {
        self.quality_flags
            .iter()
            .filter(move |f| f.channel == channel)
            .map(|f| &f.flag)
    }

    /// Lists every broken result invariant: total coverage, per-channel
    /// monotonicity, contiguous fragments and score bounds. Empty when sound.
    pub fn invariant_violations(&self, segment_count: usize) -> Vec<String> {
        let mut violations = Vec::new();
        if self.assignments.len() != segment_count {
            violations.push(format!(
                "expected {segment_count} assignments, found {}",
                self.assignments.len()
            ));
        }
        for (position, assignment) in self.assignments.iter().enumerate() {
            if assignment.segment_index != position {
                violations.push(format!(
                    "assignment #{position} covers segment {}",
                    assignment.segment_index
                ));
            }
            if !(0.0..=1.0).contains(&assignment.score) {
                violations.push(format!(
                    "segment {} has score {} outside [0, 1]",
                    assignment.segment_index, assignment.score
                ));
            }
            if assignment.label == Label::Unassigned && assignment.reference_index.is_some() {
                violations.push(format!(
                    "unassigned segment {} references an item",
                    assignment.segment_index
                ));
            }
        }

        for channel in Channel::BOTH {
            let matched = self
                .assignments
                .iter()
                .filter(|a| a.label.channel() == Some(channel))
                .filter_map(|a| a.reference_index.map(|item| (a.segment_index, item)));
            let mut last: Option<(usize, usize)> = None;
            let mut closed: Vec<usize> = Vec::new();
            for (segment, item) in matched {
                if let Some((prev_segment, prev_item)) = last {
                    if item < prev_item {
                        violations.push(format!(
                            "channel {}: segment {segment} matches item {item} after segment {prev_segment} matched {prev_item}",
                            channel.as_str()
                        ));
                    } else if item != prev_item {
                        closed.push(prev_item);
                    }
                }
                if closed.contains(&item) {
                    violations.push(format!(
                        "channel {}: item {item} referenced non-contiguously (segment {segment})",
                        channel.as_str()
                    ));
                }
                last = Some((segment, item));
            }
        }
        violations
    }
}
