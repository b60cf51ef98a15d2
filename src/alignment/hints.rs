use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::HintConfig;
use crate::error::AlignmentError;
use crate::types::{Assignment, Channel, Decision, PriorLabel, Segment};

/// What a prior label does to its segment before alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintBehavior {
    /// Finalize as unassigned; the aligner never sees the segment.
    Skip,
    /// Finalize into the channel without a matched reference item.
    Route(Channel),
    /// Align normally with the channel's weight multiplied by the hint boost.
    Boost(Channel),
}

/// Validated `{label -> behavior}` table.
#[derive(Debug, Clone, PartialEq)]
pub struct HintTable {
    rules: HashMap<PriorLabel, HintBehavior>,
    boost: f64,
}

impl HintTable {
    pub fn from_config(config: &HintConfig) -> Result<Self, AlignmentError> {
        if !config.boost.is_finite() || !(1.0..=HintConfig::MAX_BOOST).contains(&config.boost) {
            return Err(AlignmentError::configuration(
                "hints.boost",
                format!(
                    "{} is outside [1.0, {}]",
                    config.boost,
                    HintConfig::MAX_BOOST
                ),
            ));
        }
        let mut rules = HashMap::with_capacity(config.rules.len());
        for (tag, behavior) in &config.rules {
            let label: PriorLabel = tag
                .parse()
                .map_err(|err| AlignmentError::configuration("hints.rules", format!("{err}")))?;
            if rules.insert(label, *behavior).is_some() {
                return Err(AlignmentError::configuration(
                    "hints.rules",
                    format!("label `{label}` is listed more than once"),
                ));
            }
        }
        Ok(Self {
            rules,
            boost: config.boost,
        })
    }

    pub fn behavior(&self, label: PriorLabel) -> Option<HintBehavior> {
        self.rules.get(&label).copied()
    }

    pub fn boost(&self) -> f64 {
        self.boost
    }
}

/// Result of the hint stage for one segment.
#[derive(Debug, Clone, PartialEq)]
pub enum HintOutcome {
    Final(Assignment),
    PassThrough { boost_channel: Option<Channel> },
}

impl HintOutcome {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, HintOutcome::PassThrough { .. })
    }

    /// Multiplier the hint contributes to `channel`'s weight.
    pub fn channel_boost(&self, channel: Channel, table: &HintTable) -> f64 {
        match self {
            HintOutcome::PassThrough {
                boost_channel: Some(boosted),
            } if *boosted == channel => table.boost(),
            _ => 1.0,
        }
    }
}

/// One outcome per segment, in segment order.
pub fn preprocess(segments: &[Segment], table: &HintTable) -> Vec<HintOutcome> {
    segments
        .iter()
        .map(|segment| {
            let behavior = segment
                .prior_label()
                .and_then(|label| table.behavior(label));
            let outcome = match behavior {
                Some(HintBehavior::Skip) => {
                    HintOutcome::Final(Assignment::unassigned(segment.index(), Decision::HintSkipped))
                }
                Some(HintBehavior::Route(channel)) => HintOutcome::Final(Assignment {
                    segment_index: segment.index(),
                    label: channel.into(),
                    reference_index: None,
                    score: 0.0,
                    decided_by: Decision::HintRouted,
                }),
                Some(HintBehavior::Boost(channel)) => HintOutcome::PassThrough {
                    boost_channel: Some(channel),
                },
                None => HintOutcome::PassThrough {
                    boost_channel: None,
                },
            };
            if let (Some(label), HintOutcome::Final(assignment)) = (segment.prior_label(), &outcome) {
                tracing::debug!(
                    segment = segment.index(),
                    prior_label = label.as_str(),
                    label = ?assignment.label,
                    "hints: finalized segment before alignment"
                );
            }
            outcome
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::alignment::normalize::NormalizedText;
    use crate::types::{Label, SegmentInput};

    fn segment(index: usize, label: Option<PriorLabel>) -> Segment {
        let mut input = SegmentInput::new("text");
        input.prior_label = label;
        Segment::new(index, &input, NormalizedText::from_normalized("text"))
    }

    fn table(rules: &[(&str, HintBehavior)], boost: f64) -> HintTable {
        let config = HintConfig {
            boost,
            rules: rules
                .iter()
                .map(|(tag, behavior)| (tag.to_string(), *behavior))
                .collect::<BTreeMap<_, _>>(),
        };
        HintTable::from_config(&config).expect("valid hint table")
    }

    #[test]
    fn default_config_builds_a_table() {
        let table = HintTable::from_config(&HintConfig::default()).expect("defaults");
        assert_eq!(table.behavior(PriorLabel::PageHeader), Some(HintBehavior::Skip));
        assert_eq!(
            table.behavior(PriorLabel::Footnote),
            Some(HintBehavior::Boost(Channel::B))
        );
        assert_eq!(table.behavior(PriorLabel::Formula), None);
    }

    #[test]
    fn unknown_tags_fail_validation() {
        let config = HintConfig {
            boost: 1.2,
            rules: BTreeMap::from([("marginal_note".to_string(), HintBehavior::Skip)]),
        };
        let err = HintTable::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("marginal_note"));
    }

    #[test]
    fn duplicate_spellings_of_one_label_fail_validation() {
        let config = HintConfig {
            boost: 1.2,
            rules: BTreeMap::from([
                ("page_header".to_string(), HintBehavior::Skip),
                ("page-header".to_string(), HintBehavior::Route(Channel::A)),
            ]),
        };
        assert!(HintTable::from_config(&config).is_err());
    }

    #[test]
    fn boost_is_bounded() {
        let config = HintConfig {
            boost: 1.31,
            rules: BTreeMap::new(),
        };
        assert!(HintTable::from_config(&config).is_err());
        let config = HintConfig {
            boost: 0.9,
            rules: BTreeMap::new(),
        };
        assert!(HintTable::from_config(&config).is_err());
    }

    #[test]
    fn preprocess_is_total_and_order_preserving() {
        let table = table(
            &[
                ("page_header", HintBehavior::Skip),
                ("caption", HintBehavior::Route(Channel::B)),
                ("footnote", HintBehavior::Boost(Channel::B)),
            ],
            1.3,
        );
        let segments = vec![
            segment(0, Some(PriorLabel::PageHeader)),
            segment(1, None),
            segment(2, Some(PriorLabel::Caption)),
            segment(3, Some(PriorLabel::Footnote)),
            segment(4, Some(PriorLabel::Formula)),
        ];
        let outcomes = preprocess(&segments, &table);
        assert_eq!(outcomes.len(), segments.len());

        match &outcomes[0] {
            HintOutcome::Final(a) => {
                assert_eq!(a.segment_index, 0);
                assert_eq!(a.label, Label::Unassigned);
                assert_eq!(a.decided_by, Decision::HintSkipped);
            }
            other => panic!("expected final, got {other:?}"),
        }
        assert_eq!(outcomes[1], HintOutcome::PassThrough { boost_channel: None });
        match &outcomes[2] {
            HintOutcome::Final(a) => {
                assert_eq!(a.segment_index, 2);
                assert_eq!(a.label, Label::B);
                assert_eq!(a.reference_index, None);
                assert_eq!(a.decided_by, Decision::HintRouted);
            }
            other => panic!("expected final, got {other:?}"),
        }
        assert_eq!(
            outcomes[3],
            HintOutcome::PassThrough {
                boost_channel: Some(Channel::B)
            }
        );
        assert_eq!(outcomes[4], HintOutcome::PassThrough { boost_channel: None });
    }

    #[test]
    fn boost_applies_only_to_the_agreeing_channel() {
        let table = table(&[("footnote", HintBehavior::Boost(Channel::B))], 1.3);
        let outcome = HintOutcome::PassThrough {
            boost_channel: Some(Channel::B),
        };
        assert_eq!(outcome.channel_boost(Channel::B, &table), 1.3);
        assert_eq!(outcome.channel_boost(Channel::A, &table), 1.0);
    }

    #[test]
    fn behavior_table_deserializes_from_json() {
        let json = r#"{"boost": 1.1, "rules": {"page_number": "skip", "caption": {"route": "a"}, "footnote": {"boost": "b"}}}"#;
        let config: HintConfig = serde_json::from_str(json).expect("hint config");
        let table = HintTable::from_config(&config).expect("table");
        assert_eq!(table.behavior(PriorLabel::PageNumber), Some(HintBehavior::Skip));
        assert_eq!(
            table.behavior(PriorLabel::Caption),
            Some(HintBehavior::Route(Channel::A))
        );
        assert_eq!(
            table.behavior(PriorLabel::Footnote),
            Some(HintBehavior::Boost(Channel::B))
        );
    }
}
