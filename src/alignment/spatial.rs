use crate::config::SpatialConfig;
use crate::types::{Label, SpatialPosition};

/// Positional multiplier for assigning a segment at `position` to `target`.
///
/// Bottom-of-page segments lean toward the footnote channel and away from
/// the body channel; segments inside the top or bottom edge band raise the
/// value of leaving them unassigned. Results stay inside
/// [`SpatialConfig::MIN_WEIGHT`, `SpatialConfig::MAX_WEIGHT`] for any
/// validated config.
pub fn weight(position: SpatialPosition, target: Label, config: &SpatialConfig) -> f64 {
    match target.channel() {
        None => {
            if in_edge_band(position, config) {
                config.edge_unassigned_boost
            } else {
                1.0
            }
        }
        Some(channel) => {
            if !is_bottom(position, config) {
                1.0
            } else if channel == config.footnote_channel {
                config.footnote_boost
            } else {
                config.body_penalty
            }
        }
    }
}

pub fn is_bottom(position: SpatialPosition, config: &SpatialConfig) -> bool {
    position.vertical > config.bottom_fraction_cutoff
}

pub fn in_edge_band(position: SpatialPosition, config: &SpatialConfig) -> bool {
    position.vertical < config.edge_band_width
        || position.vertical > 1.0 - config.edge_band_width
}
