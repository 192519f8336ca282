//! Display salience: min-max normalization of raw salience onto 1..=10

use super::node::ConceptNode;
use std::collections::BTreeMap;

/// Raw salience assumed for nodes that carry none
pub const DEFAULT_SALIENCE: f64 = 5.0;

pub const DISPLAY_MIN: u8 = 1;
pub const DISPLAY_MAX: u8 = 10;

/// Normalize every node's raw salience against the current min and max.
///
/// `1 + round((raw - min) / max(1, max - min) * 9)`. An empty node set
/// yields an empty map.
pub fn normalize<'a, I>(nodes: I) -> BTreeMap<String, u8>
where
    I: IntoIterator<Item = &'a ConceptNode>,
{
    let raw: Vec<(&str, f64)> = nodes
        .into_iter()
        .map(|n| (n.label.as_str(), n.salience.unwrap_or(DEFAULT_SALIENCE)))
        .collect();

    if raw.is_empty() {
        return BTreeMap::new();
    }

    let min = raw.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max = raw.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    let range = (max - min).max(1.0);

    raw.into_iter()
        .map(|(label, value)| (label.to_string(), scale(value, min, range)))
        .collect()
}

fn scale(value: f64, min: f64, range: f64) -> u8 {
    let span = f64::from(DISPLAY_MAX - DISPLAY_MIN);
    let scaled = f64::from(DISPLAY_MIN) + ((value - min) / range * span).round();
    scaled.clamp(f64::from(DISPLAY_MIN), f64::from(DISPLAY_MAX)) as u8
}
