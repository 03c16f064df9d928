//! View models for the occupancy bar chart and the per-category status cards.

use serde::Serialize;

use crate::{
    capacity::CapacityConfig,
    model::{BedCategory, BedSnapshot},
    status::{StatusLevel, classify},
};

/// Bar color for categories without thresholds.
pub const NEUTRAL_COLOR: &str = "#60a5fa";

/// One bar of the occupancy chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub category: BedCategory,
    pub name: &'static str,
    /// Occupied beds as stored, never capped.
    pub value: u32,
    pub capacity: u32,
    /// Occupied share of capacity, capped to `[0, 100]` for drawing.
    pub occupancy_percent: f64,
    pub free_percent: f64,
    pub available: u32,
    pub color: &'static str,
    pub show_capacity: bool,
}

/// Build one chart point per category, in display order.
///
/// Values above capacity are expected; only the drawn percentage is capped.
pub fn build_series(snapshot: &BedSnapshot, config: &CapacityConfig) -> Vec<SeriesPoint> {
    snapshot
        .iter()
        .map(|(category, value)| {
            let capacity = config.display_capacity(category);
            let occupancy_percent = if capacity == 0 {
                0.0
            } else {
                (f64::from(value) / f64::from(capacity) * 100.0).clamp(0.0, 100.0)
            };

            let color = match config.thresholds(category) {
                Some(thresholds) => thresholds.classify(value).color(),
                None => NEUTRAL_COLOR,
            };

            SeriesPoint {
                category,
                name: category.label(),
                value,
                capacity,
                occupancy_percent,
                free_percent: 100.0 - occupancy_percent,
                available: capacity.saturating_sub(value),
                color,
                show_capacity: config.capacity(category).is_some(),
            }
        })
        .collect()
}

/// Detail card for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCard {
    pub category: BedCategory,
    pub title: &'static str,
    pub value: u32,
    /// Configured capacity, 0 when the category has none.
    pub capacity: u32,
    /// `None` for informative categories without thresholds.
    pub status: Option<StatusLevel>,
    /// Uncapped share of capacity, so over-capacity shows as more than 100.
    pub percentage: f64,
}

pub fn status_cards(snapshot: &BedSnapshot, config: &CapacityConfig) -> Vec<StatusCard> {
    snapshot
        .iter()
        .map(|(category, value)| {
            let capacity = config.capacity(category).unwrap_or(0);
            let percentage = if capacity > 0 {
                f64::from(value) / f64::from(capacity) * 100.0
            } else {
                0.0
            };
            StatusCard {
                category,
                title: category.wire_name(),
                value,
                capacity,
                status: config
                    .thresholds(category)
                    .map(|_| classify(category, value, config)),
                percentage,
            }
        })
        .collect()
}
