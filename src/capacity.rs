//! Installed capacity, alert thresholds and input limits per bed category.

use crate::{
    model::{BedCategory, BedSnapshot},
    status::Thresholds,
};

/// Capacity used to draw a bar when a category has none configured.
pub const DEFAULT_CAPACITY: u32 = 100;

/// Limits for a single category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryLimits {
    /// Installed beds, if the number is meaningful for the category.
    pub capacity: Option<u32>,
    pub thresholds: Option<Thresholds>,
    /// Largest value accepted from the entry form.
    pub input_max: u32,
}

impl CategoryLimits {
    pub fn new(capacity: Option<u32>, thresholds: Option<Thresholds>, input_max: u32) -> Self {
        Self {
            capacity,
            thresholds,
            input_max,
        }
    }
}

/// Process-wide capacity configuration, read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityConfig {
    limits: [CategoryLimits; BedCategory::COUNT],
    default_capacity: u32,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        let thresholded = |capacity, alert, critical, input_max| {
            CategoryLimits::new(
                Some(capacity),
                Some(Thresholds::new(alert, critical)),
                input_max,
            )
        };
        let open = |input_max| CategoryLimits::new(None, None, input_max);

        Self {
            limits: [
                thresholded(46, 42, 46, 100),
                open(50),
                thresholded(8, 7, 8, 20),
                thresholded(8, 7, 8, 20),
                open(10),
                open(10),
            ],
            default_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl CapacityConfig {
    pub fn new(default_capacity: u32) -> Self {
        Self {
            default_capacity,
            ..Self::default()
        }
    }

    pub fn with_limits(mut self, category: BedCategory, limits: CategoryLimits) -> Self {
        self.limits[category.index()] = limits;
        self
    }

    pub fn limits(&self, category: BedCategory) -> &CategoryLimits {
        &self.limits[category.index()]
    }

    pub fn capacity(&self, category: BedCategory) -> Option<u32> {
        self.limits(category).capacity
    }

    /// Capacity to render against, falling back to the default.
    pub fn display_capacity(&self, category: BedCategory) -> u32 {
        self.capacity(category).unwrap_or(self.default_capacity)
    }

    pub fn default_capacity(&self) -> u32 {
        self.default_capacity
    }

    pub fn thresholds(&self, category: BedCategory) -> Option<Thresholds> {
        self.limits(category).thresholds
    }

    /// Clamp every value of a form entry into `[0, input_max]`.
    pub fn clamp_input(&self, snapshot: &BedSnapshot) -> BedSnapshot {
        BedSnapshot::from_counts(
            snapshot
                .iter()
                .map(|(c, v)| (c, v.min(self.limits(c).input_max))),
        )
    }
}
