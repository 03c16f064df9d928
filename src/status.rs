//! Status classification of occupied-bed counts.

use serde::{Deserialize, Serialize};

use crate::{capacity::CapacityConfig, model::BedCategory};

/// Severity of a category's occupancy on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusLevel {
    Normal,
    Alert,
    Critical,
}

impl StatusLevel {
    pub const ALL: [StatusLevel; 3] = [
        StatusLevel::Normal,
        StatusLevel::Alert,
        StatusLevel::Critical,
    ];

    /// Label shown on status badges.
    pub fn label(&self) -> &'static str {
        match self {
            StatusLevel::Normal => "Normal",
            StatusLevel::Alert => "Alerta",
            StatusLevel::Critical => "Crítico",
        }
    }

    /// Suggested terminology for the legend.
    pub fn suggestion(&self) -> &'static str {
        match self {
            StatusLevel::Normal => "Estável / Controlado",
            StatusLevel::Alert => "Atenção / Monitoramento",
            StatusLevel::Critical => "Emergência / Superlotação",
        }
    }

    /// Bar color for this level.
    pub fn color(&self) -> &'static str {
        match self {
            StatusLevel::Normal => "#34d399",
            StatusLevel::Alert => "#f59e0b",
            StatusLevel::Critical => "#ef4444",
        }
    }
}

/// Occupied-count boundaries for one category. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub alert: u32,
    pub critical: u32,
}

impl Thresholds {
    pub fn new(alert: u32, critical: u32) -> Self {
        Self { alert, critical }
    }

    pub fn classify(&self, occupied: u32) -> StatusLevel {
        if occupied >= self.critical {
            StatusLevel::Critical
        } else if occupied >= self.alert {
            StatusLevel::Alert
        } else {
            StatusLevel::Normal
        }
    }
}

/// Classify `occupied` for `category`. Categories without thresholds are always `Normal`.
pub fn classify(category: BedCategory, occupied: u32, config: &CapacityConfig) -> StatusLevel {
    config
        .thresholds(category)
        .map_or(StatusLevel::Normal, |t| t.classify(occupied))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Thresholds Tests ====================

    #[test]
    fn test_classify_below_alert_is_normal() {
        let t = Thresholds::new(42, 46);
        assert_eq!(t.classify(0), StatusLevel::Normal);
        assert_eq!(t.classify(41), StatusLevel::Normal);
    }

    #[test]
    fn test_classify_alert_boundary_is_inclusive() {
        let t = Thresholds::new(42, 46);
        assert_eq!(t.classify(42), StatusLevel::Alert);
        assert_eq!(t.classify(45), StatusLevel::Alert);
    }

    #[test]
    fn test_classify_critical_boundary_is_inclusive() {
        let t = Thresholds::new(42, 46);
        assert_eq!(t.classify(46), StatusLevel::Critical);
        assert_eq!(t.classify(60), StatusLevel::Critical);
    }

    #[test]
    fn test_classify_equal_bounds_skip_alert() {
        let t = Thresholds::new(5, 5);
        assert_eq!(t.classify(4), StatusLevel::Normal);
        assert_eq!(t.classify(5), StatusLevel::Critical);
    }

    // ==================== classify() Tests ====================

    #[test]
    fn test_classify_uses_configured_thresholds() {
        let config = CapacityConfig::default();
        assert_eq!(classify(BedCategory::Clinical, 40, &config), StatusLevel::Normal);
        assert_eq!(classify(BedCategory::Icu, 7, &config), StatusLevel::Alert);
        assert_eq!(classify(BedCategory::Icu, 9, &config), StatusLevel::Critical);
    }

    #[test]
    fn test_classify_unthresholded_category_is_normal() {
        let config = CapacityConfig::default();
        assert_eq!(
            classify(BedCategory::Stabilization, 1_000, &config),
            StatusLevel::Normal
        );
    }

    // ==================== StatusLevel Tests ====================

    #[test]
    fn test_status_labels_and_colors() {
        assert_eq!(StatusLevel::Alert.label(), "Alerta");
        assert_eq!(StatusLevel::Critical.suggestion(), "Emergência / Superlotação");
        assert_eq!(StatusLevel::Normal.color(), "#34d399");
        assert!(StatusLevel::Normal < StatusLevel::Critical);
    }

    #[test]
    fn test_all_levels_in_severity_order() {
        assert!(StatusLevel::ALL.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(StatusLevel::ALL.len(), 3);
    }

    // ==================== Property-Based Tests ====================

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn classification_is_monotonic(
                alert in 0u32..200,
                gap in 0u32..50,
                a in 0u32..400,
                b in 0u32..400,
            ) {
                let t = Thresholds::new(alert, alert + gap);
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(t.classify(low) <= t.classify(high));
            }

            #[test]
            fn classification_matches_threshold_bands(
                alert in 0u32..200,
                gap in 0u32..50,
                occupied in 0u32..400,
            ) {
                let critical = alert + gap;
                let expected = if occupied < alert {
                    StatusLevel::Normal
                } else if occupied < critical {
                    StatusLevel::Alert
                } else {
                    StatusLevel::Critical
                };
                prop_assert_eq!(Thresholds::new(alert, critical).classify(occupied), expected);
            }

            #[test]
            fn unthresholded_categories_are_always_normal(occupied in 0u32..10_000) {
                let config = CapacityConfig::default();
                for category in BedCategory::ALL {
                    let level = classify(category, occupied, &config);
                    if config.thresholds(category).is_none() {
                        prop_assert_eq!(level, StatusLevel::Normal);
                    }
                }
            }
        }
    }
}
