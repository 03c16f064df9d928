//! Derived views over the occupancy store: two-date comparison, min/max
//! statistics over a date range and the filters used to build those ranges.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{
    model::{BedCategory, DateKey},
    store::OccupancyStore,
};

/// Categories shown on the statistics panel.
pub const TRACKED_CATEGORIES: [BedCategory; 2] = [BedCategory::Clinical, BedCategory::Icu];

// ==================== Comparison Types ====================

/// Direction of change between the two compared dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeltaDirection {
    Increase,
    Decrease,
    Unchanged,
}

impl DeltaDirection {
    pub fn of(delta: i64) -> Self {
        match delta {
            d if d > 0 => DeltaDirection::Increase,
            d if d < 0 => DeltaDirection::Decrease,
            _ => DeltaDirection::Unchanged,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            DeltaDirection::Increase => "↑",
            DeltaDirection::Decrease => "↓",
            DeltaDirection::Unchanged => "→",
        }
    }
}

/// One category row of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    pub category: BedCategory,
    pub value_a: u32,
    pub value_b: u32,
    /// `value_b - value_a`
    pub delta: i64,
    pub direction: DeltaDirection,
}

/// Per-category differences between two stored dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub date_a: DateKey,
    pub date_b: DateKey,
    pub rows: Vec<ComparisonRow>,
    pub total_a: u64,
    pub total_b: u64,
    pub total_delta: i64,
}

impl ComparisonResult {
    pub fn row(&self, category: BedCategory) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.category == category)
    }

    pub fn delta(&self, category: BedCategory) -> i64 {
        self.row(category).map_or(0, |r| r.delta)
    }
}

// ==================== Comparison ====================

/// Compare two dates of the store.
///
/// Returns `None` while either date is unselected or not present in the store;
/// there is never a partial result.
pub fn compare(
    store: &OccupancyStore,
    date_a: Option<&DateKey>,
    date_b: Option<&DateKey>,
) -> Option<ComparisonResult> {
    let (date_a, date_b) = (date_a?, date_b?);
    let snapshot_a = store.data().get(date_a)?;
    let snapshot_b = store.data().get(date_b)?;

    let rows: Vec<ComparisonRow> = BedCategory::ALL
        .into_iter()
        .map(|category| {
            let value_a = snapshot_a.get(category);
            let value_b = snapshot_b.get(category);
            let delta = i64::from(value_b) - i64::from(value_a);
            ComparisonRow {
                category,
                value_a,
                value_b,
                delta,
                direction: DeltaDirection::of(delta),
            }
        })
        .collect();

    let total_a = snapshot_a.total();
    let total_b = snapshot_b.total();
    let total_delta = rows.iter().map(|r| r.delta).sum();

    Some(ComparisonResult {
        date_a: *date_a,
        date_b: *date_b,
        rows,
        total_a,
        total_b,
        total_delta,
    })
}

// ==================== Statistical Analysis ====================

/// Extremes of one category over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsResult {
    pub category: BedCategory,
    pub max_value: u32,
    /// Every date reaching `max_value`, in range order.
    pub max_dates: Vec<DateKey>,
    pub min_value: u32,
    /// Every date reaching `min_value`, in range order.
    pub min_dates: Vec<DateKey>,
}

/// Find the highest and lowest values of `category` over `dates`.
///
/// `dates` is used as given; filtering by month or any other criterion is the
/// caller's job. Dates missing from the store count as 0. Returns `None` for
/// an empty range.
pub fn compute_extremes(
    store: &OccupancyStore,
    category: BedCategory,
    dates: &[DateKey],
) -> Option<StatisticsResult> {
    let values: Vec<(DateKey, u32)> = dates
        .iter()
        .map(|d| (*d, store.get(d).get(category)))
        .collect();

    let max_value = values.iter().map(|(_, v)| *v).max()?;
    let min_value = values.iter().map(|(_, v)| *v).min()?;

    let dates_with = |target: u32| -> Vec<DateKey> {
        values
            .iter()
            .filter(|(_, v)| *v == target)
            .map(|(d, _)| *d)
            .collect()
    };

    Some(StatisticsResult {
        category,
        max_value,
        max_dates: dates_with(max_value),
        min_value,
        min_dates: dates_with(min_value),
    })
}

/// Extremes for each of the [`TRACKED_CATEGORIES`]. Empty when `dates` is empty.
pub fn tracked_statistics(store: &OccupancyStore, dates: &[DateKey]) -> Vec<StatisticsResult> {
    TRACKED_CATEGORIES
        .into_iter()
        .filter_map(|category| compute_extremes(store, category, dates))
        .collect()
}

// ==================== Date Filters ====================

/// Period selection for the statistics panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Month {
        year: i32,
        month: u32,
    },
}

impl DateFilter {
    pub fn matches(&self, date: &DateKey) -> bool {
        match *self {
            DateFilter::All => true,
            DateFilter::Month { year, month } => date.year() == year && date.month() == month,
        }
    }

    /// Parse `all` or `YYYY-MM`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Some(DateFilter::All);
        }
        let (year, month) = s.split_once('-')?;
        let year = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        (1..=12)
            .contains(&month)
            .then_some(DateFilter::Month { year, month })
    }

    pub fn label(&self) -> String {
        match self {
            DateFilter::All => "Todo o período".to_string(),
            DateFilter::Month { year, month } => format!("{month:02}/{year}"),
        }
    }
}

/// Stored dates matching `filter`, most recent first.
pub fn filter_dates(store: &OccupancyStore, filter: DateFilter) -> Vec<DateKey> {
    store
        .list_dates()
        .into_iter()
        .filter(|d| filter.matches(d))
        .collect()
}

/// Distinct months that have data, most recent first.
pub fn available_months(store: &OccupancyStore) -> Vec<DateFilter> {
    let months: BTreeSet<(i32, u32)> = store
        .data()
        .keys()
        .map(|d| (d.year(), d.month()))
        .collect();
    months
        .into_iter()
        .rev()
        .map(|(year, month)| DateFilter::Month { year, month })
        .collect()
}

/// Sum of each category over `dates`. Dates missing from the store count as 0.
pub fn column_totals(store: &OccupancyStore, dates: &[DateKey]) -> Vec<(BedCategory, u64)> {
    BedCategory::ALL
        .into_iter()
        .map(|category| {
            let total = dates
                .iter()
                .map(|d| u64::from(store.get(d).get(category)))
                .sum();
            (category, total)
        })
        .collect()
}
