//! Core value types: bed categories, daily snapshots and date keys.

use std::{collections::BTreeMap, fmt, ops::Index, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
};

use crate::error::InvalidDateKey;

/// The full working set: one snapshot per day.
pub type HistoricalData = BTreeMap<DateKey, BedSnapshot>;

// ==================== Bed Categories ====================

/// Kind of hospital bed tracked by the dashboard.
///
/// The set is closed. Variant order is the display order used by every view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BedCategory {
    #[serde(rename = "Leitos Clínicos")]
    Clinical,
    #[serde(rename = "Leitos Clínicos Cuida+")]
    ClinicalPlus,
    #[serde(rename = "Leitos UTI")]
    Icu,
    #[serde(rename = "Leitos Pediátricos")]
    Pediatric,
    #[serde(rename = "Leitos Pediátricos Cuida+")]
    PediatricPlus,
    #[serde(rename = "Estabilização")]
    Stabilization,
}

struct CategoryInfo {
    wire_name: &'static str,
    label: &'static str,
    key: &'static str,
}

// Indexed by `BedCategory as usize`.
const CATEGORY_TABLE: [CategoryInfo; BedCategory::COUNT] = [
    CategoryInfo {
        wire_name: "Leitos Clínicos",
        label: "Clín.",
        key: "clinical",
    },
    CategoryInfo {
        wire_name: "Leitos Clínicos Cuida+",
        label: "Clín. Cuida+",
        key: "clinical_plus",
    },
    CategoryInfo {
        wire_name: "Leitos UTI",
        label: "UTI",
        key: "icu",
    },
    CategoryInfo {
        wire_name: "Leitos Pediátricos",
        label: "Ped.",
        key: "pediatric",
    },
    CategoryInfo {
        wire_name: "Leitos Pediátricos Cuida+",
        label: "Ped. Cuida+",
        key: "pediatric_plus",
    },
    CategoryInfo {
        wire_name: "Estabilização",
        label: "Estabilização",
        key: "stabilization",
    },
];

impl BedCategory {
    pub const COUNT: usize = 6;

    /// Every category in display order.
    pub const ALL: [BedCategory; BedCategory::COUNT] = [
        BedCategory::Clinical,
        BedCategory::ClinicalPlus,
        BedCategory::Icu,
        BedCategory::Pediatric,
        BedCategory::PediatricPlus,
        BedCategory::Stabilization,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Full name, also the key used in persisted and shared JSON.
    pub fn wire_name(self) -> &'static str {
        CATEGORY_TABLE[self.index()].wire_name
    }

    /// Short label for charts and table headers.
    pub fn label(self) -> &'static str {
        CATEGORY_TABLE[self.index()].label
    }

    /// Identifier used in configuration keys and on the command line.
    pub fn key(self) -> &'static str {
        CATEGORY_TABLE[self.index()].key
    }
}

impl fmt::Display for BedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for BedCategory {
    type Err = String;

    /// Accepts the config key (`icu`), the short label (`UTI`) or the full name,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        BedCategory::ALL
            .into_iter()
            .find(|c| {
                c.key() == needle
                    || c.label().to_lowercase() == needle
                    || c.wire_name().to_lowercase() == needle
            })
            .ok_or_else(|| format!("unknown bed category: {s}"))
    }
}

// ==================== Snapshots ====================

/// Occupied-bed counts for every category on one day.
///
/// All categories are always present; a fresh snapshot is all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BedSnapshot {
    counts: [u32; BedCategory::COUNT],
}

impl BedSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (BedCategory, u32)>,
    {
        let mut snapshot = Self::default();
        for (category, value) in counts {
            snapshot.set(category, value);
        }
        snapshot
    }

    pub fn get(&self, category: BedCategory) -> u32 {
        self.counts[category.index()]
    }

    pub fn set(&mut self, category: BedCategory, value: u32) {
        self.counts[category.index()] = value;
    }

    pub fn with(mut self, category: BedCategory, value: u32) -> Self {
        self.set(category, value);
        self
    }

    /// Iterate in display order.
    pub fn iter(&self) -> impl Iterator<Item = (BedCategory, u32)> + '_ {
        BedCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&v| u64::from(v)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&v| v == 0)
    }
}

impl Index<BedCategory> for BedSnapshot {
    type Output = u32;

    fn index(&self, category: BedCategory) -> &u32 {
        &self.counts[category.index()]
    }
}

impl Serialize for BedSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(BedCategory::COUNT))?;
        for (category, value) in self.iter() {
            map.serialize_entry(category.wire_name(), &value)?;
        }
        map.end()
    }
}

/// A count read from JSON. Negative values clamp to zero, fractions truncate.
struct Count(u32);

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountVisitor;

        impl Visitor<'_> for CountVisitor {
            type Value = Count;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a bed count")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Count, E> {
                Ok(Count(u32::try_from(v).unwrap_or(u32::MAX)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Count, E> {
                Ok(Count(v.clamp(0, i64::from(u32::MAX)) as u32))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Count, E> {
                if !v.is_finite() {
                    return Err(E::custom("bed count must be finite"));
                }
                Ok(Count(v.clamp(0.0, f64::from(u32::MAX)) as u32))
            }
        }

        deserializer.deserialize_any(CountVisitor)
    }
}

impl<'de> Deserialize<'de> for BedSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = BedSnapshot;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of bed category to occupied count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<BedSnapshot, A::Error> {
                // Missing categories stay at zero.
                let mut snapshot = BedSnapshot::default();
                while let Some((category, Count(value))) =
                    map.next_entry::<BedCategory, Count>()?
                {
                    snapshot.set(category, value);
                }
                Ok(snapshot)
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

// ==================== Date Keys ====================

/// A calendar day in canonical `YYYY-MM-DD` form, timezone-naive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn parse(s: &str) -> Result<Self, InvalidDateKey> {
        let s = s.trim();
        // Reject unpadded forms such as 2024-3-1 which chrono would accept.
        if s.len() != 10 {
            return Err(InvalidDateKey(s.to_string()));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| InvalidDateKey(s.to_string()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Day in the `dd/mm/yyyy` form shown to users.
    pub fn display_br(&self) -> String {
        self.0.format("%d/%m/%Y").to_string()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DateKey {
    type Err = InvalidDateKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateKey::parse(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    // ==================== BedCategory Tests ====================

    #[test]
    fn test_category_table_matches_variant_order() {
        for (i, category) in BedCategory::ALL.into_iter().enumerate() {
            assert_eq!(category.index(), i);
        }
        assert_eq!(BedCategory::Icu.wire_name(), "Leitos UTI");
        assert_eq!(BedCategory::Icu.label(), "UTI");
        assert_eq!(BedCategory::PediatricPlus.label(), "Ped. Cuida+");
        assert_eq!(BedCategory::Stabilization.label(), "Estabilização");
    }

    #[test]
    fn test_category_serde_uses_wire_name() {
        let json = serde_json::to_string(&BedCategory::ClinicalPlus).unwrap();
        assert_eq!(json, "\"Leitos Clínicos Cuida+\"");
        let back: BedCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BedCategory::ClinicalPlus);
    }

    #[test]
    fn test_category_from_str_accepts_key_label_and_name() {
        assert_eq!("icu".parse::<BedCategory>(), Ok(BedCategory::Icu));
        assert_eq!("UTI".parse::<BedCategory>(), Ok(BedCategory::Icu));
        assert_eq!(
            "leitos pediátricos".parse::<BedCategory>(),
            Ok(BedCategory::Pediatric)
        );
        assert!("maternity".parse::<BedCategory>().is_err());
    }

    // ==================== BedSnapshot Tests ====================

    #[test]
    fn test_snapshot_default_is_all_zero() {
        let snapshot = BedSnapshot::new();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.total(), 0);
        assert_eq!(snapshot.iter().count(), BedCategory::COUNT);
    }

    #[test]
    fn test_snapshot_set_and_index() {
        let snapshot = BedSnapshot::new()
            .with(BedCategory::Clinical, 40)
            .with(BedCategory::Icu, 7);
        assert_eq!(snapshot[BedCategory::Clinical], 40);
        assert_eq!(snapshot.get(BedCategory::Icu), 7);
        assert_eq!(snapshot.get(BedCategory::Pediatric), 0);
        assert_eq!(snapshot.total(), 47);
    }

    #[test]
    fn test_snapshot_serializes_every_category() {
        let snapshot = BedSnapshot::new().with(BedCategory::Icu, 3);
        let value = serde_json::to_value(snapshot).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), BedCategory::COUNT);
        assert_eq!(obj["Leitos UTI"], 3);
        assert_eq!(obj["Estabilização"], 0);
    }

    #[test]
    fn test_snapshot_missing_categories_read_as_zero() {
        let snapshot: BedSnapshot = serde_json::from_str(r#"{"Leitos UTI": 9}"#).unwrap();
        assert_eq!(snapshot.get(BedCategory::Icu), 9);
        assert_eq!(snapshot.get(BedCategory::Clinical), 0);
    }

    #[test]
    fn test_snapshot_negative_values_clamp_to_zero() {
        let snapshot: BedSnapshot =
            serde_json::from_str(r#"{"Leitos UTI": -4, "Leitos Clínicos": 12.7}"#).unwrap();
        assert_eq!(snapshot.get(BedCategory::Icu), 0);
        assert_eq!(snapshot.get(BedCategory::Clinical), 12);
    }

    #[test]
    fn test_snapshot_rejects_unknown_category() {
        let result: Result<BedSnapshot, _> = serde_json::from_str(r#"{"Leitos Maternidade": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_snapshot_rejects_non_numeric_value() {
        let result: Result<BedSnapshot, _> = serde_json::from_str(r#"{"Leitos UTI": "nine"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_snapshot_rejects_non_map() {
        let result: Result<BedSnapshot, _> = serde_json::from_str("[1, 2, 3]");
        assert!(result.is_err());
    }

    // ==================== DateKey Tests ====================

    #[test]
    fn test_date_key_round_trips_through_display() {
        let key = day("2024-03-01");
        assert_eq!(key.to_string(), "2024-03-01");
        assert_eq!(key.year(), 2024);
        assert_eq!(key.month(), 3);
    }

    #[test]
    fn test_date_key_rejects_non_canonical_forms() {
        assert!(DateKey::parse("2024-3-1").is_err());
        assert!(DateKey::parse("01/03/2024").is_err());
        assert!(DateKey::parse("2024-02-30").is_err());
        assert!(DateKey::parse("").is_err());
    }

    #[test]
    fn test_date_key_orders_chronologically() {
        let mut keys = vec![day("2024-03-02"), day("2023-12-31"), day("2024-03-01")];
        keys.sort();
        assert_eq!(
            keys,
            vec![day("2023-12-31"), day("2024-03-01"), day("2024-03-02")]
        );
    }

    #[test]
    fn test_date_key_display_br() {
        assert_eq!(day("2024-03-01").display_br(), "01/03/2024");
    }

    #[test]
    fn test_historical_data_json_shape() {
        let mut data = HistoricalData::new();
        data.insert(day("2024-03-01"), BedSnapshot::new().with(BedCategory::Icu, 9));
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.starts_with("{\"2024-03-01\":{"));

        let back: HistoricalData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_historical_data_rejects_bad_date_key() {
        let result: Result<HistoricalData, _> =
            serde_json::from_str(r#"{"yesterday": {"Leitos UTI": 1}}"#);
        assert!(result.is_err());
    }
}
