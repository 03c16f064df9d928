use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::{
    capacity::{CapacityConfig, CategoryLimits, DEFAULT_CAPACITY},
    model::BedCategory,
    status::Thresholds,
};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub network: NetworkConfig,
    pub remote: RemoteConfig,
    pub share: ShareConfig,
    pub admin: AdminConfig,
    pub capacity: CapacitySection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RemoteConfig {
    /// Public JSON document with the store's shape.
    pub public_data_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShareConfig {
    pub base_url: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SHARE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdminConfig {
    /// Empty means deletes are never authorized.
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CapacitySection {
    pub default_capacity: u32,
    pub clinical: CategoryLimitsConfig,
    pub clinical_plus: CategoryLimitsConfig,
    pub icu: CategoryLimitsConfig,
    pub pediatric: CategoryLimitsConfig,
    pub pediatric_plus: CategoryLimitsConfig,
    pub stabilization: CategoryLimitsConfig,
}

impl Default for CapacitySection {
    fn default() -> Self {
        let defaults = CapacityConfig::default();
        let limits = |category| CategoryLimitsConfig::from(defaults.limits(category));
        Self {
            default_capacity: DEFAULT_CAPACITY,
            clinical: limits(BedCategory::Clinical),
            clinical_plus: limits(BedCategory::ClinicalPlus),
            icu: limits(BedCategory::Icu),
            pediatric: limits(BedCategory::Pediatric),
            pediatric_plus: limits(BedCategory::PediatricPlus),
            stabilization: limits(BedCategory::Stabilization),
        }
    }
}

impl CapacitySection {
    pub fn limits_for(&self, category: BedCategory) -> &CategoryLimitsConfig {
        match category {
            BedCategory::Clinical => &self.clinical,
            BedCategory::ClinicalPlus => &self.clinical_plus,
            BedCategory::Icu => &self.icu,
            BedCategory::Pediatric => &self.pediatric,
            BedCategory::PediatricPlus => &self.pediatric_plus,
            BedCategory::Stabilization => &self.stabilization,
        }
    }
}

/// Per-category table under `capacity.<key>`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CategoryLimitsConfig {
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub alert: Option<u32>,
    #[serde(default)]
    pub critical: Option<u32>,
    pub input_max: u32,
}

impl From<&CategoryLimits> for CategoryLimitsConfig {
    fn from(limits: &CategoryLimits) -> Self {
        Self {
            capacity: limits.capacity,
            alert: limits.thresholds.map(|t| t.alert),
            critical: limits.thresholds.map(|t| t.critical),
            input_max: limits.input_max,
        }
    }
}

const DEFAULT_SHARE_URL: &str = "https://leitos.example.org/";

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bed-occupancy")
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bed-occupancy");

        let mut builder = Config::builder()
            // 1. Load default values
            // Storage
            .set_default(
                "storage.data_dir",
                default_data_dir().to_string_lossy().into_owned(),
            )?
            // Network
            .set_default("network.request_timeout_secs", 30)?
            .set_default("network.connect_timeout_secs", 10)?
            // Remote
            .set_default("remote.public_data_url", None::<String>)?
            // Share
            .set_default("share.base_url", DEFAULT_SHARE_URL)?
            // Admin
            .set_default("admin.secret", "")?
            // Capacity
            .set_default("capacity.default_capacity", DEFAULT_CAPACITY)?;

        let defaults = CapacitySection::default();
        for category in BedCategory::ALL {
            let limits = defaults.limits_for(category);
            let prefix = format!("capacity.{}", category.key());
            builder = builder.set_default(format!("{prefix}.input_max"), limits.input_max)?;
            if let Some(capacity) = limits.capacity {
                builder = builder.set_default(format!("{prefix}.capacity"), capacity)?;
            }
            if let Some(alert) = limits.alert {
                builder = builder.set_default(format!("{prefix}.alert"), alert)?;
            }
            if let Some(critical) = limits.critical {
                builder = builder.set_default(format!("{prefix}.critical"), critical)?;
            }
        }

        let builder = builder
            // 2. Load from local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))
            // 3. Load from user config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))
            // 4. Load from Environment variables (BEDS__CAPACITY__ICU__CAPACITY=10)
            .add_source(Environment::with_prefix("BEDS").separator("__"));

        let s = builder.build().context("Failed to build configuration")?;
        s.try_deserialize().context("Invalid configuration")
    }

    /// Capacity table the derived views run against.
    pub fn capacity_config(&self) -> CapacityConfig {
        BedCategory::ALL.into_iter().fold(
            CapacityConfig::new(self.capacity.default_capacity),
            |config, category| {
                let section = self.capacity.limits_for(category);
                let thresholds = match (section.alert, section.critical) {
                    (Some(alert), Some(critical)) => {
                        if alert > critical {
                            tracing::warn!(
                                "Alert threshold {} above critical {} for {}",
                                alert,
                                critical,
                                category.key()
                            );
                        }
                        Some(Thresholds::new(alert, critical))
                    }
                    (None, None) => None,
                    _ => {
                        tracing::warn!(
                            "Ignoring incomplete thresholds for {}: both alert and critical are needed",
                            category.key()
                        );
                        None
                    }
                };
                config.with_limits(
                    category,
                    CategoryLimits::new(section.capacity, thresholds, section.input_max),
                )
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Default Value Tests ====================

    #[test]
    fn test_network_config_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_share_config_defaults() {
        let config = ShareConfig::default();
        assert_eq!(config.base_url, "https://leitos.example.org/");
    }

    #[test]
    fn test_admin_config_defaults_to_unconfigured() {
        assert!(AdminConfig::default().secret.is_empty());
    }

    #[test]
    fn test_storage_config_default_dir_name() {
        let config = StorageConfig::default();
        assert!(config.data_dir.ends_with("bed-occupancy"));
    }

    #[test]
    fn test_capacity_section_defaults_match_capacity_config() {
        let config = AppConfig::default();
        assert_eq!(config.capacity_config(), CapacityConfig::default());
    }

    #[test]
    fn test_capacity_section_icu_defaults() {
        let section = CapacitySection::default();
        assert_eq!(
            section.icu,
            CategoryLimitsConfig {
                capacity: Some(8),
                alert: Some(7),
                critical: Some(8),
                input_max: 20,
            }
        );
        assert_eq!(section.stabilization.capacity, None);
    }

    // ==================== capacity_config() Tests ====================

    #[test]
    fn test_capacity_config_incomplete_thresholds_are_dropped() {
        let mut config = AppConfig::default();
        config.capacity.icu.critical = None;

        let capacity = config.capacity_config();
        assert_eq!(capacity.thresholds(BedCategory::Icu), None);
        assert_eq!(capacity.capacity(BedCategory::Icu), Some(8));
    }

    #[test]
    fn test_capacity_config_custom_default_capacity() {
        let mut config = AppConfig::default();
        config.capacity.default_capacity = 30;
        assert_eq!(
            config
                .capacity_config()
                .display_capacity(BedCategory::Stabilization),
            30
        );
    }

    // ==================== Config Loading Tests ====================

    #[test]
    fn test_config_load_with_defaults() {
        // Should succeed without any config file or environment
        let result = AppConfig::load();
        assert!(result.is_ok());
    }

    #[test]
    fn test_loaded_config_has_expected_structure() {
        let config = AppConfig::load().expect("Config should load");

        assert!(!config.share.base_url.is_empty());
        assert!(config.network.request_timeout_secs > 0);
        assert!(config.capacity.default_capacity > 0);
        assert!(config.capacity.clinical.input_max > 0);
    }

    // ==================== Environment Variable Override Tests ====================

    /// Helper to safely set and remove environment variables in tests.
    /// SAFETY: These tests run sequentially and clean up after themselves.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        // SAFETY: Test environment, single-threaded access
        unsafe {
            std::env::set_var(key, value);
        }
        let result = f();
        unsafe {
            std::env::remove_var(key);
        }
        result
    }

    /// Helper to safely set multiple environment variables in tests.
    fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        // SAFETY: Test environment, single-threaded access
        for (key, value) in vars {
            unsafe {
                std::env::set_var(key, value);
            }
        }
        let result = f();
        for (key, _) in vars {
            unsafe {
                std::env::remove_var(key);
            }
        }
        result
    }

    #[test]
    fn test_env_var_overrides_share_base_url() {
        let config = with_env_var("BEDS__SHARE__BASE_URL", "https://beds.test/", || {
            AppConfig::load().expect("Config should load")
        });

        assert_eq!(config.share.base_url, "https://beds.test/");
    }

    #[test]
    fn test_env_var_overrides_network_timeout() {
        let config = with_env_var("BEDS__NETWORK__REQUEST_TIMEOUT_SECS", "120", || {
            AppConfig::load().expect("Config should load")
        });

        assert_eq!(
            config.network.request_timeout_secs, 120,
            "Environment variable should override network.request_timeout_secs"
        );
    }

    #[test]
    fn test_env_var_overrides_category_capacity() {
        let vars = [
            ("BEDS__CAPACITY__PEDIATRIC__CAPACITY", "12"),
            ("BEDS__CAPACITY__PEDIATRIC__ALERT", "10"),
            ("BEDS__CAPACITY__PEDIATRIC__CRITICAL", "12"),
        ];

        let config = with_env_vars(&vars, || AppConfig::load().expect("Config should load"));
        let capacity = config.capacity_config();

        assert_eq!(capacity.capacity(BedCategory::Pediatric), Some(12));
        assert_eq!(
            capacity.thresholds(BedCategory::Pediatric),
            Some(Thresholds::new(10, 12))
        );
    }

    #[test]
    fn test_env_var_sets_remote_url() {
        let config = with_env_var(
            "BEDS__REMOTE__PUBLIC_DATA_URL",
            "https://beds.test/data.json",
            || AppConfig::load().expect("Config should load"),
        );

        assert_eq!(
            config.remote.public_data_url.as_deref(),
            Some("https://beds.test/data.json")
        );
    }
}
