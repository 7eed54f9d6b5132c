use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{PlannerError, PlannerResult};
use crate::types::{PlatformCategory, PlatformOrientation};

/// Root planner configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `CAMPAIGN_PLANNER__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub estimation: EstimationConfig,
    #[serde(default)]
    pub insights: InsightConfig,
    #[serde(default)]
    pub benchmarks: BenchmarkConfig,
}

// ─── Estimation Config ──────────────────────────────────────────────────────

/// Tuning constants for the estimation engine. Historical data refreshes may
/// retune these without a code change.
#[derive(Debug, Clone, Deserialize)]
pub struct EstimationConfig {
    /// Frequency assumed for platforms missing from the catalogue.
    #[serde(default = "default_frequency")]
    pub default_frequency: f64,
    #[serde(default)]
    pub category_frequency: CategoryFrequency,
    /// Platform id (lowercase) -> catalogue entry.
    #[serde(default = "default_platforms")]
    pub platforms: HashMap<String, PlatformProfile>,
    /// Distinct exact benchmark rows needed before confidence can be `high`.
    #[serde(default = "default_min_exact_data_points")]
    pub min_exact_data_points: usize,
}

/// Average impressions per reached user, by platform category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryFrequency {
    #[serde(default = "default_social_frequency")]
    pub social: f64,
    #[serde(default = "default_video_frequency")]
    pub video: f64,
    #[serde(default = "default_search_frequency")]
    pub search: f64,
    #[serde(default = "default_display_frequency")]
    pub display: f64,
    #[serde(default = "default_messaging_frequency")]
    pub messaging: f64,
    #[serde(default = "default_professional_frequency")]
    pub professional: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PlatformProfile {
    pub category: PlatformCategory,
    pub orientation: PlatformOrientation,
}

fn default_frequency() -> f64 {
    2.0
}

fn default_min_exact_data_points() -> usize {
    3
}

fn default_social_frequency() -> f64 {
    2.5
}

fn default_video_frequency() -> f64 {
    2.0
}

fn default_search_frequency() -> f64 {
    1.5
}

fn default_display_frequency() -> f64 {
    3.0
}

fn default_messaging_frequency() -> f64 {
    1.5
}

fn default_professional_frequency() -> f64 {
    2.0
}

fn default_platforms() -> HashMap<String, PlatformProfile> {
    use PlatformCategory::*;
    use PlatformOrientation::*;

    [
        ("meta", Social, Balanced),
        ("facebook", Social, Balanced),
        ("instagram", Social, Reach),
        ("tiktok", Video, Reach),
        ("snapchat", Social, Reach),
        ("youtube", Video, Reach),
        ("google_search", Search, Performance),
        ("google_display", Display, Reach),
        ("x", Social, Reach),
        ("linkedin", Professional, Performance),
        ("whatsapp", Messaging, Performance),
    ]
    .into_iter()
    .map(|(id, category, orientation)| {
        (
            id.to_string(),
            PlatformProfile {
                category,
                orientation,
            },
        )
    })
    .collect()
}

impl Default for CategoryFrequency {
    fn default() -> Self {
        Self {
            social: default_social_frequency(),
            video: default_video_frequency(),
            search: default_search_frequency(),
            display: default_display_frequency(),
            messaging: default_messaging_frequency(),
            professional: default_professional_frequency(),
        }
    }
}

impl CategoryFrequency {
    pub fn for_category(&self, category: PlatformCategory) -> f64 {
        match category {
            PlatformCategory::Social => self.social,
            PlatformCategory::Video => self.video,
            PlatformCategory::Search => self.search,
            PlatformCategory::Display => self.display,
            PlatformCategory::Messaging => self.messaging,
            PlatformCategory::Professional => self.professional,
        }
    }

    fn all(&self) -> [f64; 6] {
        [
            self.social,
            self.video,
            self.search,
            self.display,
            self.messaging,
            self.professional,
        ]
    }
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            default_frequency: default_frequency(),
            category_frequency: CategoryFrequency::default(),
            platforms: default_platforms(),
            min_exact_data_points: default_min_exact_data_points(),
        }
    }
}

impl EstimationConfig {
    /// Catalogue entry for a platform, if known.
    pub fn profile(&self, platform_id: &str) -> Option<PlatformProfile> {
        self.platforms
            .get(&platform_id.to_ascii_lowercase())
            .copied()
    }

    /// Assumed average frequency for a platform.
    pub fn frequency_for(&self, platform_id: &str) -> f64 {
        self.profile(platform_id)
            .map(|p| self.category_frequency.for_category(p.category))
            .unwrap_or(self.default_frequency)
    }
}

// ─── Insight Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct InsightConfig {
    #[serde(default = "default_balanced_mix_min_budget")]
    pub balanced_mix_min_budget: f64,
    /// Country codes (uppercase) with historically cheap inventory.
    #[serde(default = "default_low_cost_countries")]
    pub low_cost_countries: Vec<String>,
    #[serde(default = "default_min_content_types")]
    pub min_content_types: usize,
    #[serde(default = "default_min_campaign_days")]
    pub min_campaign_days: u32,
    #[serde(default = "default_concentration_percent")]
    pub concentration_percent: f64,
    #[serde(default = "default_strong_ctr_percent")]
    pub strong_ctr_percent: f64,
    #[serde(default = "default_min_daily_budget_per_platform")]
    pub min_daily_budget_per_platform: f64,
}

fn default_balanced_mix_min_budget() -> f64 {
    5_000.0
}

fn default_low_cost_countries() -> Vec<String> {
    ["EG", "PK", "IN", "JO", "MA", "NG", "ID", "PH"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_min_content_types() -> usize {
    3
}

fn default_min_campaign_days() -> u32 {
    7
}

fn default_concentration_percent() -> f64 {
    80.0
}

fn default_strong_ctr_percent() -> f64 {
    1.5
}

fn default_min_daily_budget_per_platform() -> f64 {
    20.0
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            balanced_mix_min_budget: default_balanced_mix_min_budget(),
            low_cost_countries: default_low_cost_countries(),
            min_content_types: default_min_content_types(),
            min_campaign_days: default_min_campaign_days(),
            concentration_percent: default_concentration_percent(),
            strong_ctr_percent: default_strong_ctr_percent(),
            min_daily_budget_per_platform: default_min_daily_budget_per_platform(),
        }
    }
}

impl InsightConfig {
    pub fn is_low_cost_country(&self, code: &str) -> bool {
        self.low_cost_countries
            .iter()
            .any(|c| c.eq_ignore_ascii_case(code))
    }
}

// ─── Benchmark Config ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BenchmarkConfig {
    /// JSON document of benchmark rows.
    #[serde(default)]
    pub path: Option<String>,
}

impl PlannerConfig {
    /// Load configuration from an optional TOML file and the environment.
    pub fn load(path: Option<&str>) -> PlannerResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("CAMPAIGN_PLANNER")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("insights.low_cost_countries"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text. Environment variables are ignored.
    pub fn from_toml_str(text: &str) -> PlannerResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject tuning values the engine cannot divide by.
    pub fn validate(&self) -> PlannerResult<()> {
        let est = &self.estimation;
        let frequencies = est.category_frequency.all();
        if !(est.default_frequency > 0.0) || frequencies.iter().any(|f| !(*f > 0.0)) {
            return Err(PlannerError::Config(
                "frequencies must be positive".to_string(),
            ));
        }
        tracing::debug!(
            platforms = est.platforms.len(),
            min_exact_data_points = est.min_exact_data_points,
            "Planner configuration validated"
        );
        Ok(())
    }
}
