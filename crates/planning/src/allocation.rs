//! Hierarchical budget allocation: countries -> platform budget % -> campaign
//! type budget %.
//!
//! Setters never enforce the 100% sums so that a user can pass through
//! transient states (37% then 41%) while typing. `validate()` is the only
//! place the sum-to-100 and positivity invariants are checked.

use std::collections::{BTreeMap, BTreeSet};

use campaign_core::error::{PlannerError, PlannerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Allowed distance from 100 when comparing allocation sums.
pub const PERCENT_TOLERANCE: f64 = 0.01;

// ─── Types ──────────────────────────────────────────────────────────────────

/// A piece of planned creative. Only counted by the estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub content_type: String,
    #[serde(default)]
    pub note: String,
}

/// Budget share of one platform and its split across campaign types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformAllocation {
    pub platform_id: String,
    pub budget_percent: f64,
    /// campaign type id -> percent of this platform's budget.
    #[serde(default)]
    pub campaign_types: BTreeMap<String, f64>,
}

impl PlatformAllocation {
    pub fn new(platform_id: impl Into<String>) -> Self {
        Self {
            platform_id: normalize_platform(&platform_id.into()),
            budget_percent: 0.0,
            campaign_types: BTreeMap::new(),
        }
    }

    pub fn campaign_type_total_percent(&self) -> f64 {
        self.campaign_types.values().sum()
    }
}

/// Root aggregate for one planning session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSetup {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Uppercase country codes in selection order, no duplicates.
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default)]
    pub duration_days: u32,
    #[serde(default)]
    pub platforms: Vec<PlatformAllocation>,
    #[serde(default)]
    pub content: Vec<ContentItem>,
}

impl Default for CampaignSetup {
    fn default() -> Self {
        Self::new()
    }
}

/// How a country's allocation tree came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupOrigin {
    Custom,
    CopiedFromPrevious,
}

/// Finished setup for one country in a multi-country plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryCampaign {
    pub country: String,
    pub origin: SetupOrigin,
    pub setup: CampaignSetup,
    pub completed_at: DateTime<Utc>,
}

/// A reason a setup (or a wizard step) is not complete yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "issue")]
pub enum ValidationIssue {
    NoCountries,
    NonPositiveBudget { total_budget: f64 },
    NonPositiveDuration,
    NoPlatforms,
    PlatformTotalNot100 { total: f64 },
    CampaignTypeTotalNot100 { platform_id: String, total: f64 },
    PercentOutOfRange {
        platform_id: String,
        campaign_type: Option<String>,
        value: f64,
    },
    NoContent,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCountries => write!(f, "Select at least one country"),
            Self::NonPositiveBudget { total_budget } => {
                write!(f, "Total budget must be positive (got {total_budget})")
            }
            Self::NonPositiveDuration => write!(f, "Duration must be at least one day"),
            Self::NoPlatforms => write!(f, "Select at least one platform"),
            Self::PlatformTotalNot100 { total } => {
                write!(f, "Platform budgets add up to {total:.2}%, expected 100%")
            }
            Self::CampaignTypeTotalNot100 { platform_id, total } => write!(
                f,
                "Campaign types for {platform_id} add up to {total:.2}%, expected 100%"
            ),
            Self::PercentOutOfRange {
                platform_id,
                campaign_type,
                value,
            } => match campaign_type {
                Some(t) => write!(f, "{platform_id}/{t}: {value}% is outside 0-100"),
                None => write!(f, "{platform_id}: {value}% is outside 0-100"),
            },
            Self::NoContent => write!(f, "Add at least one content item"),
        }
    }
}

/// Absolute spend for one platform and its campaign types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformBudget {
    pub platform_id: String,
    pub percent: f64,
    pub amount: f64,
    /// (campaign type id, amount) in id order.
    pub campaign_types: Vec<(String, f64)>,
}

// ─── Mutations ──────────────────────────────────────────────────────────────

impl CampaignSetup {
    /// Empty draft, as created at wizard start.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            countries: Vec::new(),
            total_budget: 0.0,
            duration_days: 0,
            platforms: Vec::new(),
            content: Vec::new(),
        }
    }

    /// Adds the country if absent, removes it if present. Returns whether the
    /// country is selected afterwards.
    pub fn toggle_country(&mut self, code: &str) -> bool {
        let code = normalize_country(code);
        if let Some(pos) = self.countries.iter().position(|c| *c == code) {
            self.countries.remove(pos);
            false
        } else {
            self.countries.push(code);
            true
        }
    }

    /// Replaces the country selection, dropping duplicates but keeping order.
    pub fn set_countries<I, S>(&mut self, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = BTreeSet::new();
        self.countries = codes
            .into_iter()
            .map(|c| normalize_country(c.as_ref()))
            .filter(|c| seen.insert(c.clone()))
            .collect();
    }

    /// Stores any finite value; positivity is a completion concern.
    pub fn set_total_budget(&mut self, amount: f64) -> PlannerResult<()> {
        self.total_budget = finite(amount, "total budget")?;
        Ok(())
    }

    pub fn set_duration_days(&mut self, days: u32) {
        self.duration_days = days;
    }

    /// Adds a zero-budget platform if absent, removes it (and its campaign
    /// types) if present. Returns whether the platform is selected afterwards.
    pub fn toggle_platform(&mut self, platform_id: &str) -> bool {
        let id = normalize_platform(platform_id);
        if let Some(pos) = self.platforms.iter().position(|p| p.platform_id == id) {
            self.platforms.remove(pos);
            false
        } else {
            self.platforms.push(PlatformAllocation::new(id));
            true
        }
    }

    /// Stores the percent verbatim, even outside 0-100.
    pub fn set_platform_budget_percent(
        &mut self,
        platform_id: &str,
        percent: f64,
    ) -> PlannerResult<()> {
        let percent = finite(percent, "platform budget percent")?;
        self.platform_mut(platform_id)?.budget_percent = percent;
        Ok(())
    }

    /// Adds a zero-percent campaign type under the platform, or removes it.
    /// Returns whether the type is selected afterwards.
    pub fn toggle_campaign_type(
        &mut self,
        platform_id: &str,
        type_id: &str,
    ) -> PlannerResult<bool> {
        let platform = self.platform_mut(platform_id)?;
        let type_id = type_id.trim().to_string();
        if platform.campaign_types.remove(&type_id).is_some() {
            Ok(false)
        } else {
            platform.campaign_types.insert(type_id, 0.0);
            Ok(true)
        }
    }

    pub fn set_campaign_type_percent(
        &mut self,
        platform_id: &str,
        type_id: &str,
        percent: f64,
    ) -> PlannerResult<()> {
        let percent = finite(percent, "campaign type percent")?;
        let platform = self.platform_mut(platform_id)?;
        match platform.campaign_types.get_mut(type_id.trim()) {
            Some(slot) => {
                *slot = percent;
                Ok(())
            }
            None => {
                warn!(platform_id, type_id, "Campaign type not selected");
                Err(PlannerError::InvalidMutation(format!(
                    "campaign type {type_id} is not selected under {platform_id}"
                )))
            }
        }
    }

    pub fn add_content(&mut self, content_type: impl Into<String>, note: impl Into<String>) {
        self.content.push(ContentItem {
            content_type: content_type.into(),
            note: note.into(),
        });
    }

    pub fn remove_content(&mut self, index: usize) -> PlannerResult<ContentItem> {
        if index >= self.content.len() {
            return Err(PlannerError::InvalidMutation(format!(
                "no content item at index {index}"
            )));
        }
        Ok(self.content.remove(index))
    }

    fn platform_mut(&mut self, platform_id: &str) -> PlannerResult<&mut PlatformAllocation> {
        let id = normalize_platform(platform_id);
        self.platforms
            .iter_mut()
            .find(|p| p.platform_id == id)
            .ok_or_else(|| {
                warn!(platform_id = %id, "Mutation on unselected platform");
                PlannerError::UnknownPlatform(id)
            })
    }
}

// ─── Queries ────────────────────────────────────────────────────────────────

impl CampaignSetup {
    pub fn platform(&self, platform_id: &str) -> Option<&PlatformAllocation> {
        let id = normalize_platform(platform_id);
        self.platforms.iter().find(|p| p.platform_id == id)
    }

    /// Sum of all platform percentages.
    pub fn total_platform_percent(&self) -> f64 {
        self.platforms.iter().map(|p| p.budget_percent).sum()
    }

    /// Sum of campaign type percentages within one platform (0 if the platform
    /// is not selected).
    pub fn campaign_type_total_percent(&self, platform_id: &str) -> f64 {
        self.platform(platform_id)
            .map(PlatformAllocation::campaign_type_total_percent)
            .unwrap_or(0.0)
    }

    /// Number of distinct content types planned.
    pub fn content_type_count(&self) -> usize {
        self.content
            .iter()
            .map(|c| c.content_type.trim().to_ascii_lowercase())
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn daily_budget(&self) -> f64 {
        if self.duration_days == 0 {
            0.0
        } else {
            self.total_budget / f64::from(self.duration_days)
        }
    }

    /// Absolute amounts for every platform and campaign type.
    pub fn budget_breakdown(&self) -> Vec<PlatformBudget> {
        self.platforms
            .iter()
            .map(|p| {
                let amount = self.total_budget * p.budget_percent / 100.0;
                PlatformBudget {
                    platform_id: p.platform_id.clone(),
                    percent: p.budget_percent,
                    amount,
                    campaign_types: p
                        .campaign_types
                        .iter()
                        .map(|(t, pct)| (t.clone(), amount * pct / 100.0))
                        .collect(),
                }
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.validate().is_empty()
    }

    /// Every unmet completion requirement, in a fixed order.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = self.country_issues();
        issues.extend(self.budget_issues());
        issues.extend(self.duration_issues());
        issues.extend(self.platform_selection_issues());
        issues.extend(self.platform_budget_issues());
        issues.extend(self.campaign_type_budget_issues());
        issues
    }

    pub fn country_issues(&self) -> Vec<ValidationIssue> {
        if self.countries.is_empty() {
            vec![ValidationIssue::NoCountries]
        } else {
            Vec::new()
        }
    }

    pub fn budget_issues(&self) -> Vec<ValidationIssue> {
        if self.total_budget > 0.0 {
            Vec::new()
        } else {
            vec![ValidationIssue::NonPositiveBudget {
                total_budget: self.total_budget,
            }]
        }
    }

    pub fn duration_issues(&self) -> Vec<ValidationIssue> {
        if self.duration_days > 0 {
            Vec::new()
        } else {
            vec![ValidationIssue::NonPositiveDuration]
        }
    }

    pub fn platform_selection_issues(&self) -> Vec<ValidationIssue> {
        if self.platforms.is_empty() {
            vec![ValidationIssue::NoPlatforms]
        } else {
            Vec::new()
        }
    }

    pub fn platform_budget_issues(&self) -> Vec<ValidationIssue> {
        let mut issues: Vec<ValidationIssue> = self
            .platforms
            .iter()
            .filter(|p| !in_percent_range(p.budget_percent))
            .map(|p| ValidationIssue::PercentOutOfRange {
                platform_id: p.platform_id.clone(),
                campaign_type: None,
                value: p.budget_percent,
            })
            .collect();
        let total = self.total_platform_percent();
        if !self.platforms.is_empty() && !is_hundred(total) {
            issues.push(ValidationIssue::PlatformTotalNot100 { total });
        }
        issues
    }

    /// Only platforms with at least one campaign type are checked.
    pub fn campaign_type_budget_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for platform in self.platforms.iter().filter(|p| !p.campaign_types.is_empty()) {
            for (type_id, pct) in &platform.campaign_types {
                if !in_percent_range(*pct) {
                    issues.push(ValidationIssue::PercentOutOfRange {
                        platform_id: platform.platform_id.clone(),
                        campaign_type: Some(type_id.clone()),
                        value: *pct,
                    });
                }
            }
            let total = platform.campaign_type_total_percent();
            if !is_hundred(total) {
                issues.push(ValidationIssue::CampaignTypeTotalNot100 {
                    platform_id: platform.platform_id.clone(),
                    total,
                });
            }
        }
        issues
    }

    pub fn content_issues(&self) -> Vec<ValidationIssue> {
        if self.content.is_empty() {
            vec![ValidationIssue::NoContent]
        } else {
            Vec::new()
        }
    }
}

// ─── Cloning across countries ───────────────────────────────────────────────

impl CampaignSetup {
    /// Deep copy of the platform/campaign-type tree for another country.
    ///
    /// Percentages are copied as-is, not re-normalized. Budget and duration
    /// carry over; content stays with the source country.
    pub fn clone_for_country(&self, country: &str) -> CampaignSetup {
        CampaignSetup {
            id: Uuid::new_v4(),
            countries: vec![normalize_country(country)],
            total_budget: self.total_budget,
            duration_days: self.duration_days,
            platforms: self.platforms.clone(),
            content: Vec::new(),
        }
    }

    /// This setup narrowed to a single country, content included.
    pub fn for_country(&self, country: &str) -> CampaignSetup {
        CampaignSetup {
            countries: vec![normalize_country(country)],
            ..self.clone()
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

pub fn normalize_platform(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

pub fn normalize_country(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Whether a percentage sum counts as 100.
pub fn is_hundred(total: f64) -> bool {
    (total - 100.0).abs() <= PERCENT_TOLERANCE
}

fn in_percent_range(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

fn finite(value: f64, what: &str) -> PlannerResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PlannerError::InvalidMutation(format!(
            "{what} must be a finite number"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_setup() -> CampaignSetup {
        let mut setup = CampaignSetup::new();
        setup.toggle_country("ae");
        setup.set_total_budget(10_000.0).unwrap();
        setup.set_duration_days(30);
        setup.toggle_platform("Meta");
        setup.toggle_platform("google_search");
        setup.set_platform_budget_percent("meta", 60.0).unwrap();
        setup.set_platform_budget_percent("google_search", 40.0).unwrap();
        setup.toggle_campaign_type("meta", "awareness").unwrap();
        setup.toggle_campaign_type("meta", "traffic").unwrap();
        setup.set_campaign_type_percent("meta", "awareness", 70.0).unwrap();
        setup.set_campaign_type_percent("meta", "traffic", 30.0).unwrap();
        setup
    }

    #[test]
    fn test_toggle_platform_adds_then_removes() {
        let mut setup = CampaignSetup::new();
        assert!(setup.toggle_platform("tiktok"));
        setup.toggle_campaign_type("tiktok", "reach").unwrap();
        assert_eq!(setup.platforms.len(), 1);
        assert!((setup.platforms[0].budget_percent).abs() < f64::EPSILON);

        assert!(!setup.toggle_platform("TikTok"));
        assert!(setup.platforms.is_empty());

        // Re-adding starts from an empty campaign type map.
        setup.toggle_platform("tiktok");
        assert!(setup.platforms[0].campaign_types.is_empty());
    }

    #[test]
    fn test_setters_accept_transient_values() {
        let mut setup = CampaignSetup::new();
        setup.toggle_platform("meta");
        setup.set_platform_budget_percent("meta", 37.0).unwrap();
        setup.set_platform_budget_percent("meta", 141.0).unwrap();
        assert!((setup.total_platform_percent() - 141.0).abs() < f64::EPSILON);

        setup.set_platform_budget_percent("meta", -5.0).unwrap();
        assert!((setup.total_platform_percent() + 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let mut setup = CampaignSetup::new();
        setup.toggle_platform("meta");
        let err = setup.set_platform_budget_percent("meta", f64::NAN).unwrap_err();
        assert!(err.is_invalid_mutation());
        assert!(setup.set_total_budget(f64::INFINITY).is_err());
    }

    #[test]
    fn test_unknown_platform_errors() {
        let mut setup = CampaignSetup::new();
        let err = setup.toggle_campaign_type("youtube", "views").unwrap_err();
        assert!(matches!(err, PlannerError::UnknownPlatform(ref id) if id == "youtube"));
        assert!(setup.set_platform_budget_percent("youtube", 10.0).is_err());
    }

    #[test]
    fn test_campaign_type_must_be_selected_before_percent() {
        let mut setup = CampaignSetup::new();
        setup.toggle_platform("meta");
        let err = setup
            .set_campaign_type_percent("meta", "leads", 50.0)
            .unwrap_err();
        assert!(matches!(err, PlannerError::InvalidMutation(_)));
    }

    #[test]
    fn test_complete_setup_satisfies_sum_invariants() {
        let setup = complete_setup();
        assert!(setup.is_complete(), "issues: {:?}", setup.validate());
        assert!(is_hundred(setup.total_platform_percent()));
        for p in setup.platforms.iter().filter(|p| !p.campaign_types.is_empty()) {
            assert!(is_hundred(setup.campaign_type_total_percent(&p.platform_id)));
        }
    }

    #[test]
    fn test_platform_without_campaign_types_is_not_checked() {
        let setup = complete_setup();
        assert!(setup.platform("google_search").unwrap().campaign_types.is_empty());
        assert!(setup.campaign_type_budget_issues().is_empty());
    }

    #[test]
    fn test_validate_reports_each_gap() {
        let mut setup = CampaignSetup::new();
        let issues = setup.validate();
        assert_eq!(
            issues,
            vec![
                ValidationIssue::NoCountries,
                ValidationIssue::NonPositiveBudget { total_budget: 0.0 },
                ValidationIssue::NonPositiveDuration,
                ValidationIssue::NoPlatforms,
            ]
        );

        setup.toggle_country("SA");
        setup.set_total_budget(500.0).unwrap();
        setup.set_duration_days(10);
        setup.toggle_platform("meta");
        setup.set_platform_budget_percent("meta", 90.0).unwrap();
        setup.toggle_campaign_type("meta", "awareness").unwrap();
        setup.set_campaign_type_percent("meta", "awareness", 120.0).unwrap();

        let issues = setup.validate();
        assert!(issues.contains(&ValidationIssue::PlatformTotalNot100 { total: 90.0 }));
        assert!(issues.iter().any(|i| matches!(
            i,
            ValidationIssue::PercentOutOfRange { campaign_type: Some(t), .. } if t == "awareness"
        )));
        assert!(issues.iter().any(|i| matches!(
            i,
            ValidationIssue::CampaignTypeTotalNot100 { platform_id, .. } if platform_id == "meta"
        )));
        assert!(!setup.is_complete());
    }

    #[test]
    fn test_out_of_range_entries_block_completion_even_when_summing_to_100() {
        let mut setup = complete_setup();
        setup.set_platform_budget_percent("meta", 120.0).unwrap();
        setup.set_platform_budget_percent("google_search", -20.0).unwrap();
        assert!(is_hundred(setup.total_platform_percent()));
        assert!(!setup.is_complete());
        assert_eq!(
            setup.validate(),
            vec![
                ValidationIssue::PercentOutOfRange {
                    platform_id: "meta".to_string(),
                    campaign_type: None,
                    value: 120.0,
                },
                ValidationIssue::PercentOutOfRange {
                    platform_id: "google_search".to_string(),
                    campaign_type: None,
                    value: -20.0,
                },
            ]
        );
    }

    #[test]
    fn test_decimal_shares_within_tolerance() {
        let mut setup = complete_setup();
        setup.toggle_platform("tiktok");
        setup.set_platform_budget_percent("meta", 33.33).unwrap();
        setup.set_platform_budget_percent("google_search", 33.33).unwrap();
        setup.set_platform_budget_percent("tiktok", 33.34).unwrap();
        assert!(setup.platform_budget_issues().is_empty());
    }

    #[test]
    fn test_clone_for_country_is_deep_and_independent() {
        let source = complete_setup();
        let mut clone = source.clone_for_country("sa");

        assert_eq!(clone.platforms, source.platforms);
        assert_eq!(clone.countries, vec!["SA".to_string()]);
        assert_ne!(clone.id, source.id);

        clone.set_platform_budget_percent("meta", 10.0).unwrap();
        clone.set_campaign_type_percent("meta", "traffic", 0.0).unwrap();
        clone.toggle_platform("google_search");

        assert!((source.platform("meta").unwrap().budget_percent - 60.0).abs() < f64::EPSILON);
        assert!((source.campaign_type_total_percent("meta") - 100.0).abs() < f64::EPSILON);
        assert_eq!(source.platforms.len(), 2);
    }

    #[test]
    fn test_set_countries_dedupes_preserving_order() {
        let mut setup = CampaignSetup::new();
        setup.set_countries(["ae", "SA", "AE", " kw "]);
        assert_eq!(setup.countries, vec!["AE", "SA", "KW"]);
        assert!(!setup.toggle_country("sa"));
        assert_eq!(setup.countries, vec!["AE", "KW"]);
    }

    #[test]
    fn test_budget_breakdown_and_daily_budget() {
        let setup = complete_setup();
        let breakdown = setup.budget_breakdown();
        assert_eq!(breakdown.len(), 2);
        assert!((breakdown[0].amount - 6_000.0).abs() < 1e-9);
        assert_eq!(breakdown[0].campaign_types[0].0, "awareness");
        assert!((breakdown[0].campaign_types[0].1 - 4_200.0).abs() < 1e-9);
        assert!((setup.daily_budget() - 10_000.0 / 30.0).abs() < 1e-9);

        let empty = CampaignSetup::new();
        assert!((empty.daily_budget()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_content_helpers() {
        let mut setup = CampaignSetup::new();
        setup.add_content("video", "15s teaser");
        setup.add_content("Video", "30s cut");
        setup.add_content("image", "");
        assert_eq!(setup.content_type_count(), 2);

        let removed = setup.remove_content(0).unwrap();
        assert_eq!(removed.note, "15s teaser");
        assert!(setup.remove_content(9).is_err());
    }
}
