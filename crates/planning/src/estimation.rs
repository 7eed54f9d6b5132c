//! Performance estimation: turns a (possibly partial) campaign setup and a
//! benchmark table into predicted volumes, cost metrics and a confidence
//! rating.
//!
//! Pure and deterministic. The live preview calls this on every edit, so an
//! incomplete setup yields a best-effort (possibly all-zero) result with
//! `Confidence::Low` rather than an error.

use std::collections::BTreeSet;

use campaign_core::config::{EstimationConfig, InsightConfig, PlannerConfig};
use campaign_core::error::PlannerResult;
use campaign_core::types::Confidence;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::allocation::{CampaignSetup, CountryCampaign, PlatformAllocation};
use crate::benchmark::{BenchmarkRates, BenchmarkSource, BenchmarkTable, LookupTier};
use crate::insights;

/// Campaign types whose spend is bought on a cost-per-install basis.
const APP_INSTALL_TYPES: &[&str] = &["app_install", "app_installs", "installs"];

// ─── Result types ───────────────────────────────────────────────────────────

/// Which observed rate produced the click estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickPath {
    /// Clickable spend over blended CPC; used when any contributing row
    /// observed a CPC.
    Cpc,
    /// `impressions × blended CTR`.
    Ctr,
    /// Nothing to estimate.
    None,
}

/// Blended view of one platform across the selected countries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEstimate {
    pub platform_id: String,
    pub budget_percent: f64,
    pub allocated_budget: f64,
    pub cpm: f64,
    pub cpc: f64,
    pub ctr: f64,
    pub conversion_rate: f64,
    pub frequency: f64,
    /// Weakest lookup tier among this platform's countries.
    pub tier: LookupTier,
    pub estimated_impressions: u64,
    pub estimated_clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    pub estimated_reach: u64,
    pub estimated_impressions: u64,
    pub estimated_clicks: u64,
    pub estimated_conversions: u64,
    pub estimated_installs: u64,
    pub cost_per_click: f64,
    pub cost_per_conversion: f64,
    pub average_cpm: f64,
    pub average_cpc: f64,
    /// Effective CTR: `clicks / impressions × 100`.
    pub average_ctr: f64,
    pub average_conversion_rate: f64,
    pub daily_budget: f64,
    pub click_path: ClickPath,
    pub confidence: Confidence,
    /// Distinct exact-match benchmark rows used.
    pub data_points: usize,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub platforms: Vec<PlatformEstimate>,
}

impl EstimationResult {
    /// All-zero result with `Confidence::Low`.
    pub fn empty(daily_budget: f64) -> Self {
        Self {
            estimated_reach: 0,
            estimated_impressions: 0,
            estimated_clicks: 0,
            estimated_conversions: 0,
            estimated_installs: 0,
            cost_per_click: 0.0,
            cost_per_conversion: 0.0,
            average_cpm: 0.0,
            average_cpc: 0.0,
            average_ctr: 0.0,
            average_conversion_rate: 0.0,
            daily_budget,
            click_path: ClickPath::None,
            confidence: Confidence::Low,
            data_points: 0,
            insights: Vec::new(),
            recommendations: Vec::new(),
            platforms: Vec::new(),
        }
    }
}

/// One country's share of a multi-country plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryEstimate {
    pub country: String,
    pub total_budget: f64,
    pub result: EstimationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTotals {
    pub total_budget: f64,
    pub estimated_reach: u64,
    pub estimated_impressions: u64,
    pub estimated_clicks: u64,
    pub estimated_conversions: u64,
    pub cost_per_click: f64,
    pub cost_per_conversion: f64,
    /// Weakest confidence across countries.
    pub confidence: Confidence,
    pub data_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEstimate {
    pub countries: Vec<CountryEstimate>,
    pub totals: PlanTotals,
}

// ─── Blending ───────────────────────────────────────────────────────────────

/// Budget-weighted running sums: Σ(rate × spend) and Σ spend.
///
/// CPC is blended only over spend that can buy clicks; rows without an
/// observed or derivable CPC add to `weight` but not to `cpc_weight`.
#[derive(Debug, Default, Clone, Copy)]
struct Blend {
    weight: f64,
    cpc_weight: f64,
    cpm: f64,
    cpc: f64,
    ctr: f64,
    conversion_rate: f64,
    frequency: f64,
}

impl Blend {
    fn add(&mut self, spend: f64, rates: &BenchmarkRates, frequency: f64) {
        self.weight += spend;
        self.cpm += rates.cpm * spend;
        self.ctr += rates.ctr * spend;
        self.conversion_rate += rates.conversion_rate * spend;
        self.frequency += frequency * spend;
        if let Some(cpc) = rates.effective_cpc() {
            self.cpc_weight += spend;
            self.cpc += cpc * spend;
        }
    }

    fn avg(&self, sum: f64) -> f64 {
        if self.weight > 0.0 {
            sum / self.weight
        } else {
            0.0
        }
    }

    fn avg_cpc(&self) -> f64 {
        if self.cpc_weight > 0.0 {
            self.cpc / self.cpc_weight
        } else {
            0.0
        }
    }

    /// Fraction of the blended spend that buys clicks at `avg_cpc()`.
    fn cpc_share(&self) -> f64 {
        if self.weight > 0.0 {
            self.cpc_weight / self.weight
        } else {
            0.0
        }
    }

    /// Impressions and clicks for a spend at this blend's rates.
    fn volumes(&self, spend: f64, path: ClickPath) -> (f64, f64) {
        let cpm = self.avg(self.cpm);
        if spend <= 0.0 || cpm <= 0.0 {
            return (0.0, 0.0);
        }
        let impressions = spend / cpm * 1000.0;
        let cpc = self.avg_cpc();
        let clicks = match path {
            ClickPath::Cpc if cpc > 0.0 => spend * self.cpc_share() / cpc,
            ClickPath::Cpc | ClickPath::Ctr => impressions * self.avg(self.ctr) / 100.0,
            ClickPath::None => 0.0,
        };
        (impressions, clicks.min(impressions))
    }
}

fn ratio(numerator: f64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

fn score_confidence(worst: Option<LookupTier>, data_points: usize, min_exact: usize) -> Confidence {
    match worst {
        None | Some(LookupTier::GlobalDefault) => Confidence::Low,
        Some(LookupTier::PlatformAverage) => Confidence::Medium,
        Some(LookupTier::Exact) if data_points >= min_exact => Confidence::High,
        Some(LookupTier::Exact) => Confidence::High.downgrade(),
    }
}

fn app_install_share(platform: &PlatformAllocation) -> f64 {
    platform
        .campaign_types
        .iter()
        .filter(|(t, _)| APP_INSTALL_TYPES.contains(&t.to_ascii_lowercase().as_str()))
        .map(|(_, pct)| pct.max(0.0) / 100.0)
        .sum()
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Stateless estimator holding only tuning constants.
#[derive(Debug, Clone, Default)]
pub struct EstimationEngine {
    estimation: EstimationConfig,
    insights: InsightConfig,
}

impl EstimationEngine {
    pub fn new(estimation: EstimationConfig, insights: InsightConfig) -> Self {
        Self {
            estimation,
            insights,
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Self {
        Self::new(config.estimation.clone(), config.insights.clone())
    }

    pub fn estimation_config(&self) -> &EstimationConfig {
        &self.estimation
    }

    /// Load benchmarks from a provider and estimate. Fails only with
    /// `BenchmarkUnavailable` when the provider cannot supply a table.
    pub fn estimate_from(
        &self,
        setup: &CampaignSetup,
        source: &dyn BenchmarkSource,
    ) -> PlannerResult<EstimationResult> {
        let table = source.load()?;
        Ok(self.estimate(setup, &table))
    }

    /// Estimate outcomes for a setup. Never fails; incomplete setups produce a
    /// best-effort result.
    pub fn estimate(&self, setup: &CampaignSetup, table: &BenchmarkTable) -> EstimationResult {
        let mut result = self.compute_metrics(setup, table);
        let (found_insights, found_recommendations) =
            insights::evaluate(setup, &result, &self.estimation, &self.insights);
        result.insights = found_insights;
        result.recommendations = found_recommendations;
        debug!(
            setup_id = %setup.id,
            impressions = result.estimated_impressions,
            clicks = result.estimated_clicks,
            confidence = %result.confidence,
            data_points = result.data_points,
            "Estimate computed"
        );
        result
    }

    fn compute_metrics(&self, setup: &CampaignSetup, table: &BenchmarkTable) -> EstimationResult {
        let budget = setup.total_budget;
        let daily_budget = setup.daily_budget();
        if !(budget > 0.0) || setup.countries.is_empty() {
            return EstimationResult::empty(daily_budget);
        }

        let country_count = setup.countries.len() as f64;
        let mut campaign = Blend::default();
        let mut exact_rows: BTreeSet<(String, String)> = BTreeSet::new();
        let mut worst_tier: Option<LookupTier> = None;
        let mut any_observed_cpc = false;
        let mut installs = 0.0;
        let mut per_platform: Vec<(&PlatformAllocation, f64, Blend, LookupTier)> = Vec::new();

        for platform in &setup.platforms {
            let allocated = budget * platform.budget_percent / 100.0;
            if !(allocated > 0.0) {
                continue;
            }
            let pair_spend = allocated / country_count;
            let install_share = app_install_share(platform);
            let frequency = self.estimation.frequency_for(&platform.platform_id);
            let mut blend = Blend::default();
            let mut platform_tier = LookupTier::Exact;

            for country in &setup.countries {
                let lookup = table.lookup(&platform.platform_id, country);
                let rates = lookup.rates;
                blend.add(pair_spend, rates, frequency);
                campaign.add(pair_spend, rates, frequency);

                any_observed_cpc |= rates.observed_cpc().is_some();
                if lookup.tier == LookupTier::Exact {
                    exact_rows.insert((platform.platform_id.clone(), country.clone()));
                }
                platform_tier = platform_tier.max(lookup.tier);
                worst_tier = Some(worst_tier.map_or(lookup.tier, |t| t.max(lookup.tier)));

                if let Some(cpi) = rates.cost_per_install.filter(|c| *c > 0.0) {
                    installs += pair_spend * install_share / cpi;
                }
            }
            per_platform.push((platform, allocated, blend, platform_tier));
        }

        if !(campaign.weight > 0.0) {
            return EstimationResult::empty(daily_budget);
        }

        let path = if any_observed_cpc {
            ClickPath::Cpc
        } else {
            ClickPath::Ctr
        };

        let average_cpm = campaign.avg(campaign.cpm);
        let average_cpc = campaign.avg_cpc();
        let average_conversion_rate = campaign.avg(campaign.conversion_rate);
        let frequency = campaign.avg(campaign.frequency);

        let (impressions_f, clicks_f) = campaign.volumes(budget, path);
        let estimated_impressions = impressions_f.round() as u64;
        let estimated_clicks = clicks_f.round() as u64;
        let estimated_conversions =
            (estimated_clicks as f64 * average_conversion_rate / 100.0).round() as u64;
        let estimated_reach = if frequency > 0.0 {
            (impressions_f / frequency).round() as u64
        } else {
            0
        };

        let platforms = per_platform
            .into_iter()
            .map(|(platform, allocated, blend, tier)| {
                let (imp, clk) = blend.volumes(allocated, path);
                PlatformEstimate {
                    platform_id: platform.platform_id.clone(),
                    budget_percent: platform.budget_percent,
                    allocated_budget: allocated,
                    cpm: blend.avg(blend.cpm),
                    cpc: blend.avg_cpc(),
                    ctr: blend.avg(blend.ctr),
                    conversion_rate: blend.avg(blend.conversion_rate),
                    frequency: blend.avg(blend.frequency),
                    tier,
                    estimated_impressions: imp.round() as u64,
                    estimated_clicks: clk.round() as u64,
                }
            })
            .collect();

        let data_points = exact_rows.len();
        EstimationResult {
            estimated_reach,
            estimated_impressions,
            estimated_clicks,
            estimated_conversions,
            estimated_installs: installs.round() as u64,
            cost_per_click: ratio(budget, estimated_clicks),
            cost_per_conversion: ratio(budget, estimated_conversions),
            average_cpm,
            average_cpc,
            average_ctr: if estimated_impressions > 0 {
                estimated_clicks as f64 / estimated_impressions as f64 * 100.0
            } else {
                0.0
            },
            average_conversion_rate,
            daily_budget,
            click_path: path,
            confidence: score_confidence(
                worst_tier,
                data_points,
                self.estimation.min_exact_data_points,
            ),
            data_points,
            insights: Vec::new(),
            recommendations: Vec::new(),
            platforms,
        }
    }

    /// Estimate each finished country and roll the volumes up.
    pub fn estimate_plan(
        &self,
        campaigns: &[CountryCampaign],
        table: &BenchmarkTable,
    ) -> PlanEstimate {
        let countries: Vec<CountryEstimate> = campaigns
            .iter()
            .map(|c| CountryEstimate {
                country: c.country.clone(),
                total_budget: c.setup.total_budget,
                result: self.estimate(&c.setup, table),
            })
            .collect();

        let total_budget: f64 = countries.iter().map(|c| c.total_budget.max(0.0)).sum();
        // Saturated per-country volumes must not overflow the roll-up.
        let sum = |f: fn(&EstimationResult) -> u64| {
            countries
                .iter()
                .map(|c| f(&c.result))
                .fold(0u64, u64::saturating_add)
        };
        let estimated_clicks = sum(|r| r.estimated_clicks);
        let estimated_conversions = sum(|r| r.estimated_conversions);

        let totals = PlanTotals {
            total_budget,
            estimated_reach: sum(|r| r.estimated_reach),
            estimated_impressions: sum(|r| r.estimated_impressions),
            estimated_clicks,
            estimated_conversions,
            cost_per_click: ratio(total_budget, estimated_clicks),
            cost_per_conversion: ratio(total_budget, estimated_conversions),
            confidence: countries
                .iter()
                .map(|c| c.result.confidence)
                .reduce(Confidence::weakest)
                .unwrap_or(Confidence::Low),
            data_points: countries.iter().map(|c| c.result.data_points).sum(),
        };

        PlanEstimate { countries, totals }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::BenchmarkRow;

    const EPS: f64 = 1e-9;

    fn rates(cpm: f64, ctr: f64, cvr: f64) -> BenchmarkRates {
        BenchmarkRates {
            cpm,
            cpc: None,
            ctr,
            conversion_rate: cvr,
            cost_per_install: None,
        }
    }

    fn row(platform: &str, country: &str, r: BenchmarkRates) -> BenchmarkRow {
        BenchmarkRow {
            platform: platform.to_string(),
            country: country.to_string(),
            rates: r,
        }
    }

    fn setup_with(countries: &[&str], budget: f64, shares: &[(&str, f64)]) -> CampaignSetup {
        let mut setup = CampaignSetup::new();
        setup.set_countries(countries.iter().copied());
        setup.set_total_budget(budget).unwrap();
        setup.set_duration_days(30);
        for (platform, pct) in shares {
            setup.toggle_platform(platform);
            setup.set_platform_budget_percent(platform, *pct).unwrap();
        }
        setup
    }

    #[test]
    fn test_single_platform_reference_numbers() {
        let table =
            BenchmarkTable::from_rows(vec![row("meta", "AE", rates(5.0, 2.0, 0.1))], None).unwrap();
        let setup = setup_with(&["AE"], 10_000.0, &[("meta", 100.0)]);

        let result = EstimationEngine::default().estimate(&setup, &table);
        assert_eq!(result.estimated_impressions, 2_000_000);
        assert_eq!(result.estimated_clicks, 40_000);
        assert_eq!(result.estimated_conversions, 40);
        assert!((result.cost_per_click - 0.25).abs() < EPS);
        assert!((result.cost_per_conversion - 250.0).abs() < EPS);
        assert_eq!(result.click_path, ClickPath::Ctr);
        // meta is social: frequency 2.5
        assert_eq!(result.estimated_reach, 800_000);
        assert_eq!(result.data_points, 1);
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[test]
    fn test_equal_rates_blend_to_shared_rate() {
        let table = BenchmarkTable::from_rows(
            vec![
                row("meta", "AE", rates(5.0, 1.0, 1.0)),
                row("tiktok", "AE", rates(5.0, 1.0, 1.0)),
            ],
            None,
        )
        .unwrap();
        let setup = setup_with(&["AE"], 1_000.0, &[("meta", 80.0), ("tiktok", 20.0)]);
        let result = EstimationEngine::default().estimate(&setup, &table);
        assert!((result.average_cpm - 5.0).abs() < EPS);
        assert!((result.average_ctr - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unequal_rates_lean_toward_larger_budget() {
        let table = BenchmarkTable::from_rows(
            vec![
                row("meta", "AE", rates(4.0, 1.0, 1.0)),
                row("tiktok", "AE", rates(10.0, 1.0, 1.0)),
            ],
            None,
        )
        .unwrap();
        let setup = setup_with(&["AE"], 1_000.0, &[("meta", 75.0), ("tiktok", 25.0)]);
        let result = EstimationEngine::default().estimate(&setup, &table);

        assert!(result.average_cpm > 4.0 && result.average_cpm < 10.0);
        assert!((result.average_cpm - 4.0) < (10.0 - result.average_cpm));
        assert!((result.average_cpm - 5.5).abs() < EPS);
        assert_eq!(result.platforms.len(), 2);
        assert!((result.platforms[0].allocated_budget - 750.0).abs() < EPS);
    }

    #[test]
    fn test_zero_budget_is_all_zero_low() {
        let table =
            BenchmarkTable::from_rows(vec![row("meta", "AE", rates(5.0, 2.0, 0.1))], None).unwrap();
        let setup = setup_with(&["AE"], 0.0, &[("meta", 100.0)]);
        let result = EstimationEngine::default().estimate(&setup, &table);

        assert_eq!(result.estimated_impressions, 0);
        assert_eq!(result.estimated_clicks, 0);
        assert_eq!(result.estimated_conversions, 0);
        assert_eq!(result.estimated_reach, 0);
        assert!(result.cost_per_click.abs() < EPS);
        assert!(result.cost_per_conversion.abs() < EPS);
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_no_platforms_is_low_confidence() {
        let table =
            BenchmarkTable::from_rows(vec![row("meta", "AE", rates(5.0, 2.0, 0.1))], None).unwrap();
        let setup = setup_with(&["AE"], 5_000.0, &[]);
        let result = EstimationEngine::default().estimate(&setup, &table);
        assert_eq!(result.estimated_impressions, 0);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.click_path, ClickPath::None);
    }

    #[test]
    fn test_confidence_by_tier() {
        let table = BenchmarkTable::from_rows(
            vec![
                row("meta", "AE", rates(5.0, 1.0, 1.0)),
                row("meta", "SA", rates(5.0, 1.0, 1.0)),
                row("tiktok", "AE", rates(5.0, 1.0, 1.0)),
                row("tiktok", "SA", rates(5.0, 1.0, 1.0)),
            ],
            Some(rates(8.0, 1.0, 1.0)),
        )
        .unwrap();
        let engine = EstimationEngine::default();

        let exact = setup_with(&["AE", "SA"], 1_000.0, &[("meta", 50.0), ("tiktok", 50.0)]);
        let exact_result = engine.estimate(&exact, &table);
        assert_eq!(exact_result.data_points, 4);
        assert_eq!(exact_result.confidence, Confidence::High);

        let with_average = setup_with(&["AE", "KW"], 1_000.0, &[("meta", 50.0), ("tiktok", 50.0)]);
        let avg_result = engine.estimate(&with_average, &table);
        assert_eq!(avg_result.confidence, Confidence::Medium);
        assert!(avg_result.confidence <= exact_result.confidence);

        let with_global = setup_with(&["AE", "SA"], 1_000.0, &[("meta", 50.0), ("snapchat", 50.0)]);
        let global_result = engine.estimate(&with_global, &table);
        assert_eq!(global_result.confidence, Confidence::Low);
        assert!(global_result.confidence <= avg_result.confidence);
    }

    #[test]
    fn test_cpc_path_preferred_when_observed() {
        let mut observed = rates(5.0, 2.0, 1.0);
        observed.cpc = Some(0.5);
        let table =
            BenchmarkTable::from_rows(vec![row("google_search", "AE", observed)], None).unwrap();
        let setup = setup_with(&["AE"], 10_000.0, &[("google_search", 100.0)]);
        let result = EstimationEngine::default().estimate(&setup, &table);

        assert_eq!(result.click_path, ClickPath::Cpc);
        assert_eq!(result.estimated_impressions, 2_000_000);
        assert_eq!(result.estimated_clicks, 20_000);
        // Effective CTR is back-derived from the CPC path.
        assert!((result.average_ctr - 1.0).abs() < 1e-9);
        assert!((result.cost_per_click - 0.5).abs() < EPS);
    }

    #[test]
    fn test_zero_ctr_platform_buys_no_clicks_on_cpc_path() {
        let mut observed = rates(5.0, 2.0, 1.0);
        observed.cpc = Some(1.0);
        let table = BenchmarkTable::from_rows(
            vec![
                row("meta", "AE", observed),
                row("tiktok", "AE", rates(5.0, 0.0, 1.0)),
            ],
            None,
        )
        .unwrap();
        let setup = setup_with(&["AE"], 10_000.0, &[("meta", 50.0), ("tiktok", 50.0)]);
        let result = EstimationEngine::default().estimate(&setup, &table);

        assert_eq!(result.click_path, ClickPath::Cpc);
        assert!((result.average_cpc - 1.0).abs() < EPS);
        assert_eq!(result.estimated_clicks, 5_000);
        let per_platform: u64 = result.platforms.iter().map(|p| p.estimated_clicks).sum();
        assert_eq!(per_platform, result.estimated_clicks);
        assert_eq!(result.platforms[1].estimated_clicks, 0);
        assert!(result.platforms[1].cpc.abs() < EPS);
    }

    #[test]
    fn test_clicks_never_exceed_impressions() {
        let mut cheap = rates(5.0, 2.0, 1.0);
        cheap.cpc = Some(0.0001);
        let table = BenchmarkTable::from_rows(vec![row("meta", "AE", cheap)], None).unwrap();
        let setup = setup_with(&["AE"], 1_000.0, &[("meta", 100.0)]);
        let result = EstimationEngine::default().estimate(&setup, &table);
        assert_eq!(result.estimated_clicks, result.estimated_impressions);
    }

    #[test]
    fn test_deterministic_results() {
        let table = BenchmarkTable::from_rows(
            vec![
                row("meta", "AE", rates(4.3, 1.1, 0.7)),
                row("youtube", "SA", rates(7.9, 0.4, 0.2)),
            ],
            None,
        )
        .unwrap();
        let setup = setup_with(&["AE", "SA"], 12_345.0, &[("meta", 61.0), ("youtube", 39.0)]);
        let engine = EstimationEngine::default();
        assert_eq!(engine.estimate(&setup, &table), engine.estimate(&setup, &table));
    }

    #[test]
    fn test_installs_from_app_install_share() {
        let mut r = rates(5.0, 1.0, 1.0);
        r.cost_per_install = Some(2.0);
        let table = BenchmarkTable::from_rows(vec![row("tiktok", "AE", r)], None).unwrap();
        let mut setup = setup_with(&["AE"], 1_000.0, &[("tiktok", 100.0)]);
        setup.toggle_campaign_type("tiktok", "app_installs").unwrap();
        setup.toggle_campaign_type("tiktok", "awareness").unwrap();
        setup.set_campaign_type_percent("tiktok", "app_installs", 40.0).unwrap();
        setup.set_campaign_type_percent("tiktok", "awareness", 60.0).unwrap();

        let result = EstimationEngine::default().estimate(&setup, &table);
        assert_eq!(result.estimated_installs, 200);
    }

    #[test]
    fn test_negative_share_mid_edit_is_ignored() {
        let table =
            BenchmarkTable::from_rows(vec![row("meta", "AE", rates(5.0, 2.0, 0.1))], None).unwrap();
        let setup = setup_with(&["AE"], 1_000.0, &[("meta", 100.0), ("tiktok", -20.0)]);
        let result = EstimationEngine::default().estimate(&setup, &table);
        assert_eq!(result.platforms.len(), 1);
        assert!(result.estimated_impressions > 0);
    }

    #[test]
    fn test_plan_totals_roll_up() {
        let table = BenchmarkTable::from_rows(
            vec![
                row("meta", "AE", rates(5.0, 2.0, 0.1)),
                row("meta", "SA", rates(5.0, 2.0, 0.1)),
            ],
            None,
        )
        .unwrap();
        let ae = setup_with(&["AE"], 10_000.0, &[("meta", 100.0)]);
        let sa = ae.clone_for_country("SA");
        let campaigns = vec![
            CountryCampaign {
                country: "AE".to_string(),
                origin: crate::allocation::SetupOrigin::Custom,
                setup: ae,
                completed_at: chrono::Utc::now(),
            },
            CountryCampaign {
                country: "SA".to_string(),
                origin: crate::allocation::SetupOrigin::CopiedFromPrevious,
                setup: sa,
                completed_at: chrono::Utc::now(),
            },
        ];

        let plan = EstimationEngine::default().estimate_plan(&campaigns, &table);
        assert_eq!(plan.countries.len(), 2);
        assert_eq!(plan.totals.estimated_impressions, 4_000_000);
        assert_eq!(plan.totals.estimated_clicks, 80_000);
        assert!((plan.totals.total_budget - 20_000.0).abs() < EPS);
        assert!((plan.totals.cost_per_click - 0.25).abs() < EPS);
        assert_eq!(plan.totals.confidence, Confidence::Medium);

        let empty = EstimationEngine::default().estimate_plan(&[], &table);
        assert_eq!(empty.totals.confidence, Confidence::Low);
    }

    #[test]
    fn test_plan_totals_saturate_instead_of_overflowing() {
        let table =
            BenchmarkTable::from_rows(vec![row("meta", "AE", rates(0.01, 2.0, 0.1))], None).unwrap();
        let huge = setup_with(&["AE"], 1e300, &[("meta", 100.0)]);
        let campaigns: Vec<CountryCampaign> = ["AE", "SA"]
            .iter()
            .map(|country| CountryCampaign {
                country: country.to_string(),
                origin: crate::allocation::SetupOrigin::Custom,
                setup: huge.clone(),
                completed_at: chrono::Utc::now(),
            })
            .collect();

        let plan = EstimationEngine::default().estimate_plan(&campaigns, &table);
        assert_eq!(plan.countries[0].result.estimated_impressions, u64::MAX);
        assert_eq!(plan.totals.estimated_impressions, u64::MAX);
        assert_eq!(plan.totals.estimated_clicks, u64::MAX);
    }
}
