//! Rule-based insights and recommendations attached to an estimate.
//!
//! Each rule is a pure predicate over the setup and the computed metrics.
//! Rules are evaluated independently in the fixed order of [`RULES`], and
//! every rule that fires contributes one line.

use campaign_core::config::{EstimationConfig, InsightConfig};
use campaign_core::types::Confidence;
use serde::{Deserialize, Serialize};

use crate::allocation::CampaignSetup;
use crate::estimation::EstimationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Insight,
    Recommendation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub message: String,
}

impl Finding {
    fn insight(message: String) -> Self {
        Self {
            kind: FindingKind::Insight,
            message,
        }
    }

    fn recommendation(message: String) -> Self {
        Self {
            kind: FindingKind::Recommendation,
            message,
        }
    }
}

/// Everything a rule may look at.
pub struct InsightContext<'a> {
    pub setup: &'a CampaignSetup,
    pub result: &'a EstimationResult,
    pub estimation: &'a EstimationConfig,
    pub config: &'a InsightConfig,
}

impl InsightContext<'_> {
    /// Platforms that actually receive budget.
    fn funded_platforms(&self) -> impl Iterator<Item = &str> + '_ {
        self.setup
            .platforms
            .iter()
            .filter(|p| p.budget_percent > 0.0)
            .map(|p| p.platform_id.as_str())
    }
}

pub type InsightRule = fn(&InsightContext<'_>) -> Option<Finding>;

/// Evaluation order is part of the output contract.
pub const RULES: &[(&str, InsightRule)] = &[
    ("balanced_mix", balanced_mix),
    ("low_cost_country", low_cost_country),
    ("strong_engagement", strong_engagement),
    ("low_confidence", low_confidence),
    ("content_diversity", content_diversity),
    ("short_duration", short_duration),
    ("platform_concentration", platform_concentration),
    ("thin_daily_budget", thin_daily_budget),
];

/// Run every rule and split the findings into (insights, recommendations).
pub fn evaluate(
    setup: &CampaignSetup,
    result: &EstimationResult,
    estimation: &EstimationConfig,
    config: &InsightConfig,
) -> (Vec<String>, Vec<String>) {
    let ctx = InsightContext {
        setup,
        result,
        estimation,
        config,
    };
    let mut insights = Vec::new();
    let mut recommendations = Vec::new();
    for finding in RULES.iter().filter_map(|(_, rule)| rule(&ctx)) {
        match finding.kind {
            FindingKind::Insight => insights.push(finding.message),
            FindingKind::Recommendation => recommendations.push(finding.message),
        }
    }
    (insights, recommendations)
}

// ─── Rules ──────────────────────────────────────────────────────────────────

fn balanced_mix(ctx: &InsightContext<'_>) -> Option<Finding> {
    if ctx.setup.total_budget < ctx.config.balanced_mix_min_budget {
        return None;
    }
    let profiles: Vec<_> = ctx
        .funded_platforms()
        .filter_map(|id| ctx.estimation.profile(id))
        .collect();
    let reach = profiles.iter().any(|p| p.orientation.drives_reach());
    let performance = profiles.iter().any(|p| p.orientation.drives_performance());
    (profiles.len() >= 2 && reach && performance).then(|| {
        Finding::insight(
            "Budget and platform mix cover both reach and performance, which supports consistent results across the funnel".to_string(),
        )
    })
}

fn low_cost_country(ctx: &InsightContext<'_>) -> Option<Finding> {
    match ctx.setup.countries.as_slice() {
        [only] if ctx.config.is_low_cost_country(only) => Some(Finding::insight(format!(
            "{only} has historically low media costs, so the budget should buy above-average volume"
        ))),
        _ => None,
    }
}

fn strong_engagement(ctx: &InsightContext<'_>) -> Option<Finding> {
    let ctr = ctx.result.average_ctr;
    (ctx.result.estimated_clicks > 0 && ctr >= ctx.config.strong_ctr_percent).then(|| {
        Finding::insight(format!(
            "Expected CTR of {ctr:.2}% is above the typical range for this mix"
        ))
    })
}

fn low_confidence(ctx: &InsightContext<'_>) -> Option<Finding> {
    let has_inputs = ctx.setup.total_budget > 0.0
        && !ctx.setup.countries.is_empty()
        && ctx.funded_platforms().next().is_some();
    (has_inputs && ctx.result.confidence == Confidence::Low).then(|| {
        Finding::recommendation(
            "Estimates rely on fallback benchmarks for some platforms or countries; treat them as directional".to_string(),
        )
    })
}

fn content_diversity(ctx: &InsightContext<'_>) -> Option<Finding> {
    let planned = ctx.setup.content_type_count();
    let wanted = ctx.config.min_content_types;
    (planned < wanted).then(|| {
        Finding::recommendation(format!(
            "Plan at least {wanted} content formats ({planned} so far) to limit creative fatigue"
        ))
    })
}

fn short_duration(ctx: &InsightContext<'_>) -> Option<Finding> {
    let days = ctx.setup.duration_days;
    let min = ctx.config.min_campaign_days;
    (days > 0 && days < min).then(|| {
        Finding::recommendation(format!(
            "Run for at least {min} days so delivery can leave the learning phase ({days} planned)"
        ))
    })
}

fn platform_concentration(ctx: &InsightContext<'_>) -> Option<Finding> {
    let limit = ctx.config.concentration_percent;
    ctx.setup
        .platforms
        .iter()
        .find(|p| p.budget_percent >= limit)
        .map(|p| {
            Finding::recommendation(format!(
                "{} holds {:.0}% of the budget; spreading spend reduces dependency on a single platform",
                p.platform_id, p.budget_percent
            ))
        })
}

fn thin_daily_budget(ctx: &InsightContext<'_>) -> Option<Finding> {
    let funded = ctx.funded_platforms().count();
    let daily = ctx.setup.daily_budget();
    if funded == 0 || daily <= 0.0 {
        return None;
    }
    let per_platform = daily / funded as f64;
    (per_platform < ctx.config.min_daily_budget_per_platform).then(|| {
        Finding::recommendation(format!(
            "Daily budget per platform is {per_platform:.2}; consider fewer platforms or a higher budget"
        ))
    })
}
