//! Historical performance benchmarks keyed by (platform, country).
//!
//! The table is built once from rows and is read-only afterwards. Lookups
//! fall back from an exact row to the platform average across countries and
//! finally to a single global default row.

use std::collections::BTreeMap;
use std::path::PathBuf;

use campaign_core::error::{PlannerError, PlannerResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::allocation::{normalize_country, normalize_platform};

/// Observed rates. `ctr` and `conversion_rate` are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRates {
    pub cpm: f64,
    #[serde(default)]
    pub cpc: Option<f64>,
    pub ctr: f64,
    pub conversion_rate: f64,
    #[serde(default)]
    pub cost_per_install: Option<f64>,
}

impl BenchmarkRates {
    /// Observed CPC when present and positive.
    pub fn observed_cpc(&self) -> Option<f64> {
        self.cpc.filter(|c| *c > 0.0)
    }

    /// Observed CPC, or the CPC implied by CPM and CTR. `None` when the row
    /// has neither, i.e. it buys no clicks.
    pub fn effective_cpc(&self) -> Option<f64> {
        self.observed_cpc()
            .or_else(|| (self.ctr > 0.0).then(|| self.cpm / (10.0 * self.ctr)))
    }

    fn check(&self, label: &str) -> PlannerResult<()> {
        let optional = [self.cpc, self.cost_per_install];
        let required = [self.cpm, self.ctr, self.conversion_rate];
        let bad = required
            .iter()
            .chain(optional.iter().flatten())
            .any(|v| !v.is_finite() || *v < 0.0);
        if bad || self.cpm <= 0.0 {
            return Err(PlannerError::BenchmarkUnavailable(format!(
                "malformed rates for {label}"
            )));
        }
        Ok(())
    }

    /// Arithmetic mean of a non-empty set of rates.
    fn mean<'a>(rates: impl Iterator<Item = &'a BenchmarkRates> + Clone) -> Option<BenchmarkRates> {
        let n = rates.clone().count();
        if n == 0 {
            return None;
        }
        let avg = |f: fn(&BenchmarkRates) -> f64| rates.clone().map(f).sum::<f64>() / n as f64;
        let avg_opt = |f: fn(&BenchmarkRates) -> Option<f64>| {
            let present: Vec<f64> = rates.clone().filter_map(f).collect();
            if present.is_empty() {
                None
            } else {
                Some(present.iter().sum::<f64>() / present.len() as f64)
            }
        };
        Some(BenchmarkRates {
            cpm: avg(|r| r.cpm),
            cpc: avg_opt(|r| r.observed_cpc()),
            ctr: avg(|r| r.ctr),
            conversion_rate: avg(|r| r.conversion_rate),
            cost_per_install: avg_opt(|r| r.cost_per_install),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRow {
    pub platform: String,
    pub country: String,
    #[serde(flatten)]
    pub rates: BenchmarkRates,
}

/// Serialized form of a benchmark table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkDocument {
    #[serde(default)]
    pub rows: Vec<BenchmarkRow>,
    /// Derived from all rows when absent.
    #[serde(default)]
    pub global_default: Option<BenchmarkRates>,
}

/// Which fallback level answered a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupTier {
    Exact,
    PlatformAverage,
    GlobalDefault,
}

#[derive(Debug, Clone, Copy)]
pub struct BenchmarkLookup<'a> {
    pub rates: &'a BenchmarkRates,
    pub tier: LookupTier,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "BenchmarkDocument")]
pub struct BenchmarkTable {
    rows: BTreeMap<(String, String), BenchmarkRates>,
    platform_averages: BTreeMap<String, BenchmarkRates>,
    global_default: BenchmarkRates,
}

impl BenchmarkTable {
    /// Validate rows and precompute platform-level averages.
    pub fn from_rows(
        rows: Vec<BenchmarkRow>,
        global_default: Option<BenchmarkRates>,
    ) -> PlannerResult<Self> {
        let mut by_key = BTreeMap::new();
        for row in rows {
            let key = (normalize_platform(&row.platform), normalize_country(&row.country));
            row.rates.check(&format!("{}/{}", key.0, key.1))?;
            if by_key.insert(key.clone(), row.rates).is_some() {
                return Err(PlannerError::BenchmarkUnavailable(format!(
                    "duplicate benchmark row for {}/{}",
                    key.0, key.1
                )));
            }
        }

        let mut platform_averages = BTreeMap::new();
        let mut current: Option<&str> = None;
        for (platform, _) in by_key.keys() {
            if current == Some(platform.as_str()) {
                continue;
            }
            current = Some(platform.as_str());
            let rates = by_key
                .iter()
                .filter(|((p, _), _)| p == platform)
                .map(|(_, r)| r);
            if let Some(avg) = BenchmarkRates::mean(rates) {
                platform_averages.insert(platform.clone(), avg);
            }
        }

        let global_default = match global_default {
            Some(rates) => rates,
            None => BenchmarkRates::mean(by_key.values()).ok_or_else(|| {
                PlannerError::BenchmarkUnavailable(
                    "no benchmark rows and no global default".to_string(),
                )
            })?,
        };
        global_default.check("global default")?;

        info!(
            rows = by_key.len(),
            platforms = platform_averages.len(),
            "Benchmark table loaded"
        );

        Ok(Self {
            rows: by_key,
            platform_averages,
            global_default,
        })
    }

    pub fn from_json(text: &str) -> PlannerResult<Self> {
        let doc: BenchmarkDocument = serde_json::from_str(text)
            .map_err(|e| PlannerError::BenchmarkUnavailable(e.to_string()))?;
        Self::try_from(doc)
    }

    /// Resolve rates for a pair, falling back platform-average then global.
    pub fn lookup(&self, platform: &str, country: &str) -> BenchmarkLookup<'_> {
        let platform = normalize_platform(platform);
        let country = normalize_country(country);

        if let Some(rates) = self.rows.get(&(platform.clone(), country.clone())) {
            return BenchmarkLookup {
                rates,
                tier: LookupTier::Exact,
            };
        }
        if let Some(rates) = self.platform_averages.get(&platform) {
            debug!(%platform, %country, "Benchmark fallback to platform average");
            return BenchmarkLookup {
                rates,
                tier: LookupTier::PlatformAverage,
            };
        }
        debug!(%platform, %country, "Benchmark fallback to global default");
        BenchmarkLookup {
            rates: &self.global_default,
            tier: LookupTier::GlobalDefault,
        }
    }

    pub fn global_default(&self) -> &BenchmarkRates {
        &self.global_default
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_document(&self) -> BenchmarkDocument {
        BenchmarkDocument {
            rows: self
                .rows
                .iter()
                .map(|((platform, country), rates)| BenchmarkRow {
                    platform: platform.clone(),
                    country: country.clone(),
                    rates: rates.clone(),
                })
                .collect(),
            global_default: Some(self.global_default.clone()),
        }
    }
}

impl TryFrom<BenchmarkDocument> for BenchmarkTable {
    type Error = PlannerError;

    fn try_from(doc: BenchmarkDocument) -> PlannerResult<Self> {
        Self::from_rows(doc.rows, doc.global_default)
    }
}

// ─── Providers ──────────────────────────────────────────────────────────────

/// Supplies a resolved benchmark table. Implementations own any I/O; the
/// planning core only ever sees the finished table.
pub trait BenchmarkSource: Send + Sync {
    fn load(&self) -> PlannerResult<BenchmarkTable>;
}

/// In-memory table, for tests and embedded datasets.
#[derive(Debug, Clone)]
pub struct StaticBenchmarks(pub BenchmarkTable);

impl BenchmarkSource for StaticBenchmarks {
    fn load(&self) -> PlannerResult<BenchmarkTable> {
        Ok(self.0.clone())
    }
}

/// Reads a [`BenchmarkDocument`] from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileBenchmarks {
    path: PathBuf,
}

impl JsonFileBenchmarks {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BenchmarkSource for JsonFileBenchmarks {
    fn load(&self) -> PlannerResult<BenchmarkTable> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            PlannerError::BenchmarkUnavailable(format!("{}: {e}", self.path.display()))
        })?;
        BenchmarkTable::from_json(&text)
    }
}
