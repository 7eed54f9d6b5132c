//! Campaign Planner: command-line shell over the planning engine.
//!
//! Reads campaign setups as JSON, resolves benchmark data, and prints
//! estimates or validation results as JSON on stdout. Logs go to stderr.

use anyhow::Context;
use campaign_core::config::PlannerConfig;
use campaign_core::PlannerError;
use campaign_planning::{
    BenchmarkSource, CampaignSetup, CountryCampaign, EstimationEngine, JsonFileBenchmarks,
};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

/// Exit code when benchmark data cannot be loaded.
const EXIT_ESTIMATES_UNAVAILABLE: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "campaign-planner")]
#[command(about = "Campaign budget allocation and performance estimation")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "CAMPAIGN_PLANNER_CONFIG")]
    config: Option<String>,

    /// Benchmark JSON file (overrides config)
    #[arg(long, env = "CAMPAIGN_PLANNER__BENCHMARKS__PATH")]
    benchmarks: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Estimate outcomes for a single campaign setup
    Estimate {
        /// Path to a campaign setup JSON file
        #[arg(short, long)]
        setup: String,
    },

    /// Check a campaign setup for completeness
    Validate {
        /// Path to a campaign setup JSON file
        #[arg(short, long)]
        setup: String,
    },

    /// Estimate a multi-country plan (JSON array of finished countries)
    Plan {
        /// Path to the plan JSON file
        #[arg(short, long)]
        plan: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_planner=info,campaign_planning=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => PlannerConfig::load(Some(path))
            .with_context(|| format!("loading configuration from {path}"))?,
        None => PlannerConfig::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            PlannerConfig::default()
        }),
    };

    // Apply CLI overrides
    if let Some(path) = cli.benchmarks {
        config.benchmarks.path = Some(path);
    }

    info!(
        benchmarks = config.benchmarks.path.as_deref().unwrap_or("<none>"),
        platforms = config.estimation.platforms.len(),
        "Configuration loaded"
    );

    let engine = EstimationEngine::from_config(&config);

    match cli.command {
        Commands::Estimate { setup } => cmd_estimate(&engine, &config, &setup),
        Commands::Validate { setup } => cmd_validate(&setup),
        Commands::Plan { plan } => cmd_plan(&engine, &config, &plan),
    }
}

fn cmd_estimate(
    engine: &EstimationEngine,
    config: &PlannerConfig,
    path: &str,
) -> anyhow::Result<()> {
    let setup: CampaignSetup = read_json(path)?;
    let source = benchmark_source(config);
    match engine.estimate_from(&setup, &source) {
        Ok(result) => print_json(&result),
        Err(PlannerError::BenchmarkUnavailable(reason)) => estimates_unavailable(&reason),
        Err(e) => Err(e.into()),
    }
}

fn cmd_validate(path: &str) -> anyhow::Result<()> {
    let setup: CampaignSetup = read_json(path)?;
    let issues = setup.validate();
    let report = serde_json::json!({
        "complete": issues.is_empty(),
        "total_platform_percent": setup.total_platform_percent(),
        "issues": issues,
        "messages": issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
    });
    print_json(&report)?;
    if !issues.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_plan(engine: &EstimationEngine, config: &PlannerConfig, path: &str) -> anyhow::Result<()> {
    let campaigns: Vec<CountryCampaign> = read_json(path)?;
    let table = match benchmark_source(config).load() {
        Ok(table) => table,
        Err(PlannerError::BenchmarkUnavailable(reason)) => return estimates_unavailable(&reason),
        Err(e) => return Err(e.into()),
    };
    let estimate = engine.estimate_plan(&campaigns, &table);
    info!(
        countries = estimate.countries.len(),
        confidence = %estimate.totals.confidence,
        "Plan estimated"
    );
    print_json(&estimate)
}

fn benchmark_source(config: &PlannerConfig) -> JsonFileBenchmarks {
    // A missing path surfaces as BenchmarkUnavailable when loading.
    JsonFileBenchmarks::new(config.benchmarks.path.clone().unwrap_or_default())
}

fn estimates_unavailable(reason: &str) -> anyhow::Result<()> {
    warn!(reason, "Estimates unavailable");
    print_json(&serde_json::json!({
        "status": "estimates_unavailable",
        "reason": reason,
    }))?;
    std::process::exit(EXIT_ESTIMATES_UNAVAILABLE);
}

fn read_json<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {path}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
