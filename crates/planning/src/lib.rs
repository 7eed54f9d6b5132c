//! Campaign planning engine: hierarchical budget allocation, benchmark-driven
//! performance estimation and the step-gated planning wizard.

pub mod allocation;
pub mod benchmark;
pub mod estimation;
pub mod insights;
pub mod sessions;
pub mod wizard;

pub use allocation::{CampaignSetup, CountryCampaign, PlatformAllocation, ValidationIssue};
pub use benchmark::{BenchmarkSource, BenchmarkTable, JsonFileBenchmarks, StaticBenchmarks};
pub use estimation::{EstimationEngine, EstimationResult, PlanEstimate};
pub use sessions::PlanningSessions;
pub use wizard::{StepOutcome, Transition, WizardController, WizardState, WizardStep};
