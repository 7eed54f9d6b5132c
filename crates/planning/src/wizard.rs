//! Step-gated planning wizard.
//!
//! States are (step, country index) pairs plus a terminal `Completed` state.
//! Every move is reported as a named [`Transition`]; the multi-country
//! loop-back from `Review` to `Platforms` is its own edge rather than a
//! special case hidden inside `Advance`.

use campaign_core::error::{PlannerError, PlannerResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::allocation::{CampaignSetup, CountryCampaign, SetupOrigin, ValidationIssue};
use crate::benchmark::BenchmarkTable;
use crate::estimation::{EstimationEngine, EstimationResult, PlanEstimate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Countries,
    Budget,
    Duration,
    Platforms,
    PlatformBudgets,
    CampaignTypes,
    CampaignTypeBudgets,
    Content,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 9] = [
        WizardStep::Countries,
        WizardStep::Budget,
        WizardStep::Duration,
        WizardStep::Platforms,
        WizardStep::PlatformBudgets,
        WizardStep::CampaignTypes,
        WizardStep::CampaignTypeBudgets,
        WizardStep::Content,
        WizardStep::Review,
    ];

    /// First step repeated for every country.
    pub const FIRST_PER_COUNTRY: WizardStep = WizardStep::Platforms;
    /// Last step repeated for every country.
    pub const LAST_PER_COUNTRY: WizardStep = WizardStep::Review;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn is_per_country(self) -> bool {
        self >= Self::FIRST_PER_COUNTRY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum WizardState {
    InProgress { step: WizardStep, country_index: usize },
    Completed,
}

/// Named edges of the wizard state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "edge")]
pub enum Transition {
    Advance { from: WizardStep, to: WizardStep },
    Retreat { from: WizardStep, to: WizardStep },
    /// A country was finished and the next one starts at `Platforms`.
    LoopBackToNextCountry {
        finished_country: String,
        next_country: String,
        next_index: usize,
    },
    /// The last country was finished.
    Complete { countries: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Moved(Transition),
    /// The current step's gate is not satisfied; nothing changed.
    Blocked(Vec<ValidationIssue>),
}

/// Finished plan handed to the persistence shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSubmission {
    pub wizard_id: Uuid,
    pub campaigns: Vec<CountryCampaign>,
    pub estimate: PlanEstimate,
}

#[derive(Debug, Clone)]
pub struct WizardController {
    id: Uuid,
    state: WizardState,
    setup: CampaignSetup,
    /// Country order fixed when the Countries step is confirmed.
    selected_countries: Vec<String>,
    origin: SetupOrigin,
    completed: Vec<CountryCampaign>,
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardController {
    /// Fresh wizard at (Countries, country 0) with an empty setup.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: WizardState::InProgress {
                step: WizardStep::Countries,
                country_index: 0,
            },
            setup: CampaignSetup::new(),
            selected_countries: Vec::new(),
            origin: SetupOrigin::Custom,
            completed: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn current_step(&self) -> Option<WizardStep> {
        match self.state {
            WizardState::InProgress { step, .. } => Some(step),
            WizardState::Completed => None,
        }
    }

    pub fn country_index(&self) -> usize {
        match self.state {
            WizardState::InProgress { country_index, .. } => country_index,
            WizardState::Completed => self.completed.len().saturating_sub(1),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == WizardState::Completed
    }

    pub fn is_multi_country(&self) -> bool {
        self.selected_countries.len() > 1
    }

    /// Country being configured, once the country list is confirmed.
    pub fn current_country(&self) -> Option<&str> {
        self.selected_countries
            .get(self.country_index())
            .map(String::as_str)
    }

    pub fn setup(&self) -> &CampaignSetup {
        &self.setup
    }

    /// Mutable access for the presentation shell. Setters on the setup are
    /// permissive; gating happens in `next()`.
    pub fn setup_mut(&mut self) -> PlannerResult<&mut CampaignSetup> {
        if self.is_completed() {
            return Err(PlannerError::InvalidMutation(
                "wizard is completed".to_string(),
            ));
        }
        Ok(&mut self.setup)
    }

    pub fn completed_countries(&self) -> &[CountryCampaign] {
        &self.completed
    }

    /// The setup the live preview should estimate: narrowed to the current
    /// country while inside the per-country steps of a multi-country plan.
    pub fn active_setup(&self) -> CampaignSetup {
        match (self.state, self.current_country()) {
            (WizardState::InProgress { step, .. }, Some(country))
                if self.is_multi_country() && step.is_per_country() =>
            {
                self.setup.for_country(country)
            }
            _ => self.setup.clone(),
        }
    }

    /// Unmet requirements for a step's gate. Narrower than `validate()` for
    /// every step except `Review`.
    pub fn step_requirements(&self, step: WizardStep) -> Vec<ValidationIssue> {
        let setup = &self.setup;
        match step {
            WizardStep::Countries => setup.country_issues(),
            WizardStep::Budget => setup.budget_issues(),
            WizardStep::Duration => setup.duration_issues(),
            WizardStep::Platforms => setup.platform_selection_issues(),
            WizardStep::PlatformBudgets => setup.platform_budget_issues(),
            WizardStep::CampaignTypes | WizardStep::Content => Vec::new(),
            WizardStep::CampaignTypeBudgets => setup.campaign_type_budget_issues(),
            WizardStep::Review => self.active_setup().validate(),
        }
    }

    fn in_progress(&self) -> PlannerResult<(WizardStep, usize)> {
        match self.state {
            WizardState::InProgress {
                step,
                country_index,
            } => Ok((step, country_index)),
            WizardState::Completed => Err(PlannerError::InvalidTransition(
                "wizard is already completed".to_string(),
            )),
        }
    }

    // ─── Edges ──────────────────────────────────────────────────────────────

    /// Advance past the current step if its gate holds. At `Review` this
    /// finishes the current country (loop-back or completion).
    pub fn next(&mut self) -> PlannerResult<StepOutcome> {
        let (step, country_index) = self.in_progress()?;
        if step == WizardStep::LAST_PER_COUNTRY {
            return self.finish_country();
        }

        let issues = self.step_requirements(step);
        if !issues.is_empty() {
            info!(wizard_id = %self.id, ?step, issues = issues.len(), "Step gate not satisfied");
            return Ok(StepOutcome::Blocked(issues));
        }

        if step == WizardStep::Countries {
            self.selected_countries = self.setup.countries.clone();
        }

        let to = step.next().ok_or_else(|| {
            PlannerError::InvalidTransition(format!("no step after {step:?}"))
        })?;
        self.state = WizardState::InProgress {
            step: to,
            country_index,
        };
        info!(wizard_id = %self.id, from = ?step, ?to, country_index, "Wizard advanced");
        Ok(StepOutcome::Moved(Transition::Advance { from: step, to }))
    }

    /// Step back one screen. Floors at the first step, or at `Platforms`
    /// once an earlier country has been finished. Returns `None` at the floor.
    pub fn previous(&mut self) -> PlannerResult<Option<Transition>> {
        let (step, country_index) = self.in_progress()?;
        let floor = if country_index > 0 {
            WizardStep::FIRST_PER_COUNTRY
        } else {
            WizardStep::Countries
        };
        if step <= floor {
            return Ok(None);
        }
        let to = step.previous().unwrap_or(floor);
        self.state = WizardState::InProgress {
            step: to,
            country_index,
        };
        info!(wizard_id = %self.id, from = ?step, ?to, country_index, "Wizard went back");
        Ok(Some(Transition::Retreat { from: step, to }))
    }

    /// Overwrite the current country's platforms and campaign types with a
    /// deep copy of the previous country's. Countries, budget and duration
    /// are left alone.
    pub fn copy_previous_country_setup(&mut self) -> PlannerResult<()> {
        let (step, country_index) = self.in_progress()?;
        if country_index == 0 || !step.is_per_country() {
            warn!(wizard_id = %self.id, country_index, "No previous country to copy");
            return Err(PlannerError::InvalidMutation(
                "no previous country setup to copy".to_string(),
            ));
        }
        let country = self.current_country().unwrap_or_default().to_string();
        let previous = self.completed.get(country_index - 1).ok_or_else(|| {
            PlannerError::InvalidMutation(format!(
                "country {} has not been finished",
                country_index - 1
            ))
        })?;

        self.setup.platforms = previous.setup.clone_for_country(&country).platforms;
        self.origin = SetupOrigin::CopiedFromPrevious;
        info!(
            wizard_id = %self.id,
            from = %previous.country,
            to = %country,
            "Copied previous country setup"
        );
        Ok(())
    }

    /// Discard the current country's platform tree and start it from scratch.
    pub fn customize_country_setup(&mut self) -> PlannerResult<()> {
        let (step, _) = self.in_progress()?;
        if !step.is_per_country() {
            return Err(PlannerError::InvalidMutation(
                "country setup starts at the platforms step".to_string(),
            ));
        }
        self.setup.platforms.clear();
        self.origin = SetupOrigin::Custom;
        Ok(())
    }

    /// Snapshot the current country as a finished [`CountryCampaign`], then
    /// either loop back to `Platforms` for the next country or complete.
    /// Only valid at `Review`; blocked while the country's setup is incomplete.
    pub fn finish_country(&mut self) -> PlannerResult<StepOutcome> {
        let (step, country_index) = self.in_progress()?;
        if step != WizardStep::LAST_PER_COUNTRY {
            return Err(PlannerError::InvalidTransition(format!(
                "cannot finish a country from {step:?}"
            )));
        }
        let issues = self.step_requirements(step);
        if !issues.is_empty() {
            info!(wizard_id = %self.id, issues = issues.len(), "Country setup incomplete");
            return Ok(StepOutcome::Blocked(issues));
        }

        let country = self
            .selected_countries
            .get(country_index)
            .cloned()
            .ok_or_else(|| {
                PlannerError::InvalidTransition(format!("no country at index {country_index}"))
            })?;
        self.completed.push(CountryCampaign {
            country: country.clone(),
            origin: self.origin,
            setup: self.setup.for_country(&country),
            completed_at: Utc::now(),
        });

        let next_index = country_index + 1;
        let transition = match self.selected_countries.get(next_index) {
            Some(next_country) => {
                self.setup.platforms.clear();
                self.setup.content.clear();
                self.origin = SetupOrigin::Custom;
                self.state = WizardState::InProgress {
                    step: WizardStep::FIRST_PER_COUNTRY,
                    country_index: next_index,
                };
                Transition::LoopBackToNextCountry {
                    finished_country: country,
                    next_country: next_country.clone(),
                    next_index,
                }
            }
            None => {
                self.state = WizardState::Completed;
                Transition::Complete {
                    countries: self.completed.len(),
                }
            }
        };
        info!(wizard_id = %self.id, ?transition, "Country finished");
        Ok(StepOutcome::Moved(transition))
    }

    // ─── Estimation hooks ───────────────────────────────────────────────────

    /// Live estimate for whatever is being edited right now.
    pub fn preview(&self, engine: &EstimationEngine, table: &BenchmarkTable) -> EstimationResult {
        engine.estimate(&self.active_setup(), table)
    }

    /// Finished countries plus their estimates, once the wizard completes.
    pub fn submission(
        &self,
        engine: &EstimationEngine,
        table: &BenchmarkTable,
    ) -> Option<PlanSubmission> {
        self.is_completed().then(|| PlanSubmission {
            wizard_id: self.id,
            campaigns: self.completed.clone(),
            estimate: engine.estimate_plan(&self.completed, table),
        })
    }
}
