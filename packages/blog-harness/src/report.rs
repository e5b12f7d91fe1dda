//! Scenario outcomes and the suite summary.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::HarnessError;
use crate::orchestrator::ScenarioPhase;

/// Result of one scenario.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub name: String,
    /// Phases reached, in order
    pub phases: Vec<ScenarioPhase>,
    /// Seeding or body failure
    pub failure: Option<HarnessError>,
    pub teardown_failure: Option<HarnessError>,
    pub duration: Duration,
}

impl ScenarioOutcome {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            phases: Vec::new(),
            failure: None,
            teardown_failure: None,
            duration: Duration::ZERO,
        }
    }

    pub(crate) fn finish(mut self, started: Instant) -> Self {
        self.duration = started.elapsed();
        self
    }

    pub fn passed(&self) -> bool {
        self.failure.is_none() && self.teardown_failure.is_none()
    }

    /// True when the scenario never ran because isolation was broken.
    pub fn skipped(&self) -> bool {
        matches!(self.failure, Some(HarnessError::IsolationBroken(_)))
    }

    pub fn reached(&self, phase: ScenarioPhase) -> bool {
        self.phases.contains(&phase)
    }
}

/// Outcomes of a suite run, in execution order.
#[derive(Debug)]
pub struct SuiteReport {
    pub database: String,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl SuiteReport {
    pub fn new(database: String) -> Self {
        Self {
            database,
            outcomes: Vec::new(),
        }
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn outcome(&self, name: &str) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// `Ok(self)` when every scenario passed, `SuiteFailed` otherwise.
    pub fn into_result(self) -> Result<Self, HarnessError> {
        if self.all_passed() {
            Ok(self)
        } else {
            Err(HarnessError::SuiteFailed {
                failed: self.failed(),
                total: self.outcomes.len(),
            })
        }
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "suite against '{}'", self.database)?;
        for outcome in &self.outcomes {
            let millis = outcome.duration.as_millis();
            match (&outcome.failure, &outcome.teardown_failure) {
                (None, None) => writeln!(f, "  ok   {} ({}ms)", outcome.name, millis)?,
                (Some(e), _) if outcome.skipped() => writeln!(f, "  skip {}: {}", outcome.name, e)?,
                (Some(e), _) => writeln!(f, "  FAIL {} ({}ms): {}", outcome.name, millis, e)?,
                (None, Some(_)) => writeln!(f, "  FAIL {} ({}ms)", outcome.name, millis)?,
            }
            if let Some(e) = &outcome.teardown_failure {
                writeln!(f, "       teardown: {}", e)?;
            }
        }
        write!(
            f,
            "{} passed, {} failed, {} total",
            self.passed(),
            self.failed(),
            self.outcomes.len()
        )
    }
}
