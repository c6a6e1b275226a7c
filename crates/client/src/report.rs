//! Per-resource outcomes and their aggregation into phase and run reports.

use std::fmt;

/// What happened to a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Fetched from upstream and written.
    Fetched,
    /// Served from the output directory without a request.
    Reused,
    /// Upstream answered 404; nothing written.
    Skipped,
    /// Refresh failed; the previously cached copy stays in use.
    Stale,
}

/// Counts of outcomes for one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseReport {
    pub name: String,
    pub fetched: usize,
    pub reused: usize,
    pub skipped: usize,
    pub stale: usize,
}

impl PhaseReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Fetched => self.fetched += 1,
            Outcome::Reused => self.reused += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Stale => self.stale += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.fetched + self.reused + self.skipped + self.stale
    }

    /// Build a report from the outcomes of a completed phase.
    pub fn from_outcomes(name: impl Into<String>, outcomes: impl IntoIterator<Item = Outcome>) -> Self {
        let mut report = Self::new(name);
        outcomes.into_iter().for_each(|o| report.record(o));
        report
    }
}

impl fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} resources ({} fetched, {} reused, {} skipped, {} stale)",
            self.name,
            self.total(),
            self.fetched,
            self.reused,
            self.skipped,
            self.stale
        )
    }
}

/// Summary of a complete mirror run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub phases: Vec<PhaseReport>,
    /// Requests issued to the upstream, retries included.
    pub requests: u64,
}

impl RunReport {
    pub fn phase(&self, name: &str) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.name == name)
    }

    pub fn total(&self) -> PhaseReport {
        let mut total = PhaseReport::new("total");
        for phase in &self.phases {
            total.fetched += phase.fetched;
            total.reused += phase.reused;
            total.skipped += phase.skipped;
            total.stale += phase.stale;
        }
        total
    }
}
