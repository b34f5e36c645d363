use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a wizard was not executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    PrerequisiteUnmet { prerequisites: Vec<String> },
    NotNecessary,
    Unconfirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Skipped { reason: SkipReason },
    Succeeded,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub identifier: String,
    pub title: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Statement text issued while executing, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Result of one runner pass, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub results: Vec<ExecutionResult>,
}

impl RunReport {
    pub(crate) fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            summary: ReportSummary::default(),
            results: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, result: ExecutionResult) {
        self.summary.total += 1;
        match result.outcome {
            Outcome::Skipped { .. } => self.summary.skipped += 1,
            Outcome::Succeeded => self.summary.succeeded += 1,
            Outcome::Failed { .. } => self.summary.failed += 1,
        }
        self.results.push(result);
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    pub fn result(&self, identifier: &str) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| r.identifier == identifier)
    }

    pub fn outcome(&self, identifier: &str) -> Option<&Outcome> {
        self.result(identifier).map(|r| &r.outcome)
    }
}
