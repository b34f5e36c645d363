use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use core_upgrader_store::{Built, Row, Store};

use crate::confirmation::ConfirmationChannel;
use crate::context::UpgradeContext;
use crate::error::{UpgradeError, WizardError};
use crate::order;
use crate::prerequisite::{Prerequisite, default_prerequisites};
use crate::report::{ExecutionResult, Outcome, RunReport, SkipReason};
use crate::wizard::UpgradeWizard;

/// Where a wizard stands before anything runs (used by `list`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardStatus {
    PrerequisiteUnmet(Vec<String>),
    Necessary,
    NotNecessary,
    Error(String),
}

/// Drives a set of wizards against one context.
pub struct UpgradeRunner<'a> {
    context: UpgradeContext<'a>,
    confirmations: &'a dyn ConfirmationChannel,
    prerequisites: Vec<Box<dyn Prerequisite>>,
    ensure_prerequisites: bool,
}

type CapabilityCache = HashMap<&'static str, bool>;

impl<'a> UpgradeRunner<'a> {
    pub fn new(context: UpgradeContext<'a>, confirmations: &'a dyn ConfirmationChannel) -> Self {
        Self {
            context,
            confirmations,
            prerequisites: default_prerequisites(),
            ensure_prerequisites: false,
        }
    }

    pub fn with_prerequisite(mut self, prerequisite: Box<dyn Prerequisite>) -> Self {
        self.prerequisites
            .retain(|p| p.identifier() != prerequisite.identifier());
        self.prerequisites.push(prerequisite);
        self
    }

    /// Try to make unmet prerequisites true before skipping a wizard.
    pub fn ensure_prerequisites(mut self, ensure: bool) -> Self {
        self.ensure_prerequisites = ensure;
        self
    }

    /// Run the selected wizards (all when `selection` is empty).
    pub fn run<S: AsRef<str>>(
        &self,
        wizards: &[Box<dyn UpgradeWizard>],
        selection: &[S],
    ) -> Result<RunReport, UpgradeError> {
        order::check_unique(wizards)?;
        let selected = order::select(wizards, selection)?;
        let ordered = order::execution_order(wizards, &selected)?;

        let mut cache = CapabilityCache::new();
        let mut report = RunReport::start();
        for idx in ordered {
            let wizard = wizards[idx].as_ref();
            let result = self.run_one(wizard, &mut cache);
            match &result.outcome {
                Outcome::Succeeded => {
                    tracing::info!(wizard = wizard.identifier(), duration_ms = result.duration_ms, "wizard executed");
                }
                Outcome::Failed { error } => {
                    tracing::warn!(wizard = wizard.identifier(), %error, "wizard failed");
                }
                Outcome::Skipped { reason } => {
                    tracing::info!(wizard = wizard.identifier(), ?reason, "wizard skipped");
                }
            }
            report.push(result);
        }
        Ok(report.finish())
    }

    /// Prerequisite and necessity status of every wizard, without executing.
    pub fn status(
        &self,
        wizards: &[Box<dyn UpgradeWizard>],
    ) -> Result<Vec<(&'static str, WizardStatus)>, UpgradeError> {
        order::check_unique(wizards)?;
        let mut cache = CapabilityCache::new();
        Ok(wizards
            .iter()
            .map(|wizard| {
                let status = match self.unmet_prerequisites(wizard.as_ref(), &mut cache, false) {
                    Err(err) => WizardStatus::Error(err.to_string()),
                    Ok(unmet) if !unmet.is_empty() => WizardStatus::PrerequisiteUnmet(unmet),
                    Ok(_) => match wizard.update_necessary(&self.context) {
                        Ok(true) => WizardStatus::Necessary,
                        Ok(false) => WizardStatus::NotNecessary,
                        Err(err) => WizardStatus::Error(err.to_string()),
                    },
                };
                (wizard.identifier(), status)
            })
            .collect())
    }

    fn run_one(&self, wizard: &dyn UpgradeWizard, cache: &mut CapabilityCache) -> ExecutionResult {
        let started = Instant::now();
        let mut statements = Vec::new();
        let outcome = match self.evaluate(wizard, cache, &mut statements) {
            Ok(outcome) => outcome,
            Err(err) => Outcome::Failed {
                error: err.to_string(),
            },
        };
        ExecutionResult {
            identifier: wizard.identifier().to_string(),
            title: wizard.title(),
            outcome,
            statements,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn evaluate(
        &self,
        wizard: &dyn UpgradeWizard,
        cache: &mut CapabilityCache,
        statements: &mut Vec<String>,
    ) -> Result<Outcome, WizardError> {
        let unmet = self.unmet_prerequisites(wizard, cache, self.ensure_prerequisites)?;
        if !unmet.is_empty() {
            return Ok(skipped(SkipReason::PrerequisiteUnmet { prerequisites: unmet }));
        }
        if !wizard.update_necessary(&self.context)? {
            return Ok(skipped(SkipReason::NotNecessary));
        }
        if let Some(confirmation) = wizard.confirmation() {
            if !self.confirmations.confirm(wizard.identifier(), &confirmation) {
                return Ok(skipped(SkipReason::Unconfirmed));
            }
        }

        let recorder = RecordingStore::new(self.context.store);
        let result = wizard.execute_update(&self.context.with_store(&recorder));
        statements.extend(recorder.into_statements());
        // Any execution may have changed what the capabilities report.
        cache.clear();
        result.map(|()| Outcome::Succeeded)
    }

    /// Identifiers of prerequisites that do not hold. Unknown identifiers
    /// count as unmet.
    fn unmet_prerequisites(
        &self,
        wizard: &dyn UpgradeWizard,
        cache: &mut CapabilityCache,
        ensure: bool,
    ) -> Result<Vec<String>, WizardError> {
        let mut unmet = Vec::new();
        for identifier in wizard.prerequisites() {
            let Some(prerequisite) = self.prerequisites.iter().find(|p| p.identifier() == identifier)
            else {
                tracing::warn!(wizard = wizard.identifier(), prerequisite = identifier, "unknown prerequisite");
                unmet.push(identifier.to_string());
                continue;
            };
            let mut fulfilled = match cache.get(identifier) {
                Some(&fulfilled) => fulfilled,
                None => {
                    let fulfilled = prerequisite.is_fulfilled(&self.context)?;
                    cache.insert(identifier, fulfilled);
                    fulfilled
                }
            };
            if !fulfilled && ensure {
                tracing::info!(prerequisite = identifier, "ensuring prerequisite");
                prerequisite.ensure(&self.context)?;
                cache.clear();
                fulfilled = prerequisite.is_fulfilled(&self.context)?;
                cache.insert(identifier, fulfilled);
            }
            if !fulfilled {
                unmet.push(identifier.to_string());
            }
        }
        Ok(unmet)
    }
}

fn skipped(reason: SkipReason) -> Outcome {
    Outcome::Skipped { reason }
}

/// Store decorator that keeps the text of every statement passed through it.
struct RecordingStore<'a> {
    inner: &'a dyn Store,
    log: Mutex<Vec<String>>,
}

impl<'a> RecordingStore<'a> {
    fn new(inner: &'a dyn Store) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, sql: &str) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());
    }

    fn into_statements(self) -> Vec<String> {
        self.log.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for RecordingStore<'_> {
    fn query(&self, statement: &Built) -> core_upgrader_store::Result<Vec<Row>> {
        self.record(&statement.0);
        self.inner.query(statement)
    }

    fn execute(&self, statement: &Built) -> core_upgrader_store::Result<usize> {
        self.record(&statement.0);
        self.inner.execute(statement)
    }

    fn transaction(&self, statements: &[Built]) -> core_upgrader_store::Result<usize> {
        for statement in statements {
            self.record(&statement.0);
        }
        self.inner.transaction(statements)
    }

    fn table_columns(&self, table: &str) -> core_upgrader_store::Result<Vec<String>> {
        self.inner.table_columns(table)
    }

    fn execute_batch(&self, sql: &str) -> core_upgrader_store::Result<()> {
        self.record(sql);
        self.inner.execute_batch(sql)
    }
}
