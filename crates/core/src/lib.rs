//! Upgrade wizard contract and runner.
//!
//! A wizard is a one-shot, idempotent migration. The [`UpgradeRunner`]
//! orders a set of wizards, resolves their prerequisites, asks each whether
//! it is needed, gates the ones that want confirmation and records every
//! outcome in a [`RunReport`].

pub mod confirmation;
pub mod context;
pub mod error;
pub mod local_config;
pub mod order;
pub mod prerequisite;
pub mod report;
pub mod runner;
pub mod wizard;

pub use confirmation::{ConfirmationChannel, PresetConfirmations};
pub use context::{ExtensionManager, ExtensionModel, UpgradeContext};
pub use error::{UpgradeError, WizardError};
pub use local_config::LocalConfiguration;
pub use prerequisite::{DatabaseUpdatedPrerequisite, Prerequisite};
pub use report::{ExecutionResult, Outcome, ReportSummary, RunReport, SkipReason};
pub use runner::{UpgradeRunner, WizardStatus};
pub use wizard::{Confirmation, UpgradeWizard};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
