use core_upgrader_codec::CodecError;
use core_upgrader_store::StoreError;
use thiserror::Error;

/// Failure of a single wizard (or prerequisite check). Attached to the
/// wizard's result; never aborts the run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WizardError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
    #[error("configuration: {0}")]
    Configuration(String),
    #[error("provisioning: {0}")]
    Provisioning(String),
}

/// Runner configuration errors, returned before any wizard executes.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum UpgradeError {
    #[error("duplicate wizard identifier: {0}")]
    DuplicateIdentifier(String),
    #[error("unknown wizard: {0}")]
    UnknownWizard(String),
    #[error("run_after cycle between wizards: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}
