use crate::context::UpgradeContext;
use crate::error::WizardError;

/// Question shown to the operator before a wizard with consequences runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub title: String,
    pub message: String,
    /// Preselected answer when prompting.
    pub default_value: bool,
    pub confirm_label: String,
    pub deny_label: String,
}

impl Confirmation {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            default_value: false,
            confirm_label: "Yes".to_string(),
            deny_label: "No".to_string(),
        }
    }

    pub fn labels(mut self, confirm: impl Into<String>, deny: impl Into<String>) -> Self {
        self.confirm_label = confirm.into();
        self.deny_label = deny.into();
        self
    }

    pub fn default_value(mut self, value: bool) -> Self {
        self.default_value = value;
        self
    }
}

/// One-shot, idempotent data migration.
///
/// Implementations are stateless: everything they need arrives through the
/// [`UpgradeContext`]. `update_necessary` must be read-only and must turn
/// false once `execute_update` has succeeded.
pub trait UpgradeWizard: Send + Sync {
    /// Stable, permanent identifier. Never reuse or rename.
    fn identifier(&self) -> &'static str;

    fn title(&self) -> String;

    fn description(&self) -> String;

    /// Capability identifiers that must hold before the wizard is considered.
    fn prerequisites(&self) -> Vec<&'static str>;

    fn confirmation(&self) -> Option<Confirmation> {
        None
    }

    /// Wizards that must run first when both are selected. Ordering only.
    fn run_after(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError>;

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError>;
}
