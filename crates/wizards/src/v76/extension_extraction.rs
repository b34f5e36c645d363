//! Extensions that left the core and must now be installed separately.

use core_upgrader_core::{
    Confirmation, DatabaseUpdatedPrerequisite, ExtensionModel, UpgradeContext, UpgradeWizard,
    WizardError,
};

const COMPATIBILITY6: ExtensionModel = ExtensionModel {
    key: "compatibility6",
    title: "Compatibility Mode for TYPO3 v6",
    version: "7.6.4",
    composer_package: "friendsoftypo3/compatibility6",
    description: "Provides an additional backwards-compatibility layer with legacy functionality \
                  for sites that haven't fully migrated to TYPO3 CMS 7 yet.",
};

const OPENID: ExtensionModel = ExtensionModel {
    key: "openid",
    title: "OpenID authentication",
    version: "7.6.4",
    composer_package: "friendsoftypo3/openid",
    description: "Adds OpenID authentication to TYPO3",
};

const OPENID_COLUMN: &str = "tx_openid_openid";

fn install(ctx: &UpgradeContext<'_>, extension: &ExtensionModel) -> Result<(), WizardError> {
    if ctx.extensions.is_loaded(extension.key) {
        return Ok(());
    }
    ctx.extensions.install(extension)?;
    tracing::info!(
        extension = extension.key,
        package = extension.composer_package,
        version = extension.version,
        "extension installed"
    );
    Ok(())
}

pub struct Compatibility6Extension;

impl UpgradeWizard for Compatibility6Extension {
    fn identifier(&self) -> &'static str {
        "compatibility6Extension"
    }

    fn title(&self) -> String {
        "Install compatibility extension for TYPO3 6 compatibility".to_string()
    }

    fn description(&self) -> String {
        format!(
            "The extension \"{}\" ({}) was extracted into the TYPO3 Extension Repository. \
             This update downloads the TYPO3 Extension from the TER.",
            COMPATIBILITY6.key, COMPATIBILITY6.title
        )
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn confirmation(&self) -> Option<Confirmation> {
        Some(Confirmation::new(
            "Are you sure?",
            format!(
                "The compatibility extensions come with a performance penalty, use only if needed. {}",
                COMPATIBILITY6.description
            ),
        ))
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        Ok(!ctx.extensions.is_loaded(COMPATIBILITY6.key))
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        install(ctx, &COMPATIBILITY6)
    }
}

pub struct OpenidExtraction;

impl UpgradeWizard for OpenidExtraction {
    fn identifier(&self) -> &'static str {
        "OpenidExtraction"
    }

    fn title(&self) -> String {
        "Installs extension \"openid\" from TER if openid is used.".to_string()
    }

    fn description(&self) -> String {
        "The extension \"openid\" (OpenID authentication) was extracted into the TYPO3 Extension \
         Repository. This update checks if openid is used and downloads the TYPO3 Extension from the TER."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn confirmation(&self) -> Option<Confirmation> {
        Some(Confirmation::new("Are you sure?", OPENID.description))
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        if ctx.extensions.is_loaded(OPENID.key) {
            return Ok(false);
        }
        Ok(ctx.store.has_column("fe_users", OPENID_COLUMN)?
            || ctx.store.has_column("be_users", OPENID_COLUMN)?)
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        install(ctx, &OPENID)
    }
}
