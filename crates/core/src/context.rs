use core_upgrader_codec::{ConfigCodec, FlexFormCodec, PhpSerializeCodec};
use core_upgrader_store::Store;

use crate::error::WizardError;
use crate::local_config::LocalConfiguration;

/// Everything a wizard may touch, passed explicitly on every call.
#[derive(Clone, Copy)]
pub struct UpgradeContext<'a> {
    pub store: &'a dyn Store,
    /// Codec for serialized user settings (`be_users.uc`).
    pub serialized: &'a dyn ConfigCodec,
    /// Codec for content element options (`tt_content.pi_flexform`).
    pub flexform: &'a dyn ConfigCodec,
    pub extensions: &'a dyn ExtensionManager,
    pub local_configuration: &'a dyn LocalConfiguration,
}

impl<'a> UpgradeContext<'a> {
    /// Context with the bundled codecs.
    pub fn new(
        store: &'a dyn Store,
        extensions: &'a dyn ExtensionManager,
        local_configuration: &'a dyn LocalConfiguration,
    ) -> Self {
        Self {
            store,
            serialized: &PhpSerializeCodec,
            flexform: &FlexFormCodec,
            extensions,
            local_configuration,
        }
    }

    pub fn with_store(self, store: &'a dyn Store) -> Self {
        Self { store, ..self }
    }
}

/// Installable extension as described by a provisioning wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionModel {
    pub key: &'static str,
    pub title: &'static str,
    pub version: &'static str,
    pub composer_package: &'static str,
    pub description: &'static str,
}

/// Host extension registry.
pub trait ExtensionManager: Send + Sync {
    fn is_loaded(&self, key: &str) -> bool;

    /// Fetch and activate `extension`. On success `is_loaded` returns true.
    fn install(&self, extension: &ExtensionModel) -> Result<(), WizardError>;
}
