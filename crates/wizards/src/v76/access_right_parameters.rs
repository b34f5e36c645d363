use core_upgrader_core::{UpgradeContext, UpgradeWizard, WizardError};

/// Access right settings that moved from `BE` to `SYS`.
const MOVED_SETTINGS: [(&str, &str); 3] = [
    ("BE/fileCreateMask", "SYS/fileCreateMask"),
    ("BE/folderCreateMask", "SYS/folderCreateMask"),
    ("BE/createGroup", "SYS/createGroup"),
];

pub struct AccessRightParameters;

impl UpgradeWizard for AccessRightParameters {
    fn identifier(&self) -> &'static str {
        "accessRightParameters"
    }

    fn title(&self) -> String {
        "Move access right parameters configuration to \"SYS\" section".to_string()
    }

    fn description(&self) -> String {
        "Some access right parameters were moved from the \"BE\" to the \"SYS\" configuration section. \
         The update wizard moves the settings to the new configuration destination."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        Ok(MOVED_SETTINGS
            .iter()
            .any(|(old, _)| ctx.local_configuration.get(old).is_some()))
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        for (old, new) in MOVED_SETTINGS {
            if let Some(value) = ctx.local_configuration.get(old) {
                ctx.local_configuration.set(new, value)?;
            }
        }
        let old_paths: Vec<&str> = MOVED_SETTINGS.iter().map(|(old, _)| *old).collect();
        ctx.local_configuration.remove(&old_paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_upgrader_core::LocalConfiguration;
    use core_upgrader_core::testing::TestHarness;
    use toml::Value;

    const LEGACY: &str = r#"
[BE]
fileCreateMask = "0664"
createGroup = "www-data"
lockSSL = true

[SYS]
sitename = "demo"
"#;

    #[test]
    fn moves_settings_and_becomes_unnecessary() {
        let harness = TestHarness::with_schema().with_local_configuration(LEGACY);
        let ctx = harness.context();
        assert!(AccessRightParameters.update_necessary(&ctx).unwrap());

        AccessRightParameters.execute_update(&ctx).unwrap();

        let config = &harness.local_configuration;
        assert_eq!(config.get("SYS/fileCreateMask"), Some(Value::String("0664".into())));
        assert_eq!(config.get("SYS/createGroup"), Some(Value::String("www-data".into())));
        assert!(config.get("SYS/folderCreateMask").is_none());
        assert!(config.get("BE/fileCreateMask").is_none());
        assert!(config.get("BE/createGroup").is_none());
        assert_eq!(config.get("BE/lockSSL"), Some(Value::Boolean(true)));
        assert!(!AccessRightParameters.update_necessary(&ctx).unwrap());
    }

    #[test]
    fn nothing_to_move_is_not_necessary() {
        let harness = TestHarness::with_schema().with_local_configuration("[SYS]\nsitename = \"demo\"\n");
        assert!(!AccessRightParameters.update_necessary(&harness.context()).unwrap());
    }
}
