//! Backend users whose serialized settings still name a renamed start module.

use core_upgrader_core::{DatabaseUpdatedPrerequisite, UpgradeContext, UpgradeWizard, WizardError};
use core_upgrader_store::tables::BeUsers;
use sea_query::{Expr, Query, SqliteQueryBuilder};
use serde_json::Value;

const START_MODULE: &str = "startModule";

/// Users whose decoded `uc` has `startModule == from`, with the decoded settings.
fn legacy_users(ctx: &UpgradeContext<'_>, from: &str) -> Result<Vec<(i64, Value)>, WizardError> {
    let rows = ctx.store.query(
        &Query::select()
            .columns([BeUsers::Uid, BeUsers::Uc])
            .from(BeUsers::Table)
            .and_where(Expr::col(BeUsers::Uc).like(format!("%{START_MODULE}%")))
            .build(SqliteQueryBuilder),
    )?;

    let mut users = Vec::new();
    for row in rows {
        let uid = row.get_i64("uid")?;
        let Some(uc) = row.get_opt_string("uc")? else {
            continue;
        };
        match ctx.serialized.decode(&uc) {
            Ok(settings) => {
                if settings.get(START_MODULE).and_then(Value::as_str) == Some(from) {
                    users.push((uid, settings));
                }
            }
            Err(err) => {
                tracing::warn!(uid, error = %err, "skipping backend user with unreadable settings");
            }
        }
    }
    Ok(users)
}

fn replace_start_module(ctx: &UpgradeContext<'_>, from: &str, to: &str) -> Result<(), WizardError> {
    for (uid, mut settings) in legacy_users(ctx, from)? {
        if let Some(map) = settings.as_object_mut() {
            map.insert(START_MODULE.to_string(), Value::String(to.to_string()));
        }
        let encoded = match ctx.serialized.encode(&settings) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(uid, error = %err, "cannot re-encode backend user settings");
                continue;
            }
        };
        ctx.store.execute(
            &Query::update()
                .table(BeUsers::Table)
                .value(BeUsers::Uc, encoded)
                .and_where(Expr::col(BeUsers::Uid).eq(uid))
                .build(SqliteQueryBuilder),
        )?;
    }
    Ok(())
}

pub struct BackendUserStartModule;

impl BackendUserStartModule {
    const FROM: &'static str = "help_aboutmodules";
    const TO: &'static str = "help_AboutmodulesAboutmodules";
}

impl UpgradeWizard for BackendUserStartModule {
    fn identifier(&self) -> &'static str {
        "backendUserStartModule"
    }

    fn title(&self) -> String {
        "Update backend user setting \"startModule\"".to_string()
    }

    fn description(&self) -> String {
        "The backend user setting startModule is changed for the extension aboutmodules. \
         Update all backend users that use ext:aboutmodules as startModule."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        Ok(!legacy_users(ctx, Self::FROM)?.is_empty())
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        replace_start_module(ctx, Self::FROM, Self::TO)
    }
}

pub struct FileListIsStartModule;

impl FileListIsStartModule {
    const FROM: &'static str = "file_list";
    const TO: &'static str = "file_FilelistList";
}

impl UpgradeWizard for FileListIsStartModule {
    fn identifier(&self) -> &'static str {
        "fileListIsStartModule"
    }

    fn title(&self) -> String {
        "Update filelist user setting \"startModule\"".to_string()
    }

    fn description(&self) -> String {
        "The backend user setting startModule is changed for the extension filelist. \
         Update all backend users that use ext:filelist as startModule."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        Ok(!legacy_users(ctx, Self::FROM)?.is_empty())
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        replace_start_module(ctx, Self::FROM, Self::TO)
    }
}
