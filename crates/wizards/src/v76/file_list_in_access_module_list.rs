use core_upgrader_core::{DatabaseUpdatedPrerequisite, UpgradeContext, UpgradeWizard, WizardError};
use core_upgrader_store::tables::{BeGroups, BeUsers};
use sea_query::{Expr, Iden, Query, SqliteQueryBuilder};

use crate::helpers::{contains_item, split_list};

const LEGACY_MODULE: &str = "file_list";
const RENAMED_MODULE: &str = "file_FilelistList";
const REMOVED_MODULE: &str = "file";

/// Rename the file list module in a module access list and drop the old
/// `file` main module entry.
pub fn migrate_module_list(list: &str) -> String {
    let mut modules: Vec<&str> = Vec::new();
    for module in split_list(list) {
        let module = if module == LEGACY_MODULE {
            RENAMED_MODULE
        } else {
            module
        };
        if module != REMOVED_MODULE && !modules.contains(&module) {
            modules.push(module);
        }
    }
    modules.join(",")
}

fn legacy_rows<T>(ctx: &UpgradeContext<'_>, table: T, uid: T, field: T) -> Result<Vec<(i64, String)>, WizardError>
where
    T: Iden + Copy + 'static,
{
    let uid_name = uid.to_string();
    let field_name = field.to_string();
    let rows = ctx.store.query(
        &Query::select()
            .columns([uid, field])
            .from(table)
            .and_where(Expr::col(field).like(format!("%{LEGACY_MODULE}%")))
            .build(SqliteQueryBuilder),
    )?;
    let mut legacy = Vec::new();
    for row in rows {
        let modules = row.get_string(&field_name)?;
        if contains_item(&modules, LEGACY_MODULE) {
            legacy.push((row.get_i64(&uid_name)?, modules));
        }
    }
    Ok(legacy)
}

fn migrate_table<T>(ctx: &UpgradeContext<'_>, table: T, uid: T, field: T) -> Result<usize, WizardError>
where
    T: Iden + Copy + 'static,
{
    let rows = legacy_rows(ctx, table, uid, field)?;
    for (id, modules) in &rows {
        ctx.store.execute(
            &Query::update()
                .table(table)
                .value(field, migrate_module_list(modules))
                .and_where(Expr::col(uid).eq(*id))
                .build(SqliteQueryBuilder),
        )?;
    }
    Ok(rows.len())
}

pub struct FileListInAccessModuleList;

impl UpgradeWizard for FileListInAccessModuleList {
    fn identifier(&self) -> &'static str {
        "fileListInAccessModuleList"
    }

    fn title(&self) -> String {
        "Update module access to file list module".to_string()
    }

    fn description(&self) -> String {
        "The module name of the file list module has been changed. Update the access list \
         of all backend groups and users where this module is available."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        Ok(
            !legacy_rows(ctx, BeGroups::Table, BeGroups::Uid, BeGroups::GroupMods)?.is_empty()
                || !legacy_rows(ctx, BeUsers::Table, BeUsers::Uid, BeUsers::UserMods)?.is_empty(),
        )
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        let groups = migrate_table(ctx, BeGroups::Table, BeGroups::Uid, BeGroups::GroupMods)?;
        let users = migrate_table(ctx, BeUsers::Table, BeUsers::Uid, BeUsers::UserMods)?;
        tracing::info!(groups, users, "module access lists updated");
        Ok(())
    }
}
