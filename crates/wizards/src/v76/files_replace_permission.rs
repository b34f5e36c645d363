use core_upgrader_core::{DatabaseUpdatedPrerequisite, UpgradeContext, UpgradeWizard, WizardError};
use core_upgrader_store::tables::{BeGroups, BeUsers};
use sea_query::{Cond, Expr, Iden, Query, SqliteQueryBuilder};

fn missing_replace(field: impl Iden + Copy + 'static) -> Cond {
    Cond::all()
        .add(Expr::col(field).like("%writeFile%"))
        .add(Expr::col(field).not_like("%replaceFile%"))
}

fn legacy_rows<T>(ctx: &UpgradeContext<'_>, table: T, uid: T, field: T) -> Result<Vec<(i64, String)>, WizardError>
where
    T: Iden + Copy + 'static,
{
    let (uid_name, field_name) = (uid.to_string(), field.to_string());
    let rows = ctx.store.query(
        &Query::select()
            .columns([uid, field])
            .from(table)
            .cond_where(missing_replace(field))
            .build(SqliteQueryBuilder),
    )?;
    rows.iter()
        .map(|row| -> Result<(i64, String), WizardError> {
            Ok((row.get_i64(&uid_name)?, row.get_string(&field_name)?))
        })
        .collect()
}

fn grant_replace<T>(ctx: &UpgradeContext<'_>, table: T, uid: T, field: T) -> Result<(), WizardError>
where
    T: Iden + Copy + 'static,
{
    for (id, permissions) in legacy_rows(ctx, table, uid, field)? {
        ctx.store.execute(
            &Query::update()
                .table(table)
                .value(field, format!("{permissions},replaceFile"))
                .and_where(Expr::col(uid).eq(id))
                .build(SqliteQueryBuilder),
        )?;
    }
    Ok(())
}

pub struct FilesReplacePermission;

impl UpgradeWizard for FilesReplacePermission {
    fn identifier(&self) -> &'static str {
        "filesReplacePermission"
    }

    fn title(&self) -> String {
        "Set the \"Files:replace\" permission for all BE user/groups with \"Files:write\" set".to_string()
    }

    fn description(&self) -> String {
        "A new file permission was introduced regarding replacing files. \
         This update sets \"Files:replace\" for all BE users/groups with the permission \"Files:write\"."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        Ok(
            !legacy_rows(ctx, BeUsers::Table, BeUsers::Uid, BeUsers::FilePermissions)?.is_empty()
                || !legacy_rows(ctx, BeGroups::Table, BeGroups::Uid, BeGroups::FilePermissions)?
                    .is_empty(),
        )
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        grant_replace(ctx, BeGroups::Table, BeGroups::Uid, BeGroups::FilePermissions)?;
        grant_replace(ctx, BeUsers::Table, BeUsers::Uid, BeUsers::FilePermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_support::single_string;
    use core_upgrader_core::testing::TestHarness;

    #[test]
    fn write_permission_gains_replace() {
        let harness = TestHarness::with_schema();
        harness.execute(
            r#"
INSERT INTO be_groups (uid, title, file_permissions) VALUES
  (1, 'writers', 'readFolder,writeFile'),
  (2, 'readers', 'readFolder,readFile'),
  (3, 'done', 'writeFile,replaceFile');
INSERT INTO be_users (uid, username, file_permissions) VALUES (5, 'jane', 'writeFile');
"#,
        );
        let ctx = harness.context();
        assert!(FilesReplacePermission.update_necessary(&ctx).unwrap());

        FilesReplacePermission.execute_update(&ctx).unwrap();

        let permissions = |sql: &str| single_string(&harness.store, sql);
        assert_eq!(
            permissions("SELECT file_permissions FROM be_groups WHERE uid = 1").as_deref(),
            Some("readFolder,writeFile,replaceFile")
        );
        assert_eq!(
            permissions("SELECT file_permissions FROM be_groups WHERE uid = 2").as_deref(),
            Some("readFolder,readFile")
        );
        assert_eq!(
            permissions("SELECT file_permissions FROM be_groups WHERE uid = 3").as_deref(),
            Some("writeFile,replaceFile")
        );
        assert_eq!(
            permissions("SELECT file_permissions FROM be_users WHERE uid = 5").as_deref(),
            Some("writeFile,replaceFile")
        );
        assert!(!FilesReplacePermission.update_necessary(&ctx).unwrap());
    }
}
