use core_upgrader_core::{DatabaseUpdatedPrerequisite, UpgradeContext, UpgradeWizard, WizardError};
use core_upgrader_store::Row;
use core_upgrader_store::tables::{SysWorkspace, SysWorkspaceStage};
use sea_query::{Asterisk, Cond, Expr, Func, Query, SqliteQueryBuilder};

use crate::helpers::exists;

const WORKSPACES: &str = "workspaces";

/// Preselection bits.
const OWNERS: i64 = 1;
const MEMBERS: i64 = 2;
const RESPONSIBLE_PERSONS: i64 = 8;

/// New settings bitmask from the legacy "allow notification settings" flag
/// and notification mode (0 = everybody preselected).
fn settings(allow: i64, mode: i64) -> i64 {
    let mut settings = 0;
    if allow != 0 {
        settings += 1;
    }
    if mode == 0 {
        settings += 2;
    }
    settings
}

fn legacy_workspaces() -> Cond {
    Cond::all().add(Expr::col(SysWorkspace::Deleted).eq(0)).add(
        Cond::any()
            .add(Expr::col(SysWorkspace::EditNotificationPreselection).eq(0))
            .add(Expr::col(SysWorkspace::PublishNotificationPreselection).eq(0))
            .add(Expr::col(SysWorkspace::ExecuteNotificationPreselection).eq(0)),
    )
}

fn legacy_stages() -> Cond {
    Cond::all()
        .add(Expr::col(SysWorkspaceStage::Deleted).eq(0))
        .add(Expr::col(SysWorkspaceStage::NotificationPreselection).eq(0))
}

fn migrate_workspace(ctx: &UpgradeContext<'_>, row: &Row) -> Result<(), WizardError> {
    let edit = settings(
        row.get_i64("edit_allow_notificaton_settings")?,
        row.get_i64("edit_notification_mode")?,
    );
    let publish = settings(
        row.get_i64("publish_allow_notificaton_settings")?,
        row.get_i64("publish_notification_mode")?,
    );
    ctx.store.execute(
        &Query::update()
            .table(SysWorkspace::Table)
            .values([
                (SysWorkspace::EditAllowNotificatonSettings, edit.into()),
                (SysWorkspace::EditNotificationPreselection, MEMBERS.into()),
                (SysWorkspace::PublishAllowNotificatonSettings, publish.into()),
                (SysWorkspace::PublishNotificationPreselection, OWNERS.into()),
                (SysWorkspace::ExecuteAllowNotificatonSettings, publish.into()),
                (SysWorkspace::ExecuteNotificationPreselection, (OWNERS + MEMBERS).into()),
            ])
            .and_where(Expr::col(SysWorkspace::Uid).eq(row.get_i64("uid")?))
            .build(SqliteQueryBuilder),
    )?;
    Ok(())
}

fn migrate_stage(ctx: &UpgradeContext<'_>, row: &Row) -> Result<(), WizardError> {
    let preselection = if row.get_opt_string("responsible_persons")?.is_some() {
        RESPONSIBLE_PERSONS
    } else {
        OWNERS + MEMBERS
    };
    let allow = settings(
        row.get_i64("allow_notificaton_settings")?,
        row.get_i64("notification_mode")?,
    );
    ctx.store.execute(
        &Query::update()
            .table(SysWorkspaceStage::Table)
            .values([
                (SysWorkspaceStage::AllowNotificatonSettings, allow.into()),
                (SysWorkspaceStage::NotificationPreselection, preselection.into()),
            ])
            .and_where(Expr::col(SysWorkspaceStage::Uid).eq(row.get_i64("uid")?))
            .build(SqliteQueryBuilder),
    )?;
    Ok(())
}

pub struct WorkspacesNotificationSettings;

impl UpgradeWizard for WorkspacesNotificationSettings {
    fn identifier(&self) -> &'static str {
        "workspacesNotificationSettings"
    }

    fn title(&self) -> String {
        "Migrate the workspaces notification settings to the enhanced schema".to_string()
    }

    fn description(&self) -> String {
        "The workspaces notification settings have been extended and need to be migrated to the \
         new definitions. This update wizard upgrades the accordant settings in the available \
         workspaces and stages."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        if !ctx.extensions.is_loaded(WORKSPACES) {
            return Ok(false);
        }
        let workspaces = Query::select()
            .expr(Func::count(Expr::col(Asterisk)))
            .from(SysWorkspace::Table)
            .cond_where(legacy_workspaces())
            .build(SqliteQueryBuilder);
        let stages = Query::select()
            .expr(Func::count(Expr::col(Asterisk)))
            .from(SysWorkspaceStage::Table)
            .cond_where(legacy_stages())
            .build(SqliteQueryBuilder);
        Ok(exists(ctx, &workspaces)? || exists(ctx, &stages)?)
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        let workspaces = ctx.store.query(
            &Query::select()
                .columns([
                    SysWorkspace::Uid,
                    SysWorkspace::EditAllowNotificatonSettings,
                    SysWorkspace::EditNotificationMode,
                    SysWorkspace::PublishAllowNotificatonSettings,
                    SysWorkspace::PublishNotificationMode,
                ])
                .from(SysWorkspace::Table)
                .cond_where(legacy_workspaces())
                .build(SqliteQueryBuilder),
        )?;
        for row in &workspaces {
            migrate_workspace(ctx, row)?;
        }

        let stages = ctx.store.query(
            &Query::select()
                .columns([
                    SysWorkspaceStage::Uid,
                    SysWorkspaceStage::ResponsiblePersons,
                    SysWorkspaceStage::AllowNotificatonSettings,
                    SysWorkspaceStage::NotificationMode,
                ])
                .from(SysWorkspaceStage::Table)
                .cond_where(legacy_stages())
                .build(SqliteQueryBuilder),
        )?;
        for row in &stages {
            migrate_stage(ctx, row)?;
        }
        tracing::info!(
            workspaces = workspaces.len(),
            stages = stages.len(),
            "workspace notification settings migrated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_support::rows;
    use core_upgrader_core::testing::TestHarness;

    fn harness() -> TestHarness {
        let harness = TestHarness::with_schema().with_extensions(&[WORKSPACES]);
        harness.execute(
            r#"
INSERT INTO sys_workspace (uid, title, deleted, edit_allow_notificaton_settings, edit_notification_mode,
                           publish_allow_notificaton_settings, publish_notification_mode) VALUES
  (1, 'draft', 0, 1, 0, 0, 1),
  (2, 'gone', 1, 1, 0, 1, 0);
INSERT INTO sys_workspace_stage (uid, title, deleted, responsible_persons, allow_notificaton_settings, notification_mode) VALUES
  (10, 'review', 0, 'be_users_3', 0, 0),
  (11, 'legal', 0, NULL, 1, 2);
"#,
        );
        harness
    }

    #[test]
    fn settings_bits_follow_legacy_flags() {
        assert_eq!(settings(1, 0), 3);
        assert_eq!(settings(1, 1), 1);
        assert_eq!(settings(0, 0), 2);
        assert_eq!(settings(0, 2), 0);
    }

    #[test]
    fn workspaces_and_stages_are_migrated() {
        let harness = harness();
        let ctx = harness.context();
        assert!(WorkspacesNotificationSettings.update_necessary(&ctx).unwrap());

        WorkspacesNotificationSettings.execute_update(&ctx).unwrap();

        let workspace = &rows(&harness.store, "SELECT * FROM sys_workspace WHERE uid = 1")[0];
        assert_eq!(workspace.get_i64("edit_allow_notificaton_settings").unwrap(), 3);
        assert_eq!(workspace.get_i64("edit_notification_preselection").unwrap(), 2);
        assert_eq!(workspace.get_i64("publish_allow_notificaton_settings").unwrap(), 0);
        assert_eq!(workspace.get_i64("publish_notification_preselection").unwrap(), 1);
        assert_eq!(workspace.get_i64("execute_allow_notificaton_settings").unwrap(), 0);
        assert_eq!(workspace.get_i64("execute_notification_preselection").unwrap(), 3);

        let deleted = &rows(&harness.store, "SELECT * FROM sys_workspace WHERE uid = 2")[0];
        assert_eq!(deleted.get_i64("edit_notification_preselection").unwrap(), 0);

        let review = &rows(&harness.store, "SELECT * FROM sys_workspace_stage WHERE uid = 10")[0];
        assert_eq!(review.get_i64("allow_notificaton_settings").unwrap(), 2);
        assert_eq!(review.get_i64("notification_preselection").unwrap(), 8);
        let legal = &rows(&harness.store, "SELECT * FROM sys_workspace_stage WHERE uid = 11")[0];
        assert_eq!(legal.get_i64("allow_notificaton_settings").unwrap(), 1);
        assert_eq!(legal.get_i64("notification_preselection").unwrap(), 3);

        assert!(!WorkspacesNotificationSettings.update_necessary(&ctx).unwrap());
    }

    #[test]
    fn requires_workspaces_extension() {
        let harness = TestHarness::with_schema();
        harness.execute("INSERT INTO sys_workspace (uid, title) VALUES (1, 'draft')");
        assert!(!WorkspacesNotificationSettings.update_necessary(&harness.context()).unwrap());
    }
}
