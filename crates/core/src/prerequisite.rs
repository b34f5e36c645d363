use core_upgrader_store::schema::{self, TableDefinition};

use crate::context::UpgradeContext;
use crate::error::WizardError;

/// Named external condition a wizard depends on.
pub trait Prerequisite: Send + Sync {
    fn identifier(&self) -> &'static str;

    fn title(&self) -> String;

    fn is_fulfilled(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError>;

    /// Make the condition true. Only called when the runner is asked to.
    fn ensure(&self, _ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        Err(WizardError::Configuration(format!(
            "prerequisite `{}` cannot be ensured automatically",
            self.identifier()
        )))
    }
}

/// Prerequisites known to the runner by default.
pub fn default_prerequisites() -> Vec<Box<dyn Prerequisite>> {
    vec![Box::new(DatabaseUpdatedPrerequisite)]
}

/// Every table and column of [`schema::TABLES`] is present. Tables shipped
/// by an extension only count while that extension is loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatabaseUpdatedPrerequisite;

impl DatabaseUpdatedPrerequisite {
    pub const IDENTIFIER: &'static str = "databaseUpdated";

    /// DDL needed to bring the store up to the expected schema.
    pub fn pending_changes(&self, ctx: &UpgradeContext<'_>) -> Result<Vec<String>, WizardError> {
        let mut changes = Vec::new();
        let required = schema::TABLES
            .iter()
            .filter(|table| table.extension.is_none_or(|key| ctx.extensions.is_loaded(key)));
        for table in required {
            changes.extend(missing_ddl(ctx, table)?);
        }
        Ok(changes)
    }
}

fn missing_ddl(ctx: &UpgradeContext<'_>, table: &TableDefinition) -> Result<Vec<String>, WizardError> {
    let existing = ctx.store.table_columns(table.name)?;
    if existing.is_empty() {
        return Ok(vec![table.create_statement()]);
    }
    Ok(table
        .columns
        .iter()
        .filter(|column| !existing.iter().any(|name| name == column.name))
        .map(|column| column.add_statement(table.name))
        .collect())
}

impl Prerequisite for DatabaseUpdatedPrerequisite {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn title(&self) -> String {
        "Database schema is up to date".to_string()
    }

    fn is_fulfilled(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        Ok(self.pending_changes(ctx)?.is_empty())
    }

    fn ensure(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        let changes = self.pending_changes(ctx)?;
        for ddl in &changes {
            ctx.store.execute_batch(ddl)?;
        }
        tracing::info!(statements = changes.len(), "database schema updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_upgrader_store::Store;
    use crate::testing::TestHarness;

    #[test]
    fn complete_schema_is_fulfilled() {
        let harness = TestHarness::with_schema();
        let ctx = harness.context();
        assert!(DatabaseUpdatedPrerequisite.is_fulfilled(&ctx).unwrap());
        assert!(DatabaseUpdatedPrerequisite.pending_changes(&ctx).unwrap().is_empty());
    }

    #[test]
    fn ensure_creates_tables_and_columns() {
        let harness = TestHarness::empty();
        harness
            .store
            .execute_batch("CREATE TABLE pages (uid INTEGER PRIMARY KEY AUTOINCREMENT, pid INTEGER NOT NULL DEFAULT 0)")
            .unwrap();
        let ctx = harness.context();

        let pending = DatabaseUpdatedPrerequisite.pending_changes(&ctx).unwrap();
        assert!(pending.iter().any(|ddl| ddl.contains("ALTER TABLE \"pages\" ADD COLUMN \"shortcut\"")));
        assert!(pending.iter().any(|ddl| ddl.starts_with("CREATE TABLE IF NOT EXISTS \"tt_content\"")));
        assert!(!DatabaseUpdatedPrerequisite.is_fulfilled(&ctx).unwrap());

        DatabaseUpdatedPrerequisite.ensure(&ctx).unwrap();
        assert!(DatabaseUpdatedPrerequisite.is_fulfilled(&ctx).unwrap());
    }

    #[test]
    fn tables_of_unloaded_extensions_are_not_required() {
        let harness = TestHarness::with_schema();
        harness.execute("DROP TABLE sys_workspace; DROP TABLE sys_workspace_stage; DROP TABLE static_languages;");
        let ctx = harness.context();

        assert!(DatabaseUpdatedPrerequisite.is_fulfilled(&ctx).unwrap());
        DatabaseUpdatedPrerequisite.ensure(&ctx).unwrap();
        assert!(harness.store.table_columns("sys_workspace").unwrap().is_empty());
    }

    #[test]
    fn tables_of_loaded_extensions_are_required() {
        let harness = TestHarness::with_schema().with_extensions(&["workspaces"]);
        harness.execute("DROP TABLE sys_workspace_stage;");
        let ctx = harness.context();

        let pending = DatabaseUpdatedPrerequisite.pending_changes(&ctx).unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].starts_with("CREATE TABLE IF NOT EXISTS \"sys_workspace_stage\""));

        DatabaseUpdatedPrerequisite.ensure(&ctx).unwrap();
        assert!(DatabaseUpdatedPrerequisite.is_fulfilled(&ctx).unwrap());
    }
}
