use core_upgrader_core::{DatabaseUpdatedPrerequisite, UpgradeContext, UpgradeWizard, WizardError};
use core_upgrader_store::tables::Pages;
use sea_query::{Asterisk, Cond, Expr, Func, Query, SqliteQueryBuilder};

use crate::helpers::exists;

/// "Parent of selected or current page".
const SHORTCUT_MODE_PARENT_PAGE: i64 = 3;

fn legacy_pages() -> Cond {
    Cond::all()
        .add(Expr::col(Pages::Shortcut).ne(0))
        .add(Expr::col(Pages::ShortcutMode).eq(SHORTCUT_MODE_PARENT_PAGE))
}

pub struct PageShortcutParent;

impl UpgradeWizard for PageShortcutParent {
    fn identifier(&self) -> &'static str {
        "pageShortcutParent"
    }

    fn title(&self) -> String {
        "Update page shortcuts with shortcut type \"Parent of selected or current page\"".to_string()
    }

    fn description(&self) -> String {
        "There are some shortcut pages that need to updated in order to preserve their current behaviour."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        exists(
            ctx,
            &Query::select()
                .expr(Func::count(Expr::col(Asterisk)))
                .from(Pages::Table)
                .cond_where(legacy_pages())
                .build(SqliteQueryBuilder),
        )
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        let updated = ctx.store.execute(
            &Query::update()
                .table(Pages::Table)
                .value(Pages::Shortcut, 0)
                .cond_where(legacy_pages())
                .build(SqliteQueryBuilder),
        )?;
        tracing::info!(pages = updated, "parent page shortcuts reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_support::single_i64;
    use core_upgrader_core::testing::TestHarness;

    #[test]
    fn parent_shortcuts_are_cleared() {
        let harness = TestHarness::with_schema();
        harness.execute(
            r#"
INSERT INTO pages (uid, title, shortcut, shortcut_mode) VALUES
  (1, 'parent shortcut', 12, 3),
  (2, 'first subpage', 12, 1),
  (3, 'already fine', 0, 3);
"#,
        );
        let ctx = harness.context();
        assert!(PageShortcutParent.update_necessary(&ctx).unwrap());

        PageShortcutParent.execute_update(&ctx).unwrap();

        assert_eq!(single_i64(&harness.store, "SELECT shortcut FROM pages WHERE uid = 1"), 0);
        assert_eq!(single_i64(&harness.store, "SELECT shortcut FROM pages WHERE uid = 2"), 12);
        assert!(!PageShortcutParent.update_necessary(&ctx).unwrap());
    }
}
