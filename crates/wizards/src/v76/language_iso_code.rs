use core_upgrader_core::{DatabaseUpdatedPrerequisite, UpgradeContext, UpgradeWizard, WizardError};
use core_upgrader_store::tables::{StaticLanguages, SysLanguage};
use sea_query::{Cond, Expr, Query, SelectStatement, SqliteQueryBuilder};

const STATIC_INFO_TABLES: &str = "static_info_tables";

/// Languages with an empty ISO code that point at a static language record
/// carrying one.
fn migratable() -> SelectStatement {
    Query::select()
        .column((SysLanguage::Table, SysLanguage::Uid))
        .column((StaticLanguages::Table, StaticLanguages::LgIso2))
        .from(SysLanguage::Table)
        .inner_join(
            StaticLanguages::Table,
            Expr::col((StaticLanguages::Table, StaticLanguages::Uid))
                .equals((SysLanguage::Table, SysLanguage::StaticLangIsocode)),
        )
        .cond_where(
            Cond::all()
                .add(Expr::col((SysLanguage::Table, SysLanguage::LanguageIsocode)).eq(""))
                .add(Expr::col((StaticLanguages::Table, StaticLanguages::LgIso2)).ne("")),
        )
        .to_owned()
}

pub struct LanguageIsoCode;

impl UpgradeWizard for LanguageIsoCode {
    fn identifier(&self) -> &'static str {
        "languageIsoCode"
    }

    fn title(&self) -> String {
        "Update sys_language records to use new ISO 639-1 letter-code field".to_string()
    }

    fn description(&self) -> String {
        "The sys_language records have a new iso code field which removes the dependency of the \
         core to the extension \"static_info_tables\". This upgrade wizard migrates the data of \
         the existing \"static_lang_isocode\" field to the new DB field."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        if !ctx.extensions.is_loaded(STATIC_INFO_TABLES) {
            return Ok(false);
        }
        let rows = ctx
            .store
            .query(&migratable().limit(1).build(SqliteQueryBuilder))?;
        Ok(!rows.is_empty())
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        let rows = ctx.store.query(&migratable().build(SqliteQueryBuilder))?;
        for row in rows {
            let uid = row.get_i64("uid")?;
            let iso_code = row.get_string("lg_iso_2")?.to_lowercase();
            ctx.store.execute(
                &Query::update()
                    .table(SysLanguage::Table)
                    .value(SysLanguage::LanguageIsocode, iso_code)
                    .and_where(Expr::col(SysLanguage::Uid).eq(uid))
                    .build(SqliteQueryBuilder),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_support::{single_string, snapshot};
    use core_upgrader_core::testing::TestHarness;

    fn harness(extensions: &[&str]) -> TestHarness {
        let harness = TestHarness::with_schema().with_extensions(extensions);
        harness.execute(
            r#"
INSERT INTO static_languages (uid, lg_iso_2) VALUES (30, 'DE'), (31, '');
INSERT INTO sys_language (uid, title, language_isocode, static_lang_isocode) VALUES
  (1, 'German', '', 30),
  (2, 'Klingon', '', 31),
  (3, 'French', 'fr', 0);
"#,
        );
        harness
    }

    #[test]
    fn iso_code_is_copied_lower_case() {
        let harness = harness(&[STATIC_INFO_TABLES]);
        let ctx = harness.context();
        assert!(LanguageIsoCode.update_necessary(&ctx).unwrap());

        LanguageIsoCode.execute_update(&ctx).unwrap();

        let code = |uid: i64| {
            single_string(
                &harness.store,
                &format!("SELECT language_isocode FROM sys_language WHERE uid = {uid}"),
            )
        };
        assert_eq!(code(1).as_deref(), Some("de"));
        assert_eq!(code(2).as_deref(), Some(""));
        assert_eq!(code(3).as_deref(), Some("fr"));
        assert!(!LanguageIsoCode.update_necessary(&ctx).unwrap());
    }

    #[test]
    fn requires_static_info_tables() {
        let harness = harness(&[]);
        assert!(!LanguageIsoCode.update_necessary(&harness.context()).unwrap());
    }

    #[test]
    fn second_execution_leaves_languages_unchanged() {
        let harness = harness(&[STATIC_INFO_TABLES]);
        let ctx = harness.context();

        LanguageIsoCode.execute_update(&ctx).unwrap();
        let once = snapshot(&harness.store, "sys_language");
        LanguageIsoCode.execute_update(&ctx).unwrap();

        assert_eq!(snapshot(&harness.store, "sys_language"), once);
    }
}
