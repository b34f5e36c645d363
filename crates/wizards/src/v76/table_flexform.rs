//! Options of the `table` content element moved out of its FlexForm into
//! dedicated columns.

use core_upgrader_core::{DatabaseUpdatedPrerequisite, UpgradeContext, UpgradeWizard, WizardError};
use core_upgrader_store::tables::TtContent;
use sea_query::{Cond, Expr, Query, SqliteQueryBuilder};
use serde_json::Value;

const DEFAULT_DELIMITER: i64 = 124;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFields {
    pub caption: String,
    pub delimiter: i64,
    pub enclosure: i64,
    pub header_position: i64,
    pub tfoot: i64,
}

fn flexform_value<'v>(flexform: &'v Value, sheet: &str, field: &str) -> &'v str {
    flexform
        .pointer(&format!("/data/{sheet}/lDEF/{field}/vDEF"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn integer_or(value: &str, default: i64) -> i64 {
    if value.is_empty() {
        return default;
    }
    value.trim().parse().unwrap_or(default)
}

impl TableFields {
    pub fn from_flexform(flexform: &Value) -> Self {
        let header_position = match flexform_value(flexform, "sDEF", "acctables_headerpos") {
            "top" => 1,
            "left" => 2,
            _ => 0,
        };
        Self {
            caption: flexform_value(flexform, "sDEF", "acctables_caption").to_string(),
            delimiter: integer_or(
                flexform_value(flexform, "s_parsing", "tableparsing_delimiter"),
                DEFAULT_DELIMITER,
            ),
            enclosure: integer_or(flexform_value(flexform, "s_parsing", "tableparsing_quote"), 0),
            header_position,
            tfoot: integer_or(flexform_value(flexform, "sDEF", "acctables_tfoot"), 0),
        }
    }
}

fn legacy_tables() -> Cond {
    Cond::all()
        .add(Expr::col(TtContent::CType).eq("table"))
        .add(Expr::col(TtContent::PiFlexform).is_not_null())
        .add(Expr::col(TtContent::PiFlexform).ne(""))
}

/// Legacy table elements whose FlexForm decodes. Unreadable ones are left in
/// place and do not count as pending work.
fn readable_tables(ctx: &UpgradeContext<'_>) -> Result<Vec<(i64, TableFields)>, WizardError> {
    let rows = ctx.store.query(
        &Query::select()
            .columns([TtContent::Uid, TtContent::PiFlexform])
            .from(TtContent::Table)
            .cond_where(legacy_tables())
            .build(SqliteQueryBuilder),
    )?;
    let mut readable = Vec::with_capacity(rows.len());
    for row in rows {
        let uid = row.get_i64("uid")?;
        let xml = row.get_string("pi_flexform")?;
        match ctx.flexform.decode(&xml) {
            Ok(flexform) => readable.push((uid, TableFields::from_flexform(&flexform))),
            Err(err) => {
                tracing::warn!(uid, error = %err, "skipping table element with unreadable FlexForm");
            }
        }
    }
    Ok(readable)
}

pub struct TableFlexFormToTtContentFields;

impl UpgradeWizard for TableFlexFormToTtContentFields {
    fn identifier(&self) -> &'static str {
        "tableFlexFormToTtContentFields"
    }

    fn title(&self) -> String {
        "Migrate the Flexform for CType \"table\" to regular fields in tt_content".to_string()
    }

    fn description(&self) -> String {
        "The extension \"frontend\" uses regular database fields in the tt_content table for the \
         CType \"table\". Before this was a FlexForm. This update wizard migrates these FlexForms \
         to regular database fields."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        Ok(!readable_tables(ctx)?.is_empty())
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        for (uid, fields) in readable_tables(ctx)? {
            ctx.store.execute(
                &Query::update()
                    .table(TtContent::Table)
                    .values([
                        (TtContent::TableCaption, fields.caption.into()),
                        (TtContent::TableDelimiter, fields.delimiter.into()),
                        (TtContent::TableEnclosure, fields.enclosure.into()),
                        (TtContent::TableHeaderPosition, fields.header_position.into()),
                        (TtContent::TableTfoot, fields.tfoot.into()),
                        (TtContent::PiFlexform, Option::<String>::None.into()),
                    ])
                    .and_where(Expr::col(TtContent::Uid).eq(uid))
                    .build(SqliteQueryBuilder),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::test_support::{rows, snapshot};
    use core_upgrader_core::testing::TestHarness;

    const FLEXFORM: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes" ?>
<T3FlexForms>
    <data>
        <sheet index="sDEF">
            <language index="lDEF">
                <field index="acctables_caption">
                    <value index="vDEF">Opening hours</value>
                </field>
                <field index="acctables_headerpos">
                    <value index="vDEF">left</value>
                </field>
                <field index="acctables_tfoot">
                    <value index="vDEF">1</value>
                </field>
            </language>
        </sheet>
        <sheet index="s_parsing">
            <language index="lDEF">
                <field index="tableparsing_delimiter">
                    <value index="vDEF">59</value>
                </field>
                <field index="tableparsing_quote">
                    <value index="vDEF"></value>
                </field>
            </language>
        </sheet>
    </data>
</T3FlexForms>"#;

    #[test]
    fn fields_fall_back_to_defaults() {
        let fields = TableFields::from_flexform(&serde_json::json!({}));
        assert_eq!(
            fields,
            TableFields {
                caption: String::new(),
                delimiter: 124,
                enclosure: 0,
                header_position: 0,
                tfoot: 0,
            }
        );
    }

    #[test]
    fn flexform_values_move_to_columns() {
        let harness = TestHarness::with_schema();
        harness.execute(&format!(
            "INSERT INTO tt_content (uid, CType, pi_flexform) VALUES (1, 'table', '{FLEXFORM}'), \
             (2, 'table', '<T3FlexForms><data>'), (3, 'text', '{FLEXFORM}')"
        ));
        let ctx = harness.context();
        assert!(TableFlexFormToTtContentFields.update_necessary(&ctx).unwrap());

        TableFlexFormToTtContentFields.execute_update(&ctx).unwrap();

        let migrated = &rows(&harness.store, "SELECT * FROM tt_content WHERE uid = 1")[0];
        assert_eq!(migrated.get_opt_string("table_caption").unwrap().as_deref(), Some("Opening hours"));
        assert_eq!(migrated.get_i64("table_delimiter").unwrap(), 59);
        assert_eq!(migrated.get_i64("table_enclosure").unwrap(), 0);
        assert_eq!(migrated.get_i64("table_header_position").unwrap(), 2);
        assert_eq!(migrated.get_i64("table_tfoot").unwrap(), 1);
        assert_eq!(migrated.get_opt_string("pi_flexform").unwrap(), None);

        // Unreadable FlexForms are left in place; other content types untouched.
        let broken = &rows(&harness.store, "SELECT * FROM tt_content WHERE uid = 2")[0];
        assert!(broken.get_opt_string("pi_flexform").unwrap().is_some());
        let text = &rows(&harness.store, "SELECT * FROM tt_content WHERE uid = 3")[0];
        assert!(text.get_opt_string("pi_flexform").unwrap().is_some());
        assert!(!TableFlexFormToTtContentFields.update_necessary(&ctx).unwrap());
    }

    #[test]
    fn unreadable_flexforms_alone_are_not_pending() {
        let harness = TestHarness::with_schema();
        harness.execute(
            "INSERT INTO tt_content (uid, CType, pi_flexform) VALUES (1, 'table', '<T3FlexForms><data>')",
        );
        assert!(!TableFlexFormToTtContentFields.update_necessary(&harness.context()).unwrap());
    }

    #[test]
    fn second_execution_leaves_content_unchanged() {
        let harness = TestHarness::with_schema();
        harness.execute(&format!(
            "INSERT INTO tt_content (uid, CType, pi_flexform) VALUES (1, 'table', '{FLEXFORM}'), \
             (2, 'table', '<T3FlexForms><data>')"
        ));
        let ctx = harness.context();

        TableFlexFormToTtContentFields.execute_update(&ctx).unwrap();
        let once = snapshot(&harness.store, "tt_content");
        TableFlexFormToTtContentFields.execute_update(&ctx).unwrap();

        assert_eq!(snapshot(&harness.store, "tt_content"), once);
    }
}
