use std::collections::HashMap;

use core_upgrader_core::{UpgradeContext, UpgradeWizard, WizardError};
use core_upgrader_store::Row;
use core_upgrader_store::tables::SysCategoryRecordMm as Mm;
use sea_query::{Alias, Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

/// Identity of a category relation.
type RelationKey = (i64, i64, String, String);

fn relation_key(row: &Row) -> Result<RelationKey, WizardError> {
    Ok((
        row.get_i64("uid_local")?,
        row.get_i64("uid_foreign")?,
        row.get_string("tablenames")?,
        row.get_string("fieldname")?,
    ))
}

/// Duplicate groups in first-seen order; each group's rows ordered by rowid.
fn duplicate_groups(ctx: &UpgradeContext<'_>) -> Result<Vec<(RelationKey, Vec<Row>)>, WizardError> {
    let rows = ctx.store.query(
        &Query::select()
            .expr_as(Expr::cust("rowid"), Alias::new("row_id"))
            .columns([
                Mm::UidLocal,
                Mm::UidForeign,
                Mm::Tablenames,
                Mm::Fieldname,
                Mm::Sorting,
                Mm::SortingForeign,
            ])
            .from(Mm::Table)
            .order_by_expr(Expr::cust("rowid"), Order::Asc)
            .build(SqliteQueryBuilder),
    )?;

    let mut index: HashMap<RelationKey, usize> = HashMap::new();
    let mut groups: Vec<(RelationKey, Vec<Row>)> = Vec::new();
    for row in rows {
        let key = relation_key(&row)?;
        match index.get(&key) {
            Some(&at) => groups[at].1.push(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![row]));
            }
        }
    }
    groups.retain(|(_, rows)| rows.len() > 1);
    Ok(groups)
}

pub struct RemoveDuplicateSysCategoryRecordMms;

impl UpgradeWizard for RemoveDuplicateSysCategoryRecordMms {
    fn identifier(&self) -> &'static str {
        "removeDuplicateSysCategoryRecordMms"
    }

    fn title(&self) -> String {
        "Removes duplicate sys_category_record_mm records from the database".to_string()
    }

    fn description(&self) -> String {
        "Category relations that exist more than once are collapsed into a single relation."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        let duplicates = ctx.store.query(
            &Query::select()
                .columns([Mm::UidLocal, Mm::UidForeign, Mm::Tablenames, Mm::Fieldname])
                .from(Mm::Table)
                .group_by_columns([Mm::UidLocal, Mm::UidForeign, Mm::Tablenames, Mm::Fieldname])
                .and_having(Expr::expr(Func::count(Expr::col(Asterisk))).gt(1))
                .limit(1)
                .build(SqliteQueryBuilder),
        )?;
        Ok(!duplicates.is_empty())
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        let groups = duplicate_groups(ctx)?;
        for ((uid_local, uid_foreign, tablenames, fieldname), rows) in &groups {
            // Survivor carries the values of the most recently inserted row.
            let Some(survivor) = rows.last() else {
                continue;
            };
            ctx.store.transaction(&[
                Query::delete()
                    .from_table(Mm::Table)
                    .and_where(Expr::col(Mm::UidLocal).eq(*uid_local))
                    .and_where(Expr::col(Mm::UidForeign).eq(*uid_foreign))
                    .and_where(Expr::col(Mm::Tablenames).eq(tablenames.as_str()))
                    .and_where(Expr::col(Mm::Fieldname).eq(fieldname.as_str()))
                    .build(SqliteQueryBuilder),
                Query::insert()
                    .into_table(Mm::Table)
                    .columns([
                        Mm::UidLocal,
                        Mm::UidForeign,
                        Mm::Tablenames,
                        Mm::Fieldname,
                        Mm::Sorting,
                        Mm::SortingForeign,
                    ])
                    .values_panic([
                        (*uid_local).into(),
                        (*uid_foreign).into(),
                        tablenames.as_str().into(),
                        fieldname.as_str().into(),
                        survivor.get_i64("sorting")?.into(),
                        survivor.get_i64("sorting_foreign")?.into(),
                    ])
                    .build(SqliteQueryBuilder),
            ])?;
        }
        tracing::info!(groups = groups.len(), "duplicate category relations collapsed");
        Ok(())
    }
}
