use core_upgrader_core::{DatabaseUpdatedPrerequisite, UpgradeContext, UpgradeWizard, WizardError};
use core_upgrader_store::tables::{SysFileReference, TtContent};
use sea_query::{Asterisk, Cond, Expr, Func, Query, SqliteQueryBuilder};

use crate::helpers::exists;

fn textmedia_with_media() -> Cond {
    Cond::all()
        .add(Expr::col(TtContent::CType).eq("textmedia"))
        .add(Expr::col(TtContent::Media).gt(0))
}

pub struct MigrateMediaToAssetsForTextMediaCe;

impl UpgradeWizard for MigrateMediaToAssetsForTextMediaCe {
    fn identifier(&self) -> &'static str {
        "migrateMediaToAssetsForTextMediaCe"
    }

    fn title(&self) -> String {
        "Migrate CTypes textmedia database field \"media\" to \"assets\"".to_string()
    }

    fn description(&self) -> String {
        "The extension \"fluid_styled_content\" is using a new database field for mediafile references. \
         This update wizard migrates these old references to use the new database field."
            .to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn run_after(&self) -> Vec<&'static str> {
        vec!["textToTextMedia", "imageToTextMedia", "contentTypesToTextMedia"]
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        exists(
            ctx,
            &Query::select()
                .expr(Func::count(Expr::col(Asterisk)))
                .from(TtContent::Table)
                .cond_where(textmedia_with_media())
                .build(SqliteQueryBuilder),
        )
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        let rows = ctx.store.query(
            &Query::select()
                .column(TtContent::Uid)
                .from(TtContent::Table)
                .cond_where(textmedia_with_media())
                .build(SqliteQueryBuilder),
        )?;
        for row in &rows {
            let uid = row.get_i64("uid")?;
            ctx.store.transaction(&[
                Query::update()
                    .table(SysFileReference::Table)
                    .value(SysFileReference::Fieldname, "assets")
                    .and_where(Expr::col(SysFileReference::UidForeign).eq(uid))
                    .and_where(Expr::col(SysFileReference::Tablenames).eq("tt_content"))
                    .and_where(Expr::col(SysFileReference::Fieldname).eq("media"))
                    .build(SqliteQueryBuilder),
                Query::update()
                    .table(TtContent::Table)
                    .values([
                        (TtContent::Assets, Expr::col(TtContent::Media).into()),
                        (TtContent::Media, 0.into()),
                    ])
                    .and_where(Expr::col(TtContent::Uid).eq(uid))
                    .build(SqliteQueryBuilder),
            ])?;
        }
        tracing::info!(elements = rows.len(), "textmedia media relations moved to assets");
        Ok(())
    }
}
