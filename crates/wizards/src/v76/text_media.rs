//! Content types folded into `textmedia` by fluid_styled_content.

use core_upgrader_core::{
    Confirmation, DatabaseUpdatedPrerequisite, UpgradeContext, UpgradeWizard, WizardError,
};
use core_upgrader_store::tables::{BeGroups, SysFileReference, TtContent};
use sea_query::{Asterisk, Expr, Func, Query, SqliteQueryBuilder};

use crate::helpers::{exists, split_list};

const FLUID_STYLED_CONTENT: &str = "fluid_styled_content";
const TEXTMEDIA: &str = "textmedia";

fn content_type_description(content_types: &str) -> String {
    format!(
        "The extension \"fluid_styled_content\" is using a new CType, textmedia, which replaces \
         the CType {content_types}. This update wizard migrates these old CType to the new one in \
         the database. If backend groups have the explicit deny/allow flag set for any of the old \
         CTypes, the according flag for the CType textmedia is set as well."
    )
}

fn read_carefully(description: String) -> Confirmation {
    Confirmation::new("Please make sure to read the following carefully:", description)
        .labels("Yes, I understand!", "Ok, I don't need it.")
}

fn legacy_content_exists(ctx: &UpgradeContext<'_>, content_types: &[&str]) -> Result<bool, WizardError> {
    if !ctx.extensions.is_loaded(FLUID_STYLED_CONTENT) {
        return Ok(false);
    }
    exists(
        ctx,
        &Query::select()
            .expr(Func::count(Expr::col(Asterisk)))
            .from(TtContent::Table)
            .and_where(Expr::col(TtContent::CType).is_in(content_types.iter().copied()))
            .build(SqliteQueryBuilder),
    )
}

/// `text` carries no file relations, the type alone changes.
fn rename_content_type(ctx: &UpgradeContext<'_>, content_type: &str) -> Result<usize, WizardError> {
    Ok(ctx.store.execute(
        &Query::update()
            .table(TtContent::Table)
            .value(TtContent::CType, TEXTMEDIA)
            .and_where(Expr::col(TtContent::CType).eq(content_type))
            .build(SqliteQueryBuilder),
    )?)
}

/// Move `image` relations to `assets` and switch the type, one element per
/// transaction.
fn relocate_images(ctx: &UpgradeContext<'_>, content_type: &str) -> Result<usize, WizardError> {
    let rows = ctx.store.query(
        &Query::select()
            .column(TtContent::Uid)
            .from(TtContent::Table)
            .and_where(Expr::col(TtContent::CType).eq(content_type))
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
                .and_where(Expr::col(SysFileReference::Fieldname).eq("image"))
                .build(SqliteQueryBuilder),
            Query::update()
                .table(TtContent::Table)
                .values([
                    (TtContent::CType, TEXTMEDIA.into()),
                    (TtContent::Assets, Expr::col(TtContent::Image).into()),
                    (TtContent::Image, 0.into()),
                ])
                .and_where(Expr::col(TtContent::Uid).eq(uid))
                .build(SqliteQueryBuilder),
        ])?;
    }
    Ok(rows.len())
}

/// Append the textmedia ALLOW/DENY flag wherever a flag of one of
/// `content_types` is present and the textmedia one is not.
pub fn allow_deny_with_textmedia(list: &str, content_types: &[&str]) -> String {
    let items = split_list(list);
    let mut updated = list.to_string();
    for mode in ["ALLOW", "DENY"] {
        let flag = format!("tt_content:CType:{TEXTMEDIA}:{mode}");
        let legacy = content_types.iter().any(|content_type| {
            let legacy_flag = format!("tt_content:CType:{content_type}:{mode}");
            items.contains(&legacy_flag.as_str())
        });
        if legacy && !items.contains(&flag.as_str()) {
            updated.push(',');
            updated.push_str(&flag);
        }
    }
    updated
}

/// Runs before the content rewrite: once no legacy element is left the
/// wizard is no longer necessary, so flags must already be in place.
fn extend_allow_deny(ctx: &UpgradeContext<'_>, content_types: &[&str]) -> Result<(), WizardError> {
    let rows = ctx.store.query(
        &Query::select()
            .columns([BeGroups::Uid, BeGroups::ExplicitAllowdeny])
            .from(BeGroups::Table)
            .and_where(Expr::col(BeGroups::ExplicitAllowdeny).like("%tt_content:CType:%"))
            .build(SqliteQueryBuilder),
    )?;
    for row in rows {
        let current = row.get_string("explicit_allowdeny")?;
        let updated = allow_deny_with_textmedia(&current, content_types);
        if updated != current {
            ctx.store.execute(
                &Query::update()
                    .table(BeGroups::Table)
                    .value(BeGroups::ExplicitAllowdeny, updated)
                    .and_where(Expr::col(BeGroups::Uid).eq(row.get_i64("uid")?))
                    .build(SqliteQueryBuilder),
            )?;
        }
    }
    Ok(())
}

pub struct TextToTextMedia;

impl UpgradeWizard for TextToTextMedia {
    fn identifier(&self) -> &'static str {
        "textToTextMedia"
    }

    fn title(&self) -> String {
        "Migrate CType text to textmedia".to_string()
    }

    fn description(&self) -> String {
        content_type_description("text")
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn confirmation(&self) -> Option<Confirmation> {
        Some(read_carefully(self.description()))
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        legacy_content_exists(ctx, &["text"])
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        extend_allow_deny(ctx, &["text"])?;
        let migrated = rename_content_type(ctx, "text")?;
        tracing::info!(elements = migrated, "text elements migrated to textmedia");
        Ok(())
    }
}

pub struct ImageToTextMedia;

impl UpgradeWizard for ImageToTextMedia {
    fn identifier(&self) -> &'static str {
        "imageToTextMedia"
    }

    fn title(&self) -> String {
        "Migrate CType image to textmedia and move file relations from \"image\" to \"assets\"".to_string()
    }

    fn description(&self) -> String {
        content_type_description("image")
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn confirmation(&self) -> Option<Confirmation> {
        Some(read_carefully(self.description()))
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        legacy_content_exists(ctx, &["image"])
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        extend_allow_deny(ctx, &["image"])?;
        let migrated = relocate_images(ctx, "image")?;
        tracing::info!(elements = migrated, "image elements migrated to textmedia");
        Ok(())
    }
}

pub struct ContentTypesToTextMedia;

impl ContentTypesToTextMedia {
    const CONTENT_TYPES: [&'static str; 3] = ["text", "image", "textpic"];
}

impl UpgradeWizard for ContentTypesToTextMedia {
    fn identifier(&self) -> &'static str {
        "contentTypesToTextMedia"
    }

    fn title(&self) -> String {
        "Migrate CTypes text, image and textpic to textmedia and move file relations from \"image\" to \"assets\""
            .to_string()
    }

    fn description(&self) -> String {
        content_type_description("text, image and textpic")
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        legacy_content_exists(ctx, &Self::CONTENT_TYPES)
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        extend_allow_deny(ctx, &Self::CONTENT_TYPES)?;
        let mut migrated = rename_content_type(ctx, "text")?;
        migrated += relocate_images(ctx, "textpic")?;
        migrated += relocate_images(ctx, "image")?;
        tracing::info!(elements = migrated, "content elements migrated to textmedia");
        Ok(())
    }
}
