use std::borrow::Cow;

use core_upgrader_core::{DatabaseUpdatedPrerequisite, UpgradeContext, UpgradeWizard, WizardError};
use core_upgrader_store::tables::SysBeShortcuts;
use sea_query::{Expr, Query, SqliteQueryBuilder};

const PAGE_MODULE_TARGET: &str = "/typo3/index.php?&M=web_layout&";

/// Legacy script paths in the order they are rewritten.
fn replacements() -> [(&'static str, Cow<'static, str>); 4] {
    [
        ("/typo3/sysext/cms/layout/db_layout.php?&", Cow::Borrowed(PAGE_MODULE_TARGET)),
        ("/typo3/sysext/cms/layout/db_layout.php?", urlencoding::encode(PAGE_MODULE_TARGET)),
        ("/typo3/file_edit.php?&", Cow::Borrowed("/typo3/index.php?&M=file_edit&")),
        ("mod.php", Cow::Borrowed("index.php")),
    ]
}

/// Form-style URL decoding: `+` is a space, then percent escapes.
fn decode_url(url: &str) -> String {
    let spaced = url.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned(),
    }
}

fn is_legacy(decoded: &str) -> bool {
    replacements().iter().any(|(needle, _)| decoded.contains(needle))
}

/// Rewritten shortcut URL, or `None` when the URL uses no legacy script.
pub fn migrate_url(url: &str) -> Option<String> {
    let mut decoded = decode_url(url);
    if !is_legacy(&decoded) {
        return None;
    }
    for (needle, replacement) in replacements() {
        decoded = decoded.replace(needle, &replacement);
    }
    Some(decoded)
}

fn shortcuts(ctx: &UpgradeContext<'_>) -> Result<Vec<(i64, String)>, WizardError> {
    let rows = ctx.store.query(
        &Query::select()
            .columns([SysBeShortcuts::Uid, SysBeShortcuts::Url])
            .from(SysBeShortcuts::Table)
            .build(SqliteQueryBuilder),
    )?;
    let mut shortcuts = Vec::with_capacity(rows.len());
    for row in rows {
        shortcuts.push((row.get_i64("uid")?, row.get_string("url")?));
    }
    Ok(shortcuts)
}

pub struct MigrateShortcutUrlsAgain;

impl UpgradeWizard for MigrateShortcutUrlsAgain {
    fn identifier(&self) -> &'static str {
        "migrateShortcutUrlsAgain"
    }

    fn title(&self) -> String {
        "Migrate backend shortcut urls".to_string()
    }

    fn description(&self) -> String {
        "Migrate old shortcut urls to the new module urls.".to_string()
    }

    fn prerequisites(&self) -> Vec<&'static str> {
        vec![DatabaseUpdatedPrerequisite::IDENTIFIER]
    }

    fn update_necessary(&self, ctx: &UpgradeContext<'_>) -> Result<bool, WizardError> {
        Ok(shortcuts(ctx)?
            .iter()
            .any(|(_, url)| is_legacy(&decode_url(url))))
    }

    fn execute_update(&self, ctx: &UpgradeContext<'_>) -> Result<(), WizardError> {
        for (uid, url) in shortcuts(ctx)? {
            let Some(migrated) = migrate_url(&url) else {
                continue;
            };
            ctx.store.execute(
                &Query::update()
                    .table(SysBeShortcuts::Table)
                    .value(SysBeShortcuts::Url, migrated)
                    .and_where(Expr::col(SysBeShortcuts::Uid).eq(uid))
                    .build(SqliteQueryBuilder),
            )?;
        }
        Ok(())
    }
}
