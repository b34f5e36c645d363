//! Free functions shared by several wizards.

use core_upgrader_core::{UpgradeContext, WizardError};
use core_upgrader_store::Built;

/// `COUNT(*)`-style statement evaluated to "at least one row".
pub fn exists(ctx: &UpgradeContext<'_>, statement: &Built) -> Result<bool, WizardError> {
    Ok(ctx.store.count(statement)? > 0)
}

/// Items of a comma-separated list, trimmed, empty items dropped.
pub fn split_list(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn contains_item(list: &str, item: &str) -> bool {
    split_list(list).contains(&item)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empty_items() {
        assert_eq!(split_list(" web_layout,,file_list ,"), ["web_layout", "file_list"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn contains_item_matches_whole_items() {
        assert!(contains_item("web_list,file_list", "file_list"));
        assert!(!contains_item("web_list,file_listing", "file_list"));
    }
}
