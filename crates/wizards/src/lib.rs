//! Bundled upgrade wizards, grouped by the release that introduced them.

pub mod helpers;
pub mod v12;
pub mod v76;

use core_upgrader_core::UpgradeWizard;

/// Every bundled wizard in declaration order.
pub fn all_wizards() -> Vec<Box<dyn UpgradeWizard>> {
    vec![
        Box::new(v76::AccessRightParameters),
        Box::new(v76::BackendUserStartModule),
        Box::new(v76::FileListIsStartModule),
        Box::new(v76::FileListInAccessModuleList),
        Box::new(v76::FilesReplacePermission),
        Box::new(v76::LanguageIsoCode),
        Box::new(v76::PageShortcutParent),
        Box::new(v76::MigrateShortcutUrlsAgain),
        Box::new(v76::WorkspacesNotificationSettings),
        Box::new(v76::TextToTextMedia),
        Box::new(v76::ImageToTextMedia),
        Box::new(v76::ContentTypesToTextMedia),
        Box::new(v76::MigrateMediaToAssetsForTextMediaCe),
        Box::new(v76::TableFlexFormToTtContentFields),
        Box::new(v76::Compatibility6Extension),
        Box::new(v76::OpenidExtraction),
        Box::new(v12::RemoveDuplicateSysCategoryRecordMms),
    ]
}
