//! Wizards shipped for the 7.6 upgrade.

pub mod access_right_parameters;
pub mod extension_extraction;
pub mod file_list_in_access_module_list;
pub mod files_replace_permission;
pub mod language_iso_code;
pub mod migrate_media_to_assets;
pub mod migrate_shortcut_urls_again;
pub mod page_shortcut_parent;
pub mod start_module;
pub mod table_flexform;
pub mod text_media;
pub mod workspaces_notification_settings;

pub use access_right_parameters::AccessRightParameters;
pub use extension_extraction::{Compatibility6Extension, OpenidExtraction};
pub use file_list_in_access_module_list::FileListInAccessModuleList;
pub use files_replace_permission::FilesReplacePermission;
pub use language_iso_code::LanguageIsoCode;
pub use migrate_media_to_assets::MigrateMediaToAssetsForTextMediaCe;
pub use migrate_shortcut_urls_again::MigrateShortcutUrlsAgain;
pub use page_shortcut_parent::PageShortcutParent;
pub use start_module::{BackendUserStartModule, FileListIsStartModule};
pub use table_flexform::TableFlexFormToTtContentFields;
pub use text_media::{ContentTypesToTextMedia, ImageToTextMedia, TextToTextMedia};
pub use workspaces_notification_settings::WorkspacesNotificationSettings;
