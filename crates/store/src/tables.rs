//! Compile-time–checked column identifiers for the tables the wizards touch.

use sea_query::Iden;

#[derive(Iden, Clone, Copy)]
pub enum TtContent {
    Table,
    Uid,
    Pid,
    #[iden = "CType"]
    CType,
    Image,
    Assets,
    Media,
    PiFlexform,
    TableCaption,
    TableDelimiter,
    TableEnclosure,
    TableHeaderPosition,
    TableTfoot,
    Deleted,
}

#[derive(Iden, Clone, Copy)]
pub enum SysFileReference {
    Table,
    Uid,
    UidLocal,
    UidForeign,
    Tablenames,
    Fieldname,
    Deleted,
}

#[derive(Iden, Clone, Copy)]
pub enum BeGroups {
    Table,
    Uid,
    Title,
    ExplicitAllowdeny,
    #[iden = "groupMods"]
    GroupMods,
    FilePermissions,
}

#[derive(Iden, Clone, Copy)]
pub enum BeUsers {
    Table,
    Uid,
    Username,
    Uc,
    #[iden = "userMods"]
    UserMods,
    FilePermissions,
}

#[derive(Iden, Clone, Copy)]
pub enum FeUsers {
    Table,
    Uid,
    Username,
}

#[derive(Iden, Clone, Copy)]
pub enum SysLanguage {
    Table,
    Uid,
    Title,
    LanguageIsocode,
    StaticLangIsocode,
}

#[derive(Iden, Clone, Copy)]
pub enum StaticLanguages {
    Table,
    Uid,
    #[iden = "lg_iso_2"]
    LgIso2,
}

#[derive(Iden, Clone, Copy)]
pub enum Pages {
    Table,
    Uid,
    Pid,
    Title,
    Shortcut,
    ShortcutMode,
}

#[derive(Iden, Clone, Copy)]
pub enum SysBeShortcuts {
    Table,
    Uid,
    Userid,
    Url,
}

#[derive(Iden, Clone, Copy)]
pub enum SysWorkspace {
    Table,
    Uid,
    Title,
    Deleted,
    EditAllowNotificatonSettings,
    EditNotificationMode,
    EditNotificationPreselection,
    PublishAllowNotificatonSettings,
    PublishNotificationMode,
    PublishNotificationPreselection,
    ExecuteAllowNotificatonSettings,
    ExecuteNotificationPreselection,
}

#[derive(Iden, Clone, Copy)]
pub enum SysWorkspaceStage {
    Table,
    Uid,
    Title,
    Deleted,
    ResponsiblePersons,
    AllowNotificatonSettings,
    NotificationMode,
    NotificationPreselection,
}

#[derive(Iden, Clone, Copy)]
pub enum SysCategoryRecordMm {
    Table,
    UidLocal,
    UidForeign,
    Tablenames,
    Fieldname,
    Sorting,
    SortingForeign,
}
