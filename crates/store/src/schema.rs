//! Expected table definitions of the current host schema.
//!
//! Wizards assume these tables and columns exist before they run. The
//! `databaseUpdated` prerequisite compares a live store against [`TABLES`]
//! and can create whatever is missing.

/// One column: name plus the SQLite type/constraint clause used when adding it.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinition {
    pub name: &'static str,
    pub definition: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct TableDefinition {
    pub name: &'static str,
    /// Extension shipping the table, `None` for core tables.
    pub extension: Option<&'static str>,
    pub columns: &'static [ColumnDefinition],
}

const fn col(name: &'static str, definition: &'static str) -> ColumnDefinition {
    ColumnDefinition { name, definition }
}

const UID: ColumnDefinition = col("uid", "INTEGER PRIMARY KEY AUTOINCREMENT");
const PID: ColumnDefinition = col("pid", "INTEGER NOT NULL DEFAULT 0");
const DELETED: ColumnDefinition = col("deleted", "INTEGER NOT NULL DEFAULT 0");
const TITLE: ColumnDefinition = col("title", "TEXT NOT NULL DEFAULT ''");

pub const TABLES: &[TableDefinition] = &[
    TableDefinition {
        name: "tt_content",
        extension: None,
        columns: &[
            UID,
            PID,
            col("CType", "TEXT NOT NULL DEFAULT ''"),
            col("image", "INTEGER NOT NULL DEFAULT 0"),
            col("assets", "INTEGER NOT NULL DEFAULT 0"),
            col("media", "INTEGER NOT NULL DEFAULT 0"),
            col("pi_flexform", "TEXT"),
            col("table_caption", "TEXT"),
            col("table_delimiter", "INTEGER NOT NULL DEFAULT 124"),
            col("table_enclosure", "INTEGER NOT NULL DEFAULT 0"),
            col("table_header_position", "INTEGER NOT NULL DEFAULT 0"),
            col("table_tfoot", "INTEGER NOT NULL DEFAULT 0"),
            DELETED,
        ],
    },
    TableDefinition {
        name: "sys_file_reference",
        extension: None,
        columns: &[
            UID,
            col("uid_local", "INTEGER NOT NULL DEFAULT 0"),
            col("uid_foreign", "INTEGER NOT NULL DEFAULT 0"),
            col("tablenames", "TEXT NOT NULL DEFAULT ''"),
            col("fieldname", "TEXT NOT NULL DEFAULT ''"),
            DELETED,
        ],
    },
    TableDefinition {
        name: "be_groups",
        extension: None,
        columns: &[
            UID,
            TITLE,
            col("explicit_allowdeny", "TEXT NOT NULL DEFAULT ''"),
            col("groupMods", "TEXT NOT NULL DEFAULT ''"),
            col("file_permissions", "TEXT NOT NULL DEFAULT ''"),
        ],
    },
    TableDefinition {
        name: "be_users",
        extension: None,
        columns: &[
            UID,
            col("username", "TEXT NOT NULL DEFAULT ''"),
            col("uc", "TEXT"),
            col("userMods", "TEXT NOT NULL DEFAULT ''"),
            col("file_permissions", "TEXT NOT NULL DEFAULT ''"),
        ],
    },
    TableDefinition {
        name: "fe_users",
        extension: None,
        columns: &[UID, col("username", "TEXT NOT NULL DEFAULT ''")],
    },
    TableDefinition {
        name: "sys_language",
        extension: None,
        columns: &[
            UID,
            TITLE,
            col("language_isocode", "TEXT NOT NULL DEFAULT ''"),
            col("static_lang_isocode", "INTEGER NOT NULL DEFAULT 0"),
        ],
    },
    TableDefinition {
        name: "static_languages",
        extension: Some("static_info_tables"),
        columns: &[UID, col("lg_iso_2", "TEXT NOT NULL DEFAULT ''")],
    },
    TableDefinition {
        name: "pages",
        extension: None,
        columns: &[
            UID,
            PID,
            TITLE,
            col("shortcut", "INTEGER NOT NULL DEFAULT 0"),
            col("shortcut_mode", "INTEGER NOT NULL DEFAULT 0"),
        ],
    },
    TableDefinition {
        name: "sys_be_shortcuts",
        extension: None,
        columns: &[
            UID,
            col("userid", "INTEGER NOT NULL DEFAULT 0"),
            col("url", "TEXT NOT NULL DEFAULT ''"),
        ],
    },
    TableDefinition {
        name: "sys_workspace",
        extension: Some("workspaces"),
        columns: &[
            UID,
            TITLE,
            DELETED,
            col("edit_allow_notificaton_settings", "INTEGER NOT NULL DEFAULT 0"),
            col("edit_notification_mode", "INTEGER NOT NULL DEFAULT 0"),
            col("edit_notification_preselection", "INTEGER NOT NULL DEFAULT 0"),
            col("publish_allow_notificaton_settings", "INTEGER NOT NULL DEFAULT 0"),
            col("publish_notification_mode", "INTEGER NOT NULL DEFAULT 0"),
            col("publish_notification_preselection", "INTEGER NOT NULL DEFAULT 0"),
            col("execute_allow_notificaton_settings", "INTEGER NOT NULL DEFAULT 0"),
            col("execute_notification_preselection", "INTEGER NOT NULL DEFAULT 0"),
        ],
    },
    TableDefinition {
        name: "sys_workspace_stage",
        extension: Some("workspaces"),
        columns: &[
            UID,
            TITLE,
            DELETED,
            col("responsible_persons", "TEXT"),
            col("allow_notificaton_settings", "INTEGER NOT NULL DEFAULT 0"),
            col("notification_mode", "INTEGER NOT NULL DEFAULT 0"),
            col("notification_preselection", "INTEGER NOT NULL DEFAULT 0"),
        ],
    },
    TableDefinition {
        name: "sys_category_record_mm",
        extension: None,
        columns: &[
            col("uid_local", "INTEGER NOT NULL DEFAULT 0"),
            col("uid_foreign", "INTEGER NOT NULL DEFAULT 0"),
            col("tablenames", "TEXT NOT NULL DEFAULT ''"),
            col("fieldname", "TEXT NOT NULL DEFAULT ''"),
            col("sorting", "INTEGER NOT NULL DEFAULT 0"),
            col("sorting_foreign", "INTEGER NOT NULL DEFAULT 0"),
        ],
    },
];

impl TableDefinition {
    pub fn create_statement(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("\"{}\" {}", c.name, c.definition))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS \"{}\" ({columns})", self.name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl ColumnDefinition {
    /// `ALTER TABLE` clause for adding this column to an existing table.
    ///
    /// SQLite cannot add a PRIMARY KEY column, so key columns fall back to a
    /// plain integer.
    pub fn add_statement(&self, table: &str) -> String {
        let definition = if self.definition.contains("PRIMARY KEY") {
            "INTEGER NOT NULL DEFAULT 0"
        } else {
            self.definition
        };
        format!(
            "ALTER TABLE \"{table}\" ADD COLUMN \"{}\" {definition}",
            self.name
        )
    }
}

pub fn table(name: &str) -> Option<&'static TableDefinition> {
    TABLES.iter().find(|t| t.name == name)
}

/// Full DDL for a fresh database with every expected table.
pub fn create_all_sql() -> String {
    TABLES
        .iter()
        .map(|t| format!("{};", t.create_statement()))
        .collect::<Vec<_>>()
        .join("\n")
}
