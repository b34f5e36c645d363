use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

struct Site {
    dir: tempfile::TempDir,
}

impl Site {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn database(&self) -> PathBuf {
        self.path("site.sqlite")
    }

    /// Database carrying the full expected schema.
    fn with_schema(self) -> Self {
        let conn = rusqlite::Connection::open(self.database()).expect("open database");
        conn.execute_batch(&core_upgrader_store::schema::create_all_sql())
            .expect("create schema");
        self
    }

    /// Database file without any table.
    fn with_empty_database(self) -> Self {
        fs::write(self.database(), b"").expect("create database file");
        self
    }

    fn sql(&self, sql: &str) {
        let conn = rusqlite::Connection::open(self.database()).expect("open database");
        conn.execute_batch(sql).expect("execute sql");
    }

    fn count(&self, sql: &str) -> i64 {
        let conn = rusqlite::Connection::open(self.database()).expect("open database");
        conn.query_row(sql, [], |row| row.get(0)).expect("count")
    }

    fn write_file(&self, name: &str, body: &str) {
        fs::write(self.path(name), body).expect("write file");
    }

    fn write_config(&self, body: &str) -> PathBuf {
        let path = self.path("core-upgrader.toml");
        fs::write(&path, format!("[database]\npath = \"site.sqlite\"\n\n{body}"))
            .expect("write config");
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_core-upgrader"))
            .args(args)
            .current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .output()
            .expect("run core-upgrader")
    }
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("json output")
}

fn result_for<'a>(report: &'a Value, identifier: &str) -> &'a Value {
    report["results"]
        .as_array()
        .expect("results array")
        .iter()
        .find(|result| result["identifier"] == identifier)
        .unwrap_or_else(|| panic!("no result for {identifier}"))
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_core-upgrader"))
        .arg("--help")
        .output()
        .expect("run help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("list"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("config"));
}

#[test]
fn missing_database_is_a_configuration_error() {
    let site = Site::new();
    let output = site.run(&["--database", "absent.sqlite", "list"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("database not found"), "stderr: {stderr}");
}

#[test]
fn missing_explicit_config_is_a_configuration_error() {
    let site = Site::new().with_schema();
    let output = site.run(&["--config", "nope.toml", "run"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn confirmed_text_migration_updates_the_database() {
    let site = Site::new().with_schema();
    site.sql(
        "INSERT INTO tt_content (CType) VALUES ('text'), ('text'), ('textmedia');
         INSERT INTO be_groups (explicit_allowdeny) VALUES ('tt_content:CType:text:ALLOW');",
    );
    let config = site.write_config("[extensions]\nloaded = [\"fluid_styled_content\"]\n");

    let output = site.run(&[
        "--config",
        arg(&config),
        "run",
        "textToTextMedia",
        "--confirm",
        "textToTextMedia",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report = stdout_json(&output);
    assert_eq!(report["summary"]["succeeded"], 1);
    let result = result_for(&report, "textToTextMedia");
    assert_eq!(result["status"], "succeeded");
    assert!(!result["statements"].as_array().expect("statements").is_empty());
    assert_eq!(
        site.count("SELECT COUNT(*) FROM tt_content WHERE CType = 'textmedia'"),
        3
    );

    let again = site.run(&["--config", arg(&config), "run", "textToTextMedia", "--format", "json"]);
    let report = stdout_json(&again);
    let result = result_for(&report, "textToTextMedia");
    assert_eq!(result["status"], "skipped");
    assert_eq!(result["reason"]["kind"], "not_necessary");
}

#[test]
fn unconfirmed_wizards_are_skipped() {
    let site = Site::new().with_schema();
    site.sql("INSERT INTO tt_content (CType) VALUES ('image');");
    let config = site.write_config("[extensions]\nloaded = [\"fluid_styled_content\"]\n");

    let output = site.run(&["--config", arg(&config), "run", "imageToTextMedia", "--format", "json"]);
    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(result_for(&report, "imageToTextMedia")["reason"]["kind"], "unconfirmed");
    assert_eq!(site.count("SELECT COUNT(*) FROM tt_content WHERE CType = 'image'"), 1);
}

#[test]
fn local_configuration_settings_move_under_sys() {
    let site = Site::new().with_schema();
    site.write_file("LocalConfiguration.toml", "[BE]\nfileCreateMask = \"0664\"\n");
    let config = site.write_config("");

    let output = site.run(&["--config", arg(&config), "run", "accessRightParameters"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("accessRightParameters"));
    assert!(stdout.contains("1 succeeded"));

    let written = fs::read_to_string(site.path("LocalConfiguration.toml")).expect("read back");
    let doc: toml::Table = toml::from_str(&written).expect("parse local configuration");
    assert_eq!(doc["SYS"]["fileCreateMask"].as_str(), Some("0664"));
    assert!(doc["BE"].get("fileCreateMask").is_none());
}

#[test]
fn failing_wizard_sets_exit_code_two() {
    let site = Site::new().with_schema();
    site.write_file(
        "LocalConfiguration.toml",
        "SYS = \"flat\"\n\n[BE]\ncreateGroup = \"www\"\n",
    );
    let config = site.write_config("");

    let output = site.run(&[
        "--config",
        arg(&config),
        "run",
        "accessRightParameters",
        "pageShortcutParent",
        "--format",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let report = stdout_json(&output);
    assert_eq!(result_for(&report, "accessRightParameters")["status"], "failed");
    assert_eq!(result_for(&report, "pageShortcutParent")["status"], "skipped");
    assert_eq!(report["summary"]["failed"], 1);
}

#[test]
fn unknown_wizard_is_rejected() {
    let site = Site::new().with_schema();
    let output = site.run(&["--database", arg(&site.database()), "run", "noSuchWizard"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("noSuchWizard"));
}

#[test]
fn prerequisites_can_be_ensured_from_the_cli() {
    let site = Site::new().with_empty_database();

    let skipped = site.run(&[
        "--database",
        arg(&site.database()),
        "run",
        "pageShortcutParent",
        "--format",
        "json",
    ]);
    let report = stdout_json(&skipped);
    let result = result_for(&report, "pageShortcutParent");
    assert_eq!(result["reason"]["kind"], "prerequisite_unmet");
    assert_eq!(result["reason"]["prerequisites"][0], "databaseUpdated");

    let ensured = site.run(&[
        "--database",
        arg(&site.database()),
        "run",
        "pageShortcutParent",
        "--ensure-prerequisites",
        "--format",
        "json",
    ]);
    assert!(ensured.status.success());
    let report = stdout_json(&ensured);
    assert_eq!(result_for(&report, "pageShortcutParent")["reason"]["kind"], "not_necessary");
    assert_eq!(site.count("SELECT COUNT(*) FROM pages"), 0);
}

#[test]
fn list_shows_only_pending_wizards_unless_all() {
    let site = Site::new().with_schema();
    site.sql("INSERT INTO pages (shortcut, shortcut_mode) VALUES (12, 3);");
    let config = site.write_config("[extensions]\nloaded = [\"compatibility6\"]\n");

    let output = site.run(&["--config", arg(&config), "list", "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let lines = stdout_json(&output);
    let identifiers: Vec<&str> = lines
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|line| line["identifier"].as_str())
        .collect();
    assert_eq!(identifiers, ["pageShortcutParent"]);

    let all = site.run(&["--config", arg(&config), "list", "--all", "--format", "json"]);
    assert_eq!(stdout_json(&all).as_array().expect("array").len(), 17);
}

#[test]
fn config_prints_effective_values() {
    let site = Site::new();
    let config = site.write_config("[runner]\nconfirm = [\"imageToTextMedia\"]\n");

    let output = site.run(&["--config", arg(&config), "--database", "/srv/other.sqlite", "config"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("/srv/other.sqlite"));
    assert!(stdout.contains("imageToTextMedia"));
    assert!(stdout.contains("composer_bin = \"composer\""));
}
