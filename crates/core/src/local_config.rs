//! Host configuration file access by slash-separated path (`BE/createGroup`).

use toml::{Table, Value};

use crate::error::WizardError;

pub trait LocalConfiguration: Send + Sync {
    fn get(&self, path: &str) -> Option<Value>;

    /// Write `value` at `path`, creating intermediate tables.
    fn set(&self, path: &str, value: Value) -> Result<(), WizardError>;

    /// Remove every path; missing paths are ignored.
    fn remove(&self, paths: &[&str]) -> Result<(), WizardError>;
}

pub fn lookup<'a>(table: &'a Table, path: &str) -> Option<&'a Value> {
    let (parent, key) = match path.rsplit_once('/') {
        Some((parent, key)) => (lookup_table(table, parent)?, key),
        None => (table, path),
    };
    parent.get(key)
}

fn lookup_table<'a>(table: &'a Table, path: &str) -> Option<&'a Table> {
    let mut current = table;
    for segment in path.split('/') {
        current = current.get(segment)?.as_table()?;
    }
    Some(current)
}

fn lookup_table_mut<'a>(table: &'a mut Table, path: &str) -> Option<&'a mut Table> {
    let mut current = table;
    for segment in path.split('/') {
        current = current.get_mut(segment)?.as_table_mut()?;
    }
    Some(current)
}

pub fn insert(table: &mut Table, path: &str, value: Value) -> Result<(), WizardError> {
    let mut segments: Vec<&str> = path.split('/').collect();
    let key = segments
        .pop()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| WizardError::Configuration(format!("invalid path `{path}`")))?;

    let mut current = table;
    for segment in segments {
        current = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Table(Table::new()))
            .as_table_mut()
            .ok_or_else(|| {
                WizardError::Configuration(format!("`{segment}` in `{path}` is not a table"))
            })?;
    }
    current.insert(key.to_string(), value);
    Ok(())
}

pub fn remove(table: &mut Table, path: &str) -> Option<Value> {
    let (parent, key) = match path.rsplit_once('/') {
        Some((parent, key)) => (lookup_table_mut(table, parent)?, key),
        None => (table, path),
    };
    parent.remove(key)
}
