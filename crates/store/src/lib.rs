//! Tabular store capability consumed by the upgrade wizards.
//!
//! Wizards never talk to a database connection directly. They build
//! parameterized statements with `sea-query` and hand them to a [`Store`].
//! [`SqliteStore`] is the bundled implementation.

pub mod error;
pub mod row;
pub mod schema;
pub mod tables;

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};

pub use error::{Result, StoreError};
pub use row::Row;

/// A built statement: SQL text with `?` placeholders plus bound values.
pub type Built = (String, sea_query::Values);

pub trait Store: Send + Sync {
    /// Run a read statement and fetch every row.
    fn query(&self, statement: &Built) -> Result<Vec<Row>>;

    /// Run one mutating statement in its own implicit transaction.
    fn execute(&self, statement: &Built) -> Result<usize>;

    /// Run several mutating statements atomically. Either all apply or none.
    fn transaction(&self, statements: &[Built]) -> Result<usize>;

    /// Column names of `table`, empty when the table does not exist.
    fn table_columns(&self, table: &str) -> Result<Vec<String>>;

    /// Raw DDL, used for schema maintenance only.
    fn execute_batch(&self, sql: &str) -> Result<()>;

    /// First column of the first row as an integer (for `COUNT(*)` queries).
    fn count(&self, statement: &Built) -> Result<i64> {
        let rows = self.query(statement)?;
        let value = rows.first().and_then(|row| row.value_at(0));
        Ok(match value {
            Some(SqlValue::Integer(n)) => *n,
            Some(SqlValue::Real(n)) => *n as i64,
            _ => 0,
        })
    }

    fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self.table_columns(table)?.iter().any(|c| c == column))
    }
}

/// SQLite-backed store.
/// Thread-safe: wraps the connection in a Mutex so it can be shared via `Arc<SqliteStore>`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for SqliteStore {
    fn query(&self, statement: &Built) -> Result<Vec<Row>> {
        let (sql, values) = statement;
        tracing::debug!(sql = %sql, "query");
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
            .into();
        let params = to_sql_values(values);
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fetched = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                fetched.push(row.get::<_, SqlValue>(idx)?);
            }
            result.push(Row::new(Arc::clone(&columns), fetched));
        }
        Ok(result)
    }

    fn execute(&self, statement: &Built) -> Result<usize> {
        let (sql, values) = statement;
        tracing::debug!(sql = %sql, "execute");
        let params = to_sql_values(values);
        Ok(self.conn().execute(sql, params_from_iter(params.iter()))?)
    }

    fn transaction(&self, statements: &[Built]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut affected = 0;
        for (sql, values) in statements {
            tracing::debug!(sql = %sql, "execute (transaction)");
            let params = to_sql_values(values);
            affected += tx.execute(sql, params_from_iter(params.iter()))?;
        }
        tx.commit()?;
        Ok(affected)
    }

    fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let rows = stmt.query_map([table], |row| row.get::<_, String>(0))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql = %sql, "execute batch");
        self.conn().execute_batch(sql)?;
        Ok(())
    }
}

/// Convert `sea_query::Values` into owned rusqlite bind params.
pub fn to_sql_values(values: &sea_query::Values) -> Vec<SqlValue> {
    values
        .0
        .iter()
        .map(|v| match v {
            sea_query::Value::Bool(Some(b)) => SqlValue::Integer(i64::from(*b)),
            sea_query::Value::TinyInt(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::SmallInt(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::Int(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::BigInt(Some(i)) => SqlValue::Integer(*i),
            sea_query::Value::TinyUnsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::SmallUnsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::Unsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::BigUnsigned(Some(i)) => SqlValue::Integer(*i as i64),
            sea_query::Value::Float(Some(f)) => SqlValue::Real(f64::from(*f)),
            sea_query::Value::Double(Some(f)) => SqlValue::Real(*f),
            sea_query::Value::String(Some(s)) => SqlValue::Text(s.as_str().to_string()),
            sea_query::Value::Char(Some(c)) => SqlValue::Text(c.to_string()),
            sea_query::Value::Bytes(Some(b)) => SqlValue::Blob(b.as_slice().to_vec()),
            _ => SqlValue::Null,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::{Alias, Expr, Func, Query, SqliteQueryBuilder};
    use tables::Pages;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.execute_batch(&schema::create_all_sql()).unwrap();
        store
    }

    fn insert_page(title: &str, shortcut: i64) -> Built {
        Query::insert()
            .into_table(Pages::Table)
            .columns([Pages::Title, Pages::Shortcut])
            .values_panic([title.into(), shortcut.into()])
            .build(SqliteQueryBuilder)
    }

    #[test]
    fn test_open_and_schema() {
        let store = test_store();
        let columns = store.table_columns("tt_content").unwrap();
        assert!(columns.iter().any(|c| c == "CType"));
        assert!(store.has_column("be_users", "userMods").unwrap());
        assert!(store.table_columns("no_such_table").unwrap().is_empty());
    }

    #[test]
    fn test_open_path_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("site.sqlite");
        let store = SqliteStore::open_path(&path).unwrap();
        store.execute_batch(&schema::create_all_sql()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_query_and_execute_round_trip() {
        let store = test_store();
        assert_eq!(store.execute(&insert_page("Home", 0)).unwrap(), 1);
        assert_eq!(store.execute(&insert_page("Shortcut", 4)).unwrap(), 1);

        let rows = store
            .query(
                &Query::select()
                    .columns([Pages::Uid, Pages::Title, Pages::Shortcut])
                    .from(Pages::Table)
                    .order_by(Pages::Uid, sea_query::Order::Asc)
                    .build(SqliteQueryBuilder),
            )
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get_string("title").unwrap(), "Shortcut");
        assert_eq!(rows[1].get_i64("shortcut").unwrap(), 4);

        let count = store
            .count(
                &Query::select()
                    .expr(Func::count(Expr::col(Pages::Uid)))
                    .from(Pages::Table)
                    .and_where(Expr::col(Pages::Shortcut).ne(0))
                    .build(SqliteQueryBuilder),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = test_store();
        let broken = Query::insert()
            .into_table(Pages::Table)
            .columns([Alias::new("no_such_column")])
            .values_panic([1.into()])
            .build(SqliteQueryBuilder);

        let result = store.transaction(&[insert_page("Kept?", 0), broken]);
        assert!(matches!(result, Err(StoreError::Sqlite(_))));

        let count = store
            .count(
                &Query::select()
                    .expr(Func::count(Expr::col(Pages::Uid)))
                    .from(Pages::Table)
                    .build(SqliteQueryBuilder),
            )
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_to_sql_values_maps_nulls_and_text() {
        let values = sea_query::Values(vec![
            sea_query::Value::String(None),
            "abc".into(),
            7i32.into(),
            true.into(),
        ]);
        assert_eq!(
            to_sql_values(&values),
            vec![
                SqlValue::Null,
                SqlValue::Text("abc".to_string()),
                SqlValue::Integer(7),
                SqlValue::Integer(1),
            ]
        );
    }
}
