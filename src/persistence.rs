//! Fact-table persistence.
//!
//! A load always replaces the destination: the previous table is dropped and
//! recreated from the frame schema, then every row is inserted. For SQLite
//! this happens inside one transaction, so a failed load leaves the previous
//! table untouched.
//!
//! Column mapping:
//! - `Date` and `String` columns become `TEXT` (dates as `YYYY-MM-DD`)
//! - floating point columns become `REAL`
//! - integer and boolean columns become `INTEGER`

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use crate::error::{EtlError, EtlResult};

/// Destination for the fact table.
pub trait FactTableStore {
    /// Replace `table` with the rows of `df`; returns the number of rows written.
    fn replace_table(&self, table: &str, df: &DataFrame) -> EtlResult<usize>;

    /// Human-readable location, used in logs.
    fn location(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlType {
    Text,
    Real,
    Integer,
}

impl SqlType {
    fn of(dtype: &DataType) -> Self {
        match dtype {
            DataType::Float32 | DataType::Float64 => SqlType::Real,
            DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => SqlType::Integer,
            _ => SqlType::Text,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Real => "REAL",
            SqlType::Integer => "INTEGER",
        }
    }
}

/// SQLite-backed fact store.
pub struct SqliteFactStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteFactStore {
    /// Open (or create) the database file at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> EtlResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|e| {
            EtlError::database(format!("Failed to open database {}: {}", path.display(), e))
        })?;
        Ok(Self { conn, path: Some(path) })
    }

    /// In-memory database (for testing).
    pub fn in_memory() -> EtlResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EtlError::database(format!("Failed to open in-memory db: {}", e)))?;
        Ok(Self { conn, path: None })
    }

    pub fn row_count(&self, table: &str) -> EtlResult<i64> {
        validate_identifier(table)?;
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn column_names(&self, table: &str) -> EtlResult<Vec<String>> {
        validate_identifier(table)?;
        let stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} LIMIT 0", quote(table)))?;
        let names = stmt.column_names().into_iter().map(str::to_string).collect();
        Ok(names)
    }

    /// Declared SQL type of every column, in table order.
    pub fn column_types(&self, table: &str) -> EtlResult<Vec<(String, String)>> {
        validate_identifier(table)?;
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote(table)))?;
        let rows = stmt.query_map([], |row| Ok((row.get(1)?, row.get(2)?)))?;

        let mut types = Vec::new();
        for row in rows {
            types.push(row?);
        }
        Ok(types)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl FactTableStore for SqliteFactStore {
    fn replace_table(&self, table: &str, df: &DataFrame) -> EtlResult<usize> {
        validate_identifier(table)?;
        if df.width() == 0 {
            return Err(EtlError::invalid_param(table, "frame has no columns"));
        }

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let types: Vec<SqlType> = df.dtypes().iter().map(SqlType::of).collect();
        let columns = column_values(df, &types)?;

        let definitions: Vec<String> = names
            .iter()
            .zip(&types)
            .map(|(name, ty)| format!("{} {}", quote(name), ty.as_sql()))
            .collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        let quoted: Vec<String> = names.iter().map(|name| quote(name)).collect();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table_q}; CREATE TABLE {table_q} ({defs});",
            table_q = quote(table),
            defs = definitions.join(", "),
        ))?;

        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(table),
                quoted.join(", "),
                placeholders.join(", "),
            ))?;
            for row in 0..df.height() {
                insert.execute(params_from_iter(columns.iter().map(|values| &values[row])))?;
            }
        }
        tx.commit()?;

        debug!(table, columns = names.len(), "table recreated");
        info!(table, rows = df.height(), location = %self.location(), "fact table loaded");
        Ok(df.height())
    }

    fn location(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        }
    }
}

/// Parquet file store; one `<table>.parquet` file per table.
pub struct ParquetFactStore {
    base_path: PathBuf,
}

impl ParquetFactStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn file_path(&self, table: &str) -> PathBuf {
        self.base_path.join(format!("{table}.parquet"))
    }
}

impl FactTableStore for ParquetFactStore {
    fn replace_table(&self, table: &str, df: &DataFrame) -> EtlResult<usize> {
        validate_identifier(table)?;
        let path = self.file_path(table);

        std::fs::create_dir_all(&self.base_path)?;
        let file = File::create(&path)?;

        ParquetWriter::new(file)
            .finish(&mut df.clone())
            .map_err(|e| EtlError::Polars(format!("Failed to write Parquet: {}", e)))?;

        info!(table, rows = df.height(), path = %path.display(), "fact table written");
        Ok(df.height())
    }

    fn location(&self) -> String {
        self.base_path.display().to_string()
    }
}

/// Convert every column into SQLite values, column-major.
fn column_values(df: &DataFrame, types: &[SqlType]) -> EtlResult<Vec<Vec<Value>>> {
    df.get_columns()
        .iter()
        .zip(types)
        .map(|(column, ty)| {
            let series = column.as_materialized_series();
            let values = match ty {
                SqlType::Text => series
                    .cast(&DataType::String)?
                    .str()?
                    .into_iter()
                    .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
                    .collect(),
                SqlType::Real => series
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .map(|v| v.map_or(Value::Null, Value::Real))
                    .collect(),
                SqlType::Integer => series
                    .cast(&DataType::Int64)?
                    .i64()?
                    .into_iter()
                    .map(|v| v.map_or(Value::Null, Value::Integer))
                    .collect(),
            };
            Ok(values)
        })
        .collect()
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_identifier(name: &str) -> EtlResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EtlError::invalid_param(
            "table",
            format!("'{name}' is not a valid table name"),
        ))
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
