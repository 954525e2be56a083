//! Warehouse access used by the loader.
//!
//! The loader only talks to a [`Cursor`]: it sends statement text plus bound
//! values and drives the transaction with explicit `BEGIN`/`COMMIT`/`ROLLBACK`
//! statements. [`sqlite`] provides the sqlx-backed implementation.

use chrono::NaiveDate;

use crate::error::LoadError;

pub mod sqlite;
pub use sqlite::{connection_env_var, SqliteCursor, SqliteWarehouse};

/// Value bound to a statement placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Float(f64),
    Int(i64),
    Date(NaiveDate),
    Text(String),
}

/// SQL text with its bound values, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Statement without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn begin() -> Self {
        Self::raw("BEGIN")
    }

    pub fn commit() -> Self {
        Self::raw("COMMIT")
    }

    pub fn rollback() -> Self {
        Self::raw("ROLLBACK")
    }
}

/// A single warehouse connection that executes statements in order
#[async_trait::async_trait]
pub trait Cursor: Send {
    /// Execute one statement, returning the number of affected rows
    async fn execute(&mut self, statement: &Statement) -> Result<u64, LoadError>;
}

/// Something that hands out a fresh connection per load
#[async_trait::async_trait]
pub trait Warehouse: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Cursor>, LoadError>;
}

/// Accept a single unquoted SQL identifier.
///
/// Table names cannot be bound as parameters, so they are checked before being
/// placed into statement text. Schema-qualified names are refused: on SQLite the
/// qualifier names an attached database, and the warehouse never attaches one.
pub fn validate_table_name(name: &str) -> Result<(), LoadError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if !valid {
        return Err(LoadError::InvalidTableName(name.to_string()));
    }
    Ok(())
}
