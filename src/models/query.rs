//! Statement-related data models.
//!
//! This module defines the values handed to the executors (statements, their
//! positional parameters, transaction units) and the row sets they return.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A positional parameter for a `$n` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    String(String),
    /// Opaque structured value, bound as JSONB
    Json(JsonValue),
}

impl QueryParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Json(_) => "json",
        }
    }

    /// Render the parameter for diagnostics.
    pub fn render(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::String(v) => format!("'{}'", v),
            Self::Json(v) => v.to_string(),
        }
    }
}

/// Render a parameter list for logs and error context.
pub fn render_params(params: &[QueryParam]) -> Vec<String> {
    params.iter().map(QueryParam::render).collect()
}

impl From<bool> for QueryParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for QueryParam {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for QueryParam {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<JsonValue> for QueryParam {
    fn from(v: JsonValue) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<QueryParam>> From<Option<T>> for QueryParam {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// One parameterized statement. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<QueryParam>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<QueryParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// An ordered batch of statements committed or rolled back as one.
///
/// `param_sets` is index-aligned with `statements`; a missing entry means the
/// statement runs without parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionUnit {
    pub statements: Vec<String>,
    #[serde(default)]
    pub param_sets: Vec<Vec<QueryParam>>,
}

impl TransactionUnit {
    pub fn new(statements: Vec<String>, param_sets: Vec<Vec<QueryParam>>) -> Self {
        Self {
            statements,
            param_sets,
        }
    }

    /// Build a unit from statements that take no parameters.
    pub fn from_sql<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            statements: statements.into_iter().map(Into::into).collect(),
            param_sets: Vec::new(),
        }
    }

    /// Append one statement with its parameters, keeping the sets aligned.
    pub fn push(&mut self, statement: Statement) {
        // Pad earlier parameterless statements so indexes stay aligned.
        self.param_sets.resize(self.statements.len(), Vec::new());
        self.statements.push(statement.sql);
        self.param_sets.push(statement.params);
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Parameters for the statement at `index`, empty when absent.
    pub fn params_for(&self, index: usize) -> &[QueryParam] {
        self.param_sets.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate statements paired with their parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[QueryParam])> {
        self.statements
            .iter()
            .enumerate()
            .map(|(i, sql)| (sql.as_str(), self.params_for(i)))
    }
}

/// A materialized result: rows keyed by camelCase field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// Rows affected as reported by the store
    pub rows_affected: u64,
}

impl RowSet {
    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row, if any.
    pub fn first(&self) -> Option<&serde_json::Map<String, JsonValue>> {
        self.rows.first()
    }

    /// Value of `field` in the first row.
    pub fn scalar(&self, field: &str) -> Option<&JsonValue> {
        self.first().and_then(|row| row.get(field))
    }
}
