//! Model metadata and row decoding
//!
//! A model describes its table through [`DatabaseEntity`], optionally its
//! DDL through [`DatabaseSchema`], and how to read a row back through
//! [`FromSqlRow`]. Values headed for the database travel as [`SqlValue`].

use std::borrow::Cow;

use convert_case::{Boundary, Case, Converter};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Sqlite, SqlitePool};

use super::builder::{ModelQuery, quote_ident};

/// One column of a model table.
///
/// ```rust,ignore
/// const COLUMNS: &[ColumnDef] = &[
///     ColumnDef::new("id", "INTEGER").primary_key(),
///     ColumnDef::new("email", "TEXT"),
///     ColumnDef::new("is_admin", "INTEGER").default("0"),
///     ColumnDef::new("company_id", "INTEGER").nullable(),
/// ];
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    /// SQLite type name: TEXT, INTEGER, REAL or BLOB
    pub sql_type: &'static str,
    pub nullable: bool,
    pub is_primary_key: bool,
    /// Raw SQL default expression, e.g. `0` or `CURRENT_TIMESTAMP`
    pub default: Option<&'static str>,
}

impl ColumnDef {
    /// A NOT NULL column without default
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
            is_primary_key: false,
            default: None,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn default(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self
    }

    /// Column clause for CREATE TABLE
    pub fn to_sql(&self) -> String {
        let mut clause = format!("{} {}", quote_ident(self.name), self.sql_type);

        if self.is_primary_key {
            clause.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            clause.push_str(" NOT NULL");
        }

        if let Some(expr) = self.default {
            clause.push_str(" DEFAULT ");
            clause.push_str(expr);
        }

        clause
    }
}

/// Table-level facts about a model.
pub trait DatabaseEntity: Sized + Send + Sync {
    const TABLE_NAME: &'static str;
    const PRIMARY_KEY: &'static str;

    /// Order used when a query sets none
    const DEFAULT_SORT: &'static str;
    const DEFAULT_SORT_DIR: OrderDirection = OrderDirection::Asc;

    /// Columns selected by every query, in decode order
    fn column_names() -> &'static [&'static str];

    fn select_sql() -> String {
        let columns: Vec<String> = Self::column_names().iter().map(|c| quote_ident(c)).collect();
        format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            quote_ident(Self::TABLE_NAME)
        )
    }

    /// Map an attribute key to its column name.
    ///
    /// Declared columns are used as-is; anything else follows the snake_case
    /// naming strategy (`companyId` → `company_id`). Digits stay attached to
    /// their word (`line1`, `utm2Source` → `utm2_source`). The result is not
    /// checked against the table.
    fn column_for(key: &str) -> Cow<'_, str> {
        if Self::column_names().contains(&key) {
            Cow::Borrowed(key)
        } else {
            let snake = Converter::new()
                .remove_boundaries(&[Boundary::LowerDigit, Boundary::UpperDigit, Boundary::DigitLower])
                .to_case(Case::Snake);
            Cow::Owned(snake.convert(key))
        }
    }

    fn query() -> ModelQuery<Self> {
        ModelQuery::new()
    }
}

/// DDL for a model's table.
#[allow(async_fn_in_trait)]
pub trait DatabaseSchema: DatabaseEntity {
    fn columns() -> &'static [ColumnDef];

    fn create_table_sql() -> String {
        let clauses: Vec<String> = Self::columns().iter().map(ColumnDef::to_sql).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            quote_ident(Self::TABLE_NAME),
            clauses.join(",\n  ")
        )
    }

    async fn create_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        tracing::debug!(table = Self::TABLE_NAME, "Creating table");
        sqlx::query(&Self::create_table_sql()).execute(pool).await?;
        Ok(())
    }
}

/// Build a model from a selected row.
pub trait FromSqlRow: Sized {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Int(i64),
    Float(f64),
    /// Stored as INTEGER 1/0
    Bool(bool),
    Null,
}

impl SqlValue {
    /// Bind as the next parameter of `query`
    pub fn bind_to_query<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            Self::String(text) => query.bind(text.as_str()),
            Self::Int(int) => query.bind(*int),
            Self::Float(float) => query.bind(*float),
            Self::Bool(flag) => query.bind(i64::from(*flag)),
            Self::Null => query.bind(Option::<i64>::None),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
