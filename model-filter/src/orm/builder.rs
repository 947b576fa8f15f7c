//! SQL query builder for models
//!
//! Accumulates WHERE conditions, ordering and pagination for a
//! `DatabaseEntity` and runs the result through sqlx with bound parameters.
//! Mutators take `&mut self` and return `&mut Self` so filter handlers and
//! scopes can keep chaining on the same builder.

use std::fmt;
use std::marker::PhantomData;

use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteQueryResult};
use sqlx::{Row, Sqlite, SqlitePool};

use super::scopes::{QueryScope, Scopes};
use super::traits::{DatabaseEntity, FromSqlRow, OrderDirection, SqlValue};
use crate::error::Result;

/// Comparison operators accepted by [`ModelQuery::where_op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl Operator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }
}

/// A query builder for a model.
pub struct ModelQuery<M: DatabaseEntity> {
    _phantom: PhantomData<M>,
    where_clauses: Vec<String>,
    values: Vec<SqlValue>,
    order_clauses: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    param_counter: usize,
}

impl<M: DatabaseEntity> ModelQuery<M> {
    /// Create a new query builder for the model.
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
            where_clauses: Vec::new(),
            values: Vec::new(),
            order_clauses: Vec::new(),
            limit: None,
            offset: None,
            param_counter: 0,
        }
    }

    /// Add an equality condition. A `Null` value becomes `IS NULL`.
    pub fn where_eq(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        let value = value.into();
        if value.is_null() {
            return self.where_null(column);
        }
        self.where_op(column, Operator::Eq, value)
    }

    /// Add an inequality condition. A `Null` value becomes `IS NOT NULL`.
    pub fn where_not(&mut self, column: &str, value: impl Into<SqlValue>) -> &mut Self {
        let value = value.into();
        if value.is_null() {
            return self.where_not_null(column);
        }
        self.where_op(column, Operator::Ne, value)
    }

    /// Add a comparison condition.
    pub fn where_op(
        &mut self,
        column: &str,
        op: Operator,
        value: impl Into<SqlValue>,
    ) -> &mut Self {
        let condition = format!("{} {} ?", self.column(column), op.to_sql());
        self.push_condition(&condition, vec![value.into()])
    }

    /// Add a LIKE condition. The pattern is bound as-is, wildcards included.
    pub fn where_like(&mut self, column: &str, pattern: impl Into<String>) -> &mut Self {
        self.where_op(column, Operator::Like, SqlValue::String(pattern.into()))
    }

    /// Add an IN condition. An empty list matches no rows.
    pub fn where_in<I, V>(&mut self, column: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let values: Vec<SqlValue> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.where_clauses.push("1 = 0".to_string());
            return self;
        }

        let placeholders = vec!["?"; values.len()].join(", ");
        let condition = format!("{} IN ({})", self.column(column), placeholders);
        self.push_condition(&condition, values)
    }

    /// Add an IS NULL condition.
    pub fn where_null(&mut self, column: &str) -> &mut Self {
        let condition = format!("{} IS NULL", self.column(column));
        self.where_clauses.push(condition);
        self
    }

    /// Add an IS NOT NULL condition.
    pub fn where_not_null(&mut self, column: &str) -> &mut Self {
        let condition = format!("{} IS NOT NULL", self.column(column));
        self.where_clauses.push(condition);
        self
    }

    /// Add a raw WHERE fragment. Each bare `?` binds the next value; `?N`
    /// refers to the fragment's own `values`, counted from 1.
    pub fn where_raw(&mut self, condition: &str, values: Vec<SqlValue>) -> &mut Self {
        self.push_condition(condition, values)
    }

    /// Add sorting to the query.
    pub fn order_by(&mut self, column: &str, direction: OrderDirection) -> &mut Self {
        let clause = format!("{} {}", self.column(column), direction.to_sql());
        self.order_clauses.push(clause);
        self
    }

    /// Set limit directly.
    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Set offset directly.
    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Apply scopes through a closure, e.g. `query.apply(|scopes| scopes.filtration(&input))`.
    pub fn apply<F>(&mut self, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Scopes<'_, M>) -> Result<()>,
    {
        f(&mut Scopes::new(self))?;
        Ok(self)
    }

    /// Apply a single reusable scope.
    pub fn scope<S>(&mut self, scope: &S) -> Result<&mut Self>
    where
        S: QueryScope<M> + ?Sized,
    {
        scope.apply_to(self)?;
        Ok(self)
    }

    /// WHERE fragments in the order they were added.
    pub fn conditions(&self) -> &[String] {
        &self.where_clauses
    }

    /// Bound values in placeholder order.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// The SELECT statement and its bound values.
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        (self.build_sql(self.limit), self.values.clone())
    }

    fn column(&self, key: &str) -> String {
        quote_ident(&M::column_for(key))
    }

    fn push_condition(&mut self, condition: &str, values: Vec<SqlValue>) -> &mut Self {
        let numbered = self.number_placeholders(condition);
        self.where_clauses.push(numbered);
        self.values.extend(values);
        self
    }

    /// Rewrite placeholders to absolute `?N` indices.
    ///
    /// Bare `?` takes the next index within the fragment and `?N` is shifted
    /// past the values already bound. Quoted spans are copied untouched.
    fn number_placeholders(&mut self, condition: &str) -> String {
        let base = self.param_counter;
        let mut local = 0;
        let mut quote: Option<char> = None;
        let mut numbered = String::with_capacity(condition.len() + 4);
        let mut chars = condition.chars().peekable();

        while let Some(c) = chars.next() {
            numbered.push(c);

            if let Some(open) = quote {
                if c == open {
                    quote = None;
                }
                continue;
            }

            match c {
                '\'' | '"' => quote = Some(c),
                '?' => {
                    let mut digits = String::new();
                    while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                        digits.push(digit);
                    }

                    let index = match digits.parse::<usize>() {
                        Ok(explicit) => {
                            local = local.max(explicit);
                            explicit
                        }
                        Err(_) => {
                            local += 1;
                            local
                        }
                    };
                    numbered.push_str(&(base + index).to_string());
                }
                _ => {}
            }
        }

        self.param_counter = base + local;
        numbered
    }

    fn where_sql(&self) -> String {
        if self.where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clauses.join(" AND "))
        }
    }

    /// SELECT with conditions, ordering and pagination.
    fn build_sql(&self, limit: Option<i64>) -> String {
        let order = if self.order_clauses.is_empty() {
            format!(
                "{} {}",
                quote_ident(M::DEFAULT_SORT),
                M::DEFAULT_SORT_DIR.to_sql()
            )
        } else {
            self.order_clauses.join(", ")
        };

        let mut sql = format!("{}{} ORDER BY {}", M::select_sql(), self.where_sql(), order);

        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
        match (limit, self.offset.filter(|offset| *offset > 0)) {
            (Some(limit), Some(offset)) => sql += &format!(" LIMIT {} OFFSET {}", limit, offset),
            (Some(limit), None) => sql += &format!(" LIMIT {}", limit),
            (None, Some(offset)) => sql += &format!(" LIMIT -1 OFFSET {}", offset),
            (None, None) => {}
        }

        sql
    }

    /// COUNT(*) over the same conditions; ordering and pagination are ignored.
    fn build_count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM {}{}",
            quote_ident(M::TABLE_NAME),
            self.where_sql()
        )
    }
}

impl<M: DatabaseEntity + FromSqlRow> ModelQuery<M> {
    /// All matching rows.
    pub async fn fetch_all(&self, pool: &SqlitePool) -> Result<Vec<M>, sqlx::Error> {
        let sql = self.build_sql(self.limit);
        tracing::debug!(table = M::TABLE_NAME, sql = %sql, "Fetching rows");

        let rows = with_binds(&sql, &self.values).fetch_all(pool).await?;
        rows.iter().map(M::from_row).collect()
    }

    /// The first matching row in query order.
    pub async fn first(&self, pool: &SqlitePool) -> Result<Option<M>, sqlx::Error> {
        let sql = self.build_sql(Some(1));
        tracing::debug!(table = M::TABLE_NAME, sql = %sql, "Fetching first row");

        with_binds(&sql, &self.values)
            .fetch_optional(pool)
            .await?
            .as_ref()
            .map(M::from_row)
            .transpose()
    }
}

impl<M: DatabaseEntity> ModelQuery<M> {
    /// Number of matching rows.
    pub async fn count(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let sql = self.build_count_sql();
        tracing::debug!(table = M::TABLE_NAME, sql = %sql, "Counting rows");

        let row = with_binds(&sql, &self.values).fetch_one(pool).await?;
        row.try_get(0)
    }
}

impl<M: DatabaseEntity> Default for ModelQuery<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: DatabaseEntity> fmt::Debug for ModelQuery<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelQuery")
            .field("table", &M::TABLE_NAME)
            .field("where_clauses", &self.where_clauses)
            .field("values", &self.values)
            .field("order_clauses", &self.order_clauses)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

/// Quote an identifier for SQLite, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn with_binds<'q>(sql: &'q str, values: &'q [SqlValue]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    values
        .iter()
        .fold(sqlx::query(sql), |query, value| value.bind_to_query(query))
}

/// Run an INSERT/UPDATE/DELETE (or DDL) statement with positional binds.
pub async fn execute_with_binds(
    sql: &str,
    values: &[SqlValue],
    pool: &SqlitePool,
) -> Result<SqliteQueryResult, sqlx::Error> {
    tracing::debug!(sql = %sql, binds = values.len(), "Executing statement");
    with_binds(sql, values).execute(pool).await
}
