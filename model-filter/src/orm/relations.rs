//! Relation queries
//!
//! A relation builds an ordinary `ModelQuery` for the related model, already
//! restricted to the rows that belong to one parent. Anything applied on top
//! (conditions, scopes, filters) only narrows that relation's result set.

use std::marker::PhantomData;

use sqlx::SqlitePool;

use super::builder::{ModelQuery, execute_with_binds, quote_ident};
use super::traits::{DatabaseEntity, SqlValue};

/// Many-to-many relation through a pivot table.
#[derive(Debug, Clone, Copy)]
pub struct ManyToMany<R> {
    /// Pivot table name (e.g. "industry_user")
    pub pivot_table: &'static str,
    /// Pivot column holding the parent key (e.g. "user_id")
    pub pivot_parent_key: &'static str,
    /// Pivot column holding the related key (e.g. "industry_id")
    pub pivot_related_key: &'static str,
    _related: PhantomData<fn() -> R>,
}

impl<R: DatabaseEntity> ManyToMany<R> {
    pub const fn new(
        pivot_table: &'static str,
        pivot_parent_key: &'static str,
        pivot_related_key: &'static str,
    ) -> Self {
        Self {
            pivot_table,
            pivot_parent_key,
            pivot_related_key,
            _related: PhantomData,
        }
    }

    /// Query the related rows attached to `parent_key`
    pub fn query(&self, parent_key: impl Into<SqlValue>) -> ModelQuery<R> {
        let condition = format!(
            "{} IN (SELECT {} FROM {} WHERE {} = ?)",
            quote_ident(R::PRIMARY_KEY),
            quote_ident(self.pivot_related_key),
            quote_ident(self.pivot_table),
            quote_ident(self.pivot_parent_key),
        );

        let mut query = R::query();
        query.where_raw(&condition, vec![parent_key.into()]);
        query
    }

    /// SQL creating the pivot table
    pub fn create_pivot_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {} INTEGER NOT NULL,\n  {} INTEGER NOT NULL,\n  PRIMARY KEY ({}, {})\n)",
            quote_ident(self.pivot_table),
            quote_ident(self.pivot_parent_key),
            quote_ident(self.pivot_related_key),
            quote_ident(self.pivot_parent_key),
            quote_ident(self.pivot_related_key),
        )
    }

    /// Link a related row to a parent
    pub async fn attach(
        &self,
        pool: &SqlitePool,
        parent_key: impl Into<SqlValue>,
        related_key: impl Into<SqlValue>,
    ) -> Result<(), sqlx::Error> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2)",
            quote_ident(self.pivot_table),
            quote_ident(self.pivot_parent_key),
            quote_ident(self.pivot_related_key),
        );

        execute_with_binds(&sql, &[parent_key.into(), related_key.into()], pool).await?;
        Ok(())
    }
}

/// One-to-many relation through a foreign key on the related table.
#[derive(Debug, Clone, Copy)]
pub struct HasMany<R> {
    /// Column on the related table pointing at the parent (e.g. "author_id")
    pub foreign_key: &'static str,
    _related: PhantomData<fn() -> R>,
}

impl<R: DatabaseEntity> HasMany<R> {
    pub const fn new(foreign_key: &'static str) -> Self {
        Self {
            foreign_key,
            _related: PhantomData,
        }
    }

    /// Query the related rows owned by `parent_key`
    pub fn query(&self, parent_key: impl Into<SqlValue>) -> ModelQuery<R> {
        let mut query = R::query();
        query.where_eq(self.foreign_key, parent_key);
        query
    }
}
