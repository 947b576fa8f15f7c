//! Convention-based input filtering for SQLite model queries
//!
//! A model names a companion filter; the filter turns request input into
//! WHERE conditions on the model's query builder:
//!
//! - `filter` - `FilterInput`, the `ModelFilter` handler table, the dispatcher,
//!   and the `Filterable` / `FilterQueryExt` entry points
//! - `orm` - the model query layer filters are applied to (sqlx + SQLite)
//! - `config` / `db` - environment configuration and the connection pool
//! - `error` - the crate error type
//!
//! ```rust,ignore
//! use model_filter::{FilterInput, FilterQueryExt, Filterable};
//!
//! let input = FilterInput::from_query_str("username=adon&companyId=2");
//! let users = User::filter(&input)?.fetch_all(db.pool()).await?;
//! ```

extern crate self as model_filter;

pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod orm;

pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use filter::{
    FilterInput, FilterQueryExt, FilterTable, FilterValue, Filterable, ModelFilter, dispatch,
    resolve_handler,
};
pub use orm::{
    ColumnDef, DatabaseEntity, DatabaseSchema, FromSqlRow, HasMany, ManyToMany, ModelQuery,
    Operator, OrderDirection, QueryScope, Scopes, SqlValue, execute_with_binds, quote_ident,
};

pub use model_filter_macros::model_filter;
