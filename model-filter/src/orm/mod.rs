//! Model query layer
//!
//! A thin SQLite-backed ORM surface that filters are applied to:
//! - Table metadata and row decoding (`DatabaseEntity`, `DatabaseSchema`, `FromSqlRow`)
//! - A chainable, parameterized query builder (`ModelQuery`)
//! - Reusable scopes (`QueryScope`, `Scopes`)
//! - Relation queries (`ManyToMany`, `HasMany`)
//!
//! ```rust,ignore
//! let mut query = User::query();
//! query.where_eq("company_id", 2).order_by("username", OrderDirection::Asc);
//! let users = query.fetch_all(db.pool()).await?;
//! ```

mod builder;
mod relations;
mod scopes;
mod traits;

pub use builder::*;
pub use relations::*;
pub use scopes::*;
pub use traits::*;
