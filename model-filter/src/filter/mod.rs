//! Model filters
//!
//! A filter turns a loosely-typed [`FilterInput`] into conditions on a
//! [`ModelQuery`](crate::ModelQuery). For every defined input key the
//! dispatcher looks for a handler of the same (camelCased) name on the
//! model's filter and calls it; keys without a handler become plain equality
//! conditions.
//!
//! ```rust,ignore
//! struct UserFilter;
//!
//! #[model_filter(model = User)]
//! impl UserFilter {
//!     fn username(&self, query: &mut ModelQuery<User>, value: &FilterValue) -> anyhow::Result<()> {
//!         query.where_like("username", format!("%{}%", value));
//!         Ok(())
//!     }
//! }
//!
//! // {"username": "adon", "isAdmin": true}
//! // → "username" LIKE '%adon%' AND "is_admin" = 1
//! let users = User::filter(&input)?.fetch_all(db.pool()).await?;
//! ```

mod definition;
mod dispatch;
mod filterable;
mod input;

#[cfg(test)]
pub(crate) mod fixtures;

pub use definition::{FilterTable, ModelFilter};
pub use dispatch::{dispatch, resolve_handler};
pub use filterable::{FilterQueryExt, Filterable, filter};
pub use input::{FilterInput, FilterValue};
