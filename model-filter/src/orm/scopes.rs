//! Reusable query fragments
//!
//! A scope is anything that can add conditions to a `ModelQuery`. Scopes are
//! applied either one at a time with [`ModelQuery::scope`] or grouped inside
//! [`ModelQuery::apply`], which hands the closure a [`Scopes`] adapter:
//!
//! ```rust,ignore
//! let published = |query: &mut ModelQuery<Post>| {
//!     query.where_not_null("published_at");
//!     Ok(())
//! };
//!
//! Post::query().apply(|scopes| {
//!     scopes.call(&published)?;
//!     scopes.filtration(&input)
//! })?;
//! ```

use super::builder::ModelQuery;
use super::traits::DatabaseEntity;
use crate::error::Result;

/// A named, reusable query fragment.
pub trait QueryScope<M: DatabaseEntity> {
    /// Add this scope's conditions to the query
    fn apply_to(&self, query: &mut ModelQuery<M>) -> Result<()>;
}

impl<M, F> QueryScope<M> for F
where
    M: DatabaseEntity,
    F: Fn(&mut ModelQuery<M>) -> Result<()>,
{
    fn apply_to(&self, query: &mut ModelQuery<M>) -> Result<()> {
        self(query)
    }
}

/// Scope adapter handed to [`ModelQuery::apply`] closures.
///
/// Wraps the live query so scope calls land on the builder that is being
/// applied to, including relation queries.
pub struct Scopes<'q, M: DatabaseEntity> {
    query: &'q mut ModelQuery<M>,
}

impl<'q, M: DatabaseEntity> Scopes<'q, M> {
    pub(crate) fn new(query: &'q mut ModelQuery<M>) -> Self {
        Self { query }
    }

    /// Apply a scope to the wrapped query
    pub fn call<S>(&mut self, scope: &S) -> Result<()>
    where
        S: QueryScope<M> + ?Sized,
    {
        scope.apply_to(self.query)
    }

    /// The wrapped query
    pub fn query(&mut self) -> &mut ModelQuery<M> {
        self.query
    }
}
