//! Entry points that bind filters to models and queries
//!
//! - [`Filterable`]: implemented by a model to name its default filter and
//!   gain `Model::filter(&input)`
//! - [`filter`]: the same factory as a free function
//! - [`FilterQueryExt`]: `.filter(&input)` on an existing query
//! - `Scopes::filtration`: the filter as a named scope, for relation queries

use super::definition::ModelFilter;
use super::dispatch::dispatch;
use super::input::FilterInput;
use crate::error::{Error, Result};
use crate::orm::{DatabaseEntity, ModelQuery, Scopes};

/// A model with a companion filter.
///
/// ```rust,ignore
/// impl Filterable for User {
///     fn default_filter() -> Option<Box<dyn ModelFilter<Self>>> {
///         Some(Box::new(UserFilter))
///     }
/// }
///
/// let admins = User::filter(&FilterInput::new().with("isAdmin", true))?
///     .fetch_all(db.pool())
///     .await?;
/// ```
pub trait Filterable: DatabaseEntity {
    /// The filter used when none is passed explicitly. Called once per
    /// filter application.
    fn default_filter() -> Option<Box<dyn ModelFilter<Self>>> {
        None
    }

    /// Start a query filtered by the default filter
    fn filter(input: &FilterInput) -> Result<ModelQuery<Self>> {
        self::filter::<Self>(input, None)
    }

    /// Start a query filtered by an explicit filter
    fn filter_with(input: &FilterInput, filter: &dyn ModelFilter<Self>) -> Result<ModelQuery<Self>> {
        self::filter::<Self>(input, Some(filter))
    }
}

/// Build a fresh query for `M` and apply `input` to it.
///
/// Uses `filter` when given, otherwise `M::default_filter()`. Fails with
/// [`Error::NoFilterBound`] when neither exists.
pub fn filter<M: Filterable>(
    input: &FilterInput,
    filter: Option<&dyn ModelFilter<M>>,
) -> Result<ModelQuery<M>> {
    let mut query = M::query();
    apply_filter(&mut query, input, filter)?;
    Ok(query)
}

fn apply_filter<M: Filterable>(
    query: &mut ModelQuery<M>,
    input: &FilterInput,
    filter: Option<&dyn ModelFilter<M>>,
) -> Result<()> {
    if let Some(filter) = filter {
        return dispatch(query, filter, input);
    }

    let filter = M::default_filter().ok_or(Error::NoFilterBound {
        model: M::TABLE_NAME,
    })?;
    dispatch(query, filter.as_ref(), input)
}

/// Adds `.filter()` to model queries.
pub trait FilterQueryExt: Sized {
    type Model: DatabaseEntity;

    /// Apply `input` through the model's default filter
    fn filter(self, input: &FilterInput) -> Result<Self>;

    /// Apply `input` through an explicit filter
    fn filter_with(self, input: &FilterInput, filter: &dyn ModelFilter<Self::Model>) -> Result<Self>;
}

impl<M: Filterable> FilterQueryExt for ModelQuery<M> {
    type Model = M;

    fn filter(mut self, input: &FilterInput) -> Result<Self> {
        apply_filter(&mut self, input, None)?;
        Ok(self)
    }

    fn filter_with(mut self, input: &FilterInput, filter: &dyn ModelFilter<M>) -> Result<Self> {
        apply_filter(&mut self, input, Some(filter))?;
        Ok(self)
    }
}

impl<M: Filterable> Scopes<'_, M> {
    /// Apply `input` through the model's default filter
    pub fn filtration(&mut self, input: &FilterInput) -> Result<()> {
        apply_filter(self.query(), input, None)
    }

    /// Apply `input` through an explicit filter
    pub fn filtration_with(&mut self, input: &FilterInput, filter: &dyn ModelFilter<M>) -> Result<()> {
        apply_filter(self.query(), input, Some(filter))
    }
}
