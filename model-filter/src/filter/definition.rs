//! Filter definitions
//!
//! A filter definition is the companion object of a model that knows how to
//! turn input keys into query conditions. It is looked up through the
//! [`ModelFilter`] capability trait rather than by reflection: the dispatcher
//! only ever asks "do you have a handler named X?" and "run handler X".
//!
//! Definitions are usually written as an `impl` block under
//! `#[model_filter(model = ...)]`, which generates the trait impl. Filters
//! assembled at runtime can use [`FilterTable`] instead.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::input::FilterValue;
use crate::error::{Error, Result};
use crate::orm::{DatabaseEntity, ModelQuery};

/// Handler table and options of a model filter.
pub trait ModelFilter<M: DatabaseEntity>: Send + Sync {
    /// Whether a handler is registered under `name`
    fn has_handler(&self, name: &str) -> bool;

    /// Run the handler registered under `name`
    fn invoke(&self, name: &str, query: &mut ModelQuery<M>, value: &FilterValue) -> Result<()>;

    /// Runs once per dispatch, before any handler
    fn setup(&self, _query: &mut ModelQuery<M>) -> Result<()> {
        Ok(())
    }

    /// Handlers listed here are never dispatched to
    fn is_blacklisted(&self, _name: &str) -> bool {
        false
    }

    /// Retry `companyId` as `company` when no `companyId` handler exists
    fn drop_id(&self) -> bool {
        true
    }

    /// Convert input keys to camelCase before looking up handlers
    fn camel_case(&self) -> bool {
        true
    }
}

type Handler<M> =
    Box<dyn Fn(&mut ModelQuery<M>, &FilterValue) -> anyhow::Result<()> + Send + Sync>;
type SetupHook<M> = Box<dyn Fn(&mut ModelQuery<M>) -> anyhow::Result<()> + Send + Sync>;

/// A filter built at runtime from closures.
///
/// Handler names are matched exactly against the resolved name, so register
/// them the way the dispatcher resolves keys (`isAdmin`, not `is_admin`,
/// unless camelCasing is turned off).
///
/// ```rust,ignore
/// let filter = FilterTable::<Industry>::new()
///     .handler("text", |query, value| {
///         query.where_like("text", format!("%{}%", value));
///         Ok(())
///     })
///     .blacklist(["secretMethod"]);
/// ```
pub struct FilterTable<M: DatabaseEntity> {
    handlers: HashMap<String, Handler<M>>,
    setup: Option<SetupHook<M>>,
    blacklist: BTreeSet<String>,
    drop_id: bool,
    camel_case: bool,
}

impl<M: DatabaseEntity> FilterTable<M> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            setup: None,
            blacklist: BTreeSet::new(),
            drop_id: true,
            camel_case: true,
        }
    }

    /// Register a handler, replacing any previous one with the same name
    pub fn handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut ModelQuery<M>, &FilterValue) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
        self
    }

    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&mut ModelQuery<M>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.setup = Some(Box::new(setup));
        self
    }

    pub fn blacklist<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.extend(names.into_iter().map(Into::into));
        self
    }

    /// Allow a blacklisted handler again. Returns whether it was blacklisted.
    pub fn whitelist(&mut self, name: &str) -> bool {
        self.blacklist.remove(name)
    }

    pub fn with_drop_id(mut self, enabled: bool) -> Self {
        self.drop_id = enabled;
        self
    }

    pub fn with_camel_case(mut self, enabled: bool) -> Self {
        self.camel_case = enabled;
        self
    }
}

impl<M: DatabaseEntity> Default for FilterTable<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: DatabaseEntity> ModelFilter<M> for FilterTable<M> {
    fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    fn invoke(&self, name: &str, query: &mut ModelQuery<M>, value: &FilterValue) -> Result<()> {
        let handler = self.handlers.get(name).ok_or_else(|| Error::UnknownHandler {
            name: name.to_string(),
        })?;
        handler(query, value)?;
        Ok(())
    }

    fn setup(&self, query: &mut ModelQuery<M>) -> Result<()> {
        if let Some(setup) = &self.setup {
            setup(query)?;
        }
        Ok(())
    }

    fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.contains(name)
    }

    fn drop_id(&self) -> bool {
        self.drop_id
    }

    fn camel_case(&self) -> bool {
        self.camel_case
    }
}

impl<M: DatabaseEntity> fmt::Debug for FilterTable<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        handlers.sort_unstable();

        f.debug_struct("FilterTable")
            .field("model", &M::TABLE_NAME)
            .field("handlers", &handlers)
            .field("setup", &self.setup.is_some())
            .field("blacklist", &self.blacklist)
            .field("drop_id", &self.drop_id)
            .field("camel_case", &self.camel_case)
            .finish()
    }
}
