//! Convention-based dispatch of input keys to filter handlers

use convert_case::{Case, Casing};

use super::definition::ModelFilter;
use super::input::FilterInput;
use crate::error::Result;
use crate::orm::{DatabaseEntity, ModelQuery};

/// Apply `input` to `query` through `filter`.
///
/// Runs the filter's setup hook, then walks the input in order. Undefined
/// values are skipped. Each remaining key goes to the handler it resolves to
/// (see [`resolve_handler`]) or, when none does, becomes `where_eq(key,
/// value)`. The first handler error stops dispatch and is returned as-is.
pub fn dispatch<M, F>(query: &mut ModelQuery<M>, filter: &F, input: &FilterInput) -> Result<()>
where
    M: DatabaseEntity,
    F: ModelFilter<M> + ?Sized,
{
    filter.setup(query)?;

    for (key, value) in input.iter() {
        let Some(value) = value else {
            tracing::trace!(model = M::TABLE_NAME, key, "Skipping undefined filter value");
            continue;
        };

        match resolve_handler(filter, key) {
            Some(handler) => {
                tracing::debug!(model = M::TABLE_NAME, key, handler = %handler, "Applying filter handler");
                filter.invoke(&handler, query, value)?;
            }
            None => {
                tracing::trace!(model = M::TABLE_NAME, key, "No filter handler, using equality");
                query.where_eq(key, value);
            }
        }
    }

    Ok(())
}

/// The handler name `key` dispatches to, if any.
///
/// The key is camelCased (unless the filter opts out) and looked up. If that
/// misses and the name ends in `Id`/`_id`, the name without the suffix is
/// tried (`companyId` → `company`). Blacklisted names never resolve.
pub fn resolve_handler<M, F>(filter: &F, key: &str) -> Option<String>
where
    M: DatabaseEntity,
    F: ModelFilter<M> + ?Sized,
{
    let name = if filter.camel_case() {
        key.to_case(Case::Camel)
    } else {
        key.to_string()
    };

    if is_dispatchable(filter, &name) {
        return Some(name);
    }

    if filter.drop_id() {
        if let Some(base) = strip_id_suffix(&name) {
            if is_dispatchable(filter, base) {
                return Some(base.to_string());
            }
        }
    }

    None
}

fn is_dispatchable<M, F>(filter: &F, name: &str) -> bool
where
    M: DatabaseEntity,
    F: ModelFilter<M> + ?Sized,
{
    filter.has_handler(name) && !filter.is_blacklisted(name)
}

fn strip_id_suffix(name: &str) -> Option<&str> {
    name.strip_suffix("Id")
        .or_else(|| name.strip_suffix("_id"))
        .filter(|base| !base.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::filter::FilterValue;
    use crate::filter::fixtures::{Account, AccountFilter};
    use crate::{Error, FilterTable, SqlValue, model_filter};
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn dispatched(input: &FilterInput) -> ModelQuery<Account> {
        let mut query = Account::query();
        dispatch(&mut query, &AccountFilter, input).unwrap();
        query
    }

    #[test]
    fn test_handler_takes_precedence_over_equality() {
        let query = dispatched(&FilterInput::new().with("username", "adon"));

        assert_eq!(query.conditions(), &["\"username\" LIKE ?1".to_string()]);
        assert_eq!(query.values(), &[SqlValue::String("%adon%".into())]);
    }

    #[test]
    fn test_one_condition_per_key_in_input_order() {
        let input = FilterInput::new()
            .with("email", "test2")
            .with("isAdmin", true)
            .with("username", "adon")
            .with("nickname", "t");

        assert_eq!(
            dispatched(&input).conditions(),
            &[
                "\"email\" LIKE ?1".to_string(),
                "\"is_admin\" = ?2".to_string(),
                "\"username\" LIKE ?3".to_string(),
                "\"nickname\" = ?4".to_string(),
            ]
        );
    }

    #[test]
    fn test_falsy_values_applied_and_undefined_skipped() {
        let input = FilterInput::new()
            .with("isAdmin", false)
            .with("companyName", "")
            .with("score", 0)
            .unset("username")
            .with("deletedAt", FilterValue::Null);

        let query = dispatched(&input);

        assert_eq!(
            query.conditions(),
            &[
                "\"is_admin\" = ?1".to_string(),
                "\"company_name\" = ?2".to_string(),
                "\"score\" = ?3".to_string(),
                "\"deleted_at\" IS NULL".to_string(),
            ]
        );
        assert_eq!(
            query.values(),
            &[
                SqlValue::Bool(false),
                SqlValue::String(String::new()),
                SqlValue::Int(0)
            ]
        );
    }

    #[test]
    fn test_keys_resolve_through_camel_case() {
        let query = dispatched(&FilterInput::new().with("min_score", 10));
        assert_eq!(query.conditions(), &["\"score\" >= ?1".to_string()]);

        let query = dispatched(&FilterInput::new().with("min-score", 10));
        assert_eq!(query.conditions(), &["\"score\" >= ?1".to_string()]);
    }

    #[test]
    fn test_id_suffix_is_dropped() {
        for key in ["companyId", "company_id", "company"] {
            assert_eq!(
                resolve_handler::<Account, _>(&AccountFilter, key).as_deref(),
                Some("company"),
                "key {}",
                key
            );
        }

        let query = dispatched(&FilterInput::new().with("companyId", 2));
        assert_eq!(query.conditions(), &["\"company_id\" = ?1".to_string()]);
    }

    #[test]
    fn test_drop_id_can_be_disabled() {
        let filter = FilterTable::<Account>::new()
            .handler("company", |query, value| {
                query.where_eq("company_id", value);
                Ok(())
            })
            .with_drop_id(false);

        assert_eq!(resolve_handler::<Account, _>(&filter, "companyId"), None);
        assert_eq!(resolve_handler::<Account, _>(&filter, "company").as_deref(), Some("company"));
    }

    #[test]
    fn test_camel_case_can_be_disabled() {
        let filter = FilterTable::<Account>::new()
            .handler("is_admin", |query, _| {
                query.where_eq("is_admin", true);
                Ok(())
            })
            .with_camel_case(false);

        assert_eq!(resolve_handler::<Account, _>(&filter, "is_admin").as_deref(), Some("is_admin"));
        assert_eq!(resolve_handler::<Account, _>(&filter, "isAdmin"), None);
    }

    #[test]
    fn test_blacklisted_handler_falls_back_to_equality() {
        assert!(ModelFilter::<Account>::has_handler(&AccountFilter, "secret"));
        assert_eq!(resolve_handler::<Account, _>(&AccountFilter, "secret"), None);

        let query = dispatched(&FilterInput::new().with("secret", "x"));
        assert_eq!(query.conditions(), &["\"secret\" = ?1".to_string()]);
    }

    struct AuditFilter;

    #[model_filter(model = Account, blacklist = ["secret_method"])]
    impl AuditFilter {
        fn secret_method(&self, query: &mut ModelQuery<Account>, _value: &FilterValue) -> anyhow::Result<()> {
            query.where_raw("1 = 0", Vec::new());
            Ok(())
        }
    }

    #[test]
    fn test_blacklist_by_method_name_covers_filter_name() {
        assert!(ModelFilter::<Account>::is_blacklisted(&AuditFilter, "secretMethod"));

        for key in ["secretMethod", "secret_method"] {
            assert_eq!(resolve_handler::<Account, _>(&AuditFilter, key), None, "key {}", key);
        }

        let mut query = Account::query();
        dispatch(&mut query, &AuditFilter, &FilterInput::new().with("secret_method", "x")).unwrap();
        assert_eq!(query.conditions(), &["\"secret_method\" = ?1".to_string()]);
    }

    #[test]
    fn test_whitelisted_handler_is_dispatched_again() {
        let mut filter = FilterTable::<Account>::new()
            .handler("email", |query, value| {
                query.where_like("email", format!("{}%", value));
                Ok(())
            })
            .blacklist(["email"]);

        assert_eq!(resolve_handler::<Account, _>(&filter, "email"), None);
        filter.whitelist("email");
        assert_eq!(resolve_handler::<Account, _>(&filter, "email").as_deref(), Some("email"));
    }

    #[test]
    fn test_handler_error_stops_dispatch() {
        let input = FilterInput::new()
            .with("minScore", "lots")
            .with("username", "adon");

        let mut query = Account::query();
        let result = dispatch(&mut query, &AccountFilter, &input);

        assert_matches!(result, Err(Error::Handler(err)) if err.to_string().contains("minScore"));
        assert!(query.conditions().is_empty());
    }

    #[test]
    fn test_dispatch_is_deterministic() {
        let input = FilterInput::from_query_str("username=a&companyId=3&isAdmin=1&email=b");

        let first = dispatched(&input);
        let second = dispatched(&input);

        assert_eq!(first.to_sql(), second.to_sql());
    }

    #[derive(Default)]
    struct CountingFilter {
        setups: AtomicUsize,
    }

    #[model_filter(model = Account)]
    impl CountingFilter {
        fn setup(&self, query: &mut ModelQuery<Account>) -> anyhow::Result<()> {
            self.setups.fetch_add(1, Ordering::SeqCst);
            query.where_null("deleted_at");
            Ok(())
        }

        fn email(&self, query: &mut ModelQuery<Account>, value: &FilterValue) -> anyhow::Result<()> {
            query.where_eq("email", value);
            Ok(())
        }

        #[skip_filter]
        fn username(&self, _query: &mut ModelQuery<Account>, _value: &FilterValue) -> anyhow::Result<()> {
            anyhow::bail!("helper should not be dispatched")
        }
    }

    #[test]
    fn test_setup_runs_once_before_handlers() {
        let filter = CountingFilter::default();
        let input = FilterInput::new().with("email", "a").with("username", "b");

        let mut query = Account::query();
        dispatch(&mut query, &filter, &input).unwrap();

        assert_eq!(filter.setups.load(Ordering::SeqCst), 1);
        assert_eq!(
            query.conditions(),
            &[
                "\"deleted_at\" IS NULL".to_string(),
                "\"email\" = ?1".to_string(),
                "\"username\" = ?2".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_filter_applies_equality_everywhere() {
        struct EmptyFilter;

        #[model_filter(model = Account)]
        impl EmptyFilter {}

        let mut query = Account::query();
        dispatch(&mut query, &EmptyFilter, &FilterInput::new().with("email", "x")).unwrap();

        assert_eq!(query.conditions(), &["\"email\" = ?1".to_string()]);
    }
}
