//! Models and filters shared by unit tests

use anyhow::Context;

use super::{FilterValue, Filterable, ModelFilter};
use crate::model_filter;
use crate::orm::{DatabaseEntity, ModelQuery, Operator};

pub(crate) struct Account;

impl DatabaseEntity for Account {
    const TABLE_NAME: &'static str = "accounts";
    const PRIMARY_KEY: &'static str = "id";
    const DEFAULT_SORT: &'static str = "id";

    fn column_names() -> &'static [&'static str] {
        &["id", "username", "email", "is_admin", "company_id", "score", "deleted_at"]
    }
}

impl Filterable for Account {
    fn default_filter() -> Option<Box<dyn ModelFilter<Self>>> {
        Some(Box::new(AccountFilter))
    }
}

pub(crate) struct AccountFilter;

#[model_filter(model = Account, blacklist = ["secret"])]
impl AccountFilter {
    fn username(&self, query: &mut ModelQuery<Account>, value: &FilterValue) -> anyhow::Result<()> {
        query.where_like("username", format!("%{}%", value));
        Ok(())
    }

    fn email(&self, query: &mut ModelQuery<Account>, value: &FilterValue) -> anyhow::Result<()> {
        query.where_like("email", format!("%{}%", value));
        Ok(())
    }

    fn company(&self, query: &mut ModelQuery<Account>, value: &FilterValue) -> anyhow::Result<()> {
        query.where_eq("company_id", value);
        Ok(())
    }

    fn min_score(&self, query: &mut ModelQuery<Account>, value: &FilterValue) -> anyhow::Result<()> {
        let score = value
            .as_i64()
            .with_context(|| format!("minScore expects an integer, got '{}'", value))?;
        query.where_op("score", Operator::Gte, score);
        Ok(())
    }

    fn secret(&self, query: &mut ModelQuery<Account>, _value: &FilterValue) -> anyhow::Result<()> {
        query.where_raw("1 = 0", Vec::new());
        Ok(())
    }
}

/// A model without a default filter
pub(crate) struct Ledger;

impl DatabaseEntity for Ledger {
    const TABLE_NAME: &'static str = "ledgers";
    const PRIMARY_KEY: &'static str = "id";
    const DEFAULT_SORT: &'static str = "id";

    fn column_names() -> &'static [&'static str] {
        &["id", "amount"]
    }
}

impl Filterable for Ledger {}
