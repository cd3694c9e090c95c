//! Account repository (PostgreSQL)

use std::sync::Arc;

use async_trait::async_trait;
use paygate_types::Account;
use sqlx::PgPool;

use super::models::AccountRow;
use crate::error::{StoreError, StoreResult};
use crate::repo::{AccountRepository, ChannelRepository, CurrencyRepository};
use crate::spec::{AccountSpec, ChannelSpec, CurrencySpec};

pub struct PgAccountRepository {
    pool: PgPool,
    currencies: Arc<dyn CurrencyRepository>,
    channels: Arc<dyn ChannelRepository>,
}

impl PgAccountRepository {
    pub fn new(
        pool: PgPool,
        currencies: Arc<dyn CurrencyRepository>,
        channels: Arc<dyn ChannelRepository>,
    ) -> Self {
        Self {
            pool,
            currencies,
            channels,
        }
    }

    async fn hydrate(&self, row: AccountRow) -> StoreResult<Account> {
        let (_, currencies) = self
            .currencies
            .query(&CurrencySpec::ById(row.currency_id))
            .await?;
        let currency = currencies.into_iter().next().ok_or_else(|| {
            StoreError::NotFound(format!("currency with id={} not found", row.currency_id))
        })?;

        let (_, channels) = self.channels.query(&ChannelSpec::ById(row.channel_id)).await?;
        let channel = channels.into_iter().next().ok_or_else(|| {
            StoreError::NotFound(format!("channel with id={} not found", row.channel_id))
        })?;

        Ok(Account {
            id: row.id,
            is_enabled: row.is_enabled,
            is_test: row.is_test,
            rebill_enabled: row.rebill_enabled,
            refund_enabled: row.refund_enabled,
            reversal_enabled: row.reversal_enabled,
            partial_confirm_enabled: row.partial_confirm_enabled,
            partial_reversal_enabled: row.partial_reversal_enabled,
            partial_refund_enabled: row.partial_refund_enabled,
            currency_conversion_enabled: row.currency_conversion_enabled,
            currency,
            channel,
            settings: row.settings,
        })
    }

    async fn hydrate_all(&self, rows: Vec<AccountRow>) -> StoreResult<Vec<Account>> {
        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            accounts.push(self.hydrate(row).await?);
        }
        Ok(accounts)
    }
}

const COLUMNS: &str = "id, is_enabled, is_test, rebill_enabled, refund_enabled, \
    reversal_enabled, partial_confirm_enabled, partial_reversal_enabled, \
    partial_refund_enabled, currency_conversion_enabled, currency_id, channel_id, settings";

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn add(&self, account: &mut Account) -> StoreResult<()> {
        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO accounts
                (is_enabled, is_test, rebill_enabled, refund_enabled, reversal_enabled,
                 partial_confirm_enabled, partial_reversal_enabled, partial_refund_enabled,
                 currency_conversion_enabled, currency_id, channel_id, settings)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(account.is_enabled)
        .bind(account.is_test)
        .bind(account.rebill_enabled)
        .bind(account.refund_enabled)
        .bind(account.reversal_enabled)
        .bind(account.partial_confirm_enabled)
        .bind(account.partial_reversal_enabled)
        .bind(account.partial_refund_enabled)
        .bind(account.currency_conversion_enabled)
        .bind(account.currency.id)
        .bind(account.channel.id)
        .bind(&account.settings)
        .fetch_one(&self.pool)
        .await?;

        account.id = id;
        Ok(())
    }

    async fn update(&self, account: &Account) -> StoreResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET is_enabled = $2, is_test = $3, rebill_enabled = $4, refund_enabled = $5,
                reversal_enabled = $6, partial_confirm_enabled = $7,
                partial_reversal_enabled = $8, partial_refund_enabled = $9,
                currency_conversion_enabled = $10, currency_id = $11, channel_id = $12,
                settings = $13
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(account.is_enabled)
        .bind(account.is_test)
        .bind(account.rebill_enabled)
        .bind(account.refund_enabled)
        .bind(account.reversal_enabled)
        .bind(account.partial_confirm_enabled)
        .bind(account.partial_reversal_enabled)
        .bind(account.partial_refund_enabled)
        .bind(account.currency_conversion_enabled)
        .bind(account.currency.id)
        .bind(account.channel.id)
        .bind(&account.settings)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "account with id={} not found",
                account.id
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> StoreResult<Account> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "DELETE FROM accounts WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("account with id={id} not found")))?;

        self.hydrate(row).await
    }

    async fn query(&self, spec: &AccountSpec) -> StoreResult<(i64, Vec<Account>)> {
        match spec {
            AccountSpec::ById(id) => {
                let rows = sqlx::query_as::<_, AccountRow>(&format!(
                    "SELECT {COLUMNS} FROM accounts WHERE id = $1"
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
                let total = rows.len() as i64;
                Ok((total, self.hydrate_all(rows).await?))
            }
            AccountSpec::Page(p) => {
                let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
                    .fetch_one(&self.pool)
                    .await?;
                let rows = sqlx::query_as::<_, AccountRow>(&format!(
                    "SELECT {COLUMNS} FROM accounts ORDER BY id LIMIT $1 OFFSET $2"
                ))
                .bind(p.limit)
                .bind(p.offset)
                .fetch_all(&self.pool)
                .await?;
                Ok((total, self.hydrate_all(rows).await?))
            }
            AccountSpec::All => {
                let rows = sqlx::query_as::<_, AccountRow>(&format!(
                    "SELECT {COLUMNS} FROM accounts ORDER BY id"
                ))
                .fetch_all(&self.pool)
                .await?;
                let total = rows.len() as i64;
                Ok((total, self.hydrate_all(rows).await?))
            }
        }
    }
}
