//! Transaction repository (PostgreSQL)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use paygate_types::{Transaction, TransactionType};
use sqlx::PgPool;

use super::models::{
    tx_status_from_column, tx_status_to_column, tx_type_from_column, tx_type_to_column,
    TransactionRow,
};
use crate::error::{StoreError, StoreResult};
use crate::repo::{
    AccountRepository, CurrencyRepository, InstrumentRepository, ProfileRepository,
    TransactionRepository, TurnOver,
};
use crate::spec::{AccountSpec, CurrencySpec, InstrumentSpec, ProfileSpec, TransactionSpec};

pub struct PgTransactionRepository {
    pool: PgPool,
    profiles: Arc<dyn ProfileRepository>,
    accounts: Arc<dyn AccountRepository>,
    instruments: Arc<dyn InstrumentRepository>,
    currencies: Arc<dyn CurrencyRepository>,
}

const COLUMNS: &str = "id, tx_type, status, profile_id, account_id, instrument_id, \
    instrument_ref, currency_id, amount, amount_converted, currency_converted_id, \
    order_id, customer, reference_id, remote_id, response_code, decline_reason, \
    auth_code, rrn, additional_data, browser_info, three_ds_method_url, \
    three_ds_secure_10, three_ds_secure_20, created_at, updated_at";

impl PgTransactionRepository {
    pub fn new(
        pool: PgPool,
        profiles: Arc<dyn ProfileRepository>,
        accounts: Arc<dyn AccountRepository>,
        instruments: Arc<dyn InstrumentRepository>,
        currencies: Arc<dyn CurrencyRepository>,
    ) -> Self {
        Self {
            pool,
            profiles,
            accounts,
            instruments,
            currencies,
        }
    }

    /// Rebuild the entity from a row. The reference chain is hydrated one
    /// level deep; a reference's own reference is always a root and is
    /// not needed by any caller.
    async fn hydrate(&self, row: TransactionRow) -> StoreResult<Transaction> {
        let reference_id = row.reference_id;
        let mut tx = self.hydrate_shallow(row).await?;

        if let Some(reference_id) = reference_id {
            let reference_row = self.fetch_row(reference_id).await?.ok_or_else(|| {
                StoreError::NotFound(format!(
                    "reference transaction with id={reference_id} not found"
                ))
            })?;
            tx.reference = Some(Box::new(self.hydrate_shallow(reference_row).await?));
        }

        Ok(tx)
    }

    async fn hydrate_shallow(&self, row: TransactionRow) -> StoreResult<Transaction> {
        let (_, profiles) = self.profiles.query(&ProfileSpec::ById(row.profile_id)).await?;
        let profile = profiles.into_iter().next().ok_or_else(|| {
            StoreError::NotFound(format!("profile with id={} not found", row.profile_id))
        })?;

        let (_, accounts) = self.accounts.query(&AccountSpec::ById(row.account_id)).await?;
        let account = accounts.into_iter().next().ok_or_else(|| {
            StoreError::NotFound(format!("account with id={} not found", row.account_id))
        })?;

        let (_, instruments) = self
            .instruments
            .query(&InstrumentSpec::ById(row.instrument_id))
            .await?;
        let instrument = instruments.into_iter().next().ok_or_else(|| {
            StoreError::NotFound(format!(
                "instrument with id={} not found",
                row.instrument_id
            ))
        })?;

        let (_, currencies) = self
            .currencies
            .query(&CurrencySpec::ById(row.currency_id))
            .await?;
        let currency = currencies.into_iter().next().ok_or_else(|| {
            StoreError::NotFound(format!("currency with id={} not found", row.currency_id))
        })?;

        let (_, converted) = self
            .currencies
            .query(&CurrencySpec::ById(row.currency_converted_id))
            .await?;
        let currency_converted = converted.into_iter().next().ok_or_else(|| {
            StoreError::NotFound(format!(
                "currency with id={} not found",
                row.currency_converted_id
            ))
        })?;

        Ok(Transaction {
            id: row.id,
            tx_type: tx_type_from_column(&row.tx_type)?,
            status: tx_status_from_column(&row.status)?,
            profile,
            account,
            instrument,
            instrument_id: row.instrument_ref,
            currency,
            amount: row.amount,
            amount_converted: row.amount_converted,
            currency_converted,
            order_id: row.order_id,
            customer: row.customer,
            reference: None,
            remote_id: row.remote_id,
            response_code: row.response_code,
            decline_reason: row.decline_reason,
            auth_code: row.auth_code,
            rrn: row.rrn,
            additional_data: row.additional_data,
            browser_info: row
                .browser_info
                .map(serde_json::from_value)
                .transpose()?,
            three_ds_method_url: row
                .three_ds_method_url
                .map(serde_json::from_value)
                .transpose()?,
            three_ds_secure_10: row
                .three_ds_secure_10
                .map(serde_json::from_value)
                .transpose()?,
            three_ds_secure_20: row
                .three_ds_secure_20
                .map(serde_json::from_value)
                .transpose()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn fetch_row(&self, id: i64) -> StoreResult<Option<TransactionRow>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    fn json_opt<T: serde::Serialize>(value: &Option<T>) -> StoreResult<Option<serde_json::Value>> {
        value
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(Into::into)
    }
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn add(&self, tx: &mut Transaction) -> StoreResult<()> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO transactions
                (tx_type, status, profile_id, account_id, instrument_id, instrument_ref,
                 currency_id, amount, amount_converted, currency_converted_id, order_id,
                 customer, reference_id, remote_id, response_code, decline_reason,
                 auth_code, rrn, additional_data, browser_info, three_ds_method_url,
                 three_ds_secure_10, three_ds_secure_20, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
            RETURNING id
            "#,
        )
        .bind(tx_type_to_column(tx.tx_type))
        .bind(tx_status_to_column(&tx.status))
        .bind(tx.profile.id)
        .bind(tx.account.id)
        .bind(tx.instrument.id)
        .bind(tx.instrument_id)
        .bind(tx.currency.id)
        .bind(tx.amount)
        .bind(tx.amount_converted)
        .bind(tx.currency_converted.id)
        .bind(&tx.order_id)
        .bind(&tx.customer)
        .bind(tx.reference.as_ref().map(|r| r.id))
        .bind(&tx.remote_id)
        .bind(&tx.response_code)
        .bind(&tx.decline_reason)
        .bind(&tx.auth_code)
        .bind(&tx.rrn)
        .bind(&tx.additional_data)
        .bind(Self::json_opt(&tx.browser_info)?)
        .bind(Self::json_opt(&tx.three_ds_method_url)?)
        .bind(Self::json_opt(&tx.three_ds_secure_10)?)
        .bind(Self::json_opt(&tx.three_ds_secure_20)?)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .fetch_one(&self.pool)
        .await?;

        tx.id = id;
        Ok(())
    }

    async fn update(&self, tx: &Transaction) -> StoreResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $2, remote_id = $3, response_code = $4, decline_reason = $5,
                auth_code = $6, rrn = $7, additional_data = $8, three_ds_method_url = $9,
                three_ds_secure_10 = $10, three_ds_secure_20 = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(tx.id)
        .bind(tx_status_to_column(&tx.status))
        .bind(&tx.remote_id)
        .bind(&tx.response_code)
        .bind(&tx.decline_reason)
        .bind(&tx.auth_code)
        .bind(&tx.rrn)
        .bind(&tx.additional_data)
        .bind(Self::json_opt(&tx.three_ds_method_url)?)
        .bind(Self::json_opt(&tx.three_ds_secure_10)?)
        .bind(Self::json_opt(&tx.three_ds_secure_20)?)
        .bind(tx.updated_at)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "transaction with id={} not found",
                tx.id
            )));
        }
        Ok(())
    }

    async fn query(&self, spec: &TransactionSpec) -> StoreResult<(i64, Vec<Transaction>)> {
        let rows = match spec {
            TransactionSpec::ById(id) => match self.fetch_row(*id).await? {
                Some(row) => vec![row],
                None => vec![],
            },
            TransactionSpec::ByReferenceAndStatus {
                reference_id,
                status,
            } => {
                sqlx::query_as::<_, TransactionRow>(&format!(
                    "SELECT {COLUMNS} FROM transactions WHERE reference_id = $1 AND status = $2"
                ))
                .bind(reference_id)
                .bind(tx_status_to_column(status))
                .fetch_all(&self.pool)
                .await?
            }
            TransactionSpec::Page(p) => {
                let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions")
                    .fetch_one(&self.pool)
                    .await?;
                let rows = sqlx::query_as::<_, TransactionRow>(&format!(
                    "SELECT {COLUMNS} FROM transactions ORDER BY id LIMIT $1 OFFSET $2"
                ))
                .bind(p.limit)
                .bind(p.offset)
                .fetch_all(&self.pool)
                .await?;
                let mut txs = Vec::with_capacity(rows.len());
                for row in rows {
                    txs.push(self.hydrate(row).await?);
                }
                return Ok((total, txs));
            }
            TransactionSpec::All => {
                sqlx::query_as::<_, TransactionRow>(&format!(
                    "SELECT {COLUMNS} FROM transactions ORDER BY id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        let total = rows.len() as i64;
        let mut txs = Vec::with_capacity(rows.len());
        for row in rows {
            txs.push(self.hydrate(row).await?);
        }
        Ok((total, txs))
    }

    async fn type_turn_over(
        &self,
        spec: &TransactionSpec,
    ) -> StoreResult<HashMap<TransactionType, TurnOver>> {
        let rows: Vec<(String, i64, i64)> = match spec {
            TransactionSpec::ByReferenceAndStatus {
                reference_id,
                status,
            } => {
                sqlx::query_as(
                    r#"
                    SELECT tx_type, COALESCE(SUM(amount), 0)::BIGINT, COUNT(*)
                    FROM transactions
                    WHERE reference_id = $1 AND status = $2
                    GROUP BY tx_type
                    "#,
                )
                .bind(reference_id)
                .bind(tx_status_to_column(status))
                .fetch_all(&self.pool)
                .await?
            }
            other => {
                return Err(StoreError::InvalidInput(format!(
                    "type_turn_over does not support specification {other:?}"
                )))
            }
        };

        let mut agg = HashMap::new();
        for (tx_type, sum, count) in rows {
            agg.insert(tx_type_from_column(&tx_type)?, TurnOver { sum, count });
        }
        Ok(agg)
    }
}
