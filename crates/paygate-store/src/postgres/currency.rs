//! Currency repository (PostgreSQL)

use async_trait::async_trait;
use paygate_types::Currency;
use sqlx::PgPool;

use super::models::CurrencyRow;
use crate::error::{StoreError, StoreResult};
use crate::repo::CurrencyRepository;
use crate::spec::CurrencySpec;

pub struct PgCurrencyRepository {
    pool: PgPool,
}

impl PgCurrencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entity(row: CurrencyRow) -> Currency {
    Currency {
        id: row.id,
        numeric_code: row.numeric_code,
        char_code: row.char_code,
        name: row.name,
        exponent: row.exponent,
    }
}

const COLUMNS: &str = "id, numeric_code, char_code, name, exponent";

#[async_trait]
impl CurrencyRepository for PgCurrencyRepository {
    async fn add(&self, currency: &mut Currency) -> StoreResult<()> {
        let row = sqlx::query_as::<_, CurrencyRow>(
            r#"
            INSERT INTO currencies (numeric_code, char_code, name, exponent)
            VALUES ($1, $2, $3, $4)
            RETURNING id, numeric_code, char_code, name, exponent
            "#,
        )
        .bind(currency.numeric_code)
        .bind(&currency.char_code)
        .bind(&currency.name)
        .bind(currency.exponent)
        .fetch_one(&self.pool)
        .await?;

        currency.id = row.id;
        Ok(())
    }

    async fn update(&self, currency: &Currency) -> StoreResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE currencies
            SET numeric_code = $2, char_code = $3, name = $4, exponent = $5
            WHERE id = $1
            "#,
        )
        .bind(currency.id)
        .bind(currency.numeric_code)
        .bind(&currency.char_code)
        .bind(&currency.name)
        .bind(currency.exponent)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "currency with id={} not found",
                currency.id
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> StoreResult<Currency> {
        let row = sqlx::query_as::<_, CurrencyRow>(
            "DELETE FROM currencies WHERE id = $1 RETURNING id, numeric_code, char_code, name, exponent",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("currency with id={id} not found")))?;

        Ok(entity(row))
    }

    async fn query(&self, spec: &CurrencySpec) -> StoreResult<(i64, Vec<Currency>)> {
        let rows = match spec {
            CurrencySpec::ById(id) => {
                sqlx::query_as::<_, CurrencyRow>(&format!(
                    "SELECT {COLUMNS} FROM currencies WHERE id = $1"
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            CurrencySpec::ByNumericCode(code) => {
                sqlx::query_as::<_, CurrencyRow>(&format!(
                    "SELECT {COLUMNS} FROM currencies WHERE numeric_code = $1"
                ))
                .bind(code)
                .fetch_all(&self.pool)
                .await?
            }
            CurrencySpec::Page(p) => {
                let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM currencies")
                    .fetch_one(&self.pool)
                    .await?;
                let rows = sqlx::query_as::<_, CurrencyRow>(&format!(
                    "SELECT {COLUMNS} FROM currencies ORDER BY id LIMIT $1 OFFSET $2"
                ))
                .bind(p.limit)
                .bind(p.offset)
                .fetch_all(&self.pool)
                .await?;
                return Ok((total, rows.into_iter().map(entity).collect()));
            }
            CurrencySpec::All => {
                sqlx::query_as::<_, CurrencyRow>(&format!(
                    "SELECT {COLUMNS} FROM currencies ORDER BY id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        let total = rows.len() as i64;
        Ok((total, rows.into_iter().map(entity).collect()))
    }
}
