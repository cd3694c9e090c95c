//! Profile repository (PostgreSQL)

use std::sync::Arc;

use async_trait::async_trait;
use paygate_types::Profile;
use sqlx::PgPool;

use super::models::ProfileRow;
use crate::error::{StoreError, StoreResult};
use crate::repo::{CurrencyRepository, ProfileRepository};
use crate::spec::{CurrencySpec, ProfileSpec};

pub struct PgProfileRepository {
    pool: PgPool,
    currencies: Arc<dyn CurrencyRepository>,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool, currencies: Arc<dyn CurrencyRepository>) -> Self {
        Self { pool, currencies }
    }

    async fn hydrate(&self, row: ProfileRow) -> StoreResult<Profile> {
        let (_, currencies) = self
            .currencies
            .query(&CurrencySpec::ById(row.currency_id))
            .await?;
        let currency = currencies.into_iter().next().ok_or_else(|| {
            StoreError::NotFound(format!("currency with id={} not found", row.currency_id))
        })?;

        Ok(Profile {
            id: row.id,
            key: row.key,
            description: row.description,
            currency,
        })
    }

    async fn hydrate_all(&self, rows: Vec<ProfileRow>) -> StoreResult<Vec<Profile>> {
        let mut profiles = Vec::with_capacity(rows.len());
        for row in rows {
            profiles.push(self.hydrate(row).await?);
        }
        Ok(profiles)
    }
}

const COLUMNS: &str = "id, key, description, currency_id";

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn add(&self, profile: &mut Profile) -> StoreResult<()> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profiles (key, description, currency_id)
            VALUES ($1, $2, $3)
            RETURNING id, key, description, currency_id
            "#,
        )
        .bind(&profile.key)
        .bind(&profile.description)
        .bind(profile.currency.id)
        .fetch_one(&self.pool)
        .await?;

        profile.id = row.id;
        Ok(())
    }

    async fn update(&self, profile: &Profile) -> StoreResult<()> {
        let updated = sqlx::query(
            "UPDATE profiles SET key = $2, description = $3, currency_id = $4 WHERE id = $1",
        )
        .bind(profile.id)
        .bind(&profile.key)
        .bind(&profile.description)
        .bind(profile.currency.id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "profile with id={} not found",
                profile.id
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> StoreResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "DELETE FROM profiles WHERE id = $1 RETURNING id, key, description, currency_id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("profile with id={id} not found")))?;

        self.hydrate(row).await
    }

    async fn query(&self, spec: &ProfileSpec) -> StoreResult<(i64, Vec<Profile>)> {
        match spec {
            ProfileSpec::ById(id) => {
                let rows = sqlx::query_as::<_, ProfileRow>(&format!(
                    "SELECT {COLUMNS} FROM profiles WHERE id = $1"
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
                let total = rows.len() as i64;
                Ok((total, self.hydrate_all(rows).await?))
            }
            ProfileSpec::ByKey(key) => {
                let rows = sqlx::query_as::<_, ProfileRow>(&format!(
                    "SELECT {COLUMNS} FROM profiles WHERE key = $1"
                ))
                .bind(key)
                .fetch_all(&self.pool)
                .await?;
                let total = rows.len() as i64;
                Ok((total, self.hydrate_all(rows).await?))
            }
            ProfileSpec::Page(p) => {
                let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM profiles")
                    .fetch_one(&self.pool)
                    .await?;
                let rows = sqlx::query_as::<_, ProfileRow>(&format!(
                    "SELECT {COLUMNS} FROM profiles ORDER BY id LIMIT $1 OFFSET $2"
                ))
                .bind(p.limit)
                .bind(p.offset)
                .fetch_all(&self.pool)
                .await?;
                Ok((total, self.hydrate_all(rows).await?))
            }
            ProfileSpec::All => {
                let rows = sqlx::query_as::<_, ProfileRow>(&format!(
                    "SELECT {COLUMNS} FROM profiles ORDER BY id"
                ))
                .fetch_all(&self.pool)
                .await?;
                let total = rows.len() as i64;
                Ok((total, self.hydrate_all(rows).await?))
            }
        }
    }
}
