//! Instrument repository (PostgreSQL)

use async_trait::async_trait;
use paygate_types::Instrument;
use sqlx::PgPool;

use super::models::InstrumentRow;
use crate::error::StoreResult;
use crate::repo::InstrumentRepository;
use crate::spec::InstrumentSpec;

pub struct PgInstrumentRepository {
    pool: PgPool,
}

impl PgInstrumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstrumentRepository for PgInstrumentRepository {
    async fn add(&self, instrument: &Instrument) -> StoreResult<()> {
        sqlx::query("INSERT INTO instruments (id, key) VALUES ($1, $2)")
            .bind(instrument.id)
            .bind(&instrument.key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query(&self, spec: &InstrumentSpec) -> StoreResult<(i64, Vec<Instrument>)> {
        let rows = match spec {
            InstrumentSpec::ById(id) => {
                sqlx::query_as::<_, InstrumentRow>("SELECT id, key FROM instruments WHERE id = $1")
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            InstrumentSpec::ByKey(key) => {
                sqlx::query_as::<_, InstrumentRow>("SELECT id, key FROM instruments WHERE key = $1")
                    .bind(key)
                    .fetch_all(&self.pool)
                    .await?
            }
            InstrumentSpec::All => {
                sqlx::query_as::<_, InstrumentRow>("SELECT id, key FROM instruments ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let total = rows.len() as i64;
        Ok((
            total,
            rows.into_iter()
                .map(|r| Instrument { id: r.id, key: r.key })
                .collect(),
        ))
    }
}
