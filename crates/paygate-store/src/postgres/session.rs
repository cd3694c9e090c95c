//! Session store (PostgreSQL)

use async_trait::async_trait;
use paygate_types::Session;
use sqlx::PgPool;

use super::models::SessionRow;
use crate::error::{StoreError, StoreResult};
use crate::repo::SessionStore;

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn add(&self, session: Session) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (key, data)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET data = EXCLUDED.data
            "#,
        )
        .bind(&session.key)
        .bind(serde_json::Value::Object(session.data))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT key, data FROM sessions WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| match r.data {
            serde_json::Value::Object(data) => Ok(Session { key: r.key, data }),
            other => Err(StoreError::InvalidInput(format!(
                "session {} holds a non-object blob: {other}",
                r.key
            ))),
        })
        .transpose()
    }
}
