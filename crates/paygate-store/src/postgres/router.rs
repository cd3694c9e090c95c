//! Router repository (PostgreSQL)

use async_trait::async_trait;
use paygate_types::Router;
use sqlx::PgPool;

use super::models::RouterRow;
use crate::error::StoreResult;
use crate::repo::RouterRepository;
use crate::spec::RouterSpec;

pub struct PgRouterRepository {
    pool: PgPool,
}

impl PgRouterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RouterRepository for PgRouterRepository {
    async fn add(&self, router: &Router) -> StoreResult<()> {
        sqlx::query("INSERT INTO routers (id, key) VALUES ($1, $2)")
            .bind(router.id)
            .bind(&router.key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query(&self, spec: &RouterSpec) -> StoreResult<(i64, Vec<Router>)> {
        let rows = match spec {
            RouterSpec::ById(id) => {
                sqlx::query_as::<_, RouterRow>("SELECT id, key FROM routers WHERE id = $1")
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await?
            }
            RouterSpec::ByKey(key) => {
                sqlx::query_as::<_, RouterRow>("SELECT id, key FROM routers WHERE key = $1")
                    .bind(key)
                    .fetch_all(&self.pool)
                    .await?
            }
            RouterSpec::All => {
                sqlx::query_as::<_, RouterRow>("SELECT id, key FROM routers ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let total = rows.len() as i64;
        Ok((
            total,
            rows.into_iter()
                .map(|r| Router { id: r.id, key: r.key })
                .collect(),
        ))
    }
}
