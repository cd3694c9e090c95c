//! Channel repository (PostgreSQL)
//!
//! Channel rows are the persisted mirror of the plugin registry; ids are
//! chosen by the plugins, not the database.

use async_trait::async_trait;
use paygate_types::Channel;
use sqlx::PgPool;

use super::models::ChannelRow;
use crate::error::StoreResult;
use crate::repo::ChannelRepository;
use crate::spec::ChannelSpec;

pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entity(row: ChannelRow) -> Channel {
    Channel {
        id: row.id,
        type_id: row.type_id,
        key: row.key,
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn add(&self, channel: &Channel) -> StoreResult<()> {
        sqlx::query("INSERT INTO channels (id, type_id, key) VALUES ($1, $2, $3)")
            .bind(channel.id)
            .bind(channel.type_id)
            .bind(&channel.key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query(&self, spec: &ChannelSpec) -> StoreResult<(i64, Vec<Channel>)> {
        let rows = match spec {
            ChannelSpec::ById(id) => {
                sqlx::query_as::<_, ChannelRow>(
                    "SELECT id, type_id, key FROM channels WHERE id = $1",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            ChannelSpec::ByKey(key) => {
                sqlx::query_as::<_, ChannelRow>(
                    "SELECT id, type_id, key FROM channels WHERE key = $1",
                )
                .bind(key)
                .fetch_all(&self.pool)
                .await?
            }
            ChannelSpec::ByTypeId(type_id) => {
                sqlx::query_as::<_, ChannelRow>(
                    "SELECT id, type_id, key FROM channels WHERE type_id = $1 ORDER BY id",
                )
                .bind(type_id)
                .fetch_all(&self.pool)
                .await?
            }
            ChannelSpec::All => {
                sqlx::query_as::<_, ChannelRow>("SELECT id, type_id, key FROM channels ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let total = rows.len() as i64;
        Ok((total, rows.into_iter().map(entity).collect()))
    }
}
