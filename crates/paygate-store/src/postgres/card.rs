//! Card repository (PostgreSQL)

use async_trait::async_trait;
use paygate_types::Card;
use sqlx::PgPool;

use super::models::CardRow;
use crate::error::StoreResult;
use crate::repo::CardRepository;
use crate::spec::CardSpec;

pub struct PgCardRepository {
    pool: PgPool,
}

impl PgCardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entity(row: CardRow) -> Card {
    Card {
        id: row.id,
        pan: row.pan,
        exp_date: row.exp_date,
        holder: row.holder,
    }
}

#[async_trait]
impl CardRepository for PgCardRepository {
    async fn add(&self, card: &mut Card) -> StoreResult<()> {
        let row = sqlx::query_as::<_, CardRow>(
            r#"
            INSERT INTO cards (pan, exp_date, holder)
            VALUES ($1, $2, $3)
            RETURNING id, pan, exp_date, holder
            "#,
        )
        .bind(&card.pan)
        .bind(card.exp_date)
        .bind(&card.holder)
        .fetch_one(&self.pool)
        .await?;

        card.id = row.id;
        Ok(())
    }

    async fn query(&self, spec: &CardSpec) -> StoreResult<(i64, Vec<Card>)> {
        let rows = match spec {
            CardSpec::ById(id) => {
                sqlx::query_as::<_, CardRow>(
                    "SELECT id, pan, exp_date, holder FROM cards WHERE id = $1",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            CardSpec::ByPan(pan) => {
                sqlx::query_as::<_, CardRow>(
                    "SELECT id, pan, exp_date, holder FROM cards WHERE pan = $1",
                )
                .bind(pan)
                .fetch_all(&self.pool)
                .await?
            }
            CardSpec::All => {
                sqlx::query_as::<_, CardRow>("SELECT id, pan, exp_date, holder FROM cards ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let total = rows.len() as i64;
        Ok((total, rows.into_iter().map(entity).collect()))
    }
}
