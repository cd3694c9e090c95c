//! Route repository (PostgreSQL)

use std::sync::Arc;

use async_trait::async_trait;
use paygate_types::Route;
use sqlx::PgPool;

use super::models::RouteRow;
use crate::error::{StoreError, StoreResult};
use crate::repo::{
    AccountRepository, InstrumentRepository, ProfileRepository, RouteRepository, RouterRepository,
};
use crate::spec::{AccountSpec, InstrumentSpec, ProfileSpec, RouteSpec, RouterSpec};

pub struct PgRouteRepository {
    pool: PgPool,
    profiles: Arc<dyn ProfileRepository>,
    instruments: Arc<dyn InstrumentRepository>,
    accounts: Arc<dyn AccountRepository>,
    routers: Arc<dyn RouterRepository>,
}

impl PgRouteRepository {
    pub fn new(
        pool: PgPool,
        profiles: Arc<dyn ProfileRepository>,
        instruments: Arc<dyn InstrumentRepository>,
        accounts: Arc<dyn AccountRepository>,
        routers: Arc<dyn RouterRepository>,
    ) -> Self {
        Self {
            pool,
            profiles,
            instruments,
            accounts,
            routers,
        }
    }

    async fn hydrate(&self, row: RouteRow) -> StoreResult<Route> {
        let (_, profiles) = self.profiles.query(&ProfileSpec::ById(row.profile_id)).await?;
        let profile = profiles.into_iter().next().ok_or_else(|| {
            StoreError::NotFound(format!("profile with id={} not found", row.profile_id))
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

        let account = match row.account_id {
            Some(id) => {
                let (_, accounts) = self.accounts.query(&AccountSpec::ById(id)).await?;
                Some(accounts.into_iter().next().ok_or_else(|| {
                    StoreError::NotFound(format!("account with id={id} not found"))
                })?)
            }
            None => None,
        };

        let router = match row.router_id {
            Some(id) => {
                let (_, routers) = self.routers.query(&RouterSpec::ById(id)).await?;
                Some(routers.into_iter().next().ok_or_else(|| {
                    StoreError::NotFound(format!("router with id={id} not found"))
                })?)
            }
            None => None,
        };

        Ok(Route {
            id: row.id,
            profile,
            instrument,
            account,
            router,
            settings: row.settings,
        })
    }

    async fn hydrate_all(&self, rows: Vec<RouteRow>) -> StoreResult<Vec<Route>> {
        let mut routes = Vec::with_capacity(rows.len());
        for row in rows {
            routes.push(self.hydrate(row).await?);
        }
        Ok(routes)
    }
}

const COLUMNS: &str = "id, profile_id, instrument_id, account_id, router_id, settings";

#[async_trait]
impl RouteRepository for PgRouteRepository {
    async fn add(&self, route: &mut Route) -> StoreResult<()> {
        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO routes (profile_id, instrument_id, account_id, router_id, settings)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(route.profile.id)
        .bind(route.instrument.id)
        .bind(route.account.as_ref().map(|a| a.id))
        .bind(route.router.as_ref().map(|r| r.id))
        .bind(&route.settings)
        .fetch_one(&self.pool)
        .await?;

        route.id = id;
        Ok(())
    }

    async fn update(&self, route: &Route) -> StoreResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE routes
            SET profile_id = $2, instrument_id = $3, account_id = $4, router_id = $5,
                settings = $6
            WHERE id = $1
            "#,
        )
        .bind(route.id)
        .bind(route.profile.id)
        .bind(route.instrument.id)
        .bind(route.account.as_ref().map(|a| a.id))
        .bind(route.router.as_ref().map(|r| r.id))
        .bind(&route.settings)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "route with id={} not found",
                route.id
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: i32) -> StoreResult<Route> {
        let row = sqlx::query_as::<_, RouteRow>(&format!(
            "DELETE FROM routes WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("route with id={id} not found")))?;

        self.hydrate(row).await
    }

    async fn query(&self, spec: &RouteSpec) -> StoreResult<(i64, Vec<Route>)> {
        match spec {
            RouteSpec::ById(id) => {
                let rows = sqlx::query_as::<_, RouteRow>(&format!(
                    "SELECT {COLUMNS} FROM routes WHERE id = $1"
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
                let total = rows.len() as i64;
                Ok((total, self.hydrate_all(rows).await?))
            }
            RouteSpec::ByProfileAndInstrument {
                profile_id,
                instrument_id,
            } => {
                let rows = sqlx::query_as::<_, RouteRow>(&format!(
                    "SELECT {COLUMNS} FROM routes WHERE profile_id = $1 AND instrument_id = $2"
                ))
                .bind(profile_id)
                .bind(instrument_id)
                .fetch_all(&self.pool)
                .await?;
                let total = rows.len() as i64;
                Ok((total, self.hydrate_all(rows).await?))
            }
            RouteSpec::Page(p) => {
                let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM routes")
                    .fetch_one(&self.pool)
                    .await?;
                let rows = sqlx::query_as::<_, RouteRow>(&format!(
                    "SELECT {COLUMNS} FROM routes ORDER BY id LIMIT $1 OFFSET $2"
                ))
                .bind(p.limit)
                .bind(p.offset)
                .fetch_all(&self.pool)
                .await?;
                Ok((total, self.hydrate_all(rows).await?))
            }
            RouteSpec::All => {
                let rows = sqlx::query_as::<_, RouteRow>(&format!(
                    "SELECT {COLUMNS} FROM routes ORDER BY id"
                ))
                .fetch_all(&self.pool)
                .await?;
                let total = rows.len() as i64;
                Ok((total, self.hydrate_all(rows).await?))
            }
        }
    }
}
