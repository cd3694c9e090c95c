//! PostgreSQL stores
//!
//! Each repository owns a pool handle and, where the entity embeds other
//! entities, the repositories needed to hydrate them. Queries use
//! `sqlx::query_as` row structs from [`models`].

mod account;
mod card;
mod channel;
mod currency;
mod instrument;
mod models;
mod profile;
mod route;
mod router;
mod session;
mod transaction;

pub use account::PgAccountRepository;
pub use card::PgCardRepository;
pub use channel::PgChannelRepository;
pub use currency::PgCurrencyRepository;
pub use instrument::PgInstrumentRepository;
pub use profile::PgProfileRepository;
pub use route::PgRouteRepository;
pub use router::PgRouterRepository;
pub use session::PgSessionStore;
pub use transaction::PgTransactionRepository;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::{StoreError, StoreResult};

/// Connect a pool from a DSN.
pub async fn connect(dsn: &str, max_connections: u32) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(dsn)
        .await?;
    Ok(pool)
}

/// Run the bundled schema migrations.
pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::InvalidInput(format!("migration failed: {e}")))?;
    Ok(())
}
