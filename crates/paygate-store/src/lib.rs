//! Paygate persistence layer
//!
//! Repository contracts driven by query *specifications*, with two
//! interchangeable backends: ordered in-memory maps and PostgreSQL. The
//! orchestration layer only ever sees the traits in [`repo`].

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repo;
pub mod spec;

pub use error::{StoreError, StoreResult};
pub use repo::*;
pub use spec::*;

use std::sync::Arc;

use sqlx::PgPool;

use memory::{
    MemoryAccountRepository, MemoryCardRepository, MemoryChannelRepository,
    MemoryCurrencyRepository, MemoryInstrumentRepository, MemoryProfileRepository,
    MemoryRouteRepository, MemoryRouterRepository, MemorySessionStore,
    MemoryTransactionRepository,
};
use postgres::{
    PgAccountRepository, PgCardRepository, PgChannelRepository, PgCurrencyRepository,
    PgInstrumentRepository, PgProfileRepository, PgRouteRepository, PgRouterRepository,
    PgSessionStore, PgTransactionRepository,
};

/// Every store the gateway needs, behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub currencies: Arc<dyn CurrencyRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub channels: Arc<dyn ChannelRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub instruments: Arc<dyn InstrumentRepository>,
    pub routers: Arc<dyn RouterRepository>,
    pub routes: Arc<dyn RouteRepository>,
    pub cards: Arc<dyn CardRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Stores {
    /// Ordered-map stores. Used by tests and DSN-less deployments.
    pub fn in_memory() -> Self {
        Self {
            currencies: Arc::new(MemoryCurrencyRepository::new()),
            profiles: Arc::new(MemoryProfileRepository::new()),
            channels: Arc::new(MemoryChannelRepository::new()),
            accounts: Arc::new(MemoryAccountRepository::new()),
            instruments: Arc::new(MemoryInstrumentRepository::new()),
            routers: Arc::new(MemoryRouterRepository::new()),
            routes: Arc::new(MemoryRouteRepository::new()),
            cards: Arc::new(MemoryCardRepository::new()),
            transactions: Arc::new(MemoryTransactionRepository::new()),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }

    /// PostgreSQL stores sharing one pool. Embedded entities are
    /// hydrated through the sibling repositories.
    pub fn postgres(pool: PgPool) -> Self {
        let currencies: Arc<dyn CurrencyRepository> =
            Arc::new(PgCurrencyRepository::new(pool.clone()));
        let channels: Arc<dyn ChannelRepository> =
            Arc::new(PgChannelRepository::new(pool.clone()));
        let instruments: Arc<dyn InstrumentRepository> =
            Arc::new(PgInstrumentRepository::new(pool.clone()));
        let routers: Arc<dyn RouterRepository> = Arc::new(PgRouterRepository::new(pool.clone()));
        let profiles: Arc<dyn ProfileRepository> =
            Arc::new(PgProfileRepository::new(pool.clone(), currencies.clone()));
        let accounts: Arc<dyn AccountRepository> = Arc::new(PgAccountRepository::new(
            pool.clone(),
            currencies.clone(),
            channels.clone(),
        ));
        let routes: Arc<dyn RouteRepository> = Arc::new(PgRouteRepository::new(
            pool.clone(),
            profiles.clone(),
            instruments.clone(),
            accounts.clone(),
            routers.clone(),
        ));
        let cards: Arc<dyn CardRepository> = Arc::new(PgCardRepository::new(pool.clone()));
        let transactions: Arc<dyn TransactionRepository> = Arc::new(PgTransactionRepository::new(
            pool.clone(),
            profiles.clone(),
            accounts.clone(),
            instruments.clone(),
            currencies.clone(),
        ));
        let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool));

        Self {
            currencies,
            profiles,
            channels,
            accounts,
            instruments,
            routers,
            routes,
            cards,
            transactions,
            sessions,
        }
    }
}
