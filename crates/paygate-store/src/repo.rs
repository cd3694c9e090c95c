//! Repository contracts
//!
//! Every entity offers add/update/delete/query-by-specification. `add`
//! assigns the id on the passed entity; `update` and `delete` surface
//! `StoreError::NotFound` for missing rows. `query` returns the total
//! match count alongside the (possibly paginated) page.

use std::collections::HashMap;

use async_trait::async_trait;
use paygate_types::{
    Account, Card, Channel, Currency, Instrument, Profile, Route, Router, Session, Transaction,
    TransactionType,
};

use crate::error::StoreResult;
use crate::spec::{
    AccountSpec, CardSpec, ChannelSpec, CurrencySpec, InstrumentSpec, ProfileSpec, RouteSpec,
    RouterSpec, TransactionSpec,
};

/// Per-type sum and count aggregate over transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnOver {
    pub sum: i64,
    pub count: i64,
}

#[async_trait]
pub trait CurrencyRepository: Send + Sync {
    async fn add(&self, currency: &mut Currency) -> StoreResult<()>;
    async fn update(&self, currency: &Currency) -> StoreResult<()>;
    async fn delete(&self, id: i32) -> StoreResult<Currency>;
    async fn query(&self, spec: &CurrencySpec) -> StoreResult<(i64, Vec<Currency>)>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn add(&self, profile: &mut Profile) -> StoreResult<()>;
    async fn update(&self, profile: &Profile) -> StoreResult<()>;
    async fn delete(&self, id: i32) -> StoreResult<Profile>;
    async fn query(&self, spec: &ProfileSpec) -> StoreResult<(i64, Vec<Profile>)>;
}

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Insert with the caller-chosen id (channel ids are plugin-owned).
    async fn add(&self, channel: &Channel) -> StoreResult<()>;
    async fn query(&self, spec: &ChannelSpec) -> StoreResult<(i64, Vec<Channel>)>;
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn add(&self, account: &mut Account) -> StoreResult<()>;
    async fn update(&self, account: &Account) -> StoreResult<()>;
    async fn delete(&self, id: i32) -> StoreResult<Account>;
    async fn query(&self, spec: &AccountSpec) -> StoreResult<(i64, Vec<Account>)>;
}

#[async_trait]
pub trait InstrumentRepository: Send + Sync {
    /// Insert with the caller-chosen id (instrument ids are plugin-owned).
    async fn add(&self, instrument: &Instrument) -> StoreResult<()>;
    async fn query(&self, spec: &InstrumentSpec) -> StoreResult<(i64, Vec<Instrument>)>;
}

#[async_trait]
pub trait RouterRepository: Send + Sync {
    /// Insert with the caller-chosen id (router ids are plugin-owned).
    async fn add(&self, router: &Router) -> StoreResult<()>;
    async fn query(&self, spec: &RouterSpec) -> StoreResult<(i64, Vec<Router>)>;
}

#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn add(&self, route: &mut Route) -> StoreResult<()>;
    async fn update(&self, route: &Route) -> StoreResult<()>;
    async fn delete(&self, id: i32) -> StoreResult<Route>;
    async fn query(&self, spec: &RouteSpec) -> StoreResult<(i64, Vec<Route>)>;
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn add(&self, card: &mut Card) -> StoreResult<()>;
    async fn query(&self, spec: &CardSpec) -> StoreResult<(i64, Vec<Card>)>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn add(&self, tx: &mut Transaction) -> StoreResult<()>;
    async fn update(&self, tx: &Transaction) -> StoreResult<()>;
    async fn query(&self, spec: &TransactionSpec) -> StoreResult<(i64, Vec<Transaction>)>;

    /// Aggregate matching transactions by type. Used to enforce
    /// partial-operation budgets against a reference transaction.
    async fn type_turn_over(
        &self,
        spec: &TransactionSpec,
    ) -> StoreResult<HashMap<TransactionType, TurnOver>>;
}

/// Short-lived keyed blobs parking interactive-flow context.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn add(&self, session: Session) -> StoreResult<()>;
    async fn get(&self, key: &str) -> StoreResult<Option<Session>>;
}
