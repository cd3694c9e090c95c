//! In-memory stores
//!
//! Ordered-map stores used by tests and by deployments without a DSN.
//! Rows live in a `BTreeMap` keyed by a monotonically assigned id, so
//! iteration order matches insertion order.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use paygate_types::{
    Account, Card, Channel, Currency, Instrument, Profile, Route, Router, Session, Transaction,
    TransactionType,
};

use crate::error::{StoreError, StoreResult};
use crate::repo::{
    AccountRepository, CardRepository, ChannelRepository, CurrencyRepository,
    InstrumentRepository, ProfileRepository, RouteRepository, RouterRepository, SessionStore,
    TransactionRepository, TurnOver,
};
use crate::spec::{
    AccountSpec, CardSpec, ChannelSpec, CurrencySpec, InstrumentSpec, PageSpec, ProfileSpec,
    RouteSpec, RouterSpec, TransactionSpec,
};

trait HasId: Clone {
    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
}

macro_rules! has_i32_id {
    ($ty:ty) => {
        impl HasId for $ty {
            fn id(&self) -> i64 {
                self.id as i64
            }
            fn set_id(&mut self, id: i64) {
                self.id = id as i32;
            }
        }
    };
}

has_i32_id!(Currency);
has_i32_id!(Profile);
has_i32_id!(Channel);
has_i32_id!(Account);
has_i32_id!(Instrument);
has_i32_id!(Router);
has_i32_id!(Route);
has_i32_id!(Card);

impl HasId for Transaction {
    fn id(&self) -> i64 {
        self.id
    }
    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// One ordered table with monotonic id assignment.
struct Table<T> {
    rows: RwLock<BTreeMap<i64, T>>,
    next_id: AtomicI64,
}

impl<T: HasId> Table<T> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn insert_auto(&self, row: &mut T) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        row.set_id(id);
        self.rows.write().insert(id, row.clone());
    }

    fn insert_with_id(&self, row: &T, what: &str) -> StoreResult<()> {
        let mut rows = self.rows.write();
        if rows.contains_key(&row.id()) {
            return Err(StoreError::Conflict(format!(
                "{} with id={} already exists",
                what,
                row.id()
            )));
        }
        rows.insert(row.id(), row.clone());
        Ok(())
    }

    fn replace(&self, row: &T, what: &str) -> StoreResult<()> {
        let mut rows = self.rows.write();
        if !rows.contains_key(&row.id()) {
            return Err(StoreError::NotFound(format!(
                "{} with id={} not found",
                what,
                row.id()
            )));
        }
        rows.insert(row.id(), row.clone());
        Ok(())
    }

    fn remove(&self, id: i64, what: &str) -> StoreResult<T> {
        self.rows
            .write()
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("{what} with id={id} not found")))
    }

    fn select<F>(&self, pred: F, page: Option<PageSpec>) -> (i64, Vec<T>)
    where
        F: Fn(&T) -> bool,
    {
        let rows = self.rows.read();
        let matched: Vec<T> = rows.values().filter(|r| pred(r)).cloned().collect();
        let total = matched.len() as i64;
        let list = match page {
            Some(p) => matched
                .into_iter()
                .skip(p.offset.max(0) as usize)
                .take(p.limit.max(0) as usize)
                .collect(),
            None => matched,
        };
        (total, list)
    }
}

// ----------------------------------------------------------------------
// Entity stores
// ----------------------------------------------------------------------

pub struct MemoryCurrencyRepository {
    table: Table<Currency>,
}

impl MemoryCurrencyRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for MemoryCurrencyRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CurrencyRepository for MemoryCurrencyRepository {
    async fn add(&self, currency: &mut Currency) -> StoreResult<()> {
        self.table.insert_auto(currency);
        Ok(())
    }

    async fn update(&self, currency: &Currency) -> StoreResult<()> {
        self.table.replace(currency, "currency")
    }

    async fn delete(&self, id: i32) -> StoreResult<Currency> {
        self.table.remove(id as i64, "currency")
    }

    async fn query(&self, spec: &CurrencySpec) -> StoreResult<(i64, Vec<Currency>)> {
        Ok(match spec {
            CurrencySpec::ById(id) => self.table.select(|c| c.id == *id, None),
            CurrencySpec::ByNumericCode(code) => {
                self.table.select(|c| c.numeric_code == *code, None)
            }
            CurrencySpec::Page(p) => self.table.select(|_| true, Some(*p)),
            CurrencySpec::All => self.table.select(|_| true, None),
        })
    }
}

pub struct MemoryProfileRepository {
    table: Table<Profile>,
}

impl MemoryProfileRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for MemoryProfileRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfileRepository {
    async fn add(&self, profile: &mut Profile) -> StoreResult<()> {
        let (_, dup) = self.table.select(|p| p.key == profile.key, None);
        if !dup.is_empty() {
            return Err(StoreError::Conflict(format!(
                "profile with key={} already exists",
                profile.key
            )));
        }
        self.table.insert_auto(profile);
        Ok(())
    }

    async fn update(&self, profile: &Profile) -> StoreResult<()> {
        self.table.replace(profile, "profile")
    }

    async fn delete(&self, id: i32) -> StoreResult<Profile> {
        self.table.remove(id as i64, "profile")
    }

    async fn query(&self, spec: &ProfileSpec) -> StoreResult<(i64, Vec<Profile>)> {
        Ok(match spec {
            ProfileSpec::ById(id) => self.table.select(|p| p.id == *id, None),
            ProfileSpec::ByKey(key) => self.table.select(|p| p.key == *key, None),
            ProfileSpec::Page(p) => self.table.select(|_| true, Some(*p)),
            ProfileSpec::All => self.table.select(|_| true, None),
        })
    }
}

pub struct MemoryChannelRepository {
    table: Table<Channel>,
}

impl MemoryChannelRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for MemoryChannelRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelRepository for MemoryChannelRepository {
    async fn add(&self, channel: &Channel) -> StoreResult<()> {
        self.table.insert_with_id(channel, "channel")
    }

    async fn query(&self, spec: &ChannelSpec) -> StoreResult<(i64, Vec<Channel>)> {
        Ok(match spec {
            ChannelSpec::ById(id) => self.table.select(|c| c.id == *id, None),
            ChannelSpec::ByKey(key) => self.table.select(|c| c.key == *key, None),
            ChannelSpec::ByTypeId(type_id) => self.table.select(|c| c.type_id == *type_id, None),
            ChannelSpec::All => self.table.select(|_| true, None),
        })
    }
}

pub struct MemoryAccountRepository {
    table: Table<Account>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for MemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn add(&self, account: &mut Account) -> StoreResult<()> {
        self.table.insert_auto(account);
        Ok(())
    }

    async fn update(&self, account: &Account) -> StoreResult<()> {
        self.table.replace(account, "account")
    }

    async fn delete(&self, id: i32) -> StoreResult<Account> {
        self.table.remove(id as i64, "account")
    }

    async fn query(&self, spec: &AccountSpec) -> StoreResult<(i64, Vec<Account>)> {
        Ok(match spec {
            AccountSpec::ById(id) => self.table.select(|a| a.id == *id, None),
            AccountSpec::Page(p) => self.table.select(|_| true, Some(*p)),
            AccountSpec::All => self.table.select(|_| true, None),
        })
    }
}

pub struct MemoryInstrumentRepository {
    table: Table<Instrument>,
}

impl MemoryInstrumentRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for MemoryInstrumentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InstrumentRepository for MemoryInstrumentRepository {
    async fn add(&self, instrument: &Instrument) -> StoreResult<()> {
        self.table.insert_with_id(instrument, "instrument")
    }

    async fn query(&self, spec: &InstrumentSpec) -> StoreResult<(i64, Vec<Instrument>)> {
        Ok(match spec {
            InstrumentSpec::ById(id) => self.table.select(|i| i.id == *id, None),
            InstrumentSpec::ByKey(key) => self.table.select(|i| i.key == *key, None),
            InstrumentSpec::All => self.table.select(|_| true, None),
        })
    }
}

pub struct MemoryRouterRepository {
    table: Table<Router>,
}

impl MemoryRouterRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for MemoryRouterRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouterRepository for MemoryRouterRepository {
    async fn add(&self, router: &Router) -> StoreResult<()> {
        self.table.insert_with_id(router, "router")
    }

    async fn query(&self, spec: &RouterSpec) -> StoreResult<(i64, Vec<Router>)> {
        Ok(match spec {
            RouterSpec::ById(id) => self.table.select(|r| r.id == *id, None),
            RouterSpec::ByKey(key) => self.table.select(|r| r.key == *key, None),
            RouterSpec::All => self.table.select(|_| true, None),
        })
    }
}

pub struct MemoryRouteRepository {
    table: Table<Route>,
}

impl MemoryRouteRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for MemoryRouteRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouteRepository for MemoryRouteRepository {
    async fn add(&self, route: &mut Route) -> StoreResult<()> {
        self.table.insert_auto(route);
        Ok(())
    }

    async fn update(&self, route: &Route) -> StoreResult<()> {
        self.table.replace(route, "route")
    }

    async fn delete(&self, id: i32) -> StoreResult<Route> {
        self.table.remove(id as i64, "route")
    }

    async fn query(&self, spec: &RouteSpec) -> StoreResult<(i64, Vec<Route>)> {
        Ok(match spec {
            RouteSpec::ById(id) => self.table.select(|r| r.id == *id, None),
            RouteSpec::ByProfileAndInstrument {
                profile_id,
                instrument_id,
            } => self.table.select(
                |r| r.profile.id == *profile_id && r.instrument.id == *instrument_id,
                None,
            ),
            RouteSpec::Page(p) => self.table.select(|_| true, Some(*p)),
            RouteSpec::All => self.table.select(|_| true, None),
        })
    }
}

pub struct MemoryCardRepository {
    table: Table<Card>,
}

impl MemoryCardRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }
}

impl Default for MemoryCardRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CardRepository for MemoryCardRepository {
    async fn add(&self, card: &mut Card) -> StoreResult<()> {
        self.table.insert_auto(card);
        Ok(())
    }

    async fn query(&self, spec: &CardSpec) -> StoreResult<(i64, Vec<Card>)> {
        Ok(match spec {
            CardSpec::ById(id) => self.table.select(|c| c.id == *id, None),
            CardSpec::ByPan(pan) => self.table.select(|c| c.pan == *pan, None),
            CardSpec::All => self.table.select(|_| true, None),
        })
    }
}

pub struct MemoryTransactionRepository {
    table: Table<Transaction>,
}

impl MemoryTransactionRepository {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }

    fn matches(tx: &Transaction, spec: &TransactionSpec) -> bool {
        match spec {
            TransactionSpec::ById(id) => tx.id == *id,
            TransactionSpec::ByReferenceAndStatus {
                reference_id,
                status,
            } => {
                tx.status == *status
                    && tx
                        .reference
                        .as_ref()
                        .map(|r| r.id == *reference_id)
                        .unwrap_or(false)
            }
            TransactionSpec::Page(_) | TransactionSpec::All => true,
        }
    }
}

impl Default for MemoryTransactionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionRepository for MemoryTransactionRepository {
    async fn add(&self, tx: &mut Transaction) -> StoreResult<()> {
        self.table.insert_auto(tx);
        Ok(())
    }

    async fn update(&self, tx: &Transaction) -> StoreResult<()> {
        self.table.replace(tx, "transaction")
    }

    async fn query(&self, spec: &TransactionSpec) -> StoreResult<(i64, Vec<Transaction>)> {
        let page = match spec {
            TransactionSpec::Page(p) => Some(*p),
            _ => None,
        };
        Ok(self.table.select(|tx| Self::matches(tx, spec), page))
    }

    async fn type_turn_over(
        &self,
        spec: &TransactionSpec,
    ) -> StoreResult<HashMap<TransactionType, TurnOver>> {
        let (_, matched) = self.table.select(|tx| Self::matches(tx, spec), None);
        let mut agg: HashMap<TransactionType, TurnOver> = HashMap::new();
        for tx in matched {
            let entry = agg.entry(tx.tx_type).or_default();
            entry.sum += tx.amount;
            entry.count += 1;
        }
        Ok(agg)
    }
}

// ----------------------------------------------------------------------
// Session store
// ----------------------------------------------------------------------

/// DashMap-backed session store; entry access is atomic per key.
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn add(&self, session: Session) -> StoreResult<()> {
        self.sessions.insert(session.key.clone(), session);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Session>> {
        Ok(self.sessions.get(key).map(|s| s.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygate_types::Currency;

    fn currency(code: i32, char_code: &str) -> Currency {
        Currency {
            id: 0,
            numeric_code: code,
            char_code: char_code.into(),
            name: char_code.into(),
            exponent: 2,
        }
    }

    #[tokio::test]
    async fn test_add_assigns_monotonic_ids() {
        let repo = MemoryCurrencyRepository::new();
        let mut rub = currency(643, "RUB");
        let mut usd = currency(840, "USD");
        repo.add(&mut rub).await.unwrap();
        repo.add(&mut usd).await.unwrap();
        assert_eq!(rub.id, 1);
        assert_eq!(usd.id, 2);

        let (total, all) = repo.query(&CurrencySpec::All).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(all[0].char_code, "RUB");
        assert_eq!(all[1].char_code, "USD");
    }

    #[tokio::test]
    async fn test_query_by_numeric_code() {
        let repo = MemoryCurrencyRepository::new();
        let mut rub = currency(643, "RUB");
        repo.add(&mut rub).await.unwrap();

        let (total, found) = repo
            .query(&CurrencySpec::ByNumericCode(643))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].id, rub.id);

        let (total, _) = repo.query(&CurrencySpec::ByNumericCode(999)).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let repo = MemoryCurrencyRepository::new();
        let mut missing = currency(978, "EUR");
        missing.id = 42;
        let err = repo.update(&missing).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_page_spec_windows_results() {
        let repo = MemoryCurrencyRepository::new();
        for (code, cc) in [(643, "RUB"), (840, "USD"), (978, "EUR")] {
            repo.add(&mut currency(code, cc)).await.unwrap();
        }
        let (total, page) = repo
            .query(&CurrencySpec::Page(PageSpec {
                limit: 1,
                offset: 1,
            }))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].char_code, "USD");
    }

    #[tokio::test]
    async fn test_channel_id_conflict() {
        let repo = MemoryChannelRepository::new();
        let channel = Channel {
            id: 2,
            type_id: 1,
            key: "alfabank".into(),
        };
        repo.add(&channel).await.unwrap();
        let err = repo.add(&channel).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_session_roundtrip() {
        let store = MemorySessionStore::new();
        let mut session = Session::new("3ds20session_7");
        session.insert("tdsTransId", "S");
        store.add(session).await.unwrap();

        let loaded = store.get("3ds20session_7").await.unwrap().unwrap();
        assert_eq!(loaded.get_str("tdsTransId"), Some("S"));
        assert!(store.get("3ds20session_8").await.unwrap().is_none());
    }
}
