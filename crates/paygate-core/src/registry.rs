//! Plugin registries
//!
//! Three parallel id↔key registries bind channel, instrument and router
//! implementations to durable numeric identifiers. Registration happens
//! explicitly at process start through the builder; the registry is
//! read-only once the server accepts traffic.
//!
//! The persisted channel/instrument/router tables are a mirror of the
//! in-process registries, reconciled at boot: a persisted row must carry
//! the registered key for its id, missing rows are inserted, and the
//! final cardinalities must match exactly. Any mismatch is fatal.

use std::collections::HashMap;
use std::sync::Arc;

use paygate_store::{
    ChannelRepository, ChannelSpec, InstrumentRepository, InstrumentSpec, RouterRepository,
    RouterSpec,
};
use paygate_types::{Channel, Instrument, Router, BANK_CHANNEL_TYPE};

use crate::channel::BankChannelFactory;
use crate::error::{CoreError, CoreResult};
use crate::instrument::PaymentInstrument;
use crate::router::RouterFactory;

pub struct ChannelEntry {
    pub id: i32,
    pub key: String,
    pub factory: Arc<dyn BankChannelFactory>,
}

pub struct InstrumentEntry {
    pub id: i32,
    pub key: String,
    pub adapter: Arc<dyn PaymentInstrument>,
}

pub struct RouterEntry {
    pub id: i32,
    pub key: String,
    pub factory: Arc<dyn RouterFactory>,
}

#[derive(Default)]
pub struct PluginRegistryBuilder {
    channels: HashMap<i32, ChannelEntry>,
    instruments: HashMap<i32, InstrumentEntry>,
    routers: HashMap<i32, RouterEntry>,
}

impl std::fmt::Debug for PluginRegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistryBuilder")
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .field("instruments", &self.instruments.keys().collect::<Vec<_>>())
            .field("routers", &self.routers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bank_channel(
        mut self,
        id: i32,
        key: impl Into<String>,
        factory: Arc<dyn BankChannelFactory>,
    ) -> CoreResult<Self> {
        let key = key.into();
        if let Some(existing) = self.channels.get(&id) {
            return Err(CoreError::Registry(format!(
                "channel id={id} already used by <{}>",
                existing.key
            )));
        }
        self.channels.insert(id, ChannelEntry { id, key, factory });
        Ok(self)
    }

    pub fn instrument(
        mut self,
        id: i32,
        key: impl Into<String>,
        adapter: Arc<dyn PaymentInstrument>,
    ) -> CoreResult<Self> {
        let key = key.into();
        if let Some(existing) = self.instruments.get(&id) {
            return Err(CoreError::Registry(format!(
                "instrument id={id} already used by <{}>",
                existing.key
            )));
        }
        self.instruments
            .insert(id, InstrumentEntry { id, key, adapter });
        Ok(self)
    }

    pub fn router(
        mut self,
        id: i32,
        key: impl Into<String>,
        factory: Arc<dyn RouterFactory>,
    ) -> CoreResult<Self> {
        let key = key.into();
        if let Some(existing) = self.routers.get(&id) {
            return Err(CoreError::Registry(format!(
                "router id={id} already used by <{}>",
                existing.key
            )));
        }
        self.routers.insert(id, RouterEntry { id, key, factory });
        Ok(self)
    }

    pub fn build(self) -> PluginRegistry {
        PluginRegistry {
            channels: self.channels,
            instruments: self.instruments,
            routers: self.routers,
        }
    }
}

pub struct PluginRegistry {
    channels: HashMap<i32, ChannelEntry>,
    instruments: HashMap<i32, InstrumentEntry>,
    routers: HashMap<i32, RouterEntry>,
}

impl PluginRegistry {
    pub fn builder() -> PluginRegistryBuilder {
        PluginRegistryBuilder::new()
    }

    pub fn channel_by_id(&self, id: i32) -> Option<&ChannelEntry> {
        self.channels.get(&id)
    }

    pub fn instrument_by_id(&self, id: i32) -> Option<&InstrumentEntry> {
        self.instruments.get(&id)
    }

    pub fn instrument_by_key(&self, key: &str) -> Option<&InstrumentEntry> {
        self.instruments.values().find(|e| e.key == key)
    }

    pub fn router_by_id(&self, id: i32) -> Option<&RouterEntry> {
        self.routers.get(&id)
    }

    /// Reconcile the in-process registries with their persisted mirrors.
    ///
    /// Fatal on key mismatch or orphan rows; inserts rows for plugins
    /// registered for the first time.
    pub async fn reconcile(
        &self,
        channels: &dyn ChannelRepository,
        instruments: &dyn InstrumentRepository,
        routers: &dyn RouterRepository,
    ) -> CoreResult<()> {
        for entry in self.channels.values() {
            let (_, rows) = channels.query(&ChannelSpec::ById(entry.id)).await?;
            match rows.into_iter().next() {
                Some(row) => {
                    if row.key != entry.key {
                        return Err(CoreError::Registry(format!(
                            "channel <{}> registered with id={} but row holds key=<{}>",
                            entry.key, entry.id, row.key
                        )));
                    }
                }
                None => {
                    channels
                        .add(&Channel {
                            id: entry.id,
                            type_id: BANK_CHANNEL_TYPE,
                            key: entry.key.clone(),
                        })
                        .await?;
                    tracing::info!(id = entry.id, key = %entry.key, "registered bank channel");
                }
            }
        }

        let (persisted, _) = channels
            .query(&ChannelSpec::ByTypeId(BANK_CHANNEL_TYPE))
            .await?;
        if persisted != self.channels.len() as i64 {
            return Err(CoreError::Registry(format!(
                "loaded {} bank channels, {} persisted",
                self.channels.len(),
                persisted
            )));
        }

        for entry in self.instruments.values() {
            let (_, rows) = instruments.query(&InstrumentSpec::ById(entry.id)).await?;
            match rows.into_iter().next() {
                Some(row) => {
                    if row.key != entry.key {
                        return Err(CoreError::Registry(format!(
                            "instrument <{}> registered with id={} but row holds key=<{}>",
                            entry.key, entry.id, row.key
                        )));
                    }
                }
                None => {
                    instruments
                        .add(&Instrument {
                            id: entry.id,
                            key: entry.key.clone(),
                        })
                        .await?;
                    tracing::info!(id = entry.id, key = %entry.key, "registered instrument");
                }
            }
        }

        let (persisted, _) = instruments.query(&InstrumentSpec::All).await?;
        if persisted != self.instruments.len() as i64 {
            return Err(CoreError::Registry(format!(
                "loaded {} instruments, {} persisted",
                self.instruments.len(),
                persisted
            )));
        }

        for entry in self.routers.values() {
            let (_, rows) = routers.query(&RouterSpec::ById(entry.id)).await?;
            match rows.into_iter().next() {
                Some(row) => {
                    if row.key != entry.key {
                        return Err(CoreError::Registry(format!(
                            "router <{}> registered with id={} but row holds key=<{}>",
                            entry.key, entry.id, row.key
                        )));
                    }
                }
                None => {
                    routers
                        .add(&Router {
                            id: entry.id,
                            key: entry.key.clone(),
                        })
                        .await?;
                    tracing::info!(id = entry.id, key = %entry.key, "registered router");
                }
            }
        }

        let (persisted, _) = routers.query(&RouterSpec::All).await?;
        if persisted != self.routers.len() as i64 {
            return Err(CoreError::Registry(format!(
                "loaded {} routers, {} persisted",
                self.routers.len(),
                persisted
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use paygate_store::Stores;
    use paygate_types::{Account, Card};

    struct NopFactory;

    impl BankChannelFactory for NopFactory {
        fn create(
            &self,
            _account: &Account,
        ) -> CoreResult<Box<dyn crate::channel::BankChannel>> {
            Err(CoreError::Registry("not a real channel".into()))
        }
    }

    struct NopInstrument;

    #[async_trait]
    impl PaymentInstrument for NopInstrument {
        async fn from_request(&self, _card: &crate::request::CardData) -> CoreResult<Card> {
            Err(CoreError::Registry("not a real instrument".into()))
        }
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::builder()
            .bank_channel(2, "alfabank", Arc::new(NopFactory))
            .unwrap()
            .instrument(1, "card", Arc::new(NopInstrument))
            .unwrap()
            .build()
    }

    #[tokio::test]
    async fn test_reconcile_inserts_missing_rows() {
        let stores = Stores::in_memory();
        let reg = registry();
        reg.reconcile(&*stores.channels, &*stores.instruments, &*stores.routers)
            .await
            .unwrap();

        let (_, rows) = stores.channels.query(&ChannelSpec::ById(2)).await.unwrap();
        assert_eq!(rows[0].key, "alfabank");
        let (total, _) = stores
            .instruments
            .query(&InstrumentSpec::All)
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let stores = Stores::in_memory();
        let reg = registry();
        reg.reconcile(&*stores.channels, &*stores.instruments, &*stores.routers)
            .await
            .unwrap();
        reg.reconcile(&*stores.channels, &*stores.instruments, &*stores.routers)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reconcile_rejects_key_mismatch() {
        let stores = Stores::in_memory();
        stores
            .channels
            .add(&Channel {
                id: 2,
                type_id: BANK_CHANNEL_TYPE,
                key: "otherbank".into(),
            })
            .await
            .unwrap();

        let err = registry()
            .reconcile(&*stores.channels, &*stores.instruments, &*stores.routers)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Registry(_)));
    }

    #[tokio::test]
    async fn test_reconcile_rejects_orphan_rows() {
        let stores = Stores::in_memory();
        stores
            .channels
            .add(&Channel {
                id: 9,
                type_id: BANK_CHANNEL_TYPE,
                key: "ghostbank".into(),
            })
            .await
            .unwrap();

        let err = registry()
            .reconcile(&*stores.channels, &*stores.instruments, &*stores.routers)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Registry(_)));
    }

    #[test]
    fn test_duplicate_id_rejected_at_registration() {
        let err = PluginRegistry::builder()
            .bank_channel(2, "alfabank", Arc::new(NopFactory))
            .unwrap()
            .bank_channel(2, "otherbank", Arc::new(NopFactory))
            .unwrap_err();
        assert!(matches!(err, CoreError::Registry(_)));
    }
}
