//! Router adapters
//!
//! A router rewrites a route's selected account from instrument
//! attributes. Policy and tie-breaks are adapter-private; the orchestrator
//! only cares that a resolved route ends up with an account.

use std::sync::Arc;

use async_trait::async_trait;
use paygate_store::{AccountRepository, AccountSpec};
use paygate_types::{Card, CardNetwork, Route};
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};

/// Durable identity of the visa/mastercard split router.
pub const VISAMASTER_ROUTER_ID: i32 = 1;
pub const VISAMASTER_ROUTER_KEY: &str = "visamaster";

#[async_trait]
pub trait InstrumentRouter: Send + Sync {
    /// Rewrite `route.account` in place for this card.
    async fn route(&self, route: &mut Route, card: &Card) -> CoreResult<()>;
}

impl std::fmt::Debug for dyn InstrumentRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<dyn InstrumentRouter>")
    }
}

/// Builds a router instance from the route's opaque settings blob.
pub trait RouterFactory: Send + Sync {
    fn create(&self, settings: &serde_json::Value) -> CoreResult<Box<dyn InstrumentRouter>>;
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VisaMasterSettings {
    visa_acc: i32,
    master_acc: i32,
}

/// Splits traffic between two accounts by card network. An unknown
/// network leaves the route untouched, so a pre-declared account stands.
pub struct VisaMasterRouter {
    settings: VisaMasterSettings,
    accounts: Arc<dyn AccountRepository>,
}

impl VisaMasterRouter {
    async fn load_account(&self, id: i32) -> CoreResult<paygate_types::Account> {
        let (_, accounts) = self.accounts.query(&AccountSpec::ById(id)).await?;
        accounts.into_iter().next().ok_or_else(|| {
            CoreError::Dependency(format!("routed account with id={id} not found"))
        })
    }
}

#[async_trait]
impl InstrumentRouter for VisaMasterRouter {
    async fn route(&self, route: &mut Route, card: &Card) -> CoreResult<()> {
        let account_id = match card.network() {
            CardNetwork::Visa => self.settings.visa_acc,
            CardNetwork::Mastercard => self.settings.master_acc,
            other => {
                tracing::debug!(route = route.id, network = %other, "network not routed");
                return Ok(());
            }
        };

        route.account = Some(self.load_account(account_id).await?);
        Ok(())
    }
}

pub struct VisaMasterRouterFactory {
    accounts: Arc<dyn AccountRepository>,
}

impl VisaMasterRouterFactory {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }
}

impl RouterFactory for VisaMasterRouterFactory {
    fn create(&self, settings: &serde_json::Value) -> CoreResult<Box<dyn InstrumentRouter>> {
        let settings: VisaMasterSettings = serde_json::from_value(settings.clone())
            .map_err(|e| CoreError::Validation(format!("visamaster route settings: {e}")))?;
        Ok(Box::new(VisaMasterRouter {
            settings,
            accounts: self.accounts.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use paygate_store::Stores;
    use paygate_types::{
        Account, Channel, Currency, Instrument, Profile, Router, BANK_CHANNEL_TYPE,
    };

    fn currency() -> Currency {
        Currency {
            id: 1,
            numeric_code: 643,
            char_code: "RUB".into(),
            name: "Russian rouble".into(),
            exponent: 2,
        }
    }

    fn account_for(channel_id: i32) -> Account {
        Account {
            id: 0,
            is_enabled: true,
            is_test: true,
            rebill_enabled: false,
            refund_enabled: true,
            reversal_enabled: true,
            partial_confirm_enabled: false,
            partial_reversal_enabled: false,
            partial_refund_enabled: false,
            currency_conversion_enabled: false,
            currency: currency(),
            channel: Channel {
                id: channel_id,
                type_id: BANK_CHANNEL_TYPE,
                key: "alfabank".into(),
            },
            settings: serde_json::json!({}),
        }
    }

    fn card(pan: &str) -> Card {
        Card {
            id: 1,
            pan: pan.into(),
            exp_date: NaiveDate::from_ymd_opt(2027, 12, 1).unwrap(),
            holder: "CARD HOLDER".into(),
        }
    }

    async fn route_fixture(stores: &Stores) -> (Route, i32, i32) {
        let mut visa_acc = account_for(2);
        let mut master_acc = account_for(2);
        stores.accounts.add(&mut visa_acc).await.unwrap();
        stores.accounts.add(&mut master_acc).await.unwrap();

        let route = Route {
            id: 1,
            profile: Profile {
                id: 7,
                key: "shop".into(),
                description: "shop".into(),
                currency: currency(),
            },
            instrument: Instrument {
                id: 1,
                key: "card".into(),
            },
            account: None,
            router: Some(Router {
                id: VISAMASTER_ROUTER_ID,
                key: VISAMASTER_ROUTER_KEY.into(),
            }),
            settings: Some(serde_json::json!({
                "visa_acc": visa_acc.id,
                "master_acc": master_acc.id,
            })),
        };
        (route, visa_acc.id, master_acc.id)
    }

    #[tokio::test]
    async fn test_visa_and_mastercard_split() {
        let stores = Stores::in_memory();
        let (route, visa_id, master_id) = route_fixture(&stores).await;
        let factory = VisaMasterRouterFactory::new(stores.accounts.clone());
        let router = factory.create(route.settings.as_ref().unwrap()).unwrap();

        let mut visa_route = route.clone();
        router
            .route(&mut visa_route, &card("4111111111111111"))
            .await
            .unwrap();
        assert_eq!(visa_route.account.as_ref().map(|a| a.id), Some(visa_id));

        let mut master_route = route.clone();
        router
            .route(&mut master_route, &card("5469380000000000"))
            .await
            .unwrap();
        assert_eq!(master_route.account.as_ref().map(|a| a.id), Some(master_id));
    }

    #[tokio::test]
    async fn test_unknown_network_leaves_route_unchanged() {
        let stores = Stores::in_memory();
        let (route, _, _) = route_fixture(&stores).await;
        let factory = VisaMasterRouterFactory::new(stores.accounts.clone());
        let router = factory.create(route.settings.as_ref().unwrap()).unwrap();

        let mut unknown_route = route.clone();
        router
            .route(&mut unknown_route, &card("6011000000000000"))
            .await
            .unwrap();
        assert!(unknown_route.account.is_none());
    }

    #[tokio::test]
    async fn test_unknown_settings_field_rejected() {
        let stores = Stores::in_memory();
        let factory = VisaMasterRouterFactory::new(stores.accounts.clone());
        let err = factory
            .create(&serde_json::json!({"visa_acc": 1, "master_acc": 2, "amex_acc": 3}))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
