//! Transaction orchestrator
//!
//! Every mutating operation follows the same skeleton: validate, load the
//! profile, resolve the route or the referenced transaction, persist the
//! new transaction in `New`, hand it to the bank channel, interpret the
//! channel's terminal effect and persist again.
//!
//! The channel round-trip runs on a detached task: if the inbound request
//! is cancelled mid-flight, the acquirer outcome is still written, so a
//! registered order is never orphaned as `New`.

use std::sync::Arc;

use paygate_store::{
    ProfileRepository as _, ProfileSpec, RouteRepository as _, RouteSpec, Stores,
    TransactionRepository as _, TransactionSpec, TurnOver,
};
use paygate_types::{Account, Route, Transaction, TransactionStatus, TransactionType};

use crate::channel::{BankChannel, ChannelError};
use crate::error::{CoreError, CoreResult};
use crate::instrument::CARD_INSTRUMENT_KEY;
use crate::registry::PluginRegistry;
use crate::request::CardPaymentRequest;

enum ChannelOp {
    Authorize(CardPaymentRequest),
    Preauthorize(CardPaymentRequest),
    Confirm,
    Reverse,
    Refund,
    Rebill,
    ProcessPares(String),
    ProcessCres(String),
    CompleteMethodUrl(bool),
}

pub struct TransactionService {
    stores: Stores,
    registry: Arc<PluginRegistry>,
}

impl TransactionService {
    pub fn new(stores: Stores, registry: Arc<PluginRegistry>) -> Self {
        Self { stores, registry }
    }

    // ------------------------------------------------------------------
    // Root operations
    // ------------------------------------------------------------------

    pub async fn authorize(
        &self,
        profile_id: i32,
        request: CardPaymentRequest,
    ) -> CoreResult<Transaction> {
        self.pay(TransactionType::Auth, profile_id, request).await
    }

    pub async fn preauthorize(
        &self,
        profile_id: i32,
        request: CardPaymentRequest,
    ) -> CoreResult<Transaction> {
        self.pay(TransactionType::Preauth, profile_id, request).await
    }

    async fn pay(
        &self,
        tx_type: TransactionType,
        profile_id: i32,
        request: CardPaymentRequest,
    ) -> CoreResult<Transaction> {
        let profile = self.load_profile(profile_id).await?;

        let instrument_entry = self
            .registry
            .instrument_by_key(CARD_INSTRUMENT_KEY)
            .ok_or_else(|| CoreError::Dependency("card instrument is not registered".into()))?;
        let card = instrument_entry.adapter.from_request(&request.card).await?;

        let route = self.resolve_route(profile_id, instrument_entry.id, &card).await?;
        let account = route
            .account
            .ok_or_else(|| CoreError::Dependency("route resolution yielded no account".into()))?;
        if !account.is_enabled {
            return Err(CoreError::Precondition(format!(
                "account {} is disabled",
                account.id
            )));
        }

        let instrument = paygate_types::Instrument {
            id: instrument_entry.id,
            key: instrument_entry.key.clone(),
        };

        let mut tx = Transaction::new(
            tx_type,
            profile.clone(),
            account.clone(),
            instrument,
            card.id,
            profile.currency.clone(),
            request.amount,
            request.order_id.clone(),
            request.customer.clone(),
        );
        tx.browser_info = request.browser_info.clone();
        self.stores.transactions.add(&mut tx).await?;

        let channel = self.channel_for(&account)?;
        let op = match tx_type {
            TransactionType::Auth => ChannelOp::Authorize(request),
            _ => ChannelOp::Preauthorize(request),
        };
        self.execute(channel, tx, op).await
    }

    async fn resolve_route(
        &self,
        profile_id: i32,
        instrument_id: i32,
        card: &paygate_types::Card,
    ) -> CoreResult<Route> {
        let (_, routes) = self
            .stores
            .routes
            .query(&RouteSpec::ByProfileAndInstrument {
                profile_id,
                instrument_id,
            })
            .await?;
        let mut route = routes.into_iter().next().ok_or_else(|| {
            CoreError::Dependency(format!(
                "no route for profile id={profile_id} and instrument id={instrument_id}"
            ))
        })?;

        if let Some(router) = route.router.clone() {
            let entry = self.registry.router_by_id(router.id).ok_or_else(|| {
                CoreError::Dependency(format!("router <{}> is not registered", router.key))
            })?;
            let settings = route.settings.clone().unwrap_or_else(|| serde_json::json!({}));
            let adapter = entry.factory.create(&settings)?;
            adapter.route(&mut route, card).await?;
        }

        Ok(route)
    }

    // ------------------------------------------------------------------
    // Child operations
    // ------------------------------------------------------------------

    pub async fn confirm(&self, profile_id: i32, tid: i64, amount: i64) -> CoreResult<Transaction> {
        let profile = self.load_profile(profile_id).await?;
        let reference = self.load_profile_transaction(profile_id, tid).await?;

        self.require_reference_state(&reference, "confirm")?;
        if !reference.is_preauth() {
            return Err(CoreError::Precondition(
                "only a preauth transaction can be confirmed".into(),
            ));
        }
        if amount > reference.amount {
            return Err(CoreError::Precondition(format!(
                "confirm amount {} exceeds reference amount {}",
                amount, reference.amount
            )));
        }
        if amount < reference.amount && !reference.account.partial_confirm_enabled {
            return Err(CoreError::Precondition("partial confirm not allowed".into()));
        }

        self.run_child(TransactionType::Confirmauth, profile, reference, amount, ChannelOp::Confirm)
            .await
    }

    pub async fn reverse(&self, profile_id: i32, tid: i64, amount: i64) -> CoreResult<Transaction> {
        let profile = self.load_profile(profile_id).await?;
        let reference = self.load_profile_transaction(profile_id, tid).await?;

        self.require_reference_state(&reference, "reverse")?;
        if !reference.is_preauth() {
            return Err(CoreError::Precondition(
                "only a preauth transaction can be reversed".into(),
            ));
        }
        if !reference.account.reversal_enabled {
            return Err(CoreError::Precondition(
                "reversal not allowed for account".into(),
            ));
        }
        if amount > reference.amount {
            return Err(CoreError::Precondition(format!(
                "reversal amount {} exceeds reference amount {}",
                amount, reference.amount
            )));
        }
        if amount < reference.amount && !reference.account.partial_reversal_enabled {
            return Err(CoreError::Precondition(
                "partial reversal not allowed".into(),
            ));
        }

        let turn_over = self.successful_turn_over(reference.id).await?;
        let offsets = Self::sum_of(&turn_over, TransactionType::Reversal)
            + Self::sum_of(&turn_over, TransactionType::Confirmauth);
        if amount > reference.amount - offsets {
            return Err(CoreError::Precondition(format!(
                "reversal amount {} exceeds available {}",
                amount,
                reference.amount - offsets
            )));
        }

        self.run_child(TransactionType::Reversal, profile, reference, amount, ChannelOp::Reverse)
            .await
    }

    pub async fn refund(&self, profile_id: i32, tid: i64, amount: i64) -> CoreResult<Transaction> {
        let profile = self.load_profile(profile_id).await?;
        let reference = self.load_profile_transaction(profile_id, tid).await?;

        self.require_reference_state(&reference, "refund")?;
        if !reference.is_auth() {
            return Err(CoreError::Precondition(
                "only an auth transaction can be refunded".into(),
            ));
        }
        if !reference.account.refund_enabled {
            return Err(CoreError::Precondition(
                "refund not allowed for account".into(),
            ));
        }
        if amount > reference.amount {
            return Err(CoreError::Precondition(format!(
                "refund amount {} exceeds reference amount {}",
                amount, reference.amount
            )));
        }
        if amount < reference.amount && !reference.account.partial_refund_enabled {
            return Err(CoreError::Precondition("partial refund not allowed".into()));
        }

        let turn_over = self.successful_turn_over(reference.id).await?;
        let refunded = Self::sum_of(&turn_over, TransactionType::Refund);
        if amount > reference.amount - refunded {
            return Err(CoreError::Precondition(format!(
                "refund amount {} exceeds available {}",
                amount,
                reference.amount - refunded
            )));
        }

        self.run_child(TransactionType::Refund, profile, reference, amount, ChannelOp::Refund)
            .await
    }

    pub async fn rebill(&self, profile_id: i32, tid: i64, amount: i64) -> CoreResult<Transaction> {
        let profile = self.load_profile(profile_id).await?;
        let reference = self.load_profile_transaction(profile_id, tid).await?;

        self.require_reference_state(&reference, "rebill")?;
        if !reference.is_auth() && !reference.is_preauth() {
            return Err(CoreError::Precondition(
                "only an auth or preauth transaction can be rebilled".into(),
            ));
        }
        if !reference.account.rebill_enabled {
            return Err(CoreError::Precondition(
                "rebill not allowed for account".into(),
            ));
        }

        self.run_child(TransactionType::Rebill, profile, reference, amount, ChannelOp::Rebill)
            .await
    }

    async fn run_child(
        &self,
        tx_type: TransactionType,
        profile: paygate_types::Profile,
        reference: Transaction,
        amount: i64,
        op: ChannelOp,
    ) -> CoreResult<Transaction> {
        let account = reference.account.clone();
        let mut tx = Transaction::new(
            tx_type,
            profile,
            account.clone(),
            reference.instrument.clone(),
            reference.instrument_id,
            reference.currency.clone(),
            amount,
            reference.order_id.clone(),
            reference.customer.clone(),
        );
        tx.reference = Some(Box::new(reference));
        self.stores.transactions.add(&mut tx).await?;

        let channel = self.channel_for(&account)?;
        self.execute(channel, tx, op).await
    }

    // ------------------------------------------------------------------
    // Interactive-flow callbacks
    // ------------------------------------------------------------------

    pub async fn process_pares(
        &self,
        profile_id: i32,
        tid: i64,
        pares: String,
    ) -> CoreResult<Transaction> {
        self.load_profile(profile_id).await?;
        let tx = self.load_profile_transaction(profile_id, tid).await?;
        if !tx.is_3ds_waiting() {
            return Err(CoreError::Precondition(
                "transaction is not waiting for 3ds".into(),
            ));
        }

        let channel = self.channel_for(&tx.account)?;
        self.execute(channel, tx, ChannelOp::ProcessPares(pares)).await
    }

    pub async fn process_cres(
        &self,
        profile_id: i32,
        tid: i64,
        cres: String,
    ) -> CoreResult<Transaction> {
        self.load_profile(profile_id).await?;
        let tx = self.load_profile_transaction(profile_id, tid).await?;
        if !tx.is_3ds_waiting() {
            return Err(CoreError::Precondition(
                "transaction is not waiting for 3ds".into(),
            ));
        }

        let channel = self.channel_for(&tx.account)?;
        self.execute(channel, tx, ChannelOp::ProcessCres(cres)).await
    }

    pub async fn complete_method_url(
        &self,
        profile_id: i32,
        tid: i64,
        completed: bool,
    ) -> CoreResult<Transaction> {
        self.load_profile(profile_id).await?;
        let tx = self.load_profile_transaction(profile_id, tid).await?;
        if !tx.is_method_url_waiting() {
            return Err(CoreError::Precondition(
                "transaction is not waiting for method url completion".into(),
            ));
        }

        let channel = self.channel_for(&tx.account)?;
        self.execute(channel, tx, ChannelOp::CompleteMethodUrl(completed))
            .await
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn get(&self, profile_id: i32, tid: i64) -> CoreResult<Transaction> {
        self.load_profile(profile_id).await?;
        self.load_profile_transaction(profile_id, tid).await
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn load_profile(&self, profile_id: i32) -> CoreResult<paygate_types::Profile> {
        let (_, profiles) = self
            .stores
            .profiles
            .query(&ProfileSpec::ById(profile_id))
            .await?;
        profiles
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound(format!("profile with id={profile_id} not found")))
    }

    /// Load a transaction and verify it belongs to the profile; a
    /// foreign transaction id is indistinguishable from a missing one.
    async fn load_profile_transaction(&self, profile_id: i32, tid: i64) -> CoreResult<Transaction> {
        let (_, txs) = self
            .stores
            .transactions
            .query(&TransactionSpec::ById(tid))
            .await?;
        let tx = txs
            .into_iter()
            .next()
            .filter(|tx| tx.profile.id == profile_id)
            .ok_or_else(|| {
                CoreError::NotFound(format!("transaction with id={tid} not found"))
            })?;
        Ok(tx)
    }

    fn require_reference_state(&self, reference: &Transaction, op: &str) -> CoreResult<()> {
        if !reference.is_success() {
            return Err(CoreError::Precondition(format!(
                "{op} requires a successful reference transaction"
            )));
        }
        Ok(())
    }

    async fn successful_turn_over(
        &self,
        reference_id: i64,
    ) -> CoreResult<std::collections::HashMap<TransactionType, TurnOver>> {
        Ok(self
            .stores
            .transactions
            .type_turn_over(&TransactionSpec::ByReferenceAndStatus {
                reference_id,
                status: TransactionStatus::Success,
            })
            .await?)
    }

    fn sum_of(
        turn_over: &std::collections::HashMap<TransactionType, TurnOver>,
        tx_type: TransactionType,
    ) -> i64 {
        turn_over.get(&tx_type).map(|t| t.sum).unwrap_or(0)
    }

    fn channel_for(&self, account: &Account) -> CoreResult<Box<dyn BankChannel>> {
        let entry = self
            .registry
            .channel_by_id(account.channel.id)
            .ok_or_else(|| {
                CoreError::Dependency(format!(
                    "channel <{}> is not registered",
                    account.channel.key
                ))
            })?;
        entry.factory.create(account)
    }

    /// Run the channel operation on a detached task and persist the
    /// outcome. Guard failures decline the transaction and surface as
    /// precondition errors; processing failures decline it and return
    /// the declined transaction.
    async fn execute(
        &self,
        channel: Box<dyn BankChannel>,
        mut tx: Transaction,
        op: ChannelOp,
    ) -> CoreResult<Transaction> {
        let stores = self.stores.clone();

        let handle = tokio::spawn(async move {
            let result = match op {
                ChannelOp::Authorize(request) => channel.authorize(&mut tx, &request).await,
                ChannelOp::Preauthorize(request) => channel.preauthorize(&mut tx, &request).await,
                ChannelOp::Confirm => channel.confirm(&mut tx).await,
                ChannelOp::Reverse => channel.reverse(&mut tx).await,
                ChannelOp::Refund => channel.refund(&mut tx).await,
                ChannelOp::Rebill => channel.rebill(&mut tx).await,
                ChannelOp::ProcessPares(pares) => channel.process_pares(&mut tx, &pares).await,
                ChannelOp::ProcessCres(cres) => channel.process_cres(&mut tx, &cres).await,
                ChannelOp::CompleteMethodUrl(completed) => {
                    channel.complete_method_url(&mut tx, completed).await
                }
            };

            let outcome: CoreResult<()> = match result {
                Ok(()) => Ok(()),
                Err(ChannelError::Guard(msg)) => {
                    tracing::warn!(tx = tx.id, reason = %msg, "channel guard rejected operation");
                    tx.declined(msg.clone());
                    Err(CoreError::Precondition(msg))
                }
                Err(ChannelError::Processing(msg)) => {
                    tracing::warn!(tx = tx.id, reason = %msg, "channel processing failed");
                    tx.declined(msg);
                    Ok(())
                }
                Err(ChannelError::Store(e)) => Err(CoreError::Store(e)),
            };

            if let Err(e) = stores.transactions.update(&tx).await {
                tracing::error!(tx = tx.id, error = %e, "failed to persist transaction outcome");
                return Err(CoreError::Store(e));
            }

            outcome.map(|()| tx)
        });

        handle
            .await
            .map_err(|e| CoreError::Internal(format!("channel task failed: {e}")))?
    }
}
