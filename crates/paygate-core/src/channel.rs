//! Bank-channel contract

use async_trait::async_trait;
use paygate_store::StoreError;
use paygate_types::{Account, Transaction};
use thiserror::Error;

use crate::error::CoreError;
use crate::request::CardPaymentRequest;

/// Errors surfaced by channel adapters.
///
/// `Guard` marks a violated business rule the adapter owns (e.g. the
/// single-partial-confirm policy): the orchestrator declines the
/// transaction and answers 400. `Processing` covers acquirer declines,
/// network and parse failures: the transaction is declined and the
/// response stays 200 with the declined body.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{0}")]
    Guard(String),

    #[error("{0}")]
    Processing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The operation surface every bank channel implements.
///
/// Contract: on `Ok`, the adapter has written a terminal or waiting state
/// into `tx` (or left it untouched when the acquirer reported an
/// indeterminate status). On error the orchestrator owns the decline.
#[async_trait]
pub trait BankChannel: Send + Sync {
    async fn authorize(
        &self,
        tx: &mut Transaction,
        request: &CardPaymentRequest,
    ) -> Result<(), ChannelError>;

    async fn preauthorize(
        &self,
        tx: &mut Transaction,
        request: &CardPaymentRequest,
    ) -> Result<(), ChannelError>;

    async fn confirm(&self, tx: &mut Transaction) -> Result<(), ChannelError>;

    async fn reverse(&self, tx: &mut Transaction) -> Result<(), ChannelError>;

    async fn refund(&self, tx: &mut Transaction) -> Result<(), ChannelError>;

    async fn rebill(&self, tx: &mut Transaction) -> Result<(), ChannelError>;

    /// 3DS v1 continuation with the PaRes posted back by the client.
    async fn process_pares(&self, tx: &mut Transaction, pares: &str) -> Result<(), ChannelError>;

    /// 3DS v2 continuation after the ACS challenge.
    async fn process_cres(&self, tx: &mut Transaction, cres: &str) -> Result<(), ChannelError>;

    /// 3DS v2 method-URL probe result reported by the client.
    async fn complete_method_url(
        &self,
        tx: &mut Transaction,
        completed: bool,
    ) -> Result<(), ChannelError>;
}

/// Builds a channel instance bound to one account's credentials.
pub trait BankChannelFactory: Send + Sync {
    fn create(&self, account: &Account) -> Result<Box<dyn BankChannel>, CoreError>;
}
