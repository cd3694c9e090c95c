//! Paygate orchestration layer
//!
//! Binds the two extension points of the gateway together: routing
//! (profile × instrument → account) and bank-channel adapters (the
//! protocol state machines talking to acquirers). The
//! [`TransactionService`] drives a transaction through its lifecycle
//! around a channel call; the [`PluginRegistry`] pins adapters to the
//! durable numeric ids stored in accounts and routes.

pub mod channel;
pub mod channels;
pub mod error;
pub mod instrument;
pub mod orchestrator;
pub mod registry;
pub mod request;
pub mod router;

pub use channel::{BankChannel, BankChannelFactory, ChannelError};
pub use error::{CoreError, CoreResult};
pub use instrument::{CardInstrument, PaymentInstrument, CARD_INSTRUMENT_ID, CARD_INSTRUMENT_KEY};
pub use orchestrator::TransactionService;
pub use registry::{PluginRegistry, PluginRegistryBuilder};
pub use request::{CardData, CardPaymentRequest};
pub use router::{
    InstrumentRouter, RouterFactory, VisaMasterRouterFactory, VISAMASTER_ROUTER_ID,
    VISAMASTER_ROUTER_KEY,
};
