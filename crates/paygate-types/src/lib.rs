//! Paygate Types - Canonical domain types for the payment gateway
//!
//! This crate contains all foundational types for paygate with zero
//! dependencies on other paygate crates:
//!
//! - Reference entities (Currency, Profile, Channel, Account, Route)
//! - Payment instruments (Card) and card-network classification
//! - The transaction entity and its state machine
//! - Interactive-flow session blobs and 3-D Secure payloads
//!
//! # Architectural Invariants
//!
//! 1. A transaction is created in `New` and leaves it exactly once
//! 2. `Success` and `Declined` are terminal — the latch in
//!    [`Transaction`] refuses any further transition
//! 3. Non-root transactions always point at their reference auth/preauth

pub mod account;
pub mod card;
pub mod channel;
pub mod currency;
pub mod instrument;
pub mod profile;
pub mod route;
pub mod session;
pub mod threeds;
pub mod transaction;

pub use account::*;
pub use card::*;
pub use channel::*;
pub use currency::*;
pub use instrument::*;
pub use profile::*;
pub use route::*;
pub use session::*;
pub use threeds::*;
pub use transaction::*;
