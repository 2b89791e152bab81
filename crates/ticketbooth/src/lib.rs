//! `ticketbooth` - issue QR-coded tickets and keep a local list of them
//!
//! A ticket is four identity fields plus a QR image encoding them. Tickets
//! are collected through a [`TicketForm`], held by a [`TicketStore`], and
//! persisted as JSON into a named slot of local key/value [`Storage`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod logging;
pub mod qr;
pub mod storage;
pub mod store;
pub mod ticket;

pub use config::Config;
pub use error::{Error, Result};
pub use form::{FormField, TicketForm};
pub use logging::init_logging;
pub use qr::{scan_png, QrCodeEncoder, QrConfig, QrEncoder};
pub use storage::{SlotStorage, Storage, StorageStats};
pub use store::{LoadOutcome, StoreEvent, SubscriptionId, TicketObserver, TicketStore};
pub use ticket::{Identity, TicketRecord};
