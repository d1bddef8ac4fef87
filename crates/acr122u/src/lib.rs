//! Card presence detection for PC/SC NFC readers
//!
//! This crate watches one or more readers through the PC/SC middleware and
//! hands the UID of every newly presented card to an application supplied
//! [`Handler`]. Consumers never poll the hardware themselves.
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use acr122u::{CancellationToken, Card, Config, Context, ShareMode};
//!
//! // Establish a PC/SC session and enumerate readers
//! let mut context = Context::establish(Config::new().with_share_mode(ShareMode::Shared))?;
//! println!("Watching readers: {:?}", context.readers());
//!
//! // Serve until another thread cancels the token
//! let token = CancellationToken::new();
//! context.serve_fn(&token, |card: &Card| {
//!     println!("Card on {}: {}", card.reader(), card);
//! })?;
//!
//! context.release()?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod apdu;
mod cancel;
mod card;
mod config;
mod context;
mod engine;
mod error;
mod handler;
mod logging;
mod service;
mod state;

// Public exports
pub use cancel::{CancellationToken, DropGuard};
pub use card::Card;
pub use config::{Config, DEFAULT_POLL_INTERVAL, LogLevel, LogOutput, Protocol, ShareMode};
pub use context::Context;
pub use error::{Error, Result};
pub use handler::Handler;
pub use logging::StateFlags;
pub use service::{CardConnection, CardService};
pub use state::{Payload, ReaderRecord};

// Re-export the pcsc types that appear in the public API
pub use pcsc::State;
