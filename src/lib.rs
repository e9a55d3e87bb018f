//! Donation tracking backend: recipients with a fundraising target and a
//! running total of what has been donated to them.

pub mod api;
pub mod config;
pub mod donation;
pub mod error;
pub mod logging;
pub mod schemas;
pub mod service;
pub mod store;
pub mod uploads;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use schemas::{Recipient, RecipientForm};
pub use service::RecipientService;
