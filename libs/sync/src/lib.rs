pub mod channel;
pub mod config;
pub mod controller;
pub mod effects;
pub mod error;
pub mod fetch;
pub mod models;
pub mod ordering;
pub mod poll;
pub mod reconcile;
pub mod session;

pub use config::SyncConfig;
pub use controller::SessionController;
pub use error::{FetchError, SyncError};
