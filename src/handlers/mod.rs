//! API handlers for the WalletGate credential service

pub mod auth;
pub mod health;

pub use auth::{login, refresh, request_nonce, whoami};
pub use health::health_check;
