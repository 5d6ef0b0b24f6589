//! Route definitions for the WalletGate API

mod auth;

pub use auth::auth_routes;
