//! WalletGate Library
//!
//! This library exports the core modules for the WalletGate credential
//! service: wallet-based authentication with nonce challenges, ed25519
//! proof-of-ownership, and access/refresh token lifecycle management.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
