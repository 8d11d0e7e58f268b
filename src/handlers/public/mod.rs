// handlers/public/mod.rs - No authentication required
//
// Account creation and login, catalog reads, and the delegated-token
// self-check a client runs before using a token it was handed.
pub mod access;
pub mod auth;
pub mod products;
