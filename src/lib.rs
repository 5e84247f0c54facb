pub mod auth;
pub mod config;
pub mod db;
pub mod detail;
pub mod error;
pub mod filter;
pub mod identity;
pub mod listing;
pub mod models;
pub mod routes;
pub mod schema;
pub mod session;
pub mod state;
pub mod store;
