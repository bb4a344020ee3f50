pub mod auth;
pub mod config;
pub mod crypto;
pub mod routes;
