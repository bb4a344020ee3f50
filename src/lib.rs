pub mod client;
pub mod clock;
pub mod config;
pub mod controllers;
pub mod error;
pub mod models;
pub mod service;
pub mod state;
pub mod store;
