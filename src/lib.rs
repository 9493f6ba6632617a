pub mod actions;
pub mod config;
pub mod contracts;
pub mod error;
pub mod ethereum;
pub mod server;
pub mod units;
pub mod validation;
