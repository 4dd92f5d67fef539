pub mod api;
pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod infrastructure;

pub use crate::core::errors::LedgerError;
pub use crate::core::services::{LedgerService, ServiceSettings};

#[cfg(test)]
mod tests;
