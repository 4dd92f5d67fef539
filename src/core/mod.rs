pub mod balance;
pub mod convert;
pub mod errors;
pub mod models;
pub mod money;
pub mod services;
pub mod split;
