pub mod auth;
mod account;
mod config;
mod error;
pub mod eventhub;
pub mod helpers;
mod types;

pub use account::*;
pub use config::*;
pub use error::*;
pub use types::*;
