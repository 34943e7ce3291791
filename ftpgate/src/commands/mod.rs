pub mod check;
mod common;
pub mod hash;
pub mod users;
