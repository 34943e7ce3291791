mod cred;

pub use cred::*;
