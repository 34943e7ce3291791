mod credential_stores;
pub use credential_stores::*;
mod events;
pub use events::*;
