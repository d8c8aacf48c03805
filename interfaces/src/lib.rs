pub mod defs;
pub mod state;

pub use defs::*;
pub use state::{SessionStore, CURRENT_USER_KEY};
