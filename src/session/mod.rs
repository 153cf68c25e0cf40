//! Session state: the normalized token record and its process-local store.

pub mod record;
pub mod store;

pub use record::{LoginPayload, TokenRecord};
pub use store::{SessionStore, DEFAULT_SESSION_KEY};
