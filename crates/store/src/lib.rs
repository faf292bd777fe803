#![warn(clippy::unwrap_used)]

//! Client-side storage port: a key-value trait standing in for the browser's
//! local storage, in-memory and file-backed adapters, and the profile and
//! consent repositories built on top of it.

pub mod consent;
pub mod error;
pub mod kv;
pub mod profiles;

pub use consent::{ConsentPreferences, ConsentRepository, ConsentUpdate};
pub use error::{StoreError, StoreResult};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use profiles::ProfileRepository;
