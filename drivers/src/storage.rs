//! Persistent storage collaborator interface.
//!
//! Two narrow surfaces: append-only file writes (used by `if save` and
//! `sequence save`, which persist rules as re-typeable command text) and a
//! tiny key-value store (the host identifier shown in the prompt).

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::HalResult;

pub trait Storage: Send + Sync {
    fn append(&self, path: &str, data: &[u8]) -> HalResult<()>;
    fn read(&self, path: &str) -> HalResult<Vec<u8>>;

    fn kv_get(&self, key: &str) -> Option<String>;
    fn kv_set(&self, key: &str, value: &str) -> HalResult<()>;
}
