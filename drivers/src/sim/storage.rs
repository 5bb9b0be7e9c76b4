//! In-memory storage: files as byte vectors, plus the key-value area.

use alloc::string::String;
use alloc::vec::Vec;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{HalError, HalResult};
use crate::storage::Storage;

pub struct MemStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    kv: Mutex<HashMap<String, String>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            kv: Mutex::new(HashMap::new()),
        }
    }

    pub fn file_string(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|data| String::from_utf8_lossy(data).into_owned())
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemStorage {
    fn append(&self, path: &str, data: &[u8]) -> HalResult<()> {
        let mut files = self.files.lock().unwrap();
        files
            .entry(String::from(path))
            .or_default()
            .extend_from_slice(data);
        Ok(())
    }

    fn read(&self, path: &str) -> HalResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or(HalError::NotReady)
    }

    fn kv_get(&self, key: &str) -> Option<String> {
        self.kv.lock().unwrap().get(key).cloned()
    }

    fn kv_set(&self, key: &str, value: &str) -> HalResult<()> {
        self.kv
            .lock()
            .unwrap()
            .insert(String::from(key), String::from(value));
        Ok(())
    }
}
