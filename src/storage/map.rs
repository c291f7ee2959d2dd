//! `HashMap`-backed store.

use super::{owned, Store, StoreError};
use std::collections::HashMap;
use tracing::trace;

/// Default storage backend.
#[derive(Debug, Default)]
pub struct MapStore {
    data: HashMap<Vec<u8>, Vec<u8>>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MapStore {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let value = owned(value)?;

        if let Some(slot) = self.data.get_mut(key) {
            *slot = value;
            trace!(key = %String::from_utf8_lossy(key), "Item replaced");
            return Ok(());
        }

        let key_owned = owned(key)?;
        self.data
            .try_reserve(1)
            .map_err(|_| StoreError::Allocation)?;
        self.data.insert(key_owned, value);

        trace!(
            key = %String::from_utf8_lossy(key),
            items = self.data.len(),
            "Item stored"
        );
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
