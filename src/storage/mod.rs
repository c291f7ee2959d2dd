//! In-memory key-value storage.
//!
//! The server owns exactly one store and drives it from the event loop
//! thread, so backends take `&mut self` and need no interior locking.
//!
//! Two interchangeable backends implement [`Store`]:
//! - [`MapStore`]: backed by `std::collections::HashMap`
//! - [`ChainedTable`]: fixed-bucket separate chaining with a djb2 hash
//!
//! Keys and values are arbitrary byte strings, compared byte for byte.
//! There is no delete, expiry, or iteration: entries live until the
//! store itself is dropped.

mod chained;
mod map;

pub use chained::ChainedTable;
pub use map::MapStore;

use std::fmt;

/// Operations every storage backend supports.
pub trait Store {
    /// Insert `key` or overwrite its current value.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Current value for `key`, if any.
    fn get(&self, key: &[u8]) -> Option<&[u8]>;

    /// Number of distinct keys stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors reported by a storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Memory for the key or value could not be reserved.
    Allocation,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Allocation => write!(f, "failed to allocate memory for entry"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Copy `bytes` into a fresh buffer, reporting allocation failure instead of aborting.
pub(crate) fn owned(bytes: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::new();
    out.try_reserve_exact(bytes.len())
        .map_err(|_| StoreError::Allocation)?;
    out.extend_from_slice(bytes);
    Ok(out)
}
