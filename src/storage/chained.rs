//! Fixed-size hash table with separate chaining.
//!
//! Keys hash with djb2 into a bucket count chosen at construction. The
//! table never rehashes: once chains grow, lookups degrade linearly in the
//! chain length. New keys are pushed at the head of their chain.

use super::{owned, Store, StoreError};
use tracing::trace;

#[derive(Debug)]
struct Entry {
    key: Vec<u8>,
    value: Vec<u8>,
    next: Option<Box<Entry>>,
}

/// Chained hashtable storage backend.
#[derive(Debug)]
pub struct ChainedTable {
    buckets: Vec<Option<Box<Entry>>>,
    len: usize,
}

impl ChainedTable {
    /// Create a table with `buckets` chains. A count of zero is treated as one.
    pub fn with_buckets(buckets: usize) -> Self {
        let count = buckets.max(1);
        let mut slots = Vec::with_capacity(count);
        slots.resize_with(count, || None);

        Self {
            buckets: slots,
            len: 0,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_of(&self, key: &[u8]) -> usize {
        (djb2(key) % self.buckets.len() as u64) as usize
    }
}

impl Store for ChainedTable {
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        let idx = self.bucket_of(key);

        let mut cursor = self.buckets[idx].as_deref_mut();
        while let Some(entry) = cursor {
            if entry.key == key {
                entry.value = owned(value)?;
                trace!(key = %String::from_utf8_lossy(key), bucket = idx, "Item replaced");
                return Ok(());
            }
            cursor = entry.next.as_deref_mut();
        }

        let key_owned = owned(key)?;
        let value = owned(value)?;
        let next = self.buckets[idx].take();
        self.buckets[idx] = Some(Box::new(Entry {
            key: key_owned,
            value,
            next,
        }));
        self.len += 1;

        trace!(
            key = %String::from_utf8_lossy(key),
            bucket = idx,
            items = self.len,
            "Item stored"
        );
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let mut cursor = self.buckets[self.bucket_of(key)].as_deref();
        while let Some(entry) = cursor {
            if entry.key == key {
                return Some(entry.value.as_slice());
            }
            cursor = entry.next.as_deref();
        }
        None
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl Drop for ChainedTable {
    // Unlink chains one node at a time so a long chain cannot blow the stack.
    fn drop(&mut self) {
        for bucket in &mut self.buckets {
            let mut cursor = bucket.take();
            while let Some(mut entry) = cursor {
                cursor = entry.next.take();
            }
        }
    }
}

/// djb2 hash: `h = h * 33 + c`, seeded with 5381.
///
/// Each byte is added as a signed char, so bytes at or above 0x80
/// contribute a negative amount. Bucket placement therefore matches
/// tables built by C implementations on signed-char platforms.
pub(crate) fn djb2(key: &[u8]) -> u64 {
    key.iter().fold(5381u64, |h, &c| {
        h.wrapping_mul(33).wrapping_add(c as i8 as i64 as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_djb2_known_values() {
        assert_eq!(djb2(b""), 5381);
        assert_eq!(djb2(b"a"), 5381 * 33 + 97);
        assert_eq!(djb2(b"ab"), (5381 * 33 + 97) * 33 + 98);
    }

    #[test]
    fn test_djb2_high_bytes_are_signed() {
        // 0xff is -1 and 0x80 is -128 as a signed char.
        assert_eq!(djb2(b"\xff"), 5381 * 33 - 1);
        assert_eq!(djb2(b"\x80"), 5381 * 33 - 128);
        assert_eq!(djb2(b"a\xfe"), (5381 * 33 + 97) * 33 - 2);
        assert_ne!(djb2(b"\xff"), djb2(b"\xfe"));
    }

    #[test]
    fn test_zero_buckets_clamped() {
        let mut table = ChainedTable::with_buckets(0);
        assert_eq!(table.bucket_count(), 1);

        table.set(b"k", b"v").unwrap();
        assert_eq!(table.get(b"k"), Some(&b"v"[..]));
    }

    #[test]
    fn test_single_bucket_chain() {
        // Every key collides, so lookups walk one chain.
        let mut table = ChainedTable::with_buckets(1);

        for i in 0..50 {
            table
                .set(format!("key{i}").as_bytes(), format!("value{i}").as_bytes())
                .unwrap();
        }
        assert_eq!(table.len(), 50);

        for i in 0..50 {
            assert_eq!(
                table.get(format!("key{i}").as_bytes()),
                Some(format!("value{i}").as_bytes())
            );
        }
        assert_eq!(table.get(b"key50"), None);
    }

    #[test]
    fn test_update_in_middle_of_chain() {
        let mut table = ChainedTable::with_buckets(1);

        table.set(b"first", b"1").unwrap();
        table.set(b"second", b"2").unwrap();
        table.set(b"third", b"3").unwrap();

        table.set(b"second", b"two").unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(b"first"), Some(&b"1"[..]));
        assert_eq!(table.get(b"second"), Some(&b"two"[..]));
        assert_eq!(table.get(b"third"), Some(&b"3"[..]));
    }

    #[test]
    fn test_colliding_high_byte_keys_stay_apart() {
        let mut table = ChainedTable::with_buckets(1);

        table.set(b"\xff", b"a").unwrap();
        table.set(b"\xfe", b"b").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(b"\xff"), Some(&b"a"[..]));
        assert_eq!(table.get(b"\xfe"), Some(&b"b"[..]));
    }

    #[test]
    fn test_table_does_not_grow() {
        let mut table = ChainedTable::with_buckets(4);

        for i in 0..100 {
            table.set(i.to_string().as_bytes(), b"x").unwrap();
        }

        assert_eq!(table.bucket_count(), 4);
        assert_eq!(table.len(), 100);
    }
}
