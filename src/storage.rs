//! Byte storage shared between an array and its views
//!
//! Owned buffers are backed by `u128` words so the start of every allocation
//! is 16-byte aligned. Object elements are not stored in the bytes at all:
//! they live in a slot table keyed by absolute byte offset.

use crate::error::{ArrayError, Result};
use crate::types::ObjectRef;
use bytes::Bytes;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

const WORD: usize = std::mem::size_of::<u128>();

/// Zero-initialized owned allocation plus its object slots
#[derive(Debug, Default)]
pub(crate) struct RawBuffer {
    words: Vec<u128>,
    len: usize,
    objects: BTreeMap<usize, ObjectRef>,
}

impl RawBuffer {
    pub(crate) fn zeroed(len: usize) -> Result<Self> {
        let mut words = Vec::new();
        words
            .try_reserve_exact(len.div_ceil(WORD))
            .map_err(|_| ArrayError::Memory { bytes: len })?;
        words.resize(len.div_ceil(WORD), 0);
        Ok(Self {
            words,
            len,
            objects: BTreeMap::new(),
        })
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.len]
    }

    /// Grow or shrink in place; new bytes read as zero and dropped slots are released
    pub(crate) fn resize(&mut self, new_len: usize) -> Result<()> {
        let new_words = new_len.div_ceil(WORD);
        if new_words > self.words.len() {
            self.words
                .try_reserve_exact(new_words - self.words.len())
                .map_err(|_| ArrayError::Memory { bytes: new_len })?;
        }
        if new_len < self.len {
            // the tail of the last word must read as zero if the buffer grows again
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words);
            bytes[new_len..self.len].fill(0);
            let _released = self.objects.split_off(&new_len);
        }
        self.words.resize(new_words, 0);
        self.len = new_len;
        Ok(())
    }

    pub(crate) fn object(&self, offset: usize) -> Option<&ObjectRef> {
        self.objects.get(&offset)
    }

    pub(crate) fn set_object(&mut self, offset: usize, object: Option<ObjectRef>) {
        match object {
            Some(object) => {
                self.objects.insert(offset, object);
            }
            None => {
                self.objects.remove(&offset);
            }
        }
    }

    pub(crate) fn clear_objects(&mut self, range: Range<usize>) {
        let keys: Vec<usize> = self.objects.range(range).map(|(&k, _)| k).collect();
        for key in keys {
            self.objects.remove(&key);
        }
    }
}

/// Where the bytes of an array come from
#[derive(Debug)]
pub(crate) enum Storage {
    /// Allocated and zeroed by this crate, writeable
    Owned(RawBuffer),
    /// Borrowed from an external immutable buffer
    Foreign(Bytes),
}

impl Storage {
    pub(crate) fn bytes(&self) -> &[u8] {
        match self {
            Storage::Owned(raw) => raw.as_bytes(),
            Storage::Foreign(bytes) => bytes,
        }
    }

    pub(crate) fn object(&self, offset: usize) -> Option<&ObjectRef> {
        match self {
            Storage::Owned(raw) => raw.objects.get(&offset),
            Storage::Foreign(_) => None,
        }
    }

    /// Object slots whose offset falls in `range`, cloned
    pub(crate) fn objects_in(&self, range: Range<usize>) -> Vec<(usize, ObjectRef)> {
        match self {
            Storage::Owned(raw) => raw
                .objects
                .range(range)
                .map(|(&k, v)| (k, v.clone()))
                .collect(),
            Storage::Foreign(_) => Vec::new(),
        }
    }

    pub(crate) fn owned_mut(&mut self) -> Result<&mut RawBuffer> {
        match self {
            Storage::Owned(raw) => Ok(raw),
            Storage::Foreign(_) => Err(ArrayError::ReadOnly),
        }
    }
}

/// Reference-counted data buffer shared by an array and all of its views
///
/// The buffer is freed when the last array holding it is dropped. The
/// owner's writeable state lives here so every view sees the current value.
#[derive(Debug)]
pub struct DataBuffer {
    storage: RwLock<Storage>,
    writeable: AtomicBool,
}

impl DataBuffer {
    pub(crate) fn owned(len: usize) -> Result<Self> {
        Ok(Self::from_raw(RawBuffer::zeroed(len)?))
    }

    pub(crate) fn from_raw(raw: RawBuffer) -> Self {
        Self {
            storage: RwLock::new(Storage::Owned(raw)),
            writeable: AtomicBool::new(true),
        }
    }

    pub(crate) fn foreign(bytes: Bytes) -> Self {
        Self {
            storage: RwLock::new(Storage::Foreign(bytes)),
            writeable: AtomicBool::new(false),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Storage> {
        self.storage.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Storage> {
        self.storage.write()
    }

    pub(crate) fn get_mut(&mut self) -> &mut Storage {
        self.storage.get_mut()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.read().bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Address of the first byte, for alignment checks
    pub fn address(&self) -> usize {
        self.read().bytes().as_ptr() as usize
    }

    /// Whether the bytes are borrowed from an external buffer
    pub fn is_foreign(&self) -> bool {
        matches!(*self.read(), Storage::Foreign(_))
    }

    /// Whether the owning array currently allows writes
    pub fn is_writeable(&self) -> bool {
        self.writeable.load(Ordering::Acquire)
    }

    pub(crate) fn set_writeable(&self, value: bool) {
        self.writeable.store(value, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;

    #[test]
    fn owned_buffers_are_zeroed_and_aligned() {
        let buffer = DataBuffer::owned(20).unwrap();
        assert_eq!(buffer.len(), 20);
        assert_eq!(buffer.address() % 16, 0);
        assert!(buffer.read().bytes().iter().all(|&b| b == 0));
        assert!(!buffer.is_foreign());
        assert!(buffer.is_writeable());
        assert!(!DataBuffer::foreign(Bytes::from_static(b"ro")).is_writeable());
    }

    #[test]
    fn shrink_then_grow_reads_zero() {
        let mut raw = RawBuffer::zeroed(8).unwrap();
        raw.as_bytes_mut().fill(0xAB);
        raw.resize(3).unwrap();
        raw.resize(8).unwrap();
        assert_eq!(raw.as_bytes(), &[0xAB, 0xAB, 0xAB, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn shrinking_drops_object_slots() {
        let mut raw = RawBuffer::zeroed(16).unwrap();
        raw.set_object(0, Some(ObjectRef::new(Item::Int(1))));
        raw.set_object(8, Some(ObjectRef::new(Item::Int(2))));
        raw.resize(8).unwrap();
        let storage = Storage::Owned(raw);
        assert!(storage.object(0).is_some());
        assert!(storage.object(8).is_none());
    }

    #[test]
    fn foreign_storage_is_read_only() {
        let mut storage = Storage::Foreign(Bytes::from_static(b"abcd"));
        assert_eq!(storage.bytes(), b"abcd");
        assert!(matches!(storage.owned_mut(), Err(ArrayError::ReadOnly)));
    }
}
