//! Bounded byte container
//!
//! `FixedByteBuffer` is used to marshal characteristic values and
//! advertisement payloads. Its maximum size is chosen once at construction
//! and every operation fails instead of growing past that limit.

use crate::error::BufferError;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// A byte sequence with a fixed maximum capacity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedByteBuffer {
    bytes: Vec<u8>,
    max_size: usize,
}

impl FixedByteBuffer {
    /// Creates an empty buffer able to hold up to `max_size` bytes
    pub fn new(max_size: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(max_size),
            max_size,
        }
    }

    /// Creates a buffer holding a copy of `data`, sized to fit it exactly
    pub fn from_slice(data: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(data.len());
        bytes.extend_from_slice(data);
        Self {
            bytes,
            max_size: data.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of bytes that can still be appended
    pub fn free_size(&self) -> usize {
        self.max_size - self.bytes.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    fn ensure_free(&self, requested: usize) -> Result<(), BufferError> {
        let free = self.free_size();
        if requested > free {
            return Err(BufferError::Overflow { requested, free });
        }
        Ok(())
    }

    /// Appends `data` to the end of the buffer
    pub fn append(&mut self, data: &[u8]) -> Result<(), BufferError> {
        self.ensure_free(data.len())?;
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    pub fn append_u8(&mut self, value: u8) -> Result<(), BufferError> {
        self.append(&[value])
    }

    pub fn append_u16_le(&mut self, value: u16) -> Result<(), BufferError> {
        let mut raw = [0u8; 2];
        LittleEndian::write_u16(&mut raw, value);
        self.append(&raw)
    }

    pub fn append_u16_be(&mut self, value: u16) -> Result<(), BufferError> {
        let mut raw = [0u8; 2];
        BigEndian::write_u16(&mut raw, value);
        self.append(&raw)
    }

    pub fn append_u32_le(&mut self, value: u32) -> Result<(), BufferError> {
        let mut raw = [0u8; 4];
        LittleEndian::write_u32(&mut raw, value);
        self.append(&raw)
    }

    pub fn append_u32_be(&mut self, value: u32) -> Result<(), BufferError> {
        let mut raw = [0u8; 4];
        BigEndian::write_u32(&mut raw, value);
        self.append(&raw)
    }

    /// Inserts `data` at `index`, shifting the tail towards the end
    pub fn insert(&mut self, index: usize, data: &[u8]) -> Result<(), BufferError> {
        if index > self.bytes.len() {
            return Err(BufferError::OutOfBounds {
                index,
                len: self.bytes.len(),
            });
        }
        self.ensure_free(data.len())?;
        self.bytes.splice(index..index, data.iter().copied());
        Ok(())
    }

    /// Removes `count` bytes starting at `index`
    pub fn remove(&mut self, index: usize, count: usize) -> Result<(), BufferError> {
        let end = self.checked_end(index, count)?;
        self.bytes.drain(index..end);
        Ok(())
    }

    /// Borrows `count` bytes starting at `index`
    pub fn get(&self, index: usize, count: usize) -> Result<&[u8], BufferError> {
        let end = self.checked_end(index, count)?;
        Ok(&self.bytes[index..end])
    }

    pub fn get_u8(&self, index: usize) -> Result<u8, BufferError> {
        Ok(self.get(index, 1)?[0])
    }

    pub fn get_u16_le(&self, index: usize) -> Result<u16, BufferError> {
        Ok(LittleEndian::read_u16(self.get(index, 2)?))
    }

    pub fn get_u16_be(&self, index: usize) -> Result<u16, BufferError> {
        Ok(BigEndian::read_u16(self.get(index, 2)?))
    }

    /// Fixed-size view into the buffer
    pub fn sub_view(&self, start: usize, len: usize) -> Option<&[u8]> {
        self.get(start, len).ok()
    }

    /// Mutable fixed-size view; the view cannot change the buffer length
    pub fn sub_view_mut(&mut self, start: usize, len: usize) -> Option<&mut [u8]> {
        let end = self.checked_end(start, len).ok()?;
        Some(&mut self.bytes[start..end])
    }

    /// View of every byte from `start` to the end of the buffer
    pub fn remaining_from(&self, start: usize) -> Option<&[u8]> {
        self.bytes.get(start..)
    }

    /// Lowercase hex rendering, used in trace logs
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    fn checked_end(&self, index: usize, count: usize) -> Result<usize, BufferError> {
        match index.checked_add(count) {
            Some(end) if end <= self.bytes.len() => Ok(end),
            _ => Err(BufferError::OutOfBounds {
                index,
                len: self.bytes.len(),
            }),
        }
    }
}

impl AsRef<[u8]> for FixedByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_respects_capacity() {
        let mut buffer = FixedByteBuffer::new(4);
        buffer.append(&[1, 2, 3]).unwrap();
        assert_eq!(buffer.free_size(), 1);

        let err = buffer.append(&[4, 5]).unwrap_err();
        assert_eq!(
            err,
            BufferError::Overflow {
                requested: 2,
                free: 1
            }
        );
        // Failed append leaves contents untouched
        assert_eq!(buffer.as_slice(), &[1, 2, 3]);

        buffer.append_u8(4).unwrap();
        assert_eq!(buffer.free_size(), 0);
        assert!(buffer.append_u8(5).is_err());
    }

    #[test]
    fn test_integer_byte_order() {
        let mut buffer = FixedByteBuffer::new(12);
        buffer.append_u16_le(0x1234).unwrap();
        buffer.append_u16_be(0x1234).unwrap();
        buffer.append_u32_le(0xAABBCCDD).unwrap();
        buffer.append_u32_be(0xAABBCCDD).unwrap();

        assert_eq!(
            buffer.as_slice(),
            &[0x34, 0x12, 0x12, 0x34, 0xDD, 0xCC, 0xBB, 0xAA, 0xAA, 0xBB, 0xCC, 0xDD]
        );
        assert_eq!(buffer.get_u16_le(0).unwrap(), 0x1234);
        assert_eq!(buffer.get_u16_be(2).unwrap(), 0x1234);
        assert_eq!(buffer.get_u8(4).unwrap(), 0xDD);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut buffer = FixedByteBuffer::new(6);
        buffer.append(&[1, 4]).unwrap();
        buffer.insert(1, &[2, 3]).unwrap();
        assert_eq!(buffer.as_slice(), &[1, 2, 3, 4]);

        assert!(buffer.insert(9, &[0]).is_err());
        assert!(buffer.insert(0, &[0, 0, 0]).is_err());

        buffer.remove(0, 2).unwrap();
        assert_eq!(buffer.as_slice(), &[3, 4]);
        assert!(buffer.remove(1, 2).is_err());
    }

    #[test]
    fn test_views() {
        let mut buffer = FixedByteBuffer::from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(buffer.max_size(), 4);
        assert_eq!(buffer.sub_view(1, 2), Some(&[0xAD, 0xBE][..]));
        assert_eq!(buffer.sub_view(3, 2), None);
        assert_eq!(buffer.remaining_from(2), Some(&[0xBE, 0xEF][..]));
        assert_eq!(buffer.remaining_from(4), Some(&[][..]));
        assert_eq!(buffer.remaining_from(5), None);

        if let Some(view) = buffer.sub_view_mut(0, 2) {
            view.copy_from_slice(&[0xCA, 0xFE]);
        }
        assert_eq!(buffer.to_hex(), "cafebeef");
    }
}
