//! Typed views over state memory

use bytemuck::{AnyBitPattern, pod_read_unaligned};

/// Read-only window into a state arena
///
/// Offsets passed to the read helpers are relative to the start of the view.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    arena: &'a [u8],
    offset: usize,
    len: usize,
}

impl<'a> StateView<'a> {
    /// Creates a view of `len` bytes starting at `offset` within `arena`
    pub fn new(arena: &'a [u8], offset: usize, len: usize) -> Self {
        debug_assert!(
            offset + len <= arena.len(),
            "state view {offset}+{len} exceeds arena of {} bytes",
            arena.len()
        );
        Self { arena, offset, len }
    }

    /// View over an entire slice
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::new(bytes, 0, bytes.len())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bytes covered by this view
    pub fn bytes(&self) -> &'a [u8] {
        &self.arena[self.offset..self.offset + self.len]
    }

    /// Reads one bit; out-of-range reads yield false
    pub fn read_bit(&self, byte_offset: usize, bit_offset: u32) -> bool {
        let byte = byte_offset + (bit_offset / 8) as usize;
        self.bytes()
            .get(byte)
            .is_some_and(|b| (b >> (bit_offset % 8)) & 1 != 0)
    }

    pub fn read_u8(&self, byte_offset: usize) -> u8 {
        self.bytes().get(byte_offset).copied().unwrap_or(0)
    }

    /// Reads a plain-old-data value stored little-endian at `byte_offset`
    pub fn read<T: AnyBitPattern>(&self, byte_offset: usize) -> Option<T> {
        let size = std::mem::size_of::<T>();
        self.bytes()
            .get(byte_offset..byte_offset + size)
            .map(pod_read_unaligned::<T>)
    }
}

/// Mutable window into a state arena
#[derive(Debug)]
pub struct StateViewMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> StateViewMut<'a> {
    pub fn new(arena: &'a mut [u8], offset: usize, len: usize) -> Self {
        debug_assert!(offset + len <= arena.len());
        Self {
            bytes: &mut arena[offset..offset + len],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_view(&self) -> StateView<'_> {
        StateView::from_bytes(self.bytes)
    }

    /// Copies `data` to `byte_offset`, truncating at the end of the view
    pub fn write(&mut self, byte_offset: usize, data: &[u8]) -> usize {
        if byte_offset >= self.bytes.len() {
            return 0;
        }
        let count = data.len().min(self.bytes.len() - byte_offset);
        self.bytes[byte_offset..byte_offset + count].copy_from_slice(&data[..count]);
        count
    }

    /// Overwrites the whole view with `source`
    pub fn copy_from(&mut self, source: &[u8]) {
        let count = source.len().min(self.bytes.len());
        self.bytes[..count].copy_from_slice(&source[..count]);
    }

    pub fn zero(&mut self) {
        self.bytes.fill(0);
    }

    pub fn set_bit(&mut self, byte_offset: usize, bit_offset: u32, value: bool) {
        let byte = byte_offset + (bit_offset / 8) as usize;
        if let Some(b) = self.bytes.get_mut(byte) {
            let mask = 1u8 << (bit_offset % 8);
            if value {
                *b |= mask;
            } else {
                *b &= !mask;
            }
        }
    }
}
