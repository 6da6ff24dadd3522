//! Allocation, migration and swapping of double-buffered device state

use enum_map::EnumMap;
use tracing::{debug, trace};

use super::view::{StateView, StateViewMut};
use super::{UpdateMask, UpdateType};
use crate::error::{InputError, Result};

/// Device state blocks are padded to this many bytes
pub const STATE_ALIGNMENT: usize = 4;

/// Rounds a device state size up to the buffer alignment
pub fn align_state_size(size: usize) -> usize {
    size.div_ceil(STATE_ALIGNMENT) * STATE_ALIGNMENT
}

/// Front and back copies of every device's state for one update pass
#[derive(Debug, Default)]
pub struct DoubleBuffers {
    /// Both halves in one allocation: `[half 0 | half 1]`
    memory: Vec<u8>,
    half: usize,
    offsets: Vec<usize>,
    sizes: Vec<usize>,
    /// Per device: true when the front copy lives in half 1
    flipped: Vec<bool>,
}

impl DoubleBuffers {
    fn allocate(offsets: &[usize], sizes: &[usize], half: usize) -> Result<Self> {
        let bytes = half * 2;
        let mut memory = Vec::new();
        memory
            .try_reserve_exact(bytes)
            .map_err(|source| InputError::BufferAllocation { bytes, source })?;
        memory.resize(bytes, 0);

        Ok(Self {
            memory,
            half,
            offsets: offsets.to_vec(),
            sizes: sizes.to_vec(),
            flipped: vec![false; sizes.len()],
        })
    }

    pub fn device_count(&self) -> usize {
        self.sizes.len()
    }

    fn front_start(&self, device: usize) -> usize {
        let half = if self.flipped[device] { self.half } else { 0 };
        half + self.offsets[device]
    }

    fn back_start(&self, device: usize) -> usize {
        let half = if self.flipped[device] { 0 } else { self.half };
        half + self.offsets[device]
    }

    /// The state the pass currently observes
    pub fn front(&self, device: usize) -> StateView<'_> {
        StateView::new(&self.memory, self.front_start(device), self.sizes[device])
    }

    /// The state as of the previous swap
    pub fn back(&self, device: usize) -> StateView<'_> {
        StateView::new(&self.memory, self.back_start(device), self.sizes[device])
    }

    pub fn front_mut(&mut self, device: usize) -> StateViewMut<'_> {
        let start = self.front_start(device);
        StateViewMut::new(&mut self.memory, start, self.sizes[device])
    }

    /// Both copies of one device at once
    pub fn front_and_back_mut(&mut self, device: usize) -> (StateViewMut<'_>, StateViewMut<'_>) {
        let offset = self.offsets[device];
        let size = self.sizes[device];
        let flipped = self.flipped[device];
        let (first, second) = self.memory.split_at_mut(self.half);
        let (front, back) = if flipped {
            (second, first)
        } else {
            (first, second)
        };
        (
            StateViewMut::new(front, offset, size),
            StateViewMut::new(back, offset, size),
        )
    }

    /// Makes the current front the back and vice versa
    pub fn swap(&mut self, device: usize) {
        self.flipped[device] = !self.flipped[device];
    }

    fn zero_device(&mut self, device: usize) {
        let (mut front, mut back) = self.front_and_back_mut(device);
        front.zero();
        back.zero();
    }
}

/// Owns the state memory of every enabled update pass
#[derive(Debug, Default)]
pub struct StateBuffers {
    mask: UpdateMask,
    buffers: EnumMap<UpdateType, Option<DoubleBuffers>>,
    offsets: Vec<usize>,
    sizes: Vec<usize>,
    total_size: usize,
}

impl StateBuffers {
    /// Creates an empty set with no allocations
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates buffers for every pass in `mask` and lays out devices by index
    ///
    /// Returns the byte offset of each device within a buffer half. Any
    /// previous allocation held by `self` is dropped; use [`migrate_all`]
    /// on a fresh set to carry state over.
    ///
    /// [`migrate_all`]: Self::migrate_all
    pub fn allocate_all(&mut self, mask: UpdateMask, device_sizes: &[usize]) -> Result<Vec<usize>> {
        let sizes: Vec<usize> = device_sizes.iter().map(|s| align_state_size(*s)).collect();
        let mut offsets = Vec::with_capacity(sizes.len());
        let mut total_size = 0;
        for size in &sizes {
            offsets.push(total_size);
            total_size += size;
        }

        let mut buffers: EnumMap<UpdateType, Option<DoubleBuffers>> = EnumMap::default();
        for pass in UpdateType::ALL {
            if pass.has_buffers() && mask.contains(pass.mask()) {
                buffers[pass] = Some(DoubleBuffers::allocate(&offsets, &sizes, total_size)?);
            }
        }

        debug!(
            devices = sizes.len(),
            bytes_per_half = total_size,
            ?mask,
            "Allocated state buffers"
        );

        self.mask = mask;
        self.buffers = buffers;
        self.sizes = sizes;
        self.offsets = offsets.clone();
        self.total_size = total_size;
        Ok(offsets)
    }

    /// Copies device state over from `old`
    ///
    /// `old_indices[new_index]` names the device's index in `old`, or `None`
    /// for devices that did not exist before.
    pub fn migrate_all(&mut self, old: &StateBuffers, old_indices: &[Option<usize>]) {
        for (pass, slot) in self.buffers.iter_mut() {
            let (Some(new), Some(previous)) = (slot.as_mut(), old.buffers[pass].as_ref()) else {
                continue;
            };

            for (new_index, old_index) in old_indices.iter().enumerate() {
                let Some(old_index) = *old_index else {
                    continue;
                };
                if new_index >= new.device_count() || old_index >= previous.device_count() {
                    continue;
                }

                let (mut front, mut back) = new.front_and_back_mut(new_index);
                front.copy_from(previous.front(old_index).bytes());
                back.copy_from(previous.back(old_index).bytes());
                trace!(pass = %pass, old_index, new_index, "Migrated device state");
            }
        }
    }

    /// Zeroes and releases all memory
    pub fn free_all(&mut self) {
        for buffer in self.buffers.values_mut().flatten() {
            buffer.memory.fill(0);
        }
        *self = Self::default();
    }

    pub fn mask(&self) -> UpdateMask {
        self.mask
    }

    /// Whether `pass` owns an allocated buffer
    pub fn is_allocated(&self, pass: UpdateType) -> bool {
        self.buffers[pass].is_some()
    }

    pub fn buffers(&self, pass: UpdateType) -> Option<&DoubleBuffers> {
        self.buffers[pass].as_ref()
    }

    pub fn buffers_mut(&mut self, pass: UpdateType) -> Option<&mut DoubleBuffers> {
        self.buffers[pass].as_mut()
    }

    pub fn front(&self, pass: UpdateType, device: usize) -> Option<StateView<'_>> {
        self.buffers(pass)
            .filter(|b| device < b.device_count())
            .map(|b| b.front(device))
    }

    pub fn back(&self, pass: UpdateType, device: usize) -> Option<StateView<'_>> {
        self.buffers(pass)
            .filter(|b| device < b.device_count())
            .map(|b| b.back(device))
    }

    pub fn swap_buffers(&mut self, pass: UpdateType, device: usize) {
        if let Some(buffer) = self.buffers_mut(pass)
            && device < buffer.device_count()
        {
            buffer.swap(device);
        }
    }

    /// Zeroes one device's front and back copies in every pass
    pub fn zero_device(&mut self, device: usize) {
        for buffer in self.buffers.values_mut().flatten() {
            if device < buffer.device_count() {
                buffer.zero_device(device);
            }
        }
    }

    pub fn device_count(&self) -> usize {
        self.sizes.len()
    }

    pub fn device_offset(&self, device: usize) -> Option<usize> {
        self.offsets.get(device).copied()
    }

    /// Aligned size of one device's block
    pub fn device_size(&self, device: usize) -> Option<usize> {
        self.sizes.get(device).copied()
    }

    /// Bytes per buffer half
    pub fn total_size(&self) -> usize {
        self.total_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocated(sizes: &[usize]) -> StateBuffers {
        let mut buffers = StateBuffers::new();
        buffers
            .allocate_all(UpdateMask::DYNAMIC | UpdateMask::FIXED, sizes)
            .unwrap();
        buffers
    }

    #[test]
    fn test_offsets_are_aligned() {
        let mut buffers = StateBuffers::new();
        let offsets = buffers
            .allocate_all(UpdateMask::DYNAMIC, &[3, 8, 5])
            .unwrap();
        assert_eq!(offsets, vec![0, 4, 12]);
        assert_eq!(buffers.total_size(), 20);
        assert_eq!(buffers.device_size(2), Some(8));
        assert!(buffers.is_allocated(UpdateType::Dynamic));
        assert!(!buffers.is_allocated(UpdateType::Fixed));
        assert!(!buffers.is_allocated(UpdateType::BeforeRender));
    }

    #[test]
    fn test_swap_exchanges_front_and_back() {
        let mut buffers = allocated(&[4]);
        let dynamic = buffers.buffers_mut(UpdateType::Dynamic).unwrap();
        dynamic.front_mut(0).write(0, &[1, 2, 3, 4]);
        dynamic.swap(0);
        assert_eq!(dynamic.back(0).bytes(), &[1, 2, 3, 4]);
        assert_eq!(dynamic.front(0).bytes(), &[0, 0, 0, 0]);

        // Fixed buffers are untouched
        assert_eq!(
            buffers.front(UpdateType::Fixed, 0).unwrap().bytes(),
            &[0, 0, 0, 0]
        );
    }

    #[test]
    fn test_migrate_by_index_map() {
        let mut old = allocated(&[4, 4, 4]);
        for device in 0..3 {
            let dynamic = old.buffers_mut(UpdateType::Dynamic).unwrap();
            dynamic.front_mut(device).write(0, &[device as u8 + 1; 4]);
        }
        // Device 1 sits flipped so its front lives in the second half
        old.swap_buffers(UpdateType::Dynamic, 1);
        old.buffers_mut(UpdateType::Dynamic)
            .unwrap()
            .front_mut(1)
            .write(0, &[9; 4]);

        // Remove device 0: new 0 <- old 1, new 1 <- old 2
        let mut new = StateBuffers::new();
        new.allocate_all(old.mask(), &[4, 4]).unwrap();
        new.migrate_all(&old, &[Some(1), Some(2)]);
        old.free_all();

        let dynamic = new.buffers(UpdateType::Dynamic).unwrap();
        assert_eq!(dynamic.front(0).bytes(), &[9; 4]);
        assert_eq!(dynamic.back(0).bytes(), &[2; 4]);
        assert_eq!(dynamic.front(1).bytes(), &[3; 4]);
        assert_eq!(old.total_size(), 0);
    }

    #[test]
    fn test_new_device_starts_zeroed() {
        let old = allocated(&[4]);
        let mut new = StateBuffers::new();
        new.allocate_all(old.mask(), &[4, 8]).unwrap();
        new.migrate_all(&old, &[Some(0), None]);
        assert!(
            new.front(UpdateType::Dynamic, 1)
                .unwrap()
                .bytes()
                .iter()
                .all(|b| *b == 0)
        );
    }

    #[test]
    fn test_zero_device() {
        let mut buffers = allocated(&[4, 4]);
        for pass in [UpdateType::Dynamic, UpdateType::Fixed] {
            let (mut front, mut back) = buffers.buffers_mut(pass).unwrap().front_and_back_mut(1);
            front.write(0, &[7; 4]);
            back.write(0, &[7; 4]);
        }
        buffers.zero_device(1);
        assert_eq!(buffers.front(UpdateType::Fixed, 1).unwrap().bytes(), &[0; 4]);
        assert_eq!(buffers.back(UpdateType::Dynamic, 1).unwrap().bytes(), &[0; 4]);
    }
}
