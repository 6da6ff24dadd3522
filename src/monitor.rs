//! Change monitors
//!
//! Regions of device state are registered together with a listener. A scan
//! compares incoming bytes with the state they are about to overwrite and
//! flags every region whose bits differ. Interpreting the flags is left to
//! the caller.
//!
//! Storage is index-parallel per device: region `i`, listener `i` and signal
//! flag `i` belong together. Scans never allocate.

use tracing::warn;

use crate::device::StateBlock;
use crate::error::{InputError, Result};

/// A monitored span of one device's state, in device-relative coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorRegion {
    pub byte_offset: u32,
    pub bit_offset: u32,
    pub size_in_bits: u32,
}

impl MonitorRegion {
    pub fn new(byte_offset: u32, bit_offset: u32, size_in_bits: u32) -> Self {
        Self {
            byte_offset: byte_offset + bit_offset / 8,
            bit_offset: bit_offset % 8,
            size_in_bits,
        }
    }

    fn bit_start(&self) -> u64 {
        u64::from(self.byte_offset) * 8 + u64::from(self.bit_offset)
    }

    fn bit_end(&self) -> u64 {
        self.bit_start() + u64::from(self.size_in_bits)
    }

    fn is_single_bit(&self) -> bool {
        self.size_in_bits == 1
    }

    /// Whole bytes compare with a slice compare, single bits with a mask.
    /// Anything else is rejected.
    fn validate(&self) -> Result<()> {
        let whole_bytes = self.size_in_bits > 0 && self.size_in_bits % 8 == 0 && self.bit_offset == 0;
        if whole_bytes || self.is_single_bit() {
            Ok(())
        } else {
            Err(InputError::UnsupportedMonitorRegion {
                byte_offset: self.byte_offset,
                bit_offset: self.bit_offset,
                size_in_bits: self.size_in_bits,
            })
        }
    }
}

impl From<StateBlock> for MonitorRegion {
    fn from(block: StateBlock) -> Self {
        Self::new(block.byte_offset, block.bit_offset, block.size_in_bits)
    }
}

/// Who gets told when a region changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorListener {
    /// Action map index
    pub map: usize,
    /// Binding index in the resolved tables
    pub binding: usize,
    /// Control index in the resolved tables
    pub control: usize,
}

#[derive(Debug, Default, Clone)]
struct DeviceMonitors {
    regions: Vec<MonitorRegion>,
    listeners: Vec<MonitorListener>,
    signalled: Vec<bool>,
}

impl DeviceMonitors {
    fn remove_where(&mut self, mut predicate: impl FnMut(&MonitorListener) -> bool) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.listeners.len() {
            if predicate(&self.listeners[i]) {
                self.regions.remove(i);
                self.listeners.remove(i);
                self.signalled.remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }
}

/// Registered monitors for every device, indexed by device index
#[derive(Debug, Default, Clone)]
pub struct ChangeMonitorEngine {
    devices: Vec<DeviceMonitors>,
}

impl ChangeMonitorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a monitor; unsupported regions are rejected
    pub fn register(
        &mut self,
        device: usize,
        region: MonitorRegion,
        listener: MonitorListener,
    ) -> Result<()> {
        if let Err(e) = region.validate() {
            warn!(error = %e, device, ?listener, "Refusing to monitor region");
            return Err(e);
        }

        if self.devices.len() <= device {
            self.devices.resize_with(device + 1, DeviceMonitors::default);
        }
        let monitors = &mut self.devices[device];
        monitors.regions.push(region);
        monitors.listeners.push(listener);
        monitors.signalled.push(false);
        Ok(())
    }

    /// Removes monitors of `control` owned by action map `map`
    pub fn unregister(&mut self, device: usize, control: usize, map: usize) -> usize {
        self.devices.get_mut(device).map_or(0, |m| {
            m.remove_where(|l| l.control == control && l.map == map)
        })
    }

    /// Drops all monitors of a device and shifts later device indices down
    pub fn remove_device(&mut self, device: usize) {
        if device < self.devices.len() {
            self.devices.remove(device);
        }
    }

    /// Drops every monitor but keeps per-device storage
    pub fn clear(&mut self) {
        for monitors in &mut self.devices {
            monitors.regions.clear();
            monitors.listeners.clear();
            monitors.signalled.clear();
        }
    }

    pub fn monitor_count(&self, device: usize) -> usize {
        self.devices.get(device).map_or(0, |m| m.regions.len())
    }

    pub fn total_monitor_count(&self) -> usize {
        self.devices.iter().map(|m| m.regions.len()).sum()
    }

    /// Flags every region whose bits differ between `new_state` and `old_state`
    ///
    /// `new_state` holds the incoming bytes, which start `new_state_offset`
    /// bytes into the device. `old_state` is the device's complete current
    /// state. Regions outside `[new_state_offset, new_state_offset +
    /// new_state.len())` are skipped. Returns true if anything was flagged.
    pub fn scan(
        &mut self,
        device: usize,
        new_state: &[u8],
        old_state: &[u8],
        new_state_offset: u32,
    ) -> bool {
        let Some(monitors) = self.devices.get_mut(device) else {
            return false;
        };

        let offset = new_state_offset as usize;
        let delta_start = u64::from(new_state_offset) * 8;
        let delta_end = delta_start + new_state.len() as u64 * 8;
        let mut any = false;

        for (region, signalled) in monitors.regions.iter().zip(monitors.signalled.iter_mut()) {
            if region.bit_start() >= delta_end || delta_start >= region.bit_end() {
                continue;
            }

            let changed = if region.is_single_bit() {
                let byte = region.byte_offset as usize;
                let new = new_state[byte - offset];
                old_state
                    .get(byte)
                    .is_none_or(|old| ((new ^ old) >> region.bit_offset) & 1 != 0)
            } else {
                // Only the overlapping bytes can change
                let start = (region.byte_offset as usize).max(offset);
                let end = (region.bit_end() / 8) as usize;
                let end = end.min(offset + new_state.len());
                old_state
                    .get(start..end)
                    .is_none_or(|old| old != &new_state[start - offset..end - offset])
            };

            if changed {
                *signalled = true;
                any = true;
            }
        }

        any
    }

    /// Moves the listeners of flagged regions into `out` and clears the flags
    pub fn drain_signalled(&mut self, device: usize, out: &mut Vec<MonitorListener>) {
        let Some(monitors) = self.devices.get_mut(device) else {
            return;
        };
        for (listener, signalled) in monitors.listeners.iter().zip(monitors.signalled.iter_mut()) {
            if *signalled {
                out.push(*listener);
                *signalled = false;
            }
        }
    }

    pub fn is_signalled(&self, device: usize, monitor: usize) -> bool {
        self.devices
            .get(device)
            .and_then(|m| m.signalled.get(monitor))
            .copied()
            .unwrap_or(false)
    }
}
