//! Raw event stream
//!
//! Events are stored back to back in one byte buffer. Each record starts with
//! a fixed [`EventHeader`] followed by a kind-specific payload and is padded
//! to [`EVENT_ALIGNMENT`]. The pipeline flags records as handled in place and
//! never removes them; clearing the buffer is up to its owner.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable, bytes_of, pod_read_unaligned};

use crate::device::{DeviceId, FourCc};

/// Records are padded to this many bytes
pub const EVENT_ALIGNMENT: usize = 4;

/// Full device state
pub const STATE_EVENT: FourCc = FourCc::new(b"STAT");
/// Partial device state starting at a byte offset
pub const DELTA_STATE_EVENT: FourCc = FourCc::new(b"DLTA");
/// One character of text input
pub const TEXT_EVENT: FourCc = FourCc::new(b"TEXT");
/// Device disconnected
pub const DEVICE_REMOVED_EVENT: FourCc = FourCc::new(b"DREM");
/// Device configuration (layout, calibration, keyboard language) changed
pub const DEVICE_CONFIG_CHANGED_EVENT: FourCc = FourCc::new(b"DCFG");

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventFlags: u32 {
        const HANDLED = 1 << 0;
    }
}

/// Fixed header at the start of every record
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct EventHeader {
    pub kind: FourCc,
    /// Size of header plus payload, without padding
    pub size_in_bytes: u32,
    pub device_id: u32,
    pub flags: u32,
    pub time: f64,
}

pub const HEADER_SIZE: usize = std::mem::size_of::<EventHeader>();

impl EventHeader {
    pub fn device(&self) -> DeviceId {
        DeviceId(self.device_id)
    }

    pub fn flags(&self) -> EventFlags {
        EventFlags::from_bits_truncate(self.flags)
    }

    pub fn is_handled(&self) -> bool {
        self.flags().contains(EventFlags::HANDLED)
    }

    /// Bytes from this header to the next record
    pub fn record_len(&self) -> usize {
        (self.size_in_bytes as usize).div_ceil(EVENT_ALIGNMENT) * EVENT_ALIGNMENT
    }
}

/// Payload prefix of full and delta state events
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct StatePayloadHeader {
    pub format: FourCc,
    /// Byte offset into the device state; zero for full state events
    pub state_offset: u32,
}

pub const STATE_PAYLOAD_HEADER_SIZE: usize = std::mem::size_of::<StatePayloadHeader>();

/// Decoded view of one record
#[derive(Debug, Clone, Copy)]
pub struct EventRef<'a> {
    pub offset: usize,
    pub header: EventHeader,
    pub payload: &'a [u8],
}

impl<'a> EventRef<'a> {
    /// Format, offset and bytes of a state event, if the payload is well formed
    pub fn state(&self) -> Option<(StatePayloadHeader, &'a [u8])> {
        if self.header.kind != STATE_EVENT && self.header.kind != DELTA_STATE_EVENT {
            return None;
        }
        let prefix = self.payload.get(..STATE_PAYLOAD_HEADER_SIZE)?;
        let header: StatePayloadHeader = pod_read_unaligned(prefix);
        Some((header, &self.payload[STATE_PAYLOAD_HEADER_SIZE..]))
    }

    /// Character carried by a text event
    pub fn text(&self) -> Option<char> {
        if self.header.kind != TEXT_EVENT {
            return None;
        }
        let code: u32 = pod_read_unaligned(self.payload.get(..4)?);
        char::from_u32(code)
    }
}

/// Growable buffer of raw event records
#[derive(Debug, Default, Clone)]
pub struct InputEventBuffer {
    data: Vec<u8>,
    count: usize,
}

impl InputEventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Raw bytes of all records
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.count = 0;
    }

    pub fn push_state(&mut self, device: DeviceId, time: f64, format: FourCc, state: &[u8]) {
        let prefix = StatePayloadHeader {
            format,
            state_offset: 0,
        };
        self.push_raw(STATE_EVENT, device, time, &[bytes_of(&prefix), state]);
    }

    pub fn push_delta(
        &mut self,
        device: DeviceId,
        time: f64,
        format: FourCc,
        state_offset: u32,
        bytes: &[u8],
    ) {
        let prefix = StatePayloadHeader {
            format,
            state_offset,
        };
        self.push_raw(DELTA_STATE_EVENT, device, time, &[bytes_of(&prefix), bytes]);
    }

    pub fn push_text(&mut self, device: DeviceId, time: f64, character: char) {
        let code = u32::from(character);
        self.push_raw(TEXT_EVENT, device, time, &[bytes_of(&code)]);
    }

    pub fn push_device_removed(&mut self, device: DeviceId, time: f64) {
        self.push_raw(DEVICE_REMOVED_EVENT, device, time, &[]);
    }

    pub fn push_config_changed(&mut self, device: DeviceId, time: f64) {
        self.push_raw(DEVICE_CONFIG_CHANGED_EVENT, device, time, &[]);
    }

    /// Appends a record of any kind
    pub fn push_raw(&mut self, kind: FourCc, device: DeviceId, time: f64, payload: &[&[u8]]) {
        let payload_len: usize = payload.iter().map(|p| p.len()).sum();
        let header = EventHeader {
            kind,
            size_in_bytes: (HEADER_SIZE + payload_len) as u32,
            device_id: device.0,
            flags: EventFlags::empty().bits(),
            time,
        };
        let start = self.data.len();
        self.data.extend_from_slice(bytes_of(&header));
        for part in payload {
            self.data.extend_from_slice(part);
        }
        self.data.resize(start + header.record_len(), 0);
        self.count += 1;
    }

    /// Header of the record starting at `offset`
    pub fn header_at(&self, offset: usize) -> Option<EventHeader> {
        let bytes = self.data.get(offset..offset + HEADER_SIZE)?;
        Some(pod_read_unaligned(bytes))
    }

    /// Decodes the record starting at `offset`
    pub fn event_at(&self, offset: usize) -> Option<EventRef<'_>> {
        let header = self.header_at(offset)?;
        let end = offset + (header.size_in_bytes as usize).max(HEADER_SIZE);
        let payload = self.data.get(offset + HEADER_SIZE..end)?;
        Some(EventRef {
            offset,
            header,
            payload,
        })
    }

    /// Sets the handled flag of the record at `offset`
    pub fn mark_handled(&mut self, offset: usize) {
        let Some(mut header) = self.header_at(offset) else {
            return;
        };
        header.flags |= EventFlags::HANDLED.bits();
        self.data[offset..offset + HEADER_SIZE].copy_from_slice(bytes_of(&header));
    }

    pub fn iter(&self) -> EventIter<'_> {
        EventIter {
            buffer: self,
            offset: 0,
        }
    }

    /// Records flagged as handled
    pub fn handled_count(&self) -> usize {
        self.iter().filter(|e| e.header.is_handled()).count()
    }
}

/// Iterator over the records of an [`InputEventBuffer`]
pub struct EventIter<'a> {
    buffer: &'a InputEventBuffer,
    offset: usize,
}

impl<'a> Iterator for EventIter<'a> {
    type Item = EventRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.buffer.event_at(self.offset)?;
        self.offset += event.header.record_len().max(HEADER_SIZE);
        Some(event)
    }
}

impl<'a> IntoIterator for &'a InputEventBuffer {
    type Item = EventRef<'a>;
    type IntoIter = EventIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT: FourCc = FourCc::new(b"GPAD");

    #[test]
    fn test_header_layout() {
        assert_eq!(HEADER_SIZE, 24);
        assert_eq!(STATE_PAYLOAD_HEADER_SIZE, 8);
    }

    #[test]
    fn test_records_are_aligned() {
        let mut buffer = InputEventBuffer::new();
        buffer.push_state(DeviceId(1), 0.5, FORMAT, &[1, 2, 3]);
        buffer.push_text(DeviceId(1), 0.6, 'x');

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.as_bytes().len() % EVENT_ALIGNMENT, 0);

        let events: Vec<_> = buffer.iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].header.kind, STATE_EVENT);
        let (prefix, state) = events[0].state().unwrap();
        assert_eq!(prefix.format, FORMAT);
        assert_eq!(state, &[1, 2, 3]);
        assert_eq!(events[1].text(), Some('x'));
        assert_eq!(events[1].header.time, 0.6);
    }

    #[test]
    fn test_delta_carries_offset() {
        let mut buffer = InputEventBuffer::new();
        buffer.push_delta(DeviceId(3), 1.0, FORMAT, 4, &[9, 9]);
        let event = buffer.iter().next().unwrap();
        let (prefix, bytes) = event.state().unwrap();
        assert_eq!(prefix.state_offset, 4);
        assert_eq!(bytes, &[9, 9]);
        assert_eq!(event.header.device(), DeviceId(3));
    }

    #[test]
    fn test_mark_handled_in_place() {
        let mut buffer = InputEventBuffer::new();
        buffer.push_device_removed(DeviceId(1), 0.0);
        buffer.push_config_changed(DeviceId(2), 0.0);

        let second = buffer.iter().nth(1).unwrap().offset;
        buffer.mark_handled(second);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.handled_count(), 1);
        assert!(buffer.header_at(second).unwrap().is_handled());
        assert!(!buffer.header_at(0).unwrap().is_handled());
    }

    #[test]
    fn test_truncated_state_payload_is_rejected() {
        let mut buffer = InputEventBuffer::new();
        buffer.push_raw(STATE_EVENT, DeviceId(1), 0.0, &[&[1, 2]]);
        assert!(buffer.iter().next().unwrap().state().is_none());
    }
}
