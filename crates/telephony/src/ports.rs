//! RTP port allocation

use crate::TelephonyError;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Hands out UDP ports from a fixed range, one per call.
///
/// Released ports go to the back of the queue so recently-freed ports are
/// not immediately reused while stray packets for the old call may still
/// be in flight.
pub struct PortAllocator {
    free: Mutex<VecDeque<u16>>,
}

impl PortAllocator {
    /// Range is inclusive on both ends
    pub fn new(port_min: u16, port_max: u16) -> Self {
        Self {
            free: Mutex::new((port_min..=port_max).collect()),
        }
    }

    /// Take a port, failing immediately when the range is exhausted
    pub fn allocate(&self) -> Result<u16, TelephonyError> {
        self.free
            .lock()
            .pop_front()
            .ok_or(TelephonyError::ResourceExhausted)
    }

    /// Return a port to the pool
    pub fn release(&self, port: u16) {
        self.free.lock().push_back(port);
    }

    pub fn available(&self) -> usize {
        self.free.lock().len()
    }
}
