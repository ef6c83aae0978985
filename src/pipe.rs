//! Single-slot handoff pipe.
//!
//! A capacity-1 buffer for passing one scalar between two active objects
//! *outside* the event stream (the appliance machine hands the power
//! level to the magnetron this way). Single-writer/single-reader
//! discipline makes it lock-free: only one side ever writes and only one
//! side ever reads, so an atomic filled flag with acquire/release
//! ordering is the whole protocol. Neither operation blocks: a write
//! into a full slot and a read from an empty slot both fail fast.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Lock-free single-slot pipe. Share via `Arc`; clone one handle to the
/// producer and one to the consumer.
#[derive(Debug)]
pub struct SlotPipe {
    value: AtomicU32,
    filled: AtomicBool,
}

impl SlotPipe {
    pub fn new() -> Self {
        Self { value: AtomicU32::new(0), filled: AtomicBool::new(false) }
    }

    /// Write `value` into the slot. Fails (returning `false`) if the slot
    /// is still full, leaving the stored value untouched.
    pub fn write(&self, value: u32) -> bool {
        if self.filled.load(Ordering::Acquire) {
            return false;
        }
        // Single writer: nobody else can fill the slot between the check
        // and the store. The Release pairs with the reader's Acquire.
        self.value.store(value, Ordering::Relaxed);
        self.filled.store(true, Ordering::Release);
        true
    }

    /// Take the value out of the slot, emptying it. `None` if empty.
    pub fn read(&self) -> Option<u32> {
        if !self.filled.load(Ordering::Acquire) {
            return None;
        }
        let value = self.value.load(Ordering::Relaxed);
        self.filled.store(false, Ordering::Release);
        Some(value)
    }

    pub fn is_empty(&self) -> bool {
        !self.filled.load(Ordering::Acquire)
    }
}

impl Default for SlotPipe {
    fn default() -> Self {
        Self::new()
    }
}
