//! Producer/Consumer Coupling.
//!
//! A single-slot handoff between the block-reading thread and the decode
//! thread: the producer blocks once the slot is full rather than queuing
//! unboundedly, so a slow consumer applies backpressure all the way back to
//! the sample source instead of piling up memory.

use parking_lot::{Condvar, Mutex};

use crate::iqblock::IqBlock;

enum Slot {
    Empty,
    Full(IqBlock),
    Closed,
}

pub struct Mailbox {
    slot: Mutex<Slot>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Blocks until the slot is empty (or closed), then deposits `block`.
    pub fn send_blocking(&self, block: IqBlock) {
        let mut slot = self.slot.lock();
        loop {
            match &*slot {
                Slot::Empty => break,
                Slot::Closed => return,
                Slot::Full(_) => self.not_full.wait(&mut slot),
            }
        }
        *slot = Slot::Full(block);
        self.not_empty.notify_one();
    }

    /// Blocks until a block is available or the mailbox is closed.
    pub fn recv(&self) -> Option<IqBlock> {
        let mut slot = self.slot.lock();
        loop {
            match &*slot {
                Slot::Full(_) => break,
                Slot::Closed => return None,
                Slot::Empty => self.not_empty.wait(&mut slot),
            }
        }
        let taken = std::mem::replace(&mut *slot, Slot::Empty);
        self.not_full.notify_one();
        match taken {
            Slot::Full(block) => Some(block),
            _ => unreachable!("slot was checked Full above"),
        }
    }

    /// Wakes any blocked producer/consumer and makes all further operations
    /// return immediately.
    pub fn close(&self) {
        let mut slot = self.slot.lock();
        *slot = Slot::Closed;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
