//! Double-buffered slot pool for the acquisition pipeline.
//!
//! The pool is the single synchronisation point between the SPI producer and
//! the UDP consumer during a shot: while one slot drains to the network, the
//! next sample block is already being fetched into the other.
//!
//! A slot only ever moves through
//! `Free → Claimed (writer) → Filled → Claimed (reader) → Free`.
//! Claims hand out an affine [`SlotToken`] that is consumed by
//! [`SlotPool::return_slot`], so a claim cannot be returned twice and a
//! returned slot cannot be touched again.

use crate::config::{SLOT_COUNT, SLOT_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotStatus {
    Free,
    Filled,
    Claimed,
}

struct Slot {
    data: [u8; SLOT_SIZE],
    length: usize,
    status: SlotStatus,
}

impl Slot {
    const fn new() -> Self {
        Self {
            data: [0; SLOT_SIZE],
            length: SLOT_SIZE,
            status: SlotStatus::Free,
        }
    }
}

/// Receipt for a claimed slot.
///
/// Deliberately neither `Copy` nor `Clone`: whoever holds the token owns the
/// slot's bytes until it is handed back.
#[derive(Debug)]
pub struct SlotToken {
    index: usize,
}

/// Fixed-capacity circular pool of reusable byte slots.
pub struct SlotPool {
    slots: [Slot; SLOT_COUNT],
    /// Next slot a reader claim inspects; advances on discard-return.
    head: usize,
    /// Next slot a writer claim inspects; advances on a successful claim.
    tail: usize,
    /// Slots currently filled or claimed for reading.
    count: usize,
}

impl SlotPool {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::new()),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Reset every slot to `Free` with full capacity.  Must run once per
    /// acquisition session before any claim.
    pub fn init(&mut self) {
        for slot in &mut self.slots {
            slot.status = SlotStatus::Free;
            slot.length = SLOT_SIZE;
        }
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// Claim the slot at `tail` for filling.
    ///
    /// Fails if the pool is full or the slot is not `Free`.  The caller
    /// fills the slot through [`data_mut`](Self::data_mut) and records the
    /// meaningful length with [`set_len`](Self::set_len).
    pub fn claim_for_write(&mut self) -> Option<SlotToken> {
        if self.count >= SLOT_COUNT {
            return None;
        }

        let index = self.tail;
        if self.slots[index].status != SlotStatus::Free {
            return None;
        }

        self.slots[index].status = SlotStatus::Claimed;
        self.tail = (self.tail + 1) % SLOT_COUNT;

        Some(SlotToken { index })
    }

    /// Claim the slot at `head` for draining.
    ///
    /// Fails if the pool is empty or the slot is not `Filled`.  `head` only
    /// advances when the slot comes back with `discard = true`.
    pub fn claim_for_read(&mut self) -> Option<SlotToken> {
        if self.count == 0 {
            return None;
        }

        let index = self.head;
        if self.slots[index].status != SlotStatus::Filled {
            return None;
        }

        self.slots[index].status = SlotStatus::Claimed;

        Some(SlotToken { index })
    }

    /// Hand a claimed slot back.
    ///
    /// A writer returns a freshly filled slot with `discard = false`; a
    /// reader returns a consumed slot with `discard = true`, which frees it
    /// and advances `head`.
    pub fn return_slot(&mut self, token: SlotToken, discard: bool) {
        let slot = &mut self.slots[token.index];

        if discard {
            slot.status = SlotStatus::Free;
            slot.length = SLOT_SIZE;
            self.head = (self.head + 1) % SLOT_COUNT;
            self.count -= 1;
        } else {
            slot.status = SlotStatus::Filled;
            self.count += 1;
        }
    }

    /// Full-capacity view of a claimed slot's bytes.
    pub fn data_mut(&mut self, token: &SlotToken) -> &mut [u8] {
        &mut self.slots[token.index].data
    }

    /// The meaningful bytes of a claimed slot (`data[..length]`).
    pub fn data(&self, token: &SlotToken) -> &[u8] {
        let slot = &self.slots[token.index];
        &slot.data[..slot.length]
    }

    /// Record how many bytes of a claimed slot are meaningful.
    pub fn set_len(&mut self, token: &SlotToken, length: usize) {
        debug_assert!(length <= SLOT_SIZE);
        self.slots[token.index].length = length.min(SLOT_SIZE);
    }

    /// Slots currently filled or claimed for reading.
    pub fn filled_count(&self) -> usize {
        self.count
    }
}

impl Default for SlotPool {
    fn default() -> Self {
        Self::new()
    }
}
