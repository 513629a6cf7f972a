use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rustix::io_uring::io_sqring_offsets;

use crate::{io_uring_sqe, IORING_SQ_NEED_WAKEUP};

/// Producer side of the submission ring.
///
/// The kernel consumes entries by advancing `khead`; this side reserves
/// slots past the published tail, fills them, and publishes them all with a
/// single release-store of `ktail`. Reservation state (the pending count)
/// lives behind the producer mutex; the mapped counters are only ever
/// touched through the atomics below.
pub struct SubmissionQueue {
    khead: *const AtomicU32,
    ktail: *const AtomicU32,
    kflags: *const AtomicU32,
    kdropped: *const AtomicU32,
    array: *mut u32,
    sqes: *mut io_uring_sqe,
    ring_mask: u32,
    ring_entries: u32,
    producer: Mutex<Producer>,
}

pub(crate) struct Producer {
    /// Entries reserved but not yet visible to the kernel.
    pub(crate) pending: u32,
}

// SAFETY: the raw pointers target the shared ring mappings, which stay valid
// for the queue's lifetime. Cross-thread reservation is serialized by the
// producer mutex and the kernel-visible counters are only accessed through
// atomics.
unsafe impl Send for SubmissionQueue {}
unsafe impl Sync for SubmissionQueue {}

impl SubmissionQueue {
    /// Resolves typed views into the mapped SQ region.
    ///
    /// # Safety
    /// `sq_ptr` must point at the mapped submission ring described by
    /// `offsets`, and `sqes` at the mapped entry array; both must outlive
    /// the returned queue.
    #[must_use]
    pub(crate) unsafe fn new(
        sq_ptr: *mut u8,
        offsets: &io_sqring_offsets,
        sqes: *mut io_uring_sqe,
    ) -> Self {
        let khead = sq_ptr.add(offsets.head as usize).cast::<AtomicU32>();
        let ktail = sq_ptr.add(offsets.tail as usize).cast::<AtomicU32>();
        let kflags = sq_ptr.add(offsets.flags as usize).cast::<AtomicU32>();
        let kdropped = sq_ptr.add(offsets.dropped as usize).cast::<AtomicU32>();
        let array = sq_ptr.add(offsets.array as usize).cast::<u32>();

        // Geometry comes from the mapped region, not the setup request; the
        // kernel may have rounded the requested capacity up.
        let ring_mask = *sq_ptr.add(offsets.ring_mask as usize).cast::<u32>();
        let ring_entries = *sq_ptr.add(offsets.ring_entries as usize).cast::<u32>();

        Self {
            khead,
            ktail,
            kflags,
            kdropped,
            array,
            sqes,
            ring_mask,
            ring_entries,
            producer: Mutex::new(Producer { pending: 0 }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Producer> {
        self.producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves the next free entry: zeroes it, installs its index into the
    /// ring's index array, and bumps the pending count. Returns `None` when
    /// published-plus-pending has reached capacity.
    pub(crate) fn reserve<'a>(&'a self, prod: &mut Producer) -> Option<&'a mut io_uring_sqe> {
        // SAFETY: khead/ktail point into the live mapping; the slot at
        // `tail & mask` is free because tail - head < ring_entries.
        unsafe {
            let head = (*self.khead).load(Ordering::Acquire);
            let tail = (*self.ktail)
                .load(Ordering::Relaxed)
                .wrapping_add(prod.pending);

            if tail.wrapping_sub(head) >= self.ring_entries {
                return None;
            }

            let index = tail & self.ring_mask;
            let sqe = &mut *self.sqes.add(index as usize);
            *sqe = io_uring_sqe::default();
            core::ptr::write_volatile(self.array.add(index as usize), index);
            prod.pending += 1;
            Some(sqe)
        }
    }

    /// Publishes all pending entries with one release-store of the tail, so
    /// the kernel observes every prior entry and index write. Returns the
    /// count published.
    pub(crate) fn publish(&self, prod: &mut Producer) -> u32 {
        let count = prod.pending;
        if count == 0 {
            return 0;
        }

        // SAFETY: ktail points into the live mapping; this side is the only
        // tail writer and holds the producer lock.
        unsafe {
            let tail = (*self.ktail).load(Ordering::Relaxed);
            (*self.ktail).store(tail.wrapping_add(count), Ordering::Release);
        }
        prod.pending = 0;
        count
    }

    /// ORs `flags` into the most recently reserved, still-unpublished entry.
    pub(crate) fn or_last_flags(&self, prod: &Producer, flags: u8) {
        if prod.pending == 0 {
            return;
        }

        // SAFETY: the entry at tail + pending - 1 was reserved by us and is
        // not yet visible to the kernel.
        unsafe {
            let tail = (*self.ktail)
                .load(Ordering::Relaxed)
                .wrapping_add(prod.pending - 1);
            let index = tail & self.ring_mask;
            (*self.sqes.add(index as usize)).flags |= flags;
        }
    }

    /// Kernel-visible free space: capacity minus published-but-unconsumed
    /// entries. Reserved-but-unpublished entries are not counted here.
    #[must_use]
    pub fn space(&self) -> u32 {
        // SAFETY: counters point into the live mapping.
        unsafe {
            let head = (*self.khead).load(Ordering::Acquire);
            let tail = (*self.ktail).load(Ordering::Relaxed);
            self.ring_entries - tail.wrapping_sub(head)
        }
    }

    /// Number of reserved entries awaiting the next submit.
    #[must_use]
    pub fn pending(&self) -> u32 {
        self.lock().pending
    }

    /// True when a kernel-polled submission thread has parked and must be
    /// woken through `enter`.
    #[must_use]
    pub fn needs_wakeup(&self) -> bool {
        // SAFETY: kflags points into the live mapping.
        unsafe { (*self.kflags).load(Ordering::Relaxed) & IORING_SQ_NEED_WAKEUP != 0 }
    }

    /// Entries the kernel rejected for malformed indices.
    #[must_use]
    pub fn dropped(&self) -> u32 {
        // SAFETY: kdropped points into the live mapping.
        unsafe { (*self.kdropped).load(Ordering::Relaxed) }
    }

    #[must_use]
    pub fn ring_mask(&self) -> u32 {
        self.ring_mask
    }

    #[must_use]
    pub fn ring_entries(&self) -> u32 {
        self.ring_entries
    }
}
