use core::sync::atomic::{AtomicU32, Ordering};

use rustix::io_uring::io_cqring_offsets;

use crate::err::Result;
use crate::{
    io_uring_cqe, IORING_CQE_BUFFER_SHIFT, IORING_CQE_F_BUFFER, IORING_CQE_F_MORE,
    IORING_CQE_F_NOTIF, IORING_CQE_F_SOCK_NONEMPTY,
};

/// One completion, copied out of the ring by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cqe {
    /// Opaque token copied from the submission entry.
    pub user_data: u64,
    /// Non-negative payload or a negated error number.
    pub res: i32,
    /// `IORING_CQE_F_*` flag word.
    pub flags: u32,
}

impl Cqe {
    /// Buffer ID when the kernel selected a provided buffer.
    #[must_use]
    pub fn buffer_id(&self) -> Option<u16> {
        (self.flags & IORING_CQE_F_BUFFER != 0).then(|| (self.flags >> IORING_CQE_BUFFER_SHIFT) as u16)
    }

    /// True when more completions from the same multishot submission are
    /// coming.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.flags & IORING_CQE_F_MORE != 0
    }

    /// True when the socket still holds unread data.
    #[must_use]
    pub fn sock_nonempty(&self) -> bool {
        self.flags & IORING_CQE_F_SOCK_NONEMPTY != 0
    }

    /// True for a zero-copy send notification.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.flags & IORING_CQE_F_NOTIF != 0
    }

    /// The result as `Ok(payload)` or the embedded kernel error.
    ///
    /// # Errors
    /// Returns [`crate::Error::Kernel`] when `res` is negative.
    pub fn result(&self) -> Result<u32> {
        crate::err::cqe_result(self.res)
    }
}

/// Consumer side of the completion ring.
///
/// The kernel produces entries and publishes them with a release increment
/// of `ktail`; this side loads the tail with acquire ordering before reading
/// an entry and releases slots back with a release store of `khead`. No
/// locking happens here: multiple consumers are only safe when the
/// application serializes them externally.
pub struct CompletionQueue {
    khead: *const AtomicU32,
    ktail: *const AtomicU32,
    kflags: *const AtomicU32,
    koverflow: *const AtomicU32,
    cqes: *const io_uring_cqe,
    ring_mask: u32,
    ring_entries: u32,
}

// SAFETY: the raw pointers target the shared ring mappings, which stay valid
// for the queue's lifetime; the counters are only accessed through atomics
// and entries are copied out by value.
unsafe impl Send for CompletionQueue {}
unsafe impl Sync for CompletionQueue {}

impl CompletionQueue {
    /// Resolves typed views into the mapped CQ region.
    ///
    /// # Safety
    /// `cq_ptr` must point at the mapped completion ring described by
    /// `offsets` and must outlive the returned queue.
    #[must_use]
    pub(crate) unsafe fn new(cq_ptr: *mut u8, offsets: &io_cqring_offsets) -> Self {
        let khead = cq_ptr.add(offsets.head as usize).cast::<AtomicU32>();
        let ktail = cq_ptr.add(offsets.tail as usize).cast::<AtomicU32>();
        let kflags = cq_ptr.add(offsets.flags as usize).cast::<AtomicU32>();
        let koverflow = cq_ptr.add(offsets.overflow as usize).cast::<AtomicU32>();
        let cqes = cq_ptr.add(offsets.cqes as usize).cast::<io_uring_cqe>();

        let ring_mask = *cq_ptr.add(offsets.ring_mask as usize).cast::<u32>();
        let ring_entries = *cq_ptr.add(offsets.ring_entries as usize).cast::<u32>();

        Self {
            khead,
            ktail,
            kflags,
            koverflow,
            cqes,
            ring_mask,
            ring_entries,
        }
    }

    fn head(&self) -> u32 {
        // SAFETY: khead points into the live mapping; this side is the only
        // head writer.
        unsafe { (*self.khead).load(Ordering::Relaxed) }
    }

    fn tail(&self) -> u32 {
        // SAFETY: ktail points into the live mapping. Acquire pairs with the
        // kernel's release increment, so entries below the loaded tail are
        // fully written.
        unsafe { (*self.ktail).load(Ordering::Acquire) }
    }

    /// Copies the entry at the head without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<Cqe> {
        let head = self.head();
        if head == self.tail() {
            return None;
        }

        let index = head & self.ring_mask;
        // SAFETY: head != tail, so the slot holds a fully published entry.
        let raw = unsafe { *self.cqes.add(index as usize) };
        Some(Cqe {
            user_data: raw.user_data,
            res: raw.res,
            flags: raw.flags,
        })
    }

    /// Releases `count` consumed slots back to the kernel. `count` must not
    /// exceed [`ready`](Self::ready).
    pub fn advance(&self, count: u32) {
        // SAFETY: khead points into the live mapping. Release pairs with the
        // kernel's acquire so it never reuses a slot we are still reading.
        unsafe {
            let head = (*self.khead).load(Ordering::Relaxed);
            (*self.khead).store(head.wrapping_add(count), Ordering::Release);
        }
    }

    /// Visits available entries in order until `f` returns `false`, then
    /// releases exactly the visited slots. Returns the number consumed.
    pub fn for_each<F>(&self, mut f: F) -> usize
    where
        F: FnMut(Cqe) -> bool,
    {
        let mut head = self.head();
        let tail = self.tail();
        let mut count = 0u32;

        while head != tail {
            let index = head & self.ring_mask;
            // SAFETY: head < tail, slot is published.
            let raw = unsafe { *self.cqes.add(index as usize) };
            let keep_going = f(Cqe {
                user_data: raw.user_data,
                res: raw.res,
                flags: raw.flags,
            });
            head = head.wrapping_add(1);
            count += 1;
            if !keep_going {
                break;
            }
        }

        if count > 0 {
            self.advance(count);
        }
        count as usize
    }

    /// Releases every available entry without inspection. Returns the count
    /// drained.
    pub fn drain(&self) -> usize {
        let head = self.head();
        let tail = self.tail();
        let count = tail.wrapping_sub(head);
        if count > 0 {
            self.advance(count);
        }
        count as usize
    }

    /// Completions available for consumption.
    #[must_use]
    pub fn ready(&self) -> u32 {
        self.tail().wrapping_sub(self.head())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ready() == 0
    }

    /// Completions the kernel dropped because the ring was full. The
    /// counter only grows; the library never retries on overflow.
    #[must_use]
    pub fn overflow(&self) -> u32 {
        // SAFETY: koverflow points into the live mapping.
        unsafe { (*self.koverflow).load(Ordering::Relaxed) }
    }

    #[must_use]
    pub fn flags(&self) -> u32 {
        // SAFETY: kflags points into the live mapping.
        unsafe { (*self.kflags).load(Ordering::Relaxed) }
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
