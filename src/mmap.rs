use core::ffi::c_void;
use core::ptr::NonNull;

use rustix::fd::{AsFd, BorrowedFd};
use rustix::io::Errno;
use rustix::mm::{MapFlags, ProtFlags};

use crate::err::{Error, Result};

/// One shared read/write mapping of a ring region.
///
/// The region is pre-populated so the first submission does not fault, and
/// is unmapped on drop. Dropping mappings in reverse construction order is
/// the caller's responsibility (the `Ring` destructor and `close` do this).
pub struct RingMapping {
    ptr: NonNull<c_void>,
    size: usize,
}

// SAFETY: the mapping is plain shared memory; all concurrent access goes
// through the queue types, which impose their own synchronization.
unsafe impl Send for RingMapping {}
unsafe impl Sync for RingMapping {}

impl RingMapping {
    /// Maps `size` bytes of the ring file at the given kernel-defined
    /// offset.
    ///
    /// # Errors
    /// Returns [`Error::Kernel`] when the mapping fails.
    pub fn new(fd: BorrowedFd<'_>, offset: u64, size: usize) -> Result<Self> {
        // SAFETY: mapping an io_uring region at a kernel-defined offset;
        // the kernel validates offset and length against the ring.
        let addr = unsafe {
            rustix::mm::mmap(
                core::ptr::null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED | MapFlags::POPULATE,
                fd.as_fd(),
                offset,
            )
        }?;

        Ok(Self {
            ptr: NonNull::new(addr).ok_or(Error::Kernel(Errno::INVAL))?,
            size,
        })
    }

    #[must_use]
    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr.as_ptr()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Drop for RingMapping {
    fn drop(&mut self) {
        // SAFETY: ptr/size came from a successful mmap. munmap failure in a
        // destructor has no recovery path.
        let _ = unsafe { rustix::mm::munmap(self.ptr.as_ptr(), self.size) };
    }
}
