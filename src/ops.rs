//! Per-opcode submission builders.
//!
//! Every helper follows the same discipline: take the producer lock,
//! reserve a zeroed entry, write only the fields its opcode needs plus the
//! caller's user token, and release the lock. None of them issue a syscall;
//! publication happens in [`Ring::submit`].
//!
//! I/O helpers taking a buffer treat a zero-length buffer as an immediate
//! successful no-op that consumes no entry.

use core::ffi::{c_void, CStr};

use rustix::fd::RawFd;

use crate::err::Result;
use crate::ring::Ring;
use crate::{
    Iovec, MsgHdr, Timespec, IORING_ACCEPT_MULTISHOT, IORING_OP_ACCEPT, IORING_OP_ASYNC_CANCEL,
    IORING_OP_CLOSE, IORING_OP_CONNECT, IORING_OP_FADVISE, IORING_OP_FALLOCATE, IORING_OP_FSYNC,
    IORING_OP_LINKAT, IORING_OP_LINK_TIMEOUT, IORING_OP_MADVISE, IORING_OP_MKDIRAT,
    IORING_OP_MSG_RING, IORING_OP_NOP, IORING_OP_OPENAT, IORING_OP_POLL_ADD,
    IORING_OP_POLL_REMOVE, IORING_OP_PROVIDE_BUFFERS, IORING_OP_READ, IORING_OP_READV,
    IORING_OP_READ_FIXED, IORING_OP_RECV, IORING_OP_RECVMSG, IORING_OP_REMOVE_BUFFERS,
    IORING_OP_RENAMEAT, IORING_OP_SEND, IORING_OP_SENDMSG, IORING_OP_SEND_ZC,
    IORING_OP_SHUTDOWN, IORING_OP_SOCKET, IORING_OP_SPLICE, IORING_OP_STATX,
    IORING_OP_SYMLINKAT, IORING_OP_TEE, IORING_OP_TIMEOUT, IORING_OP_TIMEOUT_REMOVE,
    IORING_OP_UNLINKAT, IORING_OP_WRITE, IORING_OP_WRITEV, IORING_OP_WRITE_FIXED,
    IORING_POLL_ADD_MULTI, IORING_RECV_MULTISHOT, IOSQE_BUFFER_SELECT,
};

impl Ring {
    /// No-op operation; completes with result 0. Useful for testing and for
    /// waking a kernel-polled ring.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_nop(&self, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_NOP;
            sqe.user_data = user_data;
        })
    }

    /// Reads up to `buf.len()` bytes from `fd` at `offset`.
    ///
    /// The buffer must stay valid and stable until the completion is
    /// observed. An empty buffer is a successful no-op consuming no entry,
    /// which also means it never reports
    /// [`QueueFull`](crate::Error::QueueFull).
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_read(&self, fd: RawFd, buf: &mut [u8], offset: u64, user_data: u64) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_READ;
            sqe.fd = fd;
            sqe.addr = buf.as_mut_ptr() as u64;
            sqe.len = buf.len() as u32;
            sqe.off = offset;
            sqe.user_data = user_data;
        })
    }

    /// Writes `buf` to `fd` at `offset`. Empty buffers are a no-op; see
    /// [`prep_read`](Self::prep_read).
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_write(&self, fd: RawFd, buf: &[u8], offset: u64, user_data: u64) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_WRITE;
            sqe.fd = fd;
            sqe.addr = buf.as_ptr() as u64;
            sqe.len = buf.len() as u32;
            sqe.off = offset;
            sqe.user_data = user_data;
        })
    }

    /// Read into a registered buffer; `buf_index` selects it.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_read_fixed(
        &self,
        fd: RawFd,
        buf: &mut [u8],
        offset: u64,
        buf_index: u16,
        user_data: u64,
    ) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_READ_FIXED;
            sqe.fd = fd;
            sqe.addr = buf.as_mut_ptr() as u64;
            sqe.len = buf.len() as u32;
            sqe.off = offset;
            sqe.buf_index = buf_index;
            sqe.user_data = user_data;
        })
    }

    /// Write from a registered buffer; `buf_index` selects it.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_write_fixed(
        &self,
        fd: RawFd,
        buf: &[u8],
        offset: u64,
        buf_index: u16,
        user_data: u64,
    ) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_WRITE_FIXED;
            sqe.fd = fd;
            sqe.addr = buf.as_ptr() as u64;
            sqe.len = buf.len() as u32;
            sqe.off = offset;
            sqe.buf_index = buf_index;
            sqe.user_data = user_data;
        })
    }

    /// Vectored read. The iovec array must stay valid until completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_readv(
        &self,
        fd: RawFd,
        iovecs: &[Iovec],
        offset: u64,
        user_data: u64,
    ) -> Result<()> {
        if iovecs.is_empty() {
            return Ok(());
        }

        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_READV;
            sqe.fd = fd;
            sqe.addr = iovecs.as_ptr() as u64;
            sqe.len = iovecs.len() as u32;
            sqe.off = offset;
            sqe.user_data = user_data;
        })
    }

    /// Vectored write. The iovec array must stay valid until completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_writev(
        &self,
        fd: RawFd,
        iovecs: &[Iovec],
        offset: u64,
        user_data: u64,
    ) -> Result<()> {
        if iovecs.is_empty() {
            return Ok(());
        }

        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_WRITEV;
            sqe.fd = fd;
            sqe.addr = iovecs.as_ptr() as u64;
            sqe.len = iovecs.len() as u32;
            sqe.off = offset;
            sqe.user_data = user_data;
        })
    }

    /// `flags` may include [`IORING_FSYNC_DATASYNC`](crate::IORING_FSYNC_DATASYNC).
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_fsync(&self, fd: RawFd, flags: u32, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_FSYNC;
            sqe.fd = fd;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Timeout that fires after `ts`, or earlier once `count` completions
    /// have posted (`count` 0 means pure timer). Completes with `-ETIME`
    /// when the timer fires. The timespec must stay valid until completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_timeout(
        &self,
        ts: &Timespec,
        count: u64,
        flags: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_TIMEOUT;
            sqe.fd = -1;
            sqe.addr = (ts as *const Timespec) as u64;
            sqe.len = 1;
            sqe.off = count;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Removes a pending timeout identified by its user token.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_timeout_remove(&self, target_user_data: u64, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_TIMEOUT_REMOVE;
            sqe.fd = -1;
            sqe.addr = target_user_data;
            sqe.user_data = user_data;
        })
    }

    /// Timeout bound to the previous, link-flagged entry; cancels it when
    /// the timer fires first.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_link_timeout(&self, ts: &Timespec, flags: u32, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_LINK_TIMEOUT;
            sqe.fd = -1;
            sqe.addr = (ts as *const Timespec) as u64;
            sqe.len = 1;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Cancels the in-flight operation carrying `target_user_data`. Both
    /// the cancelled operation and the cancel itself complete with their
    /// own entries. `flags` may include the `IORING_ASYNC_CANCEL_*` bits.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_cancel(&self, target_user_data: u64, flags: u32, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_ASYNC_CANCEL;
            sqe.fd = -1;
            sqe.addr = target_user_data;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Poll `fd` once for the events in `poll_mask`.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_poll_add(&self, fd: RawFd, poll_mask: u32, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_POLL_ADD;
            sqe.fd = fd;
            sqe.op_flags = poll_mask;
            sqe.user_data = user_data;
        })
    }

    /// Multishot poll: posts a completion per readiness event until removed.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_poll_add_multishot(&self, fd: RawFd, poll_mask: u32, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_POLL_ADD;
            sqe.fd = fd;
            sqe.op_flags = poll_mask;
            sqe.len = IORING_POLL_ADD_MULTI;
            sqe.user_data = user_data;
        })
    }

    /// Removes a pending poll identified by its user token.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_poll_remove(&self, target_user_data: u64, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_POLL_REMOVE;
            sqe.fd = -1;
            sqe.addr = target_user_data;
            sqe.user_data = user_data;
        })
    }

    /// Accepts a connection; the new descriptor arrives in the completion
    /// result. The peer address is discarded.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_accept(&self, fd: RawFd, flags: u32, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_ACCEPT;
            sqe.fd = fd;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Accept capturing the peer address. `addr` and `addrlen` must stay
    /// valid until completion; `addrlen` holds the buffer size going in and
    /// the address size coming out.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_accept_with_addr(
        &self,
        fd: RawFd,
        addr: &mut [u8],
        addrlen: &mut u32,
        flags: u32,
        user_data: u64,
    ) -> Result<()> {
        *addrlen = addr.len() as u32;
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_ACCEPT;
            sqe.fd = fd;
            sqe.addr = addr.as_mut_ptr() as u64;
            sqe.off = (addrlen as *mut u32) as u64;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Multishot accept: one completion per connection, flagged with
    /// more-coming until the stream ends.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_accept_multishot(&self, fd: RawFd, flags: u32, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_ACCEPT;
            sqe.fd = fd;
            sqe.op_flags = flags;
            sqe.ioprio = IORING_ACCEPT_MULTISHOT;
            sqe.user_data = user_data;
        })
    }

    /// Connects `fd` to the raw socket address in `addr`, which must stay
    /// valid until completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_connect(&self, fd: RawFd, addr: &[u8], user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_CONNECT;
            sqe.fd = fd;
            sqe.addr = addr.as_ptr() as u64;
            sqe.off = addr.len() as u64;
            sqe.user_data = user_data;
        })
    }

    /// Empty buffers are a no-op; see [`prep_read`](Self::prep_read).
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_send(&self, fd: RawFd, buf: &[u8], flags: u32, user_data: u64) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_SEND;
            sqe.fd = fd;
            sqe.addr = buf.as_ptr() as u64;
            sqe.len = buf.len() as u32;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Zero-copy send. Produces the usual completion plus a terminating
    /// notification entry flagged with
    /// [`IORING_CQE_F_NOTIF`](crate::IORING_CQE_F_NOTIF); the buffer must
    /// stay stable until the notification is observed.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_send_zc(&self, fd: RawFd, buf: &[u8], flags: u32, user_data: u64) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_SEND_ZC;
            sqe.fd = fd;
            sqe.addr = buf.as_ptr() as u64;
            sqe.len = buf.len() as u32;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Empty buffers are a no-op; see [`prep_read`](Self::prep_read).
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_recv(&self, fd: RawFd, buf: &mut [u8], flags: u32, user_data: u64) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_RECV;
            sqe.fd = fd;
            sqe.addr = buf.as_mut_ptr() as u64;
            sqe.len = buf.len() as u32;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Multishot recv drawing buffers from the provided-buffer group
    /// `buf_group`; each completion carries its buffer ID in the flag word.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_recv_multishot(
        &self,
        fd: RawFd,
        buf_group: u16,
        flags: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_RECV;
            sqe.fd = fd;
            sqe.flags = IOSQE_BUFFER_SELECT;
            sqe.ioprio = IORING_RECV_MULTISHOT;
            sqe.buf_index = buf_group;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// The header and everything it points to must stay valid until
    /// completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_sendmsg(&self, fd: RawFd, msg: &MsgHdr, flags: u32, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_SENDMSG;
            sqe.fd = fd;
            sqe.addr = (msg as *const MsgHdr) as u64;
            sqe.len = 1;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// The header and everything it points to must stay valid until
    /// completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_recvmsg(
        &self,
        fd: RawFd,
        msg: &mut MsgHdr,
        flags: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_RECVMSG;
            sqe.fd = fd;
            sqe.addr = (msg as *mut MsgHdr) as u64;
            sqe.len = 1;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Creates a socket; the new descriptor arrives in the completion
    /// result.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_socket(
        &self,
        domain: i32,
        socket_type: i32,
        protocol: i32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_SOCKET;
            sqe.fd = domain;
            sqe.off = socket_type as u64;
            sqe.len = protocol as u32;
            sqe.user_data = user_data;
        })
    }

    /// `how` is `SHUT_RD`, `SHUT_WR`, or `SHUT_RDWR`.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_shutdown(&self, fd: RawFd, how: i32, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_SHUTDOWN;
            sqe.fd = fd;
            sqe.len = how as u32;
            sqe.user_data = user_data;
        })
    }

    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_close(&self, fd: RawFd, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_CLOSE;
            sqe.fd = fd;
            sqe.user_data = user_data;
        })
    }

    /// Closes a registered-file slot instead of a descriptor.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_close_direct(&self, file_index: u32, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_CLOSE;
            // The file_index slot encodes "index + 1"; zero means none.
            sqe.splice_fd_in = file_index.wrapping_add(1) as i32;
            sqe.user_data = user_data;
        })
    }

    /// The path must stay valid until completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_openat(
        &self,
        dirfd: RawFd,
        path: &CStr,
        flags: u32,
        mode: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_OPENAT;
            sqe.fd = dirfd;
            sqe.addr = path.as_ptr() as u64;
            sqe.len = mode;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// The path and the statx buffer must stay valid until completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_statx(
        &self,
        dirfd: RawFd,
        path: &CStr,
        flags: u32,
        mask: u32,
        statxbuf: &mut rustix::fs::Statx,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_STATX;
            sqe.fd = dirfd;
            sqe.addr = path.as_ptr() as u64;
            sqe.len = mask;
            sqe.off = (statxbuf as *mut rustix::fs::Statx) as u64;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Moves `len` bytes from `fd_in` to `fd_out` without a user-space
    /// copy. An offset of `u64::MAX` means the descriptor's current
    /// position.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    #[allow(clippy::similar_names)]
    pub fn prep_splice(
        &self,
        fd_in: RawFd,
        off_in: u64,
        fd_out: RawFd,
        off_out: u64,
        len: u32,
        flags: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_SPLICE;
            sqe.fd = fd_out;
            sqe.splice_fd_in = fd_in;
            sqe.len = len;
            sqe.off = off_out;
            // splice_off_in rides in the addr slot.
            sqe.addr = off_in;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Duplicates `len` bytes from `fd_in` into `fd_out`, both pipes.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_tee(
        &self,
        fd_in: RawFd,
        fd_out: RawFd,
        len: u32,
        flags: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_TEE;
            sqe.fd = fd_out;
            sqe.splice_fd_in = fd_in;
            sqe.len = len;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_fallocate(
        &self,
        fd: RawFd,
        mode: u32,
        offset: u64,
        len: u64,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_FALLOCATE;
            sqe.fd = fd;
            sqe.off = offset;
            sqe.addr = len;
            sqe.len = mode;
            sqe.user_data = user_data;
        })
    }

    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_fadvise(
        &self,
        fd: RawFd,
        offset: u64,
        len: u32,
        advice: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_FADVISE;
            sqe.fd = fd;
            sqe.off = offset;
            sqe.len = len;
            sqe.op_flags = advice;
            sqe.user_data = user_data;
        })
    }

    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_madvise(
        &self,
        addr: *mut c_void,
        len: u32,
        advice: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_MADVISE;
            sqe.fd = -1;
            sqe.addr = addr as u64;
            sqe.len = len;
            sqe.op_flags = advice;
            sqe.user_data = user_data;
        })
    }

    /// The path must stay valid until completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_unlinkat(
        &self,
        dirfd: RawFd,
        path: &CStr,
        flags: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_UNLINKAT;
            sqe.fd = dirfd;
            sqe.addr = path.as_ptr() as u64;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Both paths must stay valid until completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_renameat(
        &self,
        olddirfd: RawFd,
        oldpath: &CStr,
        newdirfd: RawFd,
        newpath: &CStr,
        flags: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_RENAMEAT;
            sqe.fd = olddirfd;
            sqe.addr = oldpath.as_ptr() as u64;
            sqe.off = newpath.as_ptr() as u64;
            sqe.len = newdirfd as u32;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// The path must stay valid until completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_mkdirat(
        &self,
        dirfd: RawFd,
        path: &CStr,
        mode: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_MKDIRAT;
            sqe.fd = dirfd;
            sqe.addr = path.as_ptr() as u64;
            sqe.len = mode;
            sqe.user_data = user_data;
        })
    }

    /// Both paths must stay valid until completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_symlinkat(
        &self,
        target: &CStr,
        newdirfd: RawFd,
        linkpath: &CStr,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_SYMLINKAT;
            sqe.fd = newdirfd;
            sqe.addr = target.as_ptr() as u64;
            sqe.off = linkpath.as_ptr() as u64;
            sqe.user_data = user_data;
        })
    }

    /// Both paths must stay valid until completion.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_linkat(
        &self,
        olddirfd: RawFd,
        oldpath: &CStr,
        newdirfd: RawFd,
        newpath: &CStr,
        flags: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_LINKAT;
            sqe.fd = olddirfd;
            sqe.addr = oldpath.as_ptr() as u64;
            sqe.off = newpath.as_ptr() as u64;
            sqe.len = newdirfd as u32;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }

    /// Hands `nbufs` buffers of `len` bytes each, starting at `addr`, to
    /// the kernel as group `bgid` with IDs starting at `bid`. The memory
    /// must stay valid until the buffers are consumed or removed.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_provide_buffers(
        &self,
        addr: *mut c_void,
        len: u32,
        nbufs: u32,
        bgid: u16,
        bid: u16,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_PROVIDE_BUFFERS;
            sqe.fd = nbufs as i32;
            sqe.addr = addr as u64;
            sqe.len = len;
            sqe.off = u64::from(bid);
            sqe.buf_index = bgid;
            sqe.user_data = user_data;
        })
    }

    /// Takes back up to `nbufs` unconsumed buffers from group `bgid`.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_remove_buffers(&self, nbufs: u32, bgid: u16, user_data: u64) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_REMOVE_BUFFERS;
            sqe.fd = nbufs as i32;
            sqe.buf_index = bgid;
            sqe.user_data = user_data;
        })
    }

    /// Posts a completion with result `len` and token `data` onto another
    /// ring identified by `target_fd`.
    ///
    /// # Errors
    /// [`QueueFull`](crate::Error::QueueFull) when no entry is free.
    pub fn prep_msg_ring(
        &self,
        target_fd: RawFd,
        len: u32,
        data: u64,
        flags: u32,
        user_data: u64,
    ) -> Result<()> {
        self.prep_sqe(|sqe| {
            sqe.opcode = IORING_OP_MSG_RING;
            sqe.fd = target_fd;
            sqe.len = len;
            sqe.off = data;
            sqe.op_flags = flags;
            sqe.user_data = user_data;
        })
    }
}
