use core::ffi::c_void;
use core::mem::size_of;
use core::ptr::null;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use rustix::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use rustix::io::Errno;
use rustix::io_uring::{
    self, io_uring_files_update, io_uring_params, sigset_t, IoringEnterFlags, IoringOpFlags,
    IoringRegisterOp, IoringSetupFlags,
};

use crate::cq::{CompletionQueue, Cqe};
use crate::err::{Error, Result};
use crate::mmap::RingMapping;
use crate::sq::SubmissionQueue;
use crate::{
    io_uring_cqe, io_uring_getevents_arg, io_uring_sqe, Iovec, Timespec, IORING_ENTER_EXT_ARG,
    IORING_ENTER_GETEVENTS, IORING_ENTER_SQ_WAKEUP, IORING_FEAT_CQE_SKIP,
    IORING_FEAT_CUR_PERSONALITY, IORING_FEAT_EXT_ARG, IORING_FEAT_FAST_POLL,
    IORING_FEAT_LINKED_FILE, IORING_FEAT_NATIVE_WORKERS, IORING_FEAT_NODROP,
    IORING_FEAT_POLL_32BITS, IORING_FEAT_REG_REG_RING, IORING_FEAT_RSRC_TAGS,
    IORING_FEAT_RW_CUR_POS, IORING_FEAT_SINGLE_MMAP, IORING_FEAT_SQPOLL_NONFIXED,
    IORING_FEAT_SUBMIT_STABLE, IORING_OFF_CQ_RING, IORING_OFF_SQES, IORING_OFF_SQ_RING,
    IORING_SETUP_CQSIZE, IORING_SETUP_COOP_TASKRUN, IORING_SETUP_DEFER_TASKRUN,
    IORING_SETUP_IOPOLL, IORING_SETUP_SINGLE_ISSUER, IORING_SETUP_SQPOLL, IORING_SETUP_SQ_AFF,
    IOSQE_ASYNC, IOSQE_IO_DRAIN, IOSQE_IO_HARDLINK, IOSQE_IO_LINK,
};

/// Poll cadence for waits that cannot push the deadline into the kernel.
const POLL_WAIT_SLICE: Duration = Duration::from_millis(10);

/// Poll cadence for cancellation-token waits.
const CANCEL_WAIT_SLICE: Duration = Duration::from_millis(100);

/// Ring setup configuration.
///
/// Each option maps onto one `IORING_SETUP_*` flag or parameter; the kernel
/// rejects combinations it does not support at [`build`](Self::build) time.
#[derive(Debug, Default, Clone)]
pub struct Builder {
    flags: u32,
    cq_entries: u32,
    sq_thread_cpu: u32,
    sq_thread_idle: u32,
}

impl Builder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Kernel-polled submission: a kernel thread watches the submission
    /// ring, eliding per-submit syscalls while it is awake.
    #[must_use]
    pub fn sqpoll(mut self) -> Self {
        self.flags |= IORING_SETUP_SQPOLL;
        self
    }

    /// Pins the poll thread to `cpu`. Implies [`sqpoll`](Self::sqpoll).
    #[must_use]
    pub fn sqpoll_cpu(mut self, cpu: u32) -> Self {
        self.flags |= IORING_SETUP_SQPOLL | IORING_SETUP_SQ_AFF;
        self.sq_thread_cpu = cpu;
        self
    }

    /// Milliseconds before an idle poll thread parks itself.
    #[must_use]
    pub fn sqpoll_idle(mut self, ms: u32) -> Self {
        self.sq_thread_idle = ms;
        self
    }

    /// Polled completions for polling-capable descriptors.
    #[must_use]
    pub fn iopoll(mut self) -> Self {
        self.flags |= IORING_SETUP_IOPOLL;
        self
    }

    /// Overrides the default completion-ring capacity.
    #[must_use]
    pub fn cq_entries(mut self, entries: u32) -> Self {
        self.flags |= IORING_SETUP_CQSIZE;
        self.cq_entries = entries;
        self
    }

    /// Declares that a single task submits to this ring.
    #[must_use]
    pub fn single_issuer(mut self) -> Self {
        self.flags |= IORING_SETUP_SINGLE_ISSUER;
        self
    }

    /// Defers task work until the next enter. Implies
    /// [`single_issuer`](Self::single_issuer).
    #[must_use]
    pub fn defer_taskrun(mut self) -> Self {
        self.flags |= IORING_SETUP_DEFER_TASKRUN | IORING_SETUP_SINGLE_ISSUER;
        self
    }

    /// Cooperative task running.
    #[must_use]
    pub fn coop_taskrun(mut self) -> Self {
        self.flags |= IORING_SETUP_COOP_TASKRUN;
        self
    }

    /// ORs arbitrary raw setup flags, for kernels newer than this crate.
    #[must_use]
    pub fn flags(mut self, raw: u32) -> Self {
        self.flags |= raw;
        self
    }

    /// Creates the ring with at least `entries` submission slots (the
    /// kernel rounds the capacity up to a power of two and may clamp it).
    ///
    /// # Errors
    /// Fails when `entries` is zero, when setup is rejected, or when a ring
    /// region cannot be mapped. Regions already mapped are unwound.
    pub fn build(&self, entries: u32) -> Result<Ring> {
        Ring::with_options(entries, self)
    }
}

/// Cooperative cancellation flag for
/// [`wait_cqe_cancelable`](Ring::wait_cqe_cancelable).
///
/// Clones share the flag, so one clone can be handed to another thread and
/// fired from there.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

const PROBE_OPS: usize = 128;

/// Kernel operation-support table, filled by [`Ring::probe`].
#[repr(C)]
#[derive(Debug)]
pub struct Probe {
    probe: io_uring::io_uring_probe,
    ops: [io_uring::io_uring_probe_op; PROBE_OPS],
    features: u32,
}

impl Probe {
    fn new(features: u32) -> Self {
        Self {
            probe: io_uring::io_uring_probe::default(),
            ops: [io_uring::io_uring_probe_op::default(); PROBE_OPS],
            features,
        }
    }

    fn ops_slice(&self) -> &[io_uring::io_uring_probe_op] {
        &self.ops[..(self.probe.ops_len as usize).min(PROBE_OPS)]
    }

    /// Highest opcode index the kernel knows about.
    #[must_use]
    pub fn last_op(&self) -> u8 {
        self.probe.last_op as u8
    }

    /// True when the kernel advertises support for `opcode`.
    #[must_use]
    pub fn supports(&self, opcode: u8) -> bool {
        if opcode > self.last_op() {
            return false;
        }
        self.ops_slice()
            .iter()
            .any(|op| op.op as u8 == opcode && op.flags.contains(IoringOpFlags::SUPPORTED))
    }

    /// Feature bits retained from ring setup.
    #[must_use]
    pub fn features(&self) -> u32 {
        self.features
    }

    #[must_use]
    pub fn has_feature(&self, feature: u32) -> bool {
        self.features & feature != 0
    }
}

/// An `io_uring` instance: the ring descriptor, the three shared-memory
/// mappings, and the typed queue views into them.
///
/// Submission-path calls (`prep_*`, [`submit`](Self::submit)) are serialized
/// by an internal producer lock and may be made from any thread.
/// Completion-path calls take no lock; concurrent consumers must be
/// serialized by the application.
pub struct Ring {
    fd: Option<OwnedFd>,
    features: u32,
    setup_flags: u32,
    sq_mmap: Option<RingMapping>,
    cq_mmap: Option<RingMapping>,
    sqe_mmap: Option<RingMapping>,
    sq: SubmissionQueue,
    cq: CompletionQueue,
    closed: AtomicBool,
}

impl Ring {
    /// Creates a ring with default options. See [`Builder::build`].
    ///
    /// # Errors
    /// See [`Builder::build`].
    pub fn new(entries: u32) -> Result<Self> {
        Builder::new().build(entries)
    }

    #[must_use]
    pub fn builder() -> Builder {
        Builder::new()
    }

    fn with_options(entries: u32, opts: &Builder) -> Result<Self> {
        if entries == 0 {
            return Err(Error::Kernel(Errno::INVAL));
        }

        let mut params = io_uring_params::default();
        params.flags = IoringSetupFlags::from_bits_retain(opts.flags);
        params.sq_thread_cpu = opts.sq_thread_cpu;
        params.sq_thread_idle = opts.sq_thread_idle;
        if opts.flags & IORING_SETUP_CQSIZE != 0 {
            params.cq_entries = opts.cq_entries;
        }

        let fd = io_uring::io_uring_setup(entries, &mut params).map_err(Error::from)?;

        Self::map_rings(fd, &params)
    }

    /// Maps the submission ring, completion ring, and entry array, then
    /// resolves the typed queue views. On any failure the regions mapped so
    /// far unwind in reverse order and the descriptor closes.
    fn map_rings(fd: OwnedFd, params: &io_uring_params) -> Result<Self> {
        let features = params.features.bits();
        let setup_flags = params.flags.bits();

        let sq_ring_size =
            params.sq_off.array as usize + params.sq_entries as usize * size_of::<u32>();
        let cq_ring_size =
            params.cq_off.cqes as usize + params.cq_entries as usize * size_of::<io_uring_cqe>();

        // With the single-mmap feature the completion ring lives inside the
        // submission mapping; map the larger of the two once.
        let single_mmap = features & IORING_FEAT_SINGLE_MMAP != 0;
        let sq_map_size = if single_mmap {
            sq_ring_size.max(cq_ring_size)
        } else {
            sq_ring_size
        };

        let sq_mmap = RingMapping::new(fd.as_fd(), IORING_OFF_SQ_RING, sq_map_size)?;
        let cq_mmap = if single_mmap {
            None
        } else {
            Some(RingMapping::new(fd.as_fd(), IORING_OFF_CQ_RING, cq_ring_size)?)
        };

        let sqe_size = params.sq_entries as usize * size_of::<io_uring_sqe>();
        let sqe_mmap = RingMapping::new(fd.as_fd(), IORING_OFF_SQES, sqe_size)?;

        // SAFETY: the regions were just mapped with the sizes the kernel
        // reported and stay alive inside the returned ring.
        let sq = unsafe {
            SubmissionQueue::new(
                sq_mmap.as_ptr().cast::<u8>(),
                &params.sq_off,
                sqe_mmap.as_ptr().cast::<io_uring_sqe>(),
            )
        };
        let cq_base = cq_mmap.as_ref().map_or_else(|| sq_mmap.as_ptr(), RingMapping::as_ptr);
        // SAFETY: as above; with single-mmap the CQ offsets index into the
        // shared mapping.
        let cq = unsafe { CompletionQueue::new(cq_base.cast::<u8>(), &params.cq_off) };

        Ok(Self {
            fd: Some(fd),
            features,
            setup_flags,
            sq_mmap: Some(sq_mmap),
            cq_mmap,
            sqe_mmap: Some(sqe_mmap),
            sq,
            cq,
            closed: AtomicBool::new(false),
        })
    }

    /// Closes the ring: unmaps the regions in reverse mapping order, then
    /// closes the descriptor. Idempotent; every later operation fails with
    /// [`Error::RingClosed`].
    pub fn close(&mut self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.sqe_mmap.take();
        self.cq_mmap.take();
        self.sq_mmap.take();
        self.fd.take();
        Ok(())
    }

    fn ring_fd(&self) -> Result<BorrowedFd<'_>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::RingClosed);
        }
        self.fd.as_ref().map(AsFd::as_fd).ok_or(Error::RingClosed)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::RingClosed);
        }
        Ok(())
    }

    /// Raw ring descriptor, or -1 after close.
    #[must_use]
    pub fn fd(&self) -> RawFd {
        self.fd.as_ref().map_or(-1, AsRawFd::as_raw_fd)
    }

    // Submission path ------------------------------------------------------

    /// Reserves an entry under the producer lock, lets `fill` populate it,
    /// and releases the lock. Shared by every `prep_*` helper.
    pub(crate) fn prep_sqe<F>(&self, fill: F) -> Result<()>
    where
        F: FnOnce(&mut io_uring_sqe),
    {
        self.ensure_open()?;
        let mut prod = self.sq.lock();
        let Some(sqe) = self.sq.reserve(&mut prod) else {
            return Err(Error::QueueFull);
        };
        fill(sqe);
        Ok(())
    }

    /// ORs `flags` into the per-entry flag byte of the most recently
    /// reserved entry. No-op when nothing is pending or the ring is closed.
    pub fn set_sqe_flags(&self, flags: u8) {
        if self.ensure_open().is_err() {
            return;
        }
        let prod = self.sq.lock();
        self.sq.or_last_flags(&prod, flags);
    }

    /// Chains the most recent entry to the next one submitted.
    pub fn set_sqe_link(&self) {
        self.set_sqe_flags(IOSQE_IO_LINK);
    }

    /// Chains the most recent entry to the next one, surviving errors.
    pub fn set_sqe_hardlink(&self) {
        self.set_sqe_flags(IOSQE_IO_HARDLINK);
    }

    /// Forces async execution for the most recent entry.
    pub fn set_sqe_async(&self) {
        self.set_sqe_flags(IOSQE_ASYNC);
    }

    /// Orders the most recent entry after all prior submissions.
    pub fn set_sqe_drain(&self) {
        self.set_sqe_flags(IOSQE_IO_DRAIN);
    }

    fn needs_wakeup(&self) -> bool {
        self.setup_flags & IORING_SETUP_SQPOLL != 0 && self.sq.needs_wakeup()
    }

    /// Publishes pending entries, returning what the pending count was.
    fn publish_pending(&self) -> u32 {
        let mut prod = self.sq.lock();
        self.sq.publish(&mut prod)
    }

    /// Publishes all pending entries to the kernel and returns the number
    /// accepted.
    ///
    /// In kernel-polled mode the syscall is elided unless the poll thread
    /// has parked and needs a wakeup; the return value is then the count
    /// published.
    ///
    /// # Errors
    /// Returns [`Error::RingClosed`] after close, or the enter failure. The
    /// tail stays published either way; the kernel consumes the entries on
    /// its own schedule.
    pub fn submit(&self) -> Result<usize> {
        self.ensure_open()?;

        let submitted = self.publish_pending();
        if submitted == 0 {
            return Ok(0);
        }

        let mut flags = 0;
        if self.needs_wakeup() {
            flags |= IORING_ENTER_SQ_WAKEUP;
        }
        if self.setup_flags & IORING_SETUP_SQPOLL != 0 && flags == 0 {
            return Ok(submitted as usize);
        }

        self.enter(submitted, 0, flags, None)
    }

    /// Publishes pending entries and waits for at least `wait_for`
    /// completions. Always enters the kernel, kernel-polled mode included.
    ///
    /// # Errors
    /// Returns [`Error::RingClosed`] after close, [`Error::Interrupted`] on
    /// a signal, or the enter failure.
    pub fn submit_and_wait(&self, wait_for: u32) -> Result<usize> {
        self.ensure_open()?;

        let submitted = self.publish_pending();

        let mut flags = IORING_ENTER_GETEVENTS;
        if self.needs_wakeup() {
            flags |= IORING_ENTER_SQ_WAKEUP;
        }

        self.enter(submitted, wait_for, flags, None)
    }

    /// Raw enter: submit `to_submit` published entries and/or wait for
    /// `min_complete` completions, with an optional signal mask applied for
    /// the duration of the syscall.
    ///
    /// # Errors
    /// Returns [`Error::RingClosed`] after close or the mapped kernel error.
    pub fn enter(
        &self,
        to_submit: u32,
        min_complete: u32,
        flags: u32,
        sig: Option<&sigset_t>,
    ) -> Result<usize> {
        let fd = self.ring_fd()?;
        let (arg, size) = sig.map_or((null::<c_void>(), 0), |s| {
            ((s as *const sigset_t).cast::<c_void>(), size_of::<sigset_t>())
        });

        // SAFETY: the descriptor is a live ring and arg/size describe either
        // nothing or a sigset borrowed for the call.
        let n = unsafe {
            io_uring::io_uring_enter(
                fd,
                to_submit,
                min_complete,
                IoringEnterFlags::from_bits_retain(flags),
                arg,
                size,
            )
        }?;

        Ok(n as usize)
    }

    fn enter_timed(&self, to_submit: u32, min_complete: u32, ts: &Timespec) -> Result<usize> {
        let fd = self.ring_fd()?;
        let arg = io_uring_getevents_arg {
            sigmask: 0,
            sigmask_sz: 0,
            pad: 0,
            ts: (ts as *const Timespec) as u64,
        };

        // SAFETY: arg points at a live getevents struct for the duration of
        // the call and the flag tells the kernel to interpret it as such.
        let n = unsafe {
            io_uring::io_uring_enter(
                fd,
                to_submit,
                min_complete,
                IoringEnterFlags::from_bits_retain(IORING_ENTER_GETEVENTS | IORING_ENTER_EXT_ARG),
                (&arg as *const io_uring_getevents_arg).cast::<c_void>(),
                size_of::<io_uring_getevents_arg>(),
            )
        }?;

        Ok(n as usize)
    }

    // Completion path ------------------------------------------------------

    /// Copies the next completion without consuming it, or `None` when the
    /// queue is empty or the ring is closed. Consume with
    /// [`seen_cqe`](Self::seen_cqe) after processing.
    #[must_use]
    pub fn peek_cqe(&self) -> Option<Cqe> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        self.cq.peek()
    }

    /// Marks the completion returned by the last peek as consumed.
    pub fn seen_cqe(&self) {
        self.seen_cqes(1);
    }

    /// Marks `count` completions as consumed. `count` must not exceed
    /// [`cq_ready`](Self::cq_ready).
    pub fn seen_cqes(&self, count: u32) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        self.cq.advance(count);
    }

    /// Visits every available completion in order, stopping early when `f`
    /// returns `false`; consumed entries are released. Returns the number
    /// consumed.
    pub fn for_each_cqe<F>(&self, f: F) -> usize
    where
        F: FnMut(Cqe) -> bool,
    {
        if self.closed.load(Ordering::Acquire) {
            return 0;
        }
        self.cq.for_each(f)
    }

    /// Releases every available completion without inspection and returns
    /// the count drained.
    pub fn drain_cqes(&self) -> usize {
        if self.closed.load(Ordering::Acquire) {
            return 0;
        }
        self.cq.drain()
    }

    /// Waits for one completion, publishing pending submissions first if
    /// the queue is empty. The entry is not consumed.
    ///
    /// # Errors
    /// Returns [`Error::RingClosed`] after close, [`Error::Interrupted`] on
    /// a signal, or `Kernel(EAGAIN)` on a spurious wake.
    pub fn wait_cqe(&self) -> Result<Cqe> {
        self.ensure_open()?;

        if let Some(cqe) = self.cq.peek() {
            return Ok(cqe);
        }

        self.submit_and_wait(1)?;

        self.cq.peek().ok_or(Error::Kernel(Errno::AGAIN))
    }

    /// Waits for one completion with a deadline.
    ///
    /// With the extended-argument feature this is a single syscall and the
    /// kernel sleeps on the deadline. Without it the wait degrades to a
    /// bounded poll loop with a capped per-iteration sleep; interruptions
    /// are swallowed and polling continues.
    ///
    /// # Errors
    /// Returns [`Error::TimeExpired`] when the deadline passes without a
    /// completion, [`Error::RingClosed`] after close, or the enter failure.
    pub fn wait_cqe_timeout(&self, timeout: Duration) -> Result<Cqe> {
        self.ensure_open()?;

        if let Some(cqe) = self.cq.peek() {
            return Ok(cqe);
        }

        if !self.has_ext_arg() {
            return self.wait_cqe_timeout_poll(timeout);
        }

        let ts = Timespec::from(timeout);
        let submitted = self.publish_pending();
        match self.enter_timed(submitted, 1, &ts) {
            Ok(_) | Err(Error::TimeExpired) => {}
            Err(e) => return Err(e),
        }

        self.cq.peek().ok_or(Error::TimeExpired)
    }

    /// Deadline wait for kernels without the extended argument: publish
    /// once, then peek, reap, and nap until the deadline passes.
    fn wait_cqe_timeout_poll(&self, timeout: Duration) -> Result<Cqe> {
        let deadline = Instant::now() + timeout;

        match self.submit() {
            Ok(_) | Err(Error::Interrupted) => {}
            Err(e) => return Err(e),
        }

        loop {
            if let Some(cqe) = self.cq.peek() {
                return Ok(cqe);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::TimeExpired);
            }

            // Non-blocking reap so completions held back by task work get
            // flushed.
            match self.enter(0, 0, IORING_ENTER_GETEVENTS, None) {
                Ok(_) | Err(Error::Interrupted) => {}
                Err(e) => return Err(e),
            }
            if let Some(cqe) = self.cq.peek() {
                return Ok(cqe);
            }

            std::thread::sleep((deadline - now).min(POLL_WAIT_SLICE));
        }
    }

    /// Waits for one completion until `token` fires, polling in short timed
    /// slices.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] once the token fires,
    /// [`Error::RingClosed`] after close, or the wait failure.
    pub fn wait_cqe_cancelable(&self, token: &CancelToken) -> Result<Cqe> {
        self.ensure_open()?;

        if let Some(cqe) = self.cq.peek() {
            return Ok(cqe);
        }

        loop {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }

            match self.wait_cqe_timeout(CANCEL_WAIT_SLICE) {
                Err(Error::TimeExpired | Error::Interrupted) => {}
                other => return other,
            }
        }
    }

    // Observability --------------------------------------------------------

    /// Feature bitset reported by the kernel at setup.
    #[must_use]
    pub fn features(&self) -> u32 {
        self.features
    }

    #[must_use]
    pub fn has_feature(&self, feature: u32) -> bool {
        self.features & feature != 0
    }

    /// Setup flags the ring was created with.
    #[must_use]
    pub fn setup_flags(&self) -> u32 {
        self.setup_flags
    }

    #[must_use]
    pub fn sq_entries(&self) -> u32 {
        self.sq.ring_entries()
    }

    #[must_use]
    pub fn cq_entries(&self) -> u32 {
        self.cq.ring_entries()
    }

    /// Kernel-visible free submission slots.
    #[must_use]
    pub fn sq_space(&self) -> u32 {
        if self.closed.load(Ordering::Acquire) {
            return 0;
        }
        self.sq.space()
    }

    /// Entries reserved but not yet published.
    #[must_use]
    pub fn sq_ready(&self) -> u32 {
        if self.closed.load(Ordering::Acquire) {
            return 0;
        }
        self.sq.pending()
    }

    /// Submissions the kernel dropped for malformed indices.
    #[must_use]
    pub fn sq_dropped(&self) -> u32 {
        if self.closed.load(Ordering::Acquire) {
            return 0;
        }
        self.sq.dropped()
    }

    /// Completions available for consumption.
    #[must_use]
    pub fn cq_ready(&self) -> u32 {
        if self.closed.load(Ordering::Acquire) {
            return 0;
        }
        self.cq.ready()
    }

    /// Completions dropped to overflow. Informational; never raised as an
    /// error.
    #[must_use]
    pub fn cq_overflow(&self) -> u32 {
        if self.closed.load(Ordering::Acquire) {
            return 0;
        }
        self.cq.overflow()
    }

    #[must_use]
    pub fn has_single_mmap(&self) -> bool {
        self.has_feature(IORING_FEAT_SINGLE_MMAP)
    }

    #[must_use]
    pub fn has_nodrop(&self) -> bool {
        self.has_feature(IORING_FEAT_NODROP)
    }

    #[must_use]
    pub fn has_submit_stable(&self) -> bool {
        self.has_feature(IORING_FEAT_SUBMIT_STABLE)
    }

    #[must_use]
    pub fn has_rw_cur_pos(&self) -> bool {
        self.has_feature(IORING_FEAT_RW_CUR_POS)
    }

    #[must_use]
    pub fn has_cur_personality(&self) -> bool {
        self.has_feature(IORING_FEAT_CUR_PERSONALITY)
    }

    #[must_use]
    pub fn has_fast_poll(&self) -> bool {
        self.has_feature(IORING_FEAT_FAST_POLL)
    }

    #[must_use]
    pub fn has_poll_32bits(&self) -> bool {
        self.has_feature(IORING_FEAT_POLL_32BITS)
    }

    #[must_use]
    pub fn has_sqpoll_nonfixed(&self) -> bool {
        self.has_feature(IORING_FEAT_SQPOLL_NONFIXED)
    }

    #[must_use]
    pub fn has_ext_arg(&self) -> bool {
        self.has_feature(IORING_FEAT_EXT_ARG)
    }

    #[must_use]
    pub fn has_native_workers(&self) -> bool {
        self.has_feature(IORING_FEAT_NATIVE_WORKERS)
    }

    #[must_use]
    pub fn has_rsrc_tags(&self) -> bool {
        self.has_feature(IORING_FEAT_RSRC_TAGS)
    }

    #[must_use]
    pub fn has_cqe_skip(&self) -> bool {
        self.has_feature(IORING_FEAT_CQE_SKIP)
    }

    #[must_use]
    pub fn has_linked_file(&self) -> bool {
        self.has_feature(IORING_FEAT_LINKED_FILE)
    }

    #[must_use]
    pub fn has_reg_reg_ring(&self) -> bool {
        self.has_feature(IORING_FEAT_REG_REG_RING)
    }

    // Registration ---------------------------------------------------------

    fn register(&self, opcode: IoringRegisterOp, arg: *const c_void, nr_args: u32) -> Result<u32> {
        let fd = self.ring_fd()?;
        // SAFETY: register only reads `arg` for the duration of the syscall
        // and does not retain it (probe results are written into the
        // caller's buffer before returning).
        unsafe { io_uring::io_uring_register(fd, opcode, arg, nr_args) }.map_err(Error::from)
    }

    /// Registers fixed buffers for `read_fixed`/`write_fixed`. The memory
    /// must stay valid and stable until unregistered.
    ///
    /// # Errors
    /// Rejects an empty set locally with `Kernel(EINVAL)`; otherwise the
    /// register failure.
    pub fn register_buffers(&self, iovecs: &[Iovec]) -> Result<()> {
        self.ensure_open()?;
        if iovecs.is_empty() {
            return Err(Error::Kernel(Errno::INVAL));
        }

        self.register(
            IoringRegisterOp::RegisterBuffers,
            iovecs.as_ptr().cast::<c_void>(),
            iovecs.len() as u32,
        )?;
        Ok(())
    }

    /// # Errors
    /// Returns the register failure.
    pub fn unregister_buffers(&self) -> Result<()> {
        self.register(IoringRegisterOp::UnregisterBuffers, null(), 0)?;
        Ok(())
    }

    /// Registers fixed file descriptors, referenced by index with
    /// [`IOSQE_FIXED_FILE`](crate::IOSQE_FIXED_FILE).
    ///
    /// # Errors
    /// Rejects an empty set locally with `Kernel(EINVAL)`; otherwise the
    /// register failure.
    pub fn register_files(&self, fds: &[RawFd]) -> Result<()> {
        self.ensure_open()?;
        if fds.is_empty() {
            return Err(Error::Kernel(Errno::INVAL));
        }

        self.register(
            IoringRegisterOp::RegisterFiles,
            fds.as_ptr().cast::<c_void>(),
            fds.len() as u32,
        )?;
        Ok(())
    }

    /// # Errors
    /// Returns the register failure.
    pub fn unregister_files(&self) -> Result<()> {
        self.register(IoringRegisterOp::UnregisterFiles, null(), 0)?;
        Ok(())
    }

    /// Replaces a range of the registered file table starting at `offset`.
    /// An entry of -1 clears the slot.
    ///
    /// # Errors
    /// Rejects an empty set locally with `Kernel(EINVAL)`; otherwise the
    /// register failure.
    pub fn register_files_update(&self, offset: u32, fds: &[RawFd]) -> Result<()> {
        self.ensure_open()?;
        if fds.is_empty() {
            return Err(Error::Kernel(Errno::INVAL));
        }

        let update = io_uring_files_update {
            offset,
            resv: 0,
            fds: fds.as_ptr() as u64,
        };

        self.register(
            IoringRegisterOp::RegisterFilesUpdate,
            (&update as *const io_uring_files_update).cast::<c_void>(),
            fds.len() as u32,
        )?;
        Ok(())
    }

    /// Registers an eventfd signalled on every completion.
    ///
    /// # Errors
    /// Returns the register failure.
    pub fn register_eventfd(&self, eventfd: RawFd) -> Result<()> {
        self.register(
            IoringRegisterOp::RegisterEventfd,
            (&eventfd as *const RawFd).cast::<c_void>(),
            1,
        )?;
        Ok(())
    }

    /// Registers an eventfd signalled only for completions that finished
    /// asynchronously.
    ///
    /// # Errors
    /// Returns the register failure.
    pub fn register_eventfd_async(&self, eventfd: RawFd) -> Result<()> {
        self.register(
            IoringRegisterOp::RegisterEventfdAsync,
            (&eventfd as *const RawFd).cast::<c_void>(),
            1,
        )?;
        Ok(())
    }

    /// # Errors
    /// Returns the register failure.
    pub fn unregister_eventfd(&self) -> Result<()> {
        self.register(IoringRegisterOp::UnregisterEventfd, null(), 0)?;
        Ok(())
    }

    /// Queries the kernel's operation-support table.
    ///
    /// # Errors
    /// Returns [`Error::Unsupported`] when the kernel predates the probe
    /// registration op, or the register failure.
    pub fn probe(&self) -> Result<Probe> {
        let mut probe = Probe::new(self.features);
        let arg = (&mut probe as *mut Probe).cast::<c_void>();

        match self.register(IoringRegisterOp::RegisterProbe, arg, PROBE_OPS as u32) {
            Ok(_) => Ok(probe),
            Err(Error::Kernel(errno)) if errno == Errno::INVAL || errno == Errno::NOSYS => {
                Err(Error::Unsupported)
            }
            Err(e) => Err(e),
        }
    }

    /// True when the probe reports `opcode` as supported; false when the
    /// probe itself is unavailable.
    #[must_use]
    pub fn opcode_supported(&self, opcode: u8) -> bool {
        self.probe().is_ok_and(|probe| probe.supports(opcode))
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
