use core::ffi::c_void;
use core::time::Duration;
use std::collections::HashSet;
use std::ffi::CString;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::Instant;

use pretty_assertions::assert_eq;
use rustix::event::{eventfd, EventfdFlags};
use rustix::fd::AsRawFd;
use rustix::io::Errno;
use tempfile::NamedTempFile;

use crate::{
    cqe_result, CancelToken, Cqe, Error, Iovec, Ring, Timespec, IORING_CQE_F_BUFFER,
    IORING_CQE_F_MORE, IORING_CQE_F_NOTIF, IORING_OP_NOP, IORING_OP_READ, IORING_OP_READ_FIXED,
    IORING_OP_WRITE, IORING_TIMEOUT_ABS,
};

/// Rings cannot be created under kernels without io_uring or under seccomp
/// policies that block it; those environments skip the kernel-side tests.
fn ring_or_skip(entries: u32) -> Option<Ring> {
    match Ring::new(entries) {
        Ok(ring) => Some(ring),
        Err(e) => {
            eprintln!("skipping: io_uring unavailable ({e:?})");
            None
        }
    }
}

fn errno_res(errno: Errno) -> i32 {
    -errno.raw_os_error()
}

#[test]
fn zero_entries_rejected() {
    assert_eq!(Ring::new(0).err(), Some(Error::Kernel(Errno::INVAL)));
}

#[test]
fn ring_creation_geometry() {
    let Some(ring) = ring_or_skip(64) else { return };

    assert!(ring.fd() >= 0);
    assert!(ring.sq_entries() >= 64);
    assert!(ring.cq_entries() >= ring.sq_entries());
    // Mask is capacity - 1; capacity is always a power of two.
    assert!(ring.sq_entries().is_power_of_two());
    assert_eq!(ring.sq_space(), ring.sq_entries());
    assert_eq!(ring.sq_ready(), 0);
    assert_eq!(ring.cq_ready(), 0);
}

#[test]
fn non_power_of_two_rounds_up() {
    let Some(ring) = ring_or_skip(100) else { return };
    assert!(ring.sq_entries() >= 100);
    assert!(ring.sq_entries().is_power_of_two());
}

#[test]
fn close_is_idempotent_and_final() {
    let Some(mut ring) = ring_or_skip(8) else { return };

    assert_eq!(ring.close(), Ok(()));
    assert_eq!(ring.close(), Ok(()));

    assert_eq!(ring.prep_nop(1), Err(Error::RingClosed));
    assert_eq!(ring.submit(), Err(Error::RingClosed));
    assert_eq!(ring.submit_and_wait(1), Err(Error::RingClosed));
    assert_eq!(ring.wait_cqe(), Err(Error::RingClosed));
    assert_eq!(
        ring.wait_cqe_timeout(Duration::from_millis(1)),
        Err(Error::RingClosed)
    );
    assert_eq!(ring.register_buffers(&[]), Err(Error::RingClosed));
    assert_eq!(ring.probe().err(), Some(Error::RingClosed));
    assert_eq!(ring.peek_cqe(), None);
    assert_eq!(ring.sq_space(), 0);
    assert_eq!(ring.drain_cqes(), 0);
    assert_eq!(ring.fd(), -1);
}

#[test]
fn nop_batch_completes_with_tokens() {
    let Some(ring) = ring_or_skip(4) else { return };

    for token in 1..=4u64 {
        ring.prep_nop(token).expect("prep_nop");
    }
    assert_eq!(ring.sq_ready(), 4);

    let submitted = ring.submit().expect("submit");
    assert_eq!(submitted, 4);
    assert_eq!(ring.sq_ready(), 0);

    let mut seen = HashSet::new();
    for _ in 0..4 {
        let cqe = ring.wait_cqe().expect("wait_cqe");
        assert_eq!(cqe.res, 0);
        seen.insert(cqe.user_data);
        ring.seen_cqe();
    }
    assert_eq!(seen, HashSet::from([1, 2, 3, 4]));
}

#[test]
fn write_then_read_roundtrip() {
    let Some(ring) = ring_or_skip(8) else { return };

    let file = NamedTempFile::new().expect("temp file");
    let fd = file.as_raw_fd();

    let payload = b"Hello, ring!";
    ring.prep_write(fd, payload, 0, 1).expect("prep_write");
    ring.submit_and_wait(1).expect("submit_and_wait");

    let cqe = ring.wait_cqe().expect("wait_cqe");
    assert_eq!(cqe.user_data, 1);
    assert_eq!(cqe.res, payload.len() as i32);
    ring.seen_cqe();

    let mut buf = [0u8; 12];
    ring.prep_read(fd, &mut buf, 0, 2).expect("prep_read");
    ring.submit_and_wait(1).expect("submit_and_wait");

    let cqe = ring.wait_cqe().expect("wait_cqe");
    assert_eq!(cqe.user_data, 2);
    assert_eq!(cqe.res, payload.len() as i32);
    ring.seen_cqe();

    assert_eq!(&buf, payload);
}

#[test]
fn timeout_fires_with_etime() {
    let Some(ring) = ring_or_skip(4) else { return };

    let ts = Timespec::new(0, 100_000_000);
    ring.prep_timeout(&ts, 0, 0, 1).expect("prep_timeout");

    let start = Instant::now();
    ring.submit().expect("submit");

    let cqe = ring.wait_cqe().expect("wait_cqe");
    let elapsed = start.elapsed();
    ring.seen_cqe();

    assert_eq!(cqe.user_data, 1);
    assert_eq!(cqe.res, errno_res(Errno::TIME));
    assert!(
        elapsed >= Duration::from_millis(50),
        "timeout returned after {elapsed:?}"
    );
}

#[test]
fn cancel_reaps_target_and_itself() {
    let Some(ring) = ring_or_skip(8) else { return };

    let ts = Timespec::new(10, 0);
    ring.prep_timeout(&ts, 0, 0, 100).expect("prep_timeout");
    ring.submit().expect("submit timeout");

    ring.prep_cancel(100, 0, 200).expect("prep_cancel");
    ring.submit().expect("submit cancel");

    let mut saw_timeout = false;
    let mut saw_cancel = false;
    for _ in 0..2 {
        let cqe = ring.wait_cqe().expect("wait_cqe");
        ring.seen_cqe();
        match cqe.user_data {
            100 => {
                assert_eq!(cqe.res, errno_res(Errno::CANCELED));
                saw_timeout = true;
            }
            200 => {
                assert_eq!(cqe.res, 0);
                saw_cancel = true;
            }
            other => panic!("unexpected token {other}"),
        }
    }
    assert!(saw_timeout);
    assert!(saw_cancel);
}

#[test]
fn queue_full_then_drain_then_reuse() {
    let Some(ring) = ring_or_skip(4) else { return };
    let capacity = ring.sq_entries();

    for token in 0..u64::from(capacity) {
        ring.prep_nop(token).expect("prep within capacity");
    }
    assert_eq!(ring.prep_nop(999), Err(Error::QueueFull));

    ring.submit().expect("submit");
    for _ in 0..capacity {
        ring.wait_cqe().expect("wait_cqe");
        ring.seen_cqe();
    }

    ring.prep_nop(1000).expect("prep after drain");
}

#[test]
fn fixed_buffer_roundtrip() {
    let Some(ring) = ring_or_skip(8) else { return };

    let file = NamedTempFile::new().expect("temp file");
    let fd = file.as_raw_fd();

    let mut buf0 = vec![0u8; 4096];
    let mut buf1 = vec![0u8; 4096];
    let payload = b"fixed buffer payload";
    buf0[..payload.len()].copy_from_slice(payload);

    let iovecs = [Iovec::from_buf(&mut buf0), Iovec::from_buf(&mut buf1)];
    if let Err(e) = ring.register_buffers(&iovecs) {
        eprintln!("skipping: register_buffers unavailable ({e:?})");
        return;
    }

    ring.prep_write_fixed(fd, &buf0[..payload.len()], 0, 0, 1)
        .expect("prep_write_fixed");
    ring.submit_and_wait(1).expect("submit_and_wait");
    let cqe = ring.wait_cqe().expect("wait_cqe");
    assert_eq!(cqe.res, payload.len() as i32);
    ring.seen_cqe();

    ring.prep_read_fixed(fd, &mut buf1[..payload.len()], 0, 1, 2)
        .expect("prep_read_fixed");
    ring.submit_and_wait(1).expect("submit_and_wait");
    let cqe = ring.wait_cqe().expect("wait_cqe");
    assert_eq!(cqe.res, payload.len() as i32);
    ring.seen_cqe();

    assert_eq!(&buf1[..payload.len()], payload);

    ring.unregister_buffers().expect("unregister_buffers");
    // The ring is back in its pre-registration state.
    ring.register_buffers(&iovecs).expect("re-register");
    ring.unregister_buffers().expect("unregister again");
}

#[test]
fn empty_buffer_is_a_noop() {
    let Some(ring) = ring_or_skip(4) else { return };

    ring.prep_read(0, &mut [], 0, 1).expect("empty read");
    ring.prep_write(0, &[], 0, 2).expect("empty write");
    ring.prep_send(0, &[], 0, 3).expect("empty send");
    ring.prep_readv(0, &[], 0, 4).expect("empty readv");

    assert_eq!(ring.sq_ready(), 0);
    assert_eq!(ring.submit().expect("submit"), 0);
    assert_eq!(ring.cq_ready(), 0);
}

#[test]
fn submit_and_wait_zero_matches_submit_plus_peek() {
    let Some(ring) = ring_or_skip(4) else { return };

    ring.prep_nop(7).expect("prep_nop");
    ring.submit_and_wait(0).expect("submit_and_wait(0)");

    // min=0 returns immediately, but the submission went through; a
    // subsequent peek (possibly after the kernel posts) sees the entry.
    let cqe = ring.wait_cqe().expect("wait_cqe");
    assert_eq!(cqe.user_data, 7);
    ring.seen_cqe();
}

#[test]
fn for_each_stops_early_and_advances_exactly() {
    let Some(ring) = ring_or_skip(8) else { return };

    for token in 0..5u64 {
        ring.prep_nop(token).expect("prep_nop");
    }
    ring.submit_and_wait(5).expect("submit_and_wait");

    let mut visited = Vec::new();
    let consumed = ring.for_each_cqe(|cqe| {
        visited.push(cqe.user_data);
        visited.len() < 3
    });
    assert_eq!(consumed, 3);
    assert_eq!(visited.len(), 3);
    assert_eq!(ring.cq_ready(), 2);

    let consumed = ring.for_each_cqe(|cqe| {
        assert_eq!(cqe.res, 0);
        true
    });
    assert_eq!(consumed, 2);
    assert_eq!(ring.cq_ready(), 0);
}

#[test]
fn drain_releases_without_inspection() {
    let Some(ring) = ring_or_skip(8) else { return };

    for token in 0..4u64 {
        ring.prep_nop(token).expect("prep_nop");
    }
    ring.submit_and_wait(4).expect("submit_and_wait");

    assert_eq!(ring.drain_cqes(), 4);
    assert_eq!(ring.cq_ready(), 0);
    assert_eq!(ring.drain_cqes(), 0);
}

#[test]
fn wraparound_indexing() {
    let Some(ring) = ring_or_skip(4) else { return };
    let capacity = ring.sq_entries();

    // Three full rounds push the tail well past capacity, exercising the
    // masked index on both rings.
    let mut token = 0u64;
    for _ in 0..3 {
        for _ in 0..capacity {
            ring.prep_nop(token).expect("prep_nop");
            token += 1;
        }
        ring.submit_and_wait(capacity).expect("submit_and_wait");
        assert_eq!(ring.drain_cqes(), capacity as usize);
    }
    assert_eq!(token, u64::from(capacity) * 3);
}

#[test]
fn timed_wait_zero_deadline_expires() {
    let Some(ring) = ring_or_skip(4) else { return };

    let start = Instant::now();
    let result = ring.wait_cqe_timeout(Duration::ZERO);
    assert_eq!(result, Err(Error::TimeExpired));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn timed_wait_delivers_pending_completion() {
    let Some(ring) = ring_or_skip(4) else { return };

    ring.prep_nop(42).expect("prep_nop");
    // The wait publishes pending entries itself.
    let cqe = ring
        .wait_cqe_timeout(Duration::from_secs(5))
        .expect("wait_cqe_timeout");
    assert_eq!(cqe.user_data, 42);
    ring.seen_cqe();
}

#[test]
fn cancel_token_aborts_wait() {
    let Some(ring) = ring_or_skip(4) else { return };

    let token = CancelToken::new();
    assert!(!token.is_cancelled());

    let waiter = token.clone();
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        waiter.cancel();
    });

    let result = ring.wait_cqe_cancelable(&token);
    handle.join().expect("join");
    assert_eq!(result, Err(Error::Cancelled));
    assert!(token.is_cancelled());
}

#[test]
fn cancel_token_returns_available_completion() {
    let Some(ring) = ring_or_skip(4) else { return };

    ring.prep_nop(9).expect("prep_nop");
    ring.submit_and_wait(1).expect("submit_and_wait");

    let token = CancelToken::new();
    token.cancel();
    // An already-available completion wins over the fired token.
    let cqe = ring.wait_cqe_cancelable(&token).expect("wait");
    assert_eq!(cqe.user_data, 9);
    ring.seen_cqe();
}

#[test]
fn empty_registration_sets_rejected_locally() {
    let Some(ring) = ring_or_skip(4) else { return };

    assert_eq!(ring.register_buffers(&[]), Err(Error::Kernel(Errno::INVAL)));
    assert_eq!(ring.register_files(&[]), Err(Error::Kernel(Errno::INVAL)));
    assert_eq!(
        ring.register_files_update(0, &[]),
        Err(Error::Kernel(Errno::INVAL))
    );
}

#[test]
fn register_unregister_files() {
    let Some(ring) = ring_or_skip(4) else { return };

    let f1 = NamedTempFile::new().expect("temp file");
    let f2 = NamedTempFile::new().expect("temp file");

    ring.register_files(&[f1.as_raw_fd(), f2.as_raw_fd()])
        .expect("register_files");

    match ring.register_files_update(0, &[-1]) {
        Ok(()) => {}
        Err(Error::Kernel(errno)) if errno == Errno::INVAL || errno == Errno::NOSYS => {}
        Err(e) => panic!("unexpected error: {e:?}"),
    }

    ring.unregister_files().expect("unregister_files");
}

#[test]
fn register_unregister_eventfd() {
    let Some(ring) = ring_or_skip(4) else { return };

    let efd = eventfd(0, EventfdFlags::CLOEXEC).expect("eventfd");
    ring.register_eventfd(efd.as_raw_fd()).expect("register");
    ring.unregister_eventfd().expect("unregister");

    match ring.register_eventfd_async(efd.as_raw_fd()) {
        Ok(()) => ring.unregister_eventfd().expect("unregister async"),
        Err(Error::Kernel(errno)) if errno == Errno::INVAL || errno == Errno::NOSYS => {}
        Err(e) => panic!("unexpected error: {e:?}"),
    }
}

#[test]
fn probe_reports_nop() {
    let Some(ring) = ring_or_skip(4) else { return };

    match ring.probe() {
        Ok(probe) => {
            assert!(probe.supports(IORING_OP_NOP));
            assert!(probe.supports(IORING_OP_READ));
            assert!(!probe.supports(255));
            assert!(probe.last_op() >= IORING_OP_WRITE);
            assert_eq!(probe.features(), ring.features());
            assert!(ring.opcode_supported(IORING_OP_NOP));
        }
        Err(Error::Unsupported) => {
            assert!(!ring.opcode_supported(IORING_OP_NOP));
        }
        Err(e) => panic!("unexpected error: {e:?}"),
    }
}

#[test]
fn feature_accessors_match_bitset() {
    let Some(ring) = ring_or_skip(4) else { return };

    assert_eq!(
        ring.has_single_mmap(),
        ring.has_feature(crate::IORING_FEAT_SINGLE_MMAP)
    );
    assert_eq!(ring.has_ext_arg(), ring.has_feature(crate::IORING_FEAT_EXT_ARG));
    assert_eq!(
        ring.has_fast_poll(),
        ring.has_feature(crate::IORING_FEAT_FAST_POLL)
    );
}

#[test]
fn builder_cq_size() {
    let ring = match Ring::builder().cq_entries(256).build(64) {
        Ok(ring) => ring,
        Err(e) => {
            eprintln!("skipping: io_uring unavailable ({e:?})");
            return;
        }
    };
    assert!(ring.cq_entries() >= 256);
}

#[test]
fn builder_taskrun_hints() {
    // Older kernels reject these flags; creation failure is acceptable,
    // anything else must work end to end.
    for builder in [
        Ring::builder().single_issuer(),
        Ring::builder().coop_taskrun(),
        Ring::builder().defer_taskrun(),
    ] {
        if let Ok(ring) = builder.build(8) {
            ring.prep_nop(1).expect("prep_nop");
            // DEFER_TASKRUN requires an enter to run task work, so wait.
            ring.submit_and_wait(1).expect("submit_and_wait");
            assert!(ring.cq_ready() >= 1);
            ring.seen_cqe();
        }
    }
}

#[test]
fn send_recv_over_socketpair() {
    let Some(ring) = ring_or_skip(8) else { return };

    let (left, right) = UnixStream::pair().expect("socketpair");
    let payload = b"across the ring";

    ring.prep_send(left.as_raw_fd(), payload, 0, 1).expect("prep_send");
    ring.submit_and_wait(1).expect("submit_and_wait");
    let cqe = ring.wait_cqe().expect("wait_cqe");
    assert_eq!(cqe.user_data, 1);
    assert_eq!(cqe.res, payload.len() as i32);
    ring.seen_cqe();

    let mut buf = [0u8; 32];
    ring.prep_recv(right.as_raw_fd(), &mut buf, 0, 2).expect("prep_recv");
    ring.submit_and_wait(1).expect("submit_and_wait");
    let cqe = ring.wait_cqe().expect("wait_cqe");
    assert_eq!(cqe.user_data, 2);
    assert_eq!(cqe.res, payload.len() as i32);
    ring.seen_cqe();

    assert_eq!(&buf[..payload.len()], payload);
}

#[test]
fn poll_add_reports_writable() {
    let Some(ring) = ring_or_skip(4) else { return };

    let (left, _right) = UnixStream::pair().expect("socketpair");
    const POLLOUT: u32 = 0x0004;

    ring.prep_poll_add(left.as_raw_fd(), POLLOUT, 1).expect("prep_poll_add");
    ring.submit().expect("submit");

    let cqe = ring.wait_cqe().expect("wait_cqe");
    assert_eq!(cqe.user_data, 1);
    assert!(cqe.res > 0, "poll result {} should carry events", cqe.res);
    ring.seen_cqe();
}

#[test]
fn linked_read_with_timeout() {
    let Some(ring) = ring_or_skip(8) else { return };

    // Reading a fresh socketpair blocks, so the linked timeout fires and
    // cancels it.
    let (left, _right) = UnixStream::pair().expect("socketpair");
    let mut buf = [0u8; 16];

    ring.prep_read(left.as_raw_fd(), &mut buf, 0, 1).expect("prep_read");
    ring.set_sqe_link();
    let ts = Timespec::new(0, 50_000_000);
    ring.prep_link_timeout(&ts, 0, 2).expect("prep_link_timeout");

    ring.submit().expect("submit");

    let mut tokens = HashSet::new();
    for _ in 0..2 {
        let cqe = ring.wait_cqe().expect("wait_cqe");
        tokens.insert(cqe.user_data);
        ring.seen_cqe();
    }
    assert_eq!(tokens, HashSet::from([1, 2]));
}

#[test]
fn concurrent_producers_share_the_ring() {
    let Some(ring) = ring_or_skip(256) else { return };
    let ring = Arc::new(ring);

    let mut handles = Vec::new();
    for worker in 0..4u64 {
        let ring = Arc::clone(&ring);
        handles.push(std::thread::spawn(move || {
            for i in 0..32u64 {
                let token = worker * 1000 + i;
                loop {
                    match ring.prep_nop(token) {
                        Ok(()) => break,
                        Err(Error::QueueFull) => {
                            ring.submit().expect("submit on full");
                        }
                        Err(e) => panic!("prep_nop: {e:?}"),
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.join().expect("join");
    }

    ring.submit().expect("final submit");

    let mut seen = HashSet::new();
    while seen.len() < 128 {
        let cqe = ring.wait_cqe().expect("wait_cqe");
        assert_eq!(cqe.res, 0);
        seen.insert(cqe.user_data);
        ring.seen_cqe();
    }
    assert_eq!(seen.len(), 128);
}

#[test]
fn path_ops_reserve_without_publishing() {
    let Some(ring) = ring_or_skip(8) else { return };

    let path = CString::new("ringcall_test_path").expect("cstring");
    ring.prep_openat(crate::AT_FDCWD, &path, 0, 0o644, 1)
        .expect("prep_openat");
    ring.prep_unlinkat(crate::AT_FDCWD, &path, 0, 2)
        .expect("prep_unlinkat");
    ring.prep_mkdirat(crate::AT_FDCWD, &path, 0o755, 3)
        .expect("prep_mkdirat");
    assert_eq!(ring.sq_ready(), 3);
    // Nothing published yet; the kernel-visible tail is unchanged.
    assert_eq!(ring.sq_space(), ring.sq_entries());
}

#[test]
fn timespec_from_duration() {
    let ts = Timespec::from(Duration::from_millis(1_500));
    assert_eq!(ts.tv_sec, 1);
    assert_eq!(ts.tv_nsec, 500_000_000);

    let ts = Timespec::from(Duration::ZERO);
    assert_eq!(ts.tv_sec, 0);
    assert_eq!(ts.tv_nsec, 0);
}

#[test]
fn cqe_result_conversion() {
    assert_eq!(cqe_result(12), Ok(12));
    assert_eq!(cqe_result(0), Ok(0));
    assert_eq!(
        cqe_result(errno_res(Errno::NOENT)),
        Err(Error::Kernel(Errno::NOENT))
    );
}

#[test]
fn cqe_flag_accessors() {
    let cqe = Cqe {
        user_data: 1,
        res: 0,
        flags: IORING_CQE_F_BUFFER | (7 << crate::IORING_CQE_BUFFER_SHIFT),
    };
    assert_eq!(cqe.buffer_id(), Some(7));
    assert!(!cqe.has_more());

    let cqe = Cqe {
        user_data: 2,
        res: 0,
        flags: IORING_CQE_F_MORE,
    };
    assert_eq!(cqe.buffer_id(), None);
    assert!(cqe.has_more());

    let cqe = Cqe {
        user_data: 3,
        res: 0,
        flags: IORING_CQE_F_NOTIF,
    };
    assert!(cqe.is_notification());
}

#[test]
fn opcode_constants_are_kernel_values() {
    // Spot checks against the UAPI numbering.
    assert_eq!(IORING_OP_NOP, 0);
    assert_eq!(IORING_OP_READ_FIXED, 4);
    assert_eq!(IORING_OP_READ, 22);
    assert_eq!(IORING_OP_WRITE, 23);
    assert_eq!(IORING_TIMEOUT_ABS, 1);
    assert_eq!(core::mem::size_of::<crate::io_uring_sqe>(), 64);
    assert_eq!(core::mem::size_of::<crate::io_uring_cqe>(), 16);
}

#[test]
fn madvise_prep_accepts_raw_region() {
    let Some(ring) = ring_or_skip(4) else { return };

    let mut region = vec![0u8; 4096];
    ring.prep_madvise(region.as_mut_ptr().cast::<c_void>(), 4096, 0, 1)
        .expect("prep_madvise");
    assert_eq!(ring.sq_ready(), 1);
}
