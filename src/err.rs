use rustix::io::Errno;
use thiserror::Error;

/// Errors surfaced by ring operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The ring was closed; no further operation succeeds.
    #[error("ring closed")]
    RingClosed,

    /// The submission queue is full. Retry after a submit/drain cycle.
    #[error("submission queue full")]
    QueueFull,

    /// The running kernel does not advertise the requested operation.
    #[error("operation not supported on this kernel")]
    Unsupported,

    /// A deadline elapsed without a completion becoming available.
    #[error("timed out waiting for completion")]
    TimeExpired,

    /// A syscall was interrupted by a signal.
    #[error("interrupted by signal")]
    Interrupted,

    /// A cancellation token fired while waiting for a completion.
    #[error("wait cancelled")]
    Cancelled,

    /// Any other kernel failure, carrying the raw error number.
    #[error("kernel error: {0}")]
    Kernel(Errno),
}

impl From<Errno> for Error {
    fn from(errno: Errno) -> Self {
        match errno {
            Errno::INTR => Self::Interrupted,
            Errno::TIME => Self::TimeExpired,
            e => Self::Kernel(e),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Converts a signed CQE result into the number of bytes (or the opcode's
/// non-negative payload), mapping a negated error number to
/// [`Error::Kernel`].
///
/// # Errors
/// Returns the embedded kernel error when `res` is negative.
pub fn cqe_result(res: i32) -> Result<u32> {
    if res < 0 {
        Err(Error::Kernel(Errno::from_raw_os_error(-res)))
    } else {
        Ok(res as u32)
    }
}
