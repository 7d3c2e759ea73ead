use std::fmt;
use std::io;

#[cfg(target_os = "linux")]
use ipcqueue::posix::{PosixMqError, PosixMqErrorKind};
#[cfg(target_os = "linux")]
use ipcqueue::sysv::{SysvMqError, SysvMqErrorKind};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const QUEUE_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(target_os = "linux")]
pub fn posix_error(context: &str, err: PosixMqError) -> CliError {
    let code = match err.kind() {
        PosixMqErrorKind::Permissions => PERMISSION_DENIED,
        PosixMqErrorKind::Value => USAGE,
        PosixMqErrorKind::Size => DATA_INVALID,
        PosixMqErrorKind::Timeout => TIMEOUT,
        PosixMqErrorKind::Signal => INTERRUPTED,
        PosixMqErrorKind::DoesNotExist => FAILURE,
        PosixMqErrorKind::Resources | PosixMqErrorKind::Descriptor => QUEUE_ERROR,
        PosixMqErrorKind::Other => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(target_os = "linux")]
pub fn sysv_error(context: &str, err: SysvMqError) -> CliError {
    // Full and Empty only come back from non-blocking calls: nothing could
    // move within the zero timeout.
    let code = match err.kind() {
        SysvMqErrorKind::Permissions => PERMISSION_DENIED,
        SysvMqErrorKind::Value => USAGE,
        SysvMqErrorKind::Size => DATA_INVALID,
        SysvMqErrorKind::Full | SysvMqErrorKind::Empty => TIMEOUT,
        SysvMqErrorKind::Signal => INTERRUPTED,
        SysvMqErrorKind::Resources | SysvMqErrorKind::Descriptor => QUEUE_ERROR,
        SysvMqErrorKind::Other => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}
