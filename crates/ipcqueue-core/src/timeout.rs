use std::time::Duration;

use crate::deadline::Deadline;

/// How long a send or receive may block.
///
/// Callers hand in a floating-point number of seconds where `+inf` means
/// "block forever". Each backend decides which finite values it accepts:
/// the POSIX backend turns any of them into a [`Deadline`], the System V
/// backend only understands [`Timeout::NON_BLOCKING`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Timeout {
    /// Block until the operation can complete.
    #[default]
    Forever,
    /// Block for at most this long. Zero means "do not wait".
    After(Duration),
}

impl Timeout {
    /// Fail immediately instead of blocking.
    pub const NON_BLOCKING: Timeout = Timeout::After(Duration::ZERO);

    /// Parse a relative timeout in seconds.
    ///
    /// Returns `None` for NaN and negative values (including `-inf`).
    /// Finite values too large for a [`Duration`] saturate to `Duration::MAX`.
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        if secs.is_nan() || secs < 0.0 {
            return None;
        }
        if secs.is_infinite() {
            return Some(Timeout::Forever);
        }
        Some(Timeout::After(
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX),
        ))
    }

    /// The relative timeout in seconds, `+inf` for [`Timeout::Forever`].
    pub fn as_secs_f64(&self) -> f64 {
        match self {
            Timeout::Forever => f64::INFINITY,
            Timeout::After(d) => d.as_secs_f64(),
        }
    }

    pub fn is_forever(&self) -> bool {
        matches!(self, Timeout::Forever)
    }

    pub fn is_non_blocking(&self) -> bool {
        matches!(self, Timeout::After(d) if d.is_zero())
    }

    /// Absolute deadline for a finite timeout, computed from the current time.
    pub fn deadline(&self) -> Option<Deadline> {
        match self {
            Timeout::Forever => None,
            Timeout::After(d) => Some(Deadline::after(*d)),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(value: Duration) -> Self {
        Timeout::After(value)
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(value: Option<Duration>) -> Self {
        value.map_or(Timeout::Forever, Timeout::After)
    }
}
