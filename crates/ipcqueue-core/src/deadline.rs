use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Nanoseconds in one second; the exclusive upper bound of [`Deadline::nanos`].
pub const NANOS_PER_SEC: u32 = 1_000_000_000;

/// An absolute point on the realtime clock.
///
/// This is what `mq_timedsend`/`mq_timedreceive` block until. The nanosecond
/// component is always normalized into `[0, NANOS_PER_SEC)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    secs: i64,
    nanos: u32,
}

impl Deadline {
    /// Deadline `relative` from now, using a single realtime clock read.
    pub fn after(relative: Duration) -> Self {
        Self::from_base(realtime_now(), relative)
    }

    /// Deadline `relative` after `base` (a duration since the Unix epoch).
    ///
    /// Pure: the seconds parts are summed, the sub-second parts are summed in
    /// nanoseconds, and every whole second in the nanosecond sum is carried.
    /// Seconds saturate at `i64::MAX` rather than wrapping.
    pub fn from_base(base: Duration, relative: Duration) -> Self {
        let nanos = u64::from(base.subsec_nanos()) + u64::from(relative.subsec_nanos());
        let carry = nanos / u64::from(NANOS_PER_SEC);
        let secs = base
            .as_secs()
            .saturating_add(relative.as_secs())
            .saturating_add(carry);

        Self {
            secs: i64::try_from(secs).unwrap_or(i64::MAX),
            nanos: (nanos % u64::from(NANOS_PER_SEC)) as u32,
        }
    }

    /// Whole seconds since the Unix epoch.
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// Sub-second nanoseconds, always below [`NANOS_PER_SEC`].
    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Convert into the `timespec` the kernel primitives take.
    #[cfg(unix)]
    pub fn as_timespec(&self) -> libc::timespec {
        // SAFETY: `timespec` is plain old data; all-zero is a valid value and
        // also clears any private padding fields some targets declare.
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        ts.tv_sec = libc::time_t::try_from(self.secs).unwrap_or(libc::time_t::MAX);
        ts.tv_nsec = self.nanos as _;
        ts
    }
}

fn realtime_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
}
