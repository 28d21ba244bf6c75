//! [`FileTime`] is a wrapper around a u64 that represents a file time,
//! according to the FILETIME structure (MS-DTYP 2.3.3).

use std::fmt;
use std::ops::Deref;

use binrw::prelude::*;
use time::macros::datetime;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

#[derive(BinRead, BinWrite, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[brw(little)]
pub struct FileTime {
    /// 100-nanosecond intervals since January 1, 1601 (UTC)
    value: u64,
}

impl FileTime {
    const EPOCH: PrimitiveDateTime = datetime!(1601-01-01 00:00:00);
    const TICKS_PER_SECOND: u64 = 10_000_000;
    const NANOS_PER_TICK: u64 = 100;

    /// The current UTC wall-clock time.
    pub fn now() -> Self {
        let now = OffsetDateTime::now_utc();
        PrimitiveDateTime::new(now.date(), now.time()).into()
    }

    /// Converts to a date-time, or `None` if the value is beyond what
    /// [`PrimitiveDateTime`] can represent.
    pub fn date_time(&self) -> Option<PrimitiveDateTime> {
        let seconds = (self.value / Self::TICKS_PER_SECOND) as i64;
        let nanos = ((self.value % Self::TICKS_PER_SECOND) * Self::NANOS_PER_TICK) as i32;
        Self::EPOCH.checked_add(Duration::new(seconds, nanos))
    }
}

impl fmt::Display for FileTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date_time() {
            Some(dt) => write!(f, "{dt}"),
            None => write!(f, "{:#x}", self.value),
        }
    }
}

impl fmt::Debug for FileTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date_time() {
            Some(dt) => f.debug_tuple("FileTime").field(&dt).finish(),
            None => f.debug_tuple("FileTime").field(&self.value).finish(),
        }
    }
}

impl From<u64> for FileTime {
    fn from(value: u64) -> Self {
        Self { value }
    }
}

impl From<PrimitiveDateTime> for FileTime {
    /// Date-times before 1601 clamp to zero.
    fn from(dt: PrimitiveDateTime) -> Self {
        let ticks = (dt - Self::EPOCH).whole_nanoseconds() / Self::NANOS_PER_TICK as i128;
        Self {
            value: u64::try_from(ticks.max(0)).unwrap_or(u64::MAX),
        }
    }
}

impl Deref for FileTime {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
