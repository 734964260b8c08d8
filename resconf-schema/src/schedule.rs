use std::fmt::{self, Debug, Display};

use crate::resource::Record;

/// A fixed-width set of small indices, `0..N`
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitField<const N: usize>(u64);

impl<const N: usize> BitField<N> {
    const MASK: u64 = if N >= 64 { u64::MAX } else { (1 << N) - 1 };

    pub const fn full() -> Self {
        BitField(Self::MASK)
    }

    pub const fn empty() -> Self {
        BitField(0)
    }

    pub const fn len() -> usize {
        N
    }

    /// Sets one index, ignoring indices past the end
    pub fn set(&mut self, index: usize) {
        if index < N {
            self.0 |= 1 << index;
        }
    }

    /// Sets every index from `first` to `last` inclusive
    pub fn set_range(&mut self, first: usize, last: usize) {
        for index in first..=last {
            self.set(index);
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        index < N && self.0 & (1 << index) != 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn fill(&mut self) {
        self.0 = Self::MASK;
    }

    pub fn is_full(&self) -> bool {
        self.0 == Self::MASK
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..N).filter(|index| self.contains(*index))
    }
}

impl<const N: usize> Default for BitField<N> {
    fn default() -> Self {
        Self::full()
    }
}

impl<const N: usize> Debug for BitField<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// When a scheduled run fires
///
/// Every vector is zero based: day of month `0` is the 1st, weekday `0` is Sunday, month `0`
/// is January, week of month `0` is the first week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeMask {
    pub hour: BitField<24>,
    pub mday: BitField<31>,
    pub month: BitField<12>,
    pub wday: BitField<7>,
    pub wom: BitField<5>,
    pub woy: BitField<54>,
    pub minute: u8,
    pub last_week_of_month: bool,
}

impl Default for DateTimeMask {
    fn default() -> Self {
        DateTimeMask {
            hour: BitField::full(),
            mday: BitField::full(),
            month: BitField::full(),
            wday: BitField::full(),
            wom: BitField::full(),
            woy: BitField::full(),
            minute: 0,
            last_week_of_month: false,
        }
    }
}

impl Display for DateTimeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_field<const N: usize>(
            f: &mut fmt::Formatter<'_>,
            label: &str,
            bits: &BitField<N>,
            offset: usize,
        ) -> fmt::Result {
            if bits.is_full() {
                return Ok(());
            }
            let indices: Vec<_> = bits.iter().map(|i| (i + offset).to_string()).collect();
            write!(f, "{label}={} ", indices.join(","))
        }
        write_field(f, "mday", &self.mday, 1)?;
        write_field(f, "wday", &self.wday, 0)?;
        write_field(f, "month", &self.month, 1)?;
        write_field(f, "wom", &self.wom, 1)?;
        write_field(f, "woy", &self.woy, 0)?;
        if self.last_week_of_month {
            f.write_str("last ")?;
        }
        let hours: Vec<_> = self.hour.iter().map(|h| h.to_string()).collect();
        write!(f, "hours={} minute={:02}", hours.join(","), self.minute)
    }
}

/// One `Run` directive: its overrides and when it fires
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub overrides: Record,
    pub when: DateTimeMask,
}
