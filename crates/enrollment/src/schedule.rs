//! Bit-packed weekly class schedule.
//!
//! A [`WeeklyTimeSlot`] stores the start minute, the end minute and the set of
//! weekdays a section meets on in a single `u32`:
//!
//! - bits `0..22` hold `start + MINUTES_PER_DAY * end`
//! - bits `22..29` hold one bit per weekday, ordered from Sunday (bit 22) to Saturday

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of minutes in a day. Minute values are expected to be below this.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// The bit on which the weekday set starts
const WEEKDAY_START_BIT: u32 = 22;

const TIME_MASK: u32 = (1 << WEEKDAY_START_BIT) - 1;

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// The hours and weekdays a section is held on.
///
/// This is a plain immutable value. It is written once when the section is built
/// and only ever read afterwards.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "SlotParts", try_from = "SlotParts")]
pub struct WeeklyTimeSlot(u32);

/// The unpacked form of a [`WeeklyTimeSlot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotParts {
    pub days: Vec<Weekday>,
    pub start_minute: u16,
    pub end_minute: u16,
}

impl WeeklyTimeSlot {
    /// Packs the weekdays and the start/end minutes of the day.
    ///
    /// `start <= end` is not checked; callers supply sane values.
    pub fn new(days: &[Weekday], start_minute: u16, end_minute: u16) -> Self {
        debug_assert!(u32::from(start_minute) < MINUTES_PER_DAY);
        debug_assert!(u32::from(end_minute) < MINUTES_PER_DAY);
        let mut raw = u32::from(start_minute) + MINUTES_PER_DAY * u32::from(end_minute);
        for day in days {
            raw |= 1 << (day.num_days_from_sunday() + WEEKDAY_START_BIT);
        }
        Self(raw)
    }

    /// Returns the packed representation.
    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn start_minute(self) -> u16 {
        ((self.0 & TIME_MASK) % MINUTES_PER_DAY) as u16
    }

    pub fn end_minute(self) -> u16 {
        (((self.0 & TIME_MASK) / MINUTES_PER_DAY) % MINUTES_PER_DAY) as u16
    }

    fn weekday_bits(self) -> u32 {
        (self.0 >> WEEKDAY_START_BIT) & 0x7f
    }

    /// The weekdays this slot is held on, ordered from Sunday.
    pub fn days(self) -> Vec<Weekday> {
        let bits = self.weekday_bits();
        ALL_WEEKDAYS
            .iter()
            .copied()
            .filter(|day| bits & (1 << day.num_days_from_sunday()) != 0)
            .collect()
    }

    /// Unpacks the slot into its weekdays, start minute and end minute.
    pub fn decode(self) -> (Vec<Weekday>, u16, u16) {
        (self.days(), self.start_minute(), self.end_minute())
    }

    /// Checks if two slots overlap.
    ///
    /// The time ranges are half-open, so a class ending at 10:00 does not
    /// conflict with one starting at 10:00. They also have to share a weekday.
    pub fn overlaps(self, other: WeeklyTimeSlot) -> bool {
        let hours_overlap = self.start_minute() < other.end_minute()
            && other.start_minute() < self.end_minute();
        hours_overlap && self.weekday_bits() & other.weekday_bits() != 0
    }
}

impl fmt::Debug for WeeklyTimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeeklyTimeSlot")
            .field("days", &self.days())
            .field("start_minute", &self.start_minute())
            .field("end_minute", &self.end_minute())
            .finish()
    }
}

impl From<WeeklyTimeSlot> for SlotParts {
    fn from(slot: WeeklyTimeSlot) -> Self {
        let (days, start_minute, end_minute) = slot.decode();
        SlotParts {
            days,
            start_minute,
            end_minute,
        }
    }
}

impl TryFrom<SlotParts> for WeeklyTimeSlot {
    type Error = String;

    fn try_from(parts: SlotParts) -> Result<Self, Self::Error> {
        let day = MINUTES_PER_DAY as u16;
        if parts.start_minute >= day || parts.end_minute >= day {
            return Err(format!(
                "minutes must be below {day}, got {}..{}",
                parts.start_minute, parts.end_minute
            ));
        }
        if parts.start_minute > parts.end_minute {
            return Err(format!(
                "class ends before it starts: {}..{}",
                parts.start_minute, parts.end_minute
            ));
        }
        Ok(WeeklyTimeSlot::new(
            &parts.days,
            parts.start_minute,
            parts.end_minute,
        ))
    }
}
