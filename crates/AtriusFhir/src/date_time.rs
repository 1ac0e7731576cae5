//! Precision-aware FHIR date, time and dateTime values.
//!
//! FHIR allows partial dates (`2023`, `2023-03`) and keeps whatever precision the
//! author wrote. The lexical shape is checked by the primitive patterns; the types here
//! add calendar validity (no February 30th) and typed access to the components.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use std::sync::Arc;

/// Precision levels for FHIR Date values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatePrecision {
    /// Year only (YYYY)
    Year,
    /// Year and month (YYYY-MM)
    YearMonth,
    /// Full date (YYYY-MM-DD)
    Full,
}

/// Precision levels for FHIR Time values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimePrecision {
    /// Hour and minute (HH:MM), only inside a dateTime
    HourMinute,
    /// Hour, minute, and second (HH:MM:SS)
    HourMinuteSecond,
    /// Sub-second precision (HH:MM:SS.sss)
    Fraction,
}

/// Precision levels for FHIR DateTime values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DateTimePrecision {
    Year,
    YearMonth,
    Date,
    DateHourMinute,
    DateHourMinuteSecond,
    Full,
}

/// A FHIR `date`, possibly partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecisionDate {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    precision: DatePrecision,
    original_string: Arc<str>,
}

impl PrecisionDate {
    /// Parses `YYYY`, `YYYY-MM` or `YYYY-MM-DD`, rejecting impossible calendar dates.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts[0].len() != 4 || parts.iter().skip(1).any(|p| p.len() != 2) {
            return None;
        }
        let year = parts[0].parse::<i32>().ok()?;
        let (month, day, precision) = match parts.len() {
            1 => (None, None, DatePrecision::Year),
            2 => {
                let month = parts[1].parse::<u32>().ok()?;
                if !(1..=12).contains(&month) {
                    return None;
                }
                (Some(month), None, DatePrecision::YearMonth)
            }
            3 => {
                let month = parts[1].parse::<u32>().ok()?;
                let day = parts[2].parse::<u32>().ok()?;
                NaiveDate::from_ymd_opt(year, month, day)?;
                (Some(month), Some(day), DatePrecision::Full)
            }
            _ => return None,
        };
        Some(Self {
            year,
            month,
            day,
            precision,
            original_string: Arc::from(s),
        })
    }

    pub fn precision(&self) -> DatePrecision {
        self.precision
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn day(&self) -> Option<u32> {
        self.day
    }

    /// The full calendar date, when all components are present.
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month?, self.day?)
    }
}

/// A FHIR `time` of day, without time zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecisionTime {
    hour: u32,
    minute: u32,
    second: Option<u32>,
    nanosecond: Option<u32>,
    precision: TimePrecision,
    original_string: Arc<str>,
}

impl PrecisionTime {
    /// Parses `HH:MM`, `HH:MM:SS` or `HH:MM:SS.fff...`. Seconds may be 60 (leap second).
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 || parts[0].len() != 2 || parts[1].len() != 2 {
            return None;
        }
        let hour = parts[0].parse::<u32>().ok()?;
        let minute = parts[1].parse::<u32>().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }

        let (second, nanosecond, precision) = match parts.get(2) {
            None => (None, None, TimePrecision::HourMinute),
            Some(seconds) => {
                let (whole, fraction) = match seconds.split_once('.') {
                    Some((whole, fraction)) => (whole, Some(fraction)),
                    None => (*seconds, None),
                };
                if whole.len() != 2 {
                    return None;
                }
                let second = whole.parse::<u32>().ok()?;
                if second > 60 {
                    return None;
                }
                match fraction {
                    Some(digits) => {
                        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                            return None;
                        }
                        // Nanoseconds: pad or truncate to nine digits.
                        let nanos = format!("{:0<9.9}", digits).parse::<u32>().ok()?;
                        (Some(second), Some(nanos), TimePrecision::Fraction)
                    }
                    None => (Some(second), None, TimePrecision::HourMinuteSecond),
                }
            }
        };

        Some(Self {
            hour,
            minute,
            second,
            nanosecond,
            precision,
            original_string: Arc::from(s),
        })
    }

    pub fn precision(&self) -> TimePrecision {
        self.precision
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> Option<u32> {
        self.second
    }

    /// Leap seconds are folded into the last second of the minute.
    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        let second = self.second.unwrap_or(0).min(59);
        NaiveTime::from_hms_nano_opt(self.hour, self.minute, second, self.nanosecond.unwrap_or(0))
    }
}

/// A FHIR `dateTime` or `instant`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecisionDateTime {
    date: PrecisionDate,
    time: Option<PrecisionTime>,
    /// Offset in minutes east of UTC
    timezone_offset: Option<i32>,
    precision: DateTimePrecision,
    original_string: Arc<str>,
}

impl PrecisionDateTime {
    /// Parses a dateTime. A time component requires a full date and a time zone.
    pub fn parse(s: &str) -> Option<Self> {
        let Some((date_part, time_and_tz)) = s.split_once('T') else {
            let date = PrecisionDate::parse(s)?;
            let precision = match date.precision {
                DatePrecision::Year => DateTimePrecision::Year,
                DatePrecision::YearMonth => DateTimePrecision::YearMonth,
                DatePrecision::Full => DateTimePrecision::Date,
            };
            return Some(Self {
                date,
                time: None,
                timezone_offset: None,
                precision,
                original_string: Arc::from(s),
            });
        };

        let date = PrecisionDate::parse(date_part)?;
        if date.precision != DatePrecision::Full {
            return None;
        }
        let (time_part, offset) = if let Some(stripped) = time_and_tz.strip_suffix('Z') {
            (stripped, 0)
        } else {
            let sign_pos = time_and_tz.rfind(['+', '-'])?;
            let sign = if time_and_tz[sign_pos..].starts_with('-') { -1 } else { 1 };
            let offset = Self::parse_timezone_offset(&time_and_tz[sign_pos + 1..])?;
            (&time_and_tz[..sign_pos], sign * offset)
        };
        let time = PrecisionTime::parse(time_part)?;
        let precision = match time.precision {
            TimePrecision::HourMinute => DateTimePrecision::DateHourMinute,
            TimePrecision::HourMinuteSecond => DateTimePrecision::DateHourMinuteSecond,
            TimePrecision::Fraction => DateTimePrecision::Full,
        };
        Some(Self {
            date,
            time: Some(time),
            timezone_offset: Some(offset),
            precision,
            original_string: Arc::from(s),
        })
    }

    /// Parses `hh:mm` into minutes, limited to the `+14:00`/`-14:00` range.
    fn parse_timezone_offset(s: &str) -> Option<i32> {
        let (hours, minutes) = s.split_once(':')?;
        if hours.len() != 2 || minutes.len() != 2 {
            return None;
        }
        let hours = hours.parse::<i32>().ok()?;
        let minutes = minutes.parse::<i32>().ok()?;
        if minutes > 59 || hours * 60 + minutes > 14 * 60 {
            return None;
        }
        Some(hours * 60 + minutes)
    }

    pub fn precision(&self) -> DateTimePrecision {
        self.precision
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }

    pub fn date(&self) -> &PrecisionDate {
        &self.date
    }

    pub fn time(&self) -> Option<&PrecisionTime> {
        self.time.as_ref()
    }

    pub fn timezone_offset(&self) -> Option<i32> {
        self.timezone_offset
    }

    /// The exact point in time, for values with a time component.
    pub fn to_chrono(&self) -> Option<DateTime<FixedOffset>> {
        let date = self.date.to_naive_date()?;
        let time = self.time.as_ref()?.to_naive_time()?;
        let offset = FixedOffset::east_opt(self.timezone_offset? * 60)?;
        date.and_time(time).and_local_timezone(offset).single()
    }
}
