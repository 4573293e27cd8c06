//! Time-of-day periods and calendar buckets.

use crate::error::{AnalyticsError, Result};
use crate::fetch::LogRecord;
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

fn local(ts: i64, offset: &FixedOffset) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(ts, 0).map(|utc| utc.with_timezone(offset).naive_local())
}

/// Minutes after local midnight, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const fn new(hour: u16, minute: u16) -> Self {
        TimeOfDay(hour * 60 + minute)
    }

    /// Strict `HH:MM`, 00:00 through 23:59.
    pub fn parse(raw: &str) -> Result<Self> {
        let bad = || AnalyticsError::invalid(format!("time must be HH:MM, got {raw:?}"));
        let (h, m) = raw.split_once(':').ok_or_else(bad)?;
        let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
        if !two_digits(h) || !two_digits(m) {
            return Err(bad());
        }
        let hour: u16 = h.parse().map_err(|_| bad())?;
        let minute: u16 = m.parse().map_err(|_| bad())?;
        if hour > 23 || minute > 59 {
            return Err(bad());
        }
        Ok(Self::new(hour, minute))
    }

    pub fn of_timestamp(ts: i64, offset: &FixedOffset) -> Option<Self> {
        let t = local(ts, offset)?;
        Some(Self::new(t.hour() as u16, t.minute() as u16))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// A named time-of-day range. `start > end` wraps past midnight; both ends
/// are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub name: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl Period {
    pub fn new(name: impl Into<String>, start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    pub fn contains(&self, t: TimeOfDay) -> bool {
        if self.start < self.end {
            self.start <= t && t <= self.end
        } else {
            t >= self.start || t <= self.end
        }
    }
}

/// Morning, daytime and night, covering the whole day.
pub fn default_periods() -> Vec<Period> {
    vec![
        Period::new("pagi", TimeOfDay::new(5, 0), TimeOfDay::new(7, 59)),
        Period::new("siang", TimeOfDay::new(8, 0), TimeOfDay::new(15, 59)),
        Period::new("malam", TimeOfDay::new(16, 0), TimeOfDay::new(4, 59)),
    ]
}

/// Access counts per period, in the order the periods were declared. A
/// record counts toward the first period containing its local time;
/// records outside every period are dropped. In unique mode only distinct
/// logged-in users are counted.
pub fn count_by_period(
    records: &[LogRecord],
    periods: &[Period],
    offset: &FixedOffset,
    unique_by_user: bool,
) -> Vec<u64> {
    let mut raw = vec![0u64; periods.len()];
    let mut users: Vec<BTreeSet<i64>> = vec![BTreeSet::new(); periods.len()];
    let mut dropped = 0usize;

    for record in records {
        let Some(t) = TimeOfDay::of_timestamp(record.timecreated, offset) else {
            dropped += 1;
            continue;
        };
        match periods.iter().position(|p| p.contains(t)) {
            Some(i) => {
                raw[i] += 1;
                if record.user_id > 0 {
                    users[i].insert(record.user_id);
                }
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, "records outside every period");
    }

    if unique_by_user {
        users.iter().map(|u| u.len() as u64).collect()
    } else {
        raw
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsMode {
    Day,
    Week,
    Month,
}

impl StatsMode {
    const DAY_SECS: i64 = 86_400;

    /// Bucket size for a window: up to a week by day, up to a month by ISO
    /// week, otherwise by month.
    pub fn for_window(start: i64, end: i64) -> Self {
        let span = end - start;
        if span <= 7 * Self::DAY_SECS {
            StatsMode::Day
        } else if span <= 31 * Self::DAY_SECS {
            StatsMode::Week
        } else {
            StatsMode::Month
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatsMode::Day => "day",
            StatsMode::Week => "week",
            StatsMode::Month => "month",
        }
    }

    pub fn label(self, date: NaiveDate) -> String {
        match self {
            StatsMode::Day => date.format("%Y-%m-%d").to_string(),
            StatsMode::Week => date.format("%G-W%V").to_string(),
            StatsMode::Month => date.format("%Y-%m").to_string(),
        }
    }

    /// Every bucket label from the one containing `first` to the one
    /// containing `last`, inclusive.
    pub fn labels(self, first: NaiveDate, last: NaiveDate) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = match self {
            StatsMode::Day => first,
            StatsMode::Week => {
                first - Duration::days(i64::from(first.weekday().num_days_from_monday()))
            }
            StatsMode::Month => first.with_day(1).unwrap_or(first),
        };
        while cursor <= last {
            out.push(self.label(cursor));
            let next = match self {
                StatsMode::Day => cursor.succ_opt(),
                StatsMode::Week => cursor.checked_add_signed(Duration::days(7)),
                StatsMode::Month => cursor.checked_add_months(chrono::Months::new(1)),
            };
            match next {
                Some(n) => cursor = n,
                None => break,
            }
        }
        out
    }
}

/// Whole local days `first..=last` as a unix-second window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub start: i64,
    pub end: i64,
}

impl StatsWindow {
    pub fn parse(start: &str, end: &str, offset: &FixedOffset) -> Result<Self> {
        let day = |name: &str, raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                AnalyticsError::invalid(format!("{name} must be YYYY-MM-DD, got {raw:?}"))
            })
        };
        let first_day = day("startDate", start)?;
        let last_day = day("endDate", end)?;
        if last_day < first_day {
            return Err(AnalyticsError::invalid_with(
                "endDate is before startDate",
                serde_json::json!({ "startDate": start, "endDate": end }),
            ));
        }

        let at = |d: NaiveDate, h: u32, m: u32, s: u32| {
            d.and_hms_opt(h, m, s)
                .and_then(|naive| offset.from_local_datetime(&naive).single())
                .map(|dt| dt.timestamp())
                .ok_or_else(|| AnalyticsError::invalid(format!("date out of range: {d}")))
        };
        Ok(Self {
            first_day,
            last_day,
            start: at(first_day, 0, 0, 0)?,
            end: at(last_day, 23, 59, 59)?,
        })
    }

    pub fn mode(&self) -> StatsMode {
        StatsMode::for_window(self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodCount {
    pub label: String,
    pub views: u64,
    pub posts: u64,
}

/// Views (crud `r`) and posts (anything else) per calendar bucket over the
/// whole window, zero-filled.
pub fn calendar_stats(
    records: &[LogRecord],
    window: &StatsWindow,
    offset: &FixedOffset,
) -> (StatsMode, Vec<PeriodCount>) {
    let mode = window.mode();
    let mut grouped: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for record in records {
        let Some(at) = local(record.timecreated, offset) else {
            continue;
        };
        let slot = grouped.entry(mode.label(at.date())).or_default();
        if record.crud == "r" {
            slot.0 += 1;
        } else {
            slot.1 += 1;
        }
    }

    let stats = mode
        .labels(window.first_day, window.last_day)
        .into_iter()
        .map(|label| {
            let (views, posts) = grouped.get(&label).copied().unwrap_or_default();
            PeriodCount {
                label,
                views,
                posts,
            }
        })
        .collect();
    (mode, stats)
}
