use serde::Serialize;
use time::Date;

use crate::core::date::{add_days, add_years, first_of_month};
use crate::core::db::Schedule;

/// Days of padding kept before the first and after the last milestone.
const PADDING_DAYS: i64 = 30;

/// Inclusive range of calendar days shown on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// Bounds given in the wrong order are swapped.
    pub fn new(start: Date, end: Date) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Visible range for a set of milestone schedules.
    ///
    /// Without milestones: first day of the current month up to two years
    /// from today. Otherwise the earliest start minus 30 days up to the
    /// furthest of: the latest milestone's end plus two years, today plus one
    /// year, the furthest end plus 30 days.
    pub fn for_schedules<I>(schedules: I, today: Date) -> Self
    where
        I: IntoIterator<Item = Schedule>,
    {
        let mut schedules = schedules.into_iter();
        let Some(first) = schedules.next() else {
            return Self::new(first_of_month(today), add_years(today, 2));
        };

        let mut earliest_start = first.start;
        let mut furthest_end = first.end;
        let mut latest = first;
        for schedule in schedules {
            earliest_start = earliest_start.min(schedule.start);
            furthest_end = furthest_end.max(schedule.end);
            if (schedule.start, schedule.end) > (latest.start, latest.end) {
                latest = schedule;
            }
        }

        let start = add_days(earliest_start, -PADDING_DAYS);
        let end = add_years(latest.end, 2)
            .max(add_years(today, 1))
            .max(add_days(furthest_end, PADDING_DAYS));
        Self::new(start, end)
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}
