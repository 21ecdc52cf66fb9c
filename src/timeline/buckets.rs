use std::{fmt, iter::FusedIterator, str::FromStr};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::core::date::{add_days, first_of_month, first_of_next_month, monday_on_or_before};
use crate::timeline::DateRange;

/// Granularity of the timeline axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zoom {
    Day,
    #[default]
    Week,
    Month,
}

impl Zoom {
    /// Pixel width of one bucket.
    pub const fn bucket_width(self) -> u32 {
        match self {
            Zoom::Day => 80,
            Zoom::Week => 120,
            Zoom::Month => 150,
        }
    }

    /// Start of the bucket the axis begins with for a range starting at `date`.
    pub fn align(self, date: Date) -> Date {
        match self {
            Zoom::Day => date,
            Zoom::Week => monday_on_or_before(date),
            Zoom::Month => first_of_month(date),
        }
    }

    /// Start of the bucket following the one starting at `bucket`.
    pub fn step(self, bucket: Date) -> Option<Date> {
        match self {
            Zoom::Day => bucket.next_day(),
            Zoom::Week => Some(add_days(bucket, 7)).filter(|next| *next > bucket),
            Zoom::Month => first_of_next_month(bucket),
        }
    }
}

impl fmt::Display for Zoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Zoom::Day => "day",
            Zoom::Week => "week",
            Zoom::Month => "month",
        };
        f.write_str(label)
    }
}

impl FromStr for Zoom {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(Zoom::Day),
            "week" | "weeks" => Ok(Zoom::Week),
            "month" | "months" => Ok(Zoom::Month),
            other => Err(anyhow::anyhow!("Unknown zoom level '{}', expected day, week or month", other)),
        }
    }
}

/// The axis buckets for a range at a zoom level.
///
/// Buckets are never stored; every call to [`Buckets::iter`] walks the
/// range again from its aligned start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buckets {
    range: DateRange,
    zoom: Zoom,
}

impl Buckets {
    pub fn new(range: DateRange, zoom: Zoom) -> Self {
        Self { range, zoom }
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn iter(&self) -> BucketIter {
        BucketIter {
            next: Some(self.zoom.align(self.range.start())),
            last: self.range.end(),
            zoom: self.zoom,
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Index of the bucket containing `date`.
    ///
    /// A date before the first bucket maps to the first bucket whose start is
    /// on or after it; a date past the last bucket is clamped to the last one.
    pub fn locate(&self, date: Date) -> usize {
        let mut last = 0;
        for (index, start) in self.iter().enumerate() {
            if start > date {
                return index;
            }
            if self.zoom.step(start).is_none_or(|next| date < next) {
                return index;
            }
            last = index;
        }
        last
    }
}

impl<'a> IntoIterator for &'a Buckets {
    type Item = Date;
    type IntoIter = BucketIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct BucketIter {
    next: Option<Date>,
    last: Date,
    zoom: Zoom,
}

impl Iterator for BucketIter {
    type Item = Date;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|date| *date <= self.last)?;
        self.next = self.zoom.step(current);
        Some(current)
    }
}

impl FusedIterator for BucketIter {}
