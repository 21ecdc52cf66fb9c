//! Timeline layout: date axis, milestone bars and the "today" marker.
//!
//! Everything here is a pure function of the milestones, the zoom level and
//! today's date. A [`Timeline`] is cheap to build and is meant to be rebuilt
//! whenever either of them changes.

mod buckets;
mod layout;
mod range;

pub use buckets::{BucketIter, Buckets, Zoom};
pub use layout::{MIN_BAR_WIDTH, Span, Timeline, TimelineBar, TimelineLayout, TimelineRow};
pub use range::DateRange;
