use std::fmt;

use serde::Serialize;
use time::Date;

use crate::core::db::{Color, Milestone, Phase, Schedule};
use crate::timeline::{Buckets, DateRange, Zoom};

/// Narrowest bar drawn, keeps one-day milestones visible and clickable.
pub const MIN_BAR_WIDTH: u32 = 60;

/// Horizontal placement of a bar, in pixels from the left edge of the axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub left: u32,
    pub width: u32,
}

impl Span {
    /// Used for milestones whose dates cannot be read.
    pub const PLACEHOLDER: Span = Span {
        left: 0,
        width: MIN_BAR_WIDTH,
    };

    pub fn right(&self) -> u32 {
        self.left + self.width
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "left: {}px; width: {}px", self.left, self.width)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBar {
    pub milestone_id: i64,
    pub title: String,
    pub span: Span,
    pub completed: bool,
    /// The milestone's dates were unreadable and `span` is the placeholder.
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRow {
    /// `None` for the row collecting unassigned milestones.
    pub phase_id: Option<i64>,
    pub label: String,
    pub color: Color,
    pub bars: Vec<TimelineBar>,
}

/// Everything needed to draw one frame of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineLayout {
    pub zoom: Zoom,
    pub range: DateRange,
    pub bucket_width: u32,
    pub buckets: Vec<Date>,
    pub total_width: u32,
    pub today: Option<u32>,
    pub rows: Vec<TimelineRow>,
}

/// A date axis over a range at one zoom level.
#[derive(Debug, Clone, Copy)]
pub struct Timeline {
    range: DateRange,
    buckets: Buckets,
    bucket_count: usize,
}

impl Timeline {
    pub fn new(range: DateRange, zoom: Zoom) -> Self {
        let buckets = Buckets::new(range, zoom);
        Self {
            range,
            buckets,
            bucket_count: buckets.len(),
        }
    }

    /// Axis sized for `milestones` (see [`DateRange::for_schedules`]).
    /// Milestones with unreadable dates do not influence the range.
    pub fn for_milestones(milestones: &[Milestone], zoom: Zoom, today: Date) -> Self {
        let schedules = milestones.iter().filter_map(|m| m.schedule().ok());
        Self::new(DateRange::for_schedules(schedules, today), zoom)
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn zoom(&self) -> Zoom {
        self.buckets.zoom()
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn total_width(&self) -> u32 {
        self.bucket_count as u32 * self.zoom().bucket_width()
    }

    /// Bucket indices of the start and end of `schedule`, clamped to the axis,
    /// with `end >= start`.
    pub fn bucket_indices(&self, schedule: Schedule) -> (usize, usize) {
        let max_index = self.bucket_count.saturating_sub(1);
        let start = self.buckets.locate(schedule.start).min(max_index);
        let end = self.buckets.locate(schedule.end).min(max_index).max(start);
        (start, end)
    }

    pub fn span(&self, schedule: Schedule) -> Span {
        let width = self.zoom().bucket_width();
        let (start, end) = self.bucket_indices(schedule);
        let duration = (end - start + 1) as u32;
        Span {
            left: start as u32 * width,
            width: (duration * width).max(MIN_BAR_WIDTH),
        }
    }

    /// Span of a stored milestone; unreadable dates give [`Span::PLACEHOLDER`].
    pub fn milestone_span(&self, milestone: &Milestone) -> Span {
        self.try_milestone_span(milestone).unwrap_or(Span::PLACEHOLDER)
    }

    fn try_milestone_span(&self, milestone: &Milestone) -> Option<Span> {
        match milestone.schedule() {
            Ok(schedule) => Some(self.span(schedule)),
            Err(e) => {
                tracing::warn!(
                    milestone_id = milestone.id,
                    title = %milestone.title,
                    error = %e,
                    "Cannot place milestone on the timeline, using placeholder"
                );
                None
            }
        }
    }

    /// Pixel offset of the "today" marker, `None` when today is off the axis.
    pub fn today_offset(&self, today: Date) -> Option<u32> {
        if !self.range.contains(today) || self.bucket_count == 0 {
            return None;
        }
        let index = self.buckets.locate(today).min(self.bucket_count - 1);
        Some(index as u32 * self.zoom().bucket_width())
    }

    /// Lay out `milestones` in one row per phase (in phase order), plus a
    /// trailing row for milestones without a known phase.
    pub fn layout(&self, milestones: &[Milestone], phases: &[Phase], today: Date) -> TimelineLayout {
        let mut rows: Vec<TimelineRow> = phases
            .iter()
            .map(|phase| TimelineRow {
                phase_id: Some(phase.id),
                label: phase.name.clone(),
                color: phase.color,
                bars: Vec::new(),
            })
            .collect();
        let mut unassigned = TimelineRow {
            phase_id: None,
            label: "Unassigned".to_string(),
            color: Color::GRAY,
            bars: Vec::new(),
        };

        for milestone in milestones {
            let span = self.try_milestone_span(milestone);
            let bar = TimelineBar {
                milestone_id: milestone.id,
                title: milestone.title.clone(),
                span: span.unwrap_or(Span::PLACEHOLDER),
                completed: milestone.completed,
                placeholder: span.is_none(),
            };
            let row = milestone
                .phase_id
                .and_then(|phase_id| rows.iter_mut().find(|row| row.phase_id == Some(phase_id)));
            match row {
                Some(row) => row.bars.push(bar),
                None => unassigned.bars.push(bar),
            }
        }

        if !unassigned.bars.is_empty() {
            rows.push(unassigned);
        }

        TimelineLayout {
            zoom: self.zoom(),
            range: self.range,
            bucket_width: self.zoom().bucket_width(),
            buckets: self.buckets.iter().collect(),
            total_width: self.total_width(),
            today: self.today_offset(today),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::SyncStatus;
    use time::macros::date;

    fn milestone(id: i64, start: &str, end: &str, phase_id: Option<i64>) -> Milestone {
        Milestone {
            id,
            title: format!("Milestone {id}"),
            start_date: start.to_string(),
            end_date: end.to_string(),
            phase_id,
            notes: String::new(),
            completed: false,
            sync_status: SyncStatus::LocalOnly,
        }
    }

    fn phase(id: i64, name: &str) -> Phase {
        Phase {
            id,
            name: name.to_string(),
            color: Color { r: 1, g: 2, b: 3 },
            sync_status: SyncStatus::LocalOnly,
        }
    }

    #[test]
    fn test_day_zoom_span() {
        let range = DateRange::new(date!(2024 - 01 - 01), date!(2024 - 01 - 05));
        let timeline = Timeline::new(range, Zoom::Day);
        let span = timeline.milestone_span(&milestone(1, "2024-01-02", "2024-01-03", None));
        assert_eq!(span, Span { left: 80, width: 160 });
    }

    #[test]
    fn test_month_zoom_collapses_to_one_bucket() {
        let range = DateRange::new(date!(2024 - 01 - 01), date!(2024 - 12 - 31));
        let timeline = Timeline::new(range, Zoom::Month);
        let span = timeline.milestone_span(&milestone(1, "2024-03-02", "2024-03-29", None));
        assert_eq!(span, Span { left: 300, width: 150 });
    }

    #[test]
    fn test_single_day_gets_minimum_width() {
        let range = DateRange::new(date!(2024 - 01 - 01), date!(2024 - 03 - 01));
        let timeline = Timeline::new(range, Zoom::Week);
        let span = timeline.milestone_span(&milestone(1, "2024-01-10", "2024-01-10", None));
        assert_eq!(span, Span { left: 120, width: 120 });

        let range = DateRange::new(date!(2024 - 01 - 01), date!(2024 - 01 - 05));
        let timeline = Timeline::new(range, Zoom::Day);
        assert!(timeline.span(Schedule::new(date!(2024 - 01 - 01), date!(2024 - 01 - 01))).width >= MIN_BAR_WIDTH);
    }

    #[test]
    fn test_malformed_dates_use_placeholder() {
        let timeline = Timeline::new(DateRange::new(date!(2024 - 01 - 01), date!(2024 - 12 - 31)), Zoom::Day);
        let span = timeline.milestone_span(&milestone(1, "not-a-date", "2024-01-03", None));
        assert_eq!(span, Span::PLACEHOLDER);
        assert_eq!(span.to_string(), "left: 0px; width: 60px");
    }

    #[test]
    fn test_reversed_dates_are_clamped() {
        let range = DateRange::new(date!(2024 - 01 - 01), date!(2024 - 01 - 31));
        let timeline = Timeline::new(range, Zoom::Day);
        let (start, end) =
            timeline.bucket_indices(milestone(1, "2024-01-10", "2024-01-03", None).schedule().unwrap());
        assert_eq!((start, end), (9, 9));
    }

    #[test]
    fn test_out_of_range_milestone_is_clamped() {
        let range = DateRange::new(date!(2024 - 01 - 01), date!(2024 - 01 - 05));
        let timeline = Timeline::new(range, Zoom::Day);
        let span = timeline.span(Schedule::new(date!(2023 - 06 - 01), date!(2025 - 01 - 01)));
        assert_eq!(span, Span { left: 0, width: 400 });
        assert_eq!(span.right(), timeline.total_width());
    }

    #[test]
    fn test_today_marker() {
        let range = DateRange::new(date!(2024 - 01 - 01), date!(2024 - 01 - 31));
        let timeline = Timeline::new(range, Zoom::Week);
        assert_eq!(timeline.today_offset(date!(2024 - 01 - 01)), Some(0));
        assert_eq!(timeline.today_offset(date!(2024 - 01 - 17)), Some(240));
        assert_eq!(timeline.today_offset(date!(2023 - 12 - 31)), None);
        assert_eq!(timeline.today_offset(date!(2024 - 02 - 01)), None);
    }

    #[test]
    fn test_spans_inside_padded_range_are_valid() {
        let today = date!(2024 - 05 - 01);
        let milestones = vec![
            milestone(1, "2024-01-15", "2024-02-20", None),
            milestone(2, "2024-06-01", "2024-06-01", None),
            milestone(3, "2025-03-01", "2025-09-30", None),
        ];
        for zoom in [Zoom::Day, Zoom::Week, Zoom::Month] {
            let timeline = Timeline::for_milestones(&milestones, zoom, today);
            for m in &milestones {
                let (start, end) = timeline.bucket_indices(m.schedule().unwrap());
                assert!(end >= start);
                let span = timeline.milestone_span(m);
                assert!(span.width >= MIN_BAR_WIDTH);
                assert!(span.right() <= timeline.total_width());
            }
            assert!(timeline.today_offset(today).is_some());
        }
    }

    #[test]
    fn test_layout_groups_rows_by_phase() {
        let today = date!(2024 - 01 - 01);
        let phases = vec![phase(1, "Foundation"), phase(2, "Roof")];
        let milestones = vec![
            milestone(10, "2024-01-02", "2024-01-05", Some(2)),
            milestone(11, "2024-01-03", "2024-01-04", Some(1)),
            milestone(12, "2024-01-04", "2024-01-06", Some(99)),
            milestone(13, "garbage", "2024-01-06", None),
        ];
        let timeline = Timeline::for_milestones(&milestones, Zoom::Day, today);
        let layout = timeline.layout(&milestones, &phases, today);

        assert_eq!(layout.rows.len(), 3);
        assert_eq!(layout.rows[0].label, "Foundation");
        assert_eq!(layout.rows[0].bars[0].milestone_id, 11);
        assert_eq!(layout.rows[1].bars[0].milestone_id, 10);
        let unassigned = &layout.rows[2];
        assert_eq!(unassigned.phase_id, None);
        assert_eq!(unassigned.bars.len(), 2);
        assert!(unassigned.bars[1].placeholder);
        assert_eq!(layout.buckets.len(), timeline.bucket_count());
        assert_eq!(layout.today, timeline.today_offset(today));
    }
}
