use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Window;
use crate::calendar::inclusive_days;

/// Horizontal placement of a bar, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarPosition {
    pub left: f64,
    pub width: f64,
}

/// Result of clamping a position to the drawable area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clipped {
    pub position: BarPosition,
    pub clipped_start: bool,
    pub clipped_end: bool,
}

impl BarPosition {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn clip(&self, total_width: f64) -> Clipped {
        let total = total_width.max(0.0);
        let left = self.left.clamp(0.0, total);
        let right = self.right().clamp(0.0, total);
        Clipped {
            position: BarPosition {
                left,
                width: (right - left).max(0.0),
            },
            clipped_start: self.left < 0.0,
            clipped_end: self.right() > total,
        }
    }
}

/// Linear placement of the inclusive day range `[first, last]` over `window`,
/// scaled to `total_width` pixels. The window always has at least one day,
/// so the result is finite for any finite width.
pub fn position_for(first: NaiveDate, last: NaiveDate, window: &Window, total_width: f64) -> BarPosition {
    let (first, last) = if last < first { (last, first) } else { (first, last) };
    let total_days = window.day_count() as f64;
    let px_per_day = if total_width.is_finite() && total_width > 0.0 {
        total_width / total_days
    } else {
        0.0
    };

    BarPosition {
        left: window.offset_of(first) as f64 * px_per_day,
        width: inclusive_days(first, last) as f64 * px_per_day,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn october_example() {
        let window = Window::new(date(2025, 10, 1), date(2025, 10, 31));
        let pos = position_for(date(2025, 10, 15), date(2025, 10, 20), &window, 31.0 * 100.0);
        assert!(approx(pos.left, 1400.0), "left was {}", pos.left);
        assert!(approx(pos.width, 600.0), "width was {}", pos.width);
    }

    #[test]
    fn records_inside_window_stay_in_bounds() {
        let window = Window::new(date(2025, 1, 1), date(2025, 3, 31));
        let total = 1234.5;
        let mut day = window.start;
        while day <= window.end {
            let pos = position_for(day, window.end, &window, total);
            assert!(pos.left >= 0.0);
            assert!(pos.right() <= total + 1e-6);
            day = day.succ_opt().expect("next day");
        }
    }

    #[test]
    fn single_day_window_is_finite() {
        let window = Window::new(date(2025, 5, 5), date(2025, 5, 5));
        let pos = position_for(date(2025, 5, 5), date(2025, 5, 5), &window, 100.0);
        assert!(approx(pos.left, 0.0));
        assert!(approx(pos.width, 100.0));

        let zero = position_for(date(2025, 5, 5), date(2025, 5, 5), &window, 0.0);
        assert!(zero.left.is_finite() && zero.width.is_finite());
    }

    #[test]
    fn clip_reports_cut_edges() {
        let window = Window::new(date(2025, 10, 10), date(2025, 10, 19));
        let pos = position_for(date(2025, 10, 5), date(2025, 10, 12), &window, 1000.0);
        assert!(approx(pos.left, -500.0));
        let clipped = pos.clip(1000.0);
        assert!(clipped.clipped_start);
        assert!(!clipped.clipped_end);
        assert!(approx(clipped.position.left, 0.0));
        assert!(approx(clipped.position.width, 300.0));
    }
}
