//! Visible window calculation.
//!
//! Pure functions only: inaccurate height estimates are corrected by the
//! coordinator recomputing after measurement, not here.

/// Range of rows to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowState {
    /// First materialized row (inclusive)
    pub head: usize,
    /// One past the last materialized row
    pub tail: usize,
    /// Height of all rows before `head`
    pub top_offset: f32,
}

impl WindowState {
    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.head && index < self.tail
    }
}

/// Where the viewport is anchored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowAnchor {
    /// Pixel offset of the viewport top
    Offset(f32),
    /// Bottom of the content
    End,
}

/// Maps row heights and a viewport position to the rows to materialize.
///
/// # Arguments
/// * `heights` - Per-row heights, measured or estimated
/// * `viewport_height` - Visible pixel height
/// * `anchor` - Requested offset, or the end of the content
/// * `overscan` - Extra rows kept on each side of the viewport
///
/// # Returns
/// The window; `head ≤ tail ≤ heights.len()` always holds.
pub fn compute_window(
    heights: &[f32],
    viewport_height: f32,
    anchor: WindowAnchor,
    overscan: usize,
) -> WindowState {
    let row_count = heights.len();
    if row_count == 0 {
        return WindowState::default();
    }
    let viewport_height = viewport_height.max(0.0);
    let total: f32 = heights.iter().sum();

    match anchor {
        WindowAnchor::End => {
            // Walk backward until the viewport is filled, then widen by overscan
            let mut head = row_count;
            let mut filled = 0.0;
            while head > 0 && filled < viewport_height {
                head -= 1;
                filled += heights[head];
            }
            for _ in 0..overscan {
                if head == 0 {
                    break;
                }
                head -= 1;
                filled += heights[head];
            }
            WindowState {
                head,
                tail: row_count,
                top_offset: (total - filled).max(0.0),
            }
        }
        WindowAnchor::Offset(offset) => {
            let max_scroll = (total - viewport_height).max(0.0);
            let offset = if offset.is_finite() { offset.clamp(0.0, max_scroll) } else { 0.0 };

            // Head candidate: the row containing the offset
            let mut head = row_count;
            let mut head_top = 0.0;
            let mut accumulated = 0.0;
            for (index, height) in heights.iter().enumerate() {
                if accumulated + height > offset {
                    head = index;
                    head_top = accumulated;
                    break;
                }
                accumulated += height;
            }
            if head == row_count {
                head_top = accumulated;
            }

            // Tail candidate: first row past the viewport bottom
            let bottom = offset + viewport_height;
            let mut tail = head;
            let mut reached = head_top;
            while tail < row_count && reached < bottom {
                reached += heights[tail];
                tail += 1;
            }

            let head = head.saturating_sub(overscan);
            let tail = (tail + overscan).min(row_count);
            WindowState {
                head,
                tail,
                top_offset: offset_of_index(heights, head),
            }
        }
    }
}

/// Pixel offset of the top of row `index`.
pub fn offset_of_index(heights: &[f32], index: usize) -> f32 {
    heights.iter().take(index).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn uniform(count: usize, height: f32) -> Vec<f32> {
        vec![height; count]
    }

    #[test]
    fn test_initial_window_ten_thousand_rows() {
        let heights = uniform(10_000, 40.0);
        let window = compute_window(&heights, 400.0, WindowAnchor::Offset(0.0), 5);
        assert_eq!(window, WindowState { head: 0, tail: 15, top_offset: 0.0 });
    }

    #[test]
    fn test_scrolled_window_ten_thousand_rows() {
        let heights = uniform(10_000, 40.0);
        let window = compute_window(&heights, 400.0, WindowAnchor::Offset(4000.0), 5);
        assert_eq!(window, WindowState { head: 95, tail: 115, top_offset: 3800.0 });
    }

    #[test_case(1 ; "single row")]
    #[test_case(7 ; "fewer rows than viewport")]
    #[test_case(500 ; "many rows")]
    fn test_increasing_heights_start_at_zero(count: usize) {
        let heights: Vec<f32> = (0..count).map(|i| 10.0 + i as f32).collect();
        let window = compute_window(&heights, 300.0, WindowAnchor::Offset(0.0), 3);
        assert_eq!(window.head, 0);
        assert_eq!(window.top_offset, 0.0);
        assert!(window.tail <= count);
    }

    #[test]
    fn test_end_anchor_covers_viewport() {
        let heights: Vec<f32> = (0..200).map(|i| 20.0 + (i % 7) as f32 * 5.0).collect();
        let overscan = 4;
        let window = compute_window(&heights, 350.0, WindowAnchor::End, overscan);
        assert_eq!(window.tail, heights.len());

        let covered: f32 = heights[window.head..].iter().sum();
        assert!(covered >= 350.0);

        // Dropping the overscan rows must still cover the viewport, and
        // one row fewer must not
        let strict_head = window.head + overscan;
        let strict: f32 = heights[strict_head..].iter().sum();
        assert!(strict >= 350.0);
        let too_few: f32 = heights[strict_head + 1..].iter().sum();
        assert!(too_few < 350.0);

        let total: f32 = heights.iter().sum();
        assert_eq!(window.top_offset, total - covered);
    }

    #[test]
    fn test_offset_past_end_is_clamped() {
        let heights = uniform(50, 40.0);
        let window = compute_window(&heights, 400.0, WindowAnchor::Offset(1.0e9), 0);
        assert_eq!(window.tail, 50);
        assert_eq!(window.head, 40);
        assert_eq!(window.top_offset, 1600.0);
    }

    #[test]
    fn test_empty_and_zero_height_rows() {
        assert_eq!(compute_window(&[], 400.0, WindowAnchor::Offset(10.0), 5), WindowState::default());
        let window = compute_window(&[0.0, 0.0, 0.0], 400.0, WindowAnchor::Offset(0.0), 1);
        assert!(window.head <= window.tail && window.tail <= 3);
    }

    #[test]
    fn test_variable_heights_window() {
        let heights = [100.0, 20.0, 20.0, 300.0, 20.0, 20.0];
        let window = compute_window(&heights, 100.0, WindowAnchor::Offset(130.0), 0);
        assert_eq!(window.head, 2);
        assert_eq!(window.tail, 4);
        assert_eq!(window.top_offset, 120.0);
    }
}
