//! Row height bookkeeping.

/// Tracks per-row pixel heights and their sum.
///
/// Slots start as shadow estimates and become measured once the row has
/// been rendered. Rows rendered as a block (a parent followed by its nested
/// fragment) occupy a single slot holding the block height.
///
/// The total is always re-summed from the slots in row order, never kept
/// as a running balance, so shrinking back to an earlier length yields
/// bit-for-bit the total that length had before.
#[derive(Debug, Clone)]
pub struct RowHeightTracker {
    heights: Vec<f32>,
    /// Parallel to `heights`
    measured: Vec<bool>,
    /// Sum of all heights
    computed_height: f32,
    /// Fill value for new shadow slots
    shadow_fill: f32,
    /// Whether a real measurement has replaced the configured estimate
    seeded: bool,
    scroll_top: f32,
}

impl RowHeightTracker {
    /// Creates an empty tracker using `estimate` for shadow slots.
    pub fn new(estimate: f32) -> Self {
        Self {
            heights: Vec::new(),
            measured: Vec::new(),
            computed_height: 0.0,
            shadow_fill: estimate,
            seeded: false,
            scroll_top: 0.0,
        }
    }

    // ===== Queries =====

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Sum of all tracked heights.
    pub fn computed_height(&self) -> f32 {
        self.computed_height
    }

    pub fn shadow_fill(&self) -> f32 {
        self.shadow_fill
    }

    /// Whether the first real measurement has been recorded.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn height_at(&self, index: usize) -> Option<f32> {
        self.heights.get(index).copied()
    }

    pub fn is_measured(&self, index: usize) -> bool {
        self.measured.get(index).copied().unwrap_or(false)
    }

    /// All heights, in row order.
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Pixel offset of the top of row `index`.
    pub fn offset_of(&self, index: usize) -> f32 {
        self.heights[..index.min(self.heights.len())].iter().sum()
    }

    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    pub fn set_scroll_top(&mut self, scroll_top: f32) {
        self.scroll_top = scroll_top.max(0.0);
    }

    // ===== Mutations =====

    fn resum(&mut self) {
        self.computed_height = self.heights.iter().sum();
    }

    /// Grows to `new_count` slots, filling new ones with `fill`.
    pub fn expand(&mut self, new_count: usize, fill: f32) {
        if new_count <= self.heights.len() {
            return;
        }
        self.heights.resize(new_count, fill);
        self.measured.resize(new_count, false);
        self.resum();
    }

    /// Shrinks to `new_count` slots, dropping the removed heights from the
    /// total.
    ///
    /// Shrinking to zero resets the total and the scroll position.
    pub fn shrink(&mut self, new_count: usize) {
        if new_count >= self.heights.len() {
            return;
        }
        self.heights.truncate(new_count);
        self.measured.truncate(new_count);
        if new_count == 0 {
            self.computed_height = 0.0;
            self.scroll_top = 0.0;
            return;
        }
        self.resum();
    }

    /// Resizes to `new_count`, using the current shadow fill for new slots.
    pub fn sync_len(&mut self, new_count: usize) {
        if new_count > self.heights.len() {
            self.expand(new_count, self.shadow_fill);
        } else {
            self.shrink(new_count);
        }
    }

    /// Records the rendered height of row `index`.
    ///
    /// The first measurement becomes the shadow fill and replaces every
    /// unmeasured slot, since it is a better estimate than the configured
    /// one.
    ///
    /// # Returns
    /// `true` if the total height changed.
    pub fn record_measured(&mut self, index: usize, height: f32) -> bool {
        if index >= self.heights.len() || !height.is_finite() || height < 0.0 {
            return false;
        }
        let mut changed = false;
        if !self.seeded {
            self.seeded = true;
            self.shadow_fill = height;
            for (slot, _) in self.heights.iter_mut().zip(&self.measured).filter(|(_, m)| !**m) {
                changed |= *slot != height;
                *slot = height;
            }
        }
        changed |= self.heights[index] != height;
        self.heights[index] = height;
        self.measured[index] = true;
        if !changed {
            return false;
        }
        let before = self.computed_height;
        self.resum();
        self.computed_height != before
    }

    /// Records a parent row together with the nested content rendered
    /// directly after it, so windowing treats the block as one unit.
    pub fn record_block(&mut self, index: usize, row_height: f32, nested_heights: &[f32]) -> bool {
        let block: f32 = row_height + nested_heights.iter().sum::<f32>();
        self.record_measured(index, block)
    }
}

impl Default for RowHeightTracker {
    fn default() -> Self {
        Self::new(40.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(22.5, 37, 1_000 ; "representable fill")]
    #[test_case(33.3, 37, 1_000 ; "fractional fill")]
    #[test_case(41.7, 10, 10_000 ; "long growth")]
    #[test_case(0.1, 10, 10_000 ; "tiny fill")]
    fn test_expand_then_shrink_restores_total(fill: f32, first: usize, grown: usize) {
        let mut tracker = RowHeightTracker::new(fill);
        tracker.expand(first, fill);
        let before = tracker.computed_height();
        tracker.expand(grown, fill);
        tracker.shrink(first);
        assert_eq!(tracker.computed_height().to_bits(), before.to_bits());
        assert_eq!(tracker.len(), first);
    }

    #[test]
    fn test_total_survives_repeated_resizing() {
        let mut tracker = RowHeightTracker::new(33.3);
        tracker.expand(50, 33.3);
        tracker.record_measured(3, 27.1);
        let before = tracker.computed_height();
        for grown in [200, 5_000, 75, 12_000] {
            tracker.sync_len(grown);
            tracker.sync_len(50);
        }
        assert_eq!(tracker.computed_height().to_bits(), before.to_bits());
        assert_eq!(tracker.heights().len(), 50);
    }

    #[test]
    fn test_shrink_to_zero_resets() {
        let mut tracker = RowHeightTracker::new(40.0);
        tracker.expand(10, 40.0);
        tracker.set_scroll_top(120.0);
        tracker.shrink(0);
        assert!(tracker.is_empty());
        assert_eq!(tracker.computed_height(), 0.0);
        assert_eq!(tracker.scroll_top(), 0.0);
    }

    #[test]
    fn test_first_measurement_backfills_shadow_slots() {
        let mut tracker = RowHeightTracker::new(40.0);
        tracker.expand(5, 40.0);
        assert!(tracker.record_measured(2, 30.0));
        assert!(tracker.is_seeded());
        assert_eq!(tracker.shadow_fill(), 30.0);
        assert_eq!(tracker.computed_height(), 150.0);
        assert!(tracker.is_measured(2));
        assert!(!tracker.is_measured(0));

        // New slots use the seeded fill
        tracker.sync_len(7);
        assert_eq!(tracker.computed_height(), 210.0);
    }

    #[test]
    fn test_later_measurements_adjust_by_delta() {
        let mut tracker = RowHeightTracker::new(40.0);
        tracker.expand(3, 40.0);
        tracker.record_measured(0, 40.0);
        assert!(tracker.record_measured(1, 55.0));
        assert_eq!(tracker.computed_height(), 135.0);
        assert!(!tracker.record_measured(1, 55.0));
        // Measured slots are not overwritten by shadow fill changes
        assert_eq!(tracker.height_at(1), Some(55.0));
    }

    #[test]
    fn test_out_of_range_measurement_ignored() {
        let mut tracker = RowHeightTracker::new(40.0);
        tracker.expand(2, 40.0);
        assert!(!tracker.record_measured(5, 10.0));
        assert!(!tracker.is_seeded());
    }

    #[test]
    fn test_block_folds_nested_heights() {
        let mut tracker = RowHeightTracker::new(40.0);
        tracker.expand(3, 40.0);
        tracker.record_measured(0, 40.0);
        tracker.record_block(1, 40.0, &[120.0, 8.0]);
        assert_eq!(tracker.height_at(1), Some(168.0));
        assert_eq!(tracker.offset_of(2), 208.0);
    }
}
