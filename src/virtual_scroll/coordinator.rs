//! Per-frame scroll event serialization.
//!
//! Scroll sources (native scrolling, programmatic scroll-to requests, and
//! row count or height changes) push events into a channel. Once per frame
//! the host calls [`ScrollEventCoordinator::on_frame`], which keeps only the
//! most recently pushed positional event and performs a single window
//! computation. A recompute never displaces a pending scroll target.
//! Events pushed while a frame is being processed are seen next frame.

use crate::virtual_scroll::heights::RowHeightTracker;
use crate::virtual_scroll::window::{compute_window, WindowAnchor, WindowState};
use std::sync::mpsc::{channel, Receiver, Sender};

/// Tolerance when deciding whether the viewport sits at the bottom.
const AT_END_EPSILON: f32 = 0.5;

/// Where a programmatic scroll should land.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollTarget {
    /// Absolute pixel offset
    Offset(f32),
    /// Top of the given row
    Index(usize),
    /// Bottom of the content
    End,
}

/// An event feeding the coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollEvent {
    /// The user scrolled the viewport
    Native { scroll_top: f32, scroll_left: f32 },
    /// Host requested a scroll position
    Programmatic(ScrollTarget),
    /// Row count or heights changed
    Recompute,
}

/// Coordinator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPhase {
    /// No row measured yet
    Init,
    /// First measurement arrived; lasts one frame
    Loaded,
    /// Steady state
    Running,
}

/// Result of one processed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    pub window: WindowState,
    /// Scroll offset the host should apply to its viewport
    pub scroll_top: f32,
    pub scroll_left: f32,
    /// Whether the materialized rows changed and must be re-rendered
    pub render: bool,
    /// Viewport is at maximum scroll
    pub is_at_end: bool,
    /// A programmatic scroll reached a stable window this frame
    pub settled: bool,
    pub phase: ScrollPhase,
}

/// Cloneable producer side of the event channel.
#[derive(Debug, Clone)]
pub struct ScrollHandle {
    sender: Sender<ScrollEvent>,
}

impl ScrollHandle {
    pub fn push(&self, event: ScrollEvent) {
        // The receiver lives as long as the coordinator; a send after drop is moot
        let _ = self.sender.send(event);
    }

    pub fn scroll_to(&self, target: ScrollTarget) {
        self.push(ScrollEvent::Programmatic(target));
    }
}

/// Batches scroll triggers into at most one window update per frame.
pub struct ScrollEventCoordinator {
    sender: Sender<ScrollEvent>,
    receiver: Receiver<ScrollEvent>,
    phase: ScrollPhase,
    overscan: usize,
    scroll_left: f32,
    /// Programmatic target re-issued every frame until settled
    pending: Option<ScrollTarget>,
    /// Window produced by the previous programmatic frame
    pending_window: Option<WindowState>,
    last_window: Option<WindowState>,
    superseded: u64,
}

impl ScrollEventCoordinator {
    pub fn new(overscan: usize) -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            phase: ScrollPhase::Init,
            overscan,
            scroll_left: 0.0,
            pending: None,
            pending_window: None,
            last_window: None,
            superseded: 0,
        }
    }

    /// Producer handle for event sources.
    pub fn handle(&self) -> ScrollHandle {
        ScrollHandle {
            sender: self.sender.clone(),
        }
    }

    pub fn push(&self, event: ScrollEvent) {
        let _ = self.sender.send(event);
    }

    // ===== Queries =====

    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    /// Window computed by the most recent frame.
    pub fn last_window(&self) -> Option<WindowState> {
        self.last_window
    }

    /// Whether a programmatic scroll still needs frames to settle.
    pub fn is_scrolling(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of events dropped because a newer one arrived in the same frame.
    pub fn superseded_events(&self) -> u64 {
        self.superseded
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    // ===== Frame Processing =====

    /// Processes the latest pending event for this frame.
    ///
    /// # Arguments
    /// * `tracker` - Row heights; its scroll top is read and updated
    /// * `viewport_height` - Visible pixel height
    ///
    /// # Returns
    /// `None` when nothing needed processing this frame.
    pub fn on_frame(
        &mut self,
        tracker: &mut RowHeightTracker,
        viewport_height: f32,
    ) -> Option<FrameOutcome> {
        // Drain first so events pushed during processing wait for the next frame
        let drained: Vec<ScrollEvent> = self.receiver.try_iter().collect();
        let mut latest: Option<ScrollEvent> = None;
        for event in &drained {
            latest = match (latest, event) {
                // Any positional event already recomputes the window
                (Some(previous), ScrollEvent::Recompute) => Some(previous),
                _ => Some(*event),
            };
        }
        if drained.len() > 1 {
            self.superseded += (drained.len() - 1) as u64;
            log::trace!("{} scroll events superseded in one frame", drained.len() - 1);
        }

        let just_loaded = match self.phase {
            ScrollPhase::Init if tracker.is_seeded() => {
                self.phase = ScrollPhase::Loaded;
                true
            }
            ScrollPhase::Loaded => {
                self.phase = ScrollPhase::Running;
                false
            }
            _ => false,
        };

        let event = match (latest, self.pending) {
            (Some(ScrollEvent::Recompute), Some(target)) | (None, Some(target)) => {
                ScrollEvent::Programmatic(target)
            }
            (Some(event), _) => event,
            (None, None) if just_loaded => ScrollEvent::Recompute,
            (None, None) => return None,
        };

        let outcome = match event {
            ScrollEvent::Native { scroll_top, scroll_left } => {
                // Real scrolling wins over stale programmatic requests
                self.pending = None;
                self.pending_window = None;
                self.scroll_left = scroll_left.max(0.0);
                self.frame_at_offset(tracker, viewport_height, scroll_top, just_loaded)
            }
            ScrollEvent::Programmatic(target) => {
                self.programmatic_frame(tracker, viewport_height, target, just_loaded)
            }
            ScrollEvent::Recompute => {
                let scroll_top = tracker.scroll_top();
                self.frame_at_offset(tracker, viewport_height, scroll_top, just_loaded)
            }
        };
        self.last_window = Some(outcome.window);
        Some(outcome)
    }

    fn max_scroll(tracker: &RowHeightTracker, viewport_height: f32) -> f32 {
        (tracker.computed_height() - viewport_height).max(0.0)
    }

    fn frame_at_offset(
        &self,
        tracker: &mut RowHeightTracker,
        viewport_height: f32,
        scroll_top: f32,
        force: bool,
    ) -> FrameOutcome {
        let max_scroll = Self::max_scroll(tracker, viewport_height);
        let scroll_top = scroll_top.clamp(0.0, max_scroll);
        tracker.set_scroll_top(scroll_top);

        let window = compute_window(
            tracker.heights(),
            viewport_height,
            WindowAnchor::Offset(scroll_top),
            self.overscan,
        );
        FrameOutcome {
            window,
            scroll_top,
            scroll_left: self.scroll_left,
            render: force || self.last_window != Some(window),
            is_at_end: scroll_top >= max_scroll - AT_END_EPSILON,
            settled: false,
            phase: self.phase,
        }
    }

    fn programmatic_frame(
        &mut self,
        tracker: &mut RowHeightTracker,
        viewport_height: f32,
        target: ScrollTarget,
        force: bool,
    ) -> FrameOutcome {
        let max_scroll = Self::max_scroll(tracker, viewport_height);
        let (anchor, scroll_top) = match target {
            ScrollTarget::Offset(offset) => {
                let top = offset.clamp(0.0, max_scroll);
                (WindowAnchor::Offset(top), top)
            }
            ScrollTarget::Index(index) => {
                let top = tracker.offset_of(index).clamp(0.0, max_scroll);
                (WindowAnchor::Offset(top), top)
            }
            ScrollTarget::End => (WindowAnchor::End, max_scroll),
        };
        tracker.set_scroll_top(scroll_top);
        let window = compute_window(tracker.heights(), viewport_height, anchor, self.overscan);

        // Settle once two consecutive frames agree on the window
        let settled = self.pending == Some(target) && self.pending_window == Some(window);
        if settled {
            self.pending = None;
            self.pending_window = None;
            log::trace!("programmatic scroll settled at {:.1}", scroll_top);
        } else {
            self.pending = Some(target);
            self.pending_window = Some(window);
        }

        FrameOutcome {
            window,
            scroll_top,
            scroll_left: self.scroll_left,
            render: force || self.last_window != Some(window),
            is_at_end: scroll_top >= max_scroll - AT_END_EPSILON,
            settled,
            phase: self.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(count: usize, height: f32) -> RowHeightTracker {
        let mut tracker = RowHeightTracker::new(height);
        tracker.expand(count, height);
        tracker
    }

    #[test]
    fn test_no_event_no_frame() {
        let mut coordinator = ScrollEventCoordinator::new(5);
        let mut heights = tracker(100, 40.0);
        assert!(coordinator.on_frame(&mut heights, 400.0).is_none());
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut coordinator = ScrollEventCoordinator::new(5);
        let mut heights = tracker(1_000, 40.0);

        coordinator.push(ScrollEvent::Recompute);
        let first = coordinator.on_frame(&mut heights, 400.0).unwrap();
        coordinator.push(ScrollEvent::Recompute);
        let second = coordinator.on_frame(&mut heights, 400.0).unwrap();

        assert_eq!(first.window, second.window);
        assert_eq!(first.window.top_offset.to_bits(), second.window.top_offset.to_bits());
        assert!(first.render);
        assert!(!second.render);
    }

    #[test]
    fn test_only_latest_event_per_frame() {
        let mut coordinator = ScrollEventCoordinator::new(0);
        let mut heights = tracker(1_000, 40.0);
        coordinator.push(ScrollEvent::Native { scroll_top: 400.0, scroll_left: 0.0 });
        coordinator.push(ScrollEvent::Native { scroll_top: 800.0, scroll_left: 0.0 });
        coordinator.push(ScrollEvent::Native { scroll_top: 1200.0, scroll_left: 0.0 });
        let outcome = coordinator.on_frame(&mut heights, 400.0).unwrap();
        assert_eq!(outcome.window.head, 30);
        assert_eq!(coordinator.superseded_events(), 2);
        assert_eq!(heights.scroll_top(), 1200.0);
    }

    #[test]
    fn test_events_pushed_during_frame_wait_for_next_frame() {
        let mut coordinator = ScrollEventCoordinator::new(0);
        let handle = coordinator.handle();
        let mut heights = tracker(1_000, 40.0);

        handle.push(ScrollEvent::Native { scroll_top: 400.0, scroll_left: 0.0 });
        let first = coordinator.on_frame(&mut heights, 400.0).unwrap();
        // A render triggered by this frame asks for a recompute
        handle.push(ScrollEvent::Recompute);
        assert_eq!(first.window.head, 10);

        let second = coordinator.on_frame(&mut heights, 400.0).unwrap();
        assert_eq!(second.window, first.window);
        assert!(!second.render);
    }

    #[test]
    fn test_programmatic_end_settles_and_snaps() {
        let mut coordinator = ScrollEventCoordinator::new(2);
        let mut heights = tracker(100, 40.0);
        coordinator.handle().scroll_to(ScrollTarget::End);

        let first = coordinator.on_frame(&mut heights, 400.0).unwrap();
        assert!(!first.settled);
        assert!(coordinator.is_scrolling());
        assert_eq!(first.window.tail, 100);

        // No new events: the target is re-issued and the window repeats
        let second = coordinator.on_frame(&mut heights, 400.0).unwrap();
        assert!(second.settled);
        assert!(!coordinator.is_scrolling());
        assert_eq!(second.scroll_top, 3600.0);
        assert!(second.is_at_end);
        assert!(coordinator.on_frame(&mut heights, 400.0).is_none());
    }

    #[test]
    fn test_programmatic_waits_for_measurements_to_stabilize() {
        let mut coordinator = ScrollEventCoordinator::new(0);
        let mut heights = tracker(100, 40.0);
        coordinator.handle().scroll_to(ScrollTarget::Index(50));

        let first = coordinator.on_frame(&mut heights, 400.0).unwrap();
        assert_eq!(first.window.head, 50);
        // Rendering measured taller rows above the target
        heights.record_measured(0, 40.0);
        for index in 1..11 {
            heights.record_measured(index, 80.0);
        }
        let second = coordinator.on_frame(&mut heights, 400.0).unwrap();
        assert!(!second.settled);
        assert_eq!(second.scroll_top, 2400.0);
        let third = coordinator.on_frame(&mut heights, 400.0).unwrap();
        assert!(third.settled);
    }

    #[test]
    fn test_recompute_keeps_programmatic_target() {
        let mut coordinator = ScrollEventCoordinator::new(0);
        let mut heights = tracker(100, 40.0);
        coordinator.handle().scroll_to(ScrollTarget::Index(20));
        coordinator.push(ScrollEvent::Recompute);
        let outcome = coordinator.on_frame(&mut heights, 400.0).unwrap();
        assert_eq!(outcome.window.head, 20);
        assert!(coordinator.is_scrolling());
    }

    #[test]
    fn test_native_scroll_cancels_programmatic() {
        let mut coordinator = ScrollEventCoordinator::new(0);
        let mut heights = tracker(100, 40.0);
        let handle = coordinator.handle();
        handle.scroll_to(ScrollTarget::End);
        coordinator.on_frame(&mut heights, 400.0);
        assert!(coordinator.is_scrolling());

        handle.push(ScrollEvent::Native { scroll_top: 0.0, scroll_left: 12.0 });
        let outcome = coordinator.on_frame(&mut heights, 400.0).unwrap();
        assert!(!coordinator.is_scrolling());
        assert_eq!(outcome.window.head, 0);
        assert_eq!(outcome.scroll_left, 12.0);
        assert!(!outcome.is_at_end);
    }

    #[test]
    fn test_phase_transitions_on_first_measurement() {
        let mut coordinator = ScrollEventCoordinator::new(0);
        let mut heights = tracker(10, 40.0);
        assert_eq!(coordinator.phase(), ScrollPhase::Init);

        heights.record_measured(0, 20.0);
        let loaded = coordinator.on_frame(&mut heights, 100.0).unwrap();
        assert_eq!(loaded.phase, ScrollPhase::Loaded);
        assert!(loaded.render);

        coordinator.push(ScrollEvent::Recompute);
        let running = coordinator.on_frame(&mut heights, 100.0).unwrap();
        assert_eq!(running.phase, ScrollPhase::Running);
        assert!(!running.render);
    }
}
